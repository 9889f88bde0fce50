use roomchat_types::models::UserId;

use crate::error::ClientError;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3005";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the snapshot endpoints.
    pub server_url: String,
    /// Base URL of the push channel; the session id is appended as the path.
    pub ws_url: String,
    /// Session identity: bearer credential and channel address.
    pub session_id: UserId,
    /// Fold concurrent user repairs into one in-flight fetch plus one follow-up.
    pub coalesce_repairs: bool,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, session_id: UserId) -> Self {
        let server_url: String = server_url.into();
        let server_url = server_url.trim_end_matches('/').to_string();
        Self {
            ws_url: ws_url_for(&server_url),
            server_url,
            session_id,
            coalesce_repairs: true,
        }
    }

    /// Read the remaining `ROOMCHAT_*` variables for a resolved identity.
    /// Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env(session_id: UserId) -> Result<Self, ClientError> {
        let mut config = Self::new(server_url_from_env(), session_id);

        if let Ok(ws_url) = std::env::var("ROOMCHAT_WS_URL") {
            config.ws_url = ws_url.trim_end_matches('/').to_string();
        }

        if let Ok(raw) = std::env::var("ROOMCHAT_COALESCE_REPAIRS") {
            config.coalesce_repairs = parse_flag(&raw).ok_or_else(|| ClientError::Config {
                reason: format!("ROOMCHAT_COALESCE_REPAIRS: not a boolean: {:?}", raw),
            })?;
        }

        Ok(config)
    }

    /// Push channel endpoint for this session.
    pub fn channel_url(&self) -> String {
        format!("{}/{}", self.ws_url, self.session_id)
    }
}

/// How the session gets its identity: an id issued earlier, or a name to
/// register under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Session(UserId),
    Register(String),
}

impl Identity {
    /// `ROOMCHAT_SESSION_ID` wins over `ROOMCHAT_USER_NAME`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::resolve(
            std::env::var("ROOMCHAT_SESSION_ID").ok(),
            std::env::var("ROOMCHAT_USER_NAME").ok(),
        )
    }

    fn resolve(session_id: Option<String>, user_name: Option<String>) -> Result<Self, ClientError> {
        if let Some(raw) = session_id {
            let id = raw.trim().parse::<UserId>().map_err(|e| ClientError::Config {
                reason: format!("ROOMCHAT_SESSION_ID: {}", e),
            })?;
            return Ok(Self::Session(id));
        }
        match user_name {
            Some(name) => Ok(Self::Register(name)),
            None => Err(ClientError::Config {
                reason: "set ROOMCHAT_SESSION_ID or ROOMCHAT_USER_NAME".into(),
            }),
        }
    }
}

pub fn server_url_from_env() -> String {
    std::env::var("ROOMCHAT_SERVER_URL")
        .unwrap_or_else(|_| DEFAULT_SERVER_URL.into())
        .trim_end_matches('/')
        .to_string()
}

fn ws_url_for(server_url: &str) -> String {
    if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        server_url.to_string()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
