//! Full-replace snapshot queries against the server of record.

use std::future::Future;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use roomchat_types::api::RegisterResponse;
use roomchat_types::frame::SEPARATOR;
use roomchat_types::models::{RoomsSnapshot, UserId, UsersSnapshot};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Where the engine pulls authoritative state from. Both queries are
/// idempotent and return the whole collection.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_rooms(&self) -> impl Future<Output = Result<RoomsSnapshot, ClientError>> + Send;

    fn fetch_users(&self) -> impl Future<Output = Result<UsersSnapshot, ClientError>> + Send;
}

/// `GET /rooms` and `GET /users`, authenticated with `Bearer <session id>`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotLoader {
    client: Client,
    server_url: String,
    session_id: UserId,
}

impl HttpSnapshotLoader {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            server_url: config.server_url.clone(),
            session_id: config.session_id,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .client
            .get(format!("{}{}", self.server_url, path))
            .bearer_auth(self.session_id)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.json::<T>().await?;
        debug!("fetched {}", path);
        Ok(body)
    }
}

impl SnapshotSource for HttpSnapshotLoader {
    fn fetch_rooms(&self) -> impl Future<Output = Result<RoomsSnapshot, ClientError>> + Send {
        self.get_json("/rooms")
    }

    fn fetch_users(&self) -> impl Future<Output = Result<UsersSnapshot, ClientError>> + Send {
        self.get_json("/users")
    }
}

/// `POST /register/{name}`: obtain a fresh session identity.
///
/// Empty names and names containing the frame separator are rejected
/// before anything is sent.
pub async fn register(server_url: &str, name: &str) -> Result<UserId, ClientError> {
    if name.is_empty() || name.contains(SEPARATOR) {
        return Err(ClientError::InvalidName { name: name.to_string() });
    }

    let mut url = Url::parse(server_url).map_err(|e| ClientError::Config {
        reason: format!("server url {:?}: {}", server_url, e),
    })?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Config {
            reason: format!("server url {:?} cannot take a path", server_url),
        })?
        .pop_if_empty()
        .push("register")
        .push(name);

    let resp = Client::new().post(url).send().await?;
    if !resp.status().is_success() {
        return Err(ClientError::Status {
            path: "/register".to_string(),
            status: resp.status().as_u16(),
        });
    }

    let user_id = resp.json::<RegisterResponse>().await?.user_id;
    info!("registered {:?} as {}", name, user_id);
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_rejects_names_before_calling_out() {
        // Nothing listens on port 1; a request would surface as Http.
        for name in ["", "a\nb", "\n"] {
            assert!(matches!(
                register("http://127.0.0.1:1", name).await,
                Err(ClientError::InvalidName { .. })
            ));
        }
    }

    #[tokio::test]
    async fn register_reports_unreachable_server() {
        assert!(matches!(
            register("http://127.0.0.1:1", "ada").await,
            Err(ClientError::Http(_))
        ));
        assert!(matches!(
            register("not a url", "ada").await,
            Err(ClientError::Config { .. })
        ));
    }
}
