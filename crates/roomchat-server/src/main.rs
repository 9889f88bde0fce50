use std::net::SocketAddr;

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat_server=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("ROOMCHAT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ROOMCHAT_PORT")
        .unwrap_or_else(|_| "3005".into())
        .parse()?;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("roomchat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    roomchat_server::serve(listener, roomchat_server::new_state()).await?;

    Ok(())
}
