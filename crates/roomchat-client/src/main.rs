use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use roomchat_client::config::server_url_from_env;
use roomchat_client::{
    ClientConfig, Directory, HttpSnapshotLoader, Identity, SendOutcome, SessionState, SyncEngine,
    register,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging on stderr so it does not mix with the chat transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let session_id = match Identity::from_env()? {
        Identity::Session(id) => id,
        Identity::Register(name) => {
            let id = register(&server_url_from_env(), &name).await?;
            println!("registered as {} (ROOMCHAT_SESSION_ID={})", name, id);
            id
        }
    };
    let config = ClientConfig::from_env(session_id)?;
    let engine = SyncEngine::new(config.clone(), HttpSnapshotLoader::new(&config));

    let state = engine.start().await;
    if state != SessionState::Open {
        anyhow::bail!("push channel to {} did not open", config.channel_url());
    }

    let mut printed: HashMap<String, usize> = HashMap::new();
    print_new_messages(&*engine.directory().await, &mut printed);

    let mut revision = engine.watch_revision();
    let mut session = engine.watch_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/rooms" => {
                        for name in engine.directory().await.room_names() {
                            println!("{}", name);
                        }
                    }
                    input => {
                        let (room, text) = input
                            .split_once(char::is_whitespace)
                            .map_or((input, ""), |(room, text)| (room, text.trim_start()));
                        match engine.send(Some(room), text) {
                            Ok(SendOutcome::Sent) => {}
                            Ok(SendOutcome::Skipped) => println!("usage: <room> <message>"),
                            Err(e) => warn!("send failed: {}", e),
                        }
                    }
                }
            }
            changed = revision.changed() => {
                if changed.is_err() {
                    break;
                }
                print_new_messages(&*engine.directory().await, &mut printed);
            }
            _ = session.wait_for(|s| *s == SessionState::Closed) => {
                println!("connection closed");
                break;
            }
        }
    }

    Ok(())
}

/// Print every message appended since the last call, room by room.
fn print_new_messages(directory: &Directory, printed: &mut HashMap<String, usize>) {
    for name in directory.room_names() {
        let Some(room) = directory.get_room(name) else {
            continue;
        };
        let seen = printed.entry(name.to_string()).or_insert(0);
        for message in room.messages.iter().skip(*seen) {
            println!("[{}] {}: {}", name, directory.author_name(message), message.text);
        }
        *seen = room.messages.len();
    }
}
