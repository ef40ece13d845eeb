use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::output::{print_error, print_hint};
use crate::client::{AssistantClient, ChatRequest, SessionKey, SessionStore};
use crate::config::AppConfig;
use crate::relay::RelayEvent;

pub struct ChatTarget {
    pub book_id: String,
    pub chapter_id: Option<String>,
    pub character_id: Option<String>,
    pub command: Option<String>,
}

/// Line-oriented chat against a running server. `/clear` resets the
/// session, `/quit` or end of input exits.
pub async fn handle_chat(
    config: &AppConfig,
    target: ChatTarget,
    url: Option<String>,
) -> anyhow::Result<()> {
    let url = url.unwrap_or_else(|| format!("http://{}", config.bind));
    let client = AssistantClient::new(&url);
    let key = SessionKey::for_target(&target.book_id, target.character_id.as_deref());
    let mut sessions = SessionStore::new();

    print_hint(&format!("Connected to {url} as {key}. /clear resets, /quit exits."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                sessions.clear(&key);
                print_hint("Session cleared.");
                continue;
            }
            _ => {}
        }

        let session = sessions.get_or_create(&key);
        let result = match &target.character_id {
            Some(character_id) => {
                client
                    .interview(session, &target.book_id, character_id, line, print_event)
                    .await
            }
            None => {
                let request = ChatRequest {
                    book_id: target.book_id.clone(),
                    chapter_id: target.chapter_id.clone(),
                    command: target.command.clone(),
                    selected_text: None,
                    message: line.to_string(),
                };
                client.send(session, &request, print_event).await
            }
        };
        println!();
        if let Err(e) = result {
            print_error(&e.to_string());
        }
    }
    Ok(())
}

fn print_event(event: &RelayEvent) {
    match event {
        RelayEvent::Text(fragment) => {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        }
        RelayEvent::Error(message) => {
            println!();
            print_error(message);
        }
        RelayEvent::Done => {}
    }
}
