use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;

use cadchat_lib::bus::event_types::EVENT_AGENT_NOTICE;
use cadchat_lib::bus::{BusEvent, EventBus};
use cadchat_lib::conversation::{MessageBody, Role};
use cadchat_lib::document::{demo_registry, InMemoryPartHistory, PartHistory};
use cadchat_lib::model::{ChatModelClient, OpenAiCompatClient};
use cadchat_lib::runtime::CredentialPrompt;
use cadchat_lib::{ChatConfig, Orchestrator, TurnOutcome};

const HELP: &str = "Commands: /reset, /delete <id>, /history, /quit";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("cadchat failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    cadchat_lib::init_tracing();

    let config = ChatConfig::from_env().map_err(|e| e.to_string())?;
    let client = OpenAiCompatClient::new(
        config.model.clone(),
        config.base_url.clone(),
        config.request_timeout(),
        "openai-compatible",
    )
    .map_err(|e| e.to_string())?;
    tracing::info!(model = %config.model, base_url = %config.base_url, "starting cadchat");

    let mut chat = Orchestrator::new(
        config,
        client,
        InMemoryPartHistory::new(demo_registry()),
        Box::new(StdinPrompt),
        Arc::new(EventBus::new()),
    );
    let mut events = chat.subscribe();
    let mut last_seen = 0;

    println!("cadchat ready. {HELP}");
    loop {
        prompt("> ");
        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/reset", _) => {
                chat.reset_conversation();
                last_seen = 0;
            }
            ("/delete", raw_id) => match raw_id.parse::<u64>() {
                Ok(id) if chat.delete_message(id) => println!("deleted message {id}"),
                Ok(id) => println!("no message with id {id}"),
                Err(_) => println!("usage: /delete <id>"),
            },
            ("/history", _) => match chat.document().to_json().await {
                Ok(json) => println!("{json}"),
                Err(e) => println!("could not serialize part history: {e}"),
            },
            _ => {
                let outcome = chat.send_user_message(line).await;
                print_notices(&mut events);
                if outcome == TurnOutcome::CredentialMissing {
                    println!("No API key set; message kept for the next turn.");
                }
            }
        }
        last_seen = print_new_messages(&chat, last_seen);
    }
    Ok(())
}

fn print_new_messages<M: ChatModelClient>(
    chat: &Orchestrator<M, InMemoryPartHistory>,
    last_seen: u64,
) -> u64 {
    let mut newest = last_seen;
    for message in chat.messages().messages().iter().filter(|m| m.id > last_seen) {
        newest = newest.max(message.id);
        match (message.role, &message.body) {
            (Role::User, MessageBody::Image { caption, .. }) => {
                println!("[{}] (image) {caption}", message.id)
            }
            (Role::User, _) => {}
            (Role::Tool, _) => println!("[{}] tool result: {}", message.id, message.text()),
            (Role::Assistant, _) if !message.tool_calls.is_empty() => {
                let names: Vec<&str> = message.tool_calls.iter().map(|c| c.name()).collect();
                println!("[{}] calling {}", message.id, names.join(", "));
            }
            (Role::Assistant, _) => println!("[{}] {}", message.id, message.text()),
        }
    }
    newest
}

fn print_notices(events: &mut Receiver<BusEvent>) {
    while let Ok(event) = events.try_recv() {
        if event.event_type == EVENT_AGENT_NOTICE {
            if let Some(text) = event.payload["text"].as_str() {
                println!("  · {text}");
            }
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
    .await
    .ok()
    .flatten()
}

/// Asks for the API key on stdin. A blank line cancels.
struct StdinPrompt;

#[async_trait]
impl CredentialPrompt for StdinPrompt {
    async fn request_secret(&self, _current: Option<&str>) -> Option<String> {
        prompt("API key (blank to cancel): ");
        read_line()
            .await
            .map(|line| line.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}
