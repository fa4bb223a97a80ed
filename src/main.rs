use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chatter::agent::providers::http::HttpTransport;
use chatter::agent::{
    AgentCatalog, AgentTransport, ChatEngine, ChatEntry, ChatterSettings, EntryContent,
    RequestError, SendError, SessionUpdate,
};
use chatter::logging;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A line of REPL input.
enum Command<'a> {
    Quit,
    ListAgents,
    Select(&'a str),
    Send(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/quit" | "/exit" => Command::Quit,
            "/agents" => Command::ListAgents,
            _ => match trimmed.strip_prefix("/agent ") {
                Some(name) => Command::Select(name.trim()),
                None => Command::Send(line),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let workspace_root = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    logging::init(&workspace_root)?;

    let settings = ChatterSettings::load(&workspace_root)?;
    let api_env = settings.resolve()?;
    let token = settings.access_token()?;
    let agents_path = settings.agents_path(&workspace_root);
    let catalog = AgentCatalog::load(&agents_path)
        .with_context(|| format!("failed to load agents from {}", agents_path.display()))?;
    let agent = catalog
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("no agents defined in {}", agents_path.display()))?;
    let transport = HttpTransport::new(&api_env).context("failed to create HTTP client")?;
    info!("Using endpoint {}", transport.endpoint());

    let mut engine = ChatEngine::new(agent, api_env, token, transport);
    print_header(&engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::ListAgents => {
                let active = &engine.session().agent().name;
                for agent in catalog.agents() {
                    let marker = if &agent.name == active { '*' } else { ' ' };
                    println!("{marker} {} ({})", agent.name, agent.binding.describe());
                }
            }
            Command::Select(name) => match catalog.find(name) {
                Some(agent) => {
                    engine.select_agent(agent.clone());
                    print_header(&engine);
                }
                None => println!("! unknown agent '{name}', try /agents"),
            },
            Command::Send(text) => match engine.send(text) {
                Ok(()) => {
                    println!("...");
                    if let Some(update) = engine.next_update().await {
                        print_update(&engine, &update);
                    }
                }
                Err(SendError::Request(RequestError::EmptyUtterance)) => {}
                Err(err) => println!("! {err}"),
            },
        }
    }
    Ok(())
}

fn print_header<T: AgentTransport>(engine: &ChatEngine<T>) {
    let agent = engine.session().agent();
    println!("== {} ({}) ==", agent.name, agent.binding.describe());
    println!("Type a question, /agents to list agents, /agent <name> to switch, /quit to leave.");
}

fn print_update<T: AgentTransport>(engine: &ChatEngine<T>, update: &SessionUpdate) {
    match update {
        SessionUpdate::Replied { appended, .. } => {
            for entry in engine.latest(*appended) {
                print_entry(entry);
            }
            if *appended == 0 {
                if update.is_malformed() {
                    println!("! the agent sent a reply this client could not read");
                } else {
                    println!("(no answer)");
                }
            }
        }
        SessionUpdate::Failed(_) => {
            if let Some(entry) = engine.latest(1).first() {
                print_entry(entry);
            }
        }
    }
}

fn print_entry(entry: &ChatEntry) {
    match &entry.content {
        EntryContent::Text(text) => println!("{text}"),
        EntryContent::Chart(spec) => {
            let rendered =
                serde_json::to_string_pretty(spec).unwrap_or_else(|_| spec.to_string());
            println!("[chart]\n{rendered}");
        }
        EntryContent::Failure(message) => println!("! {message}"),
    }
}
