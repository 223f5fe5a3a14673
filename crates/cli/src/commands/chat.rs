//! Chat command handler.
//!
//! Reads questions from stdin until `:quit` or end of input. Errors are
//! printed and the loop keeps going with the session as it was.

use super::output::{print_response, stderr_progress};
use clap::Args;
use manualqa_core::{config::AppConfig, AppResult};
use manualqa_knowledge::{ConversationSession, Role, VectorIndex};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Dataset to select before the first question
    #[arg(short, long)]
    pub dataset: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    ListDatasets,
    History,
    Select(&'a str),
    Question(&'a str),
    Unknown(&'a str),
}

fn parse_line(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return ChatInput::Question(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "q" | "exit" => ChatInput::Quit,
        "datasets" => ChatInput::ListDatasets,
        "history" => ChatInput::History,
        "dataset" if !arg.is_empty() => ChatInput::Select(arg),
        _ => ChatInput::Unknown(line),
    }
}

const HELP: &str = "Commands: :dataset <name>, :datasets, :history, :quit";

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut session = ConversationSession::from_app_config(config, stderr_progress()).await?;

        if let Some(dataset) = &self.dataset {
            select(&mut session, dataset).await;
        }

        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_line(&line) {
                ChatInput::Empty => {}
                ChatInput::Quit => break,
                ChatInput::ListDatasets => {
                    for dataset in session.catalog().list() {
                        let marker = match session.active() {
                            Some(active) if active.slug() == dataset.slug() => "*",
                            _ => " ",
                        };
                        println!("{} {} ({})", marker, dataset.label, dataset.slug());
                    }
                }
                ChatInput::History => match session.active() {
                    Some(active) if !active.history().is_empty() => {
                        for turn in active.history() {
                            let who = match turn.role {
                                Role::User => "you",
                                Role::Assistant => "assistant",
                            };
                            println!("{}: {}", who, turn.content);
                        }
                    }
                    _ => println!("(no conversation yet)"),
                },
                ChatInput::Select(name) => select(&mut session, name).await,
                ChatInput::Question(question) => match session.active_mut() {
                    Some(active) => match active.ask(question).await {
                        Ok(response) => print_response(&response, false)?,
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    None => println!("Select a dataset first with :dataset <name>"),
                },
                ChatInput::Unknown(input) => println!("Unknown command {}. {}", input, HELP),
            }
        }

        Ok(())
    }
}

async fn select(session: &mut ConversationSession, name: &str) {
    match session.select_dataset(name).await {
        Ok(active) => println!(
            "Now answering from '{}' ({} chunks)",
            active.dataset_label(),
            active.index().len()
        ),
        Err(e) => eprintln!("Error: {}", e),
    }
}
