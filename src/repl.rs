//! Interactive chat mode for Sprout
//!
//! Run `sprout chat` to describe an app, then keep typing changes.
//! Each line after the first modifies the most recent code.

use anyhow::Result;
use colored::*;
use std::io::{self, BufRead, Write};
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::pipeline::progress::ProgressTracker;
use crate::{GenerationResult, Generator, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command definition with name and description
struct Command {
    name: &'static str,
    description: &'static str,
}

const COMMANDS: &[Command] = &[
    Command { name: "/new", description: "Start a new app" },
    Command { name: "/code", description: "Print the current code" },
    Command { name: "/help", description: "Show this help" },
    Command { name: "/quit", description: "Exit" },
];

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    New,
    Code,
    Help,
    Quit,
    Unknown(String),
    Prompt(String),
}

/// Classify one line typed at the prompt
pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    if !line.starts_with('/') {
        return ChatInput::Prompt(line.to_string());
    }
    match line.split_whitespace().next().unwrap_or(line) {
        "/new" | "/reset" => ChatInput::New,
        "/code" => ChatInput::Code,
        "/help" => ChatInput::Help,
        "/quit" | "/exit" => ChatInput::Quit,
        other => ChatInput::Unknown(other.to_string()),
    }
}

fn print_banner(generator: &Generator) {
    let metadata = generator.invoker().metadata();
    println!();
    println!("  {} {}", "sprout".green().bold(), format!("v{}", VERSION).dimmed());
    println!(
        "  {} {} ({})",
        "model:".dimmed(),
        metadata.id,
        metadata.mode.name()
    );
    println!();
    println!("  Describe an app to get started, then keep typing to change it.");
    println!("  {}", "/help for commands".dimmed());
    println!();
}

fn print_help() {
    println!();
    for cmd in COMMANDS {
        println!("  {:<8} {}", cmd.name.cyan(), cmd.description.dimmed());
    }
    println!();
}

/// Print a finished generation: code first, then a one-line summary
pub fn print_result(result: &GenerationResult) {
    println!("{}", result.code);
    println!();

    for issue in result.blocking_issues() {
        println!("{} {}", "!".yellow(), issue.message.yellow());
    }
    println!(
        "{} {} tokens · ${:.4}{}",
        "✓".green(),
        result.usage.total_tokens(),
        result.cost.total_cost(),
        (if result.repaired { " · repaired" } else { "" }).dimmed()
    );
}

/// Run the chat loop until `/quit` or end of input
pub async fn run_chat(generator: &Generator, cancel: &CancellationToken) -> Result<()> {
    print_banner(generator);

    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let marker = if session.is_empty() { "idea" } else { "change" };
        print!("{} ", format!("{}>", marker).green().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => print_help(),
            ChatInput::New => {
                session.reset();
                println!("{}", "Starting a new app.".dimmed());
            }
            ChatInput::Code => match session.latest_code() {
                Some(code) => println!("{}", code),
                None => println!("{}", "Nothing generated yet.".dimmed()),
            },
            ChatInput::Unknown(cmd) => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
            }
            ChatInput::Prompt(text) => {
                let tracker = ProgressTracker::new();
                let outcome = session
                    .submit(generator, &text, Some(&tracker), cancel)
                    .await;
                tracker.finish();

                match outcome {
                    Ok(result) => print_result(&result),
                    Err(GenerationError::Cancelled) => {
                        println!("{}", "Cancelled.".yellow());
                        break;
                    }
                    Err(e) => println!("{} {}", "✗".red(), e),
                }
                println!();
            }
        }
    }

    Ok(())
}
