//! Sprout CLI
//!
//! Commands:
//!   generate - Turn an app idea into Expo React Native code
//!   chat - Build an app interactively, one change at a time
//!   check - Run the code validator on a file
//!   cost - Price a token usage breakdown
//!   config - Show or create the config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sprout::config::{self, Config};
use sprout::repl::{print_result, run_chat};
use sprout::validate::{blocking_issues, validate};
use sprout::{
    CostBreakdown, GenerationError, GenerationRequest, Generator, ProgressTracker, UsageStats,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "sprout")]
#[command(about = "Turn an app idea into a runnable Expo React Native app")]
#[command(version)]
struct Cli {
    /// Use the offline stub model instead of the live API
    #[arg(long, global = true)]
    stub: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate an app from a one-line idea
    Generate {
        /// What the app should do
        idea: String,

        /// Write the code to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full result (code, usage, cost, issues) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session
    Chat,

    /// Validate an existing component file
    Check {
        /// Path to the JS/JSX file
        file: PathBuf,
    },

    /// Price a token usage breakdown with the configured rates
    Cost {
        #[arg(long, default_value = "0")]
        input: u64,

        #[arg(long, default_value = "0")]
        output: u64,

        #[arg(long, default_value = "0")]
        cache_write: u64,

        #[arg(long, default_value = "0")]
        cache_read: u64,
    },

    /// Show the active configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn load_config(stub: bool) -> Result<Config> {
    let mut config = Config::load()?.unwrap_or_default().apply_env_overrides();
    if stub {
        config.use_stub = true;
    }
    Ok(config)
}

fn build_generator(config: &Config) -> Result<Generator> {
    Generator::from_config(config, config.provider_mode(), config::api_key_from_env()).with_context(
        || {
            format!(
                "Could not start the model client (set {} or pass --stub)",
                config::API_KEY_ENV
            )
        },
    )
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sprout::logging::init(cli.verbose)?;

    match cli.command {
        Commands::Generate { idea, output, json } => {
            if idea.trim().is_empty() {
                bail!("Describe the app you want, e.g. sprout generate \"a habit tracker\"");
            }

            let config = load_config(cli.stub)?;
            let generator = build_generator(&config)?;
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let tracker = if json {
                ProgressTracker::quiet()
            } else {
                ProgressTracker::new()
            };
            let outcome = generator
                .generate_with_cancel(GenerationRequest::fresh(idea), Some(&tracker), &cancel)
                .await;
            tracker.finish();

            let result = match outcome {
                Ok(result) => result,
                Err(GenerationError::Cancelled) => {
                    eprintln!("{}", "Cancelled.".yellow());
                    std::process::exit(130);
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if let Some(path) = output {
                std::fs::write(&path, &result.code)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{} Wrote {}", "✓".green(), path.display());
                println!(
                    "  {} tokens · ${:.4}",
                    result.usage.total_tokens(),
                    result.cost.total_cost()
                );
            } else {
                print_result(&result);
            }
        }

        Commands::Chat => {
            let config = load_config(cli.stub)?;
            let generator = build_generator(&config)?;
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            run_chat(&generator, &cancel).await?;
        }

        Commands::Check { file } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let issues = validate(&code);

            if issues.is_empty() {
                println!("{} No issues found.", "✓".green());
            }
            for issue in &issues {
                if issue.is_blocking() {
                    println!("{} {}", issue.severity.label().red().bold(), issue.message);
                } else {
                    println!("{} {}", issue.severity.label().yellow(), issue.message);
                }
            }

            if !blocking_issues(&issues).is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Cost {
            input,
            output,
            cache_write,
            cache_read,
        } => {
            let config = load_config(cli.stub)?;
            let usage = UsageStats::new(input, output, cache_write, cache_read);
            let cost = CostBreakdown::from_usage(&usage, &config.pricing);

            println!("Tokens: {}", usage.total_tokens());
            println!("  Input:       {}", usage.input_tokens());
            println!("  Output:      {}", usage.output_tokens());
            println!("  Cache write: {}", usage.cache_creation_tokens());
            println!("  Cache read:  {}", usage.cache_read_tokens());
            println!();
            println!("Input cost:  ${:.6}", cost.input_cost());
            println!("Output cost: ${:.6}", cost.output_cost());
            println!("{}", format!("Total:       ${:.6}", cost.total_cost()).bold());
            if cost.cache_savings() > 0.0 {
                println!(
                    "{}",
                    format!("Saved ${:.6} with prompt caching", cost.cache_savings()).green()
                );
            }
        }

        Commands::Config { init } => {
            let path = Config::path()?;
            if init {
                if Config::exists() {
                    println!("Config already exists at {}", path.display());
                } else {
                    Config::default().save()?;
                    println!("{} Wrote {}", "✓".green(), path.display());
                }
            }

            let config = load_config(cli.stub)?;
            println!("{}", format!("# {}", path.display()).dimmed());
            print!("{}", toml::to_string_pretty(&config)?);
            let key = if config::api_key_from_env().is_some() {
                "set".green()
            } else {
                "not set".yellow()
            };
            println!("{}", format!("# {}: {}", config::API_KEY_ENV, key).dimmed());
        }
    }

    Ok(())
}
