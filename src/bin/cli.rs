//! Kindred CLI - exercise the companion core from a terminal
//!
//! Runs fully offline by default; set KINDRED_OPENAI_API_KEY to talk to a
//! real model.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use kindred::chat::ChatService;
use kindred::config::Config;
use kindred::llm::create_language_model;
use kindred::realtime::EventBus;
use kindred::storage::{KeyValueStore, SqliteStore};
use kindred::store::TwinStore;

#[derive(Parser)]
#[command(name = "kindred-cli", version, about = "AI companion core CLI")]
struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User id the local state belongs to
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat with the twin
    Chat,
    /// Record a mood entry
    Mood {
        mood: String,
        /// Intensity 1-10 (out-of-range values are clamped)
        intensity: i64,
        #[arg(long)]
        context: Option<String>,
    },
    /// Show the mood trend
    Trend,
    /// Show personality insights
    Insights,
    /// Clear profile, sessions, and mood history
    Reset,
}

fn db_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.db {
        return Ok(path.clone());
    }
    let dir = dirs::data_dir()
        .context("Could not determine platform data directory")?
        .join("kindred");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("kindred.db"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(db_path(&cli)?)?);
    let mut store = TwinStore::load(kv.as_ref(), &cli.user).await;
    if let Some(error) = store.error() {
        eprintln!("warning: {}", error);
        store.clear_error();
    }
    store.initialize_profile();

    match cli.command {
        Command::Chat => {
            let llm = create_language_model(&config, kv.clone())?;
            println!("Chatting via {} (ctrl-d to quit)", llm.name());

            let chat = ChatService::new(Arc::new(Mutex::new(store)), llm, kv, EventBus::new());

            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                match chat.send_message(line.trim()).await {
                    Ok(reply) => println!("{}", reply.content),
                    Err(e) => eprintln!("error: {}", e.to_api_error()),
                }
            }
        }
        Command::Mood {
            mood,
            intensity,
            context,
        } => {
            store.update_mood(mood, intensity, context);
            store.persist(kv.as_ref()).await?;
            let trend = store.mood_trend();
            println!(
                "Recorded. {} entries, average {:.1}, trend {}",
                store.mood_history().len(),
                trend.average,
                trend.trend
            );
        }
        Command::Trend => {
            let trend = store.mood_trend();
            println!("average {:.1}, trend {}", trend.average, trend.trend);
        }
        Command::Insights => {
            for insight in store.personality_insights() {
                println!("- {}", insight);
            }
        }
        Command::Reset => {
            store.reset();
            store.persist(kv.as_ref()).await?;
            println!("State cleared.");
        }
    }

    Ok(())
}
