mod bridge;
mod config;
mod error;
mod logging;
mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::{Direction, HistoryQuery, MultipartSender, OutboundMessage, read_history};
use storage::MessageStore;

use bridge::{BridgeHost, settle_acks};
use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "sendbox.toml";
const DATABASE_FILE: &str = "messages.db";
const BODY_PREVIEW_CHARS: usize = 60;

#[derive(Parser)]
#[command(name = "sendbox")]
#[command(about = "Capture SMS and app notifications, and send messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./sendbox.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON-lines bridge on stdin/stdout
    Serve,
    /// Show stored messages, newest first
    History {
        /// Only messages to or from this address
        #[arg(short, long)]
        origin: Option<String>,
        /// Show at most N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Send a message, split into parts if needed
    Send {
        /// Destination address
        destination: String,
        /// Message text
        body: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.logging.level);

    match cli.command {
        Some(Commands::Serve) | None => {
            let store = Arc::new(open_store(&config)?);
            serve::serve(&config, store).await
        }
        Some(Commands::History { origin, limit }) => cmd_history(&config, origin, limit),
        Some(Commands::Send { destination, body }) => cmd_send(&config, &destination, &body),
    }
}

fn cmd_history(config: &Config, origin: Option<String>, limit: Option<usize>) -> Result<()> {
    let db_path = database_path(config);
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }
    let store = MessageStore::open(&db_path)?;

    let query = HistoryQuery::new(origin, limit.unwrap_or(config.history.default_limit));
    let records = read_history(&store, &query)?;

    if records.is_empty() {
        println!("No messages found.");
        return Ok(());
    }

    println!("{:<16}  {:<16}  {:<4}  BODY", "DATE", "ADDRESS", "DIR");
    println!("{}", "-".repeat(80));

    for record in records {
        let date = Local
            .timestamp_millis_opt(record.timestamp_millis)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let direction = match record.direction {
            Direction::Sent => "out",
            Direction::Received => "in",
        };
        let preview = if record.body.chars().count() > BODY_PREVIEW_CHARS {
            let cut: String = record.body.chars().take(BODY_PREVIEW_CHARS).collect();
            format!("{cut}...")
        } else {
            record.body.clone()
        };
        println!(
            "{date:<16}  {:<16}  {direction:<4}  {}",
            record.origin_id,
            preview.replace('\n', " ")
        );
    }

    Ok(())
}

fn cmd_send(config: &Config, destination: &str, body: &str) -> Result<()> {
    if destination.is_empty() || body.is_empty() {
        let reason = "destination and body cannot be empty".to_string();
        return Err(runtime::Error::InvalidArgument(reason).into());
    }

    let store = Arc::new(open_store(config)?);
    let host = Arc::new(BridgeHost::new(store));
    let sender = MultipartSender::new(host.clone());

    let receipt = sender.send(&OutboundMessage::new(destination, body))?;
    settle_acks(&host, &sender);

    println!("Sent {} part(s) to {destination}", receipt.total_parts);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn database_path(config: &Config) -> PathBuf {
    config.history.database.clone().unwrap_or_else(|| {
        dirs_data_dir()
            .unwrap_or_else(|| ".sendbox".into())
            .join(DATABASE_FILE)
    })
}

fn open_store(config: &Config) -> Result<MessageStore> {
    let db_path = database_path(config);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(MessageStore::open(&db_path)?)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/sendbox"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("sendbox"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("sendbox"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
