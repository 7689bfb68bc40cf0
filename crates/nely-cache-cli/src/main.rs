//! nely-cache - inspect and maintain the Nely offline cache.
//!
//! Works against the same file-backed store the app uses, so cached family
//! data can be checked or wiped without launching the app.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nely_cache::{Cache, Clock, Config, FileStore, SystemClock, TtlPreset};
use serde_json::Value;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_HELP: &str = "\
Environment:
  RUST_LOG                  Log filter (default: warn)
  NELY_CACHE_DIR            Override the cache directory
  NELY_CACHE_NAMESPACE      Override the key namespace";

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr, or to a file when `log_file` is set.
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nely-cache", version)]
#[command(about = "Inspect and maintain the Nely offline cache")]
#[command(arg_required_else_help = true, after_help = ENV_HELP)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the cached value for a logical key
    Get { key: String },

    /// Cache a JSON value
    Set {
        key: String,
        json: String,
        /// short, medium, long or very_long (default from config)
        #[arg(value_parser = clap::value_parser!(TtlPreset))]
        ttl: Option<TtlPreset>,
    },

    /// Evict one key
    Remove { key: String },

    /// Evict every key in the cache namespace
    Clear,

    /// List logical keys, expired ones included
    Keys,

    /// Count entries and expired entries
    Stats,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref())?;

    let config = Config::load()?;
    if cli.command == Command::Config {
        return show_config(&config);
    }

    let cache = config.open_cache()?;
    info!(dir = %cache.store().dir().display(), namespace = cache.namespace(), "Cache opened");
    if run(&cache, &config, cli.command).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn show_config(config: &Config) -> Result<ExitCode> {
    let effective = serde_json::json!({
        "config_file": Config::config_path()?,
        "cache_dir": config.cache_dir()?,
        "namespace": config.namespace(),
        "default_ttl": config.default_ttl(),
    });
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(ExitCode::SUCCESS)
}

/// Runs one cache command. `Ok(false)` means the command ran but did not
/// succeed (a miss, or a write that did not stick).
async fn run(cache: &Cache<FileStore>, config: &Config, command: Command) -> Result<bool> {
    match command {
        Command::Get { key } => {
            let Some(entry) = cache.read_entry::<Value>(&key).await else {
                eprintln!("{}: not cached (missing or expired)", key);
                return Ok(false);
            };
            let now = SystemClock.now_millis();
            eprintln!(
                "cached {}, expires in {}s",
                entry.age_display(now),
                entry.remaining(now).as_secs()
            );
            println!("{}", serde_json::to_string_pretty(&entry.data)?);
        }
        Command::Set { key, json, ttl } => {
            let value: Value = serde_json::from_str(&json)
                .with_context(|| format!("Value for '{}' is not valid JSON", key))?;
            let ttl = ttl.unwrap_or_else(|| config.default_ttl());
            cache.write_with_ttl(&key, &value, ttl.duration()).await;

            // Writes are best effort; read back so the user knows if it stuck
            if cache.read::<Value>(&key).await.is_none() {
                eprintln!("{}: write did not persist (see logs)", key);
                return Ok(false);
            }
            eprintln!("{}: cached for {} ({}s)", key, ttl, ttl.duration().as_secs());
        }
        Command::Remove { key } => {
            cache.remove(&key).await;
            eprintln!("{}: removed", key);
        }
        Command::Clear => {
            let before = cache.keys().await.len();
            cache.clear_all().await;
            eprintln!("Cleared {} entries from {}", before, cache.namespace());
        }
        Command::Keys => {
            for key in cache.keys().await {
                println!("{}", key);
            }
        }
        Command::Stats => {
            let stats = cache.stats().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "namespace": cache.namespace(),
                    "entries": stats.entries,
                    "expired": stats.expired,
                }))?
            );
        }
        Command::Config => bail!("config does not operate on the cache"),
    }
    Ok(true)
}
