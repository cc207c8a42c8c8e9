//! chainevents CLI — inspect and manage persisted event buckets.
//!
//! # Commands
//! ```text
//! chainevents keys    --db <path>
//! chainevents summary --db <path> --type event --filter coin.TRANSFER
//! chainevents events  --db <path> --type event --filter coin.TRANSFER [--view all|confirmed|orphaned]
//!                     [--min-height N] [--max-height N] [--limit N]
//! chainevents import  --db <path> --type event --filter coin.TRANSFER --permanence unconfirmed --file events.json
//! chainevents remove  --db <path> --type event --filter coin.TRANSFER --permanence unconfirmed
//!                     --height N --request-key <rk> --block-hash <hash> --id <meta.id>
//! chainevents purge   --db <path> --type event --filter coin.TRANSFER
//! chainevents info
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use chainevents_core::{
    BucketStore, Event, EventQuery, EventState, Permanence, StreamType, SubscriptionKey,
    TracingLogger,
};
use chainevents_storage::SqliteStorage;

mod logging;

use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "chainevents",
    about = "Inspect and manage persisted unconfirmed / confirmed / orphaned event buckets",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DbArgs {
    /// SQLite database file
    #[arg(long, env = "CHAINEVENTS_DB", default_value = "./chainevents.db")]
    db: String,
}

#[derive(Args)]
struct SubscriptionArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Stream type: event, account or module
    #[arg(long = "type")]
    stream_type: StreamType,

    /// Subscription filter, e.g. `coin.TRANSFER` or `k:alice`
    #[arg(long)]
    filter: String,
}

impl SubscriptionArgs {
    fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.stream_type, self.filter.clone())
    }
}

#[derive(Args)]
struct IdentityArgs {
    #[arg(long)]
    height: u64,
    #[arg(long)]
    request_key: String,
    #[arg(long)]
    block_hash: String,
    /// `meta.id` of the event
    #[arg(long)]
    id: String,
}

impl IdentityArgs {
    fn needle(&self) -> Event {
        Event::new(
            self.height,
            self.request_key.clone(),
            self.block_hash.clone(),
            "",
            self.id.clone(),
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    All,
    Confirmed,
    Orphaned,
}

#[derive(Subcommand)]
enum Commands {
    /// List every subscription stored in the database
    Keys {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Print bucket counts for a subscription
    Summary {
        #[command(flatten)]
        sub: SubscriptionArgs,
    },
    /// Print events as JSON, newest first
    Events {
        #[command(flatten)]
        sub: SubscriptionArgs,
        #[arg(long, value_enum, default_value = "all")]
        view: View,
        #[arg(long)]
        min_height: Option<u64>,
        #[arg(long)]
        max_height: Option<u64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add events from a JSON array file into one bucket (duplicates are skipped)
    Import {
        #[command(flatten)]
        sub: SubscriptionArgs,
        /// Target bucket: unconfirmed, confirmed or orphaned
        #[arg(long)]
        permanence: Permanence,
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove one event from a bucket, identified by its identity fields
    Remove {
        #[command(flatten)]
        sub: SubscriptionArgs,
        /// Bucket to remove from: unconfirmed, confirmed or orphaned
        #[arg(long)]
        permanence: Permanence,
        #[command(flatten)]
        target: IdentityArgs,
    },
    /// Delete every bucket of a subscription
    Purge {
        #[command(flatten)]
        sub: SubscriptionArgs,
    },
    /// Show build info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&LogConfig {
        level: cli.log_level.clone(),
        json: cli.json_logs,
        ..Default::default()
    });

    match cli.command {
        Commands::Keys { db } => cmd_keys(&db).await,
        Commands::Summary { sub } => cmd_summary(&sub).await,
        Commands::Events {
            sub,
            view,
            min_height,
            max_height,
            limit,
        } => {
            let query = EventQuery {
                min_height,
                max_height,
                limit,
            };
            cmd_events(&sub, view, &query).await
        }
        Commands::Import {
            sub,
            permanence,
            file,
        } => cmd_import(&sub, permanence, &file).await,
        Commands::Remove {
            sub,
            permanence,
            target,
        } => cmd_remove(&sub, permanence, &target).await,
        Commands::Purge { sub } => cmd_purge(&sub).await,
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

async fn open_store(db: &DbArgs) -> Result<Arc<SqliteStorage>> {
    let store = SqliteStorage::open(&db.db)
        .await
        .with_context(|| format!("opening database {}", db.db))?;
    Ok(Arc::new(store))
}

async fn load_state(sub: &SubscriptionArgs) -> Result<EventState> {
    let store = open_store(&sub.db).await?;
    let key = sub.key();
    let label = key.to_string();
    let logger = Arc::new(TracingLogger::new(label.clone()));
    let mut state = EventState::new(key, store, logger);
    state
        .load()
        .await
        .with_context(|| format!("loading {label}"))?;
    Ok(state)
}

async fn cmd_keys(db: &DbArgs) -> Result<()> {
    let store = open_store(db).await?;
    for key in store.keys().await? {
        println!("{key}");
    }
    Ok(())
}

async fn cmd_summary(sub: &SubscriptionArgs) -> Result<()> {
    let state = load_state(sub).await?;
    println!("{} {}", state.key(), state.summary());
    Ok(())
}

async fn cmd_events(sub: &SubscriptionArgs, view: View, query: &EventQuery) -> Result<()> {
    let state = load_state(sub).await?;
    let events = match view {
        View::All => state.get_all_events(query),
        View::Confirmed => state.get_confirmed_events(query),
        View::Orphaned => state.get_orphaned_events(query),
    };
    let records: Vec<&Event> = events.iter().map(|e| &**e).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_import(sub: &SubscriptionArgs, permanence: Permanence, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let incoming: Vec<Event> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    let mut state = load_state(sub).await?;
    let total = incoming.len();
    let mut added = 0usize;
    for event in incoming {
        if state.add(permanence, event) {
            added += 1;
        }
    }
    state.save().await.context("saving event state")?;

    info!(subscription = %state.key(), %permanence, added, total, "import finished");
    println!(
        "added {added} of {total} events to {permanence}; {}",
        state.summary()
    );
    Ok(())
}

async fn cmd_remove(
    sub: &SubscriptionArgs,
    permanence: Permanence,
    target: &IdentityArgs,
) -> Result<()> {
    let mut state = load_state(sub).await?;
    let stored = state.find(permanence, &target.needle()).with_context(|| {
        format!(
            "no event {} at height {} with id {} in {permanence}",
            target.request_key, target.height, target.id
        )
    })?;
    state.remove(permanence, &stored);
    state.save().await.context("saving event state")?;

    info!(subscription = %state.key(), %permanence, height = stored.height, "event removed");
    println!(
        "removed {} {} from {permanence}; {}",
        stored.request_key,
        stored.name,
        state.summary()
    );
    Ok(())
}

async fn cmd_purge(sub: &SubscriptionArgs) -> Result<()> {
    let store = open_store(&sub.db).await?;
    let key = sub.key();
    store.delete(&key).await?;
    println!("purged {key}");
    Ok(())
}

fn cmd_info() {
    println!("ChainEvents v{}", env!("CARGO_PKG_VERSION"));
    println!("  Buckets: unconfirmed, confirmed, orphaned (newest first)");
    println!("  Stream types: event, account, module");
    println!("  Storage backends: memory, SQLite (feature: sqlite)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_parses_identity_fields() {
        let cli = Cli::try_parse_from([
            "chainevents",
            "remove",
            "--db",
            "/tmp/events.db",
            "--type",
            "event",
            "--filter",
            "coin.TRANSFER",
            "--permanence",
            "orphaned",
            "--height",
            "4200",
            "--request-key",
            "rk-1",
            "--block-hash",
            "bh-1",
            "--id",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Remove {
                sub,
                permanence,
                target,
            } => {
                assert_eq!(sub.key(), SubscriptionKey::new(StreamType::Event, "coin.TRANSFER"));
                assert_eq!(permanence, Permanence::Orphaned);
                let needle = target.needle();
                assert!(chainevents_core::identical(
                    &needle,
                    &Event::new(4200, "rk-1", "bh-1", "coin.TRANSFER", "3")
                ));
            }
            _ => panic!("expected remove command"),
        }
    }

    #[test]
    fn unknown_stream_type_is_rejected() {
        let parsed = Cli::try_parse_from([
            "chainevents", "summary", "--type", "block", "--filter", "x",
        ]);
        assert!(parsed.is_err());
    }
}
