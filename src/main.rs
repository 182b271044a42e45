use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hivemind_core::{now_ms, HierarchyLevel, SessionMode};
use hivemind_session::{inspect, InspectAction, SessionService};
use hivemind_state::{AnchorsState, HivemindPaths, MemsState, StateManager};

#[derive(Parser)]
#[command(name = "hivemind", about = "Context governance for agent coding sessions")]
struct Cli {
    /// Project root containing (or receiving) the .hivemind directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Emit structured JSON instead of human-readable text
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a new session with a focus statement
    Start {
        /// What this session is about
        focus: String,

        /// Session mode: plan_driven, quick_fix, or exploration
        #[arg(long, default_value = "plan_driven")]
        mode: String,
    },

    /// Refocus the active session at a hierarchy level
    Update {
        /// The new focus content
        content: String,

        /// Hierarchy level: trajectory, tactic, or action
        #[arg(long, default_value = "tactic")]
        level: String,
    },

    /// Archive the active session and export a snapshot
    Close {
        /// One-line summary for the archive
        #[arg(long)]
        summary: Option<String>,
    },

    /// Show the current session state
    Status,

    /// List archived sessions, or start fresh work based on one
    Resume {
        /// Archived session id to resume from
        session_id: Option<String>,
    },

    /// Collapse fully-completed subtrees into summary lines
    Prune,

    /// Upgrade a legacy flat .hivemind layout in place
    Migrate,

    /// Read-only reports: scan, deep, or drift
    Inspect {
        /// Report kind
        #[arg(default_value = "scan")]
        action: String,
    },

    /// Save an immutable key/value constraint
    Anchor {
        key: String,
        value: String,
    },

    /// Remove an anchor by key
    Unanchor {
        key: String,
    },

    /// Save a categorized long-term memory
    Mem {
        content: String,

        /// Shelf: decisions, patterns, errors, solutions, or custom
        #[arg(long, default_value = "decisions")]
        shelf: String,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Search memories by substring over content and tags
    Recall {
        query: String,

        /// Restrict to one shelf
        #[arg(long)]
        shelf: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hivemind=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let service = SessionService::new(&cli.root);

    let output = match cli.command {
        Command::Start { focus, mode } => {
            let Some(mode) = SessionMode::parse(&mode) else {
                bail!("unknown mode '{mode}' (expected plan_driven, quick_fix, or exploration)");
            };
            service.start(mode, &focus, cli.json).await?
        }
        Command::Update { content, level } => {
            let Some(level) = HierarchyLevel::parse(&level) else {
                bail!("unknown level '{level}' (expected trajectory, tactic, or action)");
            };
            service.update(level, &content, cli.json).await?
        }
        Command::Close { summary } => service.close(summary.as_deref(), cli.json).await?,
        Command::Status => service.status(cli.json).await?,
        Command::Resume { session_id } => {
            service.resume(session_id.as_deref(), cli.json).await?
        }
        Command::Prune => service.prune(cli.json).await?,
        Command::Migrate => service.migrate(cli.json).await?,
        Command::Inspect { action } => {
            let Some(action) = InspectAction::parse(&action) else {
                bail!("unknown inspect action '{action}' (expected scan, deep, or drift)");
            };
            inspect(&cli.root, action, cli.json).await?
        }
        Command::Anchor { key, value } => save_anchor(&cli.root, &key, &value).await?,
        Command::Unanchor { key } => remove_anchor(&cli.root, &key).await?,
        Command::Mem {
            content,
            shelf,
            tags,
        } => save_mem(&cli.root, &shelf, &content, tags.as_deref()).await?,
        Command::Recall { query, shelf } => {
            recall_mems(&cli.root, &query, shelf.as_deref()).await?
        }
    };

    println!("{output}");
    Ok(())
}

async fn active_session_id(root: &std::path::Path) -> String {
    StateManager::new(root)
        .load()
        .await
        .map(|s| s.session.id)
        .unwrap_or_else(|| "none".to_string())
}

async fn save_anchor(root: &std::path::Path, key: &str, value: &str) -> anyhow::Result<String> {
    let paths = HivemindPaths::new(root);
    paths.ensure_directories().await?;
    let session_id = active_session_id(root).await;

    let mut anchors = AnchorsState::load(&paths).await;
    let previous = anchors.upsert(key, value, &session_id, now_ms());
    anchors.save(&paths).await?;

    Ok(match previous {
        Some(old) => format!("Anchor updated: [{key}]: {value} (was: {old})"),
        None => format!("Anchor saved: [{key}]: {value}"),
    })
}

async fn remove_anchor(root: &std::path::Path, key: &str) -> anyhow::Result<String> {
    let paths = HivemindPaths::new(root);
    let mut anchors = AnchorsState::load(&paths).await;
    if !anchors.remove(key) {
        return Ok(format!("No anchor with key [{key}]."));
    }
    anchors.save(&paths).await?;
    Ok(format!("Anchor removed: [{key}]"))
}

async fn save_mem(
    root: &std::path::Path,
    shelf: &str,
    content: &str,
    tags: Option<&str>,
) -> anyhow::Result<String> {
    let paths = HivemindPaths::new(root);
    paths.ensure_directories().await?;
    let session_id = active_session_id(root).await;
    let tags: Vec<String> = tags
        .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    let mut mems = MemsState::load(&paths).await;
    let duplicate = mems.has_duplicate(shelf, content);
    let mem = mems.add(shelf, content, tags, &session_id, now_ms());
    let mut line = format!("Mem saved to [{}]: {} ({})", mem.shelf, mem.content, mem.id);
    let total = mems.mems.len();
    line.push_str(&format!("\n{total} memories on record."));
    if duplicate {
        line.push_str("\nNote: identical content already exists on this shelf.");
    }
    mems.save(&paths).await?;
    Ok(line)
}

async fn recall_mems(
    root: &std::path::Path,
    query: &str,
    shelf: Option<&str>,
) -> anyhow::Result<String> {
    let paths = HivemindPaths::new(root);
    let mems = MemsState::load(&paths).await;
    let hits = mems.search(query, shelf);

    if hits.is_empty() {
        return Ok(format!("No memories matching '{query}'."));
    }
    let mut lines = vec![format!("{} memories matching '{query}':", hits.len())];
    for mem in hits.iter().take(10) {
        lines.push(format!("  [{}] {} ({})", mem.shelf, mem.content, mem.id));
    }
    if hits.len() > 10 {
        lines.push(format!("  ... and {} more", hits.len() - 10));
    }
    Ok(lines.join("\n"))
}
