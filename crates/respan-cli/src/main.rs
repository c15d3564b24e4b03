//! respan command-line front end.
//!
//! Usage:
//!   # Review a replacement document by document
//!   respan replace "old name" "new name"
//!
//!   # Apply everywhere without review (or just count)
//!   respan batch "old name" "new name" --dry-run
//!
//!   # Inspect and roll back history
//!   respan history
//!   respan restore 42 0
//!
//!   # Move the whole store in and out as JSON
//!   respan import documents.json
//!   respan export documents.json

mod review;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use respan_core::ReplaceParams;
use respan_kernel::{
    Config, EditTarget, LocalStore, ReplaceSession, RestoreTarget, batch_replace,
    edited_documents, restorable_edits, restore,
};
use respan_types::DocumentId;

use crate::review::PromptReviewer;

/// Span-preserving search and replace over a rich-text document store.
#[derive(Parser, Debug)]
#[command(name = "respan")]
#[command(about = "Span-preserving search and replace with review, history, and restore")]
struct Args {
    /// SQLite database holding the local store
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/respan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review each matching document and approve or skip it
    Replace {
        search: String,
        replace: String,
        #[command(flatten)]
        case: CaseFlags,
    },
    /// Replace in every matching document without review
    Batch {
        search: String,
        replace: String,
        #[command(flatten)]
        case: CaseFlags,
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// List edited documents and restorable history entries
    History,
    /// Restore a document from one of its history entries
    Restore {
        /// Document id, e.g. 42 or #42
        id: DocumentId,
        /// History entry index, as shown by `history`
        index: usize,
    },
    /// Merge a whole-store JSON file into the database
    Import { path: PathBuf },
    /// Write the whole store to a JSON file
    Export { path: PathBuf },
}

/// Case matching; the last flag given wins, otherwise the config decides.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
struct CaseFlags {
    /// Match case exactly
    #[arg(short = 'c', long, overrides_with = "ignore_case")]
    case_sensitive: bool,
    /// Ignore case, even if the config says otherwise
    #[arg(short = 'i', long, overrides_with = "case_sensitive")]
    ignore_case: bool,
}

impl CaseFlags {
    fn resolve(self, default: bool) -> bool {
        if self.case_sensitive {
            true
        } else if self.ignore_case {
            false
        } else {
            default
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let db_path = match args.db.clone().or_else(|| config.database_path()) {
        Some(path) => path,
        None => bail!("no data directory available; pass --db"),
    };
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut store = LocalStore::open(&db_path)
        .with_context(|| format!("opening store at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), documents = store.len(), "opened local store");

    match args.command {
        Command::Replace {
            search,
            replace,
            case,
        } => {
            let params = ReplaceParams::new(search, replace, case.resolve(config.case_sensitive));
            cmd_replace(&mut store, params, &config).await
        }
        Command::Batch {
            search,
            replace,
            case,
            dry_run,
        } => {
            let params = ReplaceParams::new(search, replace, case.resolve(config.case_sensitive));
            let report = batch_replace(&mut store, &params, dry_run)?;
            println!("Found:        {}", report.found);
            println!("Replaced:     {}", report.replaced);
            println!("Replacements: {}", report.total_replacements);
            if dry_run {
                println!("(dry run, nothing written)");
            }
            Ok(())
        }
        Command::History => {
            cmd_history(&store);
            Ok(())
        }
        Command::Restore { id, index } => {
            restore(&mut store, id, index, RestoreTarget::LocalOnly, config.remote_delay()).await?;
            println!("{id} restored locally from entry {index}.");
            Ok(())
        }
        Command::Import { path } => {
            let count = store
                .import_file(&path)
                .with_context(|| format!("importing {}", path.display()))?;
            println!("Imported {count} document(s).");
            Ok(())
        }
        Command::Export { path } => {
            store
                .export_file(&path)
                .with_context(|| format!("exporting {}", path.display()))?;
            println!("Exported {} document(s) to {}.", store.len(), path.display());
            Ok(())
        }
    }
}

async fn cmd_replace(store: &mut LocalStore, params: ReplaceParams, config: &Config) -> Result<()> {
    if config.mode.is_remote() {
        tracing::warn!("no remote store is configured for the CLI, editing locally");
    }
    println!("Searching for: '{}'", params.search);
    println!("Replace with:  '{}'", params.replace);
    println!("Case sensitive: {}", if params.case_sensitive { "yes" } else { "no" });

    let mut session = ReplaceSession::new(store, params, EditTarget::LocalOnly)?
        .with_delay(config.remote_delay());
    if session.queue().is_empty() {
        println!("\nNo documents match.");
        return Ok(());
    }
    println!("\nFound {} document(s) with matches.", session.queue().len());

    let mut reviewer = PromptReviewer::new(tokio::io::BufReader::new(tokio::io::stdin()));
    let summary = session.run(&mut reviewer).await;

    println!("\n==================== SUMMARY ====================");
    println!("Documents found:   {}", summary.found);
    println!("Documents updated: {}", summary.applied);
    if summary.restored > 0 {
        println!("Documents restored: {}", summary.restored);
    }
    println!("Documents skipped: {}", summary.skipped);
    if summary.errors > 0 {
        println!("Errors: {}", summary.errors);
    }
    println!("Total replacements: {}", summary.total_replacements);
    Ok(())
}

fn cmd_history(store: &LocalStore) {
    let edited = edited_documents(store);
    if edited.is_empty() {
        println!("No edited documents.");
        return;
    }
    println!("{:<10} {:>6} {:>7} {:>11}  LAST EDIT", "DOCUMENT", "EDITS", "REMOTE", "RESTORABLE");
    for doc in &edited {
        let last = doc
            .last_edit
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:>6} {:>7} {:>11}  {}",
            doc.id.to_string(),
            doc.edits,
            doc.remote_edits,
            doc.restorable,
            last
        );
    }

    let restorable = restorable_edits(store);
    if restorable.is_empty() {
        return;
    }
    println!("\nRestorable entries:");
    for entry in restorable {
        println!(
            "  {} [{}] {} '{}' -> '{}' at {}",
            entry.id,
            entry.index,
            entry.record.mode,
            entry.record.search,
            entry.record.replace,
            entry.record.timestamp.to_rfc3339()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_of(argv: &[&str]) -> CaseFlags {
        match Args::try_parse_from(argv).unwrap().command {
            Command::Replace { case, .. } | Command::Batch { case, .. } => case,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_case_flags_default_to_config() {
        let case = case_of(&["respan", "replace", "a", "b"]);
        assert!(case.resolve(true));
        assert!(!case.resolve(false));
    }

    #[test]
    fn test_ignore_case_overrides_config() {
        let case = case_of(&["respan", "batch", "a", "b", "--ignore-case"]);
        assert!(!case.resolve(true));
        let case = case_of(&["respan", "replace", "a", "b", "-c"]);
        assert!(case.resolve(false));
    }

    #[test]
    fn test_last_case_flag_wins() {
        let case = case_of(&["respan", "replace", "a", "b", "-c", "-i"]);
        assert!(!case.resolve(true));
        let case = case_of(&["respan", "replace", "a", "b", "-i", "-c"]);
        assert!(case.resolve(false));
    }
}
