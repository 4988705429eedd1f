use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use migrundo::{FileStore, JournalStore, MigrateConfig, MigrationPlan, Migrator, UndoEngine};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "migrundo")]
#[command(about = "Reversible migrations for JSON document stores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a migration plan as one journaled run
    Migrate {
        /// Plan file (JSON array of operations)
        #[arg(long)]
        plan: PathBuf,
        /// Store file (falls back to MIGRUNDO_STORE)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Journal directory (falls back to MIGRUNDO_JOURNAL_DIR)
        #[arg(long)]
        journal_dir: Option<PathBuf>,
        /// Record what would happen without touching the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Invert a recorded run, optionally scoped to one document
    Undo {
        /// Tag of the run to invert
        tag: Option<String>,
        /// Restrict undo to this document identifier
        id: Option<String>,
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        journal_dir: Option<PathBuf>,
    },
    /// List recorded runs
    List {
        #[arg(long)]
        journal_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Migrate {
            plan,
            store,
            journal_dir,
            dry_run,
        } => migrate(plan, store, journal_dir, dry_run),
        Command::Undo {
            tag,
            id,
            store,
            journal_dir,
        } => undo(tag, id.as_deref(), store, journal_dir),
        Command::List { journal_dir } => list(journal_dir),
    }
}

fn migrate(
    plan: PathBuf,
    store: Option<PathBuf>,
    journal_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let config = MigrateConfig::resolve(store, journal_dir, dry_run)?;
    let plan = MigrationPlan::from_file(&plan)?;
    let store = FileStore::open(&config.store_path)
        .with_context(|| format!("opening store '{}'", config.store_path.display()))?;

    let run = Migrator::new(&store, &config.journal_dir, config.dry_run).run(&plan)?;
    println!(
        "run {}: {} applied, {} failed, {} previewed (journal: {})",
        run.tag,
        run.successes(),
        run.errors(),
        run.dry_runs(),
        config.journal_dir.join(format!("{}.jsonl", run.tag)).display(),
    );
    Ok(())
}

fn undo(
    tag: Option<String>,
    id: Option<&str>,
    store: Option<PathBuf>,
    journal_dir: Option<PathBuf>,
) -> Result<()> {
    // Checked before any store is opened.
    let Some(tag) = tag else {
        bail!("usage: migrundo undo <TAG> [ID]");
    };
    let config = MigrateConfig::resolve(store, journal_dir, false)?;
    let journals = JournalStore::new(&config.journal_dir);
    if !journals.exists(&tag) {
        bail!(
            "no journal found for tag '{tag}' in '{}'",
            config.journal_dir.display()
        );
    }

    let store = FileStore::open(&config.store_path)
        .with_context(|| format!("opening store '{}'", config.store_path.display()))?;
    let summary = UndoEngine::new(&store, journals).undo(&tag, id)?;
    // Individual failed inversions are logged, not fatal.
    println!("undo {tag}: {summary}");
    Ok(())
}

fn list(journal_dir: Option<PathBuf>) -> Result<()> {
    let dir = journal_dir.unwrap_or_else(|| {
        std::env::var(migrundo::config::ENV_JOURNAL_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(migrundo::config::DEFAULT_JOURNAL_DIR))
    });
    let journals = JournalStore::new(&dir);
    let tags = journals.list_tags()?;
    if tags.is_empty() {
        println!("no journals in '{}'", dir.display());
        return Ok(());
    }
    for tag in tags {
        match journals.load(&tag) {
            Ok(run) => println!(
                "{tag}  {}  {} actions ({} success, {} error, {} dryRun)",
                run.created_at.to_rfc3339(),
                run.actions.len(),
                run.successes(),
                run.errors(),
                run.dry_runs(),
            ),
            Err(e) => println!("{tag}  <unreadable: {e}>"),
        }
    }
    Ok(())
}
