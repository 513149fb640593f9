mod create;
mod ui;

use std::path::Path;

use anyhow::Result;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use console::style;

use strata_core::version::VersionId;
use strata_core::StrataConfig;
use strata_runtime::adapter;
use strata_runtime::catalog::MigrationCatalog;
use strata_runtime::migrator::{Migrator, Outcome};
use strata_runtime::store::{HistoryEntry, HistoryStore};

/// strata - versioned database schema migrations.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path.
    #[arg(short, long, default_value = "strata.toml", global = true)]
    pub config: String,

    /// Answer yes to every confirmation prompt.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

/// CLI commands. Running with no command applies all pending migrations.
#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending migrations, all of them or the next N.
    Up {
        /// Apply at most this many migrations.
        count: Option<usize>,
    },

    /// Revert the most recently applied migrations.
    Down {
        /// Number of migrations to revert.
        #[arg(default_value = "1")]
        count: usize,
    },

    /// Migrate up or down until the given version is the current one.
    To {
        /// Target version: a timestamp (210101_120000) or a full identifier.
        version: String,
    },

    /// Set the migration history at a version without running anything.
    Mark {
        /// Target version: a timestamp (210101_120000) or a full identifier.
        version: String,
    },

    /// Revert and immediately re-apply the most recent migrations.
    Redo {
        /// Number of migrations to redo.
        #[arg(default_value = "1")]
        count: usize,
    },

    /// Show previously applied migrations.
    History {
        /// Show only the last N entries.
        count: Option<usize>,
    },

    /// Show migrations that have not been applied yet.
    New {
        /// Show at most the next N entries.
        count: Option<usize>,
    },

    /// Create a new migration skeleton in the migrations directory.
    Create {
        /// Migration name (letters, digits and underscores).
        name: String,
    },
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        // Load .env if present
        dotenvy::dotenv().ok();

        let config_path = Path::new(&self.config);
        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nCreate a strata.toml with a [database] section.",
                self.config
            );
        }
        let config = StrataConfig::from_file(&self.config)?;

        let command = self.command.unwrap_or(Commands::Up { count: None });

        // Skeleton creation works on the filesystem only.
        if let Commands::Create { name } = &command {
            return create::create_migration(&config.migrations.dir, name, self.yes);
        }

        let adapter = adapter::connect(&config.database).await?;
        let catalog = MigrationCatalog::new(&config.migrations.dir);
        let store = HistoryStore::new(adapter.clone(), &config.migrations.table);
        let ui = Box::new(ui::ConsoleUi::new(self.yes));
        let migrator = Migrator::new(catalog, store, adapter, ui);

        match command {
            Commands::Up { count } => report_outcome(migrator.up(count).await?),
            Commands::Down { count } => report_outcome(migrator.down(count).await?),
            Commands::To { version } => report_outcome(migrator.to(&version).await?),
            Commands::Mark { version } => report_outcome(migrator.mark(&version).await?),
            Commands::Redo { count } => report_outcome(migrator.redo(count).await?),
            Commands::History { count } => {
                print_history(migrator.history(limit(count)).await?, count)
            }
            Commands::New { count } => print_pending(migrator.pending(count).await?),
            Commands::Create { .. } => unreachable!("handled before connecting"),
        }

        Ok(())
    }
}

fn limit(count: Option<usize>) -> i64 {
    count.map(|n| n as i64).unwrap_or(-1)
}

fn report_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Applied(steps) => {
            println!(
                "\n{} Migrated up successfully ({} applied).",
                style("✓").green(),
                steps.len()
            );
        }
        Outcome::Reverted(steps) => {
            println!(
                "\n{} Migrated down successfully ({} reverted).",
                style("✓").green(),
                steps.len()
            );
        }
        Outcome::Redone { applied, .. } => {
            println!(
                "\n{} Migration redone successfully ({} migrations).",
                style("✓").green(),
                applied.len()
            );
        }
        Outcome::Marked { versions, forward } => {
            let direction = if forward { "forward" } else { "backward" };
            println!(
                "\n{} The migration history was set {} ({} entries).\nNo actual migration was performed.",
                style("✓").green(),
                direction,
                versions.len()
            );
        }
        Outcome::UpToDate => {
            println!(
                "{} No new migrations found. Your system is up-to-date.",
                style("ℹ").blue()
            );
        }
        Outcome::NothingApplied => {
            println!(
                "{} No migration has been applied before.",
                style("ℹ").blue()
            );
        }
        Outcome::AlreadyAt(version) => {
            println!(
                "{} Already at '{}'. Nothing needs to be done.",
                style("ℹ").blue(),
                version
            );
        }
        Outcome::Cancelled => {
            println!("{} Cancelled.", style("ℹ").blue());
        }
    }
}

fn print_history(entries: Vec<HistoryEntry>, count: Option<usize>) {
    let n = entries.len();
    if count.is_some() {
        println!(
            "Showing the last {} applied {}:",
            n,
            if n == 1 { "migration" } else { "migrations" }
        );
    } else {
        println!(
            "Total {} {} been applied before:",
            n,
            if n == 1 {
                "migration has"
            } else {
                "migrations have"
            }
        );
    }
    for entry in entries {
        let when = DateTime::from_timestamp(entry.applied_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "invalid time".to_string());
        println!("    ({}) {}", style(when).dim(), entry.version);
    }
}

fn print_pending(pending: Vec<VersionId>) {
    if pending.is_empty() {
        println!(
            "{} No new migrations found. Your system is up-to-date.",
            style("ℹ").blue()
        );
        return;
    }
    let n = pending.len();
    println!(
        "Found {} new {}:",
        n,
        if n == 1 { "migration" } else { "migrations" }
    );
    for version in pending {
        println!("    {}", style(version.as_str()).yellow());
    }
}
