use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crmdb_core::config::CrmConfig;
use crmdb_core::migration::{Direction, MigrationSet};
use crmdb_runtime::migrations::{
    load_migration_set, scaffold_migration, MigrationRunner, PgMigrationStore, RunReport,
};
use crmdb_runtime::Database;

use super::init::CONFIG_FILE;
use super::logging::init_logging;

/// Manage database migrations.
#[derive(Parser)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,

    /// Configuration file path.
    #[arg(short, long, default_value = CONFIG_FILE, global = true)]
    pub config: String,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Apply pending migrations.
    Up {
        /// Stop after this version instead of applying everything.
        #[arg(long)]
        to: Option<String>,
    },

    /// Revert applied migrations (the last one by default).
    Down {
        /// Number of migrations to revert.
        #[arg(default_value = "1", conflicts_with_all = ["to", "all"])]
        count: usize,

        /// Revert everything newer than this version.
        #[arg(long, conflicts_with = "all")]
        to: Option<String>,

        /// Revert every applied migration.
        #[arg(long)]
        all: bool,
    },

    /// Show applied and pending migrations.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the SQL script between two versions without touching the database.
    Script {
        /// Version the database is at (defaults to an empty database).
        #[arg(long)]
        from: Option<String>,

        /// Version to end at (defaults to the latest, or to empty with --down).
        #[arg(long)]
        to: Option<String>,

        /// Emit the revert script instead.
        #[arg(long)]
        down: bool,

        /// Leave out version-history statements.
        #[arg(long)]
        no_history: bool,
    },

    /// Check offline that every migration applies and reverts exactly.
    Verify,

    /// List known migrations.
    List,

    /// Create an empty SQL migration pair in the migrations directory.
    New {
        /// Migration name, e.g. add_invoice_table.
        name: String,
    },
}

impl MigrateCommand {
    pub async fn execute(self) -> Result<()> {
        // Load .env if present
        dotenvy::dotenv().ok();

        let config_path = Path::new(&self.config);
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match self.action {
            MigrateAction::Script {
                from,
                to,
                down,
                no_history,
            } => {
                let config = load_offline_config(config_path)?;
                let set = load_migration_set(&config.migrations, &base_dir)?;
                let direction = if down { Direction::Down } else { Direction::Up };
                let history = (!no_history).then_some(config.migrations.history_table.as_str());

                // Revert scripts start from the latest version unless told otherwise
                let from = match (direction, from) {
                    (Direction::Down, None) => set.latest().map(|m| m.version.clone()),
                    (_, from) => from,
                };
                print!(
                    "{}",
                    set.script(from.as_deref(), to.as_deref(), direction, history)?
                );
                return Ok(());
            }
            MigrateAction::Verify => {
                let config = load_offline_config(config_path)?;
                init_logging(&config.logging, self.verbose);
                let set = load_migration_set(&config.migrations, &base_dir)?;
                let snapshot = set.verify()?;

                println!();
                println!(
                    "  {} {} migration(s) apply and revert cleanly ({} tables)",
                    style("✓").green(),
                    set.len(),
                    snapshot.tables().count()
                );
                println!();
                return Ok(());
            }
            MigrateAction::List => {
                let config = load_offline_config(config_path)?;
                let set = load_migration_set(&config.migrations, &base_dir)?;
                print_list(&set);
                return Ok(());
            }
            MigrateAction::New { name } => {
                let config = load_offline_config(config_path)?;
                let dir = base_dir.join(&config.migrations.directory);
                let (up, down) = scaffold_migration(&dir, &name, chrono::Utc::now())?;
                println!("  {} Created {}", style("✓").green(), up.display());
                println!("  {} Created {}", style("✓").green(), down.display());
                return Ok(());
            }
            _ => {}
        }

        if !config_path.exists() {
            bail!(
                "Configuration file not found: {}\nRun `crmdb init` to create one.",
                self.config
            );
        }
        let config = CrmConfig::from_file(config_path)?;
        init_logging(&config.logging, self.verbose);

        let set = load_migration_set(&config.migrations, &base_dir)?;
        debug!("Loaded {} migrations", set.len());

        let db = Database::from_config(&config.database).await?;
        info!(
            history_table = %config.migrations.history_table,
            "Connected to database"
        );
        let runner = MigrationRunner::new(PgMigrationStore::from_config(&db, &config));

        let result = run_online(self.action, &runner, &set).await;
        db.close().await;
        result
    }
}

async fn run_online(
    action: MigrateAction,
    runner: &MigrationRunner<PgMigrationStore>,
    set: &MigrationSet,
) -> Result<()> {
    match action {
        MigrateAction::Up { to } => {
            print_header("Migrations");
            let report = runner.apply(set, to.as_deref()).await?;
            print_report(&report);
        }
        MigrateAction::Down { count, to, all } => {
            print_header("Migrations");
            let report = if all {
                runner.revert(set, None).await?
            } else if let Some(target) = to {
                runner.revert(set, Some(&target)).await?
            } else {
                runner.rollback(set, count).await?
            };
            print_report(&report);
        }
        MigrateAction::Status { json } => {
            let status = runner.status(set).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            print_header("Migration Status");
            if status.applied.is_empty() && status.pending.is_empty() {
                println!("  {} No migrations found", style("ℹ").blue());
                println!();
                return Ok(());
            }

            if !status.applied.is_empty() {
                println!("  {} Applied:", style("✓").green());
                for m in &status.applied {
                    println!(
                        "    {} {} {} ({}, {} ms)",
                        style(&m.version).dim(),
                        style(&m.name).cyan(),
                        style("at").dim(),
                        m.applied_at.format("%Y-%m-%d %H:%M:%S"),
                        m.execution_time_ms
                    );
                }
            }

            if !status.pending.is_empty() {
                if !status.applied.is_empty() {
                    println!();
                }
                println!("  {} Pending:", style("○").yellow());
                for m in &status.pending {
                    println!(
                        "    {} {} {}",
                        style("→").dim(),
                        style(&m.version).dim(),
                        style(&m.name).yellow()
                    );
                }
            }

            println!();
            println!(
                "  {} {} applied, {} pending",
                style("ℹ").blue(),
                status.applied.len(),
                status.pending.len()
            );
            println!();
        }
        MigrateAction::Script { .. }
        | MigrateAction::Verify
        | MigrateAction::List
        | MigrateAction::New { .. } => {}
    }

    Ok(())
}

/// Config for commands that never connect: a missing file means defaults.
fn load_offline_config(path: &Path) -> Result<CrmConfig> {
    if path.exists() {
        Ok(CrmConfig::from_file(path)?)
    } else {
        Ok(CrmConfig::default_with_database_url(""))
    }
}

fn print_header(title: &str) {
    println!();
    println!("  {} {}", style("crmdb").bold().cyan(), title);
    println!();
}

fn print_report(report: &RunReport) {
    if report.steps.is_empty() {
        println!("  {} Nothing to do", style("ℹ").blue());
    } else {
        let verb = match report.direction {
            Direction::Up => "Applied",
            Direction::Down => "Reverted",
        };
        for step in &report.steps {
            println!(
                "  {} {}: {}_{} ({} ms)",
                style("✓").green(),
                verb,
                step.version,
                step.name,
                step.elapsed_ms
            );
        }
    }

    println!();
    println!(
        "  {} Schema version: {} → {}",
        style("ℹ").blue(),
        report.from.as_deref().unwrap_or("(empty)"),
        report.to.as_deref().unwrap_or("(empty)")
    );
    println!();
}

fn print_list(set: &MigrationSet) {
    print_header("Known Migrations");
    for migration in set.iter() {
        println!(
            "    {} {} {}",
            style(&migration.version).dim(),
            style(&migration.name).cyan(),
            style(&migration.checksum()[..12]).dim()
        );
    }
    println!();
    println!("  {} {} migration(s)", style("ℹ").blue(), set.len());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_offline_config_defaults_without_file() {
        let config = load_offline_config(Path::new("/nonexistent/crmdb.toml")).unwrap();
        assert!(config.migrations.include_catalog);
        assert_eq!(config.migrations.directory, "migrations");
    }

    #[test]
    fn test_offline_config_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[database]\nurl = \"postgres://localhost/crm\"\n\n[migrations]\ninclude_catalog = false\n",
        )
        .unwrap();

        let config = load_offline_config(&path).unwrap();
        assert!(!config.migrations.include_catalog);
    }

    #[test]
    fn test_default_set_seeds_admin_user() {
        use crmdb_core::schema::SqlValue;
        use crmdb_runtime::catalog::ADMIN_EMAIL;

        let config = CrmConfig::default_with_database_url("");
        let set = load_migration_set(&config.migrations, Path::new("/nonexistent")).unwrap();
        let snapshot = set.verify().unwrap();

        let users = snapshot.table("Users").unwrap();
        assert_eq!(users.rows.len(), 1);
        assert_eq!(users.rows[0]["Email"], SqlValue::from(ADMIN_EMAIL));
    }

    #[tokio::test]
    async fn test_new_then_verify_offline() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &config,
            "[database]\nurl = \"postgres://localhost/crm\"\n",
        )
        .unwrap();

        let new = MigrateCommand {
            action: MigrateAction::New {
                name: "add_invoices".into(),
            },
            config: config.display().to_string(),
            verbose: false,
        };
        new.execute().await.unwrap();

        let entries = std::fs::read_dir(dir.path().join("migrations"))
            .unwrap()
            .count();
        assert_eq!(entries, 2);

        let verify = MigrateCommand {
            action: MigrateAction::Verify,
            config: config.display().to_string(),
            verbose: false,
        };
        verify.execute().await.unwrap();
    }
}
