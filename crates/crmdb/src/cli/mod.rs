mod init;
mod logging;
mod migrate;

pub use init::InitCommand;
pub use migrate::MigrateCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// crmdb - versioned, reversible schema migrations for the CRM database
#[derive(Parser)]
#[command(name = "crmdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create crmdb.toml in the current directory.
    Init(InitCommand),

    /// Manage database migrations.
    Migrate(MigrateCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Init(cmd) => cmd.execute().await,
            Commands::Migrate(cmd) => cmd.execute().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrate::MigrateAction;

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::try_parse_from(["crmdb", "init", "--name", "crm"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_migrate_up_to() {
        let cli = Cli::try_parse_from(["crmdb", "migrate", "up", "--to", "20240216160000"]).unwrap();
        match cli.command {
            Commands::Migrate(cmd) => match cmd.action {
                MigrateAction::Up { to } => assert_eq!(to.as_deref(), Some("20240216160000")),
                _ => panic!("expected up"),
            },
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_cli_parse_migrate_down_defaults_to_one() {
        let cli = Cli::try_parse_from(["crmdb", "migrate", "down"]).unwrap();
        match cli.command {
            Commands::Migrate(cmd) => match cmd.action {
                MigrateAction::Down { count, to, all } => {
                    assert_eq!(count, 1);
                    assert!(to.is_none());
                    assert!(!all);
                }
                _ => panic!("expected down"),
            },
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_cli_parse_global_config() {
        let cli = Cli::try_parse_from(["crmdb", "migrate", "status", "--json", "-c", "other.toml"])
            .unwrap();
        match cli.command {
            Commands::Migrate(cmd) => assert_eq!(cmd.config, "other.toml"),
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_down_flags() {
        let cli = Cli::try_parse_from(["crmdb", "migrate", "down", "--all", "--to", "20240110093000"]);
        assert!(cli.is_err());
    }
}
