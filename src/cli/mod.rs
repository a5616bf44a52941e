pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "selllocal")]
#[command(about = "SellLocal operations - tenant offboarding and email campaigns")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tenant inspection and offboarding")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Email campaign audiences and sending")]
    Campaign {
        #[command(subcommand)]
        cmd: commands::campaign::CampaignCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, output_format, &config).await,
        Commands::Campaign { cmd } => commands::campaign::handle(cmd, output_format, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Audience;
    use commands::campaign::CampaignCommands;
    use commands::tenant::TenantCommands;

    #[test]
    fn parses_delete_flags() {
        let cli = Cli::parse_from(["selllocal", "tenant", "delete", "--email", "a@example.com", "--dry-run"]);
        match cli.command {
            Commands::Tenant { cmd: TenantCommands::Delete { email, dry_run, force } } => {
                assert_eq!(email, "a@example.com");
                assert!(dry_run);
                assert!(!force);
            }
            _ => panic!("expected tenant delete"),
        }
    }

    #[test]
    fn parses_campaign_commands() {
        let cli = Cli::parse_from(["selllocal", "--json", "campaign", "fetch", "free-tier-launch"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Campaign { cmd: CampaignCommands::Fetch { audience: Audience::FreeTierLaunch, dry_run: false } }
        ));

        let cli = Cli::parse_from(["selllocal", "campaign", "send", "expired-store"]);
        match cli.command {
            Commands::Campaign { cmd: CampaignCommands::Send { campaign, delay, dry_run } } => {
                assert_eq!(campaign, "expired-store");
                assert_eq!(delay, 0.5);
                assert!(!dry_run);
            }
            _ => panic!("expected campaign send"),
        }
    }

    #[test]
    fn delete_requires_email() {
        assert!(Cli::try_parse_from(["selllocal", "tenant", "delete"]).is_err());
        assert!(Cli::try_parse_from(["selllocal", "campaign", "fetch", "everyone"]).is_err());
    }
}
