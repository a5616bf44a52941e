use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use std::time::Duration;

use crate::campaign::audience::export;
use crate::campaign::{
    list_campaigns, send_campaign, Campaign, Delivery, DeliveryStatus, Envelope, CONTACTS_FILE,
};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgTenantStore, TenantStore};
use crate::services::ResendClient;
use crate::types::Audience;

#[derive(Subcommand)]
pub enum CampaignCommands {
    #[command(about = "List campaigns that have a template")]
    List,

    #[command(about = "Write an audience's contacts.csv from the tenant table")]
    Fetch {
        #[arg(value_enum, help = "Audience to fetch")]
        audience: Audience,

        #[arg(long, help = "Preview results without writing CSV")]
        dry_run: bool,
    },

    #[command(about = "Send a campaign to every contact in its contacts.csv")]
    Send {
        #[arg(help = "Campaign folder name (e.g. expired-store)")]
        campaign: String,

        #[arg(long, default_value_t = 0.5, help = "Seconds between sends")]
        delay: f64,

        #[arg(long, help = "Preview without sending")]
        dry_run: bool,
    },
}

pub async fn handle(cmd: CampaignCommands, output_format: OutputFormat, config: &AppConfig) -> anyhow::Result<()> {
    match cmd {
        CampaignCommands::List => {
            let campaigns = list_campaigns(&config.campaigns.campaigns_dir)?;
            if campaigns.is_empty() {
                return output_empty_collection(
                    &output_format,
                    "campaigns",
                    &format!("No campaigns found in {}", config.campaigns.campaigns_dir.display()),
                );
            }
            match output_format {
                OutputFormat::Json => print_json(&json!({ "campaigns": campaigns }))?,
                OutputFormat::Text => {
                    for name in campaigns {
                        println!("{}", name);
                    }
                }
            }
            Ok(())
        }
        CampaignCommands::Fetch { audience, dry_run } => fetch(audience, dry_run, &output_format, config).await,
        CampaignCommands::Send { campaign, delay, dry_run } => {
            send(&campaign, delay, dry_run, &output_format, config).await
        }
    }
}

async fn fetch(audience: Audience, dry_run: bool, output_format: &OutputFormat, config: &AppConfig) -> anyhow::Result<()> {
    config.require_database_url()?;
    let pool = DatabaseManager::connect(&config.database).await?;
    let store = PgTenantStore::new(pool);

    let text = matches!(output_format, OutputFormat::Text);
    if text {
        println!("Fetching {} tenants...", audience);
    }
    let contacts = store.list_audience(audience, Utc::now()).await?;

    if contacts.is_empty() {
        return output_empty_collection(output_format, "contacts", &format!("No {} tenants found.", audience));
    }

    if text {
        println!("Found {} tenant(s):\n", contacts.len());
        for c in &contacts {
            println!(
                "  {:40}  {:12}  {}",
                c.owner_email,
                c.subscription_status.as_deref().unwrap_or(""),
                c.slug.as_deref().unwrap_or("")
            );
        }
    }

    let path = config.campaigns.campaigns_dir.join(audience.as_str()).join(CONTACTS_FILE);
    if dry_run {
        match output_format {
            OutputFormat::Json => print_json(&json!({ "audience": audience, "contacts": contacts, "written": false }))?,
            OutputFormat::Text => println!("\n[DRY RUN] No file written."),
        }
        return Ok(());
    }

    export(&path, audience, &contacts, &config.campaigns.base_domain)?;
    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            &format!("Wrote {} contact(s)", contacts.len()),
            Some(json!({ "audience": audience, "path": path.display().to_string(), "count": contacts.len() })),
        ),
        OutputFormat::Text => {
            println!("\nWritten to {}", path.display());
            Ok(())
        }
    }
}

async fn send(
    name: &str,
    delay: f64,
    dry_run: bool,
    output_format: &OutputFormat,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !delay.is_finite() || delay < 0.0 {
        anyhow::bail!("--delay must be a non-negative number of seconds");
    }

    // Live sends need credentials up front
    let client = if dry_run {
        None
    } else {
        let (api_key, from) = config.email.require_sender()?;
        let envelope = Envelope {
            from: from.to_string(),
            reply_to: config.email.reply_to.clone(),
        };
        Some((ResendClient::new(config.email.api_base.clone(), api_key), envelope))
    };

    let campaign = Campaign::open(&config.campaigns.campaigns_dir, name)?;
    let text = matches!(output_format, OutputFormat::Text);

    if text {
        println!("Campaign:  {}", campaign.name);
        println!("Subject:   {}", campaign.template.subject);
        println!("Contacts:  {}", campaign.contacts.len());
        let variables = campaign.template.variables();
        if !variables.is_empty() {
            println!("Variables: {}", variables.into_iter().collect::<Vec<_>>().join(", "));
        }
        if dry_run {
            println!("Mode:      DRY RUN (no emails will be sent)");
        }
        println!();
    }

    let delivery = match &client {
        None => Delivery::DryRun,
        Some((mailer, envelope)) => Delivery::Live {
            mailer,
            envelope: envelope.clone(),
            delay: Duration::from_secs_f64(delay),
        },
    };

    let mut results = Vec::new();
    let summary = send_campaign(&campaign, &delivery, |to, status| {
        if text {
            match status {
                DeliveryStatus::WouldSend => println!("  [DRY RUN] Would send to {}", to),
                DeliveryStatus::Sent { id } => println!("  Sent to {} - id: {}", to, id),
                DeliveryStatus::Failed { error } => println!("  FAILED for {}: {}", to, error),
            }
        } else {
            let (status, detail) = match status {
                DeliveryStatus::WouldSend => ("would_send", None),
                DeliveryStatus::Sent { id } => ("sent", Some(id.clone())),
                DeliveryStatus::Failed { error } => ("failed", Some(error.clone())),
            };
            results.push(json!({ "email": to, "status": status, "detail": detail }));
        }
    })
    .await;

    match output_format {
        OutputFormat::Json => print_json(&json!({
            "campaign": campaign.name,
            "subject": campaign.template.subject,
            "dry_run": dry_run,
            "sent": summary.sent,
            "failed": summary.failed,
            "results": results,
        }))?,
        OutputFormat::Text => println!("\nDone. Sent: {}, Failed: {}", summary.sent, summary.failed),
    }
    Ok(())
}
