use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{or_none, DatabaseManager, PgTenantStore, Tenant};
use crate::offboard::{
    locate_tenant, DeletionPlan, OffboardError, OffboardReport, Offboarder, Resolution, StepOutcome,
};
use crate::services::{DomainRouter, SupabaseAuthAdmin, SupabaseStorage, VercelDomains};
use crate::types::RunMode;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Permanently delete a tenant and everything it owns")]
    Delete {
        #[arg(long, help = "Tenant owner email address")]
        email: String,

        #[arg(long, help = "Preview what would be deleted without making changes")]
        dry_run: bool,

        #[arg(long, help = "Skip the confirmation prompt")]
        force: bool,
    },

    #[command(about = "Show the tenant owned by an email address")]
    Show {
        #[arg(long, help = "Tenant owner email address")]
        email: String,
    },

    #[command(about = "Print the table deletion order")]
    Plan,
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat, config: &AppConfig) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Delete { email, dry_run, force } => {
            delete(&email, RunMode::from_flag(dry_run), force, &output_format, config).await
        }
        TenantCommands::Show { email } => {
            let store = connect_store(config).await?;
            let tenant = locate_tenant(&*store, &email).await?;
            match output_format {
                OutputFormat::Json => print_json(&json!({ "tenant": tenant }))?,
                OutputFormat::Text => print_summary(&tenant),
            }
            Ok(())
        }
        TenantCommands::Plan => {
            let plan = DeletionPlan::standard()?;
            match output_format {
                OutputFormat::Json => {
                    let rules: Vec<_> = plan
                        .rules()
                        .iter()
                        .map(|rule| {
                            json!({
                                "table": rule.table,
                                "column": rule.column,
                                "resolution": rule.resolution.label(),
                            })
                        })
                        .collect();
                    print_json(&json!({ "rules": rules }))?;
                }
                OutputFormat::Text => {
                    for set in plan.key_sets() {
                        let (table, column) = set.source();
                        println!("Resolve {} ids from {}.{}", set.name(), table, column);
                    }
                    println!();
                    for (index, rule) in plan.rules().iter().enumerate() {
                        let mode = match rule.resolution {
                            Resolution::Direct => "direct".to_string(),
                            Resolution::Via(set) => format!("in {} ids", set.name()),
                        };
                        println!("{:>3}. {:<36} {:<16} {}", index + 1, rule.table, rule.column, mode);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<PgTenantStore>> {
    config.require_database_url()?;
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::health_check(&pool).await?;
    Ok(Arc::new(PgTenantStore::new(pool)))
}

async fn delete(
    email: &str,
    mode: RunMode,
    force: bool,
    output_format: &OutputFormat,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let plan = DeletionPlan::standard()?;
    let platform = config.require_platform()?.clone();
    let store = connect_store(config).await?;

    let domains: Option<Arc<dyn DomainRouter>> = match config.routing.clone() {
        Some(routing) => Some(Arc::new(VercelDomains::new(routing)?)),
        None => {
            warn!("VERCEL_API_TOKEN or SELLLOCAL_VERCEL_PROJECT_ID not set; domain removal will be skipped");
            None
        }
    };

    let offboarder = Offboarder::new(
        store,
        domains,
        Arc::new(SupabaseStorage::new(platform.clone())),
        Arc::new(SupabaseAuthAdmin::new(platform)),
        plan,
    );

    let text = matches!(output_format, OutputFormat::Text);
    if text {
        println!("Looking up tenant with email: {}", email);
    }
    let tenant = offboarder.locate(email).await?;

    if text {
        print_summary(&tenant);
        if mode.is_dry_run() {
            println!("\n*** DRY RUN MODE - no changes will be made ***");
        }
    }

    if !mode.is_dry_run() && !force {
        let stdin = std::io::stdin();
        let confirmed = match output_format {
            OutputFormat::Text => confirm_deletion(stdin.lock(), std::io::stdout())?,
            OutputFormat::Json => confirm_deletion(stdin.lock(), std::io::stderr())?,
        };
        if !confirmed {
            match output_format {
                OutputFormat::Json => print_json(&json!({ "success": false, "message": "Aborted." }))?,
                OutputFormat::Text => println!("Aborted."),
            }
            return Ok(());
        }
    }

    match offboarder.execute(&tenant, mode).await {
        Ok(report) => {
            match output_format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => {
                    print_report(&report);
                    if mode.is_dry_run() {
                        println!("\n[DRY RUN COMPLETE] No changes were made.");
                    } else {
                        println!(
                            "\nTenant '{}' ({}) has been fully deleted.",
                            or_none(tenant.name.clone()),
                            email
                        );
                    }
                }
            }
            Ok(())
        }
        Err(err) => {
            if let OffboardError::Aborted { report, .. } = &err {
                match output_format {
                    OutputFormat::Json => print_json(report)?,
                    OutputFormat::Text => print_report(report),
                }
            }
            Err(err.into())
        }
    }
}

fn print_summary(tenant: &Tenant) {
    println!("\n--- Tenant Summary ---");
    for (label, value) in tenant.summary_fields() {
        println!("  {}: {}", label, value);
    }
    println!("----------------------");
}

fn print_report(report: &OffboardReport) {
    for step in &report.steps {
        println!("\n[Step {}] {}", step.step.number(), step.step.title());
        match &step.outcome {
            StepOutcome::Succeeded(d) | StepOutcome::Skipped(d) => println!("  {}", d),
            StepOutcome::FailedNonFatal(d) => println!("  WARNING: {}", d),
            StepOutcome::FailedFatal(d) => println!("  ERROR: {}", d),
        }
        for detail in &step.details {
            println!("    {}", detail);
        }
    }
}
