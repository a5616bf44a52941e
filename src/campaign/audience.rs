//! Audience exports: tenant contacts written as a campaign's `contacts.csv`.
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

use super::CampaignError;
use crate::database::TenantContact;
use crate::types::Audience;

pub fn columns(audience: Audience) -> &'static [&'static str] {
    match audience {
        Audience::NewDashboard => &["email", "name", "slug", "domain", "subscription_status"],
        Audience::ExpiredStore => &[
            "email",
            "name",
            "slug",
            "domain",
            "subscription_status",
            "subscription_ends_at",
        ],
        Audience::FreeTierLaunch => &["email", "name", "slug", "domain"],
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

/// The CSV cells for one contact, in `columns(audience)` order.
pub fn row(audience: Audience, contact: &TenantContact, base_domain: &str) -> Vec<String> {
    let domain = match (&contact.domain, audience) {
        (Some(d), _) if !d.is_empty() => d.clone(),
        // Free-tier stores are reachable on their platform subdomain
        (_, Audience::FreeTierLaunch) => match &contact.slug {
            Some(slug) if !slug.is_empty() => format!("{}.{}", slug, base_domain),
            _ => String::new(),
        },
        _ => String::new(),
    };

    columns(audience)
        .iter()
        .map(|column| match *column {
            "email" => contact.owner_email.clone(),
            "name" => contact.name.clone().unwrap_or_default(),
            "slug" => contact.slug.clone().unwrap_or_default(),
            "domain" => domain.clone(),
            "subscription_status" => contact.subscription_status.clone().unwrap_or_default(),
            "subscription_ends_at" => timestamp(contact.subscription_ends_at),
            _ => String::new(),
        })
        .collect()
}

pub fn write_contacts<W: std::io::Write>(
    writer: W,
    audience: Audience,
    contacts: &[TenantContact],
    base_domain: &str,
) -> Result<(), CampaignError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(columns(audience))?;
    for contact in contacts {
        csv.write_record(row(audience, contact, base_domain))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the audience's contacts file, creating the campaign folder if needed.
pub fn export(
    path: &Path,
    audience: Audience,
    contacts: &[TenantContact],
    base_domain: &str,
) -> Result<(), CampaignError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_contacts(file, audience, contacts, base_domain)
}
