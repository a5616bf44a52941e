use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use super::Campaign;
use crate::services::{EmailSender, OutgoingEmail};

/// Sender addresses applied to every message of a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub reply_to: Option<String>,
}

impl Envelope {
    pub fn list_unsubscribe(&self) -> String {
        let mailbox = self.reply_to.as_deref().unwrap_or(&self.from);
        format!("<mailto:{}?subject=Unsubscribe>", mailbox)
    }

    fn compose(&self, to: &str, subject: &str, html: String) -> OutgoingEmail {
        let mut headers = BTreeMap::new();
        headers.insert("List-Unsubscribe".to_string(), self.list_unsubscribe());
        OutgoingEmail {
            from: self.from.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html,
            reply_to: self.reply_to.clone(),
            headers,
        }
    }
}

/// How a campaign is delivered.
pub enum Delivery<'a> {
    /// Render every message but send nothing.
    DryRun,
    Live {
        mailer: &'a dyn EmailSender,
        envelope: Envelope,
        /// Pause between consecutive sends.
        delay: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    WouldSend,
    Sent { id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Render and deliver one message per contact, reporting each result to
/// `progress` as it happens. A failed send is counted and the loop moves on.
pub async fn send_campaign(
    campaign: &Campaign,
    delivery: &Delivery<'_>,
    mut progress: impl FnMut(&str, &DeliveryStatus),
) -> SendSummary {
    let mut summary = SendSummary::default();

    for (index, contact) in campaign.contacts.iter().enumerate() {
        let html = campaign.template.render(&contact.values);

        let status = match delivery {
            Delivery::DryRun => DeliveryStatus::WouldSend,
            Delivery::Live { mailer, envelope, delay } => {
                if index > 0 && !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                let email = envelope.compose(&contact.email, &campaign.template.subject, html);
                match mailer.send(&email).await {
                    Ok(id) => DeliveryStatus::Sent { id },
                    Err(e) => {
                        warn!(campaign = %campaign.name, to = %contact.email, "Send failed: {}", e);
                        DeliveryStatus::Failed { error: e.to_string() }
                    }
                }
            }
        };

        match status {
            DeliveryStatus::Failed { .. } => summary.failed += 1,
            _ => summary.sent += 1,
        }
        progress(&contact.email, &status);
    }

    summary
}
