//! Email campaigns: one folder per campaign under the campaigns directory,
//! holding a `template.html` and the `contacts.csv` it is sent to.
pub mod audience;
pub mod contacts;
pub mod sender;
pub mod template;

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::Audience;
pub use contacts::{load_contacts, Contact};
pub use sender::{send_campaign, Delivery, DeliveryStatus, Envelope, SendSummary};
pub use template::Template;

pub const TEMPLATE_FILE: &str = "template.html";
pub const CONTACTS_FILE: &str = "contacts.csv";

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Campaign '{name}' not found at {}{}", .dir.display(), Available(.available))]
    NotFound {
        name: String,
        dir: PathBuf,
        available: Vec<String>,
    },

    #[error("No template.html in {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("No contacts.csv in {}; {hint}", .dir.display())]
    MissingContacts { dir: PathBuf, hint: String },

    #[error("Template missing subject line; add <!--subject: Your subject --> at the top of {}", .0.display())]
    MissingSubject(PathBuf),

    #[error("{} has no 'email' column", .0.display())]
    MissingEmailColumn(PathBuf),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

struct Available<'a>(&'a [String]);

impl fmt::Display for Available<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, " (available campaigns: {})", self.0.join(", "))
        }
    }
}

/// Names of campaign folders that contain a template, sorted.
pub fn list_campaigns(campaigns_dir: &Path) -> Result<Vec<String>, CampaignError> {
    if !campaigns_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(campaigns_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && path.join(TEMPLATE_FILE).is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// A campaign folder ready to send: subject and body parsed, contacts loaded.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub name: String,
    pub dir: PathBuf,
    pub template: Template,
    pub contacts: Vec<Contact>,
}

impl Campaign {
    /// Open `<campaigns_dir>/<name>`. The template is parsed before contacts
    /// are read, so a template without a subject fails first.
    pub fn open(campaigns_dir: &Path, name: &str) -> Result<Self, CampaignError> {
        let dir = campaigns_dir.join(name);
        if !dir.is_dir() {
            return Err(CampaignError::NotFound {
                name: name.to_string(),
                dir,
                available: list_campaigns(campaigns_dir)?,
            });
        }

        let template_path = dir.join(TEMPLATE_FILE);
        if !template_path.is_file() {
            return Err(CampaignError::MissingTemplate(dir));
        }
        let contacts_path = dir.join(CONTACTS_FILE);
        if !contacts_path.is_file() {
            let hint = match Audience::from_name(name) {
                Some(audience) => format!("run `selllocal campaign fetch {}` first", audience),
                None => "create a contacts.csv with an 'email' column".to_string(),
            };
            return Err(CampaignError::MissingContacts { dir, hint });
        }

        let template = Template::load(&template_path)?;
        let contacts = load_contacts(&contacts_path)?;

        Ok(Self {
            name: name.to_string(),
            dir,
            template,
            contacts,
        })
    }
}
