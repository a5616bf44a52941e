use std::collections::HashMap;
use std::path::Path;

use super::CampaignError;

/// One recipient row. Every CSV column, `email` included, is kept as a
/// template value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub values: HashMap<String, String>,
}

/// Read a contacts CSV. Rows may be shorter than the header; the columns they
/// lack are left out of `values` and render empty.
pub fn load_contacts(path: &Path) -> Result<Vec<Contact>, CampaignError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let email_index = headers
        .iter()
        .position(|h| h == "email")
        .ok_or_else(|| CampaignError::MissingEmailColumn(path.to_path_buf()))?;

    let mut contacts = Vec::new();
    for record in reader.records() {
        let record = record?;
        let email = record.get(email_index).unwrap_or_default().trim().to_string();
        let mut values: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        values.insert("email".to_string(), email.clone());
        contacts.push(Contact { email, values });
    }
    Ok(contacts)
}
