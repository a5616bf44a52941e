use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::CampaignError;

const SUBJECT_OPEN: &str = "<!--subject:";
const SUBJECT_CLOSE: &str = "-->";

/// An HTML email body with its subject line taken from the leading
/// `<!--subject: ... -->` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub subject: String,
    pub html: String,
}

impl Template {
    pub fn load(path: &Path) -> Result<Self, CampaignError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).ok_or_else(|| CampaignError::MissingSubject(path.to_path_buf()))
    }

    /// `None` when the content does not open with a non-empty subject marker.
    pub fn parse(content: &str) -> Option<Self> {
        let rest = content.strip_prefix(SUBJECT_OPEN)?;
        let end = rest.find(SUBJECT_CLOSE)?;
        let subject = rest[..end].trim();
        if subject.is_empty() || subject.contains('\n') {
            return None;
        }
        let body = &rest[end + SUBJECT_CLOSE.len()..];
        let body = body.strip_prefix('\n').unwrap_or(body);
        Some(Self {
            subject: subject.to_string(),
            html: body.to_string(),
        })
    }

    /// Placeholder names used in the body, sorted.
    pub fn variables(&self) -> BTreeSet<&str> {
        placeholders(&self.html).map(|(_, name)| name).collect()
    }

    /// Substitute every `{{name}}` with its value; unknown names render empty.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.html.len());
        let mut last = 0;
        for (start, name) in placeholders(&self.html) {
            out.push_str(&self.html[last..start]);
            if let Some(value) = values.get(name) {
                out.push_str(value);
            }
            last = start + name.len() + 4;
        }
        out.push_str(&self.html[last..]);
        out
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `(byte offset, name)` of each `{{word}}` placeholder, left to right.
fn placeholders(html: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(found) = html[cursor..].find("{{") {
            let start = cursor + found;
            let inner = &html[start + 2..];
            let len = inner.find(|c: char| !is_word(c)).unwrap_or(inner.len());
            if len > 0 && inner[len..].starts_with("}}") {
                cursor = start + len + 4;
                return Some((start, &inner[..len]));
            }
            cursor = start + 1;
        }
        None
    })
}
