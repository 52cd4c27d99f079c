use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FieldError;

/// A single agenda entry: when a segment starts and what it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub time: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub image: String,
    pub tags: Vec<String>,
    pub agenda: Vec<AgendaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incoming event fields before validation, slug assignment and image upload.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub tags: Vec<String>,
    pub agenda: Vec<AgendaItem>,
}

impl EventDraft {
    /// Validate every field and report all violations, not just the first.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "title is required"));
        } else if derive_slug(&self.title).is_empty() {
            errors.push(FieldError::new(
                "title",
                "title must contain at least one alphanumeric character",
            ));
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            errors.push(FieldError::new("tags", "tags must not contain blank entries"));
        }

        for (i, entry) in self.agenda.iter().enumerate() {
            if entry.time.trim().is_empty() || entry.topic.trim().is_empty() {
                errors.push(FieldError::new(
                    "agenda",
                    format!("agenda entry {} must have a time and a topic", i),
                ));
            }
        }

        errors
    }

    /// Tags with set semantics: trimmed, blanks dropped, first occurrence wins.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !seen.iter().any(|s| s == tag) {
                seen.push(tag.to_string());
            }
        }
        seen
    }
}

/// Derive the URL-safe identifier for a title. Deterministic: the same title
/// always yields the same slug. Runs of characters outside [a-z0-9] collapse
/// into a single '-', with no dash at either edge.
pub fn derive_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
