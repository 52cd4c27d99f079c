use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FieldError;

/// Minimal local@domain shape: no whitespace, exactly one '@', a dot in the
/// domain part. Anything stricter belongs to a confirmation email, not here.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trim and lowercase an address the same way it is stored and queried, so
/// lookups never miss on case or stray whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check an already-normalized address against the basic shape.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::new("email", "email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(FieldError::new("email", "please provide a valid email address"));
    }
    Ok(())
}
