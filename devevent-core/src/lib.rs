pub mod booking;
pub mod event;
pub mod repository;
pub mod service;
pub mod upload;

use serde::Serialize;
use uuid::Uuid;

/// One violated field with a human-readable reason. Collected into a list so
/// a caller submitting several bad fields hears about all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("An event with slug '{slug}' already exists")]
    DuplicateSlug { slug: String },
    #[error("Referenced event {event_id} does not exist")]
    DanglingReference { event_id: Uuid },
    #[error("{0} not found")]
    NotFound(String),
    #[error("{service} failed: {detail}")]
    Upstream { service: String, detail: String },
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl DomainError {
    /// Shorthand for a single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
