use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::Booking;
use crate::event::Event;
use crate::DomainError;

/// What the storage layer can report back. `Clone` because a single failed
/// connection-establishment attempt is handed to every caller that shared it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },
    #[error("Store query failed: {0}")]
    Query(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => DomainError::Upstream {
                service: "event store".to_string(),
                detail,
            },
            other => DomainError::Unexpected(other.to_string()),
        }
    }
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event. A slug collision surfaces as
    /// [`StoreError::UniqueViolation`]; the stored original is untouched.
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    /// Exact-match lookup by an already-normalized slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    /// All events, most recently created first.
    async fn list(&self) -> Result<Vec<Event>, StoreError>;
}

/// The existence check the booking path depends on. Narrower than
/// [`EventRepository`] so the gate can be satisfied (and tested) without
/// dragging in the rest of the event surface.
#[async_trait]
pub trait EventExistence: Send + Sync {
    async fn event_exists(&self, event_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;

    /// All bookings recorded against one event, newest first.
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Bookings matching the composite (event, email) pair. Plural: the pair
    /// carries no uniqueness constraint.
    async fn find_by_event_and_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Vec<Booking>, StoreError>;
}
