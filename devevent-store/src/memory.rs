use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use devevent_core::booking::Booking;
use devevent_core::event::Event;
use devevent_core::repository::{
    BookingRepository, EventExistence, EventRepository, StoreError,
};

/// Vec-backed store for tests and local development. Mirrors the constraints
/// the Postgres schema enforces, the unique slug index included, so the
/// duplicate path behaves the same against either backend.
#[derive(Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        if events.iter().any(|e| e.slug == event.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: "events_slug_key".to_string(),
            });
        }
        events.push(event.clone());
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .find(|e| e.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.events.lock().await.clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }
}

#[async_trait]
impl EventExistence for InMemoryEventRepository {
    async fn event_exists(&self, event_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.events.lock().await.iter().any(|e| e.id == event_id))
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<Vec<Booking>>,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings.lock().await.push(booking.clone());
        Ok(())
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .lock()
            .await
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn find_by_event_and_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .lock()
            .await
            .iter()
            .filter(|b| b.event_id == event_id && b.email == email)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}
