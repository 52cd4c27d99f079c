use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::booking::{normalize_email, validate_email, Booking};
use crate::event::{derive_slug, Event, EventDraft};
use crate::repository::{BookingRepository, EventExistence, EventRepository, StoreError};
use crate::upload::ImageUploader;
use crate::{DomainError, DomainResult};

/// Orchestrates event creation and lookup: field validation, image upload,
/// slug assignment and duplicate detection.
pub struct EventService {
    repo: Arc<dyn EventRepository>,
    uploader: Arc<dyn ImageUploader>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>, uploader: Arc<dyn ImageUploader>) -> Self {
        Self { repo, uploader }
    }

    /// Create an event. The image must land on the asset host before anything
    /// is written; an upload failure therefore persists nothing. A slug
    /// collision reported by the store surfaces as [`DomainError::DuplicateSlug`]
    /// and leaves the previously stored event untouched.
    pub async fn create(&self, draft: EventDraft, image: Vec<u8>) -> DomainResult<Event> {
        let violations = draft.validate();
        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }

        let image_url = self
            .uploader
            .upload(image)
            .await
            .map_err(|e| DomainError::Upstream {
                service: "image upload".to_string(),
                detail: e.0,
            })?;

        let slug = derive_slug(&draft.title);
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            slug: slug.clone(),
            title: draft.title.trim().to_string(),
            image: image_url,
            tags: draft.normalized_tags(),
            agenda: draft.agenda,
            created_at: now,
            updated_at: now,
        };

        match self.repo.insert(&event).await {
            Ok(()) => {
                info!("Event created: {} ({})", event.slug, event.id);
                Ok(event)
            }
            Err(StoreError::UniqueViolation { .. }) => Err(DomainError::DuplicateSlug { slug }),
            Err(other) => Err(other.into()),
        }
    }

    /// Find an event by slug, normalizing the incoming value the same way
    /// slugs are normalized at write time. A wrong-case or padded slug still
    /// hits.
    pub async fn find_by_slug(&self, slug: &str) -> DomainResult<Event> {
        let normalized = slug.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("slug", "slug must not be blank"));
        }
        match self.repo.find_by_slug(&normalized).await? {
            Some(event) => Ok(event),
            None => Err(DomainError::NotFound(format!("event '{}'", normalized))),
        }
    }

    /// All events, most recently created first.
    pub async fn list(&self) -> DomainResult<Vec<Event>> {
        Ok(self.repo.list().await?)
    }
}

/// Orchestrates booking creation behind the referential-integrity gate.
pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    events: Arc<dyn EventExistence>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>, events: Arc<dyn EventExistence>) -> Self {
        Self { repo, events }
    }

    /// Create a booking. The referenced event must exist at this moment; a
    /// dangling reference persists nothing. The reference is not re-validated
    /// after the booking is stored.
    pub async fn create(&self, event_id: Uuid, email: &str) -> DomainResult<Booking> {
        let email = normalize_email(email);
        if let Err(violation) = validate_email(&email) {
            return Err(DomainError::Validation(vec![violation]));
        }

        if !self.events.event_exists(event_id).await? {
            return Err(DomainError::DanglingReference { event_id });
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            event_id,
            email,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert(&booking).await?;
        info!("Booking created: {} for event {}", booking.id, booking.event_id);
        Ok(booking)
    }

    /// Bookings for an event, optionally narrowed to a single address. The
    /// address filter is normalized exactly like stored addresses.
    pub async fn find(&self, event_id: Uuid, email: Option<&str>) -> DomainResult<Vec<Booking>> {
        match email {
            Some(email) => {
                let email = normalize_email(email);
                Ok(self.repo.find_by_event_and_email(event_id, &email).await?)
            }
            None => Ok(self.repo.list_for_event(event_id).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AgendaItem;
    use crate::upload::UploadError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEventRepo {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventRepository for RecordingEventRepo {
        async fn insert(&self, event: &Event) -> Result<(), StoreError> {
            let mut events = self.events.lock().unwrap();
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
                .unwrap()
                .iter()
                .find(|e| e.slug == slug)
                .cloned())
        }

        async fn list(&self) -> Result<Vec<Event>, StoreError> {
            Ok(self.events.lock().unwrap().clone())
        }
    }

    struct StaticUploader;

    #[async_trait]
    impl ImageUploader for StaticUploader {
        async fn upload(&self, _bytes: Vec<u8>) -> Result<String, UploadError> {
            Ok("https://assets.example.com/devevent/image.png".to_string())
        }
    }

    struct FailingUploader;

    #[async_trait]
    impl ImageUploader for FailingUploader {
        async fn upload(&self, _bytes: Vec<u8>) -> Result<String, UploadError> {
            Err(UploadError("asset host returned 503".to_string()))
        }
    }

    struct PanickyUploader;

    #[async_trait]
    impl ImageUploader for PanickyUploader {
        async fn upload(&self, _bytes: Vec<u8>) -> Result<String, UploadError> {
            panic!("uploader must not be reached");
        }
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            tags: vec!["go".to_string(), "conf".to_string()],
            agenda: vec![AgendaItem {
                time: "9:00".to_string(),
                topic: "Keynote".to_string(),
            }],
        }
    }

    fn event_service(repo: Arc<RecordingEventRepo>, uploader: Arc<dyn ImageUploader>) -> EventService {
        EventService::new(repo, uploader)
    }

    #[tokio::test]
    async fn create_event_assigns_slug_and_preserves_fields() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(Arc::clone(&repo), Arc::new(StaticUploader));

        let event = service
            .create(draft("  GoConf 2025  "), b"png".to_vec())
            .await
            .unwrap();

        assert_eq!(event.slug, "goconf-2025");
        assert_eq!(event.title, "GoConf 2025");
        assert_eq!(event.image, "https://assets.example.com/devevent/image.png");
        assert_eq!(event.tags, vec!["go", "conf"]);
        assert_eq!(event.agenda.len(), 1);
        assert_eq!(event.created_at, event.updated_at);
        assert_eq!(derive_slug(&event.title), event.slug);
    }

    #[tokio::test]
    async fn second_title_with_same_slug_is_a_duplicate() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(Arc::clone(&repo), Arc::new(StaticUploader));

        service.create(draft("GoConf 2025"), b"a".to_vec()).await.unwrap();
        let err = service
            .create(draft("  GoConf   2025!  "), b"b".to_vec())
            .await
            .unwrap_err();

        match err {
            DomainError::DuplicateSlug { slug } => assert_eq!(slug, "goconf-2025"),
            other => panic!("expected DuplicateSlug, got {:?}", other),
        }

        let stored = repo.events.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "GoConf 2025");
    }

    #[tokio::test]
    async fn failed_upload_persists_nothing() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(Arc::clone(&repo), Arc::new(FailingUploader));

        let err = service.create(draft("GoConf 2025"), b"a".to_vec()).await.unwrap_err();

        match err {
            DomainError::Upstream { service, .. } => assert_eq!(service, "image upload"),
            other => panic!("expected Upstream, got {:?}", other),
        }
        assert!(repo.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_uploader() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(Arc::clone(&repo), Arc::new(PanickyUploader));

        let err = service.create(draft("   "), b"a".to_vec()).await.unwrap_err();

        match err {
            DomainError::Validation(fields) => assert_eq!(fields[0].field, "title"),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert!(repo.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slug_lookup_normalizes_case_and_whitespace() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(Arc::clone(&repo), Arc::new(StaticUploader));

        service.create(draft("GoConf 2025"), b"a".to_vec()).await.unwrap();

        let found = service.find_by_slug("  GOCONF-2025  ").await.unwrap();
        assert_eq!(found.slug, "goconf-2025");
    }

    #[tokio::test]
    async fn blank_slug_lookup_is_a_validation_failure() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(repo, Arc::new(StaticUploader));

        let err = service.find_by_slug("   ").await.unwrap_err();
        match err {
            DomainError::Validation(fields) => assert_eq!(fields[0].field, "slug"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_slug_lookup_is_not_found() {
        let repo = Arc::new(RecordingEventRepo::default());
        let service = event_service(repo, Arc::new(StaticUploader));

        let err = service.find_by_slug("missing-event").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[derive(Default)]
    struct RecordingBookingRepo {
        bookings: Mutex<Vec<Booking>>,
    }

    #[async_trait]
    impl BookingRepository for RecordingBookingRepo {
        async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
            self.bookings.lock().unwrap().push(booking.clone());
            Ok(())
        }

        async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>, StoreError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.event_id == event_id)
                .cloned()
                .collect())
        }

        async fn find_by_event_and_email(
            &self,
            event_id: Uuid,
            email: &str,
        ) -> Result<Vec<Booking>, StoreError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.event_id == event_id && b.email == email)
                .cloned()
                .collect())
        }
    }

    struct StubExistence(bool);

    #[async_trait]
    impl EventExistence for StubExistence {
        async fn event_exists(&self, _event_id: Uuid) -> Result<bool, StoreError> {
            Ok(self.0)
        }
    }

    struct FailingExistence;

    #[async_trait]
    impl EventExistence for FailingExistence {
        async fn event_exists(&self, _event_id: Uuid) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn booking_service(repo: Arc<RecordingBookingRepo>, events: Arc<dyn EventExistence>) -> BookingService {
        BookingService::new(repo, events)
    }

    #[tokio::test]
    async fn booking_stores_the_normalized_address() {
        let repo = Arc::new(RecordingBookingRepo::default());
        let service = booking_service(Arc::clone(&repo), Arc::new(StubExistence(true)));

        let booking = service
            .create(Uuid::new_v4(), "  Dev@Example.COM  ")
            .await
            .unwrap();

        assert_eq!(booking.email, "dev@example.com");
        assert_eq!(repo.bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dangling_reference_persists_nothing() {
        let repo = Arc::new(RecordingBookingRepo::default());
        let service = booking_service(Arc::clone(&repo), Arc::new(StubExistence(false)));

        let missing = Uuid::new_v4();
        let err = service.create(missing, "dev@example.com").await.unwrap_err();

        match err {
            DomainError::DanglingReference { event_id } => assert_eq!(event_id, missing),
            other => panic!("expected DanglingReference, got {:?}", other),
        }
        assert!(repo.bookings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_the_gate() {
        let repo = Arc::new(RecordingBookingRepo::default());
        let service = booking_service(Arc::clone(&repo), Arc::new(FailingExistence));

        let err = service.create(Uuid::new_v4(), "not-an-email").await.unwrap_err();

        match err {
            DomainError::Validation(fields) => assert_eq!(fields[0].field, "email"),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert!(repo.bookings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_as_upstream() {
        let repo = Arc::new(RecordingBookingRepo::default());
        let service = booking_service(Arc::clone(&repo), Arc::new(FailingExistence));

        let err = service.create(Uuid::new_v4(), "dev@example.com").await.unwrap_err();
        match err {
            DomainError::Upstream { service, .. } => assert_eq!(service, "event store"),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn same_pair_books_twice() {
        let repo = Arc::new(RecordingBookingRepo::default());
        let service = booking_service(Arc::clone(&repo), Arc::new(StubExistence(true)));

        let event_id = Uuid::new_v4();
        service.create(event_id, "dev@example.com").await.unwrap();
        service.create(event_id, "dev@example.com").await.unwrap();

        let found = service.find(event_id, Some("Dev@Example.com")).await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
