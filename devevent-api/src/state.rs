use std::sync::Arc;

use devevent_core::service::{BookingService, EventService};

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
    pub bookings: Arc<BookingService>,
}
