use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use devevent_core::booking::Booking;

use crate::error::AppError;
use crate::extractors::{AppJson, AppQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub event_id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingQuery {
    pub event_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            event_id: booking.event_id,
            email: booking.email,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/bookings", post(create_booking).get(list_bookings))
}

async fn create_booking(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state.bookings.create(req.event_id, &req.email).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

async fn list_bookings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BookingQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state
        .bookings
        .find(query.event_id, query.email.as_deref())
        .await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}
