use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use devevent_core::event::{AgendaItem, Event, EventDraft};
use devevent_core::{DomainError, FieldError};

use crate::error::AppError;
use crate::extractors::AppMultipart;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub image: String,
    pub tags: Vec<String>,
    pub agenda: Vec<AgendaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            slug: event.slug,
            title: event.title,
            image: event.image,
            tags: event.tags,
            agenda: event.agenda,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Fields collected from the multipart submission before validation.
struct EventSubmission {
    title: String,
    tags: Vec<String>,
    agenda: Vec<AgendaItem>,
    image: Vec<u8>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{slug}", get(get_event_by_slug))
}

async fn create_event(
    State(state): State<AppState>,
    AppMultipart(multipart): AppMultipart,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    // 1. Pull the parts out of the multipart body
    let submission = read_submission(multipart).await?;

    // 2. Hand off to the service: validation, upload, slug, insert
    let draft = EventDraft {
        title: submission.title,
        tags: submission.tags,
        agenda: submission.agenda,
    };
    let event = state.events.create(draft, submission.image).await?;

    Ok((StatusCode::CREATED, Json(event.into())))
}

async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.events.list().await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.events.find_by_slug(&slug).await?;
    Ok(Json(event.into()))
}

/// Walk the multipart stream once, collecting the known parts. Every missing
/// part is reported, and the tags/agenda parts must decode as JSON before
/// anything touches the service.
async fn read_submission(mut multipart: Multipart) -> Result<EventSubmission, AppError> {
    let mut title = None;
    let mut tags_raw = None;
    let mut agenda_raw = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError(DomainError::validation("body", e.to_string())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(read_text(field, "title").await?),
            "tags" => tags_raw = Some(read_text(field, "tags").await?),
            "agenda" => agenda_raw = Some(read_text(field, "agenda").await?),
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError(DomainError::validation("image", e.to_string())))?;
                image = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    if title.is_none() {
        missing.push(FieldError::new("title", "title is required"));
    }
    if tags_raw.is_none() {
        missing.push(FieldError::new("tags", "tags are required"));
    }
    if agenda_raw.is_none() {
        missing.push(FieldError::new("agenda", "agenda is required"));
    }
    if image.is_none() {
        missing.push(FieldError::new("image", "an image file is required"));
    }

    if let (Some(title), Some(tags_raw), Some(agenda_raw), Some(image)) =
        (title, tags_raw, agenda_raw, image)
    {
        let tags: Vec<String> = serde_json::from_str(&tags_raw).map_err(|_| {
            AppError(DomainError::validation(
                "tags",
                "tags must be a JSON array of strings",
            ))
        })?;
        let agenda: Vec<AgendaItem> = serde_json::from_str(&agenda_raw).map_err(|_| {
            AppError(DomainError::validation(
                "agenda",
                "agenda must be a JSON array of { time, topic } entries",
            ))
        })?;

        Ok(EventSubmission {
            title,
            tags,
            agenda,
            image,
        })
    } else {
        Err(AppError(DomainError::Validation(missing)))
    }
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError(DomainError::validation(name, e.to_string())))
}
