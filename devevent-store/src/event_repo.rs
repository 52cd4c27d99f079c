use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use devevent_core::event::{AgendaItem, Event};
use devevent_core::repository::{EventExistence, EventRepository, StoreError};

use crate::database::{map_sqlx_error, Database};

pub struct PostgresEventRepository {
    db: Arc<Database>,
}

impl PostgresEventRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

/// Row shape: tags and agenda live in JSONB columns.
#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    slug: String,
    title: String,
    image: String,
    tags: Json<Vec<String>>,
    agenda: Json<Vec<AgendaItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            slug: row.slug,
            title: row.title,
            image: row.image,
            tags: row.tags.0,
            agenda: row.agenda.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        let pool = self.db.acquire().await?;
        sqlx::query(
            "INSERT INTO events (id, slug, title, image, tags, agenda, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(&event.slug)
        .bind(&event.title)
        .bind(&event.image)
        .bind(Json(&event.tags))
        .bind(Json(&event.agenda))
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let pool = self.db.acquire().await?;
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, slug, title, image, tags, agenda, created_at, updated_at \
             FROM events WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Event::from))
    }

    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let pool = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, slug, title, image, tags, agenda, created_at, updated_at \
             FROM events ORDER BY created_at DESC",
        )
        .fetch_all(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Event::from).collect())
    }
}

#[async_trait]
impl EventExistence for PostgresEventRepository {
    async fn event_exists(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let pool = self.db.acquire().await?;
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&pool)
            .await
            .map_err(map_sqlx_error)
    }
}
