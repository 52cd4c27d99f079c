use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use devevent_core::booking::Booking;
use devevent_core::repository::{BookingRepository, StoreError};

use crate::database::{map_sqlx_error, Database};

pub struct PostgresBookingRepository {
    db: Arc<Database>,
}

impl PostgresBookingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            event_id: row.event_id,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        let pool = self.db.acquire().await?;
        sqlx::query(
            "INSERT INTO bookings (id, event_id, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(booking.id)
        .bind(booking.event_id)
        .bind(&booking.email)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let pool = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, event_id, email, created_at, updated_at \
             FROM bookings WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn find_by_event_and_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Vec<Booking>, StoreError> {
        let pool = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, event_id, email, created_at, updated_at \
             FROM bookings WHERE event_id = $1 AND email = $2 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .bind(email)
        .fetch_all(&pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }
}
