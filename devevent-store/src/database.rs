use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use devevent_core::repository::StoreError;

use crate::app_config::DatabaseConfig;

/// Opens the underlying connection. Split out so the caching and
/// single-flight machinery can be exercised without a live server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Clone + Send + Sync + 'static;

    async fn establish(&self) -> Result<Self::Conn, StoreError>;
}

type EstablishFuture<T> = Shared<BoxFuture<'static, Result<T, StoreError>>>;

enum ConnState<T: Clone> {
    /// No handle and no attempt under way.
    Idle,
    /// One establishment attempt in flight; every caller awaits this future.
    Establishing(EstablishFuture<T>),
    /// Cached for the remainder of the process lifetime.
    Ready(T),
}

struct Inner<T: Clone> {
    state: ConnState<T>,
    /// Bumped on every transition out of `Establishing`, so a late waker of a
    /// finished attempt cannot disturb a newer one.
    epoch: u64,
}

/// Process-wide connection cache. Any number of tasks call [`acquire`]
/// concurrently: a cold start runs exactly one establishment attempt that
/// all of them share, a failed attempt is discarded so the next call starts
/// fresh, and a successful handle is reused for the life of the process.
///
/// [`acquire`]: ConnectionManager::acquire
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    inner: Mutex<Inner<C::Conn>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            inner: Mutex::new(Inner {
                state: ConnState::Idle,
                epoch: 0,
            }),
        }
    }

    /// One establishment attempt that any number of callers can share.
    fn start_attempt(&self) -> EstablishFuture<C::Conn> {
        let connector = Arc::clone(&self.connector);
        async move { connector.establish().await }.boxed().shared()
    }

    /// Return the cached handle, join the in-flight attempt, or start one.
    /// Callers arriving while an attempt is in flight wait on that attempt;
    /// they never start a second one and never observe a stale failure.
    pub async fn acquire(&self) -> Result<C::Conn, StoreError> {
        let (attempt, joined_epoch) = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                ConnState::Ready(conn) => return Ok(conn.clone()),
                // A finished attempt parked here means every waiter was
                // cancelled before settling it. Settle now instead of
                // joining the stale result.
                ConnState::Establishing(attempt) => match attempt.peek() {
                    Some(Ok(conn)) => {
                        let conn = conn.clone();
                        inner.epoch += 1;
                        inner.state = ConnState::Ready(conn.clone());
                        return Ok(conn);
                    }
                    Some(Err(_)) => {
                        inner.epoch += 1;
                        let attempt = self.start_attempt();
                        inner.state = ConnState::Establishing(attempt.clone());
                        (attempt, inner.epoch)
                    }
                    None => (attempt.clone(), inner.epoch),
                },
                ConnState::Idle => {
                    let attempt = self.start_attempt();
                    inner.state = ConnState::Establishing(attempt.clone());
                    (attempt, inner.epoch)
                }
            }
        };

        let result = attempt.await;

        let mut inner = self.inner.lock().await;
        if inner.epoch == joined_epoch {
            inner.epoch += 1;
            inner.state = match &result {
                Ok(conn) => ConnState::Ready(conn.clone()),
                Err(err) => {
                    warn!("Connection establishment failed: {}", err);
                    ConnState::Idle
                }
            };
        }
        result
    }
}

/// Production connector: a sqlx pool plus schema migrations, both inside the
/// single establishment attempt.
pub struct PgConnector {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Conn = PgPool;

    async fn establish(&self) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!("Database connection established, migrations applied");

        Ok(pool)
    }
}

/// The process-wide database handle the Postgres repositories share.
pub type Database = ConnectionManager<PgConnector>;

/// Map a sqlx failure onto the store taxonomy, keeping unique violations
/// distinguishable from connectivity problems.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation {
            constraint: db.constraint().unwrap_or("unique").to_string(),
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowConnector {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for SlowConnector {
        type Conn = u32;

        async fn establish(&self) -> Result<u32, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(7)
        }
    }

    struct FlakyConnector {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Conn = u32;

        async fn establish(&self) -> Result<u32, StoreError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if attempt == 1 {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(42)
            }
        }
    }

    #[tokio::test]
    async fn concurrent_cold_acquires_share_one_establishment() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(ConnectionManager::new(SlowConnector {
            attempts: Arc::clone(&attempts),
        }));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.acquire().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 7);
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ready_handle_is_reused_without_new_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(SlowConnector {
            attempts: Arc::clone(&attempts),
        });

        assert_eq!(manager.acquire().await.unwrap(), 7);
        assert_eq!(manager.acquire().await.unwrap(), 7);
        assert_eq!(manager.acquire().await.unwrap(), 7);

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waiters_share_the_failure_and_the_next_call_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(ConnectionManager::new(FlakyConnector {
            attempts: Arc::clone(&attempts),
        }));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.acquire().await }));
        }
        for handle in handles {
            match handle.await.unwrap() {
                Err(StoreError::Unavailable(detail)) => assert_eq!(detail, "connection refused"),
                other => panic!("expected shared Unavailable, got {:?}", other),
            }
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // The failure was not cached: the next call starts a fresh attempt.
        assert_eq!(manager.acquire().await.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        // And the success is.
        assert_eq!(manager.acquire().await.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn finished_failure_abandoned_by_its_waiters_is_not_replayed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(SlowConnector {
            attempts: Arc::clone(&attempts),
        });

        // A failed attempt whose waiters all went away before settling it.
        let stale: EstablishFuture<u32> =
            async { Err(StoreError::Unavailable("connection refused".to_string())) }
                .boxed()
                .shared();
        let _ = stale.clone().await;
        manager.inner.lock().await.state = ConnState::Establishing(stale);

        // The next caller discards the stale failure and starts fresh.
        assert_eq!(manager.acquire().await.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finished_success_abandoned_by_its_waiters_is_promoted_to_ready() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(SlowConnector {
            attempts: Arc::clone(&attempts),
        });

        let stale: EstablishFuture<u32> = async { Ok(11) }.boxed().shared();
        let _ = stale.clone().await;
        manager.inner.lock().await.state = ConnState::Establishing(stale);

        // The handle is promoted and cached without a new attempt.
        assert_eq!(manager.acquire().await.unwrap(), 11);
        assert_eq!(manager.acquire().await.unwrap(), 11);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pool_timeout_maps_to_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn row_not_found_maps_to_query() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}
