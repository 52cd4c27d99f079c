use std::net::SocketAddr;
use std::sync::Arc;

use devevent_api::{app, AppState};
use devevent_core::service::{BookingService, EventService};
use devevent_store::{AssetHostClient, Database, PgConnector, PostgresBookingRepository, PostgresEventRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devevent_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = devevent_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting DevEvent API on port {}", config.server.port);

    // Database handle: the connection itself is established lazily on first
    // use, only the configuration is resolved here.
    let db = Arc::new(Database::new(PgConnector::new(&config.database)));

    let event_repo = Arc::new(PostgresEventRepository::new(Arc::clone(&db)));
    let booking_repo = Arc::new(PostgresBookingRepository::new(Arc::clone(&db)));
    let uploader = Arc::new(AssetHostClient::new(&config.assets));

    let app_state = AppState {
        events: Arc::new(EventService::new(event_repo.clone(), uploader)),
        bookings: Arc::new(BookingService::new(booking_repo, event_repo)),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
