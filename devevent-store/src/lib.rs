pub mod app_config;
pub mod assets;
pub mod booking_repo;
pub mod database;
pub mod event_repo;
pub mod memory;

pub use assets::AssetHostClient;
pub use booking_repo::PostgresBookingRepository;
pub use database::{ConnectionManager, Connector, Database, PgConnector};
pub use event_repo::PostgresEventRepository;
