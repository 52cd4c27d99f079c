use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub assets: AssetsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    pub base_url: String,
    pub folder: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the current environment file on top; optional, defaults
            // to 'development'
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `DEVEVENT__DATABASE__URL=...` sets `database.url`
            .add_source(config::Environment::with_prefix("DEVEVENT").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.database.validate()?;
        Ok(config)
    }
}

impl DatabaseConfig {
    /// The connection string is a startup requirement. Without this check an
    /// empty value would only surface on the first request.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "database.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
