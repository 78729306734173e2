use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub records: RecordsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub namespace: String, // Key prefix inside a shared Redis
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordsConfig {
    pub default_limit: usize,
    pub poll_attempts: u32,  // Reads made while waiting for a fresh record
    pub poll_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password_sha256: Option<String>, // Hex digest, never the plain password
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 2)?
            .set_default("store.backend", "memory")?
            .set_default("store.namespace", "water")?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("records.default_limit", 50)?
            .set_default("records.poll_attempts", 5)?
            .set_default("records.poll_delay_ms", 1500)?;

        // Add environment-specific config file if it exists
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("DELIVERY_SERVICE")
                .separator("__")
                .list_separator(","),
        );

        // Special handling for common env vars
        if let Ok(redis_url) = env::var("REDIS_URL") {
            builder = builder.set_override("redis.url", redis_url)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.server.workers == 0 {
            return Err("At least one worker is required".to_string());
        }

        if self.store.namespace.trim().is_empty() {
            return Err("Store namespace cannot be empty".to_string());
        }

        if self.store.backend == StoreBackend::Redis && self.redis.url.is_empty() {
            return Err("Redis URL is required for the redis backend".to_string());
        }

        if self.records.default_limit == 0 {
            return Err("Default record limit must be positive".to_string());
        }

        if self.records.poll_attempts == 0 {
            return Err("At least one record read attempt is required".to_string());
        }

        if let Some(digest) = &self.auth.password_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("auth.password_sha256 must be a 64-character hex digest".to_string());
            }
        }

        Ok(())
    }

    /// True when both halves of the login credential are configured
    pub fn auth_enabled(&self) -> bool {
        self.auth.username.is_some() && self.auth.password_sha256.is_some()
    }
}
