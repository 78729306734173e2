pub mod auth;
pub mod config;
pub mod consistency;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod redis_store;
pub mod services;

pub use config::Config;
pub use errors::{Result, ServiceError};
