use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use delivery_service::{
    auth::{ConfiguredCredentials, CredentialVerifier, DenyAll},
    config::{Config, StoreBackend},
    consistency::PollPolicy,
    handlers, metrics,
    redis_store::RedisStore,
    services::DeliveryService,
};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use water_ledger::{KvStore, MemoryStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .json()
        .init();

    info!("Starting Delivery Service...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    info!(
        auth_enabled = config.auth_enabled(),
        "Configuration loaded successfully"
    );

    metrics::register_metrics().context("Failed to register metrics")?;

    // Initialize store
    let store: Arc<dyn KvStore> = match config.store.backend {
        StoreBackend::Redis => {
            let redis = RedisStore::connect(&config.redis.url, &config.store.namespace)
                .await
                .context("Failed to connect to Redis")?;
            info!(namespace = %config.store.namespace, "Redis connected successfully");
            Arc::new(redis)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize login verifier
    let verifier: Arc<dyn CredentialVerifier> = match ConfiguredCredentials::from_config(&config.auth) {
        Some(credentials) => Arc::new(credentials),
        None => {
            warn!("No login credential configured; every login will be rejected");
            Arc::new(DenyAll)
        }
    };

    // Initialize service
    let service = web::Data::new(DeliveryService::new(
        store,
        verifier,
        config.records.default_limit,
        PollPolicy::new(config.records.poll_attempts, config.records.poll_delay_ms),
    ));

    info!("Delivery service initialized successfully");

    // Start HTTP server
    let server_config = config.server.clone();

    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(handlers::cors_headers())
            .wrap(handlers::cors())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(handlers::configure_routes)
            .default_service(web::to(handlers::fallback))
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await?;

    info!("Delivery service stopped");
    Ok(())
}
