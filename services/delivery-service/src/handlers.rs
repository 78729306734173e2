use crate::errors::ServiceError;
use crate::metrics;
use crate::models::{DeliveryRequest, HealthResponse, LoginRequest, RecordsQuery, SetInitialRequest};
use crate::services::DeliveryService;
use actix_cors::Cors;
use actix_web::{http::header, http::Method, middleware, web, HttpRequest, HttpResponse};
use chrono::Utc;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Single-page form
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "delivery-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus scrape endpoint
pub async fn metrics_endpoint() -> Result<HttpResponse, ServiceError> {
    let body = metrics::render().map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

/// Record a delivery
pub async fn record_delivery(
    service: web::Data<DeliveryService>,
    request: web::Json<DeliveryRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.record_delivery(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// List records, newest first
pub async fn list_records(
    service: web::Data<DeliveryService>,
    params: web::Query<RecordsQuery>,
) -> Result<HttpResponse, ServiceError> {
    let records = service.list_records(params.into_inner()).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Download the selected records as CSV
pub async fn export_records(
    service: web::Data<DeliveryService>,
    params: web::Query<RecordsQuery>,
) -> Result<HttpResponse, ServiceError> {
    let csv = service.export_records(params.into_inner()).await?;
    let filename = format!("deliveries_{}.csv", Utc::now().format("%Y-%m-%d"));

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(csv))
}

/// Current empty bucket balance
pub async fn get_status(service: web::Data<DeliveryService>) -> Result<HttpResponse, ServiceError> {
    let status = service.get_status().await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Wipe status and records
pub async fn clear_all(service: web::Data<DeliveryService>) -> Result<HttpResponse, ServiceError> {
    let response = service.clear_all().await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Seed the balance
pub async fn set_initial(
    service: web::Data<DeliveryService>,
    request: web::Json<SetInitialRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.set_initial(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Check a username/password pair
pub async fn login(
    service: web::Data<DeliveryService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.login(&request)?;
    Ok(HttpResponse::Ok().json(response))
}

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Anything unrouted. OPTIONS (preflight or not) gets an empty 200, the rest
/// a 404. The allow headers themselves come from `cors_headers()`.
pub async fn fallback(req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::Ok()
            .insert_header((header::ACCESS_CONTROL_MAX_AGE, "3600"))
            .finish());
    }
    Err(ServiceError::NotFound)
}

/// Cross-origin validation for requests that send `Origin`.
///
/// Preflight handling is left to `fallback`: actix-cors rejects an OPTIONS
/// request without preflight headers, which must still answer 200.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .disable_preflight()
}

/// Permissive CORS headers on every response, with or without `Origin`
pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req| ServiceError::MalformedRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ServiceError::MalformedRequest(err.to_string()).into())
}

/// Configure routes. The app itself also needs `default_service(web::to(fallback))`
/// and the `cors()` and `cors_headers()` middleware.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::resource(vec!["/", "/index.html"])
                .route(web::get().to(index))
                .default_service(web::to(fallback)),
        )
        .service(
            web::resource("/health")
                .route(web::get().to(health_check))
                .default_service(web::to(fallback)),
        )
        .service(
            web::resource("/metrics")
                .route(web::get().to(metrics_endpoint))
                .default_service(web::to(fallback)),
        )
        .service(
            web::scope("/api")
                .service(
                    web::resource("/delivery")
                        .route(web::post().to(record_delivery))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/records")
                        .route(web::get().to(list_records))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/records/export")
                        .route(web::get().to(export_records))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/status")
                        .route(web::get().to(get_status))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/clear")
                        .route(web::delete().to(clear_all))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/set-initial")
                        .route(web::post().to(set_initial))
                        .default_service(web::to(fallback)),
                )
                .service(
                    web::resource("/login")
                        .route(web::post().to(login))
                        .default_service(web::to(fallback)),
                )
                .default_service(web::to(fallback)),
        );
}
