use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use carpool_match::config::{LoggingSettings, Settings};
use carpool_match::core::{FareCalculator, Matcher, ScoringEngine};
use carpool_match::routes::{self, AppState};
use carpool_match::services::{AppwriteClient, AppwriteCollections, CacheManager, CachedRideStore, RideStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

/// L1+L2 when Redis is configured and reachable, otherwise L1 only
async fn build_cache(settings: &Settings) -> Arc<CacheManager> {
    let ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(1000);

    if let Some(redis_url) = &settings.cache.redis_url {
        match CacheManager::new(redis_url, l1_size, ttl).await {
            Ok(cache) => {
                info!("Cache manager initialized with Redis (L1: {} entries, TTL: {}s)", l1_size, ttl);
                return Arc::new(cache);
            }
            Err(e) => warn!("Failed to connect to Redis ({}), falling back to in-memory cache", e),
        }
    }

    info!("Cache manager initialized in memory (L1: {} entries, TTL: {}s)", l1_size, ttl);
    Arc::new(CacheManager::in_memory(l1_size, ttl))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    init_tracing(&settings.logging);
    info!("Starting campus carpool matching service...");

    let collections = AppwriteCollections {
        rides: settings.collection.rides.clone(),
        profiles: settings.collection.profiles.clone(),
        vehicles: settings.collection.vehicles.clone(),
    };

    let appwrite = AppwriteClient::new(
        settings.appwrite.endpoint.clone(),
        settings.appwrite.api_key.clone(),
        settings.appwrite.project_id.clone(),
        settings.appwrite.database_id.clone(),
        collections,
        Duration::from_secs(settings.appwrite.request_timeout_secs.unwrap_or(10)),
    )
    .map_err(|e| {
        error!("Failed to build Appwrite client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    info!("Appwrite client initialized");

    let store: Arc<dyn RideStore> = Arc::new(CachedRideStore::new(appwrite, build_cache(&settings).await));

    let weights = settings.scoring.weights.normalized().map_err(|e| {
        error!("Invalid scoring weights: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let engine = ScoringEngine::new(FareCalculator::new(settings.fare), settings.matching.eligibility_policy);
    let matcher = Matcher::new(store, engine, weights)
        .with_lookup_timeout(settings.matching.lookup_timeout())
        .with_candidate_limit(settings.matching.candidate_limit);

    info!(
        "Matcher initialized with weights {:?}, {:?} eligibility policy",
        weights, settings.matching.eligibility_policy
    );

    let app_state = AppState {
        matcher,
        matching: settings.matching.clone(),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
