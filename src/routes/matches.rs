use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::Matcher;
use crate::models::{ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "passengerId": "string",
///   "pickup": { "latitude": 3.2167, "longitude": 101.7333 },
///   "destination": { "latitude": 3.1478, "longitude": 101.6953 },
///   "seatsRequired": 1,
///   "maxWillingnessToPay": 30.0,
///   "minRating": 4.0,
///   "topN": 5,
///   "maxDistanceKm": 10.0
/// }
/// ```
///
/// A failed search answers 200 with no matches.
async fn find_matches(state: web::Data<AppState>, req: web::Json<FindMatchesRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: field_errors={:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let search_id = uuid::Uuid::new_v4().to_string();
    let request = req.into_inner().into_match_request(
        state.matching.default_top_n,
        state.matching.max_top_n,
        state.matching.default_max_distance_km,
    );

    tracing::debug!(search_id = %search_id, "Search started");

    let matches = state.matcher.find_best_matches(&request).await;

    HttpResponse::Ok().json(FindMatchesResponse {
        search_id,
        total: matches.len(),
        matches,
    })
}
