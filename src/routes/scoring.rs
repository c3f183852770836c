use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::distance::distance_km;
use crate::models::{
    ErrorResponse, FareQuoteRequest, FareQuoteResponse, ScoringWeights, UpdateWeightsRequest, WeightsResponse,
};
use crate::routes::matches::AppState;

/// Configure weight management and fare quote routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/scoring/weights", web::get().to(get_weights))
        .route("/scoring/weights", web::put().to(update_weights))
        .route("/fares/quote", web::post().to(quote_fare));
}

fn validation_error(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message,
        status_code: 400,
    })
}

/// GET /api/v1/scoring/weights
async fn get_weights(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(WeightsResponse {
        weights: state.matcher.weights().await,
    })
}

/// PUT /api/v1/scoring/weights
///
/// Weights are rescaled to sum to 1.0; the response shows what was stored.
async fn update_weights(state: web::Data<AppState>, req: web::Json<UpdateWeightsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors.to_string());
    }

    let proposed = ScoringWeights {
        route: req.route,
        price: req.price,
        reputation: req.reputation,
    };

    match state.matcher.update_weights(proposed).await {
        Ok(weights) => HttpResponse::Ok().json(WeightsResponse { weights }),
        Err(e) => validation_error(e.to_string()),
    }
}

/// POST /api/v1/fares/quote
///
/// Prices the straight-line trip at `scheduledAt`, or now when absent.
async fn quote_fare(state: web::Data<AppState>, req: web::Json<FareQuoteRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors.to_string());
    }

    let trip_time = req.scheduled_at.unwrap_or_else(chrono::Utc::now);
    let distance = distance_km(&req.pickup, &req.destination);
    let breakdown = state.matcher.engine().fares().breakdown(distance, trip_time);

    tracing::debug!(
        "Quoted {:.2} km at {}: {:.2} ({:?})",
        distance,
        trip_time,
        breakdown.fare,
        breakdown.surge_tier
    );

    HttpResponse::Ok().json(FareQuoteResponse {
        distance_km: distance,
        breakdown,
    })
}
