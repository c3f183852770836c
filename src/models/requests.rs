use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{GeoPoint, MatchRequest};

/// Request to find the best rides for a passenger
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[serde(alias = "passenger_id", rename = "passengerId", default)]
    pub passenger_id: Option<String>,
    #[validate(nested)]
    pub pickup: GeoPoint,
    #[validate(nested)]
    pub destination: GeoPoint,
    #[validate(range(min = 1, max = 8))]
    #[serde(alias = "seats_required", rename = "seatsRequired", default = "default_seats")]
    pub seats_required: u8,
    #[validate(range(min = 0.0))]
    #[serde(alias = "max_willingness_to_pay", rename = "maxWillingnessToPay")]
    pub max_willingness_to_pay: f64,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(alias = "min_rating", rename = "minRating", default)]
    pub min_rating: f64,
    #[validate(range(min = 1))]
    #[serde(alias = "top_n", rename = "topN", default)]
    pub top_n: Option<u16>,
    #[validate(range(min = 0.1, max = 100.0))]
    #[serde(alias = "max_distance_km", rename = "maxDistanceKm", default)]
    pub max_distance_km: Option<f64>,
}

fn default_seats() -> u8 {
    1
}

impl FindMatchesRequest {
    /// Build the engine request, filling unset fields from configured defaults
    pub fn into_match_request(
        self,
        default_top_n: usize,
        max_top_n: usize,
        default_max_distance_km: f64,
    ) -> MatchRequest {
        let top_n = self
            .top_n
            .map(|n| n as usize)
            .unwrap_or(default_top_n)
            .min(max_top_n);

        MatchRequest {
            passenger_id: self.passenger_id.filter(|id| !id.is_empty()),
            pickup: self.pickup,
            destination: self.destination,
            seats_required: self.seats_required,
            max_willingness_to_pay: self.max_willingness_to_pay,
            min_rating: self.min_rating,
            top_n,
            max_distance_km: self.max_distance_km.unwrap_or(default_max_distance_km),
        }
    }
}

/// Request a fare estimate without running a search
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FareQuoteRequest {
    #[validate(nested)]
    pub pickup: GeoPoint,
    #[validate(nested)]
    pub destination: GeoPoint,
    #[serde(alias = "scheduled_at", rename = "scheduledAt", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Replace the hybrid scoring weights
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateWeightsRequest {
    #[validate(range(min = 0.0))]
    pub route: f64,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub reputation: f64,
}
