use serde::{Deserialize, Serialize};
use crate::core::fare::FareBreakdown;
use crate::models::domain::{MatchResult, ScoringWeights};

/// Response for find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    #[serde(rename = "searchId")]
    pub search_id: String,
    pub matches: Vec<MatchResult>,
    pub total: usize,
}

/// Response for the fare quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareQuoteResponse {
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(flatten)]
    pub breakdown: FareBreakdown,
}

/// Current hybrid scoring weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsResponse {
    pub weights: ScoringWeights,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
