use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{DriverProfile, RideOffer, RideQuery, RiderProfile};

/// Errors that can occur when reading from the ride store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Read-only access to ride, driver and rider records
///
/// Implementations must be cheap to share across requests; the matcher
/// holds one behind an `Arc` and issues lookups concurrently.
#[async_trait]
pub trait RideStore: Send + Sync {
    /// Rides near the query's pickup that are live or scheduled
    async fn fetch_candidate_rides(&self, query: &RideQuery) -> Result<Vec<RideOffer>, StoreError>;

    /// Driver profile joined with vehicle and verification records
    async fn driver_profile(&self, driver_id: &str) -> Result<DriverProfile, StoreError>;

    /// Passenger gender and safety preference
    async fn rider_profile(&self, user_id: &str) -> Result<RiderProfile, StoreError>;
}

/// Run a store lookup under a deadline
pub async fn with_deadline<T, F>(deadline: Duration, lookup: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, lookup).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

/// Mean of raw ratings, 0.0 when there are none
pub fn average_rating(ratings: &[f64]) -> f64 {
    let valid: Vec<f64> = ratings.iter().copied().filter(|r| r.is_finite()).collect();
    if valid.is_empty() {
        return 0.0;
    }
    valid.iter().sum::<f64>() / valid.len() as f64
}
