use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::normalize::normalize_scores;
use crate::core::ranking::{rank, WeightsError};
use crate::core::scoring::{Prescreened, ScoringEngine, PICKUP_CUTOFF_KM};
use crate::models::{DriverProfile, MatchRequest, MatchResult, RideQuery, RiderProfile, ScoringWeights};
use crate::services::store::{with_deadline, RideStore, StoreError};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_CANDIDATE_LIMIT: usize = 100;

/// Failures inside a search; logged and collapsed to an empty result
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("candidate fetch failed: {0}")]
    Store(#[from] StoreError),

    #[error("driver lookups did not finish within {0:?}")]
    Deadline(Duration),
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Candidate fetch around the passenger's pickup
/// 2. Prescreen on ride data alone (status, distances, fare, seats)
/// 3. Concurrent driver and passenger profile lookups
/// 4. Rating, eligibility and route gates, then raw scores
/// 5. Min-max normalization and weighted ranking
///
/// Cloning is cheap and clones share the store and the weight set.
#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn RideStore>,
    engine: ScoringEngine,
    weights: Arc<RwLock<ScoringWeights>>,
    lookup_timeout: Duration,
    candidate_limit: usize,
}

impl Matcher {
    /// Weights are normalized to sum to 1; an unusable set falls back to
    /// the defaults
    pub fn new(store: Arc<dyn RideStore>, engine: ScoringEngine, weights: ScoringWeights) -> Self {
        let weights = weights.normalized().unwrap_or_else(|e| {
            tracing::warn!("Invalid scoring weights {:?} ({}), using defaults", weights, e);
            ScoringWeights::default()
        });

        Self {
            store,
            engine,
            weights: Arc::new(RwLock::new(weights)),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    /// Deadline applied to the candidate fetch and to each lookup round
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Upper bound on rides requested from the store per search
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn weights(&self) -> ScoringWeights {
        *self.weights.read().await
    }

    /// Replace the weight set; searches already running keep their snapshot
    pub async fn update_weights(&self, weights: ScoringWeights) -> Result<ScoringWeights, WeightsError> {
        let weights = weights.normalized()?;
        *self.weights.write().await = weights;

        tracing::info!(
            "Scoring weights updated: route={:.3} price={:.3} reputation={:.3}",
            weights.route,
            weights.price,
            weights.reputation
        );
        Ok(weights)
    }

    /// Ranked matches for `request`, best first
    ///
    /// Never fails: store errors and deadlines are logged and yield an
    /// empty list.
    pub async fn find_best_matches(&self, request: &MatchRequest) -> Vec<MatchResult> {
        self.find_best_matches_at(request, Utc::now()).await
    }

    /// Same as [`Matcher::find_best_matches`] with an explicit search time
    pub async fn find_best_matches_at(&self, request: &MatchRequest, now: DateTime<Utc>) -> Vec<MatchResult> {
        tracing::info!(
            passenger_id = request.passenger_id.as_deref().unwrap_or("anonymous"),
            "Finding matches: seats={} budget={:.2} min_rating={:.1} top_n={} radius={}km",
            request.seats_required,
            request.max_willingness_to_pay,
            request.min_rating,
            request.top_n,
            request.max_distance_km
        );

        match self.search(request, now).await {
            Ok(matches) => {
                tracing::info!("Returning {} matches", matches.len());
                matches
            }
            Err(e) => {
                tracing::error!("Match search failed, returning no matches: {}", e);
                Vec::new()
            }
        }
    }

    async fn search(&self, request: &MatchRequest, now: DateTime<Utc>) -> Result<Vec<MatchResult>, MatchError> {
        let weights = self.weights().await;

        // Nothing past the pickup cutoff can survive, so don't fetch it
        let query = RideQuery {
            pickup: request.pickup,
            radius_km: request.max_distance_km.min(PICKUP_CUTOFF_KM),
            seats_required: request.seats_required,
            limit: self.candidate_limit,
        };

        let rides = with_deadline(self.lookup_timeout, self.store.fetch_candidate_rides(&query)).await?;
        let fetched = rides.len();

        let prescreened: Vec<Prescreened> = rides
            .into_iter()
            .filter_map(|ride| {
                let ride_id = ride.id.clone();
                match self.engine.prescreen(ride, request, now) {
                    Ok(candidate) => Some(candidate),
                    Err(reason) => {
                        tracing::debug!(ride_id = %ride_id, "Candidate rejected: {}", reason);
                        None
                    }
                }
            })
            .collect();

        tracing::debug!("{} of {} fetched rides passed prescreening", prescreened.len(), fetched);

        if prescreened.is_empty() {
            return Ok(Vec::new());
        }

        let (drivers, passenger) =
            tokio::join!(self.driver_profiles(&prescreened), self.passenger_profile(request));
        let drivers = drivers?;

        let mut scored = Vec::with_capacity(prescreened.len());
        for candidate in prescreened {
            let Some(driver) = drivers.get(&candidate.ride.driver_id) else {
                tracing::warn!(ride_id = %candidate.ride.id, "Skipping ride without a driver profile");
                continue;
            };

            let ride_id = candidate.ride.id.clone();
            match self.engine.score(candidate, driver.clone(), passenger.as_ref(), request) {
                Ok(c) => scored.push(c),
                Err(reason) => tracing::debug!(ride_id = %ride_id, "Candidate rejected: {}", reason),
            }
        }

        normalize_scores(&mut scored);
        Ok(rank(scored, &weights, request.top_n))
    }

    /// Fan out one lookup per distinct driver and fan back in
    ///
    /// A driver whose lookup fails is left out of the map. The whole round
    /// shares one deadline.
    async fn driver_profiles(&self, candidates: &[Prescreened]) -> Result<HashMap<String, DriverProfile>, MatchError> {
        let mut seen = HashSet::new();
        let driver_ids: Vec<&str> = candidates
            .iter()
            .map(|c| c.ride.driver_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();

        let lookups = driver_ids.iter().map(|id| self.store.driver_profile(id));
        let results = tokio::time::timeout(self.lookup_timeout, join_all(lookups))
            .await
            .map_err(|_| MatchError::Deadline(self.lookup_timeout))?;

        Ok(driver_ids
            .into_iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(driver) => Some((id.to_string(), driver)),
                Err(e) => {
                    tracing::warn!(driver_id = %id, "Driver lookup failed: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Passenger profile for the eligibility filter, `None` when unavailable
    async fn passenger_profile(&self, request: &MatchRequest) -> Option<RiderProfile> {
        let passenger_id = request.passenger_id.as_deref()?;

        match with_deadline(self.lookup_timeout, self.store.rider_profile(passenger_id)).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(
                    passenger_id = %passenger_id,
                    "Passenger lookup failed, applying {:?} policy: {}",
                    self.engine.eligibility_policy(),
                    e
                );
                None
            }
        }
    }
}
