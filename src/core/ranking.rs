use thiserror::Error;

use crate::models::{MatchQuality, MatchResult, ScoredCandidate, ScoringWeights};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("weight {name} must be finite and non-negative, got {value}")]
    Invalid { name: &'static str, value: f64 },

    #[error("at least one weight must be positive")]
    AllZero,
}

impl ScoringWeights {
    /// Validated weights, rescaled to sum to 1.0
    pub fn new(route: f64, price: f64, reputation: f64) -> Result<Self, WeightsError> {
        for (name, value) in [("route", route), ("price", price), ("reputation", reputation)] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid { name, value });
            }
        }

        let total = route + price + reputation;
        if total <= 0.0 {
            return Err(WeightsError::AllZero);
        }

        Ok(Self {
            route: route / total,
            price: price / total,
            reputation: reputation / total,
        })
    }

    /// Re-validate and rescale, e.g. after deserializing from config
    pub fn normalized(self) -> Result<Self, WeightsError> {
        Self::new(self.route, self.price, self.reputation)
    }

    #[inline]
    pub fn hybrid(&self, route: f64, price: f64, reputation: f64) -> f64 {
        self.route * route + self.price * price + self.reputation * reputation
    }
}

/// Combine normalized scores, sort descending and keep the best `top_n`
///
/// The sort is stable, so equal hybrid scores keep their fetch order.
pub fn rank(candidates: Vec<ScoredCandidate>, weights: &ScoringWeights, top_n: usize) -> Vec<MatchResult> {
    let mut ranked: Vec<(f64, ScoredCandidate)> = candidates
        .into_iter()
        .map(|c| (weights.hybrid(c.route_score, c.price_score, c.reputation_score), c))
        .collect();

    ranked.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_n);

    ranked
        .into_iter()
        .map(|(hybrid, c)| MatchResult {
            ride_id: c.ride.id,
            departure_time: c.ride.departure_time,
            available_seats: c.ride.available_seats,
            status: c.ride.status,
            driver: c.driver,
            fare: c.fare,
            hybrid_score: hybrid,
            route_score: c.route_score,
            price_score: c.price_score,
            reputation_score: c.reputation_score,
            pickup_distance_km: c.pickup_distance_km,
            destination_distance_km: c.destination_distance_km,
            quality: MatchQuality::from_score(hybrid),
        })
        .collect()
}
