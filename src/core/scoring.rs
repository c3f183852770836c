//! Per-candidate gating and raw scoring.
//!
//! Gates run cheapest first. [`ScoringEngine::prescreen`] covers everything
//! that needs only the ride record (status, coordinates, distance cutoffs,
//! fare, seats) so the orchestrator can drop most candidates before any
//! profile lookup. [`ScoringEngine::score`] finishes the pipeline once the
//! driver snapshot is available.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::distance::distance_km;
use crate::core::fare::FareCalculator;
use crate::core::filters::{check_eligibility, complete_coordinates, is_bookable, EligibilityPolicy};
use crate::models::{DriverProfile, MatchRequest, RideOffer, RideStatus, RiderProfile, ScoredCandidate};

/// Driver pickup must be within this distance of the passenger's pickup
pub const PICKUP_CUTOFF_KM: f64 = 3.0;

/// Driver destination must be within this distance of the passenger's destination
pub const DESTINATION_CUTOFF_KM: f64 = 0.5;

/// Route score is forced to zero past this destination divergence
pub const ROUTE_DIVERGENCE_LIMIT_KM: f64 = 2.0;

const DESTINATION_DECAY_KM: f64 = 1.0;
const PICKUP_DECAY_KM: f64 = 10.0;
const DESTINATION_WEIGHT: f64 = 0.7;
const PICKUP_WEIGHT: f64 = 0.3;

/// Fare that earns a full price score
pub const PRICE_SCORE_FLOOR: f64 = 6.0;

/// Fare at and above which the price score is zero
pub const PRICE_SCORE_CEILING: f64 = 80.0;

pub const MAX_RATING: f64 = 5.0;

/// Why a candidate was dropped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("ride is not bookable (status {})", .0.as_str())]
    NotBookable(RideStatus),

    #[error("ride is missing pickup or destination coordinates")]
    MissingCoordinates,

    #[error("pickup is {0:.2} km away")]
    PickupTooFar(f64),

    #[error("destination diverges by {0:.2} km")]
    DestinationDiverges(f64),

    #[error("{0:.2} km is outside the search radius")]
    OutsideSearchRadius(f64),

    #[error("fare {fare:.2} exceeds budget {budget:.2}")]
    OverBudget { fare: f64, budget: f64 },

    #[error("{available} seats available, {required} required")]
    InsufficientSeats { available: u8, required: u8 },

    #[error("driver rating {rating:.2} below minimum {minimum:.2}")]
    RatingBelowThreshold { rating: f64, minimum: f64 },

    #[error("safety preferences are incompatible")]
    Ineligible,

    #[error("routes do not overlap")]
    NoRouteOverlap,
}

/// Ride that passed every gate that needs no driver data
#[derive(Debug, Clone)]
pub struct Prescreened {
    pub ride: RideOffer,
    pub pickup_distance_km: f64,
    pub destination_distance_km: f64,
    pub fare: f64,
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    fares: FareCalculator,
    eligibility_policy: EligibilityPolicy,
}

impl ScoringEngine {
    pub fn new(fares: FareCalculator, eligibility_policy: EligibilityPolicy) -> Self {
        Self {
            fares,
            eligibility_policy,
        }
    }

    pub fn fares(&self) -> &FareCalculator {
        &self.fares
    }

    pub fn eligibility_policy(&self) -> EligibilityPolicy {
        self.eligibility_policy
    }

    /// Gates 1-7: status, coordinates, distance cutoffs, radius, fare, seats
    pub fn prescreen(
        &self,
        ride: RideOffer,
        request: &MatchRequest,
        now: DateTime<Utc>,
    ) -> Result<Prescreened, Rejection> {
        if !is_bookable(&ride, now) {
            return Err(Rejection::NotBookable(ride.status));
        }

        let (pickup, destination) = complete_coordinates(&ride).ok_or(Rejection::MissingCoordinates)?;

        let pickup_distance_km = distance_km(&request.pickup, &pickup);
        if pickup_distance_km > PICKUP_CUTOFF_KM {
            return Err(Rejection::PickupTooFar(pickup_distance_km));
        }

        let destination_distance_km = distance_km(&request.destination, &destination);
        if destination_distance_km > DESTINATION_CUTOFF_KM {
            return Err(Rejection::DestinationDiverges(destination_distance_km));
        }

        let farthest = pickup_distance_km.max(destination_distance_km);
        if farthest > request.max_distance_km {
            return Err(Rejection::OutsideSearchRadius(farthest));
        }

        // Priced on the passenger's own trip, at the ride's scheduled time
        let trip_km = distance_km(&request.pickup, &request.destination);
        let fare = self.fares.fare(trip_km, ride.departure_time);
        if fare > request.max_willingness_to_pay {
            return Err(Rejection::OverBudget {
                fare,
                budget: request.max_willingness_to_pay,
            });
        }

        if ride.available_seats < request.seats_required {
            return Err(Rejection::InsufficientSeats {
                available: ride.available_seats,
                required: request.seats_required,
            });
        }

        Ok(Prescreened {
            ride,
            pickup_distance_km,
            destination_distance_km,
            fare,
        })
    }

    /// Gates 8-11: rating, eligibility, route overlap, then raw scores
    pub fn score(
        &self,
        candidate: Prescreened,
        driver: DriverProfile,
        passenger: Option<&RiderProfile>,
        request: &MatchRequest,
    ) -> Result<ScoredCandidate, Rejection> {
        // Written so a NaN rating never passes
        if !(driver.rating >= request.min_rating) {
            return Err(Rejection::RatingBelowThreshold {
                rating: driver.rating,
                minimum: request.min_rating,
            });
        }

        if !check_eligibility(passenger, &driver, self.eligibility_policy) {
            return Err(Rejection::Ineligible);
        }

        let route_score = route_score(candidate.pickup_distance_km, candidate.destination_distance_km);
        if route_score <= 0.0 {
            return Err(Rejection::NoRouteOverlap);
        }

        let price_score = price_score(candidate.fare);
        let reputation_score = reputation_score(driver.rating);

        Ok(ScoredCandidate {
            ride: candidate.ride,
            driver,
            route_score,
            price_score,
            reputation_score,
            pickup_distance_km: candidate.pickup_distance_km,
            destination_distance_km: candidate.destination_distance_km,
            fare: candidate.fare,
        })
    }
}

/// Geometric alignment in [0, 1], dominated by destination convergence
///
/// Zero once destinations diverge past [`ROUTE_DIVERGENCE_LIMIT_KM`]. The
/// prescreen cutoff is tighter, so this only bites if that gate is relaxed.
#[inline]
pub fn route_score(pickup_distance_km: f64, destination_distance_km: f64) -> f64 {
    if destination_distance_km > ROUTE_DIVERGENCE_LIMIT_KM {
        return 0.0;
    }

    let destination = (-destination_distance_km / DESTINATION_DECAY_KM).exp();
    let pickup = (-pickup_distance_km / PICKUP_DECAY_KM).exp();

    (DESTINATION_WEIGHT * destination + PICKUP_WEIGHT * pickup).clamp(0.0, 1.0)
}

/// Cheaper is better: 1.0 at the floor fare, 0.0 at the ceiling
#[inline]
pub fn price_score(fare: f64) -> f64 {
    let score = 1.0 - (fare - PRICE_SCORE_FLOOR) / (PRICE_SCORE_CEILING - PRICE_SCORE_FLOOR);
    score.clamp(0.0, 1.0)
}

#[inline]
pub fn reputation_score(rating: f64) -> f64 {
    (rating / MAX_RATING).clamp(0.0, 1.0)
}
