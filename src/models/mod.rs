// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, DriverProfile, Gender, GeoPoint, MatchQuality, MatchRequest, MatchResult,
    RideOffer, RideQuery, RideStatus, RiderProfile, SafetyPreference, ScoredCandidate,
    ScoringWeights, VehicleInfo,
};
pub use requests::{FareQuoteRequest, FindMatchesRequest, UpdateWeightsRequest};
pub use responses::{ErrorResponse, FareQuoteResponse, FindMatchesResponse, HealthResponse, WeightsResponse};
