use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both coordinates are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Lifecycle state of a ride offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Scheduled,
    Active,
    InProgress,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Scheduled => "scheduled",
            RideStatus::Active => "active",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Unknown => "unknown",
        }
    }
}

/// Ride offered by a driver, as read from the ride store
///
/// The stored fare on the record is not read; fares are recomputed from
/// the passenger's own trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideOffer {
    pub id: String,
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(default)]
    pub pickup: Option<GeoPoint>,
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    #[serde(rename = "departureTime")]
    pub departure_time: DateTime<Utc>,
    #[serde(rename = "availableSeats")]
    pub available_seats: u8,
    pub status: RideStatus,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

/// Gender as recorded on a user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    #[serde(alias = "non-binary", alias = "nonbinary")]
    NonBinary,
    #[serde(other)]
    Unspecified,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unspecified
    }
}

/// Safety preference a user sets on who they will ride with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyPreference {
    #[serde(alias = "none", alias = "no-preference")]
    NoPreference,
    #[serde(alias = "female-only")]
    FemaleOnly,
    #[serde(alias = "same-gender-only")]
    SameGenderOnly,
    #[serde(alias = "women-and-nonbinary-only")]
    WomenAndNonbinaryOnly,
    #[serde(other)]
    Unrecognized,
}

impl Default for SafetyPreference {
    fn default() -> Self {
        SafetyPreference::NoPreference
    }
}

/// Vehicle and verification record attached to a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub model: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "plateNumber", default)]
    pub plate_number: Option<String>,
}

/// Read-only snapshot of a driver, composed from profile and vehicle records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    pub name: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
    pub rating: f64,
    #[serde(rename = "ratingCount")]
    pub rating_count: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(rename = "safetyPreference", default)]
    pub safety_preference: SafetyPreference,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(default)]
    pub vehicle: Option<VehicleInfo>,
}

/// Passenger attributes needed by the eligibility filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(rename = "safetyPreference", default)]
    pub safety_preference: SafetyPreference,
}

/// A passenger's search, transient per call
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub passenger_id: Option<String>,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub seats_required: u8,
    pub max_willingness_to_pay: f64,
    pub min_rating: f64,
    pub top_n: usize,
    pub max_distance_km: f64,
}

/// Parameters handed to the candidate ride fetcher
#[derive(Debug, Clone)]
pub struct RideQuery {
    pub pickup: GeoPoint,
    pub radius_km: f64,
    pub seats_required: u8,
    pub limit: usize,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Candidate that survived every gate, with raw scores in [0, 1]
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub ride: RideOffer,
    pub driver: DriverProfile,
    pub route_score: f64,
    pub price_score: f64,
    pub reputation_score: f64,
    pub pickup_distance_km: f64,
    pub destination_distance_km: f64,
    pub fare: f64,
}

/// Display label derived from the hybrid score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchQuality {
    #[serde(rename = "Best Match")]
    Best,
    #[serde(rename = "Great Match")]
    Great,
    #[serde(rename = "Good Match")]
    Good,
    #[serde(rename = "Fair Match")]
    Fair,
}

impl MatchQuality {
    pub fn from_score(hybrid: f64) -> Self {
        if hybrid >= 0.8 {
            MatchQuality::Best
        } else if hybrid >= 0.6 {
            MatchQuality::Great
        } else if hybrid >= 0.4 {
            MatchQuality::Good
        } else {
            MatchQuality::Fair
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchQuality::Best => "Best Match",
            MatchQuality::Great => "Great Match",
            MatchQuality::Good => "Good Match",
            MatchQuality::Fair => "Fair Match",
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ranked match returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "rideId")]
    pub ride_id: String,
    #[serde(rename = "departureTime")]
    pub departure_time: DateTime<Utc>,
    #[serde(rename = "availableSeats")]
    pub available_seats: u8,
    pub status: RideStatus,
    pub driver: DriverProfile,
    pub fare: f64,
    #[serde(rename = "hybridScore")]
    pub hybrid_score: f64,
    #[serde(rename = "routeScore")]
    pub route_score: f64,
    #[serde(rename = "priceScore")]
    pub price_score: f64,
    #[serde(rename = "reputationScore")]
    pub reputation_score: f64,
    #[serde(rename = "pickupDistanceKm")]
    pub pickup_distance_km: f64,
    #[serde(rename = "destinationDistanceKm")]
    pub destination_distance_km: f64,
    pub quality: MatchQuality,
}

/// Relative weights of the three score dimensions
///
/// Sum to 1.0 once built through `ScoringWeights::new` or `normalized`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub route: f64,
    pub price: f64,
    pub reputation: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            route: 0.4,
            price: 0.3,
            reputation: 0.3,
        }
    }
}
