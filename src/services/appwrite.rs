use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::core::distance::{calculate_bounding_box, is_within_bounding_box};
use crate::models::{
    DriverProfile, Gender, GeoPoint, RideOffer, RideQuery, RideStatus, RiderProfile,
    SafetyPreference, VehicleInfo,
};
use crate::services::store::{average_rating, RideStore, StoreError};

/// Ride statuses worth fetching; the scoring engine re-checks them
const FETCHABLE_STATUSES: [RideStatus; 3] = [RideStatus::Scheduled, RideStatus::Active, RideStatus::InProgress];

/// Appwrite API client
///
/// Reads ride offers, user profiles and vehicle records from an Appwrite
/// database. Never writes.
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub rides: String,
    pub profiles: String,
    pub vehicles: String,
}

/// Ride document as stored, with flat coordinate columns
#[derive(Debug, Deserialize)]
struct RideDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "driverId")]
    driver_id: String,
    #[serde(rename = "pickupLat", default)]
    pickup_lat: Option<f64>,
    #[serde(rename = "pickupLng", default)]
    pickup_lng: Option<f64>,
    #[serde(rename = "destinationLat", default)]
    destination_lat: Option<f64>,
    #[serde(rename = "destinationLng", default)]
    destination_lng: Option<f64>,
    #[serde(rename = "departureTime")]
    departure_time: DateTime<Utc>,
    #[serde(rename = "availableSeats")]
    available_seats: u8,
    status: RideStatus,
    #[serde(rename = "isActive", default)]
    is_active: Option<bool>,
    #[serde(rename = "$createdAt", alias = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RideDocument> for RideOffer {
    fn from(doc: RideDocument) -> Self {
        let point = |lat: Option<f64>, lng: Option<f64>| match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };

        RideOffer {
            id: doc.id,
            driver_id: doc.driver_id,
            pickup: point(doc.pickup_lat, doc.pickup_lng),
            destination: point(doc.destination_lat, doc.destination_lng),
            departure_time: doc.departure_time,
            available_seats: doc.available_seats,
            status: doc.status,
            is_active: doc.is_active.unwrap_or(true),
            created_at: doc.created_at,
        }
    }
}

/// Profile document; rating may be an aggregate or a list of raw ratings
#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(alias = "fullName", default)]
    name: Option<String>,
    #[serde(rename = "avatarUrl", default)]
    avatar_url: Option<String>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(rename = "safetyPreference", default)]
    safety_preference: Option<SafetyPreference>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(rename = "ratingCount", default)]
    rating_count: Option<u32>,
    #[serde(default)]
    ratings: Vec<f64>,
    #[serde(rename = "isVerified", default)]
    is_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct VehicleDocument {
    model: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(rename = "plateNumber", default)]
    plate_number: Option<String>,
    #[serde(rename = "verificationStatus", default)]
    verification_status: Option<String>,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    /// List documents in a collection matching Appwrite query strings
    async fn list_documents(&self, collection: &str, queries: &[String]) -> Result<Vec<Value>, StoreError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| StoreError::ApiError(format!("Failed to encode queries: {}", e)))?;

        let url = format!(
            "{}/databases/{}/collections/{}/documents?query={}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection,
            urlencoding::encode(&queries_json)
        );

        tracing::debug!("Listing {} with {} queries", collection, queries.len());

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(StoreError::Unauthorized),
            StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound(format!("Collection {} not found", collection)))
            }
            status => {
                let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Appwrite returned {} for {}: {}", status, collection, body);
                return Err(StoreError::ApiError(format!("Failed to list {}: {}", collection, status)));
            }
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| StoreError::InvalidResponse("Missing documents array".into()))?;

        Ok(documents
            .iter()
            .map(|doc| doc.get("data").unwrap_or(doc).clone())
            .collect())
    }

    async fn first_document(&self, collection: &str, queries: &[String]) -> Result<Option<Value>, StoreError> {
        let mut documents = self.list_documents(collection, queries).await?;
        Ok(if documents.is_empty() { None } else { Some(documents.swap_remove(0)) })
    }

    async fn profile_document(&self, user_id: &str) -> Result<ProfileDocument, StoreError> {
        let queries = vec![equal("userId", user_id), "limit(1)".to_string()];

        let doc = self
            .first_document(&self.collections.profiles, &queries)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))?;

        serde_json::from_value(doc)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }

    async fn vehicle_document(&self, driver_id: &str) -> Result<Option<VehicleDocument>, StoreError> {
        let queries = vec![equal("driverId", driver_id), "limit(1)".to_string()];

        match self.first_document(&self.collections.vehicles, &queries).await? {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse vehicle: {}", e))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RideStore for AppwriteClient {
    async fn fetch_candidate_rides(&self, query: &RideQuery) -> Result<Vec<RideOffer>, StoreError> {
        let bbox = calculate_bounding_box(&query.pickup, query.radius_km);
        let queries = ride_queries(query);

        let documents = self.list_documents(&self.collections.rides, &queries).await?;
        let total = documents.len();

        let rides: Vec<RideOffer> = documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<RideDocument>(doc) {
                Ok(ride) => Some(RideOffer::from(ride)),
                Err(e) => {
                    tracing::warn!("Skipping malformed ride document: {}", e);
                    None
                }
            })
            .filter(|ride| ride.is_active)
            .filter(|ride| ride.pickup.map_or(true, |p| is_within_bounding_box(&p, &bbox)))
            .collect();

        tracing::debug!("Fetched {} candidate rides ({} documents)", rides.len(), total);

        Ok(rides)
    }

    async fn driver_profile(&self, driver_id: &str) -> Result<DriverProfile, StoreError> {
        let (profile, vehicle) = tokio::join!(self.profile_document(driver_id), self.vehicle_document(driver_id));

        // The vehicle is display data; a failed lookup leaves the driver unverified
        let vehicle = vehicle.unwrap_or_else(|e| {
            tracing::warn!("Vehicle lookup failed for driver {}: {}", driver_id, e);
            None
        });

        Ok(compose_driver_profile(profile?, vehicle))
    }

    async fn rider_profile(&self, user_id: &str) -> Result<RiderProfile, StoreError> {
        let profile = self.profile_document(user_id).await?;

        Ok(RiderProfile {
            user_id: profile.user_id,
            gender: profile.gender.unwrap_or_default(),
            safety_preference: profile.safety_preference.unwrap_or_default(),
        })
    }
}

fn equal(attribute: &str, value: &str) -> String {
    format!("equal(\"{}\", [{}])", attribute, Value::String(value.to_string()))
}

/// Appwrite query strings narrowing rides to the pickup's neighbourhood
fn ride_queries(query: &RideQuery) -> Vec<String> {
    let bbox = calculate_bounding_box(&query.pickup, query.radius_km);

    let statuses = FETCHABLE_STATUSES
        .iter()
        .map(|s| format!("\"{}\"", s.as_str()))
        .collect::<Vec<_>>()
        .join(",");

    vec![
        "equal(\"isActive\", [true])".to_string(),
        format!("equal(\"status\", [{}])", statuses),
        format!("greaterThanEqual(\"availableSeats\", {})", query.seats_required),
        format!("greaterThanEqual(\"pickupLat\", {})", bbox.min_lat),
        format!("lessThanEqual(\"pickupLat\", {})", bbox.max_lat),
        format!("greaterThanEqual(\"pickupLng\", {})", bbox.min_lon),
        format!("lessThanEqual(\"pickupLng\", {})", bbox.max_lon),
        "orderAsc(\"departureTime\")".to_string(),
        format!("limit({})", query.limit),
    ]
}

fn compose_driver_profile(profile: ProfileDocument, vehicle: Option<VehicleDocument>) -> DriverProfile {
    let rating = profile.rating.unwrap_or_else(|| average_rating(&profile.ratings));
    let rating_count = profile.rating_count.unwrap_or(profile.ratings.len() as u32);

    let vehicle_verified = vehicle
        .as_ref()
        .and_then(|v| v.verification_status.as_deref())
        .map_or(false, |s| s.eq_ignore_ascii_case("verified"));

    DriverProfile {
        name: profile.name.unwrap_or_else(|| "Driver".to_string()),
        driver_id: profile.user_id,
        avatar_url: profile.avatar_url,
        rating,
        rating_count,
        gender: profile.gender.unwrap_or_default(),
        safety_preference: profile.safety_preference.unwrap_or_default(),
        is_verified: vehicle_verified || profile.is_verified.unwrap_or(false),
        vehicle: vehicle.map(|v| VehicleInfo {
            model: v.model,
            color: v.color,
            plate_number: v.plate_number,
        }),
    }
}
