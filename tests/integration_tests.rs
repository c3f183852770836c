// Integration tests for the carpool matching service

use actix_web::test as actix_test;
use actix_web::{web, App};
use async_trait::async_trait;
use carpool_match::config::MatchingSettings;
use carpool_match::core::{
    fare::FareCalculator,
    filters::{can_match, EligibilityPolicy},
    distance::distance_km,
    Matcher, ScoringEngine,
};
use carpool_match::models::{
    DriverProfile, FindMatchesResponse, Gender, GeoPoint, MatchRequest, RideOffer, RideQuery, RideStatus,
    RiderProfile, SafetyPreference, ScoringWeights,
};
use carpool_match::routes::{self, AppState};
use carpool_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, CachedRideStore, RideStore, StoreError,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const CAMPUS: GeoPoint = GeoPoint::new(3.2167, 101.7333);
const CITY: GeoPoint = GeoPoint::new(3.1478, 101.6953);

/// In-memory ride store used in place of Appwrite
#[derive(Default)]
struct InMemoryStore {
    rides: Vec<RideOffer>,
    drivers: HashMap<String, DriverProfile>,
    riders: HashMap<String, RiderProfile>,
    unavailable: bool,
}

impl InMemoryStore {
    fn with_ride(mut self, ride: RideOffer, driver: DriverProfile) -> Self {
        self.drivers.insert(driver.driver_id.clone(), driver);
        self.rides.push(ride);
        self
    }

    fn with_rider(mut self, rider: RiderProfile) -> Self {
        self.riders.insert(rider.user_id.clone(), rider);
        self
    }
}

#[async_trait]
impl RideStore for InMemoryStore {
    async fn fetch_candidate_rides(&self, query: &RideQuery) -> Result<Vec<RideOffer>, StoreError> {
        if self.unavailable {
            return Err(StoreError::ApiError("store unavailable".to_string()));
        }
        Ok(self
            .rides
            .iter()
            .filter(|r| r.is_active)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn driver_profile(&self, driver_id: &str) -> Result<DriverProfile, StoreError> {
        self.drivers
            .get(driver_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(driver_id.to_string()))
    }

    async fn rider_profile(&self, user_id: &str) -> Result<RiderProfile, StoreError> {
        self.riders
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}

/// Wednesday 10:00 campus time
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 2, 0, 0).unwrap()
}

/// Wednesday 11:00 campus time, outside every surge window
fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 3, 0, 0).unwrap()
}

/// Point roughly `km` north of `origin`
fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(origin.latitude + km / 111.195, origin.longitude)
}

fn ride(id: &str, driver_id: &str, pickup: GeoPoint, destination: GeoPoint) -> RideOffer {
    RideOffer {
        id: id.to_string(),
        driver_id: driver_id.to_string(),
        pickup: Some(pickup),
        destination: Some(destination),
        departure_time: departure(),
        available_seats: 3,
        status: RideStatus::Scheduled,
        is_active: true,
        created_at: None,
    }
}

fn driver(id: &str, rating: f64, gender: Gender) -> DriverProfile {
    DriverProfile {
        driver_id: id.to_string(),
        name: format!("Driver {}", id),
        avatar_url: None,
        rating,
        rating_count: 20,
        gender,
        safety_preference: SafetyPreference::NoPreference,
        is_verified: true,
        vehicle: None,
    }
}

fn request() -> MatchRequest {
    MatchRequest {
        passenger_id: None,
        pickup: CAMPUS,
        destination: CITY,
        seats_required: 1,
        max_willingness_to_pay: 100.0,
        min_rating: 0.0,
        top_n: 10,
        max_distance_km: 10.0,
    }
}

fn matcher(store: InMemoryStore) -> Matcher {
    Matcher::new(
        Arc::new(store),
        ScoringEngine::new(FareCalculator::default(), EligibilityPolicy::FailOpen),
        ScoringWeights::default(),
    )
}

#[tokio::test]
async fn test_scenario_a_converging_ride_matches() {
    let store = InMemoryStore::default().with_ride(
        ride("r1", "d1", north_of(CAMPUS, 2.0), CITY),
        driver("d1", 4.5, Gender::Male),
    );

    let matches = matcher(store).find_best_matches_at(&request(), now()).await;

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].ride_id, "r1");
    assert!(matches[0].destination_distance_km < 1e-9);
    assert!(matches[0].route_score > 0.9);
}

#[tokio::test]
async fn test_scenario_b_diverging_destination_excluded() {
    let store = InMemoryStore::default()
        .with_ride(ride("far", "d1", CAMPUS, north_of(CITY, 5.0)), driver("d1", 4.5, Gender::Male))
        .with_ride(ride("near", "d2", CAMPUS, north_of(CITY, 0.2)), driver("d2", 4.5, Gender::Male));

    let matches = matcher(store).find_best_matches_at(&request(), now()).await;

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].ride_id, "near");
}

#[tokio::test]
async fn test_scenario_c_over_budget_excluded() {
    let fare = FareCalculator::default().fare(distance_km(&CAMPUS, &CITY), departure());
    assert!(fare > 10.0);

    let store = InMemoryStore::default().with_ride(ride("r1", "d1", CAMPUS, CITY), driver("d1", 5.0, Gender::Male));
    let mut req = request();
    req.max_willingness_to_pay = 10.0;

    let matches = matcher(store).find_best_matches_at(&req, now()).await;
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_scenario_d_female_only_excludes_male_driver() {
    assert!(!can_match(
        SafetyPreference::FemaleOnly,
        Gender::Female,
        SafetyPreference::NoPreference,
        Gender::Male
    ));

    let store = InMemoryStore::default()
        .with_ride(ride("r1", "d1", CAMPUS, CITY), driver("d1", 5.0, Gender::Male))
        .with_rider(RiderProfile {
            user_id: "rider-1".to_string(),
            gender: Gender::Female,
            safety_preference: SafetyPreference::FemaleOnly,
        });
    let mut req = request();
    req.passenger_id = Some("rider-1".to_string());

    let matches = matcher(store).find_best_matches_at(&req, now()).await;
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_female_only_keeps_female_driver() {
    let store = InMemoryStore::default()
        .with_ride(ride("r1", "d1", CAMPUS, CITY), driver("d1", 5.0, Gender::Male))
        .with_ride(ride("r2", "d2", CAMPUS, CITY), driver("d2", 4.2, Gender::Female))
        .with_rider(RiderProfile {
            user_id: "rider-1".to_string(),
            gender: Gender::Female,
            safety_preference: SafetyPreference::FemaleOnly,
        });
    let mut req = request();
    req.passenger_id = Some("rider-1".to_string());

    let matches = matcher(store).find_best_matches_at(&req, now()).await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].driver.driver_id, "d2");
}

#[tokio::test]
async fn test_results_sorted_and_gated() {
    let mut store = InMemoryStore::default();
    for i in 0..8 {
        let pickup = north_of(CAMPUS, 0.3 * i as f64);
        let destination = north_of(CITY, 0.05 * i as f64);
        store = store.with_ride(
            ride(&format!("r{}", i), &format!("d{}", i), pickup, destination),
            driver(&format!("d{}", i), 3.0 + 0.25 * i as f64, Gender::Female),
        );
    }

    let mut req = request();
    req.min_rating = 3.5;
    req.top_n = 4;
    let matches = matcher(store).find_best_matches_at(&req, now()).await;

    assert_eq!(matches.len(), 4);
    for pair in matches.windows(2) {
        assert!(pair[0].hybrid_score >= pair[1].hybrid_score);
    }
    for m in &matches {
        assert!(m.route_score >= 0.0 && m.route_score <= 1.0);
        assert!(m.destination_distance_km <= 0.5);
        assert!(m.fare <= req.max_willingness_to_pay);
        assert!(m.driver.rating >= req.min_rating);
    }
}

#[tokio::test]
async fn test_unbookable_and_incomplete_rides_skipped() {
    let mut completed = ride("done", "d1", CAMPUS, CITY);
    completed.status = RideStatus::Completed;
    let mut departed = ride("gone", "d2", CAMPUS, CITY);
    departed.departure_time = now() - chrono::Duration::minutes(1);
    let mut incomplete = ride("partial", "d3", CAMPUS, CITY);
    incomplete.destination = None;

    let store = InMemoryStore::default()
        .with_ride(completed, driver("d1", 4.0, Gender::Male))
        .with_ride(departed, driver("d2", 4.0, Gender::Male))
        .with_ride(incomplete, driver("d3", 4.0, Gender::Male))
        .with_ride(ride("ok", "d4", CAMPUS, CITY), driver("d4", 4.0, Gender::Male));

    let matches = matcher(store).find_best_matches_at(&request(), now()).await;
    let ids: Vec<&str> = matches.iter().map(|m| m.ride_id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
}

#[test]
fn test_store_outage_is_fail_soft() {
    let store = InMemoryStore {
        unavailable: true,
        ..InMemoryStore::default()
    }
    .with_ride(ride("r1", "d1", CAMPUS, CITY), driver("d1", 4.0, Gender::Male));

    let matcher = matcher(store);
    let matches = tokio_test::block_on(matcher.find_best_matches_at(&request(), now()));
    assert!(matches.is_empty());
}

#[test]
fn test_weights_constructor() {
    let weights = tokio_test::assert_ok!(ScoringWeights::new(0.5, 0.25, 0.25));
    assert_eq!(weights.route, 0.5);
    tokio_test::assert_err!(ScoringWeights::new(0.0, 0.0, 0.0));
}

// HTTP surface

fn app_state(store: InMemoryStore) -> AppState {
    AppState {
        matcher: matcher(store),
        matching: MatchingSettings::default(),
    }
}

fn live_store() -> InMemoryStore {
    let mut live = ride("r1", "d1", north_of(CAMPUS, 1.0), CITY);
    live.status = RideStatus::Active;
    InMemoryStore::default().with_ride(live, driver("d1", 4.6, Gender::Female))
}

#[actix_web::test]
async fn test_http_find_matches() {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(live_store())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/matches/find")
        .set_json(json!({
            "pickup": { "latitude": 3.2167, "longitude": 101.7333 },
            "destination": { "latitude": 3.1478, "longitude": 101.6953 },
            "seatsRequired": 1,
            "maxWillingnessToPay": 100.0,
            "topN": 5
        }))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: FindMatchesResponse = actix_test::read_body_json(resp).await;
    assert!(!body.search_id.is_empty());
    assert_eq!(body.total, 1);
    assert_eq!(body.matches[0].ride_id, "r1");
}

#[actix_web::test]
async fn test_http_find_matches_rejects_bad_coordinates() {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(live_store())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/matches/find")
        .set_json(json!({
            "pickup": { "latitude": 123.0, "longitude": 101.7333 },
            "destination": { "latitude": 3.1478, "longitude": 101.6953 },
            "maxWillingnessToPay": 20.0
        }))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 400);
}

#[actix_web::test]
async fn test_http_search_failure_is_not_5xx() {
    let store = InMemoryStore {
        unavailable: true,
        ..InMemoryStore::default()
    };
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(store)))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/matches/find")
        .set_json(json!({
            "pickup": { "latitude": 3.2167, "longitude": 101.7333 },
            "destination": { "latitude": 3.1478, "longitude": 101.6953 },
            "maxWillingnessToPay": 50.0
        }))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: FindMatchesResponse = actix_test::read_body_json(resp).await;
    assert_eq!(body.total, 0);
}

#[actix_web::test]
async fn test_http_weights_roundtrip() {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(live_store())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::put()
        .uri("/api/v1/scoring/weights")
        .set_json(json!({ "route": 2.0, "price": 1.0, "reputation": 1.0 }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert!((body["weights"]["route"].as_f64().unwrap() - 0.5).abs() < 1e-9);

    let req = actix_test::TestRequest::get().uri("/api/v1/scoring/weights").to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert!((body["weights"]["price"].as_f64().unwrap() - 0.25).abs() < 1e-9);

    let req = actix_test::TestRequest::put()
        .uri("/api/v1/scoring/weights")
        .set_json(json!({ "route": 0.0, "price": 0.0, "reputation": 0.0 }))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_http_fare_quote() {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(InMemoryStore::default())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::post()
        .uri("/api/v1/fares/quote")
        .set_json(json!({
            "pickup": { "latitude": 3.2167, "longitude": 101.7333 },
            "destination": { "latitude": 3.1478, "longitude": 101.6953 },
            "scheduledAt": "2026-10-14T00:30:00Z"
        }))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["surgeTier"], "peak");
    assert_eq!(body["surgeMultiplier"], 2.0);
    assert!(body["distanceKm"].as_f64().unwrap() > 8.0);
    assert!(body["fare"].as_f64().unwrap() > body["discountedFare"].as_f64().unwrap());
}

#[actix_web::test]
async fn test_http_health() {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(InMemoryStore::default())))
            .configure(routes::configure_routes),
    )
    .await;

    let req = actix_test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}

// Appwrite REST client against a mock server

const RIDES_PATH: &str = "/databases/test_db/collections/rides/documents";
const PROFILES_PATH: &str = "/databases/test_db/collections/profiles/documents";
const VEHICLES_PATH: &str = "/databases/test_db/collections/vehicles/documents";

fn appwrite_client(base_url: String) -> AppwriteClient {
    AppwriteClient::new(
        base_url,
        "test_key".to_string(),
        "test_project".to_string(),
        "test_db".to_string(),
        AppwriteCollections {
            rides: "rides".to_string(),
            profiles: "profiles".to_string(),
            vehicles: "vehicles".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

fn documents(docs: Value) -> String {
    let total = docs.as_array().map_or(0, |d| d.len());
    json!({ "total": total, "documents": docs }).to_string()
}

fn ride_query() -> RideQuery {
    RideQuery {
        pickup: CAMPUS,
        radius_km: 3.0,
        seats_required: 1,
        limit: 50,
    }
}

#[tokio::test]
async fn test_appwrite_fetch_candidate_rides() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", RIDES_PATH)
        .match_query(mockito::Matcher::Any)
        .match_header("x-appwrite-key", "test_key")
        .match_header("x-appwrite-project", "test_project")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(documents(json!([
            {
                "$id": "ride-1",
                "driverId": "d1",
                "pickupLat": 3.2170,
                "pickupLng": 101.7330,
                "destinationLat": 3.1478,
                "destinationLng": 101.6953,
                "departureTime": "2026-10-14T03:00:00.000+00:00",
                "availableSeats": 2,
                "status": "scheduled",
                "isActive": true,
                "$createdAt": "2026-10-13T12:00:00.000+00:00"
            },
            {
                "$id": "ride-2",
                "driverId": "d2",
                "departureTime": "2026-10-14T03:00:00.000+00:00",
                "availableSeats": 2,
                "status": "boarding"
            },
            {
                "$id": "broken",
                "availableSeats": "many"
            }
        ])))
        .create_async()
        .await;

    let client = appwrite_client(server.url());
    let rides = client.fetch_candidate_rides(&ride_query()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(rides.len(), 2);
    assert_eq!(rides[0].id, "ride-1");
    assert_eq!(rides[0].pickup, Some(GeoPoint::new(3.2170, 101.7330)));
    assert!(rides[0].created_at.is_some());
    assert_eq!(rides[1].status, RideStatus::Unknown);
    assert!(rides[1].pickup.is_none());
}

#[tokio::test]
async fn test_appwrite_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", RIDES_PATH)
        .match_query(mockito::Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Invalid API key"}"#)
        .create_async()
        .await;

    let client = appwrite_client(server.url());
    let result = client.fetch_candidate_rides(&ride_query()).await;
    assert!(matches!(result, Err(StoreError::Unauthorized)));
}

async fn mock_driver_records(server: &mut mockito::ServerGuard, hits: usize) -> (mockito::Mock, mockito::Mock) {
    let profiles = server
        .mock("GET", PROFILES_PATH)
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(documents(json!([{
            "$id": "p1",
            "userId": "d1",
            "name": "Aina",
            "gender": "female",
            "safetyPreference": "women-and-nonbinary-only",
            "ratings": [5, 4, 4.5]
        }])))
        .expect(hits)
        .create_async()
        .await;

    let vehicles = server
        .mock("GET", VEHICLES_PATH)
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(documents(json!([{
            "$id": "v1",
            "driverId": "d1",
            "model": "Perodua Axia",
            "color": "Red",
            "plateNumber": "BKR 4821",
            "verificationStatus": "verified"
        }])))
        .expect(hits)
        .create_async()
        .await;

    (profiles, vehicles)
}

#[tokio::test]
async fn test_appwrite_driver_profile_joins_vehicle() {
    let mut server = mockito::Server::new_async().await;
    let (profiles, vehicles) = mock_driver_records(&mut server, 1).await;

    let client = appwrite_client(server.url());
    let driver = client.driver_profile("d1").await.unwrap();

    profiles.assert_async().await;
    vehicles.assert_async().await;
    assert_eq!(driver.name, "Aina");
    assert!((driver.rating - 4.5).abs() < 1e-9);
    assert_eq!(driver.rating_count, 3);
    assert_eq!(driver.safety_preference, SafetyPreference::WomenAndNonbinaryOnly);
    assert!(driver.is_verified);
    assert_eq!(driver.vehicle.unwrap().plate_number.as_deref(), Some("BKR 4821"));
}

#[tokio::test]
async fn test_appwrite_missing_profile_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _profiles = server
        .mock("GET", PROFILES_PATH)
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(documents(json!([])))
        .create_async()
        .await;

    let client = appwrite_client(server.url());
    assert!(matches!(client.rider_profile("nobody").await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_cached_store_absorbs_repeat_driver_lookups() {
    let mut server = mockito::Server::new_async().await;
    let (profiles, vehicles) = mock_driver_records(&mut server, 1).await;

    let store = CachedRideStore::new(
        appwrite_client(server.url()),
        Arc::new(CacheManager::in_memory(100, 60)),
    );

    let first = store.driver_profile("d1").await.unwrap();
    let second = store.driver_profile("d1").await.unwrap();

    profiles.assert_async().await;
    vehicles.assert_async().await;
    assert_eq!(first.driver_id, second.driver_id);
    assert_eq!(second.vehicle.unwrap().model, "Perodua Axia");
}

#[tokio::test]
async fn test_matcher_over_appwrite() {
    let mut server = mockito::Server::new_async().await;
    let _rides = server
        .mock("GET", RIDES_PATH)
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(documents(json!([{
            "$id": "ride-1",
            "driverId": "d1",
            "pickupLat": 3.2200,
            "pickupLng": 101.7333,
            "destinationLat": 3.1478,
            "destinationLng": 101.6953,
            "departureTime": "2026-10-14T03:00:00+00:00",
            "availableSeats": 3,
            "status": "scheduled",
            "isActive": true
        }])))
        .create_async()
        .await;
    let _driver = mock_driver_records(&mut server, 1).await;

    let matcher = Matcher::new(
        Arc::new(appwrite_client(server.url())),
        ScoringEngine::new(FareCalculator::default(), EligibilityPolicy::FailOpen),
        ScoringWeights::default(),
    );

    let matches = matcher.find_best_matches_at(&request(), now()).await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].ride_id, "ride-1");
    assert_eq!(matches[0].driver.name, "Aina");
    assert!(matches[0].driver.vehicle.is_some());
}
