//! Campus carpool matching engine
//!
//! Ranks ride offers for a passenger by route alignment, fare and driver
//! reputation. Candidates are fetched through a [`services::RideStore`],
//! screened by hard gates, scored, min-max normalized and combined with
//! runtime-adjustable weights.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{distance::haversine_distance, EligibilityPolicy, FareCalculator, Matcher, ScoringEngine};
pub use crate::models::{FindMatchesRequest, FindMatchesResponse, MatchRequest, MatchResult, ScoringWeights};
pub use crate::services::{RideStore, StoreError};
