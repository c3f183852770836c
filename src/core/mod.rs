// Core algorithm exports
pub mod distance;
pub mod fare;
pub mod filters;
pub mod matcher;
pub mod normalize;
pub mod ranking;
pub mod scoring;

pub use distance::{calculate_bounding_box, distance_km, haversine_distance, is_within_bounding_box};
pub use fare::{FareBreakdown, FareCalculator, FareSchedule, SurgeTier};
pub use filters::{can_match, check_eligibility, EligibilityPolicy};
pub use matcher::{MatchError, Matcher};
pub use normalize::normalize_scores;
pub use ranking::{rank, WeightsError};
pub use scoring::{Prescreened, Rejection, ScoringEngine};
