use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DriverProfile, Gender, GeoPoint, RideOffer, RideStatus, RiderProfile, SafetyPreference};

/// What to do when the passenger's gender/preference cannot be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityPolicy {
    /// Permit the match
    #[default]
    FailOpen,
    /// Reject the match
    FailClosed,
}

/// Gender-preference compatibility between a passenger and a driver
///
/// Rules are evaluated in order and the first failing rule rejects:
/// 1. passenger `FemaleOnly` requires a female driver
/// 2. passenger `SameGenderOnly` requires equal genders, and the passenger's
///    gender must be known: an `Unspecified` passenger is rejected even
///    against an `Unspecified` driver
/// 3. driver `WomenAndNonbinaryOnly` requires a female or non-binary passenger
#[inline]
pub fn can_match(
    passenger_pref: SafetyPreference,
    passenger_gender: Gender,
    driver_pref: SafetyPreference,
    driver_gender: Gender,
) -> bool {
    match passenger_pref {
        SafetyPreference::FemaleOnly if driver_gender != Gender::Female => return false,
        SafetyPreference::SameGenderOnly
            if passenger_gender == Gender::Unspecified || passenger_gender != driver_gender =>
        {
            return false
        }
        _ => {}
    }

    if driver_pref == SafetyPreference::WomenAndNonbinaryOnly
        && !matches!(passenger_gender, Gender::Female | Gender::NonBinary)
    {
        return false;
    }

    true
}

/// Apply [`can_match`], falling back to `policy` when the passenger profile is unavailable
pub fn check_eligibility(
    passenger: Option<&RiderProfile>,
    driver: &DriverProfile,
    policy: EligibilityPolicy,
) -> bool {
    match passenger {
        Some(p) => can_match(p.safety_preference, p.gender, driver.safety_preference, driver.gender),
        None => match policy {
            EligibilityPolicy::FailOpen => true,
            EligibilityPolicy::FailClosed => false,
        },
    }
}

/// Ride is live, or scheduled to leave after `now`
#[inline]
pub fn is_bookable(ride: &RideOffer, now: DateTime<Utc>) -> bool {
    match ride.status {
        RideStatus::Active | RideStatus::InProgress => true,
        RideStatus::Scheduled => ride.departure_time > now,
        RideStatus::Completed | RideStatus::Cancelled | RideStatus::Unknown => false,
    }
}

/// Both ride endpoints are present and valid coordinates
#[inline]
pub fn complete_coordinates(ride: &RideOffer) -> Option<(GeoPoint, GeoPoint)> {
    match (ride.pickup, ride.destination) {
        (Some(pickup), Some(destination)) if pickup.is_valid() && destination.is_valid() => {
            Some((pickup, destination))
        }
        _ => None,
    }
}
