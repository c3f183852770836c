//! Tiered, time-surged fare calculation.
//!
//! A fare is built in four steps:
//! 1. a flat charge for the first kilometre plus cumulative per-km bands
//!    (1-10, 10-20, 20-35, >35 km) at decreasing rates
//! 2. a fixed platform discount
//! 3. a surge multiplier keyed to the trip's scheduled local time
//! 4. a minimum floor

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Pricing constants, in ringgit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareSchedule {
    #[serde(default = "default_first_km_fare")]
    pub first_km_fare: f64,
    #[serde(default = "default_rate_to_10km")]
    pub rate_to_10km: f64,
    #[serde(default = "default_rate_to_20km")]
    pub rate_to_20km: f64,
    #[serde(default = "default_rate_to_35km")]
    pub rate_to_35km: f64,
    #[serde(default = "default_rate_beyond_35km")]
    pub rate_beyond_35km: f64,
    #[serde(default = "default_discount_factor")]
    pub discount_factor: f64,
    #[serde(default = "default_minimum_fare")]
    pub minimum_fare: f64,
    /// Offset of campus local time from UTC, used for surge windows
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_first_km_fare() -> f64 { 10.00 }
fn default_rate_to_10km() -> f64 { 1.50 }
fn default_rate_to_20km() -> f64 { 1.20 }
fn default_rate_to_35km() -> f64 { 1.00 }
fn default_rate_beyond_35km() -> f64 { 0.80 }
fn default_discount_factor() -> f64 { 0.60 }
fn default_minimum_fare() -> f64 { 6.00 }
fn default_utc_offset_hours() -> i32 { 8 }

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            first_km_fare: default_first_km_fare(),
            rate_to_10km: default_rate_to_10km(),
            rate_to_20km: default_rate_to_20km(),
            rate_to_35km: default_rate_to_35km(),
            rate_beyond_35km: default_rate_beyond_35km(),
            discount_factor: default_discount_factor(),
            minimum_fare: default_minimum_fare(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Surge tiers, ordered from cheapest to most expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeTier {
    Standard,
    Moderate,
    LateNight,
    Peak,
}

impl SurgeTier {
    pub fn multiplier(&self) -> f64 {
        match self {
            SurgeTier::Standard => 1.0,
            SurgeTier::Moderate => 1.3,
            SurgeTier::LateNight => 1.5,
            SurgeTier::Peak => 2.0,
        }
    }
}

/// Every intermediate value of a fare computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    #[serde(rename = "baseFare")]
    pub base_fare: f64,
    #[serde(rename = "discountedFare")]
    pub discounted_fare: f64,
    #[serde(rename = "surgeTier")]
    pub surge_tier: SurgeTier,
    #[serde(rename = "surgeMultiplier")]
    pub surge_multiplier: f64,
    pub fare: f64,
}

#[derive(Debug, Clone)]
pub struct FareCalculator {
    schedule: FareSchedule,
    local_offset: FixedOffset,
}

impl FareCalculator {
    pub fn new(schedule: FareSchedule) -> Self {
        let local_offset = FixedOffset::east_opt(schedule.utc_offset_hours.clamp(-12, 14) * 3600)
            .unwrap_or_else(|| Utc.fix());

        Self {
            schedule,
            local_offset,
        }
    }

    pub fn schedule(&self) -> &FareSchedule {
        &self.schedule
    }

    /// Final fare for a trip of `distance_km` departing at `trip_time`
    #[inline]
    pub fn fare(&self, distance_km: f64, trip_time: DateTime<Utc>) -> f64 {
        self.breakdown(distance_km, trip_time).fare
    }

    pub fn breakdown(&self, distance_km: f64, trip_time: DateTime<Utc>) -> FareBreakdown {
        let base_fare = self.base_fare(distance_km);
        let discounted_fare = base_fare * self.schedule.discount_factor;
        let surge_tier = self.surge_tier(trip_time);
        let surge_multiplier = surge_tier.multiplier();

        let fare = round_to_cents(discounted_fare * surge_multiplier).max(self.schedule.minimum_fare);

        FareBreakdown {
            base_fare: round_to_cents(base_fare),
            discounted_fare: round_to_cents(discounted_fare),
            surge_tier,
            surge_multiplier,
            fare,
        }
    }

    /// Undiscounted tiered fare; each band is billed only for the distance inside it
    pub fn base_fare(&self, distance_km: f64) -> f64 {
        let distance = if distance_km.is_finite() { distance_km.max(0.0) } else { 0.0 };
        let s = &self.schedule;

        let bands = [
            (1.0, 10.0, s.rate_to_10km),
            (10.0, 20.0, s.rate_to_20km),
            (20.0, 35.0, s.rate_to_35km),
            (35.0, f64::INFINITY, s.rate_beyond_35km),
        ];

        bands
            .iter()
            .filter(|(start, _, _)| distance > *start)
            .fold(s.first_km_fare, |fare, (start, end, rate)| {
                fare + (distance.min(*end) - start) * rate
            })
    }

    /// Surge tier for the trip's scheduled time, evaluated in campus local time
    pub fn surge_tier(&self, trip_time: DateTime<Utc>) -> SurgeTier {
        let local = trip_time.with_timezone(&self.local_offset);
        let hour = local.hour();
        let weekend = matches!(local.weekday(), Weekday::Sat | Weekday::Sun);

        let rush = (7..9).contains(&hour) || (17..19).contains(&hour);
        let late_night = hour >= 23 || hour < 2;
        let lunch = (12..14).contains(&hour);
        let evening = (17..19).contains(&hour);

        if !weekend && rush {
            SurgeTier::Peak
        } else if late_night {
            SurgeTier::LateNight
        } else if (!weekend && lunch) || (weekend && evening) {
            SurgeTier::Moderate
        } else {
            SurgeTier::Standard
        }
    }
}

impl Default for FareCalculator {
    fn default() -> Self {
        Self::new(FareSchedule::default())
    }
}

#[inline]
fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
