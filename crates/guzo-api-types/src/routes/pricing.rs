use serde::{Deserialize, Serialize};

use crate::pricing::SurgeReason;
use crate::util::Timestamp;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct CreatePricingRule {
    pub origin: String,
    pub destination: String,
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub estimated_distance_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdatePricingRule {
    pub base_fare: Option<f64>,
    pub per_km_rate: Option<f64>,
    pub estimated_distance_km: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct CreateSurge {
    /// `"origin-destination"` or `"*"` for every route.
    pub route_key: String,
    pub multiplier: f64,
    #[serde(default = "SurgeReason::default_create")]
    #[cfg_attr(feature = "server", builder(default = SurgeReason::Manual))]
    pub reason: SurgeReason,
    pub description: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "server", builder(default))]
    pub recurring: bool,
    #[serde(default)]
    #[cfg_attr(feature = "server", builder(default))]
    pub recurring_days: Vec<i32>,
    pub recurring_start_hour: Option<i32>,
    pub recurring_end_hour: Option<i32>,
}

impl SurgeReason {
    // Required by serde
    #[doc(hidden)]
    #[must_use]
    pub fn default_create() -> Self {
        Self::Manual
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateSurge {
    pub multiplier: Option<f64>,
    pub reason: Option<SurgeReason>,
    pub description: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoteRoute {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListSurges {
    #[serde(default)]
    pub active_only: bool,
}

fn default_demand_days() -> i64 {
    7
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemandRoute {
    pub origin: String,
    pub destination: String,
    #[serde(default = "default_demand_days")]
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DayCount {
    /// Calendar day formatted `YYYY-MM-DD`.
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DemandStats {
    pub total_bookings: i64,
    pub avg_daily_bookings: f64,
    pub bookings_by_day: Vec<DayCount>,
    pub suggested_surge: f64,
}
