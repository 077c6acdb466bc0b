use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::util::Timestamp;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum SurgeReason {
    PeakHours,
    HighDemand,
    Holiday,
    Weather,
    SpecialEvent,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub estimated_distance_km: f64,
    /// `base_fare + per_km_rate * estimated_distance_km`, before any
    /// surge multiplier.
    pub calculated_price: f64,
    pub active: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surge {
    pub id: i64,
    /// `"origin-destination"` or `"*"` for every route.
    pub route_key: String,
    pub multiplier: f64,
    pub reason: SurgeReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub active: bool,
    pub recurring: bool,
    pub created_at: Timestamp,
}

/// Result of quoting a route at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base_price: f64,
    pub surge_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surge_reason: Option<String>,
    pub final_price: f64,
    pub surge_active: bool,
}

/// Suggested pricing for a driver creating a trip on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPricingSuggestion {
    pub price_per_seat: f64,
    pub whole_car_price: f64,
    pub surge_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surge_reason: Option<String>,
}
