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
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// A scheduled driver trip, optionally joined with the driver's
/// public contact info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub driver_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<i64>,
    pub origin: String,
    pub destination: String,
    pub departure_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<Timestamp>,
    pub available_seats: i32,
    pub booked_seats: i32,
    pub remaining_seats: i32,
    pub price_per_seat: f64,
    pub whole_car_price: f64,
    pub status: TripStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub waypoints: Vec<String>,
    pub created_at: Timestamp,
}
