use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::trip::TripStatus;
use crate::util::Timestamp;

/// Publish a scheduled trip. Driver only.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct CreateTrip {
    pub origin: String,
    pub destination: String,
    pub departure_time: Timestamp,
    pub estimated_arrival: Option<Timestamp>,
    pub available_seats: i32,
    pub price_per_seat: f64,
    pub whole_car_price: f64,
    pub vehicle_id: Option<i64>,
    pub notes: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "server", builder(default))]
    pub waypoints: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateTrip {
    pub departure_time: Option<Timestamp>,
    pub estimated_arrival: Option<Timestamp>,
    pub available_seats: Option<i32>,
    pub price_per_seat: Option<f64>,
    pub whole_car_price: Option<f64>,
    pub status: Option<TripStatus>,
    pub notes: Option<String>,
}

fn default_min_seats() -> i32 {
    1
}

/// Query parameters accepted by trip search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchTrips {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Restricts departures to this calendar day (UTC).
    pub date: Option<NaiveDate>,
    #[serde(default = "default_min_seats")]
    pub min_seats: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListDriverTrips {
    #[serde(default)]
    pub include_past: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListUpcoming {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SuggestTripPricing {
    pub origin: String,
    pub destination: String,
}
