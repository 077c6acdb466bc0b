use serde::{Deserialize, Serialize};

use crate::booking::BookingStatus;
use crate::util::Timestamp;

fn default_seats() -> i32 {
    1
}

/// Reserve seats (or the whole car) on a scheduled trip.
///
/// `customer_name`/`customer_phone` default to the authenticated
/// customer's profile; staff may override them when booking on behalf
/// of a phone-in customer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
pub struct BookTrip {
    pub trip_id: i64,
    #[serde(default = "default_seats")]
    #[cfg_attr(feature = "server", builder(default = 1))]
    pub seats: i32,
    #[serde(default)]
    #[cfg_attr(feature = "server", builder(default))]
    pub whole_car: bool,
    #[cfg_attr(feature = "server", builder(into))]
    pub customer_name: Option<String>,
    #[cfg_attr(feature = "server", builder(into))]
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub special_requests: Option<String>,
}

/// File a custom charter request with no trip attached yet.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct RequestCharter {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub scheduled_time: Timestamp,
    #[serde(default = "default_seats")]
    #[cfg_attr(feature = "server", builder(default = 1))]
    pub seats: i32,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub special_requests: Option<String>,
}

/// Match a pending charter request with a driver and, optionally, one
/// of their scheduled trips.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
pub struct AssignBooking {
    pub driver_id: i64,
    pub trip_id: Option<i64>,
    /// Agreed price; when absent and a trip is attached, the trip's
    /// rates are used.
    pub price: Option<f64>,
}

/// A driver taking an open charter request for themselves.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AcceptRequest {
    /// Agreed price; may also be settled later by staff.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListBookings {
    pub status: Option<BookingStatus>,
}
