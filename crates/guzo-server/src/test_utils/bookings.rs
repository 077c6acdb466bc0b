use chrono::{Duration, Utc};
use guzo_model::Booking;

use crate::extract::SessionUser;
use crate::services;
use crate::App;

/// Files a two-seat charter request on the Addis Ababa - Bahir Dar
/// route, scheduled 12 hours out (inside the matching window of the
/// trip fixture).
pub async fn file_charter(app: &App, customer: &SessionUser) -> Booking {
    services::bookings::RequestCharter {
        pickup_location: "Addis Ababa",
        dropoff_location: "Bahir Dar",
        scheduled_time: Utc::now().naive_utc() + Duration::hours(12),
        seats: 2,
        customer_name: None,
        customer_phone: None,
        notes: None,
        special_requests: None,
    }
    .perform(app, customer)
    .await
    .expect("charter fixture must file")
}
