use chrono::{Duration, Utc};
use guzo_model::DriverTrip;

use crate::extract::SessionDriver;
use crate::services;
use crate::App;

/// Publishes a scheduled trip from Addis Ababa to Bahir Dar,
/// departing in 12 hours, at 800 ETB per seat / 3000 ETB whole car.
pub async fn publish(app: &App, driver: &SessionDriver, seats: i32) -> DriverTrip {
    services::trips::CreateTrip {
        origin: "Addis Ababa",
        destination: "Bahir Dar",
        departure_time: Utc::now().naive_utc() + Duration::hours(12),
        estimated_arrival: None,
        available_seats: seats,
        price_per_seat: 800.0,
        whole_car_price: 3000.0,
        vehicle_id: None,
        notes: None,
        waypoints: vec![],
    }
    .perform(app, driver)
    .await
    .expect("trip fixture must publish")
}
