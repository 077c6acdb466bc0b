use chrono::{NaiveDate, NaiveDateTime, Utc};
use guzo_api_types::trip::TripStatus;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::{TripId, VehicleId};
use guzo_model::trip::{InsertTrip, TripView, UpdateTrip as UpdateTripChangeset};
use guzo_model::{Booking, DriverTrip, Vehicle};

use crate::extract::{SessionDriver, SessionUser};
use crate::App;

const MAX_TRIP_SEATS: i32 = 50;

#[derive(Debug)]
pub struct CreateTrip<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub departure_time: NaiveDateTime,
    pub estimated_arrival: Option<NaiveDateTime>,
    pub available_seats: i32,
    pub price_per_seat: f64,
    pub whole_car_price: f64,
    pub vehicle_id: Option<i64>,
    pub notes: Option<&'a str>,
    pub waypoints: Vec<String>,
}

impl CreateTrip<'_> {
    #[tracing::instrument(skip(self, app, driver), name = "services.trips.create")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<DriverTrip, ApiError> {
        if self.origin.trim().len() < 2 || self.destination.trim().len() < 2 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Origin and destination are required."));
        }

        if !(1..=MAX_TRIP_SEATS).contains(&self.available_seats) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Seats must be between 1 and 50."));
        }

        if self.price_per_seat <= 0.0 || self.whole_car_price <= 0.0 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Prices must be positive."));
        }

        let mut conn = app.db_write().await?;

        // a trip may only reference one of the driver's own vehicles
        let vehicle_id = match self.vehicle_id {
            Some(raw) => {
                let vehicle = Vehicle::find(&mut conn, VehicleId(raw)).await?;
                match vehicle {
                    Some(vehicle) if vehicle.driver_id == driver.id => Some(vehicle.id),
                    Some(..) => {
                        return Err(ApiError::new(ApiErrorCategory::AccessDenied)
                            .message("That vehicle belongs to another driver."))
                    }
                    None => return Err(ApiError::new(ApiErrorCategory::NotFound)),
                }
            }
            None => None,
        };

        let trip = InsertTrip::builder()
            .driver_id(driver.id)
            .maybe_vehicle_id(vehicle_id)
            .origin(self.origin)
            .destination(self.destination)
            .departure_time(self.departure_time)
            .maybe_estimated_arrival(self.estimated_arrival)
            .available_seats(self.available_seats)
            .price_per_seat(self.price_per_seat)
            .whole_car_price(self.whole_car_price)
            .maybe_notes(self.notes)
            .waypoints(self.waypoints)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(trip)
    }
}

#[derive(Debug)]
pub struct UpdateTrip<'a> {
    pub id: TripId,
    pub departure_time: Option<NaiveDateTime>,
    pub estimated_arrival: Option<NaiveDateTime>,
    pub available_seats: Option<i32>,
    pub price_per_seat: Option<f64>,
    pub whole_car_price: Option<f64>,
    pub status: Option<TripStatus>,
    pub notes: Option<&'a str>,
}

impl UpdateTrip<'_> {
    #[tracing::instrument(skip(self, app, driver), name = "services.trips.update")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<DriverTrip, ApiError> {
        if let Some(seats) = self.available_seats {
            if !(1..=MAX_TRIP_SEATS).contains(&seats) {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Seats must be between 1 and 50."));
            }
        }

        let mut conn = app.db_write().await?;
        let Some(trip) = DriverTrip::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if trip.driver_id != driver.id && !driver.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        // shrinking below the reserved seats would break the counter
        if let Some(seats) = self.available_seats {
            if seats < trip.booked_seats {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest).message(format!(
                    "{} seats are already booked on this trip.",
                    trip.booked_seats
                )));
            }
        }

        let trip = UpdateTripChangeset::builder()
            .id(self.id)
            .maybe_departure_time(self.departure_time)
            .maybe_estimated_arrival(self.estimated_arrival)
            .maybe_available_seats(self.available_seats)
            .maybe_price_per_seat(self.price_per_seat)
            .maybe_whole_car_price(self.whole_car_price)
            .maybe_status(self.status)
            .maybe_notes(self.notes)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(trip)
    }
}

#[derive(Debug)]
pub struct DeleteTrip {
    pub id: TripId,
}

impl DeleteTrip {
    #[tracing::instrument(skip(app, driver), name = "services.trips.delete")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        let Some(trip) = DriverTrip::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if trip.driver_id != driver.id && !driver.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        if trip.booked_seats > 0 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Cannot delete a trip with active bookings. Cancel it instead."));
        }

        DriverTrip::delete(&mut conn, self.id).await?;
        conn.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct GetTrip {
    pub id: TripId,
}

impl GetTrip {
    #[tracing::instrument(skip(app), name = "services.trips.get")]
    pub async fn perform(self, app: &App) -> Result<TripView, ApiError> {
        let mut conn = app.db_read().await?;
        match DriverTrip::find_view(&mut conn, self.id).await? {
            Some(view) => Ok(view),
            None => Err(ApiError::new(ApiErrorCategory::NotFound)),
        }
    }
}

#[derive(Debug)]
pub struct SearchTrips<'a> {
    pub origin: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub min_seats: i32,
}

impl SearchTrips<'_> {
    #[tracing::instrument(skip(self, app), name = "services.trips.search")]
    pub async fn perform(self, app: &App) -> Result<Vec<TripView>, ApiError> {
        if self.min_seats < 1 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("min_seats must be at least 1."));
        }

        let day = self.date.map(|date| {
            let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            (start, start + chrono::Duration::days(1))
        });

        let mut conn = app.db_read().await?;
        let trips =
            DriverTrip::search(&mut conn, self.origin, self.destination, day, self.min_seats)
                .await?;

        Ok(trips)
    }
}

#[derive(Debug)]
pub struct ListUpcomingTrips {
    pub limit: Option<u64>,
}

impl ListUpcomingTrips {
    const DEFAULT_LIMIT: u64 = 20;
    const MAX_LIMIT: u64 = 100;

    #[tracing::instrument(skip(app), name = "services.trips.upcoming")]
    pub async fn perform(self, app: &App) -> Result<Vec<TripView>, ApiError> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT);

        let mut conn = app.db_read().await?;
        let trips = DriverTrip::list_upcoming(&mut conn, limit, Utc::now().naive_utc()).await?;
        Ok(trips)
    }
}

#[derive(Debug)]
pub struct ListDriverTrips {
    pub include_past: bool,
}

impl ListDriverTrips {
    #[tracing::instrument(skip(app, driver), name = "services.trips.list_mine")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Vec<DriverTrip>, ApiError> {
        let mut conn = app.db_read().await?;
        let trips = DriverTrip::list_by_driver(
            &mut conn,
            driver.id,
            self.include_past,
            Utc::now().naive_utc(),
        )
        .await?;

        Ok(trips)
    }
}

/// Bookings taken against one of the driver's trips.
#[derive(Debug)]
pub struct ListTripBookings {
    pub trip_id: TripId,
}

impl ListTripBookings {
    #[tracing::instrument(skip(app, session_user), name = "services.trips.list_bookings")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<Booking>, ApiError> {
        let mut conn = app.db_read().await?;
        let Some(trip) = DriverTrip::find(&mut conn, self.trip_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if trip.driver_id != session_user.id && !session_user.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        let bookings = Booking::list_by_trip(&mut conn, self.trip_id).await?;
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use chrono::Duration;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn drivers_cannot_touch_foreign_trips(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let owner = test_utils::users::driver_session(&app, "owner").await;
        let other = test_utils::users::driver_session(&app, "other").await;

        let trip = test_utils::trips::publish(&app, &owner, 4).await;

        let error = UpdateTrip {
            id: trip.id,
            departure_time: None,
            estimated_arrival: None,
            available_seats: None,
            price_per_seat: Some(900.0),
            whole_car_price: None,
            status: None,
            notes: None,
        }
        .perform(&app, &other)
        .await
        .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::AccessDenied);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn cannot_shrink_below_reserved_seats(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "shrink").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        {
            let mut conn = app.db_write().await.unwrap();
            DriverTrip::reserve_seats(&mut conn, trip.id, 3)
                .await
                .unwrap()
                .unwrap();
            conn.commit().await.unwrap();
        }

        let error = UpdateTrip {
            id: trip.id,
            departure_time: None,
            estimated_arrival: None,
            available_seats: Some(2),
            price_per_seat: None,
            whole_car_price: None,
            status: None,
            notes: None,
        }
        .perform(&app, &driver)
        .await
        .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn search_honors_the_day_filter(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "day-filter").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let tomorrow = (Utc::now() + Duration::hours(12)).date_naive();
        let found = SearchTrips {
            origin: None,
            destination: None,
            date: Some(tomorrow),
            min_seats: 1,
        }
        .perform(&app)
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].trip.id, trip.id);

        let far_future = (Utc::now() + Duration::days(90)).date_naive();
        let empty = SearchTrips {
            origin: None,
            destination: None,
            date: Some(far_future),
            min_seats: 1,
        }
        .perform(&app)
        .await
        .unwrap();
        assert!(empty.is_empty());
    }
}
