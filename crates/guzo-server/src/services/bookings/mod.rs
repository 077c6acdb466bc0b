use chrono::{Duration, NaiveDateTime, Utc};
use guzo_api_types::booking::{BookingStatus, BookingType};
use guzo_api_types::error::category::{BookTripFailed, MatchRequestFailed};
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::booking::{BookingView, InsertBooking};
use guzo_model::favorite::FavoriteRoute;
use guzo_model::id::{BookingId, TripId, UserId};
use guzo_model::{Booking, DriverTrip, User};

use crate::extract::{SessionAdmin, SessionDriver, SessionUser};
use crate::App;

/// How far around the requested time we look for matching trips.
const MATCH_WINDOW: Duration = Duration::days(1);

/// Reserves seats (or the whole car) on a scheduled trip.
///
/// The seat decrement and the booking insert happen in one
/// transaction: either both land or neither does.
#[derive(Debug)]
pub struct BookTrip<'a> {
    pub trip_id: TripId,
    pub seats: i32,
    pub whole_car: bool,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub special_requests: Option<&'a str>,
}

impl BookTrip<'_> {
    #[tracing::instrument(skip(self, app, session_user), name = "services.bookings.book_trip")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Booking, ApiError> {
        if self.seats < 1 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("At least one seat must be booked."));
        }

        let mut conn = app.db_write().await?;

        let Some(trip) = DriverTrip::find(&mut conn, self.trip_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        // booking the whole car takes every remaining seat
        let seats = if self.whole_car {
            trip.remaining_seats().max(1)
        } else {
            self.seats
        };

        let Some(trip) = DriverTrip::reserve_seats(&mut conn, self.trip_id, seats).await? else {
            // distinguish "not open" from "not enough seats" for the
            // error message; the reservation itself stays atomic
            let category = if trip.status == guzo_api_types::trip::TripStatus::Scheduled {
                ApiErrorCategory::BookTripFailed(BookTripFailed::NotEnoughSeats)
            } else {
                ApiErrorCategory::BookTripFailed(BookTripFailed::TripNotOpen)
            };
            return Err(ApiError::new(category));
        };

        let (booking_type, price) = if self.whole_car {
            (BookingType::WholeCar, trip.whole_car_price)
        } else {
            (BookingType::Seat, trip.price_per_seat * f64::from(seats))
        };

        let booking = InsertBooking::builder()
            .customer_id(session_user.id)
            .customer_name(self.customer_name.unwrap_or(&session_user.full_name))
            .customer_phone(self.customer_phone.unwrap_or(&session_user.phone))
            .trip_id(trip.id)
            .booking_type(booking_type)
            .pickup_location(&trip.origin)
            .dropoff_location(&trip.destination)
            .scheduled_time(trip.departure_time)
            .seats_booked(seats)
            .price(price)
            .assigned_driver_id(trip.driver_id)
            .maybe_notes(self.notes)
            .maybe_special_requests(self.special_requests)
            .build()
            .insert(&mut conn)
            .await?;

        // booking a saved route bumps its usage counters
        FavoriteRoute::touch(&mut conn, session_user.id, &trip.origin, &trip.destination).await?;

        conn.commit().await?;
        Ok(booking)
    }
}

/// Files a custom charter request with no trip attached.
#[derive(Debug)]
pub struct RequestCharter<'a> {
    pub pickup_location: &'a str,
    pub dropoff_location: &'a str,
    pub scheduled_time: NaiveDateTime,
    pub seats: i32,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub special_requests: Option<&'a str>,
}

impl RequestCharter<'_> {
    #[tracing::instrument(skip(self, app, session_user), name = "services.bookings.request_charter")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Booking, ApiError> {
        if self.pickup_location.trim().len() < 2 || self.dropoff_location.trim().len() < 2 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Pickup and dropoff locations are required."));
        }

        if self.seats < 1 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("At least one seat must be requested."));
        }

        let mut conn = app.db_write().await?;
        let booking = InsertBooking::builder()
            .customer_id(session_user.id)
            .customer_name(self.customer_name.unwrap_or(&session_user.full_name))
            .customer_phone(self.customer_phone.unwrap_or(&session_user.phone))
            .booking_type(BookingType::Charter)
            .pickup_location(self.pickup_location)
            .dropoff_location(self.dropoff_location)
            .scheduled_time(self.scheduled_time)
            .seats_booked(self.seats)
            .maybe_notes(self.notes)
            .maybe_special_requests(self.special_requests)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(booking)
    }
}

/// Cancels a booking and releases its seats exactly once.
#[derive(Debug)]
pub struct CancelBooking {
    pub id: BookingId,
}

impl CancelBooking {
    #[tracing::instrument(skip(app, session_user), name = "services.bookings.cancel")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Booking, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(booking) = Booking::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let is_owner = booking.customer_id == Some(session_user.id);
        if !is_owner && !session_user.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        match Booking::cancel(&mut conn, self.id).await? {
            Some(cancelled) => {
                // the guarded transition fired, so this release runs
                // exactly once per booking
                if let Some(trip_id) = cancelled.trip_id {
                    DriverTrip::release_seats(&mut conn, trip_id, cancelled.seats_booked).await?;
                }

                conn.commit().await?;
                Ok(cancelled)
            }
            // repeated cancel on an already-cancelled booking is a no-op
            None if booking.status == BookingStatus::Cancelled => Ok(booking),
            None => Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Completed bookings cannot be cancelled.")),
        }
    }
}

/// Marks a ride as done. Assigned driver or staff only.
#[derive(Debug)]
pub struct CompleteBooking {
    pub id: BookingId,
}

impl CompleteBooking {
    #[tracing::instrument(skip(app, driver), name = "services.bookings.complete")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Booking, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(booking) = Booking::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let is_assigned = booking.assigned_driver_id == Some(driver.id);
        if !is_assigned && !driver.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        match Booking::complete(&mut conn, self.id).await? {
            Some(completed) => {
                conn.commit().await?;
                Ok(completed)
            }
            // completing twice keeps the first completion
            None if booking.status == BookingStatus::Completed => Ok(booking),
            None => Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Cancelled bookings cannot be completed.")),
        }
    }
}

/// Staff matching of a pending charter request with a driver and,
/// optionally, one of their scheduled trips.
#[derive(Debug)]
pub struct MatchRequest {
    pub booking_id: BookingId,
    pub driver_id: UserId,
    pub trip_id: Option<TripId>,
    pub price: Option<f64>,
}

impl MatchRequest {
    #[tracing::instrument(skip(app), name = "services.bookings.match_request")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Booking, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if booking.booking_type != BookingType::Charter {
            return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                MatchRequestFailed::NotACustomRequest,
            )));
        }

        let Some(driver) = User::find(&mut conn, self.driver_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound).message("No such driver."));
        };

        if !driver.is_driver() {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("The assignee must be a driver."));
        }

        // attach the trip first: if its seats cannot hold the request
        // the whole transaction rolls back untouched
        let mut price = self.price;
        if let Some(trip_id) = self.trip_id {
            let Some(trip) = DriverTrip::reserve_seats(&mut conn, trip_id, booking.seats_booked)
                .await?
            else {
                return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                    MatchRequestFailed::NotEnoughSeats,
                )));
            };

            if trip.driver_id != self.driver_id {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("That trip belongs to another driver."));
            }

            if price.is_none() {
                price = Some(trip.price_per_seat * f64::from(booking.seats_booked));
            }
        }

        let Some(matched) =
            Booking::assign(&mut conn, self.booking_id, self.driver_id, self.trip_id, price)
                .await?
        else {
            // somebody else matched it first; the seat reservation
            // above rolls back with the transaction
            return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                MatchRequestFailed::AlreadyMatched,
            )));
        };

        conn.commit().await?;
        Ok(matched)
    }
}

/// A driver accepting an open charter request for themselves.
#[derive(Debug)]
pub struct AcceptRequest {
    pub booking_id: BookingId,
    pub price: Option<f64>,
}

impl AcceptRequest {
    #[tracing::instrument(skip(app, driver), name = "services.bookings.accept_request")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Booking, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if booking.booking_type != BookingType::Charter {
            return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                MatchRequestFailed::NotACustomRequest,
            )));
        }

        let Some(accepted) =
            Booking::assign(&mut conn, self.booking_id, driver.id, None, self.price).await?
        else {
            return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                MatchRequestFailed::AlreadyMatched,
            )));
        };

        conn.commit().await?;
        Ok(accepted)
    }
}

/// Candidate trips for matching a charter request, ranked by the
/// documented tie-break rules.
#[derive(Debug)]
pub struct ListCandidates {
    pub booking_id: BookingId,
}

impl ListCandidates {
    const LIMIT: u64 = 10;

    #[tracing::instrument(skip(app), name = "services.bookings.candidates")]
    pub async fn perform(self, app: &App, _driver: &SessionDriver) -> Result<Vec<DriverTrip>, ApiError> {
        let mut conn = app.db_read().await?;

        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if !booking.is_open_request() {
            return Err(ApiError::new(ApiErrorCategory::MatchRequestFailed(
                MatchRequestFailed::NotACustomRequest,
            )));
        }

        let window = (
            booking.scheduled_time - MATCH_WINDOW,
            booking.scheduled_time + MATCH_WINDOW,
        );

        let candidates = DriverTrip::list_candidates(
            &mut conn,
            &booking.pickup_location,
            &booking.dropoff_location,
            window,
            booking.seats_booked,
            Self::LIMIT,
        )
        .await?;

        Ok(candidates)
    }
}

/// Books the same route again on the next matching trip.
#[derive(Debug)]
pub struct Rebook {
    pub booking_id: BookingId,
}

impl Rebook {
    #[tracing::instrument(skip(app, session_user), name = "services.bookings.rebook")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Booking, ApiError> {
        let old = {
            let mut conn = app.db_read().await?;
            let Some(old) = Booking::find(&mut conn, self.booking_id).await? else {
                return Err(ApiError::new(ApiErrorCategory::NotFound));
            };
            old
        };

        if old.customer_id != Some(session_user.id) {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        let now = Utc::now().naive_utc();
        let candidate = {
            let mut conn = app.db_read().await?;
            DriverTrip::list_candidates(
                &mut conn,
                &old.pickup_location,
                &old.dropoff_location,
                (now, now + MATCH_WINDOW * 7),
                old.seats_booked,
                1,
            )
            .await?
            .into_iter()
            .next()
        };

        let Some(trip) = candidate else {
            return Err(ApiError::new(ApiErrorCategory::NotFound)
                .message("No upcoming trip on this route has enough seats."));
        };

        BookTrip {
            trip_id: trip.id,
            seats: old.seats_booked,
            whole_car: old.booking_type == BookingType::WholeCar,
            customer_name: None,
            customer_phone: None,
            notes: old.notes.as_deref(),
            special_requests: old.special_requests.as_deref(),
        }
        .perform(app, session_user)
        .await
    }
}

#[derive(Debug)]
pub struct GetBooking {
    pub id: BookingId,
}

impl GetBooking {
    #[tracing::instrument(skip(app, session_user), name = "services.bookings.get")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<BookingView, ApiError> {
        let mut conn = app.db_read().await?;
        let Some(view) = Booking::find_view(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let booking = &view.booking;
        let participant = booking.customer_id == Some(session_user.id)
            || booking.assigned_driver_id == Some(session_user.id);
        if !participant && !session_user.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        Ok(view)
    }
}

#[derive(Debug)]
pub struct ListMyBookings;

impl ListMyBookings {
    #[tracing::instrument(skip_all, name = "services.bookings.list_mine")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<BookingView>, ApiError> {
        let mut conn = app.db_read().await?;
        let bookings = Booking::list_by_customer(&mut conn, session_user.id).await?;
        Ok(bookings)
    }
}

#[derive(Debug)]
pub struct ListDriverBookings;

impl ListDriverBookings {
    #[tracing::instrument(skip_all, name = "services.bookings.list_assigned")]
    pub async fn perform(
        self,
        app: &App,
        driver: &SessionDriver,
    ) -> Result<Vec<BookingView>, ApiError> {
        let mut conn = app.db_read().await?;
        let bookings = Booking::list_by_driver(&mut conn, driver.id).await?;
        Ok(bookings)
    }
}

#[derive(Debug)]
pub struct ListOpenRequests;

impl ListOpenRequests {
    #[tracing::instrument(skip_all, name = "services.bookings.list_open_requests")]
    pub async fn perform(self, app: &App, _driver: &SessionDriver) -> Result<Vec<Booking>, ApiError> {
        let mut conn = app.db_read().await?;
        let requests = Booking::list_open_requests(&mut conn).await?;
        Ok(requests)
    }
}

#[derive(Debug)]
pub struct ListAllBookings {
    pub status: Option<BookingStatus>,
}

impl ListAllBookings {
    const LIMIT: u64 = 100;

    #[tracing::instrument(skip(app), name = "services.bookings.list_all")]
    pub async fn perform(
        self,
        app: &App,
        _admin: &SessionAdmin,
    ) -> Result<Vec<BookingView>, ApiError> {
        let mut conn = app.db_read().await?;
        let bookings = Booking::list_all(&mut conn, self.status, Self::LIMIT).await?;
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn booking_reserves_seats_and_prices_them(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "bk-driver").await;
        let rider = test_utils::users::rider_session(&app, "bk-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let booking = BookTrip {
            trip_id: trip.id,
            seats: 2,
            whole_car: false,
            customer_name: None,
            customer_phone: None,
            notes: None,
            special_requests: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        assert_eq!(booking.seats_booked, 2);
        assert_eq!(booking.price, Some(1600.0));
        assert_eq!(booking.assigned_driver_id, Some(driver.id));

        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_seats, 2);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn overbooking_fails_and_inserts_nothing(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "ob-driver").await;
        let rider = test_utils::users::rider_session(&app, "ob-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 2).await;

        let error = BookTrip {
            trip_id: trip.id,
            seats: 3,
            whole_car: false,
            customer_name: None,
            customer_phone: None,
            notes: None,
            special_requests: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap_err();

        assert_eq!(
            error.category,
            ApiErrorCategory::BookTripFailed(BookTripFailed::NotEnoughSeats)
        );

        // nothing half-applied: counter untouched, no booking row
        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_seats, 0);
        let bookings = Booking::list_by_customer(&mut conn, rider.id).await.unwrap();
        assert!(bookings.is_empty());
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn cancel_releases_seats_exactly_once(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "cx-driver").await;
        let rider = test_utils::users::rider_session(&app, "cx-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let booking = BookTrip {
            trip_id: trip.id,
            seats: 3,
            whole_car: false,
            customer_name: None,
            customer_phone: None,
            notes: None,
            special_requests: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        let cancelled = CancelBooking { id: booking.id }
            .perform(&app, &rider)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // cancelling again is a no-op and must not release more seats
        CancelBooking { id: booking.id }
            .perform(&app, &rider)
            .await
            .unwrap();

        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_seats, 0);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn matching_attaches_trip_and_prices_the_request(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "mr-admin").await;
        let driver = test_utils::users::driver_session(&app, "mr-driver").await;
        let rider = test_utils::users::rider_session(&app, "mr-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let request = test_utils::bookings::file_charter(&app, &rider).await;

        let candidates = ListCandidates {
            booking_id: request.id,
        }
        .perform(&app, &driver)
        .await
        .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, trip.id);

        let matched = MatchRequest {
            booking_id: request.id,
            driver_id: driver.id,
            trip_id: Some(trip.id),
            price: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        assert_eq!(matched.status, BookingStatus::Confirmed);
        assert_eq!(matched.trip_id, Some(trip.id));
        assert_eq!(matched.price, Some(1600.0));

        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_seats, 2);

        // a second match attempt loses the race deterministically
        let error = MatchRequest {
            booking_id: request.id,
            driver_id: driver.id,
            trip_id: None,
            price: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap_err();
        assert_eq!(
            error.category,
            ApiErrorCategory::MatchRequestFailed(MatchRequestFailed::AlreadyMatched)
        );
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn losing_match_rolls_back_seat_reservation(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "rb-admin").await;
        let driver = test_utils::users::driver_session(&app, "rb-driver").await;
        let other = test_utils::users::driver_session(&app, "rb-other").await;
        let rider = test_utils::users::rider_session(&app, "rb-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let request = test_utils::bookings::file_charter(&app, &rider).await;

        // first matcher wins without a trip
        MatchRequest {
            booking_id: request.id,
            driver_id: other.id,
            trip_id: None,
            price: Some(2000.0),
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        // the loser tried to attach a trip; its seat reservation must
        // not survive the lost race
        let error = MatchRequest {
            booking_id: request.id,
            driver_id: driver.id,
            trip_id: Some(trip.id),
            price: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap_err();
        assert_eq!(
            error.category,
            ApiErrorCategory::MatchRequestFailed(MatchRequestFailed::AlreadyMatched)
        );

        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_seats, 0);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn whole_car_bookings_take_every_seat(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "wc-driver").await;
        let rider = test_utils::users::rider_session(&app, "wc-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let booking = BookTrip {
            trip_id: trip.id,
            seats: 1,
            whole_car: true,
            customer_name: None,
            customer_phone: None,
            notes: None,
            special_requests: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        assert_eq!(booking.booking_type, BookingType::WholeCar);
        assert_eq!(booking.price, Some(3000.0));

        let mut conn = app.db_read().await.unwrap();
        let trip = DriverTrip::find(&mut conn, trip.id).await.unwrap().unwrap();
        assert!(trip.is_full());
    }
}
