use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::trip::TripStatus;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, Func, Iden, Order, PostgresQueryBuilder, Query,
    SelectStatement,
};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{TripId, UserId, VehicleId};
use crate::user::UserIdent;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DriverTrip {
    pub id: TripId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub driver_id: UserId,
    pub vehicle_id: Option<VehicleId>,

    pub origin: String,
    pub destination: String,
    pub departure_time: NaiveDateTime,
    pub estimated_arrival: Option<NaiveDateTime>,

    pub available_seats: i32,
    pub booked_seats: i32,

    pub price_per_seat: f64,
    pub whole_car_price: f64,

    pub status: TripStatus,
    pub notes: Option<String>,
    pub waypoints: Vec<String>,
}

impl DriverTrip {
    #[must_use]
    pub fn remaining_seats(&self) -> i32 {
        self.available_seats - self.booked_seats
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.booked_seats >= self.available_seats
    }
}

/// A trip joined with the driver's public contact columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripView {
    #[sqlx(flatten)]
    pub trip: DriverTrip,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub driver_rating: Option<f64>,
}

#[derive(Debug, Clone, Iden)]
pub enum TripIdent {
    DriverTrips,
    Id,
    Created,
    Updated,
    DriverId,
    VehicleId,
    Origin,
    Destination,
    DepartureTime,
    EstimatedArrival,
    AvailableSeats,
    BookedSeats,
    PricePerSeat,
    WholeCarPrice,
    Status,
    Notes,
    Waypoints,
}

impl DriverTrip {
    #[tracing::instrument(skip_all, name = "db.trips.find")]
    pub async fn find(conn: &mut PgConnection, id: TripId) -> Result<Option<DriverTrip>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(TripIdent::DriverTrips)
            .and_where(Expr::col(TripIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find trip by id")
    }

    #[tracing::instrument(skip_all, name = "db.trips.delete")]
    pub async fn delete(conn: &mut PgConnection, id: TripId) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(TripIdent::DriverTrips)
            .and_where(Expr::col(TripIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete trip")?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, name = "db.trips.list_by_driver")]
    pub async fn list_by_driver(
        conn: &mut PgConnection,
        driver_id: UserId,
        include_past: bool,
        now: NaiveDateTime,
    ) -> Result<Vec<DriverTrip>> {
        let mut query = Query::select();
        query
            .column(Asterisk)
            .from(TripIdent::DriverTrips)
            .and_where(Expr::col(TripIdent::DriverId).eq(driver_id.0))
            .order_by(TripIdent::DepartureTime, Order::Desc);

        if !include_past {
            query.and_where(Expr::col(TripIdent::DepartureTime).gte(now));
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list trips of a driver")
    }

    /// Soonest-first scheduled trips that still have seats, for the
    /// landing page.
    #[tracing::instrument(skip_all, name = "db.trips.list_upcoming")]
    pub async fn list_upcoming(
        conn: &mut PgConnection,
        limit: u64,
        now: NaiveDateTime,
    ) -> Result<Vec<TripView>> {
        let (sql, values) = Self::view_select()
            .and_where(status_is(TripStatus::Scheduled))
            .and_where(departure_col().gte(now))
            .and_where(has_free_seats())
            .order_by((TripIdent::DriverTrips, TripIdent::DepartureTime), Order::Asc)
            .limit(limit)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, TripView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list upcoming trips")
    }

    /// Customer-facing search over scheduled trips with seats left.
    #[tracing::instrument(skip_all, name = "db.trips.search")]
    pub async fn search(
        conn: &mut PgConnection,
        origin: Option<&str>,
        destination: Option<&str>,
        day: Option<(NaiveDateTime, NaiveDateTime)>,
        min_seats: i32,
    ) -> Result<Vec<TripView>> {
        let mut query = Self::view_select();
        query
            .and_where(status_is(TripStatus::Scheduled))
            .and_where(remaining_seats_expr().gte(min_seats))
            .order_by((TripIdent::DriverTrips, TripIdent::DepartureTime), Order::Asc);

        if let Some(origin) = origin {
            query.and_where(
                Func::lower(Expr::col((TripIdent::DriverTrips, TripIdent::Origin)))
                    .like(format!("%{}%", origin.to_lowercase())),
            );
        }
        if let Some(destination) = destination {
            query.and_where(
                Func::lower(Expr::col((TripIdent::DriverTrips, TripIdent::Destination)))
                    .like(format!("%{}%", destination.to_lowercase())),
            );
        }
        if let Some((start, end)) = day {
            query
                .and_where(departure_col().gte(start))
                .and_where(departure_col().lt(end));
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, TripView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not search trips")
    }

    /// Trip + driver info for detail pages.
    #[tracing::instrument(skip_all, name = "db.trips.find_view")]
    pub async fn find_view(conn: &mut PgConnection, id: TripId) -> Result<Option<TripView>> {
        let (sql, values) = Self::view_select()
            .and_where(Expr::col((TripIdent::DriverTrips, TripIdent::Id)).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, TripView, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find trip view")
    }

    /// Candidate trips for matching a custom request: same route,
    /// departing inside the window, enough free seats. Deterministic
    /// tie-break: most remaining seats, then earliest departure,
    /// then lowest id.
    #[tracing::instrument(skip_all, name = "db.trips.list_candidates")]
    pub async fn list_candidates(
        conn: &mut PgConnection,
        origin: &str,
        destination: &str,
        window: (NaiveDateTime, NaiveDateTime),
        seats: i32,
        limit: u64,
    ) -> Result<Vec<DriverTrip>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(TripIdent::DriverTrips)
            .and_where(Expr::col(TripIdent::Status).eq(TripStatus::Scheduled.as_ref()))
            .and_where(Func::lower(Expr::col(TripIdent::Origin)).eq(origin.to_lowercase()))
            .and_where(
                Func::lower(Expr::col(TripIdent::Destination)).eq(destination.to_lowercase()),
            )
            .and_where(Expr::col(TripIdent::DepartureTime).gte(window.0))
            .and_where(Expr::col(TripIdent::DepartureTime).lte(window.1))
            .and_where(
                Expr::col(TripIdent::AvailableSeats)
                    .sub(Expr::col(TripIdent::BookedSeats))
                    .gte(seats),
            )
            .order_by_expr(
                Expr::col(TripIdent::AvailableSeats)
                    .sub(Expr::col(TripIdent::BookedSeats))
                    .into(),
                Order::Desc,
            )
            .order_by(TripIdent::DepartureTime, Order::Asc)
            .order_by(TripIdent::Id, Order::Asc)
            .limit(limit)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list candidate trips")
    }

    /// Atomically reserves seats on a scheduled trip.
    ///
    /// The decrement happens in one conditional UPDATE; when the trip
    /// is not open or cannot hold `seats` more passengers, no row
    /// comes back and nothing changed.
    #[tracing::instrument(skip_all, name = "db.trips.reserve_seats")]
    pub async fn reserve_seats(
        conn: &mut PgConnection,
        id: TripId,
        seats: i32,
    ) -> Result<Option<DriverTrip>> {
        let (sql, values) = Query::update()
            .table(TripIdent::DriverTrips)
            .value(
                TripIdent::BookedSeats,
                Expr::col(TripIdent::BookedSeats).add(seats),
            )
            .value(TripIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(TripIdent::Id).eq(id.0))
            .and_where(Expr::col(TripIdent::Status).eq(TripStatus::Scheduled.as_ref()))
            .and_where(
                Expr::col(TripIdent::BookedSeats)
                    .add(seats)
                    .lte(Expr::col(TripIdent::AvailableSeats)),
            )
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not reserve seats on trip")
    }

    /// Gives seats back after a cancellation. Floors at zero, so a
    /// stray release can never underflow the counter.
    #[tracing::instrument(skip_all, name = "db.trips.release_seats")]
    pub async fn release_seats(
        conn: &mut PgConnection,
        id: TripId,
        seats: i32,
    ) -> Result<Option<DriverTrip>> {
        let (sql, values) = Query::update()
            .table(TripIdent::DriverTrips)
            .value(
                TripIdent::BookedSeats,
                Expr::cust_with_values("GREATEST(booked_seats - $1, 0)", [seats]),
            )
            .value(TripIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(TripIdent::Id).eq(id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not release seats on trip")
    }

    fn view_select() -> SelectStatement {
        Query::select()
            .column((TripIdent::DriverTrips, Asterisk))
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::FullName)),
                Alias::new("driver_name"),
            )
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::Phone)),
                Alias::new("driver_phone"),
            )
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::Rating)),
                Alias::new("driver_rating"),
            )
            .from(TripIdent::DriverTrips)
            .left_join(
                UserIdent::Users,
                Expr::col((UserIdent::Users, UserIdent::Id))
                    .equals((TripIdent::DriverTrips, TripIdent::DriverId)),
            )
            .take()
    }
}

fn departure_col() -> Expr {
    Expr::col((TripIdent::DriverTrips, TripIdent::DepartureTime))
}

fn status_is(status: TripStatus) -> sea_query::SimpleExpr {
    Expr::col((TripIdent::DriverTrips, TripIdent::Status)).eq(status.as_ref())
}

fn has_free_seats() -> sea_query::SimpleExpr {
    Expr::col((TripIdent::DriverTrips, TripIdent::BookedSeats))
        .lt(Expr::col((TripIdent::DriverTrips, TripIdent::AvailableSeats)))
}

fn remaining_seats_expr() -> sea_query::SimpleExpr {
    Expr::col((TripIdent::DriverTrips, TripIdent::AvailableSeats))
        .sub(Expr::col((TripIdent::DriverTrips, TripIdent::BookedSeats)))
}

#[derive(Debug, Error)]
#[error("Could not insert trip")]
pub struct InsertTripError;

#[derive(Builder)]
pub struct InsertTrip<'a> {
    #[builder(into)]
    pub driver_id: UserId,
    pub vehicle_id: Option<VehicleId>,
    pub origin: &'a str,
    pub destination: &'a str,
    pub departure_time: NaiveDateTime,
    pub estimated_arrival: Option<NaiveDateTime>,
    pub available_seats: i32,
    pub price_per_seat: f64,
    pub whole_car_price: f64,
    pub notes: Option<&'a str>,
    #[builder(default)]
    pub waypoints: Vec<String>,
}

impl InsertTrip<'_> {
    #[tracing::instrument(skip_all, name = "db.trips.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<DriverTrip, InsertTripError> {
        let (sql, values) = Query::insert()
            .into_table(TripIdent::DriverTrips)
            .columns([
                TripIdent::DriverId,
                TripIdent::VehicleId,
                TripIdent::Origin,
                TripIdent::Destination,
                TripIdent::DepartureTime,
                TripIdent::EstimatedArrival,
                TripIdent::AvailableSeats,
                TripIdent::PricePerSeat,
                TripIdent::WholeCarPrice,
                TripIdent::Notes,
                TripIdent::Waypoints,
            ])
            .values_panic([
                self.driver_id.0.into(),
                self.vehicle_id.map(|v| v.0).into(),
                self.origin.into(),
                self.destination.into(),
                self.departure_time.into(),
                self.estimated_arrival.into(),
                self.available_seats.into(),
                self.price_per_seat.into(),
                self.whole_car_price.into(),
                self.notes.into(),
                self.waypoints.clone().into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertTripError)
    }
}

#[derive(Debug, Error)]
#[error("Could not update trip")]
pub struct UpdateTripError;

#[derive(Builder)]
pub struct UpdateTrip<'a> {
    #[builder(into)]
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
    #[tracing::instrument(skip_all, name = "db.trips.update")]
    pub async fn update(&self, conn: &mut PgConnection) -> Result<DriverTrip, UpdateTripError> {
        let mut query = Query::update();
        query.table(TripIdent::DriverTrips);

        if let Some(departure_time) = self.departure_time {
            query.value(TripIdent::DepartureTime, departure_time);
        }
        if let Some(estimated_arrival) = self.estimated_arrival {
            query.value(TripIdent::EstimatedArrival, estimated_arrival);
        }
        if let Some(available_seats) = self.available_seats {
            query.value(TripIdent::AvailableSeats, available_seats);
        }
        if let Some(price_per_seat) = self.price_per_seat {
            query.value(TripIdent::PricePerSeat, price_per_seat);
        }
        if let Some(whole_car_price) = self.whole_car_price {
            query.value(TripIdent::WholeCarPrice, whole_car_price);
        }
        if let Some(status) = self.status {
            query.value(TripIdent::Status, status.as_ref());
        }
        if let Some(notes) = self.notes {
            query.value(TripIdent::Notes, notes);
        }

        let (sql, values) = query
            .value(TripIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(TripIdent::Id).eq(self.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverTrip, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(UpdateTripError)
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use chrono::{Duration, Utc};

    pub async fn make_trip(conn: &mut PgConnection, driver_id: UserId, seats: i32) -> DriverTrip {
        make_trip_on_route(conn, driver_id, seats, "Addis Ababa", "Bahir Dar").await
    }

    pub async fn make_trip_on_route(
        conn: &mut PgConnection,
        driver_id: UserId,
        seats: i32,
        origin: &str,
        destination: &str,
    ) -> DriverTrip {
        InsertTrip::builder()
            .driver_id(driver_id)
            .origin(origin)
            .destination(destination)
            .departure_time(Utc::now().naive_utc() + Duration::hours(12))
            .available_seats(seats)
            .price_per_seat(800.0)
            .whole_car_price(3000.0)
            .build()
            .insert(conn)
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::test_fixtures::make_user;
    use chrono::{Duration, Utc};
    use guzo_api_types::user::UserRole;

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn reserves_seats_until_full(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-seats", UserRole::Driver).await;
        let trip = test_fixtures::make_trip(&mut conn, driver.id, 4).await;

        let trip_after = DriverTrip::reserve_seats(&mut conn, trip.id, 3)
            .await
            .unwrap()
            .expect("three seats should fit");
        assert_eq!(trip_after.booked_seats, 3);

        // only one seat left; two must not fit and nothing must change
        let rejected = DriverTrip::reserve_seats(&mut conn, trip.id, 2).await.unwrap();
        assert!(rejected.is_none());

        let last = DriverTrip::reserve_seats(&mut conn, trip.id, 1)
            .await
            .unwrap()
            .expect("exactly one seat left");
        assert_eq!(last.booked_seats, 4);
        assert!(last.is_full());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn never_reserves_on_closed_trips(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-closed", UserRole::Driver).await;
        let trip = test_fixtures::make_trip(&mut conn, driver.id, 4).await;

        UpdateTrip::builder()
            .id(trip.id)
            .status(TripStatus::Cancelled)
            .build()
            .update(&mut conn)
            .await
            .unwrap();

        let rejected = DriverTrip::reserve_seats(&mut conn, trip.id, 1).await.unwrap();
        assert!(rejected.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn release_floors_at_zero(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-release", UserRole::Driver).await;
        let trip = test_fixtures::make_trip(&mut conn, driver.id, 4).await;

        DriverTrip::reserve_seats(&mut conn, trip.id, 2)
            .await
            .unwrap()
            .unwrap();

        let released = DriverTrip::release_seats(&mut conn, trip.id, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released.booked_seats, 0);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn search_filters_by_route_and_seats(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-search", UserRole::Driver).await;

        let bahir = test_fixtures::make_trip_on_route(
            &mut conn,
            driver.id,
            4,
            "Addis Ababa",
            "Bahir Dar",
        )
        .await;
        test_fixtures::make_trip_on_route(&mut conn, driver.id, 4, "Addis Ababa", "Hawassa").await;

        let results = DriverTrip::search(&mut conn, None, Some("bahir"), None, 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].trip.id, bahir.id);
        assert_eq!(results[0].driver_name.as_deref(), Some("driver-search"));

        // a full trip disappears from search results
        DriverTrip::reserve_seats(&mut conn, bahir.id, 4)
            .await
            .unwrap()
            .unwrap();
        let results = DriverTrip::search(&mut conn, None, Some("bahir"), None, 1)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn candidates_rank_by_free_seats_then_departure(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-rank", UserRole::Driver).await;
        let now = Utc::now().naive_utc();

        let small = test_fixtures::make_trip(&mut conn, driver.id, 2).await;
        let large = test_fixtures::make_trip(&mut conn, driver.id, 8).await;

        let candidates = DriverTrip::list_candidates(
            &mut conn,
            "addis ababa",
            "bahir dar",
            (now, now + Duration::days(2)),
            2,
            10,
        )
        .await
        .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, large.id);
        assert_eq!(candidates[1].id, small.id);
    }
}
