use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::booking::{BookingStatus, BookingType};
use guzo_api_types::user::UserRole;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query, SelectStatement,
};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{BookingId, ReviewId, TripId, UserId};
use crate::user::UserIdent;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Booking {
    pub id: BookingId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub customer_id: Option<UserId>,
    pub customer_name: String,
    pub customer_phone: String,

    pub trip_id: Option<TripId>,

    pub booking_type: BookingType,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub scheduled_time: NaiveDateTime,
    pub seats_booked: i32,

    pub price: Option<f64>,
    pub status: BookingStatus,

    pub assigned_driver_id: Option<UserId>,

    pub notes: Option<String>,
    pub special_requests: Option<String>,

    pub customer_review_id: Option<i64>,
    pub driver_review_id: Option<i64>,

    pub confirmed_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl Booking {
    /// An unmatched custom request waiting for staff matching.
    #[must_use]
    pub fn is_open_request(&self) -> bool {
        self.booking_type == BookingType::Charter
            && self.status == BookingStatus::Pending
            && self.trip_id.is_none()
    }
}

/// A booking joined with the assigned driver's public contact columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingView {
    #[sqlx(flatten)]
    pub booking: Booking,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub driver_rating: Option<f64>,
}

#[derive(Debug, Clone, Iden)]
pub enum BookingIdent {
    Bookings,
    Id,
    Created,
    Updated,
    CustomerId,
    CustomerName,
    CustomerPhone,
    TripId,
    BookingType,
    PickupLocation,
    DropoffLocation,
    ScheduledTime,
    SeatsBooked,
    Price,
    Status,
    AssignedDriverId,
    Notes,
    SpecialRequests,
    CustomerReviewId,
    DriverReviewId,
    ConfirmedAt,
    CompletedAt,
}

impl Booking {
    #[tracing::instrument(skip_all, name = "db.bookings.find")]
    pub async fn find(conn: &mut PgConnection, id: BookingId) -> Result<Option<Booking>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(BookingIdent::Bookings)
            .and_where(Expr::col(BookingIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find booking by id")
    }

    #[tracing::instrument(skip_all, name = "db.bookings.find_view")]
    pub async fn find_view(conn: &mut PgConnection, id: BookingId) -> Result<Option<BookingView>> {
        let (sql, values) = Self::view_select()
            .and_where(Expr::col((BookingIdent::Bookings, BookingIdent::Id)).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, BookingView, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find booking view")
    }

    #[tracing::instrument(skip_all, name = "db.bookings.list_by_customer")]
    pub async fn list_by_customer(
        conn: &mut PgConnection,
        customer_id: UserId,
    ) -> Result<Vec<BookingView>> {
        let (sql, values) = Self::view_select()
            .and_where(
                Expr::col((BookingIdent::Bookings, BookingIdent::CustomerId)).eq(customer_id.0),
            )
            .order_by((BookingIdent::Bookings, BookingIdent::Created), Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, BookingView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list bookings of a customer")
    }

    #[tracing::instrument(skip_all, name = "db.bookings.list_by_driver")]
    pub async fn list_by_driver(
        conn: &mut PgConnection,
        driver_id: UserId,
    ) -> Result<Vec<BookingView>> {
        let (sql, values) = Self::view_select()
            .and_where(
                Expr::col((BookingIdent::Bookings, BookingIdent::AssignedDriverId)).eq(driver_id.0),
            )
            .order_by((BookingIdent::Bookings, BookingIdent::Created), Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, BookingView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list bookings assigned to a driver")
    }

    #[tracing::instrument(skip_all, name = "db.bookings.list_by_trip")]
    pub async fn list_by_trip(conn: &mut PgConnection, trip_id: TripId) -> Result<Vec<Booking>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(BookingIdent::Bookings)
            .and_where(Expr::col(BookingIdent::TripId).eq(trip_id.0))
            .order_by(BookingIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list bookings of a trip")
    }

    /// Unmatched charter requests, newest first.
    #[tracing::instrument(skip_all, name = "db.bookings.list_open_requests")]
    pub async fn list_open_requests(conn: &mut PgConnection) -> Result<Vec<Booking>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(BookingIdent::Bookings)
            .and_where(Expr::col(BookingIdent::BookingType).eq(BookingType::Charter.as_ref()))
            .and_where(Expr::col(BookingIdent::Status).eq(BookingStatus::Pending.as_ref()))
            .and_where(Expr::col(BookingIdent::TripId).is_null())
            .order_by(BookingIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list open charter requests")
    }

    #[tracing::instrument(skip_all, name = "db.bookings.list_all")]
    pub async fn list_all(
        conn: &mut PgConnection,
        status: Option<BookingStatus>,
        limit: u64,
    ) -> Result<Vec<BookingView>> {
        let mut query = Self::view_select();
        query
            .order_by((BookingIdent::Bookings, BookingIdent::Created), Order::Desc)
            .limit(limit);

        if let Some(status) = status {
            query.and_where(
                Expr::col((BookingIdent::Bookings, BookingIdent::Status)).eq(status.as_ref()),
            );
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, BookingView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list bookings")
    }

    /// Completed bookings of this user that still miss their review.
    #[tracing::instrument(skip_all, name = "db.bookings.list_awaiting_review")]
    pub async fn list_awaiting_review(
        conn: &mut PgConnection,
        user_id: UserId,
        role: UserRole,
    ) -> Result<Vec<Booking>> {
        let (party_col, review_col) = match role {
            UserRole::Driver => (BookingIdent::AssignedDriverId, BookingIdent::DriverReviewId),
            _ => (BookingIdent::CustomerId, BookingIdent::CustomerReviewId),
        };

        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(BookingIdent::Bookings)
            .and_where(Expr::col(party_col).eq(user_id.0))
            .and_where(Expr::col(BookingIdent::Status).eq(BookingStatus::Completed.as_ref()))
            .and_where(Expr::col(review_col).is_null())
            .order_by(BookingIdent::CompletedAt, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list bookings awaiting review")
    }

    /// Moves a pending or confirmed booking to `cancelled`.
    ///
    /// The status guard makes the transition fire exactly once: a
    /// repeated cancel (or a cancel racing a completion) returns
    /// `None` and the caller knows no seats must be released.
    #[tracing::instrument(skip_all, name = "db.bookings.cancel")]
    pub async fn cancel(conn: &mut PgConnection, id: BookingId) -> Result<Option<Booking>> {
        let (sql, values) = Query::update()
            .table(BookingIdent::Bookings)
            .value(BookingIdent::Status, BookingStatus::Cancelled.as_ref())
            .value(BookingIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(BookingIdent::Id).eq(id.0))
            .and_where(Expr::col(BookingIdent::Status).is_in([
                BookingStatus::Pending.as_ref(),
                BookingStatus::Confirmed.as_ref(),
            ]))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not cancel booking")
    }

    /// Moves an active booking to `completed` and stamps the time.
    #[tracing::instrument(skip_all, name = "db.bookings.complete")]
    pub async fn complete(conn: &mut PgConnection, id: BookingId) -> Result<Option<Booking>> {
        let (sql, values) = Query::update()
            .table(BookingIdent::Bookings)
            .value(BookingIdent::Status, BookingStatus::Completed.as_ref())
            .value(BookingIdent::CompletedAt, Expr::current_timestamp())
            .value(BookingIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(BookingIdent::Id).eq(id.0))
            .and_where(Expr::col(BookingIdent::Status).is_in([
                BookingStatus::Pending.as_ref(),
                BookingStatus::Confirmed.as_ref(),
                BookingStatus::InProgress.as_ref(),
            ]))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not complete booking")
    }

    /// Attaches a driver (and optionally a trip and a price) to a
    /// pending booking and confirms it.
    ///
    /// Guarded on `status = 'pending'`, so two staff members racing
    /// over the same request serialize inside Postgres and exactly
    /// one of them wins.
    #[tracing::instrument(skip_all, name = "db.bookings.assign")]
    pub async fn assign(
        conn: &mut PgConnection,
        id: BookingId,
        driver_id: UserId,
        trip_id: Option<TripId>,
        price: Option<f64>,
    ) -> Result<Option<Booking>> {
        let mut query = Query::update();
        query
            .table(BookingIdent::Bookings)
            .value(BookingIdent::AssignedDriverId, driver_id.0)
            .value(BookingIdent::Status, BookingStatus::Confirmed.as_ref())
            .value(BookingIdent::ConfirmedAt, Expr::current_timestamp())
            .value(BookingIdent::Updated, Expr::current_timestamp());

        if let Some(trip_id) = trip_id {
            query.value(BookingIdent::TripId, trip_id.0);
        }
        if let Some(price) = price {
            query.value(BookingIdent::Price, price);
        }

        let (sql, values) = query
            .and_where(Expr::col(BookingIdent::Id).eq(id.0))
            .and_where(Expr::col(BookingIdent::Status).eq(BookingStatus::Pending.as_ref()))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not assign driver to booking")
    }

    /// Stamps the review written by one side of the booking.
    #[tracing::instrument(skip_all, name = "db.bookings.set_review")]
    pub async fn set_review(
        conn: &mut PgConnection,
        id: BookingId,
        reviewer_role: UserRole,
        review_id: ReviewId,
    ) -> Result<()> {
        let review_col = match reviewer_role {
            UserRole::Driver => BookingIdent::DriverReviewId,
            _ => BookingIdent::CustomerReviewId,
        };

        let (sql, values) = Query::update()
            .table(BookingIdent::Bookings)
            .value(review_col, review_id.0)
            .value(BookingIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(BookingIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not record review on booking")?;

        Ok(())
    }

    fn view_select() -> SelectStatement {
        Query::select()
            .column((BookingIdent::Bookings, Asterisk))
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
            .from(BookingIdent::Bookings)
            .left_join(
                UserIdent::Users,
                Expr::col((UserIdent::Users, UserIdent::Id))
                    .equals((BookingIdent::Bookings, BookingIdent::AssignedDriverId)),
            )
            .take()
    }
}

#[derive(Debug, Error)]
#[error("Could not insert booking")]
pub struct InsertBookingError;

#[derive(Builder)]
pub struct InsertBooking<'a> {
    pub customer_id: Option<UserId>,
    pub customer_name: &'a str,
    pub customer_phone: &'a str,
    pub trip_id: Option<TripId>,
    #[builder(default = BookingType::Seat)]
    pub booking_type: BookingType,
    pub pickup_location: &'a str,
    pub dropoff_location: &'a str,
    pub scheduled_time: NaiveDateTime,
    #[builder(default = 1)]
    pub seats_booked: i32,
    pub price: Option<f64>,
    pub assigned_driver_id: Option<UserId>,
    pub notes: Option<&'a str>,
    pub special_requests: Option<&'a str>,
}

impl InsertBooking<'_> {
    #[tracing::instrument(skip_all, name = "db.bookings.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<Booking, InsertBookingError> {
        let (sql, values) = Query::insert()
            .into_table(BookingIdent::Bookings)
            .columns([
                BookingIdent::CustomerId,
                BookingIdent::CustomerName,
                BookingIdent::CustomerPhone,
                BookingIdent::TripId,
                BookingIdent::BookingType,
                BookingIdent::PickupLocation,
                BookingIdent::DropoffLocation,
                BookingIdent::ScheduledTime,
                BookingIdent::SeatsBooked,
                BookingIdent::Price,
                BookingIdent::AssignedDriverId,
                BookingIdent::Notes,
                BookingIdent::SpecialRequests,
            ])
            .values_panic([
                self.customer_id.map(|v| v.0).into(),
                self.customer_name.into(),
                self.customer_phone.into(),
                self.trip_id.map(|v| v.0).into(),
                self.booking_type.as_ref().into(),
                self.pickup_location.into(),
                self.dropoff_location.into(),
                self.scheduled_time.into(),
                self.seats_booked.into(),
                self.price.into(),
                self.assigned_driver_id.map(|v| v.0).into(),
                self.notes.into(),
                self.special_requests.into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Booking, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertBookingError)
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use chrono::{Duration, Utc};

    pub async fn make_charter_request(conn: &mut PgConnection, customer_id: UserId) -> Booking {
        InsertBooking::builder()
            .customer_id(customer_id)
            .customer_name("Tigist Haile")
            .customer_phone("+251922345678")
            .booking_type(BookingType::Charter)
            .pickup_location("Addis Ababa")
            .dropoff_location("Adama (Nazret)")
            .scheduled_time(Utc::now().naive_utc() + Duration::hours(24))
            .seats_booked(2)
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

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn cancel_fires_exactly_once(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-cancel", UserRole::Rider).await;
        let booking = test_fixtures::make_charter_request(&mut conn, customer.id).await;

        let cancelled = Booking::cancel(&mut conn, booking.id).await.unwrap();
        assert!(cancelled.is_some());
        assert_eq!(cancelled.unwrap().status, BookingStatus::Cancelled);

        // second cancel observes the guard and does nothing
        let repeated = Booking::cancel(&mut conn, booking.id).await.unwrap();
        assert!(repeated.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn assign_serializes_matchers(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-assign", UserRole::Rider).await;
        let driver_a = make_user(&mut conn, "driver-assign-a", UserRole::Driver).await;
        let driver_b = make_user(&mut conn, "driver-assign-b", UserRole::Driver).await;
        let booking = test_fixtures::make_charter_request(&mut conn, customer.id).await;

        let won = Booking::assign(&mut conn, booking.id, driver_a.id, None, Some(1500.0))
            .await
            .unwrap()
            .expect("first matcher wins");
        assert_eq!(won.status, BookingStatus::Confirmed);
        assert_eq!(won.assigned_driver_id, Some(driver_a.id));
        assert!(won.confirmed_at.is_some());

        // the loser sees no pending row anymore
        let lost = Booking::assign(&mut conn, booking.id, driver_b.id, None, None)
            .await
            .unwrap();
        assert!(lost.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn completed_bookings_cannot_be_cancelled(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-complete", UserRole::Rider).await;
        let booking = test_fixtures::make_charter_request(&mut conn, customer.id).await;

        let completed = Booking::complete(&mut conn, booking.id).await.unwrap();
        assert!(completed.is_some());
        assert!(completed.unwrap().completed_at.is_some());

        let cancelled = Booking::cancel(&mut conn, booking.id).await.unwrap();
        assert!(cancelled.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn open_requests_exclude_matched_ones(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-open", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-open", UserRole::Driver).await;

        let first = test_fixtures::make_charter_request(&mut conn, customer.id).await;
        let second = test_fixtures::make_charter_request(&mut conn, customer.id).await;

        Booking::assign(&mut conn, first.id, driver.id, None, None)
            .await
            .unwrap()
            .unwrap();

        let open = Booking::list_open_requests(&mut conn).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);
        assert!(open[0].is_open_request());
    }
}
