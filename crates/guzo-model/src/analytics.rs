//! Cross-table aggregate queries backing the reporting routes.
//! Postgres does the folding; nothing here fetches whole tables to
//! reduce them in application code.
use chrono::NaiveDateTime;
use guzo_api_types::booking::BookingStatus;
use guzo_api_types::trip::TripStatus;
use guzo_api_types::user::UserRole;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Expr, ExprTrait, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;

use crate::booking::BookingIdent;
use crate::id::UserId;
use crate::trip::TripIdent;
use crate::user::UserIdent;

/// Dashboard headline numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total_users: i64,
    pub total_trips: i64,
    pub total_bookings: i64,
    pub total_revenue: f64,
}

#[tracing::instrument(skip_all, name = "db.analytics.totals")]
pub async fn totals(conn: &mut PgConnection) -> Result<Totals> {
    let (sql, values) = Query::select()
        .expr(Expr::cust("(SELECT COUNT(*) FROM users)"))
        .expr(Expr::cust("(SELECT COUNT(*) FROM driver_trips)"))
        .expr(Expr::cust("(SELECT COUNT(*) FROM bookings)"))
        .expr(Expr::cust(
            "(SELECT COALESCE(SUM(price), 0) FROM bookings WHERE status = 'completed')",
        ))
        .build_sqlx(PostgresQueryBuilder);

    let (total_users, total_trips, total_bookings, total_revenue) =
        sqlx::query_as_with::<_, (i64, i64, i64, f64), _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
            .attach_printable("could not load dashboard totals")?;

    Ok(Totals {
        total_users,
        total_trips,
        total_bookings,
        total_revenue,
    })
}

/// Completed-booking aggregates for one driver over a window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverEarningsAggregate {
    pub revenue: f64,
    pub bookings: i64,
    pub trips: i64,
    /// `(YYYY-MM-DD, revenue)` sorted by day.
    pub revenue_by_day: Vec<(String, f64)>,
    /// `(route, bookings, revenue)` top 5 by revenue.
    pub top_routes: Vec<(String, i64, f64)>,
}

#[tracing::instrument(skip_all, name = "db.analytics.driver_earnings")]
pub async fn driver_earnings(
    conn: &mut PgConnection,
    driver_id: UserId,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<DriverEarningsAggregate> {
    let completed_in_window = |query: &mut sea_query::SelectStatement| {
        query
            .from(BookingIdent::Bookings)
            .and_where(Expr::col(BookingIdent::AssignedDriverId).eq(driver_id.0))
            .and_where(Expr::col(BookingIdent::Status).eq(BookingStatus::Completed.as_ref()))
            .and_where(Expr::col(BookingIdent::CompletedAt).gte(start))
            .and_where(Expr::col(BookingIdent::CompletedAt).lte(end));
    };

    let mut query = Query::select();
    query
        .expr(Expr::cust("COALESCE(SUM(price), 0)"))
        .expr(Expr::cust("COUNT(*)"));
    completed_in_window(&mut query);
    let (sql, values) = query.build_sqlx(PostgresQueryBuilder);

    let (revenue, bookings) = sqlx::query_as_with::<_, (f64, i64), _>(&sql, values)
        .fetch_one(&mut *conn)
        .await
        .erase_context()
        .attach_printable("could not aggregate driver revenue")?;

    let (sql, values) = Query::select()
        .expr(Expr::cust("COUNT(*)"))
        .from(TripIdent::DriverTrips)
        .and_where(Expr::col(TripIdent::DriverId).eq(driver_id.0))
        .and_where(Expr::col(TripIdent::Status).eq(TripStatus::Completed.as_ref()))
        .and_where(Expr::col(TripIdent::DepartureTime).gte(start))
        .and_where(Expr::col(TripIdent::DepartureTime).lte(end))
        .build_sqlx(PostgresQueryBuilder);

    let trips = sqlx::query_scalar_with::<_, i64, _>(&sql, values)
        .fetch_one(&mut *conn)
        .await
        .erase_context()
        .attach_printable("could not count completed trips")?;

    let mut query = Query::select();
    query
        .expr(Expr::cust("to_char(completed_at, 'YYYY-MM-DD')"))
        .expr(Expr::cust("COALESCE(SUM(price), 0)"))
        .add_group_by([Expr::cust("1").into()])
        .order_by_expr(Expr::cust("1").into(), Order::Asc);
    completed_in_window(&mut query);
    let (sql, values) = query.build_sqlx(PostgresQueryBuilder);

    let revenue_by_day = sqlx::query_as_with::<_, (String, f64), _>(&sql, values)
        .fetch_all(&mut *conn)
        .await
        .erase_context()
        .attach_printable("could not aggregate revenue by day")?;

    let mut query = Query::select();
    query
        .expr(Expr::cust("pickup_location || ' - ' || dropoff_location"))
        .expr(Expr::cust("COUNT(*)"))
        .expr(Expr::cust("COALESCE(SUM(price), 0)"))
        .add_group_by([Expr::cust("1").into()])
        .order_by_expr(Expr::cust("3").into(), Order::Desc)
        .limit(5);
    completed_in_window(&mut query);
    let (sql, values) = query.build_sqlx(PostgresQueryBuilder);

    let top_routes = sqlx::query_as_with::<_, (String, i64, f64), _>(&sql, values)
        .fetch_all(conn)
        .await
        .erase_context()
        .attach_printable("could not aggregate top routes")?;

    Ok(DriverEarningsAggregate {
        revenue,
        bookings,
        trips,
        revenue_by_day,
        top_routes,
    })
}

/// Platform-wide aggregates for a reporting window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlatformAggregate {
    pub new_users: i64,
    pub active_users: i64,
    pub trips_created: i64,
    pub bookings_created: i64,
    pub completed_bookings: i64,
    pub cancelled_bookings: i64,
    pub revenue: f64,
    pub revenue_by_day: Vec<(String, f64)>,
    pub bookings_by_day: Vec<(String, i64)>,
}

#[tracing::instrument(skip_all, name = "db.analytics.platform")]
pub async fn platform(
    conn: &mut PgConnection,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<PlatformAggregate> {
    let mut query = Query::select();
    query
        .expr(Expr::cust("(SELECT COUNT(*) FROM users WHERE created >= $1)"))
        .expr(Expr::cust(
            "(SELECT COUNT(*) FROM users WHERE last_login IS NOT NULL AND last_login >= $1)",
        ))
        .expr(Expr::cust(
            "(SELECT COUNT(*) FROM driver_trips WHERE created BETWEEN $1 AND $2)",
        ))
        .expr(Expr::cust(
            "(SELECT COUNT(*) FROM bookings WHERE created BETWEEN $1 AND $2)",
        ))
        .expr(Expr::cust(
            "(SELECT COUNT(*) FROM bookings WHERE created BETWEEN $1 AND $2 \
             AND status = 'completed')",
        ))
        .expr(Expr::cust(
            "(SELECT COUNT(*) FROM bookings WHERE created BETWEEN $1 AND $2 \
             AND status = 'cancelled')",
        ))
        .expr(Expr::cust(
            "(SELECT COALESCE(SUM(price), 0) FROM bookings WHERE created BETWEEN $1 AND $2 \
             AND status = 'completed')",
        ));

    let sql = query.to_string(PostgresQueryBuilder);
    let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, f64)>(&sql)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *conn)
        .await
        .erase_context()
        .attach_printable("could not load platform stats")?;

    let revenue_by_day = sqlx::query_as::<_, (String, f64)>(
        "SELECT to_char(created, 'YYYY-MM-DD') AS day, COALESCE(SUM(price), 0) \
         FROM bookings \
         WHERE created BETWEEN $1 AND $2 AND status = 'completed' \
         GROUP BY 1 ORDER BY 1",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await
    .erase_context()
    .attach_printable("could not aggregate platform revenue by day")?;

    let bookings_by_day = sqlx::query_as::<_, (String, i64)>(
        "SELECT to_char(created, 'YYYY-MM-DD') AS day, COUNT(*) \
         FROM bookings \
         WHERE created BETWEEN $1 AND $2 \
         GROUP BY 1 ORDER BY 1",
    )
    .bind(start)
    .bind(end)
    .fetch_all(conn)
    .await
    .erase_context()
    .attach_printable("could not aggregate platform bookings by day")?;

    Ok(PlatformAggregate {
        new_users: row.0,
        active_users: row.1,
        trips_created: row.2,
        bookings_created: row.3,
        completed_bookings: row.4,
        cancelled_bookings: row.5,
        revenue: row.6,
        revenue_by_day,
        bookings_by_day,
    })
}

#[tracing::instrument(skip_all, name = "db.analytics.avg_driver_rating")]
pub async fn avg_driver_rating(conn: &mut PgConnection) -> Result<f64> {
    let (sql, values) = Query::select()
        .expr(Expr::cust("COALESCE(AVG(rating), 5.0)::float8"))
        .from(UserIdent::Users)
        .and_where(Expr::col(UserIdent::Role).eq(UserRole::Driver.as_ref()))
        .build_sqlx(PostgresQueryBuilder);

    sqlx::query_scalar_with::<_, f64, _>(&sql, values)
        .fetch_one(conn)
        .await
        .erase_context()
        .attach_printable("could not average driver ratings")
}

/// Booking demand for a route since `since`, grouped per day.
#[tracing::instrument(skip_all, name = "db.analytics.route_demand")]
pub async fn route_demand(
    conn: &mut PgConnection,
    origin: &str,
    destination: &str,
    since: NaiveDateTime,
) -> Result<(i64, Vec<(String, i64)>)> {
    let by_day = sqlx::query_as::<_, (String, i64)>(
        "SELECT to_char(created, 'YYYY-MM-DD') AS day, COUNT(*) \
         FROM bookings \
         WHERE lower(pickup_location) = lower($1) \
           AND lower(dropoff_location) = lower($2) \
           AND created >= $3 \
         GROUP BY 1 ORDER BY 1",
    )
    .bind(origin)
    .bind(destination)
    .bind(since)
    .fetch_all(conn)
    .await
    .erase_context()
    .attach_printable("could not aggregate route demand")?;

    let total = by_day.iter().map(|(_, count)| count).sum();
    Ok((total, by_day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::test_fixtures::make_charter_request;
    use crate::booking::Booking;
    use crate::user::test_fixtures::make_user;
    use chrono::{Duration, Utc};

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn totals_count_completed_revenue_only(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-totals", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-totals", UserRole::Driver).await;

        let done = make_charter_request(&mut conn, rider.id).await;
        Booking::assign(&mut conn, done.id, driver.id, None, Some(2000.0))
            .await
            .unwrap()
            .unwrap();
        Booking::complete(&mut conn, done.id).await.unwrap().unwrap();

        // open request with a price that must not count
        let open = make_charter_request(&mut conn, rider.id).await;
        assert!(open.price.is_none());

        let totals = totals(&mut conn).await.unwrap();
        assert_eq!(totals.total_users, 2);
        assert_eq!(totals.total_bookings, 2);
        assert_eq!(totals.total_revenue, 2000.0);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn driver_earnings_cover_window_only(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-window", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-window", UserRole::Driver).await;

        let booking = make_charter_request(&mut conn, rider.id).await;
        Booking::assign(&mut conn, booking.id, driver.id, None, Some(1500.0))
            .await
            .unwrap()
            .unwrap();
        Booking::complete(&mut conn, booking.id).await.unwrap().unwrap();

        let now = Utc::now().naive_utc();
        let aggregate =
            driver_earnings(&mut conn, driver.id, now - Duration::days(30), now + Duration::days(1))
                .await
                .unwrap();
        assert_eq!(aggregate.revenue, 1500.0);
        assert_eq!(aggregate.bookings, 1);
        assert_eq!(aggregate.revenue_by_day.len(), 1);
        assert_eq!(aggregate.top_routes.len(), 1);
        assert_eq!(aggregate.top_routes[0].1, 1);

        // a window in the past sees nothing
        let empty = driver_earnings(
            &mut conn,
            driver.id,
            now - Duration::days(60),
            now - Duration::days(30),
        )
        .await
        .unwrap();
        assert_eq!(empty.revenue, 0.0);
        assert_eq!(empty.bookings, 0);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn route_demand_groups_per_day(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-demand", UserRole::Rider).await;

        make_charter_request(&mut conn, rider.id).await;
        make_charter_request(&mut conn, rider.id).await;

        let since = Utc::now().naive_utc() - Duration::days(7);
        let (total, by_day) =
            route_demand(&mut conn, "addis ababa", "adama (nazret)", since)
                .await
                .unwrap();
        assert_eq!(total, 2);
        assert_eq!(by_day.len(), 1);
    }
}
