use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::admin::{
    AdminStats, AnalyticsPeriod, DayRevenue, DriverEarnings, ListUsers, PlatformStats,
    RouteRevenue, UserCounts, UserListing,
};
use guzo_api_types::routes::pricing::DayCount;
use guzo_error::ApiError;
use guzo_model::id::UserId;

use super::morphers;
use crate::extract::{Json, SessionAdmin};
use crate::services::admin::DriverEarningsReport;
use crate::{services, App};

pub async fn stats(app: App, admin: SessionAdmin) -> Result<Response, ApiError> {
    let totals = services::admin::GetDashboardStats
        .perform(&app, &admin)
        .await?;

    let response = AdminStats {
        total_users: totals.total_users,
        total_trips: totals.total_trips,
        total_bookings: totals.total_bookings,
        total_revenue: totals.total_revenue,
    };

    Ok(Json(response).into_response())
}

pub async fn list_users(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<ListUsers>,
) -> Result<Response, ApiError> {
    let listing = services::admin::ListUsers { role: query.role }
        .perform(&app, &admin)
        .await?;

    let response = UserListing {
        users: listing.users.iter().map(morphers::user_profile).collect(),
        counts: UserCounts {
            all: listing.all,
            drivers: listing.drivers,
            riders: listing.riders,
        },
    };

    Ok(Json(response).into_response())
}

pub async fn activate_user(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = services::admin::SetUserActive {
        user_id: UserId(id),
        active: true,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::user_profile(&user)).into_response())
}

pub async fn deactivate_user(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = services::admin::SetUserActive {
        user_id: UserId(id),
        active: false,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::user_profile(&user)).into_response())
}

pub(super) fn earnings_response(report: DriverEarningsReport) -> DriverEarnings {
    let aggregate = report.aggregate;
    let avg_revenue_per_trip = if aggregate.trips > 0 {
        aggregate.revenue / aggregate.trips as f64
    } else {
        0.0
    };

    DriverEarnings {
        driver_id: report.driver.id.0,
        driver_name: report.driver.full_name.clone(),
        period: report.period,
        total_revenue: aggregate.revenue,
        total_trips: aggregate.trips,
        total_bookings: aggregate.bookings,
        avg_revenue_per_trip: (avg_revenue_per_trip * 100.0).round() / 100.0,
        avg_rating: report.driver.rating,
        revenue_by_day: aggregate
            .revenue_by_day
            .into_iter()
            .map(|(day, revenue)| DayRevenue { day, revenue })
            .collect(),
        top_routes: aggregate
            .top_routes
            .into_iter()
            .map(|(route, count, revenue)| RouteRevenue {
                route,
                count,
                revenue,
            })
            .collect(),
        revenue_change_percent: report.revenue_change_percent,
    }
}

pub async fn driver_earnings(
    app: App,
    _admin: SessionAdmin,
    Path(id): Path<i64>,
    Query(query): Query<AnalyticsPeriod>,
) -> Result<Response, ApiError> {
    let report = services::admin::GetDriverEarnings {
        driver_id: UserId(id),
        period: query.period,
    }
    .perform(&app)
    .await?;

    Ok(Json(earnings_response(report)).into_response())
}

pub async fn platform_stats(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<AnalyticsPeriod>,
) -> Result<Response, ApiError> {
    let report = services::admin::GetPlatformStats {
        period: query.period,
    }
    .perform(&app, &admin)
    .await?;

    let aggregate = report.aggregate;
    let (total_users, total_drivers, total_riders) = report.totals;

    let avg_booking_value = if aggregate.completed_bookings > 0 {
        aggregate.revenue / aggregate.completed_bookings as f64
    } else {
        0.0
    };
    let booking_completion_rate = if aggregate.bookings_created > 0 {
        aggregate.completed_bookings as f64 / aggregate.bookings_created as f64 * 100.0
    } else {
        0.0
    };

    let response = PlatformStats {
        period: report.period,
        total_users,
        total_drivers,
        total_riders,
        new_users: aggregate.new_users,
        active_users: aggregate.active_users,
        total_trips: aggregate.trips_created,
        total_bookings: aggregate.bookings_created,
        completed_bookings: aggregate.completed_bookings,
        cancelled_bookings: aggregate.cancelled_bookings,
        total_revenue: aggregate.revenue,
        avg_booking_value: (avg_booking_value * 100.0).round() / 100.0,
        booking_completion_rate: (booking_completion_rate * 10.0).round() / 10.0,
        avg_driver_rating: report.avg_driver_rating,
        revenue_by_day: aggregate
            .revenue_by_day
            .into_iter()
            .map(|(day, revenue)| DayRevenue { day, revenue })
            .collect(),
        bookings_by_day: aggregate
            .bookings_by_day
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect(),
    };

    Ok(Json(response).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_utils;
    use serde_json::json;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn admin_routes_reject_regular_users(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let rider = test_utils::users::rider_session(&app, "not-an-admin").await;
        test_utils::users::authorize(&mut server, &app, &rider);

        let response = server.get("/api/v1/admin/stats").await;
        response.assert_status_unauthorized();
        response.assert_json_contains(&json!({ "code": "access_denied" }));
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn dashboard_counts_the_marketplace(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let admin = test_utils::users::admin_session(&app, "stats-admin").await;
        let driver = test_utils::users::driver_session(&app, "stats-driver").await;
        test_utils::trips::publish(&app, &driver, 4).await;

        test_utils::users::authorize(&mut server, &app, &admin);

        let response = server.get("/api/v1/admin/stats").await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "total_users": 2,
            "total_trips": 1,
            "total_bookings": 0,
        }));
    }
}
