use chrono::{Duration, NaiveDateTime, Utc};
use guzo_api_types::routes::admin::ReportPeriod;
use guzo_api_types::user::UserRole;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::analytics::{self, DriverEarningsAggregate, PlatformAggregate, Totals};
use guzo_model::id::UserId;
use guzo_model::user::UpdateUser;
use guzo_model::User;

use crate::extract::SessionAdmin;
use crate::App;

fn period_window(period: ReportPeriod, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = match period {
        ReportPeriod::Today => now.date().and_hms_opt(0, 0, 0).unwrap_or(now),
        ReportPeriod::Week => now - Duration::days(7),
        ReportPeriod::Month => now - Duration::days(30),
    };
    (start, now)
}

#[derive(Debug)]
pub struct GetDashboardStats;

impl GetDashboardStats {
    #[tracing::instrument(skip_all, name = "services.admin.dashboard")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Totals, ApiError> {
        let mut conn = app.db_read().await?;
        let totals = analytics::totals(&mut conn).await?;
        Ok(totals)
    }
}

#[derive(Debug)]
pub struct UserListing {
    pub users: Vec<User>,
    pub all: i64,
    pub drivers: i64,
    pub riders: i64,
}

#[derive(Debug)]
pub struct ListUsers {
    pub role: Option<UserRole>,
}

impl ListUsers {
    const LIMIT: u64 = 200;

    #[tracing::instrument(skip(app), name = "services.admin.list_users")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<UserListing, ApiError> {
        let mut conn = app.db_read().await?;

        let users = User::list(&mut conn, self.role, Self::LIMIT).await?;
        let all = User::count(&mut conn, None).await?;
        let drivers = User::count(&mut conn, Some(UserRole::Driver)).await?;
        let riders = User::count(&mut conn, Some(UserRole::Rider)).await?;

        Ok(UserListing {
            users,
            all,
            drivers,
            riders,
        })
    }
}

/// Enables or disables an account. An admin can never disable their
/// own account.
#[derive(Debug)]
pub struct SetUserActive {
    pub user_id: UserId,
    pub active: bool,
}

impl SetUserActive {
    #[tracing::instrument(skip(app, admin), name = "services.admin.set_user_active")]
    pub async fn perform(self, app: &App, admin: &SessionAdmin) -> Result<User, ApiError> {
        if !self.active && self.user_id == admin.id {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Cannot deactivate your own account."));
        }

        let mut conn = app.db_write().await?;
        if User::find(&mut conn, self.user_id).await?.is_none() {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        let user = UpdateUser::builder()
            .id(self.user_id)
            .active(self.active)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(user)
    }
}

#[derive(Debug)]
pub struct DriverEarningsReport {
    pub driver: User,
    pub period: ReportPeriod,
    pub aggregate: DriverEarningsAggregate,
    pub revenue_change_percent: f64,
}

/// Earnings report for one driver: the requested window plus a delta
/// against the previous window of the same length.
#[derive(Debug)]
pub struct GetDriverEarnings {
    pub driver_id: UserId,
    pub period: ReportPeriod,
}

impl GetDriverEarnings {
    #[tracing::instrument(skip(app), name = "services.admin.driver_earnings")]
    pub async fn perform(self, app: &App) -> Result<DriverEarningsReport, ApiError> {
        let mut conn = app.db_read().await?;

        let Some(driver) = User::find(&mut conn, self.driver_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let now = Utc::now().naive_utc();
        let (start, end) = period_window(self.period, now);

        let aggregate = analytics::driver_earnings(&mut conn, self.driver_id, start, end).await?;

        let previous_start = start - (end - start);
        let previous =
            analytics::driver_earnings(&mut conn, self.driver_id, previous_start, start).await?;

        let revenue_change_percent = if previous.revenue > 0.0 {
            ((aggregate.revenue - previous.revenue) / previous.revenue) * 100.0
        } else if aggregate.revenue > 0.0 {
            100.0
        } else {
            0.0
        };

        Ok(DriverEarningsReport {
            driver,
            period: self.period,
            aggregate,
            revenue_change_percent: (revenue_change_percent * 10.0).round() / 10.0,
        })
    }
}

#[derive(Debug)]
pub struct PlatformStatsReport {
    pub period: ReportPeriod,
    pub totals: (i64, i64, i64),
    pub aggregate: PlatformAggregate,
    pub avg_driver_rating: f64,
}

#[derive(Debug)]
pub struct GetPlatformStats {
    pub period: ReportPeriod,
}

impl GetPlatformStats {
    #[tracing::instrument(skip(app), name = "services.admin.platform_stats")]
    pub async fn perform(
        self,
        app: &App,
        _admin: &SessionAdmin,
    ) -> Result<PlatformStatsReport, ApiError> {
        let mut conn = app.db_read().await?;

        let now = Utc::now().naive_utc();
        let (start, end) = period_window(self.period, now);

        let aggregate = analytics::platform(&mut conn, start, end).await?;
        let avg_driver_rating = analytics::avg_driver_rating(&mut conn).await?;

        let total_users = User::count(&mut conn, None).await?;
        let total_drivers = User::count(&mut conn, Some(UserRole::Driver)).await?;
        let total_riders = User::count(&mut conn, Some(UserRole::Rider)).await?;

        Ok(PlatformStatsReport {
            period: self.period,
            totals: (total_users, total_drivers, total_riders),
            aggregate,
            avg_driver_rating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn admins_cannot_deactivate_themselves(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "adm-self").await;

        let error = SetUserActive {
            user_id: admin.id,
            active: false,
        }
        .perform(&app, &admin)
        .await
        .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn deactivated_users_cannot_log_in(pool: sqlx::PgPool) {
        use crate::services::users::Login;
        use guzo_api_types::error::category::LoginUserFailed;
        use guzo_utils::Sensitive;

        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "adm-deact").await;
        let rider = test_utils::users::rider_session(&app, "adm-victim").await;

        SetUserActive {
            user_id: rider.id,
            active: false,
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        let error = Login {
            email: Sensitive::new("adm-victim@example.com"),
            password: Sensitive::new(test_utils::users::TEST_PASSWORD),
        }
        .perform(&app)
        .await
        .unwrap_err();

        assert_eq!(
            error.category,
            ApiErrorCategory::LoginUserFailed(LoginUserFailed::AccountDisabled)
        );
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn user_listing_counts_roles(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "adm-count").await;
        test_utils::users::driver_session(&app, "adm-d1").await;
        test_utils::users::driver_session(&app, "adm-d2").await;
        test_utils::users::rider_session(&app, "adm-r1").await;

        let listing = ListUsers {
            role: Some(UserRole::Driver),
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        assert_eq!(listing.users.len(), 2);
        assert_eq!(listing.all, 4);
        assert_eq!(listing.drivers, 2);
        assert_eq!(listing.riders, 1);
    }
}
