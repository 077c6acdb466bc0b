use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::pricing::SurgeReason;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Asterisk, Expr, ExprTrait, Func, Iden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{PricingRuleId, SurgeId, UserId};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub origin: String,
    pub destination: String,

    pub base_fare: f64,
    pub per_km_rate: f64,
    pub estimated_distance_km: f64,

    pub active: bool,
}

impl PricingRule {
    /// Base price before any surge.
    #[must_use]
    pub fn calculated_price(&self) -> f64 {
        self.base_fare + self.per_km_rate * self.estimated_distance_km
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SurgeMultiplier {
    pub id: SurgeId,
    pub created: NaiveDateTime,

    pub route_key: String,

    pub multiplier: f64,
    pub reason: SurgeReason,
    pub description: Option<String>,

    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,

    pub active: bool,

    pub recurring: bool,
    pub recurring_days: Vec<i32>,
    pub recurring_start_hour: Option<i32>,
    pub recurring_end_hour: Option<i32>,

    pub created_by: Option<UserId>,
}

impl SurgeMultiplier {
    /// Whether this surge applies at `at`: either the one-shot window
    /// covers it, or the recurring weekly schedule does.
    #[must_use]
    pub fn applies_at(&self, at: NaiveDateTime) -> bool {
        use chrono::{Datelike, Timelike};

        if !self.active {
            return false;
        }

        if self.recurring {
            // recurring days are counted with 0 = Monday
            let weekday = at.weekday().num_days_from_monday() as i32;
            if !self.recurring_days.contains(&weekday) {
                return false;
            }

            let hour = at.hour() as i32;
            match (self.recurring_start_hour, self.recurring_end_hour) {
                (Some(start), Some(end)) => start <= hour && hour < end,
                _ => true,
            }
        } else {
            self.starts_at <= at && at < self.ends_at
        }
    }
}

#[derive(Debug, Clone, Iden)]
pub enum PricingRuleIdent {
    PricingRules,
    Id,
    Created,
    Updated,
    Origin,
    Destination,
    BaseFare,
    PerKmRate,
    EstimatedDistanceKm,
    Active,
}

#[derive(Debug, Clone, Iden)]
pub enum SurgeIdent {
    SurgeMultipliers,
    Id,
    Created,
    RouteKey,
    Multiplier,
    Reason,
    Description,
    StartsAt,
    EndsAt,
    Active,
    Recurring,
    RecurringDays,
    RecurringStartHour,
    RecurringEndHour,
    CreatedBy,
}

impl PricingRule {
    #[tracing::instrument(skip_all, name = "db.pricing_rules.find")]
    pub async fn find(conn: &mut PgConnection, id: PricingRuleId) -> Result<Option<PricingRule>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PricingRuleIdent::PricingRules)
            .and_where(Expr::col(PricingRuleIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, PricingRule, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find pricing rule by id")
    }

    #[tracing::instrument(skip_all, name = "db.pricing_rules.find_by_route")]
    pub async fn find_by_route(
        conn: &mut PgConnection,
        origin: &str,
        destination: &str,
    ) -> Result<Option<PricingRule>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PricingRuleIdent::PricingRules)
            .and_where(
                Func::lower(Expr::col(PricingRuleIdent::Origin)).eq(origin.to_lowercase()),
            )
            .and_where(
                Func::lower(Expr::col(PricingRuleIdent::Destination))
                    .eq(destination.to_lowercase()),
            )
            .and_where(Expr::col(PricingRuleIdent::Active).eq(true))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, PricingRule, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find pricing rule for route")
    }

    #[tracing::instrument(skip_all, name = "db.pricing_rules.list")]
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<PricingRule>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PricingRuleIdent::PricingRules)
            .order_by(PricingRuleIdent::Origin, Order::Asc)
            .order_by(PricingRuleIdent::Destination, Order::Asc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, PricingRule, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list pricing rules")
    }

    #[tracing::instrument(skip_all, name = "db.pricing_rules.delete")]
    pub async fn delete(conn: &mut PgConnection, id: PricingRuleId) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(PricingRuleIdent::PricingRules)
            .and_where(Expr::col(PricingRuleIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete pricing rule")?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Error)]
#[error("Could not insert pricing rule")]
pub struct InsertPricingRuleError;

#[derive(Builder)]
pub struct InsertPricingRule<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub estimated_distance_km: f64,
}

impl InsertPricingRule<'_> {
    #[tracing::instrument(skip_all, name = "db.pricing_rules.insert")]
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
    ) -> Result<PricingRule, InsertPricingRuleError> {
        let (sql, values) = Query::insert()
            .into_table(PricingRuleIdent::PricingRules)
            .columns([
                PricingRuleIdent::Origin,
                PricingRuleIdent::Destination,
                PricingRuleIdent::BaseFare,
                PricingRuleIdent::PerKmRate,
                PricingRuleIdent::EstimatedDistanceKm,
            ])
            .values_panic([
                self.origin.into(),
                self.destination.into(),
                self.base_fare.into(),
                self.per_km_rate.into(),
                self.estimated_distance_km.into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, PricingRule, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertPricingRuleError)
    }
}

#[derive(Debug, Error)]
#[error("Could not update pricing rule")]
pub struct UpdatePricingRuleError;

#[derive(Builder)]
pub struct UpdatePricingRule {
    #[builder(into)]
    pub id: PricingRuleId,
    pub base_fare: Option<f64>,
    pub per_km_rate: Option<f64>,
    pub estimated_distance_km: Option<f64>,
    pub active: Option<bool>,
}

impl UpdatePricingRule {
    #[tracing::instrument(skip_all, name = "db.pricing_rules.update")]
    pub async fn update(
        &self,
        conn: &mut PgConnection,
    ) -> Result<PricingRule, UpdatePricingRuleError> {
        let mut query = Query::update();
        query.table(PricingRuleIdent::PricingRules);

        if let Some(base_fare) = self.base_fare {
            query.value(PricingRuleIdent::BaseFare, base_fare);
        }
        if let Some(per_km_rate) = self.per_km_rate {
            query.value(PricingRuleIdent::PerKmRate, per_km_rate);
        }
        if let Some(estimated_distance_km) = self.estimated_distance_km {
            query.value(PricingRuleIdent::EstimatedDistanceKm, estimated_distance_km);
        }
        if let Some(active) = self.active {
            query.value(PricingRuleIdent::Active, active);
        }

        let (sql, values) = query
            .value(PricingRuleIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(PricingRuleIdent::Id).eq(self.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, PricingRule, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(UpdatePricingRuleError)
    }
}

impl SurgeMultiplier {
    #[tracing::instrument(skip_all, name = "db.surges.find")]
    pub async fn find(conn: &mut PgConnection, id: SurgeId) -> Result<Option<SurgeMultiplier>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(SurgeIdent::SurgeMultipliers)
            .and_where(Expr::col(SurgeIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find surge by id")
    }

    #[tracing::instrument(skip_all, name = "db.surges.list")]
    pub async fn list(conn: &mut PgConnection, active_only: bool) -> Result<Vec<SurgeMultiplier>> {
        let mut query = Query::select();
        query
            .column(Asterisk)
            .from(SurgeIdent::SurgeMultipliers)
            .order_by(SurgeIdent::Created, Order::Desc);

        if active_only {
            query.and_where(Expr::col(SurgeIdent::Active).eq(true));
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list surge multipliers")
    }

    /// Active surges that may apply to a route right now: the route's
    /// own key, the `"*"` wildcard, one-shot windows covering `now`
    /// and any recurring schedule. Exact applicability is decided by
    /// [`SurgeMultiplier::applies_at`].
    #[tracing::instrument(skip_all, name = "db.surges.list_for_route")]
    pub async fn list_for_route(
        conn: &mut PgConnection,
        route_key: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<SurgeMultiplier>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(SurgeIdent::SurgeMultipliers)
            .and_where(Expr::col(SurgeIdent::Active).eq(true))
            .and_where(Expr::col(SurgeIdent::RouteKey).is_in([route_key, "*"]))
            .and_where(
                Expr::col(SurgeIdent::Recurring).eq(true).or(Expr::col(SurgeIdent::StartsAt)
                    .lte(now)
                    .and(Expr::col(SurgeIdent::EndsAt).gt(now))),
            )
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list surges for route")
    }

    #[tracing::instrument(skip_all, name = "db.surges.deactivate")]
    pub async fn deactivate(
        conn: &mut PgConnection,
        id: SurgeId,
    ) -> Result<Option<SurgeMultiplier>> {
        let (sql, values) = Query::update()
            .table(SurgeIdent::SurgeMultipliers)
            .value(SurgeIdent::Active, false)
            .and_where(Expr::col(SurgeIdent::Id).eq(id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not deactivate surge")
    }

    #[tracing::instrument(skip_all, name = "db.surges.delete")]
    pub async fn delete(conn: &mut PgConnection, id: SurgeId) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(SurgeIdent::SurgeMultipliers)
            .and_where(Expr::col(SurgeIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete surge")?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Error)]
#[error("Could not insert surge multiplier")]
pub struct InsertSurgeError;

#[derive(Builder)]
pub struct InsertSurge<'a> {
    pub route_key: &'a str,
    pub multiplier: f64,
    #[builder(default = SurgeReason::Manual)]
    pub reason: SurgeReason,
    pub description: Option<&'a str>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    #[builder(default)]
    pub recurring: bool,
    #[builder(default)]
    pub recurring_days: Vec<i32>,
    pub recurring_start_hour: Option<i32>,
    pub recurring_end_hour: Option<i32>,
    pub created_by: Option<UserId>,
}

impl InsertSurge<'_> {
    #[tracing::instrument(skip_all, name = "db.surges.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<SurgeMultiplier, InsertSurgeError> {
        let (sql, values) = Query::insert()
            .into_table(SurgeIdent::SurgeMultipliers)
            .columns([
                SurgeIdent::RouteKey,
                SurgeIdent::Multiplier,
                SurgeIdent::Reason,
                SurgeIdent::Description,
                SurgeIdent::StartsAt,
                SurgeIdent::EndsAt,
                SurgeIdent::Recurring,
                SurgeIdent::RecurringDays,
                SurgeIdent::RecurringStartHour,
                SurgeIdent::RecurringEndHour,
                SurgeIdent::CreatedBy,
            ])
            .values_panic([
                self.route_key.into(),
                self.multiplier.into(),
                self.reason.as_ref().into(),
                self.description.into(),
                self.starts_at.into(),
                self.ends_at.into(),
                self.recurring.into(),
                self.recurring_days.clone().into(),
                self.recurring_start_hour.into(),
                self.recurring_end_hour.into(),
                self.created_by.map(|v| v.0).into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertSurgeError)
    }
}

#[derive(Debug, Error)]
#[error("Could not update surge multiplier")]
pub struct UpdateSurgeError;

#[derive(Builder)]
pub struct UpdateSurge<'a> {
    #[builder(into)]
    pub id: SurgeId,
    pub multiplier: Option<f64>,
    pub reason: Option<SurgeReason>,
    pub description: Option<&'a str>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub active: Option<bool>,
}

impl UpdateSurge<'_> {
    #[tracing::instrument(skip_all, name = "db.surges.update")]
    pub async fn update(&self, conn: &mut PgConnection) -> Result<SurgeMultiplier, UpdateSurgeError> {
        let mut query = Query::update();
        query.table(SurgeIdent::SurgeMultipliers);

        if let Some(multiplier) = self.multiplier {
            query.value(SurgeIdent::Multiplier, multiplier);
        }
        if let Some(reason) = self.reason {
            query.value(SurgeIdent::Reason, reason.as_ref());
        }
        if let Some(description) = self.description {
            query.value(SurgeIdent::Description, description);
        }
        if let Some(starts_at) = self.starts_at {
            query.value(SurgeIdent::StartsAt, starts_at);
        }
        if let Some(ends_at) = self.ends_at {
            query.value(SurgeIdent::EndsAt, ends_at);
        }
        if let Some(active) = self.active {
            query.value(SurgeIdent::Active, active);
        }

        let (sql, values) = query
            .and_where(Expr::col(SurgeIdent::Id).eq(self.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, SurgeMultiplier, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(UpdateSurgeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn rule_lookup_ignores_case(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let rule = InsertPricingRule::builder()
            .origin("Addis Ababa")
            .destination("Bahir Dar")
            .base_fare(100.0)
            .per_km_rate(5.0)
            .estimated_distance_km(500.0)
            .build()
            .insert(&mut conn)
            .await
            .unwrap();
        assert_eq!(rule.calculated_price(), 2600.0);

        let found = PricingRule::find_by_route(&mut conn, "addis ababa", "BAHIR DAR")
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.id), Some(rule.id));
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn wildcard_surges_apply_to_every_route(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let now = Utc::now().naive_utc();

        InsertSurge::builder()
            .route_key("*")
            .multiplier(1.5)
            .reason(SurgeReason::Holiday)
            .starts_at(now - Duration::hours(1))
            .ends_at(now + Duration::hours(1))
            .build()
            .insert(&mut conn)
            .await
            .unwrap();

        let surges = SurgeMultiplier::list_for_route(&mut conn, "Addis Ababa-Hawassa", now)
            .await
            .unwrap();
        assert_eq!(surges.len(), 1);
        assert!(surges[0].applies_at(now));
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn deactivated_surges_stop_applying(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let now = Utc::now().naive_utc();

        let surge = InsertSurge::builder()
            .route_key("Addis Ababa-Adama (Nazret)")
            .multiplier(2.0)
            .starts_at(now - Duration::hours(1))
            .ends_at(now + Duration::hours(1))
            .build()
            .insert(&mut conn)
            .await
            .unwrap();

        SurgeMultiplier::deactivate(&mut conn, surge.id)
            .await
            .unwrap()
            .unwrap();

        let surges =
            SurgeMultiplier::list_for_route(&mut conn, "Addis Ababa-Adama (Nazret)", now)
                .await
                .unwrap();
        assert!(surges.is_empty());
    }

    #[test]
    fn recurring_surges_follow_the_weekly_schedule() {
        // 2025-01-06 is a Monday
        let monday_morning = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let monday_noon = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let sunday_morning = NaiveDate::from_ymd_opt(2025, 1, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let surge = SurgeMultiplier {
            id: SurgeId(1),
            created: monday_morning,
            route_key: "*".into(),
            multiplier: 1.3,
            reason: SurgeReason::PeakHours,
            description: None,
            starts_at: monday_morning,
            ends_at: monday_morning,
            active: true,
            recurring: true,
            recurring_days: vec![0, 1, 2, 3, 4],
            recurring_start_hour: Some(7),
            recurring_end_hour: Some(9),
            created_by: None,
        };

        assert!(surge.applies_at(monday_morning));
        assert!(!surge.applies_at(monday_noon));
        assert!(!surge.applies_at(sunday_morning));
    }
}
