use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use guzo_api_types::pricing::{PriceQuote, SurgeReason, TripPricingSuggestion};
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::analytics;
use guzo_model::id::{PricingRuleId, SurgeId};
use guzo_model::pricing::{
    InsertPricingRule, InsertSurge, PricingRule, SurgeMultiplier,
    UpdatePricingRule as UpdateRuleChangeset, UpdateSurge as UpdateSurgeChangeset,
};

use crate::extract::SessionAdmin;
use crate::App;

// Defaults applied when a route has no pricing rule yet.
const DEFAULT_BASE_FARE: f64 = 50.0;
const DEFAULT_PER_KM_RATE: f64 = 3.0;
const DEFAULT_DISTANCE_KM: f64 = 100.0;

// Built-in commuter peak windows (UTC hours).
const PEAK_MORNING: std::ops::Range<u32> = 7..9;
const PEAK_EVENING: std::ops::Range<u32> = 17..19;
const PEAK_MULTIPLIER: f64 = 1.2;

const MULTIPLIER_RANGE: std::ops::RangeInclusive<f64> = 1.0..=5.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn peak_multiplier(at: NaiveDateTime) -> f64 {
    let hour = at.hour();
    if PEAK_MORNING.contains(&hour) || PEAK_EVENING.contains(&hour) {
        PEAK_MULTIPLIER
    } else {
        1.0
    }
}

/// Quotes a route at a point in time: rule-based base price times the
/// highest applicable surge.
#[derive(Debug)]
pub struct QuoteRoute<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub at: Option<NaiveDateTime>,
}

impl QuoteRoute<'_> {
    #[tracing::instrument(skip(self, app), name = "services.pricing.quote")]
    pub async fn perform(self, app: &App) -> Result<PriceQuote, ApiError> {
        let at = self.at.unwrap_or_else(|| Utc::now().naive_utc());
        let mut conn = app.db_read().await?;

        let rule = PricingRule::find_by_route(&mut conn, self.origin, self.destination).await?;
        let base_price = match &rule {
            Some(rule) => rule.calculated_price(),
            None => DEFAULT_BASE_FARE + DEFAULT_PER_KM_RATE * DEFAULT_DISTANCE_KM,
        };

        let route_key = format!("{}-{}", self.origin, self.destination);
        let surges = SurgeMultiplier::list_for_route(&mut conn, &route_key, at).await?;

        let mut max_multiplier = 1.0;
        let mut surge_reason: Option<String> = None;

        for surge in surges.iter().filter(|surge| surge.applies_at(at)) {
            if surge.multiplier > max_multiplier {
                max_multiplier = surge.multiplier;
                surge_reason = Some(surge.reason.to_string());
            }
        }

        let peak = peak_multiplier(at);
        if peak > max_multiplier {
            max_multiplier = peak;
            surge_reason = Some(SurgeReason::PeakHours.to_string());
        }

        Ok(PriceQuote {
            base_price: round2(base_price),
            surge_multiplier: max_multiplier,
            surge_reason,
            final_price: round2(base_price * max_multiplier),
            surge_active: max_multiplier > 1.0,
        })
    }
}

/// Suggested per-seat and whole-car pricing for a driver publishing a
/// trip on a route.
#[derive(Debug)]
pub struct SuggestTripPricing<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
}

impl SuggestTripPricing<'_> {
    // assume a sedan-sized car when splitting the whole-car quote
    const ASSUMED_SEATS: f64 = 4.0;

    #[tracing::instrument(skip(self, app), name = "services.pricing.suggest")]
    pub async fn perform(self, app: &App) -> Result<TripPricingSuggestion, ApiError> {
        let quote = QuoteRoute {
            origin: self.origin,
            destination: self.destination,
            at: None,
        }
        .perform(app)
        .await?;

        Ok(TripPricingSuggestion {
            price_per_seat: round2(quote.final_price / Self::ASSUMED_SEATS),
            whole_car_price: quote.final_price,
            surge_active: quote.surge_active,
            surge_reason: quote.surge_reason,
        })
    }
}

#[derive(Debug)]
pub struct CreateRule<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub estimated_distance_km: f64,
}

impl CreateRule<'_> {
    #[tracing::instrument(skip(self, app), name = "services.pricing.create_rule")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<PricingRule, ApiError> {
        if self.base_fare <= 0.0 || self.per_km_rate <= 0.0 || self.estimated_distance_km <= 0.0 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Fares, rates and distances must be positive."));
        }

        let mut conn = app.db_write().await?;

        if PricingRule::find_by_route(&mut conn, self.origin, self.destination)
            .await?
            .is_some()
        {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("A pricing rule for this route already exists."));
        }

        let rule = InsertPricingRule::builder()
            .origin(self.origin)
            .destination(self.destination)
            .base_fare(self.base_fare)
            .per_km_rate(self.per_km_rate)
            .estimated_distance_km(self.estimated_distance_km)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(rule)
    }
}

#[derive(Debug)]
pub struct UpdateRule {
    pub id: PricingRuleId,
    pub base_fare: Option<f64>,
    pub per_km_rate: Option<f64>,
    pub estimated_distance_km: Option<f64>,
    pub active: Option<bool>,
}

impl UpdateRule {
    #[tracing::instrument(skip(self, app), name = "services.pricing.update_rule")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<PricingRule, ApiError> {
        let mut conn = app.db_write().await?;

        if PricingRule::find(&mut conn, self.id).await?.is_none() {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        let rule = UpdateRuleChangeset::builder()
            .id(self.id)
            .maybe_base_fare(self.base_fare)
            .maybe_per_km_rate(self.per_km_rate)
            .maybe_estimated_distance_km(self.estimated_distance_km)
            .maybe_active(self.active)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(rule)
    }
}

#[derive(Debug)]
pub struct DeleteRule {
    pub id: PricingRuleId,
}

impl DeleteRule {
    #[tracing::instrument(skip(app), name = "services.pricing.delete_rule")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        if !PricingRule::delete(&mut conn, self.id).await? {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        conn.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ListRules;

impl ListRules {
    #[tracing::instrument(skip_all, name = "services.pricing.list_rules")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Vec<PricingRule>, ApiError> {
        let mut conn = app.db_read().await?;
        let rules = PricingRule::list(&mut conn).await?;
        Ok(rules)
    }
}

#[derive(Debug)]
pub struct CreateSurge<'a> {
    pub route_key: &'a str,
    pub multiplier: f64,
    pub reason: SurgeReason,
    pub description: Option<&'a str>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub recurring: bool,
    pub recurring_days: Vec<i32>,
    pub recurring_start_hour: Option<i32>,
    pub recurring_end_hour: Option<i32>,
}

impl CreateSurge<'_> {
    #[tracing::instrument(skip(self, app, admin), name = "services.pricing.create_surge")]
    pub async fn perform(self, app: &App, admin: &SessionAdmin) -> Result<SurgeMultiplier, ApiError> {
        if self.route_key.is_empty() {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Route key must not be empty."));
        }

        if !MULTIPLIER_RANGE.contains(&self.multiplier) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Multiplier must be between 1.0 and 5.0."));
        }

        if self.ends_at <= self.starts_at {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("The surge window must end after it starts."));
        }

        if self.recurring_days.iter().any(|day| !(0..=6).contains(day)) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Recurring days must be 0 (Monday) through 6 (Sunday)."));
        }

        let mut conn = app.db_write().await?;
        let surge = InsertSurge::builder()
            .route_key(self.route_key)
            .multiplier(self.multiplier)
            .reason(self.reason)
            .maybe_description(self.description)
            .starts_at(self.starts_at)
            .ends_at(self.ends_at)
            .recurring(self.recurring)
            .recurring_days(self.recurring_days)
            .maybe_recurring_start_hour(self.recurring_start_hour)
            .maybe_recurring_end_hour(self.recurring_end_hour)
            .created_by(admin.id)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(surge)
    }
}

#[derive(Debug)]
pub struct UpdateSurge<'a> {
    pub id: SurgeId,
    pub multiplier: Option<f64>,
    pub reason: Option<SurgeReason>,
    pub description: Option<&'a str>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub active: Option<bool>,
}

impl UpdateSurge<'_> {
    #[tracing::instrument(skip(self, app), name = "services.pricing.update_surge")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<SurgeMultiplier, ApiError> {
        if let Some(multiplier) = self.multiplier {
            if !MULTIPLIER_RANGE.contains(&multiplier) {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Multiplier must be between 1.0 and 5.0."));
            }
        }

        let mut conn = app.db_write().await?;
        if SurgeMultiplier::find(&mut conn, self.id).await?.is_none() {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        let surge = UpdateSurgeChangeset::builder()
            .id(self.id)
            .maybe_multiplier(self.multiplier)
            .maybe_reason(self.reason)
            .maybe_description(self.description)
            .maybe_starts_at(self.starts_at)
            .maybe_ends_at(self.ends_at)
            .maybe_active(self.active)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(surge)
    }
}

#[derive(Debug)]
pub struct DeactivateSurge {
    pub id: SurgeId,
}

impl DeactivateSurge {
    #[tracing::instrument(skip(app), name = "services.pricing.deactivate_surge")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<SurgeMultiplier, ApiError> {
        let mut conn = app.db_write().await?;
        let Some(surge) = SurgeMultiplier::deactivate(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        conn.commit().await?;
        Ok(surge)
    }
}

#[derive(Debug)]
pub struct DeleteSurge {
    pub id: SurgeId,
}

impl DeleteSurge {
    #[tracing::instrument(skip(app), name = "services.pricing.delete_surge")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        if !SurgeMultiplier::delete(&mut conn, self.id).await? {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        conn.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ListSurges {
    pub active_only: bool,
}

impl ListSurges {
    #[tracing::instrument(skip(app), name = "services.pricing.list_surges")]
    pub async fn perform(
        self,
        app: &App,
        _admin: &SessionAdmin,
    ) -> Result<Vec<SurgeMultiplier>, ApiError> {
        let mut conn = app.db_read().await?;
        let surges = SurgeMultiplier::list(&mut conn, self.active_only).await?;
        Ok(surges)
    }
}

#[derive(Debug)]
pub struct DemandStatsResult {
    pub total_bookings: i64,
    pub avg_daily_bookings: f64,
    pub bookings_by_day: Vec<(String, i64)>,
    pub suggested_surge: f64,
}

/// Booking demand for a route over a trailing window, with a naive
/// surge suggestion.
#[derive(Debug)]
pub struct GetDemandStats<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub days: i64,
}

impl GetDemandStats<'_> {
    #[tracing::instrument(skip(self, app), name = "services.pricing.demand")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<DemandStatsResult, ApiError> {
        if !(1..=90).contains(&self.days) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Days must be between 1 and 90."));
        }

        let since = Utc::now().naive_utc() - Duration::days(self.days);
        let mut conn = app.db_read().await?;
        let (total, by_day) =
            analytics::route_demand(&mut conn, self.origin, self.destination, since).await?;

        let avg_daily = total as f64 / self.days as f64;
        Ok(DemandStatsResult {
            total_bookings: total,
            avg_daily_bookings: (avg_daily * 10.0).round() / 10.0,
            bookings_by_day: by_day,
            suggested_surge: if avg_daily > 10.0 { 1.3 } else { 1.0 },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use chrono::NaiveDate;

    fn off_peak() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn quotes_fall_back_to_default_pricing(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let quote = QuoteRoute {
            origin: "Addis Ababa",
            destination: "Gondar",
            at: Some(off_peak()),
        }
        .perform(&app)
        .await
        .unwrap();

        // 50 + 3 * 100, no surge at noon
        assert_eq!(quote.base_price, 350.0);
        assert_eq!(quote.final_price, 350.0);
        assert!(!quote.surge_active);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn quotes_apply_the_highest_surge(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "px-admin").await;

        CreateRule {
            origin: "Addis Ababa",
            destination: "Bahir Dar",
            base_fare: 100.0,
            per_km_rate: 5.0,
            estimated_distance_km: 500.0,
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        let at = off_peak();
        CreateSurge {
            route_key: "Addis Ababa-Bahir Dar",
            multiplier: 1.5,
            reason: SurgeReason::HighDemand,
            description: None,
            starts_at: at - Duration::hours(1),
            ends_at: at + Duration::hours(1),
            recurring: false,
            recurring_days: vec![],
            recurring_start_hour: None,
            recurring_end_hour: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        let quote = QuoteRoute {
            origin: "Addis Ababa",
            destination: "Bahir Dar",
            at: Some(at),
        }
        .perform(&app)
        .await
        .unwrap();

        assert_eq!(quote.base_price, 2600.0);
        assert_eq!(quote.surge_multiplier, 1.5);
        assert_eq!(quote.final_price, 3900.0);
        assert_eq!(quote.surge_reason.as_deref(), Some("high_demand"));
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn peak_hours_beat_weaker_surges(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let peak = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let quote = QuoteRoute {
            origin: "Addis Ababa",
            destination: "Adama (Nazret)",
            at: Some(peak),
        }
        .perform(&app)
        .await
        .unwrap();

        assert_eq!(quote.surge_multiplier, 1.2);
        assert_eq!(quote.surge_reason.as_deref(), Some("peak_hours"));
        assert_eq!(quote.final_price, 420.0);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn suggestion_splits_the_whole_car_price(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let suggestion = SuggestTripPricing {
            origin: "Addis Ababa",
            destination: "Gondar",
        }
        .perform(&app)
        .await
        .unwrap();

        assert_eq!(suggestion.whole_car_price, suggestion.price_per_seat * 4.0);
    }
}
