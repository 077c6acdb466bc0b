use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::pricing::{
    CreatePricingRule, CreateSurge, DayCount, DemandRoute, DemandStats, ListSurges, QuoteRoute,
    UpdatePricingRule, UpdateSurge,
};
use guzo_error::ApiError;
use guzo_model::id::{PricingRuleId, SurgeId};

use super::morphers;
use crate::extract::{Json, SessionAdmin};
use crate::{services, App};

pub async fn quote(app: App, Query(query): Query<QuoteRoute>) -> Result<Response, ApiError> {
    let quote = services::pricing::QuoteRoute {
        origin: &query.origin,
        destination: &query.destination,
        at: None,
    }
    .perform(&app)
    .await?;

    Ok(Json(quote).into_response())
}

pub async fn list_rules(app: App, admin: SessionAdmin) -> Result<Response, ApiError> {
    let rules = services::pricing::ListRules.perform(&app, &admin).await?;
    let rules = rules.iter().map(morphers::pricing_rule).collect::<Vec<_>>();
    Ok(Json(rules).into_response())
}

pub async fn create_rule(
    app: App,
    admin: SessionAdmin,
    Json(form): Json<CreatePricingRule>,
) -> Result<Response, ApiError> {
    let rule = services::pricing::CreateRule {
        origin: &form.origin,
        destination: &form.destination,
        base_fare: form.base_fare,
        per_km_rate: form.per_km_rate,
        estimated_distance_km: form.estimated_distance_km,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::pricing_rule(&rule)).into_response())
}

pub async fn update_rule(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<UpdatePricingRule>,
) -> Result<Response, ApiError> {
    let rule = services::pricing::UpdateRule {
        id: PricingRuleId(id),
        base_fare: form.base_fare,
        per_km_rate: form.per_km_rate,
        estimated_distance_km: form.estimated_distance_km,
        active: form.active,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::pricing_rule(&rule)).into_response())
}

pub async fn delete_rule(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::pricing::DeleteRule {
        id: PricingRuleId(id),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

pub async fn list_surges(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<ListSurges>,
) -> Result<Response, ApiError> {
    let surges = services::pricing::ListSurges {
        active_only: query.active_only,
    }
    .perform(&app, &admin)
    .await?;

    let surges = surges.iter().map(morphers::surge).collect::<Vec<_>>();
    Ok(Json(surges).into_response())
}

pub async fn create_surge(
    app: App,
    admin: SessionAdmin,
    Json(form): Json<CreateSurge>,
) -> Result<Response, ApiError> {
    let surge = services::pricing::CreateSurge {
        route_key: &form.route_key,
        multiplier: form.multiplier,
        reason: form.reason,
        description: form.description.as_deref(),
        starts_at: form.starts_at.into(),
        ends_at: form.ends_at.into(),
        recurring: form.recurring,
        recurring_days: form.recurring_days,
        recurring_start_hour: form.recurring_start_hour,
        recurring_end_hour: form.recurring_end_hour,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::surge(&surge)).into_response())
}

pub async fn update_surge(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<UpdateSurge>,
) -> Result<Response, ApiError> {
    let surge = services::pricing::UpdateSurge {
        id: SurgeId(id),
        multiplier: form.multiplier,
        reason: form.reason,
        description: form.description.as_deref(),
        starts_at: form.starts_at.map(Into::into),
        ends_at: form.ends_at.map(Into::into),
        active: form.active,
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::surge(&surge)).into_response())
}

pub async fn deactivate_surge(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let surge = services::pricing::DeactivateSurge { id: SurgeId(id) }
        .perform(&app, &admin)
        .await?;

    Ok(Json(morphers::surge(&surge)).into_response())
}

pub async fn delete_surge(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::pricing::DeleteSurge { id: SurgeId(id) }
        .perform(&app, &admin)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

pub async fn demand(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<DemandRoute>,
) -> Result<Response, ApiError> {
    let stats = services::pricing::GetDemandStats {
        origin: &query.origin,
        destination: &query.destination,
        days: query.days,
    }
    .perform(&app, &admin)
    .await?;

    let response = DemandStats {
        total_bookings: stats.total_bookings,
        avg_daily_bookings: stats.avg_daily_bookings,
        bookings_by_day: stats
            .bookings_by_day
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect(),
        suggested_surge: stats.suggested_surge,
    };

    Ok(Json(response).into_response())
}
