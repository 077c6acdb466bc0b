use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::favorites::{AddFavoriteDriver, AddFavoriteRoute};
use guzo_error::ApiError;
use guzo_model::id::{FavoriteDriverId, FavoriteRouteId, UserId};

use super::morphers;
use crate::extract::{Json, SessionUser};
use crate::{services, App};

pub async fn list_routes(app: App, session_user: SessionUser) -> Result<Response, ApiError> {
    let routes = services::favorites::ListFavoriteRoutes
        .perform(&app, &session_user)
        .await?;

    let routes = routes.iter().map(morphers::favorite_route).collect::<Vec<_>>();
    Ok(Json(routes).into_response())
}

pub async fn add_route(
    app: App,
    session_user: SessionUser,
    Json(form): Json<AddFavoriteRoute>,
) -> Result<Response, ApiError> {
    let route = services::favorites::AddFavoriteRoute {
        origin: &form.origin,
        destination: &form.destination,
    }
    .perform(&app, &session_user)
    .await?;

    Ok(Json(morphers::favorite_route(&route)).into_response())
}

pub async fn remove_route(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::favorites::RemoveFavoriteRoute {
        id: FavoriteRouteId(id),
    }
    .perform(&app, &session_user)
    .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

pub async fn list_drivers(app: App, session_user: SessionUser) -> Result<Response, ApiError> {
    let drivers = services::favorites::ListFavoriteDrivers
        .perform(&app, &session_user)
        .await?;

    let drivers = drivers.iter().map(morphers::favorite_driver).collect::<Vec<_>>();
    Ok(Json(drivers).into_response())
}

pub async fn add_driver(
    app: App,
    session_user: SessionUser,
    Json(form): Json<AddFavoriteDriver>,
) -> Result<Response, ApiError> {
    let favorite = services::favorites::AddFavoriteDriver {
        driver_id: UserId(form.driver_id),
        note: form.note.as_deref(),
    }
    .perform(&app, &session_user)
    .await?;

    // re-fetch with driver info for a consistent response shape
    let drivers = services::favorites::ListFavoriteDrivers
        .perform(&app, &session_user)
        .await?;
    let view = drivers
        .iter()
        .find(|view| view.favorite.id == favorite.id)
        .map(morphers::favorite_driver);

    match view {
        Some(view) => Ok(Json(view).into_response()),
        None => Err(ApiError::new(guzo_error::ApiErrorCategory::NotFound)),
    }
}

pub async fn remove_driver(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::favorites::RemoveFavoriteDriver {
        id: FavoriteDriverId(id),
    }
    .perform(&app, &session_user)
    .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}
