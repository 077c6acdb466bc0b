use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::vehicles::{RegisterVehicle, UpdateVehicle};
use guzo_error::ApiError;
use guzo_model::id::VehicleId;

use super::morphers;
use crate::extract::{Json, SessionAdmin, SessionDriver};
use crate::{services, App};

pub async fn register(
    app: App,
    driver: SessionDriver,
    Json(form): Json<RegisterVehicle>,
) -> Result<Response, ApiError> {
    let request = services::vehicles::RegisterVehicle {
        plate_number: &form.plate_number,
        make: &form.make,
        model: &form.model,
        year: form.year,
        color: form.color.as_deref(),
        vehicle_type: form.vehicle_type,
        capacity: form.capacity,
    };

    let vehicle = request.perform(&app, &driver).await?;
    Ok(Json(morphers::vehicle(&vehicle)).into_response())
}

pub async fn update(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
    Json(form): Json<UpdateVehicle>,
) -> Result<Response, ApiError> {
    let request = services::vehicles::UpdateVehicle {
        id: VehicleId(id),
        plate_number: form.plate_number.as_deref(),
        make: form.make.as_deref(),
        model: form.model.as_deref(),
        year: form.year,
        color: form.color.as_deref(),
        vehicle_type: form.vehicle_type,
        capacity: form.capacity,
        active: form.active,
    };

    let vehicle = request.perform(&app, &driver).await?;
    Ok(Json(morphers::vehicle(&vehicle)).into_response())
}

pub async fn delete(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::vehicles::DeleteVehicle { id: VehicleId(id) }
        .perform(&app, &driver)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

pub async fn list_mine(app: App, driver: SessionDriver) -> Result<Response, ApiError> {
    let vehicles = services::vehicles::ListMyVehicles
        .perform(&app, &driver)
        .await?;

    let vehicles = vehicles.iter().map(morphers::vehicle).collect::<Vec<_>>();
    Ok(Json(vehicles).into_response())
}

pub async fn verify(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let vehicle = services::vehicles::VerifyVehicle { id: VehicleId(id) }
        .perform(&app, &admin)
        .await?;

    Ok(Json(morphers::vehicle(&vehicle)).into_response())
}
