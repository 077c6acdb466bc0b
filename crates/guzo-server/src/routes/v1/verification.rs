use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::verification::{
    ApproveVerification, ListVerifications, RejectVerification, SubmitVerification,
};
use guzo_api_types::verification::VerificationStats;
use guzo_error::ApiError;
use guzo_model::id::VerificationId;

use super::morphers;
use crate::extract::{Json, SessionAdmin, SessionDriver};
use crate::{services, App};

pub async fn mine(app: App, driver: SessionDriver) -> Result<Response, ApiError> {
    let verification = services::verification::GetMyVerification
        .perform(&app, &driver)
        .await?;

    match verification {
        Some(verification) => Ok(Json(morphers::verification(&verification)).into_response()),
        None => Err(ApiError::new(guzo_error::ApiErrorCategory::NotFound)
            .message("No verification submitted yet.")),
    }
}

pub async fn submit(
    app: App,
    driver: SessionDriver,
    Json(form): Json<SubmitVerification>,
) -> Result<Response, ApiError> {
    let verification = services::verification::SubmitVerification {
        license_number: form.license_number.as_deref(),
        license_expiry: form.license_expiry.map(Into::into),
        profile_photo: form.profile_photo.as_deref(),
        license_document: form.license_document.as_deref(),
        vehicle_registration: form.vehicle_registration.as_deref(),
    }
    .perform(&app, &driver)
    .await?;

    Ok(Json(morphers::verification(&verification)).into_response())
}

pub async fn list(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<ListVerifications>,
) -> Result<Response, ApiError> {
    let verifications = services::verification::ListVerifications {
        status: query.status,
    }
    .perform(&app, &admin)
    .await?;

    let verifications = verifications
        .iter()
        .map(morphers::verification_view)
        .collect::<Vec<_>>();
    Ok(Json(verifications).into_response())
}

pub async fn stats(app: App, admin: SessionAdmin) -> Result<Response, ApiError> {
    let counts = services::verification::GetVerificationStats
        .perform(&app, &admin)
        .await?;

    let response = VerificationStats {
        total_pending: counts.pending,
        total_under_review: counts.under_review,
        total_approved: counts.approved,
        total_rejected: counts.rejected,
    };

    Ok(Json(response).into_response())
}

pub async fn start_review(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let verification = services::verification::StartReview {
        id: VerificationId(id),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::verification(&verification)).into_response())
}

pub async fn approve(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<ApproveVerification>,
) -> Result<Response, ApiError> {
    let verification = services::verification::ApproveVerification {
        id: VerificationId(id),
        notes: form.notes.as_deref(),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::verification(&verification)).into_response())
}

pub async fn reject(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<RejectVerification>,
) -> Result<Response, ApiError> {
    let verification = services::verification::RejectVerification {
        id: VerificationId(id),
        reason: &form.reason,
        notes: form.notes.as_deref(),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::verification(&verification)).into_response())
}
