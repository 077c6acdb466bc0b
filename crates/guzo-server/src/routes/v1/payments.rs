use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::payments::{
    CompletePayment, EarningsRange, EarningsReport, FailPayment, MethodEarnings, RecordPayment,
};
use guzo_error::ApiError;
use guzo_model::id::{BookingId, PaymentId};

use super::morphers;
use crate::extract::{Json, SessionAdmin, SessionUser};
use crate::{services, App};

pub async fn record(
    app: App,
    session_user: SessionUser,
    Json(form): Json<RecordPayment>,
) -> Result<Response, ApiError> {
    let request = services::payments::RecordPayment {
        booking_id: BookingId(form.booking_id),
        amount: form.amount,
        method: form.method,
        notes: form.notes.as_deref(),
    };

    let payment = request.perform(&app, &session_user).await?;
    Ok(Json(morphers::payment(&payment)).into_response())
}

pub async fn complete(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<CompletePayment>,
) -> Result<Response, ApiError> {
    let payment = services::payments::CompletePayment {
        id: PaymentId(id),
        transaction_ref: form.transaction_ref.as_deref(),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::payment(&payment)).into_response())
}

pub async fn fail(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<FailPayment>,
) -> Result<Response, ApiError> {
    let payment = services::payments::FailPayment {
        id: PaymentId(id),
        reason: form.reason.as_deref(),
    }
    .perform(&app, &admin)
    .await?;

    Ok(Json(morphers::payment(&payment)).into_response())
}

pub async fn list_for_booking(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let payments = services::payments::ListBookingPayments {
        booking_id: BookingId(id),
    }
    .perform(&app, &session_user)
    .await?;

    let payments = payments.iter().map(morphers::payment).collect::<Vec<_>>();
    Ok(Json(payments).into_response())
}

pub async fn list_mine(app: App, session_user: SessionUser) -> Result<Response, ApiError> {
    let payments = services::payments::ListMyPayments
        .perform(&app, &session_user)
        .await?;

    let payments = payments.iter().map(morphers::payment).collect::<Vec<_>>();
    Ok(Json(payments).into_response())
}

pub async fn earnings(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<EarningsRange>,
) -> Result<Response, ApiError> {
    let earnings = services::payments::GetEarnings {
        start: query.start.map(Into::into),
        end: query.end.map(Into::into),
    }
    .perform(&app, &admin)
    .await?;

    let response = EarningsReport {
        total: earnings.total,
        count: earnings.count,
        by_method: earnings
            .by_method
            .into_iter()
            .map(|(method, total)| MethodEarnings { method, total })
            .collect(),
    };

    Ok(Json(response).into_response())
}
