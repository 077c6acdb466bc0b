use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::reviews::{PendingReview, SubmitReview};
use guzo_error::ApiError;
use guzo_model::id::{BookingId, UserId};

use super::morphers;
use crate::extract::{Json, SessionUser};
use crate::{services, App};

pub async fn submit(
    app: App,
    session_user: SessionUser,
    Json(form): Json<SubmitReview>,
) -> Result<Response, ApiError> {
    let review = services::reviews::SubmitReview {
        booking_id: BookingId(form.booking_id),
        reviewee_id: UserId(form.reviewee_id),
        rating: form.rating,
        comment: form.comment.as_deref(),
    }
    .perform(&app, &session_user)
    .await?;

    Ok(Json(morphers::review(&review)).into_response())
}

pub async fn list_for_user(app: App, Path(id): Path<i64>) -> Result<Response, ApiError> {
    let reviews = services::reviews::ListUserReviews {
        user_id: UserId(id),
        limit: None,
    }
    .perform(&app)
    .await?;

    let reviews = reviews.iter().map(morphers::review_view).collect::<Vec<_>>();
    Ok(Json(reviews).into_response())
}

pub async fn pending(app: App, session_user: SessionUser) -> Result<Response, ApiError> {
    let pending = services::reviews::ListPendingReviews
        .perform(&app, &session_user)
        .await?;

    let pending = pending
        .iter()
        .map(|(booking, reviewee)| PendingReview {
            booking: morphers::booking(booking),
            reviewee: morphers::user_profile(reviewee),
        })
        .collect::<Vec<_>>();

    Ok(Json(pending).into_response())
}
