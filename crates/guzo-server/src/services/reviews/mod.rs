use guzo_api_types::booking::BookingStatus;
use guzo_api_types::error::category::SubmitReviewFailed;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::{BookingId, UserId};
use guzo_model::review::{InsertReview, ReviewView};
use guzo_model::{Booking, Review, User};

use crate::extract::SessionUser;
use crate::App;

const MAX_COMMENT_LEN: usize = 500;

/// Submits a review for a completed booking and recomputes the
/// reviewee's cached rating in the same transaction.
#[derive(Debug)]
pub struct SubmitReview<'a> {
    pub booking_id: BookingId,
    pub reviewee_id: UserId,
    pub rating: i32,
    pub comment: Option<&'a str>,
}

impl SubmitReview<'_> {
    #[tracing::instrument(skip(self, app, session_user), name = "services.reviews.submit")]
    pub async fn perform(self, app: &App, session_user: &SessionUser) -> Result<Review, ApiError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Rating must be between 1 and 5 stars."));
        }

        if self.comment.is_some_and(|comment| comment.len() > MAX_COMMENT_LEN) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Comment is too long."));
        }

        let mut conn = app.db_write().await?;

        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if booking.status != BookingStatus::Completed {
            return Err(ApiError::new(ApiErrorCategory::SubmitReviewFailed(
                SubmitReviewFailed::BookingNotCompleted,
            )));
        }

        let is_customer = booking.customer_id == Some(session_user.id);
        let is_driver = booking.assigned_driver_id == Some(session_user.id);
        if !is_customer && !is_driver {
            return Err(ApiError::new(ApiErrorCategory::SubmitReviewFailed(
                SubmitReviewFailed::NotAParticipant,
            )));
        }

        // the reviewee must be the other party of the booking
        let counterpart = if is_customer {
            booking.assigned_driver_id
        } else {
            booking.customer_id
        };
        if counterpart != Some(self.reviewee_id) {
            return Err(ApiError::new(ApiErrorCategory::SubmitReviewFailed(
                SubmitReviewFailed::NotAParticipant,
            )));
        }

        let existing =
            Review::find_by_booking_and_reviewer(&mut conn, self.booking_id, session_user.id)
                .await?;
        if existing.is_some() {
            return Err(ApiError::new(ApiErrorCategory::SubmitReviewFailed(
                SubmitReviewFailed::AlreadyReviewed,
            )));
        }

        let review = InsertReview::builder()
            .booking_id(self.booking_id)
            .reviewer_id(session_user.id)
            .reviewee_id(self.reviewee_id)
            .reviewer_role(session_user.role)
            .rating(self.rating)
            .maybe_comment(self.comment)
            .build()
            .insert(&mut conn)
            .await?;

        Booking::set_review(&mut conn, self.booking_id, session_user.role, review.id).await?;

        let (rating, total) = Review::rating_summary(&mut conn, self.reviewee_id).await?;
        User::update_rating(&mut conn, self.reviewee_id, rating, total).await?;

        conn.commit().await?;
        Ok(review)
    }
}

/// Reviews received by a user, with reviewer names.
#[derive(Debug)]
pub struct ListUserReviews {
    pub user_id: UserId,
    pub limit: Option<u64>,
}

impl ListUserReviews {
    const DEFAULT_LIMIT: u64 = 50;

    #[tracing::instrument(skip(app), name = "services.reviews.list_for_user")]
    pub async fn perform(self, app: &App) -> Result<Vec<ReviewView>, ApiError> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(100);

        let mut conn = app.db_read().await?;
        let reviews = Review::list_for_user(&mut conn, self.user_id, limit).await?;
        Ok(reviews)
    }
}

/// Completed bookings still waiting for the caller's review, paired
/// with the counterpart's profile.
#[derive(Debug)]
pub struct ListPendingReviews;

impl ListPendingReviews {
    #[tracing::instrument(skip_all, name = "services.reviews.list_pending")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<(Booking, User)>, ApiError> {
        let mut conn = app.db_read().await?;
        let bookings =
            Booking::list_awaiting_review(&mut conn, session_user.id, session_user.role).await?;

        let mut pending = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let counterpart_id = if session_user.is_driver() {
                booking.customer_id
            } else {
                booking.assigned_driver_id
            };

            let Some(counterpart_id) = counterpart_id else {
                continue;
            };

            if let Some(counterpart) = User::find(&mut conn, counterpart_id).await? {
                pending.push((booking, counterpart));
            }
        }

        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bookings::{CompleteBooking, MatchRequest};
    use crate::test_utils;

    async fn completed_booking(
        app: &App,
        rider: &crate::extract::SessionUser,
        driver: &crate::extract::SessionDriver,
        admin: &crate::extract::SessionAdmin,
    ) -> Booking {
        let request = test_utils::bookings::file_charter(app, rider).await;
        MatchRequest {
            booking_id: request.id,
            driver_id: driver.id,
            trip_id: None,
            price: Some(1500.0),
        }
        .perform(app, admin)
        .await
        .unwrap();

        CompleteBooking { id: request.id }
            .perform(app, driver)
            .await
            .unwrap()
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn review_updates_the_cached_rating(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "rv-admin").await;
        let driver = test_utils::users::driver_session(&app, "rv-driver").await;
        let rider = test_utils::users::rider_session(&app, "rv-rider").await;

        let booking = completed_booking(&app, &rider, &driver, &admin).await;

        SubmitReview {
            booking_id: booking.id,
            reviewee_id: driver.id,
            rating: 4,
            comment: Some("Great driver, very punctual!"),
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        let mut conn = app.db_read().await.unwrap();
        let driver_row = User::find(&mut conn, driver.id).await.unwrap().unwrap();
        assert_eq!(driver_row.rating, 4.0);
        assert_eq!(driver_row.total_ratings, 1);

        let booking_row = Booking::find(&mut conn, booking.id).await.unwrap().unwrap();
        assert!(booking_row.customer_review_id.is_some());
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn only_participants_of_completed_bookings_review(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "rv2-admin").await;
        let driver = test_utils::users::driver_session(&app, "rv2-driver").await;
        let rider = test_utils::users::rider_session(&app, "rv2-rider").await;
        let stranger = test_utils::users::rider_session(&app, "rv2-stranger").await;

        // not completed yet
        let open = test_utils::bookings::file_charter(&app, &rider).await;
        let error = SubmitReview {
            booking_id: open.id,
            reviewee_id: driver.id,
            rating: 5,
            comment: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap_err();
        assert_eq!(
            error.category,
            ApiErrorCategory::SubmitReviewFailed(SubmitReviewFailed::BookingNotCompleted)
        );

        let booking = completed_booking(&app, &rider, &driver, &admin).await;

        let error = SubmitReview {
            booking_id: booking.id,
            reviewee_id: driver.id,
            rating: 5,
            comment: None,
        }
        .perform(&app, &stranger)
        .await
        .unwrap_err();
        assert_eq!(
            error.category,
            ApiErrorCategory::SubmitReviewFailed(SubmitReviewFailed::NotAParticipant)
        );

        // double review
        SubmitReview {
            booking_id: booking.id,
            reviewee_id: driver.id,
            rating: 5,
            comment: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        let error = SubmitReview {
            booking_id: booking.id,
            reviewee_id: driver.id,
            rating: 1,
            comment: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap_err();
        assert_eq!(
            error.category,
            ApiErrorCategory::SubmitReviewFailed(SubmitReviewFailed::AlreadyReviewed)
        );
    }
}
