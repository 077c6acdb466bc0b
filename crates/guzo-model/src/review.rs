use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::user::UserRole;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Alias, Asterisk, Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{BookingId, ReviewId, UserId};
use crate::user::UserIdent;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub created: NaiveDateTime,

    pub booking_id: BookingId,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub reviewer_role: UserRole,

    pub rating: i32,
    pub comment: Option<String>,
}

/// A review joined with the reviewer's display name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewView {
    #[sqlx(flatten)]
    pub review: Review,
    pub reviewer_name: Option<String>,
}

#[derive(Debug, Clone, Iden)]
pub enum ReviewIdent {
    Reviews,
    Id,
    Created,
    BookingId,
    ReviewerId,
    RevieweeId,
    ReviewerRole,
    Rating,
    Comment,
}

impl Review {
    #[tracing::instrument(skip_all, name = "db.reviews.find_by_booking_and_reviewer")]
    pub async fn find_by_booking_and_reviewer(
        conn: &mut PgConnection,
        booking_id: BookingId,
        reviewer_id: UserId,
    ) -> Result<Option<Review>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(ReviewIdent::Reviews)
            .and_where(Expr::col(ReviewIdent::BookingId).eq(booking_id.0))
            .and_where(Expr::col(ReviewIdent::ReviewerId).eq(reviewer_id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Review, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find review of a booking participant")
    }

    /// Reviews received by a user, newest first, with reviewer names.
    #[tracing::instrument(skip_all, name = "db.reviews.list_for_user")]
    pub async fn list_for_user(
        conn: &mut PgConnection,
        reviewee_id: UserId,
        limit: u64,
    ) -> Result<Vec<ReviewView>> {
        let (sql, values) = Query::select()
            .column((ReviewIdent::Reviews, Asterisk))
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::FullName)),
                Alias::new("reviewer_name"),
            )
            .from(ReviewIdent::Reviews)
            .left_join(
                UserIdent::Users,
                Expr::col((UserIdent::Users, UserIdent::Id))
                    .equals((ReviewIdent::Reviews, ReviewIdent::ReviewerId)),
            )
            .and_where(Expr::col((ReviewIdent::Reviews, ReviewIdent::RevieweeId)).eq(reviewee_id.0))
            .order_by((ReviewIdent::Reviews, ReviewIdent::Created), Order::Desc)
            .limit(limit)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, ReviewView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list reviews of a user")
    }

    /// Average rating and review count for a user, computed by the
    /// database.
    #[tracing::instrument(skip_all, name = "db.reviews.rating_summary")]
    pub async fn rating_summary(
        conn: &mut PgConnection,
        reviewee_id: UserId,
    ) -> Result<(f64, i64)> {
        let (sql, values) = Query::select()
            // AVG over an integer column comes back as NUMERIC
            .expr(Expr::cust("COALESCE(AVG(rating), 5.0)::float8"))
            .expr(Expr::cust("COUNT(*)"))
            .from(ReviewIdent::Reviews)
            .and_where(Expr::col(ReviewIdent::RevieweeId).eq(reviewee_id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, (f64, i64), _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
            .attach_printable("could not summarize ratings of a user")
    }
}

#[derive(Debug, Error)]
#[error("Could not insert review")]
pub struct InsertReviewError;

#[derive(Builder)]
pub struct InsertReview<'a> {
    #[builder(into)]
    pub booking_id: BookingId,
    #[builder(into)]
    pub reviewer_id: UserId,
    #[builder(into)]
    pub reviewee_id: UserId,
    pub reviewer_role: UserRole,
    pub rating: i32,
    pub comment: Option<&'a str>,
}

impl InsertReview<'_> {
    #[tracing::instrument(skip_all, name = "db.reviews.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<Review, InsertReviewError> {
        let (sql, values) = Query::insert()
            .into_table(ReviewIdent::Reviews)
            .columns([
                ReviewIdent::BookingId,
                ReviewIdent::ReviewerId,
                ReviewIdent::RevieweeId,
                ReviewIdent::ReviewerRole,
                ReviewIdent::Rating,
                ReviewIdent::Comment,
            ])
            .values_panic([
                self.booking_id.0.into(),
                self.reviewer_id.0.into(),
                self.reviewee_id.0.into(),
                self.reviewer_role.as_ref().into(),
                self.rating.into(),
                self.comment.into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Review, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertReviewError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::test_fixtures::make_charter_request;
    use crate::user::test_fixtures::make_user;
    use crate::User;

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn summarizes_ratings(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-reviews", UserRole::Rider).await;
        let other = make_user(&mut conn, "rider-reviews-2", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-reviews", UserRole::Driver).await;

        // fresh drivers fall back to the default rating
        let (rating, total) = Review::rating_summary(&mut conn, driver.id).await.unwrap();
        assert_eq!(rating, 5.0);
        assert_eq!(total, 0);

        let first = make_charter_request(&mut conn, rider.id).await;
        let second = make_charter_request(&mut conn, other.id).await;

        for (booking, reviewer, rating) in [(first, &rider, 5), (second, &other, 2)] {
            InsertReview::builder()
                .booking_id(booking.id)
                .reviewer_id(reviewer.id)
                .reviewee_id(driver.id)
                .reviewer_role(UserRole::Rider)
                .rating(rating)
                .build()
                .insert(&mut conn)
                .await
                .unwrap();
        }

        let (rating, total) = Review::rating_summary(&mut conn, driver.id).await.unwrap();
        assert_eq!(rating, 3.5);
        assert_eq!(total, 2);

        User::update_rating(&mut conn, driver.id, rating, total)
            .await
            .unwrap();
        let driver = User::find(&mut conn, driver.id).await.unwrap().unwrap();
        assert_eq!(driver.rating, 3.5);
        assert_eq!(driver.total_ratings, 2);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn one_review_per_reviewer_per_booking(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-dup", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-dup", UserRole::Driver).await;
        let booking = make_charter_request(&mut conn, rider.id).await;

        let insert = || {
            InsertReview::builder()
                .booking_id(booking.id)
                .reviewer_id(rider.id)
                .reviewee_id(driver.id)
                .reviewer_role(UserRole::Rider)
                .rating(4)
                .build()
        };

        insert().insert(&mut conn).await.unwrap();
        assert!(insert().insert(&mut conn).await.is_err());

        let existing = Review::find_by_booking_and_reviewer(&mut conn, booking.id, rider.id)
            .await
            .unwrap();
        assert!(existing.is_some());
    }
}
