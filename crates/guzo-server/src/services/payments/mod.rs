use chrono::{Duration, NaiveDateTime, Utc};
use guzo_api_types::payment::PaymentMethod;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::{BookingId, PaymentId};
use guzo_model::payment::{Earnings, InsertPayment};
use guzo_model::{Booking, Payment};

use crate::extract::{SessionAdmin, SessionUser};
use crate::App;

/// Records a payment against a booking.
#[derive(Debug)]
pub struct RecordPayment<'a> {
    pub booking_id: BookingId,
    pub amount: f64,
    pub method: PaymentMethod,
    pub notes: Option<&'a str>,
}

impl RecordPayment<'_> {
    #[tracing::instrument(skip(self, app, session_user), name = "services.payments.record")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Payment, ApiError> {
        if self.amount <= 0.0 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Amount must be positive."));
        }

        let mut conn = app.db_write().await?;
        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let participant = booking.customer_id == Some(session_user.id)
            || booking.assigned_driver_id == Some(session_user.id);
        if !participant && !session_user.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        let payment = InsertPayment::builder()
            .booking_id(self.booking_id)
            .maybe_customer_id(booking.customer_id)
            .amount(self.amount)
            .method(self.method)
            .maybe_notes(self.notes)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(payment)
    }
}

#[derive(Debug)]
pub struct CompletePayment<'a> {
    pub id: PaymentId,
    pub transaction_ref: Option<&'a str>,
}

impl CompletePayment<'_> {
    #[tracing::instrument(skip(self, app), name = "services.payments.complete")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Payment, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(payment) = Payment::complete(&mut conn, self.id, self.transaction_ref).await?
        else {
            let exists = Payment::find(&mut conn, self.id).await?.is_some();
            return Err(if exists {
                ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Payment is already settled.")
            } else {
                ApiError::new(ApiErrorCategory::NotFound)
            });
        };

        conn.commit().await?;
        Ok(payment)
    }
}

#[derive(Debug)]
pub struct FailPayment<'a> {
    pub id: PaymentId,
    pub reason: Option<&'a str>,
}

impl FailPayment<'_> {
    #[tracing::instrument(skip(self, app), name = "services.payments.fail")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Payment, ApiError> {
        let mut conn = app.db_write().await?;

        let Some(payment) = Payment::fail(&mut conn, self.id, self.reason).await? else {
            let exists = Payment::find(&mut conn, self.id).await?.is_some();
            return Err(if exists {
                ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Payment is already settled.")
            } else {
                ApiError::new(ApiErrorCategory::NotFound)
            });
        };

        conn.commit().await?;
        Ok(payment)
    }
}

#[derive(Debug)]
pub struct ListBookingPayments {
    pub booking_id: BookingId,
}

impl ListBookingPayments {
    #[tracing::instrument(skip(app, session_user), name = "services.payments.list_by_booking")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<Payment>, ApiError> {
        let mut conn = app.db_read().await?;
        let Some(booking) = Booking::find(&mut conn, self.booking_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        let participant = booking.customer_id == Some(session_user.id)
            || booking.assigned_driver_id == Some(session_user.id);
        if !participant && !session_user.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        let payments = Payment::list_by_booking(&mut conn, self.booking_id).await?;
        Ok(payments)
    }
}

#[derive(Debug)]
pub struct ListMyPayments;

impl ListMyPayments {
    #[tracing::instrument(skip_all, name = "services.payments.list_mine")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<Payment>, ApiError> {
        let mut conn = app.db_read().await?;
        let payments = Payment::list_by_customer(&mut conn, session_user.id).await?;
        Ok(payments)
    }
}

/// Completed revenue between two instants, defaulting to the last
/// 30 days.
#[derive(Debug)]
pub struct GetEarnings {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl GetEarnings {
    #[tracing::instrument(skip(self, app), name = "services.payments.earnings")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Earnings, ApiError> {
        let end = self.end.unwrap_or_else(|| Utc::now().naive_utc());
        let start = self.start.unwrap_or(end - Duration::days(30));

        if start > end {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Range start must not be after its end."));
        }

        let mut conn = app.db_read().await?;
        let earnings = Payment::earnings(&mut conn, start, end).await?;
        Ok(earnings)
    }
}
