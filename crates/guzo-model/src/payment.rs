use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::payment::{PaymentMethod, PaymentStatus};
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Asterisk, Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use std::str::FromStr;
use thiserror::Error;

use crate::id::{BookingId, PaymentId, UserId};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub booking_id: BookingId,
    pub customer_id: Option<UserId>,

    pub amount: f64,
    pub currency: String,

    pub method: PaymentMethod,
    pub status: PaymentStatus,

    pub transaction_id: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,

    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Iden)]
pub enum PaymentIdent {
    Payments,
    Id,
    Created,
    Updated,
    BookingId,
    CustomerId,
    Amount,
    Currency,
    Method,
    Status,
    TransactionId,
    TransactionRef,
    Notes,
    CompletedAt,
}

/// Aggregated revenue between two instants.
#[derive(Debug, Clone, PartialEq)]
pub struct Earnings {
    pub total: f64,
    pub count: i64,
    pub by_method: Vec<(PaymentMethod, f64)>,
}

impl Payment {
    #[tracing::instrument(skip_all, name = "db.payments.find")]
    pub async fn find(conn: &mut PgConnection, id: PaymentId) -> Result<Option<Payment>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PaymentIdent::Payments)
            .and_where(Expr::col(PaymentIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find payment by id")
    }

    #[tracing::instrument(skip_all, name = "db.payments.list_by_booking")]
    pub async fn list_by_booking(
        conn: &mut PgConnection,
        booking_id: BookingId,
    ) -> Result<Vec<Payment>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PaymentIdent::Payments)
            .and_where(Expr::col(PaymentIdent::BookingId).eq(booking_id.0))
            .order_by(PaymentIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list payments of a booking")
    }

    #[tracing::instrument(skip_all, name = "db.payments.list_by_customer")]
    pub async fn list_by_customer(
        conn: &mut PgConnection,
        customer_id: UserId,
    ) -> Result<Vec<Payment>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(PaymentIdent::Payments)
            .and_where(Expr::col(PaymentIdent::CustomerId).eq(customer_id.0))
            .order_by(PaymentIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list payments of a customer")
    }

    /// Marks a pending/processing payment completed. Guarded so a
    /// replayed completion cannot restamp the time.
    #[tracing::instrument(skip_all, name = "db.payments.complete")]
    pub async fn complete(
        conn: &mut PgConnection,
        id: PaymentId,
        transaction_ref: Option<&str>,
    ) -> Result<Option<Payment>> {
        let mut query = Query::update();
        query
            .table(PaymentIdent::Payments)
            .value(PaymentIdent::Status, PaymentStatus::Completed.as_ref())
            .value(PaymentIdent::CompletedAt, Expr::current_timestamp())
            .value(PaymentIdent::Updated, Expr::current_timestamp());

        if let Some(transaction_ref) = transaction_ref {
            query.value(PaymentIdent::TransactionRef, transaction_ref);
        }

        let (sql, values) = query
            .and_where(Expr::col(PaymentIdent::Id).eq(id.0))
            .and_where(Expr::col(PaymentIdent::Status).is_in([
                PaymentStatus::Pending.as_ref(),
                PaymentStatus::Processing.as_ref(),
            ]))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not complete payment")
    }

    #[tracing::instrument(skip_all, name = "db.payments.fail")]
    pub async fn fail(
        conn: &mut PgConnection,
        id: PaymentId,
        reason: Option<&str>,
    ) -> Result<Option<Payment>> {
        let mut query = Query::update();
        query
            .table(PaymentIdent::Payments)
            .value(PaymentIdent::Status, PaymentStatus::Failed.as_ref())
            .value(PaymentIdent::Updated, Expr::current_timestamp());

        if let Some(reason) = reason {
            query.value(PaymentIdent::Notes, reason);
        }

        let (sql, values) = query
            .and_where(Expr::col(PaymentIdent::Id).eq(id.0))
            .and_where(Expr::col(PaymentIdent::Status).is_in([
                PaymentStatus::Pending.as_ref(),
                PaymentStatus::Processing.as_ref(),
            ]))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not fail payment")
    }

    /// Revenue from completed payments in `[start, end]`, totalled
    /// and broken down by payment method inside Postgres.
    #[tracing::instrument(skip_all, name = "db.payments.earnings")]
    pub async fn earnings(
        conn: &mut PgConnection,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Earnings> {
        let (sql, values) = Query::select()
            .column(PaymentIdent::Method)
            .expr(Expr::cust("COALESCE(SUM(amount), 0)"))
            .expr(Expr::cust("COUNT(*)"))
            .from(PaymentIdent::Payments)
            .and_where(Expr::col(PaymentIdent::Status).eq(PaymentStatus::Completed.as_ref()))
            .and_where(Expr::col(PaymentIdent::Created).gte(start))
            .and_where(Expr::col(PaymentIdent::Created).lte(end))
            .group_by_col(PaymentIdent::Method)
            .build_sqlx(PostgresQueryBuilder);

        let rows = sqlx::query_as_with::<_, (String, f64, i64), _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not aggregate earnings")?;

        let mut earnings = Earnings {
            total: 0.0,
            count: 0,
            by_method: Vec::with_capacity(rows.len()),
        };

        for (method, total, count) in rows {
            earnings.total += total;
            earnings.count += count;
            if let Ok(method) = PaymentMethod::from_str(&method) {
                earnings.by_method.push((method, total));
            }
        }

        Ok(earnings)
    }
}

#[derive(Debug, Error)]
#[error("Could not insert payment")]
pub struct InsertPaymentError;

#[derive(Builder)]
pub struct InsertPayment<'a> {
    #[builder(into)]
    pub booking_id: BookingId,
    pub customer_id: Option<UserId>,
    pub amount: f64,
    #[builder(default = PaymentMethod::Cash)]
    pub method: PaymentMethod,
    pub notes: Option<&'a str>,
}

impl InsertPayment<'_> {
    #[tracing::instrument(skip_all, name = "db.payments.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<Payment, InsertPaymentError> {
        let (sql, values) = Query::insert()
            .into_table(PaymentIdent::Payments)
            .columns([
                PaymentIdent::BookingId,
                PaymentIdent::CustomerId,
                PaymentIdent::Amount,
                PaymentIdent::Method,
                PaymentIdent::Notes,
            ])
            .values_panic([
                self.booking_id.0.into(),
                self.customer_id.map(|v| v.0).into(),
                self.amount.into(),
                self.method.as_ref().into(),
                self.notes.into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Payment, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertPaymentError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::test_fixtures::make_charter_request;
    use crate::user::test_fixtures::make_user;
    use chrono::{Duration, Utc};
    use guzo_api_types::user::UserRole;

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn complete_is_idempotent(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-pay", UserRole::Rider).await;
        let booking = make_charter_request(&mut conn, customer.id).await;

        let payment = InsertPayment::builder()
            .booking_id(booking.id)
            .customer_id(customer.id)
            .amount(1600.0)
            .method(PaymentMethod::Telebirr)
            .build()
            .insert(&mut conn)
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.currency, "ETB");

        let completed = Payment::complete(&mut conn, payment.id, Some("TB-1234"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert_eq!(completed.transaction_ref.as_deref(), Some("TB-1234"));

        let replayed = Payment::complete(&mut conn, payment.id, Some("TB-9999"))
            .await
            .unwrap();
        assert!(replayed.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn earnings_break_down_by_method(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let customer = make_user(&mut conn, "rider-earnings", UserRole::Rider).await;
        let booking = make_charter_request(&mut conn, customer.id).await;

        for (amount, method) in [
            (1000.0, PaymentMethod::Cash),
            (500.0, PaymentMethod::Cash),
            (800.0, PaymentMethod::Telebirr),
        ] {
            let payment = InsertPayment::builder()
                .booking_id(booking.id)
                .amount(amount)
                .method(method)
                .build()
                .insert(&mut conn)
                .await
                .unwrap();
            Payment::complete(&mut conn, payment.id, None)
                .await
                .unwrap()
                .unwrap();
        }

        // a failed payment never counts
        let failed = InsertPayment::builder()
            .booking_id(booking.id)
            .amount(9999.0)
            .build()
            .insert(&mut conn)
            .await
            .unwrap();
        Payment::fail(&mut conn, failed.id, Some("declined"))
            .await
            .unwrap()
            .unwrap();

        let now = Utc::now().naive_utc();
        let earnings = Payment::earnings(&mut conn, now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(earnings.total, 2300.0);
        assert_eq!(earnings.count, 3);

        let cash = earnings
            .by_method
            .iter()
            .find(|(m, _)| *m == PaymentMethod::Cash)
            .unwrap();
        assert_eq!(cash.1, 1500.0);
    }
}
