use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::verification::VerificationStatus;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, Iden, OnConflict, Order, PostgresQueryBuilder, Query,
};
use sea_query_binder::SqlxBinder;
use std::str::FromStr;
use thiserror::Error;

use crate::id::{UserId, VerificationId};
use crate::user::UserIdent;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DriverVerification {
    pub id: VerificationId,

    pub driver_id: UserId,

    pub profile_photo: Option<String>,
    pub license_document: Option<String>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDateTime>,
    pub vehicle_registration: Option<String>,

    pub status: VerificationStatus,

    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,

    pub submitted_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
    pub reviewed_by: Option<UserId>,
}

/// A verification joined with the driver's name and email for admin
/// review queues.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationView {
    #[sqlx(flatten)]
    pub verification: DriverVerification,
    pub driver_name: Option<String>,
    pub driver_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerificationCounts {
    pub pending: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Iden)]
pub enum VerificationIdent {
    DriverVerifications,
    Id,
    DriverId,
    ProfilePhoto,
    LicenseDocument,
    LicenseNumber,
    LicenseExpiry,
    VehicleRegistration,
    Status,
    AdminNotes,
    RejectionReason,
    SubmittedAt,
    ReviewedAt,
    ReviewedBy,
}

impl DriverVerification {
    #[tracing::instrument(skip_all, name = "db.verifications.find")]
    pub async fn find(
        conn: &mut PgConnection,
        id: VerificationId,
    ) -> Result<Option<DriverVerification>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(VerificationIdent::DriverVerifications)
            .and_where(Expr::col(VerificationIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverVerification, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find verification by id")
    }

    #[tracing::instrument(skip_all, name = "db.verifications.find_by_driver")]
    pub async fn find_by_driver(
        conn: &mut PgConnection,
        driver_id: UserId,
    ) -> Result<Option<DriverVerification>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(VerificationIdent::DriverVerifications)
            .and_where(Expr::col(VerificationIdent::DriverId).eq(driver_id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverVerification, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find verification of a driver")
    }

    /// Creates the driver's verification row if it does not exist
    /// yet, then returns it.
    #[tracing::instrument(skip_all, name = "db.verifications.get_or_create")]
    pub async fn get_or_create(
        conn: &mut PgConnection,
        driver_id: UserId,
    ) -> Result<DriverVerification> {
        let (sql, values) = Query::insert()
            .into_table(VerificationIdent::DriverVerifications)
            .columns([VerificationIdent::DriverId])
            .values_panic([driver_id.0.into()])
            .on_conflict(
                OnConflict::column(VerificationIdent::DriverId)
                    .do_nothing()
                    .to_owned(),
            )
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        let inserted = sqlx::query_as_with::<_, DriverVerification, _>(&sql, values)
            .fetch_optional(&mut *conn)
            .await
            .erase_context()
            .attach_printable("could not create verification row")?;

        match inserted {
            Some(verification) => Ok(verification),
            None => Ok(Self::find_by_driver(conn, driver_id)
                .await?
                .unwrap_or_else(|| unreachable!("verification row must exist after upsert"))),
        }
    }

    #[tracing::instrument(skip_all, name = "db.verifications.list")]
    pub async fn list(
        conn: &mut PgConnection,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<VerificationView>> {
        let mut query = Query::select();
        query
            .column((VerificationIdent::DriverVerifications, Asterisk))
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::FullName)),
                Alias::new("driver_name"),
            )
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::Email)),
                Alias::new("driver_email"),
            )
            .from(VerificationIdent::DriverVerifications)
            .left_join(
                UserIdent::Users,
                Expr::col((UserIdent::Users, UserIdent::Id)).equals((
                    VerificationIdent::DriverVerifications,
                    VerificationIdent::DriverId,
                )),
            )
            .order_by(
                (VerificationIdent::DriverVerifications, VerificationIdent::SubmittedAt),
                Order::Asc,
            );

        if let Some(status) = status {
            query.and_where(
                Expr::col((VerificationIdent::DriverVerifications, VerificationIdent::Status))
                    .eq(status.as_ref()),
            );
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, VerificationView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list verifications")
    }

    /// Review decision made by an admin.
    #[tracing::instrument(skip_all, name = "db.verifications.update_status")]
    pub async fn update_status(
        conn: &mut PgConnection,
        id: VerificationId,
        status: VerificationStatus,
        reviewed_by: UserId,
        admin_notes: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> Result<Option<DriverVerification>> {
        let mut query = Query::update();
        query
            .table(VerificationIdent::DriverVerifications)
            .value(VerificationIdent::Status, status.as_ref())
            .value(VerificationIdent::ReviewedBy, reviewed_by.0)
            .value(VerificationIdent::ReviewedAt, Expr::current_timestamp());

        if let Some(admin_notes) = admin_notes {
            query.value(VerificationIdent::AdminNotes, admin_notes);
        }
        match rejection_reason {
            Some(reason) => query.value(VerificationIdent::RejectionReason, reason),
            // approvals clear any earlier rejection
            None => query.value(VerificationIdent::RejectionReason, Option::<&str>::None),
        };

        let (sql, values) = query
            .and_where(Expr::col(VerificationIdent::Id).eq(id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverVerification, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not update verification status")
    }

    #[tracing::instrument(skip_all, name = "db.verifications.counts")]
    pub async fn counts(conn: &mut PgConnection) -> Result<VerificationCounts> {
        let (sql, values) = Query::select()
            .column(VerificationIdent::Status)
            .expr(Expr::cust("COUNT(*)"))
            .from(VerificationIdent::DriverVerifications)
            .group_by_col(VerificationIdent::Status)
            .build_sqlx(PostgresQueryBuilder);

        let rows = sqlx::query_as_with::<_, (String, i64), _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not count verifications")?;

        let mut counts = VerificationCounts::default();
        for (status, count) in rows {
            match VerificationStatus::from_str(&status) {
                Ok(VerificationStatus::Pending) => counts.pending = count,
                Ok(VerificationStatus::UnderReview) => counts.under_review = count,
                Ok(VerificationStatus::Approved) => counts.approved = count,
                Ok(VerificationStatus::Rejected) => counts.rejected = count,
                _ => {}
            }
        }

        Ok(counts)
    }
}

#[derive(Debug, Error)]
#[error("Could not update verification documents")]
pub struct SubmitDocumentsError;

/// Document (re)submission by the driver. Only the given fields are
/// touched; a rejected or expired verification drops back to pending.
#[derive(Builder)]
pub struct SubmitDocuments<'a> {
    #[builder(into)]
    pub driver_id: UserId,
    pub profile_photo: Option<&'a str>,
    pub license_document: Option<&'a str>,
    pub license_number: Option<&'a str>,
    pub license_expiry: Option<NaiveDateTime>,
    pub vehicle_registration: Option<&'a str>,
}

impl SubmitDocuments<'_> {
    #[tracing::instrument(skip_all, name = "db.verifications.submit")]
    pub async fn submit(
        &self,
        conn: &mut PgConnection,
    ) -> Result<DriverVerification, SubmitDocumentsError> {
        let current = DriverVerification::get_or_create(conn, self.driver_id)
            .await
            .change_context(SubmitDocumentsError)?;

        let mut query = Query::update();
        query.table(VerificationIdent::DriverVerifications);

        if let Some(profile_photo) = self.profile_photo {
            query.value(VerificationIdent::ProfilePhoto, profile_photo);
        }
        if let Some(license_document) = self.license_document {
            query.value(VerificationIdent::LicenseDocument, license_document);
        }
        if let Some(license_number) = self.license_number {
            query.value(VerificationIdent::LicenseNumber, license_number);
        }
        if let Some(license_expiry) = self.license_expiry {
            query.value(VerificationIdent::LicenseExpiry, license_expiry);
        }
        if let Some(vehicle_registration) = self.vehicle_registration {
            query.value(VerificationIdent::VehicleRegistration, vehicle_registration);
        }

        if matches!(
            current.status,
            VerificationStatus::Rejected | VerificationStatus::Expired
        ) {
            query.value(
                VerificationIdent::Status,
                VerificationStatus::Pending.as_ref(),
            );
        }

        let (sql, values) = query
            .value(VerificationIdent::SubmittedAt, Expr::current_timestamp())
            .and_where(Expr::col(VerificationIdent::Id).eq(current.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, DriverVerification, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(SubmitDocumentsError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::test_fixtures::make_user;
    use guzo_api_types::user::UserRole;

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn get_or_create_is_idempotent(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-gc", UserRole::Driver).await;

        let first = DriverVerification::get_or_create(&mut conn, driver.id)
            .await
            .unwrap();
        let second = DriverVerification::get_or_create(&mut conn, driver.id)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, VerificationStatus::Pending);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn resubmission_resets_rejected_status(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-resubmit", UserRole::Driver).await;
        let admin = make_user(&mut conn, "admin-resubmit", UserRole::Admin).await;

        let verification = SubmitDocuments::builder()
            .driver_id(driver.id)
            .license_number("DL123456")
            .build()
            .submit(&mut conn)
            .await
            .unwrap();

        DriverVerification::update_status(
            &mut conn,
            verification.id,
            VerificationStatus::Rejected,
            admin.id,
            None,
            Some("blurry license scan"),
        )
        .await
        .unwrap()
        .unwrap();

        let resubmitted = SubmitDocuments::builder()
            .driver_id(driver.id)
            .license_document("/uploads/licenses/clear.pdf")
            .build()
            .submit(&mut conn)
            .await
            .unwrap();

        assert_eq!(resubmitted.status, VerificationStatus::Pending);
        assert_eq!(resubmitted.license_number.as_deref(), Some("DL123456"));
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn counts_group_by_status(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin = make_user(&mut conn, "admin-counts", UserRole::Admin).await;

        for name in ["driver-c1", "driver-c2", "driver-c3"] {
            let driver = make_user(&mut conn, name, UserRole::Driver).await;
            DriverVerification::get_or_create(&mut conn, driver.id)
                .await
                .unwrap();
        }

        let one = DriverVerification::list(&mut conn, Some(VerificationStatus::Pending))
            .await
            .unwrap();
        DriverVerification::update_status(
            &mut conn,
            one[0].verification.id,
            VerificationStatus::Approved,
            admin.id,
            Some("all documents valid"),
            None,
        )
        .await
        .unwrap()
        .unwrap();

        let counts = DriverVerification::counts(&mut conn).await.unwrap();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.approved, 1);
    }
}
