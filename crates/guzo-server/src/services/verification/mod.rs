use chrono::NaiveDateTime;
use guzo_api_types::verification::VerificationStatus;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::VerificationId;
use guzo_model::user::UpdateUser;
use guzo_model::verification::{SubmitDocuments, VerificationCounts, VerificationView};
use guzo_model::DriverVerification;

use crate::extract::{SessionAdmin, SessionDriver};
use crate::App;

/// Driver submitting (or resubmitting) verification documents.
#[derive(Debug)]
pub struct SubmitVerification<'a> {
    pub license_number: Option<&'a str>,
    pub license_expiry: Option<NaiveDateTime>,
    pub profile_photo: Option<&'a str>,
    pub license_document: Option<&'a str>,
    pub vehicle_registration: Option<&'a str>,
}

impl SubmitVerification<'_> {
    #[tracing::instrument(skip(self, app, driver), name = "services.verification.submit")]
    pub async fn perform(
        self,
        app: &App,
        driver: &SessionDriver,
    ) -> Result<DriverVerification, ApiError> {
        if let Some(license_number) = self.license_number {
            if license_number.trim().len() < 5 {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Invalid license number."));
            }
        }

        let mut conn = app.db_write().await?;
        let verification = SubmitDocuments::builder()
            .driver_id(driver.id)
            .maybe_profile_photo(self.profile_photo)
            .maybe_license_document(self.license_document)
            .maybe_license_number(self.license_number)
            .maybe_license_expiry(self.license_expiry)
            .maybe_vehicle_registration(self.vehicle_registration)
            .build()
            .submit(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(verification)
    }
}

/// Driver checking on their own verification.
#[derive(Debug)]
pub struct GetMyVerification;

impl GetMyVerification {
    #[tracing::instrument(skip_all, name = "services.verification.get_mine")]
    pub async fn perform(
        self,
        app: &App,
        driver: &SessionDriver,
    ) -> Result<Option<DriverVerification>, ApiError> {
        let mut conn = app.db_read().await?;
        let verification = DriverVerification::find_by_driver(&mut conn, driver.id).await?;
        Ok(verification)
    }
}

#[derive(Debug)]
pub struct ListVerifications {
    pub status: Option<VerificationStatus>,
}

impl ListVerifications {
    #[tracing::instrument(skip(app), name = "services.verification.list")]
    pub async fn perform(
        self,
        app: &App,
        _admin: &SessionAdmin,
    ) -> Result<Vec<VerificationView>, ApiError> {
        let mut conn = app.db_read().await?;
        let verifications = DriverVerification::list(&mut conn, self.status).await?;
        Ok(verifications)
    }
}

/// Moves a verification into the `under_review` state.
#[derive(Debug)]
pub struct StartReview {
    pub id: VerificationId,
}

impl StartReview {
    #[tracing::instrument(skip(app, admin), name = "services.verification.start_review")]
    pub async fn perform(
        self,
        app: &App,
        admin: &SessionAdmin,
    ) -> Result<DriverVerification, ApiError> {
        let mut conn = app.db_write().await?;
        let Some(verification) = DriverVerification::update_status(
            &mut conn,
            self.id,
            VerificationStatus::UnderReview,
            admin.id,
            None,
            None,
        )
        .await?
        else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        conn.commit().await?;
        Ok(verification)
    }
}

/// Approves the verification and flips the driver's verified flag.
#[derive(Debug)]
pub struct ApproveVerification<'a> {
    pub id: VerificationId,
    pub notes: Option<&'a str>,
}

impl ApproveVerification<'_> {
    #[tracing::instrument(skip(self, app, admin), name = "services.verification.approve")]
    pub async fn perform(
        self,
        app: &App,
        admin: &SessionAdmin,
    ) -> Result<DriverVerification, ApiError> {
        let mut conn = app.db_write().await?;
        let Some(verification) = DriverVerification::update_status(
            &mut conn,
            self.id,
            VerificationStatus::Approved,
            admin.id,
            self.notes,
            None,
        )
        .await?
        else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        UpdateUser::builder()
            .id(verification.driver_id)
            .verified(true)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(verification)
    }
}

/// Rejects the verification with a reason and clears the driver's
/// verified flag.
#[derive(Debug)]
pub struct RejectVerification<'a> {
    pub id: VerificationId,
    pub reason: &'a str,
    pub notes: Option<&'a str>,
}

impl RejectVerification<'_> {
    #[tracing::instrument(skip(self, app, admin), name = "services.verification.reject")]
    pub async fn perform(
        self,
        app: &App,
        admin: &SessionAdmin,
    ) -> Result<DriverVerification, ApiError> {
        if self.reason.trim().is_empty() {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("A rejection reason is required."));
        }

        let mut conn = app.db_write().await?;
        let Some(verification) = DriverVerification::update_status(
            &mut conn,
            self.id,
            VerificationStatus::Rejected,
            admin.id,
            self.notes,
            Some(self.reason),
        )
        .await?
        else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        UpdateUser::builder()
            .id(verification.driver_id)
            .verified(false)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(verification)
    }
}

#[derive(Debug)]
pub struct GetVerificationStats;

impl GetVerificationStats {
    #[tracing::instrument(skip_all, name = "services.verification.stats")]
    pub async fn perform(
        self,
        app: &App,
        _admin: &SessionAdmin,
    ) -> Result<VerificationCounts, ApiError> {
        let mut conn = app.db_read().await?;
        let counts = DriverVerification::counts(&mut conn).await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use guzo_model::User;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn approval_flips_the_driver_flag(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "vf-admin").await;
        let driver = test_utils::users::driver_session(&app, "vf-driver").await;

        let verification = SubmitVerification {
            license_number: Some("DL123456"),
            license_expiry: None,
            profile_photo: Some("/uploads/photos/vf.jpg"),
            license_document: Some("/uploads/licenses/vf.pdf"),
            vehicle_registration: None,
        }
        .perform(&app, &driver)
        .await
        .unwrap();

        ApproveVerification {
            id: verification.id,
            notes: Some("all documents valid"),
        }
        .perform(&app, &admin)
        .await
        .unwrap();

        let mut conn = app.db_read().await.unwrap();
        let driver_row = User::find(&mut conn, driver.id).await.unwrap().unwrap();
        assert!(driver_row.verified);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn rejection_requires_a_reason_and_clears_the_flag(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let admin = test_utils::users::admin_session(&app, "vf2-admin").await;
        let driver = test_utils::users::driver_session(&app, "vf2-driver").await;

        let verification = SubmitVerification {
            license_number: Some("DL654321"),
            license_expiry: None,
            profile_photo: None,
            license_document: None,
            vehicle_registration: None,
        }
        .perform(&app, &driver)
        .await
        .unwrap();

        let error = RejectVerification {
            id: verification.id,
            reason: "  ",
            notes: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap_err();
        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);

        let rejected = RejectVerification {
            id: verification.id,
            reason: "blurry license scan",
            notes: None,
        }
        .perform(&app, &admin)
        .await
        .unwrap();
        assert_eq!(rejected.status, VerificationStatus::Rejected);

        let mut conn = app.db_read().await.unwrap();
        let driver_row = User::find(&mut conn, driver.id).await.unwrap().unwrap();
        assert!(!driver_row.verified);
    }
}
