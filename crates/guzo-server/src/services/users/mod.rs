use guzo_api_types::error::category::{LoginUserFailed, RegisterUserFailed};
use guzo_api_types::user::UserRole;
use guzo_error::ext::NoContextResultExt;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::user::{InsertUser, UpdateUser};
use guzo_model::User;
use guzo_utils::Sensitive;
use tokio::task::spawn_blocking;

use crate::auth::jwt::LoginClaims;
use crate::App;

pub struct Register<'a> {
    pub email: Sensitive<&'a str>,
    pub phone: Sensitive<&'a str>,
    pub full_name: &'a str,
    pub password: Sensitive<&'a str>,
    pub role: UserRole,
    pub language: Option<&'a str>,
}

impl std::fmt::Debug for Register<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Register").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct RegisterResult {
    pub user: User,
}

impl Register<'_> {
    #[tracing::instrument(skip(app), name = "services.users.register")]
    pub async fn perform(self, app: &App) -> Result<RegisterResult, ApiError> {
        if !app.validate_email(&self.email) {
            return Err(
                ApiError::new(ApiErrorCategory::InvalidRequest).message("Invalid email address.")
            );
        }

        if !app.validate_phone(&self.phone) {
            return Err(
                ApiError::new(ApiErrorCategory::InvalidRequest).message("Invalid phone number.")
            );
        }

        if !app.validate_full_name(self.full_name) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest).message("Invalid name."));
        }

        if !app.validate_password(&self.password) {
            return Err(ApiError::new(ApiErrorCategory::RegisterUserFailed(
                RegisterUserFailed::InvalidPassword,
            ))
            .message("Password must be at least 6 characters long."));
        }

        // the admin role is granted by operators, never self-assigned
        if self.role == UserRole::Admin {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Cannot register as an administrator."));
        }

        let mut conn = app.db_write().await?;
        if User::check_email_taken(&mut conn, &self.email).await? {
            return Err(ApiError::new(ApiErrorCategory::RegisterUserFailed(
                RegisterUserFailed::EmailTaken,
            )));
        }

        if User::check_phone_taken(&mut conn, &self.phone).await? {
            return Err(ApiError::new(ApiErrorCategory::RegisterUserFailed(
                RegisterUserFailed::PhoneTaken,
            )));
        }

        let password = self.password.as_str().as_bytes().to_vec();
        let password_hash = spawn_blocking(move || guzo_crypto::argon2::hash(password))
            .await
            .erase_context()??;

        let user = InsertUser::builder()
            .email(&self.email)
            .phone(&self.phone)
            .full_name(self.full_name)
            .role(self.role)
            .password_hash(&password_hash)
            .maybe_language(self.language)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(RegisterResult { user })
    }
}

pub struct Login<'a> {
    pub email: Sensitive<&'a str>,
    pub password: Sensitive<&'a str>,
}

impl std::fmt::Debug for Login<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}

impl Login<'_> {
    #[tracing::instrument(skip(app), name = "services.users.login")]
    pub async fn perform(self, app: &App) -> Result<LoginResult, ApiError> {
        let mut conn = app.db_read_prefer_primary().await?;

        let user = User::find_by_email(&mut conn, &self.email).await?;

        // Do not leak whether the account exists: verify against a
        // constant dummy hash when it does not.
        static DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$\
            c29tZXNhbHRzb21lc2FsdA$WS1KRwmEYqlhjwe8LUpzHFcRbYUzUmJh1mHpmPQhkBo";

        let password = self.password.as_str().as_bytes().to_vec();
        let correct_hash = user
            .as_ref()
            .map(|user| user.password_hash.clone())
            .unwrap_or_else(|| DUMMY_HASH.to_string());

        let is_matched = spawn_blocking(move || guzo_crypto::argon2::verify(&password, &correct_hash))
            .await
            .erase_context()?
            .unwrap_or(false);

        let Some(user) = user.filter(|_| is_matched) else {
            return Err(ApiError::new(ApiErrorCategory::LoginUserFailed(
                LoginUserFailed::InvalidCredentials,
            )));
        };

        if !user.active {
            return Err(ApiError::new(ApiErrorCategory::LoginUserFailed(
                LoginUserFailed::AccountDisabled,
            )));
        }

        User::record_login(&mut conn, user.id).await?;

        let token = LoginClaims::generate(app, &user).encode(app)?;
        Ok(LoginResult { token, user })
    }
}

#[derive(Debug)]
pub struct UpdateProfile<'a> {
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub language: Option<&'a str>,
    pub profile_image: Option<&'a str>,
}

impl UpdateProfile<'_> {
    #[tracing::instrument(skip(app, session_user), name = "services.users.update_profile")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &crate::extract::SessionUser,
    ) -> Result<User, ApiError> {
        if let Some(full_name) = self.full_name {
            if !app.validate_full_name(full_name) {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Invalid name."));
            }
        }

        if let Some(phone) = self.phone {
            if !app.validate_phone(phone) {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Invalid phone number."));
            }
        }

        let mut conn = app.db_write().await?;
        let user = UpdateUser::builder()
            .id(session_user.id)
            .maybe_full_name(self.full_name)
            .maybe_phone(self.phone)
            .maybe_language(self.language)
            .maybe_profile_image(self.profile_image)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(user)
    }
}

/// Flips a driver's availability flag.
#[derive(Debug)]
pub struct ToggleOnline;

impl ToggleOnline {
    #[tracing::instrument(skip_all, name = "services.users.toggle_online")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &crate::extract::SessionUser,
    ) -> Result<User, ApiError> {
        let mut conn = app.db_write().await?;
        let user = UpdateUser::builder()
            .id(session_user.id)
            .online(!session_user.online)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(user)
    }
}

/// Stores a driver's weekly availability document.
#[derive(Debug)]
pub struct UpdateSchedule {
    pub schedule: serde_json::Value,
}

impl UpdateSchedule {
    #[tracing::instrument(skip_all, name = "services.users.update_schedule")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &crate::extract::SessionUser,
    ) -> Result<User, ApiError> {
        if !self.schedule.is_object() {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Schedule must be an object keyed by weekday."));
        }

        let mut conn = app.db_write().await?;
        let user = UpdateUser::builder()
            .id(session_user.id)
            .schedule(self.schedule)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use guzo_api_types::error::category::RegisterUserFailed;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn register_rejects_duplicate_email(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let request = || Register {
            email: Sensitive::new("abebe@example.com"),
            phone: Sensitive::new("+251911234567"),
            full_name: "Abebe Kebede",
            password: Sensitive::new("selam-addis"),
            role: UserRole::Rider,
            language: None,
        };

        request().perform(&app).await.unwrap();

        let error = Register {
            phone: Sensitive::new("+251911000000"),
            ..request()
        }
        .perform(&app)
        .await
        .unwrap_err();

        assert_eq!(
            error.category,
            ApiErrorCategory::RegisterUserFailed(RegisterUserFailed::EmailTaken)
        );
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn register_never_grants_admin(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let error = Register {
            email: Sensitive::new("root@example.com"),
            phone: Sensitive::new("+251911234567"),
            full_name: "Root User",
            password: Sensitive::new("super-secret"),
            role: UserRole::Admin,
            language: None,
        }
        .perform(&app)
        .await
        .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn login_does_not_leak_account_existence(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let registered = Register {
            email: Sensitive::new("tigist@example.com"),
            phone: Sensitive::new("+251922345678"),
            full_name: "Tigist Haile",
            password: Sensitive::new("selam-addis"),
            role: UserRole::Rider,
            language: None,
        }
        .perform(&app)
        .await
        .unwrap();

        let wrong_password = Login {
            email: Sensitive::new("tigist@example.com"),
            password: Sensitive::new("wrong"),
        }
        .perform(&app)
        .await
        .unwrap_err();

        let unknown_account = Login {
            email: Sensitive::new("nobody@example.com"),
            password: Sensitive::new("wrong"),
        }
        .perform(&app)
        .await
        .unwrap_err();

        assert_eq!(wrong_password.category, unknown_account.category);

        let success = Login {
            email: Sensitive::new("tigist@example.com"),
            password: Sensitive::new("selam-addis"),
        }
        .perform(&app)
        .await
        .unwrap();
        assert_eq!(success.user.id, registered.user.id);
        assert!(!success.token.is_empty());
    }
}
