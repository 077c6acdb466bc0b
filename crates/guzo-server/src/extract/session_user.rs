use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use guzo_db::pool::PgConnection;
use guzo_error::ext::ResultExt;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::UserId;
use guzo_model::User;
use std::ops::Deref;
use thiserror::Error;

use crate::App;

/// The authenticated account behind the bearer token. Inserted into
/// request extensions by the auth middleware.
#[derive(Clone)]
pub struct SessionUser {
    pub user: User,
}

impl SessionUser {
    #[must_use]
    pub fn into_inner(self) -> User {
        self.user
    }
}

impl Deref for SessionUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

#[derive(Debug, Error)]
#[error("could not make a session user")]
pub(crate) struct GetSessionUserError;

impl SessionUser {
    pub(crate) async fn from_db(
        conn: &mut PgConnection,
        id: UserId,
    ) -> guzo_error::Result<Self, GetSessionUserError> {
        let user = User::find(conn, id)
            .await
            .change_context(GetSessionUserError)?;

        if let Some(user) = user {
            Ok(Self { user })
        } else {
            let error =
                guzo_error::Error::new(ApiErrorCategory::AccessDenied, GetSessionUserError)
                    .attach_printable("specified user does not exist");

            Err(error)
        }
    }
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // for diagnostic purposes
        f.debug_struct("SessionUser")
            .field("id", &self.user.id)
            .finish_non_exhaustive()
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for SessionUser {
    type Rejection = Response;

    #[tracing::instrument(skip_all, name = "extractors.session_user")]
    async fn from_request_parts(parts: &mut Parts, _app: &App) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SessionUser>() {
            Some(identity) => Ok(identity.clone()),
            None => Err(ApiError::new(ApiErrorCategory::AccessDenied).into_response()),
        }
    }
}

/// [`SessionUser`] narrowed to drivers. Admins pass every role
/// guard.
#[derive(Debug, Clone)]
pub struct SessionDriver(pub SessionUser);

impl Deref for SessionDriver {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for SessionDriver {
    type Rejection = Response;

    #[tracing::instrument(skip_all, name = "extractors.session_driver")]
    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, app).await?;
        if session.is_driver() || session.is_admin() {
            Ok(Self(session))
        } else {
            Err(ApiError::new(ApiErrorCategory::AccessDenied)
                .message("Driver access required.")
                .into_response())
        }
    }
}

/// [`SessionUser`] narrowed to administrators.
#[derive(Debug, Clone)]
pub struct SessionAdmin(pub SessionUser);

impl Deref for SessionAdmin {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for SessionAdmin {
    type Rejection = Response;

    #[tracing::instrument(skip_all, name = "extractors.session_admin")]
    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, app).await?;
        if session.is_admin() {
            Ok(Self(session))
        } else {
            Err(ApiError::new(ApiErrorCategory::AccessDenied)
                .message("Admin access required.")
                .into_response())
        }
    }
}
