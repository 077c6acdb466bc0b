use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::either::Either;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use guzo_api_types::error::category::LoginUserFailed;
use guzo_db::pool::PgConnection;
use guzo_error::ext::ResultExt;
use guzo_error::{ApiError, ApiErrorCategory, Result};
use guzo_model::id::UserId;

use crate::auth::jwt::LoginClaims;
use crate::extract::SessionUser;
use crate::App;

#[doc(hidden)]
#[derive(FromRequestParts)]
pub struct Metadata {
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
}

/// Resolves the bearer token (when present) into a [`SessionUser`]
/// request extension. Routes that require authentication pick it up
/// through the extractors; anonymous requests simply pass through.
#[tracing::instrument(skip_all, name = "middleware.auth")]
pub async fn catch_token(
    metadata: Metadata,
    app: State<App>,
    request: Request,
    next: Next,
) -> Response {
    let request = if let Some(header) = metadata.auth_header {
        match process_user_token(&app, request, header.token()).await {
            Ok(Either::E1(request)) => request,
            Ok(Either::E2(response)) => return response,
            Err(error) => return error.into_api_error().into_response(),
        }
    } else {
        request
    };
    next.run(request).await
}

async fn process_user_token(
    app: &App,
    request: Request,
    token: &str,
) -> Result<Either<Request, Response>> {
    let mut conn = app.db_read().await?;
    let user = get_user_from_token(&mut conn, app, token).await?;

    drop(conn);

    if !user.active {
        let response = ApiError::new(ApiErrorCategory::LoginUserFailed(
            LoginUserFailed::AccountDisabled,
        ))
        .message("User account is disabled.")
        .into_response();

        return Ok(Either::E2(response));
    }

    let mut request = request;
    request.extensions_mut().insert(user);

    Ok(Either::E1(request))
}

async fn get_user_from_token(
    conn: &mut PgConnection,
    app: &App,
    token: &str,
) -> Result<SessionUser> {
    let claims = LoginClaims::decode(app, token)?;
    SessionUser::from_db(conn, UserId(claims.sub))
        .await
        .erase_context()
}
