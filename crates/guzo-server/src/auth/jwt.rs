use chrono::{TimeDelta, Utc};
use guzo_api_types::user::UserRole;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::{ApiErrorCategory, Error, Result};
use guzo_model::User;
use jsonwebtoken::{errors::ErrorKind, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error as ThisError;

use crate::App;

static JWT_HEADER: LazyLock<Header> = LazyLock::new(|| Header::new(Algorithm::HS256));
static JWT_LOGIN_ISSUER: &str = "guzo.api.login";

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginClaims {
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub sub: i64,

    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, ThisError)]
#[error("Failed to decode as JWT")]
pub struct DecodeJwtError;

#[derive(Debug, ThisError)]
#[error("Failed to encode as JWT")]
pub struct EncodeJwtError;

impl LoginClaims {
    #[must_use]
    pub fn generate(app: &App, user: &User) -> LoginClaims {
        let now = Utc::now();
        let expiry = TimeDelta::hours(app.config.auth.token_expiry_hours);

        Self {
            nbf: now.timestamp(),
            exp: (now + expiry).timestamp(),
            iss: JWT_LOGIN_ISSUER.to_string(),
            sub: user.id.0,

            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn encode(&self, app: &App) -> Result<String, EncodeJwtError> {
        jsonwebtoken::encode(&JWT_HEADER, self, &app.jwt_encode)
            .change_context(EncodeJwtError)
            .attach_printable("could not encode login jwt claims")
    }

    pub fn decode(app: &App, token: &str) -> Result<Self, DecodeJwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[JWT_LOGIN_ISSUER]);

        let token = token.replace(char::is_whitespace, "");
        match jsonwebtoken::decode::<Self>(&token, &app.jwt_decode, &validation) {
            Ok(data) => Ok(data.claims),
            Err(error) => match *error.kind() {
                ErrorKind::InvalidToken | ErrorKind::InvalidIssuer | ErrorKind::InvalidSignature => {
                    Err(Error::new(ApiErrorCategory::AccessDenied, DecodeJwtError))
                }
                ErrorKind::ExpiredSignature => {
                    Err(Error::new(ApiErrorCategory::ExpiredToken, DecodeJwtError))
                }
                _ => Err(Error::unknown_generic(error).change_context(DecodeJwtError)),
            },
        }
    }
}
