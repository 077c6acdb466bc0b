use guzo_utils::Sensitive;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Auth {
    /// Secret used to sign and verify login tokens (HS256).
    ///
    /// **Environment variables**:
    /// - `GUZO_AUTH_JWT_SECRET`
    pub jwt_secret: Sensitive<String>,
    /// How long a login token stays valid, in hours.
    ///
    /// **Environment variables**:
    /// - `GUZO_AUTH_TOKEN_EXPIRY_HOURS`
    #[serde(default = "Auth::default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

impl Auth {
    pub(crate) const MIN_SECRET_LEN: usize = 12;

    pub(crate) const fn default_token_expiry_hours() -> i64 {
        24
    }
}
