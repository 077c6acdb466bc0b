use serde::{Deserialize, Serialize};

use crate::user::{UserProfile, UserRole};
use crate::util::Sensitive;

fn default_language() -> String {
    "en".to_string()
}

/// Sign up for a Guzo account, either as a rider or a driver.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct RegisterUser {
    pub email: String,
    pub phone: String,
    pub full_name: String,
    #[cfg_attr(feature = "server", builder(into))]
    pub password: Sensitive<String>,
    #[serde(default = "UserRole::default_signup")]
    #[cfg_attr(feature = "server", builder(default = UserRole::Rider))]
    pub role: UserRole,
    #[serde(default = "default_language")]
    #[cfg_attr(feature = "server", builder(default = default_language()))]
    pub language: String,
}

impl UserRole {
    // Required by serde; admins are never self-assignable.
    #[doc(hidden)]
    #[must_use]
    pub fn default_signup() -> Self {
        Self::Rider
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RegisterUserResponse {
    pub user: UserProfile,
}

/// Log in as a user to Guzo.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(Sensitive<String>, into)))]
pub struct LoginUser {
    #[cfg_attr(feature = "server", builder(into))]
    pub email: String,
    pub password: Sensitive<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoginUserResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub language: Option<String>,
    pub profile_image: Option<String>,
}

/// Weekly availability document for drivers, e.g.
/// `{"monday": {"start": "08:00", "end": "18:00"}}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpdateSchedule {
    pub schedule: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToggleOnlineResponse {
    pub online: bool,
}
