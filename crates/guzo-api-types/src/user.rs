use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::util::Timestamp;
use crate::verification::VerificationStatus;

/// Every account belongs to exactly one role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "snake_case"))]
pub enum UserRole {
    Rider,
    Driver,
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Public profile of a user as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub role: UserRole,
    pub active: bool,
    pub verified: bool,
    pub online: bool,
    pub rating: f64,
    pub total_ratings: i32,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
    pub joined_at: Timestamp,
}
