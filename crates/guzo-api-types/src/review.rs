use serde::{Deserialize, Serialize};

use crate::user::UserRole;
use crate::util::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub booking_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub reviewer_role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: Timestamp,
}
