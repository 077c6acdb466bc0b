use serde::{Deserialize, Serialize};

use crate::util::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRoute {
    pub id: i64,
    pub user_id: i64,
    pub origin: String,
    pub destination: String,
    /// How many times this route was booked since it was saved.
    pub use_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteDriver {
    pub id: i64,
    pub user_id: i64,
    pub driver_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: Timestamp,
}
