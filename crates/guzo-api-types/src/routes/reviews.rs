use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
pub struct SubmitReview {
    pub booking_id: i64,
    pub reviewee_id: i64,
    pub rating: i32,
    #[cfg_attr(feature = "server", builder(into))]
    pub comment: Option<String>,
}

/// A completed booking still awaiting the caller's review.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PendingReview {
    pub booking: Booking,
    pub reviewee: UserProfile,
}
