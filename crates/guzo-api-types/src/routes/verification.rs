use serde::{Deserialize, Serialize};

use crate::util::Timestamp;
use crate::verification::VerificationStatus;

/// Submit (or resubmit) verification documents. Documents travel as
/// opaque reference strings; byte transport is out of scope for
/// this API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[cfg_attr(feature = "server", derive(bon::Builder))]
#[cfg_attr(feature = "server", builder(on(String, into)))]
pub struct SubmitVerification {
    pub license_number: Option<String>,
    pub license_expiry: Option<Timestamp>,
    pub profile_photo: Option<String>,
    pub license_document: Option<String>,
    pub vehicle_registration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApproveVerification {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RejectVerification {
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ListVerifications {
    pub status: Option<VerificationStatus>,
}
