use serde::{Deserialize, Serialize};
use strum::Display;

/// Machine-readable classification of every error the Guzo API can
/// emit. `code` identifies the category, `subcode` narrows it down
/// where a category has more than one cause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// We don't know what is the cause of this error but the error we
    /// have in our server is reported to the operators.
    Unknown,
    InvalidRequest,

    /// `Outage` can mean that one service is down and cannot perform
    /// the action as intended to the user such as when the database
    /// of the Guzo deployment is down.
    Outage,

    AccessDenied,
    NotFound,
    ExpiredToken,

    LoginUserFailed(LoginUserFailed),
    RegisterUserFailed(RegisterUserFailed),
    BookTripFailed(BookTripFailed),
    MatchRequestFailed(MatchRequestFailed),
    SubmitReviewFailed(SubmitReviewFailed),
    RegisterVehicleFailed(RegisterVehicleFailed),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoginUserFailed {
    InvalidCredentials,
    AccountDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegisterUserFailed {
    EmailTaken,
    PhoneTaken,
    InvalidPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookTripFailed {
    /// The trip exists but cannot hold that many more passengers.
    NotEnoughSeats,
    /// The trip is not in `scheduled` state (departed, completed
    /// or cancelled).
    TripNotOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchRequestFailed {
    /// Another staff member (or a concurrent request) matched the
    /// booking first.
    AlreadyMatched,
    /// The booking is a regular trip booking, not an open custom
    /// request.
    NotACustomRequest,
    NotEnoughSeats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmitReviewFailed {
    BookingNotCompleted,
    NotAParticipant,
    AlreadyReviewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegisterVehicleFailed {
    PlateNumberTaken,
}

impl ErrorCategory {
    /// Stable string identifier serialized as `code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::InvalidRequest => "invalid_request",
            Self::Outage => "outage",
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::ExpiredToken => "expired_token",
            Self::LoginUserFailed(..) => "login_user_failed",
            Self::RegisterUserFailed(..) => "register_user_failed",
            Self::BookTripFailed(..) => "book_trip_failed",
            Self::MatchRequestFailed(..) => "match_request_failed",
            Self::SubmitReviewFailed(..) => "submit_review_failed",
            Self::RegisterVehicleFailed(..) => "register_vehicle_failed",
        }
    }

    /// Stable string identifier serialized as `subcode`, when the
    /// category carries one.
    #[must_use]
    pub fn subcode(&self) -> Option<&'static str> {
        match self {
            Self::LoginUserFailed(v) => Some(match v {
                LoginUserFailed::InvalidCredentials => "invalid_credentials",
                LoginUserFailed::AccountDisabled => "account_disabled",
            }),
            Self::RegisterUserFailed(v) => Some(match v {
                RegisterUserFailed::EmailTaken => "email_taken",
                RegisterUserFailed::PhoneTaken => "phone_taken",
                RegisterUserFailed::InvalidPassword => "invalid_password",
            }),
            Self::BookTripFailed(v) => Some(match v {
                BookTripFailed::NotEnoughSeats => "not_enough_seats",
                BookTripFailed::TripNotOpen => "trip_not_open",
            }),
            Self::MatchRequestFailed(v) => Some(match v {
                MatchRequestFailed::AlreadyMatched => "already_matched",
                MatchRequestFailed::NotACustomRequest => "not_a_custom_request",
                MatchRequestFailed::NotEnoughSeats => "not_enough_seats",
            }),
            Self::SubmitReviewFailed(v) => Some(match v {
                SubmitReviewFailed::BookingNotCompleted => "booking_not_completed",
                SubmitReviewFailed::NotAParticipant => "not_a_participant",
                SubmitReviewFailed::AlreadyReviewed => "already_reviewed",
            }),
            Self::RegisterVehicleFailed(v) => Some(match v {
                RegisterVehicleFailed::PlateNumberTaken => "plate_number_taken",
            }),
            _ => None,
        }
    }

    pub(crate) fn from_codes(code: &str, subcode: Option<&str>) -> Option<Self> {
        let category = match (code, subcode) {
            ("unknown", _) => Self::Unknown,
            ("invalid_request", _) => Self::InvalidRequest,
            ("outage", _) => Self::Outage,
            ("access_denied", _) => Self::AccessDenied,
            ("not_found", _) => Self::NotFound,
            ("expired_token", _) => Self::ExpiredToken,
            ("login_user_failed", Some(sub)) => Self::LoginUserFailed(match sub {
                "invalid_credentials" => LoginUserFailed::InvalidCredentials,
                "account_disabled" => LoginUserFailed::AccountDisabled,
                _ => return None,
            }),
            ("register_user_failed", Some(sub)) => Self::RegisterUserFailed(match sub {
                "email_taken" => RegisterUserFailed::EmailTaken,
                "phone_taken" => RegisterUserFailed::PhoneTaken,
                "invalid_password" => RegisterUserFailed::InvalidPassword,
                _ => return None,
            }),
            ("book_trip_failed", Some(sub)) => Self::BookTripFailed(match sub {
                "not_enough_seats" => BookTripFailed::NotEnoughSeats,
                "trip_not_open" => BookTripFailed::TripNotOpen,
                _ => return None,
            }),
            ("match_request_failed", Some(sub)) => Self::MatchRequestFailed(match sub {
                "already_matched" => MatchRequestFailed::AlreadyMatched,
                "not_a_custom_request" => MatchRequestFailed::NotACustomRequest,
                "not_enough_seats" => MatchRequestFailed::NotEnoughSeats,
                _ => return None,
            }),
            ("submit_review_failed", Some(sub)) => Self::SubmitReviewFailed(match sub {
                "booking_not_completed" => SubmitReviewFailed::BookingNotCompleted,
                "not_a_participant" => SubmitReviewFailed::NotAParticipant,
                "already_reviewed" => SubmitReviewFailed::AlreadyReviewed,
                _ => return None,
            }),
            ("register_vehicle_failed", Some(sub)) => Self::RegisterVehicleFailed(match sub {
                "plate_number_taken" => RegisterVehicleFailed::PlateNumberTaken,
                _ => return None,
            }),
            _ => return None,
        };

        Some(category)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.subcode() {
            Some(subcode) => write!(f, "{}/{subcode}", self.code()),
            None => f.write_str(self.code()),
        }
    }
}
