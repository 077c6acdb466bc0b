pub mod category;
pub use self::category::ErrorCategory;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "server")]
mod axum;

/// The error object returned by every failing Guzo API route.
///
/// Serialized as `{"code": "...", "subcode": "...", "message": "..."}`
/// where `subcode` and `message` may be absent.
#[derive(Debug, Clone)]
#[must_use]
pub struct Error {
    pub category: ErrorCategory,
    pub message: Option<String>,
}

impl Error {
    pub fn new(category: ErrorCategory) -> Self {
        Self {
            category,
            message: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(ErrorCategory::Unknown)
    }

    pub fn message(self, message: impl Into<String>) -> Self {
        Self {
            category: self.category,
            message: Some(message.into()),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category
    }
}

impl Eq for Error {}

impl std::hash::Hash for Error {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.category.hash(state);
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.category),
            None => std::fmt::Display::fmt(&self.category, f),
        }
    }
}

impl std::error::Error for Error {}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("code", self.category.code())?;
        if let Some(subcode) = self.category.subcode() {
            map.serialize_entry("subcode", subcode)?;
        }
        if let Some(message) = &self.message {
            map.serialize_entry("message", message)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Error {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            code: String,
            subcode: Option<String>,
            message: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let category = ErrorCategory::from_codes(&raw.code, raw.subcode.as_deref())
            .ok_or_else(|| D::Error::custom(format!("unknown error code {:?}", raw.code)))?;

        Ok(Self {
            category,
            message: raw.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::category::BookTripFailed;
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_code_and_subcode() {
        let error = Error::new(ErrorCategory::BookTripFailed(BookTripFailed::NotEnoughSeats))
            .message("Not enough seats left on this trip.");

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(
            value,
            json!({
                "code": "book_trip_failed",
                "subcode": "not_enough_seats",
                "message": "Not enough seats left on this trip.",
            })
        );
    }

    #[test]
    fn roundtrips_through_json() {
        let error = Error::new(ErrorCategory::AccessDenied);
        let encoded = serde_json::to_string(&error).unwrap();
        let decoded = serde_json::from_str::<Error>(&encoded).unwrap();
        assert_eq!(decoded, error);
    }
}
