use axum_extra::headers::{Error as HeaderError, Header};
use axum::http::{HeaderName, HeaderValue};

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request correlation id, generated by the telemetry middleware when
/// the client did not send one.
#[derive(Debug, Clone)]
pub struct XRequestId(String);

impl XRequestId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Header for XRequestId {
    fn name() -> &'static HeaderName {
        &X_REQUEST_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let value = value.to_str().map_err(|_| HeaderError::invalid())?;
        Ok(Self(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value));
        }
    }
}
