use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("environment variable `{0}` is not set")]
pub struct NotPresent(String);

#[derive(Debug, Error)]
#[error("environment variable `{name}` has an invalid value")]
pub struct InvalidValue {
    name: String,
}

/// Reads a required environment variable.
pub fn var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(std::env::VarError::NotPresent) => Err(NotPresent(name.to_string()).into()),
        Err(error @ std::env::VarError::NotUnicode(..)) => Err(guzo_error::Error::unknown_generic(
            error,
        )
        .attach_printable(format!("environment variable `{name}` is not valid unicode"))),
    }
}

/// Reads an optional environment variable.
pub fn var_opt(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error @ std::env::VarError::NotUnicode(..)) => Err(guzo_error::Error::unknown_generic(
            error,
        )
        .attach_printable(format!("environment variable `{name}` is not valid unicode"))),
    }
}

/// Reads and parses an optional environment variable.
pub fn var_opt_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var_opt(name)? {
        Some(value) => value
            .parse::<T>()
            .change_context(InvalidValue {
                name: name.to_string(),
            })
            .map(Some)
            .erase_context(),
        None => Ok(None),
    }
}
