use guzo_api_types::ErrorCategory;
use std::fmt;

use crate::error::Context;
use crate::Error;

/// Combinators for results already carrying an [`Error<C>`].
pub trait ResultExt {
    type Ok;
    type Context;

    fn attach_printable<A>(self, attachment: A) -> Result<Self::Ok, Error<Self::Context>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static;

    fn attach_printable_lazy<A, F>(self, attachment: F) -> Result<Self::Ok, Error<Self::Context>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static,
        F: FnOnce() -> A;

    fn change_context<N>(self, context: N) -> Result<Self::Ok, Error<N>>
    where
        N: Context;

    fn category(self, category: ErrorCategory) -> Result<Self::Ok, Error<Self::Context>>;

    fn erase_context(self) -> Result<Self::Ok, Error>;
}

impl<T, C> ResultExt for Result<T, Error<C>> {
    type Ok = T;
    type Context = C;

    #[track_caller]
    fn attach_printable<A>(self, attachment: A) -> Result<T, Error<C>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(error.attach_printable(attachment)),
        }
    }

    #[track_caller]
    fn attach_printable_lazy<A, F>(self, attachment: F) -> Result<T, Error<C>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static,
        F: FnOnce() -> A,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(error.attach_printable(attachment())),
        }
    }

    #[track_caller]
    fn change_context<N>(self, context: N) -> Result<T, Error<N>>
    where
        N: Context,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(error.change_context(context)),
        }
    }

    fn category(self, category: ErrorCategory) -> Result<T, Error<C>> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(error.category(category)),
        }
    }

    fn erase_context(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(error.erase_context()),
        }
    }
}

/// Combinators lifting plain `std` results into [`Error`] carriers.
pub trait NoContextResultExt {
    type Ok;
    type Context;

    fn into_error(self) -> Result<Self::Ok, Error<Self::Context>>;

    fn erase_context(self) -> Result<Self::Ok, Error>;

    fn change_context<N>(self, context: N) -> Result<Self::Ok, Error<N>>
    where
        N: Context;

    fn attach_printable<A>(self, attachment: A) -> Result<Self::Ok, Error<Self::Context>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static;

    fn category(self, category: ErrorCategory) -> Result<Self::Ok, Error<Self::Context>>;
}

impl<T, C: Context> NoContextResultExt for Result<T, C> {
    type Ok = T;
    type Context = C;

    #[track_caller]
    fn into_error(self) -> Result<T, Error<C>> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::unknown(error)),
        }
    }

    #[track_caller]
    fn erase_context(self) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::unknown_generic(error)),
        }
    }

    #[track_caller]
    fn change_context<N>(self, context: N) -> Result<T, Error<N>>
    where
        N: Context,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::unknown(error).change_context(context)),
        }
    }

    #[track_caller]
    fn attach_printable<A>(self, attachment: A) -> Result<T, Error<C>>
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::unknown(error).attach_printable(attachment)),
        }
    }

    #[track_caller]
    fn category(self, category: ErrorCategory) -> Result<T, Error<C>> {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::new(category, error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error as ThisError;

    #[derive(Debug, ThisError)]
    #[error("io exploded")]
    struct Exploded;

    #[derive(Debug, ThisError)]
    #[error("could not save the thing")]
    struct SaveError;

    fn fallible() -> Result<(), Exploded> {
        Err(Exploded)
    }

    #[test]
    fn lifts_std_results() {
        let error = fallible().change_context(SaveError).unwrap_err();
        assert!(error.has::<Exploded>());
        assert_eq!(error.current_context().to_string(), "could not save the thing");
    }

    #[test]
    fn categorizes_std_results() {
        let error = fallible().category(ErrorCategory::Outage).unwrap_err();
        assert_eq!(error.get_category(), &ErrorCategory::Outage);
    }
}
