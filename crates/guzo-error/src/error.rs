use guzo_api_types::ErrorCategory;
use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;
use tracing::Span;

use crate::internal::{ErrorInner, Frame, FrameKind, NoContext};

/// Any error type that can serve as a context frame. Blanket
/// implemented for every `std` error; [`Error`] itself deliberately
/// does not implement [`std::error::Error`] so contexts and carriers
/// never overlap.
pub trait Context: std::error::Error + Send + Sync + 'static {}

impl<T> Context for T where T: std::error::Error + Send + Sync + 'static {}

pub struct Error<C = NoContext> {
    pub(crate) inner: Box<ErrorInner>,
    // fn() -> C keeps the carrier Send + Sync no matter the marker.
    pub(crate) _phantom: PhantomData<fn() -> C>,
}

// constructors
impl<C> Error<C> {
    #[must_use]
    #[track_caller]
    pub fn new(category: ErrorCategory, context: C) -> Self
    where
        C: Context,
    {
        Self {
            inner: ErrorInner::boxed(category, make_context_frame(context)),
            _phantom: PhantomData,
        }
    }

    #[must_use]
    #[track_caller]
    pub fn new_generic(category: ErrorCategory, context: C) -> Error
    where
        C: Context,
    {
        Error {
            inner: ErrorInner::boxed(category, make_context_frame(context)),
            _phantom: PhantomData,
        }
    }

    #[must_use]
    #[track_caller]
    pub fn unknown(context: C) -> Self
    where
        C: Context,
    {
        Self::new(ErrorCategory::Unknown, context)
    }

    #[must_use]
    #[track_caller]
    pub fn unknown_generic(context: C) -> Error
    where
        C: Context,
    {
        Self::new_generic(ErrorCategory::Unknown, context)
    }
}

#[track_caller]
fn make_context_frame<C: Context>(context: C) -> Frame {
    Frame {
        message: context.to_string(),
        kind: FrameKind::Context(Box::new(context)),
        location: Location::caller(),
    }
}

// getters and combinators
impl<C> Error<C> {
    #[must_use]
    #[track_caller]
    pub fn attach_printable<A>(mut self, attachment: A) -> Self
    where
        A: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.frames.insert(
            0,
            Frame {
                message: attachment.to_string(),
                kind: FrameKind::Printable,
                location: Location::caller(),
            },
        );
        self
    }

    #[must_use]
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.frames.iter().find_map(|frame| match &frame.kind {
            FrameKind::Context(object) => object.downcast_ref::<T>(),
            FrameKind::Printable => None,
        })
    }

    #[must_use]
    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    #[must_use]
    pub fn get_category(&self) -> &ErrorCategory {
        &self.inner.category
    }

    #[must_use]
    pub fn category(mut self, category: ErrorCategory) -> Self {
        self.inner.category = category;
        self
    }

    #[must_use]
    #[track_caller]
    pub fn change_context<N>(mut self, context: N) -> Error<N>
    where
        N: Context,
    {
        self.inner.frames.insert(0, make_context_frame(context));
        Error {
            inner: self.inner,
            _phantom: PhantomData,
        }
    }

    /// Most recent typed context of this error.
    ///
    /// ## Panics
    /// Never panics for errors built through the public constructors:
    /// the newest `C` frame is always present by construction.
    #[must_use]
    pub fn current_context(&self) -> &C
    where
        C: Context,
    {
        self.downcast_ref::<C>()
            .unwrap_or_else(|| unreachable!("typed context frame must exist"))
    }

    #[must_use]
    pub fn erase_context(self) -> Error {
        Error {
            inner: self.inner,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.inner.span
    }
}

impl<C> From<Error<C>> for Error
where
    C: Context,
{
    fn from(value: Error<C>) -> Self {
        value.erase_context()
    }
}

impl<C: Context> From<C> for Error {
    #[track_caller]
    fn from(value: C) -> Self {
        Error::unknown_generic(value)
    }
}

impl<C: Context> From<C> for Error<C> {
    #[track_caller]
    fn from(value: C) -> Self {
        Error::unknown(value)
    }
}

impl<C> Error<C> {
    /// Converts this error into the wire-level API error, logging
    /// anything that the user is not supposed to see.
    pub fn into_api_error(self) -> guzo_api_types::Error {
        use guzo_api_types::Error as ApiError;
        match self.get_category() {
            ErrorCategory::Unknown => self.inner.span.in_scope(|| {
                tracing::error!(error = %self, "Caught internal server error");
                ApiError::unknown().message("Unexpected error has occurred. Please try again later.")
            }),
            ErrorCategory::Outage => self.inner.span.in_scope(|| {
                tracing::error!(error = %self, "Caught outage error");
                ApiError::new(ErrorCategory::Outage)
                    .message("Guzo is not available at the moment. Please try again later.")
            }),
            category => ApiError::new(category.clone()),
        }
    }
}

impl<C> From<Error<C>> for guzo_api_types::Error {
    fn from(value: Error<C>) -> Self {
        value.into_api_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error as ThisError;

    #[derive(Debug, ThisError)]
    #[error("could not frobnicate")]
    struct Frobnicate;

    #[derive(Debug, ThisError)]
    #[error("upstream broke")]
    struct Upstream;

    #[test]
    fn keeps_category_through_context_changes() {
        let error = Error::new(ErrorCategory::NotFound, Upstream)
            .attach_printable("while looking up a trip")
            .change_context(Frobnicate);

        assert_eq!(error.get_category(), &ErrorCategory::NotFound);
        assert!(error.has::<Upstream>());
        assert!(error.has::<Frobnicate>());
    }

    #[test]
    fn current_context_is_the_newest_frame() {
        let error = Error::unknown(Upstream).change_context(Frobnicate);
        error.current_context();

        let rendered = format!("{error}");
        assert!(rendered.contains("could not frobnicate"));
    }

    #[test]
    fn unknown_category_hides_details_from_api() {
        let api = Error::unknown(Upstream).into_api_error();
        assert_eq!(api.category, ErrorCategory::Unknown);
        assert!(api.message.is_some());
    }
}
