use guzo_api_types::ErrorCategory;
use std::any::Any;
use std::panic::Location;
use tracing::Span;

/// Tag used for [`Error`] to indicate that this is an error with no
/// context type.
///
/// This also allows us to implement convenient functions that can
/// handle both contextless and contextual errors.
///
/// [`Error`]: crate::Error
pub struct NoContext;

pub(crate) enum FrameKind {
    /// A typed context object, downcastable later.
    Context(Box<dyn Any + Send + Sync>),
    /// A printable attachment with no typed payload.
    Printable,
}

pub(crate) struct Frame {
    pub kind: FrameKind,
    /// Rendered at attach time so the frame stays printable after
    /// the typed object is erased.
    pub message: String,
    pub location: &'static Location<'static>,
}

pub(crate) struct ErrorInner {
    pub category: ErrorCategory,
    pub span: Span,
    /// Newest frame first.
    pub frames: Vec<Frame>,
}

impl ErrorInner {
    #[must_use]
    pub fn boxed(category: ErrorCategory, frame: Frame) -> Box<Self> {
        Box::new(Self {
            category,
            span: Span::current(),
            frames: vec![frame],
        })
    }
}
