use std::fmt;

use crate::internal::FrameKind;
use crate::Error;

impl<C> fmt::Display for Error<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut frames = self.inner.frames.iter();
        let Some(newest) = frames.next() else {
            return f.write_str("<empty error>");
        };

        write!(f, "{}", newest.message)?;
        for frame in frames {
            write!(f, ": {}", frame.message)?;
        }
        Ok(())
    }
}

impl<C> fmt::Debug for Error<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.inner.category)?;

        for (index, frame) in self.inner.frames.iter().enumerate() {
            let marker = match frame.kind {
                FrameKind::Context(..) => "─▶",
                FrameKind::Printable => "──",
            };

            if index == 0 {
                writeln!(f, "{marker} {}", frame.message)?;
            } else {
                writeln!(f, "╰{marker} {}", frame.message)?;
            }
            writeln!(f, "   at {}", frame.location)?;
        }

        Ok(())
    }
}
