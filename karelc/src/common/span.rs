use std::fmt::{self, Display};
use std::rc::Rc;

use crate::common::source::Source;

/// A `Span` pins a single location (a source file plus a 0-indexed
/// line) for use in diagnostics. Unlike the byte-offset spans used by
/// expression-oriented languages, karelc's source statements are
/// inherently line-addressed — every error and warning the original
/// compiler raises is reported against a line index, never a column
/// range — so that's the granularity we carry through `CallLocation`
/// and `CompileError` alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub source: Rc<Source>,
    pub line: usize,
}

impl Span {
    pub fn new(source: &Rc<Source>, line: usize) -> Span {
        Span { source: Rc::clone(source), line }
    }

    /// The widened `[-radius, +radius]` window of lines around this
    /// span's line, clamped to the source's bounds, 1-indexed for
    /// display.
    pub fn context_lines(&self, radius: usize) -> Vec<(usize, String)> {
        let lines = self.source.lines();
        let lo = self.line.saturating_sub(radius);
        let hi = (self.line + radius).min(lines.len().saturating_sub(1));

        (lo..=hi)
            .filter(|&i| i < lines.len())
            .map(|i| (i + 1, lines[i].to_string()))
            .collect()
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.path.display(), self.line + 1)
    }
}

/// A wrapper for spanning types, e.g. a token produced by the
/// scanner, so later stages can still report where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}
