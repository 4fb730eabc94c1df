//! Hand-rolled diagnostics, in the shape of `compiler::syntax::Syntax`/
//! `Note`: no general-purpose error crate, just a reason plus spans.

use std::fmt;

use crate::common::span::Span;

/// A note attached to a `CompileError`: a location plus an optional
/// hint specific to that location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub span: Span,
    pub hint: Option<String>,
}

impl Note {
    pub fn new(span: Span) -> Note {
        Note { span, hint: None }
    }

    pub fn new_with_hint(span: Span, hint: &str) -> Note {
        Note { span, hint: Some(hint.to_string()) }
    }
}

/// Whether a `CompileError` is a hard error or a warning that may be
/// promoted, printed, or dropped depending on the active `WarnPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A static error (syntax, semantic, or a warning-turned-error) found
/// during compilation. Carries enough of the source to render a
/// `±2`-line context window without re-reading the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub severity: Severity,
    pub message: String,
    pub note: Note,
}

impl CompileError {
    pub fn error(message: impl Into<String>, span: Span) -> CompileError {
        CompileError { severity: Severity::Error, message: message.into(), note: Note::new(span) }
    }

    pub fn error_with_hint(message: impl Into<String>, span: Span, hint: &str) -> CompileError {
        CompileError {
            severity: Severity::Error,
            message: message.into(),
            note: Note::new_with_hint(span, hint),
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> CompileError {
        CompileError { severity: Severity::Warning, message: message.into(), note: Note::new(span) }
    }

    pub fn source_file(&self) -> std::path::PathBuf {
        self.note.span.source.path.clone()
    }

    pub fn line_index(&self) -> usize {
        self.note.span.line
    }

    /// The `±2`-line window around the offending line, 1-indexed,
    /// clamped to file bounds. The core computes this; only the CLI
    /// decides how to color or box it.
    pub fn context_lines(&self) -> Vec<(usize, String)> {
        self.note.span.context_lines(2)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }

    /// `-W err`: turns a warning into a hard error in place.
    pub fn promote_to_error(mut self) -> CompileError {
        self.severity = Severity::Error;
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} at {}: {}", kind, self.note.span, self.message)?;
        if let Some(ref hint) = self.note.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// A failure to open, read, or write a file. Distinct from
/// `CompileError` because it carries no source position.
#[derive(Debug)]
pub struct IoError {
    pub path: std::path::PathBuf,
    pub reason: String,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io error on {}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for IoError {}

/// The two ways a compilation run can fail. `compile_program` and
/// everything it calls propagate this, never panicking on user input.
#[derive(Debug)]
pub enum KarelError {
    Compile(CompileError),
    Io(IoError),
}

impl fmt::Display for KarelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KarelError::Compile(e) => write!(f, "{}", e),
            KarelError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for KarelError {}

impl From<CompileError> for KarelError {
    fn from(e: CompileError) -> Self {
        KarelError::Compile(e)
    }
}

impl From<IoError> for KarelError {
    fn from(e: IoError) -> Self {
        KarelError::Io(e)
    }
}

/// Escalation policy for warnings, set once from `-W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnPolicy {
    /// `-W none`: drop warnings silently.
    None,
    /// `-W all` (default): collect warnings, keep compiling.
    All,
    /// `-W err`: the first warning becomes a hard `CompileError`.
    Err,
}
