//! Datastructures shared across every compiler stage: source text
//! ownership and span annotations used by diagnostics.

pub mod source;
pub mod span;

pub use source::Source;
pub use span::{Span, Spanned};
