//! The Instance Compiler's datatypes: `Instance` (a monomorphization of
//! a `Prototype`), `Callable` (an indirection to a continuation target),
//! and `CallLocation` (everything the compiler needs to instantiate a
//! callee). Grounded on `FnInstanceAst`/`CallableAst`/`CallLocationAst`
//! in `examples/original_source/numka.py`, re-expressed as owned Rust
//! records the way `construct::tree`/`scope` hold plain structs with a
//! non-owning back-reference rather than dynamically-typed dataclasses.

pub mod compile;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::span::Span;
use crate::prototype::Prototype;

/// An indirection to a continuation target: either a full `Instance` or
/// one specific segment of one. `display_name` is only used in
/// diagnostics; `emitted_name` is what a `commit` statement actually
/// calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callable {
    pub display_name: String,
    pub emitted_name: String,
}

/// One emitted TGT subroutine: a header (its `emitted_name`) plus the
/// already-indented body lines beneath it. Slicing instances produce
/// one `Segment` per `push`/`pop` pair plus the residual tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub emitted_name: String,
    pub lines: Vec<String>,
}

/// The input to `compile::compile_fn`: template values, inherited
/// bindings, the active continuation, and caller source coordinates
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct CallLocation {
    pub template_values: Vec<String>,
    pub inherited_values: Vec<String>,
    pub inherited_params: Vec<String>,
    pub continuation: Option<Callable>,
    pub caller_name: String,
    pub call_site: Span,
}

/// A monomorphization of a `Prototype`, bound to specific template
/// values and an optional continuation. Reachable only by its cache
/// key (§3's Instance registry) or through a call chain rooted at a
/// `top_level_implicit` compilation.
#[derive(Debug, Clone)]
pub struct Instance {
    pub prototype: Rc<Prototype>,
    pub emitted_name: String,
    pub template_values: Vec<String>,
    pub inherited_values: Vec<String>,
    pub inherited_params: Vec<String>,
    pub continuation: Option<Callable>,
    pub segments: Vec<Segment>,
    /// Lambda instances compiled while walking this instance's body, in
    /// the order they were first encountered. Kept for `-vv` dumps; the
    /// instances themselves also live in the shared instance cache.
    pub owned_lambdas: Vec<String>,
}

impl Instance {
    pub fn as_callable(&self) -> Callable {
        Callable { display_name: self.prototype.name.clone(), emitted_name: self.emitted_name.clone() }
    }
}

/// The process-wide Instance cache: deduplication key (§4.5) to the
/// shared, interior-mutable `Instance` it names. `Rc<RefCell<_>>`
/// because a self-`recall` must be able to look up and reference an
/// instance whose body is still being compiled (the cache entry is
/// inserted before compilation starts, precisely so that lookup
/// terminates recursion instead of looping forever).
pub type InstanceCache = HashMap<String, Rc<RefCell<Instance>>>;
