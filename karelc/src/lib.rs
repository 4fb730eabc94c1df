//! karelc: a source-to-source compiler from SRC (a small templated,
//! procedural teaching language with lambdas, tail-`recall`, and
//! stack-slice continuations) to TGT (a flat, label-based, first-order
//! robot language with no parameters, locals, or arithmetic).
//!
//! The crate is a pure library with no I/O or formatting dependencies
//! of its own (matching the teacher's `passerine` core, which knows
//! nothing about terminals or file systems either) — `karelc-cli` is
//! the thin binary that drives it from the command line.

pub mod common;
pub mod condition;
pub mod dialect;
pub mod diagnostic;
pub mod import;
pub mod instance;
pub mod key;
pub mod output;
pub mod prototype;
pub mod scanner;
pub mod session;

use std::path::{Path, PathBuf};

pub use common::source::Source;
pub use common::span::Span;
pub use dialect::DialectTable;
pub use diagnostic::{CompileError, IoError, KarelError, WarnPolicy};
pub use session::{Options, RegistrySnapshot, Session};

/// The result of a successful compilation run: the rendered TGT text,
/// any warnings collected along the way (empty under `-W none`), and a
/// snapshot of the Prototype registry / Instance cache for `-vv`.
pub struct CompileOutput {
    pub rendered: String,
    pub warnings: Vec<CompileError>,
    pub files_compiled: usize,
    pub registry: RegistrySnapshot,
}

/// Compiles `entry_files` (and everything they transitively `import`)
/// into a single TGT program. `search_dirs` are consulted in order for
/// every `import`, after the entry file's own directory; `.` should
/// already be first if the caller wants cwd-relative imports to work
/// (the CLI arranges this — see spec §6).
pub fn compile_program(
    entry_files: &[PathBuf],
    options: Options,
    search_dirs: Vec<PathBuf>,
) -> Result<CompileOutput, KarelError> {
    let mut session = Session::new(options, search_dirs);

    for entry in entry_files {
        session.compile_file(entry)?;
    }

    let registry = session.registry_snapshot();
    Ok(CompileOutput {
        rendered: session.output.render(),
        warnings: session.warnings,
        files_compiled: session.files_compiled(),
        registry,
    })
}

/// Compiles a single in-memory snippet with no backing file and no
/// imports resolvable beyond `search_dirs` — mainly useful for tests
/// and for embedding karelc without touching the filesystem for the
/// entry file itself (it may still `import` real files from disk).
pub fn compile_source(
    source_text: &str,
    options: Options,
    search_dirs: Vec<PathBuf>,
) -> Result<CompileOutput, KarelError> {
    let mut session = Session::new(options, search_dirs);
    session.compile_in_memory(source_text)?;

    let registry = session.registry_snapshot();
    Ok(CompileOutput {
        rendered: session.output.render(),
        warnings: session.warnings,
        files_compiled: session.files_compiled(),
        registry,
    })
}

/// Convenience used by the CLI to build the canonical search path:
/// `.` first, then every `-I` directory in the order given.
pub fn build_search_dirs(extra_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(extra_dirs.iter().cloned());
    dirs
}

pub fn default_output_path() -> &'static Path {
    Path::new("out.kl")
}
