//! Top-level orchestration: wires the Dialect Table, Import Driver,
//! Prototype Parser, Instance Compiler, and Output Assembler into one
//! process-wide `Session`. Grounded on `compile_source_file`'s
//! per-line top-level dispatch (`import` / `fn` / error) in
//! `examples/original_source/numka.py`, re-expressed as a single owned
//! struct passed by `&mut` rather than a set of Python globals — see
//! spec §5: "never `Rc<RefCell<_>>`" at the *session* level, since
//! nothing here needs shared mutability across threads or tasks (the
//! compiler is single-threaded and synchronous throughout).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::common::source::Source;
use crate::common::span::Span;
use crate::dialect::DialectTable;
use crate::diagnostic::{CompileError, IoError, KarelError, WarnPolicy};
use crate::import::{ImportDriver, ImportError, Resolution};
use crate::instance::compile::compile_fn;
use crate::instance::{CallLocation, InstanceCache};
use crate::output::OutputAssembler;
use crate::prototype::Prototype;
use crate::scanner::strip_line_comment;

/// Configuration built by the CLI from parsed flags (spec §6); the
/// core never reads a config file, matching the teacher's core, which
/// carries no config-file layer either.
#[derive(Debug, Clone)]
pub struct Options {
    pub warn_policy: WarnPolicy,
    pub max_for_loop_count: i64,
    pub dialect: DialectTable,
    /// `-g`: emit human-readable emitted_names instead of the opaque
    /// hashed form.
    pub debug_names: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            warn_policy: WarnPolicy::All,
            max_for_loop_count: 65535,
            dialect: DialectTable::default(),
            debug_names: false,
        }
    }
}

/// A point-in-time dump of the two process-wide registries, for `-vv`
/// inspection. Mirrors the original's `print(defined_fn_prototypes, '\n')`
/// / `print(instaciated_fns, '\n')` pair: the Prototype registry (every
/// declared name) and the Instance cache (key → emitted_name, which are
/// the same string — see `key.rs` — so "name → emitted_name" here means
/// "owning prototype's name → each of its monomorphized emitted_names").
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub prototypes: Vec<String>,
    pub instances: Vec<(String, String)>,
}

/// The process-wide compilation state (spec §5): Prototype registry,
/// Instance cache, output buffer, import progress map, dialect table,
/// and warning policy. Created once per run, mutated throughout, read
/// at the end to emit the output file.
pub struct Session {
    pub prototypes: HashMap<String, Rc<Prototype>>,
    pub instances: InstanceCache,
    pub output: OutputAssembler,
    pub import_driver: ImportDriver,
    pub options: Options,
    pub warnings: Vec<CompileError>,
    files_compiled: usize,
}

impl Session {
    pub fn new(options: Options, search_dirs: Vec<PathBuf>) -> Session {
        Session {
            prototypes: HashMap::new(),
            instances: HashMap::new(),
            output: OutputAssembler::new(),
            import_driver: ImportDriver::new(search_dirs),
            options,
            warnings: Vec::new(),
            files_compiled: 0,
        }
    }

    pub fn files_compiled(&self) -> usize {
        self.files_compiled
    }

    /// Snapshots the Prototype registry and Instance cache for `-vv`.
    /// Sorted so the dump is deterministic across runs, unlike a raw
    /// `HashMap` iteration order.
    pub fn registry_snapshot(&self) -> RegistrySnapshot {
        let mut prototypes: Vec<String> = self.prototypes.keys().cloned().collect();
        prototypes.sort();

        let mut instances: Vec<(String, String)> = self
            .instances
            .values()
            .map(|instance| {
                let instance = instance.borrow();
                (instance.prototype.name.clone(), instance.emitted_name.clone())
            })
            .collect();
        instances.sort();

        RegistrySnapshot { prototypes, instances }
    }

    /// The single place `-g` is consulted when naming a segment: every
    /// other call site just asks the session for a name instead of
    /// branching on `debug_names` itself.
    pub fn make_emitted_name(
        &self,
        proto_name: &str,
        segment_index: usize,
        continuation_emitted_name: Option<&str>,
        template_values: &[String],
        inherited_values: &[String],
    ) -> String {
        if self.options.debug_names {
            crate::key::emitted_name_debug(
                proto_name,
                segment_index,
                continuation_emitted_name,
                template_values,
                inherited_values,
            )
        } else {
            crate::key::emitted_name(
                proto_name,
                segment_index,
                continuation_emitted_name,
                template_values,
                inherited_values,
            )
        }
    }

    /// Chokepoint for every warning site in the compiler (spec §9's
    /// "single `Session::warn` chokepoint rather than scattering the
    /// policy check across call sites"): drops it under `-W none`,
    /// collects it under `-W all`, or promotes it to a hard error
    /// under `-W err`.
    pub fn warn(&mut self, warning: CompileError) -> Result<(), CompileError> {
        match self.options.warn_policy {
            WarnPolicy::None => Ok(()),
            WarnPolicy::All => {
                self.warnings.push(warning);
                Ok(())
            },
            WarnPolicy::Err => Err(warning.promote_to_error()),
        }
    }

    /// Recursively compiles `path` and everything it imports, exactly
    /// once per canonical path. Mirrors `compile_source_file`'s
    /// depth-first per-line dispatch.
    pub fn compile_file(&mut self, path: &Path) -> Result<(), KarelError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.import_driver.begin(canonical.clone());

        let source = Source::path(path).map_err(|e| {
            KarelError::Io(IoError { path: path.to_path_buf(), reason: e.to_string() })
        })?;

        self.compile_source(source)?;
        self.import_driver.finish(&canonical);
        self.files_compiled += 1;
        Ok(())
    }

    /// Compiles an in-memory snippet with no backing file. Imports
    /// inside it still resolve against `self.import_driver`'s search
    /// dirs as usual.
    pub fn compile_in_memory(&mut self, text: &str) -> Result<(), KarelError> {
        let source = Source::source(text);
        self.compile_source(source)
    }

    fn compile_source(&mut self, source: Rc<Source>) -> Result<(), KarelError> {
        let lines: Vec<&str> = source.lines();
        let mut i = 0usize;

        while i < lines.len() {
            let stripped = strip_line_comment(lines[i]);
            if stripped.is_empty() {
                i += 1;
                continue;
            }

            if let Some(rest) = stripped.strip_prefix("import ") {
                let import_file = rest.trim().to_string();
                let resolutions =
                    self.import_driver.resolve(&import_file).map_err(|e| match e {
                        ImportError::Cyclical(_) | ImportError::NotFound(_) => KarelError::Compile(
                            CompileError::error(e.message(), Span::new(&source, i)),
                        ),
                    })?;

                for resolution in resolutions {
                    if let Resolution::Compile(import_path) = resolution {
                        self.compile_file(&import_path)?;
                    }
                }
            } else if stripped.starts_with("fn ") {
                let prototype = Prototype::parse_top_level(
                    &source,
                    &lines,
                    i,
                    &self.prototypes,
                    &self.options.dialect,
                )?;

                let top_level_implicit = prototype.top_level_implicit;
                let ending_line = prototype.ending_line;
                let define_line = prototype.line_of_definition;
                let proto_rc = Rc::new(prototype);
                self.prototypes.insert(proto_rc.name.clone(), Rc::clone(&proto_rc));

                if top_level_implicit {
                    let call_loc = CallLocation {
                        template_values: Vec::new(),
                        inherited_values: Vec::new(),
                        inherited_params: Vec::new(),
                        continuation: None,
                        caller_name: "(top-level)".to_string(),
                        call_site: Span::new(&source, define_line),
                    };
                    compile_fn(self, Rc::clone(&proto_rc), call_loc)?;
                }

                i += ending_line - define_line;
            } else {
                return Err(KarelError::Compile(CompileError::error(
                    "syntax error - expression outside of a fn",
                    Span::new(&source, i),
                )));
            }

            i += 1;
        }

        Ok(())
    }
}
