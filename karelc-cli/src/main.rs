//! The out-of-scope front-end (spec §1): argument parsing, output
//! writing, and colored diagnostic rendering around the `karelc`
//! library's pure compilation engine. Grounded on
//! `passerine-aspen/src/main.rs`'s "parse args, dispatch, log fatal on
//! error" shape.

pub mod cli;
pub mod status;

use std::fs;
use std::process::ExitCode;

use structopt::StructOpt;

use karelc::{build_search_dirs, compile_program, DialectTable, KarelError, Options, WarnPolicy};

use crate::cli::Opt;
use crate::status::Status;

fn warn_policy_from_str(s: &str) -> Result<WarnPolicy, String> {
    match s {
        "none" => Ok(WarnPolicy::None),
        "all" => Ok(WarnPolicy::All),
        "err" => Ok(WarnPolicy::Err),
        other => Err(format!("unknown warning policy \"{}\" (expected none, all, or err)", other)),
    }
}

fn run(opt: Opt) -> Result<(), String> {
    if opt.inputs.is_empty() {
        return Err("the following required arguments were not provided: <inputs>...".to_string());
    }

    let warn_policy = warn_policy_from_str(&opt.warn_policy)?;
    let dialect = DialectTable::by_name(&opt.dialect)
        .ok_or_else(|| format!("unknown karel-lang dialect \"{}\"", opt.dialect))?;

    let options = Options {
        warn_policy,
        max_for_loop_count: opt.max_for_loop_count,
        dialect,
        debug_names: opt.debug_names,
    };

    let search_dirs = build_search_dirs(&opt.include);

    let output = compile_program(&opt.inputs, options, search_dirs).map_err(|e| match e {
        KarelError::Compile(err) => render_compile_error(&err),
        KarelError::Io(err) => err.to_string(),
    })?;

    for warning in &output.warnings {
        Status::warn().log(&render_compile_error(warning));
    }

    if opt.dump_registries() {
        Status::info().log(&format!("{} file(s) compiled", output.files_compiled));
        Status::info().log(&format!("fn prototypes: {:?}", output.registry.prototypes));
        Status::info().log(&format!("fn instances (name -> emitted_name): {:?}", output.registry.instances));
    }

    fs::write(&opt.output, output.rendered)
        .map_err(|e| format!("failed to write output to {}: {}", opt.output.display(), e))?;

    Ok(())
}

/// Renders a `CompileError` with its `±2`-line source window, the
/// offending line highlighted — the one piece of diagnostic rendering
/// spec §1 keeps out of the core's hands.
fn render_compile_error(err: &karelc::CompileError) -> String {
    let mut out = format!("{}", err);
    out.push('\n');
    let offending = err.line_index();
    for (line_no, text) in err.context_lines() {
        let marker = if line_no == offending + 1 { ">" } else { " " };
        out.push_str(&format!("{} {:>5} | {}\n", marker, line_no, text));
    }
    out
}

fn main() -> ExitCode {
    let args = cli::normalize_argv(std::env::args());
    let opt = Opt::from_iter(args);

    if opt.wants_version() && !opt.dump_registries() {
        println!("karelc {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    match run(opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            Status::fatal().log(&message);
            ExitCode::FAILURE
        },
    }
}
