//! Argument parsing. Grounded on `passerine-aspen/src/cli.rs`'s
//! `#[derive(StructOpt)]` shape; the flag set itself is spec §6's CLI
//! surface, preserved verbatim for compatibility. `-lmax-for-loop-count`
//! and `-lkarel-lang-dialect` are single-dash in the original `argparse`
//! front-end; `structopt`/clap's derive has no attribute for a literal
//! single-dash multi-character flag, so `Opt` registers the `--`-prefixed
//! form and `normalize_argv` rewrites the one-dash spelling into it
//! before argv reaches the derived parser (see `main.rs`).

use std::path::PathBuf;

use structopt::clap::AppSettings;
use structopt::StructOpt;

/// Required so our own `-v`/`-vv` counting flag (spec §6: "`-v` prints
/// version and exits zero, `-vv` dumps registries") owns both
/// meanings of the flag instead of colliding with structopt's default
/// auto-generated `--version`/`-V`.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "karelc",
    bin_name = "karelc",
    about = "A compiler from a templated procedural language to the flat karel-lang robot language.",
    global_settings = &[AppSettings::DisableVersion]
)]
pub struct Opt {
    /// One or more SRC source files to compile. Not marked `required`
    /// at the parser level so that `karelc -v` (no inputs) still works
    /// to print the version and exit — `main` enforces "at least one
    /// input" itself once it knows `-v`/`--version` wasn't requested.
    #[structopt(parse(from_os_str))]
    pub inputs: Vec<PathBuf>,

    /// Warning policy: suppress, print, or promote-to-error.
    #[structopt(short = "W", long = "warn-policy", default_value = "all")]
    pub warn_policy: String,

    /// TGT output path.
    #[structopt(short = "o", long = "output", default_value = "out.kl", parse(from_os_str))]
    pub output: PathBuf,

    /// Append a directory to the import search path (repeatable). `.`
    /// is always tried first, regardless of this list.
    #[structopt(short = "I", long = "include", parse(from_os_str))]
    pub include: Vec<PathBuf>,

    /// Emit human-readable emitted_names instead of the opaque hashed
    /// form, for inspection.
    #[structopt(short = "g", long = "debug-names")]
    pub debug_names: bool,

    /// `-v` once: print the version and exit zero. `-vv`: also dump
    /// the prototype registry and instance cache after a successful
    /// compilation. `--version` is a synonym for a single `-v`.
    #[structopt(short = "v", long = "version", parse(from_occurrences))]
    pub verbosity: u64,

    /// Safe maximum for `for` loop counts; exceeding it warns.
    #[structopt(long = "lmax-for-loop-count", default_value = "65535")]
    pub max_for_loop_count: i64,

    /// Select the dialect table by name (`PyKarel/Kvm` or `VisK99`).
    #[structopt(long = "lkarel-lang-dialect", default_value = "PyKarel/Kvm")]
    pub dialect: String,
}

impl Opt {
    pub fn wants_version(&self) -> bool {
        self.verbosity >= 1
    }

    pub fn dump_registries(&self) -> bool {
        self.verbosity >= 2
    }
}

/// The original's verbatim single-dash spelling for these two flags
/// (`original_source/numka.py`'s own `argparse` options really are
/// single-dash). `structopt`'s `long(...)` can only ever register a
/// `--`-prefixed flag — there is no derive attribute for a literal
/// single-dash multi-character flag — so the one-dash spelling is
/// restored here by rewriting matching argv tokens to their `--`
/// equivalent before they ever reach `Opt::from_iter`.
const SINGLE_DASH_LONG_FLAGS: [&str; 2] = ["-lmax-for-loop-count", "-lkarel-lang-dialect"];

/// Rewrites any argv token spelled as one of `SINGLE_DASH_LONG_FLAGS`
/// (bare, or with a `=value` suffix) into its `--`-prefixed form.
/// Every other token, including the source file positionals and every
/// other flag, passes through untouched.
pub fn normalize_argv(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            for flag in SINGLE_DASH_LONG_FLAGS {
                if arg == flag {
                    return format!("-{}", flag);
                }
                let prefix = format!("{}=", flag);
                if let Some(value) = arg.strip_prefix(&prefix) {
                    return format!("-{}={}", flag, value);
                }
            }
            arg
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrites_bare_single_dash_flag() {
        let out = normalize_argv(vec!["-lmax-for-loop-count".to_string(), "100".to_string()]);
        assert_eq!(out, vec!["--lmax-for-loop-count", "100"]);
    }

    #[test]
    fn rewrites_single_dash_flag_with_equals_value() {
        let out = normalize_argv(vec!["-lkarel-lang-dialect=VisK99".to_string()]);
        assert_eq!(out, vec!["--lkarel-lang-dialect=VisK99"]);
    }

    #[test]
    fn leaves_unrelated_args_untouched() {
        let out = normalize_argv(vec!["a.src".to_string(), "-W".to_string(), "err".to_string()]);
        assert_eq!(out, vec!["a.src", "-W", "err"]);
    }

    #[test]
    fn accepts_already_double_dashed_form() {
        let out = normalize_argv(vec!["--lmax-for-loop-count".to_string(), "100".to_string()]);
        assert_eq!(out, vec!["--lmax-for-loop-count", "100"]);
    }
}
