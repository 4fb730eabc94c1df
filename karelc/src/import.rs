//! The Import Driver: walks `import <file>;` directives against an
//! ordered list of search directories (`.` always first, then any
//! `-I` directories in the order given), recursively compiling each
//! newly-discovered file exactly once. Grounded on
//! `compile_source_file`'s `source_file_compiled` dict, which is
//! keyed on `realpath` and holds `False` for "in progress" and `True`
//! for "done" — re-expressed here as an explicit two-variant enum
//! instead of overloading a bool, since "in progress" and "not yet
//! seen" are different states even though the original collapses them
//! (absence from the dict means not-yet-seen; presence-with-`False`
//! means in-progress).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Progress state of a single source file as tracked by canonical
/// path. Absence from the map means "never encountered".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    InProgress,
    Done,
}

/// Tracks which source files have been (or are being) compiled, and
/// resolves `import` directives against the ordered search path.
#[derive(Debug, Default)]
pub struct ImportDriver {
    progress: HashMap<PathBuf, ImportState>,
    /// Search directories, in the order they are tried. The Session
    /// that owns this driver is responsible for putting `.` first.
    pub search_dirs: Vec<PathBuf>,
}

/// What the caller should do in response to resolving an `import`.
pub enum Resolution {
    /// Newly discovered — the caller must now parse and compile this
    /// file before continuing with the importer.
    Compile(PathBuf),
    /// Already fully compiled — nothing further to do.
    AlreadyDone,
}

impl ImportDriver {
    pub fn new(search_dirs: Vec<PathBuf>) -> ImportDriver {
        ImportDriver { progress: HashMap::new(), search_dirs }
    }

    pub fn begin(&mut self, canonical_path: PathBuf) {
        self.progress.insert(canonical_path, ImportState::InProgress);
    }

    pub fn finish(&mut self, canonical_path: &Path) {
        self.progress.insert(canonical_path.to_path_buf(), ImportState::Done);
    }

    pub fn state_of(&self, canonical_path: &Path) -> Option<ImportState> {
        self.progress.get(canonical_path).copied()
    }

    /// Resolves a single `import <import_file>;` directive. Tries
    /// every search directory in order (unlike the original, which
    /// keeps scanning all search directories even after a match —
    /// so a file present under two search directories is compiled, or
    /// found done, once per directory it appears under — we preserve
    /// that exact behavior here, since the original's "found" flag is
    /// only used to decide the final not-found error, not to
    /// short-circuit the loop).
    pub fn resolve(&mut self, import_file: &str) -> Result<Vec<Resolution>, ImportError> {
        let mut resolutions = Vec::new();
        let mut found = false;

        for dir in self.search_dirs.clone() {
            let candidate = dir.join(import_file);
            if !candidate.exists() {
                continue;
            }

            let canonical = candidate.canonicalize().unwrap_or(candidate);
            match self.progress.get(&canonical) {
                None => {
                    found = true;
                    resolutions.push(Resolution::Compile(canonical));
                },
                Some(ImportState::Done) => {
                    found = true;
                    resolutions.push(Resolution::AlreadyDone);
                },
                Some(ImportState::InProgress) => {
                    return Err(ImportError::Cyclical(import_file.to_string()));
                },
            }
        }

        if !found {
            return Err(ImportError::NotFound(import_file.to_string()));
        }

        Ok(resolutions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    Cyclical(String),
    NotFound(String),
}

impl ImportError {
    pub fn message(&self) -> String {
        match self {
            ImportError::Cyclical(file) => format!("cyclical import of source file \"{}\"", file),
            ImportError::NotFound(file) => {
                format!("source file to be imported \"{}\" not found", file)
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn not_found_when_no_search_dir_has_it() {
        let dir = std::env::temp_dir().join("karelc_import_test_missing");
        let _ = fs::create_dir_all(&dir);
        let mut driver = ImportDriver::new(vec![dir]);
        let err = driver.resolve("does_not_exist.src").unwrap_err();
        assert_eq!(err, ImportError::NotFound("does_not_exist.src".to_string()));
    }

    #[test]
    fn resolves_new_file_as_compile() {
        let dir = std::env::temp_dir().join("karelc_import_test_new");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("lib.src");
        fs::write(&file, "fn main {}\n").unwrap();

        let mut driver = ImportDriver::new(vec![dir]);
        let resolutions = driver.resolve("lib.src").unwrap();
        assert_eq!(resolutions.len(), 1);
        assert!(matches!(resolutions[0], Resolution::Compile(_)));
    }

    #[test]
    fn cyclical_import_is_rejected() {
        let dir = std::env::temp_dir().join("karelc_import_test_cycle");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("a.src");
        fs::write(&file, "fn main {}\n").unwrap();
        let canonical = file.canonicalize().unwrap();

        let mut driver = ImportDriver::new(vec![dir]);
        driver.begin(canonical);
        let err = driver.resolve("a.src").unwrap_err();
        assert_eq!(err, ImportError::Cyclical("a.src".to_string()));
    }

    #[test]
    fn done_file_resolves_without_recompiling() {
        let dir = std::env::temp_dir().join("karelc_import_test_done");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("a.src");
        fs::write(&file, "fn main {}\n").unwrap();
        let canonical = file.canonicalize().unwrap();

        let mut driver = ImportDriver::new(vec![dir]);
        driver.begin(canonical.clone());
        driver.finish(&canonical);
        let resolutions = driver.resolve("a.src").unwrap();
        assert!(matches!(resolutions[0], Resolution::AlreadyDone));
    }
}
