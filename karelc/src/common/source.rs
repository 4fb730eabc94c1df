use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};

/// `Source` represents some literal SRC source code: whether a
/// standalone snippet or a file on disk. It's essentially a string
/// with a path, the path serving as the source's name for
/// diagnostics. Sources without a path point to `./source`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Creates a new `Source` given both an `&str` and a `PathBuf`.
    pub fn new(source: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: source.to_string(),
            path: path.to_owned(),
        })
    }

    /// Build a `Source` from a path, reading the file in full up front
    /// (scoped acquisition: the file is closed immediately after).
    pub fn path(path: &Path) -> std::io::Result<Rc<Source>> {
        let mut source = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut source)?;

        Ok(Source::new(&source, path))
    }

    /// Build a `Source` containing just a string, with no backing file.
    pub fn source(source: &str) -> Rc<Source> {
        Source::new(source, &PathBuf::from("./source"))
    }

    /// The source's lines, split on `\n`, with no trailing newline kept.
    pub fn lines(&self) -> Vec<&str> {
        self.contents.lines().collect()
    }
}
