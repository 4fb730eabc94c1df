//! The parsed, uninstantiated form of an SRC subroutine. Grounded on
//! `compiler::read`'s top-level brace-counting scan loop combined
//! with `compiler::parse::Parser`'s struct-with-static-entry-point
//! shape: `Prototype::parse_top_level`/`parse_lambda` are the static
//! entry points, `Prototype` itself is the plain owned record.

use std::collections::HashMap;
use std::rc::Rc;

use crate::common::source::Source;
use crate::common::span::Span;
use crate::condition::parse_template_args;
use crate::dialect::DialectTable;
use crate::diagnostic::CompileError;
use crate::scanner::strip_line_comment;

/// The parsed, uninstantiated form of an SRC subroutine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub template_params: Vec<String>,
    pub is_slicing: bool,
    pub body_text: String,
    pub source: Rc<Source>,
    pub line_of_definition: usize,
    pub ending_line: usize,
    /// True iff `template_params` is empty, `is_slicing` is false,
    /// and this prototype is not a lambda — such prototypes are
    /// compiled eagerly at top level even without an explicit caller.
    pub top_level_implicit: bool,
}

impl Prototype {
    pub fn definition_span(&self) -> Span {
        Span::new(&self.source, self.line_of_definition)
    }

    /// Parses a top-level `fn name[(params)] [slicing] { body }`
    /// declaration starting at `define_line`. `lines` is the whole
    /// source file, one entry per line, comments and indentation
    /// untouched (normalization happens once the body range is
    /// known).
    pub fn parse_top_level(
        source: &Rc<Source>,
        lines: &[&str],
        define_line: usize,
        registry: &HashMap<String, Rc<Prototype>>,
        dialect: &DialectTable,
    ) -> Result<Prototype, CompileError> {
        let span_at = |line: usize| Span::new(source, line);

        let header = lines[define_line];
        let (template_params, _) = parse_template_args(header, &span_at(define_line))?;

        let mut name = strip_line_comment(header);
        name = name.strip_prefix("fn ").ok_or_else(|| {
            CompileError::error("syntax error - expected 'fn' declaration", span_at(define_line))
        })?;
        name = name.trim().trim_end_matches('{').trim();

        let is_slicing = if let Some(stripped) = name.strip_suffix("slicing") {
            let stripped = stripped.trim_end();
            if stripped.len() == name.len() {
                false
            } else {
                name = stripped;
                true
            }
        } else {
            false
        };

        let name = name.split('(').next().unwrap_or(name).trim().to_string();

        if name.contains(' ') {
            return Err(CompileError::error(
                "syntax error - fn name cannot contain spaces",
                span_at(define_line),
            ));
        }
        if dialect.is_reserved(&name) {
            return Err(CompileError::error(
                format!("\"{}\" is a reserved keyword by karel-lang", name),
                span_at(define_line),
            ));
        }
        if let Some(existing) = registry.get(&name) {
            return Err(CompileError::error(
                format!(
                    "redefinition of fn \"{}\" first defined at {}:{}",
                    name,
                    existing.source.path.display(),
                    existing.line_of_definition + 1
                ),
                span_at(define_line),
            ));
        }

        let end_line = find_closing_brace(lines, define_line, true, source)?;
        let body_text = normalize_body(lines, define_line, end_line);

        let top_level_implicit = template_params.is_empty() && !is_slicing;

        Ok(Prototype {
            name,
            template_params,
            is_slicing,
            body_text,
            source: Rc::clone(source),
            line_of_definition: define_line,
            ending_line: end_line,
            top_level_implicit,
        })
    }

    /// Parses an anonymous lambda body at `define_line`, auto-named
    /// `<enclosing_name>_lambda_n<lambda_index>`. `is_slicing` is
    /// inherited unconditionally from whether the enclosing instance
    /// has an active continuation, per spec §9's open-question
    /// resolution (the original does this unconditionally, not only
    /// when the lambda body actually uses `commit`).
    pub fn parse_lambda(
        source: &Rc<Source>,
        lines: &[&str],
        define_line: usize,
        enclosing_name: &str,
        lambda_index: usize,
        is_slicing: bool,
    ) -> Result<Prototype, CompileError> {
        let name = format!("{}_lambda_n{}", enclosing_name, lambda_index);
        let end_line = find_closing_brace(lines, define_line, false, source)?;
        let body_text = normalize_body(lines, define_line, end_line);

        Ok(Prototype {
            name,
            template_params: Vec::new(),
            is_slicing,
            body_text,
            source: Rc::clone(source),
            line_of_definition: define_line,
            ending_line: end_line,
            top_level_implicit: false,
        })
    }
}

/// Scans forward from `define_line` counting `{`/`}`, returning the
/// line index of the matching close. When `require_trailing_newline`
/// is set (top-level prototypes only — lambdas may have trailing
/// template-argument syntax on the same line), the closing `}` must
/// be the last non-comment character on its line.
fn find_closing_brace(
    lines: &[&str],
    define_line: usize,
    require_trailing_newline: bool,
    source: &Rc<Source>,
) -> Result<usize, CompileError> {
    let mut depth = 0i32;

    for (offset, line) in lines[define_line..].iter().enumerate() {
        let code = strip_line_comment(line);
        for (col, ch) in line.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end_line = define_line + offset;
                        if require_trailing_newline && col + 1 != code.len() {
                            return Err(CompileError::error(
                                "syntax error - expected a new line after fn final '}'",
                                Span::new(source, end_line),
                            ));
                        }
                        return Ok(end_line);
                    }
                    if depth < 0 {
                        return Err(CompileError::error(
                            "syntax error - unexpected '}' before any '{'",
                            Span::new(source, define_line + offset),
                        ));
                    }
                },
                _ => {},
            }
        }
    }

    Err(CompileError::error(
        "syntax error - fn never closed (did you forget a '}'?)",
        Span::new(source, lines.len().saturating_sub(1)),
    ))
}

/// Strips comments and trims each body line, joining with `\n`
/// preserved so line numbers can still be tracked during body
/// compilation.
fn normalize_body(lines: &[&str], define_line: usize, end_line: usize) -> String {
    lines[define_line..=end_line]
        .iter()
        .map(|l| strip_line_comment(l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    fn src(text: &str) -> Rc<Source> {
        Source::source(text)
    }

    #[test]
    fn parses_plain_fn_header() {
        let text = "fn main {\n    step;\n}\n";
        let source = src(text);
        let lines: Vec<&str> = source.lines();
        let dialect = DialectTable::default();
        let proto =
            Prototype::parse_top_level(&source, &lines, 0, &HashMap::new(), &dialect).unwrap();
        assert_eq!(proto.name, "main");
        assert!(proto.template_params.is_empty());
        assert!(!proto.is_slicing);
        assert!(proto.top_level_implicit);
    }

    #[test]
    fn parses_templated_header() {
        let text = "fn wrap(dir) {\n    left;\n}\n";
        let source = src(text);
        let lines: Vec<&str> = source.lines();
        let dialect = DialectTable::default();
        let proto =
            Prototype::parse_top_level(&source, &lines, 0, &HashMap::new(), &dialect).unwrap();
        assert_eq!(proto.name, "wrap");
        assert_eq!(proto.template_params, vec!["dir".to_string()]);
        assert!(!proto.top_level_implicit);
    }

    #[test]
    fn parses_slicing_marker() {
        let text = "fn over_wall slicing {\n    commit;\n}\n";
        let source = src(text);
        let lines: Vec<&str> = source.lines();
        let dialect = DialectTable::default();
        let proto =
            Prototype::parse_top_level(&source, &lines, 0, &HashMap::new(), &dialect).unwrap();
        assert_eq!(proto.name, "over_wall");
        assert!(proto.is_slicing);
        assert!(!proto.top_level_implicit);
    }

    #[test]
    fn rejects_trailing_content_after_close_brace() {
        let text = "fn main { step; } left;\n";
        let source = src(text);
        let lines: Vec<&str> = source.lines();
        let dialect = DialectTable::default();
        assert!(Prototype::parse_top_level(&source, &lines, 0, &HashMap::new(), &dialect).is_err());
    }

    #[test]
    fn rejects_redefinition() {
        let text = "fn main {\n    step;\n}\n";
        let source = src(text);
        let lines: Vec<&str> = source.lines();
        let dialect = DialectTable::default();
        let first =
            Prototype::parse_top_level(&source, &lines, 0, &HashMap::new(), &dialect).unwrap();
        let mut registry = HashMap::new();
        registry.insert(first.name.clone(), Rc::new(first));
        assert!(Prototype::parse_top_level(&source, &lines, 0, &registry, &dialect).is_err());
    }
}
