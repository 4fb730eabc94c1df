//! The two small sub-parsers spec §4.4 calls out on their own:
//! `is_X`/`not_X` conditions, and comma-separated template/call
//! argument lists. Grounded on `compiler::read`'s nested-parenthesis
//! `form()` scanning (depth-tracked splitting on top-level
//! separators) and `construct::token`'s `ResIden`/`ResOp::try_new`
//! fixed-atom lookup pattern.

use crate::common::span::Span;
use crate::dialect::DialectTable;
use crate::diagnostic::CompileError;
use crate::scanner::Scanner;

/// Parses a condition expression (the text after `if `/`while `) into
/// its translated `IS <ATOM>`/`ISNOT <ATOM>` text and the number of
/// source characters it consumed, so the caller can check nothing
/// but whitespace follows before the `{`.
pub fn parse_condition(
    dialect: &DialectTable,
    text: &str,
    span: &Span,
) -> Result<(String, usize), CompileError> {
    let (negate, rest, prefix_len) = if let Some(rest) = text.strip_prefix("is_") {
        (false, rest, 3)
    } else if let Some(rest) = text.strip_prefix("not_") {
        (true, rest, 4)
    } else {
        return Err(CompileError::error(
            "syntax error - condition must start with 'is_' or 'not_'",
            span.clone(),
        ));
    };

    for atom in crate::dialect::CONDITION_ATOMS {
        if let Some(after) = rest.strip_prefix(atom) {
            if after.starts_with(' ') || after.is_empty() {
                let translated = dialect.condition(negate, atom).expect("atom is in CONDITION_ATOMS");
                return Ok((translated, prefix_len + atom.len()));
            }
        }
    }

    Err(CompileError::error(
        format!("syntax error - unknown condition \"{}\"", text.trim()),
        span.clone(),
    ))
}

/// Parses a template/call argument list: `(a, b, c)` appearing
/// anywhere in `text`. If `text` contains no `(`, returns an empty
/// tuple and zero consumed (no template args used). Otherwise finds
/// the matching `)` (tracking nested-parenthesis depth for arguments
/// that themselves contain parens), splits on top-level commas,
/// trims each, and rejects empty arguments — unless the whole list is
/// textually empty (`()`, the canonical "no templates" spelling).
/// Returns the parsed arguments and the index, within `text`, of the
/// matching `)`.
pub fn parse_template_args(
    text: &str,
    span: &Span,
) -> Result<(Vec<String>, usize), CompileError> {
    let chars: Vec<char> = text.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            ')' => {
                return Err(CompileError::error(
                    "syntax error - unexpected ')' before '(' in a call expression",
                    span.clone(),
                ))
            },
            '(' => break,
            _ => i += 1,
        }
    }

    if i == chars.len() {
        return Ok((Vec::new(), 0));
    }

    i += 1;
    let mut j = i;
    let mut depth = 1usize;
    let mut args = Vec::new();
    let mut start = i;

    loop {
        if j == chars.len() {
            return Err(CompileError::error(
                "unexpected end of file - template args expression never closed",
                span.clone(),
            ));
        }

        match chars[j] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    args.push(chars[start..j].iter().collect::<String>());
                    break;
                }
            },
            ',' if depth == 1 => {
                args.push(chars[start..j].iter().collect::<String>());
                start = j + 1;
            },
            _ => {},
        }
        j += 1;
    }

    let trimmed: Vec<String> = args.iter().map(|a| a.trim().to_string()).collect();

    if trimmed.len() == 1 && trimmed[0].is_empty() {
        // `()` — the canonical "no templates" spelling.
        return Ok((Vec::new(), j));
    }

    for (idx, arg) in trimmed.iter().enumerate() {
        if arg.is_empty() {
            return Err(CompileError::error(
                format!("syntax error - missing template argument at position {}", idx + 1),
                span.clone(),
            ));
        }
    }

    Ok((trimmed, j))
}

/// Re-exposed for callers that just need a balanced-parens scan
/// without the argument-list semantics above (e.g. skipping a
/// lambda's trailing call syntax before re-parsing it as arguments).
pub fn skip_balanced_parens(scanner: &mut Scanner) -> Option<String> {
    scanner.read_balanced_parens()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;
    use std::rc::Rc;

    fn span() -> Span {
        Span::new(&Rc::new(Source::source("")), 0)
    }

    #[test]
    fn parses_positive_condition() {
        let d = DialectTable::pykarel_kvm();
        let (text, len) = parse_condition(&d, "is_wall {", &span()).unwrap();
        assert_eq!(text, "IS WALL");
        assert_eq!(len, 7);
    }

    #[test]
    fn parses_negated_condition() {
        let d = DialectTable::pykarel_kvm();
        let (text, _) = parse_condition(&d, "not_wall {", &span()).unwrap();
        assert_eq!(text, "ISNOT WALL");
    }

    #[test]
    fn rejects_bad_prefix() {
        let d = DialectTable::pykarel_kvm();
        assert!(parse_condition(&d, "maybe_wall", &span()).is_err());
    }

    #[test]
    fn empty_template_args_is_canonical_no_templates() {
        let (args, consumed) = parse_template_args("wrap()", &span()).unwrap();
        assert!(args.is_empty());
        assert!(consumed > 0);
    }

    #[test]
    fn no_parens_means_zero_consumed() {
        let (args, consumed) = parse_template_args("wrap", &span()).unwrap();
        assert!(args.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn splits_on_top_level_commas_only() {
        let (args, _) = parse_template_args("wrap(a, (b, c), d)", &span()).unwrap();
        assert_eq!(args, vec!["a", "(b, c)", "d"]);
    }

    #[test]
    fn rejects_empty_argument() {
        assert!(parse_template_args("wrap(a, , b)", &span()).is_err());
    }
}
