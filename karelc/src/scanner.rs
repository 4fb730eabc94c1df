//! Character-by-character scanning primitives shared by the prototype
//! parser (top-level brace matching) and the instance compiler (body
//! scanning). Grounded on `compiler::lex::Lexer`'s `remaining()`/
//! `grab_from_index()` cursor shape, adapted from a byte cursor over
//! UTF-8 to a `char` cursor, since SRC bodies are scanned one logical
//! character at a time rather than tokenized up front.

/// Strips a `//` line comment (if any) and trims the remainder. Used
/// while normalizing both top-level lines and prototype bodies.
pub fn strip_line_comment(line: &str) -> &str {
    line.split_once("//").map(|(before, _)| before).unwrap_or(line).trim()
}

/// A `char`-addressed cursor over a body of source text, tracking a
/// 0-indexed line counter as it advances. This is the scanning
/// primitive the instance compiler's statement loop drives directly;
/// it does not itself know about TGT or SRC grammar.
#[derive(Debug, Clone)]
pub struct Scanner {
    chars: Vec<char>,
    index: usize,
    line: usize,
}

impl Scanner {
    pub fn new(text: &str) -> Scanner {
        Scanner { chars: text.chars().collect(), index: 0, line: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// Consumes and returns the current character, tracking newlines.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skips contiguous whitespace (including newlines), tracking the
    /// line counter as it goes. Returns the number of characters
    /// skipped.
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.index;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
        self.index - start
    }

    /// Accumulates a run of identifier-like characters (alphanumeric
    /// or `_`) starting at the current position.
    pub fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            ident.push(self.advance().unwrap());
        }
        ident
    }

    /// Reads a balanced `(...)` substring starting at the current
    /// position (which must be `(`), tracking nested-parenthesis
    /// depth. Returns the inner text (not including the outer
    /// parens) and advances past the closing `)`. `None` if the
    /// parens never balance before the input ends.
    pub fn read_balanced_parens(&mut self) -> Option<String> {
        if self.peek() != Some('(') {
            return None;
        }
        self.advance();

        let mut depth = 1usize;
        let mut inner = String::new();

        loop {
            let c = self.advance()?;
            match c {
                '(' => {
                    depth += 1;
                    inner.push(c);
                },
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(inner);
                    }
                    inner.push(c);
                },
                _ => inner.push(c),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_trailing_comment() {
        assert_eq!(strip_line_comment("step; // walk forward"), "step;");
    }

    #[test]
    fn no_comment_is_a_noop() {
        assert_eq!(strip_line_comment("  step;  "), "step;");
    }

    #[test]
    fn identifier_stops_at_punctuation() {
        let mut s = Scanner::new("wall_check(dir)");
        assert_eq!(s.read_identifier(), "wall_check");
        assert_eq!(s.peek(), Some('('));
    }

    #[test]
    fn balanced_parens_tracks_nesting() {
        let mut s = Scanner::new("(a, (b, c), d)");
        assert_eq!(s.read_balanced_parens().unwrap(), "a, (b, c), d");
        assert!(s.at_end());
    }

    #[test]
    fn whitespace_skip_tracks_lines() {
        let mut s = Scanner::new("  \n\n  x");
        s.skip_whitespace();
        assert_eq!(s.line(), 2);
        assert_eq!(s.peek(), Some('x'));
    }

    #[test]
    fn unbalanced_parens_returns_none() {
        let mut s = Scanner::new("(a, (b)");
        assert!(s.read_balanced_parens().is_none());
    }

    proptest::proptest! {
        #[test]
        fn identifier_read_is_idempotent(s in "[a-zA-Z_][a-zA-Z0-9_]{0,12}") {
            let mut scanner = Scanner::new(&s);
            let read = scanner.read_identifier();
            proptest::prop_assert_eq!(read, s);
            proptest::prop_assert!(scanner.at_end());
        }
    }
}
