// 🔎 Literal Scanner
// Finds a named array literal inside a larger text blob (an HTML page with an
// inline <script>) and returns its exact byte span.

use crate::error::ScanError;

/// Marker that precedes the catalog literal in the calculator page.
pub const CATALOG_MARKER: &str = "const catalogData";

// ============================================================================
// SPAN
// ============================================================================

/// Byte span `[start, end)` of a literal inside the scanned text.
/// `start` points at the opening `[`, `end - 1` at the matching `]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
}

impl LiteralSpan {
    /// Borrow the literal text out of the document it was scanned from.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Lexical mode of the scanner. Only `Code` may change bracket depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    /// Inside a string opened by `quote` (`'`, `"` or `` ` ``).
    /// `escaped` swallows the next byte unconditionally.
    Str { quote: u8, escaped: bool },
    LineComment,
    BlockComment,
}

/// What a single byte did to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    /// Consumed this byte and the next one (`//`, `/*`, `*/`).
    SkipNext,
    /// Closed the outermost bracket.
    Closed,
}

struct Scanner {
    mode: Mode,
    depth: usize,
}

impl Scanner {
    fn new() -> Self {
        Scanner {
            mode: Mode::Code,
            depth: 0,
        }
    }

    /// Transition priority: comment, then string, then code.
    fn step(&mut self, ch: u8, next: Option<u8>) -> Step {
        match self.mode {
            Mode::LineComment => {
                if ch == b'\n' {
                    self.mode = Mode::Code;
                }
                Step::Continue
            }
            Mode::BlockComment => {
                if ch == b'*' && next == Some(b'/') {
                    self.mode = Mode::Code;
                    return Step::SkipNext;
                }
                Step::Continue
            }
            Mode::Str { quote, escaped } => {
                if escaped {
                    self.mode = Mode::Str { quote, escaped: false };
                } else if ch == b'\\' {
                    self.mode = Mode::Str { quote, escaped: true };
                } else if ch == quote {
                    self.mode = Mode::Code;
                }
                Step::Continue
            }
            Mode::Code => self.step_code(ch, next),
        }
    }

    fn step_code(&mut self, ch: u8, next: Option<u8>) -> Step {
        match (ch, next) {
            (b'/', Some(b'/')) => {
                self.mode = Mode::LineComment;
                Step::SkipNext
            }
            (b'/', Some(b'*')) => {
                self.mode = Mode::BlockComment;
                Step::SkipNext
            }
            (b'"' | b'\'' | b'`', _) => {
                self.mode = Mode::Str {
                    quote: ch,
                    escaped: false,
                };
                Step::Continue
            }
            (b'[', _) => {
                self.depth += 1;
                Step::Continue
            }
            (b']', _) => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    Step::Closed
                } else {
                    Step::Continue
                }
            }
            _ => Step::Continue,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Return the span of the first bracketed array literal that starts at or
/// after the end of `marker`.
///
/// The scan works on bytes: every structural character is ASCII and UTF-8
/// continuation bytes never collide with them, so multi-byte text inside
/// strings is skipped safely.
pub fn scan_array_literal(text: &str, marker: &str) -> Result<LiteralSpan, ScanError> {
    let marker_at = text
        .find(marker)
        .ok_or_else(|| ScanError::NotFound(marker.to_string()))?;
    let search_from = marker_at + marker.len();
    let start = text[search_from..]
        .find('[')
        .map(|offset| search_from + offset)
        .ok_or_else(|| ScanError::NotFound(format!("'[' after {marker}")))?;

    let bytes = text.as_bytes();
    let mut scanner = Scanner::new();
    let mut i = start;

    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        match scanner.step(bytes[i], next) {
            Step::Continue => i += 1,
            Step::SkipNext => i += 2,
            Step::Closed => return Ok(LiteralSpan { start, end: i + 1 }),
        }
    }

    Err(ScanError::Unterminated { start })
}

/// Shorthand for the calculator page marker.
pub fn scan_catalog(text: &str) -> Result<LiteralSpan, ScanError> {
    scan_array_literal(text, CATALOG_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> &str {
        scan_catalog(text).unwrap().slice(text)
    }

    #[test]
    fn test_simple_literal() {
        let html = r#"<script>const catalogData = [{category:"A", items:[{name:"X", price1:10, price2:20}]}];</script>"#;
        assert_eq!(
            extract(html),
            r#"[{category:"A", items:[{name:"X", price1:10, price2:20}]}]"#
        );
    }

    #[test]
    fn test_bracket_inside_string_does_not_close() {
        let html = r#"const catalogData = [{category:"A", items:[{name:"size: 1]2", price1:1, price2:2}]}]; const other = [1];"#;
        let literal = extract(html);
        assert!(literal.ends_with("}]}]"));
        assert!(literal.contains("size: 1]2"));
    }

    #[test]
    fn test_all_quote_styles_and_escapes() {
        let html = r#"const catalogData = ['a]', "b\"]", `c]
        ]`, 'it\'s ]'];"#;
        let literal = extract(html);
        assert!(literal.starts_with("['a]'"));
        assert!(literal.ends_with("'it\\'s ]']"));
    }

    #[test]
    fn test_comments_are_skipped() {
        let html = "const catalogData = [ // closing ] here is a comment\n 1, /* ] ] */ 2 ];";
        assert_eq!(
            extract(html),
            "[ // closing ] here is a comment\n 1, /* ] ] */ 2 ]"
        );
    }

    #[test]
    fn test_quote_inside_comment_is_ignored() {
        let html = "const catalogData = [ /* don't */ 1 ];";
        assert_eq!(extract(html), "[ /* don't */ 1 ]");
    }

    #[test]
    fn test_nested_arrays() {
        let html = "const catalogData = [[1, [2]], [3]]; [4]";
        assert_eq!(extract(html), "[[1, [2]], [3]]");
    }

    #[test]
    fn test_multibyte_text() {
        let html = "const catalogData = [{category:\"Сантехника ]\", items:[]}];";
        let span = scan_catalog(html).unwrap();
        assert_eq!(span.slice(html), "[{category:\"Сантехника ]\", items:[]}]");
        assert!(!span.is_empty());
    }

    #[test]
    fn test_marker_missing() {
        let err = scan_catalog("const otherData = [1];").unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn test_no_bracket_after_marker() {
        let err = scan_catalog("[1]; const catalogData = {};").unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn test_unterminated_literal() {
        let err = scan_catalog("const catalogData = [[1, 2], [3").unwrap_err();
        assert_eq!(err, ScanError::Unterminated { start: 20 });
    }

    #[test]
    fn test_unterminated_string_swallows_rest() {
        let err = scan_catalog("const catalogData = [\"open ]").unwrap_err();
        assert!(matches!(err, ScanError::Unterminated { .. }));
    }

    #[test]
    fn test_spans_are_balanced() {
        let docs = [
            "const catalogData = [1, 2, 3];",
            "x const catalogData=[{a:[1,2,{b:[']']}]}] tail ]",
            "const catalogData = [`a${'['}b`, \"[\", '[[', []];",
        ];
        for doc in docs {
            let literal = extract(doc);
            let mut depth = 0i32;
            let mut in_str: Option<char> = None;
            let mut escaped = false;
            for ch in literal.chars() {
                if let Some(q) = in_str {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == q {
                        in_str = None;
                    }
                    continue;
                }
                match ch {
                    '\'' | '"' | '`' => in_str = Some(ch),
                    '[' => depth += 1,
                    ']' => depth -= 1,
                    _ => {}
                }
            }
            assert!(in_str.is_none(), "unterminated string in {literal}");
            assert_eq!(depth, 0, "unbalanced span {literal}");
        }
    }
}
