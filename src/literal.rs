// 🧮 Literal Interpreter
// Restricted parser for data-only script literals: objects, arrays, strings,
// numbers, booleans, null/undefined and comments. Nothing is executed; any
// identifier reference, call or operator is rejected.

use std::time::{Duration, Instant};

use crate::error::LiteralError;
use crate::value::{format_number, parse_number_text, Value};

/// Limits applied to one interpretation run.
#[derive(Debug, Clone)]
pub struct LiteralBudget {
    /// Wall-clock budget for the whole parse.
    pub timeout: Duration,
    /// Maximum array/object nesting.
    pub max_depth: usize,
}

impl Default for LiteralBudget {
    fn default() -> Self {
        LiteralBudget {
            timeout: Duration::from_millis(1000),
            max_depth: 256,
        }
    }
}

/// Interpret `source` and require an array at the top level.
pub fn parse_literal(source: &str, budget: &LiteralBudget) -> Result<Vec<Value>, LiteralError> {
    match parse_value(source, budget)? {
        Value::Array(items) => Ok(items),
        other => Err(LiteralError::InvalidLiteral(other.type_name())),
    }
}

/// Interpret `source` as a single literal of any shape.
pub fn parse_value(source: &str, budget: &LiteralBudget) -> Result<Value, LiteralError> {
    Parser::new(source, budget).parse_document()
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'b> {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    budget: &'b LiteralBudget,
    started: Instant,
    steps: u32,
}

impl<'b> Parser<'b> {
    fn new(source: &str, budget: &'b LiteralBudget) -> Self {
        Parser {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
            budget,
            started: Instant::now(),
            steps: 0,
        }
    }

    fn parse_document(&mut self) -> Result<Value, LiteralError> {
        let value = self.parse_value()?;
        self.skip_trivia()?;
        match self.peek() {
            None => Ok(value),
            Some(c) => Err(self.error(format!("unexpected trailing `{c}`"))),
        }
    }

    // ------------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError::EvalError {
            offset: self.pos,
            message: message.into(),
        }
    }

    /// Budget check, sampled so the clock is not read on every token.
    fn tick(&mut self) -> Result<(), LiteralError> {
        self.steps = self.steps.wrapping_add(1);
        if self.steps % 1024 == 1 && self.started.elapsed() >= self.budget.timeout {
            return Err(LiteralError::EvalTimeout {
                budget_ms: self.budget.timeout.as_millis(),
            });
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), LiteralError> {
        self.depth += 1;
        if self.depth > self.budget.max_depth {
            return Err(self.error(format!(
                "nesting deeper than {} levels",
                self.budget.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() || c == '\u{feff}' => {
                    self.pos += 1;
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.tick()?;
        self.skip_trivia()?;
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => self.parse_array(),
            Some('{') => self.parse_object(),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some('`') => self.parse_template().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number().map(Value::Number)
            }
            Some(c) if is_ident_start(c) => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
        }
    }

    fn parse_array(&mut self) -> Result<Value, LiteralError> {
        self.enter()?;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    // Hole: `[1,,2]`.
                    self.pos += 1;
                    items.push(Value::Undefined);
                    continue;
                }
                _ => {}
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => {}
                Some(']') => break,
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected `,` or `]`, found `{c}`")));
                }
                None => return Err(self.error("unterminated array")),
            }
        }
        self.leave();
        Ok(Value::Array(items))
    }

    fn parse_object(&mut self) -> Result<Value, LiteralError> {
        self.enter()?;
        self.pos += 1;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            let key = self.parse_key()?;
            self.skip_trivia()?;
            if self.bump() != Some(':') {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error(format!("expected `:` after key `{key}`")));
            }
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => {}
                Some('}') => break,
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(format!("expected `,` or `}}`, found `{c}`")));
                }
                None => return Err(self.error("unterminated object")),
            }
        }
        self.leave();
        Ok(Value::Object(entries))
    }

    fn parse_key(&mut self) -> Result<String, LiteralError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                self.parse_number().map(format_number)
            }
            Some(c) if is_ident_start(c) => Ok(self.read_identifier()),
            Some(c) => Err(self.error(format!("unsupported object key starting with `{c}`"))),
            None => Err(self.error("unterminated object")),
        }
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let ident = self.read_identifier();
        match ident.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "undefined" => Ok(Value::Undefined),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => {
                self.pos = start;
                Err(self.error(format!("unsupported expression `{ident}`")))
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            ident.push(c);
            self.pos += 1;
        }
        ident
    }

    fn parse_number(&mut self) -> Result<f64, LiteralError> {
        let start = self.pos;
        let sign = match self.peek() {
            Some('-') => {
                self.pos += 1;
                -1.0
            }
            Some('+') => {
                self.pos += 1;
                1.0
            }
            _ => 1.0,
        };

        if self.peek().is_some_and(is_ident_start) {
            let ident = self.read_identifier();
            return match ident.as_str() {
                "Infinity" => Ok(sign * f64::INFINITY),
                "NaN" => Ok(f64::NAN),
                _ => {
                    self.pos = start;
                    Err(self.error(format!("unsupported expression `{ident}`")))
                }
            };
        }

        let mut text = String::new();
        let prefixed = self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        if prefixed {
            while let Some(c) = self.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                if c != '_' {
                    text.push(c);
                }
                self.pos += 1;
            }
        } else {
            self.read_digits(&mut text);
            if self.peek() == Some('.') {
                text.push('.');
                self.pos += 1;
                self.read_digits(&mut text);
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                text.push('e');
                self.pos += 1;
                if let Some(s @ ('+' | '-')) = self.peek() {
                    text.push(s);
                    self.pos += 1;
                }
                self.read_digits(&mut text);
            }
        }

        let value = if text.is_empty() || text == "." {
            f64::NAN
        } else {
            parse_number_text(&text)
        };
        if value.is_nan() {
            self.pos = start;
            return Err(self.error("invalid number"));
        }
        Ok(sign * value)
    }

    fn read_digits(&mut self, out: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                out.push(c);
            } else if c != '_' {
                break;
            }
            self.pos += 1;
        }
    }

    // ------------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------------

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            self.tick()?;
            match self.bump() {
                None | Some('\n') | Some('\r') => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_template(&mut self) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            self.tick()?;
            match self.bump() {
                None => return Err(self.error("unterminated template string")),
                Some('`') => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some('$') if self.peek() == Some('{') => {
                    self.pos -= 1;
                    return Err(self.error("template interpolation is not allowed"));
                }
                Some('\r') => {
                    if self.peek() == Some('\n') {
                        self.pos += 1;
                    }
                    out.push('\n');
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape sequence"))?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|n| n.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.read_hex(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let ch = self.read_unicode_escape()?;
                out.push(ch);
            }
            // Line continuation.
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn read_unicode_escape(&mut self) -> Result<char, LiteralError> {
        if self.peek() == Some('{') {
            self.pos += 1;
            let mut code = 0u32;
            let mut digits = 0;
            loop {
                match self.bump() {
                    Some('}') if digits > 0 => break,
                    Some(c) if c.is_ascii_hexdigit() && code <= 0x10ffff => {
                        code = code * 16 + c.to_digit(16).unwrap_or(0);
                        digits += 1;
                    }
                    _ => return Err(self.error("invalid unicode escape")),
                }
            }
            return char::from_u32(code).ok_or_else(|| self.error("invalid code point"));
        }

        let unit = self.read_hex(4)?;
        if (0xd800..0xdc00).contains(&unit)
            && self.peek() == Some('\\')
            && self.peek_at(1) == Some('u')
        {
            let mark = self.pos;
            self.pos += 2;
            if let Ok(low) = self.read_hex(4) {
                if (0xdc00..0xe000).contains(&low) {
                    let code = 0x10000 + ((unit - 0xd800) << 10) + (low - 0xdc00);
                    return Ok(char::from_u32(code).unwrap_or('\u{fffd}'));
                }
            }
            self.pos = mark;
        }
        Ok(char::from_u32(unit).unwrap_or('\u{fffd}'))
    }

    fn read_hex(&mut self, len: usize) -> Result<u32, LiteralError> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(code)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
