use std::fmt;

use crate::ast::tokens::{FIXED_TOKENS, Token, TokenKind};
use crate::reader::{CharReader, RestoreState};
use crate::value::Value;

/// A lexical error, positioned at the offending character.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// 1-based line of the offending character
    pub line: u32,
    /// 1-based column of the offending character
    pub column: u32,
    pub message: String,
}

impl LexError {
    pub(crate) fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        LexError {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lexical error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// States of the numeric scanner. The grammar is exactly JSON's: optional
/// leading minus, `0` or a nonzero-led digit run, optional fraction,
/// optional signed exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberState {
    Start,
    LeadingMinus,
    LeadingZero,
    IntegerPart,
    DecimalPoint,
    Fraction,
    ExponentMarker,
    ExponentSign,
    ExponentDigits,
}

impl NumberState {
    fn accepting(self) -> bool {
        matches!(
            self,
            NumberState::LeadingZero
                | NumberState::IntegerPart
                | NumberState::Fraction
                | NumberState::ExponentDigits
        )
    }

    fn next(self, c: char) -> Option<NumberState> {
        use NumberState::*;
        match (self, c) {
            (Start, '-') => Some(LeadingMinus),
            (Start | LeadingMinus, '0') => Some(LeadingZero),
            (Start | LeadingMinus, '1'..='9') => Some(IntegerPart),
            (IntegerPart, '0'..='9') => Some(IntegerPart),
            (LeadingZero | IntegerPart, '.') => Some(DecimalPoint),
            (LeadingZero | IntegerPart | Fraction, 'e' | 'E') => Some(ExponentMarker),
            (DecimalPoint | Fraction, '0'..='9') => Some(Fraction),
            (ExponentMarker, '+' | '-') => Some(ExponentSign),
            (ExponentMarker | ExponentSign | ExponentDigits, '0'..='9') => Some(ExponentDigits),
            _ => None,
        }
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Characters allowed to follow a completed string literal: whitespace, end
/// of input, or anything that starts a fixed symbol token.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || "()[]{},:=|&!<>+-/.*".contains(c)
}

/// Pull-based tokenizer over a [`CharReader`].
///
/// Produces one [`Token`] per [`next_token`] call; end of input is an
/// explicit [`TokenKind::Eof`] token, not an error. A single-token
/// [`rewind`] undoes the most recent read, including any whitespace it
/// skipped, so callers embedding expressions in larger text can probe for a
/// token and back out.
///
/// [`next_token`]: Lexer::next_token
/// [`rewind`]: Lexer::rewind
pub struct Lexer {
    reader: CharReader,
    rewind_point: Option<RestoreState>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            reader: CharReader::new(input),
            rewind_point: None,
        }
    }

    /// The underlying reader, for callers that continue scanning the source
    /// after an embedded expression.
    pub fn reader(&self) -> &CharReader {
        &self.reader
    }

    /// Undo the most recent [`next_token`] call's net stream movement.
    ///
    /// # Panics
    ///
    /// Panics when called twice in a row, or without a preceding
    /// [`next_token`] call.
    ///
    /// [`next_token`]: Lexer::next_token
    pub fn rewind(&mut self) {
        let state = self
            .rewind_point
            .take()
            .expect("rewind requires exactly one preceding next_token call");
        self.reader.restore_state(state);
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(state) = self.rewind_point.take() {
            self.reader.clear_restore_state(state);
        }
        self.rewind_point = Some(self.reader.get_restore_state());

        self.skip_whitespace();

        let line = self.reader.line();
        let column = self.reader.column();
        let position = self.reader.position();

        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some('"') => self.scan_string()?,
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some('-') if self.minus_starts_number() => self.scan_number()?,
            Some('$') => self.scan_variable()?,
            Some(_) => self.scan_name_or_fixed()?,
        };

        Ok(Token {
            kind,
            text: self.reader.lexeme(position, self.reader.position()),
            line,
            column,
            position,
        })
    }

    fn peek(&mut self) -> Option<char> {
        let state = self.reader.get_restore_state();
        let ch = self.reader.read();
        self.reader.restore_state(state);
        ch
    }

    fn skip_whitespace(&mut self) {
        loop {
            let state = self.reader.get_restore_state();
            match self.reader.read() {
                Some(c) if c.is_whitespace() => self.reader.clear_restore_state(state),
                Some(_) => {
                    self.reader.restore_state(state);
                    break;
                }
                None => {
                    self.reader.clear_restore_state(state);
                    break;
                }
            }
        }
    }

    /// A leading `-` opens a numeric literal only when a digit follows;
    /// otherwise it is the minus operator.
    fn minus_starts_number(&mut self) -> bool {
        let state = self.reader.get_restore_state();
        self.reader.read(); // the '-'
        let digit = matches!(self.reader.read(), Some(c) if c.is_ascii_digit());
        self.reader.restore_state(state);
        digit
    }

    fn scan_name_or_fixed(&mut self) -> Result<TokenKind, LexError> {
        let start_line = self.reader.line();
        let start_column = self.reader.column();
        let mut buf = String::new();

        // Candidate narrowing: keep consuming while the buffer is still a
        // prefix of some fixed token or a valid name.
        loop {
            let state = self.reader.get_restore_state();
            match self.reader.read() {
                None => {
                    self.reader.clear_restore_state(state);
                    break;
                }
                Some(c) => {
                    buf.push(c);
                    let fixed_viable =
                        FIXED_TOKENS.iter().any(|(text, _)| text.starts_with(buf.as_str()));
                    if fixed_viable || is_name(&buf) {
                        self.reader.clear_restore_state(state);
                    } else {
                        buf.pop();
                        self.reader.restore_state(state);
                        break;
                    }
                }
            }
        }

        if let Some((_, kind)) = FIXED_TOKENS.iter().find(|(text, _)| *text == buf) {
            return Ok(kind.clone());
        }
        if is_name(&buf) {
            return Ok(TokenKind::Name(buf));
        }
        if buf.is_empty() {
            let found = match self.peek() {
                Some(c) => format!("unexpected character '{}'", c),
                None => "unexpected end of input".to_string(),
            };
            return Err(LexError::new(start_line, start_column, found));
        }
        Err(LexError::new(
            start_line,
            start_column,
            format!("invalid token '{}'", buf),
        ))
    }

    fn scan_string(&mut self) -> Result<TokenKind, LexError> {
        self.reader.read(); // opening quote
        let mut value = String::new();

        loop {
            let line = self.reader.line();
            let column = self.reader.column();
            match self.reader.read() {
                None => {
                    return Err(LexError::new(line, column, "unterminated string literal"));
                }
                Some('"') => break,
                Some('\\') => value.push(self.scan_escape()?),
                Some(c) if c.is_control() => {
                    return Err(LexError::new(
                        line,
                        column,
                        format!("control character {:?} in string literal must be escaped", c),
                    ));
                }
                Some(c) => value.push(c),
            }
        }

        if let Some(c) = self.peek() {
            if !is_separator(c) {
                return Err(LexError::new(
                    self.reader.line(),
                    self.reader.column(),
                    format!("unexpected character '{}' after string literal", c),
                ));
            }
        }
        Ok(TokenKind::String(value))
    }

    fn scan_escape(&mut self) -> Result<char, LexError> {
        let line = self.reader.line();
        let column = self.reader.column();
        match self.reader.read() {
            None => Err(LexError::new(line, column, "unterminated string literal")),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('/') => Ok('/'),
            Some('b') => Ok('\u{0008}'),
            Some('f') => Ok('\u{000C}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => self.scan_unicode_escape(line, column),
            Some(c) => Err(LexError::new(
                line,
                column,
                format!("invalid escape sequence '\\{}'", c),
            )),
        }
    }

    /// `\uXXXX` escapes are UTF-16 code units; a surrogate pair must be
    /// written as two consecutive escapes.
    fn scan_unicode_escape(&mut self, line: u32, column: u32) -> Result<char, LexError> {
        let unit = self.read_hex4()?;
        if (0xDC00..=0xDFFF).contains(&unit) {
            return Err(LexError::new(
                line,
                column,
                format!("unpaired low surrogate \\u{:04x} in string literal", unit),
            ));
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            let pair_err = || {
                LexError::new(
                    line,
                    column,
                    format!("high surrogate \\u{:04x} must be followed by a low surrogate escape", unit),
                )
            };
            if self.reader.read() != Some('\\') {
                return Err(pair_err());
            }
            if self.reader.read() != Some('u') {
                return Err(pair_err());
            }
            let low = self.read_hex4()?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(pair_err());
            }
            let code =
                0x10000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
            return char::from_u32(code).ok_or_else(pair_err);
        }
        char::from_u32(unit as u32).ok_or_else(|| {
            LexError::new(line, column, format!("invalid \\u{:04x} escape", unit))
        })
    }

    fn read_hex4(&mut self) -> Result<u16, LexError> {
        let mut code: u32 = 0;
        for _ in 0..4 {
            let line = self.reader.line();
            let column = self.reader.column();
            let digit = match self.reader.read() {
                Some(c) => c.to_digit(16),
                None => None,
            };
            match digit {
                Some(d) => code = code * 16 + d,
                None => {
                    return Err(LexError::new(
                        line,
                        column,
                        "\\u escape requires exactly 4 hex digits",
                    ));
                }
            }
        }
        Ok(code as u16)
    }

    fn scan_number(&mut self) -> Result<TokenKind, LexError> {
        let mut state = NumberState::Start;
        let mut buf = String::new();

        loop {
            let line = self.reader.line();
            let column = self.reader.column();
            let save = self.reader.get_restore_state();
            let c = match self.reader.read() {
                Some(c) => c,
                None => {
                    self.reader.clear_restore_state(save);
                    if state.accepting() {
                        return finish_number(&buf, line, column);
                    }
                    return Err(LexError::new(
                        line,
                        column,
                        "malformed numeric literal: unexpected end of input",
                    ));
                }
            };
            match state.next(c) {
                Some(next) => {
                    state = next;
                    buf.push(c);
                    self.reader.clear_restore_state(save);
                }
                None => {
                    // A digit, letter or dot that cannot extend the literal
                    // makes it malformed; anything else ends it cleanly.
                    if state.accepting()
                        && !(c.is_ascii_alphanumeric() || c == '.' || c == '_')
                    {
                        self.reader.restore_state(save);
                        return finish_number(&buf, line, column);
                    }
                    return Err(LexError::new(
                        line,
                        column,
                        format!("malformed numeric literal: unexpected '{}'", c),
                    ));
                }
            }
        }
    }

    fn scan_variable(&mut self) -> Result<TokenKind, LexError> {
        self.reader.read(); // the '$'
        let mut name = String::new();

        loop {
            let line = self.reader.line();
            let column = self.reader.column();
            let state = self.reader.get_restore_state();
            match self.reader.read() {
                None => {
                    self.reader.clear_restore_state(state);
                    if name.is_empty() {
                        return Err(LexError::new(
                            line,
                            column,
                            "expected identifier after '$'",
                        ));
                    }
                    break;
                }
                Some(c)
                    if c == '_'
                        || (name.is_empty() && c.is_ascii_alphabetic())
                        || (!name.is_empty() && c.is_ascii_alphanumeric()) =>
                {
                    name.push(c);
                    self.reader.clear_restore_state(state);
                }
                Some(c) => {
                    if name.is_empty() {
                        return Err(LexError::new(
                            line,
                            column,
                            format!("expected identifier after '$', found '{}'", c),
                        ));
                    }
                    self.reader.restore_state(state);
                    break;
                }
            }
        }
        Ok(TokenKind::Variable(name))
    }
}

/// Materialize a numeric literal as the narrowest value that represents it
/// exactly: `Int`, then `Long`, then `Double`.
fn finish_number(buf: &str, line: u32, column: u32) -> Result<TokenKind, LexError> {
    let integral = !buf.contains(['.', 'e', 'E']);
    if integral {
        if let Ok(n) = buf.parse::<i64>() {
            return Ok(TokenKind::Number(Value::from_i64(n)));
        }
    }
    match buf.parse::<f64>() {
        Ok(d) => Ok(TokenKind::Number(Value::Double(d))),
        Err(_) => Err(LexError::new(
            line,
            column,
            format!("malformed numeric literal '{}'", buf),
        )),
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("true false null in");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Boolean(true));
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Boolean(false));
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Null);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::In);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_token_positions() {
    let mut lexer = Lexer::new("$a\n  < 3");
    let a = lexer.next_token().unwrap();
    assert_eq!((a.line, a.column, a.position), (1, 1, 0));
    let lt = lexer.next_token().unwrap();
    assert_eq!(lt.kind, TokenKind::Lt);
    assert_eq!((lt.line, lt.column), (2, 3));
    let three = lexer.next_token().unwrap();
    assert_eq!(three.kind, TokenKind::Number(Value::Int(3)));
    assert_eq!((three.line, three.column), (2, 5));
}
