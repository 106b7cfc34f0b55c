use crate::value::Value;

/// The kind of a lexical token, with decoded payload for literal-bearing
/// kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Structural punctuation
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Left bracket for index access and list literals
    LBracket,
    /// Right bracket
    RBracket,
    /// Left brace for map literals
    LBrace,
    /// Right brace
    RBrace,
    /// Comma separating elements and arguments
    Comma,
    /// Colon between map keys and values
    Colon,

    // Operators
    /// Assignment (`=`)
    Assign,
    /// Logical OR (`||`)
    OrOr,
    /// Logical AND (`&&`)
    AndAnd,
    /// Logical negation (`!`)
    Not,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Loose equality (`==`)
    EqEq,
    /// Loose inequality (`!=`)
    NotEq,
    /// Strict equality (`===`)
    EqEqEq,
    /// Strict inequality (`!==`)
    NotEqEq,
    /// Greater than or equal
    GtEq,
    /// Greater than
    Gt,
    /// Addition or string concatenation
    Plus,
    /// Subtraction or arithmetic negation
    Minus,
    /// Division
    Slash,
    /// Member access
    Dot,
    /// Multiplication
    Star,
    /// Membership test keyword
    In,

    // Literals
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
    /// Numeric literal; the payload is the narrowest of
    /// [`Value::Int`]/[`Value::Long`]/[`Value::Double`] that represents the
    /// literal exactly
    Number(Value),
    /// String literal; the payload is the unescaped text
    String(String),

    /// Free-form name (`[_a-zA-Z][_a-zA-Z0-9]*`), used as a function-call
    /// target or a map key
    Name(String),

    /// `$`-prefixed variable reference; the payload has the `$` stripped
    ///
    /// # Examples
    /// ```text
    /// $threshold
    /// $user_name
    /// ```
    Variable(String),

    /// End of input
    Eof,
}

/// An atomic lexical unit: kind (with decoded payload), raw source text and
/// source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw lexeme exactly as it appeared in the source
    pub text: String,
    /// 1-based line of the first character
    pub line: u32,
    /// 1-based column of the first character
    pub column: u32,
    /// Absolute character position of the first character
    pub position: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Fixed tokens (operators, punctuation and keywords) competing with NAME in
/// the tokenizer's longest-match scan.
pub(crate) const FIXED_TOKENS: &[(&str, TokenKind)] = &[
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    ("=", TokenKind::Assign),
    ("||", TokenKind::OrOr),
    ("&&", TokenKind::AndAnd),
    ("!", TokenKind::Not),
    ("<", TokenKind::Lt),
    ("<=", TokenKind::LtEq),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("===", TokenKind::EqEqEq),
    ("!==", TokenKind::NotEqEq),
    (">=", TokenKind::GtEq),
    (">", TokenKind::Gt),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("/", TokenKind::Slash),
    (".", TokenKind::Dot),
    ("*", TokenKind::Star),
    ("true", TokenKind::Boolean(true)),
    ("false", TokenKind::Boolean(false)),
    ("null", TokenKind::Null),
    ("in", TokenKind::In),
];
