use std::fmt;

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::ast::tokens::{Token, TokenKind};
use crate::lexer::{LexError, Lexer};
use crate::value::Value;

/// A parse failure: either a lexical error from the tokenizer or a
/// structural mismatch, both positioned in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid lexical input
    Lex(LexError),
    /// A token that cannot continue the current production
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },
}

impl ParseError {
    fn syntax(token: &Token, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::Syntax {
                line,
                column,
                message,
            } => write!(f, "syntax error at line {}, column {}: {}", line, column, message),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            ParseError::Syntax { .. } => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("'{}'", token.text),
    }
}

/// Recursive-descent expression parser over a [`Lexer`]'s token stream.
///
/// Lookahead is one token, implemented with the lexer's single-token
/// rewind: every decision point reads a token and either consumes it or
/// pushes it back.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser { lexer }
    }

    /// Recover the lexer, positioned after the last consumed token. Useful
    /// for callers that embed an expression inside larger text.
    pub fn into_lexer(self) -> Lexer {
        self.lexer
    }

    /// Parse a single expression and stop. The first token that cannot
    /// continue the expression is rewound, so the lexer is left positioned
    /// for the embedding caller to resume.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assign()
    }

    /// Parse an expression that must span the whole input; trailing tokens
    /// are a syntax error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_assign()?;
        let token = self.next()?;
        if !token.is_eof() {
            return Err(ParseError::syntax(
                &token,
                format!("unexpected {} after expression", describe(&token)),
            ));
        }
        Ok(expr)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.next_token()?)
    }

    fn push_back(&mut self) {
        self.lexer.rewind();
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if std::mem::discriminant(&token.kind) != std::mem::discriminant(kind) {
            return Err(ParseError::syntax(
                &token,
                format!("expected {} but found {}", context, describe(&token)),
            ));
        }
        Ok(token)
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;

        let token = self.next()?;
        if token.kind != TokenKind::Assign {
            self.push_back();
            return Ok(left);
        }
        if !matches!(left, Expr::Variable(_)) {
            return Err(ParseError::syntax(
                &token,
                "assignment target must be a variable reference",
            ));
        }
        // Right-associative: $a = $b = 1
        let value = self.parse_assign()?;
        Ok(Expr::Assign {
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            let token = self.next()?;
            if token.kind != TokenKind::OrOr {
                self.push_back();
                break;
            }
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        loop {
            let token = self.next()?;
            if token.kind != TokenKind::AndAnd {
                self.push_back();
                break;
            }
            let right = self.parse_equality()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let token = self.next()?;
            let op = match token.kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::EqEqEq => BinOp::StrictEq,
                TokenKind::NotEqEq => BinOp::NotStrictEq,
                _ => {
                    self.push_back();
                    break;
                }
            };
            let right = self.parse_relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let token = self.next()?;
            let op = match token.kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                TokenKind::In => BinOp::In,
                _ => {
                    self.push_back();
                    break;
                }
            };
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let token = self.next()?;
            let op = match token.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Subtract,
                _ => {
                    self.push_back();
                    break;
                }
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let token = self.next()?;
            let op = match token.kind {
                TokenKind::Star => BinOp::Multiply,
                TokenKind::Slash => BinOp::Divide,
                _ => {
                    self.push_back();
                    break;
                }
            };
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let token = self.next()?;
        let op = match token.kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => {
                self.push_back();
                return self.parse_postfix();
            }
        };
        let operand = self.parse_postfix()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Dot => {
                    let name = self.expect(&TokenKind::Name(String::new()), "a member name after '.'")?;
                    let member = match name.kind {
                        TokenKind::Name(n) => n,
                        _ => unreachable!(),
                    };
                    expr = Expr::Binary {
                        op: BinOp::Dot,
                        left: Box::new(expr),
                        right: Box::new(Expr::Literal(Value::String(member))),
                    };
                }
                TokenKind::LBracket => {
                    let key = self.parse_assign()?;
                    self.expect(&TokenKind::RBracket, "']' to close index access")?;
                    expr = Expr::Binary {
                        op: BinOp::Index,
                        left: Box::new(expr),
                        right: Box::new(key),
                    };
                }
                _ => {
                    self.push_back();
                    break;
                }
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.next()?;
        match token.kind {
            // Literals
            TokenKind::Number(value) => Ok(Expr::Literal(value)),
            TokenKind::String(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Boolean(b) => Ok(Expr::Literal(Value::Boolean(b))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),

            // References
            TokenKind::Variable(name) => Ok(Expr::Variable(name)),

            TokenKind::LParen => {
                let expr = self.parse_assign()?;
                self.expect(&TokenKind::RParen, "')' to close parenthesized expression")?;
                Ok(expr)
            }

            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_map_literal(),

            // A bare name only exists as a function-call target.
            TokenKind::Name(name) => {
                self.expect(&TokenKind::LParen, &format!("'(' after function name '{}'", name))?;
                let args = self.parse_arguments()?;
                Ok(Expr::FunctionCall { name, args })
            }

            TokenKind::Eof => Err(ParseError::syntax(
                &token,
                "unexpected end of input, expected an expression",
            )),
            _ => Err(ParseError::syntax(
                &token,
                format!("unexpected {} where an expression was expected", describe(&token)),
            )),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elements = vec![];
        loop {
            let token = self.next()?;
            if token.kind == TokenKind::RBracket {
                break;
            }
            self.push_back();

            elements.push(self.parse_assign()?);

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RBracket => break,
                _ => {
                    return Err(ParseError::syntax(
                        &token,
                        format!("expected ',' or ']' in list literal, found {}", describe(&token)),
                    ));
                }
            }
        }
        Ok(Expr::Array(elements))
    }

    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        let mut pairs = vec![];
        loop {
            let token = self.next()?;
            let key = match token.kind {
                TokenKind::RBrace => break,
                TokenKind::String(s) => s,
                TokenKind::Name(s) => s,
                _ => {
                    return Err(ParseError::syntax(
                        &token,
                        format!(
                            "expected a string or name as map key, found {}",
                            describe(&token)
                        ),
                    ));
                }
            };

            self.expect(&TokenKind::Colon, "':' after map key")?;
            let value = self.parse_assign()?;
            pairs.push((key, value));

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RBrace => break,
                _ => {
                    return Err(ParseError::syntax(
                        &token,
                        format!("expected ',' or '}}' in map literal, found {}", describe(&token)),
                    ));
                }
            }
        }
        Ok(Expr::Object(pairs))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![];
        loop {
            let token = self.next()?;
            if token.kind == TokenKind::RParen {
                break;
            }
            self.push_back();

            args.push(self.parse_assign()?);

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RParen => break,
                _ => {
                    return Err(ParseError::syntax(
                        &token,
                        format!(
                            "expected ',' or ')' in argument list, found {}",
                            describe(&token)
                        ),
                    ));
                }
            }
        }
        Ok(args)
    }
}
