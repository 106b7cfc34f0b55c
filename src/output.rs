//! Canonical source rendering for expression trees and values.
//!
//! `to_code` renders a tree back to source text such that re-parsing yields
//! a structurally equivalent tree. Whitespace and parenthesization are
//! normalized: single spaces around binary operators, parentheses exactly
//! where precedence or associativity require them, object keys always
//! quoted.

use std::fmt;

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::value::Value;

/// Render canonical source text for an expression tree.
pub fn to_code(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

const PREC_ASSIGN: u8 = 1;
const PREC_UNARY: u8 = 8;
const PREC_POSTFIX: u8 = 9;
const PREC_PRIMARY: u8 = 10;

fn bin_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Or => 2,
        BinOp::And => 3,
        BinOp::Eq | BinOp::NotEq | BinOp::StrictEq | BinOp::NotStrictEq => 4,
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq | BinOp::In => 5,
        BinOp::Add | BinOp::Subtract => 6,
        BinOp::Multiply | BinOp::Divide => 7,
        BinOp::Dot | BinOp::Index => PREC_POSTFIX,
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } => PREC_ASSIGN,
        Expr::Binary { op, .. } => bin_precedence(*op),
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Literal(_)
        | Expr::Variable(_)
        | Expr::Array(_)
        | Expr::Object(_)
        | Expr::FunctionCall { .. } => PREC_PRIMARY,
    }
}

fn is_identifier(s: &str) -> bool {
    // Keywords would re-lex as fixed tokens, so they take the index form.
    if matches!(s, "true" | "false" | "null" | "in") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn is_numeric_literal(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Literal(Value::Int(_) | Value::Long(_) | Value::Double(_))
    )
}

fn write_child(out: &mut String, child: &Expr, needs_parens: bool) {
    if needs_parens {
        out.push('(');
        write_expr(out, child);
        out.push(')');
    } else {
        write_expr(out, child);
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Literal(value) => write_value(out, value),
        Expr::Variable(name) => {
            out.push('$');
            out.push_str(name);
        }
        Expr::Unary { op, operand } => {
            out.push_str(op.symbol());
            let mut rendered = String::new();
            write_expr(&mut rendered, operand);
            // A negated operand that starts with a digit must keep its
            // parentheses, or the minus sign would fuse into the literal on
            // re-lexing.
            let fuses = *op == UnaryOp::Negate
                && rendered.starts_with(|c: char| c.is_ascii_digit());
            if precedence(operand) < PREC_POSTFIX || fuses {
                out.push('(');
                out.push_str(&rendered);
                out.push(')');
            } else {
                out.push_str(&rendered);
            }
        }
        Expr::Binary {
            op: BinOp::Dot,
            left,
            right,
        } => {
            // "2.x" would lex as a malformed number, so a numeric base
            // keeps its parentheses.
            let parens = precedence(left) < PREC_POSTFIX || is_numeric_literal(left);
            write_child(out, left, parens);
            match right.as_ref() {
                Expr::Literal(Value::String(name)) if is_identifier(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                other => {
                    // A rewritten member name falls back to index form.
                    out.push('[');
                    write_expr(out, other);
                    out.push(']');
                }
            }
        }
        Expr::Binary {
            op: BinOp::Index,
            left,
            right,
        } => {
            write_child(out, left, precedence(left) < PREC_POSTFIX);
            out.push('[');
            write_expr(out, right);
            out.push(']');
        }
        Expr::Binary { op, left, right } => {
            let prec = bin_precedence(*op);
            write_child(out, left, precedence(left) < prec);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_child(out, right, precedence(right) <= prec);
        }
        Expr::Assign { target, value } => {
            write_expr(out, target);
            out.push_str(" = ");
            write_expr(out, value);
        }
        Expr::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, item);
            }
            out.push(']');
        }
        Expr::Object(pairs) => {
            out.push('{');
            for (i, (key, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('"');
                out.push_str(&escape_string(key));
                out.push_str("\": ");
                write_expr(out, value);
            }
            out.push('}');
        }
        Expr::FunctionCall { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Long(n) => out.push_str(&n.to_string()),
        Value::Double(d) => out.push_str(&double_literal(*d)),
        Value::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('"');
                out.push_str(&escape_string(key));
                out.push_str("\": ");
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

/// Doubles always render with a decimal point or exponent, so an
/// integral-valued double re-lexes as a double and not an integer.
fn double_literal(d: f64) -> String {
    let s = d.to_string();
    if s.contains(['.', 'e', 'E', 'i', 'N']) {
        s
    } else {
        format!("{}.0", s)
    }
}

fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            '\u{0008}' => vec!['\\', 'b'],
            '\u{000C}' => vec!['\\', 'f'],
            c if c.is_control() => {
                // Unicode escape for the remaining control chars
                format!("\\u{:04x}", c as u32).chars().collect()
            }
            c => vec![c],
        })
        .collect()
}

/// Values display as their canonical literal form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_value(&mut out, self);
        write!(f, "{}", out)
    }
}
