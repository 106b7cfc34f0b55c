use std::collections::BTreeSet;

use crate::ast::{BinOp, UnaryOp};
use crate::evaluator::{EvalError, Variables, evaluate};
use crate::value::Value;

/// A node of a parsed expression tree.
///
/// Nodes are built bottom-up by the parser and are structurally immutable
/// except for [`substitute_child`], used by rewrite passes. Evaluation never
/// mutates the tree, so a built tree can be shared and evaluated against any
/// number of variable maps.
///
/// [`substitute_child`]: Expr::substitute_child
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// "hello"
    /// null
    /// ```
    Literal(Value),

    /// Variable reference (`$name`)
    Variable(String),

    /// Unary operation (`!x`, `-x`)
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (arithmetic, comparison, logical, member/index
    /// access)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment (`$name = expr`); the target is always a
    /// [`Expr::Variable`]
    Assign { target: Box<Expr>, value: Box<Expr> },

    /// List literal
    ///
    /// # Example
    /// ```text
    /// [1, 2, $x]
    /// ```
    Array(Vec<Expr>),

    /// Map literal, entries in source order
    ///
    /// # Example
    /// ```text
    /// {"name": $name, "total": $total}
    /// ```
    Object(Vec<(String, Expr)>),

    /// Call of a named function
    ///
    /// # Example
    /// ```text
    /// length($items)
    /// ```
    FunctionCall { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Direct children in a stable order: unary operand; binary left then
    /// right; assignment target then value; list elements; map values in
    /// source order; call arguments. The same order indexes
    /// [`substitute_child`].
    ///
    /// [`substitute_child`]: Expr::substitute_child
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Variable(_) => Vec::new(),
            Expr::Unary { operand, .. } => vec![operand.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Assign { target, value } => vec![target.as_ref(), value.as_ref()],
            Expr::Array(items) => items.iter().collect(),
            Expr::Object(pairs) => pairs.iter().map(|(_, v)| v).collect(),
            Expr::FunctionCall { args, .. } => args.iter().collect(),
        }
    }

    /// All descendants in pre-order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        for child in self.children() {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    /// Names of all variables referenced by this node or any descendant.
    pub fn variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variable_names(&mut names);
        names
    }

    fn collect_variable_names(&self, names: &mut BTreeSet<String>) {
        if let Expr::Variable(name) = self {
            names.insert(name.clone());
        }
        for child in self.children() {
            child.collect_variable_names(names);
        }
    }

    /// Replace the direct child at `index` (see [`children`] for the index
    /// order).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for this node.
    ///
    /// [`children`]: Expr::children
    pub fn substitute_child(&mut self, index: usize, replacement: Expr) {
        let children: Vec<&mut Expr> = match self {
            Expr::Literal(_) | Expr::Variable(_) => Vec::new(),
            Expr::Unary { operand, .. } => vec![operand.as_mut()],
            Expr::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expr::Assign { target, value } => vec![target.as_mut(), value.as_mut()],
            Expr::Array(items) => items.iter_mut().collect(),
            Expr::Object(pairs) => pairs.iter_mut().map(|(_, v)| v).collect(),
            Expr::FunctionCall { args, .. } => args.iter_mut().collect(),
        };
        let count = children.len();
        match children.into_iter().nth(index) {
            Some(slot) => *slot = replacement,
            None => panic!(
                "substitute_child index {} out of range for node with {} children",
                index, count
            ),
        }
    }

    /// Evaluate against a variable environment.
    ///
    /// Assignments write through to `variables`; everything else is
    /// side-effect free. A name absent from `variables` evaluates to
    /// [`Value::Null`].
    pub fn evaluate(&self, variables: &mut Variables) -> Result<Value, EvalError> {
        evaluate(self, variables)
    }

    /// Render canonical source text. Re-parsing the result yields a
    /// structurally equivalent tree; whitespace and parenthesization are
    /// normalized.
    pub fn to_code(&self) -> String {
        crate::output::to_code(self)
    }
}
