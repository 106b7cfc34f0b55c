/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Logical OR (`||`)
    Or,
    /// Logical AND (`&&`)
    And,

    // Equality
    /// Loose equal (`==`), type-coercing
    Eq,
    /// Loose not equal (`!=`)
    NotEq,
    /// Strict equal (`===`), types must match
    StrictEq,
    /// Strict not equal (`!==`)
    NotStrictEq,

    // Relational
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    LtEq,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    GtEq,
    /// Membership test (`in`): list element or map key
    In,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`), always floating-point
    Divide,

    // Access
    /// Member access (`a.name`)
    Dot,
    /// Index access (`a[expr]`)
    Index,
}

impl BinOp {
    /// Surface form of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::StrictEq => "===",
            BinOp::NotStrictEq => "!==",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::In => "in",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Dot => ".",
            BinOp::Index => "[",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`!`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
}

impl UnaryOp {
    /// Surface form of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}
