//! Syntax tree for the simple language, with byte spans throughout so the
//! model builder can hand exact edit locations to the instrumentor.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    pub line: u32,
}

/// A braced statement list. `open`/`close` are the byte offsets of the
/// braces themselves.
#[derive(Debug, Clone)]
pub struct Block {
    pub open: u32,
    pub close: u32,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: i64,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
        span: Span,
    },
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Print {
        value: Expr,
        span: Span,
    },
    /// A bare call statement, e.g. `tick();` or an injected `__hit(3);`
    Call {
        call: Expr,
        span: Span,
    },
    If {
        /// `if` plus any `else if` continuations, in source order
        arms: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Block,
        span: Span,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Print { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Switch { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, Span),
    Bool(bool, Span),
    Var(String, Span),
    Call {
        callee: String,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span) | Expr::Bool(_, span) | Expr::Var(_, span) => *span,
            Expr::Call { span, .. } | Expr::Unary { span, .. } | Expr::Binary { span, .. } => *span,
        }
    }

    /// Widen a node's span, e.g. to cover the parentheses around it
    pub fn with_span(self, new: Span) -> Expr {
        match self {
            Expr::Int(value, _) => Expr::Int(value, new),
            Expr::Bool(value, _) => Expr::Bool(value, new),
            Expr::Var(name, _) => Expr::Var(name, new),
            Expr::Call { callee, args, .. } => Expr::Call {
                callee,
                args,
                span: new,
            },
            Expr::Unary { op, operand, .. } => Expr::Unary {
                op,
                operand,
                span: new,
            },
            Expr::Binary { op, lhs, rhs, .. } => Expr::Binary {
                op,
                lhs,
                rhs,
                span: new,
            },
        }
    }
}
