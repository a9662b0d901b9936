//! Expression and statement trees handed over by the front end.
//!
//! The tree mirrors the restricted host language: it is already parsed and
//! structured, but names, member accesses and calls are still unresolved.
//! Constructs the host language has but the transpiler cannot express are
//! kept as `Unsupported` nodes so they can be reported with context.

use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};

use crate::{sourceloc::SourceLoc, types::TypeDescriptor};

/// Literal constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    pub fn as_int(self) -> Option<i64> {
        match self {
            Literal::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Literal::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric value as a float, for mixed comparisons.
    pub fn as_float(self) -> Option<f64> {
        match self {
            Literal::Int(value) => Some(value as f64),
            Literal::Float(value) => Some(value),
            Literal::Bool(_) => None,
        }
    }
}

/// Binary operator in host spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// `@`, explicit matrix multiplication
    MatMul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl BinaryOp {
    /// Operator as written in the host language.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::MatMul => "@",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtE => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtE => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtE
                | BinaryOp::Gt
                | BinaryOp::GtE
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
        )
    }
}

/// Unary operator in host spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "not ",
            UnaryOp::BitNot => "~",
        }
    }
}

/// Keyword argument of a call (`Out(color=c)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

/// `[element for target in iter if filter]`
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub element: Expr,
    pub target: String,
    pub iter: Expr,
    pub filter: Option<Expr>,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    /// Member access or swizzle
    Attribute { value: Box<Expr>, attr: String },
    Subscript { value: Box<Expr>, index: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Call {
        func: String,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Array literal
    List(Vec<Expr>),
    ListComp(Box<Comprehension>),
    /// A type used as a value, e.g. the argument of `shared(...)`
    TypeRef(TypeDescriptor),
    /// Host construct with no shader equivalent (`lambda`, dict literal, ...)
    Unsupported { construct: String },
}

impl Expr {
    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal(Literal::Float(value))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Positional call.
    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: func.into(),
            args,
            keywords: Vec::new(),
        }
    }

    /// Call with keyword arguments only.
    pub fn call_kw<S: Into<String>>(func: impl Into<String>, keywords: Vec<(S, Expr)>) -> Self {
        Expr::Call {
            func: func.into(),
            args: Vec::new(),
            keywords: keywords
                .into_iter()
                .map(|(name, value)| Keyword {
                    name: name.into(),
                    value,
                })
                .collect(),
        }
    }

    pub fn ternary(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn list(elements: Vec<Expr>) -> Self {
        Expr::List(elements)
    }

    pub fn list_comp(
        element: Expr,
        target: impl Into<String>,
        iter: Expr,
        filter: Option<Expr>,
    ) -> Self {
        Expr::ListComp(Box::new(Comprehension {
            element,
            target: target.into(),
            iter,
            filter,
        }))
    }

    /// `range(args...)`
    pub fn range(args: Vec<Expr>) -> Self {
        Expr::call("range", args)
    }

    pub fn type_ref(ty: TypeDescriptor) -> Self {
        Expr::TypeRef(ty)
    }

    pub fn unsupported(construct: impl Into<String>) -> Self {
        Expr::Unsupported {
            construct: construct.into(),
        }
    }

    /// `self.attr`
    pub fn attr(self, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(self),
            attr: attr.into(),
        }
    }

    /// `self[index]`
    pub fn index(self, index: Expr) -> Self {
        Expr::Subscript {
            value: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: Expr,
        value: Expr,
    },
    /// Explicitly typed declaration, `name: T = value`
    AnnAssign {
        target: String,
        annotation: TypeDescriptor,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: BinaryOp,
        value: Expr,
    },
    /// `elif` chains are nested `If`s in `orelse`
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Yield(Expr),
    Discard,
    Expr(Expr),
    Pass,
    Unsupported {
        construct: String,
    },
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            loc: SourceLoc::default(),
        }
    }

    /// Attach a host line number.
    pub fn at(mut self, line: u32) -> Self {
        self.loc = SourceLoc::line(line);
        self
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::new(StmtKind::Assign { target, value })
    }

    pub fn declare(target: impl Into<String>, annotation: TypeDescriptor, value: Option<Expr>) -> Self {
        Stmt::new(StmtKind::AnnAssign {
            target: target.into(),
            annotation,
            value,
        })
    }

    pub fn aug_assign(target: Expr, op: BinaryOp, value: Expr) -> Self {
        Stmt::new(StmtKind::AugAssign { target, op, value })
    }

    pub fn if_(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::If { test, body, orelse })
    }

    pub fn for_(target: impl Into<String>, iter: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::For {
            target: target.into(),
            iter,
            body,
        })
    }

    pub fn while_(test: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::While { test, body })
    }

    pub fn break_() -> Self {
        Stmt::new(StmtKind::Break)
    }

    pub fn continue_() -> Self {
        Stmt::new(StmtKind::Continue)
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::new(StmtKind::Return(value))
    }

    pub fn yield_(value: Expr) -> Self {
        Stmt::new(StmtKind::Yield(value))
    }

    pub fn discard() -> Self {
        Stmt::new(StmtKind::Discard)
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::new(StmtKind::Expr(expr))
    }

    pub fn pass() -> Self {
        Stmt::new(StmtKind::Pass)
    }

    pub fn unsupported(construct: impl ToString) -> Self {
        Stmt::new(StmtKind::Unsupported {
            construct: construct.to_string(),
        })
    }
}
