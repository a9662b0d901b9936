//! Typed GLSL IR.
//!
//! Lowering turns host trees into these nodes: every expression carries
//! exactly one resolved type and every name is already the GLSL spelling.
//! Text emission works from this IR alone and cannot fail.

use alloc::{boxed::Box, string::String, vec::Vec};

use shaderdef_ir::{Literal, TypeDescriptor};

use crate::types::GlslTypeName;

/// A resolved expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: ExprKind,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Variable, global or built-in, by GLSL name
    Var(String),
    /// Member access or swizzle
    Field { base: Box<TypedExpr>, field: String },
    Index {
        base: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    Binary {
        op: &'static str,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    Unary {
        op: &'static str,
        operand: Box<TypedExpr>,
    },
    /// Function call or constructor (`vec3`, `float[3]`, struct name)
    Call { name: String, args: Vec<TypedExpr> },
    Ternary {
        cond: Box<TypedExpr>,
        then: Box<TypedExpr>,
        otherwise: Box<TypedExpr>,
    },
}

impl TypedExpr {
    pub fn new(kind: ExprKind, ty: TypeDescriptor) -> Self {
        TypedExpr { kind, ty }
    }

    pub fn literal(value: Literal) -> Self {
        let ty = match value {
            Literal::Bool(_) => TypeDescriptor::bool(),
            Literal::Int(_) => TypeDescriptor::int(),
            Literal::Float(_) => TypeDescriptor::float(),
        };
        TypedExpr::new(ExprKind::Literal(value), ty)
    }

    pub fn var(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        TypedExpr::new(ExprKind::Var(name.into()), ty)
    }

    pub fn field(base: TypedExpr, field: impl Into<String>, ty: TypeDescriptor) -> Self {
        TypedExpr::new(
            ExprKind::Field {
                base: Box::new(base),
                field: field.into(),
            },
            ty,
        )
    }

    pub fn index(base: TypedExpr, index: TypedExpr, ty: TypeDescriptor) -> Self {
        TypedExpr::new(
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn binary(op: &'static str, lhs: TypedExpr, rhs: TypedExpr, ty: TypeDescriptor) -> Self {
        TypedExpr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn call(name: impl Into<String>, args: Vec<TypedExpr>, ty: TypeDescriptor) -> Self {
        TypedExpr::new(
            ExprKind::Call {
                name: name.into(),
                args,
            },
            ty,
        )
    }

    pub fn as_literal(&self) -> Option<Literal> {
        match self.kind {
            ExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Check if the rendered text is already wrapped in parentheses.
    pub fn is_parenthesized(&self) -> bool {
        matches!(self.kind, ExprKind::Binary { .. } | ExprKind::Ternary { .. })
    }
}

/// Increment clause of a lowered `for`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForStep {
    /// `i++`
    Increment,
    /// `i += k`
    Add(TypedExpr),
    /// `i -= k`
    Sub(TypedExpr),
}

/// A lowered statement.
#[derive(Debug, Clone, PartialEq)]
pub enum GlslStmt {
    Declare {
        ty: GlslTypeName,
        name: String,
        init: Option<TypedExpr>,
    },
    Assign {
        target: TypedExpr,
        value: TypedExpr,
    },
    Expr(TypedExpr),
    /// Call whose result is discarded, including `void` built-ins
    Call { name: String, args: Vec<TypedExpr> },
    If {
        cond: TypedExpr,
        then: Vec<GlslStmt>,
        otherwise: Vec<GlslStmt>,
    },
    For {
        var: String,
        var_ty: GlslTypeName,
        start: TypedExpr,
        /// `<` or `>`
        cmp: &'static str,
        stop: TypedExpr,
        step: ForStep,
        body: Vec<GlslStmt>,
    },
    While {
        cond: TypedExpr,
        body: Vec<GlslStmt>,
    },
    Break,
    Continue,
    Return(Option<TypedExpr>),
    Discard,
}

/// A lowered function, ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct GlslFunction {
    pub name: String,
    /// `void` or a GLSL type name
    pub return_type: String,
    pub params: Vec<(GlslTypeName, String)>,
    pub body: Vec<GlslStmt>,
}

/// Member of an interface block or struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Interpolation qualifier, only when explicitly given
    pub qualifier: Option<&'static str>,
    pub ty: GlslTypeName,
    pub name: String,
}

/// File-scope declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalDecl {
    /// Stage layout line, e.g. `layout(vertices = 3) out;`
    Layout(String),
    Struct {
        name: String,
        members: Vec<Member>,
    },
    Constant {
        ty: GlslTypeName,
        name: String,
        value: TypedExpr,
    },
    /// `[layout(location=N)] in|out T name;`
    Variable {
        location: Option<u32>,
        direction: &'static str,
        ty: GlslTypeName,
        name: String,
    },
    /// `in|out Block { ... } instance[];`
    Block {
        direction: &'static str,
        block: String,
        members: Vec<Member>,
        instance: String,
        arrayed: bool,
    },
    /// `[layout(format)] uniform T name;`
    Uniform {
        format: Option<&'static str>,
        ty: GlslTypeName,
        name: String,
    },
    Shared {
        ty: GlslTypeName,
        name: String,
    },
}
