//! Display implementations for the host tree.
//!
//! Nodes are printed in host-language surface syntax so diagnostics can
//! quote the offending construct. Compound statements print their header
//! line only.

use core::fmt;

use crate::{
    ast::{BinaryOp, Comprehension, Expr, Literal, Stmt, StmtKind, UnaryOp},
    function::{FunctionSignature, Param, ParamQualifier, ReturnType},
};

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(value) => write!(f, "{}", value),
            // Debug keeps the fractional part ("2.0")
            Literal::Float(value) => write!(f, "{:?}", value),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Comprehension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} for {} in {}", self.element, self.target, self.iter)?;
        if let Some(filter) = &self.filter {
            write!(f, " if {}", filter)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Name(name) => f.write_str(name),
            Expr::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Expr::Subscript { value, index } => write!(f, "{}[{}]", value, index),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                write!(f, "{}(", func)?;
                write_list(f, args)?;
                for (i, keyword) in keywords.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", keyword.name, keyword.value)?;
                }
                write!(f, ")")
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => write!(f, "({} if {} else {})", then, cond, otherwise),
            Expr::List(elements) => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            Expr::ListComp(comp) => write!(f, "{}", comp),
            Expr::TypeRef(ty) => write!(f, "{}", ty),
            Expr::Unsupported { construct } => write!(f, "<{}>", construct),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StmtKind::Assign { target, value } => write!(f, "{} = {}", target, value),
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                write!(f, "{}: {}", target, annotation)?;
                if let Some(value) = value {
                    write!(f, " = {}", value)?;
                }
                Ok(())
            }
            StmtKind::AugAssign { target, op, value } => {
                write!(f, "{} {}= {}", target, op, value)
            }
            StmtKind::If { test, .. } => write!(f, "if {}:", test),
            StmtKind::For { target, iter, .. } => write!(f, "for {} in {}:", target, iter),
            StmtKind::While { test, .. } => write!(f, "while {}:", test),
            StmtKind::Break => write!(f, "break"),
            StmtKind::Continue => write!(f, "continue"),
            StmtKind::Return(None) => write!(f, "return"),
            StmtKind::Return(Some(value)) => write!(f, "return {}", value),
            StmtKind::Yield(value) => write!(f, "yield {}", value),
            StmtKind::Discard => write!(f, "discard()"),
            StmtKind::Expr(expr) => write!(f, "{}", expr),
            StmtKind::Pass => write!(f, "pass"),
            StmtKind::Unsupported { construct } => write!(f, "<{} statement>", construct),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qualifier {
            ParamQualifier::None => write!(f, "{}: {}", self.name, self.ty),
            ParamQualifier::Uniform => write!(f, "{}: uniform {}", self.name, self.ty),
            ParamQualifier::Sequence => write!(f, "{}: Sequence[{}]", self.name, self.ty),
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => write!(f, "None"),
            ReturnType::Value(ty) => write!(f, "{}", ty),
            ReturnType::Generator(ty) => write!(f, "Iterator[{}]", ty),
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def {}(", self.name)?;
        write_list(f, &self.params)?;
        write!(f, ") -> {}", self.returns)
    }
}
