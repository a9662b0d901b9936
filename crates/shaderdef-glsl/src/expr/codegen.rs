//! Code generation for GLSL expressions.
//!
//! Every binary and ternary node is wrapped in parentheses, so the output
//! never depends on GLSL operator precedence.

use alloc::{format, string::String};

use shaderdef_ir::{Literal, ScalarKind, TypeDescriptor};

use crate::ir::{ExprKind, TypedExpr};

/// Render an expression as GLSL source.
pub fn generate_expr(expr: &TypedExpr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Render a control-flow condition, adding parentheses only when the
/// expression does not already carry them.
pub fn generate_condition(expr: &TypedExpr) -> String {
    if expr.is_parenthesized() {
        generate_expr(expr)
    } else {
        format!("({})", generate_expr(expr))
    }
}

/// Float literal that always carries a decimal point or an exponent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::from("(0.0 / 0.0)");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 {
            "(1.0 / 0.0)"
        } else {
            "(-1.0 / 0.0)"
        });
    }
    // Debug keeps a trailing ".0" and switches to exponent form for extremes
    format!("{:?}", value)
}

fn write_literal(out: &mut String, value: Literal, ty: &TypeDescriptor) {
    match value {
        Literal::Bool(b) => out.push_str(if b { "true" } else { "false" }),
        Literal::Int(i) => {
            out.push_str(&format!("{}", i));
            if ty.scalar_kind() == Some(ScalarKind::Uint) {
                out.push('u');
            }
        }
        Literal::Float(f) => {
            out.push_str(&format_float(f));
            if ty.scalar_kind() == Some(ScalarKind::Double) && f.is_finite() {
                out.push_str("lf");
            }
        }
    }
}

fn write_expr(out: &mut String, expr: &TypedExpr) {
    match &expr.kind {
        ExprKind::Literal(value) => write_literal(out, *value, &expr.ty),
        ExprKind::Var(name) => out.push_str(name),
        ExprKind::Field { base, field } => {
            write_expr(out, base);
            out.push('.');
            out.push_str(field);
        }
        ExprKind::Index { base, index } => {
            write_expr(out, base);
            out.push('[');
            write_expr(out, index);
            out.push(']');
        }
        ExprKind::Binary { op, lhs, rhs } => {
            out.push('(');
            write_expr(out, lhs);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            write_expr(out, rhs);
            out.push(')');
        }
        ExprKind::Unary { op, operand } => {
            let inner = generate_expr(operand);
            out.push_str(op);
            // `- -x` would read as a decrement
            if inner.starts_with(op) {
                out.push('(');
                out.push_str(&inner);
                out.push(')');
            } else {
                out.push_str(&inner);
            }
        }
        ExprKind::Call { name, args } => {
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
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            out.push('(');
            write_expr(out, cond);
            out.push_str(" ? ");
            write_expr(out, then);
            out.push_str(" : ");
            write_expr(out, otherwise);
            out.push(')');
        }
    }
}
