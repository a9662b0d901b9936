//! Operator typing.
//!
//! Arithmetic promotes both operands to a common component kind and then
//! applies GLSL's shape rules: scalars broadcast, vectors match by size,
//! and matrix products follow column-major linear algebra.

use alloc::{boxed::Box, vec};

use shaderdef_ir::{BinaryOp, Expr, Literal, ScalarKind, TypeDescriptor, UnaryOp};

use crate::{
    error::{bail, GlslResult},
    expr::typecheck::{coerce, type_check_expr, unify_types},
    function::LowerContext,
    ir::{ExprKind, TypedExpr},
    types::common_kind,
};

/// Lower a binary expression.
pub fn type_check_binary(
    ctx: &mut dyn LowerContext,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> GlslResult<TypedExpr> {
    let lhs = type_check_expr(ctx, lhs)?;
    let rhs = type_check_expr(ctx, rhs)?;
    binary_op(ctx, op, lhs, rhs)
}

/// Type an operator applied to already lowered operands.
pub fn binary_op(
    ctx: &mut dyn LowerContext,
    op: BinaryOp,
    lhs: TypedExpr,
    rhs: TypedExpr,
) -> GlslResult<TypedExpr> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            if !lhs.ty.is_bool() || !rhs.ty.is_bool() {
                bail!(
                    TypeMismatch,
                    "'{}' needs bool operands, found {} and {}",
                    op,
                    lhs.ty,
                    rhs.ty
                );
            }
            let symbol = if op == BinaryOp::And { "&&" } else { "||" };
            Ok(TypedExpr::binary(symbol, lhs, rhs, TypeDescriptor::bool()))
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            let ty = unify_types(&[lhs.ty.clone(), rhs.ty.clone()])?;
            let lhs = coerce(ctx.registry(), lhs, &ty)?;
            let rhs = coerce(ctx.registry(), rhs, &ty)?;
            Ok(TypedExpr::binary(op.symbol(), lhs, rhs, TypeDescriptor::bool()))
        }
        BinaryOp::Lt | BinaryOp::LtE | BinaryOp::Gt | BinaryOp::GtE => {
            if !lhs.ty.is_scalar() || !rhs.ty.is_scalar() {
                bail!(
                    TypeMismatch,
                    "'{}' compares scalars only, found {} and {}; use lessThan() and friends for vectors",
                    op,
                    lhs.ty,
                    rhs.ty
                );
            }
            let kind = numeric_kind(op, &lhs, &rhs)?;
            let lhs = promote(ctx, lhs, kind)?;
            let rhs = promote(ctx, rhs, kind)?;
            Ok(TypedExpr::binary(op.symbol(), lhs, rhs, TypeDescriptor::bool()))
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            integer_kinds(op, &lhs, &rhs)?;
            let shape_ok = rhs.ty.is_scalar() || rhs.ty.component_count() == lhs.ty.component_count();
            if !shape_ok || (lhs.ty.is_scalar() && !rhs.ty.is_scalar()) {
                bail!(
                    TypeMismatch,
                    "cannot shift {} by {}",
                    lhs.ty,
                    rhs.ty
                );
            }
            let ty = lhs.ty.clone();
            Ok(TypedExpr::binary(op.symbol(), lhs, rhs, ty))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            integer_kinds(op, &lhs, &rhs)?;
            arithmetic(ctx, op, lhs, rhs)
        }
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::MatMul
        | BinaryOp::Div
        | BinaryOp::Mod => arithmetic(ctx, op, lhs, rhs),
    }
}

fn numeric_kind(op: BinaryOp, lhs: &TypedExpr, rhs: &TypedExpr) -> GlslResult<ScalarKind> {
    let kinds = (lhs.ty.scalar_kind(), rhs.ty.scalar_kind());
    match kinds {
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => match common_kind(a, b) {
            Some(kind) => Ok(kind),
            None => bail!(TypeMismatch, "'{}' cannot mix {} and {}", op, lhs.ty, rhs.ty),
        },
        _ => bail!(
            TypeMismatch,
            "'{}' needs numeric operands, found {} and {}",
            op,
            lhs.ty,
            rhs.ty
        ),
    }
}

fn integer_kinds(op: BinaryOp, lhs: &TypedExpr, rhs: &TypedExpr) -> GlslResult<()> {
    match (lhs.ty.scalar_kind(), rhs.ty.scalar_kind()) {
        (Some(a), Some(b)) if a.is_integer() && b.is_integer() && !lhs.ty.is_matrix() && !rhs.ty.is_matrix() => {
            Ok(())
        }
        _ => bail!(
            TypeMismatch,
            "'{}' needs integer operands, found {} and {}",
            op,
            lhs.ty,
            rhs.ty
        ),
    }
}

/// Convert a value to the same shape with component kind `kind`.
fn promote(ctx: &dyn LowerContext, value: TypedExpr, kind: ScalarKind) -> GlslResult<TypedExpr> {
    match value.ty.with_component(kind) {
        Some(target) => coerce(ctx.registry(), value, &target),
        None => bail!(TypeMismatch, "{} is not numeric", value.ty),
    }
}

fn arithmetic(
    ctx: &mut dyn LowerContext,
    op: BinaryOp,
    lhs: TypedExpr,
    rhs: TypedExpr,
) -> GlslResult<TypedExpr> {
    let mut kind = numeric_kind(op, &lhs, &rhs)?;
    let has_matrix = lhs.ty.is_matrix() || rhs.ty.is_matrix();
    if has_matrix && op == BinaryOp::Mod {
        bail!(TypeMismatch, "'%' is not defined for {} and {}", lhs.ty, rhs.ty);
    }
    if has_matrix && !kind.is_floating() {
        kind = ScalarKind::Float;
    }
    let lhs = promote(ctx, lhs, kind)?;
    let rhs = promote(ctx, rhs, kind)?;
    let ty = result_shape(op, &lhs.ty, &rhs.ty)?;

    if op == BinaryOp::Mod && kind.is_floating() {
        // Float remainder is the mod() built-in, which takes a scalar
        // divisor but not a scalar dividend
        let lhs = if lhs.ty.is_scalar() && !rhs.ty.is_scalar() {
            let name = ctx.registry().resolve(&ty)?;
            TypedExpr::call(alloc::format!("{}", name), vec![lhs], ty.clone())
        } else {
            lhs
        };
        return Ok(TypedExpr::call("mod", vec![lhs, rhs], ty));
    }
    let symbol = if op == BinaryOp::MatMul { "*" } else { op.symbol() };
    Ok(TypedExpr::binary(symbol, lhs, rhs, ty))
}

/// Result type of an arithmetic operator on operands of one component kind.
pub fn result_shape(op: BinaryOp, lhs: &TypeDescriptor, rhs: &TypeDescriptor) -> GlslResult<TypeDescriptor> {
    use TypeDescriptor::{Matrix, Scalar, Vector};

    let product = matches!(op, BinaryOp::Mul | BinaryOp::MatMul);
    if op == BinaryOp::MatMul && !lhs.is_matrix() && !rhs.is_matrix() {
        bail!(
            TypeMismatch,
            "'@' needs a matrix operand, found {} and {}",
            lhs,
            rhs
        );
    }
    match (lhs, rhs) {
        (Scalar(_), Scalar(_)) => Ok(lhs.clone()),
        (Scalar(_), Vector { .. }) | (Scalar(_), Matrix { .. }) if op != BinaryOp::MatMul => Ok(rhs.clone()),
        (Vector { .. }, Scalar(_)) | (Matrix { .. }, Scalar(_)) if op != BinaryOp::MatMul => Ok(lhs.clone()),
        (Vector { size: a, .. }, Vector { size: b, .. }) if a == b => Ok(lhs.clone()),
        (
            Matrix {
                component,
                cols: lc,
                rows: lr,
            },
            Matrix {
                cols: rc, rows: rr, ..
            },
        ) => {
            if product {
                if lc != rr {
                    bail!(TypeMismatch, "cannot multiply {} by {}", lhs, rhs);
                }
                Ok(Matrix {
                    component: *component,
                    cols: *rc,
                    rows: *lr,
                })
            } else if lc == rc && lr == rr && op != BinaryOp::Mod {
                Ok(lhs.clone())
            } else {
                bail!(TypeMismatch, "'{}' cannot combine {} and {}", op, lhs, rhs)
            }
        }
        (Matrix { cols, rows, component }, Vector { size, .. }) if product => {
            if cols != size {
                bail!(TypeMismatch, "cannot multiply {} by {}", lhs, rhs);
            }
            Ok(Vector {
                component: *component,
                size: *rows,
            })
        }
        (Vector { size, component }, Matrix { cols, rows, .. }) if product => {
            if size != rows {
                bail!(TypeMismatch, "cannot multiply {} by {}", lhs, rhs);
            }
            Ok(Vector {
                component: *component,
                size: *cols,
            })
        }
        _ => bail!(TypeMismatch, "'{}' cannot combine {} and {}", op, lhs, rhs),
    }
}

/// Lower a unary expression.
pub fn type_check_unary(ctx: &mut dyn LowerContext, op: UnaryOp, operand: &Expr) -> GlslResult<TypedExpr> {
    let operand = type_check_expr(ctx, operand)?;
    unary_op(op, operand)
}

/// Type a unary operator applied to a lowered operand.
pub fn unary_op(op: UnaryOp, operand: TypedExpr) -> GlslResult<TypedExpr> {
    let ty = operand.ty.clone();
    match op {
        UnaryOp::Neg | UnaryOp::Plus => {
            if !ty.scalar_kind().is_some_and(ScalarKind::is_numeric) {
                bail!(TypeMismatch, "'{}' needs a numeric operand, found {}", op, ty);
            }
            if op == UnaryOp::Plus {
                return Ok(operand);
            }
            match operand.as_literal() {
                Some(Literal::Int(v)) if v != i64::MIN => {
                    Ok(TypedExpr::new(ExprKind::Literal(Literal::Int(-v)), ty))
                }
                Some(Literal::Float(v)) => Ok(TypedExpr::new(ExprKind::Literal(Literal::Float(-v)), ty)),
                _ => Ok(unary("-", operand, ty)),
            }
        }
        UnaryOp::Not => match ty.scalar_kind() {
            Some(ScalarKind::Bool) if ty.is_scalar() => Ok(unary("!", operand, ty)),
            Some(ScalarKind::Bool) if ty.is_vector() => Ok(TypedExpr::call("not", vec![operand], ty)),
            _ => bail!(TypeMismatch, "'not' needs a bool operand, found {}", ty),
        },
        UnaryOp::BitNot => match ty.scalar_kind() {
            Some(kind) if kind.is_integer() && !ty.is_matrix() => Ok(unary("~", operand, ty)),
            _ => bail!(TypeMismatch, "'~' needs an integer operand, found {}", ty),
        },
    }
}

fn unary(op: &'static str, operand: TypedExpr, ty: TypeDescriptor) -> TypedExpr {
    TypedExpr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, expr::codegen::generate_expr};

    #[test]
    fn test_matrix_shapes() {
        let m3 = TypeDescriptor::mat3();
        let v3 = TypeDescriptor::vec3();
        assert_eq!(result_shape(BinaryOp::Mul, &m3, &v3).unwrap(), v3);
        assert_eq!(result_shape(BinaryOp::MatMul, &v3, &m3).unwrap(), v3);
        // mat2x3 (2 columns, 3 rows) times mat4x2 (4 columns, 2 rows) is mat4x3
        let product = result_shape(
            BinaryOp::MatMul,
            &TypeDescriptor::matrix(2, 3),
            &TypeDescriptor::matrix(4, 2),
        )
        .unwrap();
        assert_eq!(product, TypeDescriptor::matrix(4, 3));
        assert!(result_shape(BinaryOp::Mul, &TypeDescriptor::mat4(), &v3).is_err());
    }

    #[test]
    fn test_matmul_needs_matrix() {
        let err = result_shape(BinaryOp::MatMul, &TypeDescriptor::vec3(), &TypeDescriptor::vec3()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)));
    }

    #[test]
    fn test_broadcast_and_size_mismatch() {
        let v4 = TypeDescriptor::vec4();
        assert_eq!(
            result_shape(BinaryOp::Add, &TypeDescriptor::float(), &v4).unwrap(),
            v4
        );
        assert!(result_shape(BinaryOp::Add, &TypeDescriptor::vec3(), &v4).is_err());
    }

    #[test]
    fn test_unary_forms() {
        let neg = unary_op(UnaryOp::Neg, TypedExpr::literal(Literal::Int(2))).unwrap();
        assert_eq!(generate_expr(&neg), "-2");

        let flags = TypedExpr::var("flags", TypeDescriptor::bvec(3));
        let not = unary_op(UnaryOp::Not, flags).unwrap();
        assert_eq!(generate_expr(&not), "not(flags)");

        let done = TypedExpr::var("done", TypeDescriptor::bool());
        assert_eq!(generate_expr(&unary_op(UnaryOp::Not, done).unwrap()), "!done");

        let x = TypedExpr::var("x", TypeDescriptor::float());
        assert!(unary_op(UnaryOp::BitNot, x).is_err());
    }
}
