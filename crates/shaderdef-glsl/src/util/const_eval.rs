//! Compile-time folding of host expressions.
//!
//! Only what fixed-size arrays and loop bounds need: literals, unary and
//! binary arithmetic on literals, comparisons, `len()` of statically sized
//! values, and names bound to compile-time constants. Locals and parameters
//! never fold.

use shaderdef_ir::{BinaryOp, Expr, Literal, TypeDescriptor, UnaryOp};

use crate::symbols::{Storage, SymbolTable};

/// Fold an expression to a literal, if it is a compile-time constant.
pub fn fold_constant(expr: &Expr, symbols: &SymbolTable) -> Option<Literal> {
    match expr {
        Expr::Literal(value) => Some(*value),
        Expr::Name(name) => symbols.lookup_variable(name)?.storage.constant_value(),
        Expr::Unary { op, operand } => fold_unary(*op, fold_constant(operand, symbols)?),
        Expr::Binary { op, lhs, rhs } => fold_binary(
            *op,
            fold_constant(lhs, symbols)?,
            fold_constant(rhs, symbols)?,
        ),
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if fold_constant(cond, symbols)?.as_bool()? {
                fold_constant(then, symbols)
            } else {
                fold_constant(otherwise, symbols)
            }
        }
        Expr::Call { func, args, keywords } if func == "len" && args.len() == 1 && keywords.is_empty() => {
            static_length(&args[0], symbols).and_then(|len| i64::try_from(len).ok()).map(Literal::Int)
        }
        _ => None,
    }
}

/// Fold an expression to an integer.
pub fn fold_int(expr: &Expr, symbols: &SymbolTable) -> Option<i64> {
    fold_constant(expr, symbols)?.as_int()
}

/// Statically known length of an array-valued expression.
pub fn static_length(expr: &Expr, symbols: &SymbolTable) -> Option<usize> {
    match expr {
        Expr::List(elements) => Some(elements.len()),
        Expr::Name(name) => {
            let var = symbols.lookup_variable(name)?;
            match (&var.storage, &var.ty) {
                (Storage::Interface { sequence: true, len, .. }, _) => *len,
                (_, TypeDescriptor::Array { length, .. }) => Some(*length),
                _ => None,
            }
        }
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, value: Literal) -> Option<Literal> {
    match (op, value) {
        (UnaryOp::Neg, Literal::Int(v)) => v.checked_neg().map(Literal::Int),
        (UnaryOp::Neg, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Plus, Literal::Int(_) | Literal::Float(_)) => Some(value),
        (UnaryOp::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        (UnaryOp::BitNot, Literal::Int(v)) => Some(Literal::Int(!v)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, lhs: Literal, rhs: Literal) -> Option<Literal> {
    match (lhs, rhs) {
        (Literal::Int(a), Literal::Int(b)) => fold_int_binary(op, a, b),
        (Literal::Bool(a), Literal::Bool(b)) => match op {
            BinaryOp::And => Some(Literal::Bool(a && b)),
            BinaryOp::Or => Some(Literal::Bool(a || b)),
            BinaryOp::Eq => Some(Literal::Bool(a == b)),
            BinaryOp::NotEq => Some(Literal::Bool(a != b)),
            _ => None,
        },
        (Literal::Bool(_), _) | (_, Literal::Bool(_)) => None,
        _ => fold_float_binary(op, lhs.as_float()?, rhs.as_float()?),
    }
}

fn fold_int_binary(op: BinaryOp, a: i64, b: i64) -> Option<Literal> {
    let int = |v: Option<i64>| v.map(Literal::Int);
    match op {
        BinaryOp::Add => int(a.checked_add(b)),
        BinaryOp::Sub => int(a.checked_sub(b)),
        BinaryOp::Mul => int(a.checked_mul(b)),
        BinaryOp::Div => int(a.checked_div(b)),
        BinaryOp::Mod => int(a.checked_rem(b)),
        BinaryOp::Shl => int(u32::try_from(b).ok().and_then(|s| a.checked_shl(s))),
        BinaryOp::Shr => int(u32::try_from(b).ok().and_then(|s| a.checked_shr(s))),
        BinaryOp::BitAnd => Some(Literal::Int(a & b)),
        BinaryOp::BitOr => Some(Literal::Int(a | b)),
        BinaryOp::BitXor => Some(Literal::Int(a ^ b)),
        BinaryOp::Eq => Some(Literal::Bool(a == b)),
        BinaryOp::NotEq => Some(Literal::Bool(a != b)),
        BinaryOp::Lt => Some(Literal::Bool(a < b)),
        BinaryOp::LtE => Some(Literal::Bool(a <= b)),
        BinaryOp::Gt => Some(Literal::Bool(a > b)),
        BinaryOp::GtE => Some(Literal::Bool(a >= b)),
        BinaryOp::MatMul | BinaryOp::And | BinaryOp::Or => None,
    }
}

fn fold_float_binary(op: BinaryOp, a: f64, b: f64) -> Option<Literal> {
    match op {
        BinaryOp::Add => Some(Literal::Float(a + b)),
        BinaryOp::Sub => Some(Literal::Float(a - b)),
        BinaryOp::Mul => Some(Literal::Float(a * b)),
        BinaryOp::Div if b != 0.0 => Some(Literal::Float(a / b)),
        BinaryOp::Eq => Some(Literal::Bool(a == b)),
        BinaryOp::NotEq => Some(Literal::Bool(a != b)),
        BinaryOp::Lt => Some(Literal::Bool(a < b)),
        BinaryOp::LtE => Some(Literal::Bool(a <= b)),
        BinaryOp::Gt => Some(Literal::Bool(a > b)),
        BinaryOp::GtE => Some(Literal::Bool(a >= b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use shaderdef_ir::{AggregateRole, TypeDescriptor};

    use super::*;

    fn symbols() -> SymbolTable {
        let mut symbols = SymbolTable::new();
        symbols
            .declare_variable("N", TypeDescriptor::int(), Storage::GlobalConstant(Literal::Int(4)))
            .unwrap();
        symbols
            .declare_variable("n", TypeDescriptor::int(), Storage::Parameter)
            .unwrap();
        symbols
            .declare_variable(
                "weights",
                TypeDescriptor::array(TypeDescriptor::float(), 5),
                Storage::Local,
            )
            .unwrap();
        symbols
            .declare_variable(
                "gl_in",
                TypeDescriptor::float(),
                Storage::Interface {
                    role: AggregateRole::BuiltinPerVertex,
                    sequence: true,
                    len: Some(3),
                },
            )
            .unwrap();
        symbols
    }

    #[test]
    fn test_integer_arithmetic() {
        let s = symbols();
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::name("N"),
            Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2)),
        );
        assert_eq!(fold_int(&expr, &s), Some(12));
        assert_eq!(
            fold_int(&Expr::unary(UnaryOp::Neg, Expr::int(3)), &s),
            Some(-3)
        );
        assert_eq!(
            fold_constant(&Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0)), &s),
            None
        );
    }

    #[test]
    fn test_parameters_never_fold() {
        let s = symbols();
        assert_eq!(fold_constant(&Expr::name("n"), &s), None);
        assert_eq!(
            fold_constant(&Expr::binary(BinaryOp::Add, Expr::name("n"), Expr::int(1)), &s),
            None
        );
    }

    #[test]
    fn test_len_folds() {
        let s = symbols();
        assert_eq!(fold_int(&Expr::call("len", vec![Expr::name("weights")]), &s), Some(5));
        assert_eq!(fold_int(&Expr::call("len", vec![Expr::name("gl_in")]), &s), Some(3));
        assert_eq!(fold_int(&Expr::call("len", vec![Expr::name("n")]), &s), None);
    }

    #[test]
    fn test_comparisons() {
        let s = symbols();
        let cmp = Expr::binary(BinaryOp::Lt, Expr::int(1), Expr::float(1.5));
        assert_eq!(fold_constant(&cmp, &s), Some(Literal::Bool(true)));
        let not = Expr::unary(UnaryOp::Not, Expr::bool(false));
        assert_eq!(fold_constant(&not, &s), Some(Literal::Bool(true)));
    }
}
