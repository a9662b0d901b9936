//! Lowering of `if`, `while`, counted `for` loops and list comprehensions.

use alloc::{string::String, vec::Vec};

use shaderdef_ir::{Comprehension, Expr, Literal, ScalarKind, Stmt, TypeDescriptor};

use crate::{
    error::{bail, glsl_err, GlslResult},
    expr::typecheck::{
        coerce, type_check_condition, type_check_expr, type_check_initializer, unify_types,
    },
    function::LowerContext,
    ir::{ExprKind, ForStep, GlslStmt, TypedExpr},
    stmt::typecheck::{declare_local, type_check_block},
    symbols::Storage,
    util::{fold_constant, fold_int},
};

/// Upper bound on the number of elements a comprehension unrolls to.
const MAX_UNROLL: usize = 4096;

pub fn type_check_if(
    ctx: &mut dyn LowerContext,
    test: &Expr,
    body: &[Stmt],
    orelse: &[Stmt],
) -> GlslResult<GlslStmt> {
    let cond = type_check_condition(ctx, test)?;
    let then = type_check_block(ctx, body)?;
    let otherwise = type_check_block(ctx, orelse)?;
    Ok(GlslStmt::If {
        cond,
        then,
        otherwise,
    })
}

pub fn type_check_while(ctx: &mut dyn LowerContext, test: &Expr, body: &[Stmt]) -> GlslResult<GlslStmt> {
    let cond = type_check_condition(ctx, test)?;
    ctx.enter_loop();
    let body = type_check_block(ctx, body);
    ctx.exit_loop();
    Ok(GlslStmt::While { cond, body: body? })
}

/// `range()` arguments of a `for` or a comprehension.
#[derive(Debug)]
struct RangeArgs<'e> {
    start: Option<&'e Expr>,
    stop: &'e Expr,
    step: Option<&'e Expr>,
}

fn range_args(iter: &Expr) -> GlslResult<RangeArgs<'_>> {
    match iter {
        Expr::Call {
            func,
            args,
            keywords,
        } if func == "range" && keywords.is_empty() => match args.as_slice() {
            [stop] => Ok(RangeArgs {
                start: None,
                stop,
                step: None,
            }),
            [start, stop] => Ok(RangeArgs {
                start: Some(start),
                stop,
                step: None,
            }),
            [start, stop, step] => Ok(RangeArgs {
                start: Some(start),
                stop,
                step: Some(step),
            }),
            _ => bail!(
                TypeMismatch,
                "range() takes 1 to 3 arguments, found {}",
                args.len()
            ),
        },
        other => bail!(
            UnsupportedConstruct,
            "cannot iterate over `{}`; only range() is supported",
            other
        ),
    }
}

/// Lower `for target in range(...)` to a counted GLSL loop.
pub fn type_check_for(
    ctx: &mut dyn LowerContext,
    target: &str,
    iter: &Expr,
    body: &[Stmt],
) -> GlslResult<GlslStmt> {
    let range = range_args(iter).map_err(|e| e.with_node(iter))?;
    let start = match range.start {
        Some(start) => type_check_expr(ctx, start)?,
        None => TypedExpr::literal(Literal::Int(0)),
    };
    let stop = type_check_expr(ctx, range.stop)?;
    for bound in [&start, &stop] {
        if !bound.ty.is_integer_scalar() {
            bail!(TypeMismatch, "range() bounds must be int or uint, found {}", bound.ty);
        }
    }
    let var_ty = if start.ty == TypeDescriptor::uint() || stop.ty == TypeDescriptor::uint() {
        TypeDescriptor::uint()
    } else {
        TypeDescriptor::int()
    };
    let start = coerce(ctx.registry(), start, &var_ty)?;
    let stop = coerce(ctx.registry(), stop, &var_ty)?;

    let (cmp, step) = match range.step {
        None => ("<", ForStep::Increment),
        Some(step) => match fold_int(step, ctx.symbols()) {
            Some(0) => bail!(UnsupportedConstruct, "range() step must not be zero"),
            Some(1) => ("<", ForStep::Increment),
            Some(k) if k > 0 => ("<", ForStep::Add(step_literal(k, &var_ty))),
            Some(k) => match k.checked_neg() {
                Some(down) => (">", ForStep::Sub(step_literal(down, &var_ty))),
                None => bail!(UnsupportedConstruct, "range() step {} is out of range", k),
            },
            None => {
                let lowered = type_check_expr(ctx, step)?;
                if !lowered.ty.is_integer_scalar() {
                    bail!(TypeMismatch, "range() step must be int or uint, found {}", lowered.ty);
                }
                ("<", ForStep::Add(coerce(ctx.registry(), lowered, &var_ty)?))
            }
        },
    };
    if cmp == ">" && var_ty == TypeDescriptor::uint() {
        log::debug!("descending uint loop over '{}' may wrap at zero", target);
    }

    let glsl_ty = ctx.resolve_type(&var_ty)?;
    ctx.symbols_mut().push_scope();
    let lowered = ctx
        .symbols_mut()
        .declare_variable(target, var_ty, Storage::LoopIndex)
        .and_then(|()| {
            ctx.enter_loop();
            let body = type_check_block(ctx, body);
            ctx.exit_loop();
            body
        });
    ctx.symbols_mut().pop_scope();

    Ok(GlslStmt::For {
        var: String::from(target),
        var_ty: glsl_ty,
        start,
        cmp,
        stop,
        step,
        body: lowered?,
    })
}

fn step_literal(k: i64, var_ty: &TypeDescriptor) -> TypedExpr {
    TypedExpr::new(ExprKind::Literal(Literal::Int(k)), var_ty.clone())
}

/// Values a constant `range()` produces.
fn unrolled_range(ctx: &dyn LowerContext, iter: &Expr) -> GlslResult<Vec<i64>> {
    let range = range_args(iter)?;
    let fold = |expr: &Expr| match fold_int(expr, ctx.symbols()) {
        Some(value) => Ok(value),
        None => Err(glsl_err!(
            NonConstantBound,
            "comprehension bound `{}` must be a compile-time constant",
            expr
        )),
    };
    let start = range.start.map(fold).transpose()?.unwrap_or(0);
    let stop = fold(range.stop)?;
    let step = range.step.map(fold).transpose()?.unwrap_or(1);
    if step == 0 {
        bail!(UnsupportedConstruct, "range() step must not be zero");
    }
    let mut values = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if values.len() == MAX_UNROLL {
            bail!(
                UnsupportedConstruct,
                "comprehension unrolls to more than {} elements",
                MAX_UNROLL
            );
        }
        values.push(i);
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(values)
}

/// One unrolled comprehension element and the filter guarding it.
struct Unrolled {
    value: TypedExpr,
    guard: Option<TypedExpr>,
}

/// Unroll `name = [elt for i in range(...) if cond]` into an array
/// declaration and one assignment per iteration.
///
/// The array always has the unfiltered length; filtered-out slots are left
/// unassigned.
pub fn type_check_comprehension(
    ctx: &mut dyn LowerContext,
    name: &str,
    comp: &Comprehension,
    annotation: Option<&TypeDescriptor>,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    let values = unrolled_range(ctx, &comp.iter).map_err(|e| e.with_node(&comp.iter))?;
    if values.is_empty() {
        bail!(UnsupportedConstruct, "comprehension over an empty range");
    }
    let expected = match annotation {
        Some(TypeDescriptor::Array { element, length }) => {
            if *length != values.len() {
                bail!(
                    TypeMismatch,
                    "'{}' is declared with length {} but the comprehension has {} elements",
                    name,
                    length,
                    values.len()
                );
            }
            Some((**element).clone())
        }
        Some(other) => bail!(
            TypeMismatch,
            "comprehension assigned to '{}' of non-array type {}",
            name,
            other
        ),
        None => None,
    };

    let mut unrolled = Vec::with_capacity(values.len());
    for (slot, value) in values.iter().enumerate() {
        ctx.symbols_mut().push_scope();
        let element = unroll_one(ctx, comp, *value, expected.as_ref());
        ctx.symbols_mut().pop_scope();
        if let Some(element) = element? {
            unrolled.push((slot, element));
        }
    }

    let element_ty = match expected {
        Some(ty) => ty,
        None => {
            let types: Vec<TypeDescriptor> = unrolled.iter().map(|(_, u)| u.value.ty.clone()).collect();
            if types.is_empty() {
                bail!(
                    TypeMismatch,
                    "cannot infer the element type of '{}'; every element is filtered out",
                    name
                );
            }
            unify_types(&types)?
        }
    };
    let array_ty = TypeDescriptor::array(element_ty.clone(), values.len());
    declare_local(ctx, name, array_ty.clone(), None, out)?;

    log::trace!(
        "unrolled comprehension '{}' to {} of {} elements",
        name,
        unrolled.len(),
        values.len()
    );
    for (slot, element) in unrolled {
        let target = TypedExpr::index(
            TypedExpr::var(name, array_ty.clone()),
            TypedExpr::literal(Literal::Int(slot as i64)),
            element_ty.clone(),
        );
        let assign = GlslStmt::Assign {
            target,
            value: coerce(ctx.registry(), element.value, &element_ty)?,
        };
        out.push(match element.guard {
            Some(cond) => GlslStmt::If {
                cond,
                then: alloc::vec![assign],
                otherwise: Vec::new(),
            },
            None => assign,
        });
    }
    Ok(())
}

/// Lower the element for one iteration, with the target bound to `value`.
///
/// Returns `None` when the filter folds to `false`.
fn unroll_one(
    ctx: &mut dyn LowerContext,
    comp: &Comprehension,
    value: i64,
    expected: Option<&TypeDescriptor>,
) -> GlslResult<Option<Unrolled>> {
    ctx.symbols_mut().declare_variable(
        &comp.target,
        TypeDescriptor::Scalar(ScalarKind::Int),
        Storage::Constant(Literal::Int(value)),
    )?;
    let guard = match &comp.filter {
        None => None,
        Some(filter) => match fold_constant(filter, ctx.symbols()).and_then(Literal::as_bool) {
            Some(false) => return Ok(None),
            Some(true) => None,
            None => Some(type_check_condition(ctx, filter)?),
        },
    };
    let value = type_check_initializer(ctx, &comp.element, expected)?;
    Ok(Some(Unrolled { value, guard }))
}

#[cfg(test)]
mod tests {
    use shaderdef_ir::Expr;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_range_args_shapes() {
        let iter = Expr::range(alloc::vec![Expr::int(4)]);
        let one = range_args(&iter).unwrap();
        assert!(one.start.is_none() && one.step.is_none());
        let iter = Expr::range(alloc::vec![Expr::int(0), Expr::int(8), Expr::int(2)]);
        let three = range_args(&iter).unwrap();
        assert_eq!(three.step, Some(&Expr::int(2)));

        let err = range_args(&Expr::name("items")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstruct(_)));
        let err = range_args(&Expr::range(alloc::vec![])).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)));
    }
}
