//! Expression lowering.
//!
//! Resolves host expressions to [`TypedExpr`]: names are bound through the
//! symbol table, interface members are rewritten to their GLSL spelling,
//! and every node gets exactly one type.

use alloc::{string::ToString, sync::Arc, vec::Vec};

use shaderdef_ir::{Aggregate, AggregateRole, Expr, Field, Literal, ScalarKind, TypeDescriptor};

use crate::{
    builtins::canonical_builtin_name,
    error::{bail, glsl_err, GlslResult},
    expr::{
        call::{type_check_call, Lowered},
        ops::{type_check_binary, type_check_unary},
    },
    function::LowerContext,
    ir::{ExprKind, TypedExpr},
    symbols::{Storage, Variable},
    types::{common_kind, conversion_cost, swizzle_component_type, TypeRegistry},
    util::fold_int,
};

/// Lower an expression used as a value.
pub fn type_check_expr(ctx: &mut dyn LowerContext, expr: &Expr) -> GlslResult<TypedExpr> {
    lower_expr(ctx, expr).map_err(|e| e.with_node(expr))
}

fn lower_expr(ctx: &mut dyn LowerContext, expr: &Expr) -> GlslResult<TypedExpr> {
    match expr {
        Expr::Literal(value) => Ok(TypedExpr::literal(*value)),
        Expr::Name(name) => type_check_name(ctx, name),
        Expr::Attribute { value, attr } => type_check_attribute(ctx, value, attr),
        Expr::Subscript { value, index } => type_check_subscript(ctx, value, index),
        Expr::Binary { op, lhs, rhs } => type_check_binary(ctx, *op, lhs, rhs),
        Expr::Unary { op, operand } => type_check_unary(ctx, *op, operand),
        Expr::Call {
            func,
            args,
            keywords,
        } => match type_check_call(ctx, func, args, keywords)? {
            Lowered::Value(value) => Ok(value),
            Lowered::Void { name, .. } => {
                bail!(TypeMismatch, "'{}' returns void and has no value", name)
            }
        },
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            let cond = type_check_condition(ctx, cond)?;
            let then = type_check_expr(ctx, then)?;
            let otherwise = type_check_expr(ctx, otherwise)?;
            let ty = unify_types(&[then.ty.clone(), otherwise.ty.clone()])?;
            let then = coerce(ctx.registry(), then, &ty)?;
            let otherwise = coerce(ctx.registry(), otherwise, &ty)?;
            Ok(TypedExpr::new(
                ExprKind::Ternary {
                    cond: cond.into(),
                    then: then.into(),
                    otherwise: otherwise.into(),
                },
                ty,
            ))
        }
        Expr::List(elements) => type_check_array_literal(ctx, elements, None),
        Expr::ListComp(_) => bail!(
            UnsupportedConstruct,
            "list comprehension outside an assignment"
        ),
        Expr::TypeRef(ty) => bail!(UnsupportedConstruct, "type {} used as a value", ty),
        Expr::Unsupported { construct } => bail!(UnsupportedConstruct, "{}", construct),
    }
}

/// Lower a value that initializes or is assigned to something of type
/// `expected`; array literals take their element type from it.
pub fn type_check_initializer(
    ctx: &mut dyn LowerContext,
    expr: &Expr,
    expected: Option<&TypeDescriptor>,
) -> GlslResult<TypedExpr> {
    let value = match expr {
        Expr::List(elements) => {
            type_check_array_literal(ctx, elements, expected).map_err(|e| e.with_node(expr))?
        }
        _ => type_check_expr(ctx, expr)?,
    };
    match expected {
        Some(ty) => coerce(ctx.registry(), value, ty).map_err(|e| e.with_node(expr)),
        None => Ok(value),
    }
}

/// Lower a condition, which must be a scalar `bool`.
pub fn type_check_condition(ctx: &mut dyn LowerContext, expr: &Expr) -> GlslResult<TypedExpr> {
    let cond = type_check_expr(ctx, expr)?;
    if !cond.ty.is_bool() {
        return Err(glsl_err!(
            TypeMismatch,
            "condition must be bool, found {}",
            cond.ty
        )
        .with_node(expr));
    }
    Ok(cond)
}

/// Look up a variable, accepting `gl_` names in any case.
pub fn lookup_variable(ctx: &dyn LowerContext, name: &str) -> Option<Variable> {
    let name = canonical_builtin_name(name).unwrap_or(name);
    ctx.symbols().lookup_variable(name).cloned()
}

fn type_check_name(ctx: &mut dyn LowerContext, name: &str) -> GlslResult<TypedExpr> {
    let var = match lookup_variable(ctx, name) {
        Some(var) => var,
        None => {
            if name.starts_with("gl_") {
                bail!(
                    UnknownIdentifier,
                    "'{}' is not available in the {} stage",
                    name,
                    ctx.stage()
                );
            }
            if ctx.lookup_struct(name).is_some() || ctx.registry().lookup(name).is_some() {
                bail!(UnsupportedConstruct, "type '{}' used as a value", name);
            }
            bail!(UnknownIdentifier, "'{}' is not defined", name)
        }
    };
    match var.storage {
        Storage::Constant(value) => Ok(TypedExpr::new(ExprKind::Literal(value), var.ty)),
        Storage::Interface { sequence: true, .. } => {
            bail!(TypeMismatch, "per-vertex input '{}' must be indexed", name)
        }
        Storage::Interface { .. } => bail!(
            TypeMismatch,
            "interface parameter '{}' can only be used through its fields",
            name
        ),
        _ => Ok(TypedExpr::var(var.name, var.ty)),
    }
}

fn type_check_attribute(ctx: &mut dyn LowerContext, value: &Expr, attr: &str) -> GlslResult<TypedExpr> {
    if let Expr::Name(name) = value {
        if let Some(var) = lookup_variable(ctx, name) {
            if let Storage::Interface {
                role,
                sequence: false,
                ..
            } = var.storage
            {
                return interface_member(&var, role, attr);
            }
        }
    }
    let base = type_check_expr(ctx, value)?;
    member_access(base, attr)
}

/// Field of an aggregate, accepting `gl_` names in any case.
pub fn find_field<'f>(aggregate: &'f Aggregate, name: &str) -> GlslResult<&'f Field> {
    let canonical = canonical_builtin_name(name).unwrap_or(name);
    match aggregate
        .field(name)
        .or_else(|| aggregate.field(canonical))
    {
        Some((_, field)) => Ok(field),
        None => bail!(
            UnknownField,
            "'{}' has no field '{}'",
            aggregate.name(),
            name
        ),
    }
}

fn interface_member(var: &Variable, role: AggregateRole, attr: &str) -> GlslResult<TypedExpr> {
    let aggregate = match var.ty.as_aggregate() {
        Some(aggregate) => Arc::clone(aggregate),
        None => bail!(TypeMismatch, "'{}' is not an interface aggregate", var.name),
    };
    let field = find_field(&aggregate, attr)?;
    match role {
        // Attributes, uniforms and fragment outputs are declared by field name
        AggregateRole::AttributeBlock | AggregateRole::UniformBlock | AggregateRole::FragmentOutput => {
            Ok(TypedExpr::var(field.name.clone(), field.ty.clone()))
        }
        AggregateRole::ShaderInterface if field.is_builtin() => bail!(
            TypeMismatch,
            "built-in member '{}' of '{}' cannot be read through the block",
            field.name,
            aggregate.name()
        ),
        _ => Ok(TypedExpr::field(
            TypedExpr::var(var.name.clone(), var.ty.clone()),
            field.name.clone(),
            field.ty.clone(),
        )),
    }
}

/// Swizzle of a vector or field of a struct or per-vertex element.
pub fn member_access(base: TypedExpr, attr: &str) -> GlslResult<TypedExpr> {
    let aggregate = match &base.ty {
        TypeDescriptor::Vector { .. } => {
            let ty = swizzle_component_type(&base.ty, attr)?;
            return Ok(TypedExpr::field(base, attr, ty));
        }
        TypeDescriptor::Aggregate(aggregate) => Arc::clone(aggregate),
        other => bail!(
            Swizzle,
            "cannot access '{}' on non-vector type {}",
            attr,
            other
        ),
    };
    let field = find_field(&aggregate, attr)?;
    if field.is_builtin() && aggregate.role() == AggregateRole::ShaderInterface {
        // Built-in members of a per-vertex input live in gl_in
        if let ExprKind::Index { index, .. } = base.kind {
            let per_vertex = TypeDescriptor::aggregate(&Aggregate::gl_per_vertex());
            let element = TypedExpr::index(
                TypedExpr::var("gl_in", per_vertex.clone()),
                *index,
                per_vertex,
            );
            return Ok(TypedExpr::field(element, field.name.clone(), field.ty.clone()));
        }
        bail!(
            TypeMismatch,
            "built-in member '{}' of '{}' cannot be read through the block",
            field.name,
            aggregate.name()
        );
    }
    Ok(TypedExpr::field(base, field.name.clone(), field.ty.clone()))
}

fn type_check_subscript(ctx: &mut dyn LowerContext, value: &Expr, index: &Expr) -> GlslResult<TypedExpr> {
    let lowered_index = type_check_expr(ctx, index)?;
    if !lowered_index.ty.is_integer_scalar() {
        bail!(Index, "index must be int or uint, found {}", lowered_index.ty);
    }
    let folded = fold_int(index, ctx.symbols());

    if let Expr::Name(name) = value {
        if let Some(var) = lookup_variable(ctx, name) {
            if let Storage::Interface {
                sequence: true,
                len,
                ..
            } = var.storage
            {
                check_bounds(folded, len, &var.name)?;
                let element = var.ty.clone();
                return Ok(TypedExpr::index(
                    TypedExpr::var(var.name, var.ty),
                    lowered_index,
                    element,
                ));
            }
        }
    }

    let base = type_check_expr(ctx, value)?;
    let (element, len) = match &base.ty {
        TypeDescriptor::Array { element, length } => ((**element).clone(), *length),
        TypeDescriptor::Vector { component, size } => (TypeDescriptor::Scalar(*component), *size as usize),
        TypeDescriptor::Matrix {
            component,
            cols,
            rows,
        } => (TypeDescriptor::vector(*component, *rows), *cols as usize),
        other => bail!(Index, "cannot index into {}", other),
    };
    check_bounds(folded, Some(len), &base.ty.to_string())?;
    Ok(TypedExpr::index(base, lowered_index, element))
}

fn check_bounds(index: Option<i64>, len: Option<usize>, what: &str) -> GlslResult<()> {
    match (index, len) {
        (Some(i), _) if i < 0 => bail!(Index, "negative index {} into {}", i, what),
        (Some(i), Some(len)) if i as u64 >= len as u64 => {
            bail!(Index, "index {} out of range for {} of length {}", i, what, len)
        }
        _ => Ok(()),
    }
}

/// Lower an array literal to an array constructor.
pub fn type_check_array_literal(
    ctx: &mut dyn LowerContext,
    elements: &[Expr],
    expected: Option<&TypeDescriptor>,
) -> GlslResult<TypedExpr> {
    if elements.is_empty() {
        bail!(UnsupportedConstruct, "empty array literal");
    }
    let expected_element = match expected {
        None => None,
        Some(TypeDescriptor::Array { element, length }) => {
            if *length != elements.len() {
                bail!(
                    TypeMismatch,
                    "expected {} elements, found {}",
                    length,
                    elements.len()
                );
            }
            Some(&**element)
        }
        Some(other) => bail!(TypeMismatch, "array literal where {} is expected", other),
    };
    let mut lowered = Vec::with_capacity(elements.len());
    for element in elements {
        lowered.push(type_check_initializer(ctx, element, expected_element)?);
    }
    let element_ty = match expected_element {
        Some(ty) => ty.clone(),
        None => unify_types(&lowered.iter().map(|e| e.ty.clone()).collect::<Vec<_>>())?,
    };
    let mut args = Vec::with_capacity(lowered.len());
    for value in lowered {
        args.push(coerce(ctx.registry(), value, &element_ty)?);
    }
    let ty = TypeDescriptor::array(element_ty, args.len());
    let name = ctx.resolve_type(&ty)?.to_string();
    Ok(TypedExpr::call(name, args, ty))
}

/// Common type of several values: identical types, or one numeric shape
/// whose component kind is the widest present.
pub fn unify_types(types: &[TypeDescriptor]) -> GlslResult<TypeDescriptor> {
    let first = match types.first() {
        Some(first) => first,
        None => bail!(TypeMismatch, "no values to unify"),
    };
    if types.iter().all(|t| t == first) {
        return Ok(first.clone());
    }
    let mut kind: Option<ScalarKind> = first.scalar_kind();
    for ty in &types[1..] {
        kind = match (kind, ty.scalar_kind()) {
            (Some(a), Some(b)) => common_kind(a, b),
            _ => None,
        };
    }
    if let Some(kind) = kind {
        if let Some(unified) = first.with_component(kind) {
            if types.iter().all(|t| t.with_component(kind).as_ref() == Some(&unified)) {
                return Ok(unified);
            }
        }
    }
    let names: Vec<_> = types.iter().map(|t| t.to_string()).collect();
    bail!(TypeMismatch, "incompatible types {}", names.join(", "))
}

/// Convert a value to `target`, implicitly.
///
/// Integer literals are respelled in the target kind (`1` -> `1.0`, `1u`);
/// other values are wrapped in a constructor call.
pub fn coerce(registry: &TypeRegistry, expr: TypedExpr, target: &TypeDescriptor) -> GlslResult<TypedExpr> {
    if &expr.ty == target {
        return Ok(expr);
    }
    if conversion_cost(&expr.ty, target).is_none() {
        bail!(TypeMismatch, "expected {}, found {}", target, expr.ty);
    }
    if let (Some(literal), TypeDescriptor::Scalar(kind)) = (expr.as_literal(), target) {
        if let Some(value) = retype_literal(literal, *kind) {
            return Ok(TypedExpr::new(ExprKind::Literal(value), target.clone()));
        }
    }
    let name = registry.resolve(target)?.to_string();
    Ok(TypedExpr::call(name, alloc::vec![expr], target.clone()))
}

/// Respell a literal in another scalar kind, if it keeps its value.
pub fn retype_literal(literal: Literal, kind: ScalarKind) -> Option<Literal> {
    match (literal, kind) {
        (Literal::Int(v), ScalarKind::Float | ScalarKind::Double) => Some(Literal::Float(v as f64)),
        (Literal::Int(v), ScalarKind::Int | ScalarKind::Uint) if v >= 0 => Some(Literal::Int(v)),
        (Literal::Int(v), ScalarKind::Int) => Some(Literal::Int(v)),
        (Literal::Float(v), ScalarKind::Float | ScalarKind::Double) => Some(Literal::Float(v)),
        (Literal::Bool(v), ScalarKind::Bool) => Some(Literal::Bool(v)),
        _ => None,
    }
}
