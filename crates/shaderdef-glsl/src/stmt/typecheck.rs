//! Statement lowering.
//!
//! Assignments to unbound names declare them, `return` and `yield` of the
//! entry point's output aggregate become per-field writes, and everything
//! that has no GLSL counterpart is rejected here.

use alloc::{string::String, vec, vec::Vec};

use shaderdef_ir::{
    Expr, Keyword, ReturnType, Stage, Stmt, StmtKind, TypeDescriptor,
};

use crate::{
    builtins::canonical_builtin_name,
    control::{type_check_comprehension, type_check_for, type_check_if, type_check_while},
    error::{bail, GlslResult},
    expr::{
        call::{bind_arguments, type_check_call, Lowered},
        ops::binary_op,
        typecheck::{
            coerce, find_field, lookup_variable, type_check_expr, type_check_initializer,
        },
    },
    function::{FunctionRole, LowerContext, OutputStyle, OutputTarget},
    ir::{ExprKind, GlslStmt, TypedExpr},
    symbols::Storage,
    util::fold_int,
};

/// Lower one statement, appending the result to `out`.
///
/// `is_final` marks the last top-level statement of a function body.
pub fn type_check_statement(
    ctx: &mut dyn LowerContext,
    stmt: &Stmt,
    out: &mut Vec<GlslStmt>,
    is_final: bool,
) -> GlslResult<()> {
    lower_statement(ctx, stmt, out, is_final).map_err(|e| e.with_loc(stmt.loc).with_node(stmt))
}

/// Lower a nested block in its own scope.
pub fn type_check_block(ctx: &mut dyn LowerContext, stmts: &[Stmt]) -> GlslResult<Vec<GlslStmt>> {
    let mut out = Vec::new();
    ctx.symbols_mut().push_scope();
    let result = stmts
        .iter()
        .try_for_each(|stmt| type_check_statement(ctx, stmt, &mut out, false));
    ctx.symbols_mut().pop_scope();
    result.map(|()| out)
}

fn lower_statement(
    ctx: &mut dyn LowerContext,
    stmt: &Stmt,
    out: &mut Vec<GlslStmt>,
    is_final: bool,
) -> GlslResult<()> {
    match &stmt.kind {
        StmtKind::Assign { target, value } => type_check_assign(ctx, target, value, out),
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
        } => type_check_declaration(ctx, target, annotation, value.as_ref(), out),
        StmtKind::AugAssign { target, op, value } => {
            let lhs = type_check_lvalue(ctx, target)?;
            let rhs = type_check_expr(ctx, value)?;
            let combined = binary_op(ctx, *op, lhs.clone(), rhs)?;
            let value = coerce(ctx.registry(), combined, &lhs.ty)?;
            out.push(GlslStmt::Assign { target: lhs, value });
            Ok(())
        }
        StmtKind::If { test, body, orelse } => {
            out.push(type_check_if(ctx, test, body, orelse)?);
            Ok(())
        }
        StmtKind::For { target, iter, body } => {
            out.push(type_check_for(ctx, target, iter, body)?);
            Ok(())
        }
        StmtKind::While { test, body } => {
            out.push(type_check_while(ctx, test, body)?);
            Ok(())
        }
        StmtKind::Break | StmtKind::Continue => {
            let is_break = matches!(stmt.kind, StmtKind::Break);
            if !ctx.in_loop() {
                bail!(
                    UnsupportedConstruct,
                    "'{}' outside a loop",
                    if is_break { "break" } else { "continue" }
                );
            }
            out.push(if is_break { GlslStmt::Break } else { GlslStmt::Continue });
            Ok(())
        }
        StmtKind::Return(value) => type_check_return(ctx, value.as_ref(), is_final, out),
        StmtKind::Yield(value) => type_check_yield(ctx, value, out),
        StmtKind::Discard => {
            if ctx.stage() != Stage::Fragment {
                bail!(
                    UnsupportedConstruct,
                    "discard is only valid in fragment shaders, not the {} stage",
                    ctx.stage()
                );
            }
            out.push(GlslStmt::Discard);
            Ok(())
        }
        StmtKind::Expr(expr) => type_check_expr_statement(ctx, expr, out),
        StmtKind::Pass => Ok(()),
        StmtKind::Unsupported { construct } => bail!(UnsupportedConstruct, "{}", construct),
    }
}

fn type_check_expr_statement(
    ctx: &mut dyn LowerContext,
    expr: &Expr,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    match expr {
        // Docstrings and other bare literals
        Expr::Literal(_) => Ok(()),
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            let lowered = type_check_call(ctx, func, args, keywords).map_err(|e| e.with_node(expr))?;
            out.push(match lowered {
                Lowered::Void { name, args } => GlslStmt::Call { name, args },
                Lowered::Value(value) => match value.kind {
                    ExprKind::Call { name, args } => GlslStmt::Call { name, args },
                    kind => GlslStmt::Expr(TypedExpr::new(kind, value.ty)),
                },
            });
            Ok(())
        }
        _ => {
            let value = type_check_expr(ctx, expr)?;
            out.push(GlslStmt::Expr(value));
            Ok(())
        }
    }
}

fn type_check_assign(
    ctx: &mut dyn LowerContext,
    target: &Expr,
    value: &Expr,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    if let Expr::Call {
        func,
        args,
        keywords,
    } = value
    {
        if func == "shared" {
            return type_check_shared(ctx, target, args, keywords);
        }
    }

    let unbound_name = match target {
        Expr::Name(name) if lookup_variable(ctx, name).is_none() && !name.starts_with("gl_") => {
            Some(name)
        }
        _ => None,
    };

    if let Expr::ListComp(comp) = value {
        return match unbound_name {
            Some(name) => type_check_comprehension(ctx, name, comp, None, out),
            None => bail!(
                UnsupportedConstruct,
                "a list comprehension must initialize a new variable"
            ),
        };
    }

    match unbound_name {
        Some(name) => {
            let value = type_check_initializer(ctx, value, None)?;
            declare_local(ctx, name, value.ty.clone(), Some(value), out)
        }
        None => {
            let target = type_check_lvalue(ctx, target)?;
            let value = type_check_initializer(ctx, value, Some(&target.ty))?;
            out.push(GlslStmt::Assign { target, value });
            Ok(())
        }
    }
}

fn type_check_declaration(
    ctx: &mut dyn LowerContext,
    name: &str,
    annotation: &TypeDescriptor,
    value: Option<&Expr>,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    if let Some(Expr::ListComp(comp)) = value {
        return type_check_comprehension(ctx, name, comp, Some(annotation), out);
    }
    let init = match value {
        Some(value) => Some(type_check_initializer(ctx, value, Some(annotation))?),
        None => None,
    };
    declare_local(ctx, name, annotation.clone(), init, out)
}

/// Declare a function-local variable.
pub fn declare_local(
    ctx: &mut dyn LowerContext,
    name: &str,
    ty: TypeDescriptor,
    init: Option<TypedExpr>,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    if ty.as_aggregate().is_some_and(|a| a.role().is_interface()) {
        bail!(
            TypeMismatch,
            "cannot declare '{}' of interface type {}",
            name,
            ty
        );
    }
    let glsl_ty = ctx.resolve_type(&ty)?;
    ctx.symbols_mut().declare_variable(name, ty, Storage::Local)?;
    out.push(GlslStmt::Declare {
        ty: glsl_ty,
        name: String::from(name),
        init,
    });
    Ok(())
}

/// Lower an assignment target and check it may be written.
pub fn type_check_lvalue(ctx: &mut dyn LowerContext, target: &Expr) -> GlslResult<TypedExpr> {
    let root = match lvalue_root(target) {
        Some(root) => root,
        None => bail!(UnsupportedConstruct, "cannot assign to `{}`", target),
    };
    if let Some(var) = lookup_variable(ctx, root) {
        if !var.is_assignable() {
            match var.storage {
                Storage::LoopIndex => {
                    bail!(TypeMismatch, "cannot assign to loop variable '{}'", root)
                }
                Storage::Constant(_) | Storage::GlobalConstant(_) => {
                    bail!(TypeMismatch, "cannot assign to constant '{}'", root)
                }
                Storage::Interface { role, .. } => bail!(
                    TypeMismatch,
                    "cannot assign to {} parameter '{}'; outputs are written by returning",
                    role.name(),
                    root
                ),
                _ => bail!(TypeMismatch, "built-in '{}' is read-only", var.name),
            }
        }
    }
    let lowered = type_check_expr(ctx, target)?;
    check_swizzle_target(&lowered)?;
    Ok(lowered)
}

fn lvalue_root(target: &Expr) -> Option<&str> {
    match target {
        Expr::Name(name) => Some(name),
        Expr::Attribute { value, .. } | Expr::Subscript { value, .. } => lvalue_root(value),
        _ => None,
    }
}

fn check_swizzle_target(target: &TypedExpr) -> GlslResult<()> {
    if let ExprKind::Field { base, field } = &target.kind {
        if base.ty.is_vector() {
            let letters: Vec<char> = field.chars().collect();
            if letters.iter().enumerate().any(|(i, c)| letters[..i].contains(c)) {
                bail!(Swizzle, "swizzle '{}' repeats a component and cannot be assigned", field);
            }
        }
        return check_swizzle_target(base);
    }
    if let ExprKind::Index { base, .. } = &target.kind {
        return check_swizzle_target(base);
    }
    Ok(())
}

fn type_check_shared(
    ctx: &mut dyn LowerContext,
    target: &Expr,
    args: &[Expr],
    keywords: &[Keyword],
) -> GlslResult<()> {
    if ctx.stage() != Stage::Compute {
        bail!(
            UnsupportedConstruct,
            "shared memory is only available in compute shaders, not the {} stage",
            ctx.stage()
        );
    }
    if !ctx.role().is_entry() {
        bail!(
            UnsupportedConstruct,
            "shared variables must be declared in the entry point"
        );
    }
    let name = match target {
        Expr::Name(name) => name,
        other => bail!(UnsupportedConstruct, "shared() must be assigned to a name, not `{}`", other),
    };
    if !keywords.is_empty() {
        bail!(UnsupportedConstruct, "shared() takes no keyword arguments");
    }
    let ty = match args {
        [Expr::TypeRef(ty)] => ty.clone(),
        [Expr::TypeRef(ty), count] => match fold_int(count, ctx.symbols()) {
            Some(n) if n > 0 => TypeDescriptor::array(ty.clone(), n as usize),
            Some(n) => bail!(TypeMismatch, "shared array length must be positive, found {}", n),
            None => bail!(
                NonConstantBound,
                "shared array length `{}` must be a compile-time constant",
                count
            ),
        },
        _ => bail!(
            TypeMismatch,
            "shared() takes a type and an optional element count"
        ),
    };
    ctx.declare_shared(name, &ty)
}

fn type_check_return(
    ctx: &mut dyn LowerContext,
    value: Option<&Expr>,
    is_final: bool,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    let role = ctx.role().clone();
    match (&role, role.returns(), value) {
        (_, ReturnType::Generator(_), _) => bail!(
            InvalidReturn,
            "return inside a generator; emit vertices with yield"
        ),
        (FunctionRole::Library { .. }, ReturnType::Void, None) => {
            out.push(GlslStmt::Return(None));
            Ok(())
        }
        (FunctionRole::Library { .. }, ReturnType::Value(ty), Some(value)) => {
            let value = type_check_initializer(ctx, value, Some(ty))?;
            out.push(GlslStmt::Return(Some(value)));
            Ok(())
        }
        (FunctionRole::Entry { .. }, ReturnType::Void, None) => {
            if !is_final {
                out.push(GlslStmt::Return(None));
            }
            Ok(())
        }
        (FunctionRole::Entry { output, .. }, ReturnType::Value(_), Some(value)) => {
            let target = match output {
                Some(target) => target,
                None => bail!(InvalidReturn, "entry point has no output to return"),
            };
            write_outputs(ctx, target, value, "return", out)?;
            if !is_final {
                out.push(GlslStmt::Return(None));
            }
            Ok(())
        }
        (_, ReturnType::Void, Some(value)) => {
            bail!(InvalidReturn, "function returns nothing but `{}` is returned", value)
        }
        (_, ReturnType::Value(ty), None) => {
            bail!(InvalidReturn, "function must return a value of type {}", ty)
        }
    }
}

fn type_check_yield(ctx: &mut dyn LowerContext, value: &Expr, out: &mut Vec<GlslStmt>) -> GlslResult<()> {
    let role = ctx.role().clone();
    let target = match (&role, role.returns()) {
        (FunctionRole::Entry { output: Some(target), .. }, ReturnType::Generator(_)) => target,
        _ => bail!(
            UnsupportedConstruct,
            "yield is only valid in a geometry entry point"
        ),
    };
    write_outputs(ctx, target, value, "yield", out)?;
    out.push(GlslStmt::Call {
        name: String::from("EmitVertex"),
        args: vec![],
    });
    Ok(())
}

/// Lower `Out(field=value, ...)` to one assignment per given field.
fn write_outputs(
    ctx: &mut dyn LowerContext,
    target: &OutputTarget,
    value: &Expr,
    keyword: &str,
    out: &mut Vec<GlslStmt>,
) -> GlslResult<()> {
    let aggregate = &target.aggregate;
    let (args, keywords) = match value {
        Expr::Call {
            func,
            args,
            keywords,
        } if func == aggregate.name() => (args, keywords),
        other => bail!(
            InvalidReturn,
            "entry point must {} `{}(...)`, found `{}`",
            keyword,
            aggregate.name(),
            other
        ),
    };
    for (name, expr) in bind_arguments(aggregate, args, keywords, true)? {
        let field_ty = match find_field(aggregate, &name) {
            Ok(field) if !field.is_builtin() => Some(field.ty.clone()),
            _ => None,
        };
        let (lhs, ty) = match field_ty {
            Some(ty) => (output_field(&target.style, &name, &ty), ty),
            None => builtin_output(ctx, &target.style, &name)?,
        };
        let value = type_check_initializer(ctx, expr, Some(&ty))?;
        out.push(GlslStmt::Assign { target: lhs, value });
    }
    Ok(())
}

fn invocation_index() -> TypedExpr {
    TypedExpr::var("gl_InvocationID", TypeDescriptor::int())
}

fn output_field(style: &OutputStyle, name: &str, ty: &TypeDescriptor) -> TypedExpr {
    match style {
        OutputStyle::Block { instance } => TypedExpr::field(
            TypedExpr::var(instance.clone(), ty.clone()),
            name,
            ty.clone(),
        ),
        OutputStyle::PerInvocation { instance } => TypedExpr::field(
            TypedExpr::index(
                TypedExpr::var(instance.clone(), ty.clone()),
                invocation_index(),
                ty.clone(),
            ),
            name,
            ty.clone(),
        ),
        OutputStyle::Bare => TypedExpr::var(name, ty.clone()),
    }
}

/// Target of a `gl_` keyword: the built-in itself, or its `gl_out` element
/// in a tessellation control shader.
fn builtin_output(
    ctx: &dyn LowerContext,
    style: &OutputStyle,
    name: &str,
) -> GlslResult<(TypedExpr, TypeDescriptor)> {
    let canonical = canonical_builtin_name(name).unwrap_or(name);
    if let OutputStyle::PerInvocation { .. } = style {
        let per_vertex = shaderdef_ir::Aggregate::gl_per_vertex();
        if let Ok(field) = find_field(&per_vertex, canonical) {
            let element = TypedExpr::index(
                TypedExpr::var("gl_out", TypeDescriptor::aggregate(&per_vertex)),
                invocation_index(),
                TypeDescriptor::aggregate(&per_vertex),
            );
            return Ok((
                TypedExpr::field(element, field.name.clone(), field.ty.clone()),
                field.ty.clone(),
            ));
        }
    }
    match ctx.symbols().lookup_variable(canonical) {
        Some(var) => match var.storage {
            Storage::Builtin { writable: true } => {
                Ok((TypedExpr::var(var.name.clone(), var.ty.clone()), var.ty.clone()))
            }
            _ => bail!(TypeMismatch, "built-in '{}' is read-only", canonical),
        },
        None => bail!(
            UnknownIdentifier,
            "'{}' is not available in the {} stage",
            name,
            ctx.stage()
        ),
    }
}
