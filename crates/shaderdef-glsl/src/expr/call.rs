//! Call lowering: constructors, library functions and built-ins.
//!
//! A call name is resolved in this order: the `len` intrinsic, built-in
//! type constructors, user structs, library overloads, then built-in
//! functions.

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};

use shaderdef_ir::{Aggregate, Expr, FunctionDef, Keyword, Literal, ScalarKind, Stage, TypeDescriptor};

use crate::{
    builtins::{canonical_builtin_name, describe_candidates, Candidate},
    error::{bail, GlslResult},
    expr::typecheck::{coerce, find_field, lookup_variable, retype_literal, type_check_expr, type_check_initializer},
    function::LowerContext,
    ir::{ExprKind, TypedExpr},
    symbols::Storage,
    types::{conversion_cost, ConstructorShape},
    util::static_length,
};

/// A lowered call: a value, or a `void` call usable only as a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Lowered {
    Value(TypedExpr),
    Void { name: String, args: Vec<TypedExpr> },
}

/// Lower a call expression.
pub fn type_check_call(
    ctx: &mut dyn LowerContext,
    func: &str,
    args: &[Expr],
    keywords: &[Keyword],
) -> GlslResult<Lowered> {
    match func {
        "len" => return type_check_len(ctx, args, keywords).map(Lowered::Value),
        "range" => bail!(
            UnsupportedConstruct,
            "range() is only valid as the iterable of a for loop or comprehension"
        ),
        "shared" => bail!(
            UnsupportedConstruct,
            "shared() is only valid as the value of an assignment"
        ),
        _ => {}
    }
    if let Some(output) = ctx.role().output() {
        if output.aggregate.name() == func {
            bail!(
                UnsupportedConstruct,
                "'{}(...)' can only be returned or yielded from the entry point",
                func
            );
        }
    }

    if let Some(ty) = ctx.registry().lookup(func).cloned() {
        reject_keywords(func, keywords)?;
        let args = lower_args(ctx, args)?;
        return type_check_constructor(ctx, &ty, args).map(Lowered::Value);
    }
    if let Some(aggregate) = ctx.lookup_struct(func) {
        return type_check_struct_constructor(ctx, &aggregate, args, keywords).map(Lowered::Value);
    }

    let overloads: Vec<Arc<FunctionDef>> = ctx.symbols().lookup_functions(func).to_vec();
    if !overloads.is_empty() {
        reject_keywords(func, keywords)?;
        return type_check_library_call(ctx, func, &overloads, args);
    }
    if ctx.builtins().contains(func) {
        reject_keywords(func, keywords)?;
        return type_check_builtin_call(ctx, func, args);
    }
    bail!(UnknownIdentifier, "unknown function '{}'", func)
}

fn reject_keywords(func: &str, keywords: &[Keyword]) -> GlslResult<()> {
    if let Some(keyword) = keywords.first() {
        bail!(
            UnsupportedConstruct,
            "keyword argument '{}' in call to '{}'; only struct and output constructors take keywords",
            keyword.name,
            func
        );
    }
    Ok(())
}

fn lower_args(ctx: &mut dyn LowerContext, args: &[Expr]) -> GlslResult<Vec<TypedExpr>> {
    args.iter().map(|arg| type_check_expr(ctx, arg)).collect()
}

fn coerce_args(
    ctx: &dyn LowerContext,
    args: Vec<TypedExpr>,
    params: &[TypeDescriptor],
) -> GlslResult<Vec<TypedExpr>> {
    args.into_iter()
        .zip(params)
        .map(|(arg, param)| coerce(ctx.registry(), arg, param))
        .collect()
}

fn finish_call(name: String, args: Vec<TypedExpr>, ret: Option<TypeDescriptor>) -> Lowered {
    match ret {
        Some(ty) => Lowered::Value(TypedExpr::call(name, args, ty)),
        None => Lowered::Void { name, args },
    }
}

fn type_check_library_call(
    ctx: &mut dyn LowerContext,
    func: &str,
    overloads: &[Arc<FunctionDef>],
    args: &[Expr],
) -> GlslResult<Lowered> {
    let lowered = lower_args(ctx, args)?;
    let candidates: Vec<Candidate> = overloads
        .iter()
        .map(|def| Candidate {
            name: def.name().to_string(),
            params: def.signature.params.iter().map(|p| p.ty.clone()).collect(),
            ret: def.signature.returns.produced().cloned(),
        })
        .collect();
    let types: Vec<TypeDescriptor> = lowered.iter().map(|a| a.ty.clone()).collect();
    let index = select_overload(func, &candidates, &types)?;
    ctx.use_function(&overloads[index])?;
    let chosen = &candidates[index];
    let args = coerce_args(ctx, lowered, &chosen.params)?;
    Ok(finish_call(chosen.name.clone(), args, chosen.ret.clone()))
}

fn type_check_builtin_call(
    ctx: &mut dyn LowerContext,
    func: &str,
    args: &[Expr],
) -> GlslResult<Lowered> {
    let lowered = lower_args(ctx, args)?;
    let types: Vec<TypeDescriptor> = lowered.iter().map(|a| a.ty.clone()).collect();
    let candidates = ctx
        .builtins()
        .candidates(func, ctx.stage(), ctx.version(), &types, ctx.registry())?;
    let index = select_overload(func, &candidates, &types)?;
    let chosen = &candidates[index];
    let args = coerce_args(ctx, lowered, &chosen.params)?;
    Ok(finish_call(chosen.name.clone(), args, chosen.ret.clone()))
}

/// Pick the candidate needing the fewest implicit conversions.
///
/// Ties between candidates with different parameter lists are ambiguous.
pub fn select_overload(
    name: &str,
    candidates: &[Candidate],
    args: &[TypeDescriptor],
) -> GlslResult<usize> {
    let mut best: Vec<usize> = Vec::new();
    let mut best_cost = u32::MAX;
    for (i, candidate) in candidates.iter().enumerate() {
        if candidate.params.len() != args.len() {
            continue;
        }
        let cost: Option<u32> = args
            .iter()
            .zip(&candidate.params)
            .map(|(arg, param)| conversion_cost(arg, param))
            .sum();
        match cost {
            Some(cost) if cost < best_cost => {
                best_cost = cost;
                best.clear();
                best.push(i);
            }
            Some(cost) if cost == best_cost => {
                if !best.iter().any(|&j| candidates[j].params == candidate.params) {
                    best.push(i);
                }
            }
            _ => {}
        }
    }
    let arg_list = args
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    match best.as_slice() {
        [] => {
            let all: Vec<&Candidate> = candidates.iter().collect();
            bail!(
                TypeMismatch,
                "no overload of '{}' accepts ({}); candidates: {}",
                name,
                arg_list,
                describe_candidates(&all)
            )
        }
        [only] => Ok(*only),
        tied => {
            let tied: Vec<&Candidate> = tied.iter().map(|&i| &candidates[i]).collect();
            bail!(
                AmbiguousCall,
                "call to '{}' with ({}) matches {}",
                name,
                arg_list,
                describe_candidates(&tied)
            )
        }
    }
}

fn type_check_len(
    ctx: &mut dyn LowerContext,
    args: &[Expr],
    keywords: &[Keyword],
) -> GlslResult<TypedExpr> {
    if args.len() != 1 || !keywords.is_empty() {
        bail!(TypeMismatch, "len() takes exactly one argument");
    }
    let arg = &args[0];
    if let Some(len) = static_length(arg, ctx.symbols()) {
        return Ok(TypedExpr::literal(Literal::Int(len as i64)));
    }
    if let Expr::Name(name) = arg {
        if let Some(var) = lookup_variable(ctx, name) {
            if let Storage::Interface { sequence: true, .. } = var.storage {
                if matches!(ctx.stage(), Stage::TessControl | Stage::TessEval) {
                    return Ok(TypedExpr::var("gl_PatchVerticesIn", TypeDescriptor::int()));
                }
            }
        }
    }
    let value = type_check_expr(ctx, arg)?;
    match &value.ty {
        TypeDescriptor::Array { length, .. } => Ok(TypedExpr::literal(Literal::Int(*length as i64))),
        other => bail!(
            TypeMismatch,
            "len() needs an array or per-vertex input, found {}",
            other
        ),
    }
}

/// Lower a built-in type constructor (`vec3(...)`, `mat4(...)`, `float[3](...)`).
pub fn type_check_constructor(
    ctx: &mut dyn LowerContext,
    ty: &TypeDescriptor,
    args: Vec<TypedExpr>,
) -> GlslResult<TypedExpr> {
    let shape = ctx.registry().constructor_arity(ty)?;
    let name = ctx.resolve_type(ty)?.to_string();
    let takes_components = !matches!(shape, ConstructorShape::Array { .. } | ConstructorShape::Struct(_));
    if let Some(arg) = args.iter().find(|a| takes_components && a.ty.scalar_kind().is_none()) {
        bail!(TypeMismatch, "cannot build {} from {}", name, arg.ty);
    }
    let args = match shape {
        ConstructorShape::Scalar(kind) => {
            if args.len() != 1 {
                bail!(
                    TypeMismatch,
                    "{}() takes exactly one argument, found {}",
                    name,
                    args.len()
                );
            }
            let mut args = respell_literals(args, kind);
            // float(1) is just 1.0
            if args[0].as_literal().is_some() && args[0].ty == *ty {
                return Ok(args.remove(0));
            }
            args
        }
        ConstructorShape::Vector { component, size } => {
            check_components(&name, &args, size as usize)?;
            respell_literals(args, component)
        }
        ConstructorShape::Matrix {
            component,
            cols,
            rows,
        } => {
            let single = args.len() == 1 && (args[0].ty.is_scalar() || args[0].ty.is_matrix());
            if !single {
                if args.iter().any(|a| a.ty.is_matrix()) {
                    bail!(TypeMismatch, "{}() takes a matrix only as its sole argument", name);
                }
                let total: usize = args.iter().filter_map(|a| a.ty.component_count()).sum();
                let needed = cols as usize * rows as usize;
                if total != needed {
                    bail!(
                        TypeMismatch,
                        "{}() needs {} components, found {}",
                        name,
                        needed,
                        total
                    );
                }
            }
            respell_literals(args, component)
        }
        ConstructorShape::Array { element, length } => {
            if args.len() != length {
                bail!(
                    TypeMismatch,
                    "{}() needs {} elements, found {}",
                    name,
                    length,
                    args.len()
                );
            }
            let params: Vec<TypeDescriptor> = (0..length).map(|_| element.clone()).collect();
            coerce_args(ctx, args, &params)?
        }
        ConstructorShape::Struct(aggregate) => {
            if args.len() != aggregate.fields().len() {
                bail!(
                    TypeMismatch,
                    "{}() needs {} arguments, found {}",
                    name,
                    aggregate.fields().len(),
                    args.len()
                );
            }
            let params: Vec<TypeDescriptor> = aggregate.fields().iter().map(|f| f.ty.clone()).collect();
            coerce_args(ctx, args, &params)?
        }
    };
    Ok(TypedExpr::call(name, args, ty.clone()))
}

fn check_components(name: &str, args: &[TypedExpr], size: usize) -> GlslResult<()> {
    if let [only] = args {
        let count = only.ty.component_count().unwrap_or(0);
        if only.ty.is_scalar() || count >= size {
            return Ok(());
        }
        bail!(
            TypeMismatch,
            "{}() needs {} components, found {}",
            name,
            size,
            count
        );
    }
    if args.iter().any(|a| a.ty.is_matrix()) {
        bail!(TypeMismatch, "{}() takes a matrix only as its sole argument", name);
    }
    let counts: Vec<usize> = args.iter().filter_map(|a| a.ty.component_count()).collect();
    let total: usize = counts.iter().sum();
    let last = counts.last().copied().unwrap_or(0);
    if total < size {
        bail!(
            TypeMismatch,
            "too few components for {}(): needs {}, found {}",
            name,
            size,
            total
        );
    }
    if total - last >= size {
        bail!(
            TypeMismatch,
            "too many arguments for {}(): {} components before the last one",
            name,
            total - last
        );
    }
    Ok(())
}

/// Respell scalar literal arguments in the constructor's component kind.
fn respell_literals(args: Vec<TypedExpr>, kind: ScalarKind) -> Vec<TypedExpr> {
    args.into_iter()
        .map(|arg| match (arg.as_literal(), arg.ty.is_scalar()) {
            (Some(literal), true) => match retype_literal(literal, kind) {
                Some(value) => TypedExpr::new(ExprKind::Literal(value), TypeDescriptor::Scalar(kind)),
                None => arg,
            },
            _ => arg,
        })
        .collect()
}

/// Pair call arguments with aggregate fields, in call order.
///
/// Positional arguments take fields in declaration order, keywords name
/// them. With `allow_builtins`, `gl_` keywords that are not fields are kept
/// under their canonical spelling.
pub fn bind_arguments<'e>(
    aggregate: &Aggregate,
    args: &'e [Expr],
    keywords: &'e [Keyword],
    allow_builtins: bool,
) -> GlslResult<Vec<(String, &'e Expr)>> {
    if args.len() > aggregate.fields().len() {
        bail!(
            TypeMismatch,
            "{}() takes {} fields, found {} positional arguments",
            aggregate.name(),
            aggregate.fields().len(),
            args.len()
        );
    }
    let mut bound: Vec<(String, &Expr)> = aggregate
        .fields()
        .iter()
        .zip(args)
        .map(|(field, arg)| (field.name.clone(), arg))
        .collect();
    for keyword in keywords {
        let name = match find_field(aggregate, &keyword.name) {
            Ok(field) => field.name.clone(),
            Err(err) => match canonical_builtin_name(&keyword.name) {
                Some(builtin) if allow_builtins => String::from(builtin),
                _ => return Err(err),
            },
        };
        if bound.iter().any(|(existing, _)| *existing == name) {
            bail!(
                TypeMismatch,
                "field '{}' of {}() given more than once",
                name,
                aggregate.name()
            );
        }
        bound.push((name, &keyword.value));
    }
    Ok(bound)
}

fn type_check_struct_constructor(
    ctx: &mut dyn LowerContext,
    aggregate: &Arc<Aggregate>,
    args: &[Expr],
    keywords: &[Keyword],
) -> GlslResult<TypedExpr> {
    let bound = bind_arguments(aggregate, args, keywords, false)?;
    let mut lowered = Vec::with_capacity(aggregate.fields().len());
    for field in aggregate.fields() {
        let value = match bound.iter().find(|(name, _)| *name == field.name) {
            Some((_, value)) => *value,
            None => bail!(
                TypeMismatch,
                "{}() is missing field '{}'",
                aggregate.name(),
                field.name
            ),
        };
        lowered.push(type_check_initializer(ctx, value, Some(&field.ty))?);
    }
    let ty = TypeDescriptor::aggregate(aggregate);
    let name = ctx.resolve_type(&ty)?.to_string();
    Ok(TypedExpr::call(name, lowered, ty))
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use shaderdef_ir::AggregateRole;

    use super::*;
    use crate::error::ErrorKind;

    fn candidate(params: Vec<TypeDescriptor>) -> Candidate {
        Candidate {
            name: "f".to_string(),
            params,
            ret: Some(TypeDescriptor::float()),
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let candidates = vec![
            candidate(vec![TypeDescriptor::float()]),
            candidate(vec![TypeDescriptor::int()]),
        ];
        assert_eq!(select_overload("f", &candidates, &[TypeDescriptor::int()]).unwrap(), 1);
        assert_eq!(select_overload("f", &candidates, &[TypeDescriptor::float()]).unwrap(), 0);
    }

    #[test]
    fn test_nearer_conversion_wins() {
        let candidates = vec![
            candidate(vec![TypeDescriptor::double()]),
            candidate(vec![TypeDescriptor::float()]),
        ];
        assert_eq!(select_overload("f", &candidates, &[TypeDescriptor::int()]).unwrap(), 1);
        assert_eq!(select_overload("f", &candidates, &[TypeDescriptor::uint()]).unwrap(), 1);
    }

    #[test]
    fn test_conversion_ties_are_ambiguous() {
        let candidates = vec![
            candidate(vec![TypeDescriptor::float(), TypeDescriptor::int()]),
            candidate(vec![TypeDescriptor::int(), TypeDescriptor::float()]),
        ];
        let err = select_overload("f", &candidates, &[TypeDescriptor::int(), TypeDescriptor::int()]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AmbiguousCall(_)));
    }

    #[test]
    fn test_no_match_lists_candidates() {
        let candidates = vec![candidate(vec![TypeDescriptor::vec3()])];
        let err = select_overload("f", &candidates, &[TypeDescriptor::vec2()]).unwrap_err();
        match err.kind {
            ErrorKind::TypeMismatch(msg) => assert!(msg.contains("f(vec3)")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_bind_arguments() {
        let out = Aggregate::builder("Out", AggregateRole::ShaderInterface)
            .field("color", TypeDescriptor::vec4())
            .field("uv", TypeDescriptor::vec2())
            .build()
            .unwrap();
        let args = vec![Expr::name("c")];
        let keywords = vec![
            Keyword {
                name: "gl_position".to_string(),
                value: Expr::name("p"),
            },
            Keyword {
                name: "uv".to_string(),
                value: Expr::name("t"),
            },
        ];
        let bound = bind_arguments(&out, &args, &keywords, true).unwrap();
        let names: Vec<&str> = bound.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["color", "gl_Position", "uv"]);

        let err = bind_arguments(&out, &args, &keywords, false).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownField(_)));

        let twice = vec![Keyword {
            name: "color".to_string(),
            value: Expr::name("d"),
        }];
        assert!(bind_arguments(&out, &args, &twice, true).is_err());
    }
}
