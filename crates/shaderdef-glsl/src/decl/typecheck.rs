//! Lowering of file-scope declarations: interface variables, blocks,
//! uniforms, structs and constants.

use alloc::{string::String, sync::Arc, vec::Vec};

use shaderdef_ir::{Aggregate, ConstantDef, Literal, ScalarKind, TypeDescriptor};

use crate::{
    error::{bail, GlslResult},
    ir::{ExprKind, GlobalDecl, Member, TypedExpr},
    stage::StageState,
    types::{slot_count, OpaqueKind, TypeRegistry},
};

/// `layout(location=N) in T name;` for each attribute field.
///
/// Locations start at `*next_location` and advance by the slot count of
/// each field type.
pub fn attribute_inputs(
    state: &mut StageState<'_>,
    aggregate: &Arc<Aggregate>,
    next_location: &mut u32,
) -> GlslResult<Vec<GlobalDecl>> {
    let mut decls = Vec::new();
    for field in aggregate.declared_fields() {
        if field.ty.as_aggregate().is_some() {
            bail!(
                InvalidInterface,
                "attribute '{}.{}' cannot have struct type {}",
                aggregate.name(),
                field.name,
                field.ty
            );
        }
        let ty = state.resolve_type(&field.ty)?;
        decls.push(GlobalDecl::Variable {
            location: Some(*next_location),
            direction: "in",
            ty,
            name: field.name.clone(),
        });
        *next_location += slot_count(&field.ty);
    }
    Ok(decls)
}

/// `layout(location=N) out T name;` for each fragment output field.
pub fn fragment_outputs(
    state: &mut StageState<'_>,
    aggregate: &Arc<Aggregate>,
) -> GlslResult<Vec<GlobalDecl>> {
    let mut decls = Vec::new();
    let mut location = 0;
    for field in aggregate.declared_fields() {
        let ty = state.resolve_type(&field.ty)?;
        decls.push(GlobalDecl::Variable {
            location: Some(location),
            direction: "out",
            ty,
            name: field.name.clone(),
        });
        location += slot_count(&field.ty);
    }
    Ok(decls)
}

/// One `uniform` declaration per field; images carry a format qualifier.
pub fn uniform_decls(
    state: &mut StageState<'_>,
    aggregate: &Arc<Aggregate>,
) -> GlslResult<Vec<GlobalDecl>> {
    let mut decls = Vec::new();
    for field in aggregate.declared_fields() {
        let ty = state.resolve_type(&field.ty)?;
        let format = state
            .registry
            .opaque_info(&field.ty)
            .filter(|info| info.kind == OpaqueKind::Image)
            .map(|info| info.image_format());
        decls.push(GlobalDecl::Uniform {
            format,
            ty,
            name: field.name.clone(),
        });
    }
    Ok(decls)
}

/// Named interface block, or `None` when every field is a built-in.
pub fn interface_block(
    state: &mut StageState<'_>,
    direction: &'static str,
    aggregate: &Arc<Aggregate>,
    instance: String,
    arrayed: bool,
) -> GlslResult<Option<GlobalDecl>> {
    let mut members = Vec::new();
    for field in aggregate.declared_fields() {
        if state.registry.opaque_info(&field.ty).is_some() {
            bail!(
                InvalidInterface,
                "interface field '{}.{}' cannot have opaque type {}",
                aggregate.name(),
                field.name,
                field.ty
            );
        }
        members.push(Member {
            qualifier: field.interpolation.map(|i| i.name()),
            ty: state.resolve_type(&field.ty)?,
            name: field.name.clone(),
        });
    }
    if members.is_empty() {
        log::trace!("block '{}' has only built-in members; not declared", aggregate.name());
        return Ok(None);
    }
    Ok(Some(GlobalDecl::Block {
        direction,
        block: String::from(aggregate.name()),
        members,
        instance,
        arrayed,
    }))
}

/// `struct Name { ... };`
pub fn struct_decl(registry: &TypeRegistry, aggregate: &Arc<Aggregate>) -> GlslResult<GlobalDecl> {
    let mut members = Vec::new();
    for field in aggregate.fields() {
        members.push(Member {
            qualifier: None,
            ty: registry.resolve(&field.ty)?,
            name: field.name.clone(),
        });
    }
    Ok(GlobalDecl::Struct {
        name: String::from(aggregate.name()),
        members,
    })
}

/// `const T NAME = value;`
pub fn constant_decl(state: &mut StageState<'_>, constant: &ConstantDef) -> GlslResult<GlobalDecl> {
    let kind = match &constant.ty {
        TypeDescriptor::Scalar(kind) => *kind,
        other => bail!(
            TypeMismatch,
            "constant '{}' must have a scalar type, found {}",
            constant.name,
            other
        ),
    };
    let value = match (kind, constant.value) {
        (ScalarKind::Bool, Literal::Bool(_))
        | (ScalarKind::Int | ScalarKind::Uint, Literal::Int(_))
        | (ScalarKind::Float | ScalarKind::Double, Literal::Float(_)) => constant.value,
        (ScalarKind::Float | ScalarKind::Double, Literal::Int(v)) => Literal::Float(v as f64),
        (_, value) => bail!(
            TypeMismatch,
            "constant '{}' of type {} cannot hold {}",
            constant.name,
            constant.ty,
            value
        ),
    };
    if kind == ScalarKind::Uint && value.as_int().is_some_and(|v| v < 0) {
        bail!(TypeMismatch, "constant '{}' of type uint cannot be negative", constant.name);
    }
    Ok(GlobalDecl::Constant {
        ty: state.resolve_type(&constant.ty)?,
        name: constant.name.clone(),
        value: TypedExpr::new(ExprKind::Literal(value), constant.ty.clone()),
    })
}
