//! Aggregates: structs and interface blocks.
//!
//! Aggregates are declared once through [`AggregateBuilder`] and are
//! immutable afterwards. Field order is significant: it drives member
//! declaration order, attribute/output locations and constructor argument
//! order.

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec,
    vec::Vec,
};

use thiserror::Error;

use crate::types::TypeDescriptor;

/// What an aggregate is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateRole {
    /// Plain GLSL `struct`
    Struct,
    /// Per-vertex inputs of a vertex shader, one `layout(location=N) in` each
    AttributeBlock,
    /// Top-level `uniform` declarations
    UniformBlock,
    /// Stage-to-stage `in`/`out` interface block
    ShaderInterface,
    /// Location-indexed fragment shader outputs
    FragmentOutput,
    /// Element type of the built-in `gl_in[]` array
    BuiltinPerVertex,
}

impl AggregateRole {
    pub fn name(self) -> &'static str {
        match self {
            AggregateRole::Struct => "struct",
            AggregateRole::AttributeBlock => "attribute block",
            AggregateRole::UniformBlock => "uniform block",
            AggregateRole::ShaderInterface => "shader interface",
            AggregateRole::FragmentOutput => "fragment output block",
            AggregateRole::BuiltinPerVertex => "built-in per-vertex block",
        }
    }

    /// Check if this role describes a GPU-visible interface (anything but a struct).
    pub fn is_interface(self) -> bool {
        !matches!(self, AggregateRole::Struct)
    }
}

/// Interpolation qualifier of a shader interface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Smooth,
    Flat,
    NoPerspective,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Smooth => "smooth",
            Interpolation::Flat => "flat",
            Interpolation::NoPerspective => "noperspective",
        }
    }
}

/// A named member of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
    /// Explicit interpolation qualifier; `None` means GLSL's default (smooth)
    pub interpolation: Option<Interpolation>,
}

impl Field {
    /// Built-in members (`gl_Position`, ...) are never declared in a block.
    pub fn is_builtin(&self) -> bool {
        self.name.starts_with("gl_")
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation.unwrap_or_default()
    }
}

/// Errors raised while declaring an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("field '{field}' declared twice in '{aggregate}'")]
    DuplicateField { aggregate: String, field: String },
    #[error("struct '{0}' must declare at least one field")]
    EmptyStruct(String),
    #[error("field '{field}' of {role} '{aggregate}' cannot carry an interpolation qualifier")]
    InterpolationNotAllowed {
        aggregate: String,
        field: String,
        role: &'static str,
    },
}

/// A named, ordered list of typed fields with a role tag.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Aggregate {
    name: String,
    role: AggregateRole,
    fields: Vec<Field>,
}

impl Aggregate {
    /// Start declaring an aggregate.
    pub fn builder(name: impl Into<String>, role: AggregateRole) -> AggregateBuilder {
        AggregateBuilder {
            name: name.into(),
            role,
            fields: Vec::new(),
        }
    }

    /// Element type of the built-in `gl_in[]` array.
    pub fn gl_per_vertex() -> Arc<Aggregate> {
        Arc::new(Aggregate {
            name: "gl_PerVertex".to_string(),
            role: AggregateRole::BuiltinPerVertex,
            fields: vec![
                Field {
                    name: "gl_Position".to_string(),
                    ty: TypeDescriptor::vec4(),
                    interpolation: None,
                },
                Field {
                    name: "gl_PointSize".to_string(),
                    ty: TypeDescriptor::float(),
                    interpolation: None,
                },
            ],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AggregateRole {
        self.role
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name, returning its declaration index.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Fields that appear in a GLSL declaration (built-ins excluded).
    pub fn declared_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_builtin())
    }

    /// Instance name used for block declarations (`VsOut` -> `vs_out`).
    pub fn instance_name(&self) -> String {
        snake_case(&self.name)
    }
}

/// Typed field-list constructor for [`Aggregate`].
#[derive(Debug, Clone)]
pub struct AggregateBuilder {
    name: String,
    role: AggregateRole,
    fields: Vec<Field>,
}

impl AggregateBuilder {
    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            interpolation: None,
        });
        self
    }

    /// Append a field with an explicit interpolation qualifier.
    pub fn interpolated(
        mut self,
        name: impl Into<String>,
        ty: TypeDescriptor,
        interpolation: Interpolation,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            interpolation: Some(interpolation),
        });
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> Result<Arc<Aggregate>, AggregateError> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(AggregateError::DuplicateField {
                    aggregate: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.interpolation.is_some() && self.role != AggregateRole::ShaderInterface {
                return Err(AggregateError::InterpolationNotAllowed {
                    aggregate: self.name.clone(),
                    field: field.name.clone(),
                    role: self.role.name(),
                });
            }
        }
        if self.role == AggregateRole::Struct && self.fields.is_empty() {
            return Err(AggregateError::EmptyStruct(self.name));
        }
        Ok(Arc::new(Aggregate {
            name: self.name,
            role: self.role,
            fields: self.fields,
        }))
    }
}

/// Convert a CamelCase block name into a snake_case instance name.
///
/// An underscore goes before every uppercase letter except the first one.
pub fn snake_case(name: &str) -> String {
    let mut output = String::with_capacity(name.len() + 4);
    let mut first = true;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if first {
                first = false;
            } else {
                output.push('_');
            }
            output.extend(ch.to_lowercase());
        } else {
            output.push(ch);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("VsOut"), "vs_out");
        assert_eq!(snake_case("FsOut"), "fs_out");
        assert_eq!(snake_case("Outputs"), "outputs");
        assert_eq!(snake_case("TcsOut"), "tcs_out");
        assert_eq!(snake_case("lower"), "lower");
    }

    #[test]
    fn test_builder_preserves_order() {
        let block = Aggregate::builder("VertAttrs", AggregateRole::AttributeBlock)
            .field("vert_loc", TypeDescriptor::vec3())
            .field("vert_nor", TypeDescriptor::vec3())
            .field("vert_col", TypeDescriptor::vec4())
            .build()
            .unwrap();
        let names: Vec<&str> = block.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["vert_loc", "vert_nor", "vert_col"]);
        assert_eq!(block.field("vert_nor").map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Aggregate::builder("Dup", AggregateRole::UniformBlock)
            .field("a", TypeDescriptor::float())
            .field("a", TypeDescriptor::vec2())
            .build();
        assert!(matches!(result, Err(AggregateError::DuplicateField { .. })));
    }

    #[test]
    fn test_interpolation_only_on_shader_interface() {
        let result = Aggregate::builder("U", AggregateRole::UniformBlock)
            .interpolated("a", TypeDescriptor::float(), Interpolation::Flat)
            .build();
        assert!(matches!(
            result,
            Err(AggregateError::InterpolationNotAllowed { .. })
        ));

        let ok = Aggregate::builder("VsOut", AggregateRole::ShaderInterface)
            .interpolated("id", TypeDescriptor::int(), Interpolation::Flat)
            .field("color", TypeDescriptor::vec4())
            .build()
            .unwrap();
        assert_eq!(ok.fields()[0].interpolation(), Interpolation::Flat);
        assert_eq!(ok.fields()[1].interpolation(), Interpolation::Smooth);
    }

    #[test]
    fn test_empty_struct_rejected() {
        let result = Aggregate::builder("Empty", AggregateRole::Struct).build();
        assert_eq!(result, Err(AggregateError::EmptyStruct("Empty".to_string())));
    }

    #[test]
    fn test_declared_fields_skip_builtins() {
        let block = Aggregate::builder("VsOut", AggregateRole::ShaderInterface)
            .field("gl_Position", TypeDescriptor::vec4())
            .field("normal", TypeDescriptor::vec3())
            .build()
            .unwrap();
        let declared: Vec<&str> = block.declared_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(declared, ["normal"]);
        assert_eq!(block.instance_name(), "vs_out");
    }
}
