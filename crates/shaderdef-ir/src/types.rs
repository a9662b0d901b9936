//! Type descriptors for shader values.
//!
//! A [`TypeDescriptor`] describes the GLSL-domain type of a parameter, field,
//! local or expression. Descriptors are plain data; whether a given
//! combination has a GLSL spelling is decided by the transpiler's type
//! registry, not here.

use alloc::{boxed::Box, string::String, sync::Arc};
use core::fmt;

use crate::aggregate::Aggregate;

/// Component kind of scalars, vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    Uint,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
}

impl ScalarKind {
    /// GLSL scalar type name.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    /// Prefix used by GLSL vector and matrix names (`b`vec3, `i`vec2, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "",
            ScalarKind::Double => "d",
        }
    }

    /// Check if this kind supports arithmetic.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarKind::Bool)
    }

    /// Check if this is `int` or `uint`.
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Uint)
    }

    /// Check if this is `float` or `double`.
    pub fn is_floating(self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GLSL-domain type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// `bool`, `int`, `uint`, `float`, `double`
    Scalar(ScalarKind),
    /// `vecN` family, `size` in 2..=4
    Vector { component: ScalarKind, size: u8 },
    /// `matCxR` family: `cols` columns of `rows`-component vectors
    Matrix { component: ScalarKind, cols: u8, rows: u8 },
    /// Fixed-size array; the length is always known statically
    Array {
        element: Box<TypeDescriptor>,
        length: usize,
    },
    /// Samplers and images, by GLSL name
    Opaque { name: String },
    /// Struct or interface block
    Aggregate(Arc<Aggregate>),
}

impl TypeDescriptor {
    pub fn scalar(kind: ScalarKind) -> Self {
        TypeDescriptor::Scalar(kind)
    }

    pub fn bool() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Bool)
    }

    pub fn int() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Int)
    }

    pub fn uint() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Uint)
    }

    pub fn float() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Float)
    }

    pub fn double() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Double)
    }

    pub fn vector(component: ScalarKind, size: u8) -> Self {
        TypeDescriptor::Vector { component, size }
    }

    pub fn vec2() -> Self {
        Self::vector(ScalarKind::Float, 2)
    }

    pub fn vec3() -> Self {
        Self::vector(ScalarKind::Float, 3)
    }

    pub fn vec4() -> Self {
        Self::vector(ScalarKind::Float, 4)
    }

    pub fn ivec(size: u8) -> Self {
        Self::vector(ScalarKind::Int, size)
    }

    pub fn uvec(size: u8) -> Self {
        Self::vector(ScalarKind::Uint, size)
    }

    pub fn bvec(size: u8) -> Self {
        Self::vector(ScalarKind::Bool, size)
    }

    /// Float matrix with `cols` columns and `rows` rows.
    pub fn matrix(cols: u8, rows: u8) -> Self {
        TypeDescriptor::Matrix {
            component: ScalarKind::Float,
            cols,
            rows,
        }
    }

    pub fn mat2() -> Self {
        Self::matrix(2, 2)
    }

    pub fn mat3() -> Self {
        Self::matrix(3, 3)
    }

    pub fn mat4() -> Self {
        Self::matrix(4, 4)
    }

    pub fn array(element: TypeDescriptor, length: usize) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            length,
        }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        TypeDescriptor::Opaque { name: name.into() }
    }

    pub fn aggregate(aggregate: &Arc<Aggregate>) -> Self {
        TypeDescriptor::Aggregate(Arc::clone(aggregate))
    }

    /// Component kind of a scalar, vector or matrix.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            TypeDescriptor::Scalar(kind) => Some(*kind),
            TypeDescriptor::Vector { component, .. } | TypeDescriptor::Matrix { component, .. } => {
                Some(*component)
            }
            _ => None,
        }
    }

    /// Number of scalar components of a scalar, vector or matrix.
    pub fn component_count(&self) -> Option<usize> {
        match self {
            TypeDescriptor::Scalar(_) => Some(1),
            TypeDescriptor::Vector { size, .. } => Some(*size as usize),
            TypeDescriptor::Matrix { cols, rows, .. } => Some(*cols as usize * *rows as usize),
            _ => None,
        }
    }

    /// Same shape with a different component kind.
    ///
    /// Returns `None` for non-numeric shapes.
    pub fn with_component(&self, kind: ScalarKind) -> Option<TypeDescriptor> {
        match self {
            TypeDescriptor::Scalar(_) => Some(TypeDescriptor::Scalar(kind)),
            TypeDescriptor::Vector { size, .. } => Some(TypeDescriptor::Vector {
                component: kind,
                size: *size,
            }),
            TypeDescriptor::Matrix { cols, rows, .. } => Some(TypeDescriptor::Matrix {
                component: kind,
                cols: *cols,
                rows: *rows,
            }),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, TypeDescriptor::Vector { .. })
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, TypeDescriptor::Matrix { .. })
    }

    pub fn is_bool(&self) -> bool {
        *self == TypeDescriptor::Scalar(ScalarKind::Bool)
    }

    /// Check if this is a scalar `int` or `uint` (valid index type).
    pub fn is_integer_scalar(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(kind) if kind.is_integer())
    }

    pub fn as_aggregate(&self) -> Option<&Arc<Aggregate>> {
        match self {
            TypeDescriptor::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }

    /// Innermost element type of (possibly nested) arrays.
    pub fn innermost(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Array { element, .. } => element.innermost(),
            other => other,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => f.write_str(kind.name()),
            TypeDescriptor::Vector { component, size } => {
                write!(f, "{}vec{}", component.prefix(), size)
            }
            TypeDescriptor::Matrix {
                component,
                cols,
                rows,
            } => {
                if cols == rows {
                    write!(f, "{}mat{}", component.prefix(), cols)
                } else {
                    write!(f, "{}mat{}x{}", component.prefix(), cols, rows)
                }
            }
            TypeDescriptor::Array { element, length } => write!(f, "{}[{}]", element, length),
            TypeDescriptor::Opaque { name } => f.write_str(name),
            TypeDescriptor::Aggregate(aggregate) => f.write_str(aggregate.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(format!("{}", TypeDescriptor::float()), "float");
        assert_eq!(format!("{}", TypeDescriptor::ivec(3)), "ivec3");
        assert_eq!(format!("{}", TypeDescriptor::mat4()), "mat4");
        assert_eq!(format!("{}", TypeDescriptor::matrix(2, 3)), "mat2x3");
        assert_eq!(
            format!("{}", TypeDescriptor::array(TypeDescriptor::vec2(), 3)),
            "vec2[3]"
        );
    }

    #[test]
    fn test_component_count() {
        assert_eq!(TypeDescriptor::float().component_count(), Some(1));
        assert_eq!(TypeDescriptor::vec3().component_count(), Some(3));
        assert_eq!(TypeDescriptor::matrix(3, 2).component_count(), Some(6));
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::float(), 4).component_count(),
            None
        );
    }

    #[test]
    fn test_with_component() {
        assert_eq!(
            TypeDescriptor::ivec(2).with_component(ScalarKind::Float),
            Some(TypeDescriptor::vec2())
        );
        assert_eq!(TypeDescriptor::opaque("sampler2D").with_component(ScalarKind::Int), None);
    }

    #[test]
    fn test_innermost() {
        let nested = TypeDescriptor::array(TypeDescriptor::array(TypeDescriptor::int(), 2), 3);
        assert_eq!(nested.innermost(), &TypeDescriptor::int());
    }
}
