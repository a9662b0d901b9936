//! Type registry for GLSL transpilation.
//!
//! Maps [`TypeDescriptor`]s to GLSL spellings and back, and answers the
//! shape questions the resolver asks: swizzles, constructor arguments,
//! implicit conversions and location slot counts. The registry is built once
//! and only read afterwards.

use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::fmt;

use shaderdef_ir::{Aggregate, AggregateRole, ScalarKind, TypeDescriptor};

use crate::error::{bail, GlslResult};

/// A resolved GLSL type spelling.
///
/// Arrays keep their dimensions apart from the base name because GLSL
/// declarations put them after the variable name (`float arr[3]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlslTypeName {
    pub base: String,
    pub dims: Vec<usize>,
}

impl GlslTypeName {
    fn scalar(base: impl Into<String>) -> Self {
        GlslTypeName {
            base: base.into(),
            dims: Vec::new(),
        }
    }

    /// Declarator for a variable of this type: `vec3 n`, `float arr[3]`.
    pub fn declare(&self, name: &str) -> String {
        let mut out = format!("{} {}", self.base, name);
        for dim in &self.dims {
            out.push_str(&format!("[{}]", dim));
        }
        out
    }
}

impl fmt::Display for GlslTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for dim in &self.dims {
            write!(f, "[{}]", dim)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueKind {
    Sampler,
    Image,
}

/// Sampler and image metadata used by the texture and image built-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueInfo {
    pub name: String,
    pub kind: OpaqueKind,
    /// Component kind of fetched texels (`float` for `sampler2D`, `int` for `isampler2D`)
    pub result: ScalarKind,
    /// Coordinate dimension without the array layer
    pub dim: u8,
    pub arrayed: bool,
    pub shadow: bool,
    pub cube: bool,
}

impl OpaqueInfo {
    /// Components of the coordinate passed to `texture` / `imageLoad`.
    pub fn coord_size(&self) -> u8 {
        self.dim + self.arrayed as u8 + self.shadow as u8
    }

    /// Components of integer texel coordinates (`texelFetch`, `imageLoad`).
    pub fn texel_size(&self) -> u8 {
        self.dim + self.arrayed as u8
    }

    /// Type returned by `textureSize` / `imageSize`.
    pub fn size_type(&self) -> TypeDescriptor {
        match self.texel_size() {
            1 => TypeDescriptor::int(),
            n => TypeDescriptor::ivec(n),
        }
    }

    /// Type returned by a texel fetch: `gvec4`, or `float` for shadow lookups.
    pub fn texel_type(&self) -> TypeDescriptor {
        if self.shadow {
            TypeDescriptor::float()
        } else {
            TypeDescriptor::vector(self.result, 4)
        }
    }

    /// Image format qualifier used when the image is declared as a uniform.
    pub fn image_format(&self) -> &'static str {
        match self.result {
            ScalarKind::Int => "r32i",
            ScalarKind::Uint => "r32ui",
            _ => "rgba32f",
        }
    }
}

/// Argument shapes accepted by a type constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorShape {
    /// One scalar, vector or matrix; its first component is converted
    Scalar(ScalarKind),
    /// One scalar broadcast, or components filling `size` exactly
    Vector { component: ScalarKind, size: u8 },
    /// One scalar (diagonal), one matrix (resize), or `cols * rows` components
    Matrix {
        component: ScalarKind,
        cols: u8,
        rows: u8,
    },
    /// Exactly `length` elements of the element type
    Array {
        element: TypeDescriptor,
        length: usize,
    },
    /// One argument per field, in declaration order
    Struct(Arc<Aggregate>),
}

/// Name-to-type tables for built-in GLSL types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    names: BTreeMap<String, TypeDescriptor>,
    opaque: BTreeMap<String, OpaqueInfo>,
}

const SCALARS: [ScalarKind; 5] = [
    ScalarKind::Bool,
    ScalarKind::Int,
    ScalarKind::Uint,
    ScalarKind::Float,
    ScalarKind::Double,
];

impl TypeRegistry {
    pub fn new() -> Self {
        let mut names = BTreeMap::new();
        for kind in SCALARS {
            names.insert(kind.name().to_string(), TypeDescriptor::Scalar(kind));
            for size in 2..=4 {
                let ty = TypeDescriptor::vector(kind, size);
                names.insert(format!("{}", ty), ty);
            }
        }
        for component in [ScalarKind::Float, ScalarKind::Double] {
            for cols in 2..=4u8 {
                for rows in 2..=4u8 {
                    let ty = TypeDescriptor::Matrix {
                        component,
                        cols,
                        rows,
                    };
                    if cols == rows {
                        // matNxN is an alias of matN
                        names.insert(format!("{}mat{}x{}", component.prefix(), cols, rows), ty.clone());
                    }
                    names.insert(format!("{}", ty), ty);
                }
            }
        }

        let mut opaque = BTreeMap::new();
        let shapes: [(&str, u8, bool, bool); 6] = [
            ("1D", 1, false, false),
            ("2D", 2, false, false),
            ("3D", 3, false, false),
            ("Cube", 3, false, true),
            ("1DArray", 1, true, false),
            ("2DArray", 2, true, false),
        ];
        for (prefix, result) in [
            ("", ScalarKind::Float),
            ("i", ScalarKind::Int),
            ("u", ScalarKind::Uint),
        ] {
            for (suffix, dim, arrayed, cube) in shapes {
                for (stem, kind) in [("sampler", OpaqueKind::Sampler), ("image", OpaqueKind::Image)] {
                    let name = format!("{}{}{}", prefix, stem, suffix);
                    opaque.insert(
                        name.clone(),
                        OpaqueInfo {
                            name,
                            kind,
                            result,
                            dim,
                            arrayed,
                            shadow: false,
                            cube,
                        },
                    );
                }
            }
        }
        for (suffix, dim, arrayed, cube) in [
            ("1DShadow", 1, false, false),
            ("2DShadow", 2, false, false),
            ("CubeShadow", 3, false, true),
            ("2DArrayShadow", 2, true, false),
        ] {
            let name = format!("sampler{}", suffix);
            opaque.insert(
                name.clone(),
                OpaqueInfo {
                    name,
                    kind: OpaqueKind::Sampler,
                    result: ScalarKind::Float,
                    dim,
                    arrayed,
                    shadow: true,
                    cube,
                },
            );
        }
        for name in opaque.keys() {
            names.insert(name.clone(), TypeDescriptor::opaque(name.clone()));
        }

        TypeRegistry { names, opaque }
    }

    /// Built-in type for a constructor-namespace name (`vec3`, `mat2x3`, `sampler2D`).
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.names.get(name)
    }

    pub fn opaque(&self, name: &str) -> Option<&OpaqueInfo> {
        self.opaque.get(name)
    }

    /// Metadata of an opaque type descriptor.
    pub fn opaque_info(&self, ty: &TypeDescriptor) -> Option<&OpaqueInfo> {
        match ty {
            TypeDescriptor::Opaque { name } => self.opaque(name),
            _ => None,
        }
    }

    /// GLSL spelling of a type descriptor.
    pub fn resolve(&self, ty: &TypeDescriptor) -> GlslResult<GlslTypeName> {
        match ty {
            TypeDescriptor::Scalar(kind) => Ok(GlslTypeName::scalar(kind.name())),
            TypeDescriptor::Vector { size, .. } => {
                if !(2..=4).contains(size) {
                    bail!(UnknownType, "vector of size {} ({})", size, ty);
                }
                Ok(GlslTypeName::scalar(format!("{}", ty)))
            }
            TypeDescriptor::Matrix {
                component,
                cols,
                rows,
            } => {
                if !component.is_floating() {
                    bail!(UnknownType, "matrices of {} are not supported", component);
                }
                if !(2..=4).contains(cols) || !(2..=4).contains(rows) {
                    bail!(UnknownType, "matrix of {} columns and {} rows", cols, rows);
                }
                Ok(GlslTypeName::scalar(format!("{}", ty)))
            }
            TypeDescriptor::Array { element, length } => {
                if *length == 0 {
                    bail!(UnknownType, "zero-length array of {}", element);
                }
                let mut name = self.resolve(element)?;
                name.dims.insert(0, *length);
                Ok(name)
            }
            TypeDescriptor::Opaque { name } => match self.opaque.get(name) {
                Some(info) => Ok(GlslTypeName::scalar(info.name.clone())),
                None => bail!(UnknownType, "unknown opaque type '{}'", name),
            },
            TypeDescriptor::Aggregate(aggregate) => {
                for field in aggregate.fields() {
                    self.resolve(&field.ty)?;
                }
                Ok(GlslTypeName::scalar(aggregate.name()))
            }
        }
    }

    /// Argument shapes accepted when `ty` is called as a constructor.
    pub fn constructor_arity(&self, ty: &TypeDescriptor) -> GlslResult<ConstructorShape> {
        self.resolve(ty)?;
        match ty {
            TypeDescriptor::Scalar(kind) => Ok(ConstructorShape::Scalar(*kind)),
            TypeDescriptor::Vector { component, size } => Ok(ConstructorShape::Vector {
                component: *component,
                size: *size,
            }),
            TypeDescriptor::Matrix {
                component,
                cols,
                rows,
            } => Ok(ConstructorShape::Matrix {
                component: *component,
                cols: *cols,
                rows: *rows,
            }),
            TypeDescriptor::Array { element, length } => Ok(ConstructorShape::Array {
                element: (**element).clone(),
                length: *length,
            }),
            TypeDescriptor::Aggregate(aggregate) if aggregate.role() == AggregateRole::Struct => {
                Ok(ConstructorShape::Struct(Arc::clone(aggregate)))
            }
            other => bail!(TypeMismatch, "'{}' cannot be constructed", other),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const SWIZZLE_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

/// Result type of swizzling `vector` with `letters`.
pub fn swizzle_component_type(vector: &TypeDescriptor, letters: &str) -> GlslResult<TypeDescriptor> {
    let (component, size) = match vector {
        TypeDescriptor::Vector { component, size } => (*component, *size),
        other => bail!(Swizzle, "cannot swizzle '{}' of non-vector type {}", letters, other),
    };
    let count = letters.chars().count();
    if count == 0 || count > 4 {
        bail!(Swizzle, "swizzle '{}' must have 1 to 4 components", letters);
    }
    let first = letters.chars().next().unwrap_or('?');
    let set = match SWIZZLE_SETS.iter().find(|set| set.contains(first)) {
        Some(set) => set,
        None => bail!(Swizzle, "'{}' is not a swizzle component", first),
    };
    for letter in letters.chars() {
        match set.find(letter) {
            Some(index) if index < size as usize => {}
            Some(_) => bail!(Swizzle, "component '{}' out of range for {}", letter, vector),
            None => bail!(Swizzle, "swizzle '{}' mixes component sets", letters),
        }
    }
    Ok(if count == 1 {
        TypeDescriptor::Scalar(component)
    } else {
        TypeDescriptor::vector(component, count as u8)
    })
}

/// Position of a kind in the implicit conversion order int -> uint -> float -> double.
pub fn conversion_rank(kind: ScalarKind) -> Option<u8> {
    match kind {
        ScalarKind::Bool => None,
        ScalarKind::Int => Some(0),
        ScalarKind::Uint => Some(1),
        ScalarKind::Float => Some(2),
        ScalarKind::Double => Some(3),
    }
}

/// Wider of two component kinds, if both take part in implicit conversion.
pub fn common_kind(a: ScalarKind, b: ScalarKind) -> Option<ScalarKind> {
    if a == b {
        return Some(a);
    }
    let (ra, rb) = (conversion_rank(a)?, conversion_rank(b)?);
    Some(if ra >= rb { a } else { b })
}

/// Cost of implicitly passing `from` as `to`, or `None` if it does not
/// convert.
///
/// The cost is the distance between the component ranks, so `int -> float`
/// beats `int -> double` and `float -> double` beats both.
pub fn conversion_cost(from: &TypeDescriptor, to: &TypeDescriptor) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    let (from_kind, to_kind) = (from.scalar_kind()?, to.scalar_kind()?);
    if from.with_component(to_kind).as_ref() != Some(to) {
        return None;
    }
    let (rf, rt) = (conversion_rank(from_kind)?, conversion_rank(to_kind)?);
    (rf < rt).then(|| u32::from(rt - rf))
}

/// Number of `location` slots a value of this type occupies.
pub fn slot_count(ty: &TypeDescriptor) -> u32 {
    match ty {
        TypeDescriptor::Scalar(_) | TypeDescriptor::Opaque { .. } => 1,
        TypeDescriptor::Vector { component, size } => {
            if *component == ScalarKind::Double && *size > 2 {
                2
            } else {
                1
            }
        }
        TypeDescriptor::Matrix {
            component,
            cols,
            rows,
        } => {
            let column = slot_count(&TypeDescriptor::vector(*component, *rows));
            *cols as u32 * column
        }
        TypeDescriptor::Array { element, length } => *length as u32 * slot_count(element),
        TypeDescriptor::Aggregate(aggregate) => {
            aggregate.fields().iter().map(|f| slot_count(&f.ty)).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_resolve_spellings() {
        let registry = TypeRegistry::new();
        let spell = |ty: TypeDescriptor| format!("{}", registry.resolve(&ty).unwrap());
        assert_eq!(spell(TypeDescriptor::vec3()), "vec3");
        assert_eq!(spell(TypeDescriptor::matrix(2, 3)), "mat2x3");
        assert_eq!(
            spell(TypeDescriptor::Matrix {
                component: ScalarKind::Double,
                cols: 4,
                rows: 4
            }),
            "dmat4"
        );
        assert_eq!(spell(TypeDescriptor::uvec(2)), "uvec2");
        assert_eq!(spell(TypeDescriptor::opaque("sampler2DShadow")), "sampler2DShadow");
        assert_eq!(spell(TypeDescriptor::array(TypeDescriptor::float(), 3)), "float[3]");
    }

    #[test]
    fn test_declare_puts_dims_after_name() {
        let registry = TypeRegistry::new();
        let name = registry
            .resolve(&TypeDescriptor::array(TypeDescriptor::vec2(), 4))
            .unwrap();
        assert_eq!(name.declare("points"), "vec2 points[4]");
    }

    #[test]
    fn test_resolve_rejects_unsupported() {
        let registry = TypeRegistry::new();
        for ty in [
            TypeDescriptor::vector(ScalarKind::Float, 5),
            TypeDescriptor::Matrix {
                component: ScalarKind::Int,
                cols: 2,
                rows: 2,
            },
            TypeDescriptor::opaque("sampler9D"),
        ] {
            let err = registry.resolve(&ty).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::UnknownType(_)), "{}", ty);
        }
    }

    #[test]
    fn test_lookup() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("ivec3"), Some(&TypeDescriptor::ivec(3)));
        assert_eq!(registry.lookup("mat3x3"), Some(&TypeDescriptor::mat3()));
        assert_eq!(registry.lookup("mat4"), Some(&TypeDescriptor::mat4()));
        assert!(registry.lookup("vec5").is_none());
        let info = registry.opaque("usampler2DArray").unwrap();
        assert_eq!(info.result, ScalarKind::Uint);
        assert_eq!(info.coord_size(), 3);
        assert_eq!(registry.opaque("sampler2DShadow").unwrap().coord_size(), 3);
    }

    #[test]
    fn test_swizzle() {
        let v4 = TypeDescriptor::vec4();
        assert_eq!(swizzle_component_type(&v4, "x").unwrap(), TypeDescriptor::float());
        assert_eq!(swizzle_component_type(&v4, "xyz").unwrap(), TypeDescriptor::vec3());
        assert_eq!(swizzle_component_type(&v4, "rrgg").unwrap(), TypeDescriptor::vec4());
        assert_eq!(
            swizzle_component_type(&TypeDescriptor::ivec(2), "ts").unwrap(),
            TypeDescriptor::ivec(2)
        );
        for bad in ["xr", "xyzwx", "q", ""] {
            assert!(swizzle_component_type(&v4, bad).is_err(), "{}", bad);
        }
        assert!(swizzle_component_type(&TypeDescriptor::vec2(), "z").is_err());
        assert!(swizzle_component_type(&TypeDescriptor::float(), "x").is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(conversion_cost(&TypeDescriptor::int(), &TypeDescriptor::float()), Some(2));
        assert_eq!(conversion_cost(&TypeDescriptor::int(), &TypeDescriptor::double()), Some(3));
        assert_eq!(conversion_cost(&TypeDescriptor::float(), &TypeDescriptor::double()), Some(1));
        assert_eq!(conversion_cost(&TypeDescriptor::float(), &TypeDescriptor::int()), None);
        assert_eq!(conversion_cost(&TypeDescriptor::ivec(3), &TypeDescriptor::vec3()), Some(2));
        assert_eq!(conversion_cost(&TypeDescriptor::ivec(3), &TypeDescriptor::vec2()), None);
        assert_eq!(conversion_cost(&TypeDescriptor::bool(), &TypeDescriptor::int()), None);
        assert_eq!(common_kind(ScalarKind::Int, ScalarKind::Float), Some(ScalarKind::Float));
    }

    #[test]
    fn test_slot_counts() {
        assert_eq!(slot_count(&TypeDescriptor::vec4()), 1);
        assert_eq!(slot_count(&TypeDescriptor::mat4()), 4);
        assert_eq!(slot_count(&TypeDescriptor::vector(ScalarKind::Double, 3)), 2);
        assert_eq!(slot_count(&TypeDescriptor::array(TypeDescriptor::vec2(), 3)), 3);
    }
}
