//! Built-in GLSL functions and variables.
//!
//! Functions live in a closed table keyed by name. Each entry is either a
//! generic pattern instantiated over a type family (`genType`, `genIType`,
//! ...) or a shape derived from the sampler or image argument. Resolution
//! instantiates every candidate for the call's stage and leaves overload
//! selection to the caller.

use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use shaderdef_ir::{ScalarKind, Stage, TypeDescriptor};

use crate::{
    error::{bail, GlslResult},
    types::{OpaqueKind, TypeRegistry},
};

/// First GLSL version with double precision types.
pub const DOUBLE_MIN_VERSION: u32 = 400;

fn is_double(ty: &TypeDescriptor) -> bool {
    ty.scalar_kind() == Some(ScalarKind::Double)
}

/// A concrete, fully instantiated function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Name emitted in GLSL
    pub name: String,
    pub params: Vec<TypeDescriptor>,
    /// `None` for `void`
    pub ret: Option<TypeDescriptor>,
}

/// Set of stages an overload is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StageSet(u8);

impl StageSet {
    const ALL: StageSet = StageSet(0b11_1111);

    fn only(stages: &[Stage]) -> StageSet {
        StageSet(stages.iter().fold(0, |acc, s| acc | Self::bit(*s)))
    }

    fn bit(stage: Stage) -> u8 {
        1 << (stage as u8)
    }

    fn contains(self, stage: Stage) -> bool {
        self.0 & Self::bit(stage) != 0
    }
}

/// Type families a generic pattern is instantiated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    /// float, vec2..vec4
    GenType,
    /// double, dvec2..dvec4
    GenDType,
    GenIType,
    GenUType,
    Vec,
    IVec,
    UVec,
    BVec,
    Int,
    Uint,
    /// Every float matrix shape
    Mat,
    SquareMat,
}

impl Family {
    fn instances(self) -> Vec<TypeDescriptor> {
        let family = |kind: ScalarKind, scalar: bool| {
            let mut out = Vec::new();
            if scalar {
                out.push(TypeDescriptor::Scalar(kind));
            }
            for size in 2..=4 {
                out.push(TypeDescriptor::vector(kind, size));
            }
            out
        };
        match self {
            Family::GenType => family(ScalarKind::Float, true),
            Family::GenDType => family(ScalarKind::Double, true),
            Family::GenIType => family(ScalarKind::Int, true),
            Family::GenUType => family(ScalarKind::Uint, true),
            Family::Vec => family(ScalarKind::Float, false),
            Family::IVec => family(ScalarKind::Int, false),
            Family::UVec => family(ScalarKind::Uint, false),
            Family::BVec => family(ScalarKind::Bool, false),
            Family::Int => vec![TypeDescriptor::int()],
            Family::Uint => vec![TypeDescriptor::uint()],
            Family::Mat => {
                let mut out = Vec::new();
                for cols in 2..=4 {
                    for rows in 2..=4 {
                        out.push(TypeDescriptor::matrix(cols, rows));
                    }
                }
                out
            }
            Family::SquareMat => (2..=4).map(|n| TypeDescriptor::matrix(n, n)).collect(),
        }
    }
}

const FLOATS: &[Family] = &[Family::GenType, Family::GenDType];
const SIGNED: &[Family] = &[Family::GenType, Family::GenDType, Family::GenIType];
const NUMERIC: &[Family] = &[
    Family::GenType,
    Family::GenDType,
    Family::GenIType,
    Family::GenUType,
];
const ATOMIC: &[Family] = &[Family::Int, Family::Uint];

/// A parameter or return slot of a generic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// The instantiated type
    T,
    /// Scalar of T's component kind
    Component,
    /// T's shape with another component kind
    Shaped(ScalarKind),
    Fixed(TypeDescriptor),
    Void,
}

impl Slot {
    fn instantiate(&self, t: &TypeDescriptor) -> Option<TypeDescriptor> {
        match self {
            Slot::T => Some(t.clone()),
            Slot::Component => t.scalar_kind().map(TypeDescriptor::Scalar),
            Slot::Shaped(kind) => t.with_component(*kind),
            Slot::Fixed(ty) => Some(ty.clone()),
            Slot::Void => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureFn {
    Texture,
    TextureLod,
    TextureProj,
    TextureOffset,
    TexelFetch,
    TextureSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFn {
    Load,
    Store,
    Size,
    Atomic,
    AtomicCompSwap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    Generic {
        families: &'static [Family],
        params: Vec<Slot>,
        ret: Slot,
    },
    OuterProduct,
    Transpose,
    Texture(TextureFn),
    Image(ImageFn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Overload {
    stages: StageSet,
    shape: Shape,
}

/// Closed table of built-in functions.
#[derive(Debug, Clone)]
pub struct BuiltinTable {
    functions: BTreeMap<&'static str, Vec<Overload>>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        let mut table = BuiltinTable {
            functions: BTreeMap::new(),
        };
        use Slot::{Component as C, Shaped, T};
        let b = || Shaped(ScalarKind::Bool);

        // Angle and trigonometry, exponential
        for name in [
            "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh",
            "tanh", "asinh", "acosh", "atanh", "exp", "log", "exp2", "log2",
        ] {
            table.generic(name, &[Family::GenType], vec![T], T);
        }
        table.generic("atan", &[Family::GenType], vec![T, T], T);
        table.generic("pow", &[Family::GenType], vec![T, T], T);
        for name in ["sqrt", "inversesqrt"] {
            table.generic(name, FLOATS, vec![T], T);
        }

        // Common
        for name in ["abs", "sign"] {
            table.generic(name, SIGNED, vec![T], T);
        }
        for name in ["floor", "trunc", "round", "roundEven", "ceil", "fract"] {
            table.generic(name, FLOATS, vec![T], T);
        }
        table.generic("mod", FLOATS, vec![T, T], T);
        table.generic("mod", FLOATS, vec![T, C], T);
        for name in ["min", "max"] {
            table.generic(name, NUMERIC, vec![T, T], T);
            table.generic(name, NUMERIC, vec![T, C], T);
        }
        table.generic("clamp", NUMERIC, vec![T, T, T], T);
        table.generic("clamp", NUMERIC, vec![T, C, C], T);
        table.generic("mix", FLOATS, vec![T, T, T], T);
        table.generic("mix", FLOATS, vec![T, T, C], T);
        table.generic("mix", FLOATS, vec![T, T, b()], T);
        table.generic("step", FLOATS, vec![T, T], T);
        table.generic("step", FLOATS, vec![C, T], T);
        table.generic("smoothstep", FLOATS, vec![T, T, T], T);
        table.generic("smoothstep", FLOATS, vec![C, C, T], T);
        table.generic("isnan", FLOATS, vec![T], b());
        table.generic("isinf", FLOATS, vec![T], b());
        table.generic("fma", FLOATS, vec![T, T, T], T);
        table.generic(
            "floatBitsToInt",
            &[Family::GenType],
            vec![T],
            Shaped(ScalarKind::Int),
        );
        table.generic(
            "floatBitsToUint",
            &[Family::GenType],
            vec![T],
            Shaped(ScalarKind::Uint),
        );
        table.generic(
            "intBitsToFloat",
            &[Family::GenIType],
            vec![T],
            Shaped(ScalarKind::Float),
        );
        table.generic(
            "uintBitsToFloat",
            &[Family::GenUType],
            vec![T],
            Shaped(ScalarKind::Float),
        );

        // Geometric
        table.generic("length", FLOATS, vec![T], C);
        table.generic("distance", FLOATS, vec![T, T], C);
        table.generic("dot", FLOATS, vec![T, T], C);
        for kind in [ScalarKind::Float, ScalarKind::Double] {
            let v3 = TypeDescriptor::vector(kind, 3);
            table.generic(
                "cross",
                &[],
                vec![Slot::Fixed(v3.clone()), Slot::Fixed(v3.clone())],
                Slot::Fixed(v3),
            );
        }
        table.generic("normalize", FLOATS, vec![T], T);
        table.generic("faceforward", FLOATS, vec![T, T, T], T);
        table.generic("reflect", FLOATS, vec![T, T], T);
        table.generic("refract", FLOATS, vec![T, T, C], T);

        // Matrix
        table.generic("matrixCompMult", &[Family::Mat], vec![T, T], T);
        table.special("outerProduct", StageSet::ALL, Shape::OuterProduct);
        table.special("transpose", StageSet::ALL, Shape::Transpose);
        table.generic("determinant", &[Family::SquareMat], vec![T], C);
        table.generic("inverse", &[Family::SquareMat], vec![T], T);

        // Vector relational
        let ordered: &'static [Family] = &[Family::Vec, Family::IVec, Family::UVec];
        for name in ["lessThan", "lessThanEqual", "greaterThan", "greaterThanEqual"] {
            table.generic(name, ordered, vec![T, T], b());
        }
        let all_vecs: &'static [Family] = &[Family::Vec, Family::IVec, Family::UVec, Family::BVec];
        for name in ["equal", "notEqual"] {
            table.generic(name, all_vecs, vec![T, T], b());
        }
        for name in ["any", "all"] {
            table.generic(name, &[Family::BVec], vec![T], Slot::Fixed(TypeDescriptor::bool()));
        }
        table.generic("not", &[Family::BVec], vec![T], T);

        // Texture lookup
        for (name, func) in [
            ("texture", TextureFn::Texture),
            ("textureLod", TextureFn::TextureLod),
            ("textureProj", TextureFn::TextureProj),
            ("textureOffset", TextureFn::TextureOffset),
            ("texelFetch", TextureFn::TexelFetch),
            ("textureSize", TextureFn::TextureSize),
        ] {
            table.special(name, StageSet::ALL, Shape::Texture(func));
        }

        // Derivatives
        let fragment = StageSet::only(&[Stage::Fragment]);
        for name in ["dFdx", "dFdy", "fwidth"] {
            table.generic_in(name, fragment, &[Family::GenType], vec![T], T);
        }

        // Geometry emission
        let geometry = StageSet::only(&[Stage::Geometry]);
        for name in ["EmitVertex", "EndPrimitive"] {
            table.generic_in(name, geometry, &[], vec![], Slot::Void);
        }

        // Synchronization
        let barrier_stages = StageSet::only(&[Stage::Compute, Stage::TessControl]);
        table.generic_in("barrier", barrier_stages, &[], vec![], Slot::Void);
        for name in ["memoryBarrier", "memoryBarrierImage", "memoryBarrierBuffer"] {
            table.generic(name, &[], vec![], Slot::Void);
        }
        let compute = StageSet::only(&[Stage::Compute]);
        for name in ["memoryBarrierShared", "groupMemoryBarrier"] {
            table.generic_in(name, compute, &[], vec![], Slot::Void);
        }

        // Atomic memory
        for name in [
            "atomicAdd",
            "atomicMin",
            "atomicMax",
            "atomicAnd",
            "atomicOr",
            "atomicXor",
            "atomicExchange",
        ] {
            table.generic(name, ATOMIC, vec![T, T], T);
        }
        table.generic("atomicCompSwap", ATOMIC, vec![T, T, T], T);

        // Image
        table.special("imageLoad", StageSet::ALL, Shape::Image(ImageFn::Load));
        table.special("imageStore", StageSet::ALL, Shape::Image(ImageFn::Store));
        table.special("imageSize", StageSet::ALL, Shape::Image(ImageFn::Size));
        for name in [
            "imageAtomicAdd",
            "imageAtomicMin",
            "imageAtomicMax",
            "imageAtomicAnd",
            "imageAtomicOr",
            "imageAtomicXor",
            "imageAtomicExchange",
        ] {
            table.special(name, StageSet::ALL, Shape::Image(ImageFn::Atomic));
        }
        table.special(
            "imageAtomicCompSwap",
            StageSet::ALL,
            Shape::Image(ImageFn::AtomicCompSwap),
        );

        table
    }

    fn generic(&mut self, name: &'static str, families: &'static [Family], params: Vec<Slot>, ret: Slot) {
        self.generic_in(name, StageSet::ALL, families, params, ret);
    }

    fn generic_in(
        &mut self,
        name: &'static str,
        stages: StageSet,
        families: &'static [Family],
        params: Vec<Slot>,
        ret: Slot,
    ) {
        self.special(
            name,
            stages,
            Shape::Generic {
                families,
                params,
                ret,
            },
        );
    }

    fn special(&mut self, name: &'static str, stages: StageSet, shape: Shape) {
        self.functions
            .entry(name)
            .or_default()
            .push(Overload { stages, shape });
    }

    /// Check if `name` is a built-in function in any stage.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(canonical_function_name(name))
    }

    /// All concrete signatures of `name` available in `stage` at GLSL
    /// `version`.
    ///
    /// Sampler and image built-ins derive their signatures from the first
    /// argument, so the argument types are needed up front. Candidates that
    /// instantiate to the same parameter list are reported once. Double
    /// precision overloads only exist from version 400 on.
    pub fn candidates(
        &self,
        name: &str,
        stage: Stage,
        version: u32,
        args: &[TypeDescriptor],
        registry: &TypeRegistry,
    ) -> GlslResult<Vec<Candidate>> {
        let glsl_name = canonical_function_name(name);
        let overloads = match self.functions.get(glsl_name) {
            Some(overloads) => overloads,
            None => bail!(UnknownIdentifier, "unknown function '{}'", name),
        };
        let available: Vec<&Overload> = overloads
            .iter()
            .filter(|o| o.stages.contains(stage))
            .collect();
        if available.is_empty() {
            bail!(
                UnknownIdentifier,
                "built-in '{}' is not available in the {} stage",
                name,
                stage
            );
        }

        let mut out: Vec<Candidate> = Vec::new();
        let doubles = version >= DOUBLE_MIN_VERSION;
        let mut push = |params: Vec<TypeDescriptor>, ret: Option<TypeDescriptor>| {
            if !doubles && params.iter().chain(ret.as_ref()).any(is_double) {
                return;
            }
            if !out.iter().any(|c| c.params == params) {
                out.push(Candidate {
                    name: glsl_name.to_string(),
                    params,
                    ret,
                });
            }
        };
        for overload in available {
            match &overload.shape {
                Shape::Generic {
                    families,
                    params,
                    ret,
                } => {
                    if families.is_empty() {
                        let unused = TypeDescriptor::float();
                        let concrete = params.iter().filter_map(|s| s.instantiate(&unused)).collect();
                        push(concrete, ret.instantiate(&unused));
                        continue;
                    }
                    for family in families.iter() {
                        for t in family.instances() {
                            let concrete: Option<Vec<_>> =
                                params.iter().map(|s| s.instantiate(&t)).collect();
                            if let Some(concrete) = concrete {
                                push(concrete, ret.instantiate(&t));
                            }
                        }
                    }
                }
                Shape::OuterProduct => {
                    for cols in 2..=4 {
                        for rows in 2..=4 {
                            push(
                                vec![TypeDescriptor::vector(ScalarKind::Float, rows), TypeDescriptor::vector(ScalarKind::Float, cols)],
                                Some(TypeDescriptor::matrix(cols, rows)),
                            );
                        }
                    }
                }
                Shape::Transpose => {
                    for cols in 2..=4 {
                        for rows in 2..=4 {
                            push(
                                vec![TypeDescriptor::matrix(cols, rows)],
                                Some(TypeDescriptor::matrix(rows, cols)),
                            );
                        }
                    }
                }
                Shape::Texture(func) => {
                    for (params, ret) in texture_candidates(*func, args, registry) {
                        push(params, Some(ret));
                    }
                }
                Shape::Image(func) => {
                    for (params, ret) in image_candidates(*func, args, registry) {
                        push(params, ret);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}

/// GLSL name of a built-in function (`atan2` is spelled `atan`).
pub fn canonical_function_name(name: &str) -> &str {
    match name {
        "atan2" => "atan",
        other => other,
    }
}

fn shaped(kind: ScalarKind, size: u8) -> TypeDescriptor {
    if size == 1 {
        TypeDescriptor::Scalar(kind)
    } else {
        TypeDescriptor::vector(kind, size)
    }
}

fn texture_candidates(
    func: TextureFn,
    args: &[TypeDescriptor],
    registry: &TypeRegistry,
) -> Vec<(Vec<TypeDescriptor>, TypeDescriptor)> {
    let sampler_ty = match args.first() {
        Some(ty) => ty,
        None => return Vec::new(),
    };
    let info = match registry.opaque_info(sampler_ty) {
        Some(info) if info.kind == OpaqueKind::Sampler => info,
        _ => return Vec::new(),
    };
    let s = sampler_ty.clone();
    let coord = shaped(ScalarKind::Float, info.coord_size());
    let texel = info.texel_type();
    let float = TypeDescriptor::float();
    let int = TypeDescriptor::int();
    match func {
        TextureFn::Texture => vec![
            (vec![s.clone(), coord.clone()], texel.clone()),
            (vec![s, coord, float], texel),
        ],
        TextureFn::TextureLod => {
            if info.shadow && info.cube {
                return Vec::new();
            }
            vec![(vec![s, coord, float], texel)]
        }
        TextureFn::TextureProj => {
            if info.arrayed || info.cube {
                return Vec::new();
            }
            let proj = if info.shadow {
                TypeDescriptor::vec4()
            } else {
                shaped(ScalarKind::Float, info.dim + 1)
            };
            vec![(vec![s, proj], texel)]
        }
        TextureFn::TextureOffset => {
            if info.cube {
                return Vec::new();
            }
            vec![(vec![s, coord, shaped(ScalarKind::Int, info.dim)], texel)]
        }
        TextureFn::TexelFetch => {
            if info.shadow || info.cube {
                return Vec::new();
            }
            vec![(vec![s, shaped(ScalarKind::Int, info.texel_size()), int], texel)]
        }
        TextureFn::TextureSize => {
            let dims = if info.cube { 2 } else { info.dim } + info.arrayed as u8;
            vec![(vec![s, int], shaped(ScalarKind::Int, dims))]
        }
    }
}

fn image_candidates(
    func: ImageFn,
    args: &[TypeDescriptor],
    registry: &TypeRegistry,
) -> Vec<(Vec<TypeDescriptor>, Option<TypeDescriptor>)> {
    let image_ty = match args.first() {
        Some(ty) => ty,
        None => return Vec::new(),
    };
    let info = match registry.opaque_info(image_ty) {
        Some(info) if info.kind == OpaqueKind::Image => info,
        _ => return Vec::new(),
    };
    let img = image_ty.clone();
    let coord = shaped(ScalarKind::Int, info.texel_size());
    let data = TypeDescriptor::vector(info.result, 4);
    let scalar = TypeDescriptor::Scalar(info.result);
    match func {
        ImageFn::Load => vec![(vec![img, coord], Some(data))],
        ImageFn::Store => vec![(vec![img, coord, data], None)],
        ImageFn::Size => vec![(vec![img], Some(info.size_type()))],
        ImageFn::Atomic | ImageFn::AtomicCompSwap if info.result == ScalarKind::Float => Vec::new(),
        ImageFn::Atomic => vec![(vec![img, coord, scalar.clone()], Some(scalar))],
        ImageFn::AtomicCompSwap => {
            vec![(vec![img, coord, scalar.clone(), scalar.clone()], Some(scalar))]
        }
    }
}

/// A built-in variable visible in some stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinVariable {
    pub name: &'static str,
    pub ty: TypeDescriptor,
    pub writable: bool,
}

fn var(name: &'static str, ty: TypeDescriptor, writable: bool) -> BuiltinVariable {
    BuiltinVariable { name, ty, writable }
}

/// Built-in variables of a stage, with their GLSL types.
pub fn builtin_variables(stage: Stage) -> Vec<BuiltinVariable> {
    let float = TypeDescriptor::float;
    let int = TypeDescriptor::int;
    let uvec3 = || TypeDescriptor::uvec(3);
    match stage {
        Stage::Vertex => vec![
            var("gl_Position", TypeDescriptor::vec4(), true),
            var("gl_PointSize", float(), true),
            var("gl_VertexID", int(), false),
            var("gl_InstanceID", int(), false),
        ],
        Stage::Fragment => vec![
            var("gl_FragCoord", TypeDescriptor::vec4(), false),
            var("gl_FrontFacing", TypeDescriptor::bool(), false),
            var("gl_PointCoord", TypeDescriptor::vec2(), false),
            var("gl_PrimitiveID", int(), false),
            var("gl_FragDepth", float(), true),
        ],
        Stage::Geometry => vec![
            var("gl_Position", TypeDescriptor::vec4(), true),
            var("gl_PointSize", float(), true),
            var("gl_PrimitiveIDIn", int(), false),
            var("gl_PrimitiveID", int(), true),
            var("gl_InvocationID", int(), false),
            var("gl_Layer", int(), true),
        ],
        Stage::TessControl => vec![
            var("gl_PatchVerticesIn", int(), false),
            var("gl_PrimitiveID", int(), false),
            var("gl_InvocationID", int(), false),
            var("gl_TessLevelOuter", TypeDescriptor::array(float(), 4), true),
            var("gl_TessLevelInner", TypeDescriptor::array(float(), 2), true),
        ],
        Stage::TessEval => vec![
            var("gl_TessCoord", TypeDescriptor::vec3(), false),
            var("gl_PatchVerticesIn", int(), false),
            var("gl_PrimitiveID", int(), false),
            var("gl_TessLevelOuter", TypeDescriptor::array(float(), 4), false),
            var("gl_TessLevelInner", TypeDescriptor::array(float(), 2), false),
            var("gl_Position", TypeDescriptor::vec4(), true),
            var("gl_PointSize", float(), true),
        ],
        Stage::Compute => vec![
            var("gl_NumWorkGroups", uvec3(), false),
            var("gl_WorkGroupSize", uvec3(), false),
            var("gl_WorkGroupID", uvec3(), false),
            var("gl_LocalInvocationID", uvec3(), false),
            var("gl_GlobalInvocationID", uvec3(), false),
            var("gl_LocalInvocationIndex", TypeDescriptor::uint(), false),
        ],
    }
}

const BUILTIN_NAMES: &[&str] = &[
    "gl_Position",
    "gl_PointSize",
    "gl_VertexID",
    "gl_InstanceID",
    "gl_FragCoord",
    "gl_FrontFacing",
    "gl_PointCoord",
    "gl_PrimitiveID",
    "gl_PrimitiveIDIn",
    "gl_FragDepth",
    "gl_InvocationID",
    "gl_Layer",
    "gl_PatchVerticesIn",
    "gl_TessLevelOuter",
    "gl_TessLevelInner",
    "gl_TessCoord",
    "gl_NumWorkGroups",
    "gl_WorkGroupSize",
    "gl_WorkGroupID",
    "gl_LocalInvocationID",
    "gl_GlobalInvocationID",
    "gl_LocalInvocationIndex",
    "gl_in",
    "gl_out",
];

/// Canonical GLSL spelling of a `gl_` name written in any case
/// (`gl_position` -> `gl_Position`).
pub fn canonical_builtin_name(name: &str) -> Option<&'static str> {
    if !name.starts_with("gl_") {
        return None;
    }
    BUILTIN_NAMES
        .iter()
        .find(|canonical| canonical.eq_ignore_ascii_case(name))
        .copied()
}

/// Human-readable rendering of a candidate list for diagnostics.
pub fn describe_candidates(candidates: &[&Candidate]) -> String {
    let mut out = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let params: Vec<String> = candidate.params.iter().map(|p| format!("{}", p)).collect();
        out.push_str(&format!("{}({})", candidate.name, params.join(", ")));
    }
    out
}
