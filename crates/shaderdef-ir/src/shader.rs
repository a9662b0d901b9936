//! Shader definition records: stages, layouts and versions.

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::fmt;

use crate::{aggregate::Aggregate, ast::Literal, function::FunctionDef, types::TypeDescriptor};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Vertex,
        Stage::TessControl,
        Stage::TessEval,
        Stage::Geometry,
        Stage::Fragment,
        Stage::Compute,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::TessControl => "tess_control",
            Stage::TessEval => "tess_eval",
            Stage::Geometry => "geometry",
            Stage::Fragment => "fragment",
            Stage::Compute => "compute",
        }
    }

    /// Lowest GLSL version providing this stage.
    pub fn min_version(self) -> u32 {
        match self {
            Stage::Vertex | Stage::Fragment => 110,
            Stage::Geometry => 150,
            Stage::TessControl | Stage::TessEval => 400,
            Stage::Compute => 430,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry shader input primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPrimitive {
    Points,
    Lines,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
}

impl InputPrimitive {
    pub fn name(self) -> &'static str {
        match self {
            InputPrimitive::Points => "points",
            InputPrimitive::Lines => "lines",
            InputPrimitive::LinesAdjacency => "lines_adjacency",
            InputPrimitive::Triangles => "triangles",
            InputPrimitive::TrianglesAdjacency => "triangles_adjacency",
        }
    }

    /// Length of the per-vertex input arrays.
    pub fn vertex_count(self) -> usize {
        match self {
            InputPrimitive::Points => 1,
            InputPrimitive::Lines => 2,
            InputPrimitive::LinesAdjacency => 4,
            InputPrimitive::Triangles => 3,
            InputPrimitive::TrianglesAdjacency => 6,
        }
    }
}

/// Geometry shader output primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPrimitive {
    Points,
    LineStrip,
    TriangleStrip,
}

impl OutputPrimitive {
    pub fn name(self) -> &'static str {
        match self {
            OutputPrimitive::Points => "points",
            OutputPrimitive::LineStrip => "line_strip",
            OutputPrimitive::TriangleStrip => "triangle_strip",
        }
    }
}

/// Tessellation evaluation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TessPrimitive {
    Triangles,
    Quads,
    Isolines,
}

impl TessPrimitive {
    pub fn name(self) -> &'static str {
        match self {
            TessPrimitive::Triangles => "triangles",
            TessPrimitive::Quads => "quads",
            TessPrimitive::Isolines => "isolines",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TessSpacing {
    #[default]
    Equal,
    FractionalEven,
    FractionalOdd,
}

impl TessSpacing {
    pub fn name(self) -> &'static str {
        match self {
            TessSpacing::Equal => "equal_spacing",
            TessSpacing::FractionalEven => "fractional_even_spacing",
            TessSpacing::FractionalOdd => "fractional_odd_spacing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexOrder {
    Cw,
    #[default]
    Ccw,
}

impl VertexOrder {
    pub fn name(self) -> &'static str {
        match self {
            VertexOrder::Cw => "cw",
            VertexOrder::Ccw => "ccw",
        }
    }
}

/// Per-stage layout metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageLayout {
    Geometry {
        input: InputPrimitive,
        output: OutputPrimitive,
        max_vertices: u32,
    },
    TessControl {
        vertices: u32,
    },
    TessEval {
        primitive: TessPrimitive,
        spacing: TessSpacing,
        order: VertexOrder,
        point_mode: bool,
    },
    Compute {
        local_size: [u32; 3],
    },
}

impl StageLayout {
    pub fn geometry(input: InputPrimitive, output: OutputPrimitive, max_vertices: u32) -> Self {
        StageLayout::Geometry {
            input,
            output,
            max_vertices,
        }
    }

    pub fn tess_control(vertices: u32) -> Self {
        StageLayout::TessControl { vertices }
    }

    /// Tessellation evaluation layout with `equal_spacing` and `ccw` order.
    pub fn tess_eval(primitive: TessPrimitive) -> Self {
        StageLayout::TessEval {
            primitive,
            spacing: TessSpacing::default(),
            order: VertexOrder::default(),
            point_mode: false,
        }
    }

    pub fn compute(x: u32, y: u32, z: u32) -> Self {
        StageLayout::Compute {
            local_size: [x, y, z],
        }
    }

    /// Stage this layout belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            StageLayout::Geometry { .. } => Stage::Geometry,
            StageLayout::TessControl { .. } => Stage::TessControl,
            StageLayout::TessEval { .. } => Stage::TessEval,
            StageLayout::Compute { .. } => Stage::Compute,
        }
    }
}

/// `#version` pragma value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlslVersion {
    pub number: u32,
    pub profile: Option<String>,
}

impl GlslVersion {
    pub fn new(number: u32) -> Self {
        GlslVersion {
            number,
            profile: None,
        }
    }

    pub fn core(number: u32) -> Self {
        GlslVersion {
            number,
            profile: Some("core".to_string()),
        }
    }
}

impl Default for GlslVersion {
    fn default() -> Self {
        GlslVersion::core(330)
    }
}

impl fmt::Display for GlslVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.profile {
            Some(profile) => write!(f, "{} {}", self.number, profile),
            None => write!(f, "{}", self.number),
        }
    }
}

/// Definition-level `const` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDef {
    pub name: String,
    pub ty: TypeDescriptor,
    pub value: Literal,
}

impl ConstantDef {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, value: Literal) -> Self {
        ConstantDef {
            name: name.into(),
            ty,
            value,
        }
    }
}

/// One stage of a shader definition.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDef {
    pub stage: Stage,
    pub entry: Arc<FunctionDef>,
    /// Functions callable from the entry; only the ones used are emitted
    pub library: Vec<Arc<FunctionDef>>,
    pub layout: Option<StageLayout>,
}

impl StageDef {
    pub fn new(stage: Stage, entry: Arc<FunctionDef>) -> Self {
        StageDef {
            stage,
            entry,
            library: Vec::new(),
            layout: None,
        }
    }

    pub fn with_library(mut self, function: Arc<FunctionDef>) -> Self {
        self.library.push(function);
        self
    }

    pub fn with_layout(mut self, layout: StageLayout) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// Everything needed to emit one GLSL document per stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderDefinition {
    pub version: GlslVersion,
    pub structs: Vec<Arc<Aggregate>>,
    pub constants: Vec<ConstantDef>,
    pub stages: Vec<StageDef>,
}

impl ShaderDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: GlslVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_struct(mut self, aggregate: Arc<Aggregate>) -> Self {
        self.structs.push(aggregate);
        self
    }

    pub fn with_constant(mut self, constant: ConstantDef) -> Self {
        self.constants.push(constant);
        self
    }

    /// Add a stage, replacing an earlier definition of the same stage.
    pub fn with_stage(mut self, stage: StageDef) -> Self {
        self.stages.retain(|existing| existing.stage != stage.stage);
        self.stages.push(stage);
        self
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageDef> {
        self.stages.iter().find(|def| def.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", GlslVersion::default()), "330 core");
        assert_eq!(format!("{}", GlslVersion::new(450)), "450");
    }

    #[test]
    fn test_tess_eval_defaults() {
        match StageLayout::tess_eval(TessPrimitive::Triangles) {
            StageLayout::TessEval {
                spacing,
                order,
                point_mode,
                ..
            } => {
                assert_eq!(spacing.name(), "equal_spacing");
                assert_eq!(order.name(), "ccw");
                assert!(!point_mode);
            }
            other => panic!("unexpected layout {:?}", other),
        }
    }

    #[test]
    fn test_with_stage_replaces() {
        let first = FunctionDef::builder("a").build();
        let second = FunctionDef::builder("b").build();
        let def = ShaderDefinition::new()
            .with_stage(StageDef::new(Stage::Vertex, first))
            .with_stage(StageDef::new(Stage::Vertex, second));
        assert_eq!(def.stages.len(), 1);
        assert_eq!(def.stage(Stage::Vertex).map(|s| s.entry.name()), Some("b"));
    }

    #[test]
    fn test_primitive_vertex_counts() {
        assert_eq!(InputPrimitive::Triangles.vertex_count(), 3);
        assert_eq!(InputPrimitive::LinesAdjacency.vertex_count(), 4);
        assert_eq!(StageLayout::compute(16, 16, 1).stage(), Stage::Compute);
    }
}
