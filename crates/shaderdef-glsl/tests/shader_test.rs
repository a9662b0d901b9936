//! ShaderTest helper for integration tests.
//!
//! Compiles one stage of a definition and checks the emitted GLSL by exact
//! text, by filecheck directives, or by running it through the `glsl`
//! crate's parser.

#![allow(dead_code)]

use std::sync::Arc;

use filecheck::{CheckerBuilder, NO_VARIABLES};
use glsl::{parser::Parse, syntax::TranslationUnit};
use shaderdef_glsl::{ErrorKind, GlslError, Transpiler};
use shaderdef_ir::{
    Aggregate, AggregateRole, Interpolation, ShaderDefinition, Stage, StageDef, TypeDescriptor,
};

/// Emitted source of one stage.
pub struct ShaderTest {
    stage: Stage,
    source: String,
}

impl ShaderTest {
    /// Compile `stage` of `definition`.
    ///
    /// # Errors
    ///
    /// Returns the transpiler error if the stage does not compile.
    pub fn new(definition: &ShaderDefinition, stage: Stage) -> Result<Self, GlslError> {
        let source = Transpiler::new().compile_stage(definition, stage)?;
        Ok(Self { stage, source })
    }

    /// Compile a definition holding only `stage_def`.
    pub fn single(stage_def: StageDef) -> Result<Self, GlslError> {
        let stage = stage_def.stage;
        Self::new(&ShaderDefinition::new().with_stage(stage_def), stage)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Assert the emitted source equals `expected`, ignoring indentation
    /// and blank lines.
    ///
    /// # Panics
    ///
    /// Panics with both texts if they differ.
    pub fn assert_glsl(&self, expected: &str) {
        let actual = normalize(&self.source);
        let expected = normalize(expected);
        if actual != expected {
            panic!(
                "GLSL mismatch for {} stage:\n\nExpected:\n{}\n\nActual:\n{}\n",
                self.stage,
                expected.join("\n"),
                actual.join("\n")
            );
        }
    }

    /// Assert some line of the source equals `line` after trimming.
    pub fn assert_line(&self, line: &str) {
        assert!(
            normalize(&self.source).iter().any(|l| l == line.trim()),
            "line `{}` not found in:\n{}",
            line.trim(),
            self.source
        );
    }

    /// Assert no line of the source contains `fragment`.
    pub fn assert_absent(&self, fragment: &str) {
        assert!(
            !self.source.contains(fragment),
            "`{}` unexpectedly found in:\n{}",
            fragment,
            self.source
        );
    }

    /// Number of lines equal to `line` after trimming.
    pub fn count_lines(&self, line: &str) -> usize {
        normalize(&self.source)
            .iter()
            .filter(|l| *l == line.trim())
            .count()
    }

    /// Match the source against filecheck directives.
    ///
    /// # Panics
    ///
    /// Panics with filecheck's explanation if matching fails.
    pub fn assert_filecheck(&self, directives: &str) {
        let mut builder = CheckerBuilder::new();
        for line in directives.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            builder
                .directive(trimmed)
                .unwrap_or_else(|e| panic!("bad filecheck directive '{}': {}", trimmed, e));
        }
        let checker = builder.finish();
        let matched = checker
            .check(&self.source, NO_VARIABLES)
            .unwrap_or_else(|e| panic!("filecheck error: {}", e));
        if !matched {
            let (_, explain) = checker
                .explain(&self.source, NO_VARIABLES)
                .unwrap_or_else(|e| panic!("filecheck explain failed: {}", e));
            panic!("filecheck failed:\n{}\n\nSource:\n{}", explain, self.source);
        }
    }

    /// Assert the source is syntactically valid GLSL.
    pub fn assert_parses(&self) {
        let result = TranslationUnit::parse(self.source.as_str());
        assert!(
            result.is_ok(),
            "GLSL parsing failed: {:?}\n\nSource:\n{}",
            result.err(),
            self.source
        );
    }
}

/// Trimmed, non-empty lines.
fn normalize(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Compile `stage` and return the error it must fail with.
///
/// # Panics
///
/// Panics if the stage compiles.
pub fn compile_error(definition: &ShaderDefinition, stage: Stage) -> GlslError {
    match Transpiler::new().compile_stage(definition, stage) {
        Ok(source) => panic!("expected the {} stage to fail, got:\n{}", stage, source),
        Err(err) => err,
    }
}

/// Compile a definition holding only `stage_def` and return its error.
pub fn stage_error(stage_def: StageDef) -> GlslError {
    let stage = stage_def.stage;
    compile_error(&ShaderDefinition::new().with_stage(stage_def), stage)
}

/// Assert an error has the expected kind.
pub fn assert_kind(err: &GlslError, expected: fn(&ErrorKind) -> bool, what: &str) {
    assert!(expected(&err.kind), "expected {} error, got: {}", what, err);
}

/// `VsOut { gl_Position: vec4, color: vec4, normal: vec3 }`
pub fn vs_out() -> Arc<Aggregate> {
    Aggregate::builder("VsOut", AggregateRole::ShaderInterface)
        .field("gl_Position", TypeDescriptor::vec4())
        .field("color", TypeDescriptor::vec4())
        .field("normal", TypeDescriptor::vec3())
        .build()
        .unwrap()
}

/// `VsOut` with a flat-interpolated instance id.
pub fn vs_out_flat() -> Arc<Aggregate> {
    Aggregate::builder("VsOut", AggregateRole::ShaderInterface)
        .field("gl_Position", TypeDescriptor::vec4())
        .field("color", TypeDescriptor::vec4())
        .interpolated("instance", TypeDescriptor::int(), Interpolation::Flat)
        .build()
        .unwrap()
}

/// `VertexIn { vert_loc: vec3, vert_nor: vec3, vert_col: vec4 }`
pub fn vertex_in() -> Arc<Aggregate> {
    Aggregate::builder("VertexIn", AggregateRole::AttributeBlock)
        .field("vert_loc", TypeDescriptor::vec3())
        .field("vert_nor", TypeDescriptor::vec3())
        .field("vert_col", TypeDescriptor::vec4())
        .build()
        .unwrap()
}

/// Uniform block with two matrices.
pub fn globals() -> Arc<Aggregate> {
    Aggregate::builder("Globals", AggregateRole::UniformBlock)
        .field("model_view", TypeDescriptor::mat4())
        .field("projection", TypeDescriptor::mat4())
        .build()
        .unwrap()
}

/// `FsOut { frag_color: vec4 }`
pub fn fs_out() -> Arc<Aggregate> {
    Aggregate::builder("FsOut", AggregateRole::FragmentOutput)
        .field("frag_color", TypeDescriptor::vec4())
        .build()
        .unwrap()
}
