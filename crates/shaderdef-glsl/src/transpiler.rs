//! Whole-definition compilation.

use alloc::{collections::BTreeMap, string::String};

use shaderdef_ir::{ShaderDefinition, Stage};

use crate::{
    builtins::BuiltinTable,
    error::{bail, GlslError, GlslResult},
    stage::emit_stage,
    types::TypeRegistry,
};

/// Compiles shader definitions to GLSL.
///
/// The type registry and built-in table are built once and only read
/// afterwards, so one transpiler can compile any number of definitions.
#[derive(Debug)]
pub struct Transpiler {
    registry: TypeRegistry,
    builtins: BuiltinTable,
}

impl Transpiler {
    pub fn new() -> Self {
        Transpiler {
            registry: TypeRegistry::new(),
            builtins: BuiltinTable::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Compile every declared stage.
    ///
    /// Stages are independent: a failing stage does not prevent the others
    /// from being emitted.
    pub fn compile(&self, definition: &ShaderDefinition) -> CompiledShader {
        let mut outputs = BTreeMap::new();
        for stage_def in &definition.stages {
            let result = emit_stage(&self.registry, &self.builtins, definition, stage_def);
            if let Err(err) = &result {
                log::debug!("{} stage failed: {}", stage_def.stage, err);
            }
            outputs.insert(stage_def.stage, result);
        }
        CompiledShader { outputs }
    }

    /// Compile one stage.
    pub fn compile_stage(&self, definition: &ShaderDefinition, stage: Stage) -> GlslResult<String> {
        match definition.stage(stage) {
            Some(stage_def) => emit_stage(&self.registry, &self.builtins, definition, stage_def),
            None => bail!(InvalidInterface, "definition has no {} stage", stage),
        }
    }
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::new()
    }
}

/// GLSL source, or the error, of each declared stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledShader {
    outputs: BTreeMap<Stage, GlslResult<String>>,
}

impl CompiledShader {
    /// Source of a stage that compiled.
    pub fn get(&self, stage: Stage) -> Option<&str> {
        match self.outputs.get(&stage) {
            Some(Ok(source)) => Some(source),
            _ => None,
        }
    }

    /// Error of a stage that failed.
    pub fn error(&self, stage: Stage) -> Option<&GlslError> {
        match self.outputs.get(&stage) {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// Declared stages in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.outputs.keys().copied()
    }

    pub fn is_ok(&self) -> bool {
        self.outputs.values().all(Result::is_ok)
    }

    /// All stage sources, or the first error in pipeline order.
    pub fn into_result(self) -> GlslResult<BTreeMap<Stage, String>> {
        self.outputs
            .into_iter()
            .map(|(stage, result)| result.map(|source| (stage, source)))
            .collect()
    }
}
