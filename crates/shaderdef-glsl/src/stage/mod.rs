//! Per-stage emission.
//!
//! Every stage runs the same pipeline: validate the layout, bind the entry
//! point parameters to interface declarations, lower the entry body to
//! `main` (pulling in library functions as they are called), then assemble
//! the document. The stages differ only in what their [`StageEmitter`]
//! accepts and declares.

mod compute;
mod fragment;
mod geometry;
mod tessellation;
mod vertex;

use alloc::{string::String, sync::Arc, vec::Vec};

use shaderdef_ir::{
    Aggregate, AggregateRole, FunctionDef, GlslVersion, Param, ReturnType, ShaderDefinition,
    Stage, StageDef, StageLayout, TypeDescriptor,
};

use crate::{
    builtins::{canonical_builtin_name, BuiltinTable},
    codegen::GlslDocument,
    decl::{constant_decl, interface_block, struct_decl, uniform_decls},
    error::{bail, glsl_err, GlslError, GlslResult},
    function::{lower_library_function, FunctionLowerer, FunctionRole, OutputStyle, OutputTarget},
    ir::{GlobalDecl, GlslFunction},
    symbols::{Storage, Variable},
    types::{GlslTypeName, TypeRegistry},
};

pub use compute::ComputeEmitter;
pub use fragment::FragmentEmitter;
pub use geometry::GeometryEmitter;
pub use tessellation::{TessControlEmitter, TessEvalEmitter};
pub use vertex::VertexEmitter;

/// Declarations and bindings produced from an entry point's signature.
#[derive(Debug, Default)]
pub struct StagePlan {
    pub layouts: Vec<GlobalDecl>,
    pub inputs: Vec<GlobalDecl>,
    pub uniforms: Vec<GlobalDecl>,
    pub outputs: Vec<GlobalDecl>,
    /// Entry parameters as seen by the body
    pub bindings: Vec<Variable>,
    pub output: Option<OutputTarget>,
    /// Next free input `location`
    pub next_location: u32,
}

impl StagePlan {
    fn bind(&mut self, param: &Param, storage: Storage) {
        self.bindings.push(Variable {
            name: param.name.clone(),
            ty: param.ty.clone(),
            storage,
        });
    }

    /// Bind a uniform block parameter and declare its fields.
    pub fn bind_uniforms(
        &mut self,
        state: &mut StageState<'_>,
        param: &Param,
        aggregate: &Arc<Aggregate>,
    ) -> GlslResult<()> {
        self.uniforms.extend(uniform_decls(state, aggregate)?);
        self.bind(
            param,
            Storage::Interface {
                role: AggregateRole::UniformBlock,
                sequence: false,
                len: None,
            },
        );
        Ok(())
    }

    /// Bind a non-arrayed interface parameter.
    pub fn bind_interface(&mut self, param: &Param, role: AggregateRole) {
        self.bind(
            param,
            Storage::Interface {
                role,
                sequence: false,
                len: None,
            },
        );
    }

    /// Bind a per-vertex sequence parameter.
    pub fn bind_sequence(&mut self, param: &Param, role: AggregateRole, len: Option<usize>) {
        self.bind(
            param,
            Storage::Interface {
                role,
                sequence: true,
                len,
            },
        );
    }

    /// Declare an `in` block for a shader interface parameter and bind it.
    ///
    /// Per-vertex inputs are arrayed and bound as sequences of length `len`.
    pub fn input_block(
        &mut self,
        state: &mut StageState<'_>,
        param: &Param,
        aggregate: &Arc<Aggregate>,
        per_vertex: Option<Option<usize>>,
    ) -> GlslResult<()> {
        let arrayed = per_vertex.is_some();
        self.inputs.extend(interface_block(
            state,
            "in",
            aggregate,
            param.name.clone(),
            arrayed,
        )?);
        match per_vertex {
            Some(len) => self.bind_sequence(param, AggregateRole::ShaderInterface, len),
            None => self.bind_interface(param, AggregateRole::ShaderInterface),
        }
        Ok(())
    }

    /// Declare the `out` block of the entry's output aggregate.
    ///
    /// Tessellation control outputs are arrayed and written per invocation.
    pub fn output_block(
        &mut self,
        state: &mut StageState<'_>,
        aggregate: &Arc<Aggregate>,
        per_invocation: bool,
    ) -> GlslResult<()> {
        let instance = aggregate.instance_name();
        self.outputs.extend(interface_block(
            state,
            "out",
            aggregate,
            instance.clone(),
            per_invocation,
        )?);
        let style = if per_invocation {
            OutputStyle::PerInvocation { instance }
        } else {
            OutputStyle::Block { instance }
        };
        self.output = Some(OutputTarget {
            aggregate: Arc::clone(aggregate),
            style,
        });
        Ok(())
    }
}

/// Aggregate of `ty` if it has the given role.
pub fn aggregate_with_role(ty: &TypeDescriptor, role: AggregateRole) -> Option<&Arc<Aggregate>> {
    ty.as_aggregate().filter(|a| a.role() == role)
}

/// Check a `gl_in` parameter and leave it to the implicit binding.
pub fn check_gl_in(param: &Param, stage: Stage) -> GlslResult<()> {
    if canonical_builtin_name(&param.name) != Some("gl_in") {
        bail!(
            InvalidInterface,
            "{} built-in per-vertex input must be named 'gl_in', found '{}'",
            stage,
            param.name
        );
    }
    Ok(())
}

/// Error for a stage that needs a layout but was given none.
pub fn missing_layout(stage: Stage, what: &str) -> GlslError {
    glsl_err!(InvalidLayout, "the {} stage requires a layout with {}", stage, what)
}

/// Stage-specific rules for an entry point's signature.
pub trait StageEmitter {
    fn stage(&self) -> Stage;

    /// `layout(...) in|out;` lines for the stage layout.
    fn layout_lines(&self, layout: Option<&StageLayout>) -> GlslResult<Vec<String>>;

    /// Declare and bind one entry parameter.
    fn bind_param(
        &self,
        state: &mut StageState<'_>,
        param: &Param,
        plan: &mut StagePlan,
    ) -> GlslResult<()>;

    /// Declare the entry point's output and decide how it is written.
    fn bind_output(
        &self,
        state: &mut StageState<'_>,
        returns: &ReturnType,
        plan: &mut StagePlan,
    ) -> GlslResult<()>;
}

/// Emitter for a stage.
pub fn emitter_for(stage: Stage) -> &'static dyn StageEmitter {
    match stage {
        Stage::Vertex => &VertexEmitter,
        Stage::TessControl => &TessControlEmitter,
        Stage::TessEval => &TessEvalEmitter,
        Stage::Geometry => &GeometryEmitter,
        Stage::Fragment => &FragmentEmitter,
        Stage::Compute => &ComputeEmitter,
    }
}

/// Mutable state shared by every function lowered for one stage.
pub struct StageState<'a> {
    pub registry: &'a TypeRegistry,
    pub builtins: &'a BuiltinTable,
    pub definition: &'a ShaderDefinition,
    pub stage_def: &'a StageDef,
    /// User structs in first-use order
    structs: Vec<Arc<Aggregate>>,
    shared: Vec<(String, TypeDescriptor, GlslTypeName)>,
    /// Library functions in emission order
    functions: Vec<GlslFunction>,
    lowered: Vec<Arc<FunctionDef>>,
    in_progress: Vec<Arc<FunctionDef>>,
}

impl<'a> StageState<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        builtins: &'a BuiltinTable,
        definition: &'a ShaderDefinition,
        stage_def: &'a StageDef,
    ) -> Self {
        StageState {
            registry,
            builtins,
            definition,
            stage_def,
            structs: Vec::new(),
            shared: Vec::new(),
            functions: Vec::new(),
            lowered: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    /// Version number of the emitted document.
    pub fn version(&self) -> u32 {
        self.definition
            .version
            .number
            .max(self.stage_def.stage.min_version())
    }

    pub fn stage(&self) -> Stage {
        self.stage_def.stage
    }

    /// GLSL spelling of a type, recording the user structs it mentions.
    pub fn resolve_type(&mut self, ty: &TypeDescriptor) -> GlslResult<GlslTypeName> {
        let name = self.registry.resolve(ty)?;
        self.record_structs(ty);
        Ok(name)
    }

    fn record_structs(&mut self, ty: &TypeDescriptor) {
        match ty {
            TypeDescriptor::Array { element, .. } => self.record_structs(element),
            TypeDescriptor::Aggregate(aggregate) => {
                if aggregate.role() != AggregateRole::Struct
                    || self.structs.iter().any(|s| Arc::ptr_eq(s, aggregate))
                {
                    return;
                }
                // Member structs must be declared first
                for field in aggregate.fields() {
                    self.record_structs(&field.ty);
                }
                self.structs.push(Arc::clone(aggregate));
            }
            _ => {}
        }
    }

    /// User struct from the definition's constructor namespace.
    pub fn lookup_struct(&self, name: &str) -> Option<Arc<Aggregate>> {
        self.definition
            .structs
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    pub fn declare_shared(&mut self, name: &str, ty: &TypeDescriptor) -> GlslResult<()> {
        if self.shared.iter().any(|(existing, _, _)| existing == name) {
            bail!(TypeMismatch, "shared variable '{}' declared twice", name);
        }
        let glsl = self.resolve_type(ty)?;
        log::debug!("declared shared variable '{}' of type {}", name, ty);
        self.shared.push((String::from(name), ty.clone(), glsl));
        Ok(())
    }

    /// Shared variables declared so far.
    pub fn shared_bindings(&self) -> Vec<(String, TypeDescriptor)> {
        self.shared
            .iter()
            .map(|(name, ty, _)| (name.clone(), ty.clone()))
            .collect()
    }

    /// Lower a library function the first time it is called.
    ///
    /// Callees finish before their callers, so emission order puts every
    /// function after its dependencies.
    pub fn use_function(&mut self, def: &Arc<FunctionDef>) -> GlslResult<()> {
        if self.lowered.iter().any(|f| Arc::ptr_eq(f, def)) {
            return Ok(());
        }
        if self.in_progress.iter().any(|f| Arc::ptr_eq(f, def)) {
            bail!(
                UnsupportedConstruct,
                "recursive call to '{}'; GLSL has no recursion",
                def.name()
            );
        }
        self.in_progress.push(Arc::clone(def));
        let result = lower_library_function(self, def);
        self.in_progress.pop();
        let function = result?;
        log::debug!("pulled in library function '{}'", def.name());
        self.functions.push(function);
        self.lowered.push(Arc::clone(def));
        Ok(())
    }
}

/// Version actually emitted for a stage.
///
/// Requests below the stage's minimum are raised; the profile is kept.
pub fn effective_version(requested: &GlslVersion, stage: Stage) -> GlslVersion {
    let minimum = stage.min_version();
    if requested.number >= minimum {
        return requested.clone();
    }
    log::debug!(
        "raising GLSL version from {} to {} for the {} stage",
        requested.number,
        minimum,
        stage
    );
    GlslVersion {
        number: minimum,
        profile: requested.profile.clone(),
    }
}

/// Compile one stage of a definition to GLSL source.
pub fn emit_stage(
    registry: &TypeRegistry,
    builtins: &BuiltinTable,
    definition: &ShaderDefinition,
    stage_def: &StageDef,
) -> GlslResult<String> {
    let stage = stage_def.stage;
    let entry = &stage_def.entry;
    log::debug!("lowering {} stage from entry '{}'", stage, entry.name());
    emit_stage_inner(registry, builtins, definition, stage_def)
        .map_err(|e| e.with_function(entry.name()).with_stage(stage))
}

fn emit_stage_inner(
    registry: &TypeRegistry,
    builtins: &BuiltinTable,
    definition: &ShaderDefinition,
    stage_def: &StageDef,
) -> GlslResult<String> {
    let stage = stage_def.stage;
    let emitter = emitter_for(stage);
    let entry = &stage_def.entry;

    if let Some(layout) = &stage_def.layout {
        if layout.stage() != stage {
            bail!(
                InvalidLayout,
                "{} layout given for the {} stage",
                layout.stage(),
                stage
            );
        }
    }

    let mut state = StageState::new(registry, builtins, definition, stage_def);
    let mut plan = StagePlan::default();
    plan.layouts = emitter
        .layout_lines(stage_def.layout.as_ref())?
        .into_iter()
        .map(GlobalDecl::Layout)
        .collect();
    for param in &entry.signature.params {
        emitter.bind_param(&mut state, param, &mut plan)?;
    }
    emitter.bind_output(&mut state, &entry.signature.returns, &mut plan)?;

    let mut constants = Vec::new();
    for constant in &definition.constants {
        constants.push(constant_decl(&mut state, constant)?);
    }

    let role = FunctionRole::Entry {
        returns: entry.signature.returns.clone(),
        output: plan.output.clone(),
    };
    let mut lowerer = FunctionLowerer::new(&mut state, role)?;
    for binding in &plan.bindings {
        lowerer.bind_parameter(binding)?;
    }
    let body = lowerer.lower_body(&entry.body)?;

    let mut structs = Vec::new();
    for aggregate in &state.structs {
        structs.push(struct_decl(registry, aggregate)?);
    }
    let shared = state
        .shared
        .iter()
        .map(|(name, _, ty)| GlobalDecl::Shared {
            ty: ty.clone(),
            name: name.clone(),
        })
        .collect();

    let main = GlslFunction {
        name: String::from("main"),
        return_type: String::from("void"),
        params: Vec::new(),
        body,
    };
    let mut document = GlslDocument::new(effective_version(&definition.version, stage), main);
    document.layouts = plan.layouts;
    document.structs = structs;
    document.constants = constants;
    document.inputs = plan.inputs;
    document.uniforms = plan.uniforms;
    document.shared = shared;
    document.outputs = plan.outputs;
    document.functions = core::mem::take(&mut state.functions);
    Ok(document.render())
}

/// Aggregate behind an entry parameter, or an interface error naming it.
pub fn param_aggregate<'p>(param: &'p Param, stage: Stage) -> GlslResult<&'p Arc<Aggregate>> {
    match param.ty.as_aggregate() {
        Some(aggregate) => Ok(aggregate),
        None => bail!(
            InvalidInterface,
            "{} entry parameter '{}' has type {}, which is not an interface aggregate",
            stage,
            param.name,
            param.ty
        ),
    }
}

/// Error for a parameter whose role the stage does not accept.
pub fn unexpected_param(param: &Param, stage: Stage, expected: &str) -> GlslError {
    glsl_err!(
        InvalidInterface,
        "{} entry parameter '{}' must be {}, found {}",
        stage,
        param.name,
        expected,
        param.ty
    )
}

/// Error for a return type the stage does not accept.
pub fn unexpected_return(returns: &ReturnType, stage: Stage, expected: &str) -> GlslError {
    glsl_err!(
        InvalidInterface,
        "{} entry point must return {}, found {}",
        stage,
        expected,
        returns
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_matches_stage() {
        for stage in Stage::ALL {
            assert_eq!(emitter_for(stage).stage(), stage);
        }
    }

    #[test]
    fn test_version_raised_to_stage_minimum() {
        let requested = GlslVersion::core(330);
        assert_eq!(effective_version(&requested, Stage::Vertex), requested);
        assert_eq!(effective_version(&requested, Stage::Compute), GlslVersion::core(430));
        assert_eq!(
            effective_version(&GlslVersion::new(110), Stage::Geometry),
            GlslVersion::new(150)
        );
    }

    #[test]
    fn test_gl_in_parameter_name() {
        let per_vertex = Aggregate::gl_per_vertex();
        assert!(check_gl_in(&Param::sequence("gl_IN", &per_vertex), Stage::Geometry).is_ok());
        let err = check_gl_in(&Param::sequence("verts", &per_vertex), Stage::Geometry).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::InvalidInterface(_)));
    }
}
