//! Function lowering.
//!
//! [`LowerContext`] is the seam between the expression and statement
//! lowerers and the stage being compiled. [`FunctionLowerer`] implements it
//! for one function body; library functions are lowered on first use.

use alloc::{string::String, sync::Arc, vec::Vec};

use shaderdef_ir::{
    Aggregate, AggregateRole, FunctionDef, ParamQualifier, ReturnType, Stage, StageLayout, Stmt, TypeDescriptor,
};

use crate::{
    builtins::{builtin_variables, BuiltinTable},
    error::{bail, GlslResult},
    ir::{GlslFunction, GlslStmt},
    stage::StageState,
    stmt::type_check_statement,
    symbols::{Storage, SymbolTable, Variable},
    types::{GlslTypeName, TypeRegistry},
};

/// Where the fields of an entry point's output aggregate are written.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputStyle {
    /// `instance.field = value;`
    Block { instance: String },
    /// `instance[gl_InvocationID].field = value;`
    PerInvocation { instance: String },
    /// `field = value;` for fragment outputs
    Bare,
}

/// Output aggregate of an entry point and how it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTarget {
    pub aggregate: Arc<Aggregate>,
    pub style: OutputStyle,
}

/// What kind of function is being lowered.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionRole {
    /// Stage entry point, lowered to `main`
    Entry {
        returns: ReturnType,
        output: Option<OutputTarget>,
    },
    Library { returns: ReturnType },
}

impl FunctionRole {
    pub fn returns(&self) -> &ReturnType {
        match self {
            FunctionRole::Entry { returns, .. } | FunctionRole::Library { returns } => returns,
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, FunctionRole::Entry { .. })
    }

    pub fn output(&self) -> Option<&OutputTarget> {
        match self {
            FunctionRole::Entry { output, .. } => output.as_ref(),
            FunctionRole::Library { .. } => None,
        }
    }
}

/// Context available while lowering a function body.
pub trait LowerContext {
    fn stage(&self) -> Stage;

    /// GLSL version number the stage is emitted at.
    fn version(&self) -> u32;

    fn registry(&self) -> &TypeRegistry;

    fn builtins(&self) -> &BuiltinTable;

    fn symbols(&self) -> &SymbolTable;

    fn symbols_mut(&mut self) -> &mut SymbolTable;

    fn role(&self) -> &FunctionRole;

    /// GLSL spelling of a type; user structs it mentions are recorded for
    /// declaration.
    fn resolve_type(&mut self, ty: &TypeDescriptor) -> GlslResult<GlslTypeName>;

    /// User struct by name.
    fn lookup_struct(&self, name: &str) -> Option<Arc<Aggregate>>;

    /// Make sure a library function is emitted ahead of its callers.
    fn use_function(&mut self, def: &Arc<FunctionDef>) -> GlslResult<()>;

    /// Record a compute `shared` variable and bind its name globally.
    fn declare_shared(&mut self, name: &str, ty: &TypeDescriptor) -> GlslResult<()>;

    fn enter_loop(&mut self);

    fn exit_loop(&mut self);

    fn in_loop(&self) -> bool;
}

/// Lowers one function body against a stage.
pub struct FunctionLowerer<'s, 'a> {
    state: &'s mut StageState<'a>,
    symbols: SymbolTable,
    role: FunctionRole,
    loop_depth: usize,
}

impl<'s, 'a> FunctionLowerer<'s, 'a> {
    /// Create a lowerer whose global scope holds the stage's built-in
    /// variables, the definition constants and the library overload sets.
    pub fn new(state: &'s mut StageState<'a>, role: FunctionRole) -> GlslResult<Self> {
        let mut symbols = SymbolTable::new();
        for var in builtin_variables(state.stage()) {
            symbols.declare_global(var.name, var.ty, Storage::Builtin { writable: var.writable })?;
        }
        for constant in &state.definition.constants {
            symbols.declare_global(
                &constant.name,
                constant.ty.clone(),
                Storage::GlobalConstant(constant.value),
            )?;
        }
        for function in &state.stage_def.library {
            symbols.register_function(function)?;
        }
        for (name, ty) in state.shared_bindings() {
            symbols.declare_global(&name, ty, Storage::Shared)?;
        }
        if let Some(len) = per_vertex_input_len(state.stage(), state.stage_def.layout.as_ref()) {
            symbols.declare_global(
                "gl_in",
                TypeDescriptor::aggregate(&Aggregate::gl_per_vertex()),
                Storage::Interface {
                    role: AggregateRole::BuiltinPerVertex,
                    sequence: true,
                    len,
                },
            )?;
        }
        symbols.push_scope();
        Ok(FunctionLowerer {
            state,
            symbols,
            role,
            loop_depth: 0,
        })
    }

    /// Bind an entry parameter in the function scope.
    pub fn bind_parameter(&mut self, binding: &Variable) -> GlslResult<()> {
        self.symbols
            .declare_variable(&binding.name, binding.ty.clone(), binding.storage.clone())
    }

    /// Lower a function body.
    ///
    /// Only the last top-level statement counts as final, which lets a
    /// trailing entry-point `return` drop its `return;`.
    pub fn lower_body(&mut self, body: &[Stmt]) -> GlslResult<Vec<GlslStmt>> {
        let mut out = Vec::new();
        for (i, stmt) in body.iter().enumerate() {
            type_check_statement(self, stmt, &mut out, i + 1 == body.len())?;
        }
        Ok(out)
    }
}

/// Length of `gl_in` for stages that read per-vertex inputs; the inner
/// `None` means the length is only known at run time.
fn per_vertex_input_len(stage: Stage, layout: Option<&StageLayout>) -> Option<Option<usize>> {
    match (stage, layout) {
        (Stage::Geometry, Some(StageLayout::Geometry { input, .. })) => Some(Some(input.vertex_count())),
        (Stage::Geometry, _) => Some(None),
        (Stage::TessControl | Stage::TessEval, _) => Some(None),
        _ => None,
    }
}

impl LowerContext for FunctionLowerer<'_, '_> {
    fn stage(&self) -> Stage {
        self.state.stage()
    }

    fn version(&self) -> u32 {
        self.state.version()
    }

    fn registry(&self) -> &TypeRegistry {
        self.state.registry
    }

    fn builtins(&self) -> &BuiltinTable {
        self.state.builtins
    }

    fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    fn role(&self) -> &FunctionRole {
        &self.role
    }

    fn resolve_type(&mut self, ty: &TypeDescriptor) -> GlslResult<GlslTypeName> {
        self.state.resolve_type(ty)
    }

    fn lookup_struct(&self, name: &str) -> Option<Arc<Aggregate>> {
        self.state.lookup_struct(name)
    }

    fn use_function(&mut self, def: &Arc<FunctionDef>) -> GlslResult<()> {
        self.state.use_function(def)
    }

    fn declare_shared(&mut self, name: &str, ty: &TypeDescriptor) -> GlslResult<()> {
        self.symbols.declare_global(name, ty.clone(), Storage::Shared)?;
        self.state.declare_shared(name, ty)
    }

    fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    fn exit_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }
}

/// Lower a library function to a GLSL function definition.
pub fn lower_library_function(
    state: &mut StageState<'_>,
    def: &Arc<FunctionDef>,
) -> GlslResult<GlslFunction> {
    lower_library_inner(state, def).map_err(|e| e.with_function(def.name()))
}

fn lower_library_inner(
    state: &mut StageState<'_>,
    def: &Arc<FunctionDef>,
) -> GlslResult<GlslFunction> {
    let returns = def.signature.returns.clone();
    let return_type = match &returns {
        ReturnType::Void => String::from("void"),
        ReturnType::Value(ty) => {
            if ty.as_aggregate().is_some_and(|a| a.role().is_interface()) {
                bail!(
                    InvalidReturn,
                    "library function '{}' cannot return interface type {}",
                    def.name(),
                    ty
                );
            }
            alloc::format!("{}", state.resolve_type(ty)?)
        }
        ReturnType::Generator(_) => bail!(
            InvalidReturn,
            "library function '{}' cannot yield",
            def.name()
        ),
    };

    let mut params = Vec::new();
    for param in &def.signature.params {
        if param.qualifier != ParamQualifier::None
            || param.ty.as_aggregate().is_some_and(|a| a.role().is_interface())
        {
            bail!(
                InvalidInterface,
                "parameter '{}' of library function '{}' has interface type {}",
                param.name,
                def.name(),
                param.ty
            );
        }
        params.push((state.resolve_type(&param.ty)?, param.name.clone()));
    }

    let mut lowerer = FunctionLowerer::new(state, FunctionRole::Library { returns })?;
    for param in &def.signature.params {
        lowerer
            .symbols_mut()
            .declare_variable(&param.name, param.ty.clone(), Storage::Parameter)?;
    }
    let body = lowerer.lower_body(&def.body)?;
    log::trace!("lowered library function '{}'", def.signature);

    Ok(GlslFunction {
        name: def.name().into(),
        return_type,
        params,
        body,
    })
}
