//! GLSL transpiler for typed shader definitions.
//!
//! This crate lowers a [`ShaderDefinition`] (entry points, library
//! functions, interface aggregates and stage layouts) to one GLSL source
//! string per declared stage. Lowering resolves every expression to a single
//! type, binds names through a scoped symbol table, and emits text from a
//! typed IR.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod builtins;
mod codegen;
mod control;
mod decl;
mod error;
mod expr;
mod function;
mod ir;
mod stage;
mod stmt;
mod symbols;
mod transpiler;
mod types;
mod util;

use alloc::string::String;

pub use builtins::{builtin_variables, canonical_builtin_name, BuiltinTable, BuiltinVariable, Candidate};
pub use error::{ErrorContext, ErrorKind, GlslError, GlslResult};
pub use shaderdef_ir::{ShaderDefinition, Stage};
pub use stage::effective_version;
pub use symbols::{Storage, SymbolTable, Variable};
pub use transpiler::{CompiledShader, Transpiler};
pub use types::{GlslTypeName, OpaqueInfo, OpaqueKind, TypeRegistry};

/// Compile every stage of a definition with a fresh [`Transpiler`].
pub fn compile(definition: &ShaderDefinition) -> CompiledShader {
    Transpiler::new().compile(definition)
}

/// Compile one stage of a definition with a fresh [`Transpiler`].
pub fn compile_stage(definition: &ShaderDefinition, stage: Stage) -> GlslResult<String> {
    Transpiler::new().compile_stage(definition, stage)
}
