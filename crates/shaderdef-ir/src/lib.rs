//! Shader definition intermediate representation.
//!
//! This crate defines the already-structured tree that a front end hands to
//! the GLSL transpiler:
//! - Type descriptors (scalars, vectors, matrices, arrays, opaque handles)
//! - Aggregates (structs and interface blocks) built through a builder
//! - Expressions and statements of shader function bodies
//! - Function definitions and signatures
//! - Stage layouts and the shader definition record

#![no_std]

extern crate alloc;

mod aggregate;
mod ast;
mod display;
mod function;
mod shader;
mod sourceloc;
mod types;

pub use aggregate::{
    snake_case, Aggregate, AggregateBuilder, AggregateError, AggregateRole, Field, Interpolation,
};
pub use ast::{BinaryOp, Comprehension, Expr, Keyword, Literal, Stmt, StmtKind, UnaryOp};
pub use function::{FunctionBuilder, FunctionDef, FunctionSignature, Param, ParamQualifier, ReturnType};
pub use shader::{
    ConstantDef, GlslVersion, InputPrimitive, OutputPrimitive, ShaderDefinition, Stage, StageDef,
    StageLayout, TessPrimitive, TessSpacing, VertexOrder,
};
pub use sourceloc::SourceLoc;
pub use types::{ScalarKind, TypeDescriptor};
