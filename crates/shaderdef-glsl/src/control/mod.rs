//! Control flow handling: lowering and code generation.

pub mod codegen;
pub mod typecheck;

pub use codegen::*;
pub use typecheck::*;
