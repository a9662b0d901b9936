//! Expression handling: resolution and code generation.

pub mod call;
pub mod codegen;
pub mod ops;
pub mod typecheck;

pub use codegen::*;
pub use typecheck::*;
