//! Text emission for lowered shaders.
//!
//! This module provides the indenting writer shared by every `codegen.rs`
//! and the document assembler that orders a stage's sections.

pub mod document;
pub mod writer;

pub use document::GlslDocument;
pub use writer::GlslWriter;
