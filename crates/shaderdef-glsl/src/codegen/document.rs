//! Assembly of a complete GLSL document.

use alloc::{string::String, vec::Vec};

use shaderdef_ir::GlslVersion;

use crate::{
    codegen::writer::GlslWriter,
    decl::codegen::generate_global,
    function::codegen::generate_function,
    ir::{GlobalDecl, GlslFunction},
};

/// Lowered sections of one stage, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct GlslDocument {
    pub version: GlslVersion,
    pub layouts: Vec<GlobalDecl>,
    pub structs: Vec<GlobalDecl>,
    pub constants: Vec<GlobalDecl>,
    pub inputs: Vec<GlobalDecl>,
    pub uniforms: Vec<GlobalDecl>,
    pub shared: Vec<GlobalDecl>,
    pub outputs: Vec<GlobalDecl>,
    /// Library functions, dependencies first
    pub functions: Vec<GlslFunction>,
    pub main: GlslFunction,
}

impl GlslDocument {
    pub fn new(version: GlslVersion, main: GlslFunction) -> Self {
        GlslDocument {
            version,
            layouts: Vec::new(),
            structs: Vec::new(),
            constants: Vec::new(),
            inputs: Vec::new(),
            uniforms: Vec::new(),
            shared: Vec::new(),
            outputs: Vec::new(),
            functions: Vec::new(),
            main,
        }
    }

    /// Render the document. Every non-empty section is followed by a blank line.
    pub fn render(&self) -> String {
        let mut w = GlslWriter::new();
        w.line(&alloc::format!("#version {}", self.version));
        w.blank();
        for section in [
            &self.layouts,
            &self.structs,
            &self.constants,
            &self.inputs,
            &self.uniforms,
            &self.shared,
            &self.outputs,
        ] {
            if section.is_empty() {
                continue;
            }
            for decl in section {
                generate_global(&mut w, decl);
            }
            w.blank();
        }
        for function in &self.functions {
            generate_function(&mut w, function);
            w.blank();
        }
        generate_function(&mut w, &self.main);
        w.finish()
    }
}
