//! Code generation for GLSL functions.

use alloc::{format, string::String, vec::Vec};

use crate::{codegen::GlslWriter, ir::GlslFunction, stmt::codegen::generate_block};

/// Emit a function definition.
pub fn generate_function(w: &mut GlslWriter, function: &GlslFunction) {
    let params: Vec<String> = function
        .params
        .iter()
        .map(|(ty, name)| ty.declare(name))
        .collect();
    w.line(&format!(
        "{} {}({}) {{",
        function.return_type,
        function.name,
        params.join(", ")
    ));
    w.indent();
    generate_block(w, &function.body);
    w.dedent();
    w.line("}");
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use shaderdef_ir::{Literal, TypeDescriptor};

    use super::*;
    use crate::{
        ir::{GlslStmt, TypedExpr},
        types::TypeRegistry,
    };

    #[test]
    fn test_function_header() {
        let registry = TypeRegistry::new();
        let float = registry.resolve(&TypeDescriptor::float()).unwrap();
        let x = TypedExpr::var("x", TypeDescriptor::float());
        let function = GlslFunction {
            name: "helper".to_string(),
            return_type: "float".to_string(),
            params: vec![(float, "x".to_string())],
            body: vec![GlslStmt::Return(Some(TypedExpr::binary(
                "*",
                x,
                TypedExpr::literal(Literal::Float(2.0)),
                TypeDescriptor::float(),
            )))],
        };
        let mut w = GlslWriter::new();
        generate_function(&mut w, &function);
        assert_eq!(
            w.finish(),
            "float helper(float x) {\n    return (x * 2.0);\n}\n"
        );
    }
}
