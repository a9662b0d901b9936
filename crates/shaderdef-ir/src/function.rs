//! Function definitions: entry points and library functions.

use alloc::{string::String, sync::Arc, vec::Vec};

use crate::{
    aggregate::{Aggregate, AggregateRole},
    ast::Stmt,
    types::TypeDescriptor,
};

/// How a parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamQualifier {
    /// Plain value parameter, or a non-uniform interface block
    #[default]
    None,
    /// Uniform block parameter
    Uniform,
    /// Per-vertex array input (geometry and tessellation stages)
    Sequence,
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: TypeDescriptor,
    pub qualifier: ParamQualifier,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Param {
            name: name.into(),
            ty,
            qualifier: ParamQualifier::None,
        }
    }

    /// Parameter bound to an interface aggregate.
    ///
    /// Uniform blocks get the `Uniform` qualifier automatically.
    pub fn interface(name: impl Into<String>, aggregate: &Arc<Aggregate>) -> Self {
        let qualifier = if aggregate.role() == AggregateRole::UniformBlock {
            ParamQualifier::Uniform
        } else {
            ParamQualifier::None
        };
        Param {
            name: name.into(),
            ty: TypeDescriptor::aggregate(aggregate),
            qualifier,
        }
    }

    /// Per-vertex array input, e.g. `gl_in` or `vs_out[]`.
    pub fn sequence(name: impl Into<String>, aggregate: &Arc<Aggregate>) -> Self {
        Param {
            name: name.into(),
            ty: TypeDescriptor::aggregate(aggregate),
            qualifier: ParamQualifier::Sequence,
        }
    }
}

/// Declared result of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ReturnType {
    #[default]
    Void,
    Value(TypeDescriptor),
    /// Geometry emission: each `yield` emits one vertex
    Generator(TypeDescriptor),
}

impl ReturnType {
    /// The produced type, for value and generator returns.
    pub fn produced(&self) -> Option<&TypeDescriptor> {
        match self {
            ReturnType::Void => None,
            ReturnType::Value(ty) | ReturnType::Generator(ty) => Some(ty),
        }
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, ReturnType::Generator(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ReturnType,
}

/// A function with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub signature: FunctionSignature,
    pub body: Vec<Stmt>,
}

impl FunctionDef {
    pub fn builder(name: impl Into<String>) -> FunctionBuilder {
        FunctionBuilder {
            signature: FunctionSignature {
                name: name.into(),
                params: Vec::new(),
                returns: ReturnType::Void,
            },
            body: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }
}

/// Builder for [`FunctionDef`].
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    signature: FunctionSignature,
    body: Vec<Stmt>,
}

impl FunctionBuilder {
    pub fn param(mut self, param: Param) -> Self {
        self.signature.params.push(param);
        self
    }

    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.signature.returns = ReturnType::Value(ty);
        self
    }

    /// Mark the function as a vertex generator producing `ty`.
    pub fn generates(mut self, ty: TypeDescriptor) -> Self {
        self.signature.returns = ReturnType::Generator(ty);
        self
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.body.push(stmt);
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body.extend(body);
        self
    }

    pub fn build(self) -> Arc<FunctionDef> {
        Arc::new(FunctionDef {
            signature: self.signature,
            body: self.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};

    #[test]
    fn test_uniform_interface_param() {
        let params = Aggregate::builder("Params", AggregateRole::UniformBlock)
            .field("projection", TypeDescriptor::mat4())
            .build()
            .unwrap();
        let attrs = Aggregate::builder("Attrs", AggregateRole::AttributeBlock)
            .field("pos", TypeDescriptor::vec3())
            .build()
            .unwrap();
        assert_eq!(
            Param::interface("params", &params).qualifier,
            ParamQualifier::Uniform
        );
        assert_eq!(
            Param::interface("attr", &attrs).qualifier,
            ParamQualifier::None
        );
        assert_eq!(
            Param::sequence("gl_in", &Aggregate::gl_per_vertex()).qualifier,
            ParamQualifier::Sequence
        );
    }

    #[test]
    fn test_builder() {
        let func = FunctionDef::builder("helper")
            .param(Param::new("x", TypeDescriptor::float()))
            .returns(TypeDescriptor::float())
            .stmt(Stmt::ret(Some(Expr::name("x"))))
            .build();
        assert_eq!(func.name(), "helper");
        assert_eq!(func.signature.params.len(), 1);
        assert_eq!(func.signature.returns.produced(), Some(&TypeDescriptor::float()));
        assert!(!func.signature.returns.is_generator());
    }
}
