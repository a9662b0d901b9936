//! Symbol table for shader lowering.
//!
//! This module tracks variable bindings in nested scopes and the library
//! function overload sets of the stage being lowered.

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};

use shaderdef_ir::{AggregateRole, FunctionDef, Literal, TypeDescriptor};

use crate::error::{bail, GlslResult};

/// How a name is bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// Function-local variable
    Local,
    Parameter,
    /// Induction variable of a lowered `for`
    LoopIndex,
    /// Compile-time constant; references fold to the value
    Constant(Literal),
    /// Definition-level `const`, referenced by name but foldable
    GlobalConstant(Literal),
    /// Compute `shared` variable
    Shared,
    Builtin { writable: bool },
    /// Entry-point interface parameter
    Interface {
        role: AggregateRole,
        /// Per-vertex array input
        sequence: bool,
        /// Statically known length of a sequence input
        len: Option<usize>,
    },
}

impl Storage {
    /// Value of a binding that folds at compile time.
    pub fn constant_value(&self) -> Option<Literal> {
        match self {
            Storage::Constant(value) | Storage::GlobalConstant(value) => Some(*value),
            _ => None,
        }
    }
}

/// Variable information in a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Variable type
    pub ty: TypeDescriptor,
    pub storage: Storage,
}

impl Variable {
    /// Check if assignments to this variable are allowed.
    pub fn is_assignable(&self) -> bool {
        match &self.storage {
            Storage::Local | Storage::Parameter | Storage::Shared => true,
            Storage::Builtin { writable } => *writable,
            _ => false,
        }
    }
}

/// Scope for variable declarations.
#[derive(Debug, Clone, Default)]
struct Scope {
    variables: BTreeMap<String, Variable>,
}

/// Symbol table for tracking library functions and variables.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Library function overload sets indexed by name
    functions: BTreeMap<String, Vec<Arc<FunctionDef>>>,
    /// Stack of scopes for variable lookup
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// Create a symbol table with one (global) scope.
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
            scopes: alloc::vec![Scope::default()],
        }
    }

    /// Register a library function.
    ///
    /// The same definition may be registered more than once; two different
    /// definitions with identical parameter types are rejected.
    pub fn register_function(&mut self, def: &Arc<FunctionDef>) -> GlslResult<()> {
        let overloads = self.functions.entry(def.name().to_string()).or_default();
        if overloads.iter().any(|f| Arc::ptr_eq(f, def)) {
            return Ok(());
        }
        let params: Vec<&TypeDescriptor> = def.signature.params.iter().map(|p| &p.ty).collect();
        for existing in overloads.iter() {
            let existing_params: Vec<&TypeDescriptor> =
                existing.signature.params.iter().map(|p| &p.ty).collect();
            if existing_params == params {
                bail!(
                    InvalidInterface,
                    "function '{}' is defined twice with the same parameter types",
                    def.name()
                );
            }
        }
        overloads.push(Arc::clone(def));
        Ok(())
    }

    /// Look up the overload set of a library function.
    pub fn lookup_functions(&self, name: &str) -> &[Arc<FunctionDef>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Push a new scope onto the scope stack.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the topmost scope from the scope stack.
    ///
    /// The global scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a variable in the current scope.
    ///
    /// Redeclaring a name in the same scope is an error; shadowing a name
    /// from an outer scope is allowed.
    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        storage: Storage,
    ) -> GlslResult<()> {
        self.declare_in(self.scopes.len() - 1, name, ty, storage)
    }

    /// Declare a variable in the outermost scope.
    pub fn declare_global(
        &mut self,
        name: &str,
        ty: TypeDescriptor,
        storage: Storage,
    ) -> GlslResult<()> {
        self.declare_in(0, name, ty, storage)
    }

    fn declare_in(
        &mut self,
        index: usize,
        name: &str,
        ty: TypeDescriptor,
        storage: Storage,
    ) -> GlslResult<()> {
        let scope = &mut self.scopes[index];
        if scope.variables.contains_key(name) {
            bail!(
                TypeMismatch,
                "variable '{}' already declared in this scope",
                name
            );
        }
        scope.variables.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                ty,
                storage,
            },
        );
        Ok(())
    }

    /// Look up a variable, innermost scope first.
    pub fn lookup_variable(&self, name: &str) -> Option<&Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.get(name))
    }
}
