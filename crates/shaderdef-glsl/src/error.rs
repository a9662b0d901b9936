//! Error types for GLSL transpilation.

use alloc::string::String;
use core::fmt;

use shaderdef_ir::{SourceLoc, Stage};
use thiserror::Error;

/// Result type for transpilation operations.
pub type GlslResult<T> = Result<T, GlslError>;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Type descriptor with no GLSL spelling
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Invalid swizzle: {0}")]
    Swizzle(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    /// Constant index outside the declared bounds, or a non-integer index
    #[error("Index error: {0}")]
    Index(String),
    #[error("Ambiguous call: {0}")]
    AmbiguousCall(String),
    /// A bound that must fold at compile time did not
    #[error("Non-constant bound: {0}")]
    NonConstantBound(String),
    #[error("Invalid return: {0}")]
    InvalidReturn(String),
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
    /// Entry point parameters or return type do not fit the stage
    #[error("Invalid interface: {0}")]
    InvalidInterface(String),
}

/// Where an error happened.
///
/// Filled from the inside out: the failing construct records the node, the
/// statement lowerer adds the location, and the stage emitter adds the
/// function and stage. Fields already set are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    pub stage: Option<Stage>,
    pub function: Option<String>,
    /// Offending node, rendered in host syntax
    pub node: Option<String>,
    pub loc: SourceLoc,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stage) = self.stage {
            write!(f, "\n  in {} stage", stage)?;
        }
        if let Some(function) = &self.function {
            write!(f, "\n  in function '{}'", function)?;
        }
        if !self.loc.is_default() {
            write!(f, "\n  at {}", self.loc)?;
        }
        if let Some(node) = &self.node {
            write!(f, "\n  in `{}`", node)?;
        }
        Ok(())
    }
}

/// Error that can occur during transpilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{context}")]
pub struct GlslError {
    pub kind: ErrorKind,
    pub context: ErrorContext,
}

impl GlslError {
    pub fn new(kind: ErrorKind) -> Self {
        GlslError {
            kind,
            context: ErrorContext::default(),
        }
    }

    pub fn unknown_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownType(msg.into()))
    }

    pub fn swizzle(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Swizzle(msg.into()))
    }

    pub fn unknown_field(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownField(msg.into()))
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch(msg.into()))
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedConstruct(msg.into()))
    }

    pub fn unknown_identifier(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownIdentifier(msg.into()))
    }

    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLayout(msg.into()))
    }

    pub fn invalid_interface(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInterface(msg.into()))
    }

    /// Record the offending node unless a more specific one is already set.
    pub fn with_node(mut self, node: &impl fmt::Display) -> Self {
        if self.context.node.is_none() {
            self.context.node = Some(alloc::format!("{}", node));
        }
        self
    }

    pub fn with_loc(mut self, loc: SourceLoc) -> Self {
        if self.context.loc.is_default() {
            self.context.loc = loc;
        }
        self
    }

    pub fn with_function(mut self, function: &str) -> Self {
        if self.context.function.is_none() {
            self.context.function = Some(String::from(function));
        }
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        if self.context.stage.is_none() {
            self.context.stage = Some(stage);
        }
        self
    }
}

/// Build a [`GlslError`] of the given kind from a format string.
macro_rules! glsl_err {
    ($kind:ident, $($arg:tt)*) => {
        $crate::error::GlslError::new($crate::error::ErrorKind::$kind(alloc::format!($($arg)*)))
    };
}

/// Return early with a [`GlslError`] of the given kind.
macro_rules! bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err($crate::error::glsl_err!($kind, $($arg)*))
    };
}

pub(crate) use bail;
pub(crate) use glsl_err;

#[cfg(test)]
mod tests {
    use alloc::{format, string::ToString};

    use super::*;

    fn failing() -> GlslResult<()> {
        bail!(Index, "index {} out of range for {}", 4, "vec3")
    }

    #[test]
    fn test_bail_builds_kind() {
        let err = failing().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Index("index 4 out of range for vec3".to_string())
        );
    }

    #[test]
    fn test_context_is_set_once() {
        let err = GlslError::unknown_identifier("foo")
            .with_node(&"foo")
            .with_node(&"outer(foo)")
            .with_loc(SourceLoc::line(3))
            .with_loc(SourceLoc::line(9))
            .with_function("main")
            .with_stage(Stage::Vertex);
        assert_eq!(err.context.node.as_deref(), Some("foo"));
        assert_eq!(err.context.loc, SourceLoc::line(3));
        let text = format!("{}", err);
        assert!(text.starts_with("Unknown identifier: foo"));
        assert!(text.contains("in vertex stage"));
        assert!(text.contains("in function 'main'"));
        assert!(text.contains("at line 3"));
    }
}
