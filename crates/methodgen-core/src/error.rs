//! Error types for method generation.
//!
//! ## Error Hierarchy
//!
//! ```text
//! GenError            - authoring-time usage errors, abort the current body
//! └── RegistrationError - the type catalog / container builder refused a request
//! ```
//!
//! Every error is fail-fast: nothing reaches the container builder until a
//! body is flushed, so a failed generation leaves no partial state behind.

use thiserror::Error;

use crate::TypeHash;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised by the type catalog or the container builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A type with the same name is already registered.
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    /// A member with the same identity is already declared on the owner.
    #[error("'{name}' is already declared on '{owner}'")]
    DuplicateMember { owner: String, name: String },

    /// The referenced type does not exist.
    #[error("unknown type {0}")]
    UnknownType(TypeHash),

    /// The referenced method does not exist.
    #[error("unknown method {0}")]
    UnknownMethod(TypeHash),

    /// The referenced field does not exist.
    #[error("unknown field {0}")]
    UnknownField(TypeHash),

    /// The shell was already finalized and cannot take more declarations.
    #[error("type '{name}' is already finished")]
    ShellFinished { name: String },

    /// A method body was installed twice.
    #[error("method '{name}' already has a body")]
    BodyAlreadyInstalled { name: String },
}

// ============================================================================
// Generation Errors
// ============================================================================

/// Authoring-time errors raised while describing a method body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    /// Assignment, return, or member application with an incompatible type.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// No operator table entry matches the operand types.
    #[error("operator '{op}' is not defined for ({operands})")]
    OperatorTypeMismatch { op: String, operands: String },

    /// Name resolution found no usable member.
    #[error("no member '{name}' on '{owner}' matches ({arguments})")]
    MemberNotFound {
        owner: String,
        name: String,
        arguments: String,
    },

    /// Name resolution found more than one equally good candidate.
    #[error("call to '{owner}.{name}' is ambiguous between {candidates}")]
    AmbiguousOverload {
        owner: String,
        name: String,
        candidates: String,
    },

    /// An intermediate symbol was consumed a second time.
    #[error("intermediate {what} of type '{ty}' was already consumed")]
    SymbolAlreadyConsumed { what: &'static str, ty: String },

    /// A block was closed out of order, twice, or continued illegally.
    #[error("block discipline violation: {message}")]
    BlockDisciplineViolation { message: String },

    /// A lambda was converted to a delegate before it was ended.
    #[error("lambda is still open")]
    LambdaStillOpen,

    /// An argument index outside the current parameter list.
    #[error("argument {index} is out of range ({count} parameters)")]
    UnknownArgument { index: usize, count: usize },

    /// A storage symbol was used after the body that owns it was closed.
    #[error("symbol is out of scope: {message}")]
    OutOfScope { message: String },

    /// An instance member or `this` was used without a receiver.
    #[error("'{name}' requires an instance")]
    StaticContext { name: String },

    /// A delegate was requested for a type that is not a delegate.
    #[error("'{ty}' is not a delegate type")]
    NotADelegate { ty: String },

    /// A yield was issued outside of an iterator body.
    #[error("yield is only valid in an iterator body")]
    NotAnIterator,

    /// A referenced type is not known to the catalog.
    #[error("unknown type {0}")]
    UnknownType(TypeHash),

    /// A body outgrew a 16-bit operand space.
    #[error("body has more than {limit} {what}")]
    BodyTooLarge { what: &'static str, limit: usize },

    /// A branch target was never marked before the body was finished.
    #[error("label {0} was never marked")]
    UnresolvedLabel(u32),

    /// The container builder rejected a declaration.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl GenError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        GenError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn discipline(message: impl Into<String>) -> Self {
        GenError::BlockDisciplineViolation {
            message: message.into(),
        }
    }
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_error_converts() {
        let err: GenError = RegistrationError::DuplicateType {
            name: "Point".into(),
        }
        .into();
        assert!(matches!(err, GenError::Registration(_)));
        assert_eq!(err.to_string(), "type 'Point' is already registered");
    }

    #[test]
    fn error_display() {
        let err = GenError::MemberNotFound {
            owner: "Math".into(),
            name: "max".into(),
            arguments: "string".into(),
        };
        assert_eq!(err.to_string(), "no member 'max' on 'Math' matches (string)");
        assert_eq!(GenError::LambdaStillOpen.to_string(), "lambda is still open");
    }

    #[test]
    fn helper_constructors() {
        assert!(matches!(
            GenError::discipline("x"),
            GenError::BlockDisciplineViolation { .. }
        ));
        assert!(matches!(GenError::type_mismatch("x"), GenError::TypeMismatch { .. }));
    }
}
