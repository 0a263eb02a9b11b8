//! Error types for the quince core crate.

use thiserror::Error;

/// Result type used throughout quince.
pub type Result<T> = std::result::Result<T, QuinceError>;

/// Errors produced by the term model, substitution engine, and strategies.
#[derive(Debug, Error)]
pub enum QuinceError {
    /// A substitution bound a value whose sort disagrees with the bound
    /// variable's declared sort. Never coerced; always propagated.
    #[error("sort mismatch for `{context}`: expected {expected}, found {found}")]
    SortMismatch {
        /// Sort declared on the bound variable.
        expected: String,
        /// Sort of the offending replacement term.
        found: String,
        /// The variable name the binding targeted.
        context: String,
    },

    /// A term was required to be a quantifier and is not, or carries a
    /// binder shape the engine cannot process. Fatal for that formula only;
    /// engine state is left intact.
    #[error("unsupported quantifier: {0}")]
    UnsupportedQuantifier(String),

    /// The engine factory was asked for a strategy kind outside the
    /// supported set. Raised before any engine state is constructed.
    #[error("unknown engine kind: '{0}'")]
    UnknownEngine(String),

    /// Malformed instantiation string.
    #[error("parse error: {0}")]
    Parse(String),

    /// Broken internal invariant: dangling term ids, evaluation of
    /// non-ground terms, empty binding sets.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuinceError {
    /// Shorthand for an [`QuinceError::Internal`] with a formatted message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuinceError::SortMismatch {
            expected: "Int".to_string(),
            found: "Bool".to_string(),
            context: "x".to_string(),
        };
        let rendered = format!("{err}");
        assert!(rendered.contains("Int"));
        assert!(rendered.contains("Bool"));
        assert!(rendered.contains("x"));
    }

    #[test]
    fn test_unknown_engine_display() {
        let err = QuinceError::UnknownEngine("bogus".to_string());
        assert_eq!(format!("{err}"), "unknown engine kind: 'bogus'");
    }
}
