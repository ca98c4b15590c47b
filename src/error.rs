//! Error types for sql2kql.
//!
//! These are the hard failures that abort a translation. Recoverable issues
//! (unmapped functions, cross joins, ...) are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s next to the output instead.

use thiserror::Error;

/// The main error type for sql2kql operations.
#[derive(Debug, Error)]
pub enum KqlError {
    /// Failed to parse the SQL text.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Operator token with no entry in the operator table.
    #[error("Unsupported operator: '{0}'")]
    UnknownOperator(String),

    /// LIKE with a right operand that is not a string literal.
    #[error("Right side operand {pattern} isn't usable in LIKE expression: {left} LIKE {pattern}")]
    NonLiteralLikePattern { left: String, pattern: String },

    /// Function template referencing a missing argument or with stray braces.
    #[error("Could not map function or args {function}: template '{template}' with {arity} argument(s)")]
    MalformedTemplate {
        function: String,
        template: String,
        arity: usize,
    },

    /// Join keyword with no entry in the join-keyword table.
    #[error("Unknown join keyword: '{0}'")]
    UnknownJoinKeyword(String),

    /// Query or expression nesting deeper than the configured limit.
    #[error("Nesting depth exceeds the limit of {limit}")]
    NestingTooDeep { limit: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KqlError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a malformed template error.
    pub fn template(function: &str, template: &str, arity: usize) -> Self {
        Self::MalformedTemplate {
            function: function.to_string(),
            template: template.to_string(),
            arity,
        }
    }
}

/// Result type alias for sql2kql operations.
pub type KqlResult<T> = Result<T, KqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KqlError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_operator_error_names_operator() {
        let err = KqlError::UnknownOperator("<=>".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: '<=>'");
    }

    #[test]
    fn test_template_error_display() {
        let err = KqlError::template("ifnull", "iif(isnull({p0}), {p1}, {p0})", 1);
        assert!(err.to_string().contains("ifnull"));
        assert!(err.to_string().contains("1 argument(s)"));
    }
}
