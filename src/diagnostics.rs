//! Soft diagnostics: issues that leave usable best-effort output behind.

use serde::Serialize;
use std::fmt;

/// What kind of recoverable problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Function name missing from the function table; passed through as written.
    UnmappedFunction,
    /// `CROSS JOIN` or a comma join; emitted with an unsupported marker.
    UnsupportedCrossJoin,
    /// Join condition references more than one table besides the right side.
    JoinBeyondTwoTables,
    /// Expression shape with no translation; a placeholder was emitted.
    UnresolvedExpression,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnmappedFunction => "unmapped function",
            DiagnosticKind::UnsupportedCrossJoin => "unsupported cross join",
            DiagnosticKind::JoinBeyondTwoTables => "join beyond two tables",
            DiagnosticKind::UnresolvedExpression => "unresolved expression",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(DiagnosticKind::UnmappedFunction, "frobnicate");
        assert_eq!(diag.to_string(), "unmapped function: frobnicate");
    }

    #[test]
    fn test_diagnostic_serializes_kind_in_snake_case() {
        let diag = Diagnostic::new(DiagnosticKind::UnsupportedCrossJoin, "t2");
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(json, r#"{"kind":"unsupported_cross_join","message":"t2"}"#);
    }
}
