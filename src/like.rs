//! LIKE pattern classification.
//!
//! KQL has no LIKE; the wildcard layout of the pattern decides which string
//! operator stands in for it.

use regex::Regex;
use std::sync::LazyLock;

use crate::literal::quote;

static TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^%_]+[%_]$").expect("valid LIKE regex"));
static LEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[%_][^%_]+$").expect("valid LIKE regex"));
static SURROUNDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[%_][^%_]+[%_]$").expect("valid LIKE regex"));

/// KQL operator chosen for a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOperator {
    StartsWith,
    EndsWith,
    Contains,
    MatchesRegex,
}

impl LikeOperator {
    pub fn as_kql(&self, negated: bool) -> &'static str {
        match (self, negated) {
            (LikeOperator::StartsWith, false) => "startswith",
            (LikeOperator::StartsWith, true) => "!startswith",
            (LikeOperator::EndsWith, false) => "endswith",
            (LikeOperator::EndsWith, true) => "!endswith",
            (LikeOperator::Contains, false) => "contains",
            (LikeOperator::Contains, true) => "!contains",
            (LikeOperator::MatchesRegex, _) => "matches regex",
        }
    }
}

/// Pick the operator for `pattern` and return the pattern rewritten for it:
/// wildcards stripped for the string operators, translated for regex.
pub fn classify(pattern: &str) -> (LikeOperator, String) {
    let op = if TRAILING.is_match(pattern) {
        LikeOperator::StartsWith
    } else if LEADING.is_match(pattern) {
        LikeOperator::EndsWith
    } else if SURROUNDING.is_match(pattern) {
        LikeOperator::Contains
    } else {
        return (
            LikeOperator::MatchesRegex,
            pattern.replace('_', ".").replace('%', ".*"),
        );
    };
    (op, pattern.replace(['%', '_'], ""))
}

/// Render `<left> <op> '<pattern>'`. Negated regex matches have no KQL
/// operator and are wrapped in `not (...)`.
pub fn render(left: &str, pattern: &str, negated: bool) -> String {
    let (op, rewritten) = classify(pattern);
    let rendered = format!("{} {} {}", left, op.as_kql(negated), quote(&rewritten));
    if negated && op == LikeOperator::MatchesRegex {
        format!("not ({})", rendered)
    } else {
        rendered
    }
}
