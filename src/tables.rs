//! Static mapping tables: operators, join keywords and functions.
//!
//! Built once on first use and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// SQL operator token (lower-cased) to KQL operator.
pub static OPERATORS: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("=", "=="),
        ("==", "=="),
        ("!=", "!="),
        ("<>", "!="),
        ("<", "<"),
        ("<=", "<="),
        (">", ">"),
        (">=", ">="),
        ("+", "+"),
        ("-", "-"),
        ("*", "*"),
        ("/", "/"),
        ("%", "%"),
        ("||", "+"),
        ("is", "=="),
        ("is not", "!="),
        // Target of the RLIKE keyword remap, see `literal::remap_keywords`.
        ("regexp", "matches regex"),
    ])
});

/// KQL join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    /// KQL `kind=` value. Plain `left`/`right`/`outer` are not join kinds in
    /// KQL, so the outer joins use their full names.
    pub fn as_kql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "leftouter",
            JoinKind::Right => "rightouter",
            JoinKind::Outer => "fullouter",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_kql())
    }
}

/// Normalized join keyword to join kind. `None` marks a keyword that is
/// recognized but has no KQL equivalent.
pub static JOIN_KEYWORDS: LazyLock<BTreeMap<&'static str, Option<JoinKind>>> =
    LazyLock::new(|| {
        BTreeMap::from([
            ("join", Some(JoinKind::Inner)),
            ("inner join", Some(JoinKind::Inner)),
            ("left join", Some(JoinKind::Left)),
            ("left outer join", Some(JoinKind::Left)),
            ("right join", Some(JoinKind::Right)),
            ("right outer join", Some(JoinKind::Right)),
            ("full join", Some(JoinKind::Outer)),
            ("full outer join", Some(JoinKind::Outer)),
            ("cross join", None),
        ])
    });

/// Marker written in place of a join kind that cannot be expressed.
pub const CROSS_JOIN_MARKER: &str = "CROSS_JOIN_UNSUPPORTED";

/// How a SQL function is rendered in KQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRule {
    /// Same arguments, different name.
    Rename(&'static str),
    /// New name with arguments rearranged per a `{pN}` template.
    Reorder {
        target: &'static str,
        args: &'static str,
    },
    /// Whole call replaced by a `{pN}` template.
    Template(&'static str),
}

impl FunctionRule {
    /// Short human-readable form used by the CLI listing.
    pub fn describe(&self) -> String {
        match self {
            FunctionRule::Rename(target) => format!("{}(...)", target),
            FunctionRule::Reorder { target, args } => format!("{}({})", target, args),
            FunctionRule::Template(template) => template.to_string(),
        }
    }
}

/// Lower-cased SQL/Spark function name to its KQL rendering.
pub static FUNCTIONS: LazyLock<BTreeMap<&'static str, FunctionRule>> = LazyLock::new(|| {
    use FunctionRule::*;
    BTreeMap::from([
        ("abs", Rename("abs")),
        ("approx_count_distinct", Rename("dcount")),
        ("avg", Rename("avg")),
        ("base64", Rename("base64_encode_tostring")),
        ("ceil", Rename("ceiling")),
        ("ceiling", Rename("ceiling")),
        ("coalesce", Rename("coalesce")),
        ("concat", Rename("strcat")),
        ("count", Rename("count")),
        ("dcount", Rename("dcount")),
        ("floor", Rename("floor")),
        ("if", Rename("iif")),
        ("iif", Rename("iif")),
        ("ifnull", Template("iif(isnull({p0}), {p1}, {p0})")),
        ("instr", Rename("indexof")),
        ("int", Rename("toint")),
        ("isnotnull", Rename("isnotnull")),
        ("isnull", Rename("isnull")),
        ("lcase", Rename("tolower")),
        ("left", Template("substring({p0}, 0, {p1})")),
        ("length", Rename("strlen")),
        ("locate", Rename("indexof")),
        ("lower", Rename("tolower")),
        ("ltrim", Rename("trim_start")),
        ("max", Rename("max")),
        ("mean", Rename("avg")),
        ("min", Rename("min")),
        ("now", Rename("now")),
        ("nvl", Template("iif(isnull({p0}), {p1}, {p0})")),
        ("position", Rename("indexof")),
        ("regexp_extract", Reorder {
            target: "extract",
            args: "{p1}, {p0}",
        }),
        ("replace", Rename("replace_string")),
        ("reverse", Rename("reverse")),
        ("round", Rename("round")),
        ("rtrim", Rename("trim_end")),
        ("split", Rename("split")),
        ("sqrt", Rename("sqrt")),
        ("stddev", Rename("stdev")),
        ("stdev", Rename("stdev")),
        ("str", Rename("tostring")),
        ("string", Rename("tostring")),
        ("substr", Rename("substring")),
        ("substring", Rename("substring")),
        ("sum", Rename("sum")),
        ("todatetime", Rename("todatetime")),
        ("translate", Rename("translate")),
        ("trim", Rename("trim")),
        ("ucase", Rename("toupper")),
        ("unbase64", Rename("base64_decode_tostring")),
        ("upper", Rename("toupper")),
        ("variance", Rename("variance")),
    ])
});

/// Function names treated as aggregations when deciding between
/// `summarize` and `extend`.
pub const AGGREGATES: &[&str] = &[
    "avg",
    "approx_count_distinct",
    "count",
    "dcount",
    "max",
    "mean",
    "min",
    "stddev",
    "stdev",
    "sum",
    "variance",
];

pub fn operator(token: &str) -> Option<&'static str> {
    OPERATORS.get(token).copied()
}

pub fn join_kind(keyword: &str) -> Option<Option<JoinKind>> {
    JOIN_KEYWORDS.get(keyword).copied()
}

pub fn function(name: &str) -> Option<FunctionRule> {
    FUNCTIONS.get(name.trim().to_lowercase().as_str()).copied()
}

pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.contains(&name.trim().to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_lookup() {
        assert_eq!(operator("="), Some("=="));
        assert_eq!(operator("<>"), Some("!="));
        assert_eq!(operator("regexp"), Some("matches regex"));
        assert_eq!(operator("<=>"), None);
    }

    #[test]
    fn test_cross_join_is_recognized_but_unmapped() {
        assert_eq!(join_kind("cross join"), Some(None));
        assert_eq!(join_kind("join"), Some(Some(JoinKind::Inner)));
        assert_eq!(join_kind("natural join"), None);
    }

    #[test]
    fn test_function_lookup_is_case_insensitive() {
        assert_eq!(function("UPPER"), Some(FunctionRule::Rename("toupper")));
        assert_eq!(function(" Lower "), Some(FunctionRule::Rename("tolower")));
        assert_eq!(function("frobnicate"), None);
    }

    #[test]
    fn test_aggregates() {
        assert!(is_aggregate("COUNT"));
        assert!(!is_aggregate("upper"));
    }
}
