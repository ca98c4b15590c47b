//! # sql2kql: SQL to KQL translation
//!
//! Translates a restricted SQL dialect (SELECT / FROM / JOIN / WHERE /
//! GROUP BY / ORDER BY / LIMIT / UNION) into Kusto Query Language pipelines.
//!
//! ## Quick Example
//!
//! ```
//! let kql = sql2kql::sql_to_kql("SELECT a FROM t WHERE a = 'x'").unwrap();
//! assert_eq!(kql, "t\n| where a == 'x'\n| project a");
//! ```
//!
//! ## Pipeline
//!
//! | Step | Module | Does |
//! |------|--------|------|
//! | 1 | [`literal`] | `"` → `'`, table substitution, `RLIKE` → `REGEXP` |
//! | 2 | [`parser`] | SQL text → [`ast::Query`] |
//! | 3 | [`transpiler`] | [`ast::Query`] → [`pipeline::Pipeline`] + diagnostics |
//!
//! Problems that still leave usable output (unmapped functions, cross joins)
//! are returned as [`diagnostics::Diagnostic`]s; everything else is a
//! [`error::KqlError`].

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod functions;
pub mod join;
pub mod like;
pub mod literal;
pub mod parser;
pub mod pipeline;
pub mod tables;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::Config;
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
    pub use crate::error::*;
    pub use crate::parser::parse;
    pub use crate::pipeline::Pipeline;
    pub use crate::transpiler::{AliasStyle, ToKql, TranslateOptions, Translation, Translator};
    pub use crate::{normalize, sql_to_kql, translate_sql};
}

use error::KqlResult;
use transpiler::{TranslateOptions, Translation, Translator};

/// Apply the text-level rewrites that run before parsing.
pub fn normalize(sql: &str, options: &TranslateOptions) -> KqlResult<String> {
    let sql = literal::single_quote_strings(sql);
    let sql = literal::substitute_tables(&sql, &options.tables);
    let sql = literal::remap_keywords(&sql);
    literal::check_nesting(&sql, options.max_depth)?;
    tracing::debug!(sql = %sql, "normalized input");
    Ok(sql)
}

/// Normalize, parse and translate a SQL query.
pub fn translate_sql(sql: &str, options: &TranslateOptions) -> KqlResult<Translation> {
    let sql = normalize(sql, options)?;
    let query = parser::parse(&sql)?;
    Translator::new(options.clone()).translate(&query)
}

/// Translate a SQL query with default options, returning the KQL text.
///
/// # Example
///
/// ```
/// let kql = sql2kql::sql_to_kql("SELECT count(*) FROM t GROUP BY c").unwrap();
/// assert_eq!(kql, "t\n| summarize count() by c");
/// ```
pub fn sql_to_kql(sql: &str) -> KqlResult<String> {
    translate_sql(sql, &TranslateOptions::default()).map(|t| t.text())
}
