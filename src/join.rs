//! Join translation.
//!
//! KQL joins name their sides `$left` and `$right` instead of by table, so
//! every qualified column in the join condition is rewritten before rendering.

use std::collections::BTreeSet;

use crate::ast::{ColumnRef, Expr, Join, JoinConstraint, TableSource};
use crate::diagnostics::DiagnosticKind;
use crate::error::{KqlError, KqlResult};
use crate::tables::{self, CROSS_JOIN_MARKER};
use crate::transpiler::Session;

/// Rewrite qualifiers in a join condition. Columns qualified with one of
/// `right_names` become `$right.<col>`; any other qualifier becomes
/// `$left.<col>`. Returns the rewritten condition and the distinct left
/// qualifiers seen (lower-cased).
pub fn rewrite_table_refs(condition: &Expr, right_names: &[&str]) -> (Expr, BTreeSet<String>) {
    let mut left_tables = BTreeSet::new();
    let rewritten = condition.map_columns(&mut |col: &ColumnRef| {
        let side = match &col.table {
            None => return col.clone(),
            Some(table) if right_names.iter().any(|r| r.eq_ignore_ascii_case(table)) => "$right",
            Some(table) => {
                left_tables.insert(table.to_lowercase());
                "$left"
            }
        };
        ColumnRef {
            table: Some(side.to_string()),
            name: col.name.clone(),
        }
    });
    (rewritten, left_tables)
}

fn right_names(source: &TableSource, fallback: Option<&str>) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(alias) = source.alias() {
        names.push(alias.to_string());
    }
    match source {
        TableSource::Table { name, .. } => names.push(name.clone()),
        TableSource::Subquery { .. } => names.extend(fallback.map(str::to_string)),
    }
    names
}

impl Session<'_> {
    pub(crate) fn join(&mut self, join: &Join) -> KqlResult<String> {
        let keyword = join.keyword.trim().to_lowercase();
        let kind = match tables::join_kind(&keyword) {
            Some(Some(kind)) => kind.as_kql(),
            Some(None) => {
                self.warn(
                    DiagnosticKind::UnsupportedCrossJoin,
                    format!("'{}' has no KQL join kind", keyword),
                );
                CROSS_JOIN_MARKER
            }
            None => return Err(KqlError::UnknownJoinKeyword(join.keyword.clone())),
        };

        let right = self.source(&join.source)?;
        let fallback = right
            .stages()
            .first()
            .and_then(|stage| stage.split_whitespace().next())
            .map(str::to_string);
        let names = right_names(&join.source, fallback.as_deref());
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let condition = match &join.constraint {
            JoinConstraint::On(expr) => {
                let (rewritten, left_tables) = rewrite_table_refs(expr, &names);
                if left_tables.len() > 1 {
                    let listed: Vec<&str> = left_tables.iter().map(String::as_str).collect();
                    self.warn(
                        DiagnosticKind::JoinBeyondTwoTables,
                        format!(
                            "join condition references several left tables ({}); all mapped to $left",
                            listed.join(", ")
                        ),
                    );
                }
                Some(self.expr(&rewritten)?)
            }
            JoinConstraint::Using(columns) => Some(columns.join(", ")),
            JoinConstraint::None => None,
        };

        tracing::debug!(kind, right = ?names.first(), "join");
        let mut stage = format!("join kind={} ({})", kind, right.render_nested());
        if let Some(condition) = condition {
            stage.push_str(" on ");
            stage.push_str(&condition);
        }
        Ok(stage)
    }
}
