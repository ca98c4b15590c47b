//! KQL transpiler for the SQL AST.
//!
//! Walks a parsed [`Query`] clause by clause and emits pipe stages in a fixed
//! order: source and joins, `where`, then either `summarize` or
//! `extend`/`project`, `order by`, `distinct`, `limit`, and finally `union`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{KqlError, KqlResult};
use crate::pipeline::Pipeline;
use crate::tables;

/// Default bound on query and expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Naming strategy for computed select items that have no alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasStyle {
    /// The column for `f(col)`, `<function>_<n>` for other calls, `expr_<n>` otherwise.
    #[default]
    Derived,
    /// Always `expr_<n>`.
    Positional,
}

impl AliasStyle {
    /// Name for the select item at 1-based `position`.
    pub fn name(&self, expr: &Expr, position: usize) -> String {
        match (self, expr) {
            (AliasStyle::Derived, Expr::Function(call)) => match call.args.as_slice() {
                [Expr::Column(col)] => col.name.clone(),
                _ => format!("{}_{}", call.name.trim().to_lowercase(), position),
            },
            _ => format!("expr_{}", position),
        }
    }

    /// Like [`name`](Self::name), but never one of the `taken` names. A clash
    /// falls back to `<function>_<n>` or `expr_<n>`, then to numbered suffixes.
    pub fn unique_name(&self, expr: &Expr, position: usize, taken: &BTreeSet<String>) -> String {
        let name = self.name(expr, position);
        if !taken.contains(&name) {
            return name;
        }
        let base = match expr {
            Expr::Function(call) => format!("{}_{}", call.name.trim().to_lowercase(), position),
            _ => format!("expr_{}", position),
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}

/// Translation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Source table name to replacement, applied to the SQL text before parsing.
    pub tables: BTreeMap<String, String>,
    pub alias_style: AliasStyle,
    pub max_depth: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
            alias_style: AliasStyle::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of a translation: the pipeline plus every soft diagnostic raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub pipeline: Pipeline,
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    /// Final KQL text.
    pub fn text(&self) -> String {
        self.pipeline.render()
    }

    pub fn stages(&self) -> Vec<&str> {
        self.pipeline.stages()
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}

/// Translates parsed queries. Holds only configuration, so one translator can
/// be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    options: TranslateOptions,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    pub fn translate(&self, query: &Query) -> KqlResult<Translation> {
        let mut session = Session::new(&self.options);
        let pipeline = session.query(query)?;
        tracing::debug!(
            stages = pipeline.stages().len(),
            diagnostics = session.diagnostics.len(),
            "translated query"
        );
        Ok(Translation {
            pipeline,
            diagnostics: session.diagnostics,
        })
    }
}

/// Trait for converting query nodes to KQL.
pub trait ToKql {
    /// Convert this node to KQL text with default options.
    fn to_kql(&self) -> KqlResult<String>;
}

impl ToKql for Query {
    fn to_kql(&self) -> KqlResult<String> {
        Translator::default().translate(self).map(|t| t.text())
    }
}

/// Per-call state: nesting depth and collected diagnostics.
pub(crate) struct Session<'a> {
    pub(crate) options: &'a TranslateOptions,
    depth: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(options: &'a TranslateOptions) -> Self {
        Self {
            options,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Run `f` one nesting level deeper, failing past the configured limit.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> KqlResult<T>,
    ) -> KqlResult<T> {
        if self.depth >= self.options.max_depth {
            return Err(KqlError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, message);
        tracing::warn!(kind = %diagnostic.kind, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn query(&mut self, query: &Query) -> KqlResult<Pipeline> {
        self.nested(|s| match query {
            Query::Select(select) => s.select_query(select),
            Query::Union { all, left, right } => s.union(*all, left, right),
        })
    }

    fn select_query(&mut self, query: &SelectQuery) -> KqlResult<Pipeline> {
        let mut pipeline = Pipeline::new();

        if let Some(from) = &query.from {
            self.from_clause(from, &mut pipeline)?;
        }

        if let Some(filter) = &query.filter {
            pipeline.push(format!("where {}", self.expr(filter)?));
        }

        // GROUP BY (or an all-aggregate select) projects on its own; the
        // select list is consumed and must not drive project/distinct.
        let aggregate_only = query.select.as_ref().is_some_and(is_aggregate_only);
        let select_consumed = !query.group_by.is_empty() || aggregate_only;
        if select_consumed {
            pipeline.push(self.summarize(query.select.as_ref(), &query.group_by)?);
        } else if let Some(select) = &query.select {
            self.project(select, &mut pipeline)?;
        }

        if !query.order_by.is_empty() {
            pipeline.push(format!("order by {}", self.order_by(&query.order_by)?));
        }

        if !select_consumed {
            if let Some(stage) = query.select.as_ref().and_then(distinct_stage) {
                pipeline.push(stage);
            }
        }

        if let Some(limit) = query.limit {
            pipeline.push(format!("limit {}", limit));
        }

        Ok(pipeline)
    }

    fn from_clause(&mut self, from: &FromClause, pipeline: &mut Pipeline) -> KqlResult<()> {
        pipeline.append(self.source(&from.source)?);
        for join in &from.joins {
            let stage = self.join(join)?;
            pipeline.push(stage);
        }
        Ok(())
    }

    pub(crate) fn source(&mut self, source: &TableSource) -> KqlResult<Pipeline> {
        match source {
            TableSource::Table { name, .. } => Ok(Pipeline::from_source(name.clone())),
            TableSource::Subquery { query, .. } => self.query(query),
        }
    }

    fn summarize(&mut self, select: Option<&SelectList>, group_by: &[Expr]) -> KqlResult<String> {
        let keys = group_by
            .iter()
            .map(|key| self.expr(key))
            .collect::<KqlResult<Vec<_>>>()?;

        let mut aggregates = Vec::new();
        for item in select.map(|s| s.items.as_slice()).unwrap_or_default() {
            let prefix = item
                .alias
                .as_ref()
                .map(|alias| format!("{} = ", alias))
                .unwrap_or_default();
            match &item.expr {
                Expr::Wildcard(_) => {}
                Expr::Column(_) => {
                    let column = self.expr(&item.expr)?;
                    // Group keys already come out of `by`.
                    if item.alias.is_none() && keys.contains(&column) {
                        continue;
                    }
                    aggregates.push(format!("{}any({})", prefix, column));
                }
                expr => aggregates.push(format!("{}{}", prefix, self.expr(expr)?)),
            }
        }

        Ok(match (aggregates.is_empty(), keys.is_empty()) {
            (_, true) => format!("summarize {}", aggregates.join(", ")),
            (true, false) => format!("summarize by {}", keys.join(", ")),
            (false, false) => format!(
                "summarize {} by {}",
                aggregates.join(", "),
                keys.join(", ")
            ),
        })
    }

    fn project(&mut self, select: &SelectList, pipeline: &mut Pipeline) -> KqlResult<()> {
        let mut extend_items = Vec::new();
        let mut project_items = Vec::new();
        let mut has_wildcard = false;
        let mut taken = output_names(select);

        for (idx, item) in select.items.iter().enumerate() {
            match &item.expr {
                Expr::Wildcard(_) => has_wildcard = true,
                Expr::Column(_) => {
                    let column = self.expr(&item.expr)?;
                    project_items.push(match &item.alias {
                        Some(alias) => format!("{} = {}", alias, column),
                        None => column,
                    });
                }
                expr => {
                    let value = self.expr(expr)?;
                    let name = match &item.alias {
                        Some(alias) => alias.clone(),
                        None => {
                            // A computed name must not shadow a column that
                            // another item reads or emits.
                            let mut reserved = taken.clone();
                            for (other, other_item) in select.items.iter().enumerate() {
                                if other != idx {
                                    reserved.extend(other_item.expr.column_names());
                                }
                            }
                            let name =
                                self.options
                                    .alias_style
                                    .unique_name(expr, idx + 1, &reserved);
                            taken.insert(name.clone());
                            name
                        }
                    };
                    extend_items.push(format!("{} = {}", name, value));
                    project_items.push(name);
                }
            }
        }

        if !extend_items.is_empty() {
            pipeline.push(format!("extend {}", extend_items.join(", ")));
        }
        // A wildcard keeps every column, so there is nothing to project.
        if !has_wildcard && !project_items.is_empty() {
            pipeline.push(format!("project {}", project_items.join(", ")));
        }
        Ok(())
    }

    fn order_by(&mut self, items: &[OrderByItem]) -> KqlResult<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let direction = if item.descending == Some(true) {
                "desc"
            } else {
                "asc"
            };
            parts.push(format!("{} {}", self.expr(&item.expr)?, direction));
        }
        Ok(parts.join(", "))
    }

    /// `a UNION b UNION c` parses left-deep; the left spine is walked in a
    /// loop so a long chain costs one nesting level.
    fn union(&mut self, all: bool, left: &Query, right: &Query) -> KqlResult<Pipeline> {
        let mut tail = vec![(all, right)];
        let mut base = left;
        while let Query::Union { all, left, right } = base {
            tail.push((*all, right.as_ref()));
            base = left.as_ref();
        }

        let mut pipeline = self.query(base)?;
        for (all, right) in tail.into_iter().rev() {
            let right = self.query(right)?;
            pipeline.push(format!("union ({}\n)", right.render_nested()));
            if !all {
                pipeline.push("distinct *");
            }
        }
        Ok(pipeline)
    }
}

/// Names the select list emits on its own: explicit aliases and plain columns.
fn output_names(select: &SelectList) -> BTreeSet<String> {
    select
        .items
        .iter()
        .filter_map(|item| match (&item.alias, &item.expr) {
            (Some(alias), _) => Some(alias.clone()),
            (None, Expr::Column(col)) => Some(col.name.clone()),
            _ => None,
        })
        .collect()
}

fn is_aggregate_only(select: &SelectList) -> bool {
    !select.items.is_empty()
        && select.items.iter().all(|item| match &item.expr {
            Expr::Function(call) => tables::is_aggregate(&call.name),
            _ => false,
        })
}

/// `distinct <cols>` for a whole-list DISTINCT or per-item DISTINCT markers.
/// Falls back to `distinct *` when an item is neither aliased nor a plain column.
fn distinct_stage(select: &SelectList) -> Option<String> {
    let items: Vec<&SelectItem> = select
        .items
        .iter()
        .filter(|item| select.distinct || item.distinct)
        .collect();
    if items.is_empty() {
        return None;
    }

    let mut columns = Vec::with_capacity(items.len());
    for item in items {
        match (&item.alias, &item.expr) {
            (Some(alias), _) => columns.push(alias.clone()),
            (None, Expr::Column(col)) => columns.push(crate::expr::column_text(col)),
            _ => return Some("distinct *".to_string()),
        }
    }
    Some(format!("distinct {}", columns.join(", ")))
}
