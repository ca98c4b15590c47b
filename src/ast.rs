//! Abstract Syntax Tree for the SQL dialect accepted by the translator.
//!
//! The parser produces these nodes once per translation; the translator only
//! reads them, so the same tree can be translated repeatedly or from several
//! threads at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A complete query: either a single SELECT block or a set operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// `SELECT ... FROM ... WHERE ...`
    Select(Box<SelectQuery>),
    /// `left UNION [ALL] right`
    Union {
        all: bool,
        left: Box<Query>,
        right: Box<Query>,
    },
}

impl Query {
    /// Wrap a select block.
    pub fn select(query: SelectQuery) -> Self {
        Query::Select(Box::new(query))
    }

    /// Build a `UNION` (or `UNION ALL` when `all` is set) of two queries.
    pub fn union(left: Query, right: Query, all: bool) -> Self {
        Query::Union {
            all,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// The clauses of one SELECT block. Every clause is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FromClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<Expr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl SelectQuery {
    /// Start a query reading from a plain table.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            from: Some(FromClause {
                source: TableSource::table(table),
                joins: vec![],
            }),
            ..Default::default()
        }
    }
}

/// The projection list, with the whole-list `DISTINCT` marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectList {
    #[serde(default)]
    pub distinct: bool,
    pub items: Vec<SelectItem>,
}

/// One entry of the projection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Per-item `DISTINCT` prefix (`SELECT a, DISTINCT b`).
    #[serde(default)]
    pub distinct: bool,
}

impl SelectItem {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            alias: None,
            distinct: false,
        }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
            distinct: false,
        }
    }
}

/// Primary source followed by any joins, in written order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub source: TableSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,
}

/// A table reference or a parenthesized subquery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSource {
    Table {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Subquery {
        query: Box<Query>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

impl TableSource {
    pub fn table(name: impl Into<String>) -> Self {
        TableSource::Table {
            name: name.into(),
            alias: None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            TableSource::Table { alias, .. } | TableSource::Subquery { alias, .. } => {
                alias.as_deref()
            }
        }
    }
}

/// A join sub-node. `keyword` holds the normalized join keyword as written
/// (`"join"`, `"left outer join"`, `"cross join"`, ...); it is resolved to a
/// join kind through the join-keyword table at translation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub keyword: String,
    pub source: TableSource,
    pub constraint: JoinConstraint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
    None,
}

/// `ORDER BY` entry. `descending` is `None` when no direction was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descending: Option<bool>,
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    /// `*` as a select item or function argument; `t.*` carries the qualifier.
    Wildcard(Option<String>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// Binary operator; `op` is the lower-cased source token (`=`, `<>`, `||`, `is not`, ...).
    BinaryOp {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Function(FunctionCall),
    /// Parenthesized expression, kept so grouping survives translation.
    Nested(Box<Expr>),
    /// Scalar subquery in expression position.
    Subquery(Box<Query>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn number(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Number(value.into()))
    }

    pub fn binary(left: Expr, op: impl Into<String>, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op: op.into(),
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall {
            name: name.into(),
            args,
            distinct: false,
        })
    }

    /// Names of the columns this expression reads, outside subqueries.
    pub fn column_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.map_columns(&mut |col| {
            names.insert(col.name.clone());
            col.clone()
        });
        names
    }

    /// Rebuild the expression with every column reference passed through `f`.
    /// Subqueries are left untouched; their columns belong to another scope.
    pub fn map_columns<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(&ColumnRef) -> ColumnRef,
    {
        let boxed = |e: &Expr, f: &mut F| Box::new(e.map_columns(f));
        match self {
            Expr::Column(col) => Expr::Column(f(col)),
            Expr::Literal(_) | Expr::Wildcard(_) | Expr::Subquery(_) => self.clone(),
            Expr::And(items) => Expr::And(items.iter().map(|e| e.map_columns(f)).collect()),
            Expr::Or(items) => Expr::Or(items.iter().map(|e| e.map_columns(f)).collect()),
            Expr::Not(inner) => Expr::Not(boxed(inner, f)),
            Expr::Nested(inner) => Expr::Nested(boxed(inner, f)),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => Expr::Between {
                expr: boxed(expr, f),
                low: boxed(low, f),
                high: boxed(high, f),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: boxed(expr, f),
                list: list.iter().map(|e| e.map_columns(f)).collect(),
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => Expr::InSubquery {
                expr: boxed(expr, f),
                subquery: subquery.clone(),
                negated: *negated,
            },
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: boxed(expr, f),
                negated: *negated,
            },
            Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
                left: boxed(left, f),
                op: op.clone(),
                right: boxed(right, f),
            },
            Expr::Like {
                expr,
                pattern,
                negated,
            } => Expr::Like {
                expr: boxed(expr, f),
                pattern: boxed(pattern, f),
                negated: *negated,
            },
            Expr::Function(call) => Expr::Function(FunctionCall {
                name: call.name.clone(),
                args: call.args.iter().map(|e| e.map_columns(f)).collect(),
                distinct: call.distinct,
            }),
        }
    }
}

/// Literal value. Strings are stored without their delimiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    String(String),
    /// Numeric text exactly as written (`42`, `-1.5`, `1e3`).
    Number(String),
    Boolean(bool),
    Null,
}

/// Possibly qualified column reference (`name` or `table.name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// `count(DISTINCT x)` style argument modifier.
    #[serde(default)]
    pub distinct: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_display() {
        assert_eq!(ColumnRef::new("a").to_string(), "a");
        let col = ColumnRef {
            table: Some("t".to_string()),
            name: "a".to_string(),
        };
        assert_eq!(col.to_string(), "t.a");
    }

    #[test]
    fn test_map_columns_rewrites_nested_refs() {
        let expr = Expr::And(vec![
            Expr::binary(Expr::qualified("t1", "x"), "=", Expr::qualified("t2", "y")),
            Expr::Not(Box::new(Expr::column("z"))),
        ]);
        let mapped = expr.map_columns(&mut |col: &ColumnRef| ColumnRef {
            table: col.table.as_ref().map(|t| t.to_uppercase()),
            name: col.name.clone(),
        });
        assert_eq!(
            mapped,
            Expr::And(vec![
                Expr::binary(Expr::qualified("T1", "x"), "=", Expr::qualified("T2", "y")),
                Expr::Not(Box::new(Expr::column("z"))),
            ])
        );
    }

    #[test]
    fn test_query_serializes_without_empty_clauses() {
        let query = Query::select(SelectQuery::from_table("t"));
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(
            json,
            r#"{"select":{"from":{"source":{"table":{"name":"t"}}}}}"#
        );
    }
}
