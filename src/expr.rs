//! Expression rendering.

use crate::ast::{ColumnRef, Expr, Literal};
use crate::diagnostics::DiagnosticKind;
use crate::error::{KqlError, KqlResult};
use crate::like;
use crate::literal;
use crate::tables;
use crate::transpiler::Session;

/// Render a column reference, bracketing names KQL would not accept bare.
pub fn column_text(col: &ColumnRef) -> String {
    let name = escape_identifier(&col.name);
    match &col.table {
        Some(table) if table.starts_with('$') => format!("{}.{}", table, name),
        Some(table) => format!("{}.{}", escape_identifier(table), name),
        None => name,
    }
}

fn escape_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if plain {
        name.to_string()
    } else {
        format!("['{}']", name.replace('\'', "\\'"))
    }
}

impl Session<'_> {
    pub(crate) fn expr(&mut self, expr: &Expr) -> KqlResult<String> {
        self.nested(|s| s.expr_inner(expr))
    }

    fn expr_list(&mut self, exprs: &[Expr]) -> KqlResult<Vec<String>> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn expr_inner(&mut self, expr: &Expr) -> KqlResult<String> {
        Ok(match expr {
            Expr::Literal(lit) => literal::render(lit),
            Expr::Column(col) => column_text(col),
            Expr::Wildcard(None) => "*".to_string(),
            Expr::Wildcard(Some(table)) => format!("{}.*", table),
            Expr::And(items) => self.expr_list(items)?.join(" and "),
            Expr::Or(items) => self.expr_list(items)?.join(" or "),
            Expr::Not(inner) => {
                // `NOT (x)` already carries its parentheses.
                let inner = match inner.as_ref() {
                    Expr::Nested(e) => e.as_ref(),
                    e => e,
                };
                format!("not ({})", self.expr(inner)?)
            }
            // KQL spells the negated forms `!between` and `!in`.
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => format!(
                "{} {} ({} .. {})",
                self.expr(expr)?,
                if *negated { "!between" } else { "between" },
                self.expr(low)?,
                self.expr(high)?
            ),
            Expr::InList {
                expr,
                list,
                negated,
            } => format!(
                "{} {} ({})",
                self.expr(expr)?,
                if *negated { "!in" } else { "in" },
                self.expr_list(list)?.join(", ")
            ),
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let left = self.expr(expr)?;
                let inner = self.query(subquery)?;
                format!(
                    "{} {} ({})",
                    left,
                    if *negated { "!in" } else { "in" },
                    inner.render_nested()
                )
            }
            Expr::IsNull { expr, negated } => format!(
                "{}({})",
                if *negated { "isnotnull" } else { "isnull" },
                self.expr(expr)?
            ),
            Expr::BinaryOp { .. } => self.binary_chain(expr)?,
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let left = self.expr(expr)?;
                match pattern.as_ref() {
                    Expr::Literal(Literal::String(p)) => like::render(&left, p, *negated),
                    other => {
                        return Err(KqlError::NonLiteralLikePattern {
                            left,
                            pattern: self.expr(other)?,
                        });
                    }
                }
            }
            Expr::Function(call) => self.function(call)?,
            Expr::Nested(inner) => format!("({})", self.expr(inner)?),
            Expr::Subquery(query) => {
                let inner = self.query(query)?.render_inline();
                self.warn(
                    DiagnosticKind::UnresolvedExpression,
                    format!("scalar subquery has no KQL equivalent: {}", inner),
                );
                format!("EXPRESSION subquery({}) not resolved.", inner)
            }
        })
    }

    /// Render a left-deep operator chain (`a + b + c`) by walking its left
    /// spine, so the chain costs one nesting level however long it is.
    fn binary_chain(&mut self, expr: &Expr) -> KqlResult<String> {
        let mut tail = Vec::new();
        let mut base = expr;
        while let Expr::BinaryOp { left, op, right } = base {
            tail.push((op, right.as_ref()));
            base = left.as_ref();
        }

        let mut out = self.expr(base)?;
        for (op, right) in tail.into_iter().rev() {
            let kql_op = tables::operator(&op.to_lowercase())
                .ok_or_else(|| KqlError::UnknownOperator(op.clone()))?;
            out = format!("{} {} {}", out, kql_op, self.expr(right)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::TranslateOptions;

    fn render(expr: &Expr) -> KqlResult<String> {
        let options = TranslateOptions::default();
        Session::new(&options).expr(expr)
    }

    #[test]
    fn test_column_text() {
        assert_eq!(column_text(&ColumnRef::new("a_1")), "a_1");
        assert_eq!(column_text(&ColumnRef::new("first name")), "['first name']");
        let col = ColumnRef {
            table: Some("$left".to_string()),
            name: "x".to_string(),
        };
        assert_eq!(column_text(&col), "$left.x");
    }

    #[test]
    fn test_comparison() {
        let expr = Expr::binary(Expr::column("a"), "<>", Expr::number("3"));
        assert_eq!(render(&expr).unwrap(), "a != 3");
    }

    #[test]
    fn test_flat_chain_is_one_level() {
        let chain = (1..100).fold(Expr::column("a0"), |left, i| {
            Expr::binary(left, "+", Expr::column(format!("a{}", i)))
        });
        let options = TranslateOptions {
            max_depth: 3,
            ..Default::default()
        };
        let text = Session::new(&options).expr(&chain).unwrap();
        assert!(text.starts_with("a0 + a1 + a2"), "{}", text);
        assert!(text.ends_with("a98 + a99"), "{}", text);
    }

    #[test]
    fn test_mixed_chain_keeps_operand_order() {
        let expr = Expr::binary(
            Expr::binary(Expr::column("a"), "-", Expr::column("b")),
            "||",
            Expr::binary(Expr::column("c"), "*", Expr::number("2")),
        );
        assert_eq!(render(&expr).unwrap(), "a - b + c * 2");
    }

    #[test]
    fn test_unknown_operator_names_token() {
        let expr = Expr::binary(Expr::column("a"), "<=>", Expr::column("b"));
        let err = render(&expr).unwrap_err();
        assert!(matches!(&err, KqlError::UnknownOperator(op) if op == "<=>"));
        assert!(err.to_string().contains("<=>"));
    }

    #[test]
    fn test_between_and_in() {
        let between = Expr::Between {
            expr: Box::new(Expr::column("a")),
            low: Box::new(Expr::number("1")),
            high: Box::new(Expr::number("5")),
            negated: false,
        };
        assert_eq!(render(&between).unwrap(), "a between (1 .. 5)");

        let in_list = Expr::InList {
            expr: Box::new(Expr::column("a")),
            list: vec![Expr::string("x"), Expr::string("y")],
            negated: true,
        };
        assert_eq!(render(&in_list).unwrap(), "a !in ('x', 'y')");
    }

    #[test]
    fn test_not_unwraps_parentheses() {
        let expr = Expr::Not(Box::new(Expr::Nested(Box::new(Expr::binary(
            Expr::column("a"),
            "=",
            Expr::number("1"),
        )))));
        assert_eq!(render(&expr).unwrap(), "not (a == 1)");
    }

    #[test]
    fn test_is_null() {
        let expr = Expr::IsNull {
            expr: Box::new(Expr::column("a")),
            negated: true,
        };
        assert_eq!(render(&expr).unwrap(), "isnotnull(a)");
    }

    #[test]
    fn test_like_requires_string_pattern() {
        let like = Expr::Like {
            expr: Box::new(Expr::column("a")),
            pattern: Box::new(Expr::string("%abc")),
            negated: false,
        };
        assert_eq!(render(&like).unwrap(), "a endswith 'abc'");

        let bad = Expr::Like {
            expr: Box::new(Expr::column("a")),
            pattern: Box::new(Expr::column("b")),
            negated: false,
        };
        let err = render(&bad).unwrap_err();
        assert!(matches!(err, KqlError::NonLiteralLikePattern { .. }));
        assert!(err.to_string().contains("a LIKE b"));
    }

    #[test]
    fn test_null_literal() {
        let expr = Expr::binary(Expr::column("a"), "is", Expr::Literal(Literal::Null));
        assert_eq!(render(&expr).unwrap(), "a == dynamic(null)");
    }
}
