//! Function call mapping.

use regex::Regex;
use std::sync::LazyLock;

use crate::ast::{Expr, FunctionCall};
use crate::diagnostics::DiagnosticKind;
use crate::error::{KqlError, KqlResult};
use crate::tables::{self, FunctionRule};
use crate::transpiler::Session;

/// Suffix appended to calls with no function-table entry.
pub const UNMAPPED_MARKER: &str = " // WARNING unmapped function\n";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{p(\d+)\}").expect("valid placeholder regex"));

/// Fill `{pN}` placeholders in `template` with rendered arguments.
///
/// Fails when a placeholder points past the argument list or a brace is left
/// over that is not part of a placeholder.
pub fn apply_template(function: &str, template: &str, args: &[String]) -> KqlResult<String> {
    let malformed = || KqlError::template(function, template, args.len());
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let literal = &template[last..whole.start()];
        if literal.contains(['{', '}']) {
            return Err(malformed());
        }
        let arg = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|i| args.get(i))
            .ok_or_else(malformed)?;
        out.push_str(literal);
        out.push_str(arg);
        last = whole.end();
    }
    let tail = &template[last..];
    if tail.contains(['{', '}']) {
        return Err(malformed());
    }
    out.push_str(tail);
    Ok(out)
}

impl Session<'_> {
    pub(crate) fn function(&mut self, call: &FunctionCall) -> KqlResult<String> {
        // `count(*)` renders as `count()`.
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            if !matches!(arg, Expr::Wildcard(_)) {
                args.push(self.expr(arg)?);
            }
        }

        let name = call.name.trim().to_lowercase();
        if call.distinct {
            if name == "count" {
                return Ok(format!("dcount({})", args.join(", ")));
            }
            self.warn(
                DiagnosticKind::UnresolvedExpression,
                format!("DISTINCT modifier dropped from {}()", call.name),
            );
        }

        match tables::function(&name) {
            Some(FunctionRule::Rename(target)) => Ok(format!("{}({})", target, args.join(", "))),
            Some(FunctionRule::Reorder { target, args: template }) => Ok(format!(
                "{}({})",
                target,
                apply_template(&call.name, template, &args)?
            )),
            Some(FunctionRule::Template(template)) => apply_template(&call.name, template, &args),
            None => {
                self.warn(
                    DiagnosticKind::UnmappedFunction,
                    format!("no KQL mapping for {}()", call.name),
                );
                Ok(format!("{}({}){}", call.name, args.join(", "), UNMAPPED_MARKER))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::TranslateOptions;

    fn render(call: Expr) -> (KqlResult<String>, usize) {
        let options = TranslateOptions::default();
        let mut session = Session::new(&options);
        let out = session.expr(&call);
        (out, session.diagnostics.len())
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_apply_template() {
        assert_eq!(
            apply_template("ifnull", "iif(isnull({p0}), {p1}, {p0})", &args(&["a", "0"])).unwrap(),
            "iif(isnull(a), 0, a)"
        );
        assert_eq!(apply_template("f", "{p1}, {p0}", &args(&["x", "y"])).unwrap(), "y, x");
    }

    #[test]
    fn test_apply_template_rejects_missing_argument() {
        let err = apply_template("left", "substring({p0}, 0, {p1})", &args(&["a"])).unwrap_err();
        assert!(matches!(err, KqlError::MalformedTemplate { arity: 1, .. }));
    }

    #[test]
    fn test_apply_template_rejects_stray_brace() {
        assert!(apply_template("f", "g({p0}, {x})", &args(&["a"])).is_err());
        assert!(apply_template("f", "g({p0}", &args(&["a"])).is_ok());
        assert!(apply_template("f", "g({p0}})", &args(&["a"])).is_err());
    }

    #[test]
    fn test_rename() {
        let (out, warnings) = render(Expr::function("UPPER", vec![Expr::column("a")]));
        assert_eq!(out.unwrap(), "toupper(a)");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_regexp_extract_reorders_arguments() {
        let (out, _) = render(Expr::function(
            "regexp_extract",
            vec![Expr::column("col"), Expr::string("p")],
        ));
        assert_eq!(out.unwrap(), "extract('p', col)");
    }

    #[test]
    fn test_count_star_and_distinct() {
        let (out, _) = render(Expr::function("count", vec![Expr::Wildcard(None)]));
        assert_eq!(out.unwrap(), "count()");

        let call = Expr::Function(FunctionCall {
            name: "COUNT".to_string(),
            args: vec![Expr::column("a")],
            distinct: true,
        });
        let (out, warnings) = render(call);
        assert_eq!(out.unwrap(), "dcount(a)");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_unmapped_function_passes_through_with_marker() {
        let (out, warnings) = render(Expr::function("frobnicate", vec![Expr::column("a")]));
        assert_eq!(out.unwrap(), "frobnicate(a) // WARNING unmapped function\n");
        assert_eq!(warnings, 1);
    }
}
