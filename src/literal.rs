//! Literal quoting and input text normalization.

use regex::Regex;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use crate::ast::Literal;
use crate::error::{KqlError, KqlResult};

/// Dialect keywords rewritten before parsing. Each target keyword has an
/// operator-table entry carrying the RLIKE meaning (`regexp` renders as
/// `matches regex`).
pub const REMAPPED_KEYWORDS: &[(&str, &str)] = &[("RLIKE", "REGEXP")];

static REMAP_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    REMAPPED_KEYWORDS
        .iter()
        .filter_map(|(from, to)| {
            Regex::new(&format!(r"(?i)(\s){}(\s)", regex::escape(from)))
                .ok()
                .map(|re| (re, *to))
        })
        .collect()
});

/// Quote a string with single quotes, unless it already is.
///
/// Idempotent: `quote(&quote(s)) == quote(s)`.
pub fn quote(value: &str) -> String {
    if is_quoted(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'')
}

/// Render a literal as KQL text.
pub fn render(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => quote(s),
        Literal::Number(n) => n.clone(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "dynamic(null)".to_string(),
    }
}

/// Replace double quotes that are not backslash-escaped with single quotes.
pub fn single_quote_strings(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut prev = None;
    for c in sql.chars() {
        if c == '"' && prev != Some('\\') {
            out.push('\'');
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Replace table names by plain substring substitution.
///
/// This is deliberately textual: a name that is a substring of another
/// identifier (`log` inside `catalog`) is replaced there too.
pub fn substitute_tables(sql: &str, tables: &BTreeMap<String, String>) -> String {
    tables
        .iter()
        .filter(|(from, _)| !from.is_empty())
        .fold(sql.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
}

/// Rewrite dialect keywords (see [`REMAPPED_KEYWORDS`]).
pub fn remap_keywords(sql: &str) -> String {
    REMAP_PATTERNS.iter().fold(sql.to_string(), |acc, (re, to)| {
        re.replace_all(&acc, format!("${{1}}{}${{2}}", to).as_str())
            .into_owned()
    })
}

/// Reject input nested deeper than `limit`.
///
/// Depth is open parentheses plus the current run of consecutive `NOT`
/// keywords. String literals, quoted identifiers and `--` comments are
/// skipped the same way the parser skips them.
pub fn check_nesting(sql: &str, limit: usize) -> KqlResult<()> {
    let mut depth = 0usize;
    let mut nots = 0usize;
    let mut chars = sql.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '\'' => skip_string(&mut chars),
            '`' => skip_past(&mut chars, '`'),
            '[' => skip_past(&mut chars, ']'),
            '-' if chars.peek().is_some_and(|&(_, next)| next == '-') => {
                skip_past(&mut chars, '\n')
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if is_word_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                if sql[start..end].eq_ignore_ascii_case("not") {
                    nots += 1;
                } else {
                    nots = 0;
                }
            }
            _ => {}
        }
        if depth + nots > limit {
            return Err(KqlError::NestingTooDeep { limit });
        }
    }
    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Consume the rest of a single-quoted string. `''` and `\<any>` are escapes.
fn skip_string(chars: &mut Peekable<CharIndices<'_>>) {
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\'' if chars.peek().is_some_and(|&(_, next)| next == '\'') => {
                chars.next();
            }
            '\'' => return,
            _ => {}
        }
    }
}

fn skip_past(chars: &mut Peekable<CharIndices<'_>>, end: char) {
    for (_, c) in chars.by_ref() {
        if c == end {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_is_idempotent() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote("'abc'"), "'abc'");
        assert_eq!(quote(&quote("abc")), quote("abc"));
    }

    #[test]
    fn test_quote_escapes_embedded_quote() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(&quote("it's")), r"'it\'s'");
    }

    #[test]
    fn test_single_quote_strings() {
        assert_eq!(
            single_quote_strings(r#"SELECT * FROM t WHERE a = "x""#),
            "SELECT * FROM t WHERE a = 'x'"
        );
        assert_eq!(single_quote_strings(r#"a = \"x"#), r#"a = \"x"#);
    }

    #[test]
    fn test_substitute_tables_is_plain_substring() {
        let tables = BTreeMap::from([("log".to_string(), "SecurityLog".to_string())]);
        assert_eq!(
            substitute_tables("SELECT * FROM log", &tables),
            "SELECT * FROM SecurityLog"
        );
        assert_eq!(
            substitute_tables("SELECT catalog FROM x", &tables),
            "SELECT cataSecurityLog FROM x"
        );
    }

    #[test]
    fn test_remap_rlike() {
        assert_eq!(
            remap_keywords("SELECT a FROM t WHERE a rlike 'x.*'"),
            "SELECT a FROM t WHERE a REGEXP 'x.*'"
        );
        assert_eq!(remap_keywords("SELECT rlike_col FROM t"), "SELECT rlike_col FROM t");
    }

    #[test]
    fn test_check_nesting() {
        assert!(check_nesting("f(g(h(x)))", 3).is_ok());
        assert!(matches!(
            check_nesting("f(g(h(x)))", 2),
            Err(KqlError::NestingTooDeep { limit: 2 })
        ));
        assert!(check_nesting("'((((('", 1).is_ok());
    }

    #[test]
    fn test_check_nesting_after_escaped_quotes() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        for prefix in [r"b = 'it\'s' OR c = ", "b = 'it''s' OR c = "] {
            let sql = format!("SELECT a FROM t WHERE {}{}", prefix, deep);
            assert!(
                matches!(check_nesting(&sql, 64), Err(KqlError::NestingTooDeep { limit: 64 })),
                "{}",
                prefix
            );
        }
        assert!(check_nesting(r"b = '\'(((' AND c = (1)", 1).is_ok());
    }

    #[test]
    fn test_check_nesting_skips_comments_and_quoted_names() {
        assert!(check_nesting("SELECT [it's] -- don't\nFROM t WHERE a = (1)", 1).is_ok());
        assert!(check_nesting("SELECT `((` FROM t", 1).is_ok());
        assert!(check_nesting("SELECT [x] FROM t WHERE ((a))", 1).is_err());
    }

    #[test]
    fn test_check_nesting_counts_not_runs() {
        assert!(check_nesting("NOT NOT a = 1", 2).is_ok());
        assert!(matches!(
            check_nesting("NOT NOT NOT a = 1", 2),
            Err(KqlError::NestingTooDeep { limit: 2 })
        ));
        // Separate NOTs do not add up.
        assert!(check_nesting("NOT a AND NOT b AND NOT c AND NOT d", 1).is_ok());
        assert!(check_nesting("a NOT IN (1) AND b IS NOT NULL", 2).is_ok());
    }

    #[test]
    fn test_render_literals() {
        assert_eq!(render(&Literal::String("x".into())), "'x'");
        assert_eq!(render(&Literal::Number("1.5".into())), "1.5");
        assert_eq!(render(&Literal::Boolean(true)), "true");
        assert_eq!(render(&Literal::Null), "dynamic(null)");
    }
}
