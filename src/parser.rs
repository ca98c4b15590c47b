//! SQL parser using nom.
//!
//! Parses the restricted SELECT dialect into the [`Query`] AST.
//!
//! # Grammar Overview
//!
//! ```text
//! query       := term (UNION [ALL] term)* [ORDER BY order (, order)*] [LIMIT n]
//! term        := select | '(' query ')'
//! select      := SELECT [DISTINCT] item (, item)*
//!                [FROM source join*] [WHERE expr] [GROUP BY expr (, expr)*]
//! join        := ',' source | <join keyword> source [ON expr | USING (col, ...)]
//! expr        := or  >  and  >  not  >  predicate  >  additive  >  multiplicative
//! ```
//!
//! Each token parser skips leading whitespace and `--` comments itself.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending, one_of},
    combinator::{cut, map, map_res, opt, peek, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::*;
use crate::error::{KqlError, KqlResult};

/// Words that cannot be used as bare identifiers.
const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "cast", "cross", "desc", "distinct",
    "else", "end", "false", "from", "full", "group", "having", "in", "inner", "is", "join",
    "left", "like", "limit", "not", "null", "offset", "on", "or", "order", "outer", "regexp",
    "right", "select", "then", "true", "union", "using", "when", "where",
];

/// Reserved words that may still name a function (`left(s, 3)`, `right(...)`).
const FUNCTION_KEYWORDS: &[&str] = &["left", "right"];

/// Constructs outside the dialect, reported by name when parsing stops on them.
const UNSUPPORTED: &[&str] = &["having", "offset", "case", "cast"];

/// Join keyword sequences, longest first.
const JOIN_SYNTAX: &[&[&str]] = &[
    &["left", "outer", "join"],
    &["right", "outer", "join"],
    &["full", "outer", "join"],
    &["inner", "join"],
    &["left", "join"],
    &["right", "join"],
    &["full", "join"],
    &["cross", "join"],
    &["join"],
];

/// Comparison operators, longest first.
const COMPARISON_OPS: &[&str] = &["<=>", "<>", "!=", "==", "<=", ">=", "!<", "!>", "=", "<", ">"];

/// Parse a complete SQL query string.
pub fn parse(input: &str) -> KqlResult<Query> {
    match terminated(parse_query, sp)(input) {
        Ok(("", query)) => Ok(query),
        Ok((remaining, _)) => Err(error_at(input, remaining, |rest| {
            format!("Unexpected trailing content: '{}'", preview(rest))
        })),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(error_at(input, e.input, |rest| {
                if rest.is_empty() {
                    "Unexpected end of input".to_string()
                } else {
                    format!("Parse failed near '{}'", preview(rest))
                }
            }))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(KqlError::parse(input.len(), "Unexpected end of input"))
        }
    }
}

fn error_at(input: &str, remaining: &str, describe: impl Fn(&str) -> String) -> KqlError {
    let rest = remaining.trim_start();
    let position = input.len() - rest.len();
    let word: String = rest.chars().take_while(|c| is_ident_char(*c)).collect();
    let word = word.to_lowercase();
    if UNSUPPORTED.contains(&word.as_str()) {
        return KqlError::parse(
            position,
            format!("Unsupported SQL construct: {}", word.to_uppercase()),
        );
    }
    KqlError::parse(position, describe(rest))
}

fn preview(rest: &str) -> String {
    const LIMIT: usize = 40;
    if rest.chars().count() > LIMIT {
        format!("{}...", rest.chars().take(LIMIT).collect::<String>())
    } else {
        rest.to_string()
    }
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Skip whitespace and `--` line comments.
fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, preceded(tag("--"), not_line_ending)))),
    )(input)
}

/// Case-insensitive keyword that is not the prefix of a longer word.
fn kw<'a>(word: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (input, _) = sp(input)?;
        let (rest, matched) = tag_no_case(word)(input)?;
        if rest.starts_with(is_ident_char) {
            return fail(input, ErrorKind::Tag);
        }
        Ok((rest, matched))
    }
}

/// Keyword sequence such as `GROUP BY` or `LEFT OUTER JOIN`.
fn kws<'a>(words: &'static [&'static str]) -> impl Fn(&'a str) -> IResult<&'a str, ()> {
    move |mut input: &'a str| {
        for &word in words {
            let (rest, _) = kw(word)(input)?;
            input = rest;
        }
        Ok((input, ()))
    }
}

/// Punctuation or operator symbol.
fn sym<'a>(symbol: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| preceded(sp, tag(symbol))(input)
}

fn comma_list<'a, O>(
    item: fn(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<O>> {
    separated_list1(sym(","), item)
}

// ============================================================================
// Queries
// ============================================================================

/// Parse a query: set terms joined by UNION, then ORDER BY and LIMIT.
fn parse_query(input: &str) -> IResult<&str, Query> {
    let (input, first) = parse_set_term(input)?;
    let (input, rest) = many0(pair(parse_union_keyword, parse_set_term))(input)?;
    let query = rest
        .into_iter()
        .fold(first, |left, (all, right)| Query::union(left, right, all));

    let (input, order_by) = opt(parse_order_by)(input)?;
    let (input, limit) = opt(parse_limit)(input)?;
    let order_by = order_by.unwrap_or_default();
    if order_by.is_empty() && limit.is_none() {
        return Ok((input, query));
    }

    Ok((input, attach_order_and_limit(query, order_by, limit)))
}

/// Place a trailing ORDER BY / LIMIT on a plain select, or wrap a union (or a
/// parenthesized query that already has its own) as the source of an outer one.
fn attach_order_and_limit(query: Query, order_by: Vec<OrderByItem>, limit: Option<u64>) -> Query {
    match query {
        Query::Select(mut select) if select.order_by.is_empty() && select.limit.is_none() => {
            select.order_by = order_by;
            select.limit = limit;
            Query::Select(select)
        }
        other => Query::select(SelectQuery {
            from: Some(FromClause {
                source: TableSource::Subquery {
                    query: Box::new(other),
                    alias: None,
                },
                joins: Vec::new(),
            }),
            order_by,
            limit,
            ..Default::default()
        }),
    }
}

fn parse_union_keyword(input: &str) -> IResult<&str, bool> {
    let (input, _) = kw("union")(input)?;
    let (input, all) = opt(kw("all"))(input)?;
    Ok((input, all.is_some()))
}

fn parse_set_term(input: &str) -> IResult<&str, Query> {
    alt((
        map(parse_select, Query::select),
        delimited(sym("("), parse_query, sym(")")),
    ))(input)
}

fn parse_select(input: &str) -> IResult<&str, SelectQuery> {
    let (input, _) = kw("select")(input)?;
    cut(parse_select_body)(input)
}

fn parse_select_body(input: &str) -> IResult<&str, SelectQuery> {
    let (input, distinct) = opt(kw("distinct"))(input)?;
    let (input, items) = comma_list(parse_select_item)(input)?;
    let (input, from) = opt(preceded(kw("from"), cut(parse_from_clause)))(input)?;
    let (input, filter) = opt(preceded(kw("where"), cut(parse_expr)))(input)?;
    let (input, group_by) = opt(preceded(
        kws(&["group", "by"]),
        cut(comma_list(parse_expr)),
    ))(input)?;

    Ok((
        input,
        SelectQuery {
            select: Some(SelectList {
                distinct: distinct.is_some(),
                items,
            }),
            from,
            filter,
            group_by: group_by.unwrap_or_default(),
            ..Default::default()
        },
    ))
}

/// Parse a select item: `*`, `t.*`, or `[DISTINCT] expr [[AS] alias]`.
fn parse_select_item(input: &str) -> IResult<&str, SelectItem> {
    if let Ok((rest, _)) = sym("*")(input) {
        return Ok((rest, SelectItem::new(Expr::Wildcard(None))));
    }
    if let Ok((rest, table)) = parse_qualified_wildcard(input) {
        return Ok((rest, SelectItem::new(Expr::Wildcard(Some(table)))));
    }

    let (input, distinct) = opt(kw("distinct"))(input)?;
    let (input, expr) = parse_expr(input)?;
    let (input, alias) = parse_alias(input)?;
    Ok((
        input,
        SelectItem {
            expr,
            alias,
            distinct: distinct.is_some(),
        },
    ))
}

fn parse_qualified_wildcard(input: &str) -> IResult<&str, String> {
    let (input, table) = parse_identifier(input)?;
    let (input, _) = tag(".")(input)?;
    let (input, _) = tag("*")(input)?;
    Ok((input, table))
}

fn parse_alias(input: &str) -> IResult<&str, Option<String>> {
    opt(preceded(opt(kw("as")), parse_identifier))(input)
}

fn parse_order_by(input: &str) -> IResult<&str, Vec<OrderByItem>> {
    let (input, _) = kws(&["order", "by"])(input)?;
    cut(comma_list(parse_order_item))(input)
}

fn parse_order_item(input: &str) -> IResult<&str, OrderByItem> {
    let (input, expr) = parse_expr(input)?;
    let (input, descending) = opt(alt((value(false, kw("asc")), value(true, kw("desc")))))(input)?;
    Ok((input, OrderByItem { expr, descending }))
}

fn parse_limit(input: &str) -> IResult<&str, u64> {
    let (input, _) = kw("limit")(input)?;
    let (input, _) = sp(input)?;
    cut(map_res(digit1, str::parse::<u64>))(input)
}

// ============================================================================
// FROM and joins
// ============================================================================

fn parse_from_clause(input: &str) -> IResult<&str, FromClause> {
    let (input, source) = parse_table_source(input)?;
    let (input, joins) = many0(parse_join)(input)?;
    Ok((input, FromClause { source, joins }))
}

fn parse_table_source(input: &str) -> IResult<&str, TableSource> {
    if let Ok((rest, _)) = sym("(")(input) {
        let (rest, query) = parse_query(rest)?;
        let (rest, _) = sym(")")(rest)?;
        let (rest, alias) = parse_alias(rest)?;
        return Ok((
            rest,
            TableSource::Subquery {
                query: Box::new(query),
                alias,
            },
        ));
    }

    let (input, name) = parse_table_name(input)?;
    let (input, alias) = parse_alias(input)?;
    Ok((input, TableSource::Table { name, alias }))
}

/// Table name, optionally schema-qualified (`db.table`).
fn parse_table_name(input: &str) -> IResult<&str, String> {
    let (input, first) = parse_identifier(input)?;
    let (input, rest) = many0(preceded(tag("."), parse_identifier))(input)?;
    let mut parts = vec![first];
    parts.extend(rest);
    Ok((input, parts.join(".")))
}

fn parse_join(input: &str) -> IResult<&str, Join> {
    // Comma join: `FROM a, b`.
    if let Ok((rest, _)) = sym(",")(input) {
        let (rest, source) = parse_table_source(rest)?;
        return Ok((
            rest,
            Join {
                keyword: "cross join".to_string(),
                source,
                constraint: JoinConstraint::None,
            },
        ));
    }

    let (input, keyword) = parse_join_keyword(input)?;
    let (input, source) = cut(parse_table_source)(input)?;
    let (input, constraint) = parse_join_constraint(input)?;
    Ok((
        input,
        Join {
            keyword,
            source,
            constraint,
        },
    ))
}

fn parse_join_keyword(input: &str) -> IResult<&str, String> {
    for &words in JOIN_SYNTAX {
        if let Ok((rest, _)) = kws(words)(input) {
            return Ok((rest, words.join(" ")));
        }
    }
    fail(input, ErrorKind::Tag)
}

fn parse_join_constraint(input: &str) -> IResult<&str, JoinConstraint> {
    if let Ok((rest, _)) = kw("on")(input) {
        let (rest, expr) = cut(parse_expr)(rest)?;
        return Ok((rest, JoinConstraint::On(expr)));
    }
    if let Ok((rest, _)) = kw("using")(input) {
        let (rest, columns) = cut(delimited(
            sym("("),
            comma_list(parse_identifier),
            sym(")"),
        ))(rest)?;
        return Ok((rest, JoinConstraint::Using(columns)));
    }
    Ok((input, JoinConstraint::None))
}

// ============================================================================
// Expressions
// ============================================================================

/// Parse an expression (lowest precedence: OR).
pub fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_and(input)?;
    let (input, mut rest) = many0(preceded(kw("or"), parse_and))(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    rest.insert(0, first);
    Ok((input, Expr::Or(rest)))
}

fn parse_and(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_not(input)?;
    let (input, mut rest) = many0(preceded(kw("and"), parse_not))(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    rest.insert(0, first);
    Ok((input, Expr::And(rest)))
}

/// Leading `NOT`s are counted first and wrapped afterwards, so a long chain
/// does not recurse.
fn parse_not(input: &str) -> IResult<&str, Expr> {
    let (input, nots) = many0(kw("not"))(input)?;
    let (input, expr) = parse_predicate(input)?;
    let expr = nots
        .iter()
        .fold(expr, |inner, _| Expr::Not(Box::new(inner)));
    Ok((input, expr))
}

/// Comparison, BETWEEN, IN, LIKE, REGEXP and IS tails on an additive operand.
fn parse_predicate(input: &str) -> IResult<&str, Expr> {
    let (input, left) = parse_additive(input)?;
    let expr = Box::new(left.clone());

    let (after_not, negated) = match kw("not")(input) {
        Ok((rest, _)) => (rest, true),
        Err(_) => (input, false),
    };

    if let Ok((rest, _)) = kw("between")(after_not) {
        let (rest, low) = parse_additive(rest)?;
        let (rest, _) = kw("and")(rest)?;
        let (rest, high) = parse_additive(rest)?;
        return Ok((
            rest,
            Expr::Between {
                expr,
                low: Box::new(low),
                high: Box::new(high),
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = kw("in")(after_not) {
        let (rest, _) = sym("(")(rest)?;
        if peek(kw("select"))(rest).is_ok() {
            let (rest, subquery) = parse_query(rest)?;
            let (rest, _) = sym(")")(rest)?;
            return Ok((
                rest,
                Expr::InSubquery {
                    expr,
                    subquery: Box::new(subquery),
                    negated,
                },
            ));
        }
        let (rest, list) = comma_list(parse_expr)(rest)?;
        let (rest, _) = sym(")")(rest)?;
        return Ok((
            rest,
            Expr::InList {
                expr,
                list,
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = kw("like")(after_not) {
        let (rest, pattern) = parse_additive(rest)?;
        return Ok((
            rest,
            Expr::Like {
                expr,
                pattern: Box::new(pattern),
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = kw("regexp")(after_not) {
        let (rest, pattern) = parse_additive(rest)?;
        let matched = Expr::BinaryOp {
            left: expr,
            op: "regexp".to_string(),
            right: Box::new(pattern),
        };
        let matched = if negated {
            Expr::Not(Box::new(matched))
        } else {
            matched
        };
        return Ok((rest, matched));
    }

    if negated {
        // A bare NOT here is not ours; leave it for the caller to reject.
        return Ok((input, left));
    }

    if let Ok((rest, _)) = kw("is")(input) {
        let (rest, not) = opt(kw("not"))(rest)?;
        if let Ok((rest, _)) = kw("null")(rest) {
            return Ok((
                rest,
                Expr::IsNull {
                    expr,
                    negated: not.is_some(),
                },
            ));
        }
        let (rest, right) = parse_additive(rest)?;
        let op = if not.is_some() { "is not" } else { "is" };
        return Ok((rest, Expr::binary(left, op, right)));
    }

    if let Ok((rest, op)) = parse_comparison_op(input) {
        let (rest, right) = parse_additive(rest)?;
        return Ok((rest, Expr::binary(left, op, right)));
    }

    Ok((input, left))
}

fn parse_comparison_op(input: &str) -> IResult<&str, &str> {
    let (input, _) = sp(input)?;
    for &op in COMPARISON_OPS {
        if let Ok((rest, matched)) = tag::<_, _, Error<&str>>(op)(input) {
            return Ok((rest, matched));
        }
    }
    fail(input, ErrorKind::Tag)
}

fn parse_additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_multiplicative(input)?;
    let (input, rest) = many0(pair(
        preceded(
            sp,
            alt((tag("||"), tag("+"), tag("-"), tag("&"), tag("|"), tag("^"))),
        ),
        parse_multiplicative,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(pair(
        preceded(sp, alt((tag("*"), tag("/"), tag("%")))),
        parse_unary,
    ))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expr, rest: Vec<(&str, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expr::binary(left, op, right))
}

/// Negative numeric literal, otherwise a primary.
fn parse_unary(input: &str) -> IResult<&str, Expr> {
    if let Ok((rest, _)) = sym("-")(input) {
        let (rest, number) = parse_number(rest)?;
        return Ok((rest, Expr::number(format!("-{}", number))));
    }
    parse_primary(input)
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    if let Ok((rest, _)) = sym("(")(input) {
        if peek(kw("select"))(rest).is_ok() {
            let (rest, query) = parse_query(rest)?;
            let (rest, _) = sym(")")(rest)?;
            return Ok((rest, Expr::Subquery(Box::new(query))));
        }
        let (rest, inner) = parse_expr(rest)?;
        let (rest, _) = sym(")")(rest)?;
        return Ok((rest, Expr::Nested(Box::new(inner))));
    }

    alt((
        map(parse_string, |s| Expr::Literal(Literal::String(s))),
        map(parse_number, |n| Expr::Literal(Literal::Number(n))),
        value(Expr::Literal(Literal::Boolean(true)), kw("true")),
        value(Expr::Literal(Literal::Boolean(false)), kw("false")),
        value(Expr::Literal(Literal::Null), kw("null")),
        parse_function_call,
        parse_column,
    ))(input)
}

/// Parse a single-quoted string. `''` and `\'` both yield a quote; other
/// backslash sequences are kept as written.
fn parse_string(input: &str) -> IResult<&str, String> {
    let (input, _) = sp(input)?;
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(nom::Err::Failure(Error::new(input, ErrorKind::Char))),
            Some('\'') if rest[1..].starts_with('\'') => {
                out.push('\'');
                rest = &rest[2..];
            }
            Some('\'') => return Ok((&rest[1..], out)),
            Some('\\') => match chars.next() {
                Some('\'') => {
                    out.push('\'');
                    rest = &rest[2..];
                }
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                    rest = &rest[1 + c.len_utf8()..];
                }
                None => {
                    out.push('\\');
                    rest = &rest[1..];
                }
            },
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// Parse a number (`42`, `1.5`, `1e3`) as written.
fn parse_number(input: &str) -> IResult<&str, String> {
    let (input, _) = sp(input)?;
    let (rest, number) = recognize(tuple((
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    if rest.starts_with(is_ident_char) {
        return fail(input, ErrorKind::Digit);
    }
    Ok((rest, number.to_string()))
}

fn parse_function_call(input: &str) -> IResult<&str, Expr> {
    let (input, _) = sp(input)?;
    let (input, name) = parse_word(input)?;
    let lower = name.to_lowercase();
    if RESERVED.contains(&lower.as_str()) && !FUNCTION_KEYWORDS.contains(&lower.as_str()) {
        return fail(input, ErrorKind::Verify);
    }

    let (input, _) = sym("(")(input)?;
    let (input, distinct) = opt(kw("distinct"))(input)?;
    let (input, args) = parse_function_args(input)?;
    let (input, _) = sym(")")(input)?;

    Ok((
        input,
        Expr::Function(FunctionCall {
            name: name.to_string(),
            args,
            distinct: distinct.is_some(),
        }),
    ))
}

fn parse_function_args(input: &str) -> IResult<&str, Vec<Expr>> {
    if peek(sym(")"))(input).is_ok() {
        return Ok((input, Vec::new()));
    }
    if let Ok((rest, _)) = sym("*")(input) {
        return Ok((rest, vec![Expr::Wildcard(None)]));
    }
    if peek(kw("select"))(input).is_ok() {
        let (rest, query) = parse_query(input)?;
        return Ok((rest, vec![Expr::Subquery(Box::new(query))]));
    }
    comma_list(parse_expr)(input)
}

/// Parse a column reference: `name` or `table.name`.
fn parse_column(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_identifier(input)?;
    if let Ok((rest, name)) = preceded(tag("."), parse_identifier)(input) {
        return Ok((rest, Expr::qualified(first, name)));
    }
    Ok((input, Expr::column(first)))
}

// ============================================================================
// Identifiers
// ============================================================================

fn parse_word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// Parse an identifier: a non-reserved bare word, or any name quoted with
/// backticks or brackets.
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let (input, _) = sp(input)?;
    alt((
        map(delimited(char('`'), is_not("`"), char('`')), |s: &str| {
            s.to_string()
        }),
        map(delimited(char('['), is_not("]"), char(']')), |s: &str| {
            s.to_string()
        }),
        parse_bare_identifier,
    ))(input)
}

fn parse_bare_identifier(input: &str) -> IResult<&str, String> {
    let (rest, word) = parse_word(input)?;
    if RESERVED.contains(&word.to_lowercase().as_str()) {
        return fail(input, ErrorKind::Verify);
    }
    Ok((rest, word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(sql: &str) -> SelectQuery {
        match parse(sql).unwrap() {
            Query::Select(select) => *select,
            other => panic!("expected select, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_select() {
        let q = select("SELECT * FROM users");
        assert_eq!(q.from.unwrap().source, TableSource::table("users"));
        assert_eq!(q.select.unwrap().items, vec![SelectItem::new(Expr::Wildcard(None))]);
    }

    #[test]
    fn test_select_columns_and_aliases() {
        let q = select("select a, b AS bee, upper(c) cee, t.* from t");
        let items = q.select.unwrap().items;
        assert_eq!(items[0], SelectItem::new(Expr::column("a")));
        assert_eq!(items[1], SelectItem::aliased(Expr::column("b"), "bee"));
        assert_eq!(
            items[2],
            SelectItem::aliased(Expr::function("upper", vec![Expr::column("c")]), "cee")
        );
        assert_eq!(items[3], SelectItem::new(Expr::Wildcard(Some("t".to_string()))));
    }

    #[test]
    fn test_where_precedence() {
        let q = select("SELECT a FROM t WHERE a = 1 OR b = 2 AND NOT c = 3");
        assert_eq!(
            q.filter.unwrap(),
            Expr::Or(vec![
                Expr::binary(Expr::column("a"), "=", Expr::number("1")),
                Expr::And(vec![
                    Expr::binary(Expr::column("b"), "=", Expr::number("2")),
                    Expr::Not(Box::new(Expr::binary(Expr::column("c"), "=", Expr::number("3")))),
                ]),
            ])
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        let q = select("SELECT a + b * 2 AS x FROM t");
        let expected = Expr::binary(
            Expr::column("a"),
            "+",
            Expr::binary(Expr::column("b"), "*", Expr::number("2")),
        );
        assert_eq!(q.select.unwrap().items[0].expr, expected);
    }

    #[test]
    fn test_predicates() {
        let q = select(
            "SELECT a FROM t WHERE a BETWEEN 1 AND 5 AND b NOT IN ('x', 'y') \
             AND c NOT LIKE '%z' AND d IS NOT NULL AND e REGEXP '^a'",
        );
        let Some(Expr::And(parts)) = q.filter else {
            panic!("expected AND");
        };
        assert!(matches!(parts[0], Expr::Between { negated: false, .. }));
        assert!(matches!(parts[1], Expr::InList { negated: true, .. }));
        assert!(matches!(parts[2], Expr::Like { negated: true, .. }));
        assert!(matches!(parts[3], Expr::IsNull { negated: true, .. }));
        assert!(matches!(&parts[4], Expr::BinaryOp { op, .. } if op == "regexp"));
    }

    #[test]
    fn test_not_chain() {
        let q = select("SELECT a FROM t WHERE NOT NOT NOT a = 1");
        let mut expr = q.filter.as_ref().unwrap();
        let mut nots = 0;
        while let Expr::Not(inner) = expr {
            nots += 1;
            expr = inner.as_ref();
        }
        assert_eq!(nots, 3);
        assert_eq!(*expr, Expr::binary(Expr::column("a"), "=", Expr::number("1")));
    }

    #[test]
    fn test_long_not_chain_parses_without_recursion() {
        let sql = format!("SELECT a FROM t WHERE {} a = 1", "NOT ".repeat(5_000));
        let q = select(&sql);
        assert!(matches!(q.filter, Some(Expr::Not(_))));
    }

    #[test]
    fn test_in_subquery() {
        let q = select("SELECT a FROM t WHERE a IN (SELECT b FROM u)");
        assert!(matches!(q.filter, Some(Expr::InSubquery { negated: false, .. })));
    }

    #[test]
    fn test_string_escapes() {
        let q = select(r"SELECT a FROM t WHERE a = 'it''s' OR a = 'don\'t' OR a = '\d+'");
        let Some(Expr::Or(parts)) = q.filter else {
            panic!("expected OR");
        };
        assert_eq!(parts[0], Expr::binary(Expr::column("a"), "=", Expr::string("it's")));
        assert_eq!(parts[1], Expr::binary(Expr::column("a"), "=", Expr::string("don't")));
        assert_eq!(parts[2], Expr::binary(Expr::column("a"), "=", Expr::string(r"\d+")));
    }

    #[test]
    fn test_count_forms() {
        let q = select("SELECT count(*), count(DISTINCT a), now() FROM t");
        let items = q.select.unwrap().items;
        assert_eq!(items[0].expr, Expr::function("count", vec![Expr::Wildcard(None)]));
        assert!(matches!(&items[1].expr, Expr::Function(call) if call.distinct));
        assert_eq!(items[2].expr, Expr::function("now", vec![]));
    }

    #[test]
    fn test_left_function_is_not_a_join() {
        let q = select("SELECT left(name, 3) FROM t LEFT JOIN u ON t.id = u.id");
        assert_eq!(q.from.unwrap().joins[0].keyword, "left join");
        assert!(matches!(&q.select.unwrap().items[0].expr, Expr::Function(call) if call.name == "left"));
    }

    #[test]
    fn test_joins() {
        let q = select(
            "SELECT * FROM a x INNER JOIN b y ON x.id = y.id \
             full outer join c USING (k) CROSS JOIN d, e",
        );
        let from = q.from.unwrap();
        assert_eq!(from.source.alias(), Some("x"));
        let keywords: Vec<&str> = from.joins.iter().map(|j| j.keyword.as_str()).collect();
        assert_eq!(
            keywords,
            vec!["inner join", "full outer join", "cross join", "cross join"]
        );
        assert_eq!(from.joins[1].constraint, JoinConstraint::Using(vec!["k".to_string()]));
    }

    #[test]
    fn test_group_order_limit() {
        let q = select("SELECT c, count(*) FROM t GROUP BY c ORDER BY c DESC LIMIT 10");
        assert_eq!(q.group_by, vec![Expr::column("c")]);
        assert_eq!(q.order_by[0].descending, Some(true));
        assert_eq!(q.limit, Some(10));
    }

    #[test]
    fn test_union() {
        let query = parse("SELECT a FROM t1 UNION ALL SELECT a FROM t2 UNION SELECT a FROM t3").unwrap();
        let Query::Union { all, left, .. } = query else {
            panic!("expected union");
        };
        assert!(!all);
        assert!(matches!(*left, Query::Union { all: true, .. }));
    }

    #[test]
    fn test_comments_and_quoted_identifiers() {
        let q = select("SELECT `select`, [first name] -- trailing\nFROM t");
        let items = q.select.unwrap().items;
        assert_eq!(items[0].expr, Expr::column("select"));
        assert_eq!(items[1].expr, Expr::column("first name"));
    }

    #[test]
    fn test_trailing_content_error() {
        let err = parse("SELECT a FROM t garbage here").unwrap_err();
        assert!(matches!(err, KqlError::Parse { .. }));
        assert!(err.to_string().contains("here"));
    }

    #[test]
    fn test_unsupported_constructs_are_named() {
        for (sql, word) in [
            ("SELECT c FROM t GROUP BY c HAVING count(*) > 1", "HAVING"),
            ("SELECT a FROM t LIMIT 5 OFFSET 10", "OFFSET"),
            ("SELECT CASE WHEN a = 1 THEN 2 END FROM t", "CASE"),
            ("SELECT CAST(a AS int) FROM t", "CAST"),
        ] {
            let err = parse(sql).unwrap_err();
            let KqlError::Parse { position, message } = &err else {
                panic!("expected parse error for {}", sql);
            };
            assert!(message.contains(word), "{}: {}", sql, message);
            assert_eq!(&sql[*position..*position + word.len()].to_uppercase(), word);
        }
    }

    #[test]
    fn test_incomplete_query() {
        let err = parse("SELECT a FROM").unwrap_err();
        assert!(matches!(err, KqlError::Parse { position: 13, .. }));
    }
}
