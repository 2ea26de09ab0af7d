//! Statement Parser
//!
//! Parses statement text into a [`Statement`]. Selector parsing is shared
//! with [`crate::selector::parser`].
//!
//! ```text
//! filter    := and_expr ('or' and_expr)*
//! and_expr  := condition ('and' condition)*
//! condition := '(' filter ')'
//!            | 'name' ('~' | '!~') regex
//!            | 'name' cmp '"' name '"'
//!            | 'length' cmp integer
//!            | 'type' ('==' | '!=') ('integer' | 'float' | 'string')
//! cmp       := '==' | '!=' | '<' | '<=' | '>' | '>='
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{cut, map, map_res, opt, value},
    error::{Error as NomError, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
    IResult, Parser,
};

use super::{Column, Statement};
use crate::error::EvalResult;
use crate::selector::parser::{group_ref, quoted_name, regex_literal, selector, syntax_error};
use crate::selector::{CompareOp, Condition, PropertyFilter};
use crate::types::SeriesType;

/// Parse a statement
pub fn parse_statement(text: &str) -> EvalResult<Statement> {
    match preceded(multispace0, statement).parse(text) {
        Ok((rest, parsed)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(syntax_error(text, rest))
            }
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(text, e.input)),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(text, "")),
    }
}

// ============================================================================
// Top-level Parser
// ============================================================================

fn statement(input: &str) -> IResult<&str, Statement> {
    alt((
        list_series,
        count_series,
        alter_database,
        show_list_limit,
        create_group,
        drop_group,
        list_groups,
    ))
    .parse(input)
}

/// Parse `list series [columns] [selector] [where filter] [limit N]`
fn list_series(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("list"), multispace1, keyword("series")).parse(input)?;
    let (input, columns) = opt(preceded(multispace1, column_list)).parse(input)?;
    let (input, selector) = opt(preceded(multispace0, selector)).parse(input)?;
    let (input, filter) = opt(preceded(multispace0, where_clause)).parse(input)?;
    let (input, limit) = opt(preceded(multispace0, limit_clause)).parse(input)?;

    Ok((
        input,
        Statement::ListSeries {
            columns: columns.unwrap_or_default(),
            selector,
            filter,
            limit,
        },
    ))
}

/// Parse `count series [selector] [where filter]`
fn count_series(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("count"), multispace1, keyword("series")).parse(input)?;
    let (input, selector) = opt(preceded(multispace0, selector)).parse(input)?;
    let (input, filter) = opt(preceded(multispace0, where_clause)).parse(input)?;
    Ok((input, Statement::CountSeries { selector, filter }))
}

/// Parse `alter database set list_limit N`
fn alter_database(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("alter"), multispace1, keyword("database"), multispace1).parse(input)?;
    let (input, (_, _, _, _, limit)) = cut((
        keyword("set"),
        multispace1,
        keyword("list_limit"),
        multispace1,
        number,
    ))
    .parse(input)?;
    Ok((input, Statement::AlterListLimit(limit)))
}

/// Parse `show list_limit`
fn show_list_limit(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("show"), multispace1).parse(input)?;
    let (input, _) = cut(keyword("list_limit")).parse(input)?;
    Ok((input, Statement::ShowListLimit))
}

/// Parse ``create group `name` for /regex/``
fn create_group(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("create"), multispace1, keyword("group"), multispace1).parse(input)?;
    let (input, (name, _, _, _, expression)) = cut((
        group_ref,
        multispace1,
        keyword("for"),
        multispace1,
        regex_literal,
    ))
    .parse(input)?;
    Ok((input, Statement::CreateGroup { name, expression }))
}

/// Parse ``drop group `name` ``
fn drop_group(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("drop"), multispace1, keyword("group"), multispace1).parse(input)?;
    let (input, name) = cut(group_ref).parse(input)?;
    Ok((input, Statement::DropGroup(name)))
}

/// Parse `list groups`
fn list_groups(input: &str) -> IResult<&str, Statement> {
    let (input, _) = (keyword("list"), multispace1, keyword("groups")).parse(input)?;
    Ok((input, Statement::ListGroups))
}

// ============================================================================
// Clauses
// ============================================================================

/// Parse `name, type, length`
fn column_list(input: &str) -> IResult<&str, Vec<Column>> {
    separated_list1((multispace0, char(','), multispace0), column).parse(input)
}

fn column(input: &str) -> IResult<&str, Column> {
    alt((
        value(Column::Name, keyword("name")),
        value(Column::Type, keyword("type")),
        value(Column::Length, keyword("length")),
    ))
    .parse(input)
}

/// Parse `limit N`; once `limit` is read a number is required
fn limit_clause(input: &str) -> IResult<&str, u64> {
    let (input, _) = (keyword("limit"), multispace1).parse(input)?;
    cut(number).parse(input)
}

// ============================================================================
// Where Clause
// ============================================================================

/// Parse `where filter`; once `where` is read a filter is required
fn where_clause(input: &str) -> IResult<&str, PropertyFilter> {
    let (input, _) = (keyword("where"), multispace0).parse(input)?;
    cut(filter_expr).parse(input)
}

fn filter_expr(input: &str) -> IResult<&str, PropertyFilter> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        (multispace0, keyword("or"), multispace0),
        cut(and_expr),
    ))
    .parse(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| PropertyFilter::Or(Box::new(lhs), Box::new(rhs))),
    ))
}

fn and_expr(input: &str) -> IResult<&str, PropertyFilter> {
    let (input, first) = condition(input)?;
    let (input, rest) = many0(preceded(
        (multispace0, keyword("and"), multispace0),
        cut(condition),
    ))
    .parse(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |lhs, rhs| PropertyFilter::And(Box::new(lhs), Box::new(rhs))),
    ))
}

fn condition(input: &str) -> IResult<&str, PropertyFilter> {
    alt((
        preceded(
            char('('),
            cut(delimited(multispace0, filter_expr, (multispace0, char(')')))),
        ),
        map(name_condition, PropertyFilter::Condition),
        map(length_condition, PropertyFilter::Condition),
        map(type_condition, PropertyFilter::Condition),
    ))
    .parse(input)
}

/// Parse `name ~ /regex/`, `name !~ /regex/` or `name <cmp> "value"`
fn name_condition(input: &str) -> IResult<&str, Condition> {
    let (input, _) = (keyword("name"), multispace0).parse(input)?;
    cut(alt((
        map(
            (match_op, multispace0, regex_literal),
            |(negate, _, literal)| Condition::NameMatches { literal, negate },
        ),
        map((compare_op, multispace0, quoted_name), |(op, _, value)| {
            Condition::Name { op, value }
        }),
    )))
    .parse(input)
}

/// Parse `length <cmp> N`
fn length_condition(input: &str) -> IResult<&str, Condition> {
    let (input, _) = (keyword("length"), multispace0).parse(input)?;
    let (input, (op, _, value)) = cut((compare_op, multispace0, number)).parse(input)?;
    Ok((input, Condition::Length { op, value }))
}

/// Parse `type == t` or `type != t`
fn type_condition(input: &str) -> IResult<&str, Condition> {
    let (input, _) = (keyword("type"), multispace0).parse(input)?;
    let (input, (negate, _, series_type)) = cut((
        alt((value(false, tag("==")), value(true, tag("!=")))),
        multispace0,
        alt((
            value(SeriesType::Integer, keyword("integer")),
            value(SeriesType::Float, keyword("float")),
            value(SeriesType::String, keyword("string")),
        )),
    ))
    .parse(input)?;
    Ok((
        input,
        Condition::Type {
            series_type,
            negate,
        },
    ))
}

/// Parse `~` or `!~`, returning whether the match is negated
fn match_op(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag("!~")), value(false, tag("~")))).parse(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))
    .parse(input)
}

/// Parse a non-negative integer
fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>()).parse(input)
}

/// Match a keyword not directly followed by another word character
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, word) = tag(kw).parse(input)?;
        if rest.starts_with(is_word_char) {
            Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)))
        } else {
            Ok((rest, word))
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
