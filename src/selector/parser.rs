//! Selector Parser
//!
//! Parses selector text into an ordered list of terms.
//!
//! # Supported Syntax
//!
//! ```text
//! selector := term (op term)*
//! op       := '-' | '|' | '&' | '^'
//! term     := '/' regex '/' flags?      -- whole-name regex, \/ escapes a slash
//!           | '"' name '"'              -- exact name, "" escapes a quote
//!           | '`' group '`'             -- saved group regex
//! flags    := 'i'
//! ```
//!
//! Whitespace between tokens is insignificant. There is no nesting and no
//! precedence.

use nom::{
    branch::alt,
    character::complete::{char, multispace0},
    combinator::{cut, map, value},
    error::{Error as NomError, ErrorKind},
    multi::many0,
    sequence::{pair, preceded},
    IResult, Parser,
};

use super::{RegexLiteral, Selector, SetOp, TermSource};
use crate::error::{EvalError, EvalResult};

/// Longest token echoed back in a syntax error
const MAX_ERROR_TOKEN_LEN: usize = 32;

/// Parse selector text into a [`Selector`]
pub fn parse_selector(text: &str) -> EvalResult<Selector> {
    match preceded(multispace0, selector).parse(text) {
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

/// Build a syntax error pointing at `rest`, a suffix of `full`
pub(crate) fn syntax_error(full: &str, rest: &str) -> EvalError {
    let position = full.len().saturating_sub(rest.len());
    let near = match rest.split_whitespace().next() {
        None => "end of query".to_string(),
        Some(token) if token.chars().count() > MAX_ERROR_TOKEN_LEN => {
            let truncated: String = token.chars().take(MAX_ERROR_TOKEN_LEN).collect();
            format!("'{}...'", truncated)
        },
        Some(token) => format!("'{}'", token),
    };
    EvalError::Syntax { position, near }
}

// ============================================================================
// Selector
// ============================================================================

/// Parse a selector; once an operator is read the following term is required
pub(crate) fn selector(input: &str) -> IResult<&str, Selector> {
    let (input, first) = term_source(input)?;
    let (input, rest) = many0(pair(
        preceded(multispace0, set_op),
        preceded(multispace0, cut(term_source)),
    ))
    .parse(input)?;
    Ok((input, Selector::new(first, rest)))
}

/// Parse a set operator
fn set_op(input: &str) -> IResult<&str, SetOp> {
    alt((
        value(SetOp::Difference, char('-')),
        value(SetOp::Union, char('|')),
        value(SetOp::Intersect, char('&')),
        value(SetOp::SymmetricDifference, char('^')),
    ))
    .parse(input)
}

/// Parse a single term source
fn term_source(input: &str) -> IResult<&str, TermSource> {
    alt((
        map(regex_literal, TermSource::Regex),
        map(quoted_name, TermSource::Name),
        map(group_ref, TermSource::Group),
    ))
    .parse(input)
}

// ============================================================================
// Term Literals
// ============================================================================

/// Parse `/body/flags`
pub(crate) fn regex_literal(input: &str) -> IResult<&str, RegexLiteral> {
    let Some(after_open) = input.strip_prefix('/') else {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
    };

    let mut body = String::new();
    let mut chars = after_open.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '/')) => body.push('/'),
                Some((_, escaped)) => {
                    body.push('\\');
                    body.push(escaped);
                },
                None => break,
            },
            '/' => {
                let after_close = &after_open[idx + 1..];
                let flags_len = after_close
                    .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
                    .unwrap_or(after_close.len());

                let mut case_insensitive = false;
                for (offset, flag) in after_close[..flags_len].char_indices() {
                    match flag {
                        'i' => case_insensitive = true,
                        _ => {
                            return Err(nom::Err::Failure(NomError::new(
                                &after_close[offset..],
                                ErrorKind::Verify,
                            )))
                        },
                    }
                }

                return Ok((
                    &after_close[flags_len..],
                    RegexLiteral {
                        body,
                        case_insensitive,
                    },
                ));
            },
            other => body.push(other),
        }
    }

    // Unterminated literal
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}

/// Parse `"name"` where `""` stands for one quote
pub(crate) fn quoted_name(input: &str) -> IResult<&str, String> {
    let Some(mut rest) = input.strip_prefix('"') else {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
    };

    let mut name = String::new();
    loop {
        let Some(pos) = rest.find('"') else {
            return Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)));
        };
        name.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        match rest.strip_prefix('"') {
            Some(after_escape) => {
                name.push('"');
                rest = after_escape;
            },
            None => return Ok((rest, name)),
        }
    }
}

/// Parse `` `group` ``
pub(crate) fn group_ref(input: &str) -> IResult<&str, String> {
    let Some(after_open) = input.strip_prefix('`') else {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
    };

    match after_open.find('`') {
        Some(0) | None => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char))),
        Some(pos) => Ok((&after_open[pos + 1..], after_open[..pos].to_string())),
    }
}
