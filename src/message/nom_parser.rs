//! Nom-based line splitter.
//!
//! Splits one protocol line into borrowed tag block, prefix, command and
//! params. Decoding (tag unescaping, source splitting, command kinds) happens
//! in [`super::types`].

use nom::{
    bytes::complete::{take_till1, take_until, take_while},
    character::complete::char,
    error::{context, VerboseError},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse the tag block (the part after `@` and before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context("parsing message tags", preceded(char('@'), take_until(" ")))(input)
}

/// Parse the message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while(|c| c != ' ')),
    )(input)
}

/// Parse the command token.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context("parsing command", take_till1(|c| c == ' '))(input)
}

/// Skip a run of spaces. Tabs are not separators.
fn skip_spaces(input: &str) -> &str {
    match take_while::<_, &str, VerboseError<&str>>(|c| c == ' ')(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

/// Borrowed pieces of one protocol line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawParts<'a> {
    /// Tag block without the leading `@`.
    pub tags: Option<&'a str>,
    /// Prefix without the leading `:`.
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    /// Params, the trailing one (if any) last and without its colon.
    pub params: Vec<&'a str>,
}

/// Split a line into its parts.
///
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
pub(crate) fn split_line(line: &str) -> Result<RawParts<'_>, MessageParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let (rest, tags) = if line.starts_with('@') {
        match parse_tags(line) {
            Ok((rest, tags)) => (rest, Some(tags)),
            Err(_) => return Err(MessageParseError::PartialMessage),
        }
    } else {
        (line, None)
    };

    let rest = skip_spaces(rest);
    if rest.is_empty() {
        return Err(if tags.is_some() {
            MessageParseError::PartialMessage
        } else {
            MessageParseError::EmptyMessage
        });
    }

    let (rest, prefix) = match parse_prefix(rest) {
        Ok((rest, prefix)) => (skip_spaces(rest), Some(prefix)),
        Err(_) => (rest, None),
    };

    let (mut rest, command) =
        parse_command(rest).map_err(|_| MessageParseError::NoCommand)?;

    let mut params = Vec::new();
    loop {
        rest = skip_spaces(rest);
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    Ok(RawParts {
        tags,
        prefix,
        command,
        params,
    })
}
