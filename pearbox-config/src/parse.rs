//! Line-level lexer for `key = value` configuration files.

use snafu::{OptionExt, Snafu, ensure};

/// Errors when parsing configuration text.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ParseError {
    #[snafu(display("line {line}: expected `key = value`"))]
    MissingEquals { line: usize },

    #[snafu(display("line {line}: invalid key `{key}`"))]
    InvalidKey { line: usize, key: String },

    #[snafu(display("line {line}: unknown key `{key}`"))]
    UnknownKey { line: usize, key: String },

    #[snafu(display("line {line}: `{key}` is set more than once"))]
    DuplicateKey { line: usize, key: String },

    #[snafu(display("line {line}: `{key}` expects a string"))]
    ExpectedString { line: usize, key: String },

    #[snafu(display("line {line}: `{key}` expects an integer"))]
    ExpectedInteger { line: usize, key: String },

    #[snafu(display("line {line}: invalid integer `{value}`"))]
    InvalidInteger { line: usize, value: String },

    #[snafu(display("line {line}: unterminated string"))]
    UnterminatedString { line: usize },

    #[snafu(display("line {line}: unexpected `{rest}` after value"))]
    TrailingCharacters { line: usize, rest: String },
}

/// A right-hand side value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    String(String),
    Integer(u32),
}

/// One `key = value` entry with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<'a> {
    pub line: usize,
    pub key: &'a str,
    pub value: Value,
}

impl Entry<'_> {
    pub fn into_string(self) -> Result<String, ParseError> {
        match self.value {
            Value::String(s) => Ok(s),
            Value::Integer(_) => ExpectedStringSnafu {
                line: self.line,
                key: self.key,
            }
            .fail(),
        }
    }

    pub fn into_integer(self) -> Result<u32, ParseError> {
        match self.value {
            Value::Integer(v) => Ok(v),
            Value::String(_) => ExpectedIntegerSnafu {
                line: self.line,
                key: self.key,
            }
            .fail(),
        }
    }
}

/// Splits `text` into entries, skipping blank lines and comments.
pub(crate) fn entries(text: &str) -> impl Iterator<Item = Result<Entry<'_>, ParseError>> {
    text.lines()
        .enumerate()
        .filter_map(|(index, raw)| parse_line(index + 1, raw).transpose())
}

fn parse_line(line: usize, raw: &str) -> Result<Option<Entry<'_>>, ParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (key, rhs) = trimmed.split_once('=').context(MissingEqualsSnafu { line })?;
    let key = key.trim();

    ensure!(
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'),
        InvalidKeySnafu { line, key }
    );

    let rhs = rhs.trim_start();
    let (value, rest) = match rhs.strip_prefix('"') {
        Some(quoted) => {
            let (s, rest) = parse_string(line, quoted)?;
            (Value::String(s), rest)
        }
        None => {
            let end = rhs
                .find(|c: char| c.is_whitespace() || c == '#')
                .unwrap_or(rhs.len());
            let (token, rest) = rhs.split_at(end);
            (Value::Integer(parse_integer(line, token)?), rest)
        }
    };

    let rest = rest.trim();
    ensure!(
        rest.is_empty() || rest.starts_with('#'),
        TrailingCharactersSnafu { line, rest }
    );

    Ok(Some(Entry { line, key, value }))
}

/// Parses the body of a quoted string, returning it and the text after the
/// closing quote.
fn parse_string(line: usize, body: &str) -> Result<(String, &str), ParseError> {
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c => out.push(c),
        }
    }

    UnterminatedStringSnafu { line }.fail()
}

/// Parses a decimal, `0x` or `$` prefixed hexadecimal integer.
fn parse_integer(line: usize, token: &str) -> Result<u32, ParseError> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .or_else(|| token.strip_prefix('$'));

    let parsed = match hex {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => token.parse::<u32>(),
    };

    parsed.map_err(|_| {
        InvalidIntegerSnafu {
            line,
            value: token,
        }
        .build()
    })
}

/// Quotes `value` for writing on a single line.
///
/// `"` and `\` are backslash-escaped; line breaks and tabs become `\n`,
/// `\r` and `\t`.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);

    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');

    out
}
