//! Plain-text parameter blocks.
//!
//! The configuration format is `key = value` lines with `#` comments and
//! `{}` grouping for nested blocks:
//!
//! ```text
//! model = ar
//! acf = {
//!     func = standing_wave
//!     grid = (10,10,10):(2.5,5,5)
//! }
//! ```
//!
//! Numeric vectors are parenthesized and space- or comma-separated.
//! Consumers walk the tree with an explicit key whitelist; unknown keys
//! fail loudly before any heavy computation.

use std::str::FromStr;

use swell_core::{Real, SwellError, SwellResult};

/// A parsed value: a scalar line or a nested block.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Block(Params),
}

/// An ordered set of `key = value` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn parse(text: &str) -> SwellResult<Params> {
        let mut chars = text.char_indices().peekable();
        let params = parse_entries(text, &mut chars, false)?;
        Ok(params)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The scalar value of `key`, if present.
    pub fn scalar(&self, key: &str) -> SwellResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Scalar(s)) => Ok(Some(s.as_str())),
            Some(Value::Block(_)) => Err(SwellError::Config(format!(
                "parameter \"{key}\" is a block, expected a value"
            ))),
        }
    }

    /// The scalar value of `key`; missing keys are an error.
    pub fn require(&self, key: &str) -> SwellResult<&str> {
        self.scalar(key)?.ok_or_else(|| {
            SwellError::Config(format!("missing required parameter \"{key}\""))
        })
    }

    pub fn block(&self, key: &str) -> SwellResult<Option<&Params>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Block(b)) => Ok(Some(b)),
            Some(Value::Scalar(_)) => Err(SwellError::Config(format!(
                "parameter \"{key}\" is a value, expected a {{...}} block"
            ))),
        }
    }

    /// Parse the scalar at `key` with its `FromStr`, defaulting when absent.
    pub fn parse_or<T>(&self, key: &str, default: T) -> SwellResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.scalar(key)? {
            None => Ok(default),
            Some(s) => s.trim().parse().map_err(|err| {
                SwellError::Config(format!("bad value for \"{key}\": \"{s}\" ({err})"))
            }),
        }
    }

    pub fn parse_opt<T>(&self, key: &str) -> SwellResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.scalar(key)? {
            None => Ok(None),
            Some(s) => s.trim().parse().map(Some).map_err(|err| {
                SwellError::Config(format!("bad value for \"{key}\": \"{s}\" ({err})"))
            }),
        }
    }

    /// Reject any key outside the given whitelist.
    pub fn expect_keys(&self, known: &[&str]) -> SwellResult<()> {
        for key in self.keys() {
            if !known.contains(&key) {
                return Err(SwellError::Config(format!(
                    "unknown parameter \"{key}\"; recognized keys: {}",
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Parse a parenthesized numeric vector `(a, b, c)` or `(a b c)` of fixed
/// length.
pub fn parse_vector<const N: usize>(s: &str) -> SwellResult<[Real; N]> {
    let bad = || SwellError::Config(format!("bad vector: \"{s}\""));
    let inner = s
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(bad)?;
    let values: Vec<Real> = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<Real>().map_err(|_| bad()))
        .collect::<SwellResult<_>>()?;
    if values.len() != N {
        return Err(bad());
    }
    let mut out = [0.0; N];
    out.copy_from_slice(&values);
    Ok(out)
}

/// Like [`parse_vector`] for integer shape vectors.
pub fn parse_shape<const N: usize>(s: &str) -> SwellResult<[usize; N]> {
    let values = parse_vector::<N>(s)?;
    let mut out = [0usize; N];
    for (dst, v) in out.iter_mut().zip(values) {
        if v < 0.0 || v.fract() != 0.0 {
            return Err(SwellError::Config(format!("bad shape: \"{s}\"")));
        }
        *dst = v as usize;
    }
    Ok(out)
}

type CharStream<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws_and_comments(chars: &mut CharStream<'_>) {
    loop {
        match chars.peek() {
            Some((_, c)) if c.is_whitespace() => {
                chars.next();
            }
            Some((_, '#')) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => break,
        }
    }
}

fn parse_entries(
    text: &str,
    chars: &mut CharStream<'_>,
    in_block: bool,
) -> SwellResult<Params> {
    let mut entries = Vec::new();
    loop {
        skip_ws_and_comments(chars);
        match chars.peek().copied() {
            None => {
                if in_block {
                    return Err(SwellError::Config("missing closing \"}\"".into()));
                }
                break;
            }
            Some((_, '}')) if in_block => {
                chars.next();
                break;
            }
            Some((start, _)) => {
                // key up to '='
                let mut key_end = start;
                let mut found_eq = false;
                for (idx, c) in chars.by_ref() {
                    if c == '=' {
                        key_end = idx;
                        found_eq = true;
                        break;
                    }
                    if c == '\n' {
                        return Err(SwellError::Config(format!(
                            "expected \"=\" after \"{}\"",
                            text[start..idx].trim()
                        )));
                    }
                }
                if !found_eq {
                    return Err(SwellError::Config(format!(
                        "expected \"=\" after \"{}\"",
                        text[start..].trim()
                    )));
                }
                let key = text[start..key_end].trim().to_string();
                if key.is_empty() {
                    return Err(SwellError::Config("empty parameter name".into()));
                }
                skip_ws_and_comments(chars);
                let value = match chars.peek().copied() {
                    Some((_, '{')) => {
                        chars.next();
                        Value::Block(parse_entries(text, chars, true)?)
                    }
                    _ => {
                        let value_start = chars.peek().map(|(i, _)| *i).unwrap_or(text.len());
                        let mut value_end = text.len();
                        while let Some((idx, c)) = chars.peek().copied() {
                            if c == '\n' || (in_block && c == '}') {
                                value_end = idx;
                                break;
                            }
                            chars.next();
                        }
                        if chars.peek().is_none() {
                            value_end = text.len();
                        }
                        Value::Scalar(text[value_start..value_end].trim().to_string())
                    }
                };
                entries.push((key, value));
            }
        }
    }
    Ok(Params { entries })
}
