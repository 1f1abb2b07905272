//! # Polymorphic Attribute Values
//!
//! Every table column holds one [`Value`] variant; [`ColumnType`] is the
//! schema-side classification. One value enum serves all tables, so the
//! engine is generic over schemas instead of duplicating per-table code.
//!
//! ## Text form
//!
//! `to_text`/`parse` define the canonical token form used inside XML row
//! elements and for fingerprinting. Enumerations are carried by literal name,
//! never by ordinal. Sequences use one framing convention everywhere: rank,
//! then one extent per dimension, then row-major values, space-separated
//! (`"1 3 0 0 0"` for a 3-vector, `"2 2 2 a b c d"` for a 2x2 matrix).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ArrayTime, Tag};

/// Schema-side classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Text,
    Time,
    Tag,
    Enum,
    IntSeq,
    DoubleSeq,
    DoubleMat,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Bool => "Bool",
            ColumnType::Byte => "Byte",
            ColumnType::Short => "Short",
            ColumnType::Int => "Int",
            ColumnType::Long => "Long",
            ColumnType::Float => "Float",
            ColumnType::Double => "Double",
            ColumnType::Text => "Text",
            ColumnType::Time => "Time",
            ColumnType::Tag => "Tag",
            ColumnType::Enum => "Enum",
            ColumnType::IntSeq => "IntSeq",
            ColumnType::DoubleSeq => "DoubleSeq",
            ColumnType::DoubleMat => "DoubleMat",
        }
    }
}

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Time(ArrayTime),
    Tag(Tag),
    /// An enumerated value, carried by literal name.
    Enum(String),
    IntSeq(Vec<i32>),
    DoubleSeq(Vec<f64>),
    DoubleMat(Vec<Vec<f64>>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Bool(_) => ColumnType::Bool,
            Value::Byte(_) => ColumnType::Byte,
            Value::Short(_) => ColumnType::Short,
            Value::Int(_) => ColumnType::Int,
            Value::Long(_) => ColumnType::Long,
            Value::Float(_) => ColumnType::Float,
            Value::Double(_) => ColumnType::Double,
            Value::Text(_) => ColumnType::Text,
            Value::Time(_) => ColumnType::Time,
            Value::Tag(_) => ColumnType::Tag,
            Value::Enum(_) => ColumnType::Enum,
            Value::IntSeq(_) => ColumnType::IntSeq,
            Value::DoubleSeq(_) => ColumnType::DoubleSeq,
            Value::DoubleMat(_) => ColumnType::DoubleMat,
        }
    }

    /// The default value a fresh row carries for a column of this type.
    pub fn default_for(ctype: ColumnType) -> Value {
        match ctype {
            ColumnType::Bool => Value::Bool(false),
            ColumnType::Byte => Value::Byte(0),
            ColumnType::Short => Value::Short(0),
            ColumnType::Int => Value::Int(0),
            ColumnType::Long => Value::Long(0),
            ColumnType::Float => Value::Float(0.0),
            ColumnType::Double => Value::Double(0.0),
            ColumnType::Text => Value::Text(String::new()),
            ColumnType::Time => Value::Time(ArrayTime(0)),
            ColumnType::Tag => Value::Tag(Tag::default()),
            ColumnType::Enum => Value::Enum(String::new()),
            ColumnType::IntSeq => Value::IntSeq(Vec::new()),
            ColumnType::DoubleSeq => Value::DoubleSeq(Vec::new()),
            ColumnType::DoubleMat => Value::DoubleMat(Vec::new()),
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Value::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<ArrayTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical token form. Round-trips through [`Value::parse`] exactly
    /// (float formatting uses the shortest representation that re-parses to
    /// the same bits).
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Time(t) => t.to_string(),
            Value::Tag(t) => t.to_string(),
            Value::Enum(name) => name.clone(),
            Value::IntSeq(seq) => {
                let mut out = format!("1 {}", seq.len());
                for v in seq {
                    out.push(' ');
                    out.push_str(&v.to_string());
                }
                out
            }
            Value::DoubleSeq(seq) => {
                let mut out = format!("1 {}", seq.len());
                for v in seq {
                    out.push(' ');
                    out.push_str(&v.to_string());
                }
                out
            }
            Value::DoubleMat(mat) => {
                let cols = mat.first().map_or(0, Vec::len);
                let mut out = format!("2 {} {}", mat.len(), cols);
                for line in mat {
                    for v in line {
                        out.push(' ');
                        out.push_str(&v.to_string());
                    }
                }
                out
            }
        }
    }

    /// Parse the token form back into a value of the given type.
    pub fn parse(ctype: ColumnType, text: &str) -> Result<Value> {
        let text = text.trim();
        let bad = || Error::conversion(format!("invalid {} value '{}'", ctype.name(), text));
        Ok(match ctype {
            ColumnType::Bool => Value::Bool(text.parse().map_err(|_| bad())?),
            ColumnType::Byte => Value::Byte(text.parse().map_err(|_| bad())?),
            ColumnType::Short => Value::Short(text.parse().map_err(|_| bad())?),
            ColumnType::Int => Value::Int(text.parse().map_err(|_| bad())?),
            ColumnType::Long => Value::Long(text.parse().map_err(|_| bad())?),
            ColumnType::Float => Value::Float(text.parse().map_err(|_| bad())?),
            ColumnType::Double => Value::Double(text.parse().map_err(|_| bad())?),
            ColumnType::Text => Value::Text(text.to_string()),
            ColumnType::Time => Value::Time(ArrayTime(text.parse().map_err(|_| bad())?)),
            ColumnType::Tag => Value::Tag(text.parse()?),
            ColumnType::Enum => {
                if text.is_empty() {
                    return Err(bad());
                }
                Value::Enum(text.to_string())
            }
            ColumnType::IntSeq => {
                let (len, tokens) = parse_seq_header(text, 1)?;
                Value::IntSeq(parse_tokens(tokens, len, bad)?)
            }
            ColumnType::DoubleSeq => {
                let (len, tokens) = parse_seq_header(text, 1)?;
                Value::DoubleSeq(parse_tokens(tokens, len, bad)?)
            }
            ColumnType::DoubleMat => {
                let mut tokens = text.split_ascii_whitespace();
                expect_rank(&mut tokens, 2, text)?;
                let rows = parse_extent(&mut tokens, text)?;
                let cols = parse_extent(&mut tokens, text)?;
                let mut mat = Vec::with_capacity(rows);
                for _ in 0..rows {
                    let line: Vec<f64> = parse_tokens(tokens.by_ref().take(cols), cols, bad)?;
                    mat.push(line);
                }
                if tokens.next().is_some() {
                    return Err(bad());
                }
                Value::DoubleMat(mat)
            }
        })
    }
}

fn expect_rank<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    rank: usize,
    text: &str,
) -> Result<()> {
    match tokens.next().and_then(|t| t.parse::<usize>().ok()) {
        Some(r) if r == rank => Ok(()),
        _ => Err(Error::conversion(format!(
            "expected rank-{} sequence, got '{}'",
            rank, text
        ))),
    }
}

fn parse_extent<'a>(tokens: &mut impl Iterator<Item = &'a str>, text: &str) -> Result<usize> {
    tokens
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| Error::conversion(format!("missing sequence extent in '{}'", text)))
}

fn parse_seq_header(text: &str, rank: usize) -> Result<(usize, std::str::SplitAsciiWhitespace<'_>)> {
    let mut tokens = text.split_ascii_whitespace();
    expect_rank(&mut tokens, rank, text)?;
    let len = parse_extent(&mut tokens, text)?;
    Ok((len, tokens))
}

fn parse_tokens<'a, T: std::str::FromStr>(
    tokens: impl Iterator<Item = &'a str>,
    expected: usize,
    bad: impl Fn() -> Error,
) -> Result<Vec<T>> {
    let parsed: Vec<T> = tokens
        .map(|t| t.parse::<T>().map_err(|_| bad()))
        .collect::<Result<_>>()?;
    if parsed.len() != expected {
        return Err(bad());
    }
    Ok(parsed)
}
