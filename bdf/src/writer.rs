//! This module writes cards back out in the small fixed-field format.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::util::*;

/// Number of data fields per written line.
const FIELDS_PER_LINE: usize = 8;

/// A value to be written into a card field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum CardField {
  /// A blank field.
  Blank,
  /// An integer, right-justified.
  Int(i32),
  /// A real, squeezed into the field.
  Real(f64)
}

impl From<i32> for CardField {
  fn from(value: i32) -> Self {
    return Self::Int(value);
  }
}

impl From<f64> for CardField {
  fn from(value: f64) -> Self {
    return Self::Real(value);
  }
}

impl From<Option<i32>> for CardField {
  fn from(value: Option<i32>) -> Self {
    return value.map_or(Self::Blank, Self::Int);
  }
}

impl Display for CardField {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Blank => write!(f, "{:8}", ""),
      Self::Int(x) => write!(f, "{:>8}", x),
      Self::Real(x) => write!(f, "{:>8}", fmt_real_8(*x)),
    };
  }
}

/// An integer field that's left blank when it holds its default value.
pub fn blank_if_default(value: i32, default: i32) -> CardField {
  return if value == default {
    CardField::Blank
  } else {
    CardField::Int(value)
  };
}

/// Writes out a card in small-field format. The name goes left-justified in
/// the first field; continuation lines start with a blank field. Each line is
/// right-trimmed and terminated with a newline. An integer too wide for its
/// field is an error.
pub fn print_card_8<S: AsRef<str>>(
  name: S,
  fields: &[CardField]
) -> BdfResult<String> {
  let mut out = String::new();
  let head = format!("{:<8}", name.as_ref());
  if fields.is_empty() {
    out.push_str(head.trim_end());
    out.push('\n');
  }
  for (k, chunk) in fields.chunks(FIELDS_PER_LINE).enumerate() {
    let mut line = if k == 0 { head.clone() } else { format!("{:8}", "") };
    for field in chunk {
      let text = field.to_string();
      if text.len() > SMALL_FIELD {
        return Err(BdfError::FieldTooWide {
          card: name.as_ref().to_owned(),
          value: text.trim().to_owned()
        });
      }
      line.push_str(&text);
    }
    out.push_str(line.trim_end());
    out.push('\n');
  }
  return Ok(out);
}
