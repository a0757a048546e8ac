//! This module breaks bulk data lines into fields, assembles them into cards,
//! and implements the typed field extractors that tables use to read them.
//!
//! Field indexes follow the legacy layout: the card name is field 0, the
//! first data field is field 1, and continuations carry on from field 9 (or
//! from wherever the previous line ended, for free-field cards).

use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::util::*;

/// Number of data fields in a small-field line.
const SMALL_DATA_FIELDS: usize = 8;

/// Number of data fields in a large-field line.
const LARGE_DATA_FIELDS: usize = 4;

/// A single bulk data card, possibly assembled from several lines.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BdfCard {
  /// The fields; field 0 is the upper-case card name, blanks are `None`.
  fields: Vec<Option<String>>
}

/// Returns the character-indexed slice [from, to) of a line, clamped.
fn columns(line: &str, from: usize, to: usize) -> &str {
  let start = line.char_indices().nth(from).map_or(line.len(), |(i, _)| i);
  let end = line.char_indices().nth(to).map_or(line.len(), |(i, _)| i);
  return &line[start..end];
}

/// Turns raw text into a field: trimmed, and `None` if empty.
fn to_field(s: &str) -> Option<String> {
  let t = s.trim();
  return if t.is_empty() { None } else { Some(t.to_owned()) };
}

/// Strips a `$` comment from a line.
pub(crate) fn strip_comment(line: &str) -> &str {
  return match line.find('$') {
    Some(i) => &line[..i],
    None => line
  };
}

/// Splits one physical line into its leading field (card name or
/// continuation marker) and its data fields. Fixed-form lines always yield
/// a full line's worth of data fields so continuations land on the right
/// indexes.
pub(crate) fn split_line(line: &str) -> (Option<String>, Vec<Option<String>>) {
  let line = strip_comment(line).trim_end();
  if line.contains(',') {
    let mut tokens = line.split(',').map(to_field);
    let head = tokens.next().flatten();
    let mut data: Vec<Option<String>> = tokens.collect();
    let padded = data.len().div_ceil(SMALL_DATA_FIELDS).max(1)
      * SMALL_DATA_FIELDS;
    data.resize(padded, None);
    return (head, data);
  }
  let head = to_field(columns(line, 0, SMALL_FIELD));
  let large = head.as_deref().is_some_and(|h| h.ends_with('*'));
  let (width, count) = if large {
    (LARGE_FIELD, LARGE_DATA_FIELDS)
  } else {
    (SMALL_FIELD, SMALL_DATA_FIELDS)
  };
  let data = (0..count)
    .map(|k| SMALL_FIELD + k*width)
    .map(|start| to_field(columns(line, start, start + width)))
    .collect();
  return (head, data);
}

/// Checks if a line continues the previous card.
pub(crate) fn is_continuation(line: &str) -> bool {
  return match line.chars().next() {
    Some('+') | Some('*') | Some(',') => true,
    Some(' ') | Some('\t') => !strip_comment(line).trim().is_empty(),
    _ => false
  };
}

impl BdfCard {
  /// Builds a card from a name and data fields (field 1 onwards).
  pub fn new<S: AsRef<str>>(name: S, data: Vec<Option<String>>) -> Self {
    let name = name.as_ref().trim().trim_end_matches('*').to_uppercase();
    let mut fields = Vec::with_capacity(data.len() + 1);
    fields.push(Some(name));
    fields.extend(data);
    let mut card = Self { fields };
    card.trim_blanks();
    return card;
  }

  /// Assembles a card from its physical lines, the first one holding the
  /// name. Continuation markers are dropped.
  pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Option<Self> {
    let mut iter = lines.iter();
    let (head, mut data) = split_line(iter.next()?.as_ref());
    for cont in iter {
      data.extend(split_line(cont.as_ref()).1);
    }
    return Some(Self::new(head?, data));
  }

  /// Removes trailing blank fields.
  fn trim_blanks(&mut self) {
    while self.fields.len() > 1
      && self.fields.last().is_some_and(|f| f.is_none()) {
      self.fields.pop();
    }
  }

  /// The card name, upper-case.
  pub fn name(&self) -> &str {
    return self.fields.first()
      .and_then(|f| f.as_deref())
      .unwrap_or_default();
  }

  /// The number of fields, including the name and up to the last non-blank.
  pub fn nfields(&self) -> usize {
    return self.fields.len();
  }

  /// Gets a non-blank field.
  pub fn field(&self, i: usize) -> Option<&str> {
    return self.fields.get(i).and_then(|f| f.as_deref());
  }

  /// Makes the error for a bad field.
  fn field_error(
    &self,
    index: usize,
    name: &'static str,
    problem: FieldProblem
  ) -> BdfError {
    return BdfError::Field {
      card: self.name().to_owned(),
      index,
      name,
      raw: self.field(index).map(String::from),
      problem
    };
  }
}

/// Reads a required integer field.
pub fn integer(card: &BdfCard, i: usize, name: &'static str) -> BdfResult<i32> {
  let raw = card.field(i)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::Missing))?;
  return parse_integer(raw)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::NotAnInteger));
}

/// Reads an optional integer field.
pub fn integer_or_blank(
  card: &BdfCard,
  i: usize,
  name: &'static str,
  default: i32
) -> BdfResult<i32> {
  if card.field(i).is_none() {
    return Ok(default);
  }
  return integer(card, i, name);
}

/// Reads a required real field.
pub fn double(card: &BdfCard, i: usize, name: &'static str) -> BdfResult<f64> {
  let raw = card.field(i)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::Missing))?;
  return parse_real(raw)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::NotAReal));
}

/// Reads an optional real field.
pub fn double_or_blank(
  card: &BdfCard,
  i: usize,
  name: &'static str,
  default: f64
) -> BdfResult<f64> {
  if card.field(i).is_none() {
    return Ok(default);
  }
  return double(card, i, name);
}

/// A field that can hold either an integer or a real.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum IntOrReal {
  /// It was an integer.
  Int(i32),
  /// It was a real.
  Real(f64)
}

/// Reads a required field that can be an integer or a real.
pub fn integer_or_double(
  card: &BdfCard,
  i: usize,
  name: &'static str
) -> BdfResult<IntOrReal> {
  let raw = card.field(i)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::Missing))?;
  if let Some(x) = parse_integer(raw) {
    return Ok(IntOrReal::Int(x));
  }
  return parse_real(raw)
    .map(IntOrReal::Real)
    .ok_or_else(|| card.field_error(i, name, FieldProblem::NotANumber));
}

/// Reads an optional field that can be an integer or a real.
pub fn integer_double_or_blank(
  card: &BdfCard,
  i: usize,
  name: &'static str,
  default: IntOrReal
) -> BdfResult<IntOrReal> {
  if card.field(i).is_none() {
    return Ok(default);
  }
  return integer_or_double(card, i, name);
}

/// Checks that a card has the expected name.
pub(crate) fn expect_card(
  card: &BdfCard,
  expected: &'static str
) -> BdfResult<()> {
  if card.name() != expected {
    return Err(BdfError::WrongCard {
      expected,
      got: card.name().to_owned()
    });
  }
  return Ok(());
}
