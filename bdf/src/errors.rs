//! This module defines the errors that can come out of reading bulk data,
//! building tables out of it, and querying them.

use std::error::Error;
use std::fmt::Display;
use std::io;

use crate::kernel::GeometryError;

/// What was wrong with a field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldProblem {
  /// The field is required but it's blank or beyond the end of the card.
  Missing,
  /// The field should have been an integer.
  NotAnInteger,
  /// The field should have been a real.
  NotAReal,
  /// The field should have been an integer or a real.
  NotANumber
}

impl Display for FieldProblem {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", match self {
      Self::Missing => "missing required field",
      Self::NotAnInteger => "expected an integer",
      Self::NotAReal => "expected a real",
      Self::NotANumber => "expected an integer or a real",
    });
  }
}

/// All the errors that the library can produce.
#[derive(Debug)]
#[non_exhaustive]
pub enum BdfError {
  /// A field in a card could not be extracted.
  Field {
    /// The name of the card.
    card: String,
    /// The index of the field (the card name is field 0).
    index: usize,
    /// The name of the field, for humans.
    name: &'static str,
    /// The raw contents, if any.
    raw: Option<String>,
    /// What went wrong.
    problem: FieldProblem
  },
  /// A card was handed to a table that doesn't take it.
  WrongCard {
    /// The card the table wanted.
    expected: &'static str,
    /// The card it got.
    got: String
  },
  /// A value doesn't fit in the field it's being written to.
  FieldTooWide {
    /// The name of the card being written.
    card: String,
    /// The value, as it would have been written.
    value: String
  },
  /// More rows were added than were allocated.
  CapacityExceeded {
    /// The allocated capacity.
    capacity: usize
  },
  /// A table was finalised before all allocated rows were filled.
  IncompleteFill {
    /// Rows actually filled.
    filled: usize,
    /// The allocated capacity.
    capacity: usize
  },
  /// A table was queried before being finalised.
  NotFinalized(&'static str),
  /// An element references a node ID that isn't positive.
  NonPositiveNode {
    /// The element ID.
    eid: i32,
    /// The offending node ID.
    nid: i32
  },
  /// Some ID appears more than once where it has to be unique.
  DuplicateId {
    /// What kind of ID.
    what: &'static str,
    /// The repeated ID.
    id: i32
  },
  /// A node ID couldn't be found in the grid table.
  UnresolvedNode(i32),
  /// A row index is past the end of a table.
  IndexOutOfRange(usize),
  /// A property ID couldn't be found.
  UnresolvedProperty(i32),
  /// A material ID couldn't be found.
  UnresolvedMaterial(i32),
  /// A coordinate system couldn't be found or resolved.
  UnresolvedCoord(i32),
  /// A coordinate system's defining points don't make a frame.
  BadCoordDefinition(i32),
  /// An element ID isn't part of the store.
  UnknownElement(i32),
  /// An element's geometry couldn't be computed.
  Geometry {
    /// The element ID.
    eid: i32,
    /// What the kernel said.
    cause: GeometryError
  },
  /// A binary record key we can't decode.
  UnsupportedRecord((i32, i32, i32)),
  /// Some I/O error.
  Io(io::Error)
}

impl Display for BdfError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Field { card, index, name, raw, problem } => match raw {
        Some(r) => write!(
          f,
          "{} field {} ({}): {}, got \"{}\"",
          card, index, name, problem, r
        ),
        None => write!(f, "{} field {} ({}): {}", card, index, name, problem),
      },
      Self::WrongCard { expected, got } => write!(
        f, "expected a {} card, got a {} card", expected, got
      ),
      Self::FieldTooWide { card, value } => write!(
        f, "{} doesn't fit in an 8-character {} field", value, card
      ),
      Self::CapacityExceeded { capacity } => write!(
        f, "tried to add more than the {} allocated rows", capacity
      ),
      Self::IncompleteFill { filled, capacity } => write!(
        f, "only {} of {} allocated rows were filled", filled, capacity
      ),
      Self::NotFinalized(what) => write!(
        f, "the {} table was queried before being finalised", what
      ),
      Self::NonPositiveNode { eid, nid } => write!(
        f, "element {} references non-positive node {}", eid, nid
      ),
      Self::DuplicateId { what, id } => write!(f, "duplicate {} {}", what, id),
      Self::UnresolvedNode(nid) => write!(f, "no such node {}", nid),
      Self::IndexOutOfRange(i) => write!(f, "row index {} is out of range", i),
      Self::UnresolvedProperty(pid) => write!(f, "no such property {}", pid),
      Self::UnresolvedMaterial(mid) => write!(f, "no such material {}", mid),
      Self::UnresolvedCoord(cid) => write!(
        f, "coordinate system {} is missing or can't be resolved", cid
      ),
      Self::BadCoordDefinition(cid) => write!(
        f, "coordinate system {} has collinear or coincident points", cid
      ),
      Self::UnknownElement(eid) => write!(f, "no such element {}", eid),
      Self::Geometry { eid, cause } => write!(f, "element {}: {}", eid, cause),
      Self::UnsupportedRecord((a, b, c)) => write!(
        f, "unsupported record ({}, {}, {})", a, b, c
      ),
      Self::Io(e) => e.fmt(f),
    };
  }
}

impl Error for BdfError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    return match self {
      Self::Io(e) => Some(e),
      Self::Geometry { cause, .. } => Some(cause),
      _ => None
    };
  }
}

impl From<io::Error> for BdfError {
  fn from(value: io::Error) -> Self {
    return Self::Io(value);
  }
}

/// Short for results with our error.
pub type BdfResult<T> = Result<T, BdfError>;
