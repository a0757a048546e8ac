//! This module decodes the records of the GEOM1 table: grid points and
//! coordinate systems, in fixed-size native-endian layouts.

use std::fmt::Display;

use log::{debug, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::coords::{CoordDefinition, CoordKind, CoordSystem};
use crate::errors::*;
use crate::op2::*;

/// A grid point record.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GridRecord {
  /// Node ID.
  pub nid: i32,
  /// Input coordinate system.
  pub cp: i32,
  /// Position in `cp`.
  pub xyz: [f32; 3],
  /// Output coordinate system.
  pub cd: i32,
  /// Permanent single-point constraints.
  pub ps: i32,
  /// Superelement ID.
  pub seid: i32
}

/// A coordinate system defined by three grid points.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cord1Record {
  /// Coordinate system ID.
  pub cid: i32,
  /// Kind of system.
  pub kind: CoordKind,
  /// Origin, z-axis and xz-plane grid points.
  pub nids: [i32; 3]
}

/// A coordinate system defined by three points in a reference system.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cord2Record {
  /// Coordinate system ID.
  pub cid: i32,
  /// Kind of system.
  pub kind: CoordKind,
  /// Reference coordinate system.
  pub rid: i32,
  /// Origin.
  pub a: [f32; 3],
  /// Point on the z axis.
  pub b: [f32; 3],
  /// Point in the xz plane.
  pub c: [f32; 3]
}

/// A CORD3G record. Kept raw; these aren't resolved into frames.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cord3gRecord {
  /// Coordinate system ID.
  pub cid: i32,
  /// The remaining words, undecoded.
  pub words: [i32; 3]
}

/// Anything that comes out of a GEOM1 record.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, derive_more::From
)]
pub enum Geom1Entry {
  /// A grid point.
  Grid(GridRecord),
  /// A CORD1R/C/S.
  Cord1(Cord1Record),
  /// A CORD2R/C/S.
  Cord2(Cord2Record),
  /// A CORD3G.
  Cord3g(Cord3gRecord)
}

impl Cord1Record {
  /// Turns this into an unresolved coordinate system.
  pub fn to_system(&self) -> CoordSystem {
    return CoordSystem::new(
      self.cid,
      self.kind,
      CoordDefinition::Points { nids: self.nids }
    );
  }
}

impl Cord2Record {
  /// Turns this into an unresolved coordinate system.
  pub fn to_system(&self) -> CoordSystem {
    let point = |p: [f32; 3]| Point3::from(p.map(f64::from));
    return CoordSystem::new(
      self.cid,
      self.kind,
      CoordDefinition::Vectors {
        rid: self.rid,
        a: point(self.a),
        b: point(self.b),
        c: point(self.c)
      }
    );
  }
}

/// Generates the record type enum and its layout information.
macro_rules! gen_record_types {
  (
    $(
      {
        $desc:literal,
        $vname:ident,
        $key:expr,
        $words:expr
      },
    )*
  ) => {
    /// The known GEOM1 record types.
    #[derive(
      Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd,
      Ord
    )]
    #[non_exhaustive]
    pub enum Geom1RecordType {
      $(
        #[doc = $desc]
        $vname,
      )*
    }

    impl Geom1RecordType {
      /// Returns all known record types.
      pub const fn all() -> &'static [Self] {
        return &[ $(Self::$vname,)* ];
      }

      /// Returns the name of the card this record holds.
      pub const fn card_name(&self) -> &'static str {
        return match self {
          $(Self::$vname => $desc,)*
        };
      }

      /// Returns the key that marks this kind of record.
      pub const fn key(&self) -> RecordKey {
        return match self {
          $(Self::$vname => $key,)*
        };
      }

      /// Returns the size of a single record, in bytes.
      pub const fn record_size(&self) -> usize {
        return match self {
          $(Self::$vname => $words*WORD,)*
        };
      }

      /// Finds the record type for a key.
      pub fn from_key(key: RecordKey) -> Option<Self> {
        return Self::all().iter().copied().find(|rt| rt.key() == key);
      }
    }
  };
}

gen_record_types!(
  { "CORD1C", Cord1c, (1701, 17, 6), 6 },
  { "CORD1R", Cord1r, (1801, 18, 5), 6 },
  { "CORD1S", Cord1s, (1901, 19, 7), 6 },
  { "CORD2C", Cord2c, (2001, 20, 9), 13 },
  { "CORD2R", Cord2r, (2101, 21, 8), 13 },
  { "CORD2S", Cord2s, (2201, 22, 10), 13 },
  { "CORD3G", Cord3g, (14301, 143, 651), 4 },
  { "GRID", Grid, (4501, 45, 1), 8 },
);

impl Display for Geom1RecordType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", self.card_name());
  }
}

/// Reads three consecutive reals.
fn real3(rec: &[u8], first: usize) -> [f32; 3] {
  return [
    real_word(rec, first),
    real_word(rec, first + 1),
    real_word(rec, first + 2)
  ];
}

impl Geom1RecordType {
  /// Decodes a single record of this type. `rec` must be exactly one record
  /// long.
  fn decode_one(&self, rec: &[u8]) -> Geom1Entry {
    let kind = || CoordKind::from_card_name(self.card_name())
      .unwrap_or(CoordKind::Rectangular);
    return match self {
      Self::Grid => GridRecord {
        nid: int_word(rec, 0),
        cp: int_word(rec, 1),
        xyz: real3(rec, 2),
        cd: int_word(rec, 5),
        ps: int_word(rec, 6),
        seid: int_word(rec, 7)
      }.into(),
      // words 1 and 2 repeat the type and form
      Self::Cord1c | Self::Cord1r | Self::Cord1s => Cord1Record {
        cid: int_word(rec, 0),
        kind: kind(),
        nids: [int_word(rec, 3), int_word(rec, 4), int_word(rec, 5)]
      }.into(),
      Self::Cord2c | Self::Cord2r | Self::Cord2s => Cord2Record {
        cid: int_word(rec, 0),
        kind: kind(),
        rid: int_word(rec, 3),
        a: real3(rec, 4),
        b: real3(rec, 7),
        c: real3(rec, 10)
      }.into(),
      Self::Cord3g => Cord3gRecord {
        cid: int_word(rec, 0),
        words: [int_word(rec, 1), int_word(rec, 2), int_word(rec, 3)]
      }.into(),
    };
  }
}

/// Decodes the payload of a GEOM1 record, which is a run of fixed-size
/// records of the type given by the key. Leftover bytes that don't make up a
/// whole record are ignored.
pub fn decode_record(
  key: RecordKey,
  data: &[u8]
) -> BdfResult<Vec<Geom1Entry>> {
  let rt = Geom1RecordType::from_key(key)
    .ok_or(BdfError::UnsupportedRecord(key))?;
  let size = rt.record_size();
  let chunks = data.chunks_exact(size);
  if !chunks.remainder().is_empty() {
    warn!(
      "Ignoring {} trailing bytes in a {} record.",
      chunks.remainder().len(),
      rt
    );
  }
  let entries = chunks.map(|rec| rt.decode_one(rec)).collect::<Vec<_>>();
  debug!("Decoded {} {} entries.", entries.len(), rt);
  return Ok(entries);
}
