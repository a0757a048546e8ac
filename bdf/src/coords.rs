//! This module implements coordinate systems: their definitions as given in
//! bulk data or GEOM1 records, and their resolution into frames expressed in
//! the basic system.

use std::collections::BTreeMap;
use std::fmt::Display;

use log::debug;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::cards::*;
use crate::errors::*;
use crate::kernel::DEGENERACY_TOLERANCE;

/// The ID of the basic coordinate system.
pub const BASIC_CID: i32 = 0;

/// The three kinds of coordinate system.
#[derive(
  Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord
)]
pub enum CoordKind {
  /// Local coordinates are (x, y, z).
  Rectangular,
  /// Local coordinates are (r, theta in degrees, z).
  Cylindrical,
  /// Local coordinates are (r, theta in degrees, phi in degrees), with theta
  /// measured from the local z axis.
  Spherical
}

impl CoordKind {
  /// Returns the letter used in card names.
  pub const fn letter(&self) -> char {
    return match self {
      Self::Rectangular => 'R',
      Self::Cylindrical => 'C',
      Self::Spherical => 'S',
    };
  }

  /// Gets the kind from the last letter of a card name.
  pub fn from_card_name(name: &str) -> Option<Self> {
    return match name.chars().last()? {
      'R' => Some(Self::Rectangular),
      'C' => Some(Self::Cylindrical),
      'S' => Some(Self::Spherical),
      _ => None
    };
  }

  /// Converts local coordinates of this kind into rectangular ones, still in
  /// the local frame.
  pub fn to_rectangular(&self, local: &Point3<f64>) -> Point3<f64> {
    return match self {
      Self::Rectangular => *local,
      Self::Cylindrical => {
        let (r, theta, z) = (local.x, local.y.to_radians(), local.z);
        Point3::new(r*theta.cos(), r*theta.sin(), z)
      },
      Self::Spherical => {
        let (r, theta, phi) = (
          local.x,
          local.y.to_radians(),
          local.z.to_radians()
        );
        Point3::new(
          r*theta.sin()*phi.cos(),
          r*theta.sin()*phi.sin(),
          r*theta.cos()
        )
      },
    };
  }
}

impl Display for CoordKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", self.letter());
  }
}

/// How a coordinate system was defined.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum CoordDefinition {
  /// By the basic frame itself.
  Basic,
  /// By three grid points: origin, a point on the z axis, a point in the xz
  /// plane (CORD1R/C/S).
  Points {
    /// The three grid IDs.
    nids: [i32; 3]
  },
  /// By three points given in a reference system, in the same roles as for
  /// `Points` (CORD2R/C/S).
  Vectors {
    /// The reference system ID.
    rid: i32,
    /// The origin.
    a: Point3<f64>,
    /// A point on the z axis.
    b: Point3<f64>,
    /// A point in the xz plane.
    c: Point3<f64>
  }
}

/// A resolved frame: origin and axes, in basic.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Frame {
  /// The origin, in basic.
  pub origin: Point3<f64>,
  /// The local unit axes (as columns), in basic.
  pub axes: Matrix3<f64>
}

impl Frame {
  /// The basic frame.
  pub fn basic() -> Self {
    return Self { origin: Point3::origin(), axes: Matrix3::identity() };
  }

  /// Builds a frame from an origin, a point on the z axis and a point in the
  /// xz plane, all in basic.
  fn from_points(
    cid: i32,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>
  ) -> BdfResult<Self> {
    let scale = (b - a).norm().max((c - a).norm());
    let bad = || BdfError::BadCoordDefinition(cid);
    let k = (b - a)
      .try_normalize(DEGENERACY_TOLERANCE * scale)
      .ok_or_else(bad)?;
    let j: Vector3<f64> = k.cross(&(c - a))
      .try_normalize(DEGENERACY_TOLERANCE * scale)
      .ok_or_else(bad)?;
    let i = j.cross(&k);
    return Ok(Self {
      origin: *a,
      axes: Matrix3::from_columns(&[i, j, k])
    });
  }

  /// Takes rectangular local coordinates into basic.
  pub fn to_basic(&self, local: &Point3<f64>) -> Point3<f64> {
    return self.origin + self.axes * local.coords;
  }
}

/// A coordinate system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoordSystem {
  /// The ID.
  pub cid: i32,
  /// The kind.
  pub kind: CoordKind,
  /// How it was defined.
  pub definition: CoordDefinition,
  /// The frame, once resolved.
  frame: Option<Frame>
}

impl CoordSystem {
  /// Creates an unresolved coordinate system.
  pub fn new(cid: i32, kind: CoordKind, definition: CoordDefinition) -> Self {
    return Self { cid, kind, definition, frame: None };
  }

  /// The resolved frame, if any.
  pub fn frame(&self) -> Option<&Frame> {
    return self.frame.as_ref();
  }

  /// Takes local coordinates (of this system's kind) into basic.
  pub fn to_basic(&self, local: &Point3<f64>) -> BdfResult<Point3<f64>> {
    let frame = self.frame.as_ref()
      .ok_or(BdfError::UnresolvedCoord(self.cid))?;
    return Ok(frame.to_basic(&self.kind.to_rectangular(local)));
  }
}

/// All the coordinate systems in a model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordTable {
  /// The systems, by ID.
  systems: BTreeMap<i32, CoordSystem>
}

impl Default for CoordTable {
  fn default() -> Self {
    return Self::new();
  }
}

impl CoordTable {
  /// Creates a table with just the basic system in it.
  pub fn new() -> Self {
    let mut basic = CoordSystem::new(
      BASIC_CID,
      CoordKind::Rectangular,
      CoordDefinition::Basic
    );
    basic.frame = Some(Frame::basic());
    return Self { systems: BTreeMap::from([(BASIC_CID, basic)]) };
  }

  /// Adds a system. IDs must be unique.
  pub fn add(&mut self, system: CoordSystem) -> BdfResult<()> {
    if self.systems.contains_key(&system.cid) {
      return Err(BdfError::DuplicateId {
        what: "coordinate system",
        id: system.cid
      });
    }
    self.systems.insert(system.cid, system);
    return Ok(());
  }

  /// Adds the system(s) in a CORD1R/C/S or CORD2R/C/S card.
  pub fn add_card(&mut self, card: &BdfCard) -> BdfResult<()> {
    let name = card.name();
    let kind = CoordKind::from_card_name(name);
    return match (name.get(..5), kind) {
      (Some("CORD1"), Some(kind)) => {
        // one card can define two systems
        for (slot, offset) in [(0, 1), (1, 5)] {
          if slot == 1 && card.field(offset).is_none() {
            break;
          }
          let cid = integer(card, offset, "cid")?;
          let nids = [
            integer(card, offset + 1, "g1")?,
            integer(card, offset + 2, "g2")?,
            integer(card, offset + 3, "g3")?,
          ];
          self.add(CoordSystem::new(
            cid,
            kind,
            CoordDefinition::Points { nids }
          ))?;
        }
        Ok(())
      },
      (Some("CORD2"), Some(kind)) => {
        let cid = integer(card, 1, "cid")?;
        let rid = integer_or_blank(card, 2, "rid", BASIC_CID)?;
        let point = |start: usize, names: [&'static str; 3]|
          -> BdfResult<Point3<f64>> {
          return Ok(Point3::new(
            double_or_blank(card, start, names[0], 0.0)?,
            double_or_blank(card, start + 1, names[1], 0.0)?,
            double_or_blank(card, start + 2, names[2], 0.0)?,
          ));
        };
        let a = point(3, ["a1", "a2", "a3"])?;
        let b = point(6, ["b1", "b2", "b3"])?;
        let c = point(9, ["c1", "c2", "c3"])?;
        self.add(CoordSystem::new(
          cid,
          kind,
          CoordDefinition::Vectors { rid, a, b, c }
        ))
      },
      _ => Err(BdfError::WrongCard {
        expected: "CORD1R/C/S or CORD2R/C/S",
        got: name.to_owned()
      })
    };
  }

  /// Gets a system.
  pub fn get(&self, cid: i32) -> Option<&CoordSystem> {
    return self.systems.get(&cid);
  }

  /// Number of systems, basic included.
  pub fn len(&self) -> usize {
    return self.systems.len();
  }

  /// Never true; the basic system is always there.
  pub fn is_empty(&self) -> bool {
    return self.systems.is_empty();
  }

  /// Checks if a system exists and is resolved.
  pub fn is_resolved(&self, cid: i32) -> bool {
    return self.systems.get(&cid).is_some_and(|s| s.frame.is_some());
  }

  /// Takes local coordinates in some system into basic.
  pub fn to_basic(
    &self,
    cid: i32,
    local: &Point3<f64>
  ) -> BdfResult<Point3<f64>> {
    return self.systems.get(&cid)
      .ok_or(BdfError::UnresolvedCoord(cid))?
      .to_basic(local);
  }

  /// Resolves every system into a frame. CORD1 systems need the raw
  /// definition of their grid points, `(cp, xyz in cp)`, which `grid_point`
  /// returns. Systems are resolved in as many passes as it takes; whatever
  /// can't be resolved after a pass with no progress is an error.
  pub fn resolve<F>(&mut self, grid_point: F) -> BdfResult<()>
    where F: Fn(i32) -> Option<(i32, Point3<f64>)> {
    loop {
      let pending = self.systems.values()
        .filter(|s| s.frame.is_none())
        .map(|s| s.cid)
        .collect::<Vec<_>>();
      if pending.is_empty() {
        return Ok(());
      }
      let mut progress = false;
      for cid in pending.iter().copied() {
        if let Some(frame) = self.try_frame(cid, &grid_point)? {
          debug!("Resolved coordinate system {}.", cid);
          if let Some(sys) = self.systems.get_mut(&cid) {
            sys.frame = Some(frame);
          }
          progress = true;
        }
      }
      if !progress {
        return Err(BdfError::UnresolvedCoord(pending[0]));
      }
    }
  }

  /// Tries to build the frame for a system. Returns `None` if some system it
  /// depends on isn't resolved yet.
  fn try_frame<F>(&self, cid: i32, grid_point: &F) -> BdfResult<Option<Frame>>
    where F: Fn(i32) -> Option<(i32, Point3<f64>)> {
    let sys = self.systems.get(&cid).ok_or(BdfError::UnresolvedCoord(cid))?;
    let in_basic = |rid: i32, p: &Point3<f64>|
      -> BdfResult<Option<Point3<f64>>> {
      let refsys = self.systems.get(&rid)
        .ok_or(BdfError::UnresolvedCoord(rid))?;
      return match refsys.frame {
        Some(_) => refsys.to_basic(p).map(Some),
        None => Ok(None)
      };
    };
    let mut abc: Vec<Point3<f64>> = Vec::with_capacity(3);
    match &sys.definition {
      CoordDefinition::Basic => return Ok(Some(Frame::basic())),
      CoordDefinition::Vectors { rid, a, b, c } => {
        for p in [a, b, c] {
          match in_basic(*rid, p)? {
            Some(q) => abc.push(q),
            None => return Ok(None)
          }
        }
      },
      CoordDefinition::Points { nids } => {
        for nid in nids.iter().copied() {
          let (cp, xyz) = grid_point(nid)
            .ok_or(BdfError::UnresolvedNode(nid))?;
          match in_basic(cp, &xyz)? {
            Some(q) => abc.push(q),
            None => return Ok(None)
          }
        }
      }
    };
    return Frame::from_points(cid, &abc[0], &abc[1], &abc[2]).map(Some);
  }
}
