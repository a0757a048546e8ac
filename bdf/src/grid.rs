//! This module implements the grid point table: a columnar store of GRID
//! entries, sorted by node ID once finalised, with positions resolved into
//! the basic system.

use std::io::Write;

use log::debug;
use nalgebra::Point3;

use crate::cards::*;
use crate::coords::{CoordTable, BASIC_CID};
use crate::errors::*;
use crate::model::NodePositions;
use crate::op2::geom1::GridRecord;
use crate::util::*;
use crate::writer::*;

/// The grid point table.
#[derive(Clone, Debug, Default)]
pub struct GridTable {
  /// Allocated number of rows.
  n: usize,
  /// The fill cursor.
  i: usize,
  /// Whether the table was sorted and checked.
  finalized: bool,
  /// Whether `xyz_basic` is valid.
  resolved: bool,
  /// Node IDs.
  node_id: Vec<i32>,
  /// Input coordinate system of each node.
  cp: Vec<i32>,
  /// Position, in `cp`.
  xyz: Vec<Point3<f64>>,
  /// Output coordinate system of each node.
  cd: Vec<i32>,
  /// Permanent single-point constraints.
  ps: Vec<i32>,
  /// Superelement ID.
  seid: Vec<i32>,
  /// Position, in basic.
  xyz_basic: Vec<Point3<f64>>
}

impl GridTable {
  /// Creates an empty, unallocated table.
  pub fn new() -> Self {
    return Self::default();
  }

  /// Allocates room for a known number of grid points, zero-filled.
  pub fn allocate(&mut self, n: usize) {
    self.n = n;
    self.i = 0;
    self.finalized = false;
    self.resolved = false;
    self.node_id = vec![0; n];
    self.cp = vec![0; n];
    self.xyz = vec![Point3::origin(); n];
    self.cd = vec![0; n];
    self.ps = vec![0; n];
    self.seid = vec![0; n];
    self.xyz_basic = Vec::new();
  }

  /// Returns the next row to be filled.
  fn next_row(&mut self) -> BdfResult<usize> {
    if self.i >= self.n {
      return Err(BdfError::CapacityExceeded { capacity: self.n });
    }
    self.i += 1;
    return Ok(self.i - 1);
  }

  /// Adds a GRID card.
  pub fn add(&mut self, card: &BdfCard) -> BdfResult<()> {
    expect_card(card, "GRID")?;
    let node_id = integer(card, 1, "nid")?;
    let cp = integer_or_blank(card, 2, "cp", BASIC_CID)?;
    let xyz = Point3::new(
      double_or_blank(card, 3, "x1", 0.0)?,
      double_or_blank(card, 4, "x2", 0.0)?,
      double_or_blank(card, 5, "x3", 0.0)?,
    );
    let cd = integer_or_blank(card, 6, "cd", BASIC_CID)?;
    let ps = integer_or_blank(card, 7, "ps", 0)?;
    let seid = integer_or_blank(card, 8, "seid", 0)?;
    let i = self.next_row()?;
    self.node_id[i] = node_id;
    self.cp[i] = cp;
    self.xyz[i] = xyz;
    self.cd[i] = cd;
    self.ps[i] = ps;
    self.seid[i] = seid;
    return Ok(());
  }

  /// Adds a grid point decoded from a GEOM1 record.
  pub fn add_record(&mut self, rec: &GridRecord) -> BdfResult<()> {
    let i = self.next_row()?;
    self.node_id[i] = rec.nid;
    self.cp[i] = rec.cp;
    self.xyz[i] = Point3::from(rec.xyz.map(f64::from));
    self.cd[i] = rec.cd;
    self.ps[i] = rec.ps;
    self.seid[i] = rec.seid;
    return Ok(());
  }

  /// Sorts all columns by node ID and checks the IDs are unique.
  pub fn finalize(&mut self) -> BdfResult<()> {
    if self.i != self.n {
      return Err(BdfError::IncompleteFill {
        filled: self.i,
        capacity: self.n
      });
    }
    let order = argsort(&self.node_id);
    self.node_id = permute(&self.node_id, &order);
    self.cp = permute(&self.cp, &order);
    self.xyz = permute(&self.xyz, &order);
    self.cd = permute(&self.cd, &order);
    self.ps = permute(&self.ps, &order);
    self.seid = permute(&self.seid, &order);
    if let Some(w) = self.node_id.windows(2).find(|w| w[0] == w[1]) {
      return Err(BdfError::DuplicateId { what: "node", id: w[0] });
    }
    self.finalized = true;
    self.resolved = false;
    debug!("Finalised grid table with {} nodes.", self.n);
    return Ok(());
  }

  /// Computes the basic-system position of every node. The coordinate
  /// systems must have been resolved first.
  pub fn resolve(&mut self, coords: &CoordTable) -> BdfResult<()> {
    if !self.finalized {
      return Err(BdfError::NotFinalized("grid"));
    }
    self.xyz_basic = self.cp.iter()
      .zip(self.xyz.iter())
      .map(|(&cp, xyz)| coords.to_basic(cp, xyz))
      .collect::<BdfResult<Vec<_>>>()?;
    self.resolved = true;
    return Ok(());
  }

  /// Number of grid points.
  pub fn len(&self) -> usize {
    return self.n;
  }

  /// Whether there are no grid points.
  pub fn is_empty(&self) -> bool {
    return self.n == 0;
  }

  /// The sorted node IDs.
  pub fn node_ids(&self) -> &[i32] {
    return &self.node_id;
  }

  /// Looks up a node's raw definition: its input system and position in it.
  /// Works before the table is resolved, which is what CORD1 systems need.
  pub fn raw(&self, nid: i32) -> Option<(i32, Point3<f64>)> {
    let i = if self.finalized {
      let i = search_sorted(&self.node_id, &nid);
      (self.node_id.get(i) == Some(&nid)).then_some(i)?
    } else {
      self.node_id[..self.i].iter().position(|&x| x == nid)?
    };
    return Some((self.cp[i], self.xyz[i]));
  }

  /// Writes all grid points out as GRID cards.
  pub fn write_cards<W: Write>(&self, sink: &mut W) -> BdfResult<()> {
    for i in 0..self.i {
      let fields: Vec<CardField> = vec![
        self.node_id[i].into(),
        blank_if_default(self.cp[i], BASIC_CID),
        self.xyz[i].x.into(),
        self.xyz[i].y.into(),
        self.xyz[i].z.into(),
        blank_if_default(self.cd[i], BASIC_CID),
        blank_if_default(self.ps[i], 0),
        blank_if_default(self.seid[i], 0),
      ];
      sink.write_all(print_card_8("GRID", &fields)?.as_bytes())?;
    }
    return Ok(());
  }

  /// Checks the table can be queried.
  fn check_ready(&self) -> BdfResult<()> {
    return if self.resolved {
      Ok(())
    } else {
      Err(BdfError::NotFinalized("grid"))
    };
  }
}

impl NodePositions for GridTable {
  fn index_by_id(&self, nids: &[i32]) -> BdfResult<Vec<usize>> {
    self.check_ready()?;
    return nids.iter()
      .map(|nid| {
        let i = search_sorted(&self.node_id, nid);
        return match self.node_id.get(i) {
          Some(found) if found == nid => Ok(i),
          _ => Err(BdfError::UnresolvedNode(*nid))
        };
      })
      .collect();
  }

  fn position_by_index(
    &self,
    indices: &[usize]
  ) -> BdfResult<Vec<Point3<f64>>> {
    self.check_ready()?;
    return indices.iter()
      .map(|&i| {
        return self.xyz_basic.get(i)
          .copied()
          .ok_or(BdfError::IndexOutOfRange(i));
      })
      .collect();
  }

  fn position_by_id(&self, nids: &[i32]) -> BdfResult<Vec<Point3<f64>>> {
    let indices = self.index_by_id(nids)?;
    return self.position_by_index(&indices);
  }
}
