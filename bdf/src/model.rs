//! This module implements the model that element stores are bound to: the
//! coordinate systems, grid points and properties, and the narrow read-only
//! interfaces through which elements see them.

use log::{debug, info, warn};
use nalgebra::Point3;

use crate::coords::CoordTable;
use crate::errors::*;
use crate::grid::GridTable;
use crate::op2::RecordKey;
use crate::op2::geom1::*;
use crate::properties::PropertyTable;

/// Something that knows where nodes are, in the basic system.
pub trait NodePositions {
  /// Finds the row of each node ID. Unknown IDs are an error.
  fn index_by_id(&self, nids: &[i32]) -> BdfResult<Vec<usize>>;

  /// Gets the basic position of each row.
  fn position_by_index(&self, indices: &[usize])
    -> BdfResult<Vec<Point3<f64>>>;

  /// Gets the basic position of each node ID. Unknown IDs are an error.
  fn position_by_id(&self, nids: &[i32]) -> BdfResult<Vec<Point3<f64>>>;
}

/// Something that knows the mass of shell properties.
pub trait ShellProperties {
  /// Mass per unit area of each property ID. Unknown IDs, or IDs whose
  /// materials are unknown, are an error.
  fn mass_per_area(&self, pids: &[i32]) -> BdfResult<Vec<f64>>;
}

/// What an element store gets to see of the model.
#[derive(Copy, Clone)]
pub struct ModelContext<'m> {
  /// Node positions.
  pub nodes: &'m dyn NodePositions,
  /// Shell properties.
  pub properties: &'m dyn ShellProperties
}

/// Everything elements reference: coordinate systems, grid points and
/// properties.
#[derive(Clone, Debug, Default)]
pub struct Model {
  /// The coordinate systems.
  pub coords: CoordTable,
  /// The grid points.
  pub grids: GridTable,
  /// The shell properties and materials.
  pub properties: PropertyTable
}

impl Model {
  /// Creates an empty model, with just the basic coordinate system.
  pub fn new() -> Self {
    return Self::default();
  }

  /// Resolves coordinate systems into frames, then grid points into the
  /// basic system. The grid table must have been finalised.
  pub fn resolve(&mut self) -> BdfResult<()> {
    let grids = &self.grids;
    self.coords.resolve(|nid| grids.raw(nid))?;
    self.grids.resolve(&self.coords)?;
    debug!(
      "Resolved {} coordinate systems and {} grid points.",
      self.coords.len(),
      self.grids.len()
    );
    return Ok(());
  }

  /// The context to bind element stores to.
  pub fn context(&self) -> ModelContext<'_> {
    return ModelContext {
      nodes: &self.grids,
      properties: &self.properties
    };
  }

  /// Builds and resolves a model from GEOM1 record payloads and their keys.
  /// Records of unsupported types are skipped with a warning.
  pub fn from_geom1<'a, I>(records: I) -> BdfResult<Self>
    where I: IntoIterator<Item = (RecordKey, &'a [u8])> {
    let mut entries: Vec<Geom1Entry> = Vec::new();
    for (key, data) in records {
      match decode_record(key, data) {
        Ok(decoded) => entries.extend(decoded),
        Err(BdfError::UnsupportedRecord(k)) => warn!(
          "Skipping unsupported GEOM1 record {:?}.", k
        ),
        Err(e) => return Err(e)
      }
    }
    let ngrids = entries.iter()
      .filter(|e| matches!(e, Geom1Entry::Grid(_)))
      .count();
    let mut model = Self::new();
    model.grids.allocate(ngrids);
    for entry in entries.iter() {
      match entry {
        Geom1Entry::Grid(rec) => model.grids.add_record(rec)?,
        Geom1Entry::Cord1(rec) => model.coords.add(rec.to_system())?,
        Geom1Entry::Cord2(rec) => model.coords.add(rec.to_system())?,
        Geom1Entry::Cord3g(rec) => warn!(
          "CORD3G {} is recognised but not supported; ignoring it.", rec.cid
        ),
      };
    }
    model.grids.finalize()?;
    model.resolve()?;
    info!(
      "Loaded {} grid points and {} coordinate systems from GEOM1.",
      model.grids.len(),
      model.coords.len()
    );
    return Ok(model);
  }
}
