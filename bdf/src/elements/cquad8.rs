//! This module implements the CQUAD8 store: 8-noded quadrilateral shells kept
//! column-wise, sorted by element ID once finalised, with batch geometry
//! queries over them.
//!
//! A store goes through allocate, fill (one `add` per card), finalize, and
//! from then on is only queried or written out. There's no way to mutate a
//! finalised store other than allocating it again from scratch.

use std::io::Write;

use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::cards::*;
use crate::errors::*;
use crate::kernel::*;
use crate::model::ModelContext;
use crate::util::*;
use crate::writer::*;

/// The name of the card.
pub const CARD_NAME: &str = "CQUAD8";

/// Number of nodes per element: four corners, then four mid-side nodes.
pub const NODES: usize = 8;

/// Number of corner nodes.
pub const CORNERS: usize = 4;

/// Thickness at nodes whose thickness isn't given.
pub const DEFAULT_THICKNESS: f64 = 1.0;

/// Which quantities a geometry query should compute.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeometryRequest {
  /// Compute masses (this implies areas).
  pub mass: bool,
  /// Compute areas.
  pub area: bool,
  /// Compute unit normals.
  pub normal: bool
}

impl GeometryRequest {
  /// Everything.
  pub const ALL: Self = Self { mass: true, area: true, normal: true };
}

/// The geometry of a single element, as requested.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementGeometry {
  /// Mass, if requested.
  pub mass: Option<f64>,
  /// Area, if requested (or if mass was).
  pub area: Option<f64>,
  /// Unit normal, if requested.
  pub normal: Option<Unit<Vector3<f64>>>
}

/// Per-element outcome of a geometry query.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// The CQUAD8 store.
#[derive(Clone)]
pub struct Cquad8<'m> {
  /// The model the elements live in.
  model: ModelContext<'m>,
  /// Allocated number of rows.
  n: usize,
  /// The fill cursor.
  i: usize,
  /// Whether the store has been sorted and validated.
  finalized: bool,
  /// Element IDs; sorted after finalisation.
  element_id: Vec<i32>,
  /// PSHELL IDs.
  property_id: Vec<i32>,
  /// Corner nodes, then mid-side nodes (0 meaning absent).
  node_ids: Vec<[i32; NODES]>,
  /// Thickness at each node position.
  thickness: Vec<[f64; NODES]>,
  /// Material orientation: an angle or a coordinate system ID.
  theta_mcid: Vec<IntOrReal>,
  /// Offset from the grid plane.
  z_offset: Vec<f64>,
  /// Whether thicknesses are absolute or relative.
  thickness_flag: Vec<i32>,
  /// Comments that came with each card; dropped on finalisation.
  comments: Vec<Option<String>>
}

impl<'m> Cquad8<'m> {
  /// Creates an empty store bound to a model.
  pub fn new(model: ModelContext<'m>) -> Self {
    return Self {
      model,
      n: 0,
      i: 0,
      finalized: false,
      element_id: Vec::new(),
      property_id: Vec::new(),
      node_ids: Vec::new(),
      thickness: Vec::new(),
      theta_mcid: Vec::new(),
      z_offset: Vec::new(),
      thickness_flag: Vec::new(),
      comments: Vec::new()
    };
  }

  /// Allocates room for exactly `n` elements. Columns are zero-filled
  /// (thicknesses get their default) and the fill cursor starts over.
  pub fn allocate(&mut self, n: usize) {
    self.n = n;
    self.i = 0;
    self.finalized = false;
    self.element_id = vec![0; n];
    self.property_id = vec![0; n];
    self.node_ids = vec![[0; NODES]; n];
    self.thickness = vec![[DEFAULT_THICKNESS; NODES]; n];
    self.theta_mcid = vec![IntOrReal::Real(0.0); n];
    self.z_offset = vec![0.0; n];
    self.thickness_flag = vec![0; n];
    self.comments = vec![None; n];
  }

  /// Reads a CQUAD8 card into the next row.
  pub fn add(&mut self, card: &BdfCard, comment: &str) -> BdfResult<()> {
    expect_card(card, CARD_NAME)?;
    if self.i >= self.n {
      return Err(BdfError::CapacityExceeded { capacity: self.n });
    }
    let eid = integer(card, 1, "eid")?;
    let pid = integer(card, 2, "pid")?;
    let mut nodes = [0; NODES];
    for (k, (slot, name)) in nodes.iter_mut()
      .zip(["n1", "n2", "n3", "n4", "n5", "n6", "n7", "n8"])
      .enumerate() {
      *slot = if k < CORNERS {
        integer(card, 3 + k, name)?
      } else {
        integer_or_blank(card, 3 + k, name, 0)?
      };
    }
    let mut thickness = [DEFAULT_THICKNESS; NODES];
    for (k, name) in ["t1", "t2", "t3", "t4"].into_iter().enumerate() {
      thickness[k] = double_or_blank(card, 11 + k, name, DEFAULT_THICKNESS)?;
    }
    let theta_mcid = integer_double_or_blank(
      card, 15, "theta_mcid", IntOrReal::Real(0.0)
    )?;
    let z_offset = double_or_blank(card, 16, "zoffset", 0.0)?;
    let thickness_flag = integer_or_blank(card, 17, "tflag", 0)?;
    let i = self.i;
    self.element_id[i] = eid;
    self.property_id[i] = pid;
    self.node_ids[i] = nodes;
    self.thickness[i] = thickness;
    self.theta_mcid[i] = theta_mcid;
    self.z_offset[i] = z_offset;
    self.thickness_flag[i] = thickness_flag;
    self.comments[i] = if comment.is_empty() {
      None
    } else {
      Some(comment.to_owned())
    };
    self.i += 1;
    return Ok(());
  }

  /// Sorts every column by element ID, checks IDs are unique and corner
  /// nodes are positive, and drops the comments. All allocated rows must
  /// have been filled.
  pub fn finalize(&mut self) -> BdfResult<()> {
    if self.n == 0 {
      self.allocate(0);
      self.finalized = true;
      return Ok(());
    }
    if self.i != self.n {
      return Err(BdfError::IncompleteFill {
        filled: self.i,
        capacity: self.n
      });
    }
    let order = argsort(&self.element_id);
    self.element_id = permute(&self.element_id, &order);
    self.property_id = permute(&self.property_id, &order);
    self.node_ids = permute(&self.node_ids, &order);
    self.thickness = permute(&self.thickness, &order);
    self.theta_mcid = permute(&self.theta_mcid, &order);
    self.z_offset = permute(&self.z_offset, &order);
    self.thickness_flag = permute(&self.thickness_flag, &order);
    if let Some(w) = self.element_id.windows(2).find(|w| w[0] == w[1]) {
      return Err(BdfError::DuplicateId { what: "element", id: w[0] });
    }
    for (eid, nodes) in self.element_id.iter().zip(self.node_ids.iter()) {
      if let Some(&nid) = nodes[..CORNERS].iter().find(|&&nid| nid <= 0) {
        return Err(BdfError::NonPositiveNode { eid: *eid, nid });
      }
    }
    let ncomments = self.comments.iter().flatten().count();
    if ncomments > 0 {
      debug!("Dropping {} {} comments.", ncomments, CARD_NAME);
    }
    self.comments = Vec::new();
    self.finalized = true;
    debug!("Finalised {} {} elements.", self.n, CARD_NAME);
    return Ok(());
  }

  /// Finds the rows of some element IDs by binary search. Each ID is looked
  /// up on its own, so repeats are fine. The row returned for an ID that
  /// isn't in the store is where it would be inserted, which may be one past
  /// the end; use `checked_index` if the IDs aren't known to be there.
  pub fn lookup_index(&self, eids: &[i32]) -> Vec<usize> {
    return eids.iter()
      .map(|eid| search_sorted(&self.element_id, eid))
      .collect();
  }

  /// Like `lookup_index`, but IDs that aren't in the store are an error.
  pub fn checked_index(&self, eids: &[i32]) -> BdfResult<Vec<usize>> {
    self.check_finalized()?;
    return eids.iter()
      .zip(self.lookup_index(eids))
      .map(|(&eid, i)| match self.element_id.get(i) {
        Some(&found) if found == eid => Ok(i),
        _ => Err(BdfError::UnknownElement(eid))
      })
      .collect();
  }

  /// Checks that the store can be queried.
  fn check_finalized(&self) -> BdfResult<()> {
    return if self.finalized {
      Ok(())
    } else {
      Err(BdfError::NotFinalized(CARD_NAME))
    };
  }

  /// Rows for some element IDs, or all rows.
  fn rows(&self, eids: Option<&[i32]>) -> BdfResult<Vec<usize>> {
    return match eids {
      Some(eids) => self.checked_index(eids),
      None => {
        self.check_finalized()?;
        Ok((0..self.n).collect())
      }
    };
  }

  /// Basic positions of the corner nodes of some rows.
  fn corners(
    &self,
    rows: &[usize]
  ) -> BdfResult<Vec<[Point3<f64>; CORNERS]>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let nids = rows.iter()
      .flat_map(|&r| self.node_ids[r].into_iter().take(CORNERS))
      .collect::<Vec<_>>();
    let positions = self.model.nodes.position_by_id(&nids)?;
    return Ok(
      positions.chunks_exact(CORNERS)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect()
    );
  }

  /// Centroids (the mean of the corners) of some elements, or all of them.
  pub fn get_centroid(
    &self,
    eids: Option<&[i32]>
  ) -> BdfResult<Vec<Point3<f64>>> {
    let rows = self.rows(eids)?;
    return Ok(
      self.corners(&rows)?
        .iter()
        .map(|[n1, n2, n3, n4]| quad_centroid(n1, n2, n3, n4))
        .collect()
    );
  }

  /// Normal and area of some rows.
  fn shell_geometry(
    &self,
    rows: &[usize]
  ) -> BdfResult<Vec<GeometryResult<ShellGeometry>>> {
    return Ok(
      self.corners(rows)?
        .iter()
        .map(|[n1, n2, n3, n4]| quad_normal_area(n1, n2, n3, n4))
        .collect()
    );
  }

  /// Computes masses, areas and/or normals of some elements, or all of them,
  /// in the order requested. Asking for the mass means the area gets
  /// computed too. Elements with degenerate geometry get an error of their
  /// own; unknown elements, nodes or properties fail the whole call.
  pub fn get_geometry(
    &self,
    eids: Option<&[i32]>,
    request: GeometryRequest
  ) -> BdfResult<Vec<GeometryResult<ElementGeometry>>> {
    let rows = self.rows(eids)?;
    let need_area = request.area || request.mass;
    if !(need_area || request.normal) {
      let nothing = ElementGeometry { mass: None, area: None, normal: None };
      return Ok(vec![Ok(nothing); rows.len()]);
    }
    let mass_per_area = if request.mass {
      let pids = rows.iter().map(|&r| self.property_id[r]).collect_vec();
      Some(self.model.properties.mass_per_area(&pids)?)
    } else {
      None
    };
    return Ok(
      self.shell_geometry(&rows)?
        .into_iter()
        .enumerate()
        .map(|(k, geom)| {
          let geom = geom?;
          return Ok(ElementGeometry {
            mass: mass_per_area.as_ref().map(|mpa| mpa[k] * geom.area),
            area: need_area.then_some(geom.area),
            normal: request.normal.then_some(geom.normal)
          });
        })
        .collect()
    );
  }

  /// Masses of some elements, or all of them.
  pub fn get_mass(
    &self,
    eids: Option<&[i32]>
  ) -> BdfResult<Vec<GeometryResult<f64>>> {
    let rows = self.rows(eids)?;
    let pids = rows.iter().map(|&r| self.property_id[r]).collect_vec();
    let mass_per_area = self.model.properties.mass_per_area(&pids)?;
    return Ok(
      self.shell_geometry(&rows)?
        .into_iter()
        .zip(mass_per_area)
        .map(|(geom, mpa)| geom.map(|g| mpa * g.area))
        .collect()
    );
  }

  /// Areas of some elements, or all of them.
  pub fn get_area(
    &self,
    eids: Option<&[i32]>
  ) -> BdfResult<Vec<GeometryResult<f64>>> {
    return Ok(
      self.shell_geometry(&self.rows(eids)?)?
        .into_iter()
        .map(|geom| geom.map(|g| g.area))
        .collect()
    );
  }

  /// Unit normals of some elements, or all of them.
  pub fn get_normal(
    &self,
    eids: Option<&[i32]>
  ) -> BdfResult<Vec<GeometryResult<Unit<Vector3<f64>>>>> {
    return Ok(
      self.shell_geometry(&self.rows(eids)?)?
        .into_iter()
        .map(|geom| geom.map(|g| g.normal))
        .collect()
    );
  }

  /// Total mass of some elements, or all of them. A degenerate element is
  /// an error here.
  pub fn total_mass(&self, eids: Option<&[i32]>) -> BdfResult<f64> {
    let masses = self.get_mass(eids)?;
    let mut total = 0.0;
    let eids = eids.unwrap_or(&self.element_id[..]);
    for (&eid, mass) in eids.iter().zip(masses) {
      total += mass.map_err(|cause| BdfError::Geometry { eid, cause })?;
    }
    return Ok(total);
  }

  /// Writes some elements, or all of them, as fixed-width CQUAD8 cards in
  /// the order requested. Only the ID, property and corner nodes are
  /// written. Requesting the same element twice, or an ID too wide for its
  /// field, is an error, and then nothing is written.
  pub fn write_cards<W: Write>(
    &self,
    sink: &mut W,
    eids: Option<&[i32]>
  ) -> BdfResult<()> {
    if let Some(dup) = eids.and_then(|e| e.iter().duplicates().next()) {
      return Err(BdfError::DuplicateId {
        what: "requested element",
        id: *dup
      });
    }
    let rows = self.rows(eids)?;
    let mut text = String::new();
    for r in rows {
      let nodes = &self.node_ids[r];
      let fields: Vec<CardField> = [
        self.element_id[r],
        self.property_id[r],
        nodes[0],
        nodes[1],
        nodes[2],
        nodes[3]
      ].into_iter().map(CardField::from).collect();
      text.push_str(&print_card_8(CARD_NAME, &fields)?);
    }
    sink.write_all(text.as_bytes())?;
    return Ok(());
  }

  /// Computes the mass, area and normal of every element, failing on the
  /// first problem of any kind.
  pub fn verify(&self) -> BdfResult<()> {
    let geometry = self.get_geometry(None, GeometryRequest::ALL)?;
    for (eid, geom) in self.element_id.iter().zip(geometry) {
      let geom = geom.map_err(|cause| BdfError::Geometry { eid: *eid, cause })?;
      let finite = geom.mass.is_some_and(f64::is_finite)
        && geom.area.is_some_and(|a| a.is_finite() && a > 0.0);
      if !finite {
        warn!("{} {} has a non-finite mass or area.", CARD_NAME, eid);
        return Err(BdfError::Geometry {
          eid: *eid,
          cause: GeometryError::NonFinite
        });
      }
    }
    debug!("Verified {} {} elements.", self.n, CARD_NAME);
    return Ok(());
  }

  /// Number of elements.
  pub fn len(&self) -> usize {
    return self.n;
  }

  /// Whether there are no elements.
  pub fn is_empty(&self) -> bool {
    return self.n == 0;
  }

  /// Whether the store has been finalised.
  pub fn is_finalized(&self) -> bool {
    return self.finalized;
  }

  /// The element IDs.
  pub fn element_ids(&self) -> &[i32] {
    return &self.element_id;
  }

  /// The property IDs.
  pub fn property_ids(&self) -> &[i32] {
    return &self.property_id;
  }

  /// The node IDs, corners first.
  pub fn node_ids(&self) -> &[[i32; NODES]] {
    return &self.node_ids;
  }

  /// The thicknesses at each node position.
  pub fn thickness(&self) -> &[[f64; NODES]] {
    return &self.thickness;
  }

  /// The material orientations.
  pub fn theta_mcid(&self) -> &[IntOrReal] {
    return &self.theta_mcid;
  }

  /// The offsets.
  pub fn z_offsets(&self) -> &[f64] {
    return &self.z_offset;
  }

  /// The thickness flags.
  pub fn thickness_flags(&self) -> &[i32] {
    return &self.thickness_flag;
  }
}
