//! This module implements the shell property and material tables, as far as
//! element mass goes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cards::*;
use crate::errors::*;
use crate::model::ShellProperties;

/// A PSHELL entry.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PShell {
  /// Property ID.
  pub pid: i32,
  /// Membrane material ID, if any.
  pub mid1: Option<i32>,
  /// Default membrane thickness.
  pub t: f64,
  /// Bending material ID, if any.
  pub mid2: Option<i32>,
  /// Non-structural mass per unit area.
  pub nsm: f64
}

impl PShell {
  /// Reads a PSHELL card.
  pub fn from_card(card: &BdfCard) -> BdfResult<Self> {
    expect_card(card, "PSHELL")?;
    let optional_mid = |i: usize, name: &'static str| {
      return integer_or_blank(card, i, name, 0)
        .map(|mid| if mid > 0 { Some(mid) } else { None });
    };
    return Ok(Self {
      pid: integer(card, 1, "pid")?,
      mid1: optional_mid(2, "mid1")?,
      t: double_or_blank(card, 3, "t", 0.0)?,
      mid2: optional_mid(4, "mid2")?,
      nsm: double_or_blank(card, 8, "nsm", 0.0)?
    });
  }
}

/// A MAT1 entry.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Mat1 {
  /// Material ID.
  pub mid: i32,
  /// Young's modulus.
  pub e: Option<f64>,
  /// Shear modulus.
  pub g: Option<f64>,
  /// Poisson's ratio.
  pub nu: Option<f64>,
  /// Mass density.
  pub rho: f64
}

impl Mat1 {
  /// Reads a MAT1 card.
  pub fn from_card(card: &BdfCard) -> BdfResult<Self> {
    expect_card(card, "MAT1")?;
    let optional = |i: usize, name: &'static str| {
      return match card.field(i) {
        Some(_) => double(card, i, name).map(Some),
        None => Ok(None)
      };
    };
    return Ok(Self {
      mid: integer(card, 1, "mid")?,
      e: optional(2, "e")?,
      g: optional(3, "g")?,
      nu: optional(4, "nu")?,
      rho: double_or_blank(card, 5, "rho", 0.0)?
    });
  }
}

/// Shell properties and the materials they use.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyTable {
  /// PSHELL entries by ID.
  pshells: BTreeMap<i32, PShell>,
  /// MAT1 entries by ID.
  materials: BTreeMap<i32, Mat1>
}

impl PropertyTable {
  /// Creates an empty table.
  pub fn new() -> Self {
    return Self::default();
  }

  /// Adds a PSHELL. IDs must be unique.
  pub fn add_pshell(&mut self, pshell: PShell) -> BdfResult<()> {
    if self.pshells.contains_key(&pshell.pid) {
      return Err(BdfError::DuplicateId { what: "property", id: pshell.pid });
    }
    self.pshells.insert(pshell.pid, pshell);
    return Ok(());
  }

  /// Adds a MAT1. IDs must be unique.
  pub fn add_mat1(&mut self, mat: Mat1) -> BdfResult<()> {
    if self.materials.contains_key(&mat.mid) {
      return Err(BdfError::DuplicateId { what: "material", id: mat.mid });
    }
    self.materials.insert(mat.mid, mat);
    return Ok(());
  }

  /// Adds a PSHELL or MAT1 card.
  pub fn add_card(&mut self, card: &BdfCard) -> BdfResult<()> {
    return match card.name() {
      "PSHELL" => self.add_pshell(PShell::from_card(card)?),
      "MAT1" => self.add_mat1(Mat1::from_card(card)?),
      other => Err(BdfError::WrongCard {
        expected: "PSHELL or MAT1",
        got: other.to_owned()
      })
    };
  }

  /// Gets a PSHELL.
  pub fn pshell(&self, pid: i32) -> Option<&PShell> {
    return self.pshells.get(&pid);
  }

  /// Gets a MAT1.
  pub fn material(&self, mid: i32) -> Option<&Mat1> {
    return self.materials.get(&mid);
  }

  /// Number of PSHELLs.
  pub fn npshells(&self) -> usize {
    return self.pshells.len();
  }

  /// Number of materials.
  pub fn nmaterials(&self) -> usize {
    return self.materials.len();
  }

  /// Mass per unit area of a single PSHELL: rho*t + nsm.
  fn pshell_mass_per_area(&self, pid: i32) -> BdfResult<f64> {
    let prop = self.pshells.get(&pid)
      .ok_or(BdfError::UnresolvedProperty(pid))?;
    let rho = match prop.mid1 {
      Some(mid) => self.materials.get(&mid)
        .ok_or(BdfError::UnresolvedMaterial(mid))?
        .rho,
      None => 0.0
    };
    return Ok(rho*prop.t + prop.nsm);
  }
}

impl ShellProperties for PropertyTable {
  fn mass_per_area(&self, pids: &[i32]) -> BdfResult<Vec<f64>> {
    return pids.iter()
      .map(|&pid| self.pshell_mass_per_area(pid))
      .collect();
  }
}
