//! This library implements types and functions to read Nastran bulk data
//! decks and GEOM1 geometry records into columnar, in-memory tables, and to
//! run batch geometric queries over the elements in them.
//!
//! Elements live in stores that are filled in bulk, sorted once, and then
//! only queried. Each store is bound to a model holding the grid points,
//! coordinate systems and properties it references.
//!
//! For now, the only element type is the CQUAD8, but the code is meant to be
//! expanded with more types in the same manner.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![allow(clippy::needless_return)]

pub mod cards;
pub mod coords;
pub mod deck;
pub mod elements;
pub mod errors;
pub mod grid;
pub mod kernel;
pub mod model;
pub mod op2;
pub mod properties;
pub mod util;
pub mod writer;


/// Re-exports the things needed to read a deck and query its elements.
pub mod prelude {
  pub use super::cards::{BdfCard, IntOrReal};
  pub use super::coords::*;
  pub use super::deck::*;
  pub use super::elements::cquad8::*;
  pub use super::errors::*;
  pub use super::grid::GridTable;
  pub use super::kernel::*;
  pub use super::model::*;
  pub use super::op2::RecordKey;
  pub use super::op2::geom1::*;
  pub use super::properties::*;
  pub use super::writer::*;
}
