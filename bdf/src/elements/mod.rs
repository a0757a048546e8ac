//! This module holds the element stores, one per supported element type.

pub mod cquad8;
