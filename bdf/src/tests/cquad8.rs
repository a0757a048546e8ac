use nalgebra::{Point3, Vector3};

use crate::cards::IntOrReal;
use crate::deck::*;
use crate::elements::cquad8::*;
use crate::errors::*;
use crate::kernel::GeometryError;
use crate::model::*;

use super::{assert_near_point, card, STRIP_DECK};

/// Parses a deck from a string.
fn parse(text: &str) -> Deck {
  return DeckParser::parse_bufread(text.as_bytes()).unwrap();
}

/// A CQUAD8 card with just the ID, property and corners.
fn quad(eid: i32, pid: i32, corners: [i32; 4]) -> crate::cards::BdfCard {
  let fields = [eid, pid, corners[0], corners[1], corners[2], corners[3]]
    .map(|x| x.to_string());
  let fields = fields.iter().map(String::as_str).collect::<Vec<_>>();
  return card("CQUAD8", &fields);
}

#[test]
fn test_fill_and_sort() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  store.allocate(2);
  store.add(&quad(100, 5, [1, 2, 3, 4]), "").unwrap();
  store.add(&quad(50, 5, [5, 6, 7, 8]), "second").unwrap();
  store.finalize().unwrap();
  assert!(store.is_finalized());
  assert_eq!(store.len(), 2);
  assert_eq!(store.element_ids(), &[50, 100]);
  assert_eq!(store.property_ids(), &[5, 5]);
  assert_eq!(store.node_ids()[0], [5, 6, 7, 8, 0, 0, 0, 0]);
  assert_eq!(store.node_ids()[1], [1, 2, 3, 4, 0, 0, 0, 0]);
  // lookups are independent, repeats are fine
  assert_eq!(store.lookup_index(&[100, 50, 100]), vec![1, 0, 1]);
  assert_eq!(store.checked_index(&[100, 50]).unwrap(), vec![1, 0]);
  // finalising again changes nothing
  store.finalize().unwrap();
  assert_eq!(store.element_ids(), &[50, 100]);
}

#[test]
fn test_lookup_round_trip() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  let added = (0..50)
    .map(|k| ((k * 37) % 101 + 1, [k + 1, k + 2, k + 3, k + 4]))
    .collect::<Vec<(i32, [i32; 4])>>();
  store.allocate(added.len());
  for (eid, corners) in added.iter() {
    store.add(&quad(*eid, eid % 3, *corners), "").unwrap();
  }
  store.finalize().unwrap();
  assert!(store.element_ids().windows(2).all(|w| w[0] < w[1]));
  for (eid, corners) in added.iter() {
    let row = store.lookup_index(&[*eid])[0];
    assert_eq!(store.element_ids()[row], *eid);
    assert_eq!(store.property_ids()[row], eid % 3);
    assert_eq!(store.node_ids()[row][..4], corners[..]);
  }
  // absent IDs don't panic, they're just not found
  let rows = store.lookup_index(&[0, 1000]);
  assert_eq!(rows, vec![0, store.len()]);
  assert!(matches!(
    store.checked_index(&[1000]),
    Err(BdfError::UnknownElement(1000))
  ));
}

#[test]
fn test_optional_fields() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  store.allocate(2);
  let full = [
    "1", "5", "1", "2", "3", "4", "", "", "", "",
    "1.5", "", "", "", "7", "0.25", "2"
  ];
  store.add(&card("CQUAD8", &full), "").unwrap();
  // the property is required
  let no_pid = ["2", "", "1", "2", "3", "4", "5", "6", "7", "8"];
  assert!(matches!(
    store.add(&card("CQUAD8", &no_pid), ""),
    Err(BdfError::Field { index: 2, problem: FieldProblem::Missing, .. })
  ));
  let mid_side = ["2", "6", "1", "2", "3", "4", "5", "6", "7", "8"];
  store.add(&card("CQUAD8", &mid_side), "").unwrap();
  store.finalize().unwrap();
  assert_eq!(store.thickness()[0], [1.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
  assert_eq!(store.theta_mcid()[0], IntOrReal::Int(7));
  assert_eq!(store.z_offsets()[0], 0.25);
  assert_eq!(store.thickness_flags()[0], 2);
  assert_eq!(store.property_ids(), &[5, 6]);
  assert_eq!(store.node_ids()[1], [1, 2, 3, 4, 5, 6, 7, 8]);
  assert_eq!(store.thickness()[1], [DEFAULT_THICKNESS; NODES]);
  assert_eq!(store.theta_mcid()[1], IntOrReal::Real(0.0));
  assert_eq!(store.z_offsets()[1], 0.0);
}

#[test]
fn test_lifecycle_errors() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  // queries need a finalised store
  assert!(matches!(
    store.get_centroid(None),
    Err(BdfError::NotFinalized(_))
  ));
  store.allocate(1);
  store.add(&quad(1, 1, [1, 2, 3, 4]), "").unwrap();
  assert!(matches!(
    store.add(&quad(2, 1, [1, 2, 3, 4]), ""),
    Err(BdfError::CapacityExceeded { capacity: 1 })
  ));
  // partial fills are rejected
  store.allocate(2);
  store.add(&quad(1, 1, [1, 2, 3, 4]), "").unwrap();
  assert!(matches!(
    store.finalize(),
    Err(BdfError::IncompleteFill { filled: 1, capacity: 2 })
  ));
  // corners must be positive
  store.allocate(2);
  store.add(&quad(1, 1, [1, 2, 3, 4]), "").unwrap();
  store.add(&quad(2, 1, [1, 2, -3, 4]), "").unwrap();
  assert!(matches!(
    store.finalize(),
    Err(BdfError::NonPositiveNode { eid: 2, nid: -3 })
  ));
  // element IDs must be unique
  store.allocate(2);
  store.add(&quad(1, 1, [1, 2, 3, 4]), "").unwrap();
  store.add(&quad(1, 1, [5, 6, 7, 8]), "").unwrap();
  assert!(matches!(
    store.finalize(),
    Err(BdfError::DuplicateId { what: "element", id: 1 })
  ));
  // cards must be whole, and be CQUAD8s
  store.allocate(1);
  assert!(matches!(
    store.add(&card("CQUAD8", &["1", "1", "1", "2", "3"]), ""),
    Err(BdfError::Field { index: 6, problem: FieldProblem::Missing, .. })
  ));
  assert!(matches!(
    store.add(&card("CQUAD4", &["1", "1", "1", "2", "3", "4"]), ""),
    Err(BdfError::WrongCard { expected: "CQUAD8", .. })
  ));
}

#[test]
fn test_empty_store() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  store.finalize().unwrap();
  assert!(store.is_empty());
  assert!(store.get_centroid(None).unwrap().is_empty());
  assert!(store.get_geometry(None, GeometryRequest::ALL).unwrap().is_empty());
  assert!(store.get_mass(None).unwrap().is_empty());
  assert_eq!(store.total_mass(None).unwrap(), 0.0);
  assert!(store.lookup_index(&[1]) == vec![0]);
  let mut out: Vec<u8> = Vec::new();
  store.write_cards(&mut out, None).unwrap();
  assert!(out.is_empty());
  store.verify().unwrap();
  // same thing with an explicit zero capacity
  store.allocate(0);
  store.finalize().unwrap();
  assert_eq!(store.len(), 0);
}

#[test]
fn test_geometry_queries() {
  let deck = parse(STRIP_DECK);
  let model = deck.build_model().unwrap();
  let store = deck.build_cquad8(model.context()).unwrap();
  assert_eq!(store.element_ids(), &[100, 200]);
  let centroids = store.get_centroid(None).unwrap();
  assert_near_point(&centroids[0], &Point3::new(1.5, 0.5, 0.0));
  assert_near_point(&centroids[1], &Point3::new(0.5, 0.5, 0.0));
  let centroids = store.get_centroid(Some(&[200])).unwrap();
  assert_near_point(&centroids[0], &Point3::new(0.5, 0.5, 0.0));
  let near = |a: f64, b: f64| (a - b).abs() < 1e-9 * b.abs().max(1.0);
  for area in store.get_area(None).unwrap() {
    assert!(near(area.unwrap(), 1.0));
  }
  for normal in store.get_normal(None).unwrap() {
    assert!((normal.unwrap().into_inner() - Vector3::z()).norm() < 1e-12);
  }
  // rho*t = 7800*0.1 per unit area
  for mass in store.get_mass(None).unwrap() {
    assert!(near(mass.unwrap(), 780.0));
  }
  assert!(near(store.total_mass(None).unwrap(), 1560.0));
  assert!(near(store.total_mass(Some(&[200])).unwrap(), 780.0));
  // asking for the mass gets the area too, in the order asked for
  let request = GeometryRequest { mass: true, ..Default::default() };
  let geometry = store.get_geometry(Some(&[200, 100, 200]), request).unwrap();
  assert_eq!(geometry.len(), 3);
  for geom in geometry {
    let geom = geom.unwrap();
    assert!(near(geom.mass.unwrap(), 780.0));
    assert!(near(geom.area.unwrap(), 1.0));
    assert_eq!(geom.normal, None);
  }
  let nothing = store.get_geometry(None, GeometryRequest::default()).unwrap();
  assert!(nothing.iter().all(|g| g.as_ref().unwrap().area.is_none()));
  store.verify().unwrap();
  assert!(matches!(
    store.get_centroid(Some(&[999])),
    Err(BdfError::UnknownElement(999))
  ));
}

#[test]
fn test_write_cards() {
  let deck = parse(STRIP_DECK);
  let model = deck.build_model().unwrap();
  let store = deck.build_cquad8(model.context()).unwrap();
  let mut out: Vec<u8> = Vec::new();
  store.write_cards(&mut out, Some(&[200, 100])).unwrap();
  let text = String::from_utf8(out).unwrap();
  let lines = text.lines().collect::<Vec<_>>();
  assert_eq!(lines.len(), 2);
  assert_eq!(
    lines[0],
    format!(
      "{:<8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
      "CQUAD8", 200, 10, 1, 2, 3, 4
    )
  );
  assert!(lines[1].starts_with("CQUAD8") && lines[1].contains("100"));
  // and the written cards read back into the same store
  let rebuilt = parse(&text).build_cquad8(model.context()).unwrap();
  assert_eq!(rebuilt.element_ids(), store.element_ids());
  assert_eq!(rebuilt.property_ids(), store.property_ids());
  assert_eq!(rebuilt.node_ids(), store.node_ids());
  // duplicates and strangers are rejected
  let mut out: Vec<u8> = Vec::new();
  assert!(matches!(
    store.write_cards(&mut out, Some(&[100, 200, 100])),
    Err(BdfError::DuplicateId { id: 100, .. })
  ));
  assert!(matches!(
    store.write_cards(&mut out, Some(&[7])),
    Err(BdfError::UnknownElement(7))
  ));
  assert!(out.is_empty());
}

#[test]
fn test_write_cards_rejects_wide_ids() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  store.allocate(2);
  store.add(&quad(1, 5, [1, 2, 3, 4]), "").unwrap();
  store.add(&quad(123456789, 5, [1, 2, 3, 4]), "").unwrap();
  store.finalize().unwrap();
  let mut out: Vec<u8> = Vec::new();
  assert!(matches!(
    store.write_cards(&mut out, None),
    Err(BdfError::FieldTooWide { ref value, .. }) if value == "123456789"
  ));
  // nothing half-written
  assert!(out.is_empty());
  // the ones that fit still go out
  store.write_cards(&mut out, Some(&[1])).unwrap();
  assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}

#[test]
fn test_written_cards_are_lossy() {
  let model = Model::new();
  let mut store = Cquad8::new(model.context());
  store.allocate(1);
  let full = [
    "9", "3", "1", "2", "3", "4", "5", "6", "7", "8",
    "2.", "2.", "2.", "2.", "15.", "0.5", "1"
  ];
  store.add(&card("CQUAD8", &full), "").unwrap();
  store.finalize().unwrap();
  let mut out: Vec<u8> = Vec::new();
  store.write_cards(&mut out, None).unwrap();
  let text = String::from_utf8(out).unwrap();
  assert_eq!(text.lines().count(), 1);
  let rebuilt = parse(&text).build_cquad8(model.context()).unwrap();
  assert_eq!(rebuilt.element_ids(), &[9]);
  assert_eq!(rebuilt.property_ids(), &[3]);
  assert_eq!(rebuilt.node_ids()[0], [1, 2, 3, 4, 0, 0, 0, 0]);
  assert_eq!(rebuilt.thickness()[0], [DEFAULT_THICKNESS; NODES]);
  assert_eq!(rebuilt.z_offsets()[0], 0.0);
}

#[test]
fn test_degenerate_and_unresolved() {
  let base = "\
GRID,1,,0.,0.,0.
GRID,2,,1.,0.,0.
GRID,3,,2.,0.,0.
GRID,4,,2.,1.,0.
GRID,5,,0.,1.,0.
PSHELL,10,,0.1,,,,,0.5
CQUAD8,1,10,1,2,3,4
CQUAD8,2,10,1,3,4,5
";
  let deck = parse(base);
  let model = deck.build_model().unwrap();
  let store = deck.build_cquad8(model.context()).unwrap();
  let areas = store.get_area(None).unwrap();
  assert_eq!(areas[0], Err(GeometryError::Collinear { corners: [0, 1, 2] }));
  assert!((areas[1].unwrap() - 2.0).abs() < 1e-12);
  // no material, so the mass is all non-structural
  let masses = store.get_mass(None).unwrap();
  assert!(masses[0].is_err());
  assert!((masses[1].unwrap() - 1.0).abs() < 1e-12);
  assert!(matches!(
    store.total_mass(None),
    Err(BdfError::Geometry { eid: 1, .. })
  ));
  assert!((store.total_mass(Some(&[2])).unwrap() - 1.0).abs() < 1e-12);
  // the bad element is named whatever order it's asked for in
  assert!(matches!(
    store.total_mass(Some(&[2, 1])),
    Err(BdfError::Geometry { eid: 1, .. })
  ));
  assert!(matches!(
    store.verify(),
    Err(BdfError::Geometry {
      eid: 1,
      cause: GeometryError::Collinear { .. }
    })
  ));
  // a property that doesn't exist fails mass queries as a whole
  let deck = parse(&format!("{}CQUAD8,3,77,1,3,4,5\n", base));
  let model = deck.build_model().unwrap();
  let store = deck.build_cquad8(model.context()).unwrap();
  assert!(matches!(
    store.get_mass(None),
    Err(BdfError::UnresolvedProperty(77))
  ));
  assert!(matches!(store.verify(), Err(BdfError::UnresolvedProperty(77))));
  assert_eq!(store.get_area(Some(&[3])).unwrap().len(), 1);
  // and so does a node that doesn't exist, for anything geometric
  let mut store = Cquad8::new(model.context());
  store.allocate(1);
  store.add(&quad(4, 10, [1, 2, 3, 42]), "").unwrap();
  store.finalize().unwrap();
  assert!(matches!(
    store.get_centroid(None),
    Err(BdfError::UnresolvedNode(42))
  ));
}
