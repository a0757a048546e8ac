use std::io::Write;

use nalgebra::Point3;

use crate::deck::*;
use crate::model::NodePositions;

use super::{assert_near_point, STRIP_DECK};

#[test]
fn test_line_responses() {
  let mut parser = DeckParser::new();
  let mut feed = |line: &str| parser.consume(line);
  assert_eq!(feed("SOL 101"), LineResponse::CardStart(None));
  assert_eq!(feed("begin bulk"), LineResponse::BeginBulk);
  assert_eq!(feed("$ a comment"), LineResponse::Comment);
  assert_eq!(feed(""), LineResponse::Blank);
  assert_eq!(
    feed("GRID,1,,0.,0.,0."),
    LineResponse::CardStart(Some(CardType::Grid))
  );
  assert_eq!(feed("        1."), LineResponse::Continuation);
  assert_eq!(
    feed("CQUAD8*              1"),
    LineResponse::CardStart(Some(CardType::Cquad8))
  );
  assert_eq!(feed("ENDDATA"), LineResponse::EndData);
  assert_eq!(feed("GRID,2"), LineResponse::AfterEnd);
  let mut parser = DeckParser::new();
  assert_eq!(parser.consume("+       1"), LineResponse::Orphan);
}

#[test]
fn test_strip_deck() {
  let deck = DeckParser::parse_bufread(STRIP_DECK.as_bytes()).unwrap();
  assert_eq!(deck.count(CardType::Grid), 6);
  assert_eq!(deck.count(CardType::Pshell), 1);
  assert_eq!(deck.count(CardType::Mat1), 1);
  assert_eq!(deck.count(CardType::Cquad8), 2);
  assert_eq!(deck.count(CardType::Cord2r), 0);
  // executive control is forgotten, unsupported bulk data is counted
  assert_eq!(deck.unsupported().len(), 1);
  assert_eq!(deck.unsupported().get("CTRIA3"), Some(&1));
  // comments stick to the next card
  let quads = deck.cards(CardType::Cquad8);
  assert_eq!(quads[0].comment, "the first element");
  assert_eq!(quads[1].comment, "");
  // nothing after ENDDATA is read
  let model = deck.build_model().unwrap();
  assert_eq!(model.grids.node_ids(), &[1, 2, 3, 4, 5, 6]);
  assert!(model.properties.pshell(10).is_some());
  assert_eq!(model.properties.material(100).map(|m| m.rho), Some(7800.0));
}

#[test]
fn test_fixed_and_large_fields() {
  let deck_text = [
    "BEGIN BULK".to_owned(),
    format!(
      "{:<8}{:>8}{:8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
      "CORD2C", 1, "", "0.", "0.", "0.", "0.", "0.", "1."
    ),
    format!("{:8}{:>8}{:>8}{:>8}", "", "1.", "0.", "0."),
    format!("{:<8}{:>16}{:>16}{:>16}{:>16}", "GRID*", 10, 1, "2.", "90."),
    format!("{:<8}{:>16}", "*", "1."),
    format!("{:<8}{:>8}{:8}{:>8}{:>8}{:>8}", "GRID", 1, "", "0.", "0.", "0."),
    format!("{:<8}{:>8}{:8}{:>8}{:>8}{:>8}", "GRID", 2, "", "0.", "0.", "1."),
    format!("{:<8}{:>8}{:8}{:>8}{:>8}{:>8}", "GRID", 3, "", "0.", "1.", "0."),
    format!("{:<8}{:>8}{:>8}{:>8}{:>8}", "CORD1R", 7, 1, 2, 3),
    "GRID,20,7,1.,2.,3.".to_owned(),
    "ENDDATA".to_owned(),
  ].join("\n");
  let deck = DeckParser::parse_bufread(deck_text.as_bytes()).unwrap();
  assert_eq!(deck.count(CardType::Grid), 5);
  assert!(deck.unsupported().is_empty());
  let model = deck.build_model().unwrap();
  let positions = model.grids.position_by_id(&[10, 20, 2]).unwrap();
  assert_near_point(&positions[0], &Point3::new(0.0, 2.0, 1.0));
  assert_near_point(&positions[1], &Point3::new(-2.0, 1.0, 3.0));
  assert_near_point(&positions[2], &Point3::new(0.0, 0.0, 1.0));
  // a deck can refer to systems that aren't there
  let bad = "GRID,1,5,0.,0.,0.\n";
  let deck = DeckParser::parse_bufread(bad.as_bytes()).unwrap();
  assert!(deck.build_model().is_err());
}

#[test]
fn test_card_types() {
  for ct in CardType::all() {
    assert_eq!(ct.name().parse::<CardType>(), Ok(*ct));
    assert_eq!(ct.to_string(), ct.name());
    let snake = ct.snake_name();
    assert!(snake.chars().all(|c| c.is_ascii_lowercase()
      || c.is_ascii_digit()
      || c == '_'));
  }
  assert_eq!(CardType::with_role(CardRole::Coord).count(), 6);
  assert_eq!(
    CardType::with_role(CardRole::Element).collect::<Vec<_>>(),
    vec![CardType::Cquad8]
  );
  assert!("CTRIA3".parse::<CardType>().is_err());
}

#[test]
fn test_parse_file() {
  let path = std::env::temp_dir().join("bdf_test_parse_file.bdf");
  let mut file = std::fs::File::create(&path).unwrap();
  file.write_all(STRIP_DECK.as_bytes()).unwrap();
  drop(file);
  let deck = DeckParser::parse_file(&path).unwrap();
  assert_eq!(deck.filename.as_deref(), Some("bdf_test_parse_file.bdf"));
  assert_eq!(deck.count(CardType::Cquad8), 2);
  std::fs::remove_file(&path).unwrap();
  assert!(DeckParser::parse_file(&path).is_err());
}

#[test]
fn test_grids_write_and_read_back() {
  let deck = DeckParser::parse_bufread(STRIP_DECK.as_bytes()).unwrap();
  let model = deck.build_model().unwrap();
  let mut out: Vec<u8> = Vec::new();
  model.grids.write_cards(&mut out).unwrap();
  let text = String::from_utf8(out).unwrap();
  assert_eq!(text.lines().count(), 6);
  assert!(text.lines().all(|l| l.starts_with("GRID    ")));
  let again = DeckParser::parse_bufread(text.as_bytes()).unwrap();
  let rebuilt = again.build_model().unwrap();
  assert_eq!(rebuilt.grids.node_ids(), model.grids.node_ids());
  let ids = model.grids.node_ids().to_vec();
  let before = model.grids.position_by_id(&ids).unwrap();
  let after = rebuilt.grids.position_by_id(&ids).unwrap();
  for (a, b) in before.iter().zip(after.iter()) {
    assert_near_point(a, b);
  }
}
