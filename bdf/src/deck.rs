//! This module implements the bulk data deck parser, which groups the cards
//! in a deck by type, and the builders that turn those cards into a model
//! and element stores.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use core::str::FromStr;

use clap::ValueEnum;
use convert_case::{Case, Casing};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::cards::*;
use crate::elements::cquad8::Cquad8;
use crate::errors::*;
use crate::model::*;

/// What a card contributes to a model.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CardRole {
  /// Grid points.
  Node,
  /// Coordinate systems.
  Coord,
  /// Properties and materials.
  Property,
  /// Elements.
  Element
}

/// Generates the CardType enum.
macro_rules! gen_card_types {
  (
    $(($vn:ident, $nm:literal, $role:ident),)*
  ) => {
    /// Supported bulk data cards.
    #[derive(
      Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd,
      Ord, ValueEnum
    )]
    #[clap(rename_all = "UPPER")]
    #[allow(missing_docs)]
    #[non_exhaustive]
    pub enum CardType {
      $($vn,)*
    }

    impl CardType {
      /// Returns the all-caps name of the card.
      pub const fn name(&self) -> &'static str {
        return match self {
          $(Self::$vn => $nm,)*
        };
      }

      /// Returns what the card contributes to a model.
      pub const fn role(&self) -> CardRole {
        return match self {
          $(Self::$vn => CardRole::$role,)*
        };
      }

      /// Returns a static slice with all supported cards.
      pub const fn all() -> &'static [Self] {
        return &[
          $(Self::$vn,)*
        ];
      }
    }

    impl FromStr for CardType {
      type Err = ();

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
          $(
            $nm => Ok(Self::$vn),
          )*
          _ => return Err(())
        };
      }
    }
  }
}

gen_card_types!(
  (Grid, "GRID", Node),
  (Cord1r, "CORD1R", Coord),
  (Cord1c, "CORD1C", Coord),
  (Cord1s, "CORD1S", Coord),
  (Cord2r, "CORD2R", Coord),
  (Cord2c, "CORD2C", Coord),
  (Cord2s, "CORD2S", Coord),
  (Pshell, "PSHELL", Property),
  (Mat1, "MAT1", Property),
  (Cquad8, "CQUAD8", Element),
);

impl CardType {
  /// Returns the snake-case name, for logs and file names.
  pub fn snake_name(&self) -> String {
    return self.name().to_case(Case::Snake);
  }

  /// All supported cards with some role.
  pub fn with_role(role: CardRole) -> impl Iterator<Item = Self> {
    return Self::all().iter().copied().filter(move |ct| ct.role() == role);
  }
}

impl Display for CardType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "{}", self.name());
  }
}

/// The parser might respond this after being fed a line.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum LineResponse {
  /// The line was blank.
  Blank,
  /// The line was only a comment.
  Comment,
  /// The line marked the start of the bulk data.
  BeginBulk,
  /// The line started a card; `None` if we don't support it.
  CardStart(Option<CardType>),
  /// The line continued the current card.
  Continuation,
  /// The line looked like a continuation, but there was no card to continue.
  Orphan,
  /// The line was ENDDATA.
  EndData,
  /// The line came after ENDDATA.
  AfterEnd
}

/// A card, as read, and the comment lines that came right before it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeckCard {
  /// The card.
  pub card: BdfCard,
  /// The comment, `$` signs removed, one line per line.
  pub comment: String
}

/// The cards in a deck, grouped by type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Deck {
  /// The name of the file it came from, if any.
  pub filename: Option<String>,
  /// Supported cards, by type, in deck order.
  cards: BTreeMap<CardType, Vec<DeckCard>>,
  /// How many cards of each unsupported name there were.
  unsupported: BTreeMap<String, usize>
}

impl Deck {
  /// The cards of a type, in deck order.
  pub fn cards(&self, ct: CardType) -> &[DeckCard] {
    return self.cards.get(&ct).map_or(&[], |v| v.as_slice());
  }

  /// How many cards of a type there are.
  pub fn count(&self, ct: CardType) -> usize {
    return self.cards(ct).len();
  }

  /// How many cards of each unsupported name were skipped.
  pub fn unsupported(&self) -> &BTreeMap<String, usize> {
    return &self.unsupported;
  }

  /// Builds the model: grid points, coordinate systems and properties, all
  /// resolved.
  pub fn build_model(&self) -> BdfResult<Model> {
    let mut model = Model::new();
    model.grids.allocate(self.count(CardType::Grid));
    for dc in self.cards(CardType::Grid) {
      model.grids.add(&dc.card)?;
    }
    model.grids.finalize()?;
    for ct in CardType::with_role(CardRole::Coord) {
      for dc in self.cards(ct) {
        model.coords.add_card(&dc.card)?;
      }
    }
    for ct in CardType::with_role(CardRole::Property) {
      for dc in self.cards(ct) {
        model.properties.add_card(&dc.card)?;
      }
    }
    model.resolve()?;
    return Ok(model);
  }

  /// Builds the finalised CQUAD8 store, bound to a model.
  pub fn build_cquad8<'m>(
    &self,
    model: ModelContext<'m>
  ) -> BdfResult<Cquad8<'m>> {
    let mut store = Cquad8::new(model);
    store.allocate(self.count(CardType::Cquad8));
    for dc in self.cards(CardType::Cquad8) {
      store.add(&dc.card, &dc.comment)?;
    }
    store.finalize()?;
    return Ok(store);
  }
}

/// This is the deck parser -- it doesn't care how lines are fed into it.
/// It's one-pass and keeps at most one card's worth of lines around.
#[derive(Debug, Default)]
pub struct DeckParser {
  /// The deck so far.
  deck: Deck,
  /// Lines of the card being read.
  current: Vec<String>,
  /// Comment attached to the card being read.
  current_comment: String,
  /// Comment lines waiting for the next card.
  pending_comment: Vec<String>,
  /// Whether ENDDATA was seen.
  ended: bool,
  /// The total number of consumed lines.
  total_lines: usize
}

impl DeckParser {
  /// Instantiates a new parser.
  pub fn new() -> Self {
    return Self::default();
  }

  /// Turns the lines of the current card into a card and files it.
  fn flush_card(&mut self) {
    if self.current.is_empty() {
      return;
    }
    let lines = std::mem::take(&mut self.current);
    let comment = std::mem::take(&mut self.current_comment);
    let card = match BdfCard::from_lines(&lines) {
      Some(card) => card,
      None => return
    };
    match card.name().parse::<CardType>() {
      Ok(ct) => self.deck.cards
        .entry(ct)
        .or_default()
        .push(DeckCard { card, comment }),
      Err(()) => {
        *self.deck.unsupported
          .entry(card.name().to_owned())
          .or_default() += 1;
      }
    };
  }

  /// Consumes a line into the parser.
  pub fn consume(&mut self, line: &str) -> LineResponse {
    self.total_lines += 1;
    if self.ended {
      return LineResponse::AfterEnd;
    }
    let upper = strip_comment(line).trim().to_uppercase();
    if upper.starts_with("BEGIN") && upper.contains("BULK") {
      // whatever came before was executive or case control
      self.current.clear();
      self.current_comment.clear();
      self.pending_comment.clear();
      self.deck.cards.clear();
      self.deck.unsupported.clear();
      debug!("Bulk data starts on line {}.", self.total_lines);
      return LineResponse::BeginBulk;
    }
    if upper.starts_with("ENDDATA") {
      self.flush_card();
      self.ended = true;
      debug!("Found ENDDATA on line {}.", self.total_lines);
      return LineResponse::EndData;
    }
    if upper.is_empty() {
      if let Some((_, text)) = line.split_once('$') {
        self.pending_comment.push(text.trim().to_owned());
        return LineResponse::Comment;
      }
      return LineResponse::Blank;
    }
    if is_continuation(line) {
      if self.current.is_empty() {
        warn!(
          "Line {} continues a card, but there's no card to continue!",
          self.total_lines
        );
        return LineResponse::Orphan;
      }
      self.current.push(line.to_owned());
      return LineResponse::Continuation;
    }
    self.flush_card();
    self.current.push(line.to_owned());
    self.current_comment = std::mem::take(&mut self.pending_comment)
      .join("\n");
    let name = split_line(line).0.unwrap_or_default();
    let name = name.trim_end_matches('*').to_uppercase();
    return LineResponse::CardStart(name.parse::<CardType>().ok());
  }

  /// Finishes up and returns the deck.
  pub fn finish(mut self) -> Deck {
    self.flush_card();
    for (name, count) in self.deck.unsupported.iter() {
      warn!("Skipped {} unsupported {} card(s).", count, name);
    }
    for (ct, cards) in self.deck.cards.iter() {
      debug!("Read {} {} card(s).", cards.len(), ct.snake_name());
    }
    return self.deck;
  }

  /// Parses from a BufRead instance.
  pub fn parse_bufread<R: BufRead>(reader: R) -> io::Result<Deck> {
    let mut parser = Self::new();
    for line in reader.lines() {
      parser.consume(&line?);
    }
    info!("Read {} lines of bulk data.", parser.total_lines);
    return Ok(parser.finish());
  }

  /// Utility method -- reads and parses a file.
  pub fn parse_file<S: AsRef<Path>>(p: S) -> io::Result<Deck> {
    let file = File::open(p.as_ref())?;
    let mut deck = Self::parse_bufread(BufReader::new(file))?;
    deck.filename = p.as_ref().file_name()
      .and_then(|s| s.to_str())
      .map(String::from);
    return Ok(deck);
  }
}
