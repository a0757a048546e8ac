//! Reads a bulk data deck, summarises it, and computes the geometry of its
//! CQUAD8 elements.

#![allow(clippy::needless_return)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use bdf::prelude::*;
use clap::Parser;
use log::*;
use serde::Serialize;

/// The arguments passed to the tool.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Only look at these elements. Can be specified more than once, or
  /// comma-separated. If absent, all elements are used.
  #[arg(short = 'e', long = "eids", num_args = 0.., value_delimiter = ',')]
  eids: Vec<i32>,
  /// Write per-element geometry to this CSV file ("-" for standard output).
  #[arg(short = 'c', long = "csv")]
  csv: Option<PathBuf>,
  /// Echo the elements back as CQUAD8 cards to standard output.
  #[arg(short = 'E', long = "echo")]
  echo: bool,
  /// Output extra/debug info while parsing.
  #[arg(short = 'v', long = "verbose")]
  verbose: bool,
  /// File path (set to "-" to read from standard input).
  file: PathBuf
}

/// One row of the geometry CSV.
#[derive(Debug, Serialize)]
struct GeometryRow {
  /// Element ID.
  eid: i32,
  /// Property ID.
  pid: i32,
  /// Centroid, basic x.
  cx: f64,
  /// Centroid, basic y.
  cy: f64,
  /// Centroid, basic z.
  cz: f64,
  /// Area, if the element isn't degenerate.
  area: Option<f64>,
  /// Mass, if the element isn't degenerate.
  mass: Option<f64>,
  /// Unit normal, basic x.
  nx: Option<f64>,
  /// Unit normal, basic y.
  ny: Option<f64>,
  /// Unit normal, basic z.
  nz: Option<f64>,
  /// "ok", or what's wrong with the element.
  status: String
}

/// Indentation for nested log lines.
const INDENT: &str = "  ";

/// Logs an error and quits.
fn bail(e: BdfError) -> ! {
  error!("{}", e);
  std::process::exit(1);
}

/// Writes the geometry of some elements as CSV.
fn write_csv<W: Write>(
  sink: W,
  store: &Cquad8,
  eids: Option<&[i32]>
) -> io::Result<()> {
  let centroids = store.get_centroid(eids).unwrap_or_else(|e| bail(e));
  let geometry = store.get_geometry(eids, GeometryRequest::ALL)
    .unwrap_or_else(|e| bail(e));
  let rows = store.checked_index(eids.unwrap_or(store.element_ids()))
    .unwrap_or_else(|e| bail(e));
  let mut wtr = csv::Writer::from_writer(sink);
  for ((row, centroid), geom) in rows.into_iter().zip(centroids).zip(geometry)
  {
    let (geom, status) = match geom {
      Ok(g) => (g, "ok".to_owned()),
      Err(e) => (ElementGeometry::default(), e.to_string())
    };
    let normal = geom.normal.map(|n| n.into_inner());
    wtr.serialize(GeometryRow {
      eid: store.element_ids()[row],
      pid: store.property_ids()[row],
      cx: centroid.x,
      cy: centroid.y,
      cz: centroid.z,
      area: geom.area,
      mass: geom.mass,
      nx: normal.map(|n| n.x),
      ny: normal.map(|n| n.y),
      nz: normal.map(|n| n.z),
      status
    })?;
  }
  wtr.flush()?;
  return Ok(());
}

fn main() -> io::Result<()> {
  // init cli stuff
  let args = Cli::parse();
  let log_level = if args.verbose {
    LevelFilter::Debug
  } else {
    LevelFilter::Info
  };
  env_logger::builder().filter_level(log_level).init();
  // parse the file
  let deck: Deck = if args.file.as_os_str().eq_ignore_ascii_case("-") {
    DeckParser::parse_bufread(BufReader::new(io::stdin()))?
  } else if args.file.is_file() {
    if let Some(sbn) = args.file.file_name().and_then(|bn| bn.to_str()) {
      info!("Parsing {}...", sbn);
    } else {
      info!("Parsing...");
    }
    DeckParser::parse_file(&args.file)?
  } else {
    error!("Provided path either does not exist or is not a file!");
    std::process::exit(1);
  };
  info!("Done parsing.");
  // print card counts
  info!("Supported cards found:");
  for ct in CardType::all() {
    if deck.count(*ct) > 0 {
      info!("{}- {}: {}", INDENT, ct, deck.count(*ct));
    }
  }
  if deck.unsupported().is_empty() {
    info!("No unsupported cards found.");
  } else {
    info!("Unsupported cards found:");
    for (name, count) in deck.unsupported() {
      info!("{}- {}: {}", INDENT, name, count);
    }
  }
  // build everything
  let model = deck.build_model().unwrap_or_else(|e| bail(e));
  info!(
    "Model has {} grid points, {} coordinate systems, {} PSHELLs and {} \
     MAT1s.",
    model.grids.len(),
    model.coords.len(),
    model.properties.npshells(),
    model.properties.nmaterials()
  );
  let store = deck.build_cquad8(model.context()).unwrap_or_else(|e| bail(e));
  info!("Stored {} {} elements.", store.len(), CARD_NAME);
  let eids = if args.eids.is_empty() {
    None
  } else {
    Some(args.eids.as_slice())
  };
  match store.verify() {
    Ok(()) => info!("All elements have sound geometry."),
    Err(e) => warn!("{}", e)
  };
  match store.total_mass(eids) {
    Ok(mass) => info!("Total mass: {}", mass),
    Err(e) => warn!("Couldn't compute the total mass: {}", e)
  };
  // outputs
  if let Some(ref path) = args.csv {
    let output: BufWriter<Box<dyn Write>> = BufWriter::new(
      if path.as_os_str() == "-" {
        Box::new(io::stdout())
      } else {
        Box::new(File::create(path)?)
      }
    );
    write_csv(output, &store, eids)?;
    info!("Wrote geometry CSV.");
  }
  if args.echo {
    let mut out = BufWriter::new(io::stdout());
    store.write_cards(&mut out, eids).unwrap_or_else(|e| bail(e));
    out.flush()?;
  }
  info!("All done.");
  return Ok(());
}
