//! CLI Module
//!
//! Command-line interface for TrueGIS drawing sessions.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::feature::CIRCLE_SIDES;

/// TrueGIS - deterministic drawing state for georeferenced sketches
#[derive(Parser, Debug)]
#[command(name = "truegis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new session directory
    #[command(name = "init")]
    Init {
        /// Path for the new session
        path: PathBuf,
    },

    /// Draw a shape into the session
    #[command(name = "add")]
    Add {
        /// Path to the session
        path: PathBuf,

        #[command(subcommand)]
        shape: Shape,
    },

    /// Translate one feature by an offset in degrees
    #[command(name = "move")]
    Move {
        /// Path to the session
        path: PathBuf,

        /// Feature index (see 'status')
        index: usize,

        /// Longitude offset
        #[arg(long, allow_hyphen_values = true)]
        dx: f64,

        /// Latitude offset
        #[arg(long, allow_hyphen_values = true)]
        dy: f64,
    },

    /// Change style properties of one feature, or of all features
    #[command(name = "restyle")]
    Restyle {
        /// Path to the session
        path: PathBuf,

        /// Feature index; omit to restyle every feature
        #[arg(long)]
        index: Option<usize>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Undo the last edit
    #[command(name = "undo")]
    Undo {
        /// Path to the session
        path: PathBuf,
    },

    /// Redo the last undone edit
    #[command(name = "redo")]
    Redo {
        /// Path to the session
        path: PathBuf,
    },

    /// Show the snapshot history
    #[command(name = "history")]
    History {
        /// Path to the session
        path: PathBuf,
    },

    /// Export the session as canonical GeoJSON
    #[command(name = "export")]
    Export {
        /// Path to the session
        path: PathBuf,

        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import features from a GeoJSON file
    #[command(name = "import")]
    Import {
        /// Path to the session
        path: PathBuf,

        /// GeoJSON file to import
        file: PathBuf,
    },

    /// Remove all drawings (undoable)
    #[command(name = "clear")]
    Clear {
        /// Path to the session
        path: PathBuf,
    },

    /// Show session metadata and feature summary
    #[command(name = "status")]
    Status {
        /// Path to the session
        path: PathBuf,
    },
}

/// Shapes the CLI can draw. Coordinates are `lon,lat` in degrees.
#[derive(Subcommand, Debug)]
pub enum Shape {
    /// A single point
    Point {
        /// Position as 'lon,lat'
        #[arg(long)]
        at: String,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// A line through two or more positions
    Line {
        /// Positions as 'lon,lat', in draw order
        #[arg(long, num_args = 2.., value_delimiter = ' ')]
        points: Vec<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// A polygon through three or more positions (closed automatically)
    Polygon {
        /// Ring positions as 'lon,lat', in draw order
        #[arg(long, num_args = 3.., value_delimiter = ' ')]
        points: Vec<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// A circle, stored as its fixed polygon approximation
    Circle {
        /// Center as 'lon,lat'
        #[arg(long)]
        center: String,

        /// Radius in degrees
        #[arg(long)]
        radius: f64,

        /// Number of polygon sides
        #[arg(long, default_value_t = CIRCLE_SIDES)]
        sides: usize,

        #[command(flatten)]
        style: StyleArgs,
    },
}

/// Optional style properties; anything omitted falls back to the canonical
/// defaults at export time.
#[derive(Args, Debug, Default)]
pub struct StyleArgs {
    /// Fill color as a hex string
    #[arg(long)]
    pub fill_color: Option<String>,

    /// Fill opacity in [0, 1]
    #[arg(long)]
    pub fill_opacity: Option<f64>,

    /// Stroke color as a hex string
    #[arg(long)]
    pub stroke_color: Option<String>,

    /// Stroke opacity in [0, 1]
    #[arg(long)]
    pub stroke_opacity: Option<f64>,

    /// Stroke width in pixels
    #[arg(long)]
    pub stroke_width: Option<u32>,
}
