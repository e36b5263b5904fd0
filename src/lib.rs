//! # mkvtree
//!
//! A Matroska (MKV/WebM) container parser that reads a seekable byte source
//! and produces a structured, navigable tree of its EBML elements, together
//! with optional derived indices (keyframe positions and frame timecodes).
//!
//! The parser is selective: the caller names the level-1 Segment sections
//! to materialize, and the traversal engine uses the file's SeekHead (or a
//! backward tail scan over the packed level-1 containers) to read only
//! those, skipping Cluster payloads entirely unless asked for.
//!
//! ## Example: reading segment metadata
//!
//! ```no_run
//! use mkvtree::{parse_file, ParseOptions};
//!
//! let tree = parse_file("video.mkv", ParseOptions::default()).unwrap();
//! let segment = tree.segments()[0];
//!
//! if let Some(title) = tree.lookup(segment, "Info.Title") {
//!     println!("title: {}", tree.node(title).value);
//! }
//! for &track in tree.get_all(segment, "TrackEntry") {
//!     println!("track: {}", tree.path(track));
//! }
//! ```
//!
//! ## Example: keyframe index
//!
//! ```no_run
//! use mkvtree::{parse_file, ParseOptions};
//!
//! let options = ParseOptions::get(&["keyframes", "timecodes"]);
//! let tree = parse_file("video.mkv", options).unwrap();
//! println!("keyframes: {:?}", tree.keyframes);
//! println!("spans: {:?}", tree.timecode_spans);
//! ```
//!
//! ## Element structure
//!
//! ```text
//! EBML Header
//! Segment
//! ├── SeekHead (index to other sections)
//! ├── Info (TimecodeScale, Duration, ...)
//! ├── Tracks
//! │   └── TrackEntry
//! ├── Chapters
//! ├── Cues (seeking index)
//! ├── Tags
//! ├── Attachments
//! └── Cluster (media data)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod cook;
pub mod element;
pub mod error;
pub mod index;
pub mod options;
pub mod query;
pub mod reader;
pub mod schema;
pub mod source;
pub mod traverse;
pub mod vint;

pub use cook::snap_fps;
pub use element::{Children, Element, NodeId, Slot, TimecodeSpan, Tree, Value, UNKNOWN_NAME};
pub use error::{ParseError, Result};
pub use options::{EntryCallback, Observe, ParseOptions, Section};
pub use query::{BreadthFirst, DepthFirst};
pub use schema::{ids, schema, DefaultValue, ElementType, Schema, SchemaEntry, TrackKind};
pub use source::{ReadSeek, Source};

// Path patterns for the query helpers come straight from `regex`.
pub use regex::Regex;

use reader::Parser;
use std::io::{Read, Seek};
use std::path::Path;

/// Check whether a byte prefix carries the EBML signature.
pub fn is_ebml_signature(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..4] == [0x1A, 0x45, 0xDF, 0xA3]
}

/// Parse a seekable byte source into an element tree.
pub fn parse<R: Read + Seek + 'static>(reader: R, options: ParseOptions) -> Result<Tree> {
    parse_source(Source::new(reader)?, options)
}

/// Open a file read-shared and parse it.
pub fn parse_file<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Tree> {
    parse_source(Source::open(path)?, options)
}

fn parse_source(source: Source, mut options: ParseOptions) -> Result<Tree> {
    // The index builder resolves the video track and timecode scale from
    // the tree, so indexing implies Tracks and Info.
    if options.wants_index() {
        options.sections.insert(Section::Tracks);
        options.sections.insert(Section::Info);
    }

    let mut parser = Parser::new(source, options);
    traverse::run(&mut parser)?;

    if parser.opts.wants_index() && !parser.aborted {
        index::build(&mut parser)?;
    }

    let Parser { src, mut tree, opts, .. } = parser;
    if opts.keep_stream_open {
        tree.source = Some(src);
    }
    Ok(tree)
}
