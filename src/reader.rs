//! The element reader: decodes one child element at the cursor, attaches it
//! to the tree, and drives the observer protocol.
//!
//! The reader resolves identifiers against the schema (globals first, then
//! the parent scope, then ancestor scopes honoring recursion), applies the
//! skip policy for unrequested sections, decodes and cooks leaf payloads,
//! and recurses into containers.

use crate::cook;
use crate::element::{Children, Element, NodeId, Tree, Value, UNKNOWN_NAME};
use crate::error::{ParseError, Result};
use crate::options::{Observe, ParseOptions, Section};
use crate::schema::{ids, schema, DefaultValue, ElementType, SchemaEntry};
use crate::source::Source;
use crate::vint;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace, warn};

/// Default timecode scale: one millisecond per tick.
pub(crate) const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Outcome of reading one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A child was produced (possibly skipped).
    Child(NodeId),
    /// End of the container.
    End,
    /// The observer requested termination.
    Abort,
}

/// Parse-session state threaded through the reader and traversal engine.
pub(crate) struct Parser {
    pub src: Source,
    pub tree: Tree,
    pub opts: ParseOptions,
    /// Session timecode scale, nanoseconds per tick.
    pub scale: u64,
    /// FPS of the video track, once known.
    pub video_fps: Option<f64>,
    /// Sections satisfied within the current Segment.
    pub satisfied: HashSet<Section>,
    /// SeekHead entries of the current Segment: element id to absolute offset.
    pub seeks: BTreeMap<u64, u64>,
    /// Absolute offsets of further SeekHeads referenced but not yet read.
    pub pending_seek_heads: Vec<u64>,
    /// Offsets already jumped to, for cycle protection.
    pub visited_seeks: HashSet<u64>,
    /// Set when the observer replied with abort.
    pub aborted: bool,
}

impl Parser {
    pub(crate) fn new(src: Source, opts: ParseOptions) -> Self {
        Self {
            src,
            tree: Tree::new(),
            opts,
            scale: DEFAULT_TIMECODE_SCALE,
            video_fps: None,
            satisfied: HashSet::new(),
            seeks: BTreeMap::new(),
            pending_seek_heads: Vec::new(),
            visited_seeks: HashSet::new(),
            aborted: false,
        }
    }

    /// Whether cluster metadata must be enumerated across the whole Segment.
    pub(crate) fn needs_cluster_enum(&self) -> bool {
        self.opts.wants_index() && !self.opts.use_cfr
    }

    /// Create and attach an element; returns its handle.
    pub(crate) fn attach(
        &mut self,
        parent: Option<NodeId>,
        id: u64,
        name: &'static str,
        kind: ElementType,
        offset: u64,
        data_offset: u64,
        size: Option<u64>,
        multiple: bool,
    ) -> NodeId {
        let (level, root) = match parent {
            Some(p) => {
                let node = self.tree.node(p);
                (node.level + 1, node.root.or(Some(p)))
            }
            None => (0, None),
        };

        let node = self.tree.alloc(Element {
            id,
            name,
            kind,
            offset,
            data_offset,
            size,
            level,
            parent,
            root,
            skipped: false,
            value: Value::None,
            raw: None,
            children: Children::default(),
        });

        match parent {
            Some(p) => {
                let promoted = self.tree.node_mut(p).children.insert(name, node, multiple);
                if promoted {
                    warn!(name, offset, "second occurrence of a non-multiple element");
                }
            }
            None => self.tree.add_root(node),
        }

        node
    }

    /// Invoke the caller's observer for a freshly produced element.
    pub(crate) fn observe(&mut self, node: NodeId) -> Observe {
        match self.opts.entry_callback.take() {
            Some(mut callback) => {
                let reply = callback(self.tree.node(node));
                self.opts.entry_callback = Some(callback);
                reply
            }
            None => Observe::Continue,
        }
    }

    /// Resolve an identifier in the context of `parent`.
    ///
    /// Order: global ids, then the parent scope, then ancestor scopes
    /// (honoring recursive entries, which index themselves). An identifier
    /// that only resolves at an ancestor closes the current container.
    fn resolve(&self, parent: NodeId, id: u64) -> Resolution {
        let s = schema();
        if let Some(entry) = s.global(id) {
            return Resolution::Here(entry);
        }
        if let Some(entry) = s.child(self.tree.node(parent).id, id) {
            return Resolution::Here(entry);
        }

        let mut cursor = self.tree.node(parent).parent;
        while let Some(ancestor) = cursor {
            if s.child(self.tree.node(ancestor).id, id).is_some() {
                return Resolution::Ancestor;
            }
            cursor = self.tree.node(ancestor).parent;
        }
        // Top-level entries (EBML, Segment) bound every unknown-size chain.
        if s.child(0, id).is_some() {
            return Resolution::Ancestor;
        }

        Resolution::Unknown
    }

    /// Skip policy for a resolved element under `parent`.
    ///
    /// Level-1 containers outside the requested set are skipped, as is Void
    /// everywhere; Cluster and Cues are skipped-but-recorded when only their
    /// byte ranges are needed for indexing.
    fn should_skip(&self, parent: NodeId, entry: &SchemaEntry) -> bool {
        if entry.id == ids::VOID {
            return true;
        }
        if self.tree.node(parent).name != "Segment" {
            return false;
        }
        match Section::from_id(entry.id) {
            // SeekHead always parses: its entries steer navigation.
            Some(Section::SeekHead) => false,
            Some(section) => !self.opts.wants(section),
            None => false,
        }
    }

    /// Read one child of `parent` at the cursor.
    pub(crate) fn read_child(&mut self, parent: NodeId) -> Result<Outcome> {
        let container_end = self.tree.node(parent).end();
        let offset = self.src.position();

        if offset >= self.src.len() {
            return Ok(Outcome::End);
        }
        if let Some(end) = container_end {
            if offset >= end {
                return Ok(Outcome::End);
            }
        }

        let (id, _) = vint::read_id(&mut self.src)?;

        let entry = match self.resolve(parent, id) {
            Resolution::Here(entry) => Some(entry),
            Resolution::Ancestor => {
                // Closes the container; for unknown-size containers this is
                // the "next recognized element" boundary.
                self.src.seek_to(offset)?;
                return Ok(Outcome::End);
            }
            Resolution::Unknown => None,
        };

        let size = match entry.and_then(|e| e.fixed_size) {
            Some(fixed) => Some(fixed),
            None => vint::read_size(&mut self.src)?.0,
        };
        let data_offset = self.src.position();

        if let (Some(end), Some(size)) = (container_end, size) {
            if data_offset + size > end {
                return Err(ParseError::Overrun {
                    offset,
                    payload_end: data_offset + size,
                    container_end: end,
                });
            }
        }

        let node = match entry {
            Some(entry) => {
                if self.should_skip(parent, entry) {
                    return self.skip_element(parent, entry, offset, data_offset, size);
                }
                match entry.kind {
                    ElementType::Master => {
                        return self.read_container(parent, entry, offset, data_offset, size)
                    }
                    _ => self.read_leaf(parent, entry, offset, data_offset, size)?,
                }
            }
            None => {
                trace!(id, offset, "unknown element");
                self.read_unknown(parent, id, offset, data_offset, size)?
            }
        };

        match self.observe(node) {
            Observe::Continue => Ok(Outcome::Child(node)),
            Observe::Skip => {
                self.tree.node_mut(node).skipped = true;
                Ok(Outcome::Child(node))
            }
            Observe::Abort => {
                self.aborted = true;
                Ok(Outcome::Abort)
            }
        }
    }

    /// Skip an element: attach metadata only and advance past the payload.
    fn skip_element(
        &mut self,
        parent: NodeId,
        entry: &'static SchemaEntry,
        offset: u64,
        data_offset: u64,
        size: Option<u64>,
    ) -> Result<Outcome> {
        let node = self.attach(
            Some(parent),
            entry.id,
            entry.name,
            entry.kind,
            offset,
            data_offset,
            size,
            entry.is_multiple(),
        );
        self.tree.node_mut(node).skipped = true;

        match size {
            Some(size) => self.src.seek_to(data_offset + size)?,
            None => {
                // Unknown size: bounded by the next level-1 section or EOF.
                let next = crate::traverse::scan_forward(
                    &mut self.src,
                    &crate::schema::LEVEL1_IDS,
                    usize::MAX,
                )?;
                if next.is_none() {
                    self.src.seek_to(self.src.len())?;
                }
            }
        }

        match self.observe(node) {
            Observe::Abort => {
                self.aborted = true;
                Ok(Outcome::Abort)
            }
            _ => Ok(Outcome::Child(node)),
        }
    }

    /// Read a container and recurse into its children.
    fn read_container(
        &mut self,
        parent: NodeId,
        entry: &'static SchemaEntry,
        offset: u64,
        data_offset: u64,
        size: Option<u64>,
    ) -> Result<Outcome> {
        let node = self.attach(
            Some(parent),
            entry.id,
            entry.name,
            entry.kind,
            offset,
            data_offset,
            size,
            entry.is_multiple(),
        );

        // Containers are announced before their children are read.
        match self.observe(node) {
            Observe::Abort => {
                self.aborted = true;
                return Ok(Outcome::Abort);
            }
            Observe::Skip => {
                self.tree.node_mut(node).skipped = true;
                match size {
                    Some(size) => self.src.seek_to(data_offset + size)?,
                    None => {
                        let next = crate::traverse::scan_forward(
                            &mut self.src,
                            &crate::schema::LEVEL1_IDS,
                            usize::MAX,
                        )?;
                        if next.is_none() {
                            self.src.seek_to(self.src.len())?;
                        }
                    }
                }
                return Ok(Outcome::Child(node));
            }
            Observe::Continue => {}
        }

        loop {
            match self.read_child(node)? {
                Outcome::Child(_) => {}
                Outcome::End => break,
                Outcome::Abort => return Ok(Outcome::Abort),
            }
        }

        // Consume any trailing slack inside a sized container.
        if let Some(size) = size {
            self.src.seek_to(data_offset + size)?;
        }

        self.container_closed(node);
        Ok(Outcome::Child(node))
    }

    /// Hooks that run when a container closes.
    fn container_closed(&mut self, node: NodeId) {
        match self.tree.node(node).name {
            "SeekHead" => self.index_seek_head(node),
            "TrackEntry" => self.note_video_fps(node),
            _ => {}
        }
    }

    /// Index a closed SeekHead: `SeekID` to `Segment payload start +
    /// SeekPosition`.
    fn index_seek_head(&mut self, seek_head: NodeId) {
        let segment_data = match self.tree.node(seek_head).root {
            Some(root) => self.tree.node(root).data_offset,
            None => return,
        };

        let mut found = Vec::new();
        for &seek in self.tree.get_all(seek_head, "Seek").to_vec().iter() {
            let id = self
                .tree
                .get(seek, "SeekID")
                .and_then(|n| self.tree.node(n).value.as_binary().map(vint::decode_uint));
            let position = self
                .tree
                .get(seek, "SeekPosition")
                .and_then(|n| self.tree.node(n).value.as_unsigned());
            if let (Some(id), Some(position)) = (id, position) {
                found.push((id, segment_data + position));
            }
        }

        for (id, offset) in found {
            trace!(id, offset, "seek entry");
            if id == ids::SEEK_HEAD {
                self.pending_seek_heads.push(offset);
            } else {
                self.seeks.insert(id, offset);
            }
        }
    }

    /// Remember the video frame rate once a video TrackEntry closes.
    fn note_video_fps(&mut self, track_entry: NodeId) {
        let is_video = self
            .tree
            .get(track_entry, "TrackType")
            .and_then(|n| self.tree.node(n).value.as_track_kind())
            == Some(crate::schema::TrackKind::Video);
        if !is_video {
            return;
        }
        if let Some(node) = self.tree.get(track_entry, "DefaultDuration") {
            if let Value::Fps(fps) = self.tree.node(node).value {
                self.video_fps = Some(fps);
            }
        }
    }

    /// Read and decode a known leaf element.
    fn read_leaf(
        &mut self,
        parent: NodeId,
        entry: &'static SchemaEntry,
        offset: u64,
        data_offset: u64,
        size: Option<u64>,
    ) -> Result<NodeId> {
        let size = match size {
            Some(size) => size,
            None => return Err(ParseError::UnknownSizeLeaf { offset }),
        };

        let value = if size == 0 {
            default_value(entry)
        } else {
            self.decode_payload(entry, offset, size)?
        };

        let node = self.attach(
            Some(parent),
            entry.id,
            entry.name,
            entry.kind,
            offset,
            data_offset,
            Some(size),
            entry.is_multiple(),
        );
        self.tree.node_mut(node).value = value;

        let mut scale = self.scale;
        cook::cook_leaf(&mut self.tree, &mut scale, self.video_fps, node);
        self.scale = scale;

        Ok(node)
    }

    /// Decode a non-empty leaf payload according to its declared type.
    fn decode_payload(
        &mut self,
        entry: &SchemaEntry,
        offset: u64,
        size: u64,
    ) -> Result<Value> {
        match entry.kind {
            ElementType::Unsigned => {
                if size > 8 {
                    warn!(name = entry.name, offset, size, "oversized integer payload");
                    self.src.skip(size)?;
                    return Ok(default_value(entry));
                }
                let data = self.src.read_vec(size)?;
                Ok(Value::Unsigned(vint::decode_uint(&data)))
            }
            ElementType::Signed => {
                if size > 8 {
                    warn!(name = entry.name, offset, size, "oversized integer payload");
                    self.src.skip(size)?;
                    return Ok(default_value(entry));
                }
                let data = self.src.read_vec(size)?;
                Ok(Value::Signed(vint::decode_int(&data)))
            }
            ElementType::Float => {
                let data = self.src.read_vec(size.min(16))?;
                if size > 16 {
                    self.src.skip(size - 16)?;
                }
                match vint::decode_float(&data) {
                    Some(value) => Ok(Value::Float(value)),
                    None => {
                        warn!(name = entry.name, offset, size, "unexpected float width");
                        Ok(default_value(entry))
                    }
                }
            }
            ElementType::String => {
                let data = self.src.read_vec(size)?;
                Ok(Value::Text(vint::decode_string(&data)))
            }
            ElementType::Date => {
                if size != 8 {
                    warn!(name = entry.name, offset, size, "DATE width is not 8 bytes");
                }
                if size > 8 {
                    let data = self.src.read_vec(8)?;
                    self.src.skip(size - 8)?;
                    Ok(Value::Date(vint::decode_date(&data)))
                } else {
                    let data = self.src.read_vec(size)?;
                    Ok(Value::Date(vint::decode_date(&data)))
                }
            }
            ElementType::Binary => Ok(Value::Binary(self.read_binary(entry, size)?)),
            ElementType::Master => unreachable!("containers have no leaf payload"),
        }
    }

    /// Read a binary payload honoring the size limit.
    ///
    /// `SeekID` is exempt: its value is what SeekHead navigation runs on.
    fn read_binary(&mut self, entry: &SchemaEntry, size: u64) -> Result<Vec<u8>> {
        let limit = self.opts.binary_size_limit;
        let capped = entry.id != ids::SEEK_ID && limit >= 0 && size > limit as u64;
        if capped {
            let data = self.src.read_vec(limit as u64)?;
            self.src.skip(size - limit as u64)?;
            Ok(data)
        } else {
            self.src.read_vec(size)
        }
    }

    /// Read an unknown-identifier element: preserved as raw binary, named
    /// `?`, never recursed into.
    fn read_unknown(
        &mut self,
        parent: NodeId,
        id: u64,
        offset: u64,
        data_offset: u64,
        size: Option<u64>,
    ) -> Result<NodeId> {
        let size = match size {
            Some(size) => size,
            None => return Err(ParseError::UnknownSizeLeaf { offset }),
        };

        let limit = self.opts.binary_size_limit;
        let value = if limit >= 0 && size > limit as u64 {
            let data = self.src.read_vec(limit as u64)?;
            self.src.skip(size - limit as u64)?;
            Value::Binary(data)
        } else {
            Value::Binary(self.src.read_vec(size)?)
        };

        let node = self.attach(
            Some(parent),
            id,
            UNKNOWN_NAME,
            ElementType::Binary,
            offset,
            data_offset,
            Some(size),
            false,
        );
        self.tree.node_mut(node).value = value;
        Ok(node)
    }

    /// Progress event for a level-1 element, when enabled.
    pub(crate) fn progress(&self, offset: u64) {
        if self.opts.show_progress {
            debug!(offset, total = self.src.len(), "progress");
        }
    }
}

/// How an identifier resolved against the schema.
enum Resolution {
    /// Valid at the current level.
    Here(&'static SchemaEntry),
    /// Valid only at an ancestor level: closes the current container.
    Ancestor,
    /// Not in the schema.
    Unknown,
}

/// Schema default for an empty payload, falling back to the type zero.
fn default_value(entry: &SchemaEntry) -> Value {
    match entry.default {
        Some(DefaultValue::Unsigned(v)) => match entry.kind {
            ElementType::Signed => Value::Signed(v as i64),
            _ => Value::Unsigned(v),
        },
        Some(DefaultValue::Float(v)) => Value::Float(v),
        Some(DefaultValue::Text(v)) => Value::Text(v.to_string()),
        None => match entry.kind {
            ElementType::Unsigned => Value::Unsigned(0),
            ElementType::Signed => Value::Signed(0),
            ElementType::Float => Value::Float(0.0),
            ElementType::String => Value::Text(String::new()),
            ElementType::Date => Value::Date(0),
            ElementType::Binary => Value::Binary(Vec::new()),
            ElementType::Master => Value::None,
        },
    }
}
