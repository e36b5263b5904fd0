//! Parse tree data model.
//!
//! Elements live in a flat arena owned by the [`Tree`]; parent, root, and
//! child links are integer handles, which keeps the graph cycle-free and
//! lets ancestor walks run without reference counting.

use crate::schema::{ElementType, TrackKind};
use crate::source::{ReadSeek, Source};
use std::time::Duration;

/// Handle of an element inside a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Index into the arena.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Name used for unknown-identifier elements.
pub const UNKNOWN_NAME: &str = "?";

/// A decoded element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value: containers and skipped elements.
    None,
    /// Unsigned integer.
    Unsigned(u64),
    /// Signed integer.
    Signed(i64),
    /// Float.
    Float(f64),
    /// UTF-8 string.
    Text(String),
    /// Nanoseconds since 2001-01-01T00:00:00 UTC.
    Date(i64),
    /// Raw bytes, possibly truncated to the binary size limit.
    Binary(Vec<u8>),
    /// Cooked duration in nanoseconds.
    Duration(Duration),
    /// Cooked duration in milliseconds with an optional video FPS annotation.
    Millis {
        /// Milliseconds.
        ms: f64,
        /// FPS of the video track, when known.
        fps: Option<f64>,
    },
    /// Cooked track type.
    TrackKind(TrackKind),
    /// Cooked frames-per-second derived from a default frame duration.
    Fps(f64),
}

/// Offset between the Matroska date epoch (2001-01-01) and the Unix epoch,
/// in nanoseconds.
const MKV_EPOCH_OFFSET_NS: i64 = 978_307_200_000_000_000;

impl Value {
    /// Unsigned integer value, if that is what this is.
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer value.
    pub fn as_signed(&self) -> Option<i64> {
        match self {
            Value::Signed(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Binary payload.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Cooked duration.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }

    /// Cooked track kind.
    pub fn as_track_kind(&self) -> Option<TrackKind> {
        match self {
            Value::TrackKind(v) => Some(*v),
            _ => None,
        }
    }

    /// Date value as nanoseconds since the Unix epoch.
    pub fn as_unix_ns(&self) -> Option<i64> {
        match self {
            Value::Date(v) => Some(v + MKV_EPOCH_OFFSET_NS),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => f.write_str("-"),
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{v}ns since 2001-01-01"),
            Value::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Value::Duration(v) => write!(f, "{:.3}s", v.as_secs_f64()),
            Value::Millis { ms, fps: Some(fps) } => write!(f, "{ms:.1}ms @ {fps:.3}fps"),
            Value::Millis { ms, fps: None } => write!(f, "{ms:.1}ms"),
            Value::TrackKind(v) => write!(f, "{v}"),
            Value::Fps(v) => write!(f, "{v:.3}fps"),
        }
    }
}

/// Children of a single name: one element, or a file-ordered sequence when
/// the schema marks the name as multiple.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Single occurrence.
    One(NodeId),
    /// Multiple occurrences in file order.
    Many(Vec<NodeId>),
}

impl Slot {
    /// First element of the slot.
    pub fn first(&self) -> NodeId {
        match self {
            Slot::One(id) => *id,
            Slot::Many(ids) => ids[0],
        }
    }

    /// All elements of the slot.
    pub fn all(&self) -> &[NodeId] {
        match self {
            Slot::One(id) => std::slice::from_ref(id),
            Slot::Many(ids) => ids,
        }
    }

    /// Number of elements in the slot.
    pub fn len(&self) -> usize {
        match self {
            Slot::One(_) => 1,
            Slot::Many(ids) => ids.len(),
        }
    }

    /// Whether the slot is empty (only possible for `Many`).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered mapping from child name to slot.
#[derive(Debug, Clone, Default)]
pub struct Children {
    entries: Vec<(&'static str, Slot)>,
}

impl Children {
    /// Look up a slot by name.
    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    /// Iterate name/slot pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Slot)> {
        self.entries.iter().map(|(n, s)| (*n, s))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attach a child under `name`.
    ///
    /// Returns `true` when a second occurrence of a non-multiple name forced
    /// a promotion to a sequence.
    pub(crate) fn insert(&mut self, name: &'static str, id: NodeId, multiple: bool) -> bool {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => match slot {
                Slot::Many(ids) => {
                    ids.push(id);
                    false
                }
                Slot::One(existing) => {
                    let promoted = !multiple;
                    *slot = Slot::Many(vec![*existing, id]);
                    promoted
                }
            },
            None => {
                let slot = if multiple { Slot::Many(vec![id]) } else { Slot::One(id) };
                self.entries.push((name, slot));
                false
            }
        }
    }
}

/// One decoded element.
#[derive(Debug)]
pub struct Element {
    /// Numeric identifier, marker bit included.
    pub id: u64,
    /// Schema name, or `?` when unknown.
    pub name: &'static str,
    /// Payload type tag.
    pub kind: ElementType,
    /// Absolute offset of the identifier.
    pub offset: u64,
    /// Absolute offset of the payload.
    pub data_offset: u64,
    /// Declared payload size; `None` when unknown.
    pub size: Option<u64>,
    /// Nesting level; roots are level 0.
    pub level: u32,
    /// Parent element.
    pub parent: Option<NodeId>,
    /// Enclosing root (EBML or Segment).
    pub root: Option<NodeId>,
    /// Whether the payload was skipped rather than decoded.
    pub skipped: bool,
    /// Decoded (and possibly cooked) value.
    pub value: Value,
    /// Raw scalar before cooking, kept for retroactive rescaling.
    pub(crate) raw: Option<f64>,
    /// Children, for containers.
    pub children: Children,
}

impl Element {
    /// Whether this element is a container.
    pub fn is_container(&self) -> bool {
        self.kind == ElementType::Master
    }

    /// Exclusive end offset of the payload, when the size is known.
    pub fn end(&self) -> Option<u64> {
        self.size.map(|s| self.data_offset + s)
    }
}

/// A same-FPS span of the timecode list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimecodeSpan {
    /// Index of the first frame of the span.
    pub start_frame: u64,
    /// Absolute timecode of the first frame, in local scale units.
    pub start_time: u64,
    /// Snapped frames-per-second over the span.
    pub fps: f64,
}

/// The parse result: a rooted forest of elements plus optional derived
/// indices.
pub struct Tree {
    nodes: Vec<Element>,
    roots: Vec<NodeId>,
    /// Sorted unique keyframe indices, when requested.
    pub keyframes: Option<Vec<u64>>,
    /// Sorted unique absolute timecodes in local scale units, when requested.
    pub timecodes: Option<Vec<u64>>,
    /// Same-FPS spans over the timecode list, when requested.
    pub timecode_spans: Option<Vec<TimecodeSpan>>,
    /// Byte source, retained when the caller asked to keep it open.
    pub(crate) source: Option<Source>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots)
            .field("keyframes", &self.keyframes.as_ref().map(Vec::len))
            .field("timecodes", &self.timecodes.as_ref().map(Vec::len))
            .finish()
    }
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            keyframes: None,
            timecodes: None,
            timecode_spans: None,
            source: None,
        }
    }

    pub(crate) fn alloc(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(element);
        id
    }

    pub(crate) fn add_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    /// The element behind a handle.
    pub fn node(&self, id: NodeId) -> &Element {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.index()]
    }

    /// Number of elements in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no elements.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level roots (EBML headers and Segments) in file order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// First EBML root, if present.
    pub fn ebml(&self) -> Option<NodeId> {
        self.roots.iter().copied().find(|&id| self.node(id).name == "EBML")
    }

    /// All Segment roots in file order.
    pub fn segments(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .copied()
            .filter(|&id| self.node(id).name == "Segment")
            .collect()
    }

    /// Absolute path of an element, e.g. `\Segment\Info\Duration`.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            parts.push(node.name);
            cursor = node.parent;
        }
        let mut path = String::new();
        for part in parts.iter().rev() {
            path.push('\\');
            path.push_str(part);
        }
        path
    }

    /// Child lookup with single-parent flattening.
    ///
    /// Returns the first child named `name`. When the container has exactly
    /// one child of some name and that child is itself a non-empty
    /// container, the lookup passes through it, so `get(segment, "Duration")`
    /// resolves through a sole `Info`.
    pub fn get(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(from);
        if let Some(slot) = node.children.get(name) {
            if !slot.is_empty() {
                return Some(slot.first());
            }
        }
        // Flattening: descend through sole non-empty container children.
        for (_, slot) in node.children.iter() {
            if slot.len() == 1 {
                let child = slot.first();
                let child_node = self.node(child);
                if child_node.is_container() && !child_node.children.is_empty() {
                    if let Some(found) = self.get(child, name) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// All children named `name`, flattening through a sole container child
    /// the way [`Tree::get`] does.
    pub fn get_all(&self, from: NodeId, name: &str) -> &[NodeId] {
        let node = self.node(from);
        if let Some(slot) = node.children.get(name) {
            return slot.all();
        }
        for (_, slot) in node.children.iter() {
            if slot.len() == 1 {
                let child = slot.first();
                let child_node = self.node(child);
                if child_node.is_container() && !child_node.children.is_empty() {
                    let found = self.get_all(child, name);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
        }
        &[]
    }

    /// Resolve a `.`-separated path of names from a starting node, with
    /// flattening applied at every step.
    pub fn lookup(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let mut current = from;
        for part in path.split('.') {
            current = self.get(current, part)?;
        }
        Some(current)
    }

    /// Recover the byte source when it was retained via `keep_stream_open`.
    pub fn take_source(&mut self) -> Option<Box<dyn ReadSeek>> {
        self.source.take().map(Source::into_inner)
    }
}
