//! Parse options and section selection.
//!
//! The `get` request decides which level-1 Segment sections materialize in
//! the tree. Tokens mirror the option surface of the tool this library
//! serves: `*`, `*common`, section names, and the derived-data tokens
//! `keyframes`, `timecodes`, and `useCFR`.

use crate::element::Element;
use crate::schema::ids;
use std::collections::HashSet;

/// Level-1 Segment sections (plus the EBML header) that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// EBML header.
    Ebml,
    /// SeekHead.
    SeekHead,
    /// Segment Info.
    Info,
    /// Tracks.
    Tracks,
    /// Chapters.
    Chapters,
    /// Clusters (media data).
    Cluster,
    /// Cues.
    Cues,
    /// Attachments.
    Attachments,
    /// Tags.
    Tags,
}

impl Section {
    /// Schema name of the section.
    pub fn name(self) -> &'static str {
        match self {
            Section::Ebml => "EBML",
            Section::SeekHead => "SeekHead",
            Section::Info => "Info",
            Section::Tracks => "Tracks",
            Section::Chapters => "Chapters",
            Section::Cluster => "Cluster",
            Section::Cues => "Cues",
            Section::Attachments => "Attachments",
            Section::Tags => "Tags",
        }
    }

    /// Element identifier of the section.
    pub fn id(self) -> u64 {
        match self {
            Section::Ebml => ids::EBML,
            Section::SeekHead => ids::SEEK_HEAD,
            Section::Info => ids::INFO,
            Section::Tracks => ids::TRACKS,
            Section::Chapters => ids::CHAPTERS,
            Section::Cluster => ids::CLUSTER,
            Section::Cues => ids::CUES,
            Section::Attachments => ids::ATTACHMENTS,
            Section::Tags => ids::TAGS,
        }
    }

    /// Section for an element identifier.
    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            ids::EBML => Some(Section::Ebml),
            ids::SEEK_HEAD => Some(Section::SeekHead),
            ids::INFO => Some(Section::Info),
            ids::TRACKS => Some(Section::Tracks),
            ids::CHAPTERS => Some(Section::Chapters),
            ids::CLUSTER => Some(Section::Cluster),
            ids::CUES => Some(Section::Cues),
            ids::ATTACHMENTS => Some(Section::Attachments),
            ids::TAGS => Some(Section::Tags),
            _ => None,
        }
    }

    /// Section for a request token name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EBML" => Some(Section::Ebml),
            "SeekHead" => Some(Section::SeekHead),
            "Info" => Some(Section::Info),
            "Tracks" => Some(Section::Tracks),
            "Chapters" => Some(Section::Chapters),
            "Cluster" => Some(Section::Cluster),
            "Cues" => Some(Section::Cues),
            "Attachments" => Some(Section::Attachments),
            "Tags" => Some(Section::Tags),
            _ => None,
        }
    }

    /// Whether the section stays unsatisfied after one occurrence is read.
    /// Clusters are the only section read exhaustively; every other section
    /// satisfies its request with the first fully-read occurrence.
    pub(crate) fn is_multiple(self) -> bool {
        matches!(self, Section::Cluster)
    }

    /// All sections.
    pub const ALL: [Section; 9] = [
        Section::Ebml,
        Section::SeekHead,
        Section::Info,
        Section::Tracks,
        Section::Chapters,
        Section::Cluster,
        Section::Cues,
        Section::Attachments,
        Section::Tags,
    ];

    /// The `*common` set: Info, Tracks, Chapters, Attachments.
    pub const COMMON: [Section; 4] = [
        Section::Info,
        Section::Tracks,
        Section::Chapters,
        Section::Attachments,
    ];
}

/// Reply from an entry observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Observe {
    /// Keep parsing normally.
    #[default]
    Continue,
    /// Treat the announced element as skipped and advance past it.
    Skip,
    /// Terminate all parsing; a partial tree is returned.
    Abort,
}

/// Observer invoked for every element the reader produces.
pub type EntryCallback = Box<dyn FnMut(&Element) -> Observe>;

/// Options accepted by [`crate::parse`].
pub struct ParseOptions {
    pub(crate) sections: HashSet<Section>,
    pub(crate) keyframes: bool,
    pub(crate) timecodes: bool,
    pub(crate) use_cfr: bool,
    pub(crate) tags_when_printing: bool,
    /// Cap on binary payloads actually read; `-1` means unlimited. `SeekID`
    /// is always read in full.
    pub(crate) binary_size_limit: i64,
    pub(crate) exhaustive_search: bool,
    pub(crate) keep_stream_open: bool,
    pub(crate) show_progress: bool,
    pub(crate) entry_callback: Option<EntryCallback>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            sections: Section::COMMON.into_iter().collect(),
            keyframes: false,
            timecodes: false,
            use_cfr: false,
            tags_when_printing: false,
            binary_size_limit: 16,
            exhaustive_search: false,
            keep_stream_open: false,
            show_progress: false,
            entry_callback: None,
        }
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("sections", &self.sections)
            .field("keyframes", &self.keyframes)
            .field("timecodes", &self.timecodes)
            .field("use_cfr", &self.use_cfr)
            .field("binary_size_limit", &self.binary_size_limit)
            .field("exhaustive_search", &self.exhaustive_search)
            .field("keep_stream_open", &self.keep_stream_open)
            .field("has_callback", &self.entry_callback.is_some())
            .finish()
    }
}

impl ParseOptions {
    /// Options with an empty section request.
    ///
    /// Combine with [`ParseOptions::request`] or [`ParseOptions::section`];
    /// `ParseOptions::default()` starts from `*common` instead.
    pub fn none() -> Self {
        Self {
            sections: HashSet::new(),
            ..Default::default()
        }
    }

    /// Build options from `get` request tokens.
    pub fn get(tokens: &[&str]) -> Self {
        let mut opts = Self::none();
        for token in tokens {
            opts.apply_token(token);
        }
        opts
    }

    /// Add a single request token: `*`, `*common`, a section name (with an
    /// optional `:whenPrinting` hint), `keyframes`, `timecodes`, or
    /// `useCFR`.
    pub fn request(mut self, token: &str) -> Self {
        self.apply_token(token);
        self
    }

    fn apply_token(&mut self, token: &str) {
        let (name, hint) = match token.split_once(':') {
            Some((name, hint)) => (name, Some(hint)),
            None => (token, None),
        };

        match name {
            "*" => self.sections.extend(Section::ALL),
            "*common" => self.sections.extend(Section::COMMON),
            "keyframes" => self.keyframes = true,
            "timecodes" => self.timecodes = true,
            "useCFR" => self.use_cfr = true,
            _ => match Section::from_name(name) {
                Some(section) => {
                    if section == Section::Tags && hint == Some("whenPrinting") {
                        self.tags_when_printing = true;
                    }
                    self.sections.insert(section);
                }
                None => {
                    tracing::warn!(token, "ignoring unrecognized get token");
                }
            },
        }
    }

    /// Request a specific section.
    pub fn section(mut self, section: Section) -> Self {
        self.sections.insert(section);
        self
    }

    /// Cap binary payload reads at `limit` bytes; `-1` removes the cap.
    pub fn binary_size_limit(mut self, limit: i64) -> Self {
        self.binary_size_limit = limit;
        self
    }

    /// Scan through Clusters sequentially when SeekHead and the tail scan
    /// both fail to locate a requested section.
    pub fn exhaustive_search(mut self, enabled: bool) -> Self {
        self.exhaustive_search = enabled;
        self
    }

    /// Transfer byte-source ownership to the returned tree.
    pub fn keep_stream_open(mut self, enabled: bool) -> Self {
        self.keep_stream_open = enabled;
        self
    }

    /// Emit progress events as `tracing` records.
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Install an observer invoked for every produced element.
    pub fn on_entry<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Element) -> Observe + 'static,
    {
        self.entry_callback = Some(Box::new(callback));
        self
    }

    /// Whether any derived index was requested.
    pub(crate) fn wants_index(&self) -> bool {
        self.keyframes || self.timecodes
    }

    /// Whether a section should materialize in the tree.
    pub(crate) fn wants(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }
}
