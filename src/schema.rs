//! Static Matroska DTD and derived lookup indices.
//!
//! Every known element is described by a [`SchemaEntry`]: identifier, name,
//! payload type, parent, multiplicity, scope flags, and an optional default
//! value. The table is walked once per process to build the identifier
//! indices the element reader resolves against.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Well-known element identifiers referenced outside the table.
pub mod ids {
    /// EBML header.
    pub const EBML: u64 = 0x1A45DFA3;
    /// DocType.
    pub const DOC_TYPE: u64 = 0x4282;
    /// Segment, the top-level content container.
    pub const SEGMENT: u64 = 0x18538067;
    /// SeekHead index.
    pub const SEEK_HEAD: u64 = 0x114D9B74;
    /// A single Seek entry.
    pub const SEEK: u64 = 0x4DBB;
    /// SeekID: the identifier a Seek entry points at.
    pub const SEEK_ID: u64 = 0x53AB;
    /// SeekPosition: offset relative to the Segment payload start.
    pub const SEEK_POSITION: u64 = 0x53AC;
    /// Segment Info.
    pub const INFO: u64 = 0x1549A966;
    /// TimecodeScale: nanoseconds per timecode unit.
    pub const TIMECODE_SCALE: u64 = 0x2AD7B1;
    /// Segment Duration, in timecode units.
    pub const DURATION: u64 = 0x4489;
    /// Tracks.
    pub const TRACKS: u64 = 0x1654AE6B;
    /// TrackEntry.
    pub const TRACK_ENTRY: u64 = 0xAE;
    /// TrackNumber.
    pub const TRACK_NUMBER: u64 = 0xD7;
    /// TrackType.
    pub const TRACK_TYPE: u64 = 0x83;
    /// DefaultDuration: nanoseconds per frame.
    pub const DEFAULT_DURATION: u64 = 0x23E383;
    /// DefaultDecodedFieldDuration.
    pub const DEFAULT_DECODED_FIELD_DURATION: u64 = 0x234E7A;
    /// Cluster.
    pub const CLUSTER: u64 = 0x1F43B675;
    /// Cluster Timecode.
    pub const TIMECODE: u64 = 0xE7;
    /// SimpleBlock.
    pub const SIMPLE_BLOCK: u64 = 0xA3;
    /// BlockGroup.
    pub const BLOCK_GROUP: u64 = 0xA0;
    /// Block.
    pub const BLOCK: u64 = 0xA1;
    /// BlockDuration.
    pub const BLOCK_DURATION: u64 = 0x9B;
    /// ReferenceBlock.
    pub const REFERENCE_BLOCK: u64 = 0xFB;
    /// Cues.
    pub const CUES: u64 = 0x1C53BB6B;
    /// CuePoint.
    pub const CUE_POINT: u64 = 0xBB;
    /// CueTime.
    pub const CUE_TIME: u64 = 0xB3;
    /// CueTrackPositions.
    pub const CUE_TRACK_POSITIONS: u64 = 0xB7;
    /// CueTrack.
    pub const CUE_TRACK: u64 = 0xF7;
    /// CueDuration.
    pub const CUE_DURATION: u64 = 0xB2;
    /// Chapters.
    pub const CHAPTERS: u64 = 0x1043A770;
    /// ChapterAtom, self-nesting.
    pub const CHAPTER_ATOM: u64 = 0xB6;
    /// Attachments.
    pub const ATTACHMENTS: u64 = 0x1941A469;
    /// AttachedFile.
    pub const ATTACHED_FILE: u64 = 0x61A7;
    /// Tags.
    pub const TAGS: u64 = 0x1254C367;
    /// SimpleTag, self-nesting.
    pub const SIMPLE_TAG: u64 = 0x67C8;
    /// Void padding, valid anywhere.
    pub const VOID: u64 = 0xEC;
    /// CRC-32, valid anywhere.
    pub const CRC32: u64 = 0xBF;
    /// SignatureSlot, valid anywhere.
    pub const SIGNATURE_SLOT: u64 = 0x1B538667;
}

/// Payload type of a schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Container holding child elements.
    Master,
    /// Big-endian unsigned integer, 0..=8 bytes.
    Unsigned,
    /// Big-endian signed integer, sign-extended.
    Signed,
    /// IEEE float of width 4, 8, or 10.
    Float,
    /// UTF-8 string.
    String,
    /// Signed nanoseconds since 2001-01-01T00:00:00 UTC.
    Date,
    /// Raw bytes.
    Binary,
}

/// Track kinds recognized in `TrackEntry/TrackType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Video track (1).
    Video,
    /// Audio track (2).
    Audio,
    /// Logo track (0x10).
    Logo,
    /// Subtitle track (0x11).
    Subtitle,
    /// Buttons track (0x12).
    Buttons,
    /// Control track (0x20).
    Control,
}

impl TrackKind {
    /// Bucket name used on the Tracks container.
    pub fn name(self) -> &'static str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Audio => "Audio",
            TrackKind::Logo => "Logo",
            TrackKind::Subtitle => "Subtitle",
            TrackKind::Buttons => "Buttons",
            TrackKind::Control => "Control",
        }
    }

    /// Map the raw TrackType integer.
    pub fn from_raw(value: u64) -> Option<Self> {
        match value {
            1 => Some(TrackKind::Video),
            2 => Some(TrackKind::Audio),
            0x10 => Some(TrackKind::Logo),
            0x11 => Some(TrackKind::Subtitle),
            0x12 => Some(TrackKind::Buttons),
            0x20 => Some(TrackKind::Control),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value declared by the DTD for an element with an empty payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// Unsigned integer default.
    Unsigned(u64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(&'static str),
}

/// The element may occur more than once under the same parent.
const MULTIPLE: u8 = 1;
/// The element is valid at any depth.
const GLOBAL: u8 = 1 << 1;
/// The element may nest inside itself.
const RECURSIVE: u8 = 1 << 2;

/// One row of the DTD.
#[derive(Debug, Clone, Copy)]
pub struct SchemaEntry {
    /// Element identifier, marker bit included.
    pub id: u64,
    /// Schema name.
    pub name: &'static str,
    /// Payload type.
    pub kind: ElementType,
    /// Identifier of the parent element; 0 for top-level and global entries.
    pub parent: u64,
    flags: u8,
    /// Default applied to empty payloads.
    pub default: Option<DefaultValue>,
    /// Declared fixed payload size, skipping the size VINT when set.
    pub fixed_size: Option<u64>,
}

impl SchemaEntry {
    /// Whether multiple occurrences are allowed under one parent.
    pub fn is_multiple(&self) -> bool {
        self.flags & MULTIPLE != 0
    }

    /// Whether the element is valid at any depth.
    pub fn is_global(&self) -> bool {
        self.flags & GLOBAL != 0
    }

    /// Whether the element may nest inside itself.
    pub fn is_recursive(&self) -> bool {
        self.flags & RECURSIVE != 0
    }
}

const fn el(id: u64, name: &'static str, kind: ElementType, parent: u64, flags: u8) -> SchemaEntry {
    SchemaEntry { id, name, kind, parent, flags, default: None, fixed_size: None }
}

const fn def(
    id: u64,
    name: &'static str,
    kind: ElementType,
    parent: u64,
    flags: u8,
    default: DefaultValue,
) -> SchemaEntry {
    SchemaEntry { id, name, kind, parent, flags, default: Some(default), fixed_size: None }
}

use DefaultValue::{Float as DF, Text as DS, Unsigned as DU};
use ElementType::{Binary, Date, Float, Master, Signed, String as Str, Unsigned};

/// The Matroska DTD.
#[rustfmt::skip]
static DTD: &[SchemaEntry] = &[
    // Global
    el(ids::VOID, "Void", Binary, 0, GLOBAL | MULTIPLE),
    el(ids::CRC32, "CRC-32", Binary, 0, GLOBAL),
    el(ids::SIGNATURE_SLOT, "SignatureSlot", Master, 0, GLOBAL | MULTIPLE),
    el(0x7E8A, "SignatureAlgo", Unsigned, ids::SIGNATURE_SLOT, 0),
    el(0x7E9A, "SignatureHash", Unsigned, ids::SIGNATURE_SLOT, 0),
    el(0x7EA5, "SignaturePublicKey", Binary, ids::SIGNATURE_SLOT, 0),
    el(0x7EB5, "Signature", Binary, ids::SIGNATURE_SLOT, 0),
    el(0x7E5B, "SignatureElements", Master, ids::SIGNATURE_SLOT, 0),
    el(0x7E7B, "SignatureElementList", Master, 0x7E5B, MULTIPLE),
    el(0x6532, "SignedElement", Binary, 0x7E7B, MULTIPLE),
    // \EBML
    el(ids::EBML, "EBML", Master, 0, MULTIPLE),
    def(0x4286, "EBMLVersion", Unsigned, ids::EBML, 0, DU(1)),
    def(0x42F7, "EBMLReadVersion", Unsigned, ids::EBML, 0, DU(1)),
    def(0x42F2, "EBMLMaxIDLength", Unsigned, ids::EBML, 0, DU(4)),
    def(0x42F3, "EBMLMaxSizeLength", Unsigned, ids::EBML, 0, DU(8)),
    def(ids::DOC_TYPE, "DocType", Str, ids::EBML, 0, DS("matroska")),
    def(0x4287, "DocTypeVersion", Unsigned, ids::EBML, 0, DU(1)),
    def(0x4285, "DocTypeReadVersion", Unsigned, ids::EBML, 0, DU(1)),
    // \Segment
    el(ids::SEGMENT, "Segment", Master, 0, MULTIPLE),
    // \Segment\SeekHead
    el(ids::SEEK_HEAD, "SeekHead", Master, ids::SEGMENT, MULTIPLE),
    el(ids::SEEK, "Seek", Master, ids::SEEK_HEAD, MULTIPLE),
    el(ids::SEEK_ID, "SeekID", Binary, ids::SEEK, 0),
    el(ids::SEEK_POSITION, "SeekPosition", Unsigned, ids::SEEK, 0),
    // \Segment\Info
    el(ids::INFO, "Info", Master, ids::SEGMENT, MULTIPLE),
    el(0x73A4, "SegmentUID", Binary, ids::INFO, 0),
    el(0x7384, "SegmentFilename", Str, ids::INFO, 0),
    el(0x3CB923, "PrevUID", Binary, ids::INFO, 0),
    el(0x3C83AB, "PrevFilename", Str, ids::INFO, 0),
    el(0x3EB923, "NextUID", Binary, ids::INFO, 0),
    el(0x3E83BB, "NextFilename", Str, ids::INFO, 0),
    el(0x4444, "SegmentFamily", Binary, ids::INFO, MULTIPLE),
    el(0x6924, "ChapterTranslate", Master, ids::INFO, MULTIPLE),
    el(0x69FC, "ChapterTranslateEditionUID", Unsigned, 0x6924, MULTIPLE),
    el(0x69BF, "ChapterTranslateCodec", Unsigned, 0x6924, 0),
    el(0x69A5, "ChapterTranslateID", Binary, 0x6924, 0),
    def(ids::TIMECODE_SCALE, "TimecodeScale", Unsigned, ids::INFO, 0, DU(1_000_000)),
    el(ids::DURATION, "Duration", Float, ids::INFO, 0),
    el(0x4461, "DateUTC", Date, ids::INFO, 0),
    el(0x7BA9, "Title", Str, ids::INFO, 0),
    el(0x4D80, "MuxingApp", Str, ids::INFO, 0),
    el(0x5741, "WritingApp", Str, ids::INFO, 0),
    // \Segment\Cluster
    el(ids::CLUSTER, "Cluster", Master, ids::SEGMENT, MULTIPLE),
    el(ids::TIMECODE, "Timecode", Unsigned, ids::CLUSTER, 0),
    el(0x5854, "SilentTracks", Master, ids::CLUSTER, 0),
    el(0x58D7, "SilentTrackNumber", Unsigned, 0x5854, MULTIPLE),
    el(0xA7, "Position", Unsigned, ids::CLUSTER, 0),
    el(0xAB, "PrevSize", Unsigned, ids::CLUSTER, 0),
    el(ids::SIMPLE_BLOCK, "SimpleBlock", Binary, ids::CLUSTER, MULTIPLE),
    el(ids::BLOCK_GROUP, "BlockGroup", Master, ids::CLUSTER, MULTIPLE),
    el(ids::BLOCK, "Block", Binary, ids::BLOCK_GROUP, 0),
    el(0x75A1, "BlockAdditions", Master, ids::BLOCK_GROUP, 0),
    el(0xA6, "BlockMore", Master, 0x75A1, MULTIPLE),
    el(0xEE, "BlockAddID", Unsigned, 0xA6, 0),
    el(0xA5, "BlockAdditional", Binary, 0xA6, 0),
    el(ids::BLOCK_DURATION, "BlockDuration", Unsigned, ids::BLOCK_GROUP, 0),
    el(0xFA, "ReferencePriority", Unsigned, ids::BLOCK_GROUP, 0),
    el(ids::REFERENCE_BLOCK, "ReferenceBlock", Signed, ids::BLOCK_GROUP, MULTIPLE),
    el(0xA4, "CodecState", Binary, ids::BLOCK_GROUP, 0),
    el(0x75A2, "DiscardPadding", Signed, ids::BLOCK_GROUP, 0),
    // \Segment\Tracks
    el(ids::TRACKS, "Tracks", Master, ids::SEGMENT, MULTIPLE),
    el(ids::TRACK_ENTRY, "TrackEntry", Master, ids::TRACKS, MULTIPLE),
    el(ids::TRACK_NUMBER, "TrackNumber", Unsigned, ids::TRACK_ENTRY, 0),
    el(0x73C5, "TrackUID", Unsigned, ids::TRACK_ENTRY, 0),
    el(ids::TRACK_TYPE, "TrackType", Unsigned, ids::TRACK_ENTRY, 0),
    def(0xB9, "FlagEnabled", Unsigned, ids::TRACK_ENTRY, 0, DU(1)),
    def(0x88, "FlagDefault", Unsigned, ids::TRACK_ENTRY, 0, DU(1)),
    def(0x55AA, "FlagForced", Unsigned, ids::TRACK_ENTRY, 0, DU(0)),
    def(0x9C, "FlagLacing", Unsigned, ids::TRACK_ENTRY, 0, DU(1)),
    def(0x6DE7, "MinCache", Unsigned, ids::TRACK_ENTRY, 0, DU(0)),
    el(0x6DF8, "MaxCache", Unsigned, ids::TRACK_ENTRY, 0),
    el(ids::DEFAULT_DURATION, "DefaultDuration", Unsigned, ids::TRACK_ENTRY, 0),
    el(ids::DEFAULT_DECODED_FIELD_DURATION, "DefaultDecodedFieldDuration", Unsigned, ids::TRACK_ENTRY, 0),
    def(0x23314F, "TrackTimecodeScale", Float, ids::TRACK_ENTRY, 0, DF(1.0)),
    def(0x55EE, "MaxBlockAdditionID", Unsigned, ids::TRACK_ENTRY, 0, DU(0)),
    el(0x41E4, "BlockAdditionMapping", Master, ids::TRACK_ENTRY, MULTIPLE),
    el(0x41F0, "BlockAddIDValue", Unsigned, 0x41E4, 0),
    el(0x41A4, "BlockAddIDName", Str, 0x41E4, 0),
    el(0x41E7, "BlockAddIDType", Unsigned, 0x41E4, 0),
    el(0x41ED, "BlockAddIDExtraData", Binary, 0x41E4, 0),
    el(0x536E, "Name", Str, ids::TRACK_ENTRY, 0),
    def(0x22B59C, "Language", Str, ids::TRACK_ENTRY, 0, DS("eng")),
    el(0x22B59D, "LanguageIETF", Str, ids::TRACK_ENTRY, 0),
    el(0x86, "CodecID", Str, ids::TRACK_ENTRY, 0),
    el(0x63A2, "CodecPrivate", Binary, ids::TRACK_ENTRY, 0),
    el(0x258688, "CodecName", Str, ids::TRACK_ENTRY, 0),
    el(0x7446, "AttachmentLink", Unsigned, ids::TRACK_ENTRY, 0),
    def(0xAA, "CodecDecodeAll", Unsigned, ids::TRACK_ENTRY, 0, DU(1)),
    el(0x6FAB, "TrackOverlay", Unsigned, ids::TRACK_ENTRY, MULTIPLE),
    def(0x56AA, "CodecDelay", Unsigned, ids::TRACK_ENTRY, 0, DU(0)),
    def(0x56BB, "SeekPreRoll", Unsigned, ids::TRACK_ENTRY, 0, DU(0)),
    el(0x6624, "TrackTranslate", Master, ids::TRACK_ENTRY, MULTIPLE),
    el(0x66FC, "TrackTranslateEditionUID", Unsigned, 0x6624, MULTIPLE),
    el(0x66BF, "TrackTranslateCodec", Unsigned, 0x6624, 0),
    el(0x66A5, "TrackTranslateTrackID", Binary, 0x6624, 0),
    // \Segment\Tracks\TrackEntry\Video
    el(0xE0, "Video", Master, ids::TRACK_ENTRY, 0),
    def(0x9A, "FlagInterlaced", Unsigned, 0xE0, 0, DU(0)),
    def(0x9D, "FieldOrder", Unsigned, 0xE0, 0, DU(2)),
    def(0x53B8, "StereoMode", Unsigned, 0xE0, 0, DU(0)),
    def(0x53C0, "AlphaMode", Unsigned, 0xE0, 0, DU(0)),
    el(0xB0, "PixelWidth", Unsigned, 0xE0, 0),
    el(0xBA, "PixelHeight", Unsigned, 0xE0, 0),
    def(0x54AA, "PixelCropBottom", Unsigned, 0xE0, 0, DU(0)),
    def(0x54BB, "PixelCropTop", Unsigned, 0xE0, 0, DU(0)),
    def(0x54CC, "PixelCropLeft", Unsigned, 0xE0, 0, DU(0)),
    def(0x54DD, "PixelCropRight", Unsigned, 0xE0, 0, DU(0)),
    el(0x54B0, "DisplayWidth", Unsigned, 0xE0, 0),
    el(0x54BA, "DisplayHeight", Unsigned, 0xE0, 0),
    def(0x54B2, "DisplayUnit", Unsigned, 0xE0, 0, DU(0)),
    def(0x54B3, "AspectRatioType", Unsigned, 0xE0, 0, DU(0)),
    el(0x2EB524, "ColourSpace", Binary, 0xE0, 0),
    el(0x55B0, "Colour", Master, 0xE0, 0),
    def(0x55B1, "MatrixCoefficients", Unsigned, 0x55B0, 0, DU(2)),
    def(0x55B2, "BitsPerChannel", Unsigned, 0x55B0, 0, DU(0)),
    el(0x55B3, "ChromaSubsamplingHorz", Unsigned, 0x55B0, 0),
    el(0x55B4, "ChromaSubsamplingVert", Unsigned, 0x55B0, 0),
    el(0x55B5, "CbSubsamplingHorz", Unsigned, 0x55B0, 0),
    el(0x55B6, "CbSubsamplingVert", Unsigned, 0x55B0, 0),
    def(0x55B7, "ChromaSitingHorz", Unsigned, 0x55B0, 0, DU(0)),
    def(0x55B8, "ChromaSitingVert", Unsigned, 0x55B0, 0, DU(0)),
    def(0x55B9, "Range", Unsigned, 0x55B0, 0, DU(0)),
    def(0x55BA, "TransferCharacteristics", Unsigned, 0x55B0, 0, DU(2)),
    def(0x55BB, "Primaries", Unsigned, 0x55B0, 0, DU(2)),
    el(0x55BC, "MaxCLL", Unsigned, 0x55B0, 0),
    el(0x55BD, "MaxFALL", Unsigned, 0x55B0, 0),
    el(0x55D0, "MasteringMetadata", Master, 0x55B0, 0),
    el(0x55D1, "PrimaryRChromaticityX", Float, 0x55D0, 0),
    el(0x55D2, "PrimaryRChromaticityY", Float, 0x55D0, 0),
    el(0x55D3, "PrimaryGChromaticityX", Float, 0x55D0, 0),
    el(0x55D4, "PrimaryGChromaticityY", Float, 0x55D0, 0),
    el(0x55D5, "PrimaryBChromaticityX", Float, 0x55D0, 0),
    el(0x55D6, "PrimaryBChromaticityY", Float, 0x55D0, 0),
    el(0x55D7, "WhitePointChromaticityX", Float, 0x55D0, 0),
    el(0x55D8, "WhitePointChromaticityY", Float, 0x55D0, 0),
    el(0x55D9, "LuminanceMax", Float, 0x55D0, 0),
    el(0x55DA, "LuminanceMin", Float, 0x55D0, 0),
    el(0x7670, "Projection", Master, 0xE0, 0),
    def(0x7671, "ProjectionType", Unsigned, 0x7670, 0, DU(0)),
    el(0x7672, "ProjectionPrivate", Binary, 0x7670, 0),
    def(0x7673, "ProjectionPoseYaw", Float, 0x7670, 0, DF(0.0)),
    def(0x7674, "ProjectionPosePitch", Float, 0x7670, 0, DF(0.0)),
    def(0x7675, "ProjectionPoseRoll", Float, 0x7670, 0, DF(0.0)),
    // \Segment\Tracks\TrackEntry\Audio
    el(0xE1, "Audio", Master, ids::TRACK_ENTRY, 0),
    def(0xB5, "SamplingFrequency", Float, 0xE1, 0, DF(8000.0)),
    el(0x78B5, "OutputSamplingFrequency", Float, 0xE1, 0),
    def(0x9F, "Channels", Unsigned, 0xE1, 0, DU(1)),
    el(0x7D7B, "ChannelPositions", Binary, 0xE1, 0),
    el(0x6264, "BitDepth", Unsigned, 0xE1, 0),
    // \Segment\Tracks\TrackEntry\TrackOperation
    el(0xE2, "TrackOperation", Master, ids::TRACK_ENTRY, 0),
    el(0xE3, "TrackCombinePlanes", Master, 0xE2, 0),
    el(0xE4, "TrackPlane", Master, 0xE3, MULTIPLE),
    el(0xE5, "TrackPlaneUID", Unsigned, 0xE4, 0),
    el(0xE6, "TrackPlaneType", Unsigned, 0xE4, 0),
    el(0xE9, "TrackJoinBlocks", Master, 0xE2, 0),
    el(0xED, "TrackJoinUID", Unsigned, 0xE9, MULTIPLE),
    // \Segment\Tracks\TrackEntry\ContentEncodings
    el(0x6D80, "ContentEncodings", Master, ids::TRACK_ENTRY, 0),
    el(0x6240, "ContentEncoding", Master, 0x6D80, MULTIPLE),
    def(0x5031, "ContentEncodingOrder", Unsigned, 0x6240, 0, DU(0)),
    def(0x5032, "ContentEncodingScope", Unsigned, 0x6240, 0, DU(1)),
    def(0x5033, "ContentEncodingType", Unsigned, 0x6240, 0, DU(0)),
    el(0x5034, "ContentCompression", Master, 0x6240, 0),
    def(0x4254, "ContentCompAlgo", Unsigned, 0x5034, 0, DU(0)),
    el(0x4255, "ContentCompSettings", Binary, 0x5034, 0),
    el(0x5035, "ContentEncryption", Master, 0x6240, 0),
    def(0x47E1, "ContentEncAlgo", Unsigned, 0x5035, 0, DU(0)),
    el(0x47E2, "ContentEncKeyID", Binary, 0x5035, 0),
    el(0x47E7, "ContentEncAESSettings", Master, 0x5035, 0),
    el(0x47E8, "AESSettingsCipherMode", Unsigned, 0x47E7, 0),
    // \Segment\Cues
    el(ids::CUES, "Cues", Master, ids::SEGMENT, 0),
    el(ids::CUE_POINT, "CuePoint", Master, ids::CUES, MULTIPLE),
    el(ids::CUE_TIME, "CueTime", Unsigned, ids::CUE_POINT, 0),
    el(ids::CUE_TRACK_POSITIONS, "CueTrackPositions", Master, ids::CUE_POINT, MULTIPLE),
    el(ids::CUE_TRACK, "CueTrack", Unsigned, ids::CUE_TRACK_POSITIONS, 0),
    el(0xF1, "CueClusterPosition", Unsigned, ids::CUE_TRACK_POSITIONS, 0),
    el(0xF0, "CueRelativePosition", Unsigned, ids::CUE_TRACK_POSITIONS, 0),
    el(ids::CUE_DURATION, "CueDuration", Unsigned, ids::CUE_TRACK_POSITIONS, 0),
    def(0x5378, "CueBlockNumber", Unsigned, ids::CUE_TRACK_POSITIONS, 0, DU(1)),
    def(0xEA, "CueCodecState", Unsigned, ids::CUE_TRACK_POSITIONS, 0, DU(0)),
    el(0xDB, "CueReference", Master, ids::CUE_TRACK_POSITIONS, MULTIPLE),
    el(0x96, "CueRefTime", Unsigned, 0xDB, 0),
    // \Segment\Attachments
    el(ids::ATTACHMENTS, "Attachments", Master, ids::SEGMENT, 0),
    el(ids::ATTACHED_FILE, "AttachedFile", Master, ids::ATTACHMENTS, MULTIPLE),
    el(0x467E, "FileDescription", Str, ids::ATTACHED_FILE, 0),
    el(0x466E, "FileName", Str, ids::ATTACHED_FILE, 0),
    el(0x4660, "FileMediaType", Str, ids::ATTACHED_FILE, 0),
    el(0x465C, "FileData", Binary, ids::ATTACHED_FILE, 0),
    el(0x46AE, "FileUID", Unsigned, ids::ATTACHED_FILE, 0),
    // \Segment\Chapters
    el(ids::CHAPTERS, "Chapters", Master, ids::SEGMENT, 0),
    el(0x45B9, "EditionEntry", Master, ids::CHAPTERS, MULTIPLE),
    el(0x45BC, "EditionUID", Unsigned, 0x45B9, 0),
    def(0x45BD, "EditionFlagHidden", Unsigned, 0x45B9, 0, DU(0)),
    def(0x45DB, "EditionFlagDefault", Unsigned, 0x45B9, 0, DU(0)),
    def(0x45DD, "EditionFlagOrdered", Unsigned, 0x45B9, 0, DU(0)),
    el(ids::CHAPTER_ATOM, "ChapterAtom", Master, 0x45B9, MULTIPLE | RECURSIVE),
    el(0x73C4, "ChapterUID", Unsigned, ids::CHAPTER_ATOM, 0),
    el(0x5654, "ChapterStringUID", Str, ids::CHAPTER_ATOM, 0),
    el(0x91, "ChapterTimeStart", Unsigned, ids::CHAPTER_ATOM, 0),
    el(0x92, "ChapterTimeEnd", Unsigned, ids::CHAPTER_ATOM, 0),
    def(0x98, "ChapterFlagHidden", Unsigned, ids::CHAPTER_ATOM, 0, DU(0)),
    def(0x4598, "ChapterFlagEnabled", Unsigned, ids::CHAPTER_ATOM, 0, DU(1)),
    el(0x6E67, "ChapterSegmentUID", Binary, ids::CHAPTER_ATOM, 0),
    el(0x6EBC, "ChapterSegmentEditionUID", Unsigned, ids::CHAPTER_ATOM, 0),
    el(0x63C3, "ChapterPhysicalEquiv", Unsigned, ids::CHAPTER_ATOM, 0),
    el(0x8F, "ChapterTrack", Master, ids::CHAPTER_ATOM, 0),
    el(0x89, "ChapterTrackUID", Unsigned, 0x8F, MULTIPLE),
    el(0x80, "ChapterDisplay", Master, ids::CHAPTER_ATOM, MULTIPLE),
    el(0x85, "ChapString", Str, 0x80, 0),
    def(0x437C, "ChapLanguage", Str, 0x80, MULTIPLE, DS("eng")),
    el(0x437E, "ChapCountry", Str, 0x80, MULTIPLE),
    el(0x6944, "ChapProcess", Master, ids::CHAPTER_ATOM, MULTIPLE),
    def(0x6955, "ChapProcessCodecID", Unsigned, 0x6944, 0, DU(0)),
    el(0x450D, "ChapProcessPrivate", Binary, 0x6944, 0),
    el(0x6911, "ChapProcessCommand", Master, 0x6944, MULTIPLE),
    el(0x6922, "ChapProcessTime", Unsigned, 0x6911, 0),
    el(0x6933, "ChapProcessData", Binary, 0x6911, 0),
    // \Segment\Tags
    el(ids::TAGS, "Tags", Master, ids::SEGMENT, MULTIPLE),
    el(0x7373, "Tag", Master, ids::TAGS, MULTIPLE),
    el(0x63C0, "Targets", Master, 0x7373, 0),
    def(0x68CA, "TargetTypeValue", Unsigned, 0x63C0, 0, DU(50)),
    el(0x63CA, "TargetType", Str, 0x63C0, 0),
    el(0x63C5, "TagTrackUID", Unsigned, 0x63C0, MULTIPLE),
    el(0x63C9, "TagEditionUID", Unsigned, 0x63C0, MULTIPLE),
    el(0x63C4, "TagChapterUID", Unsigned, 0x63C0, MULTIPLE),
    el(0x63C6, "TagAttachmentUID", Unsigned, 0x63C0, MULTIPLE),
    el(ids::SIMPLE_TAG, "SimpleTag", Master, 0x7373, MULTIPLE | RECURSIVE),
    el(0x45A3, "TagName", Str, ids::SIMPLE_TAG, 0),
    def(0x447A, "TagLanguage", Str, ids::SIMPLE_TAG, 0, DS("und")),
    def(0x4484, "TagDefault", Unsigned, ids::SIMPLE_TAG, 0, DU(1)),
    el(0x4487, "TagString", Str, ids::SIMPLE_TAG, 0),
    el(0x4485, "TagBinary", Binary, ids::SIMPLE_TAG, 0),
];

/// Derived schema indices, built once per process.
pub struct Schema {
    by_id: HashMap<u64, &'static SchemaEntry>,
    globals: HashMap<u64, &'static SchemaEntry>,
    children: HashMap<u64, HashMap<u64, &'static SchemaEntry>>,
}

impl Schema {
    fn build() -> Self {
        let mut by_id = HashMap::new();
        let mut globals = HashMap::new();
        let mut children: HashMap<u64, HashMap<u64, &'static SchemaEntry>> = HashMap::new();

        for entry in DTD {
            by_id.insert(entry.id, entry);
            if entry.is_global() {
                globals.insert(entry.id, entry);
            } else {
                children.entry(entry.parent).or_default().insert(entry.id, entry);
            }
            // Recursive elements resolve inside themselves.
            if entry.is_recursive() {
                children.entry(entry.id).or_default().insert(entry.id, entry);
            }
        }

        Self { by_id, globals, children }
    }

    /// Entry for an identifier regardless of position.
    pub fn get(&self, id: u64) -> Option<&'static SchemaEntry> {
        self.by_id.get(&id).copied()
    }

    /// Entry for a global identifier (Void, CRC-32, SignatureSlot).
    pub fn global(&self, id: u64) -> Option<&'static SchemaEntry> {
        self.globals.get(&id).copied()
    }

    /// Entry for `id` as a direct child of `parent`.
    pub fn child(&self, parent: u64, id: u64) -> Option<&'static SchemaEntry> {
        self.children.get(&parent).and_then(|m| m.get(&id)).copied()
    }

    /// Absolute schema path of an entry, e.g. `\Segment\Info\Duration`.
    pub fn path_of(&self, entry: &SchemaEntry) -> String {
        let mut parts = vec![entry.name];
        let mut parent = entry.parent;
        while parent != 0 {
            match self.get(parent) {
                Some(p) => {
                    parts.push(p.name);
                    parent = p.parent;
                }
                None => break,
            }
        }
        let mut path = String::new();
        for part in parts.iter().rev() {
            path.push('\\');
            path.push_str(part);
        }
        path
    }
}

/// Process-wide schema indices.
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::build)
}

/// Level-1 Segment sections recognized by the tail scan, in preference order.
pub const LEVEL1_IDS: [u64; 8] = [
    ids::TAGS,
    ids::SEEK_HEAD,
    ids::CLUSTER,
    ids::CUES,
    ids::CHAPTERS,
    ids::ATTACHMENTS,
    ids::TRACKS,
    ids::INFO,
];
