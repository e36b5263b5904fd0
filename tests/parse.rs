//! End-to-end parse tests over synthesized Matroska files.

use mkvtree::{ids, parse, Observe, ParseOptions, Regex, Tree, Value};
use std::io::Cursor;
use std::time::Duration;

// Element writers.

fn id_bytes(id: u64) -> Vec<u8> {
    let raw = id.to_be_bytes();
    let start = raw.iter().position(|&b| b != 0).unwrap_or(7);
    raw[start..].to_vec()
}

fn size_bytes(size: u64) -> Vec<u8> {
    for width in 1..8usize {
        if size < (1u64 << (7 * width)) - 1 {
            let mut bytes = vec![0u8; width];
            let mut v = size;
            for slot in bytes.iter_mut().rev() {
                *slot = (v & 0xFF) as u8;
                v >>= 8;
            }
            bytes[0] |= 0x80 >> (width - 1);
            return bytes;
        }
    }
    panic!("size too large for test writer");
}

fn el(id: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = id_bytes(id);
    out.extend_from_slice(&size_bytes(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

fn master(id: u64, children: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = children.concat();
    el(id, &payload)
}

fn uint_el(id: u64, value: u64) -> Vec<u8> {
    if value == 0 {
        return el(id, &[0]);
    }
    let raw = value.to_be_bytes();
    let start = raw.iter().position(|&b| b != 0).unwrap();
    el(id, &raw[start..])
}

/// Unsigned element with a fixed 8-byte payload, for offsets that must not
/// change the enclosing sizes.
fn uint8_el(id: u64, value: u64) -> Vec<u8> {
    el(id, &value.to_be_bytes())
}

fn str_el(id: u64, value: &str) -> Vec<u8> {
    el(id, value.as_bytes())
}

fn float_el(id: u64, value: f64) -> Vec<u8> {
    el(id, &value.to_bits().to_be_bytes())
}

fn ebml_header() -> Vec<u8> {
    master(
        ids::EBML,
        &[
            uint_el(0x4286, 1),          // EBMLVersion
            uint_el(0x42F7, 1),          // EBMLReadVersion
            uint_el(0x42F2, 4),          // EBMLMaxIDLength
            uint_el(0x42F3, 8),          // EBMLMaxSizeLength
            str_el(ids::DOC_TYPE, "matroska"),
            uint_el(0x4287, 4),          // DocTypeVersion
            uint_el(0x4285, 2),          // DocTypeReadVersion
        ],
    )
}

fn video_tracks(track_number: u64, default_duration_ns: Option<u64>) -> Vec<u8> {
    let mut entry = vec![
        uint_el(ids::TRACK_NUMBER, track_number),
        uint_el(ids::TRACK_TYPE, 1),
        str_el(0x86, "V_VP9"), // CodecID
    ];
    if let Some(ns) = default_duration_ns {
        entry.push(uint_el(ids::DEFAULT_DURATION, ns));
    }
    master(ids::TRACKS, &[master(ids::TRACK_ENTRY, &entry)])
}

fn simple_block(track: u64, relative: i16, keyframe: bool) -> Vec<u8> {
    assert!(track < 0x80);
    let mut payload = vec![0x80 | track as u8];
    payload.extend_from_slice(&relative.to_be_bytes());
    payload.push(if keyframe { 0x80 } else { 0x00 });
    payload.extend_from_slice(&[0xDE, 0xAD]); // frame bytes
    el(ids::SIMPLE_BLOCK, &payload)
}

fn file_of(parts: &[Vec<u8>]) -> Cursor<Vec<u8>> {
    Cursor::new(parts.concat())
}

fn value_of(tree: &Tree, from: mkvtree::NodeId, path: &str) -> Value {
    let node = tree.lookup(from, path).expect(path);
    tree.node(node).value.clone()
}

// S1: a minimal file produces one EBML entry and one Segment; no derived
// arrays.

#[test]
fn minimal_file() {
    let file = file_of(&[ebml_header(), master(ids::SEGMENT, &[])]);
    let tree = parse(file, ParseOptions::default()).unwrap();

    let ebml = tree.ebml().expect("EBML root");
    assert_eq!(
        value_of(&tree, ebml, "DocType"),
        Value::Text("matroska".into())
    );

    assert_eq!(tree.segments().len(), 1);
    assert!(tree.keyframes.is_none());
    assert!(tree.timecodes.is_none());
}

// S2: SimpleBlock keyframes at blocks 0, 30, 60.

fn keyframe_file() -> Cursor<Vec<u8>> {
    let mut blocks = vec![uint_el(ids::TIMECODE, 0)];
    for i in 0..=60i16 {
        let keyframe = i == 0 || i == 30 || i == 60;
        blocks.push(simple_block(1, i * 40, keyframe));
    }
    let segment = master(
        ids::SEGMENT,
        &[video_tracks(1, Some(40_000_000)), master(ids::CLUSTER, &blocks)],
    );
    file_of(&[ebml_header(), segment])
}

#[test]
fn simple_block_keyframes() {
    let tree = parse(keyframe_file(), ParseOptions::get(&["keyframes"])).unwrap();
    assert_eq!(tree.keyframes, Some(vec![0, 30, 60]));
    assert!(tree.timecodes.is_none());
}

#[test]
fn timecodes_and_spans() {
    let tree = parse(keyframe_file(), ParseOptions::get(&["timecodes"])).unwrap();
    let timecodes = tree.timecodes.as_ref().unwrap();
    assert_eq!(timecodes.len(), 61);
    assert_eq!(timecodes[0], 0);
    assert_eq!(timecodes[60], 2400);
    assert!(timecodes.windows(2).all(|w| w[0] < w[1]));

    // One constant 25 fps span.
    let spans = tree.timecode_spans.as_ref().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].start_frame, 0);
    assert_eq!(spans[0].fps, 25.0);
}

// Property 5: the index pass is idempotent.

#[test]
fn keyframe_idempotence() {
    let opts = || ParseOptions::get(&["keyframes", "timecodes"]);
    let first = parse(keyframe_file(), opts()).unwrap();
    let second = parse(keyframe_file(), opts()).unwrap();
    assert_eq!(first.keyframes, second.keyframes);
    assert_eq!(first.timecodes, second.timecodes);
}

// BlockGroup keyframe semantics: no ReferenceBlock means keyframe.

#[test]
fn block_group_keyframes() {
    let block = |track: u64, relative: i16| {
        let mut payload = vec![0x80 | track as u8];
        payload.extend_from_slice(&relative.to_be_bytes());
        payload.push(0x00);
        payload.extend_from_slice(&[0xBE, 0xEF]);
        el(ids::BLOCK, &payload)
    };

    let cluster = master(
        ids::CLUSTER,
        &[
            uint_el(ids::TIMECODE, 0),
            // Keyframe: no ReferenceBlock.
            master(ids::BLOCK_GROUP, &[block(1, 0)]),
            // Not a keyframe.
            master(
                ids::BLOCK_GROUP,
                &[block(1, 40), el(ids::REFERENCE_BLOCK, &[0xD8])],
            ),
            master(
                ids::BLOCK_GROUP,
                &[block(1, 80), el(ids::REFERENCE_BLOCK, &[0xD8])],
            ),
        ],
    );
    let segment = master(ids::SEGMENT, &[video_tracks(1, None), cluster]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::get(&["keyframes", "timecodes"])).unwrap();
    assert_eq!(tree.keyframes, Some(vec![0]));
    assert_eq!(tree.timecodes, Some(vec![0, 40, 80]));
}

// S3: CFR mode detects a non-integral frame and withholds keyframes.

#[test]
fn cfr_irregular_time() {
    let cues = master(
        ids::CUES,
        &[master(
            ids::CUE_POINT,
            &[
                uint_el(ids::CUE_TIME, 1220), // 1220 ms / 40 ms = frame 30.5
                master(ids::CUE_TRACK_POSITIONS, &[uint_el(ids::CUE_TRACK, 1)]),
            ],
        )],
    );
    let segment = master(
        ids::SEGMENT,
        &[
            master(ids::INFO, &[]),
            video_tracks(1, Some(40_000_000)),
            cues,
        ],
    );
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::get(&["keyframes", "useCFR"])).unwrap();
    assert!(tree.keyframes.is_none());
}

#[test]
fn cfr_regular_keyframes() {
    let cue_point = |ms: u64| {
        master(
            ids::CUE_POINT,
            &[
                uint_el(ids::CUE_TIME, ms),
                master(ids::CUE_TRACK_POSITIONS, &[uint_el(ids::CUE_TRACK, 1)]),
            ],
        )
    };
    let cues = master(ids::CUES, &[cue_point(0), cue_point(1200), cue_point(2400)]);
    let segment = master(
        ids::SEGMENT,
        &[
            master(ids::INFO, &[]),
            video_tracks(1, Some(40_000_000)),
            cues,
        ],
    );
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::get(&["keyframes", "useCFR"])).unwrap();
    assert_eq!(tree.keyframes, Some(vec![0, 30, 60]));
}

// S4: a SeekHead jump reads only the requested Tags.

#[test]
fn seek_head_directed_read() {
    let info = master(ids::INFO, &[float_el(ids::DURATION, 1000.0)]);
    let tracks = video_tracks(1, None);
    let cluster = master(
        ids::CLUSTER,
        &[uint_el(ids::TIMECODE, 0), simple_block(1, 0, true)],
    );
    let tags = master(
        ids::TAGS,
        &[master(
            0x7373,
            &[master(ids::SIMPLE_TAG, &[str_el(0x45A3, "TITLE")])],
        )],
    );

    let seek_head_for = |position: u64| {
        master(
            ids::SEEK_HEAD,
            &[master(
                ids::SEEK,
                &[
                    el(ids::SEEK_ID, &id_bytes(ids::TAGS)),
                    uint8_el(ids::SEEK_POSITION, position),
                ],
            )],
        )
    };
    // The 8-byte position payload keeps the SeekHead length stable.
    let seek_head_len = seek_head_for(0).len() as u64;
    let tags_position =
        seek_head_len + (info.len() + tracks.len() + cluster.len()) as u64;
    let seek_head = seek_head_for(tags_position);

    let segment = master(ids::SEGMENT, &[seek_head, info, tracks, cluster, tags]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::get(&["Tags"])).unwrap();
    let segment = tree.segments()[0];

    // Tags materialized.
    let tag_name = tree.lookup(segment, "Tags.Tag.SimpleTag.TagName").unwrap();
    assert_eq!(tree.node(tag_name).value, Value::Text("TITLE".into()));

    // The jump went straight from the SeekHead to the Tags: Info, Tracks,
    // and the Cluster were never touched.
    assert!(tree.get(segment, "Info").is_none());
    assert!(tree.get(segment, "Tracks").is_none());
    assert!(tree.get(segment, "Cluster").is_none());
}

// Property 8: without a SeekHead the tail scan rescues the request.

#[test]
fn tail_scan_finds_tags() {
    let info = master(ids::INFO, &[float_el(ids::DURATION, 1000.0)]);
    let tracks = video_tracks(1, None);
    let clusters: Vec<Vec<u8>> = (0..4)
        .map(|i| {
            let mut blocks = vec![uint_el(ids::TIMECODE, i * 1000)];
            for b in 0..16i16 {
                blocks.push(simple_block(1, b * 40, b == 0));
            }
            master(ids::CLUSTER, &blocks)
        })
        .collect();
    let cues = master(
        ids::CUES,
        &[master(
            ids::CUE_POINT,
            &[
                uint_el(ids::CUE_TIME, 0),
                master(ids::CUE_TRACK_POSITIONS, &[uint_el(ids::CUE_TRACK, 1)]),
            ],
        )],
    );
    let tags = master(
        ids::TAGS,
        &[master(
            0x7373,
            &[master(ids::SIMPLE_TAG, &[str_el(0x45A3, "ARTIST")])],
        )],
    );

    let mut children = vec![info, tracks];
    children.extend(clusters);
    children.push(cues);
    children.push(tags);
    let segment = master(ids::SEGMENT, &children);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::get(&["Tags"])).unwrap();
    let segment = tree.segments()[0];

    let tag_name = tree.lookup(segment, "Tags.Tag.SimpleTag.TagName").unwrap();
    assert_eq!(tree.node(tag_name).value, Value::Text("ARTIST".into()));

    // Sections before the first Cluster were skipped without descent; the
    // Cues were never read at all.
    let info = tree.get(segment, "Info").unwrap();
    assert!(tree.node(info).skipped);
    assert!(tree.node(info).children.is_empty());
    assert!(tree.get(segment, "Cues").is_none());
    // The jump happened at the first Cluster.
    assert!(tree.get_all(segment, "Cluster").len() <= 1);
}

// S5: binary payloads are truncated to the limit, metadata keeps the size.

#[test]
fn binary_truncation() {
    let file_data = vec![0xA5u8; 1_048_576];
    let attachments = master(
        ids::ATTACHMENTS,
        &[master(
            ids::ATTACHED_FILE,
            &[
                str_el(0x466E, "cover.png"), // FileName
                el(0x465C, &file_data),      // FileData
            ],
        )],
    );
    let segment = master(ids::SEGMENT, &[attachments]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let data = tree
        .lookup(segment, "Attachments.AttachedFile.FileData")
        .unwrap();

    let node = tree.node(data);
    assert_eq!(node.size, Some(1_048_576));
    assert_eq!(node.value.as_binary().unwrap(), &file_data[..16]);
}

#[test]
fn binary_unlimited() {
    let file_data = vec![0x5Au8; 4096];
    let attachments = master(
        ids::ATTACHMENTS,
        &[master(ids::ATTACHED_FILE, &[el(0x465C, &file_data)])],
    );
    let segment = master(ids::SEGMENT, &[attachments]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default().binary_size_limit(-1)).unwrap();
    let segment = tree.segments()[0];
    let data = tree
        .lookup(segment, "Attachments.AttachedFile.FileData")
        .unwrap();
    assert_eq!(tree.node(data).value.as_binary().unwrap().len(), 4096);
}

// S6: an aborting observer yields a partial tree.

#[test]
fn abort_callback() {
    let info = master(ids::INFO, &[str_el(0x7BA9, "title")]);
    let tracks = master(
        ids::TRACKS,
        &[
            master(
                ids::TRACK_ENTRY,
                &[uint_el(ids::TRACK_NUMBER, 1), uint_el(ids::TRACK_TYPE, 1)],
            ),
            master(
                ids::TRACK_ENTRY,
                &[uint_el(ids::TRACK_NUMBER, 2), uint_el(ids::TRACK_TYPE, 2)],
            ),
        ],
    );
    let tags = master(ids::TAGS, &[master(0x7373, &[])]);
    let segment = master(ids::SEGMENT, &[info, tracks, tags]);
    let file = file_of(&[ebml_header(), segment]);

    let options = ParseOptions::get(&["*"]).on_entry(|element| {
        if element.name == "TrackEntry" {
            Observe::Abort
        } else {
            Observe::Continue
        }
    });

    let tree = parse(file, options).unwrap();
    let segment = tree.segments()[0];

    // Exactly one TrackEntry, announced and empty; nothing after it.
    let entries = tree.get_all(segment, "TrackEntry");
    assert_eq!(entries.len(), 1);
    assert!(tree.node(entries[0]).children.is_empty());
    assert!(tree.get(segment, "Tags").is_none());
}

#[test]
fn skip_callback() {
    let info = master(ids::INFO, &[str_el(0x7BA9, "title")]);
    let tracks = video_tracks(1, None);
    let segment = master(ids::SEGMENT, &[info, tracks]);
    let file = file_of(&[ebml_header(), segment]);

    let options = ParseOptions::default().on_entry(|element| {
        if element.name == "Info" {
            Observe::Skip
        } else {
            Observe::Continue
        }
    });

    let tree = parse(file, options).unwrap();
    let segment = tree.segments()[0];

    let info = tree.get(segment, "Info").unwrap();
    assert!(tree.node(info).skipped);
    assert!(tree.node(info).children.is_empty());
    // Parsing continued past the skipped container.
    assert!(tree.get(segment, "Tracks").is_some());
}

// Property 4: TimecodeScale arriving after Duration rescales it.

#[test]
fn timecode_scale_retroactivity() {
    let info = master(
        ids::INFO,
        &[
            float_el(ids::DURATION, 1000.0),
            uint_el(ids::TIMECODE_SCALE, 2_000_000),
        ],
    );
    let segment = master(ids::SEGMENT, &[info]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let duration = value_of(&tree, segment, "Info.Duration");
    assert_eq!(duration, Value::Duration(Duration::from_secs(2)));
}

#[test]
fn timecode_scale_default() {
    let info = master(ids::INFO, &[float_el(ids::DURATION, 1500.0)]);
    let segment = master(ids::SEGMENT, &[info]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let duration = value_of(&tree, segment, "Info.Duration");
    assert_eq!(duration, Value::Duration(Duration::from_millis(1500)));
}

// Property 7: unknown identifiers are preserved as `?`.

#[test]
fn unknown_identifier_preserved() {
    let unknown = el(0x84, &[1, 2, 3, 4]);
    let info = master(
        ids::INFO,
        &[str_el(0x7BA9, "title"), unknown, uint_el(ids::TIMECODE_SCALE, 1_000_000)],
    );
    let segment = master(ids::SEGMENT, &[info]);
    let bytes = [ebml_header(), segment].concat();

    // Locate the injected element to check recorded offsets.
    let expected_offset = bytes
        .windows(6)
        .position(|w| w == [0x84, 0x84, 1, 2, 3, 4])
        .unwrap() as u64;

    let tree = parse(Cursor::new(bytes), ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let node = tree.lookup(segment, "Info.?").unwrap();

    let element = tree.node(node);
    assert_eq!(element.name, "?");
    assert_eq!(element.id, 0x84);
    assert_eq!(element.offset, expected_offset);
    assert_eq!(element.size, Some(4));
    assert_eq!(element.value.as_binary().unwrap(), &[1, 2, 3, 4]);

    // Siblings after the unknown element still parse.
    assert!(tree.lookup(segment, "Info.TimecodeScale").is_some());
}

// Track-type cooking: symbolic value and per-kind buckets.

#[test]
fn track_type_buckets() {
    let tracks = master(
        ids::TRACKS,
        &[
            master(
                ids::TRACK_ENTRY,
                &[uint_el(ids::TRACK_NUMBER, 1), uint_el(ids::TRACK_TYPE, 1)],
            ),
            master(
                ids::TRACK_ENTRY,
                &[uint_el(ids::TRACK_NUMBER, 2), uint_el(ids::TRACK_TYPE, 2)],
            ),
            master(
                ids::TRACK_ENTRY,
                &[uint_el(ids::TRACK_NUMBER, 3), uint_el(ids::TRACK_TYPE, 0x11)],
            ),
        ],
    );
    let segment = master(ids::SEGMENT, &[tracks]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let tracks = tree.get(segment, "Tracks").unwrap();

    assert_eq!(tree.get_all(tracks, "Video").len(), 1);
    assert_eq!(tree.get_all(tracks, "Audio").len(), 1);
    assert_eq!(tree.get_all(tracks, "Subtitle").len(), 1);

    // The bucket aliases the TrackEntry node itself.
    let video = tree.get(tracks, "Video").unwrap();
    let number = tree.get(video, "TrackNumber").unwrap();
    assert_eq!(tree.node(number).value, Value::Unsigned(1));
}

// DefaultDuration cooks to a snapped FPS.

#[test]
fn default_duration_fps() {
    let segment = master(ids::SEGMENT, &[video_tracks(1, Some(41_708_333))]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let node = tree
        .lookup(segment, "Tracks.TrackEntry.DefaultDuration")
        .unwrap();
    assert_eq!(tree.node(node).value, Value::Fps(24.0 / 1.001));
}

// Unknown-size Segment is bounded by end of stream.

#[test]
fn unknown_size_segment() {
    let info = master(ids::INFO, &[str_el(0x7BA9, "open-ended")]);
    let mut bytes = ebml_header();
    bytes.extend_from_slice(&id_bytes(ids::SEGMENT));
    bytes.push(0xFF); // unknown size
    bytes.extend_from_slice(&info);

    let tree = parse(Cursor::new(bytes), ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    assert!(tree.node(segment).size.is_none());
    assert_eq!(
        value_of(&tree, segment, "Info.Title"),
        Value::Text("open-ended".into())
    );
}

// Chapters: nested ChapterAtoms resolve through the recursive schema entry
// and chapter times cook as raw nanoseconds.

#[test]
fn nested_chapters() {
    let inner = master(
        ids::CHAPTER_ATOM,
        &[
            uint_el(0x73C4, 2),                    // ChapterUID
            uint_el(0x91, 500_000_000),            // ChapterTimeStart, ns
        ],
    );
    let outer = master(
        ids::CHAPTER_ATOM,
        &[uint_el(0x73C4, 1), uint_el(0x91, 0), inner],
    );
    let chapters = master(ids::CHAPTERS, &[master(0x45B9, &[outer])]);
    let segment = master(ids::SEGMENT, &[chapters]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];

    let outer = tree
        .lookup(segment, "Chapters.EditionEntry.ChapterAtom")
        .unwrap();
    let inner = tree.get(outer, "ChapterAtom").unwrap();
    let start = tree.get(inner, "ChapterTimeStart").unwrap();
    assert_eq!(
        tree.node(start).value,
        Value::Duration(Duration::from_millis(500))
    );
}

// keep_stream_open hands the source back through the tree.

#[test]
fn keep_stream_open() {
    let file = file_of(&[ebml_header(), master(ids::SEGMENT, &[])]);
    let mut tree = parse(file, ParseOptions::default().keep_stream_open(true)).unwrap();
    assert!(tree.take_source().is_some());
    assert!(tree.take_source().is_none());

    let file = file_of(&[ebml_header(), master(ids::SEGMENT, &[])]);
    let mut tree = parse(file, ParseOptions::default()).unwrap();
    assert!(tree.take_source().is_none());
}

// Requesting everything materializes the Cluster contents too.

#[test]
fn request_all_sections() {
    let tree = parse(keyframe_file(), ParseOptions::get(&["*"])).unwrap();
    let segment = tree.segments()[0];

    let cluster = tree.get(segment, "Cluster").unwrap();
    assert!(!tree.node(cluster).skipped);
    assert_eq!(tree.get_all(cluster, "SimpleBlock").len(), 61);

    // Cluster timecode cooked against the session scale.
    let timecode = tree.get(cluster, "Timecode").unwrap();
    assert_eq!(tree.node(timecode).value, Value::Duration(Duration::ZERO));
}

// Duplicate non-multiple children promote to a sequence instead of being
// dropped.

#[test]
fn duplicate_non_multiple_child() {
    let info = master(
        ids::INFO,
        &[str_el(0x7BA9, "first"), str_el(0x7BA9, "second")],
    );
    let segment = master(ids::SEGMENT, &[info]);
    let file = file_of(&[ebml_header(), segment]);

    let tree = parse(file, ParseOptions::default()).unwrap();
    let segment = tree.segments()[0];
    let info = tree.get(segment, "Info").unwrap();
    let titles = tree.get_all(info, "Title");
    assert_eq!(titles.len(), 2);
    assert_eq!(tree.node(titles[0]).value, Value::Text("first".into()));
    assert_eq!(tree.node(titles[1]).value, Value::Text("second".into()));
}

#[test]
fn find_and_closest() {
    let tree = parse(keyframe_file(), ParseOptions::get(&["*"])).unwrap();
    let segment = tree.segments()[0];

    let entries = tree.find(segment, Some("TrackEntry"), None);
    assert_eq!(entries.len(), 1);

    let tracks = tree.closest(entries[0], "Tracks", None).unwrap();
    assert_eq!(tree.node(tracks).name, "Tracks");

    let pattern = Regex::new(r"\\Segment$").unwrap();
    let root = tree.closest(entries[0], "NoSuchName", Some(&pattern)).unwrap();
    assert_eq!(tree.node(root).name, "Segment");
}
