//! The secondary indexing pass: keyframes, frame timecodes, and same-FPS
//! spans.
//!
//! Both modes re-walk raw byte ranges recorded in the tree with a minimal
//! TLV walker built on the VINT codec alone. VFR mode (the default) scans
//! every Cluster; CFR mode trusts the Cues and the video track's default
//! frame duration instead.

use crate::cook::snap_fps;
use crate::element::{NodeId, TimecodeSpan};
use crate::error::Result;
use crate::reader::Parser;
use crate::schema::{ids, TrackKind};
use crate::vint;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Run the index builder over the first Segment, honoring the requested
/// derived tokens. Missing preconditions are warnings; the parse tree is
/// returned regardless.
pub(crate) fn build(p: &mut Parser) -> Result<()> {
    let segment = match p.tree.segments().first().copied() {
        Some(segment) => segment,
        None => {
            warn!("no Segment parsed, skipping index pass");
            return Ok(());
        }
    };

    let video_track = match find_video_track(p, segment) {
        Some(track) => track,
        None => {
            warn!("no video track resolved, skipping index pass");
            return Ok(());
        }
    };

    if p.opts.use_cfr {
        if p.opts.timecodes {
            warn!("timecodes are derived from Clusters and are unavailable in CFR mode");
        }
        if p.opts.keyframes {
            if let Some(keyframes) = cfr_scan(p, segment, video_track)? {
                p.tree.keyframes = Some(keyframes.into_iter().collect());
            }
        }
        return Ok(());
    }

    let (keyframes, timecodes) = vfr_scan(p, segment, video_track)?;
    if p.opts.keyframes {
        p.tree.keyframes = Some(keyframes.into_iter().collect());
    }
    if p.opts.timecodes {
        let timecodes: Vec<u64> = timecodes.into_iter().collect();
        p.tree.timecode_spans = Some(derive_spans(&timecodes, p.scale));
        p.tree.timecodes = Some(timecodes);
    }
    Ok(())
}

/// Schema-resolved video track number of the first video TrackEntry.
fn find_video_track(p: &Parser, segment: NodeId) -> Option<u64> {
    for &entry in p.tree.get_all(segment, "TrackEntry") {
        let kind = p
            .tree
            .get(entry, "TrackType")
            .and_then(|n| p.tree.node(n).value.as_track_kind());
        if kind == Some(TrackKind::Video) {
            return p
                .tree
                .get(entry, "TrackNumber")
                .and_then(|n| p.tree.node(n).value.as_unsigned());
        }
    }
    None
}

/// Raw default frame duration (nanoseconds) of the video TrackEntry.
fn video_default_duration(p: &Parser, segment: NodeId) -> Option<f64> {
    for &entry in p.tree.get_all(segment, "TrackEntry") {
        let kind = p
            .tree
            .get(entry, "TrackType")
            .and_then(|n| p.tree.node(n).value.as_track_kind());
        if kind == Some(TrackKind::Video) {
            return p
                .tree
                .get(entry, "DefaultDuration")
                .and_then(|n| p.tree.node(n).raw);
        }
    }
    None
}

/// CFR mode: every CuePoint that references the video track lands on an
/// integral frame boundary; anything else means the file is not truly CFR.
fn cfr_scan(p: &mut Parser, segment: NodeId, video_track: u64) -> Result<Option<BTreeSet<u64>>> {
    let cues = match p.tree.get(segment, "Cues") {
        Some(cues) => cues,
        None => {
            warn!("Cues absent, CFR keyframe pass skipped");
            return Ok(None);
        }
    };
    let default_ns = match video_default_duration(p, segment) {
        Some(ns) if ns > 0.0 => ns,
        _ => {
            warn!("video default frame duration absent, CFR keyframe pass skipped");
            return Ok(None);
        }
    };
    let default_ms = default_ns / 1e6;
    let tolerance = 1.0 / default_ms;

    let start = p.tree.node(cues).data_offset;
    let end = p
        .tree
        .node(cues)
        .end()
        .unwrap_or_else(|| p.src.len())
        .min(p.src.len());

    let scale = p.scale;
    let mut keyframes = BTreeSet::new();
    let mut cue_time: Option<u64> = None;
    let mut references_video = false;

    fn flush(
        keyframes: &mut BTreeSet<u64>,
        cue_time: Option<u64>,
        references_video: bool,
        scale: u64,
        default_ns: f64,
        tolerance: f64,
    ) -> bool {
        if !references_video {
            return true;
        }
        let Some(time) = cue_time else { return true };
        let frame = time as f64 * scale as f64 / default_ns;
        if frame.fract() > tolerance {
            warn!(frame, "irregular time for a constant-frame-rate file");
            return false;
        }
        keyframes.insert(frame as u64);
        true
    }

    p.src.seek_to(start)?;
    while p.src.position() < end {
        let (id, _) = vint::read_id(&mut p.src)?;
        let (size, _) = vint::read_size(&mut p.src)?;
        match id {
            ids::CUE_POINT => {
                if !flush(&mut keyframes, cue_time, references_video, scale, default_ns, tolerance) {
                    return Ok(None);
                }
                cue_time = None;
                references_video = false;
            }
            ids::CUE_TRACK_POSITIONS => {}
            ids::CUE_TIME => {
                let Some(size) = size else { break };
                let data = p.src.read_vec(size)?;
                cue_time = Some(vint::decode_uint(&data));
            }
            ids::CUE_TRACK => {
                let Some(size) = size else { break };
                let data = p.src.read_vec(size)?;
                if vint::decode_uint(&data) == video_track {
                    references_video = true;
                }
            }
            _ => {
                let Some(size) = size else { break };
                p.src.skip(size)?;
            }
        }
    }
    if !flush(&mut keyframes, cue_time, references_video, scale, default_ns, tolerance) {
        return Ok(None);
    }

    debug!(count = keyframes.len(), "CFR keyframes");
    Ok(Some(keyframes))
}

/// Header of a Block/SimpleBlock: track VINT, 16-bit relative timecode,
/// flags byte.
struct BlockHeader {
    track: u64,
    relative: i16,
    flags: u8,
    consumed: u64,
}

fn read_block_header(p: &mut Parser) -> Result<Option<BlockHeader>> {
    let start = p.src.position();
    let first = p.src.read_u8()?;
    if first == 0 {
        return Ok(None);
    }
    let width = first.leading_zeros() as usize + 1;
    let mut track = (first & (0xFFu16 >> width) as u8) as u64;
    for _ in 1..width {
        track = (track << 8) | p.src.read_u8()? as u64;
    }
    let hi = p.src.read_u8()?;
    let lo = p.src.read_u8()?;
    let relative = i16::from_be_bytes([hi, lo]);
    let flags = p.src.read_u8()?;
    Ok(Some(BlockHeader {
        track,
        relative,
        flags,
        consumed: p.src.position() - start,
    }))
}

/// VFR mode: walk every Cluster, collecting video block timecodes and
/// keyframe block indices.
fn vfr_scan(
    p: &mut Parser,
    segment: NodeId,
    video_track: u64,
) -> Result<(BTreeSet<u64>, BTreeSet<u64>)> {
    let segment_end = p
        .tree
        .node(segment)
        .end()
        .unwrap_or_else(|| p.src.len())
        .min(p.src.len());

    // Cluster extents; an unknown-size Cluster runs to its next sibling.
    let cluster_nodes: Vec<NodeId> = p.tree.get_all(segment, "Cluster").to_vec();
    let mut clusters: Vec<(u64, u64)> = Vec::with_capacity(cluster_nodes.len());
    for (i, &node) in cluster_nodes.iter().enumerate() {
        let element = p.tree.node(node);
        let end = element.end().unwrap_or_else(|| {
            cluster_nodes
                .get(i + 1)
                .map(|&next| p.tree.node(next).offset)
                .unwrap_or(segment_end)
        });
        clusters.push((element.data_offset, end.min(segment_end)));
    }

    let mut keyframes = BTreeSet::new();
    let mut timecodes = BTreeSet::new();
    let mut block_index: u64 = 0;

    for (start, end) in clusters {
        let mut cluster_base: u64 = 0;
        p.src.seek_to(start)?;

        while p.src.position() < end {
            let (id, _) = vint::read_id(&mut p.src)?;
            let (size, _) = vint::read_size(&mut p.src)?;
            match id {
                // A nested Cluster id means unknown-size packing; descend
                // without skipping.
                ids::CLUSTER => {}
                ids::TIMECODE => {
                    let Some(size) = size else { break };
                    let data = p.src.read_vec(size)?;
                    cluster_base = vint::decode_uint(&data);
                }
                ids::SIMPLE_BLOCK => {
                    let Some(size) = size else { break };
                    let after = p.src.position() + size;
                    if let Some(header) = read_block_header(p)? {
                        if header.track == video_track && header.consumed <= size {
                            let timecode =
                                (cluster_base as i64 + header.relative as i64).max(0) as u64;
                            timecodes.insert(timecode);
                            if header.flags & 0x80 != 0 {
                                keyframes.insert(block_index);
                            }
                            block_index += 1;
                        }
                    }
                    p.src.seek_to(after)?;
                }
                ids::BLOCK_GROUP => {
                    let group_end = size
                        .map(|s| p.src.position() + s)
                        .unwrap_or(end)
                        .min(end);
                    let mut has_reference = false;
                    let mut video_block: Option<u64> = None;

                    while p.src.position() < group_end {
                        let (id, _) = vint::read_id(&mut p.src)?;
                        let (size, _) = vint::read_size(&mut p.src)?;
                        let Some(size) = size else { break };
                        let after = p.src.position() + size;
                        match id {
                            ids::BLOCK => {
                                if let Some(header) = read_block_header(p)? {
                                    if header.track == video_track && header.consumed <= size {
                                        let timecode = (cluster_base as i64
                                            + header.relative as i64)
                                            .max(0)
                                            as u64;
                                        timecodes.insert(timecode);
                                        video_block = Some(block_index);
                                        block_index += 1;
                                    }
                                }
                            }
                            ids::REFERENCE_BLOCK => {
                                has_reference = true;
                            }
                            _ => {}
                        }
                        p.src.seek_to(after)?;
                    }

                    // A BlockGroup whose video Block saw no ReferenceBlock
                    // is a keyframe.
                    if let (Some(index), false) = (video_block, has_reference) {
                        keyframes.insert(index);
                    }
                }
                _ => {
                    let Some(size) = size else { break };
                    p.src.skip(size)?;
                }
            }
        }
    }

    debug!(
        keyframes = keyframes.len(),
        timecodes = timecodes.len(),
        "cluster walk complete"
    );
    Ok((keyframes, timecodes))
}

/// Derive same-FPS spans from the sorted timecode list.
///
/// A span closes when the inter-frame delta moves by more than one
/// millisecond (in local scale units) from the previous delta; the new span
/// starts at the previous boundary.
fn derive_spans(timecodes: &[u64], scale: u64) -> Vec<TimecodeSpan> {
    if timecodes.len() < 2 {
        return Vec::new();
    }

    let tolerance = (1_000_000 / scale.max(1)).max(1);
    let mut spans = Vec::new();
    let mut span_start = 0usize;
    let mut last_delta: Option<u64> = None;

    for i in 1..timecodes.len() {
        let delta = timecodes[i] - timecodes[i - 1];
        if let Some(last) = last_delta {
            if delta.abs_diff(last) > tolerance {
                spans.push(make_span(timecodes, span_start, i - 1, scale));
                span_start = i - 1;
            }
        }
        last_delta = Some(delta);
    }
    spans.push(make_span(timecodes, span_start, timecodes.len() - 1, scale));
    spans
}

fn make_span(timecodes: &[u64], first: usize, last: usize, scale: u64) -> TimecodeSpan {
    let frames = (last - first) as f64;
    let seconds = (timecodes[last] - timecodes[first]) as f64 * scale as f64 / 1e9;
    let fps = if seconds > 0.0 { snap_fps(frames / seconds) } else { 0.0 };
    TimecodeSpan {
        start_frame: first as u64,
        start_time: timecodes[first],
        fps,
    }
}
