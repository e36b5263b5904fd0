//! The traversal engine.
//!
//! Locates EBML/Segment roots by chunked forward scanning, walks Segment
//! children under the section-request policy, follows SeekHead guidance to
//! jump directly at still-missing sections, and falls back to a backward
//! tail scan over the packed level-1 containers when no SeekHead exists.

use crate::element::NodeId;
use crate::error::{ParseError, Result};
use crate::options::Section;
use crate::reader::{Outcome, Parser};
use crate::schema::{ids, schema, ElementType, LEVEL1_IDS};
use crate::source::Source;
use crate::vint;
use tracing::{debug, warn};

/// Chunk size for forward scans.
const SCAN_CHUNK: u64 = 4096;
/// Maximum chunks scanned while searching for a root.
const ROOT_CHUNK_CAP: usize = 128;
/// Window size for the backward tail scan.
const TAIL_WINDOW: u64 = 4096;
/// Maximum windows visited by one tail scan (1 MiB total).
const TAIL_WINDOW_CAP: usize = 256;

/// Scan forward from the cursor for any of the given 4-byte identifiers.
///
/// On a hit the cursor is rewound so the next read begins at the
/// identifier; the hit offset is returned. Bounded by `max_chunks` chunks
/// of 4 KiB and by end-of-stream.
pub(crate) fn scan_forward(
    src: &mut Source,
    targets: &[u64],
    max_chunks: usize,
) -> Result<Option<u64>> {
    let patterns: Vec<[u8; 4]> = targets.iter().map(|&id| (id as u32).to_be_bytes()).collect();

    let mut base = src.position();
    let mut carry: Vec<u8> = Vec::new();

    for _ in 0..max_chunks {
        if base >= src.len() {
            break;
        }
        let count = (src.len() - base).min(SCAN_CHUNK);
        src.seek_to(base)?;
        let chunk = src.read_vec(count)?;

        // Prepend the previous chunk's tail so boundary-straddling
        // identifiers are seen.
        let mut haystack = carry;
        let haystack_base = base - haystack.len() as u64;
        haystack.extend_from_slice(&chunk);

        if haystack.len() >= 4 {
            for i in 0..=haystack.len() - 4 {
                if patterns.iter().any(|p| haystack[i..i + 4] == *p) {
                    let hit = haystack_base + i as u64;
                    src.seek_to(hit)?;
                    return Ok(Some(hit));
                }
            }
        }

        carry = haystack[haystack.len().saturating_sub(3)..].to_vec();
        base += count;
        if count < SCAN_CHUNK {
            break;
        }
    }

    Ok(None)
}

/// Parse every root in the source.
pub(crate) fn run(p: &mut Parser) -> Result<()> {
    let mut found = false;

    while !p.aborted && p.src.position() < p.src.len() {
        match scan_forward(&mut p.src, &[ids::EBML, ids::SEGMENT], ROOT_CHUNK_CAP)? {
            Some(offset) => {
                debug!(offset, "root located");
                found = true;
                read_root(p)?;
            }
            None => break,
        }
    }

    if !found {
        return Err(ParseError::MissingRoot);
    }
    Ok(())
}

/// Read the root element at the cursor (EBML or Segment).
fn read_root(p: &mut Parser) -> Result<()> {
    let offset = p.src.position();
    let (id, _) = vint::read_id(&mut p.src)?;
    let (size, _) = vint::read_size(&mut p.src)?;
    let data_offset = p.src.position();

    let entry = schema().get(id).ok_or(ParseError::UnexpectedElement {
        offset,
        expected: "EBML or Segment",
        found: id,
    })?;

    let node = p.attach(
        None,
        id,
        entry.name,
        ElementType::Master,
        offset,
        data_offset,
        size,
        true,
    );

    match p.observe(node) {
        crate::options::Observe::Abort => {
            p.aborted = true;
            return Ok(());
        }
        crate::options::Observe::Skip => {
            p.tree.node_mut(node).skipped = true;
            if let Some(size) = size {
                p.src.seek_to((data_offset + size).min(p.src.len()))?;
            }
            return Ok(());
        }
        crate::options::Observe::Continue => {}
    }

    if id == ids::EBML {
        read_ebml_header(p, node)?;
    } else {
        read_segment(p, node)?;
    }
    Ok(())
}

/// Read the EBML header children and validate the doc type.
fn read_ebml_header(p: &mut Parser, node: NodeId) -> Result<()> {
    loop {
        match p.read_child(node)? {
            Outcome::Child(_) => {}
            Outcome::End => break,
            Outcome::Abort => return Ok(()),
        }
    }
    if let Some(end) = p.tree.node(node).end() {
        p.src.seek_to(end.min(p.src.len()))?;
    }

    let doc_type = p
        .tree
        .get(node, "DocType")
        .and_then(|n| p.tree.node(n).value.as_text().map(str::to_owned));
    match doc_type.as_deref() {
        Some("matroska") | Some("webm") => {}
        Some(other) => warn!(doc_type = other, "unexpected EBML doc type"),
        None => warn!("EBML header without DocType"),
    }

    p.satisfied.insert(Section::Ebml);
    Ok(())
}

/// Requested sections not yet satisfied in the current Segment, in a fixed
/// order. The CFR index pass needs the Cues located even though they are
/// not materialized.
fn pending_sections(p: &Parser) -> Vec<Section> {
    let mut pending = Vec::new();
    for section in Section::ALL {
        if section == Section::Ebml || section.is_multiple() {
            continue;
        }
        let needed = p.opts.wants(section)
            || (section == Section::Cues && p.opts.wants_index() && p.opts.use_cfr);
        if needed && !p.satisfied.contains(&section) {
            pending.push(section);
        }
    }
    pending
}

/// Whether the Segment walk can terminate early.
fn all_requested_satisfied(p: &Parser) -> bool {
    if p.needs_cluster_enum() || p.opts.wants(Section::Cluster) {
        // Cluster enumeration runs to the end of the Segment.
        return false;
    }
    pending_sections(p).is_empty()
}

/// Pick the nearest SeekHead-provided jump target for a still-missing
/// section, or a further SeekHead to read. Visited offsets are never
/// returned twice.
fn consult_seeks(p: &mut Parser) -> Option<u64> {
    let mut nearest: Option<u64> = None;
    for section in pending_sections(p) {
        if let Some(&offset) = p.seeks.get(&section.id()) {
            if !p.visited_seeks.contains(&offset) && nearest.map_or(true, |n| offset < n) {
                nearest = Some(offset);
            }
        }
    }
    if let Some(offset) = nearest {
        p.visited_seeks.insert(offset);
        return Some(offset);
    }
    // Nested SeekHeads are followed on demand.
    while let Some(offset) = p.pending_seek_heads.pop() {
        if p.visited_seeks.insert(offset) {
            return Some(offset);
        }
    }
    None
}

/// Walk the children of a Segment.
fn read_segment(p: &mut Parser, segment: NodeId) -> Result<()> {
    p.satisfied.clear();
    p.seeks.clear();
    p.pending_seek_heads.clear();
    p.visited_seeks.clear();

    let data_start = p.tree.node(segment).data_offset;
    let segment_end = p
        .tree
        .node(segment)
        .end()
        .unwrap_or(p.src.len())
        .min(p.src.len());

    loop {
        if p.aborted {
            break;
        }
        let position = p.src.position();
        if position >= segment_end {
            break;
        }
        if all_requested_satisfied(p) {
            debug!(position, "all requested sections satisfied");
            break;
        }

        // Peek the next header to drive the navigation policy.
        let peeked = peek_header(p);
        let id = match peeked {
            Ok((id, _)) => {
                p.src.seek_to(position)?;
                id
            }
            Err(error) => {
                warn!(%error, offset = position, "segment child error, trying tail-scan recovery");
                match tail_scan(p, data_start, segment_end)? {
                    Some(offset) if offset > position => {
                        p.src.seek_to(offset)?;
                        continue;
                    }
                    _ => return Err(error),
                }
            }
        };

        let would_skip = match Section::from_id(id) {
            Some(Section::SeekHead) => false,
            Some(section) => !p.opts.wants(section),
            None => false,
        };

        if would_skip && !p.needs_cluster_enum() && !pending_sections(p).is_empty() {
            if let Some(target) = consult_seeks(p) {
                debug!(target, "seek-head jump");
                p.src.seek_to(target)?;
                continue;
            }
            if id == ids::CLUSTER {
                // Clusters dominate the tail of the file; without SeekHead
                // guidance the packed level-1 layout is the only index.
                match tail_scan(p, data_start, segment_end)? {
                    Some(offset) => {
                        debug!(offset, "tail scan hit");
                        p.src.seek_to(offset)?;
                        continue;
                    }
                    None if !p.opts.exhaustive_search => {
                        debug!("tail scan failed, stopping segment walk");
                        break;
                    }
                    None => {}
                }
            }
        }

        match p.read_child(segment) {
            Ok(Outcome::Child(node)) => {
                p.progress(position);
                if let Some(section) = Section::from_id(p.tree.node(node).id) {
                    if !section.is_multiple() {
                        p.satisfied.insert(section);
                    }
                }
            }
            Ok(Outcome::End) => break,
            Ok(Outcome::Abort) => break,
            Err(error) => {
                warn!(%error, offset = position, "segment child error, trying tail-scan recovery");
                match tail_scan(p, data_start, segment_end)? {
                    Some(offset) if offset > position => {
                        p.src.seek_to(offset)?;
                        continue;
                    }
                    _ => return Err(error),
                }
            }
        }
    }

    // Land after the segment so the next root search starts there.
    if !p.aborted {
        if let Some(end) = p.tree.node(segment).end() {
            p.src.seek_to(end.min(p.src.len()))?;
        }
    }
    Ok(())
}

/// Read the next element id and size without committing the cursor.
fn peek_header(p: &mut Parser) -> Result<(u64, Option<u64>)> {
    let (id, _) = vint::read_id(&mut p.src)?;
    let (size, _) = vint::read_size(&mut p.src)?;
    Ok((id, size))
}

/// Backward scan for the last packed level-1 containers of a Segment.
///
/// Level-1 containers pack end-to-end, so a candidate identifier whose
/// following size VINT makes it end exactly at the last known end is a
/// valid terminal element. Returns the offset of a still-requested section
/// when one is found; other validated matches only move the scan boundary.
fn tail_scan(p: &mut Parser, data_start: u64, segment_end: u64) -> Result<Option<u64>> {
    let resume = p.src.position();
    let patterns: Vec<(u64, [u8; 4])> = LEVEL1_IDS
        .iter()
        .map(|&id| (id, (id as u32).to_be_bytes()))
        .collect();

    let mut last_known_end = segment_end.min(p.src.len());
    let mut scan_hi = last_known_end;
    let mut windows_left = TAIL_WINDOW_CAP;
    let mut result = None;

    while windows_left > 0 {
        let win_lo = scan_hi.saturating_sub(TAIL_WINDOW).max(data_start);
        if win_lo >= scan_hi {
            break;
        }
        windows_left -= 1;

        p.src.seek_to(win_lo)?;
        let window = p.src.read_vec(scan_hi - win_lo)?;

        let mut matched = None;
        if window.len() >= 4 {
            'scan: for i in 0..=window.len() - 4 {
                for (id, pattern) in &patterns {
                    if window[i..i + 4] != *pattern {
                        continue;
                    }
                    // The size VINT must lie entirely within the window.
                    let Some((Some(size), size_len)) = vint::size_in_slice(&window[i + 4..])
                    else {
                        continue;
                    };
                    let start = win_lo + i as u64;
                    if start + 4 + size_len as u64 + size == last_known_end {
                        matched = Some((start, *id));
                        break 'scan;
                    }
                }
            }
        }

        match matched {
            Some((start, id)) => {
                let requested = Section::from_id(id)
                    .map(|s| pending_sections(p).contains(&s))
                    .unwrap_or(false);
                if requested {
                    result = Some(start);
                    break;
                }
                // Validated but not wanted: keep walking backward from it.
                last_known_end = start;
                scan_hi = start;
            }
            None => {
                // The terminal element starts below this window; slide down
                // with a small overlap for boundary-straddling headers.
                if win_lo == data_start {
                    break;
                }
                scan_hi = win_lo + 11;
            }
        }
    }

    p.src.seek_to(resume)?;
    Ok(result)
}
