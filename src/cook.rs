//! Semantic cooking of decoded values.
//!
//! Cooking runs immediately after a leaf is decoded, while the parent
//! container is still open: timecode-scaled durations, chapter times,
//! frame-rate derivation, and track-type mapping. The session timecode
//! scale lives in the parse context; when an explicit `Info/TimecodeScale`
//! arrives after a `Duration`, the already-cooked values are rescaled.

use crate::element::{NodeId, Tree, Value};
use crate::schema::TrackKind;
use std::time::Duration;

/// Canonical frame rates used for snapping.
const SNAP_RATES: [f64; 7] = [18.0, 24.0, 25.0, 30.0, 48.0, 60.0, 120.0];

/// Snap a measured frame rate to the nearest canonical value.
///
/// Candidates are each canonical rate and its NTSC variant (rate / 1.001)
/// within a 0.001 tolerance; failing that, a value within 0.001 of an
/// integer snaps to that integer; otherwise the measurement stands.
pub fn snap_fps(measured: f64) -> f64 {
    for rate in SNAP_RATES {
        for divisor in [1.0, 1.001] {
            let candidate = rate / divisor;
            if (measured - candidate).abs() <= 0.001 {
                return candidate;
            }
        }
    }
    let nearest = measured.round();
    if (measured - nearest).abs() <= 0.001 {
        nearest
    } else {
        measured
    }
}

/// Nanoseconds as a duration value, clamped at zero.
fn ns_duration(ns: f64) -> Duration {
    if ns <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(ns / 1e9)
    }
}

/// Cook a freshly decoded leaf in place.
///
/// `scale` is the session timecode scale in nanoseconds per tick;
/// `video_fps` is the frame rate of the video track when already known.
pub(crate) fn cook_leaf(tree: &mut Tree, scale: &mut u64, video_fps: Option<f64>, node: NodeId) {
    let parent = match tree.node(node).parent {
        Some(parent) => parent,
        None => return,
    };
    let parent_name = tree.node(parent).name;

    match (parent_name, tree.node(node).name) {
        ("Info", "TimecodeScale") => {
            if let Some(new_scale) = tree.node(node).value.as_unsigned() {
                *scale = new_scale;
                rescale_durations(tree, parent, new_scale);
            }
        }
        ("Info", "Duration") => {
            if let Some(raw) = tree.node(node).value.as_float() {
                let element = tree.node_mut(node);
                element.raw = Some(raw);
                element.value = Value::Duration(ns_duration(raw * *scale as f64));
            }
        }
        ("Cluster", "Timecode") | ("CuePoint", "CueTime") => {
            if let Some(raw) = tree.node(node).value.as_unsigned() {
                let element = tree.node_mut(node);
                element.raw = Some(raw as f64);
                element.value = Value::Duration(ns_duration(raw as f64 * *scale as f64));
            }
        }
        ("CueTrackPositions", "CueDuration") | ("BlockGroup", "BlockDuration") => {
            if let Some(raw) = tree.node(node).value.as_unsigned() {
                let ms = raw as f64 * *scale as f64 / 1e6;
                let element = tree.node_mut(node);
                element.raw = Some(raw as f64);
                element.value = Value::Millis { ms, fps: video_fps };
            }
        }
        // Chapter times are stored in nanoseconds already.
        ("ChapterAtom", "ChapterTimeStart") | ("ChapterAtom", "ChapterTimeEnd") => {
            if let Some(raw) = tree.node(node).value.as_unsigned() {
                let element = tree.node_mut(node);
                element.raw = Some(raw as f64);
                element.value = Value::Duration(Duration::from_nanos(raw));
            }
        }
        ("TrackEntry", "DefaultDuration") | ("TrackEntry", "DefaultDecodedFieldDuration") => {
            match tree.node(node).value.as_unsigned() {
                Some(raw) if raw > 0 => {
                    let element = tree.node_mut(node);
                    element.raw = Some(raw as f64);
                    element.value = Value::Fps(snap_fps(1e9 / raw as f64));
                }
                _ => {
                    tracing::warn!(
                        offset = tree.node(node).offset,
                        "default duration of zero, leaving raw value"
                    );
                }
            }
        }
        ("TrackEntry", "TrackType") => {
            if let Some(raw) = tree.node(node).value.as_unsigned() {
                match TrackKind::from_raw(raw) {
                    Some(kind) => {
                        tree.node_mut(node).value = Value::TrackKind(kind);
                        bucket_track(tree, parent, kind);
                    }
                    None => {
                        tracing::warn!(
                            value = raw,
                            offset = tree.node(node).offset,
                            "unrecognized track type"
                        );
                    }
                }
            }
        }
        _ => {}
    }
}

/// Append the enclosing TrackEntry to its per-kind bucket on the Tracks
/// container.
fn bucket_track(tree: &mut Tree, track_entry: NodeId, kind: TrackKind) {
    let tracks = match tree.node(track_entry).parent {
        Some(tracks) if tree.node(tracks).name == "Tracks" => tracks,
        _ => return,
    };
    tree.node_mut(tracks).children.insert(kind.name(), track_entry, true);
}

/// Reapply the timecode scale to every already-cooked Duration under `info`.
fn rescale_durations(tree: &mut Tree, info: NodeId, scale: u64) {
    let durations: Vec<NodeId> = tree.get_all(info, "Duration").to_vec();
    for node in durations {
        if let Some(raw) = tree.node(node).raw {
            tree.node_mut(node).value = Value::Duration(ns_duration(raw * scale as f64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_fps_canonical() {
        // Each measured value within tolerance of a canonical rate snaps to
        // it exactly.
        assert_eq!(snap_fps(23.976), 24.0 / 1.001);
        assert_eq!(snap_fps(24.0), 24.0);
        assert_eq!(snap_fps(25.0), 25.0);
        assert_eq!(snap_fps(29.97), 30.0 / 1.001);
        assert_eq!(snap_fps(30.0), 30.0);
        assert_eq!(snap_fps(59.94), 60.0 / 1.001);
        assert_eq!(snap_fps(60.0), 60.0);
        assert_eq!(snap_fps(120.0), 120.0);
    }

    #[test]
    fn test_snap_fps_integer_fallback() {
        // 50 is not in the candidate table but is within 0.001 of itself.
        assert_eq!(snap_fps(50.0), 50.0);
        assert_eq!(snap_fps(49.9995), 50.0);
        // Far from everything: the measurement stands.
        assert_eq!(snap_fps(26.31), 26.31);
    }

    #[test]
    fn test_snap_fps_near_measurements() {
        assert_eq!(snap_fps(24.0005), 24.0);
        assert_eq!(snap_fps(23.9765), 24.0 / 1.001);
        assert_eq!(snap_fps(1e9 / 41_708_333.0), 24.0 / 1.001);
    }

    #[test]
    fn test_ns_duration_clamps() {
        assert_eq!(ns_duration(-5.0), Duration::ZERO);
        assert_eq!(ns_duration(1_500_000_000.0), Duration::from_millis(1500));
    }
}
