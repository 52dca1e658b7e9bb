// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Box interpolation between keyframes.
//!
//! [`interpolate`] is a pure function of a track and a frame number:
//! keyframes are returned exactly, frames outside the track's range yield
//! `None`, and frames in between are synthesized according to the track's
//! [`Interpolation`] mode.

use crate::models::track::{BBox, FrameRange, Interpolation, Keyframe, Track};
use std::ops::Bound::{Excluded, Unbounded};

/// Smallest width/height a cubic segment may produce (normalized units).
pub const MIN_TRACK_EXTENT: f64 = 1e-3;

/// Active frame range: the explicit override if set, else first/last keyframe.
pub fn track_range(track: &Track) -> Option<FrameRange> {
    if track.range_overridden {
        if let (Some(start), Some(end)) = (track.start_frame, track.end_frame) {
            return Some(FrameRange { start, end });
        }
    }
    let start = *track.keyframes.keys().next()?;
    let end = *track.keyframes.keys().next_back()?;
    Some(FrameRange { start, end })
}

/// Sorted keyframe frame numbers.
pub fn keyframe_frames(track: &Track) -> Vec<u32> {
    track.keyframes.keys().copied().collect()
}

pub fn interpolate(track: &Track, frame: u32) -> Option<BBox> {
    let keyframes = &track.keyframes;
    match keyframes.len() {
        0 => return None,
        1 => return keyframes.values().next().map(|k| k.bbox),
        _ => {}
    }
    if let Some(exact) = keyframes.get(&frame) {
        return Some(exact.bbox);
    }
    if !track_range(track)?.contains(frame) {
        return None;
    }

    // Positions come from the map keys; the stored `frame` field is not trusted.
    let prev = keyframes.range(..=frame).next_back();
    let next = keyframes.range((Excluded(frame), Unbounded)).next();
    let ((&prev_frame, prev), (&next_frame, next)) = match (prev, next) {
        (Some(p), Some(n)) => (p, n),
        // Hold the last known position.
        (Some((_, only)), None) | (None, Some((_, only))) => return Some(only.bbox),
        (None, None) => return None,
    };

    let t = (frame - prev_frame) as f64 / (next_frame - prev_frame) as f64;
    Some(match track.interpolation {
        Interpolation::Linear => lerp_box(&prev.bbox, &next.bbox, t),
        Interpolation::Constant => prev.bbox,
        Interpolation::Cubic => {
            let before = keyframes.range(..prev_frame).next_back().map_or(prev, |(_, k)| k);
            let after = keyframes.range((Excluded(next_frame), Unbounded)).next().map_or(next, |(_, k)| k);
            cubic_box(before, prev, next, after, t)
        }
    })
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_box(a: &BBox, b: &BBox, t: f64) -> BBox {
    BBox {
        x: lerp(a.x, b.x, t),
        y: lerp(a.y, b.y, t),
        width: lerp(a.width, b.width, t),
        height: lerp(a.height, b.height, t),
    }
}

/// Uniform Catmull-Rom through `p1`..`p2` with `p0`, `p3` as control points.
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

fn cubic_box(k0: &Keyframe, k1: &Keyframe, k2: &Keyframe, k3: &Keyframe, t: f64) -> BBox {
    let (b0, b1, b2, b3) = (&k0.bbox, &k1.bbox, &k2.bbox, &k3.bbox);
    BBox {
        x: catmull_rom(b0.x, b1.x, b2.x, b3.x, t),
        y: catmull_rom(b0.y, b1.y, b2.y, b3.y, t),
        width: catmull_rom(b0.width, b1.width, b2.width, b3.width, t).max(MIN_TRACK_EXTENT),
        height: catmull_rom(b0.height, b1.height, b2.height, b3.height, t).max(MIN_TRACK_EXTENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::color::Rgb;

    fn track(mode: Interpolation, keys: &[(u32, BBox)]) -> Track {
        let mut track = Track::new(1, "obj", Rgb::default(), mode);
        for &(frame, bbox) in keys {
            track.insert_keyframe(Keyframe {
                frame,
                time: frame as f64 / 30.0,
                bbox,
            });
        }
        track
    }

    fn close(a: &BBox, b: &BBox) -> bool {
        (a.x - b.x).abs() < 1e-9
            && (a.y - b.y).abs() < 1e-9
            && (a.width - b.width).abs() < 1e-9
            && (a.height - b.height).abs() < 1e-9
    }

    #[test]
    fn empty_track_has_no_box() {
        let t = track(Interpolation::Linear, &[]);
        assert_eq!(interpolate(&t, 0), None);
        assert_eq!(track_range(&t), None);
    }

    #[test]
    fn single_keyframe_holds_everywhere() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let t = track(Interpolation::Cubic, &[(10, b)]);
        assert_eq!(interpolate(&t, 0), Some(b));
        assert_eq!(interpolate(&t, 500), Some(b));
    }

    #[test]
    fn keyframes_are_exact_in_every_mode() {
        let keys = [
            (0, BBox::new(0.0, 0.0, 10.0, 10.0)),
            (7, BBox::new(13.0, 2.5, 11.0, 9.0)),
            (20, BBox::new(40.0, 1.0, 30.0, 2.0)),
            (21, BBox::new(41.0, 0.0, 29.0, 3.0)),
        ];
        for mode in [Interpolation::Linear, Interpolation::Cubic, Interpolation::Constant] {
            let t = track(mode, &keys);
            for (frame, bbox) in keys {
                assert_eq!(interpolate(&t, frame), Some(bbox));
            }
        }
    }

    #[test]
    fn linear_midpoint() {
        let t = track(
            Interpolation::Linear,
            &[(0, BBox::new(0.0, 0.0, 10.0, 10.0)), (10, BBox::new(100.0, 0.0, 10.0, 10.0))],
        );
        assert_eq!(interpolate(&t, 5).unwrap().x, 50.0);
    }

    #[test]
    fn out_of_range_is_none() {
        let t = track(
            Interpolation::Linear,
            &[(5, BBox::new(0.0, 0.0, 1.0, 1.0)), (10, BBox::new(1.0, 1.0, 1.0, 1.0))],
        );
        assert_eq!(interpolate(&t, 4), None);
        assert_eq!(interpolate(&t, 11), None);
        assert_eq!(track_range(&t), Some(FrameRange { start: 5, end: 10 }));
    }

    #[test]
    fn overridden_range_limits_output() {
        let mut t = track(
            Interpolation::Linear,
            &[(0, BBox::new(0.0, 0.0, 1.0, 1.0)), (10, BBox::new(1.0, 1.0, 1.0, 1.0))],
        );
        t.override_range(0, 4);
        assert!(interpolate(&t, 3).is_some());
        assert_eq!(interpolate(&t, 6), None);
    }

    #[test]
    fn constant_steps() {
        let a = BBox::new(0.0, 0.0, 5.0, 5.0);
        let t = track(Interpolation::Constant, &[(0, a), (10, BBox::new(9.0, 9.0, 1.0, 1.0))]);
        assert_eq!(interpolate(&t, 9), Some(a));
    }

    #[test]
    fn cubic_with_two_keys_matches_linear_midpoint() {
        let keys = [(0, BBox::new(0.1, 0.2, 0.3, 0.4)), (20, BBox::new(0.5, 0.1, 0.2, 0.6))];
        let cubic = interpolate(&track(Interpolation::Cubic, &keys), 10).unwrap();
        let linear = interpolate(&track(Interpolation::Linear, &keys), 10).unwrap();
        assert!(close(&cubic, &linear), "{:?} vs {:?}", cubic, linear);
    }

    #[test]
    fn cubic_passes_through_neighbors_smoothly() {
        let keys = [
            (0, BBox::new(0.0, 0.0, 0.1, 0.1)),
            (10, BBox::new(0.2, 0.0, 0.1, 0.1)),
            (20, BBox::new(0.4, 0.0, 0.1, 0.1)),
            (30, BBox::new(0.6, 0.0, 0.1, 0.1)),
        ];
        // Evenly spaced points lie on a straight spline.
        let b = interpolate(&track(Interpolation::Cubic, &keys), 15).unwrap();
        assert!((b.x - 0.3).abs() < 1e-9);
    }

    #[test]
    fn cubic_floors_extent() {
        let keys = [
            (0, BBox::new(0.0, 0.0, 0.5, 0.5)),
            (10, BBox::new(0.0, 0.0, 0.0, 0.0)),
            (20, BBox::new(0.0, 0.0, 0.0, 0.0)),
            (30, BBox::new(0.0, 0.0, 0.0, 0.0)),
        ];
        // The raw spline dips to -0.03125 at frame 15.
        let b = interpolate(&track(Interpolation::Cubic, &keys), 15).unwrap();
        assert_eq!(b.width, MIN_TRACK_EXTENT);
        assert!(b.height >= MIN_TRACK_EXTENT);
    }

    #[test]
    fn stray_frame_field_does_not_break_interpolation() {
        let mut t = track(Interpolation::Linear, &[(20, BBox::new(1.0, 0.0, 1.0, 1.0))]);
        t.keyframes.insert(
            2,
            Keyframe {
                frame: 9,
                time: 0.3,
                bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            },
        );
        t.recompute_range();
        for mode in [Interpolation::Linear, Interpolation::Cubic, Interpolation::Constant] {
            t.interpolation = mode;
            assert!(interpolate(&t, 5).is_some());
        }
        t.interpolation = Interpolation::Linear;
        assert!((interpolate(&t, 11).unwrap().x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn keyframe_frames_are_sorted() {
        let b = BBox::default();
        let t = track(Interpolation::Linear, &[(9, b), (2, b), (5, b)]);
        assert_eq!(keyframe_frames(&t), vec![2, 5, 9]);
    }
}
