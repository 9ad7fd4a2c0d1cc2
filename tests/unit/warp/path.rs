use serde_json::json;

use super::*;

fn pan_warp(duration: f64) -> Value {
    json!({
        "snaplapse": {
            "keyframes": [
                {"time": 0.0, "duration": duration,
                 "bounds": {"xmin": 0, "ymin": 0, "xmax": 100, "ymax": 50}},
                {"time": 2.0 * duration,
                 "bounds": {"xmin": 100, "ymin": 0, "xmax": 200, "ymax": 50}}
            ]
        }
    })
}

#[test]
fn frame_range_is_inclusive() {
    let path = json!({
        "frames": {"start": 0, "end": 3, "step": 1},
        "bounds": {"xmin": 0, "ymin": 0, "width": 10, "height": 10}
    });
    let frames = parse_framelist(&path).unwrap();
    assert_eq!(frames.len(), 4);
    for (i, f) in frames.iter().enumerate() {
        assert_eq!(f.frameno, i as i64);
        assert_eq!(f.bounds, Bbox::new(0.0, 0.0, 10.0, 10.0));
    }
}

#[test]
fn ranges_and_single_frames_mix() {
    let path = json!([
        {"frame": 7.9, "bounds": {"xmin": 1, "ymin": 2, "width": 3, "height": 4}},
        {"frames": {"start": 6, "end": 0, "step": -3}, "bounds": {"xmin": 0, "ymin": 0, "width": 1, "height": 1}},
        {"frames": {"start": 0, "end": 5, "step": 2}, "bounds": {"xmin": 0, "ymin": 0, "width": 1, "height": 1}}
    ]);
    let frames: Vec<i64> = parse_framelist(&path).unwrap().iter().map(|f| f.frameno).collect();
    assert_eq!(frames, vec![7, 6, 3, 0, 0, 2, 4]);
}

#[test]
fn descriptor_without_frame_is_rejected() {
    let path = json!([{"bounds": {"xmin": 0, "ymin": 0, "width": 1, "height": 1}}]);
    assert!(matches!(parse_framelist(&path), Err(TilestackError::Usage(_))));
}

#[test]
fn step_away_from_end_is_rejected() {
    let path = json!({
        "frames": {"start": 0, "end": 3, "step": -1},
        "bounds": {"xmin": 0, "ymin": 0, "width": 1, "height": 1}
    });
    assert!(matches!(parse_framelist(&path), Err(TilestackError::Usage(_))));
}

#[test]
fn settings_defaults() {
    let s = WarpSettings::from_json(&json!({})).unwrap();
    assert_eq!(s, WarpSettings::default());
    assert_eq!(s.fps, 25.0);
    assert_eq!(s.source_fps, 10.0);
    assert!(WarpSettings::from_json(&json!({"fps": 0})).is_err());
}

#[test]
fn warp_samples_until_the_last_keyframe() {
    let settings = WarpSettings {
        fps: 2.0,
        ..WarpSettings::default()
    };
    let frames = parse_warp(&pan_warp(2.0), &settings, 100).unwrap();
    let framenos: Vec<i64> = frames.iter().map(|f| f.frameno).collect();
    assert_eq!(framenos, vec![0, 10, 20, 30, 40]);
    assert_eq!(frames[0].bounds.x, 0.0);
    assert_eq!(frames[4].bounds.x, 100.0);
    assert!((frames[2].bounds.x - 50.0).abs() < 1e-9);
}

#[test]
fn warp_frame_numbers_are_clamped_to_the_source() {
    let settings = WarpSettings {
        fps: 2.0,
        ..WarpSettings::default()
    };
    let frames = parse_warp(&pan_warp(2.0), &settings, 25).unwrap();
    assert_eq!(frames.last().unwrap().frameno, 24);
}

#[test]
fn sentinel_past_the_end() {
    let warp = Warp::from_json(&pan_warp(2.0), &WarpSettings::default()).unwrap();
    assert!(warp.compute_frame(2.01, 10.0, 0.0).unwrap().is_sentinel());
    assert!(!warp.compute_frame(2.0, 10.0, 0.0).unwrap().is_sentinel());
    assert_eq!(warp.total_duration().unwrap(), 2.0);
}

#[test]
fn smoothing_leaves_the_ends_untouched() {
    let warp = Warp::from_json(&pan_warp(10.0), &WarpSettings::default()).unwrap();
    let start = warp.compute_frame(0.0, 10.0, 1.0).unwrap();
    assert_eq!(start.bounds.x, 0.0);
    let end = warp.compute_frame(10.0, 10.0, 1.0).unwrap();
    assert_eq!(end.bounds.x, 100.0);
    let mid = warp.compute_frame(5.0, 10.0, 1.0).unwrap();
    assert!((mid.bounds.x - 50.0).abs() < 1e-9);
}

#[test]
fn single_keyframe_is_not_a_warp() {
    let v = json!({"timewarp": {"keyframes": [
        {"time": 0.0, "bounds": {"xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1}}
    ]}});
    assert!(matches!(
        Warp::from_json(&v, &WarpSettings::default()),
        Err(TilestackError::Usage(_))
    ));
}

#[test]
fn plain_lists_pass_through_parse_warp() {
    let path = json!([{"frame": 3, "bounds": {"xmin": 0, "ymin": 0, "width": 1, "height": 1}}]);
    let frames = parse_warp(&path, &WarpSettings::default(), 1).unwrap();
    assert_eq!(frames[0].frameno, 3);
}
