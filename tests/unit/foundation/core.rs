use super::*;

#[test]
fn scaled_interpolate_hits_endpoints() {
    let a = Bbox::new(0.0, 0.0, 100.0, 50.0);
    let b = Bbox::new(40.0, 20.0, 25.0, 12.5);
    assert_eq!(Bbox::scaled_interpolate(0.0, 0.0, a, 2.0, b), a);
    let end = Bbox::scaled_interpolate(2.0, 0.0, a, 2.0, b);
    assert!((end.x - b.x).abs() < 1e-9);
    assert!((end.width - b.width).abs() < 1e-9);
}

#[test]
fn scaled_interpolate_pan_is_linear() {
    let a = Bbox::new(0.0, 0.0, 10.0, 10.0);
    let b = Bbox::new(100.0, 0.0, 10.0, 10.0);
    let mid = Bbox::scaled_interpolate(0.5, 0.0, a, 1.0, b);
    assert!((mid.x - 50.0).abs() < 1e-9);
    assert_eq!(mid.width, 10.0);
}

#[test]
fn scaled_interpolate_zoom_rate_is_constant() {
    // Zooming 100 -> 25 should pass through 50 exactly halfway in time.
    let a = Bbox::new(0.0, 0.0, 100.0, 100.0);
    let b = Bbox::new(0.0, 0.0, 25.0, 25.0);
    let mid = Bbox::scaled_interpolate(0.5, 0.0, a, 1.0, b);
    assert!((mid.width - 50.0).abs() < 1e-9, "{}", mid);
}

#[test]
fn bbox_ops_scale_every_field() {
    let b = Bbox::new(2.0, 4.0, 6.0, 8.0);
    assert_eq!(b.scaled(0.5), Bbox::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(b / 2.0, Bbox::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(b + b, Bbox::new(4.0, 8.0, 12.0, 16.0));
    assert_eq!(b.center(), (5.0, 8.0));
}

#[test]
fn sentinel_frame_is_negative() {
    assert!(Frame::SENTINEL.is_sentinel());
    assert!(!Frame::new(0, Bbox::default()).is_sentinel());
}
