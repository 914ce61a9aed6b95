use nalgebra::{Point2, Point3, Rotation3, Vector3};
use paper_anchor_aruco::builtins::DICT_4X4_50;
use paper_anchor_board::{
    render_board_view, BoardLayout, BoardPainter, Corner, DetectionFailure, MarkerDetector,
    MarkerDetectorParams, MarkerRoleMap, PAPER,
};
use paper_anchor_core::{CameraIntrinsics, CameraPose, Frame, FrameView, GrayImage, PixelFormat};

fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480)
}

/// Pose that keeps the board center on the optical axis at `distance`.
fn centered_pose(layout: &BoardLayout, rotation: Rotation3<f64>, distance: f64) -> CameraPose {
    let c = layout.center();
    let t = Vector3::new(0.0, 0.0, distance) - rotation * c.coords;
    CameraPose::new(rotation, t)
}

fn render(layout: &BoardLayout, pose: &CameraPose) -> GrayImage {
    let map = MarkerRoleMap::DEFAULT;
    let painter = BoardPainter::new(layout, &map, &DICT_4X4_50);
    render_board_view(&painter, &intrinsics(), pose, 235).expect("render")
}

fn detector() -> MarkerDetector {
    MarkerDetector::new(MarkerDetectorParams::default(), MarkerRoleMap::DEFAULT).expect("detector")
}

fn assert_quad_matches_projection(frame: &FrameView<'_>, layout: &BoardLayout, pose: &CameraPose) {
    let quad = detector().detect(frame).expect("board detected");
    let k = intrinsics();
    for slot in Corner::ALL {
        let expected = k
            .project(&pose.transform_point(&layout.object_point(slot)))
            .expect("in front");
        let got = quad.corner(slot);
        assert!(
            (got - expected).norm() < 2.0,
            "{slot:?}: got {got:?}, expected {expected:?}"
        );
    }
}

#[test]
fn fronto_parallel_board_is_detected() {
    let layout = BoardLayout::default();
    let pose = centered_pose(&layout, Rotation3::identity(), 0.35);
    let img = render(&layout, &pose);
    let frame = Frame::from(img);
    assert_quad_matches_projection(&frame.view(), &layout, &pose);
}

#[test]
fn tilted_board_is_detected() {
    let layout = BoardLayout::default();
    let rotation = Rotation3::from_euler_angles(
        20f64.to_radians(),
        -10f64.to_radians(),
        5f64.to_radians(),
    );
    let pose = centered_pose(&layout, rotation, 0.4);
    let img = render(&layout, &pose);
    assert_quad_matches_projection(&Frame::from(img).view(), &layout, &pose);
}

#[test]
fn rgb_frames_are_accepted() {
    let layout = BoardLayout::default();
    let pose = centered_pose(&layout, Rotation3::identity(), 0.35);
    let img = render(&layout, &pose);
    let rgb: Vec<u8> = img.data.iter().flat_map(|&v| [v, v, v]).collect();
    let frame = Frame::new(img.width, img.height, PixelFormat::Rgb8, rgb).expect("frame");
    assert_quad_matches_projection(&frame.view(), &layout, &pose);
}

#[test]
fn covered_marker_fails_detection() {
    let layout = BoardLayout::default();
    let pose = centered_pose(&layout, Rotation3::identity(), 0.35);
    let mut img = render(&layout, &pose);

    // Paint over the top-right marker (id 1).
    let k = intrinsics();
    let o = layout.marker_origin(Corner::TopRight);
    let m = layout.marker_size;
    let pts: Vec<Point2<f64>> = [(0.0, 0.0), (m, 0.0), (m, m), (0.0, m)]
        .iter()
        .map(|&(dx, dy)| {
            k.project(&pose.transform_point(&Point3::new(o.x + dx, o.y + dy, 0.0)))
                .expect("in front")
        })
        .collect();
    let x0 = pts.iter().map(|p| p.x).fold(f64::INFINITY, f64::min) as usize - 3;
    let x1 = pts.iter().map(|p| p.x).fold(0.0, f64::max) as usize + 3;
    let y0 = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min) as usize - 3;
    let y1 = pts.iter().map(|p| p.y).fold(0.0, f64::max) as usize + 3;
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.data[y * img.width + x] = PAPER;
        }
    }

    let detection = detector().detect_with_observations(&Frame::from(img).view());
    let mut ids: Vec<u32> = detection.observations.iter().map(|o| o.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 2, 3]);
    match detection.quadrilateral {
        Err(DetectionFailure::MissingIds { missing, .. }) => assert_eq!(missing, vec![1]),
        other => panic!("expected missing id 1, got {other:?}"),
    }
}
