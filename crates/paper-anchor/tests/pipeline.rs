use nalgebra::{Point2, Point3, Rotation3, UnitQuaternion, Vector3};
use paper_anchor::aruco::builtins::DICT_4X4_50;
use paper_anchor::board::{render_board_view, BoardLayout, BoardPainter, MarkerRoleMap, PAPER};
use paper_anchor::core::{CameraIntrinsics, CameraPose, EyePose, Frame, GrayImage, PixelFormat};
use paper_anchor::pose::CoordinateTransformer;
use paper_anchor::{AnchorConfig, AnchorMode, FailureKind, PaperAnchor, TickOutput};

fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480)
}

fn centered_pose(rotation: Rotation3<f64>, distance: f64) -> CameraPose {
    let c = BoardLayout::default().center();
    CameraPose::new(rotation, Vector3::new(0.0, 0.0, distance) - rotation * c.coords)
}

fn render(pose: &CameraPose) -> GrayImage {
    let layout = BoardLayout::default();
    let map = MarkerRoleMap::DEFAULT;
    let painter = BoardPainter::new(&layout, &map, &DICT_4X4_50);
    render_board_view(&painter, &intrinsics(), pose, 230).expect("render")
}

fn eye() -> EyePose {
    EyePose::new(
        Point3::new(0.2, 1.5, -0.3),
        UnitQuaternion::from_euler_angles(0.0, 0.3, 0.0),
    )
}

#[test]
fn tilted_page_yields_world_pose() {
    let truth = centered_pose(
        Rotation3::from_euler_angles(15f64.to_radians(), 10f64.to_radians(), -5f64.to_radians()),
        0.4,
    );
    let frame = Frame::from(render(&truth));
    let anchor = PaperAnchor::new(AnchorConfig::default()).expect("anchor");

    let TickOutput::Pose(world) = anchor.tick(&frame.view(), &eye()).expect("tick") else {
        panic!("pose mode must return a pose");
    };
    let expected = CoordinateTransformer::default().to_world(&truth, &eye());
    let dp = (world.position - expected.position).norm();
    assert!(dp < 0.01, "position off by {dp} m");
    let da = world.orientation.angle_to(&expected.orientation);
    assert!(da < 2f64.to_radians(), "orientation off by {da} rad");
}

#[test]
fn in_plane_turned_page_yields_world_pose() {
    let anchor = PaperAnchor::new(AnchorConfig::default()).expect("anchor");
    for degrees in [90.0f64, 180.0, 270.0] {
        let truth = centered_pose(
            Rotation3::from_axis_angle(&Vector3::z_axis(), degrees.to_radians()),
            0.35,
        );
        let frame = Frame::from(render(&truth));

        let TickOutput::Pose(world) = anchor.tick(&frame.view(), &eye()).expect("tick") else {
            panic!("pose mode must return a pose");
        };
        let expected = CoordinateTransformer::default().to_world(&truth, &eye());
        let dp = (world.position - expected.position).norm();
        assert!(dp < 0.01, "{degrees} deg: position off by {dp} m");
        let da = world.orientation.angle_to(&expected.orientation);
        assert!(da < 2f64.to_radians(), "{degrees} deg: orientation off by {da} rad");
    }
}

#[test]
fn poor_fit_is_rejected_but_reported() {
    let truth = centered_pose(Rotation3::identity(), 0.35);
    let frame = Frame::from(render(&truth));
    let cfg = AnchorConfig {
        max_rms_px: 1e-9,
        ..AnchorConfig::default()
    };
    let anchor = PaperAnchor::new(cfg).expect("anchor");

    let err = anchor.tick(&frame.view(), &eye()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::DegenerateGeometry);

    let (report, result) = anchor.tick_report(&frame.view(), &eye());
    assert!(result.is_err());
    assert!(!report.is_success());
    assert!(report.rms_px.expect("rms") > 1e-9);
    assert!(report.camera_pose.is_some());
    assert!(report.world_pose.is_none());
}

#[test]
fn report_records_every_stage() {
    let truth = centered_pose(Rotation3::identity(), 0.35);
    let frame = Frame::from(render(&truth));
    let anchor = PaperAnchor::new(AnchorConfig::default()).expect("anchor");

    let (report, result) = anchor.tick_report(&frame.view(), &eye());
    assert!(result.is_ok());
    assert!(report.is_success());
    assert_eq!(report.observations.len(), 4);
    assert!(report.quadrilateral.is_some());
    let camera = report.camera_pose.expect("camera pose");
    assert!((camera.translation - truth.translation).norm() < 0.01);
    assert!(report.rms_px.expect("rms") < 1.5);
    assert!(report.world_pose.is_some());
}

#[test]
fn hidden_marker_gives_no_update() {
    let truth = centered_pose(Rotation3::identity(), 0.35);
    let mut img = render(&truth);
    // Cover the bottom-left marker (id 3) generously.
    let k = intrinsics();
    let side = BoardLayout::default().board_side;
    let a = k
        .project(&truth.transform_point(&Point3::new(-0.005, side - 0.055, 0.0)))
        .expect("in front");
    let b = k
        .project(&truth.transform_point(&Point3::new(0.055, side + 0.005, 0.0)))
        .expect("in front");
    for y in a.y as usize..=b.y as usize {
        for x in a.x as usize..=b.x as usize {
            img.data[y * img.width + x] = PAPER;
        }
    }

    let anchor = PaperAnchor::new(AnchorConfig::default()).expect("anchor");
    let frame = Frame::from(img);
    let err = anchor.tick(&frame.view(), &eye()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::DetectionFailure);

    let (report, _) = anchor.tick_report(&frame.view(), &eye());
    assert!(report.error.is_some());
    assert!(report.world_pose.is_none());
}

#[test]
fn invalid_intrinsics_are_reported_per_tick() {
    let truth = centered_pose(Rotation3::identity(), 0.35);
    let frame = Frame::from(render(&truth));
    let mut anchor = PaperAnchor::new(AnchorConfig::default()).expect("anchor");
    anchor.set_intrinsics(CameraIntrinsics {
        fx: -1.0,
        ..intrinsics()
    });
    let err = anchor.tick(&frame.view(), &eye()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidIntrinsics);
}

#[test]
fn project_mode_warps_reference_onto_page() {
    let truth = centered_pose(Rotation3::identity(), 0.35);
    let frame = Frame::from(render(&truth));
    let cfg = AnchorConfig {
        mode: AnchorMode::Project,
        ..AnchorConfig::default()
    };
    let mut anchor = PaperAnchor::new(cfg).expect("anchor");

    let err = anchor.tick(&frame.view(), &eye()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidInput);

    anchor.set_reference(Frame::filled(100, 80, PixelFormat::Rgb8, 180).expect("reference"));
    let TickOutput::Image(out) = anchor.tick(&frame.view(), &eye()).expect("tick") else {
        panic!("project mode must return an image");
    };
    assert_eq!((out.width, out.height, out.format), (640, 480, PixelFormat::Rgb8));
    // Page center lands on the principal point; the frame corner is off the page.
    assert_eq!(out.pixel(320, 240), &[180, 180, 180]);
    assert_eq!(out.pixel(5, 5), &[0, 0, 0]);

    let (report, _) = anchor.tick_report(&frame.view(), &eye());
    let h = report.homography.expect("homography");
    let quad = report.quadrilateral.expect("quad");
    let mapped = h.apply(Point2::new(100.0, 80.0));
    assert!((mapped - quad[2]).norm() < 1e-6);
}
