use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Rotation3, Vector3};
use paper_anchor_core::{CameraIntrinsics, CameraPose, IntrinsicsError};
use paper_anchor_pose::{flip_vertical_axis, PlanarPoseEstimator, PoseError};

/// Inner marker corners of a letter-width page with 5 cm markers.
fn page_points() -> [Point3<f64>; 4] {
    [
        Point3::new(0.05, 0.05, 0.0),
        Point3::new(0.1659, 0.05, 0.0),
        Point3::new(0.1659, 0.1659, 0.0),
        Point3::new(0.05, 0.1659, 0.0),
    ]
}

fn project(pose: &CameraPose, k: &CameraIntrinsics) -> [Point2<f64>; 4] {
    page_points().map(|p| k.project(&pose.transform_point(&p)).expect("in front"))
}

#[test]
fn page_straight_below_camera() {
    // The estimator does not bound-check pixels: the first pose puts the
    // corners below the 480-row frame, the second centers the page in it.
    let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 320.0, 640, 480);
    for t in [Vector3::new(0.0, 0.0, 0.3), Vector3::new(-0.108, -0.108, 0.3)] {
        let truth = CameraPose::new(Rotation3::identity(), t);
        let image = project(&truth, &k);

        let est = PlanarPoseEstimator::default()
            .estimate(&image, &page_points(), &k)
            .expect("pose");
        assert!(est.converged);
        assert!((est.translation() - t).norm() < 1e-3);
        assert!(est.rotation().angle() < 0.5f64.to_radians());

        let center = est.pose.transform_point(&Point3::new(0.10795, 0.10795, 0.0));
        let expected = Point3::from(t + Vector3::new(0.10795, 0.10795, 0.0));
        assert_relative_eq!(center, expected, epsilon = 1e-3);

        let (r, flipped) = flip_vertical_axis(est.rotation(), est.translation());
        assert!((flipped - Vector3::new(t.x, -t.y, t.z)).norm() < 1e-3);
        assert!(r.angle() < 0.5f64.to_radians());
    }

    let centered = project(
        &CameraPose::new(Rotation3::identity(), Vector3::new(-0.108, -0.108, 0.3)),
        &k,
    );
    assert!(centered
        .iter()
        .all(|p| (0.0..640.0).contains(&p.x) && (0.0..480.0).contains(&p.y)));
}

#[test]
fn exact_correspondences_recover_varied_poses() {
    let k = CameraIntrinsics::new(620.0, 610.0, 330.0, 235.0, 640, 480);
    let poses = [
        ((0.0, 0.0, 0.0), (-0.1, -0.1, 0.4)),
        ((0.4, 0.0, 0.0), (-0.1, -0.05, 0.5)),
        ((0.0, -0.5, 0.2), (-0.08, -0.1, 0.45)),
        ((-0.3, 0.25, -1.2), (-0.02, 0.05, 0.6)),
        ((0.2, 0.3, 2.8), (0.1, 0.08, 0.55)),
    ];
    let estimator = PlanarPoseEstimator::default();
    for ((rx, ry, rz), (tx, ty, tz)) in poses {
        let truth = CameraPose::new(
            Rotation3::from_euler_angles(rx, ry, rz),
            Vector3::new(tx, ty, tz),
        );
        let est = estimator
            .estimate(&project(&truth, &k), &page_points(), &k)
            .expect("pose");
        assert!(est.rms_px < 1e-6, "rms {}", est.rms_px);
        assert_relative_eq!(*est.translation(), truth.translation, epsilon = 1e-6);
        assert!(est.pose.rotation_angle_to(&truth) < 1e-6);
    }
}

#[test]
fn collinear_points_are_degenerate() {
    let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480);
    let image = [
        Point2::new(100.0, 100.0),
        Point2::new(200.0, 200.0),
        Point2::new(300.0, 300.0),
        Point2::new(400.0, 400.0),
    ];
    let err = PlanarPoseEstimator::default()
        .estimate(&image, &page_points(), &k)
        .unwrap_err();
    assert!(matches!(err, PoseError::DegenerateGeometry(_)));

    let line = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.1, 0.0, 0.0),
        Point3::new(0.2, 0.0, 0.0),
        Point3::new(0.3, 0.0, 0.0),
    ];
    let image = [
        Point2::new(100.0, 100.0),
        Point2::new(200.0, 100.0),
        Point2::new(200.0, 200.0),
        Point2::new(100.0, 200.0),
    ];
    let err = PlanarPoseEstimator::default()
        .estimate(&image, &line, &k)
        .unwrap_err();
    assert!(matches!(err, PoseError::DegenerateGeometry(_)));
}

#[test]
fn invalid_inputs_are_rejected() {
    let good = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480);
    let image = project(
        &CameraPose::new(Rotation3::identity(), Vector3::new(-0.1, -0.1, 0.4)),
        &good,
    );
    let estimator = PlanarPoseEstimator::default();

    let zero_focal = CameraIntrinsics { fx: 0.0, ..good };
    assert!(matches!(
        estimator.estimate(&image, &page_points(), &zero_focal),
        Err(PoseError::InvalidIntrinsics(
            IntrinsicsError::NonPositiveFocalLength { .. }
        ))
    ));

    let mut lifted = page_points();
    lifted[2].z = 0.01;
    assert!(matches!(
        estimator.estimate(&image, &lifted, &good),
        Err(PoseError::NotPlanar { .. })
    ));

    let mut nan = image;
    nan[1].y = f64::NAN;
    assert_eq!(
        estimator.estimate(&nan, &page_points(), &good),
        Err(PoseError::NonFinite)
    );
}
