use super::*;

#[test]
fn test_default_config_is_valid() {
  assert!(SupportConfig::default().validate().is_ok());
}

#[test]
fn test_invalid_configs_are_rejected() {
  let mut cfg = SupportConfig::default();
  cfg.head_back_radius_mm = -1.;
  assert!(matches!(cfg.validate(), Err(Error::ConfigInvalid(_))));

  let mut cfg = SupportConfig::default();
  cfg.head_front_radius_mm = cfg.head_back_radius_mm;
  assert!(cfg.validate().is_err());

  let mut cfg = SupportConfig::default();
  cfg.bridge_slope = 2.;
  assert!(cfg.validate().is_err());

  let mut cfg = SupportConfig::default();
  cfg.optimizer_max_iterations = 0;
  assert!(cfg.validate().is_err());
}

#[test]
fn test_safety_distance_scales_with_radius() {
  let cfg = SupportConfig::default();

  assert!((cfg.safety_distance(cfg.head_back_radius_mm) - cfg.safety_distance_mm).abs() < 1e-12);
  assert!(
    (cfg.safety_distance(cfg.head_back_radius_mm / 2.) - cfg.safety_distance_mm / 2.).abs()
      < 1e-12
  );
}

#[test]
fn test_support_point_text_round_trip() {
  let pts = vec![
    SupportPoint::new(Vec3::new(1.5, -2.25, 10.), 0.4),
    SupportPoint::island(Vec3::new(0., 0., 0.5), 0.2),
  ];

  let text = format_support_points(&pts);
  let parsed = parse_support_points(&text).unwrap();

  assert_eq!(parsed, pts);
}

#[test]
fn test_parse_accepts_comments_and_blank_lines() {
  let text = "# exported support points\n\n1 2 3 0.4 0\n  # trailing comment\n4 5 6 0.2 1\n";

  let parsed = parse_support_points(text).unwrap();

  assert_eq!(parsed.len(), 2);
  assert!(!parsed[0].is_new_island);
  assert!(parsed[1].is_new_island);
  assert_eq!(parsed[1].pos, Vec3::new(4., 5., 6.));
}

#[test]
fn test_parse_allows_omitted_flags() {
  let parsed = parse_support_points("1 2 3 0.4\n").unwrap();

  assert_eq!(parsed.len(), 1);
  assert!(!parsed[0].is_new_island);
}

#[test]
fn test_parse_reports_the_offending_line() {
  let err = parse_support_points("1 2 3 0.4 0\nnot a point\n").unwrap_err();

  assert_eq!(err, Error::MalformedSupportPoint(2));
}

#[test]
fn test_cancel_flag_reaches_the_controller() {
  use std::sync::atomic::{AtomicBool, Ordering};

  let flag = Arc::new(AtomicBool::new(false));
  let flag2 = Arc::clone(&flag);
  let ctl = JobController::new(|_, _, _| (), move || flag2.load(Ordering::Relaxed));

  assert!(!ctl.stop_condition());
  flag.store(true, Ordering::Relaxed);
  assert!(ctl.stop_condition());
}
