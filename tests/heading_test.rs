mod fakes;

use approx::assert_abs_diff_eq;
use std::f64::consts::PI;

use fakes::{FakeProvider, FixedModel, Harness, LongitudeModel, fix, heading_samples};
use geofuse::config::DisplayRotation;
use geofuse::location::{LocationFix, ProviderKind};

const EPS: f64 = 1e-3;

#[test]
fn test_no_reading_until_both_sensors_report() {
    let h = Harness::new(ProviderKind::Native);
    let (listener, _handle) = h.subscribe();

    let [accel, mag] = heading_samples(30.0, 1);
    assert!(h.coordinator.submit_sensor_sample(accel).is_none());
    assert!(h.coordinator.submit_sensor_sample(accel).is_none());
    assert!(h.coordinator.submit_sensor_sample(mag).is_some());
    assert_eq!(listener.readings().len(), 1);
}

#[test]
fn test_without_declination_true_equals_magnetic() {
    let h = Harness::new(ProviderKind::Native);
    let (_listener, _handle) = h.subscribe();

    let reading = h.feed_heading(30.0, 1).unwrap();
    assert_abs_diff_eq!(reading.magnetic_heading, 30f64.to_radians(), epsilon = EPS);
    assert_eq!(reading.true_heading, reading.magnetic_heading);
    assert_eq!(reading.declination, 0.0);
}

#[test]
fn test_declination_applied_to_true_heading() {
    let h = Harness::with(
        FakeProvider::new(ProviderKind::Native),
        Box::new(FixedModel(10.0)),
    );
    let (_listener, _handle) = h.subscribe();
    assert!(h.submit(fix("gps", 5.0, 0)));

    let reading = h.feed_heading(30.0, 1).unwrap();
    assert_abs_diff_eq!(reading.magnetic_heading, 30f64.to_radians(), epsilon = EPS);
    assert_abs_diff_eq!(reading.true_heading, 40f64.to_radians(), epsilon = EPS);
    assert_abs_diff_eq!(reading.declination, 10f64.to_radians(), epsilon = 1e-12);
}

#[test]
fn test_heading_wraps_into_range() {
    let h = Harness::with(
        FakeProvider::new(ProviderKind::Native),
        Box::new(FixedModel(-20.0)),
    );
    let (_listener, _handle) = h.subscribe();
    assert!(h.submit(fix("gps", 5.0, 0)));

    let reading = h.feed_heading(10.0, 1).unwrap();
    assert_abs_diff_eq!(reading.true_heading, 350f64.to_radians(), epsilon = EPS);
    assert!(reading.true_heading < 2.0 * PI);
}

#[test]
fn test_small_heading_changes_suppressed() {
    let h = Harness::new(ProviderKind::Native);
    let (listener, _handle) = h.subscribe();

    assert!(h.feed_heading(10.0, 1).is_some());
    assert!(h.feed_heading(11.0, 2).is_none());
    assert!(h.feed_heading(12.5, 3).is_none());
    // Measured against the last emitted heading, not the last computed one
    assert!(h.feed_heading(14.0, 4).is_some());

    let headings: Vec<f64> = listener
        .readings()
        .iter()
        .map(|r| r.magnetic_heading.to_degrees())
        .collect();
    assert_eq!(headings.len(), 2);
    assert_abs_diff_eq!(headings[0], 10.0, epsilon = 0.05);
    assert_abs_diff_eq!(headings[1], 14.0, epsilon = 0.05);
}

#[test]
fn test_noise_floor_does_not_wrap_at_north() {
    let h = Harness::new(ProviderKind::Native);
    let (_listener, _handle) = h.subscribe();

    assert!(h.feed_heading(359.0, 1).is_some());
    // Two degrees apart across north, but far apart numerically
    assert!(h.feed_heading(1.0, 2).is_some());
}

#[test]
fn test_travel_heading_overrides_compass() {
    let h = Harness::with(
        FakeProvider::new(ProviderKind::Native),
        Box::new(FixedModel(10.0)),
    );
    let (listener, _handle) = h.subscribe();

    let moving = fix("gps", 5.0, 0).with_speed(8.0).with_bearing(90.0);
    assert!(h.submit(moving));
    assert_abs_diff_eq!(
        h.coordinator.heading_state().travel_heading.unwrap(),
        PI / 2.0,
        epsilon = 1e-12
    );

    let reading = h.feed_heading(200.0, 1).unwrap();
    assert_abs_diff_eq!(reading.magnetic_heading, PI / 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(reading.true_heading, PI / 2.0, epsilon = 1e-12);
    assert_eq!(reading.declination, 0.0);

    // Not subject to the noise floor: every sample produces a reading
    let before = listener.readings().len();
    h.feed_heading(200.0, 2);
    assert_eq!(listener.readings().len(), before + 2);

    // Slowing down hands control back to the compass
    let slow = fix("gps", 4.0, 1).with_speed(0.5).with_bearing(90.0);
    assert!(h.submit(slow));
    assert!(h.coordinator.heading_state().travel_heading.is_none());

    h.feed_heading(200.0, 3);
    let reading = *listener.readings().last().unwrap();
    assert_abs_diff_eq!(reading.magnetic_heading, 200f64.to_radians(), epsilon = EPS);
    assert_abs_diff_eq!(reading.true_heading, 210f64.to_radians(), epsilon = EPS);
}

#[test]
fn test_travel_heading_needs_bearing() {
    let h = Harness::new(ProviderKind::Native);
    let (_listener, _handle) = h.subscribe();

    assert!(h.submit(fix("gps", 5.0, 0).with_speed(20.0)));
    assert!(h.coordinator.heading_state().travel_heading.is_none());
}

#[test]
fn test_declination_rebuilt_only_after_moving_far() {
    let h = Harness::with(
        FakeProvider::new(ProviderKind::Native),
        Box::new(LongitudeModel),
    );
    let (_listener, _handle) = h.subscribe();
    assert!(h.coordinator.declination().is_none());

    let at = |lon: f64, secs: i64| {
        let base = fix("gps", 5.0, secs);
        LocationFix {
            latitude: 0.0,
            longitude: lon,
            ..base
        }
    };
    // One degree of longitude at the equator
    let metres_per_degree = 111_194.93;

    assert!(h.submit(at(0.0, 0)));
    assert_abs_diff_eq!(h.coordinator.declination().unwrap(), 0.0, epsilon = 1e-12);

    let near = 900.0 / metres_per_degree;
    assert!(h.submit(at(near, 10)));
    assert_abs_diff_eq!(h.coordinator.declination().unwrap(), 0.0, epsilon = 1e-12);

    // Distance is measured from the fix the model was built from
    let far = 1100.0 / metres_per_degree;
    assert!(h.submit(at(far, 20)));
    assert_abs_diff_eq!(
        h.coordinator.declination().unwrap(),
        far.to_radians(),
        epsilon = 1e-12
    );
}

#[test]
fn test_declination_reset_on_stop() {
    let h = Harness::with(
        FakeProvider::new(ProviderKind::Native),
        Box::new(FixedModel(5.0)),
    );
    let (_listener, handle) = h.subscribe();
    assert!(h.submit(fix("gps", 5.0, 0)));
    assert!(h.coordinator.declination().is_some());

    h.coordinator.stop_updates(&handle);
    assert!(h.coordinator.declination().is_none());
    assert!(h.coordinator.heading_state().magnetic_heading.is_none());
}

#[test]
fn test_sensor_samples_through_source_callback() {
    let h = Harness::new(ProviderKind::Native);
    let (listener, _handle) = h.subscribe();

    for sample in heading_samples(45.0, 1) {
        h.sensors.emit(sample);
    }
    assert_eq!(listener.readings().len(), 1);
}

#[test]
fn test_display_orientation_correction() {
    let h = Harness::new(ProviderKind::Native);
    let (_listener, _handle) = h.subscribe();

    let mut angles = [0.5, -1.0, PI];
    h.coordinator
        .correct_for_display_orientation(&mut angles, DisplayRotation::Rotation90);
    assert_abs_diff_eq!(angles[0], 0.5 + PI / 2.0, epsilon = 1e-12);
    assert_eq!(angles[1], -1.0);
    assert_abs_diff_eq!(angles[2], 3.0 * PI / 2.0, epsilon = 1e-12);
}

#[test]
fn test_display_correction_skipped_while_travelling() {
    let h = Harness::new(ProviderKind::Native);
    let (_listener, _handle) = h.subscribe();
    assert!(h.submit(fix("gps", 5.0, 0).with_speed(3.0).with_bearing(45.0)));

    let mut angles = [1.0, 2.0];
    h.coordinator
        .correct_for_display_orientation(&mut angles, DisplayRotation::Rotation180);
    assert_eq!(angles, [1.0, 2.0]);
}
