//! Property tests for the pure pieces of the control path.

use proptest::prelude::*;

use dcm_common::consts::{CURRENT_REF_LIMIT_MA, EFFORT_LIMIT, FULL_DUTY, MAX_TRAJ_LEN};
use dcm_control_unit::actuator::{map_effort, pwm_reference_from_percent, saturate_effort};
use dcm_control_unit::context::ControlContext;
use dcm_control_unit::control::motion::MotionLoop;
use dcm_control_unit::hal::mock::{MockAdc, MockEncoder};
use dcm_control_unit::sensor::{CurrentSensor, counts_to_degrees, raw_to_milliamps};

proptest! {
    #[test]
    fn setpoint_is_always_clamped(ma in any::<i32>()) {
        let ctx = ControlContext::default();
        let stored = ctx.set_current_reference(ma);
        prop_assert!(stored.abs() <= CURRENT_REF_LIMIT_MA);
        prop_assert_eq!(stored, ctx.current_reference());
        if ma.abs() <= CURRENT_REF_LIMIT_MA {
            prop_assert_eq!(stored, ma);
        }
    }

    #[test]
    fn saturation_bounds_effort(u in any::<i32>()) {
        let s = saturate_effort(u);
        prop_assert!((-EFFORT_LIMIT..=EFFORT_LIMIT).contains(&s));
        if (-EFFORT_LIMIT..=EFFORT_LIMIT).contains(&u) {
            prop_assert_eq!(s, u);
        }
    }

    #[test]
    fn duty_pair_drives_the_effort(v in -FULL_DUTY..=FULL_DUTY) {
        let pair = map_effort(v);
        prop_assert_eq!(pair.differential(), v);
        prop_assert!(i32::from(pair.leg_a) <= FULL_DUTY);
        prop_assert!(i32::from(pair.leg_b) <= FULL_DUTY);
    }

    #[test]
    fn duty_pair_is_antisymmetric(v in 1..=FULL_DUTY) {
        let fwd = map_effort(v);
        let rev = map_effort(-v);
        prop_assert_eq!((fwd.leg_a, fwd.leg_b), (rev.leg_b, rev.leg_a));
    }

    #[test]
    fn out_of_range_effort_maps_like_the_limit(v in any::<i32>()) {
        let clamped = v.clamp(-FULL_DUTY, FULL_DUTY);
        prop_assert_eq!(map_effort(v), map_effort(clamped));
    }

    #[test]
    fn pwm_percent_stays_in_range(p in -100i32..=100) {
        let effort = pwm_reference_from_percent(p);
        prop_assert!(effort.abs() <= FULL_DUTY);
        prop_assert_eq!(effort.signum(), p.signum());
    }

    #[test]
    fn constant_adc_averages_to_itself(code in 0u16..1024) {
        let mut sensor = CurrentSensor::new(MockAdc::constant(code));
        prop_assert_eq!(sensor.read_current_raw(), code);
        prop_assert_eq!(sensor.current_amps_get(), raw_to_milliamps(code));
    }

    #[test]
    fn degrees_are_monotonic(a in any::<u16>(), b in any::<u16>()) {
        if a <= b {
            prop_assert!(counts_to_degrees(a) <= counts_to_degrees(b));
        }
    }

    #[test]
    fn trajectory_writes_respect_capacity(
        index in 0usize..2 * MAX_TRAJ_LEN,
        angle in -720i32..720,
    ) {
        let mut motion = MotionLoop::new(MockEncoder::new(0));
        let result = motion.trajectory_set(angle, index);
        if index < MAX_TRAJ_LEN {
            prop_assert!(result.is_ok());
            prop_assert_eq!(motion.trajectory().len(), index + 1);
            prop_assert_eq!(motion.trajectory().get(index), Some(angle));
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(motion.trajectory().len(), 0);
        }
    }
}
