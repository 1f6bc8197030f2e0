//! 控制律的属性测试

use actuator_control::{ControlLaw, Gains, Reference};
use proptest::prelude::*;
use std::time::Duration;

const DT: Duration = Duration::from_millis(20);

proptest! {
    /// 任意输入下 effort 都在输出范围内
    #[test]
    fn effort_within_output_range(
        kp in -10.0..10.0f64,
        ki in -10.0..10.0f64,
        kd in -10.0..10.0f64,
        limit in 0.1..24.0f64,
        samples in proptest::collection::vec((-5000.0..5000.0f64, -5000.0..5000.0f64), 1..30),
    ) {
        let gains = Gains::new(kp, ki, kd).with_output_range(-limit, limit);
        let mut law = ControlLaw::new(gains).unwrap();
        for (reference, measurement) in samples {
            let out = law.calculate(Reference::velocity(reference), measurement, DT);
            prop_assert!(out.effort.0 >= -limit && out.effort.0 <= limit);
        }
    }

    /// 纯比例控制的 effort 与误差同号
    #[test]
    fn proportional_follows_error_sign(
        kp in 0.001..10.0f64,
        reference in -1000.0..1000.0f64,
        measurement in -1000.0..1000.0f64,
    ) {
        let mut law = ControlLaw::new(Gains::new(kp, 0.0, 0.0)).unwrap();
        let out = law.calculate(Reference::position(reference), measurement, DT);
        let error = reference - measurement;
        prop_assert!(out.effort.0 * error >= 0.0);
    }

    /// 误差始终超出积分区时积分保持为 0
    #[test]
    fn integral_stays_zero_outside_zone(
        i_zone in 0.1..10.0f64,
        errors in proptest::collection::vec(10.5..1000.0f64, 1..20),
    ) {
        let mut law = ControlLaw::new(Gains::new(0.0, 1.0, 0.0).with_i_zone(i_zone)).unwrap();
        for error in errors {
            law.calculate(Reference::velocity(error), 0.0, DT);
            prop_assert_eq!(law.integral(), 0.0);
        }
    }

    /// 第一次计算没有微分冲击
    #[test]
    fn first_derivative_is_zero(
        kd in -10.0..10.0f64,
        reference in -1000.0..1000.0f64,
    ) {
        let mut law = ControlLaw::new(Gains::new(0.0, 0.0, kd)).unwrap();
        prop_assert_eq!(law.calculate(Reference::velocity(reference), 0.0, DT).derivative, 0.0);
    }
}
