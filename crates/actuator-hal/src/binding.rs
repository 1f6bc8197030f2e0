//! 硬件绑定契约

use crate::error::HalError;
use actuator_control::{Gains, Reference};
use actuator_plant::{Amps, DcMotor, Deg, Volts};

/// 电机控制器端口级接口
///
/// 实现可以是真实的 CAN/PWM 控制器，也可以是仿真或 mock。
/// 所有可选能力都有返回 [`HalError::Unsupported`] 的默认实现，
/// 实现者只覆盖自己真正支持的部分。
///
/// # 单位
///
/// - 位置：度（绝对编码器读数，0..360 或累积角度由实现决定）
/// - 速度：RPM
pub trait MotorBinding: Send {
    /// 用于日志与错误信息的名字，例如 `"sim#3"`
    fn name(&self) -> &str;

    /// 端口号 / CAN ID
    fn port(&self) -> u32;

    /// 写入占空比
    ///
    /// 超出 [-1, 1] 的值被钳位，NaN 返回 [`HalError::InvalidInput`]。
    fn set_duty_cycle(&mut self, duty: f64) -> Result<(), HalError>;

    /// 最近一次写入的占空比
    fn duty_cycle(&self) -> f64;

    /// 编码器位置（度）
    fn position(&self) -> Deg;

    /// 编码器速度（RPM）
    fn velocity(&self) -> f64;

    /// 控制器输入端电压
    fn bus_voltage(&self) -> Volts {
        Volts(12.0)
    }

    /// 所驱动的电机参数
    fn motor(&self) -> Result<DcMotor, HalError> {
        Err(HalError::unsupported("motor constants", self.name()))
    }

    /// 控制器内置闭环
    fn native_closed_loop(&mut self) -> Result<&mut dyn NativeClosedLoop, HalError> {
        Err(HalError::unsupported("native closed loop", self.name()))
    }

    /// 电流限制
    fn set_current_limit(&mut self, limit: Amps) -> Result<(), HalError> {
        let _ = limit;
        Err(HalError::unsupported("current limit", self.name()))
    }

    /// 输出反向
    fn set_inverted(&mut self, inverted: bool) -> Result<(), HalError>;

    fn is_inverted(&self) -> bool;

    /// 跟随另一个端口的输出
    fn follow(&mut self, leader_port: u32, inverted: bool) -> Result<(), HalError> {
        let _ = (leader_port, inverted);
        Err(HalError::unsupported("follower linkage", self.name()))
    }

    /// 绝对编码器零点偏移
    fn set_encoder_offset(&mut self, offset: Deg) -> Result<(), HalError> {
        let _ = offset;
        Err(HalError::unsupported("encoder offset", self.name()))
    }

    /// 停止输出
    fn stop(&mut self) -> Result<(), HalError> {
        self.set_duty_cycle(0.0)
    }
}

/// 控制器内置闭环（增益寄存器透传）
pub trait NativeClosedLoop {
    /// 写入 PID 增益寄存器
    fn write_gains(&mut self, gains: &Gains) -> Result<(), HalError>;

    /// 设置闭环参考值，附带由上层计算的前馈（V）
    fn set_reference(&mut self, reference: Reference, feedforward: f64) -> Result<(), HalError>;
}

/// 检查并钳位占空比
pub(crate) fn sanitize_duty(name: &str, duty: f64) -> Result<f64, HalError> {
    if duty.is_nan() {
        return Err(HalError::InvalidInput(format!("NaN duty cycle for {}", name)));
    }
    Ok(duty.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 只实现必需方法的最小绑定
    struct Bare {
        duty: f64,
    }

    impl MotorBinding for Bare {
        fn name(&self) -> &str {
            "bare#9"
        }
        fn port(&self) -> u32 {
            9
        }
        fn set_duty_cycle(&mut self, duty: f64) -> Result<(), HalError> {
            self.duty = sanitize_duty(self.name(), duty)?;
            Ok(())
        }
        fn duty_cycle(&self) -> f64 {
            self.duty
        }
        fn position(&self) -> Deg {
            Deg::ZERO
        }
        fn velocity(&self) -> f64 {
            0.0
        }
        fn set_inverted(&mut self, _inverted: bool) -> Result<(), HalError> {
            Ok(())
        }
        fn is_inverted(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_optional_capabilities_are_unsupported() {
        let mut bare = Bare { duty: 0.0 };
        assert!(matches!(
            bare.native_closed_loop(),
            Err(HalError::Unsupported { capability: "native closed loop", .. })
        ));
        assert!(matches!(bare.motor(), Err(HalError::Unsupported { .. })));
        assert!(matches!(bare.set_current_limit(Amps(40.0)), Err(HalError::Unsupported { .. })));
        assert!(matches!(bare.follow(1, false), Err(HalError::Unsupported { .. })));
        assert!(matches!(
            bare.set_encoder_offset(Deg(10.0)),
            Err(HalError::Unsupported { .. })
        ));
        assert_eq!(bare.bus_voltage(), Volts(12.0));
    }

    #[test]
    fn test_duty_is_clamped() {
        let mut bare = Bare { duty: 0.0 };
        bare.set_duty_cycle(3.0).unwrap();
        assert_eq!(bare.duty_cycle(), 1.0);
        bare.set_duty_cycle(-3.0).unwrap();
        assert_eq!(bare.duty_cycle(), -1.0);
        assert!(bare.set_duty_cycle(f64::NAN).is_err());
        bare.stop().unwrap();
        assert_eq!(bare.duty_cycle(), 0.0);
    }
}
