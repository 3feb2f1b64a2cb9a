//! Motor position controller: PD with an optional integral term.
//!
//! Positioning joints run pure PD. Tool joints add a small integral so they
//! hold position against cable friction; that integral is clamped via
//! back-calculation (Tt) and is cleared whenever homing restarts.
//!
//! Zero Ki disables the integral.

use raven_common::consts::MAX_DOF_PER_MECH;
use raven_common::joint::JointKind;

use crate::collab::JointController;
use crate::device::Joint;

/// Internal state of the position controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// Integral accumulator [Nm].
    integral: f64,
    /// Previous raw (unsaturated) output, for anti-windup.
    prev_raw_output: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// Gains for one joint type.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    /// Proportional gain [Nm/rad].
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Velocity gain [Nm·s/rad].
    pub kd: f64,
    /// Anti-windup tracking time constant [s] (0 = disabled).
    pub tt: f64,
    /// Output saturation limit [Nm].
    pub out_max: f64,
}

impl PidGains {
    pub const fn pd(kp: f64, kd: f64, out_max: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd,
            tt: 0.0,
            out_max,
        }
    }

    pub const fn pi_assisted(kp: f64, ki: f64, kd: f64, out_max: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            tt: 0.05,
            out_max,
        }
    }

    pub const ZERO: Self = Self::pd(0.0, 0.0, 0.0);
}

/// Default gains indexed by joint slot.
pub const DEFAULT_GAINS: [PidGains; MAX_DOF_PER_MECH] = [
    PidGains::pd(0.40, 0.010, 0.60),                // shoulder
    PidGains::pd(0.40, 0.010, 0.60),                // elbow
    PidGains::pd(0.30, 0.008, 0.45),                // insertion
    PidGains::ZERO,                                 // unused
    PidGains::pi_assisted(0.05, 0.5, 0.0005, 0.12), // tool rotation
    PidGains::pi_assisted(0.05, 0.5, 0.0005, 0.12), // wrist
    PidGains::pi_assisted(0.05, 0.5, 0.0005, 0.12), // grasp 1
    PidGains::pi_assisted(0.05, 0.5, 0.0005, 0.12), // grasp 2
];

/// Compute one cycle.
///
/// # Arguments
/// - `pos_error`: desired − measured motor position [rad].
/// - `vel_error`: desired − measured motor velocity [rad/s].
/// - `dt`: cycle period [s].
///
/// # Returns
/// Output torque [Nm], clamped to `±out_max`.
#[inline]
pub fn pid_compute(
    state: &mut PidState,
    gains: &PidGains,
    pos_error: f64,
    vel_error: f64,
    dt: f64,
) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    let p_term = gains.kp * pos_error;
    let d_term = gains.kd * vel_error;

    let i_term = if gains.ki != 0.0 {
        let anti_windup = if gains.tt > 0.0 && gains.out_max > 0.0 {
            let saturated = state.prev_raw_output.clamp(-gains.out_max, gains.out_max);
            (saturated - state.prev_raw_output) / gains.tt
        } else {
            0.0
        };
        state.integral += (gains.ki * pos_error + anti_windup) * dt;
        state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    let raw_output = p_term + i_term + d_term;
    state.prev_raw_output = raw_output;

    if gains.out_max > 0.0 {
        raw_output.clamp(-gains.out_max, gains.out_max)
    } else {
        raw_output
    }
}

/// Reference [`JointController`] using a per-type gain table.
#[derive(Debug, Clone)]
pub struct PdController {
    dt: f64,
    gains: [PidGains; MAX_DOF_PER_MECH],
}

impl PdController {
    pub fn new(dt: f64) -> Self {
        Self::with_gains(dt, DEFAULT_GAINS)
    }

    pub fn with_gains(dt: f64, gains: [PidGains; MAX_DOF_PER_MECH]) -> Self {
        Self { dt, gains }
    }

    #[inline]
    pub fn gains(&self, kind: JointKind) -> &PidGains {
        &self.gains[kind.slot()]
    }
}

impl JointController for PdController {
    fn pd_control(&mut self, joint: &mut Joint) {
        let gains = self.gains[joint.kind().slot()];
        let pos_error = joint.mpos_d - joint.mpos;
        let vel_error = joint.mvel_d - joint.mvel;
        joint.tau_d = pid_compute(&mut joint.pid, &gains, pos_error, vel_error, self.dt);
    }

    fn reset_integral(&mut self, joint: &mut Joint) {
        joint.pid.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raven_common::joint::DofType;

    const DT: f64 = 0.001;

    #[test]
    fn pure_proportional() {
        let mut s = PidState::default();
        let g = PidGains::pd(10.0, 0.0, 100.0);
        let out = pid_compute(&mut s, &g, 1.0, 0.0, DT);
        assert!((out - 10.0).abs() < 1e-12);
    }

    #[test]
    fn velocity_term_damps() {
        let mut s = PidState::default();
        let g = PidGains::pd(0.0, 2.0, 100.0);
        let out = pid_compute(&mut s, &g, 0.0, -3.0, DT);
        assert!((out + 6.0).abs() < 1e-12);
    }

    #[test]
    fn output_saturates() {
        let mut s = PidState::default();
        let g = PidGains::pd(10.0, 0.0, 0.5);
        assert_eq!(pid_compute(&mut s, &g, 1.0, 0.0, DT), 0.5);
        assert_eq!(pid_compute(&mut s, &g, -1.0, 0.0, DT), -0.5);
    }

    #[test]
    fn integral_accumulates() {
        let mut s = PidState::default();
        let g = PidGains {
            kp: 0.0,
            ki: 100.0,
            kd: 0.0,
            tt: 0.0,
            out_max: 100.0,
        };
        for _ in 0..10 {
            pid_compute(&mut s, &g, 1.0, 0.0, DT);
        }
        // 100 * 1.0 * 0.001 * 10
        assert!((s.integral() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn anti_windup_bounds_integral() {
        let mut s = PidState::default();
        let g = PidGains::pi_assisted(1.0, 1000.0, 0.0, 10.0);
        for _ in 0..10_000 {
            pid_compute(&mut s, &g, 100.0, 0.0, DT);
        }
        // unconstrained: 1000 * 100 * 0.001 * 10000 = 1e6
        assert!(s.integral().abs() < 10_000.0, "integral {}", s.integral());
    }

    #[test]
    fn controller_uses_motor_errors() {
        let mut ctl = PdController::new(DT);
        let mut j = Joint::new(DofType::new(0, JointKind::Shoulder));
        j.mpos_d = 0.5;
        ctl.pd_control(&mut j);
        assert!((j.tau_d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn reset_integral_clears_tool_state() {
        let mut ctl = PdController::new(DT);
        let mut j = Joint::new(DofType::new(1, JointKind::Wrist));
        j.mpos_d = 0.1;
        for _ in 0..100 {
            ctl.pd_control(&mut j);
        }
        assert!(j.pid.integral() > 0.0);
        ctl.reset_integral(&mut j);
        assert_eq!(j.pid.integral(), 0.0);
    }

    #[test]
    fn unused_channel_produces_no_torque() {
        let mut ctl = PdController::new(DT);
        let mut j = Joint::new(DofType::new(0, JointKind::Unused));
        j.mpos_d = 3.0;
        ctl.pd_control(&mut j);
        assert_eq!(j.tau_d, 0.0);
    }
}
