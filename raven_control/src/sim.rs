//! Simulated arm plant for the homing bench runner.
//!
//! Motor velocity is proportional to the DAC command. Each joint has a
//! single hard stop at its configured maximum position, on the side its
//! phase-1 sweep heads for; the joint cannot pass it, so the position loop
//! error and the command grow until the limit detector trips. Encoders
//! read the true motor position plus an unknown per-joint zero.
//!
//! Insertion powers up retracted at its home position. Every other joint
//! starts a short gap before its stop; the gap widens with the mechanism
//! index so the arms do not finish in lockstep.

use raven_common::consts::MAX_DOF_PER_MECH;
use raven_common::hardware::HardwareProfile;
use raven_common::homing::{HomingConfig, homing_sweep};
use raven_common::joint::{ArmId, JointKind};

use crate::coupling::LinearCoupling;
use crate::device::Mechanism;

/// Motor speed per DAC count [rad/s].
pub const MOTOR_GAIN: f64 = 0.01;

/// Distance from the stop at power-up on the first mechanism [rad].
const START_GAP: f64 = 0.05;

#[derive(Debug, Clone, Copy, Default)]
struct SimJoint {
    /// True motor position [rad].
    motor: f64,
    /// Encoder count at motor position zero.
    encoder_zero: f64,
    /// Hard stop [joint units].
    stop: f64,
    /// +1 / -1 toward the stop, 0 for no stop.
    stop_dir: f64,
}

#[derive(Debug, Clone)]
pub struct SimulatedArm {
    arm: ArmId,
    joints: [SimJoint; MAX_DOF_PER_MECH],
    signs: [f64; MAX_DOF_PER_MECH],
    coupling: LinearCoupling,
    counts_per_radian: f64,
}

impl SimulatedArm {
    /// Plant for `mech`, powered up short of every hard stop.
    pub fn new(mech: &Mechanism, config: &HomingConfig, profile: &HardwareProfile) -> Self {
        let coupling = LinearCoupling::new();
        let mut joints = [SimJoint::default(); MAX_DOF_PER_MECH];
        let mut signs = [1.0; MAX_DOF_PER_MECH];
        let mut start = [0.0; MAX_DOF_PER_MECH];

        for (slot, joint) in mech.joints().iter().enumerate() {
            let kind = joint.kind();
            let sweep = homing_sweep(kind);
            let stop_dir = if sweep.is_disabled() {
                0.0
            } else {
                sweep.magnitude.signum()
            };
            let (home, stop) = config
                .dof_type(joint.dof_type())
                .map_or((0.0, 0.0), |t| (t.home_position, t.max_position));
            start[slot] = if kind == JointKind::Insertion {
                home
            } else {
                stop - stop_dir * START_GAP * (mech.index() + 1) as f64
            };

            let index = mech.index() * MAX_DOF_PER_MECH + slot;
            joints[slot] = SimJoint {
                motor: 0.0,
                encoder_zero: (index as f64 * 7_919.0) % 20_000.0 - 10_000.0,
                stop,
                stop_dir,
            };
            signs[slot] = profile.encoder_sign(mech.arm(), kind);
        }

        let ins = start[JointKind::Insertion.slot()];
        for (slot, kind) in JointKind::ALL.into_iter().enumerate() {
            joints[slot].motor =
                coupling.ratio(kind) * start[slot] + coupling.insertion_coupling(kind) * ins;
        }

        Self {
            arm: mech.arm(),
            joints,
            signs,
            coupling,
            counts_per_radian: config.counts_per_radian(),
        }
    }

    #[inline]
    pub fn arm(&self) -> ArmId {
        self.arm
    }

    fn insertion_position(&self) -> f64 {
        self.joints[JointKind::Insertion.slot()].motor / self.coupling.ratio(JointKind::Insertion)
    }

    /// True joint position [rad, or m].
    pub fn joint_position(&self, kind: JointKind) -> f64 {
        let ins = self.insertion_position();
        let j = &self.joints[kind.slot()];
        (j.motor - self.coupling.insertion_coupling(kind) * ins) / self.coupling.ratio(kind)
    }

    pub fn at_stop(&self, kind: JointKind) -> bool {
        let j = &self.joints[kind.slot()];
        j.stop_dir != 0.0 && (self.joint_position(kind) - j.stop).abs() < 1e-9
    }

    /// Sample the encoders into `mech`.
    pub fn read(&self, mech: &mut Mechanism) {
        for (slot, joint) in mech.joints_mut().iter_mut().enumerate() {
            let j = &self.joints[slot];
            let counts = self.signs[slot] * (j.motor * self.counts_per_radian + j.encoder_zero);
            joint.enc_val = counts.round() as i32;
        }
    }

    /// Apply the commands in `mech` for `dt` seconds.
    pub fn write(&mut self, mech: &Mechanism, dt: f64) {
        for (slot, joint) in mech.joints().iter().enumerate() {
            self.joints[slot].motor += MOTOR_GAIN * f64::from(joint.current_cmd) * dt;
        }

        // Insertion has no coupling term; clamp it first.
        self.clamp(JointKind::Insertion, 0.0);
        let ins = self.insertion_position();
        for kind in JointKind::ALL {
            if kind != JointKind::Insertion {
                self.clamp(kind, ins);
            }
        }
    }

    fn clamp(&mut self, kind: JointKind, ins: f64) {
        let ratio = self.coupling.ratio(kind);
        let k = self.coupling.insertion_coupling(kind);
        let j = &mut self.joints[kind.slot()];
        let pos = (j.motor - k * ins) / ratio;
        if j.stop_dir * (pos - j.stop) > 0.0 {
            j.motor = ratio * j.stop + k * ins;
        }
    }
}
