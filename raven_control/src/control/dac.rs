//! Torque → amplifier command conversion.
//!
//! `cmd = round(tau_d · dac_per_nm)`, saturated to the signed 16-bit DAC
//! range. The homing trip thresholds compare against this value directly,
//! so the scale factors here set the effective trip current.

use raven_common::consts::{DAC_MAX, MAX_DOF_PER_MECH};

use crate::collab::DacConverter;
use crate::device::{Device, Joint};

/// DAC counts per Nm, indexed by joint slot.
pub const DEFAULT_DAC_PER_NM: [f64; MAX_DOF_PER_MECH] = [
    6_000.0,  // shoulder
    6_000.0,  // elbow
    6_000.0,  // insertion
    0.0,      // unused
    25_000.0, // tool rotation
    25_000.0, // wrist
    25_000.0, // grasp 1
    25_000.0, // grasp 2
];

/// Convert one torque to a saturated DAC command.
#[inline]
pub fn torque_to_command(tau: f64, dac_per_nm: f64) -> i32 {
    let raw = (tau * dac_per_nm).round();
    if raw.is_nan() {
        return 0;
    }
    // `as` saturates on out-of-range floats
    (raw as i32).clamp(-DAC_MAX, DAC_MAX)
}

/// Reference [`DacConverter`] with a per-type scale table.
#[derive(Debug, Clone)]
pub struct TorqueDac {
    dac_per_nm: [f64; MAX_DOF_PER_MECH],
}

impl TorqueDac {
    pub fn new() -> Self {
        Self::with_scale(DEFAULT_DAC_PER_NM)
    }

    pub fn with_scale(dac_per_nm: [f64; MAX_DOF_PER_MECH]) -> Self {
        Self { dac_per_nm }
    }

    #[inline]
    fn convert(&self, joint: &mut Joint) {
        joint.current_cmd = torque_to_command(joint.tau_d, self.dac_per_nm[joint.kind().slot()]);
    }
}

impl Default for TorqueDac {
    fn default() -> Self {
        Self::new()
    }
}

impl DacConverter for TorqueDac {
    fn torque_to_dac(&mut self, device: &mut Device) {
        for joint in device.joints_mut() {
            self.convert(joint);
        }
    }
}
