//! Hardware profiles: hard-stop trip thresholds and encoder sign tables.
//!
//! Two hardware families exist. The active family is chosen once from
//! configuration ([`HardwareVariant`]) and its [`HardwareProfile`] is
//! injected into limit detection and calibration.
//!
//! ## Known limitation
//!
//! Trip thresholds are raw DAC command counts, not amperes. Their meaning
//! depends on the amplifier gain, which is not modeled here. The values are
//! kept bit-for-bit from the tuned hardware; changing them to physical units
//! needs separate validation on the arm.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_DOF_PER_MECH;
use crate::joint::{ArmId, JointKind};

/// Per-slot trip thresholds in raw DAC counts. Zero marks an unused channel.
pub type ThresholdTable = [i32; MAX_DOF_PER_MECH];

/// Standard hardware.
pub const STANDARD_HOMING_THRESHOLDS: ThresholdTable = [
    2500, // shoulder
    2500, // elbow
    1900, // insertion
    0,    // unused
    1400, // tool rotation
    1900, // wrist
    1900, // grasp 1
    1900, // grasp 2
];

/// Square-frame hardware. Tool thresholds are higher due to extra friction.
pub const SQUARE_HOMING_THRESHOLDS: ThresholdTable = [
    2500, // shoulder
    2500, // elbow
    1200, // insertion
    0,    // unused
    2800, // tool rotation
    2200, // wrist
    2300, // grasp 1
    2300, // grasp 2
];

/// Hardware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardwareVariant {
    #[default]
    Standard,
    Square,
}

impl HardwareVariant {
    /// Constant tables for this hardware family.
    pub const fn profile(self) -> HardwareProfile {
        match self {
            Self::Standard => HardwareProfile {
                variant: self,
                homing_thresholds: STANDARD_HOMING_THRESHOLDS,
                // Gold arm reversed entirely; tool encoders reversed on both arms.
                encoder_signs: EncoderSignTable::new([[-1, -1], [1, -1]]),
            },
            Self::Square => HardwareProfile {
                variant: self,
                homing_thresholds: SQUARE_HOMING_THRESHOLDS,
                // Gold positioning joints and Green tool joints reversed.
                encoder_signs: EncoderSignTable::new([[-1, 1], [1, -1]]),
            },
        }
    }
}

/// Encoder sign corrections indexed by `[arm][class]`, class 0 for
/// non-tool joints and 1 for tool joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSignTable([[i8; 2]; 2]);

impl EncoderSignTable {
    pub const fn new(signs: [[i8; 2]; 2]) -> Self {
        Self(signs)
    }

    /// Sign applied to the raw encoder count of `kind` on `arm`.
    #[inline]
    pub const fn sign(&self, arm: ArmId, kind: JointKind) -> f64 {
        let class = if kind.is_tool() { 1 } else { 0 };
        self.0[arm as usize][class] as f64
    }
}

/// Constant tables of one hardware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareProfile {
    pub variant: HardwareVariant,
    pub homing_thresholds: ThresholdTable,
    pub encoder_signs: EncoderSignTable,
}

impl HardwareProfile {
    /// Trip threshold for a joint slot [raw DAC counts].
    #[inline]
    pub const fn threshold(&self, kind: JointKind) -> i32 {
        self.homing_thresholds[kind.slot()]
    }

    #[inline]
    pub const fn encoder_sign(&self, arm: ArmId, kind: JointKind) -> f64 {
        self.encoder_signs.sign(arm, kind)
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        HardwareVariant::default().profile()
    }
}
