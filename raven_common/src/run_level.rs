//! Controller run levels.
//!
//! The homing core only observes the run level; the policy that moves the
//! controller between levels lives elsewhere.

use serde::{Deserialize, Serialize};

/// Sub-level of [`RunLevel::Init`] in which automatic homing runs.
pub const SUB_LEVEL_AUTO_INIT: u8 = 1;

/// Coarse global controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunLevel {
    /// Emergency stop: amplifiers disabled.
    EStop = 0,
    /// Initialization; sub-level selects manual or automatic init.
    Init = 1,
    /// Operator pedal released: brakes hold position.
    PedalUp = 2,
    /// Operator pedal pressed: teleoperation.
    PedalDown = 3,
}

impl RunLevel {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EStop),
            1 => Some(Self::Init),
            2 => Some(Self::PedalUp),
            3 => Some(Self::PedalDown),
            _ => None,
        }
    }

    /// True for the run level / sub-level combination that enables homing.
    #[inline]
    pub const fn is_auto_init(self, sub_level: u8) -> bool {
        matches!(self, Self::Init) && sub_level == SUB_LEVEL_AUTO_INIT
    }
}

impl Default for RunLevel {
    fn default() -> Self {
        Self::EStop
    }
}
