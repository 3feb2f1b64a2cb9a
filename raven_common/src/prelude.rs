//! Common re-exports.
//!
//! ```rust
//! use raven_common::prelude::*;
//! ```

use std::time::Duration;

pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, load_homing_config};
pub use crate::consts::{MAX_DOF, MAX_DOF_PER_MECH, MAX_MECH, TICK_PERIOD_US};
pub use crate::hardware::{HardwareProfile, HardwareVariant};
pub use crate::homing::{DofTypeConfig, HomingConfig};
pub use crate::joint::{ArmId, CompletionGroup, DofType, JointKind, JointState};
pub use crate::run_level::{RunLevel, SUB_LEVEL_AUTO_INIT};

/// Default control tick period as Duration.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_micros(TICK_PERIOD_US);
