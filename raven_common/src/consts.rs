//! System-wide constants for the Raven workspace.
//!
//! Single source of truth for mechanism layout, tick timing and homing
//! defaults. Imported by all crates.

use static_assertions::const_assert;

/// Maximum number of mechanisms (arms) on one device.
pub const MAX_MECH: usize = 2;

/// Joint slots per mechanism. Every mechanism uses the same slot layout.
pub const MAX_DOF_PER_MECH: usize = 8;

/// Total joint slots across the device; size of the per-type DOF table.
pub const MAX_DOF: usize = MAX_MECH * MAX_DOF_PER_MECH;

/// Control tick period in microseconds (1 kHz).
pub const TICK_PERIOD_US: u64 = 1000;

/// Ticks to wait after entering auto-init before homing starts (amplifier settle).
pub const HOMING_WARMUP_TICKS: u64 = 1000;

/// Ticks to wait after a completion group stops before calibrating (cable settle).
pub const CALIBRATION_SETTLE_TICKS: u64 = 200;

/// Duration of the phase-2 move from the hard stop to the home pose [s].
pub const HOMING_TRAJECTORY_DURATION_S: f64 = 2.5;

/// Encoder counts per motor revolution.
pub const ENC_CNTS_PER_REV: f64 = 4000.0;

/// Saturation limit of the signed 16-bit DAC command.
pub const DAC_MAX: i32 = i16::MAX as i32;

/// Default homing configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/raven/homing.toml";

// ─── Bounds (validated at load) ─────────────────────────────────────

pub const WARMUP_TICKS_MAX: u64 = 60_000;
pub const SETTLE_TICKS_MAX: u64 = 10_000;
pub const HOMING_DURATION_MIN_S: f64 = 0.1;
pub const HOMING_DURATION_MAX_S: f64 = 30.0;
pub const TICK_PERIOD_US_MIN: u64 = 100;
pub const TICK_PERIOD_US_MAX: u64 = 10_000;

// Shared 8-entry tables are indexed by `type_index % MAX_DOF_PER_MECH`.
const_assert!(MAX_DOF_PER_MECH == 8);
const_assert!(MAX_DOF % MAX_DOF_PER_MECH == 0);
