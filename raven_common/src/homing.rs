//! Homing configuration (per-type constants, sweep tables, timing).
//!
//! Loaded from TOML once at startup and immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    CALIBRATION_SETTLE_TICKS, ENC_CNTS_PER_REV, HOMING_DURATION_MAX_S, HOMING_DURATION_MIN_S,
    HOMING_TRAJECTORY_DURATION_S, HOMING_WARMUP_TICKS, MAX_DOF, MAX_DOF_PER_MECH,
    SETTLE_TICKS_MAX, TICK_PERIOD_US, TICK_PERIOD_US_MAX, TICK_PERIOD_US_MIN, WARMUP_TICKS_MAX,
};
use crate::hardware::{HardwareProfile, HardwareVariant};
use crate::joint::{DofType, JointKind};

const fn deg(d: f64) -> f64 {
    d * core::f64::consts::PI / 180.0
}

// ─── Per-Type Constants ─────────────────────────────────────────────

/// Immutable constants of one joint type [rad, or m for insertion].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DofTypeConfig {
    /// Ready pose reached at the end of phase 2.
    pub home_position: f64,
    /// Joint angle at the hard stop found in phase 1.
    pub max_position: f64,
}

impl DofTypeConfig {
    pub const fn new(home_position: f64, max_position: f64) -> Self {
        Self {
            home_position,
            max_position,
        }
    }
}

/// Per-slot constants; both arms share the same mechanical limits.
const ARM_DOF_TYPES: [DofTypeConfig; MAX_DOF_PER_MECH] = [
    DofTypeConfig::new(deg(13.0), deg(5.0)),    // shoulder
    DofTypeConfig::new(deg(88.0), deg(170.0)),  // elbow
    DofTypeConfig::new(0.30, 0.43),             // insertion
    DofTypeConfig::new(0.0, 0.0),               // unused
    DofTypeConfig::new(0.0, deg(-182.0)),       // tool rotation
    DofTypeConfig::new(0.0, deg(111.0)),        // wrist
    DofTypeConfig::new(deg(45.0), deg(100.0)),  // grasp 1
    DofTypeConfig::new(deg(45.0), deg(100.0)),  // grasp 2
];

/// Default DOF type table, one entry per joint type per mechanism.
pub fn default_dof_types() -> Vec<DofTypeConfig> {
    (0..MAX_DOF)
        .map(|i| ARM_DOF_TYPES[i % MAX_DOF_PER_MECH])
        .collect()
}

// ─── Phase-1 Sweep Table ────────────────────────────────────────────

/// Magnitude/period sentinel meaning "no positional sweep on this axis".
pub const NO_SWEEP: f64 = 9_999_999.0;

/// Phase-1 sweep toward the hard stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepProfile {
    /// Signed travel per period [rad or m].
    pub magnitude: f64,
    /// Period [s].
    pub period: f64,
}

impl SweepProfile {
    pub const fn new(magnitude: f64, period: f64) -> Self {
        Self { magnitude, period }
    }

    /// True for the sentinel entry of an axis without a sweep.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.period >= NO_SWEEP || self.magnitude >= NO_SWEEP
    }
}

/// Sweep per slot. Positioning joints sweep far toward the stop; tool
/// joints sweep slowly on the graspers to avoid overrun.
pub const HOMING_SWEEPS: [SweepProfile; MAX_DOF_PER_MECH] = [
    SweepProfile::new(deg(-10.0), 1.0), // shoulder
    SweepProfile::new(deg(10.0), 1.0),  // elbow
    SweepProfile::new(0.02, 1.0),       // insertion
    SweepProfile::new(NO_SWEEP, NO_SWEEP),
    SweepProfile::new(deg(-80.0), 1.0), // tool rotation
    SweepProfile::new(deg(40.0), 1.0),  // wrist
    SweepProfile::new(deg(40.0), 30.0), // grasp 1
    SweepProfile::new(deg(40.0), 30.0), // grasp 2
];

#[inline]
pub const fn homing_sweep(kind: JointKind) -> SweepProfile {
    HOMING_SWEEPS[kind.slot()]
}

// ─── HomingConfig ───────────────────────────────────────────────────

/// Homing configuration.
///
/// # TOML Example
///
/// ```toml
/// hardware = "square"
/// settle_ticks = 250
///
/// [shared]
/// service_name = "raven-homing"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomingConfig {
    #[serde(default = "default_shared")]
    pub shared: SharedConfig,

    /// Hardware family selecting thresholds and encoder signs.
    #[serde(default)]
    pub hardware: HardwareVariant,

    /// Amplifier warm-up after entering auto-init [ticks].
    #[serde(default = "default_warmup_ticks")]
    pub warmup_ticks: u64,

    /// Cable settle delay before calibration [ticks].
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u64,

    /// Phase-2 move duration [s].
    #[serde(default = "default_homing_duration")]
    pub homing_duration_s: f64,

    /// Encoder counts per motor revolution.
    #[serde(default = "default_counts_per_rev")]
    pub encoder_counts_per_rev: f64,

    /// Control tick period [µs].
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u64,

    /// Tools without hard stops: every tool joint counts as homed on each
    /// running tick and only the positioning joints search their stops.
    #[serde(default)]
    pub fixed_tools: bool,

    /// Per-type constants, `MAX_DOF` entries in type-index order.
    #[serde(default = "default_dof_types")]
    pub dof_types: Vec<DofTypeConfig>,
}

fn default_shared() -> SharedConfig {
    SharedConfig {
        log_level: Default::default(),
        service_name: "raven-homing".to_string(),
    }
}
fn default_warmup_ticks() -> u64 {
    HOMING_WARMUP_TICKS
}
fn default_settle_ticks() -> u64 {
    CALIBRATION_SETTLE_TICKS
}
fn default_homing_duration() -> f64 {
    HOMING_TRAJECTORY_DURATION_S
}
fn default_counts_per_rev() -> f64 {
    ENC_CNTS_PER_REV
}
fn default_tick_period_us() -> u64 {
    TICK_PERIOD_US
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            shared: default_shared(),
            hardware: HardwareVariant::default(),
            warmup_ticks: HOMING_WARMUP_TICKS,
            settle_ticks: CALIBRATION_SETTLE_TICKS,
            homing_duration_s: HOMING_TRAJECTORY_DURATION_S,
            encoder_counts_per_rev: ENC_CNTS_PER_REV,
            tick_period_us: TICK_PERIOD_US,
            fixed_tools: false,
            dof_types: default_dof_types(),
        }
    }
}

impl HomingConfig {
    /// Validate parameter bounds and table shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.warmup_ticks > WARMUP_TICKS_MAX {
            return Err(ConfigError::ValidationError(format!(
                "warmup_ticks {} exceeds {}",
                self.warmup_ticks, WARMUP_TICKS_MAX
            )));
        }
        if self.settle_ticks > SETTLE_TICKS_MAX {
            return Err(ConfigError::ValidationError(format!(
                "settle_ticks {} exceeds {}",
                self.settle_ticks, SETTLE_TICKS_MAX
            )));
        }
        if !(HOMING_DURATION_MIN_S..=HOMING_DURATION_MAX_S).contains(&self.homing_duration_s) {
            return Err(ConfigError::ValidationError(format!(
                "homing_duration_s {} out of range [{}, {}]",
                self.homing_duration_s, HOMING_DURATION_MIN_S, HOMING_DURATION_MAX_S
            )));
        }
        if !(self.encoder_counts_per_rev.is_finite() && self.encoder_counts_per_rev > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "encoder_counts_per_rev must be positive, got {}",
                self.encoder_counts_per_rev
            )));
        }
        if !(TICK_PERIOD_US_MIN..=TICK_PERIOD_US_MAX).contains(&self.tick_period_us) {
            return Err(ConfigError::ValidationError(format!(
                "tick_period_us {} out of range [{}, {}]",
                self.tick_period_us, TICK_PERIOD_US_MIN, TICK_PERIOD_US_MAX
            )));
        }
        if self.dof_types.len() != MAX_DOF {
            return Err(ConfigError::ValidationError(format!(
                "dof_types needs {} entries (one per joint type per mechanism), got {}",
                MAX_DOF,
                self.dof_types.len()
            )));
        }
        for (i, t) in self.dof_types.iter().enumerate() {
            if !(t.home_position.is_finite() && t.max_position.is_finite()) {
                return Err(ConfigError::ValidationError(format!(
                    "dof_types[{i}] has a non-finite position"
                )));
            }
        }
        Ok(())
    }

    /// Constants for a joint type, `None` when the index is outside the table.
    #[inline]
    pub fn dof_type(&self, dof: DofType) -> Option<&DofTypeConfig> {
        self.dof_types.get(dof.index() as usize)
    }

    /// Encoder counts per radian of motor rotation.
    #[inline]
    pub fn counts_per_radian(&self) -> f64 {
        self.encoder_counts_per_rev / (2.0 * core::f64::consts::PI)
    }

    /// Tick period [s].
    #[inline]
    pub fn tick_period_s(&self) -> f64 {
        self.tick_period_us as f64 * 1e-6
    }

    #[inline]
    pub fn profile(&self) -> HardwareProfile {
        self.hardware.profile()
    }
}
