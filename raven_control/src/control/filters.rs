//! Measured-state estimation.
//!
//! Decodes the raw encoder into motor position and derives motor velocity
//! through a 1st-order low-pass filter (flp). Zero frequency disables the
//! filter.

use core::f64::consts::PI;

use crate::collab::StateEstimator;
use crate::device::Joint;

// ─── Encoder decode ─────────────────────────────────────────────────

/// Motor position [rad] for a raw encoder reading.
///
/// ```text
/// mpos = (sign · raw − offset) / counts_per_radian
/// ```
#[inline]
pub fn decode_encoder(raw: i32, sign: f64, offset: f64, counts_per_radian: f64) -> f64 {
    (sign * f64::from(raw) - offset) / counts_per_radian
}

/// Offset that makes `raw` decode to `motor_position`.
#[inline]
pub fn encoder_offset_for(raw: i32, sign: f64, motor_position: f64, counts_per_radian: f64) -> f64 {
    sign * f64::from(raw) - motor_position * counts_per_radian
}

// ─── Low-Pass Filter (1st-order) ────────────────────────────────────

/// Internal state of the 1st-order low-pass filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassState {
    prev_output: f64,
}

impl LowPassState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Apply one sample through the 1st-order low-pass filter.
///
/// ```text
/// alpha = 2π·flp·dt / (1 + 2π·flp·dt)
/// y[n] = y[n-1] + alpha × (x[n] - y[n-1])
/// ```
///
/// Returns `input` unchanged when `flp <= 0.0` (disabled).
#[inline]
pub fn lowpass_apply(state: &mut LowPassState, flp: f64, input: f64, dt: f64) -> f64 {
    if flp <= 0.0 || dt <= 0.0 {
        return input;
    }

    let omega = 2.0 * PI * flp * dt;
    let alpha = omega / (1.0 + omega);
    let output = state.prev_output + alpha * (input - state.prev_output);
    state.prev_output = output;
    output
}

// ─── Estimator ──────────────────────────────────────────────────────

/// Per-joint estimator history.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateState {
    velocity: LowPassState,
    /// Previous decoded position, `None` right after a reset.
    prev_mpos: Option<f64>,
}

impl EstimateState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.prev_mpos.is_some()
    }
}

/// Reference [`StateEstimator`]: encoder decode plus low-pass velocity.
#[derive(Debug, Clone, Copy)]
pub struct LowPassEstimator {
    dt: f64,
    /// Velocity cutoff [Hz].
    flp: f64,
}

impl LowPassEstimator {
    pub const DEFAULT_CUTOFF_HZ: f64 = 100.0;

    pub fn new(dt: f64) -> Self {
        Self::with_cutoff(dt, Self::DEFAULT_CUTOFF_HZ)
    }

    pub fn with_cutoff(dt: f64, flp: f64) -> Self {
        Self { dt, flp }
    }
}

impl StateEstimator for LowPassEstimator {
    fn reset(&mut self, joint: &mut Joint) {
        joint.estimate.reset();
        joint.mvel = 0.0;
    }

    fn update(&mut self, joint: &mut Joint, sign: f64, counts_per_radian: f64) {
        let mpos = decode_encoder(joint.enc_val, sign, joint.enc_offset(), counts_per_radian);
        let raw_vel = match joint.estimate.prev_mpos {
            Some(prev) if self.dt > 0.0 => (mpos - prev) / self.dt,
            _ => 0.0,
        };
        joint.estimate.prev_mpos = Some(mpos);
        joint.mpos = mpos;
        joint.mvel = lowpass_apply(&mut joint.estimate.velocity, self.flp, raw_vel, self.dt);
    }
}
