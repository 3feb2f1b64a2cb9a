//! Hard-stop detection.
//!
//! A joint searching for its stop is driven by a position loop whose error
//! keeps growing once the joint can no longer move, so the commanded
//! actuation climbs until it crosses the per-type threshold. Thresholds are
//! raw DAC counts (see [`raven_common::hardware`]).

use raven_common::hardware::HardwareProfile;
use raven_common::joint::JointState;

use crate::device::Joint;

/// `true` iff `joint` is searching (`PosUnknown`) and `|current_cmd|` is at
/// or above its type's trip threshold.
///
/// A zero threshold marks an unused channel and never trips.
#[inline]
pub fn hard_stop_reached(joint: &Joint, profile: &HardwareProfile) -> bool {
    if joint.state() != JointState::PosUnknown {
        return false;
    }
    let threshold = profile.threshold(joint.kind());
    threshold != 0 && joint.current_cmd.unsigned_abs() >= threshold.unsigned_abs()
}
