//! Homing errors.
//!
//! Limit trips and run-level gating are not errors; they are ordinary
//! state. Only structural faults that make the per-type tables unusable
//! end up here, and each one aborts the current homing episode.

use raven_common::consts::MAX_MECH;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HomingError {
    /// Joint type index outside the DOF type table.
    #[error("joint type index {index} is outside the DOF type table")]
    InvalidDofType { index: u8 },

    /// A joint sits in a slot or mechanism that its type index does not name.
    #[error("mechanism {mechanism} slot {slot} holds joint type {index}")]
    MechanismLayout { mechanism: usize, slot: usize, index: u8 },

    /// Device already holds `MAX_MECH` mechanisms.
    #[error("device is full ({} mechanisms)", MAX_MECH)]
    TooManyMechanisms,
}
