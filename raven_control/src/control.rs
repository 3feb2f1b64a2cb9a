//! Control chain root.
//!
//! Reference collaborators for the homing pipeline: motor position control,
//! torque → DAC conversion and measured-state estimation. Each is stateless
//! apart from its tuning; per-joint history lives on the [`Joint`](crate::device::Joint).

pub mod dac;
pub mod filters;
pub mod pid;
