//! # Raven Control Library
//!
//! Joint homing core for the Raven arm controller. Once per control tick
//! the orchestrator drives every joint through a per-joint state machine:
//! sweep toward the mechanical hard stop, detect the stop from the size of
//! the motor command, calibrate the encoder offsets against the known stop
//! angles, then move to the home pose.
//!
//! ## Layers
//!
//! 1. **Orchestrator** ([`homing::orchestrator`]) gates on run level, waits
//!    out the amplifier warm-up and runs the per-tick pipeline.
//! 2. **Joint FSM** ([`homing::fsm`]) steps one joint per tick.
//! 3. **Limit detector** ([`homing::limit`]) flags hard-stop contact.
//! 4. **Calibration** ([`homing::calibration`]) rewrites encoder offsets
//!    for a completed joint group.
//!
//! Trajectory generation, cable coupling, joint control, torque→DAC and
//! state estimation are collaborators behind the traits in [`collab`];
//! reference implementations live in [`trajectory`], [`coupling`] and
//! [`control`]. [`sim`] and [`cycle`] provide a simulated plant and the
//! bench loop that ties everything together.
//!
//! ## Zero-Allocation Tick
//!
//! Device, orchestrator state and collaborators are allocated up front.
//! A tick performs no heap allocation.

#![deny(clippy::disallowed_types)]

pub mod collab;
pub mod control;
pub mod coupling;
pub mod cycle;
pub mod device;
pub mod error;
pub mod homing;
pub mod sim;
pub mod trajectory;
