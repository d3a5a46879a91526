#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

//! Dual-role USB OTG core for ChipIdea controllers on i.MX RT
//!
//! This crate drives the controller side that both roles share: register
//! access, init and reset, the ID pin role state machine, the interrupt
//! front-end with its deferred worker, and low-power handling. Host and
//! peripheral protocol stacks plug in as role modules.
//!
//! # Core Components
//!
//! - [`ci`] - Register bank, offset tables and the init/reset sequencer
//! - [`role`] - Role module traits and the per-controller role set
//! - [`platform`] - Board configuration and platform services
//! - [`Controller`] - Probe, role switching, interrupts and power management
//! - [`error`] - Error types
//!
//! # Wiring
//!
//! 1. Probe with [`Controller::probe`] once clocks and the PHY are up
//! 2. Call [`Controller::handle_irq`] from the USB interrupt vector
//! 3. Call [`Controller::process_work`] whenever [`Platform::schedule_work`]
//!    fires
//! 4. Forward runtime and system power transitions to the `*_suspend` and
//!    `*_resume` methods

#[cfg(feature = "defmt")]
use defmt as _;

pub mod ci;
pub mod controller;
pub mod error;
pub mod irq;
mod otg;
pub mod platform;
pub mod pm;
pub mod role;
pub mod work;

pub use controller::Controller;
pub use error::{DeviceError, Result, RoleError};
pub use irq::IrqReturn;
pub use platform::{CiEvent, DrMode, Platform, PlatformConfig};
pub use pm::PowerState;
pub use role::{NoRole, PeripheralDriver, Role, RoleDriver, RoleSet};
pub use work::WorkOutcome;
