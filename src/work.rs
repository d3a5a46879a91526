//! Deferred worker
//!
//! All blocking work an interrupt triggers runs here: role transitions and
//! VBUS session notifications. The worker re-enables the interrupt line
//! the front-end masked.

use crate::ci::{Otgsc, Reg, RegisterIo};
use crate::controller::Controller;
use crate::platform::Platform;
use crate::role::{PeripheralDriver, Role, RoleDriver};
use core::sync::atomic::Ordering;
use embedded_hal::delay::DelayNs;

/// What one worker pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkOutcome {
    /// Nothing was queued
    Idle,
    /// Processed an ID pin change
    IdChange,
    /// Processed a VBUS session change
    VbusChange,
    /// Woken without a recorded event
    Spurious,
}

impl<IO, H, G, PL> Controller<IO, H, G, PL>
where
    IO: RegisterIo,
    H: RoleDriver<IO>,
    G: PeripheralDriver<IO>,
    PL: Platform,
{
    /// Run the deferred worker once
    ///
    /// Call after [`Platform::schedule_work`] fired, from thread or task
    /// context. Returns [`WorkOutcome::Idle`] without touching the
    /// interrupt line when nothing is queued.
    pub fn process_work<D: DelayNs>(&self, delay: &mut D) -> WorkOutcome {
        if !self.work.take() {
            return WorkOutcome::Idle;
        }

        let outcome = if self.id_event.swap(false, Ordering::AcqRel) {
            self.platform.runtime_get();
            {
                let _power = self.power.lock();
                let target = self.id_role();
                if let Err(_e) = self.switch_to(target, delay) {
                    #[cfg(feature = "defmt")]
                    defmt::error!("Switch to {} role failed: {}", target, _e);
                }
            }
            self.platform.runtime_put();
            WorkOutcome::IdChange
        } else if self.vbus_event.swap(false, Ordering::AcqRel) {
            self.platform.runtime_get();
            {
                let _power = self.power.lock();
                self.handle_vbus_change();
            }
            self.platform.runtime_put();
            WorkOutcome::VbusChange
        } else {
            #[cfg(feature = "defmt")]
            defmt::error!("Unexpected worker wakeup");
            WorkOutcome::Spurious
        };

        self.platform.enable_irq();
        outcome
    }

    /// Tell the peripheral module whether a session is present
    fn handle_vbus_change(&self) {
        if self.role.load() != Some(Role::Peripheral) {
            #[cfg(feature = "defmt")]
            defmt::debug!("VBUS change outside the peripheral role");
            return;
        }

        let session_valid = self.bank.read(Reg::Otgsc, Otgsc::B_SESSION_VALID.bits()) != 0;
        #[cfg(feature = "defmt")]
        defmt::debug!("VBUS session valid = {}", session_valid);
        self.roles.lock().vbus_session(session_valid, &self.bank);
    }
}
