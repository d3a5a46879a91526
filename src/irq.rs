//! Interrupt front-end
//!
//! [`Controller::handle_irq`] runs in hard-interrupt context. It never
//! blocks: OTG events are latched into flags, the line is masked and the
//! deferred worker is queued. Everything else goes to the active role.

use crate::ci::{Otgsc, Reg, RegisterIo};
use crate::controller::Controller;
use crate::platform::Platform;
use crate::role::{PeripheralDriver, RoleDriver};
use core::sync::atomic::{AtomicBool, Ordering};

/// Interrupt handler result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqReturn {
    /// The interrupt came from this controller and was serviced
    Handled,
    /// The interrupt was not for this controller
    NotHandled,
}

/// Single-entry hand-off between the interrupt front-end and the worker
pub(crate) struct WorkSlot(AtomicBool);

impl WorkSlot {
    pub(crate) const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Queue the worker; `false` if it was already queued
    #[inline(always)]
    pub(crate) fn schedule(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Dequeue; `false` if nothing was queued
    #[inline(always)]
    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    #[inline(always)]
    pub(crate) fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl<IO, H, G, PL> Controller<IO, H, G, PL>
where
    IO: RegisterIo,
    H: RoleDriver<IO>,
    G: PeripheralDriver<IO>,
    PL: Platform,
{
    /// Controller interrupt handler
    ///
    /// Call from the controller's interrupt vector.
    pub fn handle_irq(&self) -> IrqReturn {
        if self.in_lpm.load(Ordering::Acquire) {
            self.platform.disable_irq();
            self.wakeup_int.store(true, Ordering::Release);
            self.platform.request_resume();
            return IrqReturn::Handled;
        }

        let otgsc = Otgsc::from_bits_truncate(self.bank.read(Reg::Otgsc, !0));

        let id_change = Otgsc::ID_INTERRUPT_ENABLE | Otgsc::ID_INTERRUPT_STATUS;
        if self.is_otg && otgsc.contains(id_change) {
            self.id_event.store(true, Ordering::Release);
            self.bank.set_bits(Reg::Otgsc, Otgsc::ID_INTERRUPT_STATUS.bits());
            self.queue_work();
            return IrqReturn::Handled;
        }

        let session_change = Otgsc::B_SESSION_VALID_ENABLE | Otgsc::B_SESSION_VALID_STATUS;
        if otgsc.contains(session_change) {
            self.vbus_event.store(true, Ordering::Release);
            self.bank.set_bits(Reg::Otgsc, Otgsc::B_SESSION_VALID_STATUS.bits());
            self.queue_work();
            return IrqReturn::Handled;
        }

        let Some(role) = self.role.load() else {
            #[cfg(feature = "defmt")]
            defmt::error!("Interrupt with no active role, otgsc = {=u32:#x}", otgsc.bits());
            return IrqReturn::Handled;
        };

        match self.roles.try_lock() {
            Some(mut roles) => roles.handle_interrupt(role, &self.bank),
            None => IrqReturn::NotHandled,
        }
    }

    /// Mask the line and hand the event to the worker
    fn queue_work(&self) {
        self.platform.disable_irq();
        if self.work.schedule() {
            self.platform.schedule_work();
        }
    }
}
