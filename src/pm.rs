//! Power-state controller
//!
//! Runtime suspend parks the PHY through PORTSC.PHCD and hands wakeup
//! source setup to the platform. While suspended the interrupt front-end
//! only records the wakeup and asks for a resume; the reference it takes
//! is released here once the controller is back.

use crate::ci::{hw_phy_low_power, RegisterIo};
use crate::controller::Controller;
use crate::error::{DeviceError, Result};
use crate::platform::{CiEvent, Platform};
use crate::role::{PeripheralDriver, RoleDriver};
use core::sync::atomic::Ordering;
use embedded_hal::delay::DelayNs;

/// Controller power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Clocks and PHY running
    Active,
    /// PHY suspended, wakeup sources armed
    LowPower,
}

impl<IO, H, G, PL> Controller<IO, H, G, PL>
where
    IO: RegisterIo,
    H: RoleDriver<IO>,
    G: PeripheralDriver<IO>,
    PL: Platform,
{
    /// Current power state
    pub fn power_state(&self) -> PowerState {
        if self.in_lpm.load(Ordering::Acquire) {
            PowerState::LowPower
        } else {
            PowerState::Active
        }
    }

    /// Enter low power
    ///
    /// Fails with [`DeviceError::Busy`] while a role transition runs or an
    /// OTG event waits for the worker. Suspending an already suspended
    /// controller does nothing.
    pub fn runtime_suspend<D: DelayNs>(&self, delay: &mut D) -> Result<()> {
        let Some(mut state) = self.power.try_lock() else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Suspend refused, role transition running");
            return Err(DeviceError::Busy);
        };
        if *state == PowerState::LowPower {
            return Ok(());
        }
        if self.work.is_pending() || self.events_pending() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Suspend refused, OTG event pending");
            return Err(DeviceError::Busy);
        }

        self.platform.disable_irq();
        if let Err(e) = hw_phy_low_power(&self.bank, true, delay) {
            self.platform.enable_irq();
            return Err(e);
        }
        self.platform.phy_set_suspend(true);
        self.platform.configure_wakeup(true);
        self.platform.notify_event(CiEvent::LowPowerEntered);

        *state = PowerState::LowPower;
        self.in_lpm.store(true, Ordering::Release);
        self.platform.enable_irq();

        #[cfg(feature = "defmt")]
        defmt::debug!("Entered low power");
        Ok(())
    }

    /// Leave low power
    ///
    /// Fails with [`DeviceError::PhyTimeout`] when PHCD never reads back
    /// clear; the controller then stays in low power with its wakeup
    /// sources still armed. Resuming an active
    /// controller does nothing.
    pub fn runtime_resume<D: DelayNs>(&self, delay: &mut D) -> Result<()> {
        let mut state = self.power.lock();
        if *state == PowerState::Active {
            return Ok(());
        }

        hw_phy_low_power(&self.bank, false, delay).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::error!("PHY did not leave low power: {}", e);
            e
        })?;
        self.platform.configure_wakeup(false);
        self.platform.phy_set_suspend(false);
        self.platform.notify_event(CiEvent::LowPowerExited);

        *state = PowerState::Active;
        self.in_lpm.store(false, Ordering::Release);

        if self.wakeup_int.swap(false, Ordering::AcqRel) {
            #[cfg(feature = "defmt")]
            defmt::debug!("Resumed by controller interrupt");
            self.platform.runtime_put();
            self.platform.enable_irq();
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Left low power");
        Ok(())
    }

    /// System sleep entry
    ///
    /// Like [`runtime_suspend`](Self::runtime_suspend), and arms the
    /// controller interrupt as a system wake source when the controller is
    /// wakeup capable. The wake source is armed at most once.
    pub fn suspend<D: DelayNs>(&self, delay: &mut D) -> Result<()> {
        self.runtime_suspend(delay)?;
        if self.config.wakeup_capable && !self.irq_wake_armed.swap(true, Ordering::AcqRel) {
            self.platform.set_irq_wake(true);
        }
        Ok(())
    }

    /// System sleep exit
    ///
    /// Disarms the wake source only when [`suspend`](Self::suspend) armed it.
    pub fn resume<D: DelayNs>(&self, delay: &mut D) -> Result<()> {
        if self.irq_wake_armed.swap(false, Ordering::AcqRel) {
            self.platform.set_irq_wake(false);
        }
        self.runtime_resume(delay)
    }
}
