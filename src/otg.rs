//! OTG role state machine
//!
//! Every transition runs stop, reset to Idle, settle, start. The caller
//! holds the transition lock, so transitions are serialized against each
//! other and against suspend.

use crate::ci::{hw_device_reset, timeouts, ControllerMode, Otgsc, Reg, RegisterIo, RegisterTimeout};
use crate::controller::Controller;
use crate::error::{DeviceError, Result};
use crate::platform::Platform;
use crate::role::{PeripheralDriver, Role, RoleDriver};
use embedded_hal::delay::DelayNs;

impl<IO, H, G, PL> Controller<IO, H, G, PL>
where
    IO: RegisterIo,
    H: RoleDriver<IO>,
    G: PeripheralDriver<IO>,
    PL: Platform,
{
    /// Move the controller from its current role to `target`
    ///
    /// A no-op when `target` is already active. When the target module
    /// fails to start, the current role is left at `None`; nothing retries.
    pub(crate) fn switch_to<D: DelayNs>(&self, target: Role, delay: &mut D) -> Result<()> {
        let current = self.role.load();
        if current == Some(target) {
            return Ok(());
        }

        let mut roles = self.roles.lock();
        if !roles.has(target) {
            return Err(DeviceError::RoleNotInstalled);
        }

        if let Some(current) = current {
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Stopping {} role ({=str})",
                current,
                roles.name::<IO>(current).unwrap_or("?")
            );
            roles.stop(current, &self.bank);
            self.role.store(None);
        }

        match hw_device_reset(
            &self.bank,
            ControllerMode::Idle,
            self.config.disable_streaming,
            &self.platform,
            delay,
        ) {
            Ok(()) => {}
            Err(DeviceError::ModeMismatch) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Idle mode did not latch, continuing");
                self.bank.log_dump();
            }
            Err(e) => return Err(e),
        }

        if target == Role::Peripheral {
            self.wait_vbus_lower_bsv(delay);
        }

        roles.start(target, &self.bank).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::error!("Cannot start {} role: {}", target, e);
            e
        })?;
        self.role.store(Some(target));

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Switched to {} role ({=str})",
            target,
            roles.name::<IO>(target).unwrap_or("?")
        );

        if target == Role::Peripheral && self.bank.read(Reg::Otgsc, Otgsc::B_SESSION_VALID.bits()) != 0 {
            roles.vbus_session(true, &self.bank);
        }

        Ok(())
    }

    /// Wait for the session left over from the host role to end
    ///
    /// Gives up after [`timeouts::VBUS_STABLE_TIMEOUT_MS`] and lets the
    /// transition proceed.
    fn wait_vbus_lower_bsv<D: DelayNs>(&self, delay: &mut D) {
        let timeout = RegisterTimeout::new_ms(timeouts::VBUS_STABLE_TIMEOUT_MS, timeouts::VBUS_POLL_MS);
        if self
            .bank
            .wait(Reg::Otgsc, Otgsc::B_SESSION_VALID.bits(), 0, timeout, delay)
            .is_err()
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("Timeout waiting for VBUS below B session valid");
        }
    }
}
