//! Dual-role controller: probe, removal and shared state
//!
//! A [`Controller`] owns the register bank, the installed role modules and
//! the platform services of one ChipIdea instance. Its methods take
//! `&self` so the interrupt front-end ([`Controller::handle_irq`]), the
//! deferred worker ([`Controller::process_work`]) and the power hooks can
//! run from their own contexts against one shared instance.

use crate::ci::{
    hw_device_init, hw_device_reset, timeouts, ControllerMode, HwBank, Otgsc, Reg, RegisterIo,
};
use crate::error::{DeviceError, Result};
use crate::irq::WorkSlot;
use crate::platform::{Platform, PlatformConfig};
use crate::pm::PowerState;
use crate::role::{PeripheralDriver, Role, RoleCell, RoleDriver, RoleSet};
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::delay::DelayNs;
use spin::Mutex;

/// One ChipIdea dual-role controller
pub struct Controller<IO, H, G, PL> {
    pub(crate) bank: HwBank<IO>,
    pub(crate) roles: Mutex<RoleSet<H, G>>,
    /// Transition lock shared by the worker and the power hooks
    pub(crate) power: Mutex<PowerState>,
    pub(crate) platform: PL,
    pub(crate) config: PlatformConfig,
    pub(crate) role: RoleCell,
    pub(crate) is_otg: bool,
    pub(crate) work: WorkSlot,
    pub(crate) id_event: AtomicBool,
    pub(crate) vbus_event: AtomicBool,
    pub(crate) in_lpm: AtomicBool,
    pub(crate) wakeup_int: AtomicBool,
    /// Set while the interrupt is armed as a system wake source
    pub(crate) irq_wake_armed: AtomicBool,
}

impl<IO, H, G, PL> Controller<IO, H, G, PL>
where
    IO: RegisterIo,
    H: RoleDriver<IO>,
    G: PeripheralDriver<IO>,
    PL: Platform,
{
    /// Bring up the controller and start its initial role
    ///
    /// Role modules the configured [`DrMode`](crate::DrMode) excludes are
    /// dropped. With both modules left the controller is OTG capable and
    /// the initial role follows the debounced ID pin; otherwise the single
    /// module's role is forced. The interrupt line is enabled last.
    pub fn probe<D: DelayNs>(
        io: IO,
        mut roles: RoleSet<H, G>,
        platform: PL,
        config: PlatformConfig,
        delay: &mut D,
    ) -> Result<Self> {
        let bank = hw_device_init(io, config.cap_offset, delay)?;
        hw_device_reset(
            &bank,
            ControllerMode::Idle,
            config.disable_streaming,
            &platform,
            delay,
        )?;

        let (_ignored_host, _ignored_peripheral) = roles.restrict(config.dr_mode);
        #[cfg(feature = "defmt")]
        {
            if _ignored_host.is_some() || _ignored_peripheral.is_some() {
                defmt::debug!("Ignoring role module excluded by {}", config.dr_mode);
            }
        }
        if roles.is_empty() {
            #[cfg(feature = "defmt")]
            defmt::error!("No role module usable in {}", config.dr_mode);
            return Err(DeviceError::NoRoles);
        }

        roles.init(&bank)?;

        let is_otg = roles.is_dual();
        let initial = match roles.sole_role() {
            Some(role) => role,
            None => {
                delay.delay_us(timeouts::ID_DEBOUNCE_US);
                Role::from_id(bank.read(Reg::Otgsc, Otgsc::ID.bits()) != 0)
            }
        };

        roles.start(initial, &bank).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::error!("Cannot start {} role: {}", initial, e);
            e
        })?;
        if initial == Role::Peripheral && bank.read(Reg::Otgsc, Otgsc::B_SESSION_VALID.bits()) != 0 {
            roles.vbus_session(true, &bank);
        }

        bank.write(Reg::Otgsc, Otgsc::INT_STATUS_BITS, Otgsc::INT_STATUS_BITS);
        let mut enables = Otgsc::empty();
        if is_otg {
            enables |= Otgsc::ID_INTERRUPT_ENABLE;
        }
        if roles.has(Role::Peripheral) {
            enables |= Otgsc::B_SESSION_VALID_ENABLE;
        }
        if !enables.is_empty() {
            bank.set_bits(Reg::Otgsc, enables.bits());
        }

        #[cfg(feature = "defmt")]
        defmt::info!("Controller up in {} role, otg = {}", initial, is_otg);

        let controller = Self {
            bank,
            roles: Mutex::new(roles),
            power: Mutex::new(PowerState::Active),
            platform,
            config,
            role: RoleCell::new(),
            is_otg,
            work: WorkSlot::new(),
            id_event: AtomicBool::new(false),
            vbus_event: AtomicBool::new(false),
            in_lpm: AtomicBool::new(false),
            wakeup_int: AtomicBool::new(false),
            irq_wake_armed: AtomicBool::new(false),
        };
        controller.role.store(Some(initial));
        controller.platform.enable_irq();
        Ok(controller)
    }

    /// Stop the active role, idle the controller and hand back its parts
    pub fn remove<D: DelayNs>(self, delay: &mut D) -> (IO, RoleSet<H, G>, PL) {
        self.platform.disable_irq();
        self.bank.clear_bits(Reg::Otgsc, Otgsc::INT_ENABLE_BITS);

        let Self {
            bank,
            roles,
            platform,
            config,
            role,
            ..
        } = self;
        let mut roles = roles.into_inner();

        if let Some(current) = role.load() {
            roles.stop(current, &bank);
            role.store(None);
        }

        if let Err(_e) = hw_device_reset(
            &bank,
            ControllerMode::Idle,
            config.disable_streaming,
            &platform,
            delay,
        ) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Reset on removal failed: {}", _e);
        }

        (bank.into_io(), roles, platform)
    }

    /// Switch to `role` on request, outside the ID pin logic
    ///
    /// The interrupt line stays masked for the whole transition. Fails with
    /// [`DeviceError::Busy`] while an OTG event waits for the worker, which
    /// owns the line until it has run.
    pub fn set_role<D: DelayNs>(&self, role: Role, delay: &mut D) -> Result<()> {
        if !self.roles.lock().has(role) {
            return Err(DeviceError::RoleNotInstalled);
        }
        if self.work.is_pending() || self.events_pending() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Role override refused, OTG event pending");
            return Err(DeviceError::Busy);
        }

        self.platform.runtime_get();
        self.platform.disable_irq();
        let result = {
            let _power = self.power.lock();
            self.switch_to(role, delay)
        };
        // An event latched before the mask went up is left to the worker
        if !self.work.is_pending() && !self.events_pending() {
            self.platform.enable_irq();
        }
        self.platform.runtime_put();
        result
    }
}

impl<IO: RegisterIo, H, G, PL> Controller<IO, H, G, PL> {
    /// Active role, `None` after a failed transition
    pub fn role(&self) -> Option<Role> {
        self.role.load()
    }

    /// Whether both roles are available and the ID pin selects between them
    pub fn is_otg(&self) -> bool {
        self.is_otg
    }

    /// Register bank
    pub fn bank(&self) -> &HwBank<IO> {
        &self.bank
    }

    /// Platform services
    pub fn platform(&self) -> &PL {
        &self.platform
    }

    /// Configuration given at probe
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Whether an interrupt queued work that has not run yet
    pub fn work_pending(&self) -> bool {
        self.work.is_pending()
    }

    /// Run `f` with the role modules locked
    pub fn with_roles<R>(&self, f: impl FnOnce(&mut RoleSet<H, G>) -> R) -> R {
        f(&mut self.roles.lock())
    }

    /// Role the ID pin currently selects
    pub(crate) fn id_role(&self) -> Role {
        Role::from_id(self.bank.read(Reg::Otgsc, Otgsc::ID.bits()) != 0)
    }

    pub(crate) fn events_pending(&self) -> bool {
        self.id_event.load(Ordering::Acquire) || self.vbus_event.load(Ordering::Acquire)
    }
}
