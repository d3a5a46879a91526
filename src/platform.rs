//! Platform configuration and services consumed by the core
//!
//! The core never touches clocks, regulators, the interrupt controller or
//! the power-management framework directly. The board or OS layer
//! provides those through [`Platform`] and describes the controller
//! instance through [`PlatformConfig`].

use crate::ci::IMXRT_CAP_OFFSET;

/// Which roles the board wires up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrMode {
    /// Host role only; a peripheral module is ignored if installed
    HostOnly,
    /// Peripheral role only; a host module is ignored if installed
    PeripheralOnly,
    /// Both roles, switched by the ID pin
    Otg,
}

/// Events the core reports to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CiEvent {
    /// The controller just came out of a soft reset
    ControllerReset,
    /// The controller entered low power
    LowPowerEntered,
    /// The controller left low power
    LowPowerExited,
}

/// Static description of one controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Dual-role mode
    pub dr_mode: DrMode,
    /// Offset of the capability registers from the register block base
    pub cap_offset: usize,
    /// Set USBMODE.SDIS after every reset
    pub disable_streaming: bool,
    /// The controller interrupt may wake the system from sleep
    pub wakeup_capable: bool,
}

impl PlatformConfig {
    /// OTG configuration with the i.MX RT capability offset
    pub const fn new() -> Self {
        Self {
            dr_mode: DrMode::Otg,
            cap_offset: IMXRT_CAP_OFFSET,
            disable_streaming: false,
            wakeup_capable: false,
        }
    }

    /// Set the dual-role mode
    pub const fn dr_mode(mut self, dr_mode: DrMode) -> Self {
        self.dr_mode = dr_mode;
        self
    }

    /// Set the capability register offset
    pub const fn cap_offset(mut self, cap_offset: usize) -> Self {
        self.cap_offset = cap_offset;
        self
    }

    /// Enable/disable stream disable mode
    pub const fn disable_streaming(mut self, disable: bool) -> Self {
        self.disable_streaming = disable;
        self
    }

    /// Mark the controller as a system wakeup source
    pub const fn wakeup_capable(mut self, capable: bool) -> Self {
        self.wakeup_capable = capable;
        self
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Services the board or OS layer provides to the core
///
/// Methods take `&self` because they are called from the interrupt
/// front-end, the deferred worker and the power hooks alike.
pub trait Platform {
    /// Mask the controller interrupt line without waiting for a running handler
    fn disable_irq(&self);

    /// Unmask the controller interrupt line
    fn enable_irq(&self);

    /// Queue a call to [`Controller::process_work`](crate::Controller::process_work)
    /// outside interrupt context
    fn schedule_work(&self) {}

    /// Controller event notification
    fn notify_event(&self, _event: CiEvent) {}

    /// Put the PHY into or out of suspend
    fn phy_set_suspend(&self, _suspend: bool) {}

    /// Configure wakeup sources in the vendor "misc" block before suspend,
    /// and tear them down after resume
    fn configure_wakeup(&self, _enable: bool) {}

    /// Arm or disarm the controller interrupt as a system wake source
    fn set_irq_wake(&self, _enable: bool) {}

    /// Take a runtime-PM reference, resuming the device synchronously
    fn runtime_get(&self) {}

    /// Drop a runtime-PM reference
    fn runtime_put(&self) {}

    /// Ask for an asynchronous runtime resume; the reference taken here is
    /// released by [`Controller::runtime_resume`](crate::Controller::runtime_resume)
    fn request_resume(&self) {}
}

impl<T: Platform + ?Sized> Platform for &T {
    fn disable_irq(&self) {
        (**self).disable_irq()
    }

    fn enable_irq(&self) {
        (**self).enable_irq()
    }

    fn schedule_work(&self) {
        (**self).schedule_work()
    }

    fn notify_event(&self, event: CiEvent) {
        (**self).notify_event(event)
    }

    fn phy_set_suspend(&self, suspend: bool) {
        (**self).phy_set_suspend(suspend)
    }

    fn configure_wakeup(&self, enable: bool) {
        (**self).configure_wakeup(enable)
    }

    fn set_irq_wake(&self, enable: bool) {
        (**self).set_irq_wake(enable)
    }

    fn runtime_get(&self) {
        (**self).runtime_get()
    }

    fn runtime_put(&self) {
        (**self).runtime_put()
    }

    fn request_resume(&self) {
        (**self).request_resume()
    }
}
