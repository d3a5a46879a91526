//! Role modules and the per-controller role set
//!
//! The Host and Peripheral protocol stacks live outside this crate. They
//! plug in through [`RoleDriver`] (and [`PeripheralDriver`] for the
//! VBUS session notifications only a peripheral needs). A controller owns
//! at most one module of each kind in a [`RoleSet`]; [`NoRole`] fills a
//! slot that a board never populates.

use crate::ci::{HwBank, RegisterIo};
use crate::error::{DeviceError, Result, RoleError};
use crate::irq::IrqReturn;
use crate::platform::DrMode;
use core::sync::atomic::{AtomicU8, Ordering};

/// Controller role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// USB host
    Host,
    /// USB peripheral ("gadget")
    Peripheral,
}

impl Role {
    /// Role implied by OTGSC.ID: floating selects the peripheral role
    #[inline(always)]
    pub const fn from_id(id_floating: bool) -> Self {
        if id_floating {
            Self::Peripheral
        } else {
            Self::Host
        }
    }

    /// Short role name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Peripheral => "gadget",
        }
    }
}

/// A Host or Peripheral protocol stack driven by the core
///
/// `start` must leave the controller in the role's USBMODE and running;
/// `stop` must quiesce all traffic of the role before returning.
pub trait RoleDriver<IO: RegisterIo> {
    /// Module name for diagnostics
    fn name(&self) -> &'static str;

    /// One-time setup at probe
    fn init(&mut self, _bank: &HwBank<IO>) -> core::result::Result<(), RoleError> {
        Ok(())
    }

    /// Bring the role up
    fn start(&mut self, bank: &HwBank<IO>) -> core::result::Result<(), RoleError>;

    /// Take the role down
    fn stop(&mut self, bank: &HwBank<IO>);

    /// Service a controller interrupt that is not an OTG event
    fn handle_interrupt(&mut self, bank: &HwBank<IO>) -> IrqReturn;
}

/// Peripheral-side VBUS session notifications
pub trait PeripheralDriver<IO: RegisterIo>: RoleDriver<IO> {
    /// VBUS became valid
    fn vbus_connect(&mut self, bank: &HwBank<IO>);

    /// VBUS went away
    fn vbus_disconnect(&mut self, bank: &HwBank<IO>);
}

/// Placeholder for a role slot that is never populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRole {}

impl<IO: RegisterIo> RoleDriver<IO> for NoRole {
    fn name(&self) -> &'static str {
        match *self {}
    }

    fn start(&mut self, _bank: &HwBank<IO>) -> core::result::Result<(), RoleError> {
        match *self {}
    }

    fn stop(&mut self, _bank: &HwBank<IO>) {
        match *self {}
    }

    fn handle_interrupt(&mut self, _bank: &HwBank<IO>) -> IrqReturn {
        match *self {}
    }
}

impl<IO: RegisterIo> PeripheralDriver<IO> for NoRole {
    fn vbus_connect(&mut self, _bank: &HwBank<IO>) {
        match *self {}
    }

    fn vbus_disconnect(&mut self, _bank: &HwBank<IO>) {
        match *self {}
    }
}

/// Installed role modules of one controller
pub struct RoleSet<H, G> {
    host: Option<H>,
    peripheral: Option<G>,
}

impl<H> RoleSet<H, NoRole> {
    /// Host module only
    pub const fn host_only(host: H) -> Self {
        Self {
            host: Some(host),
            peripheral: None,
        }
    }
}

impl<G> RoleSet<NoRole, G> {
    /// Peripheral module only
    pub const fn peripheral_only(peripheral: G) -> Self {
        Self {
            host: None,
            peripheral: Some(peripheral),
        }
    }
}

impl<H, G> RoleSet<H, G> {
    /// Both modules
    pub const fn dual(host: H, peripheral: G) -> Self {
        Self {
            host: Some(host),
            peripheral: Some(peripheral),
        }
    }

    /// Arbitrary population, including none
    pub const fn new(host: Option<H>, peripheral: Option<G>) -> Self {
        Self { host, peripheral }
    }

    /// Whether a module is installed for `role`
    pub const fn has(&self, role: Role) -> bool {
        match role {
            Role::Host => self.host.is_some(),
            Role::Peripheral => self.peripheral.is_some(),
        }
    }

    /// Whether both modules are installed
    pub const fn is_dual(&self) -> bool {
        self.host.is_some() && self.peripheral.is_some()
    }

    /// Whether no module is installed
    pub const fn is_empty(&self) -> bool {
        self.host.is_none() && self.peripheral.is_none()
    }

    /// Installed host module
    pub fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    /// Installed peripheral module
    pub fn peripheral(&self) -> Option<&G> {
        self.peripheral.as_ref()
    }

    /// Installed host module, mutably
    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    /// Installed peripheral module, mutably
    pub fn peripheral_mut(&mut self) -> Option<&mut G> {
        self.peripheral.as_mut()
    }

    /// Split into the two slots
    pub fn into_parts(self) -> (Option<H>, Option<G>) {
        (self.host, self.peripheral)
    }

    /// Keep only the modules the dual-role mode allows
    ///
    /// Dropped modules are handed back so the caller can reclaim them.
    pub(crate) fn restrict(&mut self, dr_mode: DrMode) -> (Option<H>, Option<G>) {
        match dr_mode {
            DrMode::HostOnly => (None, self.peripheral.take()),
            DrMode::PeripheralOnly => (self.host.take(), None),
            DrMode::Otg => (None, None),
        }
    }

    /// The single installed role, or `None` when zero or two are installed
    pub const fn sole_role(&self) -> Option<Role> {
        match (&self.host, &self.peripheral) {
            (Some(_), None) => Some(Role::Host),
            (None, Some(_)) => Some(Role::Peripheral),
            _ => None,
        }
    }
}

impl<H, G> RoleSet<H, G> {
    /// Name of the module installed for `role`
    pub fn name<IO>(&self, role: Role) -> Option<&'static str>
    where
        IO: RegisterIo,
        H: RoleDriver<IO>,
        G: PeripheralDriver<IO>,
    {
        match role {
            Role::Host => self.host.as_ref().map(|h| h.name()),
            Role::Peripheral => self.peripheral.as_ref().map(|g| g.name()),
        }
    }

    pub(crate) fn init<IO>(&mut self, bank: &HwBank<IO>) -> Result<()>
    where
        IO: RegisterIo,
        H: RoleDriver<IO>,
        G: PeripheralDriver<IO>,
    {
        if let Some(host) = self.host.as_mut() {
            host.init(bank)?;
        }
        if let Some(peripheral) = self.peripheral.as_mut() {
            peripheral.init(bank)?;
        }
        Ok(())
    }

    pub(crate) fn start<IO>(&mut self, role: Role, bank: &HwBank<IO>) -> Result<()>
    where
        IO: RegisterIo,
        H: RoleDriver<IO>,
        G: PeripheralDriver<IO>,
    {
        let result = match role {
            Role::Host => self.host.as_mut().map(|h| h.start(bank)),
            Role::Peripheral => self.peripheral.as_mut().map(|g| g.start(bank)),
        };
        match result {
            Some(started) => started.map_err(DeviceError::from),
            None => Err(DeviceError::RoleNotInstalled),
        }
    }

    pub(crate) fn stop<IO>(&mut self, role: Role, bank: &HwBank<IO>)
    where
        IO: RegisterIo,
        H: RoleDriver<IO>,
        G: PeripheralDriver<IO>,
    {
        match role {
            Role::Host => {
                if let Some(host) = self.host.as_mut() {
                    host.stop(bank);
                }
            }
            Role::Peripheral => {
                if let Some(peripheral) = self.peripheral.as_mut() {
                    peripheral.stop(bank);
                }
            }
        }
    }

    pub(crate) fn handle_interrupt<IO>(&mut self, role: Role, bank: &HwBank<IO>) -> IrqReturn
    where
        IO: RegisterIo,
        H: RoleDriver<IO>,
        G: PeripheralDriver<IO>,
    {
        let handled = match role {
            Role::Host => self.host.as_mut().map(|h| h.handle_interrupt(bank)),
            Role::Peripheral => self.peripheral.as_mut().map(|g| g.handle_interrupt(bank)),
        };
        handled.unwrap_or(IrqReturn::NotHandled)
    }

    /// Forward a VBUS session change to the peripheral module
    ///
    /// Returns `false` when no peripheral module is installed.
    pub(crate) fn vbus_session<IO>(&mut self, session_valid: bool, bank: &HwBank<IO>) -> bool
    where
        IO: RegisterIo,
        G: PeripheralDriver<IO>,
    {
        match self.peripheral.as_mut() {
            Some(peripheral) if session_valid => {
                peripheral.vbus_connect(bank);
                true
            }
            Some(peripheral) => {
                peripheral.vbus_disconnect(bank);
                true
            }
            None => false,
        }
    }
}

const ROLE_NONE: u8 = 0;
const ROLE_HOST: u8 = 1;
const ROLE_PERIPHERAL: u8 = 2;

/// Current role, readable from interrupt context without locking
pub(crate) struct RoleCell(AtomicU8);

impl RoleCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ROLE_NONE))
    }

    pub(crate) fn load(&self) -> Option<Role> {
        match self.0.load(Ordering::Acquire) {
            ROLE_HOST => Some(Role::Host),
            ROLE_PERIPHERAL => Some(Role::Peripheral),
            _ => None,
        }
    }

    pub(crate) fn store(&self, role: Option<Role>) {
        let raw = match role {
            None => ROLE_NONE,
            Some(Role::Host) => ROLE_HOST,
            Some(Role::Peripheral) => ROLE_PERIPHERAL,
        };
        self.0.store(raw, Ordering::Release);
    }
}
