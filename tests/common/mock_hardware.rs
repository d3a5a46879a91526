//! Mock hardware for testing without a controller
//!
//! Provides a simulated ChipIdea register file, a recording platform and
//! recording role modules.

use imxrt_usb_otg::ci::{
    ControllerMode, DcCparams, HcCparams, HwBank, Otgsc, PortSc, Reg, RegisterIo,
    RegisterLayout, RegisterMap, UsbCmd, UsbMode, IMXRT_CAP_OFFSET,
};
use imxrt_usb_otg::{CiEvent, IrqReturn, PeripheralDriver, Platform, RoleDriver, RoleError};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// CAPLENGTH of the i.MX RT controllers
pub const CAP_LENGTH: usize = 0x40;

/// OTGSC bits that reflect pin and comparator state
const OTGSC_READ_ONLY: u32 = 0x7F << 8;

struct RegState {
    regs: HashMap<usize, u32>,
    writes: Vec<(usize, u32)>,
    reset_stuck: bool,
    mode_stuck: Option<u32>,
    phcd_stuck: bool,
    bsv_drop_after: Option<u32>,
}

/// Simulated register file at the i.MX RT offsets
///
/// USBCMD.RST self-clears and idles USBMODE, USBSTS and the OTGSC status
/// bits are write-1-to-clear, OTGSC pin state is read-only, and PHCD
/// acknowledges immediately. Every write is logged.
pub struct MockRegs {
    map: RegisterMap,
    state: RefCell<RegState>,
}

impl MockRegs {
    /// Legacy layout, 8 endpoint pairs, ID grounded, no session
    pub fn new() -> Self {
        Self::with_config(false, 8)
    }

    /// LPM layout, 8 endpoint pairs
    pub fn lpm() -> Self {
        Self::with_config(true, 8)
    }

    /// Layout and DCCPARAMS.DEN of choice
    pub fn with_config(lpm: bool, den: u32) -> Self {
        let map = RegisterMap::new(
            IMXRT_CAP_OFFSET,
            IMXRT_CAP_OFFSET + CAP_LENGTH,
            RegisterLayout::from_lpm_bit(lpm),
        );
        let mut regs = HashMap::new();
        regs.insert(map.offset(Reg::Caplength), 0x0100_0000 | CAP_LENGTH as u32);
        regs.insert(map.offset(Reg::Hcsparams), 0x0001_0011);
        let hccparams = if lpm { HcCparams::LPM.bits() } else { 0 };
        regs.insert(map.offset(Reg::Hccparams), hccparams | 0x0000_0006);
        let dccparams = (DcCparams::DEVICE_CAPABLE | DcCparams::HOST_CAPABLE).bits()
            | (den & DcCparams::ENDPOINT_COUNT_MASK.bits());
        regs.insert(map.offset(Reg::Dccparams), dccparams);

        Self {
            map,
            state: RefCell::new(RegState {
                regs,
                writes: Vec::new(),
                reset_stuck: false,
                mode_stuck: None,
                phcd_stuck: false,
                bsv_drop_after: None,
            }),
        }
    }

    /// Offsets the controller is expected to use
    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Raw register value, without side effects
    pub fn peek(&self, reg: Reg) -> u32 {
        self.peek_offset(self.map.offset(reg))
    }

    /// Raw register value at a byte offset, without side effects
    pub fn peek_offset(&self, offset: usize) -> u32 {
        self.state.borrow().regs.get(&offset).copied().unwrap_or(0)
    }

    /// Force a register value, bypassing write semantics and the log
    pub fn poke(&self, reg: Reg, value: u32) {
        let offset = self.map.offset(reg);
        self.state.borrow_mut().regs.insert(offset, value);
    }

    fn update_otgsc(&self, f: impl FnOnce(u32) -> u32) {
        let offset = self.map.offset(Reg::Otgsc);
        let mut state = self.state.borrow_mut();
        let old = state.regs.get(&offset).copied().unwrap_or(0);
        state.regs.insert(offset, f(old));
    }

    /// Drive the ID pin, latching IDIS on a change
    pub fn set_id(&self, floating: bool) {
        self.update_otgsc(|old| {
            let was = old & Otgsc::ID.bits() != 0;
            let mut new = old & !Otgsc::ID.bits();
            if floating {
                new |= Otgsc::ID.bits();
            }
            if was != floating {
                new |= Otgsc::ID_INTERRUPT_STATUS.bits();
            }
            new
        });
    }

    /// Drive B session valid, latching BSVIS on a change
    pub fn set_bsv(&self, valid: bool) {
        self.update_otgsc(|old| {
            let was = old & Otgsc::B_SESSION_VALID.bits() != 0;
            let mut new = old & !Otgsc::B_SESSION_VALID.bits();
            if valid {
                new |= Otgsc::B_SESSION_VALID.bits();
            }
            if was != valid {
                new |= Otgsc::B_SESSION_VALID_STATUS.bits();
            }
            new
        });
    }

    /// USBCMD.RST never self-clears
    pub fn stick_reset(&self) {
        self.state.borrow_mut().reset_stuck = true;
    }

    /// USBMODE.CM always reads back `cm`
    pub fn stick_mode(&self, cm: ControllerMode) {
        self.state.borrow_mut().mode_stuck = Some(cm.bits());
    }

    /// PORTSC.PHCD ignores writes of zero
    pub fn stick_phcd(&self) {
        self.state.borrow_mut().phcd_stuck = true;
    }

    /// BSV drops after `reads` more OTGSC reads
    pub fn drop_bsv_after(&self, reads: u32) {
        self.state.borrow_mut().bsv_drop_after = Some(reads);
    }

    /// Every write so far as `(offset, value)`
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.state.borrow().writes.clone()
    }

    /// Writes so far to `reg`
    pub fn writes_to(&self, reg: Reg) -> Vec<u32> {
        let offset = self.map.offset(reg);
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Forget the write log
    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    /// Whether the PHY is in low power
    pub fn phcd(&self) -> bool {
        let phcd = PortSc::phy_low_power(self.map.layout().is_lpm()).bits();
        self.peek(Reg::Portsc) & phcd != 0
    }

    /// Current USBMODE.CM
    pub fn controller_mode(&self) -> u32 {
        self.peek(Reg::Usbmode) & UsbMode::CONTROLLER_MODE_MASK.bits()
    }
}

impl Default for MockRegs {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterIo for MockRegs {
    fn read(&self, offset: usize) -> u32 {
        let mut state = self.state.borrow_mut();
        if offset == self.map.offset(Reg::Otgsc) {
            match state.bsv_drop_after {
                Some(0) => {
                    state.bsv_drop_after = None;
                    if let Some(otgsc) = state.regs.get_mut(&offset) {
                        *otgsc &= !Otgsc::B_SESSION_VALID.bits();
                    }
                }
                Some(n) => state.bsv_drop_after = Some(n - 1),
                None => {}
            }
        }
        state.regs.get(&offset).copied().unwrap_or(0)
    }

    fn write(&self, offset: usize, value: u32) {
        let map = self.map;
        let mut state = self.state.borrow_mut();
        state.writes.push((offset, value));
        let old = state.regs.get(&offset).copied().unwrap_or(0);

        let cm = UsbMode::CONTROLLER_MODE_MASK.bits();
        let phcd = PortSc::phy_low_power(map.layout().is_lpm()).bits();

        let new = if offset == map.offset(Reg::Usbsts) {
            old & !value
        } else if offset == map.offset(Reg::Otgsc) {
            let status = Otgsc::INT_STATUS_BITS;
            (old & OTGSC_READ_ONLY)
                | (old & status & !value)
                | (value & !status & !OTGSC_READ_ONLY)
        } else if offset == map.offset(Reg::Usbcmd) {
            if value & UsbCmd::RESET.bits() != 0 && !state.reset_stuck {
                let usbmode = map.offset(Reg::Usbmode);
                state.regs.insert(usbmode, 0);
                value & !UsbCmd::RESET.bits()
            } else {
                value
            }
        } else if offset == map.offset(Reg::Usbmode) {
            match state.mode_stuck {
                Some(stuck) => (value & !cm) | stuck,
                None => value,
            }
        } else if offset == map.offset(Reg::Portsc) {
            if state.phcd_stuck {
                value | (old & phcd)
            } else {
                value
            }
        } else if offset == map.offset(Reg::Endptflush) {
            0
        } else if offset >= map.cap_base() && offset < map.op_base() {
            old
        } else {
            value
        };
        state.regs.insert(offset, new);
    }
}

/// Calls observed by [`MockPlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCall {
    DisableIrq,
    EnableIrq,
    ScheduleWork,
    Event(CiEvent),
    PhySuspend(bool),
    ConfigureWakeup(bool),
    IrqWake(bool),
    RuntimeGet,
    RuntimePut,
    RequestResume,
}

/// Platform that records every call and tracks the interrupt line
pub struct MockPlatform {
    irq_enabled: Cell<bool>,
    calls: RefCell<Vec<PlatformCall>>,
}

impl MockPlatform {
    /// Line starts masked, as before probe
    pub fn new() -> Self {
        Self {
            irq_enabled: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Whether the interrupt line is unmasked
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.get()
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.borrow().clone()
    }

    /// How many times `call` was made
    pub fn count(&self, call: PlatformCall) -> usize {
        self.calls.borrow().iter().filter(|c| **c == call).count()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: PlatformCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn disable_irq(&self) {
        self.irq_enabled.set(false);
        self.record(PlatformCall::DisableIrq);
    }

    fn enable_irq(&self) {
        self.irq_enabled.set(true);
        self.record(PlatformCall::EnableIrq);
    }

    fn schedule_work(&self) {
        self.record(PlatformCall::ScheduleWork);
    }

    fn notify_event(&self, event: CiEvent) {
        self.record(PlatformCall::Event(event));
    }

    fn phy_set_suspend(&self, suspend: bool) {
        self.record(PlatformCall::PhySuspend(suspend));
    }

    fn configure_wakeup(&self, enable: bool) {
        self.record(PlatformCall::ConfigureWakeup(enable));
    }

    fn set_irq_wake(&self, enable: bool) {
        self.record(PlatformCall::IrqWake(enable));
    }

    fn runtime_get(&self) {
        self.record(PlatformCall::RuntimeGet);
    }

    fn runtime_put(&self) {
        self.record(PlatformCall::RuntimePut);
    }

    fn request_resume(&self) {
        self.record(PlatformCall::RequestResume);
    }
}

/// Calls observed by the mock role modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCall {
    Init,
    Start,
    Stop,
    Interrupt,
    VbusConnect,
    VbusDisconnect,
}

/// Host role module that records its calls
pub struct MockHost {
    pub calls: Vec<RoleCall>,
    pub fail_start: bool,
    pub irq_result: IrqReturn,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_start: false,
            irq_result: IrqReturn::Handled,
        }
    }

    /// Host whose `start` always fails
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    pub fn count(&self, call: RoleCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl<IO: RegisterIo> RoleDriver<IO> for MockHost {
    fn name(&self) -> &'static str {
        "mock-host"
    }

    fn init(&mut self, _bank: &HwBank<IO>) -> Result<(), RoleError> {
        self.calls.push(RoleCall::Init);
        Ok(())
    }

    fn start(&mut self, bank: &HwBank<IO>) -> Result<(), RoleError> {
        self.calls.push(RoleCall::Start);
        if self.fail_start {
            return Err(RoleError::StartFailed);
        }
        bank.write(
            Reg::Usbmode,
            UsbMode::CONTROLLER_MODE_MASK.bits(),
            ControllerMode::Host.bits(),
        );
        bank.set_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());
        Ok(())
    }

    fn stop(&mut self, bank: &HwBank<IO>) {
        self.calls.push(RoleCall::Stop);
        bank.clear_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());
    }

    fn handle_interrupt(&mut self, _bank: &HwBank<IO>) -> IrqReturn {
        self.calls.push(RoleCall::Interrupt);
        self.irq_result
    }
}

/// Peripheral role module that records its calls
pub struct MockGadget {
    pub calls: Vec<RoleCall>,
    pub fail_start: bool,
    pub irq_result: IrqReturn,
}

impl MockGadget {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_start: false,
            irq_result: IrqReturn::Handled,
        }
    }

    /// Gadget whose `start` always fails
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    pub fn count(&self, call: RoleCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Default for MockGadget {
    fn default() -> Self {
        Self::new()
    }
}

impl<IO: RegisterIo> RoleDriver<IO> for MockGadget {
    fn name(&self) -> &'static str {
        "mock-gadget"
    }

    fn init(&mut self, _bank: &HwBank<IO>) -> Result<(), RoleError> {
        self.calls.push(RoleCall::Init);
        Ok(())
    }

    fn start(&mut self, bank: &HwBank<IO>) -> Result<(), RoleError> {
        self.calls.push(RoleCall::Start);
        if self.fail_start {
            return Err(RoleError::StartFailed);
        }
        bank.write(
            Reg::Usbmode,
            UsbMode::CONTROLLER_MODE_MASK.bits(),
            ControllerMode::Device.bits(),
        );
        Ok(())
    }

    fn stop(&mut self, bank: &HwBank<IO>) {
        self.calls.push(RoleCall::Stop);
        bank.clear_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());
    }

    fn handle_interrupt(&mut self, _bank: &HwBank<IO>) -> IrqReturn {
        self.calls.push(RoleCall::Interrupt);
        self.irq_result
    }
}

impl<IO: RegisterIo> PeripheralDriver<IO> for MockGadget {
    fn vbus_connect(&mut self, bank: &HwBank<IO>) {
        self.calls.push(RoleCall::VbusConnect);
        bank.set_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());
    }

    fn vbus_disconnect(&mut self, bank: &HwBank<IO>) {
        self.calls.push(RoleCall::VbusDisconnect);
        bank.clear_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());
    }
}
