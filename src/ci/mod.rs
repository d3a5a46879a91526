//! ChipIdea dual-role USB controller hardware layer
//!
//! Register bit definitions and the register access stack for the
//! ChipIdea-derived controller used on i.MX RT (USB_OTG1/USB_OTG2).
//!
//! # Register Memory Layout
//!
//! The controller registers are divided into:
//! - Capability Registers (read-only, at `cap_offset` from the block base)
//! - Operational Registers (read-write, at CAPLENGTH past the capability base)
//!
//! Two operational offset tables exist, selected by HCCPARAMS.LEN. See
//! [`regmap`] for both.
//!
//! The register references are:
//! - i.MX RT1060 Reference Manual, Chapter 42 (USB OTG Controller)
//! - EHCI Specification Section 2 (capability registers)

pub mod bank;
pub mod device;
pub mod register;
pub mod regmap;

pub use bank::HwBank;
pub use device::{hw_device_init, hw_device_reset, hw_phy_low_power};
pub use register::{Mmio, RegisterIo, RegisterTimeout};
pub use regmap::{Reg, RegisterLayout, RegisterMap};

use bitflags::bitflags;

/// Base address of the USB_OTG1 register block on i.MX RT1062
pub const USB1_BASE: usize = 0x402E_0000;

/// Base address of the USB_OTG2 register block on i.MX RT1062
pub const USB2_BASE: usize = 0x402E_0200;

/// Capability registers sit this far into the i.MX RT register block
pub const IMXRT_CAP_OFFSET: usize = 0x100;

/// Maximum number of endpoints (IN and OUT counted separately)
pub const ENDPT_MAX: usize = 32;

/// Highest port test mode accepted by PORTSC.PTC
pub const TEST_MODE_MAX: u8 = 7;

/// Controller mode written to USBMODE.CM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ControllerMode {
    /// Controller idle, neither role active
    Idle = 0b00,
    /// Device (peripheral) controller
    Device = 0b10,
    /// Host controller
    Host = 0b11,
}

impl ControllerMode {
    /// Raw USBMODE.CM field value
    #[inline(always)]
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

bitflags! {
    /// USB Command Register (USBCMD) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsbCmd: u32 {
        /// Run/Stop (RS) - Bit 0
        const RUN_STOP = 1 << 0;
        /// Controller Reset (RST) - Bit 1, self-clearing
        const RESET = 1 << 1;
        /// Setup Tripwire (SUTW) - Bit 13
        const SETUP_TRIPWIRE = 1 << 13;
        /// Add dTD Tripwire (ATDTW) - Bit 14
        const ADD_DTD_TRIPWIRE = 1 << 14;
        /// Interrupt Threshold Control - Bits [23:16]
        const INTERRUPT_THRESHOLD_MASK = 0xFF << 16;
    }
}

bitflags! {
    /// USB Status Register (USBSTS) bit definitions, write-1-to-clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsbSts: u32 {
        /// USB Interrupt (UI) - Bit 0
        const USB_INTERRUPT = 1 << 0;
        /// USB Error Interrupt (UEI) - Bit 1
        const USB_ERROR_INTERRUPT = 1 << 1;
        /// Port Change Detect (PCI) - Bit 2
        const PORT_CHANGE_DETECT = 1 << 2;
        /// USB Reset Received (URI) - Bit 6
        const USB_RESET_RECEIVED = 1 << 6;
        /// DCSuspend (SLI) - Bit 8
        const SUSPEND = 1 << 8;
    }
}

bitflags! {
    /// USB Interrupt Enable Register (USBINTR) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsbIntr: u32 {
        /// USB Interrupt Enable - Bit 0
        const USB_INTERRUPT_ENABLE = 1 << 0;
        /// USB Error Interrupt Enable - Bit 1
        const USB_ERROR_INTERRUPT_ENABLE = 1 << 1;
        /// Port Change Interrupt Enable - Bit 2
        const PORT_CHANGE_INTERRUPT_ENABLE = 1 << 2;
        /// USB Reset Interrupt Enable - Bit 6
        const USB_RESET_ENABLE = 1 << 6;
        /// Sleep (suspend) Interrupt Enable - Bit 8
        const SLEEP_ENABLE = 1 << 8;
    }
}

bitflags! {
    /// Port Status and Control Register (PORTSC) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortSc: u32 {
        /// Force Port Resume (FPR) - Bit 6
        const FORCE_PORT_RESUME = 1 << 6;
        /// Suspend (SUSP) - Bit 7
        const SUSPEND = 1 << 7;
        /// High-Speed Port (HSP) - Bit 9, legacy layout only
        const HIGH_SPEED = 1 << 9;
        /// Port Test Control (PTC) - Bits [19:16]
        const PORT_TEST_CONTROL_MASK = 0xF << 16;
        /// PHY Low Power Suspend (PHCD) - Bit 22 on LPM layout
        const PHY_LOW_POWER_LPM = 1 << 22;
        /// PHY Low Power Suspend (PHCD) - Bit 23 on legacy layout
        const PHY_LOW_POWER = 1 << 23;
        /// Port Force Full Speed Connect (PFSC) - Bit 24
        const FORCE_FULL_SPEED = 1 << 24;
        /// Parallel Transceiver Select (PTS) - Bits [31:30]
        const TRANSCEIVER_SELECT_MASK = 0b11 << 30;
    }
}

impl PortSc {
    /// Shift of the PTC field
    pub const PORT_TEST_CONTROL_SHIFT: u32 = 16;

    /// PHCD bit for the given register layout
    #[inline(always)]
    pub const fn phy_low_power(lpm: bool) -> Self {
        if lpm {
            Self::PHY_LOW_POWER_LPM
        } else {
            Self::PHY_LOW_POWER
        }
    }
}

bitflags! {
    /// Device LPM Control Register (DEVLC) bit definitions, LPM layout only
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DevLc: u32 {
        /// Port Speed (PSPD) - Bits [27:25]
        const PORT_SPEED_MASK = 0b111 << 25;
        /// PSPD value for high speed
        const PORT_SPEED_HIGH = 0b010 << 25;
    }
}

bitflags! {
    /// OTG Status and Control Register (OTGSC) bit definitions
    ///
    /// Bits [22:16] are write-1-to-clear status; everything else is
    /// read-only state or read-write control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Otgsc: u32 {
        /// ID Pullup (IDPU) - Bit 5
        const ID_PULLUP = 1 << 5;
        /// USB ID (ID) - Bit 8: 1 = floating (B-device), 0 = grounded (A-device)
        const ID = 1 << 8;
        /// A VBus Valid (AVV) - Bit 9
        const A_VBUS_VALID = 1 << 9;
        /// A Session Valid (ASV) - Bit 10
        const A_SESSION_VALID = 1 << 10;
        /// B Session Valid (BSV) - Bit 11
        const B_SESSION_VALID = 1 << 11;
        /// B Session End (BSE) - Bit 12
        const B_SESSION_END = 1 << 12;
        /// USB ID Interrupt Status (IDIS) - Bit 16
        const ID_INTERRUPT_STATUS = 1 << 16;
        /// A VBus Valid Interrupt Status (AVVIS) - Bit 17
        const A_VBUS_VALID_STATUS = 1 << 17;
        /// A Session Valid Interrupt Status (ASVIS) - Bit 18
        const A_SESSION_VALID_STATUS = 1 << 18;
        /// B Session Valid Interrupt Status (BSVIS) - Bit 19
        const B_SESSION_VALID_STATUS = 1 << 19;
        /// B Session End Interrupt Status (BSEIS) - Bit 20
        const B_SESSION_END_STATUS = 1 << 20;
        /// USB ID Interrupt Enable (IDIE) - Bit 24
        const ID_INTERRUPT_ENABLE = 1 << 24;
        /// A VBus Valid Interrupt Enable (AVVIE) - Bit 25
        const A_VBUS_VALID_ENABLE = 1 << 25;
        /// A Session Valid Interrupt Enable (ASVIE) - Bit 26
        const A_SESSION_VALID_ENABLE = 1 << 26;
        /// B Session Valid Interrupt Enable (BSVIE) - Bit 27
        const B_SESSION_VALID_ENABLE = 1 << 27;
        /// B Session End Interrupt Enable (BSEIE) - Bit 28
        const B_SESSION_END_ENABLE = 1 << 28;
    }
}

impl Otgsc {
    /// All write-1-to-clear status bits
    pub const INT_STATUS_BITS: u32 = 0x7F << 16;
    /// All interrupt enable bits
    pub const INT_ENABLE_BITS: u32 = 0x7F << 24;
}

bitflags! {
    /// USB Mode Register (USBMODE) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsbMode: u32 {
        /// Controller Mode (CM) - Bits [1:0]
        const CONTROLLER_MODE_MASK = 0b11;
        /// Setup Lockout Mode (SLOM) - Bit 3
        const SETUP_LOCKOUT = 1 << 3;
        /// Stream Disable (SDIS) - Bit 4
        const STREAM_DISABLE = 1 << 4;
    }
}

bitflags! {
    /// Host Controller Capability Parameters (HCCPARAMS) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HcCparams: u32 {
        /// Link Power Management capability (LEN) - Bit 17
        const LPM = 1 << 17;
    }
}

bitflags! {
    /// Device Controller Capability Parameters (DCCPARAMS) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DcCparams: u32 {
        /// Device Endpoint Number (DEN) - Bits [4:0]
        const ENDPOINT_COUNT_MASK = 0x1F;
        /// Device Capable (DC) - Bit 7
        const DEVICE_CAPABLE = 1 << 7;
        /// Host Capable (HC) - Bit 8
        const HOST_CAPABLE = 1 << 8;
    }
}

/// Timing constants for controller sequencing (in microseconds unless noted)
pub mod timeouts {
    /// Controller reset self-clear bound
    pub const HW_RESET_TIMEOUT_US: u32 = 10_000;
    /// Poll interval while waiting on USBCMD.RST
    pub const HW_RESET_POLL_US: u32 = 10;
    /// PHY settle time after leaving low power
    pub const PHY_SETTLE_US: u32 = 500;
    /// PHCD acknowledge bound on resume
    pub const PHY_ACK_TIMEOUT_US: u32 = 2_000;
    /// Poll interval while waiting on PHCD
    pub const PHY_ACK_POLL_US: u32 = 50;
    /// ID pin debounce before the first sample (2 ms, hardware needs 1 ms)
    pub const ID_DEBOUNCE_US: u32 = 2_000;
    /// Bound on waiting for BSV to drop before starting the peripheral role
    pub const VBUS_STABLE_TIMEOUT_MS: u32 = 5_000;
    /// Poll interval while waiting on BSV
    pub const VBUS_POLL_MS: u32 = 20;
}
