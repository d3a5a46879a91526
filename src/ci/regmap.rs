//! Register offset tables
//!
//! Controllers with Link Power Management moved the OTG and endpoint
//! registers. Both layouts are fixed tables; a [`RegisterMap`] only
//! records which one is in use and where the two register groups start.

/// Logical register identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Reg {
    /// CAPLENGTH / HCIVERSION
    Caplength,
    /// HCSPARAMS
    Hcsparams,
    /// HCCPARAMS
    Hccparams,
    /// DCCPARAMS
    Dccparams,
    /// TESTMODE
    Testmode,
    /// USBCMD
    Usbcmd,
    /// USBSTS
    Usbsts,
    /// USBINTR
    Usbintr,
    /// DEVICEADDR / PERIODICLISTBASE
    Deviceaddr,
    /// ENDPTLISTADDR / ASYNCLISTADDR
    Endptlistaddr,
    /// PORTSC1
    Portsc,
    /// DEVLC
    Devlc,
    /// OTGSC
    Otgsc,
    /// USBMODE
    Usbmode,
    /// ENDPTSETUPSTAT
    Endptsetupstat,
    /// ENDPTPRIME
    Endptprime,
    /// ENDPTFLUSH
    Endptflush,
    /// ENDPTSTAT
    Endptstat,
    /// ENDPTCOMPLETE
    Endptcomplete,
    /// ENDPTCTRL0
    Endptctrl,
}

/// Number of logical registers
pub const REG_COUNT: usize = 20;

impl Reg {
    /// Every register, in table order
    pub const ALL: [Reg; REG_COUNT] = [
        Reg::Caplength,
        Reg::Hcsparams,
        Reg::Hccparams,
        Reg::Dccparams,
        Reg::Testmode,
        Reg::Usbcmd,
        Reg::Usbsts,
        Reg::Usbintr,
        Reg::Deviceaddr,
        Reg::Endptlistaddr,
        Reg::Portsc,
        Reg::Devlc,
        Reg::Otgsc,
        Reg::Usbmode,
        Reg::Endptsetupstat,
        Reg::Endptprime,
        Reg::Endptflush,
        Reg::Endptstat,
        Reg::Endptcomplete,
        Reg::Endptctrl,
    ];

    /// Whether the register lives in the capability group
    #[inline(always)]
    pub const fn is_capability(self) -> bool {
        (self as usize) <= Reg::Testmode as usize
    }

    /// Register name as printed in the reference manual
    pub const fn name(self) -> &'static str {
        match self {
            Reg::Caplength => "CAPLENGTH",
            Reg::Hcsparams => "HCSPARAMS",
            Reg::Hccparams => "HCCPARAMS",
            Reg::Dccparams => "DCCPARAMS",
            Reg::Testmode => "TESTMODE",
            Reg::Usbcmd => "USBCMD",
            Reg::Usbsts => "USBSTS",
            Reg::Usbintr => "USBINTR",
            Reg::Deviceaddr => "DEVICEADDR",
            Reg::Endptlistaddr => "ENDPTLISTADDR",
            Reg::Portsc => "PORTSC",
            Reg::Devlc => "DEVLC",
            Reg::Otgsc => "OTGSC",
            Reg::Usbmode => "USBMODE",
            Reg::Endptsetupstat => "ENDPTSETUPSTAT",
            Reg::Endptprime => "ENDPTPRIME",
            Reg::Endptflush => "ENDPTFLUSH",
            Reg::Endptstat => "ENDPTSTAT",
            Reg::Endptcomplete => "ENDPTCOMPLETE",
            Reg::Endptctrl => "ENDPTCTRL",
        }
    }
}

/// Offsets for controllers without LPM, relative to each group's base
const REGS_NOLPM: [u16; REG_COUNT] = [
    0x000, // CAPLENGTH
    0x004, // HCSPARAMS
    0x008, // HCCPARAMS
    0x024, // DCCPARAMS
    0x038, // TESTMODE
    0x000, // USBCMD
    0x004, // USBSTS
    0x008, // USBINTR
    0x014, // DEVICEADDR
    0x018, // ENDPTLISTADDR
    0x044, // PORTSC
    0x084, // DEVLC
    0x064, // OTGSC
    0x068, // USBMODE
    0x06C, // ENDPTSETUPSTAT
    0x070, // ENDPTPRIME
    0x074, // ENDPTFLUSH
    0x078, // ENDPTSTAT
    0x07C, // ENDPTCOMPLETE
    0x080, // ENDPTCTRL
];

/// Offsets for LPM-capable controllers, relative to each group's base
const REGS_LPM: [u16; REG_COUNT] = [
    0x000, // CAPLENGTH
    0x004, // HCSPARAMS
    0x008, // HCCPARAMS
    0x024, // DCCPARAMS
    0x0FC, // TESTMODE
    0x000, // USBCMD
    0x004, // USBSTS
    0x008, // USBINTR
    0x014, // DEVICEADDR
    0x018, // ENDPTLISTADDR
    0x044, // PORTSC
    0x084, // DEVLC
    0x0C4, // OTGSC
    0x0C8, // USBMODE
    0x0D8, // ENDPTSETUPSTAT
    0x0DC, // ENDPTPRIME
    0x0E0, // ENDPTFLUSH
    0x0E4, // ENDPTSTAT
    0x0E8, // ENDPTCOMPLETE
    0x0EC, // ENDPTCTRL
];

/// Which offset table is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterLayout {
    /// Legacy layout
    Legacy,
    /// Link Power Management layout
    Lpm,
}

impl RegisterLayout {
    /// Layout implied by HCCPARAMS.LEN
    #[inline(always)]
    pub const fn from_lpm_bit(lpm: bool) -> Self {
        if lpm {
            Self::Lpm
        } else {
            Self::Legacy
        }
    }

    /// Whether this is the LPM layout
    #[inline(always)]
    pub const fn is_lpm(self) -> bool {
        matches!(self, Self::Lpm)
    }

    #[inline(always)]
    const fn table(self) -> &'static [u16; REG_COUNT] {
        match self {
            Self::Legacy => &REGS_NOLPM,
            Self::Lpm => &REGS_LPM,
        }
    }

    /// Offset of `reg` from its group base
    #[inline(always)]
    pub const fn offset(self, reg: Reg) -> usize {
        self.table()[reg as usize] as usize
    }
}

/// Resolved register offsets for one controller instance
///
/// All offsets are relative to the register block base handed to
/// [`RegisterIo`](super::RegisterIo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    cap_base: usize,
    op_base: usize,
    layout: RegisterLayout,
}

impl RegisterMap {
    /// Map with capability registers at `cap_base` and operational
    /// registers at `op_base`
    pub const fn new(cap_base: usize, op_base: usize, layout: RegisterLayout) -> Self {
        Self {
            cap_base,
            op_base,
            layout,
        }
    }

    /// Selected layout
    #[inline(always)]
    pub const fn layout(&self) -> RegisterLayout {
        self.layout
    }

    /// Capability register base
    #[inline(always)]
    pub const fn cap_base(&self) -> usize {
        self.cap_base
    }

    /// Operational register base
    #[inline(always)]
    pub const fn op_base(&self) -> usize {
        self.op_base
    }

    /// Byte offset of `reg` from the register block base
    #[inline(always)]
    pub const fn offset(&self, reg: Reg) -> usize {
        let base = if reg.is_capability() {
            self.cap_base
        } else {
            self.op_base
        };
        base + self.layout.offset(reg)
    }
}
