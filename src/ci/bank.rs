//! Masked register bank
//!
//! All register traffic after init goes through [`HwBank`]. Writes are
//! masked read-modify-write sequences executed inside a critical section,
//! so the interrupt front-end, the deferred worker and the power hooks
//! never tear each other's updates.

use super::register::{RegisterIo, RegisterTimeout, TimedOut};
use super::regmap::{Reg, RegisterLayout, RegisterMap, REG_COUNT};
use super::{DevLc, Otgsc, PortSc, TEST_MODE_MAX};
use crate::error::{DeviceError, Result};
use embedded_hal::delay::DelayNs;
use heapless::Vec;

/// Snapshot of the register bank, one entry per register
pub type RegisterDump = Vec<(Reg, u32), REG_COUNT>;

/// Controller register bank with the offset table selected at init
pub struct HwBank<IO> {
    io: IO,
    map: RegisterMap,
    ep_count: usize,
}

impl<IO: RegisterIo> HwBank<IO> {
    pub(crate) const fn new(io: IO, map: RegisterMap, ep_count: usize) -> Self {
        Self { io, map, ep_count }
    }

    /// Resolved register offsets
    #[inline(always)]
    pub const fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Selected offset table
    #[inline(always)]
    pub const fn layout(&self) -> RegisterLayout {
        self.map.layout()
    }

    /// Whether the LPM register layout is in use
    #[inline(always)]
    pub const fn is_lpm(&self) -> bool {
        self.map.layout().is_lpm()
    }

    /// Number of implemented endpoints (IN and OUT counted separately)
    #[inline(always)]
    pub const fn ep_count(&self) -> usize {
        self.ep_count
    }

    /// Underlying register access
    #[inline(always)]
    pub fn io(&self) -> &IO {
        &self.io
    }

    pub(crate) fn into_io(self) -> IO {
        self.io
    }

    /// Read `reg` and keep the bits in `mask`
    #[inline(always)]
    pub fn read(&self, reg: Reg, mask: u32) -> u32 {
        self.io.read(self.map.offset(reg)) & mask
    }

    /// Read the field selected by `mask`, shifted down to bit 0
    #[inline(always)]
    pub fn read_field(&self, reg: Reg, mask: u32) -> u32 {
        if mask == 0 {
            return 0;
        }
        self.read(reg, mask) >> mask.trailing_zeros()
    }

    /// Write the bits of `data` selected by `mask`
    ///
    /// Bits outside `mask` keep their value. USBSTS is pure
    /// write-1-to-clear and is written without a read. OTGSC mixes
    /// control and write-1-to-clear status bits: its status bits are
    /// dropped from the read-back value so only status bits set in
    /// `data & mask` get cleared.
    pub fn write(&self, reg: Reg, mask: u32, data: u32) {
        let offset = self.map.offset(reg);
        match reg {
            Reg::Usbsts => self.io.write(offset, data & mask),
            Reg::Otgsc => critical_section::with(|_| {
                let old = self.io.read(offset) & !Otgsc::INT_STATUS_BITS;
                self.io.write(offset, (old & !mask) | (data & mask));
            }),
            _ if mask == !0 => self.io.write(offset, data),
            _ => critical_section::with(|_| {
                let old = self.io.read(offset);
                self.io.write(offset, (old & !mask) | (data & mask));
            }),
        }
    }

    /// Set every bit in `mask`
    #[inline(always)]
    pub fn set_bits(&self, reg: Reg, mask: u32) {
        self.write(reg, mask, mask);
    }

    /// Clear every bit in `mask`
    #[inline(always)]
    pub fn clear_bits(&self, reg: Reg, mask: u32) {
        self.write(reg, mask, 0);
    }

    /// Read the write-1-to-clear bits in `mask` and clear the ones that are set
    ///
    /// Returns the bits that were set.
    pub fn test_and_clear(&self, reg: Reg, mask: u32) -> u32 {
        let set = self.read(reg, mask);
        if set != 0 {
            self.write(reg, mask, set);
        }
        set
    }

    /// Wait until `reg & mask == value`, bounded by `timeout`
    pub fn wait<D: DelayNs>(
        &self,
        reg: Reg,
        mask: u32,
        value: u32,
        timeout: RegisterTimeout,
        delay: &mut D,
    ) -> core::result::Result<(), TimedOut> {
        timeout.wait_for(delay, || self.read(reg, mask) == value & mask)
    }

    /// Byte offset of ENDPTCTRL`ep`
    pub fn endptctrl_offset(&self, ep: usize) -> Result<usize> {
        if ep >= self.ep_count / 2 {
            return Err(DeviceError::InvalidEndpoint);
        }
        Ok(self.map.offset(Reg::Endptctrl) + ep * 4)
    }

    /// Read ENDPTCTRL`ep`
    pub fn read_endptctrl(&self, ep: usize) -> Result<u32> {
        let offset = self.endptctrl_offset(ep)?;
        Ok(self.io.read(offset))
    }

    /// Masked write to ENDPTCTRL`ep`
    pub fn write_endptctrl(&self, ep: usize, mask: u32, data: u32) -> Result<()> {
        let offset = self.endptctrl_offset(ep)?;
        critical_section::with(|_| {
            let old = self.io.read(offset);
            self.io.write(offset, (old & !mask) | (data & mask));
        });
        Ok(())
    }

    /// Put the port into test mode `mode` (PORTSC.PTC)
    pub fn port_test_set(&self, mode: u8) -> Result<()> {
        if mode > TEST_MODE_MAX {
            return Err(DeviceError::InvalidTestMode);
        }
        self.write(
            Reg::Portsc,
            PortSc::PORT_TEST_CONTROL_MASK.bits(),
            u32::from(mode) << PortSc::PORT_TEST_CONTROL_SHIFT,
        );
        Ok(())
    }

    /// Current port test mode
    pub fn port_test_get(&self) -> u8 {
        self.read_field(Reg::Portsc, PortSc::PORT_TEST_CONTROL_MASK.bits()) as u8
    }

    /// Whether the port negotiated high speed
    pub fn port_is_high_speed(&self) -> bool {
        if self.is_lpm() {
            self.read(Reg::Devlc, DevLc::PORT_SPEED_MASK.bits()) == DevLc::PORT_SPEED_HIGH.bits()
        } else {
            self.read(Reg::Portsc, PortSc::HIGH_SPEED.bits()) != 0
        }
    }

    /// Snapshot of every mapped register for diagnostics
    pub fn dump(&self) -> RegisterDump {
        let mut dump = Vec::new();
        for reg in Reg::ALL {
            // Capacity equals Reg::ALL.len()
            let _ = dump.push((reg, self.read(reg, !0)));
        }
        dump
    }

    /// Log every mapped register
    pub fn log_dump(&self) {
        for (_reg, _value) in self.dump() {
            #[cfg(feature = "defmt")]
            defmt::error!("{=str}: {=u32:#x}", _reg.name(), _value);
        }
    }
}
