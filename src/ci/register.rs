//! Register access for the controller block
//!
//! [`RegisterIo`] is the seam between the core and the memory-mapped
//! register block. [`Mmio`] implements it with volatile accesses and the
//! barrier ordering the Cortex-M7 weakly-ordered memory model requires;
//! tests substitute a simulated register file.

use embedded_hal::delay::DelayNs;

/// 32-bit register access at byte offsets from the register block base
///
/// Implementations perform a single bus access per call and must not
/// merge, reorder or elide accesses.
pub trait RegisterIo {
    /// Read the register at `offset`
    fn read(&self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`
    fn write(&self, offset: usize, value: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Memory-mapped register block
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a USB_OTG register block, and the
    /// caller must ensure nothing else accesses that block for the life
    /// of the returned value.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `base` is not in a known MMIO region
    pub unsafe fn new(base: usize) -> Self {
        debug_assert!(
            is_valid_mmio_address(base),
            "Invalid MMIO address: {:#x}",
            base
        );
        Self { base }
    }

    /// Base address of the register block
    #[inline(always)]
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterIo for Mmio {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        // Safety: `new` established exclusive ownership of the block.
        unsafe { read_register_at((self.base + offset) as *const u32) }
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        // Safety: `new` established exclusive ownership of the block.
        unsafe { write_register_at((self.base + offset) as *mut u32, value) }
    }
}

/// Validate that an address is within known i.MX RT1062 MMIO regions
///
/// # Known MMIO Regions (from i.MX RT1060 Reference Manual Ch. 2):
/// - 0x4000_0000 - 0x400F_FFFF: AIPS-1
/// - 0x4010_0000 - 0x401F_FFFF: AIPS-2
/// - 0x4020_0000 - 0x403F_FFFF: AIPS-3 (USB_OTG1/2 at 0x402E_xxxx)
#[inline]
const fn is_valid_mmio_address(addr: usize) -> bool {
    matches!(addr,
        0x4000_0000..=0x400F_FFFF
        | 0x4010_0000..=0x401F_FFFF
        | 0x4020_0000..=0x403F_FFFF
    )
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
fn dmb() {
    cortex_m::asm::dmb();
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
fn dsb() {
    cortex_m::asm::dsb();
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
fn dmb() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
fn dsb() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Read a register at a raw address with memory barriers
///
/// # Safety
///
/// Caller must ensure address points to a valid MMIO register.
#[inline(always)]
pub unsafe fn read_register_at(addr: *const u32) -> u32 {
    dmb();
    let value = unsafe { core::ptr::read_volatile(addr) };
    dmb();
    value
}

/// Write a register at a raw address with memory barriers
///
/// The trailing DSB makes sure the write has reached the peripheral
/// before the caller continues (e.g. before re-enabling an interrupt).
///
/// # Safety
///
/// Caller must ensure address points to a valid MMIO register.
#[inline(always)]
pub unsafe fn write_register_at(addr: *mut u32, value: u32) {
    dmb();
    unsafe { core::ptr::write_volatile(addr, value) };
    dsb();
}

/// A bounded poll expired before its condition held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedOut;

/// Timeout handling for register polls
///
/// Time is measured by the delays issued between polls, so the bound
/// holds for any [`DelayNs`] implementation, including test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterTimeout {
    timeout_us: u32,
    poll_us: u32,
}

impl RegisterTimeout {
    /// Timeout of `timeout_us`, polling every `poll_us`
    pub const fn new_us(timeout_us: u32, poll_us: u32) -> Self {
        Self {
            timeout_us,
            poll_us: if poll_us == 0 { 1 } else { poll_us },
        }
    }

    /// Timeout of `timeout_ms`, polling every `poll_ms`
    pub const fn new_ms(timeout_ms: u32, poll_ms: u32) -> Self {
        Self::new_us(
            timeout_ms.saturating_mul(1000),
            poll_ms.saturating_mul(1000),
        )
    }

    /// Total bound in microseconds
    #[inline(always)]
    pub const fn timeout_us(&self) -> u32 {
        self.timeout_us
    }

    /// Wait for condition with timeout
    ///
    /// The condition is evaluated once more after the final delay, so a
    /// condition that becomes true exactly at the bound still succeeds.
    pub fn wait_for<D, F>(&self, delay: &mut D, mut condition: F) -> Result<(), TimedOut>
    where
        D: DelayNs,
        F: FnMut() -> bool,
    {
        let mut elapsed: u32 = 0;
        while !condition() {
            if elapsed >= self.timeout_us {
                return Err(TimedOut);
            }
            delay.delay_us(self.poll_us);
            elapsed = elapsed.saturating_add(self.poll_us);
        }
        Ok(())
    }
}
