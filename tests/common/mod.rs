//! Shared test utilities for imxrt-usb-otg tests
//!
//! This module provides common helpers, mocks, and utilities
//! used across multiple test files.

#![allow(dead_code)]

pub mod mock_hardware;

// Re-export commonly used items
pub use mock_hardware::{
    MockGadget, MockHost, MockPlatform, MockRegs, PlatformCall, RoleCall, CAP_LENGTH,
};

use embedded_hal::delay::DelayNs;
use imxrt_usb_otg::ci::{Otgsc, Reg};
use imxrt_usb_otg::{Controller, NoRole, PeripheralDriver, PlatformConfig, RoleDriver, RoleSet};

/// Controller wired to the mocks
pub type TestController<'a, H = MockHost, G = MockGadget> =
    Controller<&'a MockRegs, H, G, &'a MockPlatform>;

/// Delay that only accumulates the requested time
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl CountingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Probe an OTG controller with both mock roles
pub fn probe_dual<'a>(regs: &'a MockRegs, platform: &'a MockPlatform) -> TestController<'a> {
    let mut delay = CountingDelay::new();
    Controller::probe(
        regs,
        RoleSet::dual(MockHost::new(), MockGadget::new()),
        platform,
        PlatformConfig::new(),
        &mut delay,
    )
    .expect("dual-role probe")
}

/// Probe a host-only controller
pub fn probe_host<'a>(
    regs: &'a MockRegs,
    platform: &'a MockPlatform,
) -> TestController<'a, MockHost, NoRole> {
    let mut delay = CountingDelay::new();
    Controller::probe(
        regs,
        RoleSet::host_only(MockHost::new()),
        platform,
        PlatformConfig::new(),
        &mut delay,
    )
    .expect("host-only probe")
}

/// Whether an armed OTGSC status bit would assert the interrupt line
pub fn otg_irq_asserted(regs: &MockRegs) -> bool {
    let otgsc = regs.peek(Reg::Otgsc);
    (otgsc >> 8) & otgsc & Otgsc::INT_STATUS_BITS != 0
}

/// Deliver interrupts and run the worker until the controller settles
///
/// Interrupts are only delivered while the platform has the line unmasked,
/// as the interrupt controller would. Returns the number of worker passes.
pub fn drain<'a, H, G>(
    controller: &TestController<'a, H, G>,
    regs: &MockRegs,
    platform: &MockPlatform,
    delay: &mut CountingDelay,
) -> usize
where
    H: RoleDriver<&'a MockRegs>,
    G: PeripheralDriver<&'a MockRegs>,
{
    let mut passes = 0;
    for _ in 0..32 {
        if controller.work_pending() {
            controller.process_work(delay);
            passes += 1;
        } else if platform.irq_enabled() && otg_irq_asserted(regs) {
            controller.handle_irq();
        } else {
            break;
        }
    }
    passes
}
