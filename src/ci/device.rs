//! Device initialization and the mode/reset sequencer

use super::bank::HwBank;
use super::register::{RegisterIo, RegisterTimeout};
use super::regmap::{Reg, RegisterLayout, RegisterMap};
use super::{timeouts, ControllerMode, DcCparams, HcCparams, Otgsc, PortSc, UsbCmd, UsbMode, ENDPT_MAX};
use crate::error::{DeviceError, Result};
use crate::platform::{CiEvent, Platform};
use embedded_hal::delay::DelayNs;

/// Bring up the register bank for the controller behind `io`
///
/// Derives the operational base from CAPLENGTH, selects the offset table
/// from HCCPARAMS.LEN, and sizes the endpoint set from DCCPARAMS.DEN. An
/// endpoint count the core cannot serve fails before any register is
/// written. Otherwise the PHY is woken if an earlier boot stage left it
/// in low power, and all interrupt enables and status are cleared.
pub fn hw_device_init<IO, D>(io: IO, cap_offset: usize, delay: &mut D) -> Result<HwBank<IO>>
where
    IO: RegisterIo,
    D: DelayNs,
{
    let cap_length = (io.read(cap_offset) & 0xFF) as usize;
    let op_base = cap_offset + cap_length;

    let legacy = RegisterMap::new(cap_offset, op_base, RegisterLayout::Legacy);
    let lpm = io.read(legacy.offset(Reg::Hccparams)) & HcCparams::LPM.bits() != 0;
    let map = RegisterMap::new(cap_offset, op_base, RegisterLayout::from_lpm_bit(lpm));

    let den = io.read(map.offset(Reg::Dccparams)) & DcCparams::ENDPOINT_COUNT_MASK.bits();
    let ep_count = den as usize * 2;
    if ep_count > ENDPT_MAX {
        #[cfg(feature = "defmt")]
        defmt::error!("{} endpoints exceed the supported {}", ep_count, ENDPT_MAX);
        return Err(DeviceError::TooManyEndpoints);
    }

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "Register layout {}, op base {=usize:#x}, {} endpoints",
        map.layout(),
        op_base,
        ep_count
    );

    let bank = HwBank::new(io, map, ep_count);

    let phcd = PortSc::phy_low_power(lpm).bits();
    if bank.read(Reg::Portsc, phcd) != 0 {
        bank.clear_bits(Reg::Portsc, phcd);
        delay.delay_us(timeouts::PHY_SETTLE_US);
    }

    bank.write(Reg::Usbintr, !0, 0);
    bank.write(
        Reg::Otgsc,
        Otgsc::INT_ENABLE_BITS | Otgsc::INT_STATUS_BITS,
        Otgsc::INT_STATUS_BITS,
    );
    bank.write(Reg::Usbsts, !0, !0);

    Ok(bank)
}

/// Stop, reset and place the controller in `mode`
///
/// The reset bit is polled with a bound; a controller that never leaves
/// reset yields [`DeviceError::ResetTimeout`]. USBMODE.CM goes through
/// Idle before the requested mode so the field latches, and a read-back
/// mismatch yields [`DeviceError::ModeMismatch`].
pub fn hw_device_reset<IO, P, D>(
    bank: &HwBank<IO>,
    mode: ControllerMode,
    disable_streaming: bool,
    platform: &P,
    delay: &mut D,
) -> Result<()>
where
    IO: RegisterIo,
    P: Platform,
    D: DelayNs,
{
    bank.write(Reg::Endptflush, !0, !0);
    bank.clear_bits(Reg::Usbcmd, UsbCmd::RUN_STOP.bits());

    bank.set_bits(Reg::Usbcmd, UsbCmd::RESET.bits());
    let timeout = RegisterTimeout::new_us(timeouts::HW_RESET_TIMEOUT_US, timeouts::HW_RESET_POLL_US);
    bank.wait(Reg::Usbcmd, UsbCmd::RESET.bits(), 0, timeout, delay)
        .map_err(|_| {
            #[cfg(feature = "defmt")]
            defmt::error!("Controller stuck in reset");
            DeviceError::ResetTimeout
        })?;

    platform.notify_event(CiEvent::ControllerReset);

    if disable_streaming {
        bank.set_bits(Reg::Usbmode, UsbMode::STREAM_DISABLE.bits());
    }

    let cm = UsbMode::CONTROLLER_MODE_MASK.bits();
    bank.write(Reg::Usbmode, cm, ControllerMode::Idle.bits());
    bank.write(Reg::Usbmode, cm, mode.bits());
    bank.set_bits(Reg::Usbmode, UsbMode::SETUP_LOCKOUT.bits());

    if bank.read(Reg::Usbmode, cm) != mode.bits() {
        #[cfg(feature = "defmt")]
        defmt::error!("Cannot enter {} mode, lpm = {}", mode, bank.is_lpm());
        return Err(DeviceError::ModeMismatch);
    }

    Ok(())
}

/// Move the PHY into or out of low power through PORTSC.PHCD
///
/// Leaving low power waits for PHCD to read back clear, which is the
/// controller's acknowledgement that the PHY clock is running again.
pub fn hw_phy_low_power<IO, D>(bank: &HwBank<IO>, enable: bool, delay: &mut D) -> Result<()>
where
    IO: RegisterIo,
    D: DelayNs,
{
    let phcd = PortSc::phy_low_power(bank.is_lpm()).bits();
    let in_low_power = bank.read(Reg::Portsc, phcd) != 0;

    if enable && !in_low_power {
        bank.set_bits(Reg::Portsc, phcd);
    } else if !enable && in_low_power {
        bank.clear_bits(Reg::Portsc, phcd);
        let timeout = RegisterTimeout::new_us(timeouts::PHY_ACK_TIMEOUT_US, timeouts::PHY_ACK_POLL_US);
        bank.wait(Reg::Portsc, phcd, 0, timeout, delay)
            .map_err(|_| DeviceError::PhyTimeout)?;
    }

    Ok(())
}
