use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::command::psn::types::ContextId;
use crate::module_timing;

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Board and network configuration of a MTSAS radio.
///
/// Every constant has a default matching the Telit module family, so a
/// minimal implementation only names its reset pin type.
pub trait CellularConfig<'a> {
    type ResetPin: OutputPin;

    const CONTEXT_ID: ContextId = ContextId(1);

    /// Credentials used by `connect()` when none were set explicitly.
    const APN: Apn<'a> = Apn::None;

    const MISC_TIMEOUT: Duration = module_timing::misc_timeout();
    const REBOOT_TIMEOUT: Duration = module_timing::reboot_timeout();
    const COMMUNICATION_TIMEOUT: Duration = module_timing::communication_timeout();

    const HANDSHAKE_ATTEMPTS: u8 = 10;
    const ADDRESS_ATTEMPTS: u8 = 5;

    const REGISTRATION_TIMEOUT: Duration = module_timing::registration_timeout();
    const REGISTRATION_POLL_INTERVAL: Duration = module_timing::registration_poll_interval();

    const GPS_FIX_TIMEOUT: Duration = module_timing::gps_fix_timeout();
    const GPS_POLL_INTERVAL: Duration = module_timing::gps_poll_interval();

    /// Socket connection timeout written with `#SCFG`, in tenths of a second.
    const SOCKET_CONNECT_TIMEOUT_DS: u16 = 600;

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apn<'a> {
    None,
    Given {
        name: &'a str,
        username: Option<&'a str>,
        password: Option<&'a str>,
    },
}

impl Default for Apn<'_> {
    fn default() -> Self {
        Self::None
    }
}

impl<'a> Apn<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Apn::None => "",
            Apn::Given { name, .. } => name,
        }
    }
}
