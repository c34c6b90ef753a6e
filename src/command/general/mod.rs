//! ### 3 - General configuration commands
pub mod types;

use atat::atat_derive::AtatCmd;
use types::Echo;

use super::NoResponse;

/// 3.5.2 Module reboot #REBOOT
///
/// Immediately reboots the module. The `OK` is produced before the reboot,
/// the module is unavailable for a few seconds afterwards.
#[derive(Clone, AtatCmd)]
#[at_cmd("#REBOOT", NoResponse)]
pub struct Reboot;

/// 3.2.3 Command echo E
///
/// Enables or disables the echo of characters received from the TE.
#[derive(Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false)]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enabled: Echo,
}

/// 3.5.4.1.3 Request model identification +CGMM
///
/// Answered with the model name on its own line.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGMM", NoResponse)]
pub struct GetModelId;

/// 3.5.7.1.5 Request product serial number identification #CGSN
///
/// Answered with `#CGSN: <IMEI>`.
#[derive(Clone, AtatCmd)]
#[at_cmd("#CGSN", NoResponse)]
pub struct GetSerialNumber;
