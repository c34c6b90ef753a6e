//! ### 3.5.4.3 - Network service handling
use atat::atat_derive::AtatCmd;

use super::NoResponse;

/// 3.5.4.3.4 Network registration report +CREG
///
/// Read form, answered with `+CREG: <mode>,<stat>`. See
/// [`crate::registration::Status`] for `<stat>`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CREG?", NoResponse)]
pub struct GetNetworkRegistrationStatus;
