//! ### 3.5.7 - GPS
//!
//! `$`-prefixed commands of the embedded GPS receiver.
pub mod types;

use atat::atat_derive::AtatCmd;
use types::GpsPower;

use super::NoResponse;

/// 3.5.7.2.2 GPS power, read form $GPSP?
///
/// Answered with `$GPSP: <status>`.
#[derive(Clone, AtatCmd)]
#[at_cmd("$GPSP?", NoResponse)]
pub struct GetGpsPower;

/// 3.5.7.2.2 GPS power $GPSP
#[derive(Clone, AtatCmd)]
#[at_cmd("$GPSP", NoResponse)]
pub struct SetGpsPower {
    #[at_arg(position = 0)]
    pub status: GpsPower,
}

/// 3.5.7.2.16 Get acquired position $GPSACP
///
/// Answered with `$GPSACP: <UTC>,<lat>,<lon>,<hdop>,<alt>,<fix>,...`. The
/// fields are empty until the receiver has a fix.
#[derive(Clone, AtatCmd)]
#[at_cmd("$GPSACP", NoResponse)]
pub struct GetAcquiredPosition;
