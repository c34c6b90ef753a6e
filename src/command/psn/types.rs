use atat::atat_derive::{AtatEnum, AtatLen};
use serde::{Deserialize, Serialize};

/// PDP context identifier, `<cid>` in `+CGDCONT` and `#SGACT`
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, AtatLen)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum ContextStatus {
    /// 0: deactivate the context
    Deactivated = 0,
    /// 1: activate the context
    Activated = 1,
}
