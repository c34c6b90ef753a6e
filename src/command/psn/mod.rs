//! ### 3.5.4.7 - Packet domain and context activation
//!
//! Telit modules use one PDP context for the internal IP stack. It is defined
//! with `+CGDCONT` and brought up with `#SGACT`, which also reports the IP
//! address handed out by the network.
pub mod types;

use atat::atat_derive::AtatCmd;
use types::{ContextId, ContextStatus};

use super::NoResponse;

/// 3.5.4.7.3 Define PDP context +CGDCONT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse)]
pub struct SetPDPContextDefinition<'a> {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'a str,
    #[at_arg(position = 2, len = 99)]
    pub apn: &'a str,
}

/// 5.6.6.2 Context activation #SGACT
///
/// On activation the module answers `#SGACT: <ip>` before `OK`.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SGACT", NoResponse)]
pub struct SetContextActivation {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    pub status: ContextStatus,
}

/// 5.6.6.2 Context activation #SGACT, with PAP/CHAP credentials
#[derive(Clone, AtatCmd)]
#[at_cmd("#SGACT", NoResponse)]
pub struct SetContextActivationWithCredentials<'a> {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    pub status: ContextStatus,
    #[at_arg(position = 2, len = 64)]
    pub username: &'a str,
    #[at_arg(position = 3, len = 64)]
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::wire;

    #[test]
    fn context_definition_quotes_strings() {
        let cmd = SetPDPContextDefinition {
            cid: ContextId(1),
            pdp_type: "IP",
            apn: "internet.example",
        };
        assert_eq!(wire(&cmd), "AT+CGDCONT=1,\"IP\",\"internet.example\"\r\n");
    }

    #[test]
    fn context_activation() {
        let cmd = SetContextActivation {
            cid: ContextId(1),
            status: ContextStatus::Activated,
        };
        assert_eq!(wire(&cmd), "AT#SGACT=1,1\r\n");

        let cmd = SetContextActivationWithCredentials {
            cid: ContextId(1),
            status: ContextStatus::Activated,
            username: "user",
            password: "secret",
        };
        assert_eq!(wire(&cmd), "AT#SGACT=1,1,\"user\",\"secret\"\r\n");
    }
}
