//! ### 5.6.7 - Multisocket
//!
//! The Telit stack exposes six sockets, `<connId>` 1 to 6, all bound to one
//! PDP context. Sockets are dialed in command mode so the AT channel stays
//! usable; payload moves with `#SSENDEXT` and `#SRECV`.
pub mod types;

use atat::atat_derive::AtatCmd;
use types::{ClosureType, ConnectionMode, SocketProtocol};

use super::psn::types::ContextId;
use super::NoResponse;

/// 5.6.7.3 Socket configuration #SCFG
#[derive(Clone, AtatCmd)]
#[at_cmd("#SCFG", NoResponse)]
pub struct SetSocketConfig {
    #[at_arg(position = 0)]
    pub conn_id: u8,
    #[at_arg(position = 1)]
    pub cid: ContextId,
    /// Packet size for online mode, 0 selects the default
    #[at_arg(position = 2)]
    pub packet_size: u16,
    /// Exchange timeout in seconds, 0 disables it
    #[at_arg(position = 3)]
    pub max_timeout: u16,
    /// Connection timeout in tenths of a second
    #[at_arg(position = 4)]
    pub connect_timeout: u16,
    /// Data sending timeout in tenths of a second, 0 disables it
    #[at_arg(position = 5)]
    pub tx_timeout: u16,
}

/// 5.6.7.8 Socket dial #SD
#[derive(Clone, AtatCmd)]
#[at_cmd("#SD", NoResponse)]
pub struct SocketDial<'a> {
    #[at_arg(position = 0)]
    pub conn_id: u8,
    #[at_arg(position = 1)]
    pub protocol: SocketProtocol,
    #[at_arg(position = 2)]
    pub remote_port: u16,
    #[at_arg(position = 3, len = 64)]
    pub remote_addr: &'a str,
    #[at_arg(position = 4)]
    pub closure_type: ClosureType,
    #[at_arg(position = 5)]
    pub local_port: u16,
    #[at_arg(position = 6)]
    pub mode: ConnectionMode,
}

/// 5.6.7.5 Socket shutdown #SH
#[derive(Clone, AtatCmd)]
#[at_cmd("#SH", NoResponse)]
pub struct SocketShutdown {
    #[at_arg(position = 0)]
    pub conn_id: u8,
}

/// 5.6.7.16 Send data in command mode extended #SSENDEXT
///
/// The module answers with a `> ` prompt and then waits for exactly `bytes`
/// bytes of raw payload.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SSENDEXT", NoResponse)]
pub struct SendDataExtended {
    #[at_arg(position = 0)]
    pub conn_id: u8,
    #[at_arg(position = 1)]
    pub bytes: u16,
}

/// 5.6.7.15 Receive data in command mode #SRECV
///
/// Answered with `#SRECV: <connId>,<len>` followed by `<len>` raw bytes.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SRECV", NoResponse)]
pub struct ReceiveData {
    #[at_arg(position = 0)]
    pub conn_id: u8,
    #[at_arg(position = 1)]
    pub max_bytes: u16,
}
