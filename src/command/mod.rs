//! AT Commands for the Telit modules inside MultiTech MTSAS radios\
//! Following the Telit AT Commands Reference Guide (80000ST10025a) and the
//! Telit IP Easy User Guide.
//!
//! Commands are only serialized through `atat`; responses are matched by the
//! transaction channel with [`crate::channel::pattern`] since Telit answers
//! with `#` and `$` prefixed lines.

pub mod dns;
pub mod general;
pub mod gps;
pub mod ip_transport_layer;
pub mod network_service;
pub mod psn;
pub mod sms;

use atat::atat_derive::{AtatCmd, AtatResp};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse)]
pub struct AT;

/// Out-of-band lines the modem may emit in the middle of any exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oob {
    /// `SRING: <connId>`, data is pending on a socket
    SocketRing,
    /// `+CMT: ...` followed by the message text, with `+CNMI=2,2`
    SmsDelivery,
}

impl Oob {
    pub const COUNT: usize = 2;
    pub const ALL: [Oob; Self::COUNT] = [Oob::SocketRing, Oob::SmsDelivery];

    pub const fn prefix(&self) -> &'static [u8] {
        match self {
            Oob::SocketRing => b"SRING:",
            Oob::SmsDelivery => b"+CMT:",
        }
    }

    /// Whether a raw body follows the indication line. Its length is the
    /// last field of the line; without one the body is the next line.
    pub const fn has_body(&self) -> bool {
        match self {
            Oob::SocketRing => false,
            Oob::SmsDelivery => true,
        }
    }

    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub(crate) const fn mask(&self) -> u8 {
        1 << self.index()
    }
}
