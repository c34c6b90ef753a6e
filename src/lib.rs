#![cfg_attr(not(test), no_std)]

//! Driver for MultiTech MTSAS cellular radios (Telit HE910/DE910/LE910 based).
//!
//! The modem is driven over a single AT command channel shared by every
//! consumer. [`new`] splits a [`State`] into an [`Interface`] for connection
//! management and sockets, and a [`Runner`] that dispatches socket ring
//! indications. [`sms::Sms`] and [`gps::Gps`] share the same channel.
//!
//! ```ignore
//! let state = State::new(uart);
//! let (mut iface, mut runner) = mtsas_cellular::new(&state, MyConfig);
//! spawner.spawn(async move { runner.run().await });
//! iface.connect_with(Apn::Given { name: "internet", username: None, password: None }).await?;
//! ```

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod gps;
mod interface;
mod module_timing;
pub mod registration;
mod runner;
pub mod sms;
pub mod socket;
mod state;
pub mod traits;

#[cfg(test)]
mod test_helpers;

use embedded_io_async::{Read, Write};

pub use config::{Apn, CellularConfig, NoPin};
pub use error::Error;
pub use interface::{Interface, MAX_PACKET_SIZE};
pub use registration::ConnectionState;
pub use runner::Runner;
pub use socket::{Protocol, Socket};
pub use state::{RxSignal, State};
pub use traits::{ConnectionManagement, SocketOperations};

/// Split `state` into the user facing interface and the event runner.
///
/// The runner must be polled for socket callbacks to fire.
pub fn new<'d, T, C>(state: &'d State<'d, T>, config: C) -> (Interface<'d, T, C>, Runner<'d, T>)
where
    T: Read + Write,
    C: CellularConfig<'d>,
{
    (Interface::new(state, config), Runner::new(state))
}
