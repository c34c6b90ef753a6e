mod set;

pub use self::set::{Slot, SocketSet, SOCKET_COUNT};

use crate::command::ip_transport_layer::types::SocketProtocol;

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// Stream socket
    Tcp,
    /// Datagram socket
    Udp,
}

impl From<Protocol> for SocketProtocol {
    fn from(p: Protocol) -> Self {
        match p {
            Protocol::Tcp => SocketProtocol::TCP,
            Protocol::Udp => SocketProtocol::UDP,
        }
    }
}

/// An open socket.
///
/// The handle owns its slot in the [`SocketSet`]: the slot is in use exactly
/// as long as a `Socket` for it exists, which is why it is neither `Clone`
/// nor `Copy`. Give it back through `socket_close`.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Socket {
    id: u8,
}

impl Socket {
    pub(crate) fn new(id: u8) -> Self {
        Self { id }
    }

    /// Modem side `<connId>`, 1 to 6.
    pub fn id(&self) -> u8 {
        self.id
    }
}
