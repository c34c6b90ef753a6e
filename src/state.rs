use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_io_async::{Read, Write};
use heapless::String;
use no_std_net::IpAddr;

use crate::channel::{AtHandle, Channel};
use crate::command::Oob;
use crate::module_timing;
use crate::registration::ConnectionState;
use crate::socket::SocketSet;

pub const MODEL_LEN: usize = 32;

/// Raised by the serial driver whenever bytes arrive.
///
/// Unlike the rest of [`State`] it is `Sync`, so a reference can be handed to
/// an RX interrupt or to a task on another executor.
pub type RxSignal = Signal<CriticalSectionRawMutex, ()>;
pub const CREDENTIAL_LEN: usize = 64;

/// Resources shared by the interface, the runner and the consumers.
///
/// Allocate it once, e.g. in a `static_cell`, and hand out references.
pub struct State<'d, T> {
    channel: Mutex<NoopRawMutex, Channel<T>>,
    rx: RxSignal,
    oob: [Signal<NoopRawMutex, ()>; Oob::COUNT],
    shared: BlockingMutex<NoopRawMutex, RefCell<Shared<'d>>>,
}

impl<'d, T: Read + Write> State<'d, T> {
    pub fn new(transport: T) -> Self {
        let mut channel = Channel::new(transport, module_timing::misc_timeout());
        for oob in Oob::ALL {
            channel.register(oob);
        }

        Self {
            channel: Mutex::new(channel),
            rx: Signal::new(),
            oob: core::array::from_fn(|_| Signal::new()),
            shared: BlockingMutex::new(RefCell::new(Shared::new())),
        }
    }

    /// Signal the serial driver raises whenever new bytes are available.
    pub fn rx_signal(&self) -> &RxSignal {
        &self.rx
    }

    pub(crate) fn at(&'d self) -> AtHandle<'d, T> {
        AtHandle::new(&self.channel, &self.oob)
    }

    /// Raised when a transaction captured a notification for `oob`.
    pub(crate) fn oob_signal(&self, oob: Oob) -> &Signal<NoopRawMutex, ()> {
        &self.oob[oob.index()]
    }

    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&mut Shared<'d>) -> R) -> R {
        self.shared.lock(|s| f(&mut s.borrow_mut()))
    }
}

/// Bookkeeping that lives outside the channel lock.
pub(crate) struct Shared<'d> {
    pub(crate) sockets: SocketSet<'d>,
    pub(crate) connection: ConnectionState,
    pub(crate) ip: Option<IpAddr>,
    pub(crate) model: String<MODEL_LEN>,
    pub(crate) username: String<CREDENTIAL_LEN>,
    pub(crate) password: String<CREDENTIAL_LEN>,
    /// Whether `set_credentials` has bound an APN since boot
    pub(crate) credentials_set: bool,
}

impl<'d> Shared<'d> {
    const fn new() -> Self {
        Self {
            sockets: SocketSet::new(),
            connection: ConnectionState::Uninitialized,
            ip: None,
            model: String::new(),
            username: String::new(),
            password: String::new(),
            credentials_set: false,
        }
    }

    pub(crate) fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection != state {
            info!("Connection state: {:?} -> {:?}", self.connection, state);
            self.connection = state;
        }
    }
}
