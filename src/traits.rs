#![allow(async_fn_in_trait)]

use no_std_net::{IpAddr, SocketAddr};

use crate::config::Apn;
use crate::error::Error;
use crate::socket::{Protocol, Socket};

/// Bringing the packet data connection up and down.
pub trait ConnectionManagement {
    /// Reboot the module and bring it to a known state.
    async fn init(&mut self) -> Result<(), Error>;

    /// Bind `apn` to the packet data context. User name and password are
    /// used when the context is activated.
    async fn set_credentials(&mut self, apn: Apn<'_>) -> Result<(), Error>;

    /// Wait for network registration, then activate the context.
    async fn connect(&mut self) -> Result<(), Error>;

    /// [`init`](Self::init), [`set_credentials`](Self::set_credentials) and
    /// [`connect`](Self::connect) in one go.
    async fn connect_with(&mut self, apn: Apn<'_>) -> Result<(), Error>;

    /// Deactivate the context. Open sockets are left alone.
    async fn disconnect(&mut self) -> Result<(), Error>;

    /// Whether the module is registered on its home network or roaming.
    async fn registered(&mut self) -> bool;

    async fn ip_address(&mut self) -> Option<IpAddr>;

    async fn get_host_by_name(&mut self, name: &str) -> Result<IpAddr, Error>;
}

/// BSD style socket calls on top of the modem's socket slots.
pub trait SocketOperations<'d> {
    async fn socket_open(&mut self, protocol: Protocol) -> Result<Socket, Error>;

    /// Close `socket`. When the modem refuses, the handle is handed back so
    /// the caller can retry.
    async fn socket_close(&mut self, socket: Socket) -> Result<(), (Socket, Error)>;

    async fn socket_bind(&mut self, socket: &Socket, port: u16) -> Result<(), Error>;

    async fn socket_listen(&mut self, socket: &Socket, backlog: usize) -> Result<(), Error>;

    async fn socket_accept(&mut self, socket: &Socket) -> Result<(Socket, SocketAddr), Error>;

    async fn socket_connect(&mut self, socket: &Socket, remote: SocketAddr) -> Result<(), Error>;

    /// Returns the number of bytes accepted by the modem.
    async fn socket_send(&mut self, socket: &Socket, data: &[u8]) -> Result<usize, Error>;

    /// Returns [`Error::WouldBlock`] when nothing is pending.
    async fn socket_recv(&mut self, socket: &Socket, buf: &mut [u8]) -> Result<usize, Error>;

    async fn socket_sendto(
        &mut self,
        socket: &Socket,
        remote: SocketAddr,
        data: &[u8],
    ) -> Result<usize, Error>;

    /// Like [`socket_recv`](Self::socket_recv), also reporting the last peer
    /// the socket talked to.
    async fn socket_recvfrom(
        &mut self,
        socket: &Socket,
        buf: &mut [u8],
    ) -> Result<(usize, Option<SocketAddr>), Error>;

    /// Call `callback` whenever the modem signals that some socket may have
    /// data. The signal does not say which one.
    fn socket_attach(&mut self, socket: &Socket, callback: &'d dyn Fn());

    fn socket_detach(&mut self, socket: &Socket);
}
