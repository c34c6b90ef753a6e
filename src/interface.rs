use core::fmt::Write as _;

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::OutputPin as _;
use embedded_io_async::{Read, Write};
use heapless::String;
use no_std_net::{IpAddr, SocketAddr};

use crate::channel::{self, AtHandle, Channel, Transaction};
use crate::command::dns::ResolveNameIp;
use crate::command::general::{types::Echo, GetModelId, GetSerialNumber, Reboot, SetEcho};
use crate::command::ip_transport_layer::{
    types::{ClosureType, ConnectionMode},
    ReceiveData, SendDataExtended, SetSocketConfig, SocketDial, SocketShutdown,
};
use crate::command::network_service::GetNetworkRegistrationStatus;
use crate::command::psn::{
    types::{ContextId, ContextStatus},
    SetContextActivation, SetContextActivationWithCredentials,
    SetPDPContextDefinition,
};
use crate::command::AT;
use crate::config::{Apn, CellularConfig};
use crate::error::Error;
use crate::module_timing::{boot_time, reset_time};
use crate::registration::{ConnectionState, Status};
use crate::socket::{Protocol, Socket, SOCKET_COUNT};
use crate::state::{State, CREDENTIAL_LEN, MODEL_LEN};
use crate::traits::{ConnectionManagement, SocketOperations};

/// Largest payload `#SSENDEXT` and `#SRECV` move in one exchange.
pub const MAX_PACKET_SIZE: usize = 1500;

const MAX_APN_LEN: usize = 99;
const MAX_HOST_NAME_LEN: usize = 128;
const IMEI_LEN: usize = 32;

/// Connection management and sockets on top of the shared channel.
pub struct Interface<'d, T, C> {
    state: &'d State<'d, T>,
    at: AtHandle<'d, T>,
    config: C,
}

impl<'d, T, C> Interface<'d, T, C>
where
    T: Read + Write,
    C: CellularConfig<'d>,
{
    pub(crate) fn new(state: &'d State<'d, T>, config: C) -> Self {
        Self {
            state,
            at: state.at(),
            config,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.with_shared(|s| s.connection)
    }

    /// Model identifier read during [`init`](ConnectionManagement::init).
    pub fn model(&self) -> String<MODEL_LEN> {
        self.state.with_shared(|s| s.model.clone())
    }

    pub async fn imei(&mut self) -> Result<String<IMEI_LEN>, Error> {
        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        let captures = tx.query(&GetSerialNumber, "#CGSN: %s").await?;
        let imei = captures.str(0).ok_or(Error::DeviceError)?;
        String::try_from(imei).map_err(|_| Error::DeviceError)
    }

    /// Activate the packet data context and cache the address the network
    /// hands out. Leaves the machine `Connected`, or `Disconnected` with no
    /// cached address.
    pub async fn acquire_address(&mut self) -> Result<IpAddr, Error> {
        self.set_state(ConnectionState::AcquiringAddress);
        let (username, password) = self
            .state
            .with_shared(|s| (s.username.clone(), s.password.clone()));

        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        for attempt in 1..=C::ADDRESS_ATTEMPTS {
            match activate(&mut *tx, C::CONTEXT_ID, &username, &password).await {
                Ok(ip) => {
                    drop(tx);
                    self.state.with_shared(|s| {
                        s.ip = Some(ip);
                        s.set_connection_state(ConnectionState::Connected);
                    });
                    return Ok(ip);
                }
                Err(e) => warn!("Context activation attempt {} failed: {:?}", attempt, e),
            }
        }
        drop(tx);

        self.drop_connection();
        Err(Error::NoConnection)
    }

    /// Pulse the reset pin, if the board has one.
    pub async fn hard_reset(&mut self) {
        if let Some(pin) = self.config.reset_pin() {
            warn!("Hard resetting the modem");
            pin.set_low().ok();
            Timer::after(reset_time()).await;
            pin.set_high().ok();
            Timer::after(boot_time()).await;
        } else {
            warn!("No reset pin configured");
        }
    }

    async fn transaction(&self, timeout: Duration) -> Transaction<'d, T> {
        let mut tx = self.at.lock().await;
        tx.set_timeout(timeout);
        tx
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.with_shared(|s| s.set_connection_state(state));
    }

    /// Leave an intermediate state: `Connected` while an address is cached,
    /// `Disconnected` otherwise.
    fn settle(&self) {
        self.state.with_shared(|s| {
            let state = match s.ip {
                Some(_) => ConnectionState::Connected,
                None => ConnectionState::Disconnected,
            };
            s.set_connection_state(state);
        });
    }

    fn drop_connection(&self) {
        self.state.with_shared(|s| {
            s.ip = None;
            s.set_connection_state(ConnectionState::Disconnected);
        });
    }

    async fn boot(&mut self) -> Result<(), Error> {
        self.set_state(ConnectionState::Resetting);
        let rebooted = {
            let mut tx = self.transaction(C::REBOOT_TIMEOUT).await;
            tx.execute(&Reboot).await
        };
        if let Err(e) = rebooted {
            warn!("Reboot not acknowledged: {:?}", e);
            self.hard_reset().await;
        }

        self.set_state(ConnectionState::AwaitingHandshake);
        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        let mut alive = false;
        for _ in 0..C::HANDSHAKE_ATTEMPTS {
            if tx.execute(&AT).await.is_ok() {
                alive = true;
                break;
            }
        }
        if !alive {
            error!("Modem did not answer after reboot");
            return Err(Error::DeviceError);
        }

        tx.execute(&SetEcho {
            enabled: Echo::Disable,
        })
        .await?;

        match tx.query(&GetModelId, "%[^\r\n]").await {
            Ok(captures) => {
                let model = captures.str(0).unwrap_or("");
                info!("Modem model: {}", model);
                let model = String::try_from(model).ok();
                self.state
                    .with_shared(|s| s.model = model.unwrap_or_default());
            }
            Err(e) => warn!("Reading the model failed: {:?}", e),
        }
        Ok(())
    }

    async fn define_context(&mut self, apn: Apn<'_>) -> Result<(), Error> {
        let (username, password) = match apn {
            Apn::None => ("", ""),
            Apn::Given {
                username, password, ..
            } => (username.unwrap_or(""), password.unwrap_or("")),
        };
        let (Ok(username), Ok(password)) = (
            String::<CREDENTIAL_LEN>::try_from(username),
            String::<CREDENTIAL_LEN>::try_from(password),
        ) else {
            error!("Credentials too long");
            return Err(Error::DeviceError);
        };
        if apn.name().len() > MAX_APN_LEN {
            error!("APN too long");
            return Err(Error::DeviceError);
        }

        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        for conn_id in 1..=SOCKET_COUNT as u8 {
            let cmd = SetSocketConfig {
                conn_id,
                cid: C::CONTEXT_ID,
                packet_size: 0,
                max_timeout: 0,
                connect_timeout: C::SOCKET_CONNECT_TIMEOUT_DS,
                tx_timeout: 0,
            };
            if let Err(e) = tx.execute(&cmd).await {
                warn!("Configuring socket {} failed: {:?}", conn_id, e);
            }
        }

        let cmd = SetPDPContextDefinition {
            cid: C::CONTEXT_ID,
            pdp_type: "IP",
            apn: apn.name(),
        };
        tx.execute(&cmd).await.map_err(|e| {
            error!("Defining the PDP context failed: {:?}", e);
            Error::DeviceError
        })?;
        drop(tx);

        self.state.with_shared(|s| {
            s.username = username;
            s.password = password;
            s.credentials_set = true;
        });
        Ok(())
    }

    async fn poll_registration(&mut self) -> bool {
        let start = Instant::now();
        loop {
            let res = {
                let mut tx = self.transaction(C::MISC_TIMEOUT).await;
                tx.query(&GetNetworkRegistrationStatus, "+CREG: %*d,%d")
                    .await
            };

            match res {
                Ok(captures) => {
                    let status = Status::from(captures.int(0).unwrap_or(0));
                    if status != Status::Searching {
                        debug!("Registration status: {:?}", status);
                        return status.registered();
                    }
                }
                Err(e) => {
                    warn!("Reading the registration status failed: {:?}", e);
                    return false;
                }
            }

            if start.elapsed() >= C::REGISTRATION_TIMEOUT {
                warn!("Still searching for a network, giving up");
                return false;
            }
            Timer::after(C::REGISTRATION_POLL_INTERVAL).await;
        }
    }

    fn slot_state(&self, socket: &Socket) -> Result<(Protocol, bool, Option<SocketAddr>), Error> {
        self.state.with_shared(|s| {
            s.sockets
                .get(socket.id())
                .map(|slot| (slot.protocol(), slot.connected(), slot.peer()))
                .ok_or(Error::NoSocket)
        })
    }
}

async fn activate<T: Read + Write>(
    ch: &mut Channel<T>,
    cid: ContextId,
    username: &str,
    password: &str,
) -> Result<IpAddr, channel::Error> {
    let captures = if username.is_empty() && password.is_empty() {
        let cmd = SetContextActivation {
            cid,
            status: ContextStatus::Activated,
        };
        ch.query(&cmd, "#SGACT: %s").await?
    } else {
        let cmd = SetContextActivationWithCredentials {
            cid,
            status: ContextStatus::Activated,
            username,
            password,
        };
        ch.query(&cmd, "#SGACT: %s").await?
    };

    captures
        .str(0)
        .and_then(|ip| ip.parse().ok())
        .ok_or(channel::Error::Rejected)
}

async fn send_payload<T: Read + Write>(
    ch: &mut Channel<T>,
    conn_id: u8,
    data: &[u8],
) -> Result<(), channel::Error> {
    let cmd = SendDataExtended {
        conn_id,
        bytes: data.len() as u16,
    };
    ch.send(&cmd).await?;
    ch.expect("> ").await?;
    ch.write(data).await?;
    ch.expect("OK").await?;
    Ok(())
}

async fn receive_payload<T: Read + Write>(
    ch: &mut Channel<T>,
    conn_id: u8,
    buf: &mut [u8],
) -> Result<usize, channel::Error> {
    let cmd = ReceiveData {
        conn_id,
        max_bytes: buf.len() as u16,
    };
    ch.send(&cmd).await?;
    let captures = ch.expect("#SRECV: %d,%d\r\n").await?;
    let len = captures.int(1).unwrap_or(0).clamp(0, buf.len() as i64) as usize;
    ch.read(&mut buf[..len]).await?;
    ch.expect("OK").await?;
    Ok(len)
}

impl<'d, T, C> ConnectionManagement for Interface<'d, T, C>
where
    T: Read + Write,
    C: CellularConfig<'d>,
{
    async fn init(&mut self) -> Result<(), Error> {
        let res = self.boot().await;
        self.state.with_shared(|s| {
            s.ip = None;
            let state = match res {
                Ok(()) => ConnectionState::Disconnected,
                Err(_) => ConnectionState::Uninitialized,
            };
            s.set_connection_state(state);
        });
        res
    }

    async fn set_credentials(&mut self, apn: Apn<'_>) -> Result<(), Error> {
        self.set_state(ConnectionState::ConfiguringContext);
        let res = self.define_context(apn).await;
        self.settle();
        res
    }

    async fn connect(&mut self) -> Result<(), Error> {
        let configured = self.state.with_shared(|s| s.credentials_set);
        if !configured && C::APN != Apn::None {
            if let Err(e) = self.set_credentials(C::APN).await {
                warn!("Applying the configured APN failed: {:?}", e);
                self.drop_connection();
                return Err(Error::NoConnection);
            }
        }

        if !self.registered().await {
            self.drop_connection();
            return Err(Error::NoConnection);
        }

        match self.acquire_address().await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("No address: {:?}", e);
                Err(Error::NoConnection)
            }
        }
    }

    async fn connect_with(&mut self, apn: Apn<'_>) -> Result<(), Error> {
        let res = match self.init().await {
            Ok(()) => match self.set_credentials(apn).await {
                Ok(()) => self.connect().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        res.map_err(|e| {
            warn!("Connecting failed: {:?}", e);
            Error::NoConnection
        })
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        let cmd = SetContextActivation {
            cid: C::CONTEXT_ID,
            status: ContextStatus::Deactivated,
        };
        let res = {
            let mut tx = self.transaction(C::MISC_TIMEOUT).await;
            tx.execute(&cmd).await
        };

        match res {
            Ok(()) => {
                self.drop_connection();
                Ok(())
            }
            Err(e) => {
                warn!("Deactivating the context failed: {:?}", e);
                Err(Error::DeviceError)
            }
        }
    }

    async fn registered(&mut self) -> bool {
        self.set_state(ConnectionState::Registering);
        let registered = self.poll_registration().await;
        self.settle();
        registered
    }

    async fn ip_address(&mut self) -> Option<IpAddr> {
        if let Some(ip) = self.state.with_shared(|s| s.ip) {
            return Some(ip);
        }
        self.acquire_address().await.ok()
    }

    async fn get_host_by_name(&mut self, name: &str) -> Result<IpAddr, Error> {
        if let Ok(ip) = name.parse::<IpAddr>() {
            return Ok(ip);
        }
        if name.len() > MAX_HOST_NAME_LEN {
            return Err(Error::DeviceError);
        }

        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        let captures = tx
            .query(
                &ResolveNameIp { host_name: name },
                "#QDNS: \"%*[^\"]\",\"%[^\"]\"",
            )
            .await?;
        captures
            .str(0)
            .and_then(|ip| ip.parse().ok())
            .ok_or(Error::DeviceError)
    }
}

impl<'d, T, C> SocketOperations<'d> for Interface<'d, T, C>
where
    T: Read + Write,
    C: CellularConfig<'d>,
{
    async fn socket_open(&mut self, protocol: Protocol) -> Result<Socket, Error> {
        let _tx = self.at.lock().await;
        let id = self
            .state
            .with_shared(|s| s.sockets.allocate(protocol))
            .ok_or(Error::NoSocket)?;
        debug!("Opened socket {}", id);
        Ok(Socket::new(id))
    }

    async fn socket_close(&mut self, socket: Socket) -> Result<(), (Socket, Error)> {
        let mut tx = self.transaction(C::MISC_TIMEOUT).await;
        match tx.execute(&SocketShutdown { conn_id: socket.id() }).await {
            Ok(()) => {
                self.state.with_shared(|s| s.sockets.release(socket.id()));
                debug!("Closed socket {}", socket.id());
                Ok(())
            }
            Err(e) => {
                warn!("Closing socket {} failed: {:?}", socket.id(), e);
                Err((socket, Error::DeviceError))
            }
        }
    }

    async fn socket_bind(&mut self, _socket: &Socket, _port: u16) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    async fn socket_listen(&mut self, _socket: &Socket, _backlog: usize) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    async fn socket_accept(&mut self, _socket: &Socket) -> Result<(Socket, SocketAddr), Error> {
        Err(Error::Unsupported)
    }

    async fn socket_connect(&mut self, socket: &Socket, remote: SocketAddr) -> Result<(), Error> {
        let (protocol, connected, _) = self.slot_state(socket)?;
        if connected {
            return Ok(());
        }

        let mut addr: String<64> = String::new();
        write!(addr, "{}", remote.ip()).map_err(|_| Error::DeviceError)?;
        let cmd = SocketDial {
            conn_id: socket.id(),
            protocol: protocol.into(),
            remote_port: remote.port(),
            remote_addr: &addr,
            closure_type: ClosureType::Immediate,
            local_port: 1,
            mode: ConnectionMode::Command,
        };

        let timeout = Duration::from_millis(C::SOCKET_CONNECT_TIMEOUT_DS as u64 * 100);
        let mut tx = self.transaction(timeout).await;
        tx.execute(&cmd).await.map_err(|e| {
            warn!("Dialing on socket {} failed: {:?}", socket.id(), e);
            Error::DeviceError
        })?;
        self.state.with_shared(|s| {
            if let Some(slot) = s.sockets.get_mut(socket.id()) {
                slot.connected = true;
                slot.peer = Some(remote);
            }
        });
        debug!(
            "Socket {} connected to {}:{}",
            socket.id(),
            addr.as_str(),
            remote.port()
        );
        Ok(())
    }

    async fn socket_send(&mut self, socket: &Socket, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Ok(0);
        }
        let data = &data[..data.len().min(MAX_PACKET_SIZE)];

        let mut tx = self.transaction(C::COMMUNICATION_TIMEOUT).await;
        match send_payload(&mut *tx, socket.id(), data).await {
            Ok(()) => {
                trace!("Sent {} bytes on socket {}", data.len(), socket.id());
                Ok(data.len())
            }
            Err(e) => {
                warn!("Sending on socket {} failed: {:?}", socket.id(), e);
                Err(Error::DeviceError)
            }
        }
    }

    async fn socket_recv(&mut self, socket: &Socket, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(MAX_PACKET_SIZE);

        let mut tx = self.transaction(C::COMMUNICATION_TIMEOUT).await;
        match receive_payload(&mut *tx, socket.id(), &mut buf[..max]).await {
            Ok(0) => Err(Error::WouldBlock),
            Ok(n) => {
                trace!("Received {} bytes on socket {}", n, socket.id());
                Ok(n)
            }
            Err(e) => {
                trace!("Nothing to read on socket {}: {:?}", socket.id(), e);
                Err(Error::WouldBlock)
            }
        }
    }

    async fn socket_sendto(
        &mut self,
        socket: &Socket,
        remote: SocketAddr,
        data: &[u8],
    ) -> Result<usize, Error> {
        let (_, connected, peer) = self.slot_state(socket)?;
        if connected && peer != Some(remote) {
            let res = {
                let mut tx = self.transaction(C::MISC_TIMEOUT).await;
                tx.execute(&SocketShutdown { conn_id: socket.id() }).await
            };
            if let Err(e) = res {
                warn!("Redialing socket {} failed: {:?}", socket.id(), e);
                return Err(Error::DeviceError);
            }
            self.state.with_shared(|s| {
                if let Some(slot) = s.sockets.get_mut(socket.id()) {
                    slot.connected = false;
                }
            });
        }

        self.socket_connect(socket, remote).await?;
        self.socket_send(socket, data).await
    }

    async fn socket_recvfrom(
        &mut self,
        socket: &Socket,
        buf: &mut [u8],
    ) -> Result<(usize, Option<SocketAddr>), Error> {
        let n = self.socket_recv(socket, buf).await?;
        let (_, _, peer) = self.slot_state(socket)?;
        Ok((n, peer))
    }

    fn socket_attach(&mut self, socket: &Socket, callback: &'d dyn Fn()) {
        self.state.with_shared(|s| {
            if let Some(slot) = s.sockets.get_mut(socket.id()) {
                slot.callback = Some(callback);
            }
        });
    }

    fn socket_detach(&mut self, socket: &Socket) {
        self.state.with_shared(|s| {
            if let Some(slot) = s.sockets.get_mut(socket.id()) {
                slot.callback = None;
            }
        });
    }
}
