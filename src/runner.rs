use embassy_futures::select::select3;
use embassy_time::{Duration, Ticker};
use embedded_io_async::{Read, Write};

use crate::channel::AtHandle;
use crate::command::Oob;
use crate::module_timing::event_poll_interval;
use crate::state::State;

/// Background task dispatching socket ring indications.
///
/// The modem does not say which socket has data, so a ring is broadcast to
/// every socket with an attached callback. Callbacks run after the channel
/// lock is released and may start their own transactions.
///
/// Wakes when the serial driver raises [`State::rx_signal`], when a consumer
/// captured a ring, and periodically for drivers that raise nothing.
pub struct Runner<'d, T> {
    state: &'d State<'d, T>,
    at: AtHandle<'d, T>,
}

impl<'d, T: Read + Write> Runner<'d, T> {
    pub(crate) fn new(state: &'d State<'d, T>) -> Self {
        Self {
            state,
            at: state.at(),
        }
    }

    pub async fn run(&mut self) -> ! {
        let mut ticker = Ticker::every(event_poll_interval());
        loop {
            select3(
                self.state.rx_signal().wait(),
                self.state.oob_signal(Oob::SocketRing).wait(),
                ticker.next(),
            )
            .await;
            self.poll_events().await;
        }
    }

    /// Capture whatever is pending on the channel and dispatch queued rings.
    ///
    /// Returns whether callbacks were invoked.
    pub async fn poll_events(&mut self) -> bool {
        let rings = {
            let mut tx = self.at.lock().await;
            tx.set_timeout(Duration::from_ticks(0));
            if let Err(e) = tx.scan().await {
                warn!("Scanning for events failed: {:?}", e);
            }

            let mut rings = 0usize;
            while let Some(ring) = tx.take_notification(Oob::SocketRing) {
                trace!("{:?}", core::str::from_utf8(&ring.line).unwrap_or("SRING"));
                rings += 1;
            }
            rings
        };
        // Rings drained above were signaled again when the lock dropped
        self.state.oob_signal(Oob::SocketRing).reset();

        if rings == 0 {
            return false;
        }

        let callbacks = self.state.with_shared(|s| s.sockets.callbacks());
        debug!(
            "{} socket rings, notifying {} sockets",
            rings,
            callbacks.len()
        );
        for callback in callbacks {
            callback();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Interface;
    use crate::socket::Protocol;
    use crate::test_helpers::{MockModem, TestConfig};
    use crate::traits::{ConnectionManagement, SocketOperations};
    use core::cell::Cell;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_time::Timer;

    #[test]
    fn rings_reach_attached_sockets_once() {
        let first = Cell::new(0);
        let on_first = || first.set(first.get() + 1);

        let modem = MockModem::new();
        let state = State::new(modem.clone());
        let mut iface = Interface::new(&state, TestConfig);
        let mut runner = Runner::new(&state);

        let a = block_on(iface.socket_open(Protocol::Tcp)).unwrap();
        let _b = block_on(iface.socket_open(Protocol::Udp)).unwrap();
        iface.socket_attach(&a, &on_first);

        modem.inject(b"SRING: 1\r\nSRING: 2\r\n");
        assert!(block_on(runner.poll_events()));
        assert_eq!(first.get(), 1);

        assert!(!block_on(runner.poll_events()));
        assert_eq!(first.get(), 1);
    }

    #[test]
    fn ring_captured_by_another_transaction() {
        let rings = Cell::new(0);
        let on_ring = || rings.set(rings.get() + 1);

        let modem = MockModem::new();
        modem.command("AT+CREG?", "\r\n+CREG: 0,1\r\nSRING: 3\r\n\r\nOK\r\n");
        let state = State::new(modem.clone());
        let mut iface = Interface::new(&state, TestConfig);
        let mut runner = Runner::new(&state);

        let socket = block_on(iface.socket_open(Protocol::Tcp)).unwrap();
        iface.socket_attach(&socket, &on_ring);

        assert!(block_on(iface.registered()));
        assert!(state.oob_signal(Oob::SocketRing).signaled());

        assert!(block_on(runner.poll_events()));
        assert_eq!(rings.get(), 1);
        assert!(!state.oob_signal(Oob::SocketRing).signaled());
    }

    #[test]
    fn runner_wakes_on_received_bytes() {
        let rings = Cell::new(0);
        let on_ring = || rings.set(rings.get() + 1);

        let modem = MockModem::new();
        let state = State::new(modem.clone());
        let mut iface = Interface::new(&state, TestConfig);
        let mut runner = Runner::new(&state);

        let socket = block_on(iface.socket_open(Protocol::Tcp)).unwrap();
        iface.socket_attach(&socket, &on_ring);

        let consumer = async {
            modem.inject(b"SRING: 1\r\n");
            state.rx_signal().signal(());
            Timer::after(Duration::from_millis(20)).await;
            rings.get()
        };
        match block_on(select(runner.run(), consumer)) {
            Either::First(_) => unreachable!(),
            Either::Second(count) => assert_eq!(count, 1),
        }
    }

    #[test]
    fn rx_signal_raised_from_another_thread() {
        let rings = Cell::new(0);
        let on_ring = || rings.set(rings.get() + 1);

        let modem = MockModem::new();
        let state = State::new(modem.clone());
        let mut iface = Interface::new(&state, TestConfig);
        let mut runner = Runner::new(&state);

        let socket = block_on(iface.socket_open(Protocol::Tcp)).unwrap();
        iface.socket_attach(&socket, &on_ring);
        modem.inject(b"SRING: 1\r\n");

        let rx = state.rx_signal();
        let count = std::thread::scope(|s| {
            s.spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(10));
                rx.signal(());
            });
            let consumer = async {
                Timer::after(Duration::from_millis(100)).await;
                rings.get()
            };
            match block_on(select(runner.run(), consumer)) {
                Either::First(_) => unreachable!(),
                Either::Second(count) => count,
            }
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn runner_dispatches_rings_seen_by_consumers() {
        let rings = Cell::new(0);
        let on_ring = || rings.set(rings.get() + 1);

        let modem = MockModem::new();
        modem.command("AT+CREG?", "\r\nSRING: 1\r\n+CREG: 0,5\r\n\r\nOK\r\n");
        let state = State::new(modem.clone());
        let mut iface = Interface::new(&state, TestConfig);
        let mut runner = Runner::new(&state);

        let socket = block_on(iface.socket_open(Protocol::Udp)).unwrap();
        iface.socket_attach(&socket, &on_ring);

        let consumer = async {
            let registered = iface.registered().await;
            Timer::after(Duration::from_millis(20)).await;
            (registered, rings.get())
        };
        match block_on(select(runner.run(), consumer)) {
            Either::First(_) => unreachable!(),
            Either::Second((registered, count)) => {
                assert!(registered);
                assert_eq!(count, 1);
            }
        }
    }
}
