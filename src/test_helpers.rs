//! Scripted modem for driving the channel in tests.

use core::cell::RefCell;
use core::convert::Infallible;
use core::future::poll_fn;
use core::task::{Poll, Waker};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use atat::AtatCmd;
use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorType, Read, Write};

use crate::config::{CellularConfig, NoPin};

/// Serialize a command the way the channel puts it on the wire.
pub fn wire<C: AtatCmd>(cmd: &C) -> String {
    let mut buf = [0u8; 256];
    let len = cmd.write(&mut buf);
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

enum Exchange {
    Command { line: String, reply: Vec<u8> },
    Payload { data: Vec<u8>, reply: Vec<u8> },
}

#[derive(Default)]
struct Inner {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    script: VecDeque<Exchange>,
    standing: Vec<(String, Vec<u8>)>,
    commands: Vec<String>,
    payloads: Vec<Vec<u8>>,
    waker: Option<Waker>,
    latency: Option<Duration>,
}

impl Inner {
    fn reply(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn process(&mut self) {
        loop {
            if let Some(Exchange::Payload { data, .. }) = self.script.front() {
                let len = data.len();
                if self.tx.len() < len {
                    return;
                }
                let got: Vec<u8> = self.tx.drain(..len).collect();
                if let Some(Exchange::Payload { data, reply }) = self.script.pop_front() {
                    if got == data {
                        self.reply(&reply);
                    }
                }
                self.payloads.push(got);
                continue;
            }

            let Some(end) = self.tx.iter().position(|b| *b == b'\r') else {
                return;
            };
            let raw: Vec<u8> = self.tx.drain(..=end).collect();
            if self.tx.first() == Some(&b'\n') {
                self.tx.remove(0);
            }
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            self.commands.push(line.clone());

            let scripted =
                matches!(self.script.front(), Some(Exchange::Command { line: l, .. }) if *l == line);
            if scripted {
                if let Some(Exchange::Command { reply, .. }) = self.script.pop_front() {
                    self.reply(&reply);
                }
            } else if let Some((_, reply)) = self.standing.iter().find(|(l, _)| *l == line) {
                let reply = reply.clone();
                self.reply(&reply);
            }
        }
    }
}

/// A modem answering from a script.
///
/// Command lines written by the driver are matched against the front of the
/// script; a match queues its reply for reading. Lines that match neither the
/// script nor a standing reply are logged and left unanswered.
#[derive(Clone, Default)]
pub struct MockModem {
    inner: Rc<RefCell<Inner>>,
}

impl MockModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the command line `line` (without `\r\n`) and answer `reply`.
    pub fn command(&self, line: &str, reply: &str) -> &Self {
        self.inner
            .borrow_mut()
            .script
            .push_back(Exchange::Command {
                line: line.into(),
                reply: reply.as_bytes().to_vec(),
            });
        self
    }

    /// Expect exactly `data` as raw payload and answer `reply`.
    pub fn payload(&self, data: &[u8], reply: &str) -> &Self {
        self.inner
            .borrow_mut()
            .script
            .push_back(Exchange::Payload {
                data: data.to_vec(),
                reply: reply.as_bytes().to_vec(),
            });
        self
    }

    /// Answer `line` with `reply` whenever it is not the next scripted line.
    pub fn always(&self, line: &str, reply: &str) -> &Self {
        self.inner
            .borrow_mut()
            .standing
            .push((line.into(), reply.as_bytes().to_vec()));
        self
    }

    /// Delay every read by `latency`, so concurrent consumers get polled
    /// in the middle of an exchange.
    pub fn latency(&self, latency: Duration) -> &Self {
        self.inner.borrow_mut().latency = Some(latency);
        self
    }

    /// Make unsolicited bytes available for reading.
    pub fn inject(&self, bytes: &[u8]) {
        self.inner.borrow_mut().reply(bytes);
    }

    /// Every command line written so far.
    pub fn commands(&self) -> Vec<String> {
        self.inner.borrow().commands.clone()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().payloads.clone()
    }

    /// Scripted exchanges that have not happened yet.
    pub fn pending(&self) -> usize {
        self.inner.borrow().script.len()
    }
}

impl ErrorType for MockModem {
    type Error = Infallible;
}

impl Read for MockModem {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let latency = self.inner.borrow().latency;
        if let Some(latency) = latency {
            Timer::after(latency).await;
        }
        poll_fn(|cx| {
            let mut inner = self.inner.borrow_mut();
            if inner.rx.is_empty() {
                inner.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
            let n = buf.len().min(inner.rx.len());
            for (dst, src) in buf.iter_mut().zip(inner.rx.drain(..n)) {
                *dst = src;
            }
            Poll::Ready(Ok(n))
        })
        .await
    }
}

impl Write for MockModem {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        inner.tx.extend_from_slice(buf);
        inner.process();
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct TestConfig;

impl<'a> CellularConfig<'a> for TestConfig {
    type ResetPin = NoPin;

    const MISC_TIMEOUT: Duration = Duration::from_millis(50);
    const REBOOT_TIMEOUT: Duration = Duration::from_millis(100);
    const COMMUNICATION_TIMEOUT: Duration = Duration::from_millis(20);

    const HANDSHAKE_ATTEMPTS: u8 = 3;
    const ADDRESS_ATTEMPTS: u8 = 2;

    const REGISTRATION_TIMEOUT: Duration = Duration::from_millis(200);
    const REGISTRATION_POLL_INTERVAL: Duration = Duration::from_millis(5);

    const GPS_FIX_TIMEOUT: Duration = Duration::from_millis(40);
    const GPS_POLL_INTERVAL: Duration = Duration::from_millis(10);

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin> {
        None
    }
}
