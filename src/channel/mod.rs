//! The shared AT channel.
//!
//! Every consumer of the modem (sockets, connection management, SMS, GPS and
//! the event listener) talks through one [`Channel`]. Access is serialized by
//! [`AtHandle::lock`], which hands out a [`Transaction`]: a guard that keeps
//! the channel for a whole multi step exchange and puts it back in order on
//! every exit path.
//!
//! While any transaction scans input, lines starting with a registered
//! out-of-band prefix are set aside as [`Notification`]s instead of being
//! matched or discarded. Whoever holds the lock when such a line shows up
//! captures it, and releasing the lock wakes the matching consumer.

pub mod pattern;

use core::ops::{Deref, DerefMut, Range};

use atat::AtatCmd;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::{ErrorKind, Read, Write};
use heapless::{Deque, Vec};

use crate::command::Oob;
pub use pattern::{Captures, Match};

pub const INGRESS_BUF_SIZE: usize = 1024;
pub const CMD_BUF_SIZE: usize = 256;
pub const NOTIFICATION_CAPACITY: usize = 4;
pub const NOTIFICATION_LINE_LEN: usize = 128;
pub const NOTIFICATION_BODY_LEN: usize = 255;

const READ_CHUNK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The pattern did not show up before the active timeout
    Timeout,
    /// The modem answered with a final error result code
    Rejected,
    /// The ingress buffer filled up without anything matching
    Overflow,
    Transport(ErrorKind),
}

fn transport_error<E: embedded_io_async::Error>(e: E) -> Error {
    Error::Transport(e.kind())
}

/// An out-of-band indication captured from the ingress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub oob: Oob,
    /// The indication line, without its line ending
    pub line: Vec<u8, NOTIFICATION_LINE_LEN>,
    /// Raw bytes following the indication, truncated to capacity
    pub body: Vec<u8, NOTIFICATION_BODY_LEN>,
}

impl Notification {
    fn new(oob: Oob, line: &[u8], body: &[u8]) -> Self {
        let mut n = Self {
            oob,
            line: Vec::new(),
            body: Vec::new(),
        };
        n.line
            .extend_from_slice(&line[..line.len().min(NOTIFICATION_LINE_LEN)])
            .ok();
        n.body
            .extend_from_slice(&body[..body.len().min(NOTIFICATION_BODY_LEN)])
            .ok();
        n
    }
}

enum Step {
    Matched(Captures),
    Rejected,
    NeedMore,
}

enum OobScan {
    /// `oob` spans `consumed` bytes, its first line ends at `line_end`
    Complete {
        oob: Oob,
        line_end: usize,
        body: Range<usize>,
        consumed: usize,
    },
    Partial,
    None,
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Body length announced in the last field of an indication line.
fn announced_length(line: &[u8]) -> Option<usize> {
    let field = line.rsplit(|b| *b == b',').next()?;
    core::str::from_utf8(field).ok()?.trim().parse().ok()
}

fn is_final_error(line: &[u8]) -> bool {
    line == b"ERROR"
        || line.starts_with(b"+CME ERROR")
        || line.starts_with(b"+CMS ERROR")
        || line == b"NO CARRIER"
}

fn printable(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes).unwrap_or("<binary>")
}

pub struct Channel<T> {
    transport: T,
    timeout: Duration,
    ingress: Vec<u8, INGRESS_BUF_SIZE>,
    registered: u8,
    notifications: Deque<Notification, NOTIFICATION_CAPACITY>,
    fresh: u8,
}

impl<T: Read + Write> Channel<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            ingress: Vec::new(),
            registered: 0,
            notifications: Deque::new(),
            fresh: 0,
        }
    }

    /// Treat lines starting with `oob`'s prefix as notifications from now on.
    pub fn register(&mut self, oob: Oob) {
        self.registered |= oob.mask();
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Serialize and write `cmd`.
    ///
    /// Complete lines still sitting in the ingress buffer are left over from
    /// earlier exchanges; they are digested first so they can't be taken for
    /// the answer to `cmd`.
    pub async fn send<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<(), Error> {
        self.discard_stale().await?;

        let mut buf = [0u8; CMD_BUF_SIZE];
        let len = cmd.write(&mut buf);
        debug!("Sending command: {:?}", printable(&buf[..len]).trim_end());
        self.write(&buf[..len]).await
    }

    /// Write raw bytes, e.g. socket payload after a `> ` prompt.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transport.write_all(data).await.map_err(transport_error)?;
        self.transport.flush().await.map_err(transport_error)
    }

    /// Wait for `pattern` at the start of a line.
    ///
    /// Unrelated lines are discarded and out-of-band lines are queued while
    /// waiting. A zero timeout only looks at bytes that are already available.
    pub async fn expect(&mut self, pattern: &str) -> Result<Captures, Error> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.digest(Some(pattern)) {
                Step::Matched(captures) => return Ok(captures),
                Step::Rejected => return Err(Error::Rejected),
                Step::NeedMore => {}
            }
            self.check_overflow()?;
            if let Err(e) = self.fill(deadline).await {
                if e == Error::Timeout {
                    debug!("Timed out waiting for {:?}", pattern);
                }
                return Err(e);
            }
        }
    }

    /// `send` followed by waiting for the final `OK`.
    pub async fn execute<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<(), Error> {
        self.send(cmd).await?;
        self.expect("OK").await?;
        Ok(())
    }

    /// `send`, match the information response against `pattern`, then wait
    /// for the final `OK`.
    pub async fn query<Cmd: AtatCmd>(
        &mut self,
        cmd: &Cmd,
        pattern: &str,
    ) -> Result<Captures, Error> {
        self.send(cmd).await?;
        let captures = self.expect(pattern).await?;
        self.expect("OK").await?;
        Ok(captures)
    }

    /// Fill `buf` completely with raw bytes, bypassing line handling.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let deadline = Instant::now() + self.timeout;
        let mut filled = 0;
        loop {
            let n = self.ingress.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.ingress[..n]);
            self.consume(n);
            filled += n;
            if filled == buf.len() {
                return Ok(());
            }
            self.fill(deadline).await?;
        }
    }

    /// Pump input for the active timeout without waiting for anything in
    /// particular, so pending out-of-band lines get captured.
    pub async fn scan(&mut self) -> Result<(), Error> {
        let deadline = Instant::now() + self.timeout;
        loop {
            self.digest(None);
            self.check_overflow()?;
            match self.fill(deadline).await {
                Ok(()) => {}
                Err(Error::Timeout) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove and return the oldest queued notification for `oob`.
    pub fn take_notification(&mut self, oob: Oob) -> Option<Notification> {
        let mut found = None;
        for _ in 0..self.notifications.len() {
            let Some(n) = self.notifications.pop_front() else {
                break;
            };
            if found.is_none() && n.oob == oob {
                found = Some(n);
            } else {
                self.notifications.push_back(n).ok();
            }
        }
        found
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    /// Bitmask of tokens that got notifications since the last call.
    pub(crate) fn take_fresh(&mut self) -> u8 {
        core::mem::take(&mut self.fresh)
    }

    async fn discard_stale(&mut self) -> Result<(), Error> {
        let timeout = core::mem::replace(&mut self.timeout, Duration::from_ticks(0));
        let res = self.scan().await;
        self.timeout = timeout;
        res
    }

    async fn fill(&mut self, deadline: Instant) -> Result<(), Error> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::from_ticks(0));

        let mut chunk = [0u8; READ_CHUNK];
        let room = (INGRESS_BUF_SIZE - self.ingress.len()).min(READ_CHUNK);
        match with_timeout(remaining, self.transport.read(&mut chunk[..room])).await {
            Ok(Ok(0)) => Err(Error::Transport(ErrorKind::Other)),
            Ok(Ok(n)) => {
                self.ingress.extend_from_slice(&chunk[..n]).ok();
                Ok(())
            }
            Ok(Err(e)) => Err(transport_error(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    fn check_overflow(&mut self) -> Result<(), Error> {
        if self.ingress.is_full() {
            warn!("Ingress buffer full, dropping {} bytes", self.ingress.len());
            self.ingress.clear();
            return Err(Error::Overflow);
        }
        Ok(())
    }

    fn consume(&mut self, n: usize) {
        let len = self.ingress.len();
        self.ingress.copy_within(n..len, 0);
        self.ingress.truncate(len - n);
    }

    fn digest(&mut self, pattern: Option<&str>) -> Step {
        loop {
            let blank = self
                .ingress
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .count();
            self.consume(blank);
            if self.ingress.is_empty() {
                return Step::NeedMore;
            }

            match self.scan_oob() {
                OobScan::Complete {
                    oob,
                    line_end,
                    body,
                    consumed,
                } => {
                    self.enqueue(oob, line_end, body, consumed);
                    continue;
                }
                OobScan::Partial => return Step::NeedMore,
                OobScan::None => {}
            }

            let end = self.ingress.iter().position(|b| *b == b'\n');
            if let (Some(end), Some(_)) = (end, pattern) {
                let line = trim_cr(&self.ingress[..end]);
                if is_final_error(line) {
                    warn!("Command failed: {}", printable(line));
                    self.consume(end + 1);
                    return Step::Rejected;
                }
            }

            if let Some(pattern) = pattern {
                match pattern::matches(pattern, &self.ingress) {
                    Match::Matched { consumed, captures } => {
                        self.consume(consumed);
                        return Step::Matched(captures);
                    }
                    Match::Incomplete => return Step::NeedMore,
                    Match::Mismatch => {}
                }
            }

            let Some(end) = end else {
                return Step::NeedMore;
            };
            let line = trim_cr(&self.ingress[..end]);
            trace!("Discarding line: {:?}", printable(line));
            self.consume(end + 1);
        }
    }

    fn scan_oob(&self) -> OobScan {
        for oob in Oob::ALL {
            if self.registered & oob.mask() == 0 {
                continue;
            }
            let prefix = oob.prefix();
            if !self.ingress.starts_with(prefix) {
                continue;
            }

            let Some(line_end) = self.ingress.iter().position(|b| *b == b'\n') else {
                return OobScan::Partial;
            };
            let start = line_end + 1;
            if !oob.has_body() {
                return OobScan::Complete {
                    oob,
                    line_end,
                    body: start..start,
                    consumed: start,
                };
            }

            // Announced bodies are raw and may span lines
            if let Some(len) = announced_length(trim_cr(&self.ingress[..line_end])) {
                let end = start + len.min(NOTIFICATION_BODY_LEN);
                if self.ingress.len() < end {
                    return OobScan::Partial;
                }
                return OobScan::Complete {
                    oob,
                    line_end,
                    body: start..end,
                    consumed: end,
                };
            }

            let Some(n) = self.ingress[start..].iter().position(|b| *b == b'\n') else {
                return OobScan::Partial;
            };
            let body_end = start + trim_cr(&self.ingress[start..start + n]).len();
            return OobScan::Complete {
                oob,
                line_end,
                body: start..body_end,
                consumed: start + n + 1,
            };
        }
        OobScan::None
    }

    fn enqueue(&mut self, oob: Oob, line_end: usize, body: Range<usize>, consumed: usize) {
        let line = trim_cr(&self.ingress[..line_end]);
        let notification = Notification::new(oob, line, &self.ingress[body]);
        debug!("Captured out-of-band line: {:?}", printable(line));

        if self.notifications.is_full() {
            warn!("Notification queue full, dropping the oldest");
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification).ok();
        self.fresh |= oob.mask();
        self.consume(consumed);
    }
}

/// Shared handle to the channel, cheap to copy into every consumer.
pub struct AtHandle<'d, T> {
    channel: &'d Mutex<NoopRawMutex, Channel<T>>,
    signals: &'d [Signal<NoopRawMutex, ()>; Oob::COUNT],
}

impl<'d, T> Clone for AtHandle<'d, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'d, T> Copy for AtHandle<'d, T> {}

impl<'d, T: Read + Write> AtHandle<'d, T> {
    pub(crate) fn new(
        channel: &'d Mutex<NoopRawMutex, Channel<T>>,
        signals: &'d [Signal<NoopRawMutex, ()>; Oob::COUNT],
    ) -> Self {
        Self { channel, signals }
    }

    /// Wait for exclusive use of the channel.
    pub async fn lock(&self) -> Transaction<'d, T> {
        let guard = self.channel.lock().await;
        let timeout = guard.timeout();
        Transaction {
            guard,
            timeout,
            signals: self.signals,
        }
    }
}

/// Exclusive use of the channel for one exchange.
///
/// Dropping the transaction restores the timeout the channel had when it was
/// locked, wakes the consumers of notifications captured meanwhile and then
/// releases the lock.
pub struct Transaction<'d, T> {
    guard: MutexGuard<'d, NoopRawMutex, Channel<T>>,
    timeout: Duration,
    signals: &'d [Signal<NoopRawMutex, ()>; Oob::COUNT],
}

impl<'d, T> Deref for Transaction<'d, T> {
    type Target = Channel<T>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'d, T> DerefMut for Transaction<'d, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<'d, T> Drop for Transaction<'d, T> {
    fn drop(&mut self) {
        self.guard.timeout = self.timeout;
        let fresh = core::mem::take(&mut self.guard.fresh);
        for oob in Oob::ALL {
            if fresh & oob.mask() != 0 {
                self.signals[oob.index()].signal(());
            }
        }
    }
}
