//! GPS receiver of the MTSAS radio.

use core::fmt::Write as _;

use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::{Read, Write};
use heapless::String;

use crate::channel::{AtHandle, Transaction};
use crate::command::gps::{types::GpsPower, GetAcquiredPosition, GetGpsPower, SetGpsPower};
use crate::config::CellularConfig;
use crate::error::Error;
use crate::state::State;

pub const FIELD_LEN: usize = 32;

const NO_FIX: &str = "None";

/// A position report. Fields the receiver could not provide read `"None"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsData {
    pub utc: String<FIELD_LEN>,
    pub latitude: String<FIELD_LEN>,
    pub longitude: String<FIELD_LEN>,
    pub altitude: String<FIELD_LEN>,
}

impl Default for GpsData {
    fn default() -> Self {
        let none = || String::try_from(NO_FIX).unwrap_or_default();
        Self {
            utc: none(),
            latitude: none(),
            longitude: none(),
            altitude: none(),
        }
    }
}

pub struct Gps<'d, T> {
    at: AtHandle<'d, T>,
    misc_timeout: Duration,
    fix_timeout: Duration,
    poll_interval: Duration,
}

impl<'d, T: Read + Write> Gps<'d, T> {
    pub fn new<C: CellularConfig<'d>>(state: &'d State<'d, T>) -> Self {
        Self {
            at: state.at(),
            misc_timeout: C::MISC_TIMEOUT,
            fix_timeout: C::GPS_FIX_TIMEOUT,
            poll_interval: C::GPS_POLL_INTERVAL,
        }
    }

    pub async fn state(&mut self) -> Result<GpsPower, Error> {
        let mut tx = self.transaction().await;
        let captures = tx.query(&GetGpsPower, "$GPSP: %d").await?;
        captures
            .int(0)
            .map(GpsPower::from)
            .ok_or(Error::DeviceError)
    }

    /// Power the receiver on or off, skipping the command when it already is.
    pub async fn set_state(&mut self, status: GpsPower) -> Result<(), Error> {
        if self.state().await? == status {
            return Ok(());
        }
        let mut tx = self.transaction().await;
        tx.execute(&SetGpsPower { status }).await?;
        debug!("GPS receiver {:?}", status);
        Ok(())
    }

    /// Wait for a fix and report it.
    ///
    /// The receiver is switched on for the duration of the call. Without a
    /// fix the given defaults are reported verbatim as coordinates.
    pub async fn location(&mut self, lat_default: &str, lon_default: &str) -> GpsData {
        let mut data = GpsData::default();

        if let Err(e) = self.set_state(GpsPower::On).await {
            warn!("Powering the GPS receiver failed: {:?}", e);
        }
        let started = {
            let mut tx = self.transaction().await;
            tx.execute(&GetAcquiredPosition).await
        };
        if let Err(e) = started {
            warn!("GPS receiver not responding: {:?}", e);
            return data;
        }

        let start = Instant::now();
        let fix = loop {
            if let Some(fix) = self.poll_fix().await {
                break Some(fix);
            }
            if start.elapsed() >= self.fix_timeout {
                break None;
            }
            Timer::after(self.poll_interval).await;
        };

        if let Err(e) = self.set_state(GpsPower::Off).await {
            warn!("Powering the GPS receiver down failed: {:?}", e);
        }

        match fix {
            Some(fix) => {
                info!("GPS fix at {}", fix.utc.as_str());
                data.utc = fix.utc;
                data.altitude = fix.altitude;
                data.latitude = to_decimal_degrees(&fix.latitude).unwrap_or(fix.latitude);
                data.longitude = to_decimal_degrees(&fix.longitude).unwrap_or(fix.longitude);
            }
            None => {
                warn!("No GPS fix, using the default position");
                data.latitude = String::try_from(lat_default).unwrap_or_default();
                data.longitude = String::try_from(lon_default).unwrap_or_default();
            }
        }
        data
    }

    /// Query `$GPSACP` once, `None` while the receiver has no fix.
    async fn poll_fix(&mut self) -> Option<GpsData> {
        let captures = {
            let mut tx = self.transaction().await;
            match tx.query(&GetAcquiredPosition, "$GPSACP:%[^\r\n]").await {
                Ok(captures) => captures,
                Err(e) => {
                    debug!("Position query failed: {:?}", e);
                    return None;
                }
            }
        };
        parse_position(captures.str(0)?.trim())
    }

    async fn transaction(&self) -> Transaction<'d, T> {
        let mut tx = self.at.lock().await;
        tx.set_timeout(self.misc_timeout);
        tx
    }
}

/// `<UTC>,<lat>,<lon>,<hdop>,<alt>,...`, all of the first five set.
fn parse_position(report: &str) -> Option<GpsData> {
    let mut fields = report.split(',');
    let mut next = || {
        fields
            .next()
            .filter(|f| !f.is_empty())
            .and_then(|f| String::try_from(f).ok())
    };
    let utc = next()?;
    let latitude = next()?;
    let longitude = next()?;
    let _hdop = next()?;
    let altitude = next()?;
    Some(GpsData {
        utc,
        latitude,
        longitude,
        altitude,
    })
}

/// Convert an NMEA style coordinate (`ddmm.mmmm` followed by `N`/`S`, or
/// `dddmm.mmmm` followed by `E`/`W`) to signed decimal degrees, south and
/// west negative.
pub fn to_decimal_degrees(coordinate: &str) -> Option<String<FIELD_LEN>> {
    let direction = coordinate.chars().last()?;
    let (degree_digits, sign) = match direction {
        'N' => (2, 1.0),
        'S' => (2, -1.0),
        'E' => (3, 1.0),
        'W' => (3, -1.0),
        _ => return None,
    };
    let value = &coordinate[..coordinate.len() - 1];
    if !value.is_char_boundary(degree_digits) {
        return None;
    }

    let degrees: f64 = value[..degree_digits].parse().ok()?;
    let minutes: f64 = value[degree_digits..].parse().ok()?;
    let mut out = String::new();
    write!(out, "{:.6}", sign * (degrees + minutes / 60.0)).ok()?;
    Some(out)
}
