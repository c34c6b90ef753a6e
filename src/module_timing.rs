//! Default timings of the Telit HE910/LE910 family used in MTSAS radios.
//!
//! These back the associated constants of [`crate::config::CellularConfig`].

use embassy_time::Duration;

/// Timeout for ordinary command exchanges
pub const fn misc_timeout() -> Duration {
    Duration::from_millis(3000)
}

/// Time the module needs to come back after `AT#REBOOT`
pub const fn reboot_timeout() -> Duration {
    Duration::from_millis(10_000)
}

/// Timeout for the socket data path (`#SSENDEXT` / `#SRECV`)
pub const fn communication_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Low time of the `RESET` line to trigger a hardware reset
pub const fn reset_time() -> Duration {
    Duration::from_millis(200)
}

/// Time to wait for module to boot
pub const fn boot_time() -> Duration {
    Duration::from_secs(1)
}

/// Upper bound on waiting for network registration
pub const fn registration_timeout() -> Duration {
    Duration::from_secs(180)
}

pub const fn registration_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// How long the GPS receiver is given to acquire a fix
pub const fn gps_fix_timeout() -> Duration {
    Duration::from_secs(120)
}

pub const fn gps_poll_interval() -> Duration {
    Duration::from_secs(4)
}

/// Fallback wake-up of the event runner when no RX signal is raised
pub const fn event_poll_interval() -> Duration {
    Duration::from_secs(1)
}
