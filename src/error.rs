use crate::channel;

/// Failure of a public interface operation.
///
/// Transaction level failures collapse into [`Error::DeviceError`] unless the
/// operation documents a more specific translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Registration or context activation did not succeed
    NoConnection,
    /// The modem did not answer as expected
    DeviceError,
    /// All socket slots are in use
    NoSocket,
    /// The operation has no meaning on this modem
    Unsupported,
    /// No data is available right now
    WouldBlock,
}

impl Error {
    /// Sockets-layer status code, for callers mapping results onto the
    /// `{0, byte count, negative error}` convention.
    pub const fn code(&self) -> i32 {
        match self {
            Error::WouldBlock => -3001,
            Error::Unsupported => -3002,
            Error::NoConnection => -3004,
            Error::NoSocket => -3005,
            Error::DeviceError => -3012,
        }
    }
}

impl From<channel::Error> for Error {
    fn from(_: channel::Error) -> Self {
        Self::DeviceError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_surface_as_device_error() {
        assert_eq!(Error::from(channel::Error::Timeout), Error::DeviceError);
        assert_eq!(Error::from(channel::Error::Rejected), Error::DeviceError);
    }

    #[test]
    fn codes_are_negative_and_distinct() {
        let all = [
            Error::NoConnection,
            Error::DeviceError,
            Error::NoSocket,
            Error::Unsupported,
            Error::WouldBlock,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.code() < 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
