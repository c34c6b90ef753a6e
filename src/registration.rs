/// Network registration status as reported by `+CREG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Not registered, the MT is not searching for an operator
    #[default]
    NotRegistered,
    /// Registered, home network
    Home,
    /// Not registered, but the MT is searching for an operator
    Searching,
    /// Registration denied
    Denied,
    Unknown,
    /// Registered, roaming
    Roaming,
}

impl From<i64> for Status {
    fn from(v: i64) -> Self {
        match v {
            0 => Self::NotRegistered,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            5 => Self::Roaming,
            _ => Self::Unknown,
        }
    }
}

impl Status {
    pub fn registered(&self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// Progress of bringing the data connection up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Resetting,
    AwaitingHandshake,
    ConfiguringContext,
    Registering,
    AcquiringAddress,
    Connected,
    Disconnected,
}
