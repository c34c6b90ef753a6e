use atat::atat_derive::AtatEnum;

/// `<status>` of `$GPSP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsPower {
    Off = 0,
    On = 1,
}

impl From<i64> for GpsPower {
    fn from(v: i64) -> Self {
        if v == 0 {
            Self::Off
        } else {
            Self::On
        }
    }
}
