use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum Echo {
    /// 0: Echo off
    Disable = 0,
    /// 1: Echo on
    Enable = 1,
}
