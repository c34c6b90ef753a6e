use atat::atat_derive::AtatEnum;

/// `<txProt>` of `#SD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum SocketProtocol {
    TCP = 0,
    UDP = 1,
}

/// `<closureType>` of `#SD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum ClosureType {
    /// 0: local host closes immediately when remote host has closed
    Immediate = 0,
    /// 255: local host closes after an escape sequence
    AfterEscape = 255,
}

/// `<connMode>` of `#SD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum ConnectionMode {
    /// 0: online mode, the serial port becomes the data pipe
    Online = 0,
    /// 1: command mode, data moves with `#SSENDEXT` / `#SRECV`
    Command = 1,
}
