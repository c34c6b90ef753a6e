use atat::atat_derive::AtatEnum;

/// `<mode>` of `+CMGF`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum MessageFormat {
    Pdu = 0,
    Text = 1,
}

/// `<show>` of `+CSDH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum ShowTextParameters {
    /// 0: do not show header values
    Hidden = 0,
    /// 1: show the values in result codes, including `<length>`
    Shown = 1,
}

/// `<mode>` of `+CNMI`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum IndicationMode {
    /// 0: buffer indications in the TA
    Buffer = 0,
    /// 1: discard indications when the link is reserved
    DiscardWhenReserved = 1,
    /// 2: buffer indications when the link is reserved, flush afterwards
    BufferWhenReserved = 2,
}

/// `<mt>` of `+CNMI`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum MessageIndication {
    /// 0: no SMS-DELIVER indications are routed to the TE
    None = 0,
    /// 1: indicate storage location with `+CMTI`
    StoredIndication = 1,
    /// 2: route the message directly with `+CMT`
    Direct = 2,
}
