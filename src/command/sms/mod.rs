//! ### 3.5.5 - Short Messages Service
pub mod types;

use atat::atat_derive::AtatCmd;
use types::{IndicationMode, MessageFormat, MessageIndication, ShowTextParameters};

use super::NoResponse;

/// 3.5.5.2.1 Message format +CMGF
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGF", NoResponse)]
pub struct SetMessageFormat {
    #[at_arg(position = 0)]
    pub mode: MessageFormat,
}

/// 3.5.5.3.2 Show text mode parameters +CSDH
#[derive(Clone, AtatCmd)]
#[at_cmd("+CSDH", NoResponse)]
pub struct SetShowTextParameters {
    #[at_arg(position = 0)]
    pub show: ShowTextParameters,
}

/// 3.5.5.4.1 New message indications to terminal equipment +CNMI
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNMI", NoResponse)]
pub struct SetNewMessageIndication {
    #[at_arg(position = 0)]
    pub mode: IndicationMode,
    #[at_arg(position = 1)]
    pub mt: MessageIndication,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::wire;

    #[test]
    fn direct_text_delivery() {
        assert_eq!(
            wire(&SetMessageFormat {
                mode: MessageFormat::Text
            }),
            "AT+CMGF=1\r\n"
        );
        assert_eq!(
            wire(&SetShowTextParameters {
                show: ShowTextParameters::Shown
            }),
            "AT+CSDH=1\r\n"
        );
        assert_eq!(
            wire(&SetNewMessageIndication {
                mode: IndicationMode::BufferWhenReserved,
                mt: MessageIndication::Direct,
            }),
            "AT+CNMI=2,2\r\n"
        );
    }
}
