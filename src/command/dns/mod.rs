//! ### 5.6.8 - DNS
use atat::atat_derive::AtatCmd;

use super::NoResponse;

/// 5.6.8.1 DNS response #QDNS
///
/// Resolves a host name with the DNS servers of the active context. The
/// module answers `#QDNS: "<host>","<address>"`.
#[derive(Clone, AtatCmd)]
#[at_cmd("#QDNS", NoResponse)]
pub struct ResolveNameIp<'a> {
    #[at_arg(position = 0, len = 128)]
    pub host_name: &'a str,
}
