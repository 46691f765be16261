//! SIM5360/SIM7600 packet domain and socket commands
pub mod responses;

use core::net::Ipv4Addr;

use atat::atat_derive::{AtatCmd, AtatEnum};
use responses::*;

use super::{NoResponse, Reply};

/// Socket index used for the single UDP link.
pub const LINK_ID: u8 = 0;

/// PDP context carrying the socket service.
pub const CONTEXT_ID: u8 = 1;

/// AT+CGDCONT Define PDP context
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse)]
pub struct SetPdpContext<'a> {
    #[at_arg(position = 0)]
    pub cid: u8,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'a str,
    #[at_arg(position = 2, len = 64)]
    pub apn: &'a str,
}

impl Reply for SetPdpContext<'_> {}

/// `<mode>` of +CNMP
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NetworkMode {
    Automatic = 2,
    WcdmaOnly = 14,
}

/// AT+CNMP Preferred mode selection
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CNMP", NoResponse, timeout_ms = 5000)]
pub struct SetNetworkMode {
    #[at_arg(position = 0)]
    pub mode: NetworkMode,
}

impl Reply for SetNetworkMode {}

/// AT+CIPRXGET Buffered receive mode
///
/// With mode 1 the modem keeps inbound datagrams and only announces them
/// with `+CIPRXGET: 1,<link>`; the data is fetched with [`ReadData`].
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPRXGET=1", NoResponse)]
pub struct SetManualReceive;

impl Reply for SetManualReceive {}

/// AT+NETOPEN Open socket service
///
/// Completes on the `+NETOPEN:` line that follows the `OK`.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+NETOPEN", NetOpenResponse, timeout_ms = 30000)]
pub struct NetOpen;

impl Reply for NetOpen {
    const EXPECT: Option<&'static str> = Some("+NETOPEN:");
    const INFO: &'static str = "+NETOPEN:";
}

/// AT+NETCLOSE Close socket service
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+NETCLOSE", NoResponse, timeout_ms = 10000)]
pub struct NetClose;

impl Reply for NetClose {
    const EXPECT: Option<&'static str> = Some("+NETCLOSE:");
}

/// AT+CIPOPEN Establish a UDP socket on link 0, bound to a local port
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPOPEN=0,\"UDP\",,,", SocketOpen, value_sep = false, timeout_ms = 10000)]
pub struct OpenUdp {
    #[at_arg(position = 0)]
    pub local_port: u16,
}

impl Reply for OpenUdp {
    const EXPECT: Option<&'static str> = Some("+CIPOPEN:");
    const INFO: &'static str = "+CIPOPEN:";
}

/// AT+CIPSEND Send a datagram to a remote peer
///
/// Completes on the `>` prompt, after which exactly `len` payload bytes follow.
#[derive(Debug, Clone)]
pub struct SendTo {
    pub len: usize,
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl atat::AtatCmd for SendTo {
    type Response = NoResponse;

    const MAX_LEN: usize = 64;

    fn write(&self, mut buf: &mut [u8]) -> usize {
        let buf_len = buf.len();
        use embedded_io::Write;
        match write!(
            buf,
            "AT+CIPSEND={},{},\"{}\",{}\r\n",
            LINK_ID, self.len, self.ip, self.port
        ) {
            Ok(()) => buf_len - buf.len(),
            Err(_) => 0,
        }
    }

    fn parse(
        &self,
        _resp: Result<&[u8], atat::InternalError>,
    ) -> Result<Self::Response, atat::Error> {
        Ok(NoResponse)
    }
}

impl Reply for SendTo {
    const EXPECT: Option<&'static str> = Some(">");
}

/// AT+CIPRXGET=2 Read buffered data of link 0
///
/// Completes once the `+CIPRXGET: 2,` header line is in. The payload that
/// follows it has to be read separately.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPRXGET=2,0,", ReceiveHeader, value_sep = false)]
pub struct ReadData {
    #[at_arg(position = 0)]
    pub max: usize,
}

impl Reply for ReadData {
    const EXPECT: Option<&'static str> = Some("+CIPRXGET: 2,");
    const INFO: &'static str = "+CIPRXGET: 2,";
}

/// AT+CIPCLOSE Close socket 0
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE=0", NoResponse, timeout_ms = 5000)]
pub struct CloseSocket;

impl Reply for CloseSocket {}

/// AT+IPADDR Inquire socket PDP address
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+IPADDR", IpAddressResponse)]
pub struct GetIpAddress;

impl Reply for GetIpAddress {
    const INFO: &'static str = "+IPADDR:";
}
