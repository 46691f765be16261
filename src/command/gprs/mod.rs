//! SIM800 bearer and single-connection TCP/IP application commands
pub mod responses;

use atat::atat_derive::AtatCmd;
use responses::*;

use super::general::types::OnOff;
use super::{NoResponse, Reply};

/// AT+CIPSHUT Deactivate GPRS PDP context
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPSHUT", NoResponse, timeout_ms = 65000)]
pub struct Shutdown;

impl Reply for Shutdown {
    const EXPECT: Option<&'static str> = Some("SHUT OK");
}

/// AT+CIPMUX Start up multi-IP connection
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse)]
pub struct SetMultiplex {
    #[at_arg(position = 0)]
    pub mode: OnOff,
}

impl Reply for SetMultiplex {}

/// AT+CIPHEAD Add an IP head when receiving data
///
/// With the head enabled, incoming datagrams are announced as
/// `+IPD,<len>:<payload>`.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPHEAD", NoResponse)]
pub struct SetReceiveHeader {
    #[at_arg(position = 0)]
    pub mode: OnOff,
}

impl Reply for SetReceiveHeader {}

/// AT+SAPBR=3 Bearer settings for IP-based applications
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+SAPBR=3,1,", NoResponse, value_sep = false)]
pub struct SetBearerParameter<'a> {
    #[at_arg(position = 0, len = 8)]
    pub tag: &'a str,
    #[at_arg(position = 1, len = 64)]
    pub value: &'a str,
}

impl Reply for SetBearerParameter<'_> {}

/// AT+SAPBR=1 Open bearer
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+SAPBR=1,1", NoResponse, timeout_ms = 85000)]
pub struct OpenBearer;

impl Reply for OpenBearer {}

/// AT+CSTT Start task and set APN
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CSTT", NoResponse)]
pub struct StartTask<'a> {
    #[at_arg(position = 0, len = 64)]
    pub apn: &'a str,
}

impl Reply for StartTask<'_> {}

/// AT+CIICR Bring up wireless connection with GPRS
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIICR", NoResponse, timeout_ms = 85000)]
pub struct BringUp;

impl Reply for BringUp {}

/// AT+CIFSR Get local IP address
///
/// The modem answers with the bare dotted quad and no `OK`, so this completes
/// on the first `.` and the rest of the line is read separately.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse)]
pub struct GetLocalIp;

impl Reply for GetLocalIp {
    const EXPECT: Option<&'static str> = Some(".");
}

/// AT+CIPSTART Start up a UDP connection
///
/// The SIM800 wants the port quoted like the host.
#[derive(Debug, Clone)]
pub struct StartUdp<'a> {
    pub host: &'a str,
    pub port: u16,
}

impl atat::AtatCmd for StartUdp<'_> {
    type Response = NoResponse;

    const MAX_LEN: usize = 128;
    const MAX_TIMEOUT_MS: u32 = 10_000;

    fn write(&self, mut buf: &mut [u8]) -> usize {
        let buf_len = buf.len();
        use embedded_io::Write;
        match write!(
            buf,
            "AT+CIPSTART=\"UDP\",\"{}\",\"{}\"\r\n",
            self.host, self.port
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

impl Reply for StartUdp<'_> {
    const EXPECT: Option<&'static str> = Some("CONNECT OK");
    const FAILURES: &'static [&'static str] = &["CONNECT FAIL", "ERROR"];
}

/// AT+CIPSEND Send data through the connection
///
/// Completes on the `>` prompt, after which exactly `len` payload bytes follow.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse)]
pub struct SendData {
    #[at_arg(position = 0)]
    pub len: usize,
}

impl Reply for SendData {
    const EXPECT: Option<&'static str> = Some(">");
}

/// AT+CIPCLOSE Close the UDP connection
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse)]
pub struct CloseConnection;

impl Reply for CloseConnection {
    const EXPECT: Option<&'static str> = Some("CLOSE OK");
}

/// AT+CIPGSMLOC Cell-based location and time
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CIPGSMLOC=1,1", GsmLocationResponse, timeout_ms = 10000)]
pub struct GetGsmLocation;

impl Reply for GetGsmLocation {
    const EXPECT: Option<&'static str> = Some("+CIPGSMLOC:");
    const INFO: &'static str = "+CIPGSMLOC:";
}
