//! 3GPP TS 27.007 commands common to every SIMCom modem
pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::*;
use types::*;

use super::{NoResponse, Reply};

/// AT Attention
///
/// Checks whether the modem is powered and its UART is in command mode.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("", NoResponse)]
pub struct At;

impl Reply for At {}

/// ATE Command echo
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false)]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enable: OnOff,
}

impl Reply for SetEcho {}

/// AT+CPIN? SIM PIN status
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CPIN?", PinStatusResponse, timeout_ms = 5000)]
pub struct GetPinStatus;

impl Reply for GetPinStatus {
    const INFO: &'static str = "+CPIN:";
}

/// AT+CREG? Network registration
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CREG?", Registration)]
pub struct GetNetworkRegistration;

impl Reply for GetNetworkRegistration {
    const INFO: &'static str = "+CREG:";
}

/// AT+CSQ Signal quality report
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CSQ", SignalQuality)]
pub struct GetSignalQuality;

impl Reply for GetSignalQuality {
    const INFO: &'static str = "+CSQ:";
}

/// AT+COPS? Current operator
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+COPS?", OperatorSelection, timeout_ms = 5000)]
pub struct GetOperator;

impl Reply for GetOperator {
    const INFO: &'static str = "+COPS:";
}

/// AT+COPS=0 Automatic operator selection
///
/// Lets the modem register on a visited network when the home network is not
/// reachable.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+COPS=0", NoResponse, timeout_ms = 10000)]
pub struct SetAutomaticOperator;

impl Reply for SetAutomaticOperator {}

/// AT+CDNSGIP Query the IP address of a domain name
///
/// The modem answers `OK` first and reports the lookup on a later
/// `+CDNSGIP:` line.
#[derive(Debug, Clone, AtatCmd)]
#[at_cmd("+CDNSGIP", DnsResponse, timeout_ms = 10000)]
pub struct ResolveHost<'a> {
    #[at_arg(position = 0, len = 64)]
    pub host: &'a str,
}

impl Reply for ResolveHost<'_> {
    const EXPECT: Option<&'static str> = Some("+CDNSGIP:");
    const INFO: &'static str = "+CDNSGIP:";
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::line;

    #[test]
    fn command_lines() {
        assert_eq!(line(&At), "AT");
        assert_eq!(line(&SetEcho { enable: OnOff::Off }), "ATE0");
        assert_eq!(line(&GetPinStatus), "AT+CPIN?");
        assert_eq!(line(&GetSignalQuality), "AT+CSQ");
        assert_eq!(line(&SetAutomaticOperator), "AT+COPS=0");
        assert_eq!(
            line(&ResolveHost {
                host: "hub.example.com"
            }),
            "AT+CDNSGIP=\"hub.example.com\""
        );
    }
}
