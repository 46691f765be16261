//! Responses for the general commands
use core::net::Ipv4Addr;

use atat::atat_derive::AtatResp;
use heapless::String;

use super::types::*;
use crate::error::Error;

/// AT+CSQ
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalQuality {
    #[at_arg(position = 0)]
    pub rssi: u8,
    #[at_arg(position = 1)]
    pub ber: u8,
}

impl SignalQuality {
    /// Received strength in dBm, `None` while the modem has no estimate.
    pub fn dbm(&self) -> Option<i16> {
        match self.rssi {
            0..=31 => Some(-113 + 2 * self.rssi as i16),
            _ => None,
        }
    }
}

/// AT+CREG?
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registration {
    #[at_arg(position = 0)]
    pub n: u8,
    #[at_arg(position = 1)]
    pub status: RegistrationStatus,
}

/// AT+CPIN?
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct PinStatusResponse {
    #[at_arg(position = 0)]
    pub code: String<16>,
}

impl PinStatusResponse {
    pub fn status(&self) -> PinStatus {
        match self.code.as_str() {
            "READY" => PinStatus::Ready,
            _ => PinStatus::Locked,
        }
    }
}

/// AT+COPS?
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct OperatorSelection {
    #[at_arg(position = 0)]
    pub mode: u8,
    #[at_arg(position = 1)]
    pub format: Option<u8>,
    #[at_arg(position = 2)]
    pub name: Option<String<32>>,
    #[at_arg(position = 3)]
    pub act: Option<u8>,
}

impl OperatorSelection {
    /// The operator the modem is registered with.
    pub fn operator(self) -> Result<String<32>, Error> {
        self.name.ok_or(Error::Downstream)
    }
}

/// AT+CDNSGIP
///
/// `+CDNSGIP: 1,"<domain>","<ip>"` on success, `+CDNSGIP: 0,<err>` when the
/// lookup failed.
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct DnsResponse {
    #[at_arg(position = 0)]
    pub result: u8,
    #[at_arg(position = 1)]
    pub domain: Option<String<64>>,
    #[at_arg(position = 2)]
    pub ip: Option<String<16>>,
}

impl DnsResponse {
    pub fn address(&self) -> Result<Ipv4Addr, Error> {
        if self.result != 1 {
            return Err(Error::Downstream);
        }
        self.ip
            .as_ref()
            .and_then(|ip| ip.parse().ok())
            .ok_or(Error::Parse)
    }
}
