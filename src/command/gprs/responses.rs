//! Responses and unsolicited data of the SIM800 TCP/IP application
use core::net::Ipv4Addr;
use core::str::FromStr;

use atat::atat_derive::AtatResp;
use heapless::String;

use crate::client::Location;
use crate::command::find;
use crate::error::Error;
use crate::MAX_PAYLOAD;

/// `+IPD,<len>:` header announcing an inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpdHeader {
    pub len: usize,
    /// Index of the first payload byte in the parsed buffer.
    pub payload_offset: usize,
}

impl IpdHeader {
    /// A length of zero or above [`MAX_PAYLOAD`] is rejected.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let start = find(buf, b"+IPD,").ok_or(Error::Parse)? + 5;
        let colon = buf[start..]
            .iter()
            .position(|&b| b == b':')
            .ok_or(Error::Parse)?;
        let len = core::str::from_utf8(&buf[start..start + colon])
            .ok()
            .and_then(|len| len.trim().parse::<usize>().ok())
            .ok_or(Error::Parse)?;
        if len == 0 || len > MAX_PAYLOAD {
            warn!("Implausible datagram length {}", len);
            return Err(Error::Parse);
        }
        Ok(Self {
            len,
            payload_offset: start + colon + 1,
        })
    }
}

/// AT+CIFSR
///
/// The address sits on its own line, surrounded by the echo of blank lines.
pub fn parse_local_ip(resp: &[u8]) -> Result<Ipv4Addr, Error> {
    resp.split(|&b| b == b'\r' || b == b'\n')
        .filter_map(|line| core::str::from_utf8(line).ok())
        .find_map(|line| line.trim().parse().ok())
        .ok_or(Error::Parse)
}

/// AT+CIPGSMLOC=1,1
///
/// `+CIPGSMLOC: <code>,<lng>,<lat>,<yyyy/mm/dd>,<hh:mm:ss>`
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct GsmLocationResponse {
    #[at_arg(position = 0)]
    pub code: u16,
    #[at_arg(position = 1)]
    pub lng: Option<String<16>>,
    #[at_arg(position = 2)]
    pub lat: Option<String<16>>,
    #[at_arg(position = 3)]
    pub date: Option<String<10>>,
    #[at_arg(position = 4)]
    pub time: Option<String<8>>,
}

impl GsmLocationResponse {
    pub fn location(&self) -> Result<Location, Error> {
        if self.code != 0 {
            warn!("Location lookup failed with code {}", self.code);
            return Err(Error::Downstream);
        }

        let lng = field(self.lng.as_deref())?;
        let lat = field(self.lat.as_deref())?;

        let mut date = self.date.as_deref().ok_or(Error::Parse)?.split('/');
        let year: u16 = field(date.next())?;
        let month = field(date.next())?;
        let day = field(date.next())?;

        let mut time = self.time.as_deref().ok_or(Error::Parse)?.split(':');
        let hour = field(time.next())?;
        let minute = field(time.next())?;
        let second = field(time.next())?;

        Ok(Location {
            lat,
            lng,
            year: year
                .checked_sub(2000)
                .and_then(|y| u8::try_from(y).ok())
                .ok_or(Error::Parse)?,
            month,
            day,
            hour,
            minute,
            second,
        })
    }
}

fn field<T: FromStr>(s: Option<&str>) -> Result<T, Error> {
    s.and_then(|s| s.trim().parse().ok()).ok_or(Error::Parse)
}
