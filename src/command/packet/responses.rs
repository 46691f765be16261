//! Responses for the packet domain and socket commands
use core::net::Ipv4Addr;

use atat::atat_derive::AtatResp;
use heapless::String;

use crate::command::find;
use crate::error::Error;

/// Reply of AT+NETOPEN when the socket service was left open.
pub const ALREADY_OPENED: &[u8] = b"Network is already opened";

pub fn already_opened(resp: &[u8]) -> bool {
    find(resp, ALREADY_OPENED).is_some()
}

/// `+NETOPEN: <err>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct NetOpenResponse {
    #[at_arg(position = 0)]
    pub err: u8,
}

/// `+CIPOPEN: <link_num>,<err>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct SocketOpen {
    #[at_arg(position = 0)]
    pub link: u8,
    #[at_arg(position = 1)]
    pub code: u8,
}

/// `+CIPSEND: <link_num>,<reqSendLength>,<cnfSendLength>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct SendConfirm {
    #[at_arg(position = 0)]
    pub link: u8,
    #[at_arg(position = 1)]
    pub requested: usize,
    /// Bytes actually handed to the network, `-1` when the link is broken.
    #[at_arg(position = 2)]
    pub confirmed: i32,
}

impl SendConfirm {
    pub fn parse(line: &[u8]) -> Result<Self, Error> {
        atat::serde_at::from_slice(line).map_err(|_| Error::Parse)
    }

    pub fn is_complete(&self) -> bool {
        usize::try_from(self.confirmed).map_or(false, |n| n == self.requested)
    }
}

/// `+CIPRXGET: 2,<link_num>,<read_len>,<rest_len>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct ReceiveHeader {
    #[at_arg(position = 0)]
    pub mode: u8,
    #[at_arg(position = 1)]
    pub link: u8,
    #[at_arg(position = 2)]
    pub read: usize,
    #[at_arg(position = 3)]
    pub rest: Option<usize>,
}

impl ReceiveHeader {
    pub const EMPTY: Self = Self {
        mode: 2,
        link: 0,
        read: 0,
        rest: None,
    };

    pub fn rest(&self) -> usize {
        self.rest.unwrap_or(0)
    }
}

/// `+IPADDR: <ip>`
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct IpAddressResponse {
    #[at_arg(position = 0)]
    pub ip: String<16>,
}

impl IpAddressResponse {
    /// The modem reports `0.0.0.0` while no PDP context is active.
    pub fn address(&self) -> Result<Ipv4Addr, Error> {
        let ip: Ipv4Addr = self.ip.parse().map_err(|_| Error::Parse)?;
        if ip.is_unspecified() {
            return Err(Error::Unattached);
        }
        Ok(ip)
    }
}

#[cfg(test)]
mod test {
    use atat::AtatCmd;

    use super::*;
    use crate::command::packet::*;

    #[test]
    fn net_open() {
        assert_eq!(
            NetOpen.parse(Ok(b"+NETOPEN: 0")).unwrap(),
            NetOpenResponse { err: 0 }
        );
        assert!(already_opened(
            b"\r\n+IP ERROR: Network is already opened\r\n\r\nERROR\r\n"
        ));
    }

    #[test]
    fn socket_and_send() {
        assert_eq!(
            OpenUdp { local_port: 8000 }
                .parse(Ok(b"+CIPOPEN: 0,0"))
                .unwrap(),
            SocketOpen { link: 0, code: 0 }
        );
        let confirm = SendConfirm::parse(b"+CIPSEND: 0,5,5").unwrap();
        assert!(confirm.is_complete());
        let confirm = SendConfirm::parse(b"+CIPSEND: 0,5,-1").unwrap();
        assert!(!confirm.is_complete());
    }

    #[test]
    fn receive_header() {
        let read = ReadData { max: 256 };
        assert_eq!(
            read.parse(Ok(b"+CIPRXGET: 2,0,5,0")).unwrap(),
            ReceiveHeader {
                mode: 2,
                link: 0,
                read: 5,
                rest: Some(0)
            }
        );
        let header = read.parse(Ok(b"+CIPRXGET: 2,0,256,44")).unwrap();
        assert_eq!(header.rest(), 44);
    }

    #[test]
    fn ip_address() {
        let resp = GetIpAddress.parse(Ok(b"+IPADDR: 10.64.3.2")).unwrap();
        assert_eq!(resp.address(), Ok(Ipv4Addr::new(10, 64, 3, 2)));
        let resp = GetIpAddress.parse(Ok(b"+IPADDR: 0.0.0.0")).unwrap();
        assert_eq!(resp.address(), Err(Error::Unattached));
    }
}
