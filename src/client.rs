use core::net::Ipv4Addr;

use embassy_time::Duration;
use heapless::String;

use crate::config::Device;
use crate::error::Error;
use crate::options::LinkConfig;
use crate::sim5360::Sim5360Client;
use crate::sim800::Sim800Client;
use crate::wifi::{WifiClient, WifiStack};

/// Datagram held in the receive buffer of a backend.
///
/// Borrows the backend, so it has to be dropped before the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    data: &'a [u8],
    truncated: bool,
}

impl<'a> Datagram<'a> {
    pub(crate) fn new(data: &'a [u8], truncated: bool) -> Self {
        Self { data, truncated }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sender's datagram was longer than the buffer and got cut.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// The payload, or `Error::Truncated` when part of it was lost.
    pub fn check(&self) -> Result<&'a [u8], Error> {
        if self.truncated {
            Err(Error::Truncated)
        } else {
            Ok(self.data)
        }
    }
}

/// Cell-based position and network time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    pub lat: f32,
    pub lng: f32,
    /// Years past 2000
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// A single UDP association over one network link.
///
/// `begin` has to succeed before anything else; link setup takes
/// backend-specific credentials and is inherent to each backend.
pub trait UdpClient {
    /// Power or enable the radio and check that it answers.
    fn begin(&mut self) -> Result<(), Error>;

    /// Tear the link down. Calling it again does nothing.
    fn end(&mut self);

    /// Associate with `host:port`, closing any previous association.
    fn open(&mut self, host: &str, port: u16) -> Result<(), Error>;

    fn close(&mut self);

    /// Send `data` as exactly one datagram.
    fn send(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Wait up to `timeout` for one datagram, `None` when none arrived.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram<'_>>, Error>;

    fn ip_address(&mut self) -> Result<Ipv4Addr, Error>;

    /// Received signal strength in dBm.
    fn signal(&mut self) -> Result<i16, Error>;

    fn operator_name(&mut self) -> Result<String<32>, Error> {
        Err(Error::Unsupported)
    }

    fn query_ip(&mut self, host: &str) -> Result<Ipv4Addr, Error>;

    fn location(&mut self) -> Result<Location, Error> {
        Err(Error::Unsupported)
    }

    fn device_name(&self) -> &'static str;
}

/// Whichever backend the board is fitted with.
pub enum Client<N: WifiStack, D: Device> {
    Wifi(WifiClient<N>),
    Sim800(Sim800Client<D>),
    /// Also covers the SIM7600, see [`crate::sim5360::Model`].
    Sim5360(Sim5360Client<D>),
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $e:expr) => {
        match $self {
            Client::Wifi($c) => $e,
            Client::Sim800($c) => $e,
            Client::Sim5360($c) => $e,
        }
    };
}

impl<N: WifiStack, D: Device> Client<N, D> {
    /// Bring the link up with credentials matching the backend.
    pub fn setup(&mut self, config: &LinkConfig<'_>, timeout: Duration) -> Result<(), Error> {
        match (self, config) {
            (Client::Wifi(c), LinkConfig::Wifi(options)) => c.setup(options, timeout),
            (Client::Sim800(c), LinkConfig::Gprs { apn }) => c.setup(apn, timeout),
            (Client::Sim5360(c), LinkConfig::Cellular(options)) => c.setup(options, timeout),
            _ => Err(Error::Unsupported),
        }
    }

    pub fn default_setup_timeout(&self) -> Duration {
        match self {
            Client::Wifi(_) => WifiClient::<N>::DEFAULT_SETUP_TIMEOUT,
            Client::Sim800(_) => Sim800Client::<D>::DEFAULT_SETUP_TIMEOUT,
            Client::Sim5360(_) => Sim5360Client::<D>::DEFAULT_SETUP_TIMEOUT,
        }
    }
}

impl<N: WifiStack, D: Device> UdpClient for Client<N, D> {
    fn begin(&mut self) -> Result<(), Error> {
        dispatch!(self, c => c.begin())
    }

    fn end(&mut self) {
        dispatch!(self, c => c.end())
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), Error> {
        dispatch!(self, c => c.open(host, port))
    }

    fn close(&mut self) {
        dispatch!(self, c => c.close())
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        dispatch!(self, c => c.send(data))
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram<'_>>, Error> {
        dispatch!(self, c => c.receive(timeout))
    }

    fn ip_address(&mut self) -> Result<Ipv4Addr, Error> {
        dispatch!(self, c => c.ip_address())
    }

    fn signal(&mut self) -> Result<i16, Error> {
        dispatch!(self, c => c.signal())
    }

    fn operator_name(&mut self) -> Result<String<32>, Error> {
        dispatch!(self, c => c.operator_name())
    }

    fn query_ip(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        dispatch!(self, c => c.query_ip(host))
    }

    fn location(&mut self) -> Result<Location, Error> {
        dispatch!(self, c => c.location())
    }

    fn device_name(&self) -> &'static str {
        dispatch!(self, c => c.device_name())
    }
}
