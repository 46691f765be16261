//! WiFi backend on top of a platform network stack

mod network;

pub use network::WifiNetwork;

use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use embassy_time::Duration;
use embedded_nal::{nb, AddrType, Dns, UdpClientStack};
use heapless::Vec;

use crate::blocking::timer::{self, Timer};
use crate::client::{Datagram, UdpClient};
use crate::connection::WiFiState;
use crate::error::{Error, WifiError};
use crate::options::ConnectionOptions;
use crate::{MAX_PAYLOAD, RX_BUFFER_SIZE};

pub const MAX_SCAN_RESULTS: usize = 16;

const DNS_TIMEOUT: Duration = Duration::from_secs(8);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Radio control of the platform WiFi stack.
///
/// Sockets and name resolution come from the `embedded-nal` traits; this adds
/// what is needed to get a station associated and addressed.
pub trait WifiStack: UdpClientStack + Dns {
    /// Switch the radio on in station mode.
    fn enable(&mut self) -> Result<(), WifiError>;

    fn disable(&mut self);

    fn scan(&mut self) -> Result<Vec<WifiNetwork, MAX_SCAN_RESULTS>, WifiError>;

    /// Start associating with the access point in `options`.
    fn join(&mut self, options: &ConnectionOptions<'_>) -> Result<(), WifiError>;

    /// The DHCP address, `WouldBlock` while it is still pending.
    fn poll_ipv4(&mut self) -> nb::Result<Ipv4Addr, WifiError>;

    fn leave(&mut self);
}

pub struct WifiClient<N: WifiStack> {
    stack: N,
    state: WiFiState,
    socket: Option<N::UdpSocket>,
    remote: Option<SocketAddr>,
    // One spare byte to detect datagrams that do not fit.
    rx: [u8; RX_BUFFER_SIZE + 1],
}

impl<N: WifiStack> WifiClient<N> {
    pub const NAME: &'static str = "WIFI";
    pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(stack: N) -> Self {
        Self {
            stack,
            state: WiFiState::Inactive,
            socket: None,
            remote: None,
            rx: [0; RX_BUFFER_SIZE + 1],
        }
    }

    pub fn release(self) -> N {
        self.stack
    }

    pub fn state(&self) -> WiFiState {
        self.state
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Associate with the access point and wait for DHCP.
    pub fn setup(&mut self, options: &ConnectionOptions<'_>, timeout: Duration) -> Result<(), Error> {
        match self.state {
            WiFiState::Inactive => return Err(Error::Unattached),
            WiFiState::Connected if self.stack.poll_ipv4().is_ok() => return Ok(()),
            _ => {}
        }

        if options.scan {
            self.log_networks();
        }

        info!("Joining {}", options.ssid);
        if let Err(e) = self.stack.join(options) {
            warn!("Join failed: {:?}", e);
            self.stack.leave();
            self.state = WiFiState::NotConnected;
            return Err(e.into());
        }

        let stack = &mut self.stack;
        let res = Timer::with_timeout(timeout, || match stack.poll_ipv4() {
            Ok(ip) => Some(Ok(ip)),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(e)) => Some(Err(e)),
        });

        match res {
            Ok(ip) => {
                info!("WiFi connected, IP {:?}", ip.octets());
                self.state = WiFiState::Connected;
                Ok(())
            }
            Err(e) => {
                self.stack.leave();
                self.state = WiFiState::NotConnected;
                match e {
                    timer::Error::Timeout => {
                        warn!("No address within deadline");
                        Err(Error::Timeout)
                    }
                    timer::Error::Other(e) => {
                        warn!("Association failed: {:?}", e);
                        Err(e.into())
                    }
                }
            }
        }
    }

    fn log_networks(&mut self) {
        match self.stack.scan() {
            Ok(networks) => {
                info!("{} access point(s) visible", networks.len());
                for network in networks.iter() {
                    info!(
                        "  {} ch {} {} dBm",
                        network.ssid.as_str(),
                        network.channel,
                        network.rssi
                    );
                }
            }
            Err(e) => warn!("Scan failed: {:?}", e),
        }
    }

    fn resolve(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        if let Ok(ip) = host.parse() {
            return Ok(ip);
        }

        debug!("Lookup hostname: {}", host);
        let stack = &mut self.stack;
        match Timer::with_timeout(DNS_TIMEOUT, || {
            match stack.get_host_by_name(host, AddrType::IPv4) {
                Ok(IpAddr::V4(ip)) => Some(Ok(ip)),
                Ok(IpAddr::V6(_)) => Some(Err(Error::Unsupported)),
                Err(nb::Error::WouldBlock) => None,
                Err(nb::Error::Other(_)) => Some(Err(Error::Downstream)),
            }
        }) {
            Ok(ip) => Ok(ip),
            Err(timer::Error::Timeout) => Err(Error::Timeout),
            Err(timer::Error::Other(e)) => Err(e),
        }
    }
}

impl<N: WifiStack> UdpClient for WifiClient<N> {
    fn begin(&mut self) -> Result<(), Error> {
        if self.state != WiFiState::Inactive {
            return Ok(());
        }
        self.stack.enable()?;
        self.state = WiFiState::NotConnected;
        Ok(())
    }

    fn end(&mut self) {
        if self.state == WiFiState::Inactive {
            return;
        }
        self.close();
        if self.state == WiFiState::Connected {
            self.stack.leave();
        }
        self.stack.disable();
        self.state = WiFiState::Inactive;
        info!("WiFi stopped");
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), Error> {
        if self.state != WiFiState::Connected {
            return Err(Error::Unattached);
        }
        self.close();

        let remote = SocketAddr::new(IpAddr::V4(self.resolve(host)?), port);
        let mut socket = self.stack.socket().map_err(|_| Error::Downstream)?;
        if self.stack.connect(&mut socket, remote).is_err() {
            self.stack.close(socket).ok();
            return Err(Error::Downstream);
        }

        self.socket = Some(socket);
        self.remote = Some(remote);
        debug!("UDP socket to {}:{} open", host, port);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            self.stack.close(socket).ok();
        }
        self.remote = None;
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        let socket = self.socket.as_mut().ok_or(Error::Unattached)?;
        if data.is_empty() {
            return Err(Error::Unsupported);
        }
        if data.len() > MAX_PAYLOAD {
            return Err(Error::Overflow);
        }

        let stack = &mut self.stack;
        Timer::with_timeout(SEND_TIMEOUT, || match stack.send(socket, data) {
            Ok(()) => Some(Ok(())),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_)) => Some(Err(Error::Downstream)),
        })
        .map_err(|e| match e {
            timer::Error::Timeout => Error::Timeout,
            timer::Error::Other(e) => e,
        })
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram<'_>>, Error> {
        let socket = self.socket.as_mut().ok_or(Error::Unattached)?;
        let stack = &mut self.stack;
        let rx = &mut self.rx;

        let res = Timer::with_timeout(timeout, || match stack.receive(socket, rx) {
            Ok((len, _)) => Some(Ok(len)),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_)) => Some(Err(Error::Downstream)),
        });

        match res {
            Ok(len) => {
                let stored = len.min(RX_BUFFER_SIZE);
                if len > RX_BUFFER_SIZE {
                    debug!("Datagram truncated to {} bytes", stored);
                }
                Ok(Some(Datagram::new(&self.rx[..stored], len > RX_BUFFER_SIZE)))
            }
            Err(timer::Error::Timeout) => Ok(None),
            Err(timer::Error::Other(e)) => Err(e),
        }
    }

    fn ip_address(&mut self) -> Result<Ipv4Addr, Error> {
        if self.state != WiFiState::Connected {
            return Err(Error::Unattached);
        }
        match self.stack.poll_ipv4() {
            Ok(ip) => Ok(ip),
            Err(nb::Error::WouldBlock) => Err(Error::Unattached),
            Err(nb::Error::Other(e)) => Err(e.into()),
        }
    }

    /// The stack exposes no RSSI for the joined network.
    fn signal(&mut self) -> Result<i16, Error> {
        Ok(0)
    }

    fn query_ip(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        if self.state != WiFiState::Connected {
            return Err(Error::Unattached);
        }
        self.resolve(host)
    }

    fn device_name(&self) -> &'static str {
        Self::NAME
    }
}
