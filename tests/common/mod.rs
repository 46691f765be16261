#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::rc::Rc;
use std::sync::{mpsc, Once};
use std::thread;
use std::time::Duration as StdDuration;

use core::net::{IpAddr, Ipv4Addr};

use embassy_time::Duration;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_io::{ErrorType, Read, ReadReady, Write};
use env_logger::Env;
use heapless::Vec as HVec;
use telematics_udp::embedded_nal::{nb, AddrType, Dns, UdpClientStack};
use telematics_udp::wifi::MAX_SCAN_RESULTS;
use telematics_udp::{
    ConnectionOptions, Device, ModemConfig, WifiAuthentication, WifiError, WifiNetwork, WifiStack,
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .is_test(true)
            .init();
    });
}

pub const ESC: u8 = 0x1B;

/// One expected exchange on the scripted UART.
pub enum Step {
    /// A CR-terminated command line and the modem's reply to it.
    Command { line: Vec<u8>, reply: Vec<u8> },
    /// Raw payload bytes after a data prompt and the reply to them.
    Data { payload: Vec<u8>, reply: Vec<u8> },
}

pub fn cmd(line: &str, reply: &str) -> Step {
    Step::Command {
        line: line.as_bytes().to_vec(),
        reply: reply.as_bytes().to_vec(),
    }
}

pub fn cmd_bytes(line: &str, reply: Vec<u8>) -> Step {
    Step::Command {
        line: line.as_bytes().to_vec(),
        reply,
    }
}

pub fn data(payload: &[u8], reply: &str) -> Step {
    Step::Data {
        payload: payload.to_vec(),
        reply: reply.as_bytes().to_vec(),
    }
}

#[derive(Default)]
struct Inner {
    steps: VecDeque<Step>,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    written: Vec<u8>,
}

impl Inner {
    fn feed(&mut self, b: u8) {
        self.written.push(b);
        if b == ESC {
            self.pending.clear();
            return;
        }
        self.pending.push(b);

        match self.steps.front() {
            Some(Step::Command { line, .. }) => {
                if b != b'\r' {
                    return;
                }
                let got = &self.pending[..self.pending.len() - 1];
                assert_eq!(
                    String::from_utf8_lossy(got),
                    String::from_utf8_lossy(line),
                    "unexpected command"
                );
            }
            Some(Step::Data { payload, .. }) => {
                if self.pending.len() < payload.len() {
                    return;
                }
                assert_eq!(&self.pending, payload, "unexpected payload");
            }
            None => panic!(
                "unexpected write: {:?}",
                String::from_utf8_lossy(&self.pending)
            ),
        }

        self.pending.clear();
        if let Some(Step::Command { reply, .. } | Step::Data { reply, .. }) = self.steps.pop_front() {
            self.rx.extend(reply);
        }
    }
}

/// UART that plays the modem side of a fixed AT dialog.
///
/// Replies are only queued once the matching command has been written, so
/// the drain before each command never eats them.
#[derive(Clone, Default)]
pub struct ScriptedUart(Rc<RefCell<Inner>>);

impl ScriptedUart {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let uart = Self::default();
        uart.push_steps(steps);
        uart
    }

    pub fn push_steps(&self, steps: impl IntoIterator<Item = Step>) {
        self.0.borrow_mut().steps.extend(steps);
    }

    /// Bytes the modem emits on its own, e.g. `+IPD` notifications.
    pub fn push_unsolicited(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Everything written by the driver so far.
    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    pub fn remaining_steps(&self) -> usize {
        self.0.borrow().steps.len()
    }
}

impl ErrorType for ScriptedUart {
    type Error = Infallible;
}

impl Read for ScriptedUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut inner = self.0.borrow_mut();
        let mut n = 0;
        while n < buf.len() {
            match inner.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for ScriptedUart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().rx.is_empty())
    }
}

impl Write for ScriptedUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.0.borrow_mut();
        for &b in buf {
            inner.feed(b);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Power key that counts complete low-high pulses.
#[derive(Clone, Default)]
pub struct PowerPin {
    low: bool,
    pulses: Rc<Cell<u32>>,
}

impl PowerPin {
    pub fn pulses(&self) -> u32 {
        self.pulses.get()
    }
}

impl PinErrorType for PowerPin {
    type Error = Infallible;
}

impl OutputPin for PowerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.low {
            self.pulses.set(self.pulses.get() + 1);
        }
        self.low = false;
        Ok(())
    }
}

pub struct TestDevice {
    pub uart: ScriptedUart,
    pub power: Option<PowerPin>,
}

impl TestDevice {
    pub fn new(uart: &ScriptedUart) -> Self {
        Self {
            uart: uart.clone(),
            power: None,
        }
    }

    pub fn with_power(uart: &ScriptedUart, pin: &PowerPin) -> Self {
        Self {
            uart: uart.clone(),
            power: Some(pin.clone()),
        }
    }
}

impl Device for TestDevice {
    type Uart = ScriptedUart;
    type PowerPin = PowerPin;

    fn uart(&mut self) -> &mut ScriptedUart {
        &mut self.uart
    }

    fn power_pin(&mut self) -> Option<&mut PowerPin> {
        self.power.as_mut()
    }
}

pub fn fast_config() -> ModemConfig {
    ModemConfig::new()
        .command_timeout(Duration::from_millis(200))
        .drain_window(Duration::from_millis(5))
        .prompt_timeout(Duration::from_millis(200))
        .send_timeout(Duration::from_millis(500))
        .open_timeout(Duration::from_millis(500))
        .dns_timeout(Duration::from_millis(500))
        .location_timeout(Duration::from_millis(500))
        .poll_interval(Duration::from_millis(20))
        .power_pulse(Duration::from_millis(0))
        .boot_delay(Duration::from_millis(0))
        .begin_attempts(3)
}

pub const OK: &str = "\r\nOK\r\n";

pub fn sim800_setup_script(apn: &str) -> Vec<Step> {
    vec![
        cmd("AT", OK),
        cmd("ATE0", OK),
        cmd("AT+CREG?", "\r\n+CREG: 0,5\r\n\r\nOK\r\n"),
        cmd("AT+CIPSHUT", "\r\nSHUT OK\r\n"),
        cmd("AT+CIPMUX=0", OK),
        cmd("AT+CIPHEAD=1", OK),
        cmd("AT+SAPBR=3,1,\"Contype\",\"GPRS\"", OK),
        cmd(&format!("AT+SAPBR=3,1,\"APN\",\"{}\"", apn), OK),
        cmd("AT+SAPBR=1,1", OK),
        cmd(&format!("AT+CSTT=\"{}\"", apn), OK),
        cmd("AT+CIICR", OK),
        cmd("AT+CIFSR", "\r\n10.176.42.9\r\n"),
    ]
}

/// Setup dialog of a 3G/4G modem with force-3G and roaming enabled.
pub fn sim5360_setup_script(apn: &str) -> Vec<Step> {
    vec![
        cmd("AT", OK),
        cmd("ATE0", OK),
        cmd("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n"),
        cmd("AT+CNMP=14", OK),
        cmd("AT+COPS=0", OK),
        cmd("AT+CREG?", "\r\n+CREG: 0,5\r\n\r\nOK\r\n"),
        cmd(&format!("AT+CGDCONT=1,\"IP\",\"{}\"", apn), OK),
        cmd("AT+CIPRXGET=1", OK),
        cmd("AT+NETOPEN", "\r\nOK\r\n\r\n+NETOPEN: 0\r\n"),
    ]
}

pub const HUB_NAME: &str = "hub.example.com";
pub const HUB_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);
pub const WIFI_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

/// Shared view on a [`LoopbackStack`] after it moved into a client.
#[derive(Clone, Default)]
pub struct StackState {
    pub joined: Rc<Cell<bool>>,
    pub enabled: Rc<Cell<bool>>,
    pub requested: Rc<RefCell<Vec<SocketAddr>>>,
}

/// Host network stack standing in for a WiFi radio.
///
/// Every socket is connected to the local `peer` whatever remote the driver
/// asks for; the requested remotes are recorded in the shared state. The access
/// point `TESTAP` with passphrase `secret` hands out `10.0.0.5` after a few
/// polls.
pub struct LoopbackStack {
    peer: SocketAddr,
    radio: StackState,
    dhcp: bool,
    polls: u32,
}

impl LoopbackStack {
    pub fn new(peer: SocketAddr) -> (Self, StackState) {
        let radio = StackState::default();
        (
            Self {
                peer,
                radio: radio.clone(),
                dhcp: true,
                polls: 0,
            },
            radio,
        )
    }

    /// Never hand out an address.
    pub fn without_dhcp(mut self) -> Self {
        self.dhcp = false;
        self
    }
}

fn nb_io<T>(res: io::Result<T>) -> nb::Result<T, io::Error> {
    res.map_err(|e| match e.kind() {
        io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
        _ => nb::Error::Other(e),
    })
}

impl UdpClientStack for LoopbackStack {
    type UdpSocket = UdpSocket;
    type Error = io::Error;

    fn socket(&mut self) -> Result<UdpSocket, io::Error> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    fn connect(&mut self, socket: &mut UdpSocket, remote: SocketAddr) -> Result<(), io::Error> {
        self.radio.requested.borrow_mut().push(remote);
        socket.connect(self.peer)
    }

    fn send(&mut self, socket: &mut UdpSocket, buffer: &[u8]) -> nb::Result<(), io::Error> {
        nb_io(socket.send(buffer)).map(drop)
    }

    fn receive(
        &mut self,
        socket: &mut UdpSocket,
        buffer: &mut [u8],
    ) -> nb::Result<(usize, SocketAddr), io::Error> {
        nb_io(socket.recv_from(buffer))
    }

    fn close(&mut self, _socket: UdpSocket) -> Result<(), io::Error> {
        Ok(())
    }
}

impl Dns for LoopbackStack {
    type Error = ();

    fn get_host_by_name(&mut self, hostname: &str, _addr_type: AddrType) -> nb::Result<IpAddr, ()> {
        match hostname {
            HUB_NAME => Ok(IpAddr::V4(HUB_IP)),
            "localhost" => Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            _ => Err(nb::Error::Other(())),
        }
    }

    fn get_host_by_address(&mut self, _addr: IpAddr, _result: &mut [u8]) -> nb::Result<usize, ()> {
        Err(nb::Error::Other(()))
    }
}

impl WifiStack for LoopbackStack {
    fn enable(&mut self) -> Result<(), WifiError> {
        self.radio.enabled.set(true);
        Ok(())
    }

    fn disable(&mut self) {
        self.radio.enabled.set(false);
    }

    fn scan(&mut self) -> Result<HVec<WifiNetwork, MAX_SCAN_RESULTS>, WifiError> {
        if !self.radio.enabled.get() {
            return Err(WifiError::WifiDisabled);
        }
        let mut networks = HVec::new();
        for (ssid, channel, rssi) in [("TESTAP", 6, -48), ("Guest", 11, -71)] {
            if let Some(network) = WifiNetwork::new(ssid, channel, rssi) {
                networks.push(network).ok();
            }
        }
        Ok(networks)
    }

    fn join(&mut self, options: &ConnectionOptions<'_>) -> Result<(), WifiError> {
        if !self.radio.enabled.get() {
            return Err(WifiError::WifiDisabled);
        }
        if options.ssid != "TESTAP" || options.auth != WifiAuthentication::Wpa2Passphrase("secret")
        {
            return Err(WifiError::FailedToConnect);
        }
        self.radio.joined.set(true);
        self.polls = 0;
        Ok(())
    }

    fn poll_ipv4(&mut self) -> nb::Result<Ipv4Addr, WifiError> {
        if !self.radio.joined.get() {
            return Err(nb::Error::Other(WifiError::NoAddress));
        }
        if !self.dhcp || self.polls < 3 {
            self.polls += 1;
            return Err(nb::Error::WouldBlock);
        }
        Ok(WIFI_IP)
    }

    fn leave(&mut self) {
        self.radio.joined.set(false);
    }
}

/// UDP server on localhost that forwards what it receives and answers with
/// whatever `reply` returns for each datagram.
pub fn spawn_peer<F>(mut reply: F) -> (SocketAddr, mpsc::Receiver<Vec<u8>>)
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(StdDuration::from_secs(5)))
        .unwrap();
    let addr = socket.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut buf = [0u8; 2048];
        while let Ok((len, from)) = socket.recv_from(&mut buf) {
            let datagram = buf[..len].to_vec();
            for answer in reply(&datagram) {
                socket.send_to(&answer, from).unwrap();
            }
            if tx.send(datagram).is_err() {
                break;
            }
        }
    });

    (addr, rx)
}
