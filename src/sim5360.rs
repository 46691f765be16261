//! SIM5360 (3G) and SIM7600 (4G) backend
//!
//! Both modems share the socket service of the SIMCom 3G/4G firmware. The
//! link runs in manual receive mode: the modem buffers inbound datagrams and
//! announces them with `+CIPRXGET: 1,<link>`, and `receive` pulls them with
//! `AT+CIPRXGET=2`.

use core::net::{Ipv4Addr, SocketAddrV4};

use embassy_time::Duration;
use heapless::String;

use crate::blocking::timer::Timer;
use crate::client::{Datagram, UdpClient};
use crate::command::general::types::{OnOff, PinStatus};
use crate::command::general::{At, GetPinStatus, SetAutomaticOperator, SetEcho};
use crate::command::packet::responses::{already_opened, ReceiveHeader, SendConfirm};
use crate::command::packet::{
    CloseSocket, GetIpAddress, NetClose, NetOpen, NetworkMode, OpenUdp, ReadData, SendTo,
    SetManualReceive, SetNetworkMode, SetPdpContext, CONTEXT_ID,
};
use crate::command::{line_from, MAX_APN_LEN};
use crate::config::{Device, ModemConfig};
use crate::connection::Stage;
use crate::error::Error;
use crate::modem::Modem;
use crate::options::CellularOptions;
use crate::{MAX_PAYLOAD, RX_BUFFER_SIZE};

/// Cancels a pending `>` data prompt.
const ESC: u8 = 0x1B;

/// Modem fitted on the board. Only the reported name differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    #[default]
    Sim5360,
    Sim7600,
}

impl Model {
    pub const fn name(self) -> &'static str {
        match self {
            Model::Sim5360 => "SIM5360",
            Model::Sim7600 => "SIM7600",
        }
    }
}

pub struct Sim5360Client<D: Device> {
    modem: Modem<D>,
    model: Model,
    remote: Option<SocketAddrV4>,
    rx: [u8; RX_BUFFER_SIZE],
    /// Bytes of a truncated datagram still buffered in the modem.
    discard: usize,
}

impl<D: Device> Sim5360Client<D> {
    pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(device: D) -> Self {
        Self::with_config(device, Model::default(), ModemConfig::default())
    }

    pub fn with_model(device: D, model: Model) -> Self {
        Self::with_config(device, model, ModemConfig::default())
    }

    pub fn with_config(device: D, model: Model, config: ModemConfig) -> Self {
        Self {
            modem: Modem::new(device, "\r\nOK\r\n", config),
            model,
            remote: None,
            rx: [0; RX_BUFFER_SIZE],
            discard: 0,
        }
    }

    pub fn release(self) -> D {
        self.modem.at.release()
    }

    pub fn stage(&self) -> Stage {
        self.modem.stage
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Resolved remote end of the open association.
    pub fn remote(&self) -> Option<SocketAddrV4> {
        self.remote
    }

    /// Register on the network, define the PDP context and open the socket
    /// service.
    pub fn setup(&mut self, options: &CellularOptions<'_>, timeout: Duration) -> Result<(), Error> {
        self.modem.require(Stage::UartReady)?;
        if self.modem.stage >= Stage::BearerUp {
            return Ok(());
        }
        if options.apn.len() > MAX_APN_LEN {
            return Err(Error::Overflow);
        }

        let budget = Timer::after(timeout);
        let modem = &mut self.modem;

        modem.command(&At, &budget)?;
        modem.command(&SetEcho { enable: OnOff::Off }, &budget)?;

        if modem.command(&GetPinStatus, &budget)?.status() != PinStatus::Ready {
            warn!("SIM not ready");
            return Err(Error::Downstream);
        }

        // The mode persists across power cycles.
        let mode = if options.only_3g {
            NetworkMode::WcdmaOnly
        } else {
            NetworkMode::Automatic
        };
        modem.command(&SetNetworkMode { mode }, &budget)?;
        if options.roaming {
            modem.command(&SetAutomaticOperator, &budget)?;
        }

        modem.wait_registration(&budget, options.roaming)?;
        modem.advance(Stage::Attached);

        let context = SetPdpContext {
            cid: CONTEXT_ID,
            pdp_type: "IP",
            apn: options.apn,
        };
        modem.command(&context, &budget)?;
        modem.command(&SetManualReceive, &budget)?;
        self.net_open(&budget)?;

        self.modem.advance(Stage::BearerUp);
        info!("{} packet service up", self.model.name());
        Ok(())
    }

    fn net_open(&mut self, budget: &Timer) -> Result<(), Error> {
        let line_timeout = budget.clip(self.modem.config.command_timeout);
        match self.modem.command(&NetOpen, budget) {
            Ok(opened) => match opened.err {
                0 => Ok(()),
                code => {
                    warn!("NETOPEN failed with code {}", code);
                    Err(Error::Downstream)
                }
            },
            Err(Error::Downstream) => {
                // The reason follows the matched ERROR on the same line.
                self.modem.at.read_until(b'\n', line_timeout).ok();
                if already_opened(self.modem.at.response()) {
                    debug!("Socket service already open");
                    Ok(())
                } else {
                    Err(Error::Downstream)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch one chunk of buffered inbound data into `rx`.
    ///
    /// An empty modem buffer is reported as a header with nothing read, and
    /// so is a modem that stays silent past `deadline`. The request always
    /// gets at least one poll interval to be answered.
    fn read_chunk(&mut self, max: usize, deadline: &Timer) -> Result<ReceiveHeader, Error> {
        let config = &self.modem.config;
        let request = deadline
            .remaining()
            .max(config.poll_interval)
            .min(config.command_timeout);
        let timeout = config.command_timeout;

        let header = match self.modem.at.send_with_timeout(&ReadData { max }, request) {
            Ok(header) => header,
            Err(Error::Downstream) => return Ok(ReceiveHeader::EMPTY),
            Err(Error::Timeout) if deadline.expired() => {
                debug!("No answer to CIPRXGET before deadline");
                return Ok(ReceiveHeader::EMPTY);
            }
            Err(e) => return Err(e),
        };
        // Announced payload is read in full regardless of the deadline.
        let stored = self
            .modem
            .at
            .read_payload(&mut self.rx, header.read, timeout)?;
        if let Err(e) = self.modem.at.wait_for(request, &["OK"]) {
            debug!("No OK after buffered data: {:?}", e);
        }
        Ok(ReceiveHeader {
            read: stored,
            ..header
        })
    }

    /// Drop what is left of a datagram that did not fit the buffer.
    fn discard_unread(&mut self, deadline: &Timer) -> Result<(), Error> {
        while self.discard > 0 && !deadline.expired() {
            let header = self.read_chunk(self.discard.min(RX_BUFFER_SIZE), deadline)?;
            if header.read == 0 {
                self.discard = 0;
                break;
            }
            trace!("Discarded {} bytes", header.read);
            self.discard = header.rest();
        }
        Ok(())
    }
}

impl<D: Device> UdpClient for Sim5360Client<D> {
    fn begin(&mut self) -> Result<(), Error> {
        self.modem.begin(self.model.name())
    }

    fn end(&mut self) {
        if self.modem.stage == Stage::Uninitialised {
            return;
        }
        self.close();
        if self.modem.stage >= Stage::BearerUp {
            if let Err(e) = self.modem.at.send(&NetClose) {
                warn!("NETCLOSE failed: {:?}", e);
            }
        }
        self.modem.pulse_power();
        self.modem.step_back(Stage::Uninitialised);
        info!("{} stopped", self.model.name());
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.modem.require(Stage::BearerUp)?;
        self.close();

        let ip = self.modem.query_ip(host)?;
        let budget = Timer::after(self.modem.config.open_timeout);
        let local_port = self.modem.config.local_port;
        let opened = self.modem.command(&OpenUdp { local_port }, &budget)?;
        if opened.code != 0 {
            warn!("CIPOPEN failed with code {}", opened.code);
            return Err(Error::Downstream);
        }

        self.remote = Some(SocketAddrV4::new(ip, port));
        self.discard = 0;
        self.modem.advance(Stage::SocketOpen);
        debug!("UDP socket to {}:{} open", host, port);
        Ok(())
    }

    fn close(&mut self) {
        if self.modem.stage < Stage::SocketOpen {
            return;
        }
        if let Err(e) = self.modem.at.send(&CloseSocket) {
            warn!("CIPCLOSE failed: {:?}", e);
        }
        self.remote = None;
        self.discard = 0;
        self.modem.step_back(Stage::BearerUp);
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.modem.require(Stage::SocketOpen)?;
        let remote = self.remote.ok_or(Error::Unattached)?;
        if data.is_empty() {
            return Err(Error::Unsupported);
        }
        if data.len() > MAX_PAYLOAD {
            return Err(Error::Overflow);
        }

        let cmd = SendTo {
            len: data.len(),
            ip: *remote.ip(),
            port: remote.port(),
        };
        let prompt = self.modem.config.prompt_timeout;
        match self.modem.at.send_with_timeout(&cmd, prompt) {
            Ok(_) => {}
            Err(Error::Timeout) => {
                warn!("No send prompt, cancelling");
                self.modem.at.write_raw(&[ESC])?;
                return Err(Error::Timeout);
            }
            Err(e) => return Err(e),
        }

        self.modem.at.write_raw(data)?;
        let ack = self.modem.config.send_timeout;
        if self.modem.at.wait_for(ack, &["+CIPSEND:", "ERROR"])? != 0 {
            return Err(Error::Downstream);
        }
        self.modem
            .at
            .read_until(b'\n', self.modem.config.command_timeout)?;
        let line = line_from(self.modem.at.response(), "+CIPSEND:").ok_or(Error::Parse)?;
        let confirm = SendConfirm::parse(line)?;
        if confirm.is_complete() && confirm.requested == data.len() {
            Ok(())
        } else {
            warn!(
                "Modem confirmed {} of {} bytes",
                confirm.confirmed,
                data.len()
            );
            Err(Error::Downstream)
        }
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram<'_>>, Error> {
        self.modem.require(Stage::SocketOpen)?;
        let deadline = Timer::after(timeout);
        self.discard_unread(&deadline)?;

        loop {
            let header = self.read_chunk(RX_BUFFER_SIZE, &deadline)?;
            if header.read > 0 {
                self.discard = header.rest();
                if self.discard > 0 {
                    debug!("Datagram truncated, {} bytes left", self.discard);
                }
                return Ok(Some(Datagram::new(
                    &self.rx[..header.read],
                    self.discard > 0,
                )));
            }

            if deadline.expired() {
                return Ok(None);
            }
            let wait = deadline.clip(self.modem.config.poll_interval);
            match self.modem.at.wait_for(wait, &["+CIPRXGET: 1"]) {
                Ok(_) | Err(Error::Timeout) => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn ip_address(&mut self) -> Result<Ipv4Addr, Error> {
        self.modem.require(Stage::BearerUp)?;
        self.modem.at.send(&GetIpAddress)?.address()
    }

    fn signal(&mut self) -> Result<i16, Error> {
        self.modem.signal()
    }

    fn operator_name(&mut self) -> Result<String<32>, Error> {
        self.modem.operator_name()
    }

    fn query_ip(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        self.modem.query_ip(host)
    }

    fn device_name(&self) -> &'static str {
        self.model.name()
    }
}
