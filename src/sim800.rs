//! SIM800 GSM/GPRS backend
//!
//! The modem runs its single-connection TCP/IP application with the IP head
//! enabled, so datagrams arrive unsolicited as `+IPD,<len>:<payload>`.

use core::net::Ipv4Addr;

use embassy_time::Duration;
use heapless::String;

use crate::blocking::timer::Timer;
use crate::client::{Datagram, Location, UdpClient};
use crate::command::general::types::OnOff;
use crate::command::general::{At, SetEcho};
use crate::command::gprs::responses::{parse_local_ip, IpdHeader};
use crate::command::gprs::{
    BringUp, CloseConnection, GetGsmLocation, GetLocalIp, OpenBearer, SendData,
    SetBearerParameter, SetMultiplex, SetReceiveHeader, Shutdown, StartTask, StartUdp,
};
use crate::command::MAX_APN_LEN;
use crate::config::{Device, ModemConfig};
use crate::connection::{Association, Stage};
use crate::error::Error;
use crate::modem::Modem;
use crate::{MAX_PAYLOAD, RX_BUFFER_SIZE};

/// Cancels a pending `>` data prompt.
const ESC: u8 = 0x1B;

pub struct Sim800Client<D: Device> {
    modem: Modem<D>,
    association: Option<Association>,
    rx: [u8; RX_BUFFER_SIZE],
    /// Stored and announced length of a datagram already copied into `rx`.
    pending: Option<(usize, usize)>,
}

impl<D: Device> Sim800Client<D> {
    pub const NAME: &'static str = "SIM800";
    pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(device: D) -> Self {
        Self::with_config(device, ModemConfig::default())
    }

    pub fn with_config(device: D, config: ModemConfig) -> Self {
        Self {
            modem: Modem::new(device, "\r\nOK", config),
            association: None,
            rx: [0; RX_BUFFER_SIZE],
            pending: None,
        }
    }

    /// Give the board back, e.g. to hand the UART to another driver.
    pub fn release(self) -> D {
        self.modem.at.release()
    }

    pub fn stage(&self) -> Stage {
        self.modem.stage
    }

    /// Remote end of the open association.
    pub fn association(&self) -> Option<&Association> {
        self.association.as_ref()
    }

    /// Register on the network and bring the GPRS bearer up with `apn`.
    pub fn setup(&mut self, apn: &str, timeout: Duration) -> Result<(), Error> {
        self.modem.require(Stage::UartReady)?;
        if self.modem.stage >= Stage::BearerUp {
            return Ok(());
        }
        if apn.len() > MAX_APN_LEN {
            return Err(Error::Overflow);
        }

        let budget = Timer::after(timeout);
        let modem = &mut self.modem;

        modem.command(&At, &budget)?;
        modem.command(&SetEcho { enable: OnOff::Off }, &budget)?;
        modem.wait_registration(&budget, true)?;
        modem.advance(Stage::Attached);

        modem.command(&Shutdown, &budget)?;
        modem.command(&SetMultiplex { mode: OnOff::Off }, &budget)?;
        modem.command(&SetReceiveHeader { mode: OnOff::On }, &budget)?;

        let contype = SetBearerParameter {
            tag: "Contype",
            value: "GPRS",
        };
        modem.command(&contype, &budget)?;
        modem.command(&SetBearerParameter { tag: "APN", value: apn }, &budget)?;
        // The SAPBR bearer only serves cell location.
        if let Err(e) = modem.command(&OpenBearer, &budget) {
            warn!("Location bearer not opened: {:?}", e);
        }

        modem.command(&StartTask { apn }, &budget)?;
        modem.command(&BringUp, &budget)?;
        self.local_ip(&budget)?;

        self.modem.advance(Stage::BearerUp);
        info!("GPRS bearer up");
        Ok(())
    }

    fn local_ip(&mut self, budget: &Timer) -> Result<Ipv4Addr, Error> {
        self.modem.command(&GetLocalIp, budget)?;
        let timeout = budget.clip(self.modem.config.command_timeout);
        self.modem.at.read_until(b'\n', timeout)?;
        parse_local_ip(self.modem.at.response())
    }

    /// Copy a complete `+IPD` datagram already sitting in the response buffer.
    ///
    /// Returns the stored length and the announced length.
    fn check_incoming(&mut self) -> Option<(usize, usize)> {
        let resp = self.modem.at.response();
        let header = IpdHeader::parse(resp).ok()?;
        let end = header.payload_offset.checked_add(header.len)?;
        let payload = resp.get(header.payload_offset..end)?;

        let stored = header.len.min(RX_BUFFER_SIZE);
        self.rx[..stored].copy_from_slice(&payload[..stored]);
        self.modem.at.clear();
        Some((stored, header.len))
    }

    /// Read the `<len>:<payload>` rest of an `+IPD,` announcement into `rx`.
    fn read_datagram(&mut self, timeout: Duration) -> Result<(usize, usize), Error> {
        self.modem.at.read_until(b':', timeout)?;
        let header = IpdHeader::parse(self.modem.at.response())?;
        let stored = self
            .modem
            .at
            .read_payload(&mut self.rx, header.len, timeout)?;
        self.modem.at.clear();

        if header.len > stored {
            debug!("Datagram of {} bytes truncated", header.len);
        }
        Ok((stored, header.len))
    }
}

impl<D: Device> UdpClient for Sim800Client<D> {
    fn begin(&mut self) -> Result<(), Error> {
        self.modem.begin(Self::NAME)
    }

    fn end(&mut self) {
        if self.modem.stage == Stage::Uninitialised {
            return;
        }
        self.close();
        if self.modem.stage >= Stage::BearerUp {
            if let Err(e) = self.modem.at.send(&Shutdown) {
                warn!("CIPSHUT failed: {:?}", e);
            }
        }
        self.modem.pulse_power();
        self.modem.step_back(Stage::Uninitialised);
        info!("{} stopped", Self::NAME);
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.modem.require(Stage::BearerUp)?;
        self.close();

        let association = Association::new(host, port).ok_or(Error::Overflow)?;
        let budget = Timer::after(self.modem.config.open_timeout);
        self.modem.command(&StartUdp { host, port }, &budget)?;

        self.association = Some(association);
        self.modem.advance(Stage::SocketOpen);
        debug!("UDP link to {}:{} open", host, port);
        Ok(())
    }

    fn close(&mut self) {
        if self.modem.stage < Stage::SocketOpen {
            return;
        }
        if let Err(e) = self.modem.at.send(&CloseConnection) {
            warn!("CIPCLOSE failed: {:?}", e);
        }
        self.association = None;
        self.pending = None;
        self.modem.step_back(Stage::BearerUp);
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.modem.require(Stage::SocketOpen)?;
        if data.is_empty() {
            return Err(Error::Unsupported);
        }
        if data.len() > MAX_PAYLOAD {
            return Err(Error::Overflow);
        }

        let prompt = self.modem.config.prompt_timeout;
        match self
            .modem
            .at
            .send_with_timeout(&SendData { len: data.len() }, prompt)
        {
            Ok(_) => {}
            Err(Error::Timeout) => {
                warn!("No send prompt, cancelling");
                self.modem.at.write_raw(&[ESC])?;
                return Err(Error::Timeout);
            }
            Err(e) => return Err(e),
        }

        self.modem.at.write_raw(data)?;
        let ack = Timer::after(self.modem.config.send_timeout);
        loop {
            match self
                .modem
                .at
                .wait_for(ack.remaining(), &["SEND OK", "SEND FAIL", "ERROR", "+IPD,"])?
            {
                0 => return Ok(()),
                3 => match self.read_datagram(self.modem.config.command_timeout) {
                    Ok(datagram) => {
                        if self.pending.replace(datagram).is_some() {
                            debug!("Unread datagram replaced");
                        }
                    }
                    Err(Error::Parse) => warn!("Unreadable datagram header while sending"),
                    Err(e) => return Err(e),
                },
                _ => return Err(Error::Downstream),
            }
        }
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Datagram<'_>>, Error> {
        self.modem.require(Stage::SocketOpen)?;

        let ready = match self.pending.take() {
            Some(datagram) => Some(datagram),
            None => self.check_incoming(),
        };
        if let Some((stored, len)) = ready {
            return Ok(Some(Datagram::new(&self.rx[..stored], len > stored)));
        }

        match self.modem.at.wait_for(timeout, &["+IPD,"]) {
            Ok(_) => {}
            Err(Error::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        }

        let (stored, len) = self.read_datagram(self.modem.config.command_timeout)?;
        Ok(Some(Datagram::new(&self.rx[..stored], len > stored)))
    }

    fn ip_address(&mut self) -> Result<Ipv4Addr, Error> {
        self.modem.require(Stage::BearerUp)?;
        let budget = Timer::after(self.modem.config.command_timeout);
        self.local_ip(&budget)
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

    fn location(&mut self) -> Result<Location, Error> {
        self.modem.require(Stage::BearerUp)?;
        let timeout = self.modem.config.location_timeout;
        self.modem
            .at
            .send_with_timeout(&GetGsmLocation, timeout)?
            .location()
    }

    fn device_name(&self) -> &'static str {
        Self::NAME
    }
}
