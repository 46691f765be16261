//! State and AT dialog shared by the SIMCom backends

use core::net::Ipv4Addr;

use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use heapless::String;

use crate::blocking::timer::Timer;
use crate::blocking::AtClient;
use crate::command::general::{
    At, GetNetworkRegistration, GetOperator, GetSignalQuality, ResolveHost,
};
use crate::command::{Reply, MAX_HOST_LEN};
use crate::config::{Device, ModemConfig};
use crate::connection::Stage;
use crate::error::Error;

pub(crate) struct Modem<D: Device> {
    pub(crate) at: AtClient<D>,
    pub(crate) stage: Stage,
    pub(crate) config: ModemConfig,
}

impl<D: Device> Modem<D> {
    pub(crate) fn new(device: D, ok: &'static str, config: ModemConfig) -> Self {
        Self {
            at: AtClient::new(device, ok, config.drain_window),
            stage: Stage::Uninitialised,
            config,
        }
    }

    /// Power the modem if it does not answer and wait for `AT` to succeed.
    pub(crate) fn begin(&mut self, name: &str) -> Result<(), Error> {
        if self.stage >= Stage::UartReady {
            return Ok(());
        }

        let mut pulsed = false;
        for attempt in 0..self.config.begin_attempts {
            if self.answers_at() {
                info!("{} ready after {} attempt(s)", name, attempt + 1);
                self.stage = Stage::UartReady;
                return Ok(());
            }
            if !pulsed && self.pulse_power() {
                debug!("{} silent, pulsing power key", name);
                pulsed = true;
                Timer::after(self.config.boot_delay).wait();
            }
        }

        error!("{} did not answer AT", name);
        Err(Error::Timeout)
    }

    fn answers_at(&mut self) -> bool {
        self.at
            .send_with_timeout(&At, self.config.command_timeout)
            .is_ok()
    }

    /// Toggle the power key, returns `false` when the board has none.
    pub(crate) fn pulse_power(&mut self) -> bool {
        let pulse = self.config.power_pulse;
        match self.at.device_mut().power_pin() {
            Some(pin) => {
                pin.set_low().ok();
                Timer::after(pulse).wait();
                pin.set_high().ok();
                true
            }
            None => false,
        }
    }

    /// Run `cmd` with its own timeout shortened to what is left of `budget`.
    pub(crate) fn command<C: Reply>(
        &mut self,
        cmd: &C,
        budget: &Timer,
    ) -> Result<C::Response, Error> {
        if budget.expired() {
            return Err(Error::Timeout);
        }
        let timeout = budget.clip(Duration::from_millis(C::MAX_TIMEOUT_MS.into()));
        self.at.send_with_timeout(cmd, timeout)
    }

    /// Poll `AT+CREG?` until the modem is registered or `budget` runs out.
    pub(crate) fn wait_registration(&mut self, budget: &Timer, roaming: bool) -> Result<(), Error> {
        loop {
            match self.command(&GetNetworkRegistration, budget) {
                Ok(reg) if reg.status.is_registered(roaming) => {
                    info!("Registered: {:?}", reg.status);
                    return Ok(());
                }
                Ok(reg) => trace!("Registration: {:?}", reg.status),
                Err(Error::Parse) => debug!("Unreadable registration status"),
                Err(Error::Timeout | Error::Downstream) => {}
                Err(e) => return Err(e),
            }

            if budget.expired() {
                warn!("Not registered within deadline");
                return Err(Error::Timeout);
            }
            Timer::after(budget.clip(self.config.poll_interval)).wait();
        }
    }

    pub(crate) fn signal(&mut self) -> Result<i16, Error> {
        self.require(Stage::UartReady)?;
        let csq = self.at.send(&GetSignalQuality)?;
        csq.dbm().ok_or(Error::Downstream)
    }

    pub(crate) fn operator_name(&mut self) -> Result<String<32>, Error> {
        self.require(Stage::UartReady)?;
        self.at.send(&GetOperator)?.operator()
    }

    /// Resolve `host` through the modem's DNS client.
    ///
    /// Dotted quads are parsed locally without touching the UART.
    pub(crate) fn query_ip(&mut self, host: &str) -> Result<Ipv4Addr, Error> {
        if let Ok(ip) = host.parse() {
            return Ok(ip);
        }
        self.require(Stage::BearerUp)?;
        if host.len() > MAX_HOST_LEN {
            return Err(Error::Overflow);
        }

        let timeout = self.config.dns_timeout;
        let ip = self
            .at
            .send_with_timeout(&ResolveHost { host }, timeout)?
            .address()?;
        debug!("Resolved {}", host);
        Ok(ip)
    }

    pub(crate) fn require(&self, stage: Stage) -> Result<(), Error> {
        if self.stage >= stage {
            Ok(())
        } else {
            Err(Error::Unattached)
        }
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            debug!("Stage {:?} -> {:?}", self.stage, stage);
            self.stage = stage;
        }
    }

    /// Drop back to `stage` if the link is currently beyond it.
    pub(crate) fn step_back(&mut self, stage: Stage) {
        if stage < self.stage {
            debug!("Stage {:?} -> {:?}", self.stage, stage);
            self.stage = stage;
        }
    }
}
