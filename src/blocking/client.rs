use atat::helpers::LossyStr;
use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use super::timer::Timer;
use crate::command::{command_line, find, line_from, Reply, MAX_CMD_LEN};
use crate::config::Device;
use crate::error::Error;

/// Capacity of the response accumulator.
pub const RESPONSE_BUFFER_SIZE: usize = 256;

/// Line-oriented AT dialog over a byte UART.
///
/// Every command is written after stale input has been drained, then the
/// modem output is accumulated until one of the expected answers closes the
/// buffer or the deadline passes. The accumulated bytes stay available
/// through [`AtClient::response`] until the next command.
pub struct AtClient<D: Device> {
    device: D,
    buf: [u8; RESPONSE_BUFFER_SIZE],
    len: usize,
    ok: &'static str,
    drain_window: Duration,
}

impl<D: Device> AtClient<D> {
    /// `ok` is the success terminator of this modem family, e.g. `"\r\nOK"`.
    pub fn new(device: D, ok: &'static str, drain_window: Duration) -> Self {
        Self {
            device,
            buf: [0; RESPONSE_BUFFER_SIZE],
            len: 0,
            ok,
            drain_window,
        }
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn release(self) -> D {
        self.device
    }

    /// Bytes accumulated by the last command or wait.
    pub fn response(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Discard whatever the modem sent since the last exchange.
    pub fn drain(&mut self) {
        let timer = Timer::after(self.drain_window);
        let mut dropped = 0usize;
        while !timer.expired() {
            match self.read_byte() {
                Ok(Some(_)) => dropped += 1,
                _ => break,
            }
        }
        if dropped > 0 {
            debug!("Dropped {} stale bytes", dropped);
        }
    }

    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), Error> {
        let uart = self.device.uart();
        uart.write_all(data).map_err(|_| Error::Uart)?;
        uart.flush().map_err(|_| Error::Uart)
    }

    /// Write `cmd` and wait for one of `answers`.
    ///
    /// Returns the index of the answer that closed the response. Unless
    /// `terminated` is set, a carriage return is appended to the command.
    pub fn transact(
        &mut self,
        cmd: &[u8],
        terminated: bool,
        timeout: Duration,
        answers: &[&str],
    ) -> Result<usize, Error> {
        self.drain();
        trace!("Sending command: {:?}", LossyStr(cmd));
        self.write_raw(cmd)?;
        if !terminated {
            self.write_raw(b"\r")?;
        }
        self.clear();
        self.read_response(Timer::after(timeout), answers)
    }

    /// Wait for one of `answers` without writing anything first.
    pub fn wait_for(&mut self, timeout: Duration, answers: &[&str]) -> Result<usize, Error> {
        self.clear();
        self.read_response(Timer::after(timeout), answers)
    }

    pub fn send<C: Reply>(&mut self, cmd: &C) -> Result<C::Response, Error> {
        self.send_with_timeout(cmd, Duration::from_millis(C::MAX_TIMEOUT_MS.into()))
    }

    /// Send a typed command, succeeding only on its expected answer.
    ///
    /// When the command carries an information line, the line is completed
    /// if needed and decoded into the command's response.
    pub fn send_with_timeout<C: Reply>(
        &mut self,
        cmd: &C,
        timeout: Duration,
    ) -> Result<C::Response, Error> {
        let mut buf = [0u8; MAX_CMD_LEN];
        let line = command_line(cmd, &mut buf).ok_or(Error::Overflow)?;

        let mut answers: Vec<&str, 4> = Vec::new();
        answers
            .push(C::EXPECT.unwrap_or(self.ok))
            .map_err(|_| Error::Overflow)?;
        for failure in C::FAILURES {
            answers.push(*failure).map_err(|_| Error::Overflow)?;
        }

        if self.transact(line, false, timeout, &answers)? != 0 {
            warn!(
                "{:?} failed: {:?}",
                LossyStr(line),
                LossyStr(self.response())
            );
            return Err(Error::Downstream);
        }

        if C::INFO.is_empty() {
            return cmd.parse(Ok(&[])).map_err(|_| Error::Parse);
        }
        let start = find(self.response(), C::INFO.as_bytes()).ok_or(Error::Parse)?;
        if !self.response()[start..].contains(&b'\n') {
            self.read_until(b'\n', timeout)?;
        }
        let info = line_from(&self.response()[start..], C::INFO).ok_or(Error::Parse)?;
        cmd.parse(Ok(info)).map_err(|_| {
            warn!("Unreadable answer: {:?}", LossyStr(info));
            Error::Parse
        })
    }

    /// Append modem output up to and including `delim`.
    pub fn read_until(&mut self, delim: u8, timeout: Duration) -> Result<(), Error> {
        let timer = Timer::after(timeout);
        loop {
            match self.read_byte()? {
                Some(b) => {
                    self.push(b)?;
                    if b == delim {
                        return Ok(());
                    }
                }
                None if timer.expired() => return Err(Error::Timeout),
                None => {}
            }
        }
    }

    /// Read exactly `len` raw bytes, keeping as many as fit in `dst`.
    ///
    /// Returns the number of bytes stored.
    pub fn read_payload(
        &mut self,
        dst: &mut [u8],
        len: usize,
        timeout: Duration,
    ) -> Result<usize, Error> {
        let timer = Timer::after(timeout);
        let mut read = 0;
        while read < len {
            match self.read_byte()? {
                Some(b) => {
                    if let Some(slot) = dst.get_mut(read) {
                        *slot = b;
                    }
                    read += 1;
                }
                None if timer.expired() => return Err(Error::Timeout),
                None => {}
            }
        }
        Ok(len.min(dst.len()))
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        let uart = self.device.uart();
        if !uart.read_ready().map_err(|_| Error::Uart)? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match uart.read(&mut byte).map_err(|_| Error::Uart)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn push(&mut self, b: u8) -> Result<(), Error> {
        let slot = self.buf.get_mut(self.len).ok_or(Error::Overflow)?;
        *slot = b;
        self.len += 1;
        Ok(())
    }

    fn read_response(&mut self, timer: Timer, answers: &[&str]) -> Result<usize, Error> {
        loop {
            match self.read_byte()? {
                Some(b) => {
                    self.push(b)?;
                    let resp = self.response();
                    if let Some(i) = answers
                        .iter()
                        .position(|a| resp.ends_with(a.as_bytes()))
                    {
                        trace!("Response: {:?}", LossyStr(resp));
                        return Ok(i);
                    }
                }
                None if timer.expired() => {
                    debug!("No answer within deadline: {:?}", LossyStr(self.response()));
                    return Err(Error::Timeout);
                }
                None => {}
            }
        }
    }
}
