//! Event codes of the upper-layer telemetry protocol.
//!
//! The link layer never interprets them; they travel inside datagram payloads.

use core::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    Login = 1,
    Logout = 2,
    Sync = 3,
    Reconnect = 4,
    Command = 5,
    Ack = 6,
}

impl From<Event> for u8 {
    fn from(event: Event) -> Self {
        event as u8
    }
}

impl TryFrom<u8> for Event {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Event::Login,
            2 => Event::Logout,
            3 => Event::Sync,
            4 => Event::Reconnect,
            5 => Event::Command,
            6 => Event::Ack,
            other => return Err(other),
        })
    }
}
