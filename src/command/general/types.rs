//! Argument and parameter types used by the general commands and responses
use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OnOff {
    Off = 0,
    On = 1,
}

impl From<bool> for OnOff {
    fn from(on: bool) -> Self {
        if on {
            OnOff::On
        } else {
            OnOff::Off
        }
    }
}

/// `<stat>` of +CREG
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RegistrationStatus {
    NotRegistered = 0,
    Home = 1,
    Searching = 2,
    Denied = 3,
    Unknown = 4,
    Roaming = 5,
}

impl RegistrationStatus {
    /// Whether the modem may carry traffic in this state.
    pub fn is_registered(self, roaming: bool) -> bool {
        match self {
            Self::Home => true,
            Self::Roaming => roaming,
            _ => false,
        }
    }
}

/// `<code>` of +CPIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinStatus {
    Ready,
    /// SIM missing, locked or waiting for a PUK.
    Locked,
}
