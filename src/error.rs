/// Failure of a UDP link operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The deadline elapsed before the link or the modem answered.
    Timeout,
    /// The operation needs a link stage that has not been reached yet.
    Unattached,
    /// The modem answered with something that could not be parsed.
    Parse,
    /// An inbound datagram did not fit the receive buffer.
    Truncated,
    /// The radio, the modem or the carrier reported a failure.
    Downstream,
    /// The backend does not offer this capability.
    Unsupported,
    /// A command or a response did not fit its fixed-size buffer.
    Overflow,
    /// Reading from or writing to the UART failed.
    Uart,
}

/// Failure reported by a WiFi radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiError {
    /// The radio is switched off.
    WifiDisabled,
    /// The radio could not be switched on.
    InterfaceFailedToOn,
    /// The access point rejected the association.
    FailedToConnect,
    /// The association is up but DHCP did not hand out an address.
    NoAddress,
    Other,
}

impl From<WifiError> for Error {
    fn from(error: WifiError) -> Self {
        match error {
            WifiError::WifiDisabled => Error::Unattached,
            _ => Error::Downstream,
        }
    }
}
