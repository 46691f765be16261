use heapless::String;

/// How far a modem backend has brought its link up.
///
/// Setup only moves forward; `close` steps back to `BearerUp` and `end`
/// returns to `Uninitialised`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Uninitialised,
    /// The modem answered `AT`.
    UartReady,
    /// Registered on the cellular network.
    Attached,
    /// Packet data bearer active with an IP address.
    BearerUp,
    SocketOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WiFiState {
    /// Radio off
    Inactive,
    /// Radio on, no address
    NotConnected,
    Connected,
}

/// Remote end of the open UDP association of a modem backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Host as handed to the modem, a dotted quad once resolved.
    pub host: String<64>,
    pub port: u16,
}

impl Association {
    pub fn new(host: &str, port: u16) -> Option<Self> {
        Some(Self {
            host: String::try_from(host).ok()?,
            port,
        })
    }
}
