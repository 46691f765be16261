use heapless::String;

/// Access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiNetwork {
    pub bssid: [u8; 6],
    pub ssid: String<32>,
    pub channel: u8,
    pub rssi: i16,
}

impl WifiNetwork {
    pub fn new(ssid: &str, channel: u8, rssi: i16) -> Option<Self> {
        Some(Self {
            bssid: [0; 6],
            ssid: String::try_from(ssid).ok()?,
            channel,
            rssi,
        })
    }

    pub fn with_bssid(mut self, bssid: [u8; 6]) -> Self {
        self.bssid = bssid;
        self
    }
}
