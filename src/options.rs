#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiAuthentication<'a> {
    #[default]
    None,
    Wpa2Passphrase(&'a str),
}

impl<'a> From<&'a str> for WifiAuthentication<'a> {
    fn from(s: &'a str) -> Self {
        Self::Wpa2Passphrase(s)
    }
}

/// Access point to associate with during WiFi setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionOptions<'a> {
    pub ssid: &'a str,
    pub auth: WifiAuthentication<'a>,
    /// List the visible access points in the log before joining.
    pub scan: bool,
}

impl<'a> ConnectionOptions<'a> {
    pub fn new(ssid: &'a str) -> Self {
        Self {
            ssid,
            ..Default::default()
        }
    }

    pub fn no_auth(mut self) -> Self {
        self.auth = WifiAuthentication::None;
        self
    }

    pub fn wpa2_passphrase(mut self, password: &'a str) -> Self {
        self.auth = WifiAuthentication::Wpa2Passphrase(password);
        self
    }

    pub fn scan(mut self, scan: bool) -> Self {
        self.scan = scan;
        self
    }
}

/// Packet data attach parameters of a 3G/4G modem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CellularOptions<'a> {
    pub apn: &'a str,
    /// Restrict the radio to WCDMA, disabling LTE.
    pub only_3g: bool,
    /// Accept registration on a visited network.
    pub roaming: bool,
}

impl<'a> CellularOptions<'a> {
    pub fn new(apn: &'a str) -> Self {
        Self {
            apn,
            ..Default::default()
        }
    }

    pub fn only_3g(mut self, only_3g: bool) -> Self {
        self.only_3g = only_3g;
        self
    }

    pub fn roaming(mut self, roaming: bool) -> Self {
        self.roaming = roaming;
        self
    }
}

/// Credentials for bringing any backend's link up through the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkConfig<'a> {
    Wifi(ConnectionOptions<'a>),
    Gprs { apn: &'a str },
    Cellular(CellularOptions<'a>),
}
