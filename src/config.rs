use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};

/// Board-support object that owns the serial port of a cellular modem.
///
/// The modem backends take ownership of the device for their whole lifetime,
/// which makes them the only user of the UART. `release()` hands it back.
pub trait Device {
    type Uart: Read + Write + ReadReady;
    type PowerPin: OutputPin;

    fn uart(&mut self) -> &mut Self::Uart;

    /// Power key of the modem, pulsed low to switch it on or off.
    ///
    /// Boards that keep the modem permanently powered return `None`.
    fn power_pin(&mut self) -> Option<&mut Self::PowerPin> {
        None
    }
}

/// Timing of the AT dialog with a cellular modem.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    pub(crate) command_timeout: Duration,
    pub(crate) drain_window: Duration,
    pub(crate) prompt_timeout: Duration,
    pub(crate) send_timeout: Duration,
    pub(crate) open_timeout: Duration,
    pub(crate) dns_timeout: Duration,
    pub(crate) location_timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) power_pulse: Duration,
    pub(crate) boot_delay: Duration,
    pub(crate) begin_attempts: u8,
    pub(crate) local_port: u16,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(1000),
            drain_window: Duration::from_millis(20),
            prompt_timeout: Duration::from_millis(1000),
            send_timeout: Duration::from_millis(5000),
            open_timeout: Duration::from_millis(10_000),
            dns_timeout: Duration::from_millis(10_000),
            location_timeout: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(500),
            power_pulse: Duration::from_millis(1200),
            boot_delay: Duration::from_millis(3000),
            begin_attempts: 10,
            local_port: 8000,
        }
    }
}

impl ModemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default answer timeout for short commands.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// How long stale bytes are discarded before a command is written.
    pub fn drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// How long `send` waits for the `>` data prompt.
    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// How long `send` waits for the modem to acknowledge the payload.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// How long opening the UDP link may take, including the DNS lookup.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Answer timeout of a modem-side DNS lookup.
    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Answer timeout of a cell-based location request.
    pub fn location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Pause between registration polls while attaching.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Length of the low pulse on the power key.
    pub fn power_pulse(mut self, pulse: Duration) -> Self {
        self.power_pulse = pulse;
        self
    }

    /// Time the modem needs after power-on before it answers `AT`.
    pub fn boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }

    /// Number of `AT` attempts before `begin` gives up, at least one.
    pub fn begin_attempts(mut self, attempts: u8) -> Self {
        self.begin_attempts = attempts.max(1);
        self
    }

    /// Local UDP port of the 3G/4G socket.
    pub fn local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }
}
