#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod blocking;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
mod modem;
pub mod options;
pub mod sim5360;
pub mod sim800;
pub mod wifi;

pub use atat;
pub use embedded_nal;

pub use client::{Client, Datagram, Location, UdpClient};
pub use config::{Device, ModemConfig};
pub use connection::{Stage, WiFiState};
pub use error::{Error, WifiError};
pub use event::Event;
pub use options::{CellularOptions, ConnectionOptions, LinkConfig, WifiAuthentication};
pub use sim5360::{Model, Sim5360Client};
pub use sim800::Sim800Client;
pub use wifi::{WifiClient, WifiNetwork, WifiStack};

/// Capacity of the per-backend receive buffer.
pub const RX_BUFFER_SIZE: usize = 256;

/// Largest datagram `send` accepts.
pub const MAX_PAYLOAD: usize = 1460;

/// Receive timeout used by callers without their own policy.
pub const DEFAULT_RECEIVE_TIMEOUT: embassy_time::Duration =
    embassy_time::Duration::from_secs(5);
