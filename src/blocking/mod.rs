mod client;
pub mod timer;

pub use client::{AtClient, RESPONSE_BUFFER_SIZE};
