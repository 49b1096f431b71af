// atomfan-api: Async Rust client for the Atomberg smart-fan cloud API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{AtombergClient, DEFAULT_BASE_URL};
pub use error::Error;
pub use models::{
    ControlCommand, Device, DeviceEnvelope, DeviceStatus, FanMode, FanSpeed, MAX_SPEED,
};
pub use transport::{TlsMode, TransportConfig};
