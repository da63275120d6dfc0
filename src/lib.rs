//! # oceanlink
//!
//! Host-side driver for the Ocean power-delivery device, speaking its
//! framed point-to-point serial protocol.
//!
//! ## Layers
//!
//! - [`protocol`] — byte-exact frames: type, total length, payload, CRC16
//!   trailer ([`crc`] holds the checksum engine).
//! - [`transport`] — the raw byte channel. [`SerialTransport`] for real
//!   hardware; anything implementing [`Transport`] works.
//! - [`link`] — the two-branch resynchronization handshake and
//!   timeout-governed read/write transactions with retry-and-resync.
//! - [`device`] — domain operations (channel count, power fraction,
//!   output control, error flags, telemetry) expressed as convergence
//!   ladders that verify every write against the device's own reporting.
//!
//! ## Example
//!
//! ```no_run
//! use oceanlink::{DeviceSession, Link, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> oceanlink::Result<()> {
//!     let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
//!     let mut session = DeviceSession::new(Link::new(transport));
//!
//!     session.link_mut().handshake().await?;
//!     let info = session.init().await?;
//!     println!("{} active channels", info.active_channels);
//!
//!     session.set_power(0.75).await?;
//!     session.set_output_enabled(true).await?;
//!
//!     let telemetry = session.telemetry().await?;
//!     println!("output: {:.2} V", telemetry.output_voltage);
//!     Ok(())
//! }
//! ```

pub mod crc;
pub mod device;
pub mod error;
pub mod link;
pub mod protocol;
pub mod transport;

pub use device::{ChannelReading, DeviceInfo, DeviceSession, SessionPolicy, Telemetry};
pub use error::{LinkError, Result};
pub use link::{HandshakePolicy, Link, LinkConfig};
pub use transport::{SerialTransport, Transport};
