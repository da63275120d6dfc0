//! Device control layer: register map, fixed-point conversions, and the
//! session API that drives the Ocean device through convergence ladders.

pub mod convert;
pub mod registers;

mod converge;
mod session;

pub use session::{ChannelReading, DeviceInfo, DeviceSession, SessionPolicy, Telemetry};
