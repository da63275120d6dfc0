//! Link driver: resynchronization handshake and framed transactions over a
//! [`Transport`].
//!
//! A [`Link`] owns its transport exclusively, so at most one transaction is
//! ever in flight. The two layers it provides:
//!
//! - **Handshake** ([`Link::handshake`]): the two-branch reset exchange
//!   that brings both peers back to a known idle state.
//! - **Transactions** ([`Link::read`], [`Link::write`] and their retrying
//!   wrappers): register reads and writes with byte-level deadlines and
//!   echo validation.

mod config;
mod handshake;
mod transaction;

pub use config::{HandshakePolicy, LinkConfig};

use crate::transport::Transport;

/// Driver for the framed serial link.
///
/// # Example
///
/// ```no_run
/// use oceanlink::{Link, SerialTransport};
///
/// # async fn demo() -> oceanlink::Result<()> {
/// let mut link = Link::new(SerialTransport::open("/dev/ttyUSB0", 115_200)?);
/// link.handshake().await?;
/// let status = link.read_retry(0x0000, 8).await?;
/// println!("status word: {:02X?}", &status[..4]);
/// # Ok(())
/// # }
/// ```
pub struct Link<T: Transport> {
    transport: T,
    config: LinkConfig,
}

impl<T: Transport> Link<T> {
    /// Create a link with the default timing policy.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    /// Create a link with an explicit timing policy.
    pub fn with_config(transport: T, config: LinkConfig) -> Self {
        Self { transport, config }
    }

    /// Current timing policy.
    #[inline]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Shared access to the underlying transport.
    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Exclusive access to the underlying transport.
    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
