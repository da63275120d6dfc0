//! Error types for oceanlink.

use thiserror::Error;

/// Main error type for all link and device operations.
///
/// Nothing in this crate is fatal to the process: every failure surfaces
/// as one of these variants so the caller can decide how to report it.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Transport is busy and cannot accept the operation right now.
    #[error("transport busy")]
    Busy,

    /// A read or write deadline elapsed before the expected bytes arrived.
    #[error("operation timed out")]
    Timeout,

    /// The device answered with a malformed or mismatched frame
    /// (bad CRC, bad echo, unknown type, bad length).
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Transport-level failure (serial port error, closed stream).
    #[error("link transport error: {0}")]
    Link(#[from] std::io::Error),

    /// Both resynchronization branches exhausted their attempt budgets.
    #[error("handshake failed: link could not be resynchronized")]
    HandshakeFailed,

    /// Arguments rejected before any bytes were sent.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// A convergence ladder ran out of stages without the register
    /// reaching its target value.
    #[error("register 0x{addr:04X} did not converge to the requested value")]
    Convergence {
        /// Address of the register that was being written.
        addr: u16,
    },
}

/// Result type alias using [`LinkError`].
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_cause() {
        assert_eq!(LinkError::Timeout.to_string(), "operation timed out");
        assert!(LinkError::InvalidResponse("CRC mismatch".into())
            .to_string()
            .contains("CRC mismatch"));
        assert_eq!(
            LinkError::Convergence { addr: 0x800C }.to_string(),
            "register 0x800C did not converge to the requested value"
        );
    }

    #[test]
    fn test_io_error_converts_to_link() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: LinkError = io.into();
        assert!(matches!(err, LinkError::Link(_)));
    }
}
