//! Convergence ladder building blocks.
//!
//! A write to the device is not guaranteed observable immediately: the
//! device may be desynchronized, mid-reconfiguration, or holding the
//! target register locked. Every setter therefore walks a fixed ladder of
//! stages, cheapest first:
//!
//! ```text
//! CheckCurrent ──already converged──▶ done
//!      │
//!      ▼
//! Write ─▶ VerifyFast ──ok──▶ done
//!               │
//!               ▼
//! ResyncQuick ─▶ VerifyFast ──ok──▶ done
//!               │
//!               ▼
//! Unlock ─▶ WriteAgain ─▶ ResyncQuick ─▶ VerifyFast ──ok──▶ done
//!               │
//!               ▼
//! ResyncFull ─▶ VerifyAuthoritative ──ok──▶ done, else Convergence error
//! ```
//!
//! The ladder always terminates: every transition moves strictly downward
//! and the final stage returns unconditionally.

use std::fmt;
use std::time::Duration;

/// Ladder stages in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Quick read of the primary check: the value may already be in place.
    CheckCurrent,
    /// Fire the write with short waits, then let the device settle.
    Write,
    /// First quick verify after the write.
    VerifyFast,
    /// Low-budget handshake in case the write desynchronized the link.
    ResyncQuick,
    /// Second quick verify, now over a resynchronized link.
    VerifyFast2,
    /// Open the protected configuration space.
    Unlock,
    /// Rewrite now that the register is unlocked, then resync again.
    WriteAgain,
    /// Third quick verify.
    VerifyFast3,
    /// Full-budget handshake before the final word.
    ResyncFull,
    /// Authoritative verify through the retrying read path.
    VerifyAuthoritative,
}

/// One read-back check inside a ladder.
pub(crate) struct VerifyCheck {
    /// Register to read back.
    pub addr: u16,
    /// Bytes to read.
    pub len: u8,
    /// Accepts the raw read-back when it reflects the target value.
    pub accept: Box<dyn Fn(&[u8]) -> bool + Send + Sync>,
    /// Polling window for the quick (non-retrying) verifies.
    pub budget: Duration,
}

impl fmt::Debug for VerifyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyCheck")
            .field("addr", &format_args!("0x{:04X}", self.addr))
            .field("len", &self.len)
            .field("budget", &self.budget)
            .finish()
    }
}

/// A target register value plus the checks that prove convergence.
///
/// The first check is the *primary* one; it alone serves the idempotence
/// fast path. Convergence requires any one check to pass — they are
/// alternative views of the same target (for example a setpoint register
/// and the report register that mirrors it).
#[derive(Debug)]
pub(crate) struct ConvergeSpec {
    /// Register the ladder writes to.
    pub write_addr: u16,
    /// Bytes to write.
    pub value: Vec<u8>,
    /// Read-back checks, primary first.
    pub checks: Vec<VerifyCheck>,
}

impl ConvergeSpec {
    /// Spec whose single check reads the written register back and
    /// compares it byte for byte.
    pub fn exact(write_addr: u16, value: Vec<u8>, budget: Duration) -> Self {
        let expected = value.clone();
        let len = expected.len() as u8;
        Self {
            write_addr,
            value,
            checks: vec![VerifyCheck {
                addr: write_addr,
                len,
                accept: Box::new(move |bytes| bytes == expected.as_slice()),
                budget,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_spec_accepts_only_the_target_bytes() {
        let spec = ConvergeSpec::exact(0x800C, vec![1], Duration::from_millis(300));
        assert_eq!(spec.checks.len(), 1);
        let check = &spec.checks[0];
        assert_eq!(check.addr, 0x800C);
        assert_eq!(check.len, 1);
        assert!((check.accept)(&[1]));
        assert!(!(check.accept)(&[0]));
        assert!(!(check.accept)(&[1, 1]));
    }
}
