//! Device control session: domain operations over a [`Link`].
//!
//! [`DeviceSession`] owns the link and everything the control layer keeps
//! between calls (the one-time device info snapshot). Setters run the
//! convergence ladder described in [`converge`](super::converge); getters
//! go through the retrying read path and are authoritative.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use super::converge::{ConvergeSpec, Stage, VerifyCheck};
use super::{convert, registers as regs};
use crate::error::{LinkError, Result};
use crate::link::{HandshakePolicy, Link};
use crate::transport::Transport;

/// Timing policy for the device control layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Budget for the idempotence fast-path read at the top of a ladder.
    pub check_budget: Duration,
    /// Budget for each quick verify window.
    pub verify_budget: Duration,
    /// Budget for the secondary power-report check.
    pub power_report_budget: Duration,
    /// Response header wait for quick, non-retrying reads.
    pub quick_read_header_wait: Duration,
    /// Response payload wait for quick, non-retrying reads.
    pub quick_read_payload_wait: Duration,
    /// Header and payload wait for ladder writes.
    pub quick_write_wait: Duration,
    /// Pause after a ladder write, before verifying.
    pub settle_delay: Duration,
    /// Gap between read attempts inside a verify window.
    pub poll_gap: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            check_budget: Duration::from_millis(120),
            verify_budget: Duration::from_millis(300),
            power_report_budget: Duration::from_millis(200),
            quick_read_header_wait: Duration::from_millis(50),
            quick_read_payload_wait: Duration::from_millis(80),
            quick_write_wait: Duration::from_millis(30),
            settle_delay: Duration::from_millis(120),
            poll_gap: Duration::from_millis(20),
        }
    }
}

/// One-time identity snapshot from the device info block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Channels currently active (1..=4).
    pub active_channels: u8,
    /// Per-channel power fraction the device reports.
    pub channel_power: f32,
    /// Firmware version word.
    pub firmware_version: u32,
    /// Product identifier.
    pub product_id: u32,
}

/// Voltage and current of one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    /// Channel voltage in volts.
    pub voltage: f32,
    /// Channel current in amperes.
    pub current: f32,
}

/// Decoded measurement block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Per-channel readings, channel 1 first.
    pub channels: [ChannelReading; 4],
    /// Combined output voltage in volts.
    pub output_voltage: f32,
}

/// Control session for one Ocean device.
///
/// # Example
///
/// ```no_run
/// use oceanlink::{DeviceSession, Link, SerialTransport};
///
/// # async fn demo() -> oceanlink::Result<()> {
/// let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
/// let mut session = DeviceSession::new(Link::new(transport));
/// session.link_mut().handshake().await?;
/// let info = session.init().await?;
/// println!("{} channels at firmware {:08X}", info.active_channels, info.firmware_version);
/// session.set_power(0.75).await?;
/// session.set_output_enabled(true).await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession<T: Transport> {
    link: Link<T>,
    policy: SessionPolicy,
    info: Option<DeviceInfo>,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session with the default timing policy.
    pub fn new(link: Link<T>) -> Self {
        Self::with_policy(link, SessionPolicy::default())
    }

    /// Create a session with an explicit timing policy.
    pub fn with_policy(link: Link<T>, policy: SessionPolicy) -> Self {
        Self {
            link,
            policy,
            info: None,
        }
    }

    /// Device info captured by the last [`init`](Self::init), if any.
    #[inline]
    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Exclusive access to the underlying link, e.g. for an explicit
    /// handshake at connection time.
    #[inline]
    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    /// Read the device info block, check the status block, and cache the
    /// identity snapshot.
    pub async fn init(&mut self) -> Result<DeviceInfo> {
        let raw = self
            .link
            .read_retry(regs::DEVICE_INFO_ADDR, regs::DEVICE_INFO_LEN)
            .await?;
        let info = DeviceInfo {
            active_channels: raw[0],
            channel_power: convert::q2_6_to_fraction(le_u16(&raw[2..])),
            firmware_version: le_u32(&raw[4..]),
            product_id: le_u32(&raw[8..]),
        };
        tracing::info!(
            "device: {} channels, firmware {:08X}, product {:08X}",
            info.active_channels,
            info.firmware_version,
            info.product_id
        );
        let flags = self.error_flags().await?;
        if flags != 0 {
            tracing::warn!("device reports latched error flags {flags:#010X}");
        }
        self.info = Some(info);
        Ok(info)
    }

    /// Set the active channel count.
    ///
    /// The count takes effect through the device's reconfiguration path,
    /// so convergence is judged by the device info block, not by reading
    /// the setpoint register back.
    pub async fn set_channels(&mut self, count: u8) -> Result<()> {
        if !(1..=4).contains(&count) {
            return Err(LinkError::BadArguments(format!(
                "channel count {count} outside 1..=4"
            )));
        }
        let spec = ConvergeSpec {
            write_addr: regs::NUM_CHANNELS_ADDR,
            value: vec![count],
            checks: vec![VerifyCheck {
                addr: regs::DEVICE_INFO_ADDR,
                len: regs::DEVICE_INFO_LEN,
                accept: Box::new(move |bytes| bytes[0] == count),
                budget: self.policy.verify_budget,
            }],
        };
        self.converge(&spec).await
    }

    /// Active channel count, read authoritatively.
    pub async fn channels(&mut self) -> Result<u8> {
        let raw = self
            .link
            .read_retry(regs::DEVICE_INFO_ADDR, regs::DEVICE_INFO_LEN)
            .await?;
        Ok(raw[0])
    }

    /// Set the per-channel power fraction. Accepted range 0.5..=1.0.
    ///
    /// Converged when either the setpoint register holds the encoded value
    /// exactly or the report register is within one Q2.6 step of it (the
    /// device may republish a rounded value).
    pub async fn set_power(&mut self, fraction: f32) -> Result<()> {
        if !(0.5..=1.0).contains(&fraction) {
            return Err(LinkError::BadArguments(format!(
                "power fraction {fraction} outside 0.5..=1.0"
            )));
        }
        let target = convert::fraction_to_q2_6(fraction);
        let spec = ConvergeSpec {
            write_addr: regs::POWER_SETPOINT_ADDR,
            value: vec![target],
            checks: vec![
                VerifyCheck {
                    addr: regs::POWER_SETPOINT_ADDR,
                    len: 1,
                    accept: Box::new(move |bytes| bytes[0] == target),
                    budget: self.policy.verify_budget,
                },
                VerifyCheck {
                    addr: regs::POWER_REPORT_ADDR,
                    len: regs::POWER_REPORT_LEN,
                    accept: Box::new(move |bytes| {
                        le_u16(bytes).abs_diff(u16::from(target)) <= 1
                    }),
                    budget: self.policy.power_report_budget,
                },
            ],
        };
        self.converge(&spec).await
    }

    /// Reported per-channel power fraction, read authoritatively.
    pub async fn power(&mut self) -> Result<f32> {
        let raw = self
            .link
            .read_retry(regs::POWER_REPORT_ADDR, regs::POWER_REPORT_LEN)
            .await?;
        Ok(convert::q2_6_to_fraction(le_u16(&raw)))
    }

    /// Enable or disable the output.
    pub async fn set_output_enabled(&mut self, on: bool) -> Result<()> {
        let spec = ConvergeSpec::exact(
            regs::OUTPUT_STATE_ADDR,
            vec![u8::from(on)],
            self.policy.verify_budget,
        );
        self.converge(&spec).await
    }

    /// Current output enable state, read authoritatively.
    pub async fn output_enabled(&mut self) -> Result<bool> {
        let raw = self.link.read_retry(regs::OUTPUT_STATE_ADDR, 1).await?;
        Ok(raw[0] != 0)
    }

    /// Set the power-on default for the output enable.
    pub async fn set_default_enabled(&mut self, on: bool) -> Result<()> {
        let spec = ConvergeSpec::exact(
            regs::DEFAULT_STATE_ADDR,
            vec![u8::from(on)],
            self.policy.verify_budget,
        );
        self.converge(&spec).await
    }

    /// Power-on default for the output enable, read authoritatively.
    pub async fn default_enabled(&mut self) -> Result<bool> {
        let raw = self.link.read_retry(regs::DEFAULT_STATE_ADDR, 1).await?;
        Ok(raw[0] != 0)
    }

    /// Error flag mask from the status block.
    pub async fn error_flags(&mut self) -> Result<u32> {
        let raw = self
            .link
            .read_retry(regs::STATUS_ADDR, regs::STATUS_LEN)
            .await?;
        Ok(le_u32(&raw[regs::ERROR_FLAGS_OFFSET..]))
    }

    /// Clear all latched error flags.
    ///
    /// A single all-ones write; if the device rejects it the register was
    /// locked, so unlock once and rewrite.
    pub async fn clear_errors(&mut self) -> Result<()> {
        let mask = u32::MAX.to_le_bytes();
        if let Err(first) = self.link.write_retry(regs::ERROR_RESET_ADDR, &mask).await {
            tracing::debug!("error clear rejected ({first}); unlocking and rewriting");
            self.unlock().await?;
            self.link.write_retry(regs::ERROR_RESET_ADDR, &mask).await?;
        }
        Ok(())
    }

    /// Decode one measurement block snapshot.
    pub async fn telemetry(&mut self) -> Result<Telemetry> {
        let raw = self
            .link
            .read_retry(regs::MEAS_BLOCK_ADDR, regs::MEAS_BLOCK_LEN)
            .await?;
        // Block order is channel 4 down to channel 1, then output voltage.
        let reading = |offset: usize| ChannelReading {
            voltage: convert::q14_2_to_volts(le_u16(&raw[offset..])),
            current: convert::q9_7_to_amps(le_u16(&raw[offset + 2..])),
        };
        Ok(Telemetry {
            channels: [reading(12), reading(8), reading(4), reading(0)],
            output_voltage: convert::q14_2_to_volts(le_u16(&raw[16..])),
        })
    }

    /// Factory serial number.
    pub async fn serial_number(&mut self) -> Result<u32> {
        let raw = self
            .link
            .read_retry(regs::SERIAL_NUMBER_ADDR, regs::SERIAL_NUMBER_LEN)
            .await?;
        Ok(le_u32(&raw))
    }

    /// Accumulated on-time in seconds.
    pub async fn accumulated_on_time(&mut self) -> Result<u32> {
        let raw = self.link.read_retry(regs::ON_TIME_ADDR, 4).await?;
        Ok(le_u32(&raw))
    }

    /// Open the protected configuration space by writing both unlock keys
    /// in one transaction.
    async fn unlock(&mut self) -> Result<()> {
        let mut keys = [0u8; regs::UNLOCK_LEN];
        keys[..4].copy_from_slice(&regs::UNLOCK_KEY0.to_le_bytes());
        keys[4..].copy_from_slice(&regs::UNLOCK_KEY1.to_le_bytes());
        self.link.write_retry(regs::UNLOCK_ADDR, &keys).await
    }

    /// Walk the convergence ladder for one target value.
    ///
    /// Writes and quick resyncs never abort the ladder; the verify that
    /// follows each one decides whether to finish or escalate. Only the
    /// authoritative verify at the bottom produces the final error.
    async fn converge(&mut self, spec: &ConvergeSpec) -> Result<()> {
        let mut stage = Stage::CheckCurrent;
        loop {
            tracing::debug!("converge 0x{:04X}: {stage:?}", spec.write_addr);
            stage = match stage {
                Stage::CheckCurrent => {
                    if self.verify_primary(spec, self.policy.check_budget).await {
                        return Ok(());
                    }
                    Stage::Write
                }
                Stage::Write => {
                    self.fire_write(spec).await;
                    Stage::VerifyFast
                }
                Stage::VerifyFast => {
                    if self.verify_quick(spec).await {
                        return Ok(());
                    }
                    Stage::ResyncQuick
                }
                Stage::ResyncQuick => {
                    self.resync_quick().await;
                    Stage::VerifyFast2
                }
                Stage::VerifyFast2 => {
                    if self.verify_quick(spec).await {
                        return Ok(());
                    }
                    Stage::Unlock
                }
                Stage::Unlock => {
                    if let Err(e) = self.unlock().await {
                        tracing::debug!("unlock failed: {e}");
                    }
                    Stage::WriteAgain
                }
                Stage::WriteAgain => {
                    self.fire_write(spec).await;
                    self.resync_quick().await;
                    Stage::VerifyFast3
                }
                Stage::VerifyFast3 => {
                    if self.verify_quick(spec).await {
                        return Ok(());
                    }
                    Stage::ResyncFull
                }
                Stage::ResyncFull => {
                    if let Err(e) = self.link.handshake().await {
                        tracing::debug!("full resync failed: {e}");
                    }
                    Stage::VerifyAuthoritative
                }
                Stage::VerifyAuthoritative => {
                    let mut last_err = None;
                    for check in &spec.checks {
                        match self.link.read_retry(check.addr, check.len).await {
                            Ok(data) if (check.accept)(&data) => return Ok(()),
                            Ok(_) => {}
                            Err(e) => last_err = Some(e),
                        }
                    }
                    tracing::warn!(
                        "register 0x{:04X} failed to converge",
                        spec.write_addr
                    );
                    return Err(match last_err {
                        Some(e) => e,
                        None => LinkError::Convergence {
                            addr: spec.write_addr,
                        },
                    });
                }
            };
        }
    }

    /// One short-wait write plus the settle pause. Errors are logged and
    /// swallowed; the verify that follows decides.
    async fn fire_write(&mut self, spec: &ConvergeSpec) {
        let wait = self.policy.quick_write_wait;
        if let Err(e) = self
            .link
            .write(spec.write_addr, &spec.value, wait, wait)
            .await
        {
            tracing::debug!("ladder write to 0x{:04X} failed: {e}", spec.write_addr);
        }
        sleep(self.policy.settle_delay).await;
    }

    /// Low-budget handshake between ladder stages. Failure is tolerated.
    async fn resync_quick(&mut self) {
        if let Err(e) = self.link.handshake_with(&HandshakePolicy::quick()).await {
            tracing::debug!("quick resync failed: {e}");
        }
    }

    /// Run every check in the spec over its quick-verify budget.
    async fn verify_quick(&mut self, spec: &ConvergeSpec) -> bool {
        for check in &spec.checks {
            if self.poll_check(check, check.budget).await {
                return true;
            }
        }
        false
    }

    /// Fast-path check against the primary verify register only.
    async fn verify_primary(&mut self, spec: &ConvergeSpec, budget: Duration) -> bool {
        match spec.checks.first() {
            Some(check) => self.poll_check(check, budget).await,
            None => false,
        }
    }

    /// Poll one check with quick reads until a read succeeds or the budget
    /// runs out. The first successful read decides; a readable register
    /// holding the wrong value means not converged yet at this rung.
    async fn poll_check(&mut self, check: &VerifyCheck, budget: Duration) -> bool {
        let deadline = Instant::now() + budget;
        loop {
            match self
                .link
                .read(
                    check.addr,
                    check.len,
                    self.policy.quick_read_header_wait,
                    self.policy.quick_read_payload_wait,
                )
                .await
            {
                Ok(data) => return (check.accept)(&data),
                Err(e) => {
                    tracing::trace!("quick read of 0x{:04X} failed: {e}", check.addr);
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.policy.poll_gap).await;
        }
    }
}

#[inline]
fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

#[inline]
fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_budgets() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.check_budget, Duration::from_millis(120));
        assert_eq!(policy.verify_budget, Duration::from_millis(300));
        assert_eq!(policy.settle_delay, Duration::from_millis(120));
        assert!(policy.quick_read_header_wait < policy.verify_budget);
    }

    #[test]
    fn test_le_helpers() {
        assert_eq!(le_u16(&[0x34, 0x12]), 0x1234);
        assert_eq!(le_u32(&[0x78, 0x56, 0x34, 0x12]), 0x12345678);
    }
}
