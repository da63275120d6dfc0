//! Ocean register map.
//!
//! Addresses below `0x8000` are read-only reporting blocks; the `0x8xxx`
//! range is the configuration space, most of which sits behind the unlock
//! register. All multi-byte fields are little-endian.

/// Status block: u32 status word followed by the u32 error flag mask.
pub const STATUS_ADDR: u16 = 0x0000;
/// Length of the status block.
pub const STATUS_LEN: u8 = 8;
/// Offset of the error flag mask inside the status block.
pub const ERROR_FLAGS_OFFSET: usize = 4;

/// Device info block: active channel count (u8), reserved (u8), per-channel
/// power as Q2.6 (u16), firmware version (u32), product id (u32).
pub const DEVICE_INFO_ADDR: u16 = 0x0008;
/// Length of the device info block.
pub const DEVICE_INFO_LEN: u8 = 12;

/// Reported per-channel power fraction, Q2.6 in a u16. Read-only; mirrors
/// the setpoint once the device has applied it.
pub const POWER_REPORT_ADDR: u16 = 0x000A;
/// Length of the power report field.
pub const POWER_REPORT_LEN: u8 = 2;

/// Measurement block: nine u16 values, highest channel first — voltage and
/// current per channel (4 down to 1), then the combined output voltage.
/// Voltages are Q14.2, currents Q9.7.
pub const MEAS_BLOCK_ADDR: u16 = 0x0118;
/// Length of the measurement block.
pub const MEAS_BLOCK_LEN: u8 = 18;

/// Output enable (u8, 0 or 1). Protected.
pub const OUTPUT_STATE_ADDR: u16 = 0x800C;

/// Power-on default for the output enable (u8, 0 or 1). Protected.
pub const DEFAULT_STATE_ADDR: u16 = 0x800E;

/// Error clear register (u32 mask, write ones to clear). Protected.
pub const ERROR_RESET_ADDR: u16 = 0x8014;

/// Accumulated on-time counter (u32 seconds).
pub const ON_TIME_ADDR: u16 = 0x8032;

/// Unlock register: both keys written little-endian in one transaction
/// open the protected configuration space.
pub const UNLOCK_ADDR: u16 = 0x8100;
/// Unlock payload length (two u32 keys).
pub const UNLOCK_LEN: usize = 8;
/// First unlock key.
pub const UNLOCK_KEY0: u32 = 0xE1C8_5CDA;
/// Second unlock key.
pub const UNLOCK_KEY1: u32 = 0x367F_966B;

/// Per-channel power setpoint, Q2.6 in a u8. Protected.
pub const POWER_SETPOINT_ADDR: u16 = 0x8108;

/// Active channel count (u8, 1..=4). Protected. Takes effect through the
/// device's reconfiguration path, so it is verified via the device info
/// block rather than by reading this address back.
pub const NUM_CHANNELS_ADDR: u16 = 0x8109;

/// Factory-programmed serial number (u32).
pub const SERIAL_NUMBER_ADDR: u16 = 0x8200;
/// Length of the serial number field.
pub const SERIAL_NUMBER_LEN: u8 = 4;
