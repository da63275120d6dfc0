//! CRC16 engine for the Ocean link protocol.
//!
//! Reflected CRC16 over generator polynomial `0xA2EB`. The running
//! algorithm consumes bits least-significant first, so the 256-entry
//! lookup table is derived from the bit-reversal of the polynomial.
//! Each frame carries its CRC little-endian at the tail; folding a
//! received frame *including* that trailer yields zero exactly when the
//! frame is intact, which is how the codec validates integrity.
//!
//! The table is evaluated at compile time and shared read-only by every
//! caller.

/// Fixed generator polynomial.
pub const POLYNOMIAL: u16 = 0xA2EB;

/// Initialization value used by the frame codec.
pub const INIT: u16 = 0xFFFF;

const fn reverse_bits16(mut x: u16) -> u16 {
    x = (x >> 8) | (x << 8);
    x = ((x & 0xF0F0) >> 4) | ((x & 0x0F0F) << 4);
    x = ((x & 0xCCCC) >> 2) | ((x & 0x3333) << 2);
    x = ((x & 0xAAAA) >> 1) | ((x & 0x5555) << 1);
    x
}

const fn build_table() -> [u16; 256] {
    let reflected = reverse_bits16(POLYNOMIAL);
    let mut table = [0u16; 256];
    let mut index = 0;
    while index < 256 {
        let mut crc = index as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ reflected
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}

static TABLE: [u16; 256] = build_table();

/// Compute the CRC16 of `data`, starting the register at `init`.
///
/// # Example
///
/// ```
/// let message = [0x02, 0x07, 0x18, 0x01, 0x02];
/// let crc = oceanlink::crc::compute(&message, oceanlink::crc::INIT);
///
/// // Appending the CRC little-endian folds the whole buffer to zero.
/// let mut framed = message.to_vec();
/// framed.extend_from_slice(&crc.to_le_bytes());
/// assert_eq!(oceanlink::crc::compute(&framed, oceanlink::crc::INIT), 0);
/// ```
pub fn compute(data: &[u8], init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[usize::from((crc as u8) ^ byte)];
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_returns_init() {
        assert_eq!(compute(&[], INIT), INIT);
        assert_eq!(compute(&[], 0x1234), 0x1234);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let data = [0x7F, 0x04, 0xAA, 0x55, 0x00, 0xFF];
        assert_eq!(compute(&data, INIT), compute(&data, INIT));
    }

    #[test]
    fn test_compute_is_incremental() {
        // Feeding a buffer in two halves matches feeding it whole.
        let data = [0x01, 0x09, 0x0C, 0x80, 0x02, 0xDE, 0xAD];
        let whole = compute(&data, INIT);
        let first = compute(&data[..3], INIT);
        let split = compute(&data[3..], first);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_trailer_folds_to_zero() {
        for len in 0..=40 {
            let message: Vec<u8> = (0..len as u8).map(|i| i.wrapping_mul(37)).collect();
            let crc = compute(&message, INIT);
            let mut framed = message;
            framed.extend_from_slice(&crc.to_le_bytes());
            assert_eq!(compute(&framed, INIT), 0, "length {len}");
        }
    }

    #[test]
    fn test_single_bit_flip_changes_crc() {
        let data = [0x82, 0x0B, 0x00, 0x18, 0x01, 0x03, 0x10, 0x20, 0x30];
        let reference = compute(&data, INIT);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    compute(&corrupted, INIT),
                    reference,
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }
}
