// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! 32-bit values over pairs of 16-bit Modbus registers
//!
//! The simulator stores every 32-bit quantity in two consecutive registers,
//! high word first (big-endian word order). Values are signed two's complement.

/// Split a signed 32-bit value into `[high, low]` register words.
///
/// ```
/// use bess_modbus_simulator::utility::word_order::split_i32;
///
/// assert_eq!(split_i32(0x0001_0002), [0x0001, 0x0002]);
/// assert_eq!(split_i32(-1), [0xFFFF, 0xFFFF]);
/// ```
pub fn split_i32(value: i32) -> [u16; 2] {
    let raw = value as u32;
    [((raw >> 16) & 0xFFFF) as u16, (raw & 0xFFFF) as u16]
}

/// Merge `high` and `low` register words into a signed 32-bit value.
///
/// Results above `0x7FFF_FFFF` wrap into the negative range.
pub fn merge_i32(high: u16, low: u16) -> i32 {
    (((high as u32) << 16) | low as u32) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_positive_value() {
        assert_eq!(split_i32(5000), [0, 5000]);
        assert_eq!(split_i32(0x1234_5678), [0x1234, 0x5678]);
    }

    #[test]
    fn test_split_negative_value() {
        // -250 kW setpoint
        assert_eq!(split_i32(-250), [0xFFFF, 0xFF06]);
        assert_eq!(split_i32(i32::MIN), [0x8000, 0x0000]);
    }

    #[test]
    fn test_merge_sign_extension() {
        assert_eq!(merge_i32(0x7FFF, 0xFFFF), i32::MAX);
        assert_eq!(merge_i32(0x8000, 0x0000), i32::MIN);
        assert_eq!(merge_i32(0xFFFF, 0xFF06), -250);
    }

    #[test]
    fn test_round_trip_edges() {
        for value in [0, 1, -1, 5000, -5000, i32::MAX, i32::MIN, 65535, 65536] {
            let [hi, lo] = split_i32(value);
            assert_eq!(merge_i32(hi, lo), value, "round trip failed for {value}");
        }
    }
}
