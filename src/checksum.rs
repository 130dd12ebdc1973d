// src/checksum.rs
//! Детерминированный отпечаток `MapData`
//!
//! Байтовый поток строится строго в порядке идентификаторов:
//! 1. клетки: `(id, height, biome, state, land)`;
//! 2. реки: `(id, длина, клетки, расход)`;
//! 3. государства: `(id, столица, культура, размер, клетки)`.
//!
//! Все числа — little-endian, `f32` пишется битами, отсутствующее государство — `u32::MAX`.
//! Поток хешируется 64-битным FNV-1a.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::map::MapData;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-битный FNV-1a
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Fnv1a {
    pub(crate) fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub(crate) fn write_f32(&mut self, v: f32) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = Fnv1a::default();
    h.write(bytes);
    h.finish()
}

/// Отпечаток карты; выводится как 16 шестнадцатеричных цифр
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(pub u64);

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[must_use]
pub fn fingerprint(map: &MapData) -> Checksum {
    let mut h = Fnv1a::default();

    for cell in &map.cells {
        h.write_u32(cell.id);
        h.write_f32(cell.height);
        h.write(&[cell.biome.id()]);
        h.write_u32(cell.state.unwrap_or(u32::MAX));
        h.write(&[u8::from(cell.is_land())]);
    }

    for river in &map.rivers {
        h.write_u32(river.id);
        h.write_u32(river.cells.len() as u32);
        for &c in &river.cells {
            h.write_u32(c);
        }
        h.write_f32(river.discharge);
    }

    for state in &map.states {
        h.write_u32(state.id);
        h.write_u32(state.capital);
        h.write_u32(state.culture);
        h.write_u32(state.cells.len() as u32);
        for &c in &state.cells {
            h.write_u32(c);
        }
    }

    Checksum(h.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_checksum_display_is_zero_padded() {
        assert_eq!(Checksum(0xab).to_string(), "00000000000000ab");
    }
}
