use crate::error::IndexError;
use serde::{Deserialize, Serialize};

/// Packed cell identity: `row << 32 | column`
pub type CellKey = u64;

/// A trigram is a 3-byte sequence stored as u32 (only lower 24 bits used)
pub type Trigram = u32;

/// Row/column address of one cell. Both indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: usize,
    pub column: usize,
}

impl Coordinate {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Pack into an index key. Fails when either index exceeds 32 bits.
    pub fn pack(self) -> Result<CellKey, IndexError> {
        let overflow = || IndexError::CoordinateOverflow {
            row: self.row,
            column: self.column,
        };
        let row = u32::try_from(self.row).map_err(|_| overflow())?;
        let column = u32::try_from(self.column).map_err(|_| overflow())?;
        Ok(((row as u64) << 32) | column as u64)
    }

    pub fn unpack(key: CellKey) -> Self {
        Self {
            row: (key >> 32) as usize,
            column: (key & 0xFFFF_FFFF) as usize,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Configuration for the background index builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Rows added between flushes
    pub flush_interval: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            flush_interval: 1000,
        }
    }
}

/// Summary of a compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactStats {
    /// Sealed segments merged into the result
    pub segments_merged: usize,
    /// Distinct cells kept
    pub cells: usize,
    /// Distinct trigrams in the rebuilt postings
    pub trigrams: usize,
    /// Superseded texts dropped while merging
    pub superseded: usize,
}

/// Convert 3 bytes to a trigram
#[inline]
pub fn bytes_to_trigram(b0: u8, b1: u8, b2: u8) -> Trigram {
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let coord = Coordinate::new(70_000, 12);
        let key = coord.pack().unwrap();
        assert_eq!(key, (70_000u64 << 32) | 12);
        assert_eq!(Coordinate::unpack(key), coord);
    }

    #[test]
    fn test_pack_orders_like_coordinates() {
        let a = Coordinate::new(1, 9).pack().unwrap();
        let b = Coordinate::new(2, 0).pack().unwrap();
        assert!(a < b);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_pack_overflow() {
        let coord = Coordinate::new(u32::MAX as usize + 1, 0);
        assert!(matches!(
            coord.pack(),
            Err(IndexError::CoordinateOverflow { .. })
        ));
    }

    #[test]
    fn test_bytes_to_trigram() {
        assert_eq!(bytes_to_trigram(b'a', b'b', b'c'), 0x616263);
    }
}
