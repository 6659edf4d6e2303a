/*!
 * Buffer Size Levels
 * Quantised BSR index to byte count (TS 36.321 table 6.1.3.1-1)
 */

/// Number of BSR indexes
pub const BSR_LEVELS: usize = 64;

/// Upper bound of each buffer size level, in bytes
const BUFFER_SIZE_LEVEL_BSR: [u32; BSR_LEVELS] = [
    0, 10, 12, 14, 17, 19, 22, 26, 31, 36, 42, 49, 57, 67, 78, 91, 107, 125, 146, 171, 200, 234,
    274, 321, 376, 440, 515, 603, 706, 826, 967, 1132, 1326, 1552, 1817, 2127, 2490, 2915, 3413,
    3995, 4677, 5476, 6411, 7505, 8787, 10287, 12043, 14099, 16507, 19325, 22624, 26487, 31009,
    36304, 42502, 49759, 58255, 68201, 79846, 93479, 109439, 128125, 150000, 150000,
];

/// Approximate queued bytes for a BSR index (indexes above 63 saturate)
#[inline]
pub fn bsr_level_to_bytes(level: u8) -> u32 {
    BUFFER_SIZE_LEVEL_BSR[(level as usize).min(BSR_LEVELS - 1)]
}

/// Smallest BSR index whose level covers `bytes`
pub fn bytes_to_bsr_level(bytes: u32) -> u8 {
    BUFFER_SIZE_LEVEL_BSR
        .iter()
        .position(|&level| level >= bytes)
        .unwrap_or(BSR_LEVELS - 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_monotonic() {
        assert!(BUFFER_SIZE_LEVEL_BSR.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_level_lookup() {
        assert_eq!(bsr_level_to_bytes(0), 0);
        assert_eq!(bsr_level_to_bytes(1), 10);
        assert_eq!(bsr_level_to_bytes(63), 150_000);
        assert_eq!(bsr_level_to_bytes(200), 150_000);
    }

    #[test]
    fn test_bytes_to_level_covers_request() {
        for bytes in [0u32, 1, 10, 11, 500, 20_000, 149_999, 1_000_000] {
            let level = bytes_to_bsr_level(bytes);
            assert!(bsr_level_to_bytes(level) >= bytes.min(150_000));
        }
        assert_eq!(bytes_to_bsr_level(11), 2);
    }
}
