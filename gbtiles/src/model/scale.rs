/// Base pairs per pixel at the midpoint scale letter (`N`).
pub const MIDPOINT_BP_PER_PIXEL: f64 = 5000.0;

const MIDPOINT_OFFSET: i32 = 13;

/// A one-letter zoom code. Each letter step is roughly a factor of 10^0.5 in
/// resolution; `A` is the coarsest and letters after `N` zoom in below
/// `MIDPOINT_BP_PER_PIXEL`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScaleCode(pub char);

impl ScaleCode {
    /// Signed distance of this letter from the midpoint letter.
    pub fn offset(&self) -> i32 {
        self.0 as i32 - 'A' as i32 - MIDPOINT_OFFSET
    }

    pub fn letter(&self) -> char {
        self.0
    }

    pub fn bp_per_pixel(&self) -> f64 {
        scale_to_bp_per_pixel(self.0)
    }

    /// The `[start, end)` range in base pairs covered by tile `index` at this scale.
    pub fn tile_range(&self, index: i64) -> Option<(i64, i64)> {
        tile_to_range(self.0, index)
    }
}

/// Converts a scale letter to base pairs per pixel.
///
/// The ladder is `10^floor(|n|/2)`, tripled for odd `|n|`, inverted for
/// letters past the midpoint and finally scaled by 5000. Coarse letters are
/// computed as exact integers, fine letters as `(1.0 / magnitude) * 5000.0`,
/// so that tile boundaries agree exactly with the client.
pub fn scale_to_bp_per_pixel(code: char) -> f64 {
    let n = ScaleCode(code).offset();
    let distance = n.unsigned_abs();
    let mut magnitude: u64 = 10u64.saturating_pow(distance / 2);
    if distance % 2 == 1 {
        magnitude = magnitude.saturating_mul(3);
    }
    if n > 0 {
        (1.0 / magnitude as f64) * MIDPOINT_BP_PER_PIXEL
    } else {
        magnitude.saturating_mul(MIDPOINT_BP_PER_PIXEL as u64) as f64
    }
}

/// Returns `(floor(i * bp), ceil((i + 1) * bp))` for tile index `i`, or
/// `None` for the last representable index.
pub fn tile_to_range(code: char, index: i64) -> Option<(i64, i64)> {
    let next = index.checked_add(1)?;
    let bp_px = scale_to_bp_per_pixel(code);
    let start = (index as f64 * bp_px).floor() as i64;
    let end = (next as f64 * bp_px).ceil() as i64;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_and_neighbours() {
        assert_eq!(scale_to_bp_per_pixel('N'), 5000.0);
        assert_eq!(scale_to_bp_per_pixel('M'), 15000.0);
        assert_eq!(scale_to_bp_per_pixel('L'), 50000.0);
        assert_eq!(scale_to_bp_per_pixel('K'), 150000.0);
        assert_eq!(scale_to_bp_per_pixel('O'), (1.0 / 3.0) * 5000.0);
        assert_eq!(scale_to_bp_per_pixel('P'), (1.0 / 10.0) * 5000.0);
        assert_eq!(scale_to_bp_per_pixel('A'), 15_000_000_000.0);
    }

    #[test]
    fn test_ladder_strictly_decreasing() {
        let letters: Vec<char> = ('A'..='Z').collect();
        for pair in letters.windows(2) {
            let coarse = scale_to_bp_per_pixel(pair[0]);
            let fine = scale_to_bp_per_pixel(pair[1]);
            assert!(
                coarse > fine,
                "{} ({}) should be coarser than {} ({})",
                pair[0],
                coarse,
                pair[1],
                fine
            );
        }
    }

    #[test]
    fn test_tile_range() {
        assert_eq!(tile_to_range('N', 0), Some((0, 5000)));
        assert_eq!(tile_to_range('N', 3), Some((15000, 20000)));
        // 1666.66.. bp per pixel: floor on the left, ceil on the right
        assert_eq!(tile_to_range('O', 1), Some((1666, 3334)));
        assert_eq!(tile_to_range('N', -1), Some((-5000, 0)));
    }

    #[test]
    fn test_tile_range_last_index() {
        assert_eq!(tile_to_range('N', i64::MAX), None);
        assert!(tile_to_range('N', i64::MAX - 1).is_some());
        assert!(tile_to_range('A', i64::MIN).is_some());
    }

    #[test]
    fn test_tile_range_deterministic() {
        for code in ['B', 'J', 'N', 'R', 'X'] {
            for index in [0, 1, 17, 12345] {
                assert_eq!(tile_to_range(code, index), tile_to_range(code, index));
            }
        }
    }

    #[test]
    fn test_adjacent_tiles_touch() {
        for code in ['C', 'N', 'Q', 'T'] {
            let scale = ScaleCode(code);
            for index in 0..50 {
                let (_, end) = scale.tile_range(index).unwrap();
                let (next_start, _) = scale.tile_range(index + 1).unwrap();
                assert!(next_start <= end);
                assert!(end - next_start <= 1);
            }
        }
    }
}
