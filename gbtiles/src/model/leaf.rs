use crate::model::scale::{tile_to_range, ScaleCode};
use crate::model::universe::Stick;

/// The range used when a pane's tile index can't be parsed.
pub const FALLBACK_RANGE: (i64, i64) = (1, 2);

/// A single resolved tile: a stick, its resolution and the base-pair range
/// it covers, already clamped to the stick.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub stick: String,
    pub chrom: String,
    pub scale: ScaleCode,
    pub bp_per_pixel: f64,
    pub start: i64,
    pub end: i64,
}

impl Leaf {
    /// Builds the leaf for `pane` (a scale letter followed by a tile index,
    /// eg. `N123`) on `stick`.
    pub fn new(stick: &Stick, pane: &str) -> Leaf {
        let mut chars = pane.chars();
        let code = chars.next().unwrap_or('N');
        let scale = ScaleCode(code);
        let (start, end) = chars
            .as_str()
            .parse::<i64>()
            .ok()
            .and_then(|index| tile_to_range(code, index))
            .unwrap_or(FALLBACK_RANGE);
        let (start, end) = clamp(stick.size as i64, start, end);
        Leaf {
            stick: stick.stick_name.clone(),
            chrom: stick.name.clone(),
            scale,
            bp_per_pixel: scale.bp_per_pixel(),
            start,
            end,
        }
    }

    /// Start as an unsigned file coordinate.
    pub fn query_start(&self) -> u64 {
        self.start.max(0) as u64
    }

    /// End as an unsigned file coordinate.
    pub fn query_end(&self) -> u64 {
        self.end.max(0) as u64
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Clamps `[start, end)` to a stick of `length` base pairs.
///
/// The three adjustments are applied independently, in order. For sticks of
/// length zero the end is left at -1.
pub fn clamp(length: i64, start: i64, end: i64) -> (i64, i64) {
    let (mut start, mut end) = (start, end);
    if end >= length {
        end = length - 1;
    }
    if start >= length {
        start = length - 2;
    }
    if start < 0 {
        start = 0;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stick(size: u64) -> Stick {
        Stick {
            stick_name: "homo_sapiens:1".to_string(),
            name: "1".to_string(),
            genome_id: "homo_sapiens".to_string(),
            size,
            seq_hash: None,
            aliases: vec![],
        }
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1000, -5, 999), (0, 999));
        assert_eq!(clamp(1000, -5, 1000), (0, 999));
        assert_eq!(clamp(1000, -5, 5000), (0, 999));
        assert_eq!(clamp(1000, 10, 20), (10, 20));
        assert_eq!(clamp(1000, 1500, 2000), (998, 999));
        assert_eq!(clamp(1, 5, 10), (0, 0));
        assert_eq!(clamp(0, 5, 10), (0, -1));
    }

    #[test]
    fn test_leaf_from_pane() {
        let leaf = Leaf::new(&stick(1_000_000), "N3");
        assert_eq!(leaf.start, 15000);
        assert_eq!(leaf.end, 20000);
        assert_eq!(leaf.bp_per_pixel, 5000.0);
        assert_eq!(leaf.chrom, "1");
        assert_eq!(leaf.stick, "homo_sapiens:1");
    }

    #[test]
    fn test_leaf_clamped_to_stick() {
        let leaf = Leaf::new(&stick(17000), "N3");
        assert_eq!((leaf.start, leaf.end), (15000, 16999));
        let leaf = Leaf::new(&stick(17000), "N9");
        assert_eq!((leaf.start, leaf.end), (16998, 16999));
    }

    #[test]
    fn test_malformed_pane_falls_back() {
        let leaf = Leaf::new(&stick(1000), "Nxyz");
        assert_eq!((leaf.start, leaf.end), FALLBACK_RANGE);
        let leaf = Leaf::new(&stick(1000), "");
        assert_eq!((leaf.start, leaf.end), FALLBACK_RANGE);
    }

    #[test]
    fn test_out_of_range_pane_falls_back() {
        let leaf = Leaf::new(&stick(1000), "N9223372036854775807");
        assert_eq!((leaf.start, leaf.end), FALLBACK_RANGE);
        // Too large for an i64 at all
        let leaf = Leaf::new(&stick(1000), "N99999999999999999999");
        assert_eq!((leaf.start, leaf.end), FALLBACK_RANGE);
    }
}
