//! Down-sampling of dense interval data for zoomed-out views.
//!
//! The range is cut into [`STEPS`] equal buckets. A bucket touched by a single
//! feature is drawn in that feature's sense; a bucket touched by several is
//! drawn as two half-width blocks of opposite sense, so that mixed regions
//! "shimmer". Runs of equal sense are then merged so that the output size
//! follows what is visually distinct, not the bucket count.

/// Number of buckets a range is divided into.
pub const STEPS: usize = 1000;

/// Compressed blocks, as parallel arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shimmer {
    pub starts: Vec<f64>,
    pub lens: Vec<f64>,
    pub senses: Vec<bool>,
}

impl Shimmer {
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Compresses features (`starts`, `lens`, `senses` are parallel) over
/// `[range_start, range_end)` into at most `2 * STEPS` blocks.
pub fn shimmer(
    starts: &[u64],
    lens: &[u64],
    senses: &[bool],
    range_start: i64,
    range_end: i64,
) -> Shimmer {
    shimmer_with_steps(starts, lens, senses, range_start, range_end, STEPS)
}

pub(crate) fn shimmer_with_steps(
    starts: &[u64],
    lens: &[u64],
    senses: &[bool],
    range_start: i64,
    range_end: i64,
    steps: usize,
) -> Shimmer {
    let mut out = Shimmer::default();
    if range_end <= range_start || starts.is_empty() || steps == 0 {
        return out;
    }
    let range = (range_end - range_start) as f64;
    let step_bp = range / steps as f64;
    let prop = |pos: u64| (pos as f64 - range_start as f64) / range * steps as f64;

    let mut occupancy = vec![0u32; steps];
    let mut last_sense = vec![false; steps];
    for ((start, len), sense) in starts.iter().zip(lens).zip(senses) {
        let first = prop(*start).floor().max(0.0) as usize;
        let last = prop(start + len).ceil().clamp(0.0, steps as f64) as usize;
        for bucket in first..last {
            occupancy[bucket] += 1;
            last_sense[bucket] = *sense;
        }
    }

    // Blocks are kept in half-bucket units until the end so merging compares
    // integers.
    let mut blocks: Vec<(usize, usize, bool)> = vec![];
    let mut push = |block: (usize, usize, bool)| match blocks.last_mut() {
        Some(prev) if prev.2 == block.2 && prev.1 == block.0 => prev.1 = block.1,
        _ => blocks.push(block),
    };
    for (bucket, (count, sense)) in occupancy.iter().zip(last_sense.iter()).enumerate() {
        let half = bucket * 2;
        match count {
            0 => {}
            1 => push((half, half + 2, *sense)),
            _ => {
                push((half, half + 1, !*sense));
                push((half + 1, half + 2, *sense));
            }
        }
    }

    let half_bp = step_bp / 2.0;
    for (from, to, sense) in blocks {
        out.starts.push(range_start as f64 + from as f64 * half_bp);
        out.lens.push((to - from) as f64 * half_bp);
        out.senses.push(sense);
    }
    out
}
