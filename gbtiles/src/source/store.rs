use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bigtools::{BBIReadError, BedEntry, BigBedRead, BigWigRead, Value};
use tracing::warn;

/// Interval-indexed feature files, as used by the tile sources.
///
/// None of these methods fail: a missing file, an unknown chromosome, a
/// range that doesn't fit the file's coordinates or a read error all give an
/// empty result, so that one bad file only empties one track.
pub trait FeatureStore: Send + Sync {
    /// bigBed entries overlapping `[start, end)` on `chrom`.
    fn entries(&self, path: &Path, chrom: &str, start: u64, end: u64) -> Vec<BedEntry>;

    /// Coverage-weighted mean of bigWig values over `bins` equal bins of
    /// `[start, end)`. Positions without data count as zero.
    fn values(&self, path: &Path, chrom: &str, start: u64, end: u64, bins: usize) -> Vec<f64>;

    /// Length of `chrom` as recorded in the file.
    fn chrom_length(&self, path: &Path, chrom: &str) -> Option<u64>;

    fn exists(&self, path: &Path) -> bool;
}

fn coords(start: u64, end: u64) -> Option<(u32, u32)> {
    let start = u32::try_from(start).ok()?;
    let end = u32::try_from(end).ok()?;
    (start < end).then_some((start, end))
}

/// Reads bigBed and bigWig files from disk with `bigtools`. Files are
/// reopened for every query.
#[derive(Clone, Debug, Default)]
pub struct BigToolsStore;

impl BigToolsStore {
    pub fn new() -> BigToolsStore {
        BigToolsStore
    }

    fn path_str(path: &Path) -> Option<&str> {
        if !path.exists() {
            warn!("Missing file {}", path.display());
            return None;
        }
        path.to_str()
    }
}

impl FeatureStore for BigToolsStore {
    fn entries(&self, path: &Path, chrom: &str, start: u64, end: u64) -> Vec<BedEntry> {
        let Some(path_str) = Self::path_str(path) else {
            return vec![];
        };
        let Some((start, end)) = coords(start, end) else {
            return vec![];
        };
        let mut bigbed = match BigBedRead::open_file(path_str) {
            Ok(bigbed) => bigbed,
            Err(e) => {
                warn!("Could not open {}: {}", path.display(), e);
                return vec![];
            }
        };
        let entries: Result<Vec<BedEntry>, BBIReadError> = bigbed
            .get_interval(chrom, start, end)
            .and_then(|iter| iter.collect());
        match entries {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Could not read {}:{}-{} from {}: {}",
                    chrom,
                    start,
                    end,
                    path.display(),
                    e
                );
                vec![]
            }
        }
    }

    fn values(&self, path: &Path, chrom: &str, start: u64, end: u64, bins: usize) -> Vec<f64> {
        let Some(path_str) = Self::path_str(path) else {
            return vec![];
        };
        let Some((start, end)) = coords(start, end) else {
            return vec![];
        };
        let mut bigwig = match BigWigRead::open_file(path_str) {
            Ok(bigwig) => bigwig,
            Err(e) => {
                warn!("Could not open {}: {}", path.display(), e);
                return vec![];
            }
        };
        let values: Result<Vec<Value>, BBIReadError> = bigwig
            .get_interval(chrom, start, end)
            .and_then(|iter| iter.collect());
        match values {
            Ok(values) => mean_bins(start as u64, end as u64, &values, bins),
            Err(e) => {
                warn!(
                    "Could not read {}:{}-{} from {}: {}",
                    chrom,
                    start,
                    end,
                    path.display(),
                    e
                );
                vec![]
            }
        }
    }

    fn chrom_length(&self, path: &Path, chrom: &str) -> Option<u64> {
        let path_str = Self::path_str(path)?;
        let bigbed = BigBedRead::open_file(path_str).ok()?;
        bigbed
            .chroms()
            .iter()
            .find(|c| c.name == chrom)
            .map(|c| c.length as u64)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Averages `values` into `bins` equal bins over `[start, end)`, weighting
/// each value by how much of the bin it covers. The last bin may be shorter.
pub fn mean_bins(start: u64, end: u64, values: &[Value], bins: usize) -> Vec<f64> {
    if bins == 0 || end <= start {
        return vec![];
    }
    let mut v = vec![0.0; bins];
    let bin_size = (end - start) as f64 / bins as f64;
    for value in values {
        let value_start = (value.start as u64).max(start) - start;
        let value_end = (value.end as u64).min(end).saturating_sub(start);
        if value_end <= value_start {
            continue;
        }
        let bin_start = ((value_start as f64) / bin_size) as usize;
        let bin_end = (((value_end as f64) / bin_size).ceil() as usize).min(bins);
        for (bin, total) in v.iter_mut().enumerate().take(bin_end).skip(bin_start) {
            let from = (value_start as f64).max(bin as f64 * bin_size);
            let to = (value_end as f64).min((bin as f64 + 1.0) * bin_size);
            if to > from {
                *total += (to - from) * value.value as f64;
            }
        }
    }
    let last_size = (end - start) as f64 - (bins as f64 - 1.0) * bin_size;
    let last = bins - 1;
    for (bin, total) in v.iter_mut().enumerate() {
        if bin == last {
            *total /= last_size;
        } else {
            *total /= bin_size;
        }
    }
    v
}

/// Features and values held in memory, keyed by file path and chromosome.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<(PathBuf, String), Vec<BedEntry>>,
    values: HashMap<(PathBuf, String), Vec<Value>>,
    lengths: HashMap<(PathBuf, String), u64>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn add_entries(&mut self, path: impl Into<PathBuf>, chrom: &str, entries: Vec<BedEntry>) {
        self.entries
            .entry((path.into(), chrom.to_string()))
            .or_default()
            .extend(entries);
    }

    pub fn add_values(&mut self, path: impl Into<PathBuf>, chrom: &str, values: Vec<Value>) {
        self.values
            .entry((path.into(), chrom.to_string()))
            .or_default()
            .extend(values);
    }

    pub fn set_chrom_length(&mut self, path: impl Into<PathBuf>, chrom: &str, length: u64) {
        self.lengths.insert((path.into(), chrom.to_string()), length);
    }
}

impl FeatureStore for MemoryStore {
    fn entries(&self, path: &Path, chrom: &str, start: u64, end: u64) -> Vec<BedEntry> {
        let Some(entries) = self.entries.get(&(path.to_path_buf(), chrom.to_string())) else {
            return vec![];
        };
        entries
            .iter()
            .filter(|e| (e.start as u64) < end && (e.end as u64) > start)
            .cloned()
            .collect()
    }

    fn values(&self, path: &Path, chrom: &str, start: u64, end: u64, bins: usize) -> Vec<f64> {
        let Some(values) = self.values.get(&(path.to_path_buf(), chrom.to_string())) else {
            return vec![];
        };
        let overlapping: Vec<Value> = values
            .iter()
            .filter(|v| (v.start as u64) < end && (v.end as u64) > start)
            .copied()
            .collect();
        mean_bins(start, end, &overlapping, bins)
    }

    fn chrom_length(&self, path: &Path, chrom: &str) -> Option<u64> {
        self.lengths
            .get(&(path.to_path_buf(), chrom.to_string()))
            .copied()
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.keys().any(|(p, _)| p == path)
            || self.values.keys().any(|(p, _)| p == path)
            || self.lengths.keys().any(|(p, _)| p == path)
    }
}
