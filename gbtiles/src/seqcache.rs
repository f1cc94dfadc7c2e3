//! Block cache for reference sequence.
//!
//! Sequence is fetched in `BLOCK_SIZE` aligned blocks and requests are served
//! by slicing cached blocks. When the cache grows past `MAX_BLOCKS`, a random
//! tenth of it is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
#[cfg(feature = "remote")]
use std::time::Duration;

use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Stick;
use crate::payload::SequenceData;

pub const BLOCK_SIZE: u64 = 10000;
pub const MAX_BLOCKS: usize = 200;

pub const REFGET_ACCEPT: &str = "text/vnd.ga4gh.refget.v1.0.0+plain;charset=us-ascii";

#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "remote")]
    #[error("Request to {0} failed: {1}")]
    Http(String, attohttpc::Error),
    #[error("Request to {0} returned status {1}")]
    Status(String, u16),
    #[error("Sequence fetching is not enabled")]
    Disabled,
}

/// Where sequence comes from.
pub trait SequenceFetch: Send + Sync {
    /// Sequence of `[start, end)` of the sequence with content hash `hash`.
    fn fetch(&self, hash: &str, start: u64, end: u64) -> Result<String, FetchError>;
}

/// Fetches sequence from a refget server. `url` is a template in which
/// `{hash}`, `{start}` and `{end}` are replaced.
#[cfg(feature = "remote")]
#[derive(Clone, Debug)]
pub struct RefgetFetch {
    url: String,
    timeout: Duration,
}

#[cfg(feature = "remote")]
impl RefgetFetch {
    pub fn new(url: &str, timeout: Duration) -> RefgetFetch {
        RefgetFetch {
            url: url.to_string(),
            timeout,
        }
    }

    pub fn url(&self, hash: &str, start: u64, end: u64) -> String {
        self.url
            .replace("{hash}", hash)
            .replace("{start}", &start.to_string())
            .replace("{end}", &end.to_string())
    }
}

#[cfg(feature = "remote")]
impl SequenceFetch for RefgetFetch {
    fn fetch(&self, hash: &str, start: u64, end: u64) -> Result<String, FetchError> {
        let url = self.url(hash, start, end);
        let resp = attohttpc::get(&url)
            .header("Accept", REFGET_ACCEPT)
            .timeout(self.timeout)
            .send()
            .map_err(|e| FetchError::Http(url.clone(), e))?;
        if !resp.is_success() {
            return Err(FetchError::Status(url, resp.status().as_u16()));
        }
        resp.text().map_err(|e| FetchError::Http(url, e))
    }
}

/// Used when sequence fetching is turned off. Every fetch fails.
#[derive(Clone, Debug, Default)]
pub struct NoFetch;

impl SequenceFetch for NoFetch {
    fn fetch(&self, _hash: &str, _start: u64, _end: u64) -> Result<String, FetchError> {
        Err(FetchError::Disabled)
    }
}

type BlockKey = (String, u64, u64);

/// `(floor(start / BLOCK_SIZE) * BLOCK_SIZE, ceil(end / BLOCK_SIZE) * BLOCK_SIZE)`
pub fn expand(start: u64, end: u64) -> (u64, u64) {
    (
        (start / BLOCK_SIZE) * BLOCK_SIZE,
        end.div_ceil(BLOCK_SIZE) * BLOCK_SIZE,
    )
}

pub struct SequenceCache {
    fetcher: Box<dyn SequenceFetch>,
    blocks: Mutex<HashMap<BlockKey, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SequenceCache {
    pub fn new(fetcher: Box<dyn SequenceFetch>) -> SequenceCache {
        SequenceCache {
            fetcher,
            blocks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<BlockKey, String>> {
        // A panic while holding the lock can't leave the map inconsistent.
        self.blocks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sequence for each of `ranges` on `stick`, with the (clamped) start of
    /// each. Sticks without a sequence hash give nothing; ranges which are
    /// empty once their start is clamped to 1 are skipped.
    pub fn get(&self, stick: &Stick, ranges: &[(i64, i64)]) -> SequenceData {
        let mut out = SequenceData::default();
        let Some(hash) = stick.seq_hash.as_deref() else {
            return out;
        };
        for &(start, end) in ranges {
            let start = start.max(1);
            if end <= start {
                continue;
            }
            let (start, end) = (start as u64, end as u64);
            out.texts.push(self.get_one(hash, start, end));
            out.starts.push(start);
        }
        out
    }

    fn get_one(&self, hash: &str, start: u64, end: u64) -> String {
        let (block_start, block_end) = expand(start, end);
        let key = (hash.to_string(), block_start, block_end);

        let cached = self.lock().get(&key).cloned();
        let block = match cached {
            Some(block) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                block
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                match self.fetcher.fetch(hash, block_start, block_end) {
                    Ok(block) => {
                        let mut blocks = self.lock();
                        blocks.insert(key.clone(), block.clone());
                        if blocks.len() > MAX_BLOCKS {
                            decimate(&mut blocks, &key);
                        }
                        block
                    }
                    Err(e) => {
                        warn!("Could not fetch sequence: {}", e);
                        String::new()
                    }
                }
            }
        };
        let (hits, misses) = (self.hits(), self.misses());
        debug!(
            "Sequence cache hit rate {:.1}%",
            (hits * 100) as f64 / (hits + misses) as f64
        );

        let from = ((start - block_start) as usize).min(block.len());
        let to = ((end - block_start) as usize).min(block.len());
        block.get(from..to).unwrap_or("").to_string()
    }
}

/// Drops `MAX_BLOCKS / 10` random blocks, never `keep`.
fn decimate(blocks: &mut HashMap<BlockKey, String>, keep: &BlockKey) {
    let mut keys: Vec<BlockKey> = blocks.keys().filter(|k| *k != keep).cloned().collect();
    keys.shuffle(&mut rand::thread_rng());
    for key in keys.into_iter().take(MAX_BLOCKS / 10) {
        blocks.remove(&key);
    }
    debug!("Sequence cache decimated to {} blocks", blocks.len());
}
