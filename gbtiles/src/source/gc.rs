use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::model::{Leaf, Stick};
use crate::payload::{GcData, TilePayload};
use crate::source::store::FeatureStore;

pub const GC_SECTION: &str = "gc";
pub const GC_FILE: &str = "gc.bw";

/// Number of bins a leaf is averaged into.
pub const GC_BINS: usize = 500;

/// Number of quantisation steps of a GC percentage.
pub const POINTS: f64 = 40.0;

/// GC percentage from the `gc` bigWig of a genome.
pub struct GcSource {
    store: Arc<dyn FeatureStore>,
    data_path: PathBuf,
}

impl GcSource {
    pub fn new(store: Arc<dyn FeatureStore>, data_path: PathBuf) -> GcSource {
        GcSource { store, data_path }
    }

    /// `gc/<genome_id>/gc.bw`, or else a file named after the sequence hash
    /// of the stick.
    pub fn path(&self, stick: &Stick) -> Option<PathBuf> {
        let genome_path = stick.file_path(&self.data_path, GC_SECTION, GC_FILE);
        if self.store.exists(&genome_path) {
            return Some(genome_path);
        }
        let hash = stick.seq_hash.as_deref()?;
        let stick_path = stick.file_path(&self.data_path, GC_SECTION, &format!("{}.bw", hash));
        self.store.exists(&stick_path).then_some(stick_path)
    }

    pub fn gc(&self, stick: &Stick, leaf: &Leaf) -> TilePayload {
        let values = match self.path(stick) {
            Some(path) => self.store.values(
                &path,
                &stick.name,
                leaf.query_start(),
                leaf.query_end(),
                GC_BINS,
            ),
            None => {
                warn!("No GC file for {}", stick.stick_name);
                vec![]
            }
        };
        TilePayload::Gc(GcData {
            start: leaf.start,
            end: leaf.end,
            values: values.iter().map(|v| quantise(*v)).collect(),
            offset: 0.5,
            step: 1.0 / POINTS,
        })
    }
}

/// `trunc(percent * POINTS / 100)`
pub fn quantise(percent: f64) -> i64 {
    (percent * POINTS / 100.0) as i64
}
