//! Tile sources: each turns the features of one leaf into a payload.

use std::path::PathBuf;
use std::sync::Arc;

use crate::seqcache::SequenceCache;

pub(crate) mod contig;
pub(crate) mod gc;
pub(crate) mod gene;
pub(crate) mod store;
pub(crate) mod transcript;
pub(crate) mod variant;

pub use contig::*;
pub use gc::*;
pub use gene::*;
pub use store::*;
pub use transcript::*;
pub use variant::*;

/// All sources, sharing one feature store and one sequence cache.
pub struct Sources {
    pub contig: ContigSource,
    pub gene: GeneSource,
    pub variant: VariantSource,
    pub gc: GcSource,
    pub seqcache: SequenceCache,
}

impl Sources {
    pub fn new(
        store: Arc<dyn FeatureStore>,
        data_path: PathBuf,
        contigs_file: &str,
        transcripts_file: &str,
        seqcache: SequenceCache,
    ) -> Sources {
        Sources {
            contig: ContigSource::new(store.clone(), data_path.clone(), contigs_file),
            gene: GeneSource::new(store.clone(), data_path.clone(), transcripts_file),
            variant: VariantSource::new(store.clone(), data_path.clone()),
            gc: GcSource::new(store, data_path),
            seqcache,
        }
    }
}
