use std::path::PathBuf;
use std::sync::Arc;

use crate::model::{Leaf, Stick};
use crate::payload::{ContigData, TilePayload};
use crate::seqcache::SequenceCache;
use crate::shimmer::shimmer;
use crate::source::store::FeatureStore;

pub const CONTIGS_SECTION: &str = "contigs";

/// Leaves shorter than this prime the sequence cache even when their
/// endpoint doesn't ask for sequence.
pub const PRIME_CACHE_BP: i64 = 40000;

/// Assembly contigs from the `contigs` bigBed of a genome.
pub struct ContigSource {
    store: Arc<dyn FeatureStore>,
    data_path: PathBuf,
    filename: String,
}

impl ContigSource {
    pub fn new(store: Arc<dyn FeatureStore>, data_path: PathBuf, filename: &str) -> ContigSource {
        ContigSource {
            store,
            data_path,
            filename: filename.to_string(),
        }
    }

    pub fn path(&self, stick: &Stick) -> PathBuf {
        stick.file_path(&self.data_path, CONTIGS_SECTION, &self.filename)
    }

    /// The length the contigs file records for the stick's chromosome.
    pub fn chrom_length(&self, stick: &Stick) -> Option<u64> {
        self.store.chrom_length(&self.path(stick), &stick.name)
    }

    fn contigs(&self, stick: &Stick, leaf: &Leaf) -> ContigData {
        let mut out = ContigData::default();
        let entries = self
            .store
            .entries(&self.path(stick), &stick.name, leaf.query_start(), leaf.query_end());
        for entry in entries {
            let sense = entry.rest.split('\t').nth(2) == Some("+");
            out.starts.push(entry.start as u64);
            out.lens.push(entry.end.saturating_sub(entry.start) as u64);
            out.senses.push(sense);
        }
        out
    }

    pub fn contig_normal(
        &self,
        stick: &Stick,
        leaf: &Leaf,
        seq: bool,
        seqcache: &SequenceCache,
    ) -> TilePayload {
        let mut out = self.contigs(stick, leaf);
        if seq {
            out.sequence = Some(seqcache.get(stick, &[(leaf.start, leaf.end)]));
        } else if leaf.len() < PRIME_CACHE_BP {
            seqcache.get(stick, &[(leaf.start, leaf.end)]);
        }
        TilePayload::Contig(out)
    }

    pub fn contig_shimmer(&self, stick: &Stick, leaf: &Leaf) -> TilePayload {
        let contigs = self.contigs(stick, leaf);
        TilePayload::Shimmer(shimmer(
            &contigs.starts,
            &contigs.lens,
            &contigs.senses,
            leaf.start,
            leaf.end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use bigtools::BedEntry;

    use crate::model::Species;
    use crate::seqcache::{FetchError, SequenceFetch};
    use crate::source::store::MemoryStore;

    struct CountingFetch(Arc<AtomicU64>);

    impl SequenceFetch for CountingFetch {
        fn fetch(&self, _hash: &str, start: u64, end: u64) -> Result<String, FetchError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok("A".repeat((end - start) as usize))
        }
    }

    fn contig(start: u32, end: u32, strand: &str) -> BedEntry {
        BedEntry {
            start,
            end,
            rest: format!("contig{}\t0\t{}", start, strand),
        }
    }

    fn setup() -> (ContigSource, Stick) {
        let species = Species::new("homo_sapiens", "GRCh38");
        let stick = Stick::new(&species, "1", 1_000_000, Some("hash1".to_string()));
        let source_path = PathBuf::from("/data");
        let mut store = MemoryStore::new();
        store.add_entries(
            stick.file_path(&source_path, CONTIGS_SECTION, "contigs.bb"),
            "1",
            vec![contig(0, 1000, "+"), contig(1000, 3000, "-"), contig(3000, 4000, ".")],
        );
        let source = ContigSource::new(Arc::new(store), source_path, "contigs.bb");
        (source, stick)
    }

    #[test]
    fn test_contig_normal() {
        let (source, stick) = setup();
        let calls = Arc::new(AtomicU64::new(0));
        let seqcache = SequenceCache::new(Box::new(CountingFetch(calls.clone())));
        let leaf = Leaf::new(&stick, "N0");
        match source.contig_normal(&stick, &leaf, false, &seqcache) {
            TilePayload::Contig(data) => {
                assert_eq!(data.starts, vec![0, 1000, 3000]);
                assert_eq!(data.lens, vec![1000, 2000, 1000]);
                assert_eq!(data.senses, vec![true, false, false]);
                assert_eq!(data.sequence, None);
            }
            _ => panic!("Expected contig payload"),
        }
        // Small leaves prime the cache.
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        match source.contig_normal(&stick, &leaf, true, &seqcache) {
            TilePayload::Contig(data) => {
                let sequence = data.sequence.unwrap();
                assert_eq!(sequence.starts, vec![1]);
                assert_eq!(sequence.texts[0].len(), 4999);
            }
            _ => panic!("Expected contig payload"),
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(seqcache.hits(), 1);
    }

    #[test]
    fn test_contig_shimmer() {
        let (source, stick) = setup();
        let leaf = Leaf::new(&stick, "N0");
        match source.contig_shimmer(&stick, &leaf) {
            TilePayload::Shimmer(data) => {
                assert_eq!(data.senses, vec![true, false]);
                assert_eq!(data.starts, vec![0.0, 1000.0]);
                assert_eq!(data.lens, vec![1000.0, 3000.0]);
            }
            _ => panic!("Expected shimmer payload"),
        }
    }
}
