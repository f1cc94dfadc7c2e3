use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use bigtools::BedEntry;
use regex::Regex;
use tracing::debug;

use crate::model::{Leaf, Stick};
use crate::payload::{GeneData, GeneNames, TilePayload, TranscriptData};
use crate::router::{Direction, EndpointSpec, FeatureType, Focus, DEFAULT_FOCUS_KIND};
use crate::seqcache::SequenceCache;
use crate::shimmer::shimmer;
use crate::source::store::FeatureStore;
use crate::source::transcript::{decode, parse_block_list, MIN_WIDTH_PX};

pub const GENES_SECTION: &str = "genes_and_transcripts";

/// Genes shown by `feat` endpoints when there is no focus.
pub const FEATURED: [&str; 2] = ["BRCA2", "TTN"];

pub const PROTEIN_CODING: &str = "protein_coding";

fn version_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.\d+$").expect("valid version pattern"))
}

/// Strips a trailing version (`ENSG00000139618.15` -> `ENSG00000139618`).
pub fn strip_version(id: &str) -> &str {
    match version_suffix().find(id) {
        Some(m) => &id[..m.start()],
        None => id,
    }
}

/// One transcript line of the genes file.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneRecord {
    pub start: u64,
    pub end: u64,
    pub transcript_id: String,
    pub strand: String,
    pub cds_start: u64,
    pub cds_end: u64,
    pub block_sizes: Vec<i64>,
    pub block_starts: Vec<i64>,
    pub gene_id: String,
    pub name: String,
    pub biotype: String,
}

impl GeneRecord {
    /// Parses the extra columns of a bigBed entry. Returns `None` for records
    /// with missing columns or bad numbers.
    pub fn parse(entry: &BedEntry) -> Option<GeneRecord> {
        let parts: Vec<&str> = entry.rest.split('\t').collect();
        if parts.len() < 17 {
            return None;
        }
        let block_sizes = parse_block_list(parts[7])?;
        let block_starts = parse_block_list(parts[8])?;
        if block_sizes.len() != block_starts.len() {
            return None;
        }
        Some(GeneRecord {
            start: entry.start as u64,
            end: entry.end as u64,
            transcript_id: parts[0].to_string(),
            strand: parts[2].to_string(),
            cds_start: parts[3].parse().ok()?,
            cds_end: parts[4].parse().ok()?,
            block_sizes,
            block_starts,
            gene_id: parts[9].to_string(),
            name: parts[15].to_string(),
            biotype: parts[16].to_string(),
        })
    }

    pub fn forward(&self) -> bool {
        self.strand == "+"
    }

    /// 0 unknown, 1 reverse, 2 forward
    pub fn strand_code(&self) -> u8 {
        match self.strand.as_str() {
            "+" => 2,
            "-" => 1,
            _ => 0,
        }
    }

    pub fn protein_coding(&self) -> bool {
        self.biotype == PROTEIN_CODING
    }

    pub fn canonical_gene_id(&self) -> &str {
        strip_version(&self.gene_id)
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Decides which genes an endpoint shows.
#[derive(Clone, Debug)]
pub struct GeneFilter<'a> {
    pub kind: Option<FeatureType>,
    pub direction: Option<Direction>,
    pub focus: Option<&'a Focus>,
}

impl<'a> GeneFilter<'a> {
    pub fn new(spec: &EndpointSpec, focus: Option<&'a Focus>) -> GeneFilter<'a> {
        GeneFilter {
            kind: spec.kind,
            direction: spec.direction,
            focus,
        }
    }

    /// The focused gene if there is a gene focus, otherwise one of
    /// [`FEATURED`].
    pub fn is_featured(&self, record: &GeneRecord) -> bool {
        match self.focus {
            Some(focus) if focus.kind == DEFAULT_FOCUS_KIND => {
                strip_version(&focus.id) == record.canonical_gene_id()
            }
            _ => FEATURED.contains(&record.name.as_str()),
        }
    }

    pub fn featured(&self) -> bool {
        self.kind == Some(FeatureType::Featured)
    }

    pub fn accepts(&self, record: &GeneRecord) -> bool {
        if self.featured() {
            return self.is_featured(record);
        }
        if self.is_featured(record) {
            return false;
        }
        if let Some(direction) = self.direction {
            if record.forward() != (direction == Direction::Forward) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.protein_coding() != (kind == FeatureType::ProteinCoding) {
                return false;
            }
        }
        true
    }

    /// 0 other, 1 protein coding, 2 featured
    pub fn colour(&self) -> u8 {
        match self.kind {
            Some(FeatureType::Featured) => 2,
            Some(FeatureType::ProteinCoding) => 1,
            _ => 0,
        }
    }
}

fn push_names(names: &mut GeneNames, record: &GeneRecord) {
    names.names.push(record.name.clone());
    names.biotypes.push(record.biotype.clone());
    names.ids.push(record.canonical_gene_id().to_string());
    names.display_ids.push(record.gene_id.clone());
}

/// Genes and transcripts from the `genes_and_transcripts` bigBed of a
/// genome.
pub struct GeneSource {
    store: Arc<dyn FeatureStore>,
    data_path: PathBuf,
    filename: String,
}

impl GeneSource {
    pub fn new(store: Arc<dyn FeatureStore>, data_path: PathBuf, filename: &str) -> GeneSource {
        GeneSource {
            store,
            data_path,
            filename: filename.to_string(),
        }
    }

    fn records(&self, stick: &Stick, leaf: &Leaf, filter: &GeneFilter) -> Vec<GeneRecord> {
        let path = stick.file_path(&self.data_path, GENES_SECTION, &self.filename);
        let entries = self
            .store
            .entries(&path, &stick.name, leaf.query_start(), leaf.query_end());
        let total = entries.len();
        let records: Vec<GeneRecord> = entries.iter().filter_map(GeneRecord::parse).collect();
        if records.len() < total {
            debug!(
                "Skipped {} malformed records in {}",
                total - records.len(),
                path.display()
            );
        }
        records.into_iter().filter(|r| filter.accepts(r)).collect()
    }

    /// Gene extents, with names if the endpoint asks for them.
    pub fn gene(
        &self,
        stick: &Stick,
        leaf: &Leaf,
        spec: &EndpointSpec,
        focus: Option<&Focus>,
    ) -> TilePayload {
        let filter = GeneFilter::new(spec, focus);
        let mut out = GeneData {
            colour: filter.colour(),
            ..GeneData::default()
        };
        for record in self.records(stick, leaf, &filter) {
            out.starts.push(record.start);
            out.lens.push(record.len());
            out.strands.push(record.strand_code());
            if spec.names {
                push_names(&mut out.names, &record);
            }
        }
        TilePayload::Gene(out)
    }

    /// Gene extents compressed for zoomed-out views.
    pub fn gene_shimmer(
        &self,
        stick: &Stick,
        leaf: &Leaf,
        spec: &EndpointSpec,
        focus: Option<&Focus>,
    ) -> TilePayload {
        let filter = GeneFilter::new(spec, focus);
        let records = self.records(stick, leaf, &filter);
        let starts: Vec<u64> = records.iter().map(|r| r.start).collect();
        let lens: Vec<u64> = records.iter().map(|r| r.len()).collect();
        let senses: Vec<bool> = records.iter().map(|r| r.forward()).collect();
        TilePayload::Shimmer(shimmer(&starts, &lens, &senses, leaf.start, leaf.end))
    }

    /// Genes with their exon structure, and optionally their sequence.
    pub fn transcript(
        &self,
        stick: &Stick,
        leaf: &Leaf,
        spec: &EndpointSpec,
        focus: Option<&Focus>,
        seqcache: &SequenceCache,
    ) -> TilePayload {
        let filter = GeneFilter::new(spec, focus);
        let min_width = leaf.bp_per_pixel / MIN_WIDTH_PX;
        let mut out = TranscriptData {
            colour: filter.colour(),
            ..TranscriptData::default()
        };
        let mut seq_ranges = vec![];
        for record in self.records(stick, leaf, &filter) {
            let blocks = decode(
                record.start as i64,
                record.end as i64,
                &record.block_starts,
                &record.block_sizes,
                record.cds_start as i64,
                record.cds_end as i64,
                min_width,
            );
            out.blocks.push_transcript(&blocks);
            out.starts.push(record.start);
            out.lens.push(record.len());
            out.strands.push(record.strand_code());
            if spec.names {
                push_names(&mut out.names, &record);
                out.transcript_ids.push(record.transcript_id.clone());
            }
            seq_ranges.push((
                (record.start as i64).max(leaf.start),
                (record.end as i64).min(leaf.end),
            ));
        }
        if spec.seq {
            out.sequence = Some(seqcache.get(stick, &seq_ranges));
        }
        TilePayload::Transcript(out)
    }
}
