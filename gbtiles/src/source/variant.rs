use std::path::PathBuf;
use std::sync::Arc;

use crate::model::{Leaf, Stick};
use crate::payload::{TilePayload, VariantData};
use crate::source::store::FeatureStore;

pub const VARIANTS_SECTION: &str = "variants";

/// Severity category of a consequence term, from 0 (unknown) to 5 (most
/// severe).
pub fn variant_category(consequence: &str) -> u8 {
    match consequence {
        "frameshift_variant"
        | "splice_acceptor_variant"
        | "splice_donor_variant"
        | "start_lost"
        | "stop_gained"
        | "stop_lost"
        | "transcript_ablation"
        | "transcript_amplification" => 5,
        "inframe_deletion"
        | "inframe_insertion"
        | "missense_variant"
        | "protein_altering_variant"
        | "regulatory_region_ablation"
        | "transcript_fusion" => 4,
        "coding_sequence_variant"
        | "incomplete_terminal_codon_variant"
        | "mature_miRNA_variant"
        | "splice_region_variant"
        | "start_retained_variant"
        | "stop_retained_variant"
        | "synonymous_variant" => 3,
        "3_prime_UTR_variant"
        | "5_prime_UTR_variant"
        | "downstream_gene_variant"
        | "intron_variant"
        | "NMD_transcript_variant"
        | "non_coding_transcript_exon_variant"
        | "non_coding_transcript_variant"
        | "transcript_translocation"
        | "upstream_gene_variant" => 2,
        "feature_elongation"
        | "feature_truncation"
        | "intergenic_variant"
        | "regulatory_region_amplification"
        | "regulatory_region_fusion"
        | "regulatory_region_translocation"
        | "regulatory_region_variant"
        | "TFBS_ablation"
        | "TFBS_amplification"
        | "TFBS_fusion"
        | "TFBS_translocation"
        | "TF_binding_site_variant" => 1,
        _ => 0,
    }
}

/// Variants from per-chromosome, per-scale bigBeds:
/// `variants/<genome_id>/<genome_id>$<chrom>.<scale>.bb`.
pub struct VariantSource {
    store: Arc<dyn FeatureStore>,
    data_path: PathBuf,
}

impl VariantSource {
    pub fn new(store: Arc<dyn FeatureStore>, data_path: PathBuf) -> VariantSource {
        VariantSource { store, data_path }
    }

    pub fn path(&self, stick: &Stick, scale: &str) -> PathBuf {
        let filename = format!("{}${}.{}.bb", stick.genome_id, stick.name, scale);
        stick.file_path(&self.data_path, VARIANTS_SECTION, &filename)
    }

    /// Variants on `leaf`. Variants sharing a start are merged, keeping the
    /// most severe category. Not every scale has a file; a missing one gives
    /// no variants.
    pub fn variant(&self, stick: &Stick, leaf: &Leaf, scale: &str) -> TilePayload {
        let mut out = VariantData::default();
        let path = self.path(stick, scale);
        let entries = self
            .store
            .entries(&path, &stick.name, leaf.query_start(), leaf.query_end());
        for entry in entries {
            let consequence = entry.rest.split('\t').next().unwrap_or("");
            let category = variant_category(consequence);
            let start = entry.start as u64;
            if out.starts.last() == Some(&start) {
                if let Some(last) = out.categories.last_mut() {
                    *last = (*last).max(category);
                }
                continue;
            }
            out.starts.push(start);
            out.lens.push(entry.end.saturating_sub(entry.start) as u64);
            out.categories.push(category);
        }
        TilePayload::Variant(out)
    }
}
