//! Tile payloads and their wire form.
//!
//! Every payload goes out as a flat array of arrays. Arrays of strings are
//! wrapped as `{"string": [...]}` so that clients can tell them apart from
//! numeric arrays without looking inside.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::shimmer::Shimmer;
use crate::source::transcript::BlockArrays;

/// An array of strings, serialized as `{"string": [...]}`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StringArray<'a>(pub &'a [String]);

impl Serialize for StringArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("string", &self.0)?;
        map.end()
    }
}

/// Sequence text for some ranges, with the start of each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequenceData {
    pub texts: Vec<String>,
    pub starts: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContigData {
    pub sequence: Option<SequenceData>,
    pub starts: Vec<u64>,
    pub lens: Vec<u64>,
    pub senses: Vec<bool>,
}

/// Text columns of gene and transcript payloads, only filled in when the
/// endpoint asks for names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneNames {
    pub names: Vec<String>,
    pub biotypes: Vec<String>,
    pub ids: Vec<String>,
    pub display_ids: Vec<String>,
}

impl GeneNames {
    fn serialize_into<S: SerializeSeq>(&self, seq: &mut S) -> Result<(), S::Error> {
        seq.serialize_element(&StringArray(&self.names))?;
        seq.serialize_element(&StringArray(&self.biotypes))?;
        seq.serialize_element(&StringArray(&self.ids))?;
        seq.serialize_element(&StringArray(&self.display_ids))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneData {
    pub starts: Vec<u64>,
    pub lens: Vec<u64>,
    /// 0 unknown, 1 reverse, 2 forward
    pub strands: Vec<u8>,
    /// 0 other, 1 protein coding, 2 featured
    pub colour: u8,
    pub names: GeneNames,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranscriptData {
    pub starts: Vec<u64>,
    pub lens: Vec<u64>,
    pub strands: Vec<u8>,
    pub colour: u8,
    pub blocks: BlockArrays,
    pub names: GeneNames,
    pub transcript_ids: Vec<String>,
    pub sequence: Option<SequenceData>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariantData {
    pub starts: Vec<u64>,
    pub lens: Vec<u64>,
    pub categories: Vec<u8>,
}

/// Quantised GC percentage over `[start, end)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GcData {
    pub start: i64,
    pub end: i64,
    pub values: Vec<i64>,
    /// Vertical offset of the graph, as a fraction of the track
    pub offset: f64,
    /// Height of one quantisation step, as a fraction of the track
    pub step: f64,
}

/// The result of one tile.
#[derive(Clone, Debug, PartialEq)]
pub enum TilePayload {
    Empty,
    Contig(ContigData),
    Shimmer(Shimmer),
    Gene(GeneData),
    Transcript(TranscriptData),
    Variant(VariantData),
    Gc(GcData),
}

fn serialize_sequence<S: SerializeSeq>(seq: &mut S, data: &SequenceData) -> Result<(), S::Error> {
    seq.serialize_element(&StringArray(&data.texts))?;
    seq.serialize_element(&data.starts)
}

impl Serialize for TilePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        match self {
            TilePayload::Empty => {}
            TilePayload::Contig(data) => {
                if let Some(sequence) = &data.sequence {
                    serialize_sequence(&mut seq, sequence)?;
                }
                seq.serialize_element(&data.starts)?;
                seq.serialize_element(&data.lens)?;
                seq.serialize_element(&data.senses)?;
            }
            TilePayload::Shimmer(data) => {
                seq.serialize_element(&data.starts)?;
                seq.serialize_element(&data.lens)?;
                seq.serialize_element(&data.senses)?;
            }
            TilePayload::Gene(data) => {
                seq.serialize_element(&data.starts)?;
                seq.serialize_element(&data.lens)?;
                seq.serialize_element(&data.strands)?;
                seq.serialize_element(&[data.colour])?;
                data.names.serialize_into(&mut seq)?;
            }
            TilePayload::Transcript(data) => {
                seq.serialize_element(&data.starts)?;
                seq.serialize_element(&data.lens)?;
                seq.serialize_element(&data.blocks.nump)?;
                seq.serialize_element(&data.blocks.pattern)?;
                seq.serialize_element(&data.blocks.utrs)?;
                seq.serialize_element(&data.blocks.exons)?;
                seq.serialize_element(&data.blocks.introns)?;
                seq.serialize_element(&data.strands)?;
                seq.serialize_element(&[data.colour])?;
                data.names.serialize_into(&mut seq)?;
                seq.serialize_element(&StringArray(&data.transcript_ids))?;
                if let Some(sequence) = &data.sequence {
                    serialize_sequence(&mut seq, sequence)?;
                }
            }
            TilePayload::Variant(data) => {
                seq.serialize_element(&data.starts)?;
                seq.serialize_element(&data.lens)?;
                seq.serialize_element(&data.categories)?;
            }
            TilePayload::Gc(data) => {
                seq.serialize_element(&[data.start, data.end])?;
                seq.serialize_element(&data.values)?;
                seq.serialize_element(&[data.offset])?;
                seq.serialize_element(&[data.step])?;
            }
        }
        seq.end()
    }
}

/// One entry of a tile response: `[stick, pane, track, bytecode, payload]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TileResponse {
    pub stick: String,
    pub pane: String,
    pub track: String,
    pub bytecode: String,
    pub payload: TilePayload,
}

impl Serialize for TileResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.stick)?;
        seq.serialize_element(&self.pane)?;
        seq.serialize_element(&self.track)?;
        seq.serialize_element(&self.bytecode)?;
        seq.serialize_element(&self.payload)?;
        seq.end()
    }
}
