/*!
gbtiles serves the data behind genome browser tiles from bigBed and bigWig files.

A client asks for many tiles at once with a request spec such as
`gene:ENSG00000139618~GRCh38:13:gene,contig=N4N5`. Each tile names a track, a
stick (a chromosome of a genome) and a pane: a scale letter and a tile index.

## Serving a tile

The scale letter sets the resolution ([`scale_to_bp_per_pixel`]) and with the
tile index gives the base pair range of the tile ([`tile_to_range`]), which is
then clamped to the stick to make a [`Leaf`]. The [`TileRouter`] looks up the
endpoint configured for the track at that scale (see [`EndpointResolver`]),
decodes its code into an [`EndpointSpec`] and hands the leaf to one of the
[`Sources`]:

- contigs, either as is or compressed with [`shimmer`] when zoomed out
- genes and transcripts, with exon structure from [`decode`]
- variants, by consequence severity
- GC percentage, averaged over bins

Sources read features through a [`FeatureStore`]. [`BigToolsStore`] reads
files from disk with `bigtools`; [`MemoryStore`] holds features in memory.
Sequence comes from a [`SequenceCache`] in front of a [`SequenceFetch`].

Each tile becomes a [`TileResponse`], serialized as
`[stick, pane, track, bytecode, payload]`.

## Setting up

[`AppContext::load`] reads a [`BrowserConfig`] and the genomes of its data
directory (see [`Universe::load`]) and builds everything else. With the `cli`
feature, the `gbtiles` binary serves tiles over HTTP and answers single
requests from the command line.
*/

pub mod config;
mod model;
pub mod payload;
mod router;
pub mod seqcache;
mod shimmer;
mod source;
pub mod utils;

pub use config::{AppContext, BrowserConfig, ConfigError};
pub use model::*;
pub use payload::{TilePayload, TileResponse};
pub use router::*;
pub use seqcache::{FetchError, NoFetch, SequenceCache, SequenceFetch, BLOCK_SIZE, MAX_BLOCKS};
#[cfg(feature = "remote")]
pub use seqcache::RefgetFetch;
pub use shimmer::*;
pub use source::*;
