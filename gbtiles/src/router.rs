//! Turns a request spec into tile responses: parses the spec, resolves each
//! tile's endpoint and hands the tile to the source that handles it.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{Leaf, Stick, Universe};
use crate::payload::{TilePayload, TileResponse};
use crate::source::Sources;

pub(crate) mod endpoint;
pub(crate) mod resolver;
pub(crate) mod spec;

pub use endpoint::*;
pub use resolver::*;
pub use spec::*;

/// An entry of the `endpoints` table. Endpoints missing either field are
/// never chosen.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: Option<String>,
    pub bytecode: Option<String>,
}

/// The endpoint chosen for a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEndpoint {
    pub name: String,
    pub code: String,
    pub spec: EndpointSpec,
    pub bytecode: String,
}

pub struct TileRouter {
    /// wire id -> track name
    tracks: HashMap<String, String>,
    endpoints: BTreeMap<String, EndpointConfig>,
    resolver: Box<dyn EndpointResolver>,
    flags: FlagVocabulary,
}

impl TileRouter {
    pub fn new(
        tracks: HashMap<String, String>,
        endpoints: BTreeMap<String, EndpointConfig>,
        resolver: Box<dyn EndpointResolver>,
        flags: FlagVocabulary,
    ) -> TileRouter {
        TileRouter {
            tracks,
            endpoints,
            resolver,
            flags,
        }
    }

    pub fn track_name(&self, wire: &str) -> Option<&str> {
        self.tracks.get(wire).map(|s| s.as_str())
    }

    pub fn resolve(
        &self,
        track: &str,
        genome_id: &str,
        focus: Option<&Focus>,
        scale: char,
    ) -> Option<ResolvedEndpoint> {
        let name = self.resolver.resolve(track, genome_id, focus, scale)?;
        let config = self.endpoints.get(name)?;
        let (code, bytecode) = match (&config.endpoint, &config.bytecode) {
            (Some(code), Some(bytecode)) => (code, bytecode),
            _ => return None,
        };
        Some(ResolvedEndpoint {
            name: name.to_string(),
            code: code.clone(),
            spec: self.flags.parse(code),
            bytecode: bytecode.clone(),
        })
    }

    /// Computes every tile of `spec`, in request order. Tiles that can't be
    /// computed get an empty payload.
    pub fn bulk_data(&self, spec: &str, universe: &Universe, sources: &Sources) -> Vec<TileResponse> {
        parse_spec(spec)
            .iter()
            .map(|request| self.route(request, universe, sources))
            .collect()
    }

    pub fn route(&self, request: &TileRequest, universe: &Universe, sources: &Sources) -> TileResponse {
        let mut response = TileResponse {
            stick: request.stick.clone(),
            pane: request.pane.clone(),
            track: request.track.clone(),
            bytecode: String::new(),
            payload: TilePayload::Empty,
        };
        let Some(track) = self.track_name(&request.track) else {
            warn!("Unknown track {}", request.track);
            return response;
        };
        let Some(stick) = universe.get(&request.stick) else {
            warn!("Unknown stick {}", request.stick);
            return response;
        };
        let leaf = Leaf::new(stick, &request.pane);
        let focus = request.focus.as_ref();
        let Some(endpoint) = self.resolve(track, &stick.genome_id, focus, leaf.scale.letter()) else {
            debug!("No endpoint for {} at {}", track, request.pane);
            return response;
        };

        let start = Instant::now();
        response.payload = dispatch(&endpoint.spec, stick, &leaf, focus, sources);
        debug!(
            "{} {} {} ({}) took {:?}",
            request.stick,
            request.pane,
            track,
            endpoint.code,
            start.elapsed()
        );
        response.bytecode = endpoint.bytecode;
        response
    }
}

fn dispatch(
    spec: &EndpointSpec,
    stick: &Stick,
    leaf: &Leaf,
    focus: Option<&Focus>,
    sources: &Sources,
) -> TilePayload {
    match spec.handler {
        Handler::ContigNormal => {
            sources
                .contig
                .contig_normal(stick, leaf, spec.seq, &sources.seqcache)
        }
        Handler::ContigShimmer => sources.contig.contig_shimmer(stick, leaf),
        Handler::Variant => match spec.kind {
            Some(kind) => sources.variant.variant(stick, leaf, &kind.flag()),
            None => TilePayload::Empty,
        },
        Handler::Transcript => {
            sources
                .gene
                .transcript(stick, leaf, spec, focus, &sources.seqcache)
        }
        Handler::Gene => {
            if spec.names || spec.kind == Some(FeatureType::Featured) {
                sources.gene.gene(stick, leaf, spec, focus)
            } else {
                sources.gene.gene_shimmer(stick, leaf, spec, focus)
            }
        }
        Handler::Gc => sources.gc.gc(stick, leaf),
        Handler::Nothing => TilePayload::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use bigtools::BedEntry;

    use crate::model::Species;
    use crate::seqcache::{NoFetch, SequenceCache};
    use crate::source::MemoryStore;

    fn router() -> TileRouter {
        let choice = toml::from_str(
            r#"
            [contig._default]
            AM = "contig-shimmer"
            NZ = "contig-normal"
            [broken._default]
            AZ = "half-configured"
            "#,
        )
        .unwrap();
        let endpoints = toml::from_str(
            r#"
            [contig-shimmer]
            endpoint = "contigshimmer"
            bytecode = "contig-bc"
            [contig-normal]
            endpoint = "contignormal-seq"
            bytecode = "contig-bc"
            [half-configured]
            endpoint = "gc"
            "#,
        )
        .unwrap();
        let tracks = [("ct", "contig"), ("br", "broken")]
            .iter()
            .map(|(w, n)| (w.to_string(), n.to_string()))
            .collect();
        TileRouter::new(
            tracks,
            endpoints,
            resolver_for_version(2, choice),
            FlagVocabulary::default(),
        )
    }

    fn fixtures() -> (Universe, Sources) {
        let species = Species::new("homo_sapiens", "GRCh38");
        let stick = Stick::new(&species, "chr1", 1_000_000, None);
        let data_path = PathBuf::from("/data");
        let mut store = MemoryStore::new();
        store.add_entries(
            stick.file_path(&data_path, "contigs", "contigs.bb"),
            "chr1",
            vec![BedEntry {
                start: 0,
                end: 500_000,
                rest: "c1\t0\t+".to_string(),
            }],
        );
        let mut universe = Universe::new();
        universe.add_stick(stick);
        universe.add_species(species);
        let sources = Sources::new(
            Arc::new(store),
            data_path,
            "contigs.bb",
            "transcripts.bb",
            SequenceCache::new(Box::new(NoFetch)),
        );
        (universe, sources)
    }

    #[test]
    fn test_resolve() {
        let router = router();
        let resolved = router.resolve("contig", "GRCh38", None, 'B').unwrap();
        assert_eq!(resolved.spec.handler, Handler::ContigShimmer);
        assert_eq!(resolved.bytecode, "contig-bc");
        let resolved = router.resolve("contig", "GRCh38", None, 'T').unwrap();
        assert_eq!(resolved.spec.handler, Handler::ContigNormal);
        assert!(resolved.spec.seq);
        assert_eq!(router.resolve("broken", "GRCh38", None, 'N'), None);
        assert_eq!(router.track_name("ct"), Some("contig"));
    }

    #[test]
    fn test_bulk_data_order_and_isolation() {
        let router = router();
        let (universe, sources) = fixtures();
        let out = router.bulk_data("GRCh38:1:ct,zz=N0M0;br=N0", &universe, &sources);
        let keys: Vec<(&str, &str)> = out.iter().map(|r| (r.track.as_str(), r.pane.as_str())).collect();
        assert_eq!(keys, vec![("ct", "N0"), ("ct", "M0"), ("zz", "N0"), ("zz", "M0"), ("br", "N0")]);

        assert!(matches!(out[0].payload, TilePayload::Contig(_)));
        assert_eq!(out[0].bytecode, "contig-bc");
        assert!(matches!(out[1].payload, TilePayload::Shimmer(_)));
        // Unknown track and half-configured endpoint give empty payloads.
        assert_eq!(out[2].payload, TilePayload::Empty);
        assert_eq!(out[4].payload, TilePayload::Empty);
        assert_eq!(out[4].bytecode, "");
    }

    #[test]
    fn test_unknown_stick() {
        let router = router();
        let (universe, sources) = fixtures();
        let out = router.bulk_data("GRCh38:99:ct=N0", &universe, &sources);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, TilePayload::Empty);
    }
}
