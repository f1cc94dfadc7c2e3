//! Server configuration and the application context built from it.
//!
//! The configuration is a TOML file:
//!
//! ```toml
//! api_version = 3
//! data_path = "/data"
//!
//! [server]
//! port = 4000
//!
//! [refget]
//! url = "https://www.ebi.ac.uk/ena/cram/sequence/{hash}?start={start}&end={end}"
//!
//! [tracks.gene-pc-fwd]
//! wire = "gene-pc-fwd"
//!
//! [endpoints.gene-pc-fwd-names]
//! endpoint = "gene-pc-fwd-names"
//! bytecode = "gene-names"
//!
//! [choice.gene-pc-fwd._default._default]
//! AM = "gene-pc-fwd-shimmer"
//! NZ = "gene-pc-fwd-names"
//!
//! [api.3.bytecodes]
//! gene-names = "..."
//!
//! [objects."GRCh38:ENSG00000139618"]
//! stick = "GRCh38:13"
//! start = 32315086
//! end = 32400268
//! label = "BRCA2"
//! ```
//!
//! Without an `api` table every API version is served with the top-level
//! `bytecodes`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(feature = "remote")]
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Locale, Locales, Universe, UniverseError};
use crate::payload::TileResponse;
use crate::router::{
    resolver_for_version, ChoiceTree, EndpointConfig, FlagGroup, FlagVocabulary, TileRouter,
};
#[cfg(feature = "remote")]
use crate::seqcache::RefgetFetch;
use crate::seqcache::{NoFetch, SequenceCache, SequenceFetch};
use crate::source::{BigToolsStore, FeatureStore, Sources};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {}: {}", .0.display(), .1)]
    Io(PathBuf, io::Error),
    #[error("Invalid config {}: {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Universe(#[from] UniverseError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Selects how endpoints are chosen: below 3 by genome only, from 3 by
    /// focus kind and genome.
    #[serde(default = "default_api_version")]
    pub api_version: u32,
    pub data_path: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub refget: RefgetConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackConfig>,
    #[serde(default, skip_serializing)]
    pub endpoints: BTreeMap<String, EndpointConfig>,
    #[serde(default)]
    pub bytecodes: BTreeMap<String, String>,
    #[serde(default, skip_serializing)]
    pub choice: BTreeMap<String, ChoiceTree>,
    /// Replaces the default flag vocabulary
    #[serde(default, skip_serializing)]
    pub flags: Option<Vec<FlagGroup>>,
    /// API version -> what clients of that version are sent
    #[serde(default, skip_serializing)]
    pub api: BTreeMap<String, ApiConfig>,
    #[serde(default, skip_serializing)]
    pub objects: BTreeMap<String, ObjectInfo>,
    /// Object ids offered to clients as starting points
    #[serde(default, skip_serializing)]
    pub example_objects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefgetConfig {
    /// URL template with `{hash}`, `{start}` and `{end}`. No sequence is
    /// fetched without one.
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_contigs")]
    pub contigs: String,
    #[serde(default = "default_transcripts")]
    pub transcripts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Id of the track in request specs
    pub wire: Option<String>,
    /// Anything else is passed to clients as is.
    #[serde(flatten)]
    pub settings: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Added to, and overriding, the top-level bytecodes.
    #[serde(default)]
    pub bytecodes: BTreeMap<String, String>,
    pub data_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(flatten)]
    pub info: BTreeMap<String, toml::Value>,
}

fn default_api_version() -> u32 { 3 }
fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 4000 }
fn default_timeout_secs() -> u64 { 10 }
fn default_contigs() -> String { "contigs.bb".to_string() }
fn default_transcripts() -> String { "transcripts.bb".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for RefgetConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            contigs: default_contigs(),
            transcripts: default_transcripts(),
        }
    }
}

impl BrowserConfig {
    /// Loads a config file. A relative `data_path` is taken relative to the
    /// file.
    pub fn load(path: &Path) -> Result<BrowserConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config: BrowserConfig =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        if config.data_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data_path = dir.join(&config.data_path);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.refget.url {
            if !url.contains("{hash}") {
                return Err(ConfigError::Invalid(format!(
                    "refget url {} has no {{hash}}",
                    url
                )));
            }
        }
        if let Some(version) = self.api.keys().find(|v| v.parse::<u32>().is_err()) {
            return Err(ConfigError::Invalid(format!(
                "api version {} is not a number",
                version
            )));
        }
        for (name, endpoint) in &self.endpoints {
            if endpoint.endpoint.is_none() || endpoint.bytecode.is_none() {
                warn!("Endpoint {} is missing its endpoint or bytecode", name);
            } else if let Some(bytecode) = &endpoint.bytecode {
                if !self.bytecodes.is_empty() && !self.bytecodes.contains_key(bytecode) {
                    warn!("Endpoint {} uses unknown bytecode {}", name, bytecode);
                }
            }
        }
        Ok(())
    }

    pub fn supports_version(&self, version: u32) -> bool {
        self.api.is_empty() || self.api.contains_key(&version.to_string())
    }

    /// The bytecodes sent to clients of `version`, or `None` for versions
    /// that aren't configured.
    pub fn bytecodes_for(&self, version: u32) -> Option<BTreeMap<String, String>> {
        if self.api.is_empty() {
            return Some(self.bytecodes.clone());
        }
        let api = self.api.get(&version.to_string())?;
        let mut bytecodes = self.bytecodes.clone();
        bytecodes.extend(api.bytecodes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(bytecodes)
    }

    /// Locales of the objects which give one.
    pub fn locales(&self) -> Locales {
        let mut locales = Locales::new();
        for (id, object) in &self.objects {
            match (&object.stick, object.start, object.end) {
                (Some(stick), Some(start), Some(end)) => locales.add(id, stick, start, end),
                (None, None, None) => {}
                _ => warn!("Object {} has an incomplete locale", id),
            }
        }
        locales
    }

    /// wire id -> track name
    pub fn wire_tracks(&self) -> HashMap<String, String> {
        self.tracks
            .iter()
            .filter_map(|(name, track)| track.wire.as_ref().map(|wire| (wire.clone(), name.clone())))
            .collect()
    }

    pub fn flag_vocabulary(&self) -> FlagVocabulary {
        match &self.flags {
            Some(groups) => FlagVocabulary::new(groups.clone()),
            None => FlagVocabulary::default(),
        }
    }

    pub fn router(&self) -> TileRouter {
        TileRouter::new(
            self.wire_tracks(),
            self.endpoints.clone(),
            resolver_for_version(self.api_version, self.choice.clone()),
            self.flag_vocabulary(),
        )
    }

    pub fn fetcher(&self) -> Box<dyn SequenceFetch> {
        match &self.refget.url {
            #[cfg(feature = "remote")]
            Some(url) => Box::new(RefgetFetch::new(
                url,
                Duration::from_secs(self.refget.timeout_secs),
            )),
            #[cfg(not(feature = "remote"))]
            Some(_) => {
                warn!("Built without the remote feature, sequence will not be fetched");
                Box::new(NoFetch)
            }
            None => Box::new(NoFetch),
        }
    }
}

/// Everything needed to answer requests, built once at start-up.
pub struct AppContext {
    pub config: BrowserConfig,
    pub universe: Universe,
    pub router: TileRouter,
    pub sources: Sources,
    pub locales: Locales,
}

impl AppContext {
    /// Loads the config at `path` and the genomes under its data path, and
    /// reads features from bigBed and bigWig files.
    pub fn load(path: &Path) -> Result<AppContext, ConfigError> {
        let config = BrowserConfig::load(path)?;
        let universe = Universe::load(&config.data_path)?;
        info!(
            "Loaded {} genomes with {} sticks from {}",
            universe.species().count(),
            universe.sticks().len(),
            config.data_path.display()
        );
        let fetcher = config.fetcher();
        Ok(AppContext::new(config, universe, Arc::new(BigToolsStore::new()), fetcher))
    }

    pub fn new(
        config: BrowserConfig,
        universe: Universe,
        store: Arc<dyn FeatureStore>,
        fetcher: Box<dyn SequenceFetch>,
    ) -> AppContext {
        let router = config.router();
        let locales = config.locales();
        let sources = Sources::new(
            store,
            config.data_path.clone(),
            &config.files.contigs,
            &config.files.transcripts,
            SequenceCache::new(fetcher),
        );
        AppContext {
            config,
            universe,
            router,
            sources,
            locales,
        }
    }

    pub fn bulk_data(&self, spec: &str) -> Vec<TileResponse> {
        self.router.bulk_data(spec, &self.universe, &self.sources)
    }

    /// Bytecodes and data url for clients of an API version.
    pub fn api_config(&self, version: u32) -> Option<serde_json::Value> {
        let bytecodes = self.config.bytecodes_for(version)?;
        let data_url = self
            .config
            .api
            .get(&version.to_string())
            .and_then(|api| api.data_url.clone());
        Some(serde_json::json!({
            "bytecodes": bytecodes,
            "data_url": data_url,
        }))
    }

    pub fn locale(&self, id: &str) -> Option<Locale> {
        self.locales.get(id)
    }

    pub fn object_info(&self, id: &str) -> Option<&ObjectInfo> {
        self.config.objects.get(id)
    }

    pub fn example_objects(&self) -> &[String] {
        &self.config.example_objects
    }

    /// What a client needs to start: sticks and their sizes, tracks and
    /// bytecodes.
    pub fn browser_config(&self) -> serde_json::Value {
        serde_json::json!({
            "api_version": self.config.api_version,
            "sticks": self.universe.stick_sizes(),
            "tracks": self.config.tracks,
            "bytecodes": self.config.bytecodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        api_version = 2
        data_path = "data"

        [tracks.contig]
        wire = "ct"
        colour = "grey"

        [tracks.unused]

        [endpoints.contig-normal]
        endpoint = "contignormal"
        bytecode = "contig"

        [bytecodes]
        contig = "draw-contigs"

        [choice.contig._default]
        AZ = "contig-normal"
    "#;

    #[test]
    fn test_parse_config() {
        let config: BrowserConfig = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.api_version, 2);
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.files.contigs, "contigs.bb");
        assert_eq!(config.refget.url, None);
        let tracks = config.wire_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks.get("ct").map(|s| s.as_str()), Some("contig"));
        assert_eq!(
            config.tracks["contig"].settings.get("colour").and_then(|v| v.as_str()),
            Some("grey")
        );
        let router = config.router();
        let resolved = router.resolve("contig", "GRCh38", None, 'N').unwrap();
        assert_eq!(resolved.bytecode, "contig");
    }

    const VERSIONED: &str = r#"
        data_path = "/data"
        example_objects = ["GRCh38:ENSG00000139618"]

        [bytecodes]
        contig = "draw-contigs"
        gene = "draw-genes"

        [api.2]
        data_url = "/browser/data/2"

        [api.3]
        data_url = "/browser/data/3"
        [api.3.bytecodes]
        gene = "draw-genes-v3"

        [objects."GRCh38:ENSG00000139618"]
        stick = "GRCh38:13"
        start = 32315086
        end = 32400268
        label = "BRCA2"

        [objects."GRCh38:ENSG00000000002"]
        stick = "GRCh38:13"
    "#;

    #[test]
    fn test_bytecodes_per_version() {
        let config: BrowserConfig = toml::from_str(VERSIONED).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.supports_version(2));
        assert!(!config.supports_version(1));

        let v2 = config.bytecodes_for(2).unwrap();
        assert_eq!(v2["gene"], "draw-genes");
        let v3 = config.bytecodes_for(3).unwrap();
        assert_eq!(v3["gene"], "draw-genes-v3");
        assert_eq!(v3["contig"], "draw-contigs");
        assert_eq!(config.bytecodes_for(4), None);

        let unversioned: BrowserConfig = toml::from_str(CONFIG).unwrap();
        assert!(unversioned.supports_version(7));
        assert_eq!(unversioned.bytecodes_for(7), Some(unversioned.bytecodes.clone()));
    }

    #[test]
    fn test_object_locales() {
        let config: BrowserConfig = toml::from_str(VERSIONED).unwrap();
        let locales = config.locales();
        // The second object has no range.
        assert_eq!(locales.len(), 1);
        let locale = locales.get("GRCh38:ENSG00000139618").unwrap();
        assert_eq!((locale.start, locale.end), (32315086, 32400268));

        let info = serde_json::to_value(&config.objects["GRCh38:ENSG00000139618"]).unwrap();
        assert_eq!(info["label"], "BRCA2");
        assert_eq!(info["stick"], "GRCh38:13");
    }

    #[test]
    fn test_bad_api_version() {
        let config: BrowserConfig =
            toml::from_str("data_path = \"/d\"\n[api.three]\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_relative_data_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gbtiles.toml");
        fs::write(&path, CONFIG)?;
        let config = BrowserConfig::load(&path)?;
        assert_eq!(config.data_path, dir.path().join("data"));
        Ok(())
    }

    #[test]
    fn test_bad_config() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gbtiles.toml");
        fs::write(&path, "api_version = \"three\"")?;
        assert!(matches!(BrowserConfig::load(&path), Err(ConfigError::Parse(..))));

        fs::write(&path, "data_path = \"/d\"\n[refget]\nurl = \"http://x/\"\n")?;
        assert!(matches!(BrowserConfig::load(&path), Err(ConfigError::Invalid(_))));

        assert!(matches!(
            BrowserConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(..))
        ));
        Ok(())
    }
}
