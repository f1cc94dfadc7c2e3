use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const COMMON_FILES: &str = "common_files";
pub const GENOME_INFO_FILE: &str = "genome_id_info.toml";
pub const CHROM_SIZES_FILE: &str = "chrom.sizes";
pub const CHROM_HASHES_FILE: &str = "chrom.hashes";

#[derive(Error, Debug)]
pub enum UniverseError {
    #[error("Could not read {}: {}", .0.display(), .1)]
    Io(PathBuf, io::Error),
    #[error("Invalid genome info in {}: {}", .0.display(), .1)]
    InvalidGenomeInfo(PathBuf, toml::de::Error),
    #[error("Invalid line {} in {}: {}", .1, .0.display(), .2)]
    InvalidLine(PathBuf, usize, String),
}

/// A named coordinate axis: a chromosome or contig of one genome.
#[derive(Clone, Debug, PartialEq)]
pub struct Stick {
    /// Genome-qualified name, eg. `homo_sapiens_GCA_000001405_28:1`
    pub stick_name: String,
    /// Name of the chromosome inside the data files
    pub name: String,
    pub genome_id: String,
    pub size: u64,
    /// Content hash used to fetch sequence
    pub seq_hash: Option<String>,
    pub aliases: Vec<String>,
}

impl Stick {
    pub fn new(species: &Species, name: &str, size: u64, seq_hash: Option<String>) -> Stick {
        let mut aliases = vec![];
        if let Some(short) = name.strip_prefix("chr") {
            aliases.push(format!("{}:{}", species.wire_genome_id, short));
        }
        Stick {
            stick_name: format!("{}:{}", species.wire_genome_id, name),
            name: name.to_string(),
            genome_id: species.genome_id.clone(),
            size,
            seq_hash,
            aliases,
        }
    }

    /// `<data_path>/<section>/<genome_id>/<filename>`
    pub fn file_path(&self, data_path: &Path, section: &str, filename: &str) -> PathBuf {
        data_path.join(section).join(&self.genome_id).join(filename)
    }
}

#[derive(Deserialize, Debug)]
struct GenomeInfo {
    genome_id: String,
    gca: Option<String>,
    species: Option<String>,
    dbname: Option<String>,
    version: Option<toml::Value>,
}

#[derive(Clone, Debug)]
pub struct Species {
    pub production_name: String,
    pub genome_id: String,
    pub wire_genome_id: String,
    pub gca: Option<String>,
    pub species: Option<String>,
    pub dbname: Option<String>,
    pub version: Option<String>,
}

impl Species {
    pub fn new(production_name: &str, genome_id: &str) -> Species {
        Species {
            production_name: production_name.to_string(),
            genome_id: genome_id.to_string(),
            wire_genome_id: wire_genome_id(genome_id),
            gca: None,
            species: None,
            dbname: None,
            version: None,
        }
    }

    fn from_info(production_name: &str, info: GenomeInfo) -> Species {
        let mut species = Species::new(production_name, &info.genome_id);
        species.gca = info.gca;
        species.species = info.species;
        species.dbname = info.dbname;
        species.version = info.version.map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        });
        species
    }
}

/// Replaces every character which isn't a word character with `_`.
pub fn wire_genome_id(genome_id: &str) -> String {
    genome_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// All genomes known to the server and their sticks, by name and alias.
#[derive(Debug, Default)]
pub struct Universe {
    species: BTreeMap<String, Species>,
    sticks: Vec<Stick>,
    by_name: HashMap<String, usize>,
}

impl Universe {
    pub fn new() -> Universe {
        Universe::default()
    }

    /// Loads `common_files/genome_id_info.toml` and, for each genome, its
    /// `chrom.sizes` and `chrom.hashes` files.
    pub fn load(data_path: &Path) -> Result<Universe, UniverseError> {
        let common = data_path.join(COMMON_FILES);
        let info_path = common.join(GENOME_INFO_FILE);
        let text =
            fs::read_to_string(&info_path).map_err(|e| UniverseError::Io(info_path.clone(), e))?;
        let infos: BTreeMap<String, GenomeInfo> =
            toml::from_str(&text).map_err(|e| UniverseError::InvalidGenomeInfo(info_path, e))?;

        let mut universe = Universe::new();
        for (production_name, info) in infos {
            let species = Species::from_info(&production_name, info);
            let genome_dir = common.join(&species.genome_id);
            let hashes = read_chrom_hashes(&genome_dir.join(CHROM_HASHES_FILE))?;
            let sizes = read_chrom_sizes(&genome_dir.join(CHROM_SIZES_FILE))?;
            for (name, size) in sizes {
                let hash = hashes.get(&name).cloned();
                universe.add_stick(Stick::new(&species, &name, size, hash));
            }
            universe.add_species(species);
        }
        debug!(
            "Loaded {} genomes with {} sticks",
            universe.species.len(),
            universe.sticks.len()
        );
        Ok(universe)
    }

    pub fn add_species(&mut self, species: Species) {
        self.species.insert(species.wire_genome_id.clone(), species);
    }

    pub fn add_stick(&mut self, stick: Stick) {
        let idx = self.sticks.len();
        self.by_name.insert(stick.stick_name.clone(), idx);
        for alias in &stick.aliases {
            self.by_name.insert(alias.clone(), idx);
        }
        self.sticks.push(stick);
    }

    /// Looks a stick up by its name or one of its aliases.
    pub fn get(&self, stick: &str) -> Option<&Stick> {
        self.by_name.get(stick).map(|idx| &self.sticks[*idx])
    }

    /// Every stick name and alias, with its size.
    pub fn stick_sizes(&self) -> BTreeMap<String, u64> {
        self.by_name
            .iter()
            .map(|(name, idx)| (name.clone(), self.sticks[*idx].size))
            .collect()
    }

    pub fn sticks(&self) -> &[Stick] {
        &self.sticks
    }

    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }
}

fn read_tsv(path: &Path) -> Result<Vec<(usize, Vec<String>)>, UniverseError> {
    let text = fs::read_to_string(path).map_err(|e| UniverseError::Io(path.to_path_buf(), e))?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| (i, line.split('\t').map(|s| s.to_string()).collect()))
        .collect())
}

fn read_chrom_sizes(path: &Path) -> Result<Vec<(String, u64)>, UniverseError> {
    read_tsv(path)?
        .into_iter()
        .map(|(line_no, parts)| {
            let invalid = || UniverseError::InvalidLine(path.to_path_buf(), line_no, parts.join("\t"));
            let name = parts.first().ok_or_else(invalid)?;
            let size = parts
                .get(1)
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(invalid)?;
            Ok((name.clone(), size))
        })
        .collect()
}

fn read_chrom_hashes(path: &Path) -> Result<HashMap<String, String>, UniverseError> {
    if !path.exists() {
        warn!("Missing file {}", path.display());
        return Ok(HashMap::new());
    }
    Ok(read_tsv(path)?
        .into_iter()
        .filter_map(|(_, mut parts)| {
            if parts.len() < 2 {
                return None;
            }
            let hash = parts.swap_remove(1);
            let name = parts.swap_remove(0);
            Some((name, hash))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_genome_id() {
        assert_eq!(
            wire_genome_id("homo_sapiens_GCA_000001405.28"),
            "homo_sapiens_GCA_000001405_28"
        );
    }

    #[test]
    fn test_chr_alias() {
        let species = Species::new("human", "GRCh38.p13");
        let stick = Stick::new(&species, "chr7", 100, None);
        assert_eq!(stick.stick_name, "GRCh38_p13:chr7");
        assert_eq!(stick.aliases, vec!["GRCh38_p13:7".to_string()]);

        let mut universe = Universe::new();
        universe.add_stick(stick);
        universe.add_species(species);
        assert_eq!(universe.get("GRCh38_p13:7").map(|s| s.size), Some(100));
        assert_eq!(universe.get("GRCh38_p13:chr7").map(|s| s.size), Some(100));
        assert!(universe.get("GRCh38_p13:8").is_none());
        assert_eq!(universe.stick_sizes().len(), 2);
    }

    #[test]
    fn test_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let common = dir.path().join(COMMON_FILES);
        fs::create_dir_all(common.join("GRCh38"))?;
        fs::write(
            common.join(GENOME_INFO_FILE),
            "[homo_sapiens]\ngenome_id = \"GRCh38\"\nspecies = \"homo_sapiens\"\nversion = 104\n",
        )?;
        fs::write(common.join("GRCh38").join(CHROM_SIZES_FILE), "1\t1000\n2\t2000\n")?;
        fs::write(common.join("GRCh38").join(CHROM_HASHES_FILE), "1\tabc123\n")?;

        let universe = Universe::load(dir.path())?;
        let one = universe.get("GRCh38:1").unwrap();
        assert_eq!(one.size, 1000);
        assert_eq!(one.seq_hash.as_deref(), Some("abc123"));
        let two = universe.get("GRCh38:2").unwrap();
        assert_eq!(two.seq_hash, None);
        let species: Vec<_> = universe.species().collect();
        assert_eq!(species[0].version.as_deref(), Some("104"));
        Ok(())
    }

    #[test]
    fn test_load_bad_sizes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let common = dir.path().join(COMMON_FILES);
        fs::create_dir_all(common.join("g"))?;
        fs::write(common.join(GENOME_INFO_FILE), "[x]\ngenome_id = \"g\"\n")?;
        fs::write(common.join("g").join(CHROM_SIZES_FILE), "1\tlots\n")?;
        assert!(matches!(
            Universe::load(dir.path()),
            Err(UniverseError::InvalidLine(_, 1, _))
        ));
        Ok(())
    }
}
