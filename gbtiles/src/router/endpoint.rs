use serde::Deserialize;

/// Which source builds the payload of a tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Handler {
    ContigNormal,
    ContigShimmer,
    Variant,
    Transcript,
    Gene,
    Gc,
    /// Unknown or unresolved endpoints. Produces an empty payload.
    Nothing,
}

impl Handler {
    pub fn from_name(name: &str) -> Handler {
        match name {
            "contignormal" => Handler::ContigNormal,
            "contigshimmer" => Handler::ContigShimmer,
            "variant" => Handler::Variant,
            "transcript" => Handler::Transcript,
            "gene" => Handler::Gene,
            "gc" => Handler::Gc,
            _ => Handler::Nothing,
        }
    }
}

/// The type flag of an endpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeatureType {
    /// `pc`
    ProteinCoding,
    /// `other`
    Other,
    /// `feat`, the featured or focused gene
    Featured,
    /// A single lowercase letter. Variant endpoints use it to pick a file.
    Letter(char),
}

impl FeatureType {
    fn from_flag(flag: &str) -> Option<FeatureType> {
        match flag {
            "pc" => Some(FeatureType::ProteinCoding),
            "other" => Some(FeatureType::Other),
            "feat" => Some(FeatureType::Featured),
            _ => {
                let mut chars = flag.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_lowercase() => Some(FeatureType::Letter(c)),
                    _ => None,
                }
            }
        }
    }

    pub fn flag(&self) -> String {
        match self {
            FeatureType::ProteinCoding => "pc".to_string(),
            FeatureType::Other => "other".to_string(),
            FeatureType::Featured => "feat".to_string(),
            FeatureType::Letter(c) => c.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn from_flag(flag: &str) -> Option<Direction> {
        match flag {
            "fwd" => Some(Direction::Forward),
            "rev" => Some(Direction::Reverse),
            _ => None,
        }
    }
}

/// A decoded endpoint code such as `transcript-pc-fwd-names`.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointSpec {
    pub handler: Handler,
    pub kind: Option<FeatureType>,
    pub direction: Option<Direction>,
    pub seq: bool,
    pub names: bool,
}

impl EndpointSpec {
    /// The spec used when no endpoint is configured for a tile.
    pub fn nothing() -> EndpointSpec {
        EndpointSpec {
            handler: Handler::Nothing,
            kind: None,
            direction: None,
            seq: false,
            names: false,
        }
    }
}

/// The role of a group of flags in an endpoint code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagRole {
    Type,
    Direction,
    Seq,
    Names,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FlagGroup {
    pub role: FlagRole,
    pub members: Vec<String>,
}

/// The flags that may follow the handler name in an endpoint code, grouped
/// by what they control.
#[derive(Clone, Debug, PartialEq)]
pub struct FlagVocabulary {
    groups: Vec<FlagGroup>,
}

impl Default for FlagVocabulary {
    fn default() -> FlagVocabulary {
        let mut types: Vec<String> = ["pc", "other", "feat"].iter().map(|s| s.to_string()).collect();
        types.extend(('a'..='z').map(|c| c.to_string()));
        FlagVocabulary {
            groups: vec![
                FlagGroup {
                    role: FlagRole::Type,
                    members: types,
                },
                FlagGroup {
                    role: FlagRole::Direction,
                    members: vec!["fwd".to_string(), "rev".to_string()],
                },
                FlagGroup {
                    role: FlagRole::Seq,
                    members: vec!["seq".to_string()],
                },
                FlagGroup {
                    role: FlagRole::Names,
                    members: vec!["names".to_string()],
                },
            ],
        }
    }
}

impl FlagVocabulary {
    pub fn new(groups: Vec<FlagGroup>) -> FlagVocabulary {
        FlagVocabulary { groups }
    }

    pub fn role(&self, flag: &str) -> Option<FlagRole> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m == flag))
            .map(|g| g.role)
    }

    /// Parses `handler-flag-flag...`. Flags may come in any order; flags
    /// outside the vocabulary are ignored and a later flag of the same role
    /// replaces an earlier one.
    pub fn parse(&self, code: &str) -> EndpointSpec {
        let mut parts = code.split('-');
        let handler = Handler::from_name(parts.next().unwrap_or(""));
        let mut spec = EndpointSpec {
            handler,
            ..EndpointSpec::nothing()
        };
        for flag in parts {
            match self.role(flag) {
                Some(FlagRole::Type) => {
                    if let Some(kind) = FeatureType::from_flag(flag) {
                        spec.kind = Some(kind);
                    }
                }
                Some(FlagRole::Direction) => {
                    if let Some(direction) = Direction::from_flag(flag) {
                        spec.direction = Some(direction);
                    }
                }
                Some(FlagRole::Seq) => spec.seq = true,
                Some(FlagRole::Names) => spec.names = true,
                None => {}
            }
        }
        spec
    }
}
