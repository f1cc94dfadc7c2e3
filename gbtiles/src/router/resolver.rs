use std::collections::BTreeMap;

use serde::Deserialize;

use crate::router::spec::Focus;

/// Key used at any level of the choice table when nothing more specific
/// matches.
pub const DEFAULT_KEY: &str = "_default";

/// The nested `choice` table of the configuration. Inner levels are keyed by
/// track, focus kind and genome; the leaves map scale ranges such as `AM`
/// (`A` to `M` inclusive) to endpoint names.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChoiceTree {
    Endpoint(String),
    Branch(BTreeMap<String, ChoiceTree>),
}

impl ChoiceTree {
    fn branch(&self) -> Option<&BTreeMap<String, ChoiceTree>> {
        match self {
            ChoiceTree::Branch(map) => Some(map),
            ChoiceTree::Endpoint(_) => None,
        }
    }

    /// Follows `path`, trying each candidate key at each level in turn.
    fn lookup(&self, path: &[&[&str]], scale: char) -> Option<&str> {
        let Some((level, rest)) = path.split_first() else {
            return pick_range(self.branch()?, scale);
        };
        let branch = self.branch()?;
        level
            .iter()
            .filter_map(|key| branch.get(*key))
            .find_map(|child| child.lookup(rest, scale))
    }
}

fn range_contains(range: &str, scale: char) -> bool {
    let mut chars = range.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(from), Some(to), None) => from <= scale && scale <= to,
        (Some(only), None, None) => only == scale,
        _ => false,
    }
}

fn pick_range(ranges: &BTreeMap<String, ChoiceTree>, scale: char) -> Option<&str> {
    ranges.iter().find_map(|(range, choice)| match choice {
        ChoiceTree::Endpoint(name) if range_contains(range, scale) => Some(name.as_str()),
        _ => None,
    })
}

/// Chooses the endpoint for a track at a scale.
pub trait EndpointResolver: Send + Sync {
    /// Returns the name of the configured endpoint, if any.
    fn resolve(&self, track: &str, genome_id: &str, focus: Option<&Focus>, scale: char) -> Option<&str>;
}

/// `choice.<track>.<genome>.<range>`, used before API version 3.
#[derive(Clone, Debug)]
pub struct GenomeResolver {
    choice: ChoiceTree,
}

impl GenomeResolver {
    pub fn new(choice: BTreeMap<String, ChoiceTree>) -> GenomeResolver {
        GenomeResolver {
            choice: ChoiceTree::Branch(choice),
        }
    }
}

impl EndpointResolver for GenomeResolver {
    fn resolve(&self, track: &str, genome_id: &str, _focus: Option<&Focus>, scale: char) -> Option<&str> {
        self.choice
            .lookup(&[&[track], &[genome_id, DEFAULT_KEY]], scale)
    }
}

/// `choice.<track>.<focus kind>.<genome>.<range>`, used from API version 3.
/// Without a focus the focus kind is `_default`.
#[derive(Clone, Debug)]
pub struct FocusResolver {
    choice: ChoiceTree,
}

impl FocusResolver {
    pub fn new(choice: BTreeMap<String, ChoiceTree>) -> FocusResolver {
        FocusResolver {
            choice: ChoiceTree::Branch(choice),
        }
    }
}

impl EndpointResolver for FocusResolver {
    fn resolve(&self, track: &str, genome_id: &str, focus: Option<&Focus>, scale: char) -> Option<&str> {
        let focus_kind = focus.map(|f| f.kind.as_str()).unwrap_or(DEFAULT_KEY);
        self.choice.lookup(
            &[&[track], &[focus_kind, DEFAULT_KEY], &[genome_id, DEFAULT_KEY]],
            scale,
        )
    }
}

/// The resolver for a configuration's API version.
pub fn resolver_for_version(
    api_version: u32,
    choice: BTreeMap<String, ChoiceTree>,
) -> Box<dyn EndpointResolver> {
    if api_version < 3 {
        Box::new(GenomeResolver::new(choice))
    } else {
        Box::new(FocusResolver::new(choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(text: &str) -> BTreeMap<String, ChoiceTree> {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_genome_resolver() {
        let resolver = GenomeResolver::new(choice(
            r#"
            [gene._default]
            AM = "gene-shimmer"
            NZ = "gene-full"
            [gene.GRCh37]
            AZ = "gene-37"
            "#,
        ));
        assert_eq!(resolver.resolve("gene", "GRCh38", None, 'C'), Some("gene-shimmer"));
        assert_eq!(resolver.resolve("gene", "GRCh38", None, 'M'), Some("gene-shimmer"));
        assert_eq!(resolver.resolve("gene", "GRCh38", None, 'N'), Some("gene-full"));
        assert_eq!(resolver.resolve("gene", "GRCh37", None, 'N'), Some("gene-37"));
        assert_eq!(resolver.resolve("contig", "GRCh38", None, 'N'), None);
    }

    #[test]
    fn test_genome_falls_back_when_range_missing() {
        let resolver = GenomeResolver::new(choice(
            r#"
            [gc.GRCh38]
            AF = "gc-coarse"
            [gc._default]
            AZ = "gc-any"
            "#,
        ));
        assert_eq!(resolver.resolve("gc", "GRCh38", None, 'B'), Some("gc-coarse"));
        assert_eq!(resolver.resolve("gc", "GRCh38", None, 'T'), Some("gc-any"));
    }

    #[test]
    fn test_focus_resolver() {
        let resolver = FocusResolver::new(choice(
            r#"
            [focus._default._default]
            AZ = "nothing"
            [focus.gene._default]
            AM = "focus-shimmer"
            NZ = "focus-full"
            "#,
        ));
        let gene = Focus::parse("gene:ENSG1").unwrap();
        let location = Focus::parse("location:1-100").unwrap();
        assert_eq!(resolver.resolve("focus", "GRCh38", None, 'N'), Some("nothing"));
        assert_eq!(resolver.resolve("focus", "GRCh38", Some(&gene), 'N'), Some("focus-full"));
        assert_eq!(resolver.resolve("focus", "GRCh38", Some(&gene), 'B'), Some("focus-shimmer"));
        assert_eq!(resolver.resolve("focus", "GRCh38", Some(&location), 'B'), Some("nothing"));
    }

    #[test]
    fn test_resolver_for_version() {
        let table = r#"
            [gene._default]
            AZ = "v2"
            [gene._default._default]
            AZ = "v3"
        "#;
        // The same table read both ways: the old resolver sees a branch
        // where it expects a range and finds nothing more specific.
        let old = resolver_for_version(2, choice(table));
        assert_eq!(old.resolve("gene", "x", None, 'N'), Some("v2"));
        let new = resolver_for_version(3, choice(table));
        assert_eq!(new.resolve("gene", "x", None, 'N'), Some("v3"));
    }
}
