use std::collections::HashMap;

use serde::Serialize;

/// Marks a locale id that names a region directly,
/// eg. `GRCh38:region:13:32315086-32400268`.
pub const REGION_KIND: &str = "region";

/// Where to go to show an object: a range on a stick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Locale {
    pub stick: String,
    pub start: i64,
    pub end: i64,
}

impl Locale {
    /// Parses a region id `<genome>:region:<chrom>:<start>-<end>`.
    pub fn parse_region(id: &str) -> Option<Locale> {
        let mut parts = id.splitn(3, ':');
        let genome = parts.next()?;
        if parts.next()? != REGION_KIND {
            return None;
        }
        let (chrom, range) = parts.next()?.split_once(':')?;
        let (start, end) = range.split_once('-')?;
        Some(Locale {
            stick: format!("{}:{}", genome, chrom),
            start: start.parse().ok()?,
            end: end.parse().ok()?,
        })
    }
}

/// Locales of known objects, by object id.
#[derive(Clone, Debug, Default)]
pub struct Locales {
    known: HashMap<String, Locale>,
}

impl Locales {
    pub fn new() -> Locales {
        Locales::default()
    }

    pub fn add(&mut self, id: &str, stick: &str, start: i64, end: i64) {
        self.known.insert(
            id.to_string(),
            Locale {
                stick: stick.to_string(),
                start,
                end,
            },
        );
    }

    /// Region ids are answered from the id itself, anything else from the
    /// known objects.
    pub fn get(&self, id: &str) -> Option<Locale> {
        if id.split(':').nth(1) == Some(REGION_KIND) {
            return Locale::parse_region(id);
        }
        self.known.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
