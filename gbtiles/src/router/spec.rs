use std::sync::OnceLock;

use regex::Regex;

/// The focus kind assumed when a focus has no `kind:` prefix.
pub const DEFAULT_FOCUS_KIND: &str = "gene";

/// The object a view is centred on, eg. `gene:ENSG00000139618`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Focus {
    pub kind: String,
    pub id: String,
}

impl Focus {
    pub fn parse(text: &str) -> Option<Focus> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (kind, id) = match text.split_once(':') {
            Some((kind, id)) => (kind, id),
            None => (DEFAULT_FOCUS_KIND, text),
        };
        if id.is_empty() {
            return None;
        }
        Some(Focus {
            kind: kind.to_string(),
            id: id.to_string(),
        })
    }
}

/// One tile of a request: a track on a stick at a pane (scale letter and
/// tile index).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileRequest {
    pub focus: Option<Focus>,
    /// Track id as sent on the wire.
    pub track: String,
    pub stick: String,
    pub pane: String,
}

fn tile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z]-?[0-9]+").expect("valid tile pattern"))
}

/// Splits a request spec into its tiles, in request order.
///
/// ```text
/// spec         := supersection ('+' supersection)*
/// supersection := [focus '~'] stick ':' section (';' section)*
/// section      := track (',' track)* '=' tiles
/// ```
///
/// The stick is everything before the last `:` of a supersection (stick
/// names contain a `:` themselves). Pieces that don't fit the grammar are
/// skipped.
pub fn parse_spec(spec: &str) -> Vec<TileRequest> {
    let mut out = vec![];
    for supersection in spec.split('+') {
        let (focus, rest) = match supersection.split_once('~') {
            Some((focus, rest)) => (Focus::parse(focus), rest),
            None => (None, supersection),
        };
        let Some((stick, sections)) = rest.rsplit_once(':') else {
            continue;
        };
        if stick.is_empty() {
            continue;
        }
        for section in sections.split(';') {
            let Some((tracks, tiles)) = section.split_once('=') else {
                continue;
            };
            for track in tracks.split(',').filter(|t| !t.is_empty()) {
                for tile in tile_pattern().find_iter(tiles) {
                    out.push(TileRequest {
                        focus: focus.clone(),
                        track: track.to_string(),
                        stick: stick.to_string(),
                        pane: tile.as_str().to_string(),
                    });
                }
            }
        }
    }
    out
}
