//! Last-resort metrics: an average advance per character.
//!
//! | Family contains | Advance (em) |
//! |-----------------|--------------|
//! | narrow, condensed | 0.5 |
//! | mono, courier | 0.7 |
//! | anything else | 0.6 |
//!
//! Bold widens by 10%, italic by 5%. A few families the label editor ships
//! with get their own correction factors. A line is 1.2em tall.

use super::FontQuery;

const LINE_HEIGHT_EM: f64 = 1.2;

/// Share of the line height above the baseline.
const ASCENT_SHARE: f64 = 0.8;

/// (family prefix, width factor, height factor)
const FAMILY_FACTORS: &[(&str, f64, f64)] = &[
    ("arial", 0.8, 0.9),
    ("comic sans ms", 0.95, 1.15),
    ("helsinki narrow", 0.8, 1.1),
    ("helsinki", 0.9, 1.1),
];

/// Heuristic face: fixed em-relative metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicFace {
    pub advance_em: f64,
    pub ascent_em: f64,
    pub descent_em: f64,
    pub line_gap_em: f64,
}

impl HeuristicFace {
    pub fn for_query(query: &FontQuery) -> Self {
        let family = query.family.to_lowercase();
        let mut advance = if family.contains("narrow") || family.contains("condensed") {
            0.5
        } else if family.contains("mono") || family.contains("courier") {
            0.7
        } else {
            0.6
        };
        if query.weight >= 600 {
            advance *= 1.1;
        }
        if query.italic {
            advance *= 1.05;
        }

        let (width_factor, height_factor) = FAMILY_FACTORS
            .iter()
            .find(|(prefix, _, _)| family.starts_with(prefix))
            .map(|&(_, w, h)| (w, h))
            .unwrap_or((1.0, 1.0));

        let line = LINE_HEIGHT_EM * height_factor;
        Self {
            advance_em: advance * width_factor,
            ascent_em: line * ASCENT_SHARE,
            descent_em: line * (1.0 - ASCENT_SHARE),
            line_gap_em: 0.0,
        }
    }
}
