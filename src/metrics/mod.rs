//! # Font Metrics
//!
//! Resolves a font (family, weight, italic) to line metrics and glyph
//! advances. Resolution never fails, it degrades through four tiers and
//! says which one it used:
//!
//! ```text
//! Exact       font file matching family + weight + italic
//!   ↓
//! Substitute  nearest weight/style of the same family
//!   ↓
//! Reference   measured (text, font, size) → (width, height) table
//!   ↓
//! Heuristic   average advance × character count
//! ```
//!
//! [`FontMetricsProvider`] supplies tiers one to three. [`FontCache`] runs
//! the resolution, adds the heuristic tier and memoizes the result per
//! size-independent [`FontQuery`].

mod heuristic;
mod library;
mod reference;

pub use heuristic::HeuristicFace;
pub use library::{FontLibrary, style_from_stem};
pub use reference::{ReferenceFace, ReferenceMetrics, ReferenceRow, ReferenceTable};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ab_glyph::{Font, FontArc};
use log::{debug, warn};

use crate::document::{FontInfo, LabelDocument, LayoutNode};

/// Which resolution tier produced a measurement. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Heuristic,
    Reference,
    Substitute,
    Exact,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Confidence::Heuristic => "heuristic",
            Confidence::Reference => "reference",
            Confidence::Substitute => "substitute",
            Confidence::Exact => "exact",
        };
        f.write_str(name)
    }
}

/// Size-independent font lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontQuery {
    pub family: String,
    pub weight: u16,
    pub italic: bool,
}

impl FontQuery {
    pub fn new(family: impl Into<String>, weight: u16, italic: bool) -> Self {
        Self {
            family: family.into(),
            weight,
            italic,
        }
    }

    /// Family folded for comparison: lowercase, no spaces, dashes or underscores.
    pub fn family_key(&self) -> String {
        normalize_family(&self.family)
    }

    fn cache_key(&self) -> (String, u16, bool) {
        (self.family_key(), self.weight, self.italic)
    }
}

impl From<&FontInfo> for FontQuery {
    fn from(font: &FontInfo) -> Self {
        Self::new(font.family.clone(), font.weight, font.italic)
    }
}

pub(crate) fn normalize_family(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ============================================================================
// OUTLINE FACES
// ============================================================================

/// A loaded font file with its vertical metrics in font units.
#[derive(Clone)]
pub struct Face {
    font: FontArc,
    units_per_em: f64,
    ascent: f64,
    descent: f64,
    line_gap: f64,
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("units_per_em", &self.units_per_em)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .field("line_gap", &self.line_gap)
            .finish()
    }
}

impl Face {
    pub fn new(font: FontArc) -> Self {
        let units_per_em = font.units_per_em().map(f64::from).unwrap_or(1000.0);
        Self {
            ascent: f64::from(font.ascent_unscaled()),
            descent: f64::from(font.descent_unscaled()).abs(),
            line_gap: f64::from(font.line_gap_unscaled()),
            units_per_em,
            font,
        }
    }

    /// Horizontal advance of `ch` in font units, kerned against `prev`.
    pub fn advance(&self, ch: char, prev: Option<char>) -> f64 {
        let id = self.font.glyph_id(ch);
        let mut advance = f64::from(self.font.h_advance_unscaled(id));
        if let Some(prev) = prev {
            advance += f64::from(self.font.kern_unscaled(self.font.glyph_id(prev), id));
        }
        advance
    }
}

/// A face found by a provider.
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub face: Arc<Face>,
    /// `false` when the face is the nearest substitute in the family.
    pub exact: bool,
}

/// Source of font faces and calibration data.
///
/// Implementations must be shareable across threads, the cache built on top
/// of a provider is read concurrently by batch workers.
pub trait FontMetricsProvider: Send + Sync {
    /// Exact or nearest-substitute face for the query.
    fn face(&self, query: &FontQuery) -> Option<FaceMatch>;

    /// Calibration table measured against the reference editor.
    fn reference(&self) -> Option<&ReferenceTable> {
        None
    }
}

// ============================================================================
// RESOLVED METRICS
// ============================================================================

/// Where a resolved face gets its numbers from.
#[derive(Debug, Clone)]
pub enum MetricSource {
    Glyphs(Arc<Face>),
    Reference(ReferenceFace),
    Heuristic(HeuristicFace),
}

/// Size-independent result of resolving one [`FontQuery`].
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub source: MetricSource,
    pub confidence: Confidence,
}

/// Units per em used by sources that have no font file.
const SYNTHETIC_UNITS_PER_EM: f64 = 1000.0;

/// Metrics of a resolved face at one size.
#[derive(Debug, Clone)]
pub struct FaceMetrics {
    face: Arc<ResolvedFace>,
    family: String,
    size: f64,
}

impl FaceMetrics {
    pub fn confidence(&self) -> Confidence {
        self.face.confidence
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn source(&self) -> &MetricSource {
        &self.face.source
    }

    pub fn units_per_em(&self) -> f64 {
        match &self.face.source {
            MetricSource::Glyphs(face) => face.units_per_em,
            MetricSource::Reference(_) | MetricSource::Heuristic(_) => SYNTHETIC_UNITS_PER_EM,
        }
    }

    fn scale(&self) -> f64 {
        self.size / self.units_per_em()
    }

    /// Ascent in points.
    pub fn ascent(&self) -> f64 {
        match &self.face.source {
            MetricSource::Glyphs(face) => face.ascent * self.scale(),
            MetricSource::Reference(r) => r.line_height(self.size) * reference::ASCENT_SHARE,
            MetricSource::Heuristic(h) => h.ascent_em * self.size,
        }
    }

    /// Descent in points, positive.
    pub fn descent(&self) -> f64 {
        match &self.face.source {
            MetricSource::Glyphs(face) => face.descent * self.scale(),
            MetricSource::Reference(r) => r.line_height(self.size) * (1.0 - reference::ASCENT_SHARE),
            MetricSource::Heuristic(h) => h.descent_em * self.size,
        }
    }

    /// Line gap in points.
    pub fn line_gap(&self) -> f64 {
        match &self.face.source {
            MetricSource::Glyphs(face) => face.line_gap * self.scale(),
            MetricSource::Reference(_) => 0.0,
            MetricSource::Heuristic(h) => h.line_gap_em * self.size,
        }
    }

    /// Advance of `ch` in font units (kerned against `prev` when the source
    /// has kerning). Multiply by `size / units_per_em` for points.
    pub fn advance(&self, ch: char, prev: Option<char>) -> f64 {
        match &self.face.source {
            MetricSource::Glyphs(face) => face.advance(ch, prev),
            MetricSource::Reference(r) => r.advance_em * SYNTHETIC_UNITS_PER_EM,
            MetricSource::Heuristic(h) => h.advance_em * SYNTHETIC_UNITS_PER_EM,
        }
    }

    /// Width in points of one line segment set in this face, and the tier
    /// that produced it.
    ///
    /// Reference faces return the measured width when the table knows the
    /// string, otherwise their fitted average advance flagged as heuristic.
    pub fn measure_segment(&self, segment: &str) -> (f64, Confidence) {
        if let MetricSource::Reference(r) = &self.face.source {
            if let Some(width) = r.string_width(segment, self.size) {
                return (width, Confidence::Reference);
            }
        }
        let mut prev = None;
        let mut units = 0.0;
        for ch in segment.chars() {
            units += self.advance(ch, prev);
            prev = Some(ch);
        }
        let confidence = match self.face.source {
            MetricSource::Reference(_) => Confidence::Heuristic,
            _ => self.face.confidence,
        };
        (units * self.scale(), confidence)
    }

    pub fn family(&self) -> &str {
        &self.family
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// Explicit font cache over a provider.
///
/// Fill it with [`FontCache::prepare`] before layout, then share it by
/// reference. Lookups never mutate the cache, a miss resolves uncached.
pub struct FontCache {
    provider: Box<dyn FontMetricsProvider>,
    resolved: HashMap<(String, u16, bool), Arc<ResolvedFace>>,
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache")
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

impl FontCache {
    pub fn new(provider: impl FontMetricsProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            resolved: HashMap::new(),
        }
    }

    /// Resolve every font used by the document's text leaves.
    pub fn prepare(&mut self, doc: &LabelDocument) {
        for node in doc.nodes() {
            if let LayoutNode::Text(text) = node {
                for run in text.runs() {
                    self.prepare_font(&run.font);
                }
            }
        }
    }

    pub fn prepare_font(&mut self, font: &FontInfo) {
        let query = FontQuery::from(font);
        let key = query.cache_key();
        if !self.resolved.contains_key(&key) {
            let resolved = Arc::new(self.resolve(&query));
            debug!(family = font.family.as_str(), confidence = resolved.confidence.to_string(); "Cached font resolution");
            self.resolved.insert(key, resolved);
        }
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Metrics for a run font at its size.
    pub fn metrics(&self, font: &FontInfo) -> FaceMetrics {
        let query = FontQuery::from(font);
        let face = match self.resolved.get(&query.cache_key()) {
            Some(face) => Arc::clone(face),
            None => {
                debug!(family = font.family.as_str(); "Font not prepared, resolving uncached");
                Arc::new(self.resolve(&query))
            }
        };
        FaceMetrics {
            face,
            family: font.family.clone(),
            size: font.size,
        }
    }

    fn resolve(&self, query: &FontQuery) -> ResolvedFace {
        if let Some(found) = self.provider.face(query) {
            let confidence = if found.exact {
                Confidence::Exact
            } else {
                warn!(family = query.family.as_str(), weight = query.weight, italic = query.italic; "Using nearest substitute face");
                Confidence::Substitute
            };
            return ResolvedFace {
                source: MetricSource::Glyphs(found.face),
                confidence,
            };
        }
        if let Some(face) = self.provider.reference().and_then(|t| t.face(query)) {
            warn!(family = query.family.as_str(); "No font file, falling back to reference table");
            return ResolvedFace {
                source: MetricSource::Reference(face),
                confidence: Confidence::Reference,
            };
        }
        warn!(family = query.family.as_str(); "No metrics available, using heuristic estimate");
        ResolvedFace {
            source: MetricSource::Heuristic(HeuristicFace::for_query(query)),
            confidence: Confidence::Heuristic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    struct NoFonts;

    impl FontMetricsProvider for NoFonts {
        fn face(&self, _query: &FontQuery) -> Option<FaceMatch> {
            None
        }
    }

    #[test]
    fn test_confidence_order() {
        assert!(Confidence::Exact > Confidence::Substitute);
        assert!(Confidence::Substitute > Confidence::Reference);
        assert!(Confidence::Reference > Confidence::Heuristic);
        assert_eq!(
            [Confidence::Exact, Confidence::Heuristic].into_iter().min(),
            Some(Confidence::Heuristic)
        );
    }

    #[test]
    fn test_family_key() {
        let q = FontQuery::new("Helsinki Narrow", 400, false);
        assert_eq!(q.family_key(), "helsinkinarrow");
        assert_eq!(normalize_family("Comic_Sans-MS"), "comicsansms");
    }

    #[test]
    fn test_missing_everything_degrades_to_heuristic() {
        let cache = FontCache::new(NoFonts);
        let m = cache.metrics(&FontInfo::new("Nonexistent", 10.0));
        assert_eq!(m.confidence(), Confidence::Heuristic);
        let (w, c) = m.measure_segment("abcd");
        assert_eq!(c, Confidence::Heuristic);
        assert!(w > 0.0);
    }

    #[test]
    fn test_reference_tier_exact_row() {
        let cache = FontCache::new(ReferenceMetrics::builtin());
        let m = cache.metrics(&FontInfo::new("Arial", 12.0));
        assert_eq!(m.confidence(), Confidence::Reference);
        let (w, c) = m.measure_segment("ab");
        assert_eq!(c, Confidence::Reference);
        assert!(approx_eq!(f64, w, 13.2));
        let (_, c) = m.measure_segment("zz top");
        assert_eq!(c, Confidence::Heuristic);
    }

    #[test]
    fn test_prepare_fills_cache_once() {
        let mut doc = LabelDocument::default();
        doc.push(crate::document::Text::styled("a", FontInfo::new("Arial", 8.0)));
        doc.push(crate::document::Text::styled("b", FontInfo::new("Arial", 45.7)));
        doc.push(crate::document::Text::styled("c", FontInfo::new("Arial", 8.0).bold()));
        let mut cache = FontCache::new(ReferenceMetrics::builtin());
        cache.prepare(&doc);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_vertical_metrics_scale_with_size() {
        let cache = FontCache::new(NoFonts);
        let small = cache.metrics(&FontInfo::new("Arial", 10.0));
        let large = cache.metrics(&FontInfo::new("Arial", 20.0));
        assert!(approx_eq!(f64, large.ascent(), small.ascent() * 2.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, large.descent(), small.descent() * 2.0, epsilon = 1e-9));
    }
}
