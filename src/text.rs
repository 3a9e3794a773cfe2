//! # Text Dimension Calculator
//!
//! Measures multi-line, multi-run text the way the label editor renders it.
//!
//! - A line's width is the sum of its characters' advances, each in the font
//!   of the run that owns it. Kerning only applies inside one run.
//! - A line's vertical metrics are the largest ascent, descent and gap of
//!   the runs on that line.
//! - Height is `Σ (ascent + descent + gap) × factor` over all lines, minus the
//!   final line's `gap × factor`. No trailing gap.

use crate::config::LayoutOptions;
use crate::document::{FontInfo, StyleRun, Text};
use crate::metrics::{Confidence, FaceMetrics, FontCache};

/// Measured extent of a text leaf, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
    /// Width of every line, in order.
    pub line_widths: Vec<f64>,
    /// Lowest tier used by any run.
    pub confidence: Confidence,
    /// Index of the first run measured at `confidence`.
    pub weakest_run: usize,
}

impl TextExtent {
    pub fn line_count(&self) -> usize {
        self.line_widths.len()
    }
}

/// Vertical metrics of one line.
#[derive(Debug, Clone, Copy, Default)]
struct LineMetrics {
    ascent: f64,
    descent: f64,
    gap: f64,
}

impl LineMetrics {
    fn include(&mut self, metrics: &FaceMetrics) {
        self.ascent = self.ascent.max(metrics.ascent());
        self.descent = self.descent.max(metrics.descent());
        self.gap = self.gap.max(metrics.line_gap());
    }
}

/// Measures text against a prepared [`FontCache`].
#[derive(Debug, Clone)]
pub struct TextCalculator<'c> {
    cache: &'c FontCache,
    options: LayoutOptions,
}

impl<'c> TextCalculator<'c> {
    pub fn new(cache: &'c FontCache, options: LayoutOptions) -> Self {
        Self { cache, options }
    }

    pub fn cache(&self) -> &'c FontCache {
        self.cache
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Measure a text leaf.
    pub fn measure_text(&self, text: &Text) -> TextExtent {
        self.measure(text.content(), text.runs())
    }

    /// Measure text set in a single font.
    pub fn measure_plain(&self, text: &str, font: &FontInfo) -> TextExtent {
        let run = StyleRun::new(text.chars().count(), font.clone());
        self.measure(text, std::slice::from_ref(&run))
    }

    /// Measure `text` styled by `runs`.
    ///
    /// Characters past the end of the runs take the last run's font. Without
    /// any run the default font is used.
    pub fn measure(&self, text: &str, runs: &[StyleRun]) -> TextExtent {
        let fallback = [StyleRun::new(0, FontInfo::default())];
        let runs = if runs.is_empty() { &fallback[..] } else { runs };
        let faces: Vec<FaceMetrics> = runs.iter().map(|r| self.cache.metrics(&r.font)).collect();
        let owners = char_owners(runs, text.chars().count());
        let factor = self.options.line_height_factor;

        let mut confidence = Confidence::Exact;
        let mut weakest_run = 0;
        let mut lower = |owner: usize, c: Confidence| {
            if c < confidence {
                confidence = c;
                weakest_run = owner;
            }
        };
        let mut line_widths = Vec::new();
        let mut height = 0.0;
        let mut last_gap = 0.0;
        let mut index = 0;

        for line in text.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            let mut metrics = LineMetrics::default();
            let mut width = 0.0;

            if chars.is_empty() {
                let owner = owner_at(&owners, index);
                metrics.include(&faces[owner]);
                lower(owner, faces[owner].confidence());
            }

            // Consecutive characters of one run form a segment.
            let mut start = 0;
            while start < chars.len() {
                let owner = owner_at(&owners, index + start);
                let mut end = start + 1;
                while end < chars.len() && owner_at(&owners, index + end) == owner {
                    end += 1;
                }
                let segment: String = chars[start..end].iter().collect();
                let (w, c) = faces[owner].measure_segment(&segment);
                width += w;
                lower(owner, c);
                metrics.include(&faces[owner]);
                start = end;
            }

            height += (metrics.ascent + metrics.descent + metrics.gap) * factor;
            last_gap = metrics.gap * factor;
            line_widths.push(width);
            // The newline belongs to the line it ends.
            index += chars.len() + 1;
        }
        height -= last_gap;

        if confidence >= Confidence::Substitute {
            let calibration = self.options.calibration;
            let (_, h) = calibration.apply(0.0, height);
            height = h;
            for w in &mut line_widths {
                *w = calibration.apply(*w, 0.0).0;
            }
        }

        let width = line_widths.iter().copied().fold(0.0, f64::max);
        TextExtent {
            width,
            height,
            line_widths,
            confidence,
            weakest_run,
        }
    }
}

/// Run index owning each character.
fn char_owners(runs: &[StyleRun], len: usize) -> Vec<usize> {
    let mut owners = Vec::with_capacity(len);
    for (i, run) in runs.iter().enumerate() {
        owners.extend(std::iter::repeat_n(i, run.len));
    }
    owners.truncate(len);
    owners
}

/// Owner of a character index, the last run past the end.
fn owner_at(owners: &[usize], index: usize) -> usize {
    owners
        .get(index)
        .or(owners.last())
        .copied()
        .unwrap_or_default()
}
