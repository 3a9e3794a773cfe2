//! # Tape Presets
//!
//! Paper and background geometry for each supported tape width.
//!
//! | Tape | Paper width | Side margin | Format | Band y | Band height |
//! |------|-------------|-------------|--------|--------|-------------|
//! | 3.5mm | 9.6pt | 0pt | 263 | 0pt | 9.6pt |
//! | 6mm | 16.8pt | 2pt | 257 | 2pt | 12.8pt |
//! | 9mm | 25.6pt | 2.8pt | 258 | 2.8pt | 20pt |
//! | 12mm | 33.6pt | 2.8pt | 259 | 2.8pt | 28pt |
//! | 18mm | 51.2pt | 3.2pt | 260 | 3.2pt | 44.8pt |
//! | 24mm | 68pt | 8.4pt | 261 | 8.4pt | 51.2pt |
//!
//! The paper is landscape: its `width` is across the tape and its `height`
//! runs along it. Auto-length labels use the editor's 2834.4pt page.
//!
//! ```text
//!       ├─5.6pt─┼──── band width (34.4pt when auto) ────┤
//!  ┬    ┌──────────────────────────────────────────────────
//!  │    │ margin
//!  │    │       ┌───────────────────────────────────────┐ ┬ band y
//! tape  │       │ background band (printable)           │ │ band height
//!  │    │       └───────────────────────────────────────┘ ┴
//!  ┴    └──────────────────────────────────────────────────
//! ```

use serde::{Deserialize, Serialize};

use super::{Background, Orientation, Paper, PrinterMeta};

/// Top and bottom paper margin along the tape.
const LENGTH_MARGIN: f64 = 5.6;

/// Page length the editor uses for auto-length labels.
const AUTO_PAGE_LENGTH: f64 = 2834.4;

/// Band width the editor writes for auto-length labels.
const AUTO_BAND_WIDTH: f64 = 34.4;

/// Geometry of one tape width, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapePreset {
    pub width: f64,
    pub margin: f64,
    pub format: u32,
    pub band_y: f64,
    pub band_height: f64,
}

impl TapePreset {
    pub const MM3_5: Self = Self {
        width: 9.6,
        margin: 0.0,
        format: 263,
        band_y: 0.0,
        band_height: 9.6,
    };

    pub const MM6: Self = Self {
        width: 16.8,
        margin: 2.0,
        format: 257,
        band_y: 2.0,
        band_height: 12.8,
    };

    pub const MM9: Self = Self {
        width: 25.6,
        margin: 2.8,
        format: 258,
        band_y: 2.8,
        band_height: 20.0,
    };

    pub const MM12: Self = Self {
        width: 33.6,
        margin: 2.8,
        format: 259,
        band_y: 2.8,
        band_height: 28.0,
    };

    pub const MM18: Self = Self {
        width: 51.2,
        margin: 3.2,
        format: 260,
        band_y: 3.2,
        band_height: 44.8,
    };

    pub const MM24: Self = Self {
        width: 68.0,
        margin: 8.4,
        format: 261,
        band_y: 8.4,
        band_height: 51.2,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TapeWidth {
    #[serde(rename = "3.5mm")]
    Mm3_5,
    #[serde(rename = "6mm")]
    Mm6,
    #[serde(rename = "9mm")]
    Mm9,
    #[default]
    #[serde(rename = "12mm")]
    Mm12,
    #[serde(rename = "18mm")]
    Mm18,
    #[serde(rename = "24mm")]
    Mm24,
}

/// Label length along the tape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelLength {
    /// The printer cuts after the content.
    #[default]
    Auto,
    /// Fixed page length in points.
    Fixed(f64),
}

impl TapeWidth {
    pub fn preset(self) -> TapePreset {
        match self {
            TapeWidth::Mm3_5 => TapePreset::MM3_5,
            TapeWidth::Mm6 => TapePreset::MM6,
            TapeWidth::Mm9 => TapePreset::MM9,
            TapeWidth::Mm12 => TapePreset::MM12,
            TapeWidth::Mm18 => TapePreset::MM18,
            TapeWidth::Mm24 => TapePreset::MM24,
        }
    }

    /// Tape width in millimeters.
    pub fn mm(self) -> f64 {
        match self {
            TapeWidth::Mm3_5 => 3.5,
            TapeWidth::Mm6 => 6.0,
            TapeWidth::Mm9 => 9.0,
            TapeWidth::Mm12 => 12.0,
            TapeWidth::Mm18 => 18.0,
            TapeWidth::Mm24 => 24.0,
        }
    }

    /// Nearest preset for a paper width in points (within 0.5pt).
    pub fn from_paper_width(width: f64) -> Option<Self> {
        [
            TapeWidth::Mm3_5,
            TapeWidth::Mm6,
            TapeWidth::Mm9,
            TapeWidth::Mm12,
            TapeWidth::Mm18,
            TapeWidth::Mm24,
        ]
        .into_iter()
        .find(|t| (t.preset().width - width).abs() < 0.5)
    }

    pub fn paper(self, length: LabelLength) -> Paper {
        let preset = self.preset();
        let (height, auto_length) = match length {
            LabelLength::Auto => (AUTO_PAGE_LENGTH, true),
            LabelLength::Fixed(len) => (len, false),
        };
        Paper {
            width: preset.width,
            height,
            margin_left: preset.margin,
            margin_top: LENGTH_MARGIN,
            margin_right: preset.margin,
            margin_bottom: LENGTH_MARGIN,
            orientation: Orientation::Landscape,
            auto_length,
            format: preset.format,
            paper_color: "#FFFFFF".into(),
            paper_ink: "#000000".into(),
            printer: PrinterMeta::default(),
        }
    }

    pub fn background(self, length: LabelLength) -> Background {
        let preset = self.preset();
        let width = match length {
            LabelLength::Auto => AUTO_BAND_WIDTH,
            LabelLength::Fixed(len) => (len - 2.0 * LENGTH_MARGIN).max(0.0),
        };
        Background {
            x: LENGTH_MARGIN,
            y: preset.band_y,
            width,
            height: preset.band_height,
            color: "#FFFFFF".into(),
            back_color: "#FFFFFF".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LabelDocument;
    use float_cmp::approx_eq;

    #[test]
    fn test_12mm_auto() {
        let doc = LabelDocument::for_tape(TapeWidth::Mm12, LabelLength::Auto);
        assert_eq!(doc.paper.width, 33.6);
        assert_eq!(doc.paper.height, 2834.4);
        assert!(doc.paper.auto_length);
        assert_eq!(doc.paper.format, 259);
        assert_eq!(doc.background.y, 2.8);
        assert_eq!(doc.background.height, 28.0);
        assert_eq!(doc.background.width, 34.4);
    }

    #[test]
    fn test_fixed_length_band() {
        let bg = TapeWidth::Mm24.background(LabelLength::Fixed(100.0));
        assert!(approx_eq!(f64, bg.width, 88.8, epsilon = 1e-9));
        let paper = TapeWidth::Mm24.paper(LabelLength::Fixed(100.0));
        assert!(!paper.auto_length);
        assert_eq!(paper.height, 100.0);
        assert_eq!(paper.margin_left, 8.4);
    }

    #[test]
    fn test_from_paper_width() {
        assert_eq!(TapeWidth::from_paper_width(51.2), Some(TapeWidth::Mm18));
        assert_eq!(TapeWidth::from_paper_width(40.0), None);
    }

    #[test]
    fn test_tape_json_names() {
        let t: TapeWidth = serde_json::from_str(r#""3.5mm""#).unwrap();
        assert_eq!(t, TapeWidth::Mm3_5);
        assert_eq!(t.mm(), 3.5);
    }
}
