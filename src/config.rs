//! # Configuration
//!
//! Options for one composition run. Every struct has sensible defaults and
//! deserializes from JSON with missing keys filled in:
//!
//! ```json
//! {
//!   "fonts": { "font_dirs": ["/usr/share/fonts"], "use_reference_table": true },
//!   "layout": { "line_height_factor": 1.0, "calibration": { "kind": "identity" } },
//!   "codec": { "compact_runs": true, "precision": 1, "strict_runs": true }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::FontLibrary;

/// Post-measurement adjustment bringing a glyph-based measurement closer to
/// the label editor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calibration {
    #[default]
    Identity,
    /// `width × width`, `height × height`
    Scale { width: f64, height: f64 },
    /// `slope × value + intercept` per axis
    Linear {
        width_slope: f64,
        width_intercept: f64,
        height_slope: f64,
        height_intercept: f64,
    },
}

impl Calibration {
    /// Adjust a measured (width, height). Zero widths stay zero.
    pub fn apply(&self, width: f64, height: f64) -> (f64, f64) {
        match *self {
            Calibration::Identity => (width, height),
            Calibration::Scale {
                width: w,
                height: h,
            } => (width * w, height * h),
            Calibration::Linear {
                width_slope,
                width_intercept,
                height_slope,
                height_intercept,
            } => {
                let w = if width > 0.0 {
                    (width_slope * width + width_intercept).max(0.0)
                } else {
                    0.0
                };
                (w, (height_slope * height + height_intercept).max(0.0))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Multiplier on the natural line height (ascent + descent + gap).
    pub line_height_factor: f64,
    pub calibration: Calibration,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_height_factor: 1.0,
            calibration: Calibration::Identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Merge adjacent style runs with identical fonts.
    pub compact_runs: bool,
    /// Decimal places for lengths. `None` writes the shortest exact value.
    pub precision: Option<usize>,
    /// Reject run lengths that do not cover the text instead of clamping.
    pub strict_runs: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            compact_runs: true,
            precision: None,
            strict_runs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontOptions {
    /// Directories searched (recursively) for font files.
    pub font_dirs: Vec<PathBuf>,
    /// Fall back to the built-in reference table when a font file is missing.
    pub use_reference_table: bool,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            use_reference_table: true,
        }
    }
}

impl FontOptions {
    /// Production font provider for these options.
    pub fn library(&self) -> FontLibrary {
        let library = FontLibrary::new(&self.font_dirs);
        if self.use_reference_table {
            library
        } else {
            library.with_reference(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    pub fonts: FontOptions,
    pub layout: LayoutOptions,
    pub codec: CodecOptions,
}

impl ComposeOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading options");
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
