//! Reference table of text extents measured in the label editor.
//!
//! Rows are `(text, font_name, size, weight, italic, width, height)` in
//! points. The built-in table is `data/font_reference.csv`.

use crate::error::{LbxError, Result};

use super::{FaceMatch, FontMetricsProvider, FontQuery, normalize_family};

const BUILTIN_CSV: &str = include_str!("../../data/font_reference.csv");

/// Share of a reference line height treated as ascent.
pub(crate) const ASCENT_SHARE: f64 = 0.8;

/// Sizes closer than this are the same size.
const SIZE_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub text: String,
    pub family: String,
    pub size: f64,
    pub weight: u16,
    pub italic: bool,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        match Self::parse(BUILTIN_CSV) {
            Ok(table) => table,
            Err(e) => {
                log::error!(error = e.to_string(); "Built-in font reference table is malformed");
                Self::default()
            }
        }
    }

    /// Parse CSV with a header line. Weight is `normal`, `bold` or a number.
    /// Fields may be double-quoted, with `""` for a literal quote.
    pub fn parse(csv: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (index, line) in csv.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let path = format!("font_reference.csv:{}", index + 1);
            let owned = split_fields(line).ok_or_else(|| LbxError::schema(&path, "unterminated quoted field"))?;
            let fields: Vec<&str> = owned.iter().map(String::as_str).collect();
            let [text, family, size, weight, italic, width, height] = fields[..] else {
                return Err(LbxError::schema(path, format!("expected 7 fields, found {}", fields.len())));
            };
            let number = |name: &str, value: &str| {
                value
                    .parse::<f64>()
                    .map_err(|_| LbxError::schema(&path, format!("invalid {name} '{value}'")))
            };
            let weight = match weight {
                "normal" => 400,
                "bold" => 700,
                other => other
                    .parse()
                    .map_err(|_| LbxError::schema(&path, format!("invalid weight '{other}'")))?,
            };
            rows.push(ReferenceRow {
                text: text.to_string(),
                family: family.to_string(),
                size: number("size", size)?,
                weight,
                italic: italic.eq_ignore_ascii_case("true"),
                width: number("width", width)?,
                height: number("height", height)?,
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    /// Rows of one face, with fitted em metrics, or `None` when the table
    /// never measured that face.
    pub fn face(&self, query: &FontQuery) -> Option<ReferenceFace> {
        let family = query.family_key();
        let bold = query.weight >= 600;
        let rows: Vec<ReferenceRow> = self
            .rows
            .iter()
            .filter(|r| {
                normalize_family(&r.family) == family
                    && (r.weight >= 600) == bold
                    && r.italic == query.italic
            })
            .cloned()
            .collect();
        if rows.is_empty() {
            return None;
        }

        let count = rows.len() as f64;
        let line_height_em = rows.iter().map(|r| r.height / r.size).sum::<f64>() / count;
        let (width_sum, em_sum) = rows.iter().fold((0.0, 0.0), |(w, e), r| {
            (w + r.width, e + r.text.chars().count() as f64 * r.size)
        });
        let advance_em = if em_sum > 0.0 { width_sum / em_sum } else { 0.6 };

        Some(ReferenceFace {
            rows,
            advance_em,
            line_height_em,
        })
    }
}

/// Split one CSV line. Unquoted fields are trimmed, quoted ones kept
/// verbatim. `None` for an unterminated quote.
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
        let mut field = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next()? {
                    '"' if chars.next_if_eq(&'"').is_some() => field.push('"'),
                    '"' => break,
                    c => field.push(c),
                }
            }
            // Anything between the closing quote and the comma is dropped.
            while chars.next_if(|c| *c != ',').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                field.push(c);
            }
            field = field.trim().to_string();
        }
        fields.push(field);
        if chars.next().is_none() {
            return Some(fields);
        }
    }
}

/// Reference rows of one face plus metrics fitted over them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFace {
    rows: Vec<ReferenceRow>,
    /// Mean width per character per point of size.
    pub advance_em: f64,
    /// Mean line height per point of size.
    pub line_height_em: f64,
}

impl ReferenceFace {
    /// Measured row for exactly this string at this size.
    pub fn lookup(&self, text: &str, size: f64) -> Option<&ReferenceRow> {
        self.rows
            .iter()
            .find(|r| r.text == text && (r.size - size).abs() <= SIZE_TOLERANCE)
    }

    /// Width of a string the table has measured at some size.
    ///
    /// Exact at measured sizes. In between, the width-per-point ratio is
    /// interpolated, outside it is held at the nearest measurement.
    pub fn string_width(&self, text: &str, size: f64) -> Option<f64> {
        if let Some(row) = self.lookup(text, size) {
            return Some(row.width);
        }
        let samples: Vec<(f64, f64)> = self
            .rows
            .iter()
            .filter(|r| r.text == text)
            .map(|r| (r.size, r.width))
            .collect();
        interpolate(samples, size)
    }

    /// Line height at this size, measured or interpolated.
    pub fn line_height(&self, size: f64) -> f64 {
        let samples: Vec<(f64, f64)> = self.rows.iter().map(|r| (r.size, r.height)).collect();
        interpolate(samples, size).unwrap_or(self.line_height_em * size)
    }
}

/// Interpolate `value / size` between measured sizes and scale back.
fn interpolate(mut samples: Vec<(f64, f64)>, size: f64) -> Option<f64> {
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    samples.dedup_by(|a, b| (a.0 - b.0).abs() <= SIZE_TOLERANCE);
    let ratio = |(s, v): (f64, f64)| v / s;
    let first = *samples.first()?;
    let last = *samples.last()?;
    if let Some(exact) = samples.iter().find(|(s, _)| (s - size).abs() <= SIZE_TOLERANCE) {
        return Some(exact.1);
    }
    if size <= first.0 {
        return Some(ratio(first) * size);
    }
    if size >= last.0 {
        return Some(ratio(last) * size);
    }
    let upper = samples.iter().position(|(s, _)| *s > size)?;
    let (lo, hi) = (samples[upper - 1], samples[upper]);
    let t = (size - lo.0) / (hi.0 - lo.0);
    Some((ratio(lo) + (ratio(hi) - ratio(lo)) * t) * size)
}

/// Deterministic provider backed only by the reference table.
///
/// Never finds a font file, so every lookup lands on the reference or
/// heuristic tier. Used for tests and for machines without the editor's fonts.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMetrics {
    table: ReferenceTable,
}

impl ReferenceMetrics {
    pub fn new(table: ReferenceTable) -> Self {
        Self { table }
    }

    pub fn builtin() -> Self {
        Self::new(ReferenceTable::builtin())
    }
}

impl FontMetricsProvider for ReferenceMetrics {
    fn face(&self, _query: &FontQuery) -> Option<FaceMatch> {
        None
    }

    fn reference(&self) -> Option<&ReferenceTable> {
        Some(&self.table)
    }
}
