//! Font files on disk, matched by file name.
//!
//! Files are indexed by their stem at construction (`ArialBold.ttf`,
//! `Helsinki-Narrow-Italic.otf`) and parsed with ab_glyph on first use.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ab_glyph::FontArc;
use log::{debug, warn};

use super::{Face, FaceMatch, FontMetricsProvider, FontQuery, ReferenceTable, normalize_family};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Weight words found in font file names.
const WEIGHT_WORDS: &[(&str, u16)] = &[
    ("hairline", 100),
    ("thin", 100),
    ("extralight", 200),
    ("ultralight", 200),
    ("light", 300),
    ("regular", 400),
    ("normal", 400),
    ("book", 400),
    ("roman", 400),
    ("medium", 500),
    ("semibold", 600),
    ("demibold", 600),
    ("extrabold", 800),
    ("ultrabold", 800),
    ("bold", 700),
    ("black", 900),
    ("heavy", 900),
];

/// Vendor suffixes that are not part of the family name.
const NOISE_WORDS: &[&str] = &["mt", "ps"];

/// Split a file stem into (family key, weight, italic).
///
/// `"Arial-BoldItalicMT"` gives `("arial", 700, true)`, `"Helsinki Narrow"`
/// gives `("helsinkinarrow", 400, false)`.
pub fn style_from_stem(stem: &str) -> (String, u16, bool) {
    let mut weight = 400;
    let mut italic = false;
    let mut family = Vec::new();

    let words: Vec<String> = split_words(stem).iter().map(|w| w.to_lowercase()).collect();
    let mut i = 0;
    while i < words.len() {
        let mut word = words[i].clone();
        i += 1;
        // "Extra" + "Light" from CamelCase stems
        if let Some(next) = words.get(i) {
            let joined = format!("{word}{next}");
            if WEIGHT_WORDS.iter().any(|(w, _)| *w == joined) {
                word = joined;
                i += 1;
            }
        }
        for suffix in ["italic", "oblique"] {
            if let Some(rest) = word.strip_suffix(suffix) {
                italic = true;
                word = rest.to_string();
            }
        }
        if word.is_empty() || NOISE_WORDS.contains(&word.as_str()) {
            continue;
        }
        match WEIGHT_WORDS.iter().find(|(w, _)| *w == word) {
            Some(&(_, w)) => weight = w,
            None => family.push(word),
        }
    }
    (normalize_family(&family.concat()), weight, italic)
}

/// Split on separators and lower-to-upper case changes.
fn split_words(stem: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in stem.chars() {
        if matches!(ch, '-' | '_' | ' ' | '.') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

struct Entry {
    family: String,
    weight: u16,
    italic: bool,
    path: PathBuf,
    face: OnceLock<Option<Arc<Face>>>,
}

impl Entry {
    fn load(&self) -> Option<Arc<Face>> {
        self.face
            .get_or_init(|| {
                let bytes = match fs::read(&self.path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = self.path.display().to_string(), error = e.to_string(); "Cannot read font file");
                        return None;
                    }
                };
                match FontArc::try_from_vec(bytes) {
                    Ok(font) => {
                        debug!(path = self.path.display().to_string(); "Loaded font file");
                        Some(Arc::new(Face::new(font)))
                    }
                    Err(_) => {
                        warn!(path = self.path.display().to_string(); "Skipping unparsable font file");
                        None
                    }
                }
            })
            .clone()
    }

    /// Distance from the query. An italic mismatch outweighs any weight gap.
    fn distance(&self, query: &FontQuery) -> u32 {
        let weight = u32::from(self.weight.abs_diff(query.weight));
        let slant = if self.italic == query.italic { 0 } else { 10_000 };
        weight + slant
    }
}

/// Production provider: font files from a list of directories plus the
/// built-in reference table.
pub struct FontLibrary {
    entries: Vec<Entry>,
    reference: Option<ReferenceTable>,
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("fonts", &self.entries.len())
            .field("reference", &self.reference.is_some())
            .finish()
    }
}

impl FontLibrary {
    /// Index the font files under `dirs` (recursively). Missing directories
    /// are skipped.
    pub fn new<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut entries = Vec::new();
        for dir in dirs {
            scan_dir(dir.as_ref(), &mut entries);
        }
        debug!(fonts = entries.len(); "Indexed font files");
        Self {
            entries,
            reference: Some(ReferenceTable::builtin()),
        }
    }

    /// Replace or drop the calibration table.
    pub fn with_reference(mut self, table: Option<ReferenceTable>) -> Self {
        self.reference = table;
        self
    }

    /// Number of indexed font files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn scan_dir(dir: &Path, entries: &mut Vec<Entry>) {
    let Ok(read) = fs::read_dir(dir) else {
        debug!(dir = dir.display().to_string(); "Font directory not readable");
        return;
    };
    for item in read.flatten() {
        let path = item.path();
        if path.is_dir() {
            scan_dir(&path, entries);
            continue;
        }
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_font {
            let (family, weight, italic) = style_from_stem(stem);
            entries.push(Entry {
                family,
                weight,
                italic,
                path,
                face: OnceLock::new(),
            });
        }
    }
}

impl FontMetricsProvider for FontLibrary {
    fn face(&self, query: &FontQuery) -> Option<FaceMatch> {
        let family = query.family_key();
        let mut candidates: Vec<&Entry> = self.entries.iter().filter(|e| e.family == family).collect();
        candidates.sort_by_key(|e| e.distance(query));
        candidates.into_iter().find_map(|entry| {
            let face = entry.load()?;
            Some(FaceMatch {
                face,
                exact: entry.distance(query) == 0,
            })
        })
    }

    fn reference(&self) -> Option<&ReferenceTable> {
        self.reference.as_ref()
    }
}
