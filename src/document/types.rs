//! Node struct types for the label document model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust API construction and JSON documents.
//!
//! Every node kind implements [`NodeMeta`] to declare its display label and
//! expose its [`Frame`] (identity plus authored geometry). Computed geometry
//! never lives here, see [`crate::layout::ComputedLayout`].

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{LbxError, Result};
use crate::units::parse_length;

/// Metadata and authored frame every node struct provides.
///
/// Implementing this trait is all a new node kind needs before the compiler
/// points at the remaining exhaustive matches in [`super::LayoutNode`].
pub trait NodeMeta {
    /// Kind label used for default display names (e.g. "Text", "Group").
    fn label() -> &'static str
    where
        Self: Sized;

    fn frame(&self) -> &Frame;

    fn frame_mut(&mut self) -> &mut Frame;

    /// Set an explicit authored position.
    fn at(mut self, x: f64, y: f64) -> Self
    where
        Self: Sized,
    {
        let frame = self.frame_mut();
        frame.x = Dimension::Pt(x);
        frame.y = Dimension::Pt(y);
        self
    }

    /// Set authored width and height.
    fn sized(mut self, width: Dimension, height: Dimension) -> Self
    where
        Self: Sized,
    {
        let frame = self.frame_mut();
        frame.width = width;
        frame.height = height;
        self
    }

    fn named(mut self, name: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.frame_mut().name = name.into();
        self
    }
}

// ============================================================================
// IDENTITY AND GEOMETRY
// ============================================================================

/// Stable node identity. Computed layout is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First four hex digits, used in default display names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..4].to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// An authored length: `auto` or an explicit value in points.
///
/// JSON accepts `"auto"`, a bare number (points) or a unit string such as
/// `"12mm"`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Pt(f64),
}

impl Dimension {
    pub fn explicit(self) -> Option<f64> {
        match self {
            Dimension::Auto => None,
            Dimension::Pt(v) => Some(v),
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Dimension::Auto)
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Dimension::Auto => serializer.serialize_str("auto"),
            Dimension::Pt(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DimensionValue {
            Number(f64),
            Text(String),
        }

        match DimensionValue::deserialize(deserializer)? {
            DimensionValue::Number(v) => Ok(Dimension::Pt(v)),
            DimensionValue::Text(s) if s.trim().eq_ignore_ascii_case("auto") => Ok(Dimension::Auto),
            DimensionValue::Text(s) => parse_length(&s)
                .map(Dimension::Pt)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid length '{s}'"))),
        }
    }
}

/// Identity, display name and authored geometry shared by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: Dimension,
    #[serde(default)]
    pub y: Dimension,
    #[serde(default)]
    pub width: Dimension,
    #[serde(default)]
    pub height: Dimension,
}

impl Frame {
    /// Fresh frame with a new id and a `"<Kind><4 hex>"` display name.
    pub fn new(label: &str) -> Self {
        let id = NodeId::new();
        Self {
            name: format!("{label}{}", id.short()),
            id,
            x: Dimension::Auto,
            y: Dimension::Auto,
            width: Dimension::Auto,
            height: Dimension::Auto,
        }
    }
}

/// Archive content of one object that the model does not own.
///
/// Attributes are keyed by element role (`"objectStyle"`, `"pen"`,
/// `"logFont"`, ...) and kept in document order. Child elements the model
/// has no type for are kept as raw XML under the role of their parent and
/// written back before the parent closes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passthrough {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<String, IndexMap<String, String>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    elements: IndexMap<String, Vec<String>>,
}

impl Passthrough {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.elements.is_empty()
    }

    pub fn get(&self, role: &str) -> Option<&IndexMap<String, String>> {
        self.attributes.get(role)
    }

    /// Store attributes for a role. Empty sets are not stored.
    pub fn insert(&mut self, role: impl Into<String>, attrs: IndexMap<String, String>) {
        if !attrs.is_empty() {
            self.attributes.entry(role.into()).or_default().extend(attrs);
        }
    }

    /// Store one attribute for a role.
    pub fn set(&mut self, role: impl Into<String>, name: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .entry(role.into())
            .or_default()
            .insert(name.into(), value.into());
    }

    /// Raw XML of unknown children under a role, in document order.
    pub fn elements(&self, role: &str) -> &[String] {
        self.elements.get(role).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn push_element(&mut self, role: impl Into<String>, xml: impl Into<String>) {
        self.elements.entry(role.into()).or_default().push(xml.into());
    }
}

// ============================================================================
// FONTS AND STYLE RUNS
// ============================================================================

/// Font of one style run. Immutable per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontInfo {
    pub family: String,
    /// Size in points.
    pub size: f64,
    /// Numeric weight class, 400 normal and 700 bold.
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    /// `#RRGGBB`
    pub color: String,
}

impl FontInfo {
    pub const WEIGHT_NORMAL: u16 = 400;
    pub const WEIGHT_BOLD: u16 = 700;

    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = Self::WEIGHT_BOLD;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            family: "Helsinki".into(),
            size: 12.0,
            weight: Self::WEIGHT_NORMAL,
            italic: false,
            underline: false,
            strikeout: false,
            color: "#000000".into(),
        }
    }
}

/// A contiguous character span of a [`Text`] sharing one font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRun {
    /// Length in characters (not bytes).
    pub len: usize,
    #[serde(default)]
    pub font: FontInfo,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

impl StyleRun {
    pub fn new(len: usize, font: FontInfo) -> Self {
        Self {
            len,
            font,
            extra: Passthrough::default(),
        }
    }

    /// Same font and same unmodeled attributes.
    pub fn same_style(&self, other: &StyleRun) -> bool {
        self.font == other.font && self.extra == other.extra
    }
}

// ============================================================================
// LEAVES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    /// Lines stretched to the frame width by the editor. Layout treats it as
    /// `Left`.
    Justify,
}

impl TextAlign {
    /// `horizontalAlignment` token.
    pub fn as_token(self) -> &'static str {
        match self {
            TextAlign::Left => "LEFT",
            TextAlign::Center => "CENTER",
            TextAlign::Right => "RIGHT",
            TextAlign::Justify => "JUSTIFY",
        }
    }

    /// Unknown tokens give `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "LEFT" => Some(TextAlign::Left),
            "CENTER" => Some(TextAlign::Center),
            "RIGHT" => Some(TextAlign::Right),
            "JUSTIFY" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Text leaf: content plus style runs covering it exactly.
///
/// The run list is private so the invariant "run lengths sum to the
/// character count" holds for every value built through this API. Edits go
/// through the methods in `document/edit.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawText", into = "RawText")]
pub struct Text {
    pub frame: Frame,
    pub(crate) content: String,
    pub(crate) runs: Vec<StyleRun>,
    pub align: TextAlign,
    pub vertical: bool,
    pub extra: Passthrough,
}

/// Serde form of [`Text`]. `font` is shorthand for a single run.
#[derive(Serialize, Deserialize)]
struct RawText {
    #[serde(flatten)]
    frame: Frame,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font: Option<FontInfo>,
    #[serde(default)]
    runs: Vec<StyleRun>,
    #[serde(default)]
    align: TextAlign,
    #[serde(default)]
    vertical: bool,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    extra: Passthrough,
}

impl TryFrom<RawText> for Text {
    type Error = LbxError;

    fn try_from(raw: RawText) -> Result<Self> {
        let runs = if raw.runs.is_empty() {
            vec![StyleRun::new(
                raw.content.chars().count(),
                raw.font.unwrap_or_default(),
            )]
        } else {
            raw.runs
        };
        let mut text = Text::from_runs(raw.content, runs)?;
        text.frame = raw.frame;
        text.align = raw.align;
        text.vertical = raw.vertical;
        text.extra = raw.extra;
        Ok(text)
    }
}

impl From<Text> for RawText {
    fn from(text: Text) -> Self {
        Self {
            frame: text.frame,
            content: text.content,
            font: None,
            runs: text.runs,
            align: text.align,
            vertical: text.vertical,
            extra: text.extra,
        }
    }
}

impl Text {
    /// Text in the default font.
    pub fn new(content: impl Into<String>) -> Self {
        Self::styled(content, FontInfo::default())
    }

    /// Text in a single font.
    pub fn styled(content: impl Into<String>, font: FontInfo) -> Self {
        let content = content.into();
        let len = content.chars().count();
        Self {
            frame: Frame::new(Self::label()),
            content,
            runs: vec![StyleRun::new(len, font)],
            align: TextAlign::default(),
            vertical: false,
            extra: Passthrough::default(),
        }
    }

    /// Text with explicit runs. Fails unless the runs cover the content exactly.
    pub fn from_runs(content: impl Into<String>, runs: Vec<StyleRun>) -> Result<Self> {
        let mut text = Self::new(String::new());
        text.content = content.into();
        text.runs = runs;
        text.validate()?;
        Ok(text)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn runs(&self) -> &[StyleRun] {
        &self.runs
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Font of the first run (the text-level font in the archive).
    pub fn primary_font(&self) -> Option<&FontInfo> {
        self.runs.first().map(|r| &r.font)
    }

    /// Character ranges of each run.
    pub fn run_spans(&self) -> impl Iterator<Item = (Range<usize>, &StyleRun)> {
        self.runs.iter().scan(0usize, |start, run| {
            let range = *start..*start + run.len;
            *start += run.len;
            Some((range, run))
        })
    }

    /// Check the run invariant: at least one run, lengths summing to the
    /// character count.
    pub fn validate(&self) -> Result<()> {
        if self.runs.is_empty() {
            return Err(LbxError::config(&self.frame.name, "text has no style runs"));
        }
        let total: usize = self.runs.iter().map(|r| r.len).sum();
        let chars = self.char_len();
        if total != chars {
            return Err(LbxError::config(
                &self.frame.name,
                format!("style runs cover {total} characters, text has {chars}"),
            ));
        }
        Ok(())
    }

    pub fn aligned(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// How an image is reduced to the printer's single ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// Threshold to black and white (line art, PNG sources)
    Binary,
    /// Error-diffusion dithering (photos)
    #[default]
    Dither,
}

impl ImageMode {
    /// PNG sources are treated as line art, anything else as a photo.
    pub fn for_source(source: &str) -> Self {
        if source.to_ascii_lowercase().ends_with(".png") {
            ImageMode::Binary
        } else {
            ImageMode::Dither
        }
    }

    /// (`effect`, `operationKind`) tokens the mode is written as.
    pub fn tokens(self) -> (&'static str, &'static str) {
        match self {
            ImageMode::Binary => ("NONE", "BINARY"),
            ImageMode::Dither => ("MONO", "ERRORDIFFUSION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub frame: Frame,
    /// Original source path or name.
    pub source: String,
    /// Archive entry holding the image data.
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub mode: ImageMode,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

impl Image {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let file_name = source
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            frame: Frame::new(Self::label()),
            mode: ImageMode::for_source(&source),
            source,
            file_name,
            extra: Passthrough::default(),
        }
    }
}

/// Barcode symbology. `Qr` covers QR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    #[default]
    Qr,
    Code39,
    Code128,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Itf,
    Codabar,
    DataMatrix,
    Pdf417,
}

impl Symbology {
    const PROTOCOLS: &[(Symbology, &'static str)] = &[
        (Symbology::Qr, "QRCODE"),
        (Symbology::Code39, "CODE39"),
        (Symbology::Code128, "CODE128"),
        (Symbology::Ean13, "EAN13"),
        (Symbology::Ean8, "EAN8"),
        (Symbology::UpcA, "UPCA"),
        (Symbology::UpcE, "UPCE"),
        (Symbology::Itf, "ITF25"),
        (Symbology::Codabar, "CODABAR"),
        (Symbology::DataMatrix, "DATAMATRIX"),
        (Symbology::Pdf417, "PDF417"),
    ];

    /// Protocol token used in the archive.
    pub fn protocol(self) -> &'static str {
        Self::PROTOCOLS
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, p)| *p)
            .unwrap_or("QRCODE")
    }

    pub fn from_protocol(token: &str) -> Option<Self> {
        Self::PROTOCOLS
            .iter()
            .find(|(_, p)| p.eq_ignore_ascii_case(token))
            .map(|(s, _)| *s)
    }
}

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    /// Percentage token used in the archive.
    pub fn as_level(self) -> &'static str {
        match self {
            ErrorCorrection::Low => "7%",
            ErrorCorrection::Medium => "15%",
            ErrorCorrection::Quartile => "25%",
            ErrorCorrection::High => "30%",
        }
    }

    pub fn from_level(level: &str) -> Option<Self> {
        match level.trim() {
            "7%" => Some(ErrorCorrection::Low),
            "15%" => Some(ErrorCorrection::Medium),
            "25%" => Some(ErrorCorrection::Quartile),
            "30%" => Some(ErrorCorrection::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    #[serde(flatten)]
    pub frame: Frame,
    pub content: String,
    #[serde(default)]
    pub symbology: Symbology,
    #[serde(default)]
    pub error_correction: ErrorCorrection,
    /// QR module size in points.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    #[serde(default)]
    pub human_readable: bool,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

fn default_cell_size() -> f64 {
    2.0
}

impl Barcode {
    pub fn new(content: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            frame: Frame::new(Self::label()),
            content: content.into(),
            symbology,
            error_correction: ErrorCorrection::default(),
            cell_size: default_cell_size(),
            human_readable: false,
            extra: Passthrough::default(),
        }
    }

    pub fn qr(content: impl Into<String>) -> Self {
        Self::new(content, Symbology::Qr)
    }
}

/// Pen style of an outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenStyle {
    #[default]
    InsideFrame,
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
}

impl PenStyle {
    const TOKENS: &[(PenStyle, &'static str)] = &[
        (PenStyle::InsideFrame, "INSIDEFRAME"),
        (PenStyle::Solid, "SOLID"),
        (PenStyle::Dash, "DASH"),
        (PenStyle::Dot, "DOT"),
        (PenStyle::DashDot, "DASHDOT"),
        (PenStyle::DashDotDot, "DASHDOTDOT"),
    ];

    /// Token used in the archive.
    pub fn as_token(self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, t)| *t)
            .unwrap_or("INSIDEFRAME")
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|(_, t)| t.eq_ignore_ascii_case(token.trim()))
            .map(|(s, _)| *s)
    }
}

/// Outline stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f64,
    #[serde(default = "default_black")]
    pub color: String,
    #[serde(default)]
    pub style: PenStyle,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 0.5,
            color: default_black(),
            style: PenStyle::default(),
        }
    }
}

fn default_black() -> String {
    "#000000".into()
}

fn default_thickness() -> f64 {
    0.5
}

/// Straight line from the top-left to the bottom-right of its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default = "default_black")]
    pub color: String,
    #[serde(default)]
    pub style: PenStyle,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

impl Line {
    pub fn horizontal(length: f64) -> Self {
        Self::new().sized(Dimension::Pt(length), Dimension::Pt(0.0))
    }

    pub fn vertical(length: f64) -> Self {
        Self::new().sized(Dimension::Pt(0.0), Dimension::Pt(length))
    }

    pub fn new() -> Self {
        Self {
            frame: Frame::new(Self::label()),
            thickness: default_thickness(),
            color: default_black(),
            style: PenStyle::default(),
            extra: Passthrough::default(),
        }
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default = "default_stroke")]
    pub stroke: Option<Stroke>,
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

fn default_stroke() -> Option<Stroke> {
    Some(Stroke::default())
}

impl Rect {
    pub fn new() -> Self {
        Self {
            frame: Frame::new(Self::label()),
            fill: None,
            stroke: default_stroke(),
            corner_radius: 0.0,
            extra: Passthrough::default(),
        }
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Row,
    Column,
    /// Row with the children in reverse order, still packed from the left.
    RowReverse,
    ColumnReverse,
}

impl Direction {
    /// Whether the main axis is horizontal.
    pub fn is_row(self) -> bool {
        matches!(self, Direction::Row | Direction::RowReverse)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Direction::RowReverse | Direction::ColumnReverse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Justify {
    #[default]
    #[serde(alias = "flex-start")]
    Start,
    Center,
    #[serde(alias = "flex-end")]
    End,
    #[serde(alias = "between")]
    SpaceBetween,
    #[serde(alias = "around")]
    SpaceAround,
    /// Equal extra space before, between and after. Places children the
    /// same way as `SpaceAround`.
    #[serde(alias = "evenly")]
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    #[default]
    #[serde(alias = "flex-start")]
    Start,
    Center,
    #[serde(alias = "flex-end")]
    End,
    Stretch,
}

fn invalid_value(kind: &str, value: &str, allowed: &str) -> LbxError {
    LbxError::config(kind, format!("invalid value '{value}', expected one of {allowed}"))
}

impl FromStr for Direction {
    type Err = LbxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "row" => Ok(Direction::Row),
            "column" => Ok(Direction::Column),
            "row-reverse" => Ok(Direction::RowReverse),
            "column-reverse" => Ok(Direction::ColumnReverse),
            other => Err(invalid_value(
                "direction",
                other,
                "row, column, row-reverse, column-reverse",
            )),
        }
    }
}

impl FromStr for Justify {
    type Err = LbxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "flex-start" => Ok(Justify::Start),
            "center" => Ok(Justify::Center),
            "end" | "flex-end" => Ok(Justify::End),
            "space-between" | "between" => Ok(Justify::SpaceBetween),
            "space-around" | "around" => Ok(Justify::SpaceAround),
            "space-evenly" | "evenly" => Ok(Justify::SpaceEvenly),
            other => Err(invalid_value(
                "justify",
                other,
                "start, center, end, space-between, space-around, space-evenly",
            )),
        }
    }
}

impl FromStr for Align {
    type Err = LbxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "flex-start" => Ok(Align::Start),
            "center" => Ok(Align::Center),
            "end" | "flex-end" => Ok(Align::End),
            "stretch" => Ok(Align::Stretch),
            other => Err(invalid_value("align", other, "start, center, end, stretch")),
        }
    }
}

/// Flex properties of a container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexStyle {
    pub direction: Direction,
    pub justify: Justify,
    pub align: Align,
    /// Space between consecutive children, in points.
    pub gap: f64,
    /// Uniform inset on all sides, in points.
    pub padding: f64,
    pub wrap: bool,
}

impl FlexStyle {
    pub fn row() -> Self {
        Self::default()
    }

    pub fn column() -> Self {
        Self {
            direction: Direction::Column,
            ..Self::default()
        }
    }
}

/// How a container places its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Arrangement {
    Flex(FlexStyle),
    /// Children keep their own page coordinates (groups read from an archive).
    Absolute,
}

impl Default for Arrangement {
    fn default() -> Self {
        Arrangement::Flex(FlexStyle::default())
    }
}

/// Visual styling of a group element.
///
/// `background` is written as `objectStyle backColor`. `#FFFFFF` is the
/// editor's "no background" value, so `Some("#FFFFFF")` reads back as
/// `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStyle {
    pub background: Option<String>,
    pub border: Option<Stroke>,
}

/// Styled container, emitted as its own element. Requires an explicit size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub arrangement: Arrangement,
    #[serde(default)]
    pub style: GroupStyle,
    #[serde(default)]
    pub children: Vec<super::LayoutNode>,
    #[serde(default, skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

impl Group {
    pub fn new(width: f64, height: f64, flex: FlexStyle) -> Self {
        Self {
            frame: Frame::new(Self::label())
                .with_size(Dimension::Pt(width), Dimension::Pt(height)),
            arrangement: Arrangement::Flex(flex),
            style: GroupStyle::default(),
            children: Vec::new(),
            extra: Passthrough::default(),
        }
    }

    pub fn child(mut self, node: impl Into<super::LayoutNode>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// Layout-only container. Emits no element, only its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub flex: FlexStyle,
    #[serde(default)]
    pub children: Vec<super::LayoutNode>,
}

impl Container {
    pub fn new(flex: FlexStyle) -> Self {
        Self {
            frame: Frame::new(Self::label()),
            flex,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, node: impl Into<super::LayoutNode>) -> Self {
        self.children.push(node.into());
        self
    }
}

impl Frame {
    fn with_size(mut self, width: Dimension, height: Dimension) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

macro_rules! impl_node_meta {
    ($($ty:ident => $label:literal),+ $(,)?) => {
        $(
            impl NodeMeta for $ty {
                fn label() -> &'static str {
                    $label
                }

                fn frame(&self) -> &Frame {
                    &self.frame
                }

                fn frame_mut(&mut self) -> &mut Frame {
                    &mut self.frame
                }
            }
        )+
    };
}

impl_node_meta! {
    Group => "Group",
    Container => "Container",
    Text => "Text",
    Image => "Image",
    Barcode => "Barcode",
    Line => "Line",
    Rect => "Rect",
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dimension_from_json() {
        let d: Vec<Dimension> = serde_json::from_str(r#"["auto", 12.5, "10pt", "1in"]"#).unwrap();
        assert_eq!(
            d,
            vec![
                Dimension::Auto,
                Dimension::Pt(12.5),
                Dimension::Pt(10.0),
                Dimension::Pt(72.0)
            ]
        );
        assert!(serde_json::from_str::<Dimension>(r#""wide""#).is_err());
    }

    #[test]
    fn test_default_name_uses_label_and_id() {
        let text = Text::new("hi");
        assert!(text.frame.name.starts_with("Text"));
        assert_eq!(text.frame.name.len(), 8);
        assert!(text.frame.name.ends_with(&text.frame.id.short()));
    }

    #[test]
    fn test_text_from_runs_rejects_mismatch() {
        let runs = vec![StyleRun::new(2, FontInfo::default())];
        assert!(Text::from_runs("abc", runs).is_err());
        let runs = vec![
            StyleRun::new(1, FontInfo::default()),
            StyleRun::new(2, FontInfo::default().bold()),
        ];
        assert!(Text::from_runs("abc", runs).is_ok());
    }

    #[test]
    fn test_run_lengths_count_characters() {
        let text = Text::new("héllo ✓");
        assert_eq!(text.runs()[0].len, 7);
    }

    #[test]
    fn test_run_spans() {
        let runs = vec![
            StyleRun::new(2, FontInfo::default()),
            StyleRun::new(3, FontInfo::default().bold()),
        ];
        let text = Text::from_runs("ab\ncd", runs).unwrap();
        let spans: Vec<_> = text.run_spans().map(|(r, _)| r).collect();
        assert_eq!(spans, vec![0..2, 2..5]);
    }

    #[test]
    fn test_text_json_font_shorthand() {
        let text: Text = serde_json::from_str(
            r#"{"content": "Hi", "font": {"family": "Arial", "size": 8, "weight": 700}}"#,
        )
        .unwrap();
        assert_eq!(text.runs().len(), 1);
        assert_eq!(text.runs()[0].len, 2);
        assert_eq!(text.runs()[0].font.family, "Arial");
        assert!(text.runs()[0].font.is_bold());
    }

    #[test]
    fn test_text_json_bad_runs_rejected() {
        let result: std::result::Result<Text, _> =
            serde_json::from_str(r#"{"content": "Hi", "runs": [{"len": 5}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_from_str() {
        assert_eq!("space-between".parse::<Justify>().unwrap(), Justify::SpaceBetween);
        assert_eq!("around".parse::<Justify>().unwrap(), Justify::SpaceAround);
        assert_eq!("Column".parse::<Direction>().unwrap(), Direction::Column);
        let err = "diagonal".parse::<Direction>().unwrap_err();
        assert!(matches!(err, LbxError::Configuration { .. }));
        assert!("baseline".parse::<Align>().is_err());
    }

    #[test]
    fn test_reverse_directions_and_evenly() {
        assert_eq!("row-reverse".parse::<Direction>().unwrap(), Direction::RowReverse);
        let d: Direction = serde_json::from_str(r#""column-reverse""#).unwrap();
        assert_eq!(d, Direction::ColumnReverse);
        assert!(!d.is_row() && d.is_reversed());
        assert!(Direction::RowReverse.is_row());
        assert_eq!("evenly".parse::<Justify>().unwrap(), Justify::SpaceEvenly);
        let j: Justify = serde_json::from_str(r#""space-evenly""#).unwrap();
        assert_eq!(j, Justify::SpaceEvenly);
    }

    #[test]
    fn test_pen_style_tokens() {
        assert_eq!(PenStyle::from_token("dot"), Some(PenStyle::Dot));
        assert_eq!(PenStyle::DashDotDot.as_token(), "DASHDOTDOT");
        assert_eq!(PenStyle::from_token("NULL"), None);
        let stroke: Stroke = serde_json::from_str(r#"{"width": 1}"#).unwrap();
        assert_eq!(stroke.style, PenStyle::InsideFrame);
    }

    #[test]
    fn test_passthrough_attributes_and_elements() {
        let mut extra = Passthrough::default();
        assert!(extra.is_empty());
        extra.set("pen", "dash", "4");
        extra.push_element("objectStyle", "<x:a xmlns:x=\"urn:x\"/>");
        assert_eq!(extra.get("pen").unwrap()["dash"], "4");
        assert_eq!(extra.elements("objectStyle").len(), 1);
        assert!(extra.elements("pen").is_empty());
        let json = serde_json::to_string(&extra).unwrap();
        assert_eq!(serde_json::from_str::<Passthrough>(&json).unwrap(), extra);
    }

    #[test]
    fn test_enum_json_aliases() {
        let j: Justify = serde_json::from_str(r#""between""#).unwrap();
        assert_eq!(j, Justify::SpaceBetween);
        assert!(serde_json::from_str::<Align>(r#""middle""#).is_err());
    }

    #[test]
    fn test_symbology_protocol_tokens() {
        assert_eq!(Symbology::Qr.protocol(), "QRCODE");
        assert_eq!(Symbology::from_protocol("code128"), Some(Symbology::Code128));
        assert_eq!(Symbology::from_protocol("AZTEC"), None);
    }

    #[test]
    fn test_image_mode_from_extension() {
        assert_eq!(Image::new("logo.PNG").mode, ImageMode::Binary);
        let photo = Image::new("/tmp/photos/part.jpg");
        assert_eq!(photo.mode, ImageMode::Dither);
        assert_eq!(photo.file_name, "part.jpg");
    }
}
