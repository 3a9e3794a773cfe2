//! # Label Document Model
//!
//! A single type hierarchy that is both the Rust API and the JSON form of a
//! label. A [`LabelDocument`] holds the paper and background geometry, the
//! printer metadata and an ordered tree of [`LayoutNode`]s.
//!
//! ```ignore
//! use lbx_compose::document::*;
//!
//! // Rust construction
//! let mut doc = LabelDocument::for_tape(TapeWidth::Mm12, LabelLength::Auto);
//! doc.objects.push(
//!     Container::new(FlexStyle::column())
//!         .child(Text::new("Hello"))
//!         .child(Text::styled("World", FontInfo::new("Arial", 8.0).bold()))
//!         .into(),
//! );
//!
//! // JSON deserialization
//! let doc: LabelDocument = serde_json::from_str(
//!     r#"{"objects":[{"type":"text","content":"Hello"}]}"#,
//! ).unwrap();
//! ```
//!
//! Only authored values live here. Layout results are a separate
//! [`crate::layout::ComputedLayout`] keyed by [`NodeId`].

pub mod types;

mod edit;
mod tape;

pub use tape::{LabelLength, TapePreset, TapeWidth};
pub use types::*;

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{LbxError, Result};

// ============================================================================
// PAGE GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_token(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

/// Target printer. Carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterMeta {
    pub id: String,
    pub name: String,
}

impl Default for PrinterMeta {
    fn default() -> Self {
        Self {
            id: "30256".into(),
            name: "Brother PT-P710BT".into(),
        }
    }
}

/// Paper (tape) geometry in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paper {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub orientation: Orientation,
    pub auto_length: bool,
    /// Tape format code.
    pub format: u32,
    pub paper_color: String,
    pub paper_ink: String,
    pub printer: PrinterMeta,
}

impl Default for Paper {
    fn default() -> Self {
        TapeWidth::Mm12.paper(LabelLength::Auto)
    }
}

/// Printable band inside the paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub back_color: String,
}

impl Default for Background {
    fn default() -> Self {
        TapeWidth::Mm12.background(LabelLength::Auto)
    }
}

/// Document properties written to `prop.xml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub title: String,
    pub subject: String,
    pub creator: String,
    pub keywords: String,
    pub description: String,
    /// Creation time. `None` means "now" when the archive is written.
    pub created: Option<DateTime<Utc>>,
    /// Last modification. `None` means "now" when the archive is written.
    pub modified: Option<DateTime<Utc>>,
}

/// An archive entry carried through untouched (image data and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub data: Vec<u8>,
}

// ============================================================================
// NODES
// ============================================================================

macro_rules! define_nodes {
    ($($variant:ident($inner:ty)),+ $(,)?) => {
        /// A node of the label tree.
        ///
        /// The `#[serde(tag = "type")]` attribute enables JSON like
        /// `{"type": "text", "content": "Hello"}`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "snake_case")]
        pub enum LayoutNode {
            $($variant($inner),)+
        }

        impl LayoutNode {
            pub fn frame(&self) -> &Frame {
                match self { $(LayoutNode::$variant(n) => n.frame(),)+ }
            }

            pub fn frame_mut(&mut self) -> &mut Frame {
                match self { $(LayoutNode::$variant(n) => n.frame_mut(),)+ }
            }

            /// Kind label (from [`NodeMeta::label`]).
            pub fn label(&self) -> &'static str {
                match self { $(LayoutNode::$variant(_) => <$inner>::label(),)+ }
            }
        }

        $(
            impl From<$inner> for LayoutNode {
                fn from(node: $inner) -> Self {
                    LayoutNode::$variant(node)
                }
            }
        )+
    };
}

define_nodes! {
    Group(Group),
    Container(Container),
    Text(Text),
    Image(Image),
    Barcode(Barcode),
    Line(Line),
    Rect(Rect),
}

impl LayoutNode {
    pub fn id(&self) -> NodeId {
        self.frame().id
    }

    /// Authored display name, or `"<Kind><4 hex>"` when none was given.
    pub fn display_name(&self) -> String {
        let frame = self.frame();
        if frame.name.is_empty() {
            format!("{}{}", self.label(), frame.id.short())
        } else {
            frame.name.clone()
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Group(g) => &g.children,
            LayoutNode::Container(c) => &c.children,
            _ => &[],
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, LayoutNode::Group(_) | LayoutNode::Container(_))
    }

    /// Copy of this subtree with a new id on every node. A plain `clone`
    /// keeps the ids, and layout rejects a tree holding the same id twice.
    pub fn fresh_copy(&self) -> LayoutNode {
        let mut copy = self.clone();
        copy.renew_ids();
        copy
    }

    fn renew_ids(&mut self) {
        self.frame_mut().id = NodeId::new();
        let children = match self {
            LayoutNode::Group(g) => &mut g.children,
            LayoutNode::Container(c) => &mut c.children,
            _ => return,
        };
        for child in children {
            child.renew_ids();
        }
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Root of a label: page geometry, printer metadata and top-level objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelDocument {
    pub paper: Paper,
    pub background: Background,
    pub properties: Properties,
    pub objects: Vec<LayoutNode>,
    /// Archive entries other than the label and property descriptions.
    pub resources: Vec<Resource>,
    /// Unmodeled attributes of the document-level elements.
    #[serde(skip_serializing_if = "Passthrough::is_empty")]
    pub extra: Passthrough,
}

impl Default for LabelDocument {
    fn default() -> Self {
        Self::for_tape(TapeWidth::Mm12, LabelLength::Auto)
    }
}

impl LabelDocument {
    /// Document sized for a tape width.
    pub fn for_tape(tape: TapeWidth, length: LabelLength) -> Self {
        Self {
            paper: tape.paper(length),
            background: tape.background(length),
            properties: Properties::default(),
            objects: Vec::new(),
            resources: Vec::new(),
            extra: Passthrough::default(),
        }
    }

    pub fn push(&mut self, node: impl Into<LayoutNode>) -> NodeId {
        let node = node.into();
        let id = node.id();
        self.objects.push(node);
        id
    }

    /// Every node in depth-first document order.
    pub fn nodes(&self) -> Vec<&LayoutNode> {
        fn visit<'a>(nodes: &'a [LayoutNode], out: &mut Vec<&'a LayoutNode>) {
            for node in nodes {
                out.push(node);
                visit(node.children(), out);
            }
        }
        let mut out = Vec::new();
        visit(&self.objects, &mut out);
        out
    }

    pub fn find(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes().into_iter().find(|n| n.id() == id)
    }

    /// Apply `f` to every text leaf in the tree.
    pub fn for_each_text_mut(&mut self, mut f: impl FnMut(&mut Text)) {
        fn visit(nodes: &mut [LayoutNode], f: &mut impl FnMut(&mut Text)) {
            for node in nodes {
                match node {
                    LayoutNode::Text(t) => f(t),
                    LayoutNode::Group(g) => visit(&mut g.children, f),
                    LayoutNode::Container(c) => visit(&mut c.children, f),
                    LayoutNode::Image(_)
                    | LayoutNode::Barcode(_)
                    | LayoutNode::Line(_)
                    | LayoutNode::Rect(_) => {}
                }
            }
        }
        visit(&mut self.objects, &mut f);
    }

    /// Find and replace across every text leaf. Returns the number of
    /// replacements made.
    pub fn replace_text(&mut self, find: &str, replacement: &str, ignore_case: bool) -> usize {
        let mut count = 0;
        self.for_each_text_mut(|t| count += t.replace(find, replacement, ignore_case));
        count
    }

    /// Regex find and replace across every text leaf. Fails on an invalid
    /// pattern, before any text is touched.
    pub fn replace_text_regex(&mut self, pattern: &str, replacement: &str, ignore_case: bool) -> Result<usize> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| LbxError::InvalidEdit(format!("invalid pattern '{pattern}': {e}")))?;
        let mut count = 0;
        self.for_each_text_mut(|t| count += t.replace_regex(&regex, replacement));
        Ok(count)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}
