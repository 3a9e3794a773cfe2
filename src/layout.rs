//! # Flex Layout Engine
//!
//! Turns the authored tree into page coordinates. The result is a separate
//! [`ComputedLayout`] keyed by [`NodeId`], the document is never touched.
//!
//! ## Passes
//!
//! 1. **Measure** (bottom-up, memoized): a node's intrinsic size is its
//!    authored size where explicit. Auto text is measured with the
//!    [`TextCalculator`], other leaves fall back to fixed defaults, and an
//!    auto [`Container`] shrinks to fit its children.
//! 2. **Place** (top-down): each container splits its children into lines,
//!    distributes leftover main-axis space (`justify`) and positions every
//!    child within its line (`align`).
//!
//! ```text
//! ┌ padding ─────────────────────────────┐
//! │ ┌─────┐ gap ┌──────┐ gap ┌───┐       │  line 0
//! │ └─────┘     └──────┘     └───┘       │
//! │ ┌────────┐ gap ┌────┐                │  line 1 (wrap)
//! │ └────────┘     └────┘                │
//! └──────────────────────────────────────┘
//! ```
//!
//! Top-level objects are placed absolutely; auto positions resolve to the
//! printable band's origin.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::document::{
    Align, Arrangement, Dimension, Direction, FlexStyle, FontInfo, Justify, LabelDocument, LayoutNode,
    NodeId,
};
use crate::error::{LbxError, Result, Warning};
use crate::metrics::Confidence;
use crate::text::TextCalculator;

/// Size of a leaf authored without one: (width, height) in points.
pub const DEFAULT_IMAGE_SIZE: (f64, f64) = (30.0, 30.0);
pub const DEFAULT_BARCODE_SIZE: (f64, f64) = (30.0, 30.0);
pub const DEFAULT_LINE_SIZE: (f64, f64) = (30.0, 0.5);
pub const DEFAULT_RECT_SIZE: (f64, f64) = (30.0, 30.0);

/// Resolved page geometry of one node, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComputedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ComputedBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Output of one layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedLayout {
    boxes: HashMap<NodeId, ComputedBox>,
    lines: HashMap<NodeId, usize>,
    warnings: Vec<Warning>,
}

impl ComputedLayout {
    pub fn get(&self, id: NodeId) -> Option<&ComputedBox> {
        self.boxes.get(&id)
    }

    /// Wrap line a flex child was placed on (0 for the first line).
    pub fn line_of(&self, id: NodeId) -> Option<usize> {
        self.lines.get(&id).copied()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &ComputedBox)> {
        self.boxes.iter()
    }
}

/// Lay out every object of `doc`.
///
/// Fails with a configuration error (naming the node) for a group without
/// an explicit size, a wrapping container without an explicit main-axis
/// size, a negative gap or padding, a text leaf breaking the run
/// invariant, or a node id used twice in the tree.
pub fn layout(doc: &LabelDocument, calc: &TextCalculator) -> Result<ComputedLayout> {
    check_unique_ids(doc)?;
    let mut engine = Engine::new(calc);
    let origin = (doc.background.x, doc.background.y);
    for node in &doc.objects {
        let (width, height) = engine.measure(node)?;
        let frame = node.frame();
        let x = frame.x.explicit().unwrap_or(origin.0);
        let y = frame.y.explicit().unwrap_or(origin.1);
        engine.place(node, ComputedBox::new(x, y, width, height))?;
    }
    debug!(nodes = engine.out.boxes.len(), warnings = engine.out.warnings.len(); "Layout complete");
    Ok(engine.out)
}

// ============================================================================
// AXES
// ============================================================================

/// (main, cross) view of a (width, height) pair.
fn to_axes(direction: Direction, (width, height): (f64, f64)) -> (f64, f64) {
    if direction.is_row() { (width, height) } else { (height, width) }
}

fn from_axes(direction: Direction, (main, cross): (f64, f64)) -> (f64, f64) {
    // The swap is its own inverse.
    to_axes(direction, (main, cross))
}

/// Authored (main, cross) dimensions of a frame.
fn authored_axes(direction: Direction, width: Dimension, height: Dimension) -> (Dimension, Dimension) {
    if direction.is_row() { (width, height) } else { (height, width) }
}

/// Children in placement order. Reversed directions still pack from the
/// leading edge, last child first.
fn in_flow_order(direction: Direction, children: &[LayoutNode]) -> Vec<&LayoutNode> {
    if direction.is_reversed() {
        children.iter().rev().collect()
    } else {
        children.iter().collect()
    }
}

/// Greedy line breaking. Returns index ranges into `mains`.
fn break_lines(mains: &[f64], gap: f64, available: f64, wrap: bool) -> Vec<std::ops::Range<usize>> {
    if mains.is_empty() {
        return Vec::new();
    }
    if !wrap {
        return vec![0..mains.len()];
    }
    let mut lines = Vec::new();
    let mut start = 0;
    let mut extent = 0.0;
    for (i, &main) in mains.iter().enumerate() {
        if i > start && extent + gap + main > available {
            lines.push(start..i);
            start = i;
            extent = main;
        } else if i == start {
            extent = main;
        } else {
            extent += gap + main;
        }
    }
    lines.push(start..mains.len());
    lines
}

/// Leading offset and spacing between children for one line.
fn justify_line(justify: Justify, leftover: f64, count: usize, gap: f64) -> (f64, f64) {
    match justify {
        Justify::Start => (0.0, gap),
        Justify::End => (leftover, gap),
        Justify::Center => (leftover / 2.0, gap),
        Justify::SpaceBetween if count > 1 && leftover > 0.0 => (0.0, gap + leftover / (count - 1) as f64),
        Justify::SpaceAround | Justify::SpaceEvenly if leftover > 0.0 => {
            let share = leftover / (count + 1) as f64;
            (share, gap + share)
        }
        Justify::SpaceBetween | Justify::SpaceAround | Justify::SpaceEvenly => (0.0, gap),
    }
}

// ============================================================================
// ENGINE
// ============================================================================

struct Engine<'a, 'c> {
    calc: &'a TextCalculator<'c>,
    measured: HashMap<NodeId, (f64, f64)>,
    out: ComputedLayout,
}

impl<'a, 'c> Engine<'a, 'c> {
    fn new(calc: &'a TextCalculator<'c>) -> Self {
        Self {
            calc,
            measured: HashMap::new(),
            out: ComputedLayout::default(),
        }
    }

    /// Intrinsic (width, height) of a node.
    fn measure(&mut self, node: &LayoutNode) -> Result<(f64, f64)> {
        let id = node.id();
        if let Some(&size) = self.measured.get(&id) {
            return Ok(size);
        }
        let frame = node.frame();
        let explicit = |default: (f64, f64)| {
            (
                frame.width.explicit().unwrap_or(default.0),
                frame.height.explicit().unwrap_or(default.1),
            )
        };

        let size = match node {
            LayoutNode::Text(text) => {
                text.validate()
                    .map_err(|e| rename_node(e, node.display_name()))?;
                if frame.width.is_auto() || frame.height.is_auto() {
                    let extent = self.calc.measure_text(text);
                    if extent.confidence < Confidence::Exact {
                        let family = text
                            .runs()
                            .get(extent.weakest_run)
                            .map(|r| r.font.family.clone())
                            .unwrap_or_else(|| FontInfo::default().family);
                        self.degraded(node, family, extent.confidence);
                    }
                    explicit((extent.width, extent.height))
                } else {
                    explicit((0.0, 0.0))
                }
            }
            LayoutNode::Image(_) => explicit(DEFAULT_IMAGE_SIZE),
            LayoutNode::Barcode(_) => explicit(DEFAULT_BARCODE_SIZE),
            LayoutNode::Line(_) => explicit(DEFAULT_LINE_SIZE),
            LayoutNode::Rect(_) => explicit(DEFAULT_RECT_SIZE),
            LayoutNode::Group(group) => {
                let (Some(width), Some(height)) = (frame.width.explicit(), frame.height.explicit()) else {
                    return Err(LbxError::config(
                        node.display_name(),
                        "a group needs an explicit width and height",
                    ));
                };
                if let Arrangement::Flex(flex) = &group.arrangement {
                    check_flex(node, flex)?;
                }
                for child in &group.children {
                    self.measure(child)?;
                }
                (width, height)
            }
            LayoutNode::Container(container) => {
                check_flex(node, &container.flex)?;
                self.measure_container(node, &container.flex, &container.children)?
            }
        };

        trace!(node = node.display_name(), width = size.0, height = size.1; "Measured node");
        self.measured.insert(id, size);
        Ok(size)
    }

    /// Shrink-to-fit size of a container on its auto axes.
    fn measure_container(&mut self, node: &LayoutNode, flex: &FlexStyle, children: &[LayoutNode]) -> Result<(f64, f64)> {
        let frame = node.frame();
        let (main_dim, cross_dim) = authored_axes(flex.direction, frame.width, frame.height);
        if flex.wrap && main_dim.is_auto() {
            let axis = if flex.direction.is_row() { "width" } else { "height" };
            return Err(LbxError::config(
                node.display_name(),
                format!("a wrapping container needs an explicit {axis}, its lines depend on it"),
            ));
        }

        let mut sizes = Vec::with_capacity(children.len());
        for child in in_flow_order(flex.direction, children) {
            sizes.push(to_axes(flex.direction, self.measure(child)?));
        }
        let mains: Vec<f64> = sizes.iter().map(|s| s.0).collect();
        let inset = 2.0 * flex.padding;

        let main = match main_dim.explicit() {
            Some(main) => main,
            None => {
                let gaps = flex.gap * children.len().saturating_sub(1) as f64;
                mains.iter().sum::<f64>() + gaps + inset
            }
        };
        let cross = match cross_dim.explicit() {
            Some(cross) => cross,
            None => {
                let lines = break_lines(&mains, flex.gap, main - inset, flex.wrap);
                let content: f64 = lines
                    .iter()
                    .map(|range| sizes[range.clone()].iter().map(|s| s.1).fold(0.0, f64::max))
                    .sum();
                content + inset
            }
        };
        Ok(from_axes(flex.direction, (main, cross)))
    }

    fn degraded(&mut self, node: &LayoutNode, family: String, confidence: Confidence) {
        self.out.warnings.push(Warning::FontDegraded {
            node: node.display_name(),
            family,
            confidence,
        });
    }

    /// Record a node's box and lay out its children inside it.
    fn place(&mut self, node: &LayoutNode, bounds: ComputedBox) -> Result<()> {
        self.out.boxes.insert(node.id(), bounds);
        match node {
            LayoutNode::Group(group) => match &group.arrangement {
                Arrangement::Flex(flex) => self.distribute(flex, &group.children, bounds),
                Arrangement::Absolute => self.place_absolute(&group.children, bounds),
            },
            LayoutNode::Container(container) => self.distribute(&container.flex, &container.children, bounds),
            LayoutNode::Text(_)
            | LayoutNode::Image(_)
            | LayoutNode::Barcode(_)
            | LayoutNode::Line(_)
            | LayoutNode::Rect(_) => Ok(()),
        }
    }

    /// Children keep explicit page coordinates, auto ones start at the
    /// parent's origin.
    fn place_absolute(&mut self, children: &[LayoutNode], bounds: ComputedBox) -> Result<()> {
        for child in children {
            let (width, height) = self.measure(child)?;
            let frame = child.frame();
            let x = frame.x.explicit().unwrap_or(bounds.x);
            let y = frame.y.explicit().unwrap_or(bounds.y);
            self.place(child, ComputedBox::new(x, y, width, height))?;
        }
        Ok(())
    }

    fn distribute(&mut self, flex: &FlexStyle, children: &[LayoutNode], bounds: ComputedBox) -> Result<()> {
        let direction = flex.direction;
        let (box_main, box_cross) = to_axes(direction, (bounds.width, bounds.height));
        let (origin_main, origin_cross) = to_axes(direction, (bounds.x, bounds.y));
        let available = box_main - 2.0 * flex.padding;
        let content_cross = box_cross - 2.0 * flex.padding;

        let ordered = in_flow_order(direction, children);
        let mut sizes = Vec::with_capacity(ordered.len());
        for child in &ordered {
            sizes.push(to_axes(direction, self.measure(child)?));
        }
        let mains: Vec<f64> = sizes.iter().map(|s| s.0).collect();
        let lines = break_lines(&mains, flex.gap, available, flex.wrap);

        let mut cross_cursor = origin_cross + flex.padding;
        for (line_index, range) in lines.into_iter().enumerate() {
            let line = &sizes[range.clone()];
            let line_cross = if flex.wrap {
                line.iter().map(|s| s.1).fold(0.0, f64::max)
            } else {
                content_cross
            };
            let used = line.iter().map(|s| s.0).sum::<f64>() + flex.gap * line.len().saturating_sub(1) as f64;
            let (lead, spacing) = justify_line(flex.justify, available - used, line.len(), flex.gap);

            let mut main_cursor = origin_main + flex.padding + lead;
            for (child, &(main, cross)) in ordered[range.clone()].iter().zip(line) {
                let frame = child.frame();
                let (_, cross_dim) = authored_axes(direction, frame.width, frame.height);
                let (cross, offset) = match flex.align {
                    Align::Start => (cross, 0.0),
                    Align::Center => (cross, (line_cross - cross) / 2.0),
                    Align::End => (cross, line_cross - cross),
                    Align::Stretch if cross_dim.is_auto() => (line_cross, 0.0),
                    Align::Stretch => (cross, 0.0),
                };
                let (x, y) = from_axes(direction, (main_cursor, cross_cursor + offset));
                let (width, height) = from_axes(direction, (main, cross));
                self.out.lines.insert(child.id(), line_index);
                self.place(child, ComputedBox::new(x, y, width, height))?;
                main_cursor += main + spacing;
            }
            cross_cursor += line_cross;
        }
        Ok(())
    }
}

/// Results are keyed by id, so a node appearing twice (a plain `clone`)
/// would overwrite its own box.
fn check_unique_ids(doc: &LabelDocument) -> Result<()> {
    let mut seen = HashSet::new();
    for node in doc.nodes() {
        if !seen.insert(node.id()) {
            return Err(LbxError::config(
                node.display_name(),
                format!(
                    "node id {} appears more than once; copy nodes with LayoutNode::fresh_copy",
                    node.id()
                ),
            ));
        }
    }
    Ok(())
}

fn check_flex(node: &LayoutNode, flex: &FlexStyle) -> Result<()> {
    if flex.gap < 0.0 || !flex.gap.is_finite() {
        return Err(LbxError::config(
            node.display_name(),
            format!("gap must be a non-negative length, got {}", flex.gap),
        ));
    }
    if flex.padding < 0.0 || !flex.padding.is_finite() {
        return Err(LbxError::config(
            node.display_name(),
            format!("padding must be a non-negative length, got {}", flex.padding),
        ));
    }
    Ok(())
}

/// Attach a node's display name to a configuration error raised without one.
fn rename_node(err: LbxError, name: String) -> LbxError {
    match err {
        LbxError::Configuration { reason, .. } => LbxError::Configuration { node: name, reason },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutOptions;
    use crate::document::{Container, Group, NodeMeta, Rect, StyleRun, Text};
    use crate::metrics::{FaceMatch, FontCache, FontMetricsProvider, FontQuery, ReferenceMetrics};
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct NoFonts;

    impl FontMetricsProvider for NoFonts {
        fn face(&self, _query: &FontQuery) -> Option<FaceMatch> {
            None
        }
    }

    fn boxed(width: f64, height: f64) -> Rect {
        Rect::new().sized(Dimension::Pt(width), Dimension::Pt(height))
    }

    fn run(doc: &LabelDocument) -> Result<ComputedLayout> {
        let cache = FontCache::new(NoFonts);
        let calc = TextCalculator::new(&cache, LayoutOptions::default());
        layout(doc, &calc)
    }

    fn doc_with(node: impl Into<LayoutNode>) -> LabelDocument {
        let mut doc = LabelDocument::default();
        doc.background.x = 0.0;
        doc.background.y = 0.0;
        doc.push(node);
        doc
    }

    fn row(width: f64, height: f64, flex: FlexStyle) -> Container {
        Container::new(flex).sized(Dimension::Pt(width), Dimension::Pt(height))
    }

    fn child_boxes(layout: &ComputedLayout, node: &LayoutNode) -> Vec<ComputedBox> {
        node.children().iter().map(|c| *layout.get(c.id()).unwrap()).collect()
    }

    #[test]
    fn test_space_between_single_child_is_flush() {
        let flex = FlexStyle {
            justify: Justify::SpaceBetween,
            ..FlexStyle::row()
        };
        let doc = doc_with(row(100.0, 20.0, flex).child(boxed(10.0, 10.0)));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!(boxes[0].x, 0.0);
    }

    #[test]
    fn test_wrap_breaks_before_third_child() {
        let flex = FlexStyle {
            wrap: true,
            ..FlexStyle::row()
        };
        let doc = doc_with(
            row(90.0, 40.0, flex)
                .child(boxed(40.0, 10.0))
                .child(boxed(40.0, 12.0))
                .child(boxed(40.0, 10.0)),
        );
        let out = run(&doc).unwrap();
        let node = &doc.objects[0];
        let lines: Vec<usize> = node.children().iter().map(|c| out.line_of(c.id()).unwrap()).collect();
        assert_eq!(lines, vec![0, 0, 1]);
        let boxes = child_boxes(&out, node);
        assert_eq!((boxes[0].x, boxes[0].y), (0.0, 0.0));
        assert_eq!((boxes[1].x, boxes[1].y), (40.0, 0.0));
        // Second line starts below the tallest child of the first.
        assert_eq!((boxes[2].x, boxes[2].y), (0.0, 12.0));
    }

    #[test]
    fn test_gap_and_padding() {
        let flex = FlexStyle {
            gap: 5.0,
            padding: 2.0,
            ..FlexStyle::row()
        };
        let doc = doc_with(row(100.0, 20.0, flex).child(boxed(10.0, 10.0)).child(boxed(10.0, 10.0)));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!((boxes[0].x, boxes[0].y), (2.0, 2.0));
        assert_eq!(boxes[1].x, 17.0);
    }

    #[test]
    fn test_justify_variants() {
        let cases = [
            (Justify::Start, vec![0.0, 10.0]),
            (Justify::End, vec![80.0, 90.0]),
            (Justify::Center, vec![40.0, 50.0]),
            (Justify::SpaceBetween, vec![0.0, 90.0]),
            // leftover 80 split in three
            (Justify::SpaceAround, vec![80.0 / 3.0, 80.0 / 3.0 * 2.0 + 10.0]),
            (Justify::SpaceEvenly, vec![80.0 / 3.0, 80.0 / 3.0 * 2.0 + 10.0]),
        ];
        for (justify, expected) in cases {
            let flex = FlexStyle {
                justify,
                ..FlexStyle::row()
            };
            let doc = doc_with(row(100.0, 20.0, flex).child(boxed(10.0, 10.0)).child(boxed(10.0, 10.0)));
            let out = run(&doc).unwrap();
            let xs: Vec<f64> = child_boxes(&out, &doc.objects[0]).iter().map(|b| b.x).collect();
            for (x, e) in xs.iter().zip(&expected) {
                assert!(approx_eq!(f64, *x, *e, epsilon = 1e-9), "{justify:?}: {xs:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn test_space_between_ignores_overflow() {
        let flex = FlexStyle {
            justify: Justify::SpaceBetween,
            ..FlexStyle::row()
        };
        let doc = doc_with(row(15.0, 20.0, flex).child(boxed(10.0, 10.0)).child(boxed(10.0, 10.0)));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!(boxes[1].x, 10.0);
    }

    #[test]
    fn test_align_cross_axis() {
        let cases = [(Align::Start, 0.0), (Align::Center, 15.0), (Align::End, 30.0)];
        for (align, y) in cases {
            let flex = FlexStyle {
                align,
                ..FlexStyle::row()
            };
            let doc = doc_with(row(100.0, 40.0, flex).child(boxed(10.0, 10.0)));
            let out = run(&doc).unwrap();
            assert_eq!(child_boxes(&out, &doc.objects[0])[0].y, y, "{align:?}");
        }
    }

    #[test]
    fn test_stretch_only_auto_cross() {
        let flex = FlexStyle {
            align: Align::Stretch,
            ..FlexStyle::row()
        };
        let auto_height = Rect::new().sized(Dimension::Pt(10.0), Dimension::Auto);
        let doc = doc_with(row(100.0, 40.0, flex).child(auto_height).child(boxed(10.0, 10.0)));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!(boxes[0].height, 40.0);
        assert_eq!(boxes[1].height, 10.0);
    }

    #[test]
    fn test_column_direction() {
        let doc = doc_with(
            Container::new(FlexStyle {
                gap: 2.0,
                ..FlexStyle::column()
            })
            .child(boxed(10.0, 5.0))
            .child(boxed(20.0, 7.0)),
        );
        let out = run(&doc).unwrap();
        let node = &doc.objects[0];
        let own = out.get(node.id()).unwrap();
        assert_eq!((own.width, own.height), (20.0, 14.0));
        let boxes = child_boxes(&out, node);
        assert_eq!((boxes[1].x, boxes[1].y), (0.0, 7.0));
    }

    #[test]
    fn test_auto_container_shrinks_to_children() {
        let flex = FlexStyle {
            gap: 3.0,
            padding: 1.0,
            ..FlexStyle::row()
        };
        let doc = doc_with(Container::new(flex).child(boxed(10.0, 4.0)).child(boxed(5.0, 8.0)));
        let out = run(&doc).unwrap();
        let own = out.get(doc.objects[0].id()).unwrap();
        assert_eq!((own.width, own.height), (20.0, 10.0));
    }

    #[test]
    fn test_group_requires_explicit_size() {
        let mut group = Group::new(10.0, 10.0, FlexStyle::row()).named("Badge");
        group.frame.height = Dimension::Auto;
        let err = run(&doc_with(group)).unwrap_err();
        assert!(matches!(&err, LbxError::Configuration { node, .. } if node == "Badge"), "{err}");
    }

    #[test]
    fn test_wrap_with_auto_width_is_rejected() {
        let flex = FlexStyle {
            wrap: true,
            ..FlexStyle::row()
        };
        let doc = doc_with(Container::new(flex).named("Tags").child(boxed(10.0, 10.0)));
        let err = run(&doc).unwrap_err();
        assert!(err.to_string().contains("Tags"));
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn test_negative_gap_is_rejected() {
        let flex = FlexStyle {
            gap: -1.0,
            ..FlexStyle::row()
        };
        assert!(matches!(
            run(&doc_with(Container::new(flex))),
            Err(LbxError::Configuration { .. })
        ));
    }

    #[test]
    fn test_top_level_auto_position_uses_band_origin() {
        let mut doc = LabelDocument::default();
        let id = doc.push(boxed(10.0, 10.0));
        let explicit = doc.push(boxed(10.0, 10.0).at(50.0, 3.0));
        let out = run(&doc).unwrap();
        let b = out.get(id).unwrap();
        assert_eq!((b.x, b.y), (doc.background.x, doc.background.y));
        let e = out.get(explicit).unwrap();
        assert_eq!((e.x, e.y), (50.0, 3.0));
    }

    #[test]
    fn test_flex_ignores_child_position() {
        let doc = doc_with(row(100.0, 20.0, FlexStyle::row()).child(boxed(10.0, 10.0).at(70.0, 5.0)));
        let out = run(&doc).unwrap();
        assert_eq!(child_boxes(&out, &doc.objects[0])[0].x, 0.0);
    }

    #[test]
    fn test_absolute_group_keeps_page_coordinates() {
        let mut group = Group::new(100.0, 30.0, FlexStyle::row()).at(20.0, 4.0);
        group.arrangement = Arrangement::Absolute;
        let group = group.child(boxed(10.0, 10.0).at(60.0, 8.0)).child(boxed(5.0, 5.0));
        let doc = doc_with(group);
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!((boxes[0].x, boxes[0].y), (60.0, 8.0));
        assert_eq!((boxes[1].x, boxes[1].y), (20.0, 4.0));
    }

    #[test]
    fn test_leaf_defaults() {
        let doc = doc_with(
            Container::new(FlexStyle::column())
                .child(crate::document::Image::new("logo.png"))
                .child(crate::document::Line::new())
                .child(crate::document::Barcode::qr("x")),
        );
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!((boxes[0].width, boxes[0].height), DEFAULT_IMAGE_SIZE);
        assert_eq!((boxes[1].width, boxes[1].height), DEFAULT_LINE_SIZE);
        assert_eq!((boxes[2].width, boxes[2].height), DEFAULT_BARCODE_SIZE);
    }

    #[test]
    fn test_text_measured_and_degradation_reported() {
        let text = Text::styled("abcd", FontInfo::new("Futura", 10.0)).named("Title");
        let doc = doc_with(text);
        let out = run(&doc).unwrap();
        let b = out.get(doc.objects[0].id()).unwrap();
        assert!(approx_eq!(f64, b.width, 24.0, epsilon = 1e-9));
        assert_eq!(
            out.warnings(),
            &[Warning::FontDegraded {
                node: "Title".into(),
                family: "Futura".into(),
                confidence: Confidence::Heuristic,
            }]
        );
    }

    #[test]
    fn test_degraded_family_is_weakest_run() {
        let cache = FontCache::new(ReferenceMetrics::builtin());
        let calc = TextCalculator::new(&cache, LayoutOptions::default());
        let runs = vec![
            StyleRun::new(2, FontInfo::new("Arial", 10.0)),
            StyleRun::new(2, FontInfo::new("Futura", 10.0)),
        ];
        let doc = doc_with(Text::from_runs("abcd", runs).unwrap().named("Mixed"));
        let out = layout(&doc, &calc).unwrap();
        assert_eq!(
            out.warnings(),
            &[Warning::FontDegraded {
                node: "Mixed".into(),
                family: "Futura".into(),
                confidence: Confidence::Heuristic,
            }]
        );
    }

    #[test]
    fn test_reverse_directions() {
        let flex = FlexStyle {
            direction: Direction::RowReverse,
            gap: 5.0,
            ..FlexStyle::row()
        };
        let doc = doc_with(row(100.0, 20.0, flex).child(boxed(10.0, 10.0)).child(boxed(20.0, 10.0)));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        // Last child first, from the leading edge.
        assert_eq!((boxes[1].x, boxes[0].x), (0.0, 25.0));

        let flex = FlexStyle {
            direction: Direction::ColumnReverse,
            ..FlexStyle::column()
        };
        let doc = doc_with(Container::new(flex).child(boxed(10.0, 5.0)).child(boxed(20.0, 7.0)));
        let out = run(&doc).unwrap();
        let node = &doc.objects[0];
        let own = out.get(node.id()).unwrap();
        assert_eq!((own.width, own.height), (20.0, 12.0));
        let boxes = child_boxes(&out, node);
        assert_eq!((boxes[1].y, boxes[0].y), (0.0, 7.0));
    }

    #[test]
    fn test_cloned_node_is_rejected() {
        let rect: LayoutNode = boxed(10.0, 10.0).named("Square").into();
        let doc = doc_with(row(100.0, 20.0, FlexStyle::row()).child(rect.clone()).child(rect.clone()));
        let err = run(&doc).unwrap_err();
        assert!(matches!(&err, LbxError::Configuration { node, .. } if node == "Square"), "{err}");
        assert!(err.to_string().contains("fresh_copy"));

        let doc = doc_with(row(100.0, 20.0, FlexStyle::row()).child(rect.clone()).child(rect.fresh_copy()));
        let out = run(&doc).unwrap();
        let boxes = child_boxes(&out, &doc.objects[0]);
        assert_eq!((boxes[0].x, boxes[1].x), (0.0, 10.0));
    }

    #[test]
    fn test_authored_geometry_untouched() {
        let doc = doc_with(row(100.0, 20.0, FlexStyle::row()).child(boxed(10.0, 10.0)));
        let before = doc.clone();
        run(&doc).unwrap();
        assert_eq!(doc, before);
    }

    fn arb_leaf() -> impl Strategy<Value = LayoutNode> {
        prop_oneof![
            (1.0f64..50.0, 1.0f64..30.0).prop_map(|(w, h)| boxed(w, h).into()),
            ("[a-z ]{0,12}", 6.0f64..24.0)
                .prop_map(|(s, size)| Text::styled(s, FontInfo::new("Helsinki", size)).into()),
        ]
    }

    fn arb_flex() -> impl Strategy<Value = FlexStyle> {
        (
            0usize..4,
            0usize..6,
            0usize..4,
            0.0f64..6.0,
            0.0f64..4.0,
            any::<bool>(),
        )
            .prop_map(|(direction, justify, align, gap, padding, wrap)| FlexStyle {
                direction: [
                    Direction::Row,
                    Direction::Column,
                    Direction::RowReverse,
                    Direction::ColumnReverse,
                ][direction],
                justify: [
                    Justify::Start,
                    Justify::Center,
                    Justify::End,
                    Justify::SpaceBetween,
                    Justify::SpaceAround,
                    Justify::SpaceEvenly,
                ][justify],
                align: [Align::Start, Align::Center, Align::End, Align::Stretch][align],
                gap,
                padding,
                wrap,
            })
    }

    proptest! {
        #[test]
        fn prop_layout_is_idempotent(
            flex in arb_flex(),
            leaves in prop::collection::vec(arb_leaf(), 0..8),
        ) {
            let mut container = row(120.0, 60.0, flex);
            container.children = leaves;
            let doc = doc_with(container);
            let cache = FontCache::new(ReferenceMetrics::builtin());
            let calc = TextCalculator::new(&cache, LayoutOptions::default());
            let first = layout(&doc, &calc).unwrap();
            let second = layout(&doc, &calc).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
