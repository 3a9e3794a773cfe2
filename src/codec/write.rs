//! Serialize a laid-out document to `label.xml`.

use crate::config::CodecOptions;
use crate::document::{
    Barcode, FontInfo, Group, Image, LabelDocument, Line, LayoutNode, Passthrough, Rect, StyleRun,
    Stroke, Symbology, Text,
};
use crate::error::{LbxError, Result};
use crate::layout::{ComputedBox, ComputedLayout};
use crate::units::{format_number, format_pt};

use super::schema::*;
use super::xml::XmlWriter;

/// Size of the font as the editor stores it alongside the point size.
const ORG_SIZE_FACTOR: f64 = 3.6;

/// Render `label.xml` for `doc` at the geometry in `layout`.
pub fn serialize_label(doc: &LabelDocument, layout: &ComputedLayout, options: &CodecOptions) -> Result<String> {
    let mut s = Serializer {
        w: XmlWriter::new(),
        layout,
        options,
    };
    s.document(doc)?;
    Ok(s.w.finish())
}

/// Runs as written: adjacent runs with the same style merged, empty runs
/// dropped (one run always remains).
pub fn compact_runs(runs: &[StyleRun]) -> Vec<StyleRun> {
    let mut out: Vec<StyleRun> = Vec::with_capacity(runs.len());
    for run in runs {
        let empty = out.is_empty();
        match out.last_mut() {
            Some(last) if last.same_style(run) => last.len += run.len,
            _ if run.len == 0 && !empty => {}
            _ => out.push(run.clone()),
        }
    }
    // A leading empty run only survives when it is the sole run.
    if out.len() > 1 && out[0].len == 0 {
        out.remove(0);
    }
    out
}

struct Serializer<'a> {
    w: XmlWriter,
    layout: &'a ComputedLayout,
    options: &'a CodecOptions,
}

impl Serializer<'_> {
    fn document(&mut self, doc: &LabelDocument) -> Result<()> {
        let p = self.options.precision;
        let extra = &doc.extra;
        let mut tag = self.w.role(&DOCUMENT);
        for (prefix, uri) in LABEL_NAMESPACES {
            tag = tag.attr(&format!("xmlns:{prefix}"), *uri);
        }
        tag.default("version").default("generator").extra(extra).open();
        self.w.role(&BODY).defaults().extra(extra).open();
        self.w.role(&SHEET).defaults().extra(extra).open();

        let paper = &doc.paper;
        self.w
            .role(&PAPER)
            .default("media")
            .attr("width", format_pt(paper.width, p))
            .attr("height", format_pt(paper.height, p))
            .attr("marginLeft", format_pt(paper.margin_left, p))
            .attr("marginTop", format_pt(paper.margin_top, p))
            .attr("marginRight", format_pt(paper.margin_right, p))
            .attr("marginBottom", format_pt(paper.margin_bottom, p))
            .attr("orientation", paper.orientation.as_token())
            .attr("autoLength", bool_token(paper.auto_length))
            .default("monochromeDisplay")
            .default("printColorDisplay")
            .default("printColorsID")
            .attr("paperColor", paper.paper_color.as_str())
            .attr("paperInk", paper.paper_ink.as_str())
            .default("split")
            .attr("format", paper.format.to_string())
            .default("backgroundTheme")
            .attr("printerID", paper.printer.id.as_str())
            .attr("printerName", paper.printer.name.as_str())
            .extra(extra)
            .empty();
        self.w.role(&CUT_LINE).defaults().extra(extra).empty();

        let bg = &doc.background;
        self.w
            .role(&BACKGROUND)
            .attr("x", format_pt(bg.x, p))
            .attr("y", format_pt(bg.y, p))
            .attr("width", format_pt(bg.width, p))
            .attr("height", format_pt(bg.height, p))
            .default("brushStyle")
            .default("brushId")
            .default("userPattern")
            .default("userPatternId")
            .attr("color", bg.color.as_str())
            .default("printColorNumber")
            .attr("backColor", bg.back_color.as_str())
            .default("backPrintColorNumber")
            .extra(extra)
            .empty();

        self.w.role(&OBJECTS).open();
        self.nodes(&doc.objects)?;
        self.w.close(OBJECTS.element);

        self.kept(extra, &SHEET);
        self.w.close(SHEET.element);
        self.w.close(BODY.element);
        self.w.close(DOCUMENT.element);
        Ok(())
    }

    fn nodes(&mut self, nodes: &[LayoutNode]) -> Result<()> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    /// Unknown child elements read with `role`'s element, written back last.
    fn kept(&mut self, extra: &Passthrough, role: &Role) {
        for xml in extra.elements(role.key) {
            self.w.raw(xml);
        }
    }

    fn bounds(&self, node: &LayoutNode) -> Result<ComputedBox> {
        self.layout
            .get(node.id())
            .copied()
            .ok_or_else(|| LbxError::config(node.display_name(), "node has no computed layout"))
    }

    fn node(&mut self, node: &LayoutNode) -> Result<()> {
        match node {
            // Layout-only: children are already at page coordinates.
            LayoutNode::Container(container) => self.nodes(&container.children),
            LayoutNode::Group(group) => self.group(node, group),
            LayoutNode::Text(text) => self.text(node, text),
            LayoutNode::Image(image) => self.image(node, image),
            LayoutNode::Barcode(barcode) => self.barcode(node, barcode),
            LayoutNode::Line(line) => self.line(node, line),
            LayoutNode::Rect(rect) => self.rect(node, rect),
        }
    }

    // ------------------------------------------------------------------------
    // Shared parts
    // ------------------------------------------------------------------------

    /// `pt:objectStyle` with its pen, brush and expanded children.
    fn object_style(&mut self, node: &LayoutNode, parts: ObjectParts<'_>) -> Result<()> {
        let p = self.options.precision;
        let b = self.bounds(node)?;
        let extra = parts.extra;
        let mut tag = self
            .w
            .role(&OBJECT_STYLE)
            .attr("x", format_pt(b.x, p))
            .attr("y", format_pt(b.y, p))
            .attr("width", format_pt(b.width, p))
            .attr("height", format_pt(b.height, p));
        tag = match parts.back_color {
            Some(color) => tag.attr("backColor", color),
            None => tag.default("backColor"),
        };
        tag.default("backPrintColorNumber")
            .default("ropMode")
            .default("angle")
            .default("anchor")
            .default("flip")
            .extra(extra)
            .open();

        let pen = self.w.role(&PEN);
        let pen = match parts.pen {
            Some(stroke) => {
                let width = format_pt(stroke.width, p);
                pen.token("style", stroke.style.as_token())
                    .attr("widthX", width.clone())
                    .attr("widthY", width)
                    .attr("color", stroke.color.as_str())
            }
            None => pen
                .attr("style", "NULL")
                .default("widthX")
                .default("widthY")
                .default("color"),
        };
        pen.default("printColorNumber").extra(extra).empty();

        let brush = self.w.role(&BRUSH);
        let brush = match parts.fill {
            Some(color) => brush.token("style", "SOLID").attr("color", color),
            None => brush.attr("style", "NULL").default("color"),
        };
        brush.default("printColorNumber").default("id").extra(extra).empty();

        self.w
            .role(&EXPANDED)
            .attr("objectName", node.display_name())
            .default("ID")
            .attr("lock", parts.lock)
            .default("templateMergeTarget")
            .default("templateMergeType")
            .default("templateMergeID")
            .default("linkStatus")
            .default("linkID")
            .extra(extra)
            .empty();

        self.kept(extra, &OBJECT_STYLE);
        self.w.close(OBJECT_STYLE.element);
        Ok(())
    }

    fn font_info(&mut self, font: &FontInfo, log_font: &'static Role, font_ext: &'static Role, extra: &Passthrough) {
        let p = self.options.precision;
        self.w.role(&PT_FONT_INFO).open();
        self.w
            .role(log_font)
            .attr("name", font.family.as_str())
            .default("width")
            .attr("italic", bool_token(font.italic))
            .attr("weight", font.weight.to_string())
            .default("charSet")
            .default("pitchAndFamily")
            .extra(extra)
            .empty();
        self.w
            .role(font_ext)
            .default("effect")
            .attr("underline", flag_token(font.underline))
            .attr("strikeout", flag_token(font.strikeout))
            .attr("size", format_pt(font.size, p))
            .attr("orgSize", format_pt(font.size * ORG_SIZE_FACTOR, p))
            .attr("textColor", font.color.as_str())
            .default("textPrintColorNumber")
            .extra(extra)
            .empty();
        self.w.close(PT_FONT_INFO.element);
    }

    // ------------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------------

    fn group(&mut self, node: &LayoutNode, group: &Group) -> Result<()> {
        self.w.role(&GROUP).extra(&group.extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: group.style.background.as_deref(),
                pen: group.style.border.as_ref(),
                fill: None,
                lock: "2",
                extra: &group.extra,
            },
        )?;
        self.w.role(&OBJECTS).open();
        self.nodes(&group.children)?;
        self.w.close(OBJECTS.element);
        self.kept(&group.extra, &GROUP);
        self.w.close(GROUP.element);
        Ok(())
    }

    fn text(&mut self, node: &LayoutNode, text: &Text) -> Result<()> {
        let p = self.options.precision;
        text.validate()?;
        let runs = if self.options.compact_runs {
            compact_runs(text.runs())
        } else {
            text.runs().to_vec()
        };
        let primary = runs.first().map(|r| r.font.clone()).unwrap_or_default();

        self.w.role(&TEXT).extra(&text.extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: None,
                pen: None,
                fill: None,
                lock: "0",
                extra: &text.extra,
            },
        )?;
        self.font_info(&primary, &TEXT_LOG_FONT, &TEXT_FONT_EXT, &text.extra);
        self.w.role(&TEXT_CONTROL).defaults().extra(&text.extra).empty();
        self.w
            .role(&TEXT_ALIGN)
            .token("horizontalAlignment", text.align.as_token())
            .default("verticalAlignment")
            .default("inLineAlignment")
            .extra(&text.extra)
            .empty();
        self.w
            .role(&TEXT_STYLE)
            .attr("vertical", bool_token(text.vertical))
            .default("nullBlock")
            .default("charSpace")
            .default("lineSpace")
            .attr("orgPoint", format_pt(primary.size, p))
            .default("combinedChars")
            .extra(&text.extra)
            .empty();
        self.w.role(&DATA).text(text.content());

        for run in &runs {
            self.w
                .role(&STRING_ITEM)
                .attr("charLen", run.len.to_string())
                .extra(&run.extra)
                .open();
            self.font_info(&run.font, &LOG_FONT, &FONT_EXT, &run.extra);
            self.kept(&run.extra, &STRING_ITEM);
            self.w.close(STRING_ITEM.element);
        }
        self.kept(&text.extra, &TEXT);
        self.w.close(TEXT.element);
        Ok(())
    }

    fn image(&mut self, node: &LayoutNode, image: &Image) -> Result<()> {
        let p = self.options.precision;
        let b = self.bounds(node)?;
        let extra = &image.extra;
        self.w.role(&IMAGE).extra(extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: None,
                pen: None,
                fill: None,
                lock: "2",
                extra,
            },
        )?;
        self.w
            .role(&IMAGE_STYLE)
            .attr("originalName", image.source.as_str())
            .default("alignInText")
            .default("firstMerge")
            .default("IpName")
            .attr("fileName", image.file_name.as_str())
            .extra(extra)
            .open();
        self.w.role(&TRANSPARENT).defaults().extra(extra).empty();
        self.w.role(&TRIMMING).defaults().extra(extra).empty();
        self.w
            .role(&ORG_POS)
            .attr("x", format_pt(b.x, p))
            .attr("y", format_pt(b.y, p))
            .attr("width", format_pt(b.width, p))
            .attr("height", format_pt(b.height, p))
            .extra(extra)
            .empty();
        let (effect, operation) = image.mode.tokens();
        self.w
            .role(&EFFECT)
            .token("effect", effect)
            .defaults()
            .extra(extra)
            .empty();
        self.w
            .role(&MONO)
            .token("operationKind", operation)
            .defaults()
            .extra(extra)
            .empty();
        self.kept(extra, &IMAGE_STYLE);
        self.w.close(IMAGE_STYLE.element);
        self.kept(extra, &IMAGE);
        self.w.close(IMAGE.element);
        Ok(())
    }

    fn barcode(&mut self, node: &LayoutNode, barcode: &Barcode) -> Result<()> {
        let p = self.options.precision;
        let extra = &barcode.extra;
        self.w.role(&BARCODE).extra(extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: None,
                pen: None,
                fill: None,
                lock: "2",
                extra,
            },
        )?;
        self.w
            .role(&BARCODE_STYLE)
            .attr("protocol", barcode.symbology.protocol())
            .default("lengths")
            .default("zeroFill")
            .default("barWidth")
            .default("barRatio")
            .attr("humanReadable", bool_token(barcode.human_readable))
            .default("humanReadableAlignment")
            .default("checkDigit")
            .default("autoLengths")
            .default("margin")
            .default("sameLengthBar")
            .default("bearerBar")
            .extra(extra)
            .empty();
        if barcode.symbology == Symbology::Qr {
            self.w
                .role(&QRCODE_STYLE)
                .default("model")
                .attr("eccLevel", barcode.error_correction.as_level())
                .attr("cellSize", format_pt(barcode.cell_size, p))
                .default("mbcs")
                .default("joint")
                .default("version")
                .default("changeVersionDrag")
                .extra(extra)
                .empty();
        }
        self.w.role(&DATA).text(&barcode.content);
        self.kept(extra, &BARCODE);
        self.w.close(BARCODE.element);
        Ok(())
    }

    fn line(&mut self, node: &LayoutNode, line: &Line) -> Result<()> {
        let p = self.options.precision;
        let b = self.bounds(node)?;
        let extra = &line.extra;
        let stroke = Stroke {
            width: line.thickness,
            color: line.color.clone(),
            style: line.style,
        };
        self.w.role(&POLY).extra(extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: None,
                pen: Some(&stroke),
                fill: None,
                lock: "2",
                extra,
            },
        )?;
        self.w.role(&POLY_STYLE).defaults().extra(extra).open();
        self.w
            .role(&POLY_ORG_POS)
            .attr("x", format_pt(b.x, p))
            .attr("y", format_pt(b.y, p))
            .attr("width", format_pt(b.width, p))
            .attr("height", format_pt(b.height, p))
            .extra(extra)
            .empty();
        let points = format!(
            "{},{} {},{}",
            format_number(b.x, p),
            format_number(b.y, p),
            format_number(b.right(), p),
            format_number(b.bottom(), p),
        );
        self.w
            .role(&POLY_LINE_POINTS)
            .attr("points", points)
            .extra(extra)
            .empty();
        self.kept(extra, &POLY_STYLE);
        self.w.close(POLY_STYLE.element);
        self.kept(extra, &POLY);
        self.w.close(POLY.element);
        Ok(())
    }

    fn rect(&mut self, node: &LayoutNode, rect: &Rect) -> Result<()> {
        let p = self.options.precision;
        let extra = &rect.extra;
        self.w.role(&RECT).extra(extra).open();
        self.object_style(
            node,
            ObjectParts {
                back_color: None,
                pen: rect.stroke.as_ref(),
                fill: rect.fill.as_deref(),
                lock: "2",
                extra,
            },
        )?;
        let radius = format_pt(rect.corner_radius, p);
        self.w
            .role(&RECT_STYLE)
            .attr("roundnessX", radius.clone())
            .attr("roundnessY", radius)
            .default("shape")
            .extra(extra)
            .empty();
        self.kept(extra, &RECT);
        self.w.close(RECT.element);
        Ok(())
    }
}

/// Per-kind values of the shared `pt:objectStyle` block.
struct ObjectParts<'a> {
    back_color: Option<&'a str>,
    pen: Option<&'a Stroke>,
    fill: Option<&'a str>,
    lock: &'static str,
    extra: &'a Passthrough,
}

fn bool_token(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn flag_token(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
