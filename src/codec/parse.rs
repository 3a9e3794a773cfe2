//! Parse `label.xml` back into a [`LabelDocument`].
//!
//! Elements are matched by namespace URI and local name, so documents that
//! bind the label namespaces to other prefixes read the same. Errors carry
//! the element path (`pt:document/pt:body/.../text:text[2]/pt:data`).
//!
//! Whatever the model does not own is kept in [`Passthrough`]: unmodeled
//! attributes (namespaced ones included), tokens the model cannot represent
//! and unknown child elements, re-serialized from the tree.

use indexmap::IndexMap;
use log::{debug, warn};
use roxmltree::Node;

use crate::config::CodecOptions;
use crate::document::{
    Arrangement, Background, Barcode, Dimension, ErrorCorrection, FontInfo, Frame, Group,
    GroupStyle, Image, ImageMode, LabelDocument, Line, LayoutNode, NodeMeta, Orientation, Paper,
    Passthrough, PenStyle, Rect, StyleRun, Stroke, Symbology, Text, TextAlign,
};
use crate::error::{LbxError, Result, Warning};
use crate::units::parse_length;

use super::schema::*;
use super::xml::escape_into;

const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// A document read from an archive, plus the non-fatal problems found.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub document: LabelDocument,
    pub warnings: Vec<Warning>,
}

/// Parse `label.xml`.
pub fn parse_label(xml: &str, options: &CodecOptions) -> Result<Decoded> {
    let tree = roxmltree::Document::parse(xml)?;
    let mut parser = Parser {
        options,
        warnings: Vec::new(),
    };
    let document = parser.document(tree.root_element())?;
    Ok(Decoded {
        document,
        warnings: parser.warnings,
    })
}

/// Qualified name of an element as it appears in paths.
fn qname(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(prefix_of) {
        Some(prefix) => format!("{prefix}:{}", tag.name()),
        None => tag.name().to_string(),
    }
}

fn is(node: Node<'_, '_>, role: &Role) -> bool {
    node.is_element() && node.has_tag_name((role.ns, role.local()))
}

fn child<'a, 'i>(node: Node<'a, 'i>, role: &Role) -> Option<Node<'a, 'i>> {
    node.children().find(|n| is(*n, role))
}

fn require<'a, 'i>(node: Node<'a, 'i>, role: &Role, path: &str) -> Result<Node<'a, 'i>> {
    child(node, role).ok_or_else(|| LbxError::schema(path, format!("missing <{}>", role.element)))
}

fn require_attr<'a>(node: Node<'a, '_>, name: &str, path: &str) -> Result<&'a str> {
    node.attribute(name)
        .ok_or_else(|| LbxError::schema(path, format!("missing attribute '{name}'")))
}

fn length(node: Node<'_, '_>, name: &str, path: &str) -> Result<f64> {
    let value = require_attr(node, name, path)?;
    parse_length(value).ok_or_else(|| LbxError::schema(format!("{path}/@{name}"), format!("invalid length '{value}'")))
}

fn length_or(node: Node<'_, '_>, name: &str, path: &str, default: f64) -> Result<f64> {
    if node.attribute(name).is_some() {
        length(node, name, path)
    } else {
        Ok(default)
    }
}

fn flag(node: Node<'_, '_>, name: &str) -> bool {
    matches!(node.attribute(name), Some("true" | "1"))
}

/// Attributes of `node` that the model does not own and that differ from
/// the editor default. Namespaced attributes are always kept, preceded by
/// the declaration of their prefix.
fn unmodeled(node: Node<'_, '_>, role: &Role) -> IndexMap<String, String> {
    let mut bindings = Bindings::default();
    let mut out = IndexMap::new();
    for attr in node.attributes() {
        if attr.namespace().is_none() && !role.is_passthrough(attr.name(), attr.value()) {
            continue;
        }
        let name = bindings.qualify(node, attr.namespace(), attr.name(), &mut out);
        out.insert(name, attr.value().to_string());
    }
    out
}

fn keep(extra: &mut Passthrough, node: Node<'_, '_>, role: &Role) {
    extra.insert(role.key, unmodeled(node, role));
}

/// Store a modeled token when the writer would not reproduce it.
fn keep_token(extra: &mut Passthrough, role: &Role, name: &str, raw: &str, written: Option<&str>) {
    if written != Some(raw) {
        extra.set(role.key, name, raw);
    }
}

/// Keep the element children of `node` that no role in `known` describes.
fn keep_unknown(extra: &mut Passthrough, node: Node<'_, '_>, role: &Role, known: &[&Role]) {
    for element in node.children().filter(Node::is_element) {
        if !known.iter().any(|k| is(element, k)) {
            debug!(parent = role.element, element = qname(element).as_str(); "Keeping unmodeled element");
            extra.push_element(role.key, raw_element(element));
        }
    }
}

/// Prefixes bound for foreign namespaces while copying unmodeled markup.
/// Label namespaces keep their canonical prefix, declared on the root.
#[derive(Default)]
struct Bindings(Vec<(String, String)>);

impl Bindings {
    /// Qualified name for `local` in namespace `uri`. A foreign namespace
    /// seen for the first time gets a prefix and a declaration in `attrs`.
    fn qualify(
        &mut self,
        node: Node<'_, '_>,
        uri: Option<&str>,
        local: &str,
        attrs: &mut IndexMap<String, String>,
    ) -> String {
        let Some(uri) = uri else {
            return local.to_string();
        };
        if uri == NS_XML {
            return format!("xml:{local}");
        }
        if let Some((prefix, _)) = LABEL_NAMESPACES.iter().find(|(_, ns)| *ns == uri) {
            return format!("{prefix}:{local}");
        }
        if let Some((prefix, _)) = self.0.iter().find(|(_, bound)| bound == uri) {
            return format!("{prefix}:{local}");
        }

        let taken = |p: &str| {
            p == "xml"
                || p.starts_with("xmlns")
                || LABEL_NAMESPACES.iter().any(|(label, _)| *label == p)
                || self.0.iter().any(|(bound, _)| bound == p)
        };
        let preferred = match prefix_of(uri) {
            Some(prefix) => Some(prefix),
            None => node.lookup_prefix(uri),
        };
        let prefix = match preferred.filter(|p| !p.is_empty() && !taken(p)) {
            Some(prefix) => prefix.to_string(),
            None => (0..)
                .map(|i| format!("ns{i}"))
                .find(|p| !taken(p))
                .unwrap_or_default(),
        };
        attrs.insert(format!("xmlns:{prefix}"), uri.to_string());
        self.0.push((prefix.clone(), uri.to_string()));
        format!("{prefix}:{local}")
    }
}

/// Serialize an element subtree for passthrough. Comments and processing
/// instructions are dropped.
fn raw_element(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    write_raw(node, &mut Bindings::default(), &mut out);
    out
}

fn write_raw(node: Node<'_, '_>, bindings: &mut Bindings, out: &mut String) {
    let outer = bindings.0.len();
    let mut attrs = IndexMap::new();
    let tag = node.tag_name();
    let name = bindings.qualify(node, tag.namespace(), tag.name(), &mut attrs);
    for attr in node.attributes() {
        let attr_name = bindings.qualify(node, attr.namespace(), attr.name(), &mut attrs);
        attrs.insert(attr_name, attr.value().to_string());
    }

    out.push('<');
    out.push_str(&name);
    for (attr, value) in &attrs {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    let mut children = node.children().filter(|c| c.is_element() || c.is_text()).peekable();
    if children.peek().is_none() {
        out.push_str("/>");
    } else {
        out.push('>');
        for c in children {
            if c.is_element() {
                write_raw(c, bindings, out);
            } else if let Some(text) = c.text() {
                escape_into(out, text, false);
            }
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
    bindings.0.truncate(outer);
}

/// Shared `pt:objectStyle` content.
struct ObjectStyle {
    frame: Frame,
    back_color: Option<String>,
    pen: Option<Stroke>,
    fill: Option<String>,
}

struct Parser<'o> {
    options: &'o CodecOptions,
    warnings: Vec<Warning>,
}

impl Parser<'_> {
    fn document(&mut self, root: Node<'_, '_>) -> Result<LabelDocument> {
        if !is(root, &DOCUMENT) {
            return Err(LbxError::schema(
                "label.xml",
                format!("expected pt:document, found {}", qname(root)),
            ));
        }
        let mut doc = LabelDocument::default();
        let path = "pt:document".to_string();
        keep(&mut doc.extra, root, &DOCUMENT);

        let body = require(root, &BODY, &path)?;
        let path = format!("{path}/pt:body");
        keep(&mut doc.extra, body, &BODY);

        let sheet = require(body, &SHEET, &path)?;
        let path = format!("{path}/style:sheet");
        keep(&mut doc.extra, sheet, &SHEET);

        let paper = require(sheet, &PAPER, &path)?;
        doc.paper = self.paper(paper, &format!("{path}/style:paper"))?;
        keep(&mut doc.extra, paper, &PAPER);

        if let Some(cut) = child(sheet, &CUT_LINE) {
            keep(&mut doc.extra, cut, &CUT_LINE);
        }

        let background = require(sheet, &BACKGROUND, &path)?;
        doc.background = self.background(background, &format!("{path}/style:backGround"))?;
        keep(&mut doc.extra, background, &BACKGROUND);

        let objects = require(sheet, &OBJECTS, &path)?;
        doc.objects = self.objects(objects, &format!("{path}/pt:objects"))?;
        keep_unknown(&mut doc.extra, sheet, &SHEET, &[&PAPER, &CUT_LINE, &BACKGROUND, &OBJECTS]);
        Ok(doc)
    }

    fn paper(&mut self, node: Node<'_, '_>, path: &str) -> Result<Paper> {
        let mut paper = Paper::default();
        paper.width = length(node, "width", path)?;
        paper.height = length(node, "height", path)?;
        paper.margin_left = length_or(node, "marginLeft", path, 0.0)?;
        paper.margin_top = length_or(node, "marginTop", path, 0.0)?;
        paper.margin_right = length_or(node, "marginRight", path, 0.0)?;
        paper.margin_bottom = length_or(node, "marginBottom", path, 0.0)?;
        paper.orientation = match node.attribute("orientation") {
            None | Some("landscape") => Orientation::Landscape,
            Some("portrait") => Orientation::Portrait,
            Some(other) => {
                return Err(LbxError::schema(
                    format!("{path}/@orientation"),
                    format!("unknown orientation '{other}'"),
                ));
            }
        };
        paper.auto_length = flag(node, "autoLength");
        if let Some(format) = node.attribute("format") {
            paper.format = format.trim().parse().map_err(|_| {
                LbxError::schema(format!("{path}/@format"), format!("invalid tape format '{format}'"))
            })?;
        }
        if let Some(color) = node.attribute("paperColor") {
            paper.paper_color = color.to_string();
        }
        if let Some(ink) = node.attribute("paperInk") {
            paper.paper_ink = ink.to_string();
        }
        if let Some(id) = node.attribute("printerID") {
            paper.printer.id = id.to_string();
        }
        if let Some(name) = node.attribute("printerName") {
            paper.printer.name = name.to_string();
        }
        Ok(paper)
    }

    fn background(&mut self, node: Node<'_, '_>, path: &str) -> Result<Background> {
        let mut bg = Background::default();
        bg.x = length(node, "x", path)?;
        bg.y = length(node, "y", path)?;
        bg.width = length(node, "width", path)?;
        bg.height = length(node, "height", path)?;
        if let Some(color) = node.attribute("color") {
            bg.color = color.to_string();
        }
        if let Some(color) = node.attribute("backColor") {
            bg.back_color = color.to_string();
        }
        Ok(bg)
    }

    fn objects(&mut self, node: Node<'_, '_>, path: &str) -> Result<Vec<LayoutNode>> {
        let mut seen: IndexMap<String, usize> = IndexMap::new();
        let mut out = Vec::new();
        for element in node.children().filter(Node::is_element) {
            let name = qname(element);
            let index = seen.entry(name.clone()).or_insert(0);
            *index += 1;
            let path = format!("{path}/{name}[{index}]");

            let parsed: LayoutNode = if is(element, &TEXT) {
                self.text(element, &path)?.into()
            } else if is(element, &GROUP) {
                self.group(element, &path)?.into()
            } else if is(element, &IMAGE) {
                self.image(element, &path)?.into()
            } else if is(element, &BARCODE) {
                self.barcode(element, &path)?.into()
            } else if is(element, &POLY) {
                self.line(element, &path)?.into()
            } else if is(element, &RECT) {
                self.rect(element, &path)?.into()
            } else {
                warn!(path = path.as_str(), element = name.as_str(); "Skipping unsupported object");
                self.warnings.push(Warning::UnknownElement { path, name });
                continue;
            };
            out.push(parsed);
        }
        Ok(out)
    }

    /// `pt:objectStyle` with pen, brush and expanded. Unmodeled attributes go
    /// to `extra`.
    fn object_style(&mut self, owner: Node<'_, '_>, label: &str, path: &str, extra: &mut Passthrough) -> Result<ObjectStyle> {
        let style = require(owner, &OBJECT_STYLE, path)?;
        let path = format!("{path}/pt:objectStyle");
        let mut frame = Frame::new(label);
        frame.x = Dimension::Pt(length(style, "x", &path)?);
        frame.y = Dimension::Pt(length(style, "y", &path)?);
        frame.width = Dimension::Pt(length(style, "width", &path)?);
        frame.height = Dimension::Pt(length(style, "height", &path)?);
        keep(extra, style, &OBJECT_STYLE);

        let back_color = style
            .attribute("backColor")
            .filter(|c| !c.eq_ignore_ascii_case("#FFFFFF"))
            .map(str::to_string);

        let mut pen = None;
        if let Some(node) = child(style, &PEN) {
            let pen_path = format!("{path}/pt:pen");
            if let Some(raw) = node.attribute("style").filter(|s| *s != "NULL") {
                let pen_style = PenStyle::from_token(raw);
                keep_token(extra, &PEN, "style", raw, pen_style.map(PenStyle::as_token));
                pen = Some(Stroke {
                    width: length_or(node, "widthX", &pen_path, Stroke::default().width)?,
                    color: node.attribute("color").unwrap_or("#000000").to_string(),
                    style: pen_style.unwrap_or_default(),
                });
            }
            keep(extra, node, &PEN);
        }

        let mut fill = None;
        if let Some(node) = child(style, &BRUSH) {
            if let Some(raw) = node.attribute("style").filter(|s| *s != "NULL") {
                keep_token(extra, &BRUSH, "style", raw, Some("SOLID"));
                fill = Some(node.attribute("color").unwrap_or("#000000").to_string());
            }
            keep(extra, node, &BRUSH);
        }

        if let Some(node) = child(style, &EXPANDED) {
            if let Some(name) = node.attribute("objectName").filter(|n| !n.is_empty()) {
                frame.name = name.to_string();
            }
            keep(extra, node, &EXPANDED);
        }
        keep_unknown(extra, style, &OBJECT_STYLE, &[&PEN, &BRUSH, &EXPANDED]);

        Ok(ObjectStyle {
            frame,
            back_color,
            pen,
            fill,
        })
    }

    /// Font from a `text:ptFontInfo` element.
    fn font(
        &mut self,
        info: Node<'_, '_>,
        path: &str,
        roles: (&Role, &Role),
        extra: &mut Passthrough,
    ) -> Result<FontInfo> {
        let (log_role, ext_role) = roles;
        let path = format!("{path}/text:ptFontInfo");
        let log_font = require(info, log_role, &path)?;
        let font_ext = require(info, ext_role, &path)?;
        let ext_path = format!("{path}/text:fontExt");

        let mut font = FontInfo::new(
            require_attr(log_font, "name", &format!("{path}/text:logFont"))?,
            length(font_ext, "size", &ext_path)?,
        );
        if let Some(weight) = log_font.attribute("weight") {
            font.weight = weight.trim().parse().map_err(|_| {
                LbxError::schema(format!("{path}/text:logFont/@weight"), format!("invalid weight '{weight}'"))
            })?;
        }
        font.italic = flag(log_font, "italic");
        font.underline = flag(font_ext, "underline");
        font.strikeout = flag(font_ext, "strikeout");
        if let Some(color) = font_ext.attribute("textColor") {
            font.color = color.to_string();
        }
        keep(extra, log_font, log_role);
        keep(extra, font_ext, ext_role);
        Ok(font)
    }

    fn text(&mut self, node: Node<'_, '_>, path: &str) -> Result<Text> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &TEXT);
        let style = self.object_style(node, Text::label(), path, &mut extra)?;

        let text_font = match child(node, &PT_FONT_INFO) {
            Some(info) => Some(self.font(info, path, (&TEXT_LOG_FONT, &TEXT_FONT_EXT), &mut extra)?),
            None => None,
        };
        if let Some(control) = child(node, &TEXT_CONTROL) {
            keep(&mut extra, control, &TEXT_CONTROL);
        }
        let mut align = TextAlign::Left;
        if let Some(node) = child(node, &TEXT_ALIGN) {
            if let Some(raw) = node.attribute("horizontalAlignment") {
                align = TextAlign::from_token(raw).unwrap_or_else(|| {
                    debug!(path = path, alignment = raw; "Unmodeled alignment, laid out as left");
                    TextAlign::Left
                });
                keep_token(&mut extra, &TEXT_ALIGN, "horizontalAlignment", raw, Some(align.as_token()));
            }
            keep(&mut extra, node, &TEXT_ALIGN);
        }
        let mut vertical = false;
        if let Some(node) = child(node, &TEXT_STYLE) {
            vertical = flag(node, "vertical");
            keep(&mut extra, node, &TEXT_STYLE);
        }

        let data = require(node, &DATA, path)?;
        let content: String = data
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();

        let mut runs = Vec::new();
        for (i, item) in node.children().filter(|n| is(*n, &STRING_ITEM)).enumerate() {
            let item_path = format!("{path}/text:stringItem[{}]", i + 1);
            let len_text = require_attr(item, "charLen", &item_path)?;
            let len: usize = len_text.trim().parse().map_err(|_| {
                LbxError::schema(format!("{item_path}/@charLen"), format!("invalid length '{len_text}'"))
            })?;
            let mut run_extra = Passthrough::default();
            keep(&mut run_extra, item, &STRING_ITEM);
            let info = require(item, &PT_FONT_INFO, &item_path)?;
            let font = self.font(info, &item_path, (&LOG_FONT, &FONT_EXT), &mut run_extra)?;
            keep_unknown(&mut run_extra, item, &STRING_ITEM, &[&PT_FONT_INFO]);
            runs.push(StyleRun {
                len,
                font,
                extra: run_extra,
            });
        }

        let chars = content.chars().count();
        let declared: usize = runs.iter().map(|r| r.len).sum();
        if runs.is_empty() && chars == 0 {
            runs.push(StyleRun::new(0, text_font.clone().unwrap_or_default()));
        } else if declared != chars {
            if self.options.strict_runs {
                return Err(LbxError::schema(
                    path,
                    format!("style runs cover {declared} characters, text has {chars}"),
                ));
            }
            warn!(path = path, declared = declared, actual = chars; "Clamping run lengths to text");
            clamp_runs(&mut runs, chars, text_font.as_ref());
            self.warnings.push(Warning::RunLengthClamped {
                path: path.to_string(),
                declared,
                actual: chars,
            });
        }

        keep_unknown(
            &mut extra,
            node,
            &TEXT,
            &[&OBJECT_STYLE, &PT_FONT_INFO, &TEXT_CONTROL, &TEXT_ALIGN, &TEXT_STYLE, &DATA, &STRING_ITEM],
        );

        let mut text = Text::from_runs(content, runs)?;
        text.frame = style.frame;
        text.align = align;
        text.vertical = vertical;
        text.extra = extra;
        Ok(text)
    }

    fn group(&mut self, node: Node<'_, '_>, path: &str) -> Result<Group> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &GROUP);
        let style = self.object_style(node, Group::label(), path, &mut extra)?;
        let children = match child(node, &OBJECTS) {
            Some(objects) => self.objects(objects, &format!("{path}/pt:objects"))?,
            None => Vec::new(),
        };
        keep_unknown(&mut extra, node, &GROUP, &[&OBJECT_STYLE, &OBJECTS]);
        Ok(Group {
            frame: style.frame,
            arrangement: Arrangement::Absolute,
            style: GroupStyle {
                background: style.back_color,
                border: style.pen,
            },
            children,
            extra,
        })
    }

    fn image(&mut self, node: Node<'_, '_>, path: &str) -> Result<Image> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &IMAGE);
        let style = self.object_style(node, Image::label(), path, &mut extra)?;
        let image_style = require(node, &IMAGE_STYLE, path)?;
        keep(&mut extra, image_style, &IMAGE_STYLE);

        let source = image_style.attribute("originalName").unwrap_or_default();
        let mut image = Image::new(source);
        if let Some(file_name) = image_style.attribute("fileName") {
            image.file_name = file_name.to_string();
        }

        for role in [&TRANSPARENT, &TRIMMING, &ORG_POS] {
            if let Some(part) = child(image_style, role) {
                keep(&mut extra, part, role);
            }
        }
        let effect = child(image_style, &EFFECT);
        if let Some(part) = effect {
            keep(&mut extra, part, &EFFECT);
        }
        let mono = child(image_style, &MONO);
        if let Some(part) = mono {
            keep(&mut extra, part, &MONO);
        }
        let raw_effect = effect.and_then(|e| e.attribute("effect"));
        let raw_operation = mono.and_then(|m| m.attribute("operationKind"));
        image.mode = match raw_operation {
            Some("ERRORDIFFUSION") => ImageMode::Dither,
            Some(_) => ImageMode::Binary,
            None if raw_effect == Some("MONO") => ImageMode::Dither,
            None => ImageMode::Binary,
        };
        let (effect_token, operation_token) = image.mode.tokens();
        if let Some(raw) = raw_effect {
            keep_token(&mut extra, &EFFECT, "effect", raw, Some(effect_token));
        }
        if let Some(raw) = raw_operation {
            keep_token(&mut extra, &MONO, "operationKind", raw, Some(operation_token));
        }
        keep_unknown(
            &mut extra,
            image_style,
            &IMAGE_STYLE,
            &[&TRANSPARENT, &TRIMMING, &ORG_POS, &EFFECT, &MONO],
        );
        keep_unknown(&mut extra, node, &IMAGE, &[&OBJECT_STYLE, &IMAGE_STYLE]);

        image.frame = style.frame;
        image.extra = extra;
        Ok(image)
    }

    fn barcode(&mut self, node: Node<'_, '_>, path: &str) -> Result<Barcode> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &BARCODE);
        let style = self.object_style(node, Barcode::label(), path, &mut extra)?;

        let barcode_style = require(node, &BARCODE_STYLE, path)?;
        let style_path = format!("{path}/barcode:barcodeStyle");
        let protocol = require_attr(barcode_style, "protocol", &style_path)?;
        let symbology = Symbology::from_protocol(protocol).ok_or_else(|| {
            LbxError::schema(format!("{style_path}/@protocol"), format!("unknown protocol '{protocol}'"))
        })?;
        keep(&mut extra, barcode_style, &BARCODE_STYLE);

        let data = require(node, &DATA, path)?;
        let content: String = data
            .children()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();

        let mut barcode = Barcode::new(content, symbology);
        barcode.human_readable = flag(barcode_style, "humanReadable");
        if let Some(qr) = child(node, &QRCODE_STYLE) {
            let qr_path = format!("{path}/barcode:qrcodeStyle");
            if let Some(level) = qr.attribute("eccLevel") {
                barcode.error_correction = ErrorCorrection::from_level(level).ok_or_else(|| {
                    LbxError::schema(format!("{qr_path}/@eccLevel"), format!("unknown level '{level}'"))
                })?;
            }
            barcode.cell_size = length_or(qr, "cellSize", &qr_path, barcode.cell_size)?;
            keep(&mut extra, qr, &QRCODE_STYLE);
        }
        keep_unknown(&mut extra, node, &BARCODE, &[&OBJECT_STYLE, &BARCODE_STYLE, &QRCODE_STYLE, &DATA]);

        barcode.frame = style.frame;
        barcode.extra = extra;
        Ok(barcode)
    }

    fn line(&mut self, node: Node<'_, '_>, path: &str) -> Result<Line> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &POLY);
        let style = self.object_style(node, Line::label(), path, &mut extra)?;
        if let Some(poly_style) = child(node, &POLY_STYLE) {
            keep(&mut extra, poly_style, &POLY_STYLE);
            for role in [&POLY_ORG_POS, &POLY_LINE_POINTS] {
                if let Some(part) = child(poly_style, role) {
                    keep(&mut extra, part, role);
                }
            }
            keep_unknown(&mut extra, poly_style, &POLY_STYLE, &[&POLY_ORG_POS, &POLY_LINE_POINTS]);
        }
        keep_unknown(&mut extra, node, &POLY, &[&OBJECT_STYLE, &POLY_STYLE]);

        let mut line = Line::new();
        if let Some(pen) = style.pen {
            line.thickness = pen.width;
            line.color = pen.color;
            line.style = pen.style;
        }
        line.frame = style.frame;
        line.extra = extra;
        Ok(line)
    }

    fn rect(&mut self, node: Node<'_, '_>, path: &str) -> Result<Rect> {
        let mut extra = Passthrough::default();
        keep(&mut extra, node, &RECT);
        let style = self.object_style(node, Rect::label(), path, &mut extra)?;
        let mut rect = Rect::new();
        if let Some(rect_style) = child(node, &RECT_STYLE) {
            rect.corner_radius = length_or(rect_style, "roundnessX", &format!("{path}/draw:rectStyle"), 0.0)?;
            keep(&mut extra, rect_style, &RECT_STYLE);
        }
        keep_unknown(&mut extra, node, &RECT, &[&OBJECT_STYLE, &RECT_STYLE]);
        rect.frame = style.frame;
        rect.fill = style.fill;
        rect.stroke = style.pen;
        rect.extra = extra;
        Ok(rect)
    }
}

/// Make run lengths sum to `chars`: trailing runs are shortened or dropped,
/// a short total extends the last run. Text without runs gets one run in the
/// text-level font.
fn clamp_runs(runs: &mut Vec<StyleRun>, chars: usize, text_font: Option<&FontInfo>) {
    if runs.is_empty() {
        runs.push(StyleRun::new(chars, text_font.cloned().unwrap_or_default()));
        return;
    }
    let mut remaining = chars;
    for run in runs.iter_mut() {
        run.len = run.len.min(remaining);
        remaining -= run.len;
    }
    if remaining > 0 {
        if let Some(last) = runs.last_mut() {
            last.len += remaining;
        }
    }
    while runs.len() > 1 && runs.last().is_some_and(|r| r.len == 0) {
        runs.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wrap(objects: &str) -> String {
        let xmlns: String = LABEL_NAMESPACES
            .iter()
            .map(|(prefix, uri)| format!(" xmlns:{prefix}=\"{uri}\""))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <pt:document{xmlns} version=\"1.9\"><pt:body><style:sheet name=\"Sheet 1\">\
             <style:paper width=\"33.6pt\" height=\"2834.4pt\" orientation=\"landscape\" format=\"259\"/>\
             <style:backGround x=\"5.6pt\" y=\"2.8pt\" width=\"34.4pt\" height=\"28pt\"/>\
             <pt:objects>{objects}</pt:objects></style:sheet></pt:body></pt:document>"
        )
    }

    const STYLE: &str = "<pt:objectStyle x=\"5.6pt\" y=\"2.8pt\" width=\"20pt\" height=\"10pt\">\
        <pt:pen style=\"NULL\"/><pt:brush style=\"NULL\"/><pt:expanded objectName=\"Title\"/></pt:objectStyle>";

    fn font_info(size: &str) -> String {
        format!(
            "<text:ptFontInfo><text:logFont name=\"Helsinki\" weight=\"400\"/>\
             <text:fontExt size=\"{size}\"/></text:ptFontInfo>"
        )
    }

    fn text_xml(content: &str, lens: &[usize]) -> String {
        let items: String = lens
            .iter()
            .map(|len| format!("<text:stringItem charLen=\"{len}\">{}</text:stringItem>", font_info("9pt")))
            .collect();
        format!("<text:text>{STYLE}{}<pt:data>{content}</pt:data>{items}</text:text>", font_info("12pt"))
    }

    fn lenient() -> CodecOptions {
        CodecOptions {
            strict_runs: false,
            ..CodecOptions::default()
        }
    }

    #[test]
    fn test_parse_text_object() {
        let decoded = parse_label(&wrap(&text_xml("Hi\nthere", &[2, 6])), &CodecOptions::default()).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.document.paper.format, 259);
        let LayoutNode::Text(text) = &decoded.document.objects[0] else {
            panic!("expected text");
        };
        assert_eq!(text.content(), "Hi\nthere");
        assert_eq!(text.frame.name, "Title");
        assert_eq!(text.frame.width, Dimension::Pt(20.0));
        assert_eq!(text.runs().len(), 2);
        assert_eq!(text.runs()[0].font.size, 9.0);
    }

    #[test]
    fn test_strict_run_mismatch_is_schema_violation() {
        let err = parse_label(&wrap(&text_xml("abc", &[2])), &CodecOptions::default()).unwrap_err();
        match err {
            LbxError::SchemaViolation { path, .. } => assert!(path.ends_with("text:text[1]"), "{path}"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_lenient_clamps_and_warns() {
        let decoded = parse_label(&wrap(&text_xml("abc", &[2, 5])), &lenient()).unwrap();
        let LayoutNode::Text(text) = &decoded.document.objects[0] else {
            panic!("expected text");
        };
        assert_eq!(text.runs().iter().map(|r| r.len).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(
            decoded.warnings,
            vec![Warning::RunLengthClamped {
                path: "pt:document/pt:body/style:sheet/pt:objects/text:text[1]".into(),
                declared: 7,
                actual: 3,
            }]
        );
    }

    #[test]
    fn test_lenient_without_runs_uses_text_font() {
        let decoded = parse_label(&wrap(&text_xml("abc", &[])), &lenient()).unwrap();
        let LayoutNode::Text(text) = &decoded.document.objects[0] else {
            panic!("expected text");
        };
        assert_eq!(text.runs().len(), 1);
        assert_eq!(text.runs()[0].len, 3);
        assert_eq!(text.runs()[0].font.size, 12.0);
    }

    #[test]
    fn test_unknown_element_warns_and_continues() {
        let xml = wrap(&format!("<table:table/>{}", text_xml("x", &[1])));
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        assert_eq!(decoded.document.objects.len(), 1);
        assert_eq!(
            decoded.warnings,
            vec![Warning::UnknownElement {
                path: "pt:document/pt:body/style:sheet/pt:objects/table:table[1]".into(),
                name: "table:table".into(),
            }]
        );
    }

    #[test]
    fn test_missing_data_names_path() {
        let xml = wrap(&format!("<text:text>{STYLE}</text:text>"));
        let err = parse_label(&xml, &CodecOptions::default()).unwrap_err();
        assert!(err.to_string().contains("text:text[1]: missing <pt:data>"), "{err}");
    }

    #[test]
    fn test_bad_length_names_attribute() {
        let xml = wrap("<draw:rect><pt:objectStyle x=\"wide\" y=\"0pt\" width=\"1pt\" height=\"1pt\"/></draw:rect>");
        let err = parse_label(&xml, &CodecOptions::default()).unwrap_err();
        assert!(err.to_string().contains("draw:rect[1]/pt:objectStyle/@x"), "{err}");
    }

    #[test]
    fn test_passthrough_keeps_non_default_attributes() {
        let xml = wrap(
            "<draw:rect><pt:objectStyle x=\"0pt\" y=\"0pt\" width=\"9pt\" height=\"9pt\" angle=\"90\" ropMode=\"COPYPEN\">\
             <pt:pen style=\"INSIDEFRAME\" widthX=\"1pt\" widthY=\"1pt\" color=\"#000000\" printColorNumber=\"1\"/>\
             </pt:objectStyle><draw:rectStyle roundnessX=\"2pt\" roundnessY=\"2pt\" shape=\"ROUNDRECTANGLE\"/></draw:rect>",
        );
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        let LayoutNode::Rect(rect) = &decoded.document.objects[0] else {
            panic!("expected rect");
        };
        let style = rect.extra.get("objectStyle").unwrap();
        assert_eq!(style.len(), 1);
        assert_eq!(style["angle"], "90");
        assert!(rect.extra.get("pen").is_none());
        assert_eq!(rect.extra.get("rectStyle").unwrap()["shape"], "ROUNDRECTANGLE");
        assert_eq!(rect.corner_radius, 2.0);
        assert_eq!(rect.stroke.as_ref().map(|s| s.width), Some(1.0));
    }

    #[test]
    fn test_group_children_keep_page_coordinates() {
        let inner = text_xml("in", &[2]);
        let xml = wrap(&format!(
            "<pt:group><pt:objectStyle x=\"1pt\" y=\"2pt\" width=\"50pt\" height=\"20pt\" backColor=\"#FF0000\"/>\
             <pt:objects>{inner}</pt:objects></pt:group>"
        ));
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        let LayoutNode::Group(group) = &decoded.document.objects[0] else {
            panic!("expected group");
        };
        assert_eq!(group.arrangement, Arrangement::Absolute);
        assert_eq!(group.style.background.as_deref(), Some("#FF0000"));
        assert_eq!(group.children.len(), 1);
    }

    const VENDOR_RECT: &str = "<draw:rect xmlns:x=\"urn:vendor\" x:tag=\"keep-me\">\
        <pt:objectStyle x=\"0pt\" y=\"0pt\" width=\"9pt\" height=\"9pt\">\
        <pt:pen style=\"DOT\" widthX=\"1pt\" widthY=\"1pt\" color=\"#000000\"/></pt:objectStyle>\
        <x:vendorData a=\"1\"><x:note>5 &lt; 6</x:note></x:vendorData></draw:rect>";

    #[test]
    fn test_namespaced_attributes_and_unknown_children_are_kept() {
        let decoded = parse_label(&wrap(VENDOR_RECT), &CodecOptions::default()).unwrap();
        let LayoutNode::Rect(rect) = &decoded.document.objects[0] else {
            panic!("expected rect");
        };
        let attrs = rect.extra.get("rect").unwrap();
        assert_eq!(attrs["xmlns:x"], "urn:vendor");
        assert_eq!(attrs["x:tag"], "keep-me");
        assert_eq!(
            rect.extra.elements("rect"),
            &["<x:vendorData xmlns:x=\"urn:vendor\" a=\"1\"><x:note>5 &lt; 6</x:note></x:vendorData>".to_string()]
        );
        assert_eq!(rect.stroke.as_ref().map(|s| s.style), Some(PenStyle::Dot));
        assert!(rect.extra.get("pen").is_none());
    }

    #[test]
    fn test_unknown_tokens_are_kept_raw() {
        let xml = wrap(&format!(
            "<text:text>{STYLE}<text:textAlign horizontalAlignment=\"DISTRIBUTED\"/><pt:data>a</pt:data>\
             <text:stringItem charLen=\"1\">{}</text:stringItem></text:text>\
             <draw:rect><pt:objectStyle x=\"0pt\" y=\"0pt\" width=\"9pt\" height=\"9pt\">\
             <pt:pen style=\"HATCHED\"/><pt:brush style=\"PATTERN\" color=\"#FF0000\"/></pt:objectStyle></draw:rect>",
            font_info("9pt")
        ));
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        let LayoutNode::Text(text) = &decoded.document.objects[0] else {
            panic!("expected text");
        };
        assert_eq!(text.align, TextAlign::Left);
        assert_eq!(text.extra.get("textAlign").unwrap()["horizontalAlignment"], "DISTRIBUTED");

        let LayoutNode::Rect(rect) = &decoded.document.objects[1] else {
            panic!("expected rect");
        };
        assert_eq!(rect.stroke.as_ref().map(|s| s.style), Some(PenStyle::InsideFrame));
        assert_eq!(rect.extra.get("pen").unwrap()["style"], "HATCHED");
        assert_eq!(rect.fill.as_deref(), Some("#FF0000"));
        assert_eq!(rect.extra.get("brush").unwrap()["style"], "PATTERN");
    }

    #[test]
    fn test_foreign_prefix_clashing_with_label_prefix() {
        let xml = wrap(
            "<draw:rect><pt:objectStyle x=\"0pt\" y=\"0pt\" width=\"9pt\" height=\"9pt\"/>\
             <o:extra xmlns:o=\"urn:other\" xmlns:q=\"urn:q\" q:a=\"1\"><text:note xmlns:text=\"urn:not-label\"/><plain/></o:extra></draw:rect>",
        );
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        let LayoutNode::Rect(rect) = &decoded.document.objects[0] else {
            panic!("expected rect");
        };
        assert_eq!(
            rect.extra.elements("rect"),
            &["<o:extra xmlns:o=\"urn:other\" xmlns:q=\"urn:q\" q:a=\"1\"><ns0:note xmlns:ns0=\"urn:not-label\"/><plain/></o:extra>"
                .to_string()]
        );
    }

    #[test]
    fn test_white_group_background_reads_as_none() {
        let xml = wrap(
            "<pt:group><pt:objectStyle x=\"1pt\" y=\"2pt\" width=\"50pt\" height=\"20pt\" backColor=\"#ffffff\"/>\
             </pt:group>",
        );
        let decoded = parse_label(&xml, &CodecOptions::default()).unwrap();
        let LayoutNode::Group(group) = &decoded.document.objects[0] else {
            panic!("expected group");
        };
        assert_eq!(group.style.background, None);
    }

    #[test]
    fn test_wrong_root() {
        let err = parse_label("<root/>", &CodecOptions::default()).unwrap_err();
        assert!(matches!(err, LbxError::SchemaViolation { .. }));
    }

    #[test]
    fn test_clamp_runs() {
        let font = FontInfo::default();
        let mut runs = vec![StyleRun::new(1, font.clone()), StyleRun::new(1, font.clone())];
        clamp_runs(&mut runs, 5, None);
        assert_eq!(runs.iter().map(|r| r.len).collect::<Vec<_>>(), vec![1, 4]);

        let mut runs = vec![StyleRun::new(4, font.clone()), StyleRun::new(3, font)];
        clamp_runs(&mut runs, 2, None);
        assert_eq!(runs.iter().map(|r| r.len).collect::<Vec<_>>(), vec![2]);
    }
}
