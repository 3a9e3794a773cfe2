//! Minified XML writer.
//!
//! Output is the declaration line followed by the document with no
//! whitespace between elements. Attributes keep the order they were added
//! in.

use crate::document::Passthrough;

use super::schema::Role;

pub const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

pub struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            buf: String::from(DECLARATION),
        }
    }

    /// Start an element with no attribute table.
    pub fn tag(&mut self, name: &'static str) -> Tag<'_> {
        Tag {
            writer: self,
            name,
            role: None,
            attrs: Vec::new(),
        }
    }

    /// Start an element described by a schema role.
    pub fn role(&mut self, role: &'static Role) -> Tag<'_> {
        Tag {
            writer: self,
            name: role.element,
            role: Some(role),
            attrs: Vec::new(),
        }
    }

    pub fn close(&mut self, name: &str) {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    pub fn text(&mut self, text: &str) {
        escape_into(&mut self.buf, text, false);
    }

    /// Append markup that is already serialized.
    pub fn raw(&mut self, xml: &str) {
        self.buf.push_str(xml);
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

struct Attr {
    name: String,
    value: String,
    modeled: bool,
}

/// Element under construction.
pub struct Tag<'w> {
    writer: &'w mut XmlWriter,
    name: &'static str,
    role: Option<&'static Role>,
    attrs: Vec<Attr>,
}

impl Tag<'_> {
    /// A value owned by the document model. Passthrough never replaces it.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: name.to_string(),
            value: value.into(),
            modeled: true,
        });
        self
    }

    /// A modeled value the model may not have been able to represent
    /// exactly. A passthrough value of the same name replaces it.
    pub fn token(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: name.to_string(),
            value: value.into(),
            modeled: false,
        });
        self
    }

    /// The role's default value for `name`.
    pub fn default(mut self, name: &str) -> Self {
        let value = self
            .role
            .and_then(|r| r.default_value(name))
            .unwrap_or_default();
        self.attrs.push(Attr {
            name: name.to_string(),
            value: value.to_string(),
            modeled: false,
        });
        self
    }

    /// Every default of the role, in table order.
    pub fn defaults(mut self) -> Self {
        if let Some(role) = self.role {
            for (name, value) in role.defaults {
                self.attrs.push(Attr {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                    modeled: false,
                });
            }
        }
        self
    }

    /// Apply the stored passthrough attributes for this role: defaults of
    /// the same name are replaced in place, unknown names are appended.
    pub fn extra(self, extra: &Passthrough) -> Self {
        let key = self.role.map(|r| r.key).unwrap_or(self.name);
        self.extra_as(extra, key)
    }

    /// Like [`Tag::extra`] with an explicit passthrough key.
    pub fn extra_as(mut self, extra: &Passthrough, key: &str) -> Self {
        let Some(attrs) = extra.get(key) else {
            return self;
        };
        for (name, value) in attrs {
            match self.attrs.iter_mut().find(|a| &a.name == name) {
                Some(existing) if existing.modeled => {}
                Some(existing) => existing.value = value.clone(),
                None => self.attrs.push(Attr {
                    name: name.clone(),
                    value: value.clone(),
                    modeled: false,
                }),
            }
        }
        self
    }

    fn write_start(&mut self) {
        let buf = &mut self.writer.buf;
        buf.push('<');
        buf.push_str(self.name);
        for attr in &self.attrs {
            buf.push(' ');
            buf.push_str(&attr.name);
            buf.push_str("=\"");
            escape_into(buf, &attr.value, true);
            buf.push('"');
        }
    }

    /// `<name .../>`
    pub fn empty(mut self) {
        self.write_start();
        self.writer.buf.push_str("/>");
    }

    /// `<name ...>`, closed later with [`XmlWriter::close`].
    pub fn open(mut self) {
        self.write_start();
        self.writer.buf.push('>');
    }

    /// `<name ...>text</name>`, or `<name .../>` for empty text.
    pub fn text(mut self, text: &str) {
        self.write_start();
        if text.is_empty() {
            self.writer.buf.push_str("/>");
            return;
        }
        self.writer.buf.push('>');
        escape_into(&mut self.writer.buf, text, false);
        let name = self.name;
        self.writer.close(name);
    }
}

/// Escape markup characters. Line breaks and tabs in attributes become
/// character references so parsers do not normalize them to spaces.
pub(super) fn escape_into(buf: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' if attribute => buf.push_str("&quot;"),
            '\n' if attribute => buf.push_str("&#10;"),
            '\t' if attribute => buf.push_str("&#9;"),
            '\r' => buf.push_str("&#13;"),
            other => buf.push(other),
        }
    }
}
