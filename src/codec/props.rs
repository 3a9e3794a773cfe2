//! `prop.xml`: document properties shown by the label editor.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::document::Properties;
use crate::error::{LbxError, Result};

use super::schema::{NS_DC, NS_DCTERMS, NS_META};
use super::xml::XmlWriter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const APP_NAME: &str = "com.brother.PtouchEditor";

/// Render `prop.xml`. Missing timestamps are taken from `now`.
pub fn write_props(props: &Properties, now: DateTime<Utc>) -> String {
    let created = props.created.unwrap_or(now).format(TIMESTAMP_FORMAT).to_string();
    let modified = props.modified.unwrap_or(now).format(TIMESTAMP_FORMAT).to_string();

    let mut w = XmlWriter::new();
    w.tag("meta:properties")
        .attr("xmlns:meta", NS_META)
        .attr("xmlns:dc", NS_DC)
        .attr("xmlns:dcterms", NS_DCTERMS)
        .open();
    let fields = [
        ("meta:appName", APP_NAME),
        ("dc:title", props.title.as_str()),
        ("dc:subject", props.subject.as_str()),
        ("dc:creator", props.creator.as_str()),
        ("meta:keyword", props.keywords.as_str()),
        ("dc:description", props.description.as_str()),
        ("meta:template", ""),
        ("dcterms:created", created.as_str()),
        ("dcterms:modified", modified.as_str()),
        ("meta:lastPrinted", ""),
        ("meta:modifiedBy", ""),
        ("meta:revision", "1"),
        ("meta:editTime", "0"),
        ("meta:numPages", "1"),
        ("meta:numWords", "0"),
        ("meta:numChars", "0"),
        ("meta:security", "0"),
        ("meta:transferScript", ""),
    ];
    for (name, value) in fields {
        w.tag(name).text(value);
    }
    w.close("meta:properties");
    w.finish()
}

/// Read the fields [`Properties`] models. Everything else is regenerated on
/// write.
pub fn read_props(xml: &str) -> Result<Properties> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if !root.has_tag_name((NS_META, "properties")) {
        return Err(LbxError::schema(
            "prop.xml",
            format!("expected meta:properties, found {}", root.tag_name().name()),
        ));
    }

    let text = |ns: &str, name: &str| -> String {
        root.children()
            .find(|n| n.has_tag_name((ns, name)))
            .and_then(|n| n.text())
            .unwrap_or_default()
            .to_string()
    };
    let timestamp = |name: &str| -> Result<Option<DateTime<Utc>>> {
        let value = text(NS_DCTERMS, name);
        if value.trim().is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
            .map(|t| Some(t.and_utc()))
            .map_err(|e| LbxError::schema(format!("prop.xml/meta:properties/dcterms:{name}"), e.to_string()))
    };

    Ok(Properties {
        title: text(NS_DC, "title"),
        subject: text(NS_DC, "subject"),
        creator: text(NS_DC, "creator"),
        keywords: text(NS_META, "keyword"),
        description: text(NS_DC, "description"),
        created: timestamp("created")?,
        modified: timestamp("modified")?,
    })
}
