//! # LBX Codec
//!
//! An `.lbx` file is a zip archive:
//!
//! ```text
//! label.lbx
//! ├── label.xml   object tree, geometry, fonts, runs
//! ├── prop.xml    title, creator, timestamps
//! └── *.bmp ...   image data, carried through as resources
//! ```
//!
//! [`write_archive`] needs a [`ComputedLayout`] for the document: the XML
//! stores absolute page coordinates only. [`read_archive`] turns those back
//! into a document whose nodes all have explicit frames.

mod parse;
mod props;
mod schema;
mod write;
mod xml;

pub use parse::{Decoded, parse_label};
pub use props::{read_props, write_props};
pub use write::{compact_runs, serialize_label};

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use log::debug;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::config::CodecOptions;
use crate::document::{LabelDocument, Resource};
use crate::error::{LbxError, Result};
use crate::layout::ComputedLayout;

pub const LABEL_ENTRY: &str = "label.xml";
pub const PROP_ENTRY: &str = "prop.xml";

/// Build the archive bytes. Nothing is returned unless every entry was
/// written.
pub fn write_archive(doc: &LabelDocument, layout: &ComputedLayout, options: &CodecOptions) -> Result<Vec<u8>> {
    let label = serialize_label(doc, layout, options)?;
    let props = write_props(&doc.properties, Utc::now());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(LABEL_ENTRY, deflated)?;
    zip.write_all(label.as_bytes())?;
    zip.start_file(PROP_ENTRY, deflated)?;
    zip.write_all(props.as_bytes())?;
    for resource in &doc.resources {
        if resource.name == LABEL_ENTRY || resource.name == PROP_ENTRY {
            continue;
        }
        zip.start_file(resource.name.as_str(), deflated)?;
        zip.write_all(&resource.data)?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(bytes = bytes.len(), resources = doc.resources.len(); "Archive written");
    Ok(bytes)
}

/// Read archive bytes back into a document.
pub fn read_archive(bytes: &[u8], options: &CodecOptions) -> Result<Decoded> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;

    let label = match zip.by_name(LABEL_ENTRY) {
        Ok(mut entry) => read_utf8(&mut entry, LABEL_ENTRY)?,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(LbxError::schema(LABEL_ENTRY, "archive has no label.xml entry"));
        }
        Err(e) => return Err(e.into()),
    };
    let mut decoded = parse_label(&label, options)?;

    let mut resources = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        match name.as_str() {
            LABEL_ENTRY => {}
            PROP_ENTRY => {
                let xml = read_utf8(&mut entry, PROP_ENTRY)?;
                decoded.document.properties = read_props(&xml)?;
            }
            _ => {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                resources.push(Resource { name, data });
            }
        }
    }
    decoded.document.resources = resources;
    Ok(decoded)
}

fn read_utf8(entry: &mut impl Read, name: &str) -> Result<String> {
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    let text = String::from_utf8(data).map_err(|e| LbxError::schema(name, format!("not UTF-8: {e}")))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutOptions;
    use crate::document::{FontInfo, LayoutNode, StyleRun, Text};
    use crate::layout::layout;
    use crate::metrics::{FontCache, ReferenceMetrics};
    use crate::text::TextCalculator;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn archive(doc: &LabelDocument) -> Vec<u8> {
        let cache = FontCache::new(ReferenceMetrics::builtin());
        let calc = TextCalculator::new(&cache, LayoutOptions::default());
        let computed = layout(doc, &calc).unwrap();
        write_archive(doc, &computed, &CodecOptions::default()).unwrap()
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_archive_entries() {
        let mut doc = LabelDocument::default();
        doc.push(Text::new("Hello"));
        doc.resources.push(Resource {
            name: "Object0.bmp".into(),
            data: vec![0x42, 0x4d, 1, 2, 3],
        });
        doc.resources.push(Resource {
            name: "label.xml".into(),
            data: b"stale".to_vec(),
        });
        let mut names = entry_names(&archive(&doc));
        names.sort();
        assert_eq!(names, vec!["Object0.bmp", "label.xml", "prop.xml"]);
    }

    #[test]
    fn test_read_back_resources_and_properties() {
        let mut doc = LabelDocument::default();
        doc.properties.title = "Shelf B".into();
        doc.push(Text::new("Hello"));
        doc.resources.push(Resource {
            name: "Object0.bmp".into(),
            data: vec![9, 8, 7],
        });
        let decoded = read_archive(&archive(&doc), &CodecOptions::default()).unwrap();
        assert_eq!(decoded.document.properties.title, "Shelf B");
        assert!(decoded.document.properties.created.is_some());
        assert_eq!(decoded.document.resources, doc.resources);
        assert_eq!(decoded.document.objects.len(), 1);
    }

    #[test]
    fn test_run_lengths_survive_round_trip() {
        let plain = FontInfo::new("Arial", 10.0);
        let runs = vec![
            StyleRun::new(3, plain.clone()),
            StyleRun::new(4, plain.clone().bold()),
            StyleRun::new(2, plain),
        ];
        let mut doc = LabelDocument::default();
        doc.push(Text::from_runs("ab\ncdé\nfg", runs).unwrap());
        let decoded = read_archive(&archive(&doc), &CodecOptions::default()).unwrap();
        let LayoutNode::Text(text) = &decoded.document.objects[0] else {
            panic!("expected text");
        };
        assert_eq!(text.runs().iter().map(|r| r.len).collect::<Vec<_>>(), vec![3, 4, 2]);
        assert_eq!(text.runs().iter().map(|r| r.len).sum::<usize>(), text.char_len());
        assert!(text.runs()[1].font.is_bold());
    }

    #[test]
    fn test_unmodeled_attributes_survive_round_trip() {
        let mut text = Text::new("tag");
        let mut attrs = indexmap::IndexMap::new();
        attrs.insert("angle".to_string(), "90".to_string());
        attrs.insert("customFlag".to_string(), "yes".to_string());
        text.extra.insert("objectStyle", attrs);
        let mut doc = LabelDocument::default();
        doc.push(text.clone());

        let first = read_archive(&archive(&doc), &CodecOptions::default()).unwrap();
        let second = read_archive(&archive(&first.document), &CodecOptions::default()).unwrap();
        for decoded in [&first, &second] {
            let LayoutNode::Text(parsed) = &decoded.document.objects[0] else {
                panic!("expected text");
            };
            assert_eq!(parsed.extra, text.extra);
        }
    }

    fn label_of(bytes: &[u8]) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        read_utf8(&mut zip.by_name(LABEL_ENTRY).unwrap(), LABEL_ENTRY).unwrap()
    }

    fn archive_with_label(label: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(LABEL_ENTRY, SimpleFileOptions::default()).unwrap();
        zip.write_all(label.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_vendor_markup_survives_rewrite() {
        let mut doc = LabelDocument::default();
        doc.push(Text::new("seed"));
        let seed = label_of(&archive(&doc));
        let vendor = "<draw:rect xmlns:x=\"urn:vendor\" x:tag=\"keep-me\">\
            <pt:objectStyle x=\"5.6pt\" y=\"2.8pt\" width=\"10pt\" height=\"10pt\">\
            <pt:pen style=\"DOT\" widthX=\"1pt\" widthY=\"1pt\" color=\"#000000\"/></pt:objectStyle>\
            <x:vendorData a=\"1\"/></draw:rect>";
        let aligned = "<text:textAlign horizontalAlignment=\"LEFT\"";
        assert!(seed.contains(aligned));
        let label = seed
            .replacen(aligned, "<text:textAlign horizontalAlignment=\"DISTRIBUTED\"", 1)
            .replacen("</pt:objects>", &format!("{vendor}</pt:objects>"), 1);

        let first = read_archive(&archive_with_label(&label), &CodecOptions::default()).unwrap();
        let written = archive(&first.document);
        let xml = label_of(&written);
        assert!(xml.contains("<draw:rect xmlns:x=\"urn:vendor\" x:tag=\"keep-me\">"), "{xml}");
        assert!(xml.contains("<pt:pen style=\"DOT\""));
        assert!(xml.contains("<x:vendorData xmlns:x=\"urn:vendor\" a=\"1\"/></draw:rect>"));
        assert!(xml.contains("horizontalAlignment=\"DISTRIBUTED\""));

        let second = read_archive(&written, &CodecOptions::default()).unwrap();
        assert_eq!(label_of(&archive(&second.document)), xml);
    }

    #[test]
    fn test_group_background_round_trip() {
        use crate::document::{FlexStyle, Group};
        let mut red = Group::new(40.0, 10.0, FlexStyle::row());
        red.style.background = Some("#FF0000".into());
        let mut white = Group::new(40.0, 10.0, FlexStyle::row());
        white.style.background = Some("#FFFFFF".into());
        let mut doc = LabelDocument::default();
        doc.push(red);
        doc.push(white);

        let decoded = read_archive(&archive(&doc), &CodecOptions::default()).unwrap();
        let backgrounds: Vec<Option<String>> = decoded
            .document
            .objects
            .iter()
            .map(|node| match node {
                LayoutNode::Group(group) => group.style.background.clone(),
                _ => panic!("expected group"),
            })
            .collect();
        // White is the editor's "no background".
        assert_eq!(backgrounds, vec![Some("#FF0000".to_string()), None]);
    }

    #[test]
    fn test_missing_label_entry() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("prop.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        let err = read_archive(&bytes, &CodecOptions::default()).unwrap_err();
        assert!(matches!(err, LbxError::SchemaViolation { ref path, .. } if path == "label.xml"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = read_archive(b"plain text", &CodecOptions::default()).unwrap_err();
        assert!(matches!(err, LbxError::Archive(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_serialized_runs_cover_text(
            pieces in prop::collection::vec(("[a-z \n]{0,6}", any::<bool>()), 1..6),
            compact in any::<bool>(),
        ) {
            let content: String = pieces.iter().map(|(s, _)| s.as_str()).collect();
            let runs: Vec<StyleRun> = pieces
                .iter()
                .map(|(s, bold)| {
                    let font = FontInfo::new("Helsinki", 9.0);
                    StyleRun::new(s.chars().count(), if *bold { font.bold() } else { font })
                })
                .collect();
            let mut doc = LabelDocument::default();
            doc.push(Text::from_runs(content, runs).unwrap());

            let cache = FontCache::new(ReferenceMetrics::builtin());
            let calc = TextCalculator::new(&cache, LayoutOptions::default());
            let computed = layout(&doc, &calc).unwrap();
            let options = CodecOptions {
                compact_runs: compact,
                ..CodecOptions::default()
            };
            let bytes = write_archive(&doc, &computed, &options).unwrap();
            let decoded = read_archive(&bytes, &options).unwrap();
            let LayoutNode::Text(text) = &decoded.document.objects[0] else {
                panic!("expected text");
            };
            let total: usize = text.runs().iter().map(|r| r.len).sum();
            prop_assert_eq!(total, text.char_len());
        }
    }
}
