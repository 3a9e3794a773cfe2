//! Element vocabulary of `label.xml`.
//!
//! Each [`Role`] names one element, the attributes the document model owns
//! (`modeled`) and the values the label editor writes for everything else
//! (`defaults`). The writer emits defaults in table order unless a
//! passthrough value replaces them. The parser keeps every attribute that is
//! neither modeled nor equal to its default, so an archive this crate wrote
//! parses back without passthrough noise.

pub const NS_PT: &str = "http://schemas.brother.info/ptouch/2007/lbx/main";
pub const NS_STYLE: &str = "http://schemas.brother.info/ptouch/2007/lbx/style";
pub const NS_TEXT: &str = "http://schemas.brother.info/ptouch/2007/lbx/text";
pub const NS_DRAW: &str = "http://schemas.brother.info/ptouch/2007/lbx/draw";
pub const NS_IMAGE: &str = "http://schemas.brother.info/ptouch/2007/lbx/image";
pub const NS_BARCODE: &str = "http://schemas.brother.info/ptouch/2007/lbx/barcode";
pub const NS_DATABASE: &str = "http://schemas.brother.info/ptouch/2007/lbx/database";
pub const NS_TABLE: &str = "http://schemas.brother.info/ptouch/2007/lbx/table";
pub const NS_CABLE: &str = "http://schemas.brother.info/ptouch/2007/lbx/cable";
pub const NS_META: &str = "http://schemas.brother.info/ptouch/2007/lbx/meta";
pub const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const NS_DCTERMS: &str = "http://purl.org/dc/terms/";

/// Prefixes declared on `pt:document`, in declaration order.
pub const LABEL_NAMESPACES: &[(&str, &str)] = &[
    ("pt", NS_PT),
    ("style", NS_STYLE),
    ("text", NS_TEXT),
    ("draw", NS_DRAW),
    ("image", NS_IMAGE),
    ("barcode", NS_BARCODE),
    ("database", NS_DATABASE),
    ("table", NS_TABLE),
    ("cable", NS_CABLE),
];

/// Prefix for a namespace URI, used in element paths.
pub fn prefix_of(uri: &str) -> Option<&'static str> {
    LABEL_NAMESPACES
        .iter()
        .chain(&[("meta", NS_META), ("dc", NS_DC), ("dcterms", NS_DCTERMS)])
        .find(|(_, ns)| *ns == uri)
        .map(|(prefix, _)| *prefix)
}

#[derive(Debug)]
pub struct Role {
    /// Namespace URI of the element.
    pub ns: &'static str,
    /// Qualified element name as written.
    pub element: &'static str,
    /// Passthrough key the element's unmodeled attributes are stored under.
    pub key: &'static str,
    pub modeled: &'static [&'static str],
    pub defaults: &'static [(&'static str, &'static str)],
}

impl Role {
    /// Local element name (after the prefix).
    pub fn local(&self) -> &'static str {
        self.element
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(self.element)
    }

    pub fn default_value(&self, name: &str) -> Option<&'static str> {
        self.defaults.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Whether the parser should keep this attribute as passthrough.
    pub fn is_passthrough(&self, name: &str, value: &str) -> bool {
        !self.modeled.contains(&name) && self.default_value(name) != Some(value)
    }
}

macro_rules! roles {
    ($(
        $name:ident = $ns:ident $element:literal as $key:literal {
            modeled: [$($m:literal),* $(,)?],
            defaults: [$($d:literal = $v:literal),* $(,)?] $(,)?
        }
    )+) => {
        $(
            pub const $name: Role = Role {
                ns: $ns,
                element: $element,
                key: $key,
                modeled: &[$($m),*],
                defaults: &[$(($d, $v)),*],
            };
        )+
    };
}

roles! {
    // Document frame
    DOCUMENT = NS_PT "pt:document" as "document" {
        modeled: [],
        defaults: ["version" = "1.9", "generator" = "com.brother.PtouchEditor"],
    }
    BODY = NS_PT "pt:body" as "body" {
        modeled: [],
        defaults: ["currentSheet" = "Sheet 1", "direction" = "LTR"],
    }
    SHEET = NS_STYLE "style:sheet" as "sheet" {
        modeled: [],
        defaults: ["name" = "Sheet 1"],
    }
    PAPER = NS_STYLE "style:paper" as "paper" {
        modeled: [
            "width", "height", "marginLeft", "marginTop", "marginRight", "marginBottom",
            "orientation", "autoLength", "paperColor", "paperInk", "format", "printerID", "printerName",
        ],
        defaults: [
            "media" = "0", "monochromeDisplay" = "true", "printColorDisplay" = "false",
            "printColorsID" = "0", "split" = "1", "backgroundTheme" = "0",
        ],
    }
    CUT_LINE = NS_STYLE "style:cutLine" as "cutLine" {
        modeled: [],
        defaults: ["regularCut" = "0pt", "freeCut" = ""],
    }
    BACKGROUND = NS_STYLE "style:backGround" as "backGround" {
        modeled: ["x", "y", "width", "height", "color", "backColor"],
        defaults: [
            "brushStyle" = "NULL", "brushId" = "0", "userPattern" = "NONE", "userPatternId" = "0",
            "printColorNumber" = "1", "backPrintColorNumber" = "0",
        ],
    }
    OBJECTS = NS_PT "pt:objects" as "objects" {
        modeled: [],
        defaults: [],
    }

    // Shared object parts
    OBJECT_STYLE = NS_PT "pt:objectStyle" as "objectStyle" {
        modeled: ["x", "y", "width", "height", "backColor"],
        defaults: [
            "backColor" = "#FFFFFF", "backPrintColorNumber" = "0", "ropMode" = "COPYPEN",
            "angle" = "0", "anchor" = "TOPLEFT", "flip" = "NONE",
        ],
    }
    PEN = NS_PT "pt:pen" as "pen" {
        modeled: ["style", "widthX", "widthY", "color"],
        defaults: [
            "style" = "NULL", "widthX" = "0.5pt", "widthY" = "0.5pt", "color" = "#000000",
            "printColorNumber" = "1",
        ],
    }
    BRUSH = NS_PT "pt:brush" as "brush" {
        modeled: ["style", "color"],
        defaults: ["style" = "NULL", "color" = "#000000", "printColorNumber" = "1", "id" = "0"],
    }
    EXPANDED = NS_PT "pt:expanded" as "expanded" {
        modeled: ["objectName", "lock"],
        defaults: [
            "ID" = "0", "templateMergeTarget" = "LABELLIST", "templateMergeType" = "NONE",
            "templateMergeID" = "0", "linkStatus" = "NONE", "linkID" = "0",
        ],
    }
    DATA = NS_PT "pt:data" as "data" {
        modeled: [],
        defaults: [],
    }

    // Text
    TEXT = NS_TEXT "text:text" as "text" {
        modeled: [],
        defaults: [],
    }
    PT_FONT_INFO = NS_TEXT "text:ptFontInfo" as "ptFontInfo" {
        modeled: [],
        defaults: [],
    }
    TEXT_LOG_FONT = NS_TEXT "text:logFont" as "textLogFont" {
        modeled: ["name", "italic", "weight"],
        defaults: ["width" = "0", "charSet" = "0", "pitchAndFamily" = "2"],
    }
    TEXT_FONT_EXT = NS_TEXT "text:fontExt" as "textFontExt" {
        modeled: ["underline", "strikeout", "size", "orgSize", "textColor"],
        defaults: ["effect" = "NOEFFECT", "textPrintColorNumber" = "1"],
    }
    TEXT_CONTROL = NS_TEXT "text:textControl" as "textControl" {
        modeled: [],
        defaults: [
            "control" = "AUTOLEN", "clipFrame" = "false", "aspectNormal" = "true",
            "shrink" = "true", "autoLF" = "false", "avoidImage" = "false",
        ],
    }
    TEXT_ALIGN = NS_TEXT "text:textAlign" as "textAlign" {
        modeled: ["horizontalAlignment"],
        defaults: ["verticalAlignment" = "TOP", "inLineAlignment" = "BASELINE"],
    }
    TEXT_STYLE = NS_TEXT "text:textStyle" as "textStyle" {
        modeled: ["vertical", "orgPoint"],
        defaults: [
            "nullBlock" = "false", "charSpace" = "0", "lineSpace" = "0", "combinedChars" = "false",
        ],
    }
    STRING_ITEM = NS_TEXT "text:stringItem" as "stringItem" {
        modeled: ["charLen"],
        defaults: [],
    }
    LOG_FONT = NS_TEXT "text:logFont" as "logFont" {
        modeled: ["name", "italic", "weight"],
        defaults: ["width" = "0", "charSet" = "0", "pitchAndFamily" = "2"],
    }
    FONT_EXT = NS_TEXT "text:fontExt" as "fontExt" {
        modeled: ["underline", "strikeout", "size", "orgSize", "textColor"],
        defaults: ["effect" = "NOEFFECT", "textPrintColorNumber" = "1"],
    }

    // Group
    GROUP = NS_PT "pt:group" as "group" {
        modeled: [],
        defaults: [],
    }

    // Image
    IMAGE = NS_IMAGE "image:image" as "image" {
        modeled: [],
        defaults: [],
    }
    IMAGE_STYLE = NS_IMAGE "image:imageStyle" as "imageStyle" {
        modeled: ["originalName", "fileName"],
        defaults: ["alignInText" = "NONE", "firstMerge" = "true", "IpName" = ""],
    }
    TRANSPARENT = NS_IMAGE "image:transparent" as "transparent" {
        modeled: [],
        defaults: ["flag" = "false", "color" = "#FFFFFF"],
    }
    TRIMMING = NS_IMAGE "image:trimming" as "trimming" {
        modeled: [],
        defaults: [
            "flag" = "false", "shape" = "RECTANGLE", "trimOrgX" = "0pt", "trimOrgY" = "0pt",
            "trimOrgWidth" = "0pt", "trimOrgHeight" = "0pt",
        ],
    }
    ORG_POS = NS_IMAGE "image:orgPos" as "orgPos" {
        modeled: ["x", "y", "width", "height"],
        defaults: [],
    }
    EFFECT = NS_IMAGE "image:effect" as "effect" {
        modeled: ["effect"],
        defaults: ["brightness" = "50", "contrast" = "50", "photoIndex" = "4"],
    }
    MONO = NS_IMAGE "image:mono" as "mono" {
        modeled: ["operationKind"],
        defaults: [
            "reverse" = "0", "ditherKind" = "MESH", "threshold" = "128", "gamma" = "100",
            "ditherEdge" = "0", "rgbconvProportionRed" = "30", "rgbconvProportionGreen" = "59",
            "rgbconvProportionBlue" = "11", "rgbconvProportionReversed" = "0",
        ],
    }

    // Barcode
    BARCODE = NS_BARCODE "barcode:barcode" as "barcode" {
        modeled: [],
        defaults: [],
    }
    BARCODE_STYLE = NS_BARCODE "barcode:barcodeStyle" as "barcodeStyle" {
        modeled: ["protocol", "humanReadable"],
        defaults: [
            "lengths" = "0", "zeroFill" = "false", "barWidth" = "0.8pt", "barRatio" = "1:3",
            "humanReadableAlignment" = "LEFT", "checkDigit" = "false", "autoLengths" = "true",
            "margin" = "true", "sameLengthBar" = "false", "bearerBar" = "false",
        ],
    }
    QRCODE_STYLE = NS_BARCODE "barcode:qrcodeStyle" as "qrcodeStyle" {
        modeled: ["eccLevel", "cellSize"],
        defaults: [
            "model" = "2", "mbcs" = "auto", "joint" = "1", "version" = "auto",
            "changeVersionDrag" = "false",
        ],
    }

    // Shapes
    POLY = NS_DRAW "draw:poly" as "poly" {
        modeled: [],
        defaults: [],
    }
    POLY_STYLE = NS_DRAW "draw:polyStyle" as "polyStyle" {
        modeled: [],
        defaults: ["shape" = "LINE"],
    }
    POLY_ORG_POS = NS_DRAW "draw:polyOrgPos" as "polyOrgPos" {
        modeled: ["x", "y", "width", "height"],
        defaults: [],
    }
    POLY_LINE_POINTS = NS_DRAW "draw:polyLinePoints" as "polyLinePoints" {
        modeled: ["points"],
        defaults: [],
    }
    RECT = NS_DRAW "draw:rect" as "rect" {
        modeled: [],
        defaults: [],
    }
    RECT_STYLE = NS_DRAW "draw:rectStyle" as "rectStyle" {
        modeled: ["roundnessX", "roundnessY"],
        defaults: ["shape" = "RECTANGLE"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_filter() {
        assert!(!PEN.is_passthrough("style", "DOT"));
        assert!(!PEN.is_passthrough("printColorNumber", "1"));
        assert!(PEN.is_passthrough("printColorNumber", "2"));
        assert!(PEN.is_passthrough("dash", "3"));
    }

    #[test]
    fn test_prefix_lookup() {
        assert_eq!(prefix_of(NS_TEXT), Some("text"));
        assert_eq!(prefix_of(NS_DCTERMS), Some("dcterms"));
        assert_eq!(prefix_of("urn:other"), None);
        assert_eq!(STRING_ITEM.local(), "stringItem");
    }
}
