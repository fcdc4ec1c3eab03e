use std::collections::BTreeMap;

use serde::Serialize;

use crate::dom;
use crate::tag;

pub const CHECK_HAS_SVG_OPEN: &str = "hasSvgOpen";
pub const CHECK_HAS_SVG_CLOSE: &str = "hasSvgClose";
pub const CHECK_PARSES: &str = "parsesAsXml";
pub const CHECK_HAS_XMLNS: &str = "hasXmlns";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub checks: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ValidationResult {
    pub fn check(&self, name: &str) -> bool {
        self.checks.get(name).copied().unwrap_or(false)
    }
}

/// Valid means the text parses as XML and has both an opening and a
/// closing `svg` tag. `xmlns` presence is reported but not required.
pub fn validate(text: &str) -> ValidationResult {
    let has_open = tag::has_svg_open(text);
    let has_close = tag::has_svg_close(text);
    let has_xmlns = tag::has_xmlns(text);
    let parse_error = dom::parse(text).err().map(|err| err.to_string());
    let parses = parse_error.is_none();

    let checks = BTreeMap::from([
        (CHECK_HAS_SVG_OPEN, has_open),
        (CHECK_HAS_SVG_CLOSE, has_close),
        (CHECK_PARSES, parses),
        (CHECK_HAS_XMLNS, has_xmlns),
    ]);

    ValidationResult {
        valid: parses && has_open && has_close,
        checks,
        parse_error,
    }
}
