use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::config::RepairConfig;
use crate::tag;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Elements that never need content and are safe to self-close.
pub const SELF_CLOSING_TAGS: [&str; 10] = [
    "path", "circle", "rect", "ellipse", "line", "polyline", "polygon", "use", "image", "stop",
];

static XMLNS_XLINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sxmlns:xlink\s*=").unwrap());
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:amp|lt|gt|quot|apos|#[0-9]+|#x[0-9a-fA-F]+);").unwrap());
static FILL_OPACITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fill-opacity\s*=\s*(["'])([0-9]+)(["'])"#).unwrap());
// The declaration proper, not `<?xml-stylesheet ...?>` and friends. A run of
// repeated declarations goes in one pass.
static XML_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:<\?xml(?:\s[^>]*)?\?>\s*)+").unwrap());
static OPEN_TAG_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SELF_CLOSING_TAGS
        .iter()
        .map(|name| (*name, Regex::new(&format!(r"<{name}(\s[^>]*)?>")).unwrap()))
        .collect()
});

pub const ADDED_XMLNS: &str = "Added missing xmlns";
pub const ADDED_VIEWBOX: &str = "Added missing viewBox";
pub const ESCAPED_AMPERSANDS: &str = "Escaped ampersands";
pub const ADDED_SVG_CLOSE: &str = "Added missing </svg>";
pub const FIXED_FILL_OPACITY: &str = "Fixed fill-opacity > 1";
pub const REMOVED_XML_DECL: &str = "Removed XML declaration";
pub const XLINK_NOTE: &str = "xlink:href used without xmlns:xlink declaration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResult {
    pub fixed_text: String,
    /// Edits applied, in order.
    pub changes_applied: Vec<String>,
    /// Advisory findings that were not auto-fixed.
    pub notes: Vec<String>,
}

impl RepairResult {
    pub fn changed(&self) -> bool {
        !self.changes_applied.is_empty()
    }
}

/// Run every heuristic once over `input` with the default dimensions.
pub fn repair(input: &str) -> RepairResult {
    repair_with(input, &RepairConfig::default())
}

pub fn repair_with(input: &str, config: &RepairConfig) -> RepairResult {
    let mut text = input.to_string();
    let mut changes = Vec::new();
    let mut notes = Vec::new();

    if add_xmlns(&mut text) {
        changes.push(ADDED_XMLNS.to_string());
    }
    if add_viewbox(&mut text, config) {
        changes.push(ADDED_VIEWBOX.to_string());
    }
    if escape_ampersands(&mut text) {
        changes.push(ESCAPED_AMPERSANDS.to_string());
    }
    for name in self_close_tags(&mut text) {
        changes.push(format!("Self-closed <{name}> tags"));
    }
    if close_svg(&mut text) {
        changes.push(ADDED_SVG_CLOSE.to_string());
    }
    if fix_fill_opacity(&mut text) {
        changes.push(FIXED_FILL_OPACITY.to_string());
    }
    if strip_xml_decl(&mut text) {
        changes.push(REMOVED_XML_DECL.to_string());
    }
    if text.contains("xlink:href") && !XMLNS_XLINK_RE.is_match(&text) {
        notes.push(XLINK_NOTE.to_string());
    }

    if !changes.is_empty() {
        tracing::debug!(changes = ?changes, "applied quick fixes");
    }

    RepairResult {
        fixed_text: text,
        changes_applied: changes,
        notes,
    }
}

fn add_xmlns(text: &mut String) -> bool {
    if tag::has_xmlns(text) {
        return false;
    }
    let Some(open) = tag::svg_open_tag(text) else {
        return false;
    };
    text.insert_str(open.insert_at(), &format!(" xmlns=\"{SVG_NAMESPACE}\""));
    true
}

fn add_viewbox(text: &mut String, config: &RepairConfig) -> bool {
    let Some(open) = tag::svg_open_tag(text) else {
        return false;
    };
    if open.has_attr(text, "viewBox") {
        return false;
    }
    let width = open
        .attr(text, "width")
        .and_then(parse_length)
        .unwrap_or(config.default_width);
    let height = open
        .attr(text, "height")
        .and_then(parse_length)
        .unwrap_or(config.default_height);
    text.insert_str(open.insert_at(), &format!(" viewBox=\"0 0 {width} {height}\""));
    true
}

/// A positive number with an optional `px` unit.
fn parse_length(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw);
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn escape_ampersands(text: &mut String) -> bool {
    if !text.contains('&') {
        return false;
    }
    let mut out = String::with_capacity(text.len() + 16);
    let mut escaped = false;
    let mut rest = text.as_str();
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if ENTITY_RE.is_match(after) {
            out.push('&');
        } else {
            out.push_str("&amp;");
            escaped = true;
        }
        rest = after;
    }
    out.push_str(rest);
    if escaped {
        *text = out;
    }
    escaped
}

/// Rewrite `<name ...>` to `<name .../>` for eligible elements that are
/// never closed later in the document. Returns the names touched.
fn self_close_tags(text: &mut String) -> Vec<&'static str> {
    let mut touched = Vec::new();
    for (name, re) in OPEN_TAG_RES.iter() {
        let close = format!("</{name}>");
        let mut hit = false;
        let current = text.clone();
        let rewritten = re.replace_all(&current, |caps: &Captures<'_>| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if attrs.ends_with('/') {
                return whole.to_string();
            }
            let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
            if current[end..].contains(&close) {
                return whole.to_string();
            }
            hit = true;
            format!("<{name}{attrs}/>")
        });
        if hit {
            *text = rewritten.into_owned();
            touched.push(*name);
        }
    }
    touched
}

fn close_svg(text: &mut String) -> bool {
    if !tag::has_svg_open(text) || tag::has_svg_close(text) {
        return false;
    }
    // A self-closed root is complete; give it an explicit close so the
    // document gains a `</svg>` without turning into two roots.
    if let Some(open) = tag::svg_open_tag(text) {
        if open.self_closing {
            text.replace_range(open.end - 2..open.end, "></svg>");
            return true;
        }
    }
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text.push_str("</svg>");
    true
}

fn fix_fill_opacity(text: &mut String) -> bool {
    let mut hit = false;
    let rewritten = FILL_OPACITY_RE.replace_all(text.as_str(), |caps: &Captures<'_>| {
        // Digits only, so a failed parse is an overflow and clamps to 1.
        let scaled = match caps[2].parse::<u64>() {
            Ok(value) if value <= 1 => return caps[0].to_string(),
            Ok(value) => (value as f64 / 100.0).min(1.0),
            Err(_) => 1.0,
        };
        hit = true;
        format!("fill-opacity={}{scaled}{}", &caps[1], &caps[3])
    });
    if hit {
        *text = rewritten.into_owned();
    }
    hit
}

fn strip_xml_decl(text: &mut String) -> bool {
    let Some(found) = XML_DECL_RE.find(text) else {
        return false;
    };
    let end = found.end();
    text.replace_range(..end, "");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;

    #[test]
    fn adds_xmlns_and_default_viewbox() {
        let result = repair("<svg>content</svg>");
        assert_eq!(
            result.fixed_text,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 200">content</svg>"#
        );
        assert_eq!(result.changes_applied, vec![ADDED_XMLNS, ADDED_VIEWBOX]);
    }

    #[test]
    fn viewbox_default_when_only_xmlns() {
        let result = repair(r#"<svg xmlns="http://www.w3.org/2000/svg">content</svg>"#);
        assert!(result.fixed_text.contains(r#"viewBox="0 0 200 200""#));
        assert_eq!(result.changes_applied, vec![ADDED_VIEWBOX]);
    }

    #[test]
    fn viewbox_from_root_dimensions() {
        let result = repair(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="64px" height="32"><rect width="5" height="5"/></svg>"#,
        );
        assert!(result.fixed_text.contains(r#"viewBox="0 0 64 32""#));
    }

    #[test]
    fn viewbox_ignores_non_numeric_dimensions() {
        let result =
            repair(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" height="auto"></svg>"#);
        assert!(result.fixed_text.contains(r#"viewBox="0 0 200 200""#));
    }

    #[test]
    fn escapes_bare_ampersands_only() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><text>A & B</text></svg>"#;
        let result = repair(doc);
        assert!(result.fixed_text.contains("A &amp; B"));
        assert_eq!(result.changes_applied, vec![ESCAPED_AMPERSANDS]);

        let escaped = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><text>A &amp; B &#169; &#xA9;</text></svg>"#;
        let result = repair(escaped);
        assert_eq!(result.fixed_text, escaped);
        assert!(!result.changed());
    }

    #[test]
    fn self_closes_unmatched_shapes() {
        let result = repair(r#"<circle cx="5" cy="5" r="2">"#);
        assert_eq!(result.fixed_text, r#"<circle cx="5" cy="5" r="2"/>"#);
        assert_eq!(result.changes_applied, vec!["Self-closed <circle> tags"]);
    }

    #[test]
    fn leaves_matched_shapes_alone() {
        let doc = r#"<circle cx="5" cy="5" r="2"></circle>"#;
        let result = repair(doc);
        assert_eq!(result.fixed_text, doc);
        assert!(!result.changed());
    }

    #[test]
    fn self_close_does_not_touch_longer_names() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><linearGradient id="g"><stop offset="0"/></linearGradient></svg>"#;
        assert!(!repair(doc).changed());
    }

    #[test]
    fn appends_missing_root_close() {
        let result =
            repair("<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"><g></g>\n\n");
        assert!(result.fixed_text.ends_with("<g></g></svg>"));
        assert_eq!(result.changes_applied, vec![ADDED_SVG_CLOSE]);
    }

    #[test]
    fn self_closed_root_gains_explicit_close() {
        let result = repair(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"/>"#);
        assert_eq!(
            result.fixed_text,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"></svg>"#
        );
        assert!(validate(&result.fixed_text).valid);
    }

    #[test]
    fn rescales_integer_fill_opacity() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><rect fill-opacity="50"/><rect fill-opacity='150'/><rect fill-opacity="1"/></svg>"#;
        let result = repair(doc);
        assert!(result.fixed_text.contains(r#"fill-opacity="0.5""#));
        assert!(result.fixed_text.contains("fill-opacity='1'"));
        assert!(result.fixed_text.contains(r#"fill-opacity="1""#));
        assert_eq!(result.changes_applied, vec![FIXED_FILL_OPACITY]);
    }

    #[test]
    fn strips_leading_xml_declaration() {
        let result = repair(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"></svg>",
        );
        assert!(result.fixed_text.starts_with("<svg"));
        assert_eq!(result.changes_applied, vec![REMOVED_XML_DECL]);
    }

    #[test]
    fn keeps_stylesheet_instruction_after_declaration() {
        let result = repair(
            "<?xml version=\"1.0\"?>\n<?xml-stylesheet href=\"a.css\" type=\"text/css\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"></svg>",
        );
        assert!(result.fixed_text.starts_with("<?xml-stylesheet href=\"a.css\""));
        assert_eq!(result.changes_applied, vec![REMOVED_XML_DECL]);
        assert!(validate(&result.fixed_text).valid);

        let lone = "<?xml-stylesheet href=\"a.css\"?><svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"></svg>";
        assert!(!repair(lone).changed());
    }

    #[test]
    fn strips_repeated_declarations_at_once() {
        let result = repair(
            "<?xml version=\"1.0\"?>\n<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"></svg>",
        );
        assert!(result.fixed_text.starts_with("<svg"));
        assert_eq!(result.changes_applied, vec![REMOVED_XML_DECL]);
    }

    #[test]
    fn overflowing_fill_opacity_clamps_to_one() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><rect fill-opacity="99999999999999999999999"/></svg>"#;
        let result = repair(doc);
        assert!(result.fixed_text.contains(r#"<rect fill-opacity="1"/>"#));
        assert_eq!(result.changes_applied, vec![FIXED_FILL_OPACITY]);
    }

    #[test]
    fn xlink_without_namespace_is_only_noted() {
        let doc = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><use xlink:href="#a"/></svg>"##;
        let result = repair(doc);
        assert_eq!(result.fixed_text, doc);
        assert!(!result.changed());
        assert_eq!(result.notes, vec![XLINK_NOTE]);
    }

    #[test]
    fn repairs_minimal_broken_document() {
        let result = repair(r#"<svg><rect width="10" height="10">"#);
        let fixed = &result.fixed_text;
        assert!(fixed.contains("xmlns="));
        assert!(fixed.contains("viewBox=\"0 0 200 200\""));
        assert!(fixed.contains(r#"<rect width="10" height="10"/>"#));
        assert!(fixed.ends_with("</svg>"));
        assert!(validate(fixed).valid);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let inputs = [
            r#"<svg><rect width="10" height="10">"#,
            "<?xml version=\"1.0\"?><svg width=\"x\"><text>a & b &amp; c</text><path d=\"M0 0\"><circle r=\"1\">",
            r#"<svg/>"#,
            r##"<svg width="20" height="10"><g fill-opacity="80"><use xlink:href="#a"></g>"##,
            "no markup at all & more",
            "",
            "<?xml version=\"1.0\"?>\n<?xml-stylesheet href=\"a.css\" type=\"text/css\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"></svg>",
            "<?xml-stylesheet href=\"a.css\"?><svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1 1\"/>",
            "<?xml version=\"1.0\"?><?xml version=\"1.0\"?><svg></svg>",
            r#"<svg><rect fill-opacity="99999999999999999999999"/></svg>"#,
        ];
        for input in inputs {
            let first = repair(input);
            let second = repair(&first.fixed_text);
            assert!(
                second.changes_applied.is_empty(),
                "{input:?}: {:?}",
                second.changes_applied
            );
            assert_eq!(second.fixed_text, first.fixed_text);
        }
    }
}
