use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::dom::{self, Element};

/// Process-wide sanitization rules.
#[derive(Debug)]
pub struct SanitizationPolicy {
    pub elements: &'static [&'static str],
    pub attributes: &'static [&'static str],
    pub link_attributes: &'static [&'static str],
    style_deny: Regex,
}

impl SanitizationPolicy {
    pub fn denies_element(&self, el: &Element) -> bool {
        let local = el.local_name();
        self.elements
            .iter()
            .any(|denied| local.eq_ignore_ascii_case(denied))
    }

    /// Listed handlers plus anything shaped like one (`on` + letter).
    pub fn denies_attribute(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        if self.attributes.contains(&lower.as_str()) {
            return true;
        }
        let local = dom::local_name(&lower);
        local.len() > 2
            && local.starts_with("on")
            && local[2..].starts_with(|c: char| c.is_ascii_alphabetic())
    }

    /// Matched on the local name, so `xlink:href` and any other prefix
    /// bound to the XLink namespace count.
    pub fn is_link(&self, name: &str) -> bool {
        let local = dom::local_name(name);
        self.link_attributes
            .iter()
            .any(|link| local.eq_ignore_ascii_case(link))
    }

    /// `javascript:` links, and `data:` links that mention script.
    pub fn denies_link(&self, raw_value: &str) -> bool {
        let value = dom::unescape(raw_value);
        let value: String = value
            .trim()
            .chars()
            .filter(|c| !c.is_ascii_control())
            .collect::<String>()
            .to_ascii_lowercase();
        value.starts_with("javascript:") || (value.starts_with("data:") && value.contains("script"))
    }

    pub fn denies_style(&self, raw_value: &str) -> bool {
        self.style_deny.is_match(&dom::unescape(raw_value))
    }
}

pub static POLICY: Lazy<SanitizationPolicy> = Lazy::new(|| SanitizationPolicy {
    elements: &["script", "foreignObject"],
    attributes: &[
        "onload",
        "onerror",
        "onclick",
        "onmouseover",
        "onmouseout",
        "onmousedown",
        "onmouseup",
        "onfocus",
        "onblur",
        "onchange",
        "onsubmit",
        "onreset",
        "onselect",
        "onabort",
        "ondblclick",
        "onkeydown",
        "onkeypress",
        "onkeyup",
        "onmousemove",
        "onbegin",
        "onend",
        "onrepeat",
    ],
    link_attributes: &["href"],
    style_deny: Regex::new(r"(?i)expression\s*\(|javascript:|behavior\s*:").unwrap(),
});

/// What a sanitization pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeReport {
    pub elements_removed: usize,
    pub attributes_removed: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.elements_removed == 0 && self.attributes_removed == 0
    }
}

/// Sanitized markup, or `None` when the input is not a parsable SVG
/// document.
///
/// This is a denylist. It strips script elements, inline event handlers,
/// script-bearing links and active CSS, and keeps everything else, since
/// an allowlist would reject too much legitimate SVG. Treat it as a
/// best-effort layer in front of a live DOM, not a security boundary.
/// Input that does not parse is rejected, never cleaned up.
pub fn sanitize(input: &str) -> Option<String> {
    sanitize_with_report(input).map(|(svg, _)| svg)
}

pub fn sanitize_with_report(input: &str) -> Option<(String, SanitizeReport)> {
    let mut root = match dom::parse(input) {
        Ok(root) => root,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting unparsable SVG");
            return None;
        }
    };
    if root.local_name() != "svg" {
        tracing::debug!(root = %root.name, "rejecting non-svg root");
        return None;
    }

    let report = sanitize_tree(&mut root, &POLICY);
    if !report.is_clean() {
        tracing::info!(
            elements = report.elements_removed,
            attributes = report.attributes_removed,
            "removed unsafe SVG content"
        );
    }
    Some((root.to_xml(), report))
}

/// Apply `policy` to `root` in place.
pub fn sanitize_tree(root: &mut Element, policy: &SanitizationPolicy) -> SanitizeReport {
    let elements_removed = root.retain_descendants(&mut |el| !policy.denies_element(el));

    let mut attributes_removed = 0;
    root.walk_mut(&mut |el| {
        let before = el.attributes.len();
        el.attributes.retain(|attr| {
            if policy.denies_attribute(&attr.name) {
                return false;
            }
            if policy.is_link(&attr.name) && policy.denies_link(&attr.value) {
                return false;
            }
            !(attr.name == "style" && policy.denies_style(&attr.value))
        });
        attributes_removed += before - el.attributes.len();
    });

    SanitizeReport {
        elements_removed,
        attributes_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_nested_scripts() {
        let out = sanitize(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g><g><script>alert(1)</script></g></g><script><![CDATA[x()]]></script></svg>"#,
        )
        .unwrap();
        assert!(!out.contains("<script"));
        assert_eq!(out, r#"<svg xmlns="http://www.w3.org/2000/svg"><g><g/></g></svg>"#);
    }

    #[test]
    fn removes_foreign_object_subtree() {
        let out = sanitize(
            r#"<svg><foreignObject><div xmlns="http://www.w3.org/1999/xhtml">hi</div></foreignObject><rect/></svg>"#,
        )
        .unwrap();
        assert_eq!(out, "<svg><rect/></svg>");
    }

    #[test]
    fn strips_event_handlers_everywhere() {
        let out = sanitize(
            r#"<svg onload="a()"><rect onclick="b()" ONMOUSEOVER="c()" width="1"/><animate onbegin="d()" onfocusin="e()"/></svg>"#,
        )
        .unwrap();
        for name in ["onload", "onclick", "ONMOUSEOVER", "onbegin", "onfocusin"] {
            assert!(!out.contains(name), "{name} survived: {out}");
        }
        assert!(out.contains(r#"width="1""#));
    }

    #[test]
    fn treats_any_on_letter_attribute_as_handler() {
        let out = sanitize(r#"<svg><path d="M0 0" onpointerdown="x()" on="1"/></svg>"#).unwrap();
        assert_eq!(out, r#"<svg><path d="M0 0" on="1"/></svg>"#);
    }

    #[test]
    fn drops_script_links() {
        let out = sanitize(
            r##"<svg><a href=" JavaScript:alert(1)"><text>x</text></a><use xlink:href="data:text/html;base64,script"/><use href="#ok"/><image href="data:image/png;base64,AAAA"/></svg>"##,
        )
        .unwrap();
        assert!(!out.to_ascii_lowercase().contains("javascript"));
        assert!(!out.contains("text/html"));
        assert!(out.contains(r##"href="#ok""##));
        assert!(out.contains("data:image/png"));
    }

    #[test]
    fn drops_script_links_under_any_prefix() {
        let out = sanitize(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:x="http://www.w3.org/1999/xlink"><a x:href="javascript:alert(1)"><text>x</text></a></svg>"#,
        )
        .unwrap();
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:x="http://www.w3.org/1999/xlink"><a><text>x</text></a></svg>"#
        );
        assert!(POLICY.is_link("xlink:href"));
        assert!(!POLICY.is_link("hreflang"));
    }

    #[test]
    fn drops_entity_encoded_javascript_link() {
        let out = sanitize(r#"<svg><a href="&#106;avascript:alert(1)"/></svg>"#).unwrap();
        assert_eq!(out, "<svg><a/></svg>");
    }

    #[test]
    fn drops_active_styles_whole() {
        let out = sanitize(
            r#"<svg><rect style="fill:red; width: expression (alert(1))"/><rect style="BEHAVIOR: url(x.htc)"/><rect style="fill:blue"/></svg>"#,
        )
        .unwrap();
        assert_eq!(out, r#"<svg><rect/><rect/><rect style="fill:blue"/></svg>"#);
    }

    #[test]
    fn rejects_malformed_xml() {
        assert_eq!(sanitize("<svg><g><rect></g>"), None);
        assert_eq!(sanitize("<svg><rect>"), None);
    }

    #[test]
    fn rejects_non_svg_root() {
        assert_eq!(sanitize("<html><body/></html>"), None);
    }

    #[test]
    fn reports_what_was_removed() {
        let (_, report) =
            sanitize_with_report(r#"<svg onload="x"><script/><a href="javascript:y"/></svg>"#)
                .unwrap();
        assert_eq!(report.elements_removed, 1);
        assert_eq!(report.attributes_removed, 2);
    }
}
