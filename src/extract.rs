use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(?:svg|xml|html)?\n?").unwrap());

const SVG_OPEN: &str = "<svg";
const SVG_CLOSE: &str = "</svg>";

/// Remove markdown code fences and the language tag that may follow an
/// opening fence.
pub fn strip_fences(text: &str) -> Cow<'_, str> {
    FENCE_RE.replace_all(text, "")
}

/// The span from the first `<svg` through the last `</svg>`.
///
/// Bounds are found by index rather than by pattern so that repeated or
/// nested `svg` elements resolve to the outermost document.
pub fn extract_svg(text: &str) -> Option<String> {
    let cleaned = strip_fences(text);
    let cleaned = cleaned.trim();
    let start = cleaned.find(SVG_OPEN)?;
    let end = cleaned.rfind(SVG_CLOSE)?;
    if end < start {
        return None;
    }
    Some(cleaned[start..end + SVG_CLOSE.len()].to_string())
}

/// [`extract_svg`] for a reply the backend cut off at its length limit:
/// an opened but never closed `<svg` gets a synthetic `</svg>` first.
/// Unclosed inner tags are left for the repair pass.
pub fn extract_truncated_svg(text: &str) -> Option<String> {
    if text.contains(SVG_OPEN) && !text.contains(SVG_CLOSE) {
        tracing::debug!("closing truncated svg payload");
        let mut closed = text.trim_end().to_string();
        closed.push_str(SVG_CLOSE);
        return extract_svg(&closed);
    }
    extract_svg(text)
}

/// Dispatch on the backend's truncation flag.
pub fn extract_reply(text: &str, truncated: bool) -> Option<String> {
    if truncated {
        extract_truncated_svg(text)
    } else {
        extract_svg(text)
    }
}
