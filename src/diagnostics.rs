use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::dom::Element;

static CURVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[CcSsQqTtAa]\s*-?[0-9.]").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySignals {
    pub elements: usize,
    pub gradients: usize,
    pub filters: usize,
    pub curved_paths: usize,
    pub has_style: bool,
}

impl QualitySignals {
    /// 0..=4, one point per kind of richness present.
    pub fn score(&self) -> u8 {
        u8::from(self.gradients > 0)
            + u8::from(self.filters > 0)
            + u8::from(self.curved_paths > 0)
            + u8::from(self.elements >= 10)
    }
}

pub fn quality_signals(root: &Element) -> QualitySignals {
    let mut signals = QualitySignals::default();
    root.walk(&mut |el| {
        signals.elements += 1;
        match el.local_name() {
            "linearGradient" | "radialGradient" => signals.gradients += 1,
            "filter" => signals.filters += 1,
            "style" => signals.has_style = true,
            "path" => {
                if el.attr("d").is_some_and(|d| CURVE_RE.is_match(d)) {
                    signals.curved_paths += 1;
                }
            }
            _ => {}
        }
    });
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn counts_rich_features() {
        let root = dom::parse(
            r#"<svg><defs><linearGradient id="g"/><filter id="f"/></defs><path d="M0 0 C 1 1 2 2 3 3"/><path d="M0 0 L1 1"/></svg>"#,
        )
        .unwrap();
        let signals = quality_signals(&root);
        assert_eq!(signals.elements, 6);
        assert_eq!(signals.gradients, 1);
        assert_eq!(signals.filters, 1);
        assert_eq!(signals.curved_paths, 1);
        assert_eq!(signals.score(), 3);
    }

    #[test]
    fn flat_icon_scores_zero() {
        let root = dom::parse(r#"<svg><rect width="1" height="1"/></svg>"#).unwrap();
        assert_eq!(quality_signals(&root).score(), 0);
    }
}
