use serde::Deserialize;
use svg_necromancer::config::RepairConfig;
use svg_necromancer::{extract_reply, prepare_for_injection, repair::repair_with, sanitize, validate};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepairOptions {
    default_width: Option<f64>,
    default_height: Option<f64>,
}

fn build_repair_config(options: RepairOptions) -> RepairConfig {
    let mut config = RepairConfig::default();
    if let Some(width) = options.default_width.filter(|w| *w > 0.0) {
        config.default_width = width;
    }
    if let Some(height) = options.default_height.filter(|h| *h > 0.0) {
        config.default_height = height;
    }
    config
}

fn parse_options(options_json: Option<String>) -> Result<RepairOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| error.to_string()),
        None => Ok(RepairOptions::default()),
    }
}

/// Markup safe to assign to `innerHTML`, or `undefined` when the input does
/// not parse.
#[wasm_bindgen]
pub fn sanitize_svg(code: &str) -> Option<String> {
    sanitize(code)
}

/// `{ fixedText, changesApplied, notes }` as JSON.
#[wasm_bindgen]
pub fn repair_svg(code: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error))?;
    let result = repair_with(code, &build_repair_config(options));
    serde_json::to_string(&result).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// `{ valid, checks, parseError? }` as JSON.
#[wasm_bindgen]
pub fn validate_svg(code: &str) -> Result<String, JsValue> {
    serde_json::to_string(&validate(code)).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub fn extract_svg(text: &str, truncated: bool) -> Option<String> {
    extract_reply(text, truncated)
}

/// Repair then sanitize: the preview path. `undefined` when the text cannot
/// be made safe.
#[wasm_bindgen]
pub fn revive_svg(code: &str) -> Option<String> {
    prepare_for_injection(code, &Default::default())
        .ok()
        .map(|revived| revived.markup)
}

#[cfg(test)]
mod tests {
    use crate::{RepairOptions, build_repair_config, extract_svg, parse_options, revive_svg, sanitize_svg};

    #[test]
    fn options_override_default_dimensions() {
        let options = parse_options(Some(r#"{"defaultWidth": 64}"#.to_string())).unwrap();
        let config = build_repair_config(options);
        assert_eq!(config.default_width, 64.0);
        assert_eq!(config.default_height, 200.0);
        let config = build_repair_config(RepairOptions::default());
        assert_eq!(config.default_width, 200.0);
    }

    #[test]
    fn revives_model_output_for_preview() {
        let text = extract_svg("```svg\n<svg onload=\"x()\"><rect width=\"10\" height=\"10\">\n```", true)
            .expect("truncated payload should be recovered");
        let markup = revive_svg(&text).expect("repaired svg should sanitize");
        assert!(markup.contains("viewBox=\"0 0 200 200\""));
        assert!(markup.contains("<rect width=\"10\" height=\"10\"/>"));
        assert!(!markup.contains("onload"));
    }

    #[test]
    fn sanitize_rejects_broken_markup() {
        assert_eq!(sanitize_svg("<svg><g></svg>"), None);
    }
}
