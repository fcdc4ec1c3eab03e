use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_prompt_length: usize,
    pub max_svg_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_length: 2000,
            max_svg_length: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub min_interval_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    pub fn endpoint(&self) -> String {
        format!("{DEFAULT_ENDPOINT_BASE}/{}:generateContent", self.model)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_output_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// viewBox width used when the root has no usable `width`.
    pub default_width: f64,
    pub default_height: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            default_width: 200.0,
            default_height: 200.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub limits: LimitsConfig,
    pub gate: GateConfig,
    pub generation: GenerationConfig,
    pub repair: RepairConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    limits: Option<LimitsConfigFile>,
    gate: Option<GateConfigFile>,
    generation: Option<GenerationConfigFile>,
    repair: Option<RepairConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitsConfigFile {
    max_prompt_length: Option<usize>,
    max_svg_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GateConfigFile {
    min_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigFile {
    model: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepairConfigFile {
    default_width: Option<f64>,
    default_height: Option<f64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlay the fields present in `contents` on the defaults. Strict JSON is
/// tried first, then JSON5 for hand-written files with comments or trailing
/// commas.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}"))?,
    };

    let mut config = Config::default();

    if let Some(limits) = parsed.limits {
        if let Some(v) = limits.max_prompt_length {
            config.limits.max_prompt_length = v;
        }
        if let Some(v) = limits.max_svg_length {
            config.limits.max_svg_length = v;
        }
    }

    if let Some(gate) = parsed.gate {
        if let Some(v) = gate.min_interval_ms {
            config.gate.min_interval_ms = v;
        }
    }

    if let Some(generation) = parsed.generation {
        if let Some(v) = generation.model {
            config.generation.model = v;
        }
        if let Some(v) = generation.temperature {
            config.generation.temperature = v.clamp(0.0, 2.0);
        }
        if let Some(v) = generation.max_output_tokens {
            config.generation.max_output_tokens = v;
        }
    }

    if let Some(repair) = parsed.repair {
        if let Some(v) = repair.default_width.filter(|v| *v > 0.0) {
            config.repair.default_width = v;
        }
        if let Some(v) = repair.default_height.filter(|v| *v > 0.0) {
            config.repair.default_height = v;
        }
    }

    Ok(config)
}
