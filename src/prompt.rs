use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    Modern,
    Dark,
    Playful,
    Corporate,
    Minimal,
    Vintage,
    Neon,
}

impl StylePreset {
    pub const ALL: [StylePreset; 7] = [
        StylePreset::Modern,
        StylePreset::Dark,
        StylePreset::Playful,
        StylePreset::Corporate,
        StylePreset::Minimal,
        StylePreset::Vintage,
        StylePreset::Neon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StylePreset::Modern => "Modern",
            StylePreset::Dark => "Dark/Mystical",
            StylePreset::Playful => "Playful",
            StylePreset::Corporate => "Corporate",
            StylePreset::Minimal => "Minimal",
            StylePreset::Vintage => "Vintage",
            StylePreset::Neon => "Neon",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            StylePreset::Modern => {
                "Clean geometric shapes, bold gradient combinations (purple to blue, orange to pink), minimal but impactful, sharp edges with subtle rounded corners"
            }
            StylePreset::Dark => {
                "Deep purples (#1a0a2e), blacks, glowing accents (#00ff88, #ff00ff), ethereal glow effects using radial gradients, sharp angular shapes, mysterious atmosphere"
            }
            StylePreset::Playful => {
                "Rounded, bubbly shapes, bright saturated colors (coral, turquoise, yellow), soft shadows, approachable and fun aesthetic"
            }
            StylePreset::Corporate => {
                "Blues (#0066cc, #003366) and grays, balanced symmetrical composition, clean lines, trustworthy feel, subtle gradients not flashy"
            }
            StylePreset::Minimal => {
                "Maximum 3 colors, clever use of negative space, clean lines, flat design no gradients, iconic memorable silhouette"
            }
            StylePreset::Vintage => {
                "Muted earth tones (rust, olive, cream, brown), textured appearance using patterns, ornate decorative details, classic timeless feel"
            }
            StylePreset::Neon => {
                "Bright neon colors (#00ffff, #ff00ff, #00ff00) on dark background (#0a0a0f), glowing effects using drop-shadow filters, cyberpunk synthwave aesthetic"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    Pulse,
    Spin,
    Bounce,
    Fade,
    Float,
    Shake,
    Glow,
    Draw,
    Morph,
    Swing,
}

impl AnimationPreset {
    pub const ALL: [AnimationPreset; 10] = [
        AnimationPreset::Pulse,
        AnimationPreset::Spin,
        AnimationPreset::Bounce,
        AnimationPreset::Fade,
        AnimationPreset::Float,
        AnimationPreset::Shake,
        AnimationPreset::Glow,
        AnimationPreset::Draw,
        AnimationPreset::Morph,
        AnimationPreset::Swing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnimationPreset::Pulse => "Pulse",
            AnimationPreset::Spin => "Spin",
            AnimationPreset::Bounce => "Bounce",
            AnimationPreset::Fade => "Fade",
            AnimationPreset::Float => "Float",
            AnimationPreset::Shake => "Shake",
            AnimationPreset::Glow => "Glow",
            AnimationPreset::Draw => "Draw",
            AnimationPreset::Morph => "Morph",
            AnimationPreset::Swing => "Swing",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AnimationPreset::Pulse => {
                "Add a gentle breathing/pulse effect. Use transform: scale() animating from 1 to 1.05 and back. Duration: 2s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Spin => {
                "Add continuous 360 degree rotation. Use transform: rotate() from 0deg to 360deg. Duration: 3s, linear timing, infinite loop."
            }
            AnimationPreset::Bounce => {
                "Add vertical bouncing motion. Use transform: translateY() from 0 to -10px and back. Duration: 0.6s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Fade => {
                "Add fade in/out breathing effect. Use opacity from 1 to 0.5 and back. Duration: 2s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Float => {
                "Add gentle floating motion. Use transform: translateY() from 0 to -6px and back. Duration: 3s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Shake => {
                "Add horizontal shake effect. Use transform: translateX() oscillating between -3px and 3px. Duration: 0.4s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Glow => {
                "Add pulsing glow effect. Use filter: drop-shadow() with varying blur and opacity. Duration: 2s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Draw => {
                "Add stroke drawing animation. Set stroke-dasharray to path length, animate stroke-dashoffset from path length to 0. Duration: 2s, ease-in-out timing."
            }
            AnimationPreset::Morph => {
                "Add subtle shape morphing. Use transform: scale() with different X and Y values. Duration: 4s, ease-in-out timing, infinite loop."
            }
            AnimationPreset::Swing => {
                "Add pendulum swing motion. Use transform: rotate() oscillating between -5deg and 5deg. Duration: 1s, ease-in-out timing, infinite loop."
            }
        }
    }

    /// Reference keyframes for the effect.
    pub fn keyframes(self) -> &'static str {
        match self {
            AnimationPreset::Pulse => {
                "@keyframes pulse { 0%, 100% { transform: scale(1); } 50% { transform: scale(1.05); } }"
            }
            AnimationPreset::Spin => {
                "@keyframes spin { from { transform: rotate(0deg); } to { transform: rotate(360deg); } }"
            }
            AnimationPreset::Bounce => {
                "@keyframes bounce { 0%, 100% { transform: translateY(0); } 50% { transform: translateY(-10px); } }"
            }
            AnimationPreset::Fade => {
                "@keyframes fade { 0%, 100% { opacity: 1; } 50% { opacity: 0.5; } }"
            }
            AnimationPreset::Float => {
                "@keyframes float { 0%, 100% { transform: translateY(0); } 50% { transform: translateY(-6px); } }"
            }
            AnimationPreset::Shake => {
                "@keyframes shake { 0%, 100% { transform: translateX(0); } 25% { transform: translateX(-3px); } 75% { transform: translateX(3px); } }"
            }
            AnimationPreset::Glow => {
                "@keyframes glow { 0%, 100% { filter: drop-shadow(0 0 3px currentColor); } 50% { filter: drop-shadow(0 0 10px currentColor); } }"
            }
            AnimationPreset::Draw => {
                "@keyframes draw { from { stroke-dashoffset: 1000; } to { stroke-dashoffset: 0; } }"
            }
            AnimationPreset::Morph => {
                "@keyframes morph { 0%, 100% { transform: scale(1, 1); } 50% { transform: scale(1.03, 0.97); } }"
            }
            AnimationPreset::Swing => {
                "@keyframes swing { 0%, 100% { transform: rotate(0deg); } 25% { transform: rotate(5deg); } 75% { transform: rotate(-5deg); } }"
            }
        }
    }
}

const GENERATE_SYSTEM: &str = "You are an expert SVG designer creating professional vector graphics.

DESIGN PRINCIPLES:
- Create visually appealing, detailed, and polished graphics
- Use appropriate complexity for the request (logos need detail, simple icons can be minimal)
- Apply good design principles: balance, contrast, visual hierarchy
- Match the mood and theme of the request
- Use gradients, shadows, and layering when they enhance the design
- Create distinctive, memorable visuals - not generic clip art

TECHNICAL REQUIREMENTS:
- Return ONLY valid SVG code, no explanation, no markdown
- Use viewBox for scalability (typically viewBox=\"0 0 100 100\" or appropriate aspect ratio)
- Include width=\"200\" height=\"200\" attributes
- Use meaningful colors that fit the theme
- Ensure paths are smooth and well-crafted";

const FIX_SYSTEM: &str = "You are an SVG repair specialist. Fix the provided SVG code:
- Fix syntax errors
- Close unclosed tags
- Fix malformed attributes
- Ensure valid SVG structure
- Add missing xmlns if needed
- Add viewBox if missing
Return ONLY the fixed SVG code, no explanation, no markdown.";

const ANIMATE_RULES: &str = "Use CSS animations inside a <style> tag within the SVG.
Make sure the animation loops infinitely.
Keep the animation smooth and performant.
Ensure the animation works standalone without external CSS.
Return ONLY the animated SVG code, no explanation, no markdown.";

/// A system instruction plus the user's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn generate(description: &str, style: Option<StylePreset>) -> Self {
        let system = match style {
            Some(style) => format!(
                "{GENERATE_SYSTEM}\n\nSTYLE ({}): {}",
                style.name(),
                style.guidance()
            ),
            None => GENERATE_SYSTEM.to_string(),
        };
        Self {
            system,
            user: description.to_string(),
        }
    }

    pub fn fix(svg: &str) -> Self {
        Self {
            system: FIX_SYSTEM.to_string(),
            user: format!("Fix this SVG:\n{svg}"),
        }
    }

    pub fn animate(svg: &str, preset: AnimationPreset) -> Self {
        Self {
            system: format!(
                "You are an SVG animation specialist. {}\nReference keyframes: {}\n{ANIMATE_RULES}",
                preset.description(),
                preset.keyframes()
            ),
            user: format!("Add animation to this SVG:\n{svg}"),
        }
    }

    /// Single text part as the backend receives it.
    pub fn to_wire_text(&self) -> String {
        format!("{}\n\nUser request: {}", self.system, self.user)
    }
}
