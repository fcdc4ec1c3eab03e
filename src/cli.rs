use crate::backend::{BackendReply, GenerateRequest, GenerateResponse};
use crate::config::{Config, load_config};
use crate::extract::extract_reply;
use crate::pipeline::{PipelineError, prepare_for_injection};
use crate::prompt::{AnimationPreset, Prompt, StylePreset};
use crate::repair::repair_with;
use crate::sanitize::sanitize_with_report;
use crate::validate::validate;
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "necro",
    version,
    about = "Sanitize, repair and extract SVG from untrusted or AI-generated text"
)]
pub struct Args {
    /// Config JSON file (limits, gate, generation, repair)
    #[arg(short = 'c', long = "configFile", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct Io {
    /// Input file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Strip scripts, event handlers and active links from an SVG
    Sanitize {
        #[command(flatten)]
        io: Io,
    },
    /// Apply the quick syntax fixes and report what changed
    Repair {
        #[command(flatten)]
        io: Io,
        /// Print the repair result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether an SVG parses and is complete
    Validate {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        json: bool,
    },
    /// Pull the SVG payload out of model output
    Extract {
        #[command(flatten)]
        io: Io,
        /// The output was cut off at the model's length limit
        #[arg(long)]
        truncated: bool,
    },
    /// Extract, repair and sanitize a raw model reply (generateContent JSON
    /// or plain text)
    Ingest {
        #[command(flatten)]
        io: Io,
        /// Print the repair log and sanitize report to stderr
        #[arg(short = 'v', long)]
        verbose: bool,
    },
    /// Print the generateContent request body for an operation
    Prompt {
        #[arg(value_enum)]
        kind: PromptKind,
        /// Description for `generate`
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(long, value_enum)]
        style: Option<StylePreset>,
        #[arg(long, value_enum, default_value = "pulse")]
        preset: AnimationPreset,
        /// Print the request URL for the configured model to stderr
        #[arg(long)]
        endpoint: bool,
        #[command(flatten)]
        io: Io,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PromptKind {
    Generate,
    Fix,
    Animate,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Sanitize { io } => {
            let input = read_input(io.input.as_deref())?;
            let (svg, report) = sanitize_with_report(&input)
                .ok_or_else(|| anyhow::anyhow!("Input is not a well-formed SVG document"))?;
            if !report.is_clean() {
                eprintln!(
                    "removed {} element(s) and {} attribute(s)",
                    report.elements_removed, report.attributes_removed
                );
            }
            write_output(&svg, io.output.as_deref())
        }
        Command::Repair { io, json } => {
            let input = read_input(io.input.as_deref())?;
            let result = repair_with(&input, &config.repair);
            if json {
                return write_output(&serde_json::to_string_pretty(&result)?, io.output.as_deref());
            }
            for change in &result.changes_applied {
                eprintln!("fixed: {change}");
            }
            for note in &result.notes {
                eprintln!("note: {note}");
            }
            write_output(&result.fixed_text, io.output.as_deref())
        }
        Command::Validate { io, json } => {
            let input = read_input(io.input.as_deref())?;
            let result = validate(&input);
            let text = if json {
                serde_json::to_string_pretty(&result)?
            } else {
                let mut lines: Vec<String> = result
                    .checks
                    .iter()
                    .map(|(name, ok)| format!("{name}: {}", if *ok { "ok" } else { "missing" }))
                    .collect();
                if let Some(err) = &result.parse_error {
                    lines.push(format!("parse error: {err}"));
                }
                lines.push(format!("valid: {}", result.valid));
                lines.join("\n") + "\n"
            };
            write_output(&text, io.output.as_deref())?;
            if !result.valid {
                return Err(anyhow::anyhow!("SVG is invalid"));
            }
            Ok(())
        }
        Command::Extract { io, truncated } => {
            let input = read_input(io.input.as_deref())?;
            let svg = extract_reply(&input, truncated)
                .ok_or_else(|| anyhow::anyhow!("No SVG found in input"))?;
            write_output(&svg, io.output.as_deref())
        }
        Command::Ingest { io, verbose } => {
            let input = read_input(io.input.as_deref())?;
            let reply = parse_reply(&input)?;
            let svg = extract_reply(&reply.text, reply.truncated)
                .ok_or_else(|| anyhow::anyhow!("No SVG found in response"))?;
            let revived = match prepare_for_injection(&svg, &config) {
                Ok(revived) => revived,
                Err(PipelineError::Unrecoverable { repair }) => {
                    for change in &repair.changes_applied {
                        eprintln!("fixed: {change}");
                    }
                    return Err(anyhow::anyhow!("SVG is still invalid after repair"));
                }
                Err(err) => return Err(err.into()),
            };
            if verbose {
                for change in &revived.repair.changes_applied {
                    eprintln!("fixed: {change}");
                }
                eprintln!(
                    "sanitized: {} element(s), {} attribute(s) removed",
                    revived.sanitize.elements_removed, revived.sanitize.attributes_removed
                );
            }
            write_output(&revived.markup, io.output.as_deref())
        }
        Command::Prompt {
            kind,
            description,
            style,
            preset,
            endpoint,
            io,
        } => {
            let prompt = build_prompt(kind, description, style, preset, &io, &config)?;
            let request = GenerateRequest::new(&prompt, &config.generation);
            if endpoint {
                eprintln!("{}", endpoint_line(&config));
            }
            write_output(&serde_json::to_string_pretty(&request)?, io.output.as_deref())
        }
    }
}

fn build_prompt(
    kind: PromptKind,
    description: Option<String>,
    style: Option<StylePreset>,
    preset: AnimationPreset,
    io: &Io,
    config: &Config,
) -> Result<Prompt> {
    match kind {
        PromptKind::Generate => {
            let description = description
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Please enter a description"))?;
            if description.chars().count() > config.limits.max_prompt_length {
                return Err(anyhow::anyhow!(
                    "Description is longer than {} characters",
                    config.limits.max_prompt_length
                ));
            }
            Ok(Prompt::generate(description.trim(), style))
        }
        PromptKind::Fix => Ok(Prompt::fix(read_input(io.input.as_deref())?.trim())),
        PromptKind::Animate => Ok(Prompt::animate(
            read_input(io.input.as_deref())?.trim(),
            preset,
        )),
    }
}

fn endpoint_line(config: &Config) -> String {
    format!("POST {}", config.generation.endpoint())
}

/// A generateContent JSON body, or plain model text.
fn parse_reply(input: &str) -> Result<BackendReply> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(response) = serde_json::from_str::<GenerateResponse>(trimmed) {
            return Ok(response.into_reply()?);
        }
    }
    Ok(BackendReply::complete(input))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_content_reply() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"```svg\n<svg><g/></svg>\n```"}]},"finishReason":"STOP"}]}"#;
        let reply = parse_reply(raw).unwrap();
        assert_eq!(reply.text, "```svg\n<svg><g/></svg>\n```");
        assert!(!reply.truncated);
    }

    #[test]
    fn api_error_reply_fails() {
        let raw = r#"{"error":{"code":403,"message":"quota"}}"#;
        let err = parse_reply(raw).unwrap_err();
        assert_eq!(err.to_string(), "access denied: quota");
    }

    #[test]
    fn plain_text_reply_passes_through() {
        let reply = parse_reply("<svg></svg>").unwrap();
        assert_eq!(reply, BackendReply::complete("<svg></svg>"));
    }

    #[test]
    fn prompt_endpoint_follows_configured_model() {
        let args = Args::try_parse_from(["necro", "prompt", "fix", "--endpoint"]).unwrap();
        assert!(matches!(args.command, Command::Prompt { endpoint: true, .. }));

        let mut config = Config::default();
        config.generation.model = "gemini-2.5-pro".to_string();
        assert_eq!(
            endpoint_line(&config),
            "POST https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn prompt_kind_generate_requires_description() {
        let io = Io {
            input: None,
            output: None,
        };
        let err = build_prompt(
            PromptKind::Generate,
            Some("  ".to_string()),
            None,
            AnimationPreset::Pulse,
            &io,
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a description");
    }
}
