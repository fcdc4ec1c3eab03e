use thiserror::Error;

use crate::backend::{BackendError, BackendReply, GenerateRequest, GenerativeBackend};
use crate::config::Config;
use crate::diagnostics::quality_signals;
use crate::dom;
use crate::extract::extract_reply;
use crate::gate::{CancelHandle, GateError, RequestGate};
use crate::prompt::{AnimationPreset, Prompt, StylePreset};
use crate::repair::{RepairResult, repair_with};
use crate::sanitize::{SanitizeReport, sanitize_with_report};
use crate::validate::{ValidationResult, validate};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please enter a description")]
    EmptyPrompt,
    #[error("Description is longer than {max} characters")]
    PromptTooLong { max: usize },
    #[error("Please add SVG code first")]
    EmptySvg,
    #[error("SVG is longer than {max} characters")]
    SvgTooLong { max: usize },
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Backend(BackendError),
    #[error("request canceled")]
    Canceled,
    #[error("No SVG found in response")]
    NoSvgFound,
    /// Repair could not produce a document the sanitizer accepts. The
    /// best-effort text is kept for the caller to show or discard.
    #[error("SVG is still invalid after repair")]
    Unrecoverable { repair: RepairResult },
}

impl PipelineError {
    /// Canceled work is dropped quietly rather than reported.
    pub fn is_silent(&self) -> bool {
        matches!(self, PipelineError::Canceled)
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Canceled => PipelineError::Canceled,
            other => PipelineError::Backend(other),
        }
    }
}

/// Sanitized markup plus how it was obtained. `markup` is the only value
/// that may be injected into a live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revived {
    pub markup: String,
    pub repair: RepairResult,
    pub sanitize: SanitizeReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// The input already validated and the heuristics had nothing to do.
    NoFixNeeded,
    Repaired(FixReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub repair: RepairResult,
    /// Whether the backend was asked to repair the document.
    pub escalated: bool,
    pub validation: ValidationResult,
}

/// Repair and sanitize without involving the backend.
pub fn prepare_for_injection(text: &str, config: &Config) -> Result<Revived, PipelineError> {
    let repair = repair_with(text, &config.repair);
    match sanitize_with_report(&repair.fixed_text) {
        Some((markup, sanitize)) => Ok(Revived {
            markup,
            repair,
            sanitize,
        }),
        None => Err(PipelineError::Unrecoverable { repair }),
    }
}

/// Backend, request gate and settings for one editor.
pub struct Session<B> {
    backend: B,
    gate: RequestGate,
    cancel: CancelHandle,
    config: Config,
}

impl<B: GenerativeBackend> Session<B> {
    pub fn new(backend: B, config: Config) -> Self {
        let gate = RequestGate::from_config(&config.gate);
        Self {
            backend,
            gate,
            cancel: CancelHandle::default(),
            config,
        }
    }

    pub fn with_gate(backend: B, gate: RequestGate, config: Config) -> Self {
        Self {
            backend,
            gate,
            cancel: CancelHandle::default(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gate_mut(&mut self) -> &mut RequestGate {
        &mut self.gate
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle for canceling the request this session has in flight, usable
    /// while `generate`, `fix` or `animate` is blocked on the backend. The
    /// canceled call returns [`PipelineError::Canceled`].
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Quick heuristics first; the backend is only consulted when they
    /// leave the document invalid, and its answer gets one more heuristic
    /// pass. There is no retry beyond that.
    pub fn fix(&mut self, text: &str) -> Result<FixOutcome, PipelineError> {
        let text = self.check_svg_input(text)?;

        let quick = repair_with(text, &self.config.repair);
        if !quick.changed() && validate(text).valid {
            tracing::debug!("document already valid");
            return Ok(FixOutcome::NoFixNeeded);
        }

        let validation = validate(&quick.fixed_text);
        if validation.valid {
            tracing::info!(changes = quick.changes_applied.len(), "quick fix succeeded");
            return Ok(FixOutcome::Repaired(FixReport {
                repair: quick,
                escalated: false,
                validation,
            }));
        }

        tracing::info!(
            parse_error = validation.parse_error.as_deref().unwrap_or_default(),
            "quick fix insufficient, asking backend"
        );
        let reply = self.send(&Prompt::fix(text))?;
        let svg = extract_reply(&reply.text, reply.truncated).ok_or(PipelineError::NoSvgFound)?;
        let repair = repair_with(&svg, &self.config.repair);
        let validation = validate(&repair.fixed_text);
        if !validation.valid {
            tracing::warn!("document still invalid after backend repair");
        }
        Ok(FixOutcome::Repaired(FixReport {
            repair,
            escalated: true,
            validation,
        }))
    }

    pub fn generate(
        &mut self,
        description: &str,
        style: Option<StylePreset>,
    ) -> Result<Revived, PipelineError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }
        let max = self.config.limits.max_prompt_length;
        if description.chars().count() > max {
            return Err(PipelineError::PromptTooLong { max });
        }
        let reply = self.send(&Prompt::generate(description, style))?;
        self.revive(&reply)
    }

    pub fn animate(&mut self, svg: &str, preset: AnimationPreset) -> Result<Revived, PipelineError> {
        let svg = self.check_svg_input(svg)?;
        let reply = self.send(&Prompt::animate(svg, preset))?;
        self.revive(&reply)
    }

    fn check_svg_input<'a>(&self, svg: &'a str) -> Result<&'a str, PipelineError> {
        let svg = svg.trim();
        if svg.is_empty() {
            return Err(PipelineError::EmptySvg);
        }
        let max = self.config.limits.max_svg_length;
        if svg.chars().count() > max {
            return Err(PipelineError::SvgTooLong { max });
        }
        Ok(svg)
    }

    fn send(&mut self, prompt: &Prompt) -> Result<BackendReply, PipelineError> {
        let ticket = self.gate.begin()?;
        let request = GenerateRequest::new(prompt, &self.config.generation);
        tracing::debug!(generation = ticket.generation(), "sending backend request");
        self.cancel.arm(ticket.token());
        let result = self.backend.generate(&request, ticket.token());
        self.cancel.disarm();
        match self.gate.finish(ticket, result) {
            Some(result) => {
                let reply = result?;
                if reply.truncated {
                    tracing::warn!("backend reply was truncated");
                }
                Ok(reply)
            }
            None => Err(PipelineError::Canceled),
        }
    }

    fn revive(&self, reply: &BackendReply) -> Result<Revived, PipelineError> {
        let svg = extract_reply(&reply.text, reply.truncated).ok_or(PipelineError::NoSvgFound)?;
        let revived = prepare_for_injection(&svg, &self.config)?;
        if let Ok(root) = dom::parse(&revived.markup) {
            let signals = quality_signals(&root);
            tracing::debug!(score = signals.score(), ?signals, "generated svg quality");
        }
        Ok(revived)
    }
}
