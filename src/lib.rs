#[cfg(feature = "cli")]
pub mod cli;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod extract;
pub mod gate;
pub mod pipeline;
pub mod prompt;
pub mod repair;
pub mod sanitize;
pub mod tag;
pub mod validate;

#[cfg(feature = "cli")]
pub use cli::run;

pub use backend::{BackendError, BackendReply, GenerateRequest, GenerativeBackend};
pub use config::{Config, load_config};
pub use extract::{extract_reply, extract_svg, extract_truncated_svg};
pub use gate::{CancelHandle, CancelToken, RequestGate};
pub use pipeline::{FixOutcome, PipelineError, Revived, Session, prepare_for_injection};
pub use repair::{RepairResult, repair};
pub use sanitize::sanitize;
pub use validate::{ValidationResult, validate};
