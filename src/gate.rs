use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::GateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("please wait {}ms before making another request", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },
}

/// Shared cancellation flag handed to the backend with each request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancels whatever request its owner has in flight. Clones share the slot,
/// so a handle can be kept on another thread while the owner is blocked in
/// a backend call.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<Mutex<Option<CancelToken>>>);

impl CancelHandle {
    /// Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                tracing::debug!("canceling in-flight request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.slot().is_some()
    }

    pub(crate) fn arm(&self, token: &CancelToken) {
        *self.slot() = Some(token.clone());
    }

    pub(crate) fn disarm(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a request was admitted by the gate.
#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    token: CancelToken,
}

impl Ticket {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct RequestGate {
    min_interval: Duration,
    last_request: Option<Instant>,
    generation: u64,
    in_flight: Option<CancelToken>,
}

impl RequestGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(Duration::from_millis(config.min_interval_ms))
    }

    pub fn begin(&mut self) -> Result<Ticket, GateError> {
        self.begin_at(Instant::now())
    }

    /// Admit a request issued at `now`, superseding any in-flight one.
    pub fn begin_at(&mut self, now: Instant) -> Result<Ticket, GateError> {
        if let Some(last) = self.last_request {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                let retry_after = self.min_interval - elapsed;
                tracing::debug!(retry_after_ms = retry_after.as_millis() as u64, "request rate limited");
                return Err(GateError::RateLimited { retry_after });
            }
        }

        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(generation = self.generation, "canceling superseded request");
            previous.cancel();
        }

        self.generation += 1;
        self.last_request = Some(now);
        let token = CancelToken::new();
        self.in_flight = Some(token.clone());
        Ok(Ticket {
            generation: self.generation,
            token,
        })
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && !ticket.token.is_canceled()
    }

    /// Settle `ticket` with its reply. Returns `None` when the request was
    /// canceled or superseded, so a stale reply is never applied.
    pub fn finish<T>(&mut self, ticket: Ticket, reply: T) -> Option<T> {
        if !self.is_current(&ticket) {
            if ticket.generation == self.generation {
                self.in_flight = None;
            }
            tracing::debug!(generation = ticket.generation, "dropping stale reply");
            return None;
        }
        self.in_flight = None;
        Some(reply)
    }

    /// Cancel whatever is in flight without starting anything new.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}
