//! Built-in interceptors.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use judge_core::Topic;
use tracing::{debug, trace};

use super::{DispatchError, Envelope, Interceptor, Next, Origin, Outcome};

/// Forwards only messages carrying the judge-event marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct JudgeEventFilter;

#[async_trait]
impl Interceptor for JudgeEventFilter {
    fn name(&self) -> &'static str {
        "judge_event_filter"
    }

    async fn intercept(&self, envelope: Envelope, next: Next<'_>) -> Result<Outcome, DispatchError> {
        if envelope.message().as_judge_event().is_none() {
            debug!(
                target: "runtime::bus",
                message = envelope.name(),
                "Dropping message without judge marker"
            );
            return Ok(Outcome::Dropped { by: self.name() });
        }
        next.run(envelope).await
    }
}

/// Emits a trace line per message and a debug line per drop.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn intercept(&self, envelope: Envelope, next: Next<'_>) -> Result<Outcome, DispatchError> {
        let seq = envelope.seq();
        let message = envelope.name();
        trace!(
            target: "runtime::bus",
            seq,
            message,
            topic = %envelope.topic(),
            origin = %envelope.origin(),
            depth = envelope.depth(),
            payload = ?envelope.message(),
            "Publishing"
        );

        let outcome = next.run(envelope).await;
        match &outcome {
            Ok(Outcome::Dropped { by }) => {
                debug!(target: "runtime::bus", seq, message, by, "Message dropped")
            }
            Ok(Outcome::Delivered(report)) => trace!(
                target: "runtime::bus",
                seq,
                message,
                handled = report.handled,
                failures = report.failures.len(),
                "Delivered"
            ),
            Err(error) => debug!(target: "runtime::bus", seq, message, error = %error, "Dispatch failed"),
        }
        outcome
    }
}

/// Refuses external commands until opened.
///
/// The orchestrator closes the gate before a reset and opens it once the
/// match has started, so referee input cannot race a half-reset store.
/// Internal traffic and external domain events (logins, zone sensors) always
/// pass.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    open: AtomicBool,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Interceptor for AdmissionGate {
    fn name(&self) -> &'static str {
        "admission_gate"
    }

    async fn intercept(&self, envelope: Envelope, next: Next<'_>) -> Result<Outcome, DispatchError> {
        let refused = envelope.origin() == Origin::External
            && envelope.topic() == Topic::Command
            && !self.is_open();
        if refused {
            debug!(
                target: "runtime::bus",
                message = envelope.name(),
                "Gate closed, refusing external command"
            );
            return Ok(Outcome::Dropped { by: self.name() });
        }
        next.run(envelope).await
    }
}
