//! Per-request spans and per-capability counters.
use std::{collections::BTreeMap, sync::Mutex, time::Instant};

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::{Middleware, MiddlewareContext, MiddlewareResult, Next};
use crate::lib::BoxFuture;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityStats {
    pub requests: u64,
    pub failures: u64,
    pub total_duration_ms: u64,
}

pub struct TelemetryMiddleware {
    enabled: bool,
    stats: Mutex<BTreeMap<String, CapabilityStats>>,
}

impl TelemetryMiddleware {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stats: Mutex::new(BTreeMap::new()),
        }
    }

    /// Counters keyed by `operation` or `operation:target`.
    pub fn snapshot(&self) -> BTreeMap<String, CapabilityStats> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn record(&self, label: &str, failed: bool, duration_ms: u64) {
        if let Ok(mut stats) = self.stats.lock() {
            let entry = stats.entry(label.to_string()).or_default();
            entry.requests += 1;
            entry.total_duration_ms += duration_ms;
            if failed {
                entry.failures += 1;
            }
        }
    }
}

impl Middleware for TelemetryMiddleware {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        if !self.enabled {
            return next.run(ctx);
        }
        Box::pin(async move {
            let label = ctx.label();
            let span = info_span!(
                target: "imagesorcery::telemetry",
                "mcp_request",
                request_id = %ctx.request_id,
                operation = ctx.operation.as_str(),
                capability = ctx.target.as_deref().unwrap_or(""),
            );
            let started = Instant::now();
            let result = next.run(ctx).instrument(span.clone()).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            self.record(&label, result.is_err(), duration_ms);

            span.in_scope(|| match &result {
                Ok(_) => info!(
                    target: "imagesorcery::telemetry",
                    request = %label,
                    duration_ms,
                    "Request completed"
                ),
                Err(err) => warn!(
                    target: "imagesorcery::telemetry",
                    request = %label,
                    duration_ms,
                    error_kind = err.kind(),
                    "Request failed"
                ),
            });
            result
        })
    }
}
