//! Classification of a single forward attempt.

use std::time::Duration;

/// Final state of one destination attempt. Only used for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The destination answered; any status counts.
    Delivered { status: u16, latency: Duration },
    /// The per-attempt deadline passed first.
    TimedOut { latency: Duration },
    /// The dispatcher's background scope was canceled mid-flight.
    Canceled { latency: Duration },
    /// Transport error (connect, TLS, protocol).
    Failed { latency: Duration, error: String },
    /// Canceled while waiting for an admission slot; no request was sent.
    Abandoned,
}

impl ForwardOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            ForwardOutcome::Delivered { .. } => "delivered",
            ForwardOutcome::TimedOut { .. } => "timeout",
            ForwardOutcome::Canceled { .. } => "canceled",
            ForwardOutcome::Failed { .. } => "failed",
            ForwardOutcome::Abandoned => "abandoned",
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            ForwardOutcome::Delivered { latency, .. }
            | ForwardOutcome::TimedOut { latency }
            | ForwardOutcome::Canceled { latency }
            | ForwardOutcome::Failed { latency, .. } => Some(*latency),
            ForwardOutcome::Abandoned => None,
        }
    }

    /// True when a request reached the destination and got a response.
    pub fn is_delivered(&self) -> bool {
        matches!(self, ForwardOutcome::Delivered { .. })
    }
}
