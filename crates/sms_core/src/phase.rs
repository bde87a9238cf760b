use std::time::Duration;

/// What the batch is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Loading,
    /// `position` is 1-based.
    Sending {
        position: usize,
        total: usize,
        name: String,
    },
    Waiting {
        delay: Duration,
    },
    Completed,
    Cancelled,
    Failed {
        error: String,
    },
}

impl RunPhase {
    pub fn describe(&self) -> String {
        match self {
            RunPhase::Loading => "Loading contacts...".to_string(),
            RunPhase::Sending {
                position,
                total,
                name,
            } => format!("Sending message {position} of {total} to {name}..."),
            RunPhase::Waiting { delay } => {
                format!("Waiting {} before next message...", format_delay(*delay))
            }
            RunPhase::Completed => "All messages processed!".to_string(),
            RunPhase::Cancelled => "Run cancelled".to_string(),
            RunPhase::Failed { error } => format!("Error: {error}"),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Cancelled | RunPhase::Failed { .. }
        )
    }
}

/// Formats a delay as `"{m}m {s}s"`, rounding partial seconds up.
pub fn format_delay(delay: Duration) -> String {
    let total = countdown_seconds(delay);
    format!("{}m {}s", total / 60, total % 60)
}

/// Whole seconds shown on the countdown for `delay`.
pub fn countdown_seconds(delay: Duration) -> u64 {
    let secs = delay.as_secs();
    if delay.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
