use crate::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

/// What one message's pass through the cycle produced.
#[derive(Debug, Default)]
pub struct ProcessedMessage {
    pub subject: String,
    pub written: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct MessageOutcome {
    pub id: String,
    pub result: Result<ProcessedMessage, Error>,
}

/// Per-message outcomes of one polling cycle, in listing order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<MessageOutcome>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &MessageOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &MessageOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn log_summary(&self) {
        for outcome in self.failed() {
            if let Err(e) = &outcome.result {
                error!(id = %outcome.id, error = %e, "Message left for the next poll");
            }
        }
        if !self.is_empty() {
            info!(
                processed = self.succeeded().count(),
                failed = self.failed().count(),
                "Cycle complete"
            );
        }
    }
}
