use serde::Serialize;
use std::time::Duration;

use crate::session::HttpReply;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Success,
    Failure(String),
}

/// Result of one labeled request, as handed to the stats sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub name: String,
    pub status: u16,
    pub elapsed: Duration,
    pub verdict: Verdict,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

/// A response whose verdict has not been decided yet.
///
/// Consuming it through [`CatchResponse::success`] or [`CatchResponse::failure`]
/// is the only way to get a [`RequestOutcome`], so a task cannot report a
/// request without an explicit verdict.
#[must_use = "call success() or failure() to report the request"]
#[derive(Debug)]
pub struct CatchResponse {
    name: String,
    status: u16,
    elapsed: Duration,
}

impl CatchResponse {
    pub fn new(name: &str, reply: HttpReply, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: reply.status,
            elapsed,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn success(self) -> RequestOutcome {
        self.finish(Verdict::Success)
    }

    pub fn failure(self, reason: impl Into<String>) -> RequestOutcome {
        self.finish(Verdict::Failure(reason.into()))
    }

    fn finish(self, verdict: Verdict) -> RequestOutcome {
        RequestOutcome {
            name: self.name,
            status: self.status,
            elapsed: self.elapsed,
            verdict,
        }
    }
}
