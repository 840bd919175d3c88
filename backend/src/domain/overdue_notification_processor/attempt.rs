//! Attempt-local outcome of one delivery try.
//!
//! Keeps "what happened on the wire" separate from the record transition so
//! dispatch applies exactly one state change per attempt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum AttemptOutcome {
    Delivered,
    Failed(String),
}

impl AttemptOutcome {
    pub(super) fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
