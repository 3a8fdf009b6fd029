use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Selected choice per question id. A question with no entry is unanswered;
/// the map never holds empty/null placeholders. BTreeMap keeps persisted
/// snapshots byte-stable across runs.
pub type AnswerMap = BTreeMap<String, String>;

/// Lifecycle of one test attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Subject and/or week not selected yet.
    NoFilters,
    /// A schedule fetch is in flight for the selected filters.
    Loading,
    /// Schedule bound with at least one question; test not started.
    Ready,
    /// Countdown running, answers being recorded.
    InProgress,
    /// Submission started; no further answer mutation accepted.
    Submitting,
    /// Server accepted this attempt's result.
    Completed,
    /// A result for this (student, schedule) already exists server-side.
    AlreadyCompleted,
    /// A fetch or submission failed; see the session's current error.
    Error,
}

impl Phase {
    /// Whether answers may still be recorded.
    pub fn accepts_answers(self) -> bool {
        self == Phase::InProgress
    }
}
