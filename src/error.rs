use thiserror::Error;

/// Which failed operation a retry control should re-invoke. Mirrors the
/// three fetch concerns the engine runs; submission retries go through the
/// normal submit path instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryAction {
    Schedule,
    Tests,
    Leaderboard,
}

/// The single current-error value a session holds. Exactly one is surfaced
/// at a time and each new operation replaces it. Cancelled fetches never
/// produce one of these.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Transient failure loading the active-schedule list.
    #[error("failed to load schedule: {0}")]
    ScheduleFetch(String),

    /// The active-schedule list came back empty. Structural: nothing to
    /// retry until an administrator activates a schedule.
    #[error("no active schedules available")]
    NoActiveSchedules,

    /// Transient failure loading the question set for the selected filters.
    #[error("failed to load tests: {0}")]
    TestsFetch(String),

    /// No active schedule exists for the selected subject and week.
    #[error("no active schedule found for this week and subject")]
    NoScheduleForFilters,

    /// The schedule exists but has zero questions assigned.
    #[error("no questions assigned to this week schedule")]
    NoQuestionsAssigned,

    /// Transient failure loading the leaderboard.
    #[error("failed to load leaderboard: {0}")]
    LeaderboardFetch(String),

    /// Submission failed for a reason other than duplicate completion.
    /// The persisted attempt is kept so submission can be retried.
    #[error("failed to save test result: {0}")]
    SubmitFailed(String),

    /// The server says this test is already completed, but the prior
    /// result could not be reloaded. The attempt is over regardless.
    #[error("test already completed, but your previous score could not be loaded")]
    CompletedScoreUnavailable,

    /// Manual submit attempted with unanswered questions. Caught before
    /// any request is made; the forced-expiry path bypasses this.
    #[error("{unanswered} question(s) still unanswered")]
    UnansweredQuestions { unanswered: usize },
}

impl EngineError {
    /// The retry tag for this error, if a retry control applies.
    pub fn retry_action(&self) -> Option<RetryAction> {
        match self {
            EngineError::ScheduleFetch(_) | EngineError::NoActiveSchedules => {
                Some(RetryAction::Schedule)
            }
            EngineError::TestsFetch(_)
            | EngineError::NoScheduleForFilters
            | EngineError::NoQuestionsAssigned => Some(RetryAction::Tests),
            EngineError::LeaderboardFetch(_) => Some(RetryAction::Leaderboard),
            _ => None,
        }
    }

    /// Transient errors may succeed on retry; structural ones require a
    /// different filter selection (or server-side configuration).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::ScheduleFetch(_)
                | EngineError::TestsFetch(_)
                | EngineError::LeaderboardFetch(_)
                | EngineError::SubmitFailed(_)
        )
    }
}
