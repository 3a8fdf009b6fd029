pub mod channel;
pub mod http;
mod wire;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    LeaderboardEntry, Schedule, ScheduleSummary, SubmitRequest, SubmitResponse, TestResult, Week,
};

/// Failures at the collaborator boundary. Cancellation is not represented
/// here: a superseded request's response is discarded by the engine's
/// fetch tokens before it can matter.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// The server reported a result already exists for this
    /// (student, schedule) pair. Not a failure; resolved by reading the
    /// existing result.
    #[error("test already completed")]
    AlreadyCompleted,

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Status(_))
    }
}

/// The backend operations the engine consumes. Request/response shapes
/// only; transport lives in the implementation.
#[async_trait]
pub trait TestApi: Send + Sync {
    /// All (subject, week, year) combinations currently open for testing.
    async fn fetch_active_schedules(&self) -> Result<Vec<ScheduleSummary>, ApiError>;

    /// The schedule (with its question set) for one filter combination,
    /// or `None` if nothing active matches.
    async fn fetch_schedule_for(
        &self,
        subject_id: &str,
        week: Week,
    ) -> Result<Option<Schedule>, ApiError>;

    /// Store a completed attempt. Fails with `ApiError::AlreadyCompleted`
    /// if a result for this (student, schedule) pair already exists.
    async fn submit_result(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError>;

    /// The existing result for one (student, schedule) pair, if any.
    async fn fetch_result(
        &self,
        student_id: &str,
        schedule_id: &str,
    ) -> Result<Option<TestResult>, ApiError>;

    /// Ranked standings for one filter combination.
    async fn fetch_leaderboard(
        &self,
        subject_id: &str,
        week: Week,
    ) -> Result<Vec<LeaderboardEntry>, ApiError>;
}
