use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answered question as sent to and echoed back by the server.
/// Correctness is computed client-side for immediate feedback; the server
/// recomputes it and is authoritative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected_answer: String,
    pub is_correct: bool,
}

/// Server-authoritative record of a completed attempt. Created exactly once
/// per (student, schedule) pair and read-only thereafter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    pub week_schedule_id: String,
    pub score: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
    pub points_earned: i32,
    pub completed_at: DateTime<Utc>,
}

/// Payload for the submit-result operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub student_id: String,
    pub week_schedule_id: String,
    pub subject_id: String,
    pub week_number: u32,
    pub year: i32,
    pub score: u32,
    pub total_questions: u32,
    pub answers: Vec<AnswerRecord>,
    pub points_gain: i32,
}

/// Successful submit response: the stored result plus the leaderboard
/// totals the server updated alongside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub test_result: TestResult,
    pub points_earned: i32,
    pub total_points: i32,
}

/// One leaderboard row for the selected (subject, week, year).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub student_name: String,
    pub score: u32,
    pub points: i32,
}
