pub mod attempt;
pub mod result;
pub mod schedule;

pub use attempt::{AnswerMap, Phase};
pub use result::{AnswerRecord, LeaderboardEntry, SubmitRequest, SubmitResponse, TestResult};
pub use schedule::{Question, Schedule, ScheduleSummary, Subject, Week};
