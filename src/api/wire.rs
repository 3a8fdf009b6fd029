//! Raw response shapes as the backend serves them. Everything here is
//! normalized into `crate::model` before it leaves this module: Mongo-style
//! `_id` keys become plain ids, nested subject objects are flattened, and
//! the `choices`/`options` duck-typing on questions collapses into a single
//! canonical `choices` field.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{
    AnswerRecord, LeaderboardEntry, Question, Schedule, ScheduleSummary, Subject, TestResult, Week,
};

#[derive(Debug, Deserialize)]
pub(crate) struct WireSubject {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "subject", default)]
    pub name: Option<String>,
}

/// `subjectId` arrives either populated (a full subject document) or as a
/// bare id string, depending on whether the endpoint expanded the
/// reference.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireSubjectRef {
    Populated(WireSubject),
    Id(String),
}

impl WireSubjectRef {
    pub fn id(&self) -> &str {
        match self {
            WireSubjectRef::Populated(subject) => &subject.id,
            WireSubjectRef::Id(id) => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            WireSubjectRef::Populated(subject) => subject.name.as_deref(),
            WireSubjectRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "question")]
    pub text: String,
    // Some question documents carry `choices`, older ones `options`.
    #[serde(default, alias = "options")]
    pub choices: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(rename = "bloomsLevel", default)]
    pub blooms_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireScheduleItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "subjectId")]
    pub subject: WireSubjectRef,
    #[serde(rename = "subjectName", default)]
    pub subject_name: Option<String>,
    #[serde(rename = "weekNumber")]
    pub week_number: u32,
    pub year: i32,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "questionIds", default)]
    pub questions: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTestResult {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "weekScheduleId")]
    pub week_schedule_id: String,
    pub score: u32,
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
    #[serde(default)]
    pub answers: Vec<WireAnswer>,
    #[serde(rename = "pointsEarned")]
    pub points_earned: i32,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnswer {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "selectedAnswer")]
    pub selected_answer: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLeaderboardEntry {
    #[serde(default, alias = "studentName", alias = "name")]
    pub student_name: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default, alias = "totalPoints")]
    pub points: i32,
}

/// `{ success, data }` envelope most endpoints wrap their payload in.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSubmitData {
    #[serde(rename = "testResult")]
    pub test_result: WireTestResult,
    #[serde(rename = "pointsEarned")]
    pub points_earned: i32,
    #[serde(rename = "totalPoints")]
    pub total_points: i32,
}

/// Error body shape: `{ success: false, message }`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl From<WireScheduleItem> for Schedule {
    fn from(item: WireScheduleItem) -> Self {
        Schedule {
            id: item.id,
            subject_id: item.subject.id().to_string(),
            week_number: item.week_number,
            year: item.year,
            is_active: item.is_active,
            questions: item.questions.into_iter().map(Question::from).collect(),
        }
    }
}

impl From<WireQuestion> for Question {
    fn from(q: WireQuestion) -> Self {
        Question {
            id: q.id,
            text: q.text,
            choices: q.choices,
            correct_answer: q.correct_answer,
            blooms_level: q.blooms_level,
        }
    }
}

impl From<&WireScheduleItem> for ScheduleSummary {
    fn from(item: &WireScheduleItem) -> Self {
        ScheduleSummary {
            subject: Subject {
                id: item.subject.id().to_string(),
                name: item
                    .subject
                    .name()
                    .map(str::to_string)
                    .or_else(|| item.subject_name.clone())
                    .unwrap_or_else(|| format!("Subject {}", item.subject.id())),
            },
            week: Week::new(item.week_number, item.year),
            is_active: item.is_active,
        }
    }
}

impl From<WireTestResult> for TestResult {
    fn from(r: WireTestResult) -> Self {
        TestResult {
            id: r.id,
            student_id: r.student_id,
            week_schedule_id: r.week_schedule_id,
            score: r.score,
            total_questions: r.total_questions,
            answers: r.answers.into_iter().map(AnswerRecord::from).collect(),
            points_earned: r.points_earned,
            completed_at: r.completed_at,
        }
    }
}

impl From<WireAnswer> for AnswerRecord {
    fn from(a: WireAnswer) -> Self {
        AnswerRecord {
            question_id: a.question_id,
            selected_answer: a.selected_answer,
            is_correct: a.is_correct,
        }
    }
}

impl From<WireLeaderboardEntry> for LeaderboardEntry {
    fn from(e: WireLeaderboardEntry) -> Self {
        LeaderboardEntry {
            student_name: e.student_name,
            score: e.score,
            points: e.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_accepts_choices_field() {
        let q: WireQuestion = serde_json::from_str(
            r#"{"_id":"q1","question":"2+2?","choices":["3","4"],"correctAnswer":"4"}"#,
        )
        .unwrap();
        assert_eq!(q.choices, vec!["3", "4"]);
    }

    #[test]
    fn question_accepts_options_field() {
        let q: WireQuestion = serde_json::from_str(
            r#"{"_id":"q1","question":"2+2?","options":["3","4"],"correctAnswer":"4","bloomsLevel":"remember"}"#,
        )
        .unwrap();
        assert_eq!(q.choices, vec!["3", "4"]);
        assert_eq!(q.blooms_level.as_deref(), Some("remember"));
    }

    #[test]
    fn schedule_item_flattens_nested_subject() {
        let item: WireScheduleItem = serde_json::from_str(
            r#"{
                "_id": "sched-1",
                "subjectId": { "_id": "math", "subject": "General Mathematics" },
                "weekNumber": 3,
                "year": 2025,
                "isActive": true,
                "questionIds": [
                    {"_id":"q1","question":"2+2?","options":["3","4"],"correctAnswer":"4"}
                ]
            }"#,
        )
        .unwrap();
        let summary = ScheduleSummary::from(&item);
        assert_eq!(summary.subject.name, "General Mathematics");
        assert_eq!(summary.week, Week::new(3, 2025));

        let schedule = Schedule::from(item);
        assert_eq!(schedule.subject_id, "math");
        assert_eq!(schedule.questions.len(), 1);
        assert_eq!(schedule.questions[0].choices.len(), 2);
    }

    #[test]
    fn schedule_item_accepts_unpopulated_subject_reference() {
        let item: WireScheduleItem = serde_json::from_str(
            r#"{
                "_id": "sched-1",
                "subjectId": "math",
                "subjectName": "General Mathematics",
                "weekNumber": 3,
                "year": 2025,
                "isActive": true
            }"#,
        )
        .unwrap();
        let summary = ScheduleSummary::from(&item);
        assert_eq!(summary.subject.id, "math");
        assert_eq!(summary.subject.name, "General Mathematics");
    }

    #[test]
    fn subject_without_name_gets_placeholder() {
        let item: WireScheduleItem = serde_json::from_str(
            r#"{"_id":"s","subjectId":{"_id":"abc"},"weekNumber":1,"year":2025}"#,
        )
        .unwrap();
        let summary = ScheduleSummary::from(&item);
        assert_eq!(summary.subject.name, "Subject abc");
        assert!(!summary.is_active);
    }

    #[test]
    fn envelope_with_missing_data_parses() {
        let env: Envelope<WireSubmitData> =
            serde_json::from_str(r#"{"success":false,"message":"You have already completed this test"}"#)
                .unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(
            env.message.as_deref(),
            Some("You have already completed this test")
        );
    }
}
