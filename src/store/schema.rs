use serde::{Deserialize, Serialize};

use crate::model::{AnswerMap, Schedule, Subject, Week};

pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Everything needed to resume an in-progress attempt after a reload:
/// the filters it was started under, the bound schedule (questions
/// included, so no re-fetch is needed), position, answers, and the
/// countdown value at the moment of the last save.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_version")]
    pub schema_version: u32,
    pub selected_subject: Subject,
    pub selected_week: Week,
    pub schedule: Schedule,
    pub in_progress: bool,
    pub current_index: usize,
    pub answers: AnswerMap,
    pub remaining_secs: u32,
}

impl SessionSnapshot {
    /// Whether this snapshot can be restored as-is. Anything failing here
    /// is discarded and the normal fetch path runs instead: the snapshot
    /// must describe a started attempt on a non-empty question set whose
    /// schedule matches the saved filters exactly, with the position in
    /// range and every question carrying an id.
    pub fn is_restorable(&self) -> bool {
        self.schema_version == SNAPSHOT_VERSION
            && self.in_progress
            && !self.schedule.questions.is_empty()
            && self
                .schedule
                .matches(&self.selected_subject, self.selected_week)
            && self.schedule.questions.iter().all(|q| !q.id.is_empty())
            && self.current_index < self.schedule.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: "2+2?".to_string(),
            choices: vec!["3".to_string(), "4".to_string()],
            correct_answer: "4".to_string(),
            blooms_level: None,
        }
    }

    fn snapshot() -> SessionSnapshot {
        let subject = Subject {
            id: "math".to_string(),
            name: "General Mathematics".to_string(),
        };
        let week = Week::new(3, 2025);
        SessionSnapshot {
            schema_version: SNAPSHOT_VERSION,
            selected_subject: subject,
            selected_week: week,
            schedule: Schedule {
                id: "sched-1".to_string(),
                subject_id: "math".to_string(),
                week_number: 3,
                year: 2025,
                is_active: true,
                questions: vec![question("q1"), question("q2")],
            },
            in_progress: true,
            current_index: 1,
            answers: AnswerMap::new(),
            remaining_secs: 600,
        }
    }

    #[test]
    fn valid_snapshot_is_restorable() {
        assert!(snapshot().is_restorable());
    }

    #[test]
    fn not_started_is_not_restorable() {
        let mut s = snapshot();
        s.in_progress = false;
        assert!(!s.is_restorable());
    }

    #[test]
    fn filter_mismatch_is_not_restorable() {
        let mut s = snapshot();
        s.selected_week = Week::new(4, 2025);
        assert!(!s.is_restorable());

        let mut s = snapshot();
        s.selected_subject.id = "sci".to_string();
        assert!(!s.is_restorable());
    }

    #[test]
    fn index_out_of_range_is_not_restorable() {
        let mut s = snapshot();
        s.current_index = 2;
        assert!(!s.is_restorable());
    }

    #[test]
    fn empty_questions_is_not_restorable() {
        let mut s = snapshot();
        s.schedule.questions.clear();
        s.current_index = 0;
        assert!(!s.is_restorable());
    }

    #[test]
    fn missing_question_id_is_not_restorable() {
        let mut s = snapshot();
        s.schedule.questions[1].id = String::new();
        assert!(!s.is_restorable());
    }

    #[test]
    fn unknown_schema_version_is_not_restorable() {
        let mut s = snapshot();
        s.schema_version = 99;
        assert!(!s.is_restorable());
    }
}
