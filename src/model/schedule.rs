use serde::{Deserialize, Serialize};

/// A subject a student can be tested on. Server-assigned id, display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

/// A (week number, year) pair. Schedules are scoped to exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub number: u32,
    pub year: i32,
}

impl Week {
    pub fn new(number: u32, year: i32) -> Self {
        Self { number, year }
    }
}

/// One row of the active-schedule list: enough to populate the filter
/// choices, without the question payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub subject: Subject,
    pub week: Week,
    pub is_active: bool,
}

/// A single multiple-choice question. The upstream service duck-types the
/// choice list as either `choices` or `options`; that is normalized at the
/// wire boundary, so this type always has `choices`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub choices: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub blooms_level: Option<String>,
}

/// The (subject, week, year) binding to a fixed question set. Fetched,
/// never mutated locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub subject_id: String,
    pub week_number: u32,
    pub year: i32,
    pub is_active: bool,
    pub questions: Vec<Question>,
}

impl Schedule {
    /// Whether this schedule is bound to exactly the given filter pair.
    pub fn matches(&self, subject: &Subject, week: Week) -> bool {
        self.subject_id == subject.id && self.week_number == week.number && self.year == week.year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            id: "sched-1".to_string(),
            subject_id: "math".to_string(),
            week_number: 3,
            year: 2025,
            is_active: true,
            questions: Vec::new(),
        }
    }

    #[test]
    fn matches_requires_all_three_fields() {
        let s = schedule();
        let math = Subject {
            id: "math".to_string(),
            name: "General Mathematics".to_string(),
        };
        assert!(s.matches(&math, Week::new(3, 2025)));
        assert!(!s.matches(&math, Week::new(4, 2025)));
        assert!(!s.matches(&math, Week::new(3, 2024)));

        let other = Subject {
            id: "sci".to_string(),
            name: "General Science".to_string(),
        };
        assert!(!s.matches(&other, Week::new(3, 2025)));
    }
}
