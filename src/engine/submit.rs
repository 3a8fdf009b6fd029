//! Building a submission from an attempt and resolving the server's
//! answer, including the duplicate-completion recovery path.

use crate::api::{ApiError, TestApi};
use crate::engine::rewards;
use crate::model::{
    AnswerMap, AnswerRecord, Question, Schedule, SubmitRequest, SubmitResponse, Subject,
    TestResult, Week,
};

/// Score an attempt client-side: correct count plus one record per
/// answered question, in question order. Unanswered questions produce no
/// record and count against the score only through the total.
pub fn score_attempt(questions: &[Question], answers: &AnswerMap) -> (u32, Vec<AnswerRecord>) {
    let mut score = 0;
    let mut records = Vec::with_capacity(answers.len());
    for question in questions {
        let Some(selected) = answers.get(&question.id) else {
            continue;
        };
        let is_correct = *selected == question.correct_answer;
        if is_correct {
            score += 1;
        }
        records.push(AnswerRecord {
            question_id: question.id.clone(),
            selected_answer: selected.clone(),
            is_correct,
        });
    }
    (score, records)
}

/// Assemble the submit payload for one finished attempt. The server
/// recomputes score and points; the client-side values are for immediate
/// display and reward calculation.
pub fn build_request(
    student_id: &str,
    schedule: &Schedule,
    subject: &Subject,
    week: Week,
    answers: &AnswerMap,
) -> SubmitRequest {
    let (score, records) = score_attempt(&schedule.questions, answers);
    let total = schedule.questions.len() as u32;
    SubmitRequest {
        student_id: student_id.to_string(),
        week_schedule_id: schedule.id.clone(),
        subject_id: subject.id.clone(),
        week_number: week.number,
        year: week.year,
        score,
        total_questions: total,
        answers: records,
        points_gain: rewards::points_for(score, total),
    }
}

/// How a submission ended up.
#[derive(Debug)]
pub enum Resolution {
    /// The server stored a new result.
    Accepted(SubmitResponse),
    /// A result already existed and was read back; it is the canonical
    /// outcome, not an error.
    PriorResult(TestResult),
    /// A result already exists but could not be read back. The attempt is
    /// over either way.
    PriorResultUnreadable,
    /// Submission failed; the attempt may be retried.
    Failed(ApiError),
}

/// Submit and, on a duplicate-completion signal, recover the existing
/// result instead of failing. Calling this twice for the same attempt
/// yields the same result both times: the second call resolves through
/// the duplicate path.
pub async fn resolve(api: &dyn TestApi, request: &SubmitRequest) -> Resolution {
    match api.submit_result(request).await {
        Ok(response) => Resolution::Accepted(response),
        Err(ApiError::AlreadyCompleted) => {
            match api
                .fetch_result(&request.student_id, &request.week_schedule_id)
                .await
            {
                Ok(Some(result)) => Resolution::PriorResult(result),
                Ok(None) => Resolution::PriorResultUnreadable,
                Err(e) => {
                    log::warn!("prior result fetch failed after duplicate-completion signal: {e}");
                    Resolution::PriorResultUnreadable
                }
            }
        }
        Err(e) => Resolution::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("question {id}"),
            choices: vec!["a".to_string(), "b".to_string()],
            correct_answer: correct.to_string(),
            blooms_level: None,
        }
    }

    fn schedule(questions: Vec<Question>) -> Schedule {
        Schedule {
            id: "sched-1".to_string(),
            subject_id: "math".to_string(),
            week_number: 3,
            year: 2025,
            is_active: true,
            questions,
        }
    }

    #[test]
    fn scores_only_answered_questions() {
        let questions = vec![
            question("q1", "a"),
            question("q2", "a"),
            question("q3", "a"),
            question("q4", "a"),
            question("q5", "a"),
        ];
        let mut answers = AnswerMap::new();
        answers.insert("q1".to_string(), "a".to_string());
        answers.insert("q3".to_string(), "b".to_string());

        let (score, records) = score_attempt(&questions, &answers);
        assert_eq!(score, 1);
        assert_eq!(records.len(), 2);
        assert!(records[0].is_correct);
        assert!(!records[1].is_correct);
        // Records follow question order, not answer-map order.
        assert_eq!(records[0].question_id, "q1");
        assert_eq!(records[1].question_id, "q3");
    }

    #[test]
    fn four_of_five_correct_gains_twenty_points() {
        let questions: Vec<Question> = (0..5)
            .map(|i| question(&format!("q{i}"), "a"))
            .collect();
        let mut answers = AnswerMap::new();
        for i in 0..4 {
            answers.insert(format!("q{i}"), "a".to_string());
        }
        answers.insert("q4".to_string(), "b".to_string());

        let subject = Subject {
            id: "math".to_string(),
            name: "General Mathematics".to_string(),
        };
        let request = build_request(
            "student-1",
            &schedule(questions),
            &subject,
            Week::new(3, 2025),
            &answers,
        );
        assert_eq!(request.score, 4);
        assert_eq!(request.total_questions, 5);
        assert_eq!(request.points_gain, 20);
        assert_eq!(request.answers.len(), 5);
    }

    #[test]
    fn partial_attempt_scores_over_full_total() {
        let questions: Vec<Question> = (0..5)
            .map(|i| question(&format!("q{i}"), "a"))
            .collect();
        let mut answers = AnswerMap::new();
        answers.insert("q0".to_string(), "a".to_string());
        answers.insert("q1".to_string(), "a".to_string());

        let subject = Subject {
            id: "math".to_string(),
            name: "General Mathematics".to_string(),
        };
        let request = build_request(
            "student-1",
            &schedule(questions),
            &subject,
            Week::new(3, 2025),
            &answers,
        );
        assert_eq!(request.score, 2);
        assert_eq!(request.total_questions, 5);
        assert_eq!(request.answers.len(), 2);
        // 2/5 is below 50%
        assert_eq!(request.points_gain, -10);
    }
}
