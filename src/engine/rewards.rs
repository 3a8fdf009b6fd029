//! Pure reward calculations: points for a score, rank for cumulative
//! points, achievement unlocks. No I/O, safe to call repeatedly with the
//! same inputs for retries and audits.

use std::collections::HashSet;

use crate::model::{AnswerMap, Question};

/// Points delta for one attempt. Thresholds are inclusive at the lower
/// bound and evaluated highest first.
pub fn points_for(score: u32, total: u32) -> i32 {
    if total == 0 {
        return -10;
    }
    let percentage = score as f64 / total as f64 * 100.0;
    if percentage >= 90.0 {
        30
    } else if percentage >= 70.0 {
        20
    } else if percentage >= 50.0 {
        10
    } else {
        -10
    }
}

/// One display tier. Tiers are contiguous; the last is unbounded above.
#[derive(Debug, PartialEq, Eq)]
pub struct Rank {
    pub name: &'static str,
    pub min_points: i32,
    pub description: &'static str,
}

pub const RANKS: [Rank; 8] = [
    Rank {
        name: "Absent Legend",
        min_points: 0,
        description: "Technically enrolled.",
    },
    Rank {
        name: "The Crammer",
        min_points: 150,
        description: "Studies best under extreme pressure—like 5 minutes before class.",
    },
    Rank {
        name: "Seatwarmer",
        min_points: 300,
        description: "Physically present, mentally... buffering.",
    },
    Rank {
        name: "Group Project Ghost",
        min_points: 450,
        description: "Appears only during final presentation day.",
    },
    Rank {
        name: "Google Scholar (Unofficial)",
        min_points: 600,
        description: "Master of Ctrl+F and \"Quizlet.\"",
    },
    Rank {
        name: "The Lowkey Genius",
        min_points: 750,
        description: "Never recites, still gets the highest score.",
    },
    Rank {
        name: "Almost Valedictorian",
        min_points: 900,
        description: "Always 0.01 short—every time.",
    },
    Rank {
        name: "The Valedictornator",
        min_points: 1050,
        description: "Delivers speeches, aces tests, and might run the school.",
    },
];

/// The highest tier whose lower bound is at or below `total_points`.
/// Negative totals fall back to the first tier.
pub fn rank_for(total_points: i32) -> &'static Rank {
    RANKS
        .iter()
        .rev()
        .find(|rank| total_points >= rank.min_points)
        .unwrap_or(&RANKS[0])
}

/// Inputs an achievement predicate sees for one completed attempt.
pub struct AchievementContext<'a> {
    /// Completions recorded before this attempt.
    pub previous_completions: u32,
    pub score: u32,
    pub total_questions: u32,
    pub answers: &'a AnswerMap,
    pub questions: &'a [Question],
}

#[derive(Debug)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    check: fn(&AchievementContext) -> bool,
}

fn check_first_test(ctx: &AchievementContext) -> bool {
    ctx.previous_completions == 0
}

fn check_perfect_score(ctx: &AchievementContext) -> bool {
    ctx.total_questions > 0 && ctx.score == ctx.total_questions
}

fn check_streak_three(ctx: &AchievementContext) -> bool {
    let mut streak = 0;
    for question in ctx.questions {
        if ctx.answers.get(&question.id) == Some(&question.correct_answer) {
            streak += 1;
            if streak >= 3 {
                return true;
            }
        } else {
            streak = 0;
        }
    }
    false
}

pub const ACHIEVEMENTS: [Achievement; 3] = [
    Achievement {
        id: "first_test",
        name: "First Test Completed",
        description: "Congratulations on completing your first weekly test!",
        check: check_first_test,
    },
    Achievement {
        id: "perfect_score",
        name: "Perfect Score",
        description: "You scored 100% on a weekly test. Amazing!",
        check: check_perfect_score,
    },
    Achievement {
        id: "streak_3",
        name: "3 Correct in a Row",
        description: "You answered 3 questions correctly in a row!",
        check: check_streak_three,
    },
];

/// Catalog-order list of achievements whose predicate holds and which are
/// not already unlocked.
pub fn achievements_unlocked(
    ctx: &AchievementContext,
    already_unlocked: &HashSet<String>,
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !already_unlocked.contains(a.id) && (a.check)(ctx))
        .collect()
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

    #[test]
    fn points_thresholds() {
        // >= 90%
        assert_eq!(points_for(9, 10), 30);
        assert_eq!(points_for(10, 10), 30);
        // 70% <= ratio < 90%
        assert_eq!(points_for(7, 10), 20);
        assert_eq!(points_for(8, 10), 20);
        assert_eq!(points_for(4, 5), 20);
        // 50% <= ratio < 70%
        assert_eq!(points_for(5, 10), 10);
        assert_eq!(points_for(6, 10), 10);
        // below 50%
        assert_eq!(points_for(4, 10), -10);
        assert_eq!(points_for(0, 10), -10);
        assert_eq!(points_for(0, 0), -10);
    }

    #[test]
    fn points_deterministic_under_repetition() {
        for _ in 0..3 {
            assert_eq!(points_for(4, 5), 20);
        }
    }

    #[test]
    fn rank_tier_boundaries() {
        assert_eq!(rank_for(0).name, "Absent Legend");
        assert_eq!(rank_for(149).name, "Absent Legend");
        assert_eq!(rank_for(150).name, "The Crammer");
        assert_eq!(rank_for(299).name, "The Crammer");
        assert_eq!(rank_for(300).name, "Seatwarmer");
        assert_eq!(rank_for(1049).name, "Almost Valedictorian");
        assert_eq!(rank_for(1050).name, "The Valedictornator");
        assert_eq!(rank_for(1_000_000).name, "The Valedictornator");
    }

    #[test]
    fn rank_is_monotonic_and_total() {
        let mut last_index = 0;
        for points in 0..=2000 {
            let rank = rank_for(points);
            let index = RANKS.iter().position(|r| r.name == rank.name).unwrap();
            assert!(index >= last_index, "rank regressed at {points}");
            last_index = index;
        }
    }

    #[test]
    fn negative_points_fall_back_to_first_tier() {
        assert_eq!(rank_for(-50).name, "Absent Legend");
    }

    #[test]
    fn rank_descriptions_keep_display_copy() {
        assert_eq!(
            RANKS[1].description,
            "Studies best under extreme pressure—like 5 minutes before class."
        );
        assert_eq!(RANKS[6].description, "Always 0.01 short—every time.");
    }

    #[test]
    fn achievement_catalog_is_debug_printable() {
        let rendered = format!("{:?}", ACHIEVEMENTS[0]);
        assert!(rendered.contains("first_test"));
    }

    #[test]
    fn first_test_only_on_zero_previous_completions() {
        let answers = AnswerMap::new();
        let questions: Vec<Question> = Vec::new();
        let mut ctx = AchievementContext {
            previous_completions: 0,
            score: 1,
            total_questions: 5,
            answers: &answers,
            questions: &questions,
        };
        let unlocked = achievements_unlocked(&ctx, &HashSet::new());
        assert!(unlocked.iter().any(|a| a.id == "first_test"));

        ctx.previous_completions = 1;
        let unlocked = achievements_unlocked(&ctx, &HashSet::new());
        assert!(!unlocked.iter().any(|a| a.id == "first_test"));
    }

    #[test]
    fn streak_counts_consecutive_correct_in_question_order() {
        let questions = vec![
            question("q1", "a"),
            question("q2", "a"),
            question("q3", "a"),
            question("q4", "a"),
        ];
        let mut answers = AnswerMap::new();
        answers.insert("q1".to_string(), "a".to_string());
        answers.insert("q2".to_string(), "a".to_string());
        // q3 wrong breaks the streak
        answers.insert("q3".to_string(), "b".to_string());
        answers.insert("q4".to_string(), "a".to_string());

        let ctx = AchievementContext {
            previous_completions: 3,
            score: 3,
            total_questions: 4,
            answers: &answers,
            questions: &questions,
        };
        assert!(!check_streak_three(&ctx));

        let mut answers = answers.clone();
        answers.insert("q3".to_string(), "a".to_string());
        let ctx = AchievementContext {
            answers: &answers,
            ..ctx
        };
        assert!(check_streak_three(&ctx));
    }

    #[test]
    fn already_unlocked_achievements_are_not_repeated() {
        let answers = AnswerMap::new();
        let questions: Vec<Question> = Vec::new();
        let ctx = AchievementContext {
            previous_completions: 0,
            score: 5,
            total_questions: 5,
            answers: &answers,
            questions: &questions,
        };
        let mut already = HashSet::new();
        already.insert("first_test".to_string());

        let unlocked = achievements_unlocked(&ctx, &already);
        assert!(!unlocked.iter().any(|a| a.id == "first_test"));
        assert!(unlocked.iter().any(|a| a.id == "perfect_score"));
    }

    #[test]
    fn unlock_order_follows_catalog() {
        let answers = AnswerMap::new();
        let questions: Vec<Question> = Vec::new();
        let ctx = AchievementContext {
            previous_completions: 0,
            score: 5,
            total_questions: 5,
            answers: &answers,
            questions: &questions,
        };
        let unlocked = achievements_unlocked(&ctx, &HashSet::new());
        let ids: Vec<&str> = unlocked.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["first_test", "perfect_score"]);
    }
}
