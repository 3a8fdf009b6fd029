//! The test session state machine. Owns the full attempt state: filter
//! selection, the bound schedule, answers, countdown, persistence, and
//! the outcome of submission. Collaborator calls go through the
//! [`TestApi`](crate::api::TestApi) trait; every fetch is guarded by a
//! per-concern [`FetchChannel`] so a superseded response can never mutate
//! state.
//!
//! Async operations are split into a synchronous `begin_*` half that
//! issues a token and a synchronous `apply_*` half that checks the token
//! before mutating. The `async fn` wrappers drive both halves; the halves
//! are public so supersession can be exercised without a runtime.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::api::channel::{FetchChannel, FetchToken};
use crate::api::{ApiError, TestApi};
use crate::config::Config;
use crate::engine::countdown::{Countdown, CountdownSignal};
use crate::engine::rewards::{self, Achievement, AchievementContext, Rank};
use crate::engine::submit::{self, Resolution};
use crate::error::{EngineError, RetryAction};
use crate::model::{
    AnswerMap, LeaderboardEntry, Phase, Question, Schedule, ScheduleSummary, Subject, TestResult,
    Week,
};
use crate::store::schema::SNAPSHOT_VERSION;
use crate::store::{SessionSnapshot, SessionStore};

/// How a session came up at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resumption {
    /// A persisted attempt was restored; the scoped fetch was skipped.
    Restored,
    /// No usable snapshot existed; the session starts at filter selection.
    Fresh,
}

/// Whether the caller has confirmed discarding in-progress work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discard {
    /// First attempt; progress-destroying changes are refused with
    /// [`FilterChange::NeedsConfirmation`].
    Ask,
    /// The user confirmed losing the current attempt.
    Confirmed,
}

/// Result of a filter mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterChange {
    Applied,
    /// An attempt is in progress; call again with [`Discard::Confirmed`].
    NeedsConfirmation,
    /// The value already matched; nothing was touched.
    Unchanged,
}

/// Everything a results screen needs after a submission resolved.
#[derive(Debug)]
pub struct SessionOutcome {
    pub result: TestResult,
    pub points_earned: i32,
    pub total_points: i32,
    pub rank: &'static Rank,
    pub new_achievements: Vec<&'static Achievement>,
}

/// One selectable week, tied to the subject whose schedule offers it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekOption {
    pub week: Week,
    pub subject_id: String,
}

pub struct TestSession {
    user_id: String,
    api: Arc<dyn TestApi>,
    store: SessionStore,
    config: Config,

    phase: Phase,
    error: Option<EngineError>,

    subjects: Vec<Subject>,
    week_options: Vec<WeekOption>,
    selected_subject: Option<Subject>,
    selected_week: Option<Week>,

    schedule: Option<Schedule>,
    current_index: usize,
    answers: AnswerMap,
    countdown: Countdown,
    started_at: Option<DateTime<Utc>>,
    forced_submit: bool,

    outcome: Option<SessionOutcome>,
    previous_result: Option<TestResult>,
    unlocked: HashSet<String>,
    leaderboard: Vec<LeaderboardEntry>,

    schedule_channel: FetchChannel,
    tests_channel: FetchChannel,
    leaderboard_channel: FetchChannel,
}

impl TestSession {
    pub fn new(user_id: &str, api: Arc<dyn TestApi>, store: SessionStore, config: Config) -> Self {
        let countdown = Countdown::new(config.time_limit_secs, config.warning_threshold_secs);
        Self {
            user_id: user_id.to_string(),
            api,
            store,
            config,
            phase: Phase::NoFilters,
            error: None,
            subjects: Vec::new(),
            week_options: Vec::new(),
            selected_subject: None,
            selected_week: None,
            schedule: None,
            current_index: 0,
            answers: AnswerMap::new(),
            countdown,
            started_at: None,
            forced_submit: false,
            outcome: None,
            previous_result: None,
            unlocked: HashSet::new(),
            leaderboard: Vec::new(),
            schedule_channel: FetchChannel::new(),
            tests_channel: FetchChannel::new(),
            leaderboard_channel: FetchChannel::new(),
        }
    }

    /// Restore a persisted attempt if one exists, then load the
    /// active-schedule list for the filter controls. Restoration and the
    /// scoped question fetch are mutually exclusive: a restored attempt
    /// already carries its questions.
    pub async fn init(&mut self) -> Resumption {
        let resumption = self.try_restore();
        self.load_active_schedules().await;
        resumption
    }

    fn try_restore(&mut self) -> Resumption {
        let Some(snapshot) = self.store.load_snapshot(&self.user_id) else {
            return Resumption::Fresh;
        };
        if !snapshot.is_restorable() {
            warn!("discarding snapshot that no longer describes a resumable attempt");
            self.store.clear_snapshot(&self.user_id);
            return Resumption::Fresh;
        }
        debug!(
            "restoring attempt on schedule {} at question {}",
            snapshot.schedule.id, snapshot.current_index
        );
        self.selected_subject = Some(snapshot.selected_subject);
        self.selected_week = Some(snapshot.selected_week);
        self.schedule = Some(snapshot.schedule);
        self.current_index = snapshot.current_index;
        self.answers = snapshot.answers;
        self.countdown.resume(snapshot.remaining_secs);
        self.started_at = Some(Utc::now());
        self.phase = Phase::InProgress;
        self.error = None;
        Resumption::Restored
    }

    // --- accessors ---

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Weeks selectable under the current subject filter; all weeks when
    /// no subject is selected.
    pub fn available_weeks(&self) -> Vec<Week> {
        self.week_options
            .iter()
            .filter(|option| match &self.selected_subject {
                Some(subject) => option.subject_id == subject.id,
                None => true,
            })
            .map(|option| option.week)
            .collect()
    }

    pub fn selected_subject(&self) -> Option<&Subject> {
        self.selected_subject.as_ref()
    }

    pub fn selected_week(&self) -> Option<Week> {
        self.selected_week
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.schedule.as_ref()?.questions.get(self.current_index)
    }

    pub fn question_count(&self) -> usize {
        self.schedule
            .as_ref()
            .map(|s| s.questions.len())
            .unwrap_or(0)
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn unanswered_count(&self) -> usize {
        match &self.schedule {
            Some(schedule) => schedule
                .questions
                .iter()
                .filter(|q| !self.answers.contains_key(&q.id))
                .count(),
            None => 0,
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    pub fn warning_active(&self) -> bool {
        self.countdown.warning_active()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn previous_result(&self) -> Option<&TestResult> {
        self.previous_result.as_ref()
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    fn has_progress(&self) -> bool {
        self.phase == Phase::InProgress || !self.answers.is_empty()
    }

    /// Set the current error. Fetch failures never tear down a running or
    /// finished attempt; the error phase is only entered from setup states.
    fn fail(&mut self, error: EngineError) {
        if matches!(
            self.phase,
            Phase::NoFilters | Phase::Loading | Phase::Ready | Phase::Error
        ) {
            self.phase = Phase::Error;
        }
        self.error = Some(error);
    }

    // --- active-schedule list ---

    pub async fn load_active_schedules(&mut self) {
        let token = self.begin_schedule_fetch();
        let response = self.api.fetch_active_schedules().await;
        self.apply_schedules_response(&token, response);
    }

    pub fn begin_schedule_fetch(&mut self) -> FetchToken {
        self.schedule_channel.issue()
    }

    /// Returns `false` when the token was superseded and nothing changed.
    pub fn apply_schedules_response(
        &mut self,
        token: &FetchToken,
        response: Result<Vec<ScheduleSummary>, ApiError>,
    ) -> bool {
        if !self.schedule_channel.is_live(token) {
            debug!("dropping superseded schedule-list response");
            return false;
        }
        match response {
            Ok(summaries) => {
                let active: Vec<ScheduleSummary> =
                    summaries.into_iter().filter(|s| s.is_active).collect();
                if active.is_empty() {
                    self.fail(EngineError::NoActiveSchedules);
                    return true;
                }
                let mut subjects: Vec<Subject> = Vec::new();
                let mut week_options: Vec<WeekOption> = Vec::new();
                for summary in active {
                    if !subjects.iter().any(|s| s.id == summary.subject.id) {
                        subjects.push(summary.subject.clone());
                    }
                    let option = WeekOption {
                        week: summary.week,
                        subject_id: summary.subject.id,
                    };
                    if !week_options.contains(&option) {
                        week_options.push(option);
                    }
                }
                week_options.sort_by_key(|o| (o.week.year, o.week.number));
                self.subjects = subjects;
                self.week_options = week_options;
                if matches!(
                    self.error.as_ref().and_then(EngineError::retry_action),
                    Some(RetryAction::Schedule)
                ) {
                    self.error = None;
                    if self.phase == Phase::Error {
                        self.phase = Phase::NoFilters;
                    }
                }
            }
            Err(e) => self.fail(EngineError::ScheduleFetch(e.to_string())),
        }
        true
    }

    // --- filter selection ---

    pub fn select_subject(&mut self, subject: Subject, discard: Discard) -> FilterChange {
        if self
            .selected_subject
            .as_ref()
            .is_some_and(|s| s.id == subject.id)
        {
            return FilterChange::Unchanged;
        }
        if self.has_progress() && discard == Discard::Ask {
            return FilterChange::NeedsConfirmation;
        }
        self.discard_attempt();
        self.selected_subject = Some(subject);
        FilterChange::Applied
    }

    pub fn select_week(&mut self, week: Week, discard: Discard) -> FilterChange {
        if self.selected_week == Some(week) {
            return FilterChange::Unchanged;
        }
        if self.has_progress() && discard == Discard::Ask {
            return FilterChange::NeedsConfirmation;
        }
        self.discard_attempt();
        self.selected_week = Some(week);
        FilterChange::Applied
    }

    /// Clear both filters and all attempt state. From a finished attempt
    /// (completed or already-completed) no confirmation is required; that
    /// path also drops the local completion marker so the server is
    /// consulted fresh next time.
    pub fn reset_filters(&mut self, discard: Discard) -> FilterChange {
        let finished = matches!(self.phase, Phase::Completed | Phase::AlreadyCompleted);
        if !finished && self.has_progress() && discard == Discard::Ask {
            return FilterChange::NeedsConfirmation;
        }
        if self.phase == Phase::AlreadyCompleted {
            if let Some(schedule) = &self.schedule {
                self.store.clear_completion(&self.user_id, &schedule.id);
            }
        }
        self.discard_attempt();
        self.selected_subject = None;
        self.selected_week = None;
        FilterChange::Applied
    }

    /// Drop every piece of attempt state and cancel in-flight scoped
    /// fetches so their responses cannot land on the new selection.
    fn discard_attempt(&mut self) {
        self.schedule = None;
        self.answers.clear();
        self.current_index = 0;
        self.countdown.stop();
        self.started_at = None;
        self.forced_submit = false;
        self.outcome = None;
        self.previous_result = None;
        self.error = None;
        self.leaderboard.clear();
        self.phase = Phase::NoFilters;
        self.tests_channel.cancel();
        self.leaderboard_channel.cancel();
        self.store.clear_snapshot(&self.user_id);
    }

    // --- scoped question fetch + completion pre-check ---

    /// Fetch the schedule for the selected filters, then ask the server
    /// whether a result already exists for it. No-op until both filters
    /// are set, and no-op outside the setup phases: a running or finished
    /// attempt is only torn down through a confirmed filter change.
    pub async fn load_tests(&mut self) {
        let (Some(subject), Some(week)) = (self.selected_subject.clone(), self.selected_week)
        else {
            return;
        };
        let Some(token) = self.begin_tests_fetch() else {
            return;
        };
        let response = self.api.fetch_schedule_for(&subject.id, week).await;
        if !self.apply_tests_response(&token, response) {
            return;
        }
        if self.phase != Phase::Ready {
            return;
        }
        let schedule_id = match &self.schedule {
            Some(schedule) => schedule.id.clone(),
            None => return,
        };
        let response = self.api.fetch_result(&self.user_id, &schedule_id).await;
        self.apply_completion_check(&token, response);
    }

    /// Returns `None` outside the setup phases; a question fetch must
    /// never demote an attempt that is in progress or already resolved.
    pub fn begin_tests_fetch(&mut self) -> Option<FetchToken> {
        if !matches!(
            self.phase,
            Phase::NoFilters | Phase::Loading | Phase::Ready | Phase::Error
        ) {
            debug!("ignoring question-set fetch outside setup phases");
            return None;
        }
        self.phase = Phase::Loading;
        self.error = None;
        Some(self.tests_channel.issue())
    }

    pub fn apply_tests_response(
        &mut self,
        token: &FetchToken,
        response: Result<Option<Schedule>, ApiError>,
    ) -> bool {
        if !self.tests_channel.is_live(token) {
            debug!("dropping superseded question-set response");
            return false;
        }
        match response {
            Ok(Some(schedule)) => {
                if schedule.questions.is_empty() {
                    self.schedule = Some(schedule);
                    self.fail(EngineError::NoQuestionsAssigned);
                } else {
                    self.schedule = Some(schedule);
                    self.phase = Phase::Ready;
                }
            }
            Ok(None) => self.fail(EngineError::NoScheduleForFilters),
            Err(e) => self.fail(EngineError::TestsFetch(e.to_string())),
        }
        true
    }

    /// Apply the pre-start completion check. On a read failure the local
    /// completion marker is the fallback; absence of both means the test
    /// is treated as not yet taken.
    pub fn apply_completion_check(
        &mut self,
        token: &FetchToken,
        response: Result<Option<TestResult>, ApiError>,
    ) -> bool {
        if !self.tests_channel.is_live(token) {
            debug!("dropping superseded completion-check response");
            return false;
        }
        if self.phase != Phase::Ready {
            return true;
        }
        match response {
            Ok(Some(result)) => {
                self.previous_result = Some(result);
                self.phase = Phase::AlreadyCompleted;
            }
            Ok(None) => {}
            Err(e) => {
                debug!("completion pre-check failed, falling back to local marker: {e}");
                let schedule_id = self.schedule.as_ref().map(|s| s.id.clone());
                if let Some(schedule_id) = schedule_id {
                    if let Some(result) = self.store.load_completion(&self.user_id, &schedule_id) {
                        self.previous_result = Some(result);
                        self.phase = Phase::AlreadyCompleted;
                    }
                }
            }
        }
        true
    }

    // --- the attempt ---

    /// Begin the attempt: position at the first question, arm the
    /// countdown, persist. Only legal from `Ready`.
    pub fn start_test(&mut self) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }
        let Some(schedule) = &self.schedule else {
            return false;
        };
        if schedule.questions.is_empty() {
            return false;
        }
        self.current_index = 0;
        self.answers.clear();
        self.forced_submit = false;
        self.countdown.start();
        self.started_at = Some(Utc::now());
        self.phase = Phase::InProgress;
        self.persist();
        true
    }

    /// Record an answer. Selections arriving outside an active attempt
    /// (after expiry, during submission) are dropped.
    pub fn select_answer(&mut self, question_id: &str, answer: &str) {
        if !self.phase.accepts_answers() {
            debug!("ignoring answer selection outside an active attempt");
            return;
        }
        let known = self
            .schedule
            .as_ref()
            .is_some_and(|s| s.questions.iter().any(|q| q.id == question_id));
        if !known {
            warn!("ignoring answer for unknown question {question_id}");
            return;
        }
        self.answers
            .insert(question_id.to_string(), answer.to_string());
        self.persist();
    }

    pub fn next_question(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        if self.current_index + 1 < self.question_count() {
            self.current_index += 1;
            self.persist();
        }
    }

    pub fn previous_question(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        if self.current_index > 0 {
            self.current_index -= 1;
            self.persist();
        }
    }

    pub fn jump_to_question(&mut self, index: usize) {
        if self.phase != Phase::InProgress {
            return;
        }
        if index < self.question_count() && index != self.current_index {
            self.current_index = index;
            self.persist();
        }
    }

    /// Advance the countdown by one second. On expiry the attempt is
    /// submitted as-is, unanswered questions included.
    pub async fn tick(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        match self.countdown.tick() {
            Some(CountdownSignal::Expired) => {
                self.forced_submit = true;
                self.finish_attempt().await;
            }
            Some(_) => self.persist(),
            None => {}
        }
    }

    /// Manual submission. Refused with `UnansweredQuestions` while gaps
    /// remain, unless this attempt already went through forced expiry and
    /// is being retried after a submit failure.
    pub async fn submit(&mut self) {
        let retrying_failed_submit = self.phase == Phase::Error
            && matches!(self.error, Some(EngineError::SubmitFailed(_)));
        if self.phase != Phase::InProgress && !retrying_failed_submit {
            debug!("ignoring submit outside an active attempt");
            return;
        }
        if !self.forced_submit {
            let unanswered = self.unanswered_count();
            if unanswered > 0 {
                self.error = Some(EngineError::UnansweredQuestions { unanswered });
                return;
            }
        }
        self.finish_attempt().await;
    }

    async fn finish_attempt(&mut self) {
        let Some(schedule) = self.schedule.clone() else {
            return;
        };
        let (Some(subject), Some(week)) = (self.selected_subject.clone(), self.selected_week)
        else {
            return;
        };
        self.countdown.stop();
        self.phase = Phase::Submitting;
        self.error = None;

        let request = submit::build_request(&self.user_id, &schedule, &subject, week, &self.answers);
        match submit::resolve(self.api.as_ref(), &request).await {
            Resolution::Accepted(response) => {
                let previous_completions = match self.store.bump_completion_count(&self.user_id) {
                    Ok(previous) => previous,
                    Err(e) => {
                        warn!("failed to bump completion counter: {e}");
                        0
                    }
                };
                let new_achievements = {
                    let ctx = AchievementContext {
                        previous_completions,
                        score: response.test_result.score,
                        total_questions: response.test_result.total_questions,
                        answers: &self.answers,
                        questions: &schedule.questions,
                    };
                    rewards::achievements_unlocked(&ctx, &self.unlocked)
                };
                for achievement in &new_achievements {
                    self.unlocked.insert(achievement.id.to_string());
                }
                if let Err(e) =
                    self.store
                        .save_completion(&self.user_id, &schedule.id, &response.test_result)
                {
                    warn!("failed to write completion marker: {e}");
                }
                self.store.clear_snapshot(&self.user_id);
                self.previous_result = Some(response.test_result.clone());
                self.outcome = Some(SessionOutcome {
                    rank: rewards::rank_for(response.total_points),
                    points_earned: response.points_earned,
                    total_points: response.total_points,
                    new_achievements,
                    result: response.test_result,
                });
                self.phase = Phase::Completed;
            }
            Resolution::PriorResult(result) => {
                // Duplicate submission: the existing result is the outcome.
                // Cumulative points are not part of a stored result, so its
                // own delta stands in for rank display.
                self.store.clear_snapshot(&self.user_id);
                self.previous_result = Some(result.clone());
                self.outcome = Some(SessionOutcome {
                    rank: rewards::rank_for(result.points_earned),
                    points_earned: result.points_earned,
                    total_points: result.points_earned,
                    new_achievements: Vec::new(),
                    result,
                });
                self.phase = Phase::AlreadyCompleted;
            }
            Resolution::PriorResultUnreadable => {
                // The server holds a result it will not re-accept, so the
                // snapshot must not survive to be resubmitted.
                self.store.clear_snapshot(&self.user_id);
                self.previous_result = None;
                self.error = Some(EngineError::CompletedScoreUnavailable);
                self.phase = Phase::AlreadyCompleted;
            }
            Resolution::Failed(e) => {
                // Snapshot kept: answers survive for a retry.
                self.error = Some(EngineError::SubmitFailed(e.to_string()));
                self.phase = Phase::Error;
            }
        }
    }

    // --- leaderboard ---

    /// Fetch standings for the selected filters. Failures set the error
    /// slot but never change phase; standings are auxiliary to the attempt.
    pub async fn load_leaderboard(&mut self) {
        let (Some(subject), Some(week)) = (self.selected_subject.clone(), self.selected_week)
        else {
            return;
        };
        let token = self.begin_leaderboard_fetch();
        let response = self.api.fetch_leaderboard(&subject.id, week).await;
        self.apply_leaderboard_response(&token, response);
    }

    pub fn begin_leaderboard_fetch(&mut self) -> FetchToken {
        self.leaderboard_channel.issue()
    }

    pub fn apply_leaderboard_response(
        &mut self,
        token: &FetchToken,
        response: Result<Vec<LeaderboardEntry>, ApiError>,
    ) -> bool {
        if !self.leaderboard_channel.is_live(token) {
            debug!("dropping superseded leaderboard response");
            return false;
        }
        match response {
            Ok(entries) => {
                self.leaderboard = entries;
                if matches!(self.error, Some(EngineError::LeaderboardFetch(_))) {
                    self.error = None;
                }
            }
            Err(e) => {
                self.error = Some(EngineError::LeaderboardFetch(e.to_string()));
            }
        }
        true
    }

    // --- retry ---

    /// Re-run the operation the current error's retry tag names.
    pub async fn retry(&mut self) {
        match self.error.as_ref().and_then(EngineError::retry_action) {
            Some(RetryAction::Schedule) => self.load_active_schedules().await,
            Some(RetryAction::Tests) => self.load_tests().await,
            Some(RetryAction::Leaderboard) => self.load_leaderboard().await,
            None => {}
        }
    }

    // --- persistence ---

    /// Write the current attempt to disk. Only an in-progress attempt on a
    /// non-empty question set is worth persisting; write failures are
    /// logged and the attempt continues in memory.
    fn persist(&self) {
        if self.phase != Phase::InProgress {
            return;
        }
        let (Some(subject), Some(week), Some(schedule)) = (
            self.selected_subject.as_ref(),
            self.selected_week,
            self.schedule.as_ref(),
        ) else {
            return;
        };
        if schedule.questions.is_empty() {
            return;
        }
        let snapshot = SessionSnapshot {
            schema_version: SNAPSHOT_VERSION,
            selected_subject: subject.clone(),
            selected_week: week,
            schedule: schedule.clone(),
            in_progress: true,
            current_index: self.current_index,
            answers: self.answers.clone(),
            remaining_secs: self.countdown.remaining_secs(),
        };
        if let Err(e) = self.store.save_snapshot(&self.user_id, &snapshot) {
            warn!("failed to persist attempt: {e}");
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }
}
