//! The test-session state machine.
//!
//! A [`TestSession`] owns one attempt from `initialize_test` (or
//! `resume_test`) to `complete_test`:
//!
//! ```text
//! uninitialized -> active <-> paused
//!                    |
//!                    v
//!                completed   (terminal)
//! ```
//!
//! Timing runs on three cancelable tokio tasks owned by the session: a
//! one-second countdown (test mode with a time limit), a 30-second
//! auto-save, and the one-second practice-mode auto-advance. Background
//! tasks hold only a weak reference, so dropping the last handle stops them.
//! All public methods must be called from within a tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::error::QuizError;
use crate::model::{Question, RawAnswer, SessionState, TestMode, TestResults, UserAnswer, UserProgress};
use crate::scorer::{grade_answer, ScoreResult};
use crate::statistics::session_results;
use crate::timing::now_ms;
use crate::traits::ProgressStore;

/// Countdown resolution.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Period of the unconditional progress snapshot.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before practice mode moves to the next question, so feedback can render.
pub const PRACTICE_ADVANCE_DELAY: Duration = Duration::from_secs(1);

/// Callbacks fired after each state transition. All methods default to no-ops.
///
/// Callbacks run after the session lock is released, so an observer may call
/// back into the session.
pub trait SessionObserver: Send + Sync {
    fn on_state_change(&self, _state: &SessionState) {}
    fn on_question_change(&self, _index: usize, _question: &Question) {}
    fn on_answer_submit(&self, _answer: &UserAnswer) {}
    fn on_time_update(&self, _time_remaining: u64) {}
    fn on_test_complete(&self, _results: &TestResults) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

#[derive(Default)]
struct Timers {
    countdown: Option<JoinHandle<()>>,
    autosave: Option<JoinHandle<()>>,
    advance: Option<JoinHandle<()>>,
}

impl Timers {
    /// Abort every scheduled task. Handles are taken, so each is aborted once.
    fn cancel_all(&mut self) {
        for handle in [
            self.countdown.take(),
            self.autosave.take(),
            self.advance.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }

    fn is_idle(&self) -> bool {
        [&self.countdown, &self.autosave, &self.advance]
            .iter()
            .all(|h| h.as_ref().map_or(true, |h| h.is_finished()))
    }
}

#[derive(Default)]
struct Inner {
    state: Option<SessionState>,
    results: Option<TestResults>,
    timers: Timers,
}

struct Shared {
    inner: Mutex<Inner>,
    store: Arc<dyn ProgressStore>,
    observer: Arc<dyn SessionObserver>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        inner.timers.cancel_all();
    }
}

/// Handle to one test session. Clones share the same session.
#[derive(Clone)]
pub struct TestSession {
    shared: Arc<Shared>,
}

impl TestSession {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self::with_observer(store, Arc::new(NoopObserver))
    }

    pub fn with_observer(store: Arc<dyn ProgressStore>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                store,
                observer,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    /// Best-effort progress write; failures are logged, never surfaced.
    fn persist(&self, progress: &UserProgress) {
        if let Err(e) = self.shared.store.save_progress(progress) {
            tracing::warn!(test_id = %progress.test_id, "failed to save progress: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a fresh attempt, tearing down any previous one first.
    ///
    /// The countdown only runs in [`TestMode::Test`] with a `time_limit_secs`.
    pub fn initialize_test(
        &self,
        test_type: &str,
        mode: TestMode,
        questions: Vec<Question>,
        time_limit_secs: Option<u64>,
    ) {
        let (snapshot, progress) = {
            let mut inner = self.lock();
            inner.timers.cancel_all();

            let start_time = now_ms();
            let time_remaining = match mode {
                TestMode::Test => time_limit_secs,
                TestMode::Practice => None,
            };
            let state = SessionState {
                test_id: format!("{test_type}_{mode}_{start_time}"),
                test_type: test_type.to_string(),
                mode,
                questions,
                current_question_index: 0,
                answers: Default::default(),
                start_time,
                end_time: None,
                time_remaining,
                is_completed: false,
                is_paused: false,
            };

            if time_remaining.is_some() {
                inner.timers.countdown = Some(spawn_countdown(self.weak()));
            }
            inner.timers.autosave = Some(spawn_autosave(self.weak()));
            inner.results = None;

            tracing::debug!(
                test_id = %state.test_id,
                questions = state.questions.len(),
                "test initialized"
            );
            let progress = state.to_progress();
            inner.state = Some(state.clone());
            (state, progress)
        };

        self.persist(&progress);
        self.shared.observer.on_state_change(&snapshot);
    }

    /// Rebuild the session from a saved progress record, or from the store
    /// when `saved` is `None`.
    ///
    /// The record carries no question bodies; supply them with
    /// [`TestSession::attach_questions`].
    pub fn resume_test(&self, saved: Option<UserProgress>) -> Result<(), QuizError> {
        let progress = match saved {
            Some(p) => p,
            None => self
                .shared
                .store
                .get_progress()
                .ok_or(QuizError::NoSavedProgress)?,
        };

        let snapshot = {
            let mut inner = self.lock();
            inner.timers.cancel_all();

            let state = SessionState {
                test_id: progress.test_id,
                test_type: progress.test_type,
                mode: progress.mode,
                questions: Vec::new(),
                current_question_index: progress.current_question_index,
                answers: progress.answers,
                start_time: progress.start_time,
                end_time: None,
                time_remaining: progress.time_remaining,
                is_completed: progress.is_completed,
                is_paused: false,
            };

            if !state.is_completed {
                if state.mode == TestMode::Test && state.time_remaining.is_some() {
                    inner.timers.countdown = Some(spawn_countdown(self.weak()));
                }
                inner.timers.autosave = Some(spawn_autosave(self.weak()));
            }
            inner.results = None;

            tracing::debug!(test_id = %state.test_id, "test resumed");
            inner.state = Some(state.clone());
            state
        };

        self.shared.observer.on_state_change(&snapshot);
        Ok(())
    }

    /// Provide question bodies for a resumed session. An out-of-range saved
    /// index is clamped to the last question.
    pub fn attach_questions(&self, questions: Vec<Question>) -> Result<(), QuizError> {
        let snapshot = {
            let mut inner = self.lock();
            let state = inner.state.as_mut().ok_or(QuizError::NotInitialized)?;
            if !questions.is_empty() && state.current_question_index >= questions.len() {
                tracing::warn!(
                    index = state.current_question_index,
                    len = questions.len(),
                    "saved question index out of range, clamping"
                );
                state.current_question_index = questions.len() - 1;
            }
            state.questions = questions;
            state.clone()
        };
        self.shared.observer.on_state_change(&snapshot);
        Ok(())
    }

    /// Finish the attempt: stop all timers, aggregate results, append them to
    /// history and clear the saved progress.
    ///
    /// Calling it again on a completed session returns the same results
    /// without touching history. A session resumed from a record that was
    /// already completed elsewhere gets its snapshot built and cached, but
    /// history is left alone since that record was recorded when it completed.
    pub fn complete_test(&self) -> Result<TestResults, QuizError> {
        let (results, already_recorded) = {
            let mut inner = self.lock();
            if let Some(results) = &inner.results {
                return Ok(results.clone());
            }
            let state = inner.state.as_mut().ok_or(QuizError::NotInitialized)?;
            let already_recorded = state.is_completed;
            let end_time = state.end_time.unwrap_or_else(now_ms);
            state.is_completed = true;
            state.is_paused = false;
            state.end_time = Some(end_time);
            let results = session_results(state, end_time);

            inner.timers.cancel_all();
            inner.results = Some(results.clone());
            (results, already_recorded)
        };

        if already_recorded {
            tracing::debug!(test_id = %results.test_id, "test was already completed");
        } else {
            tracing::info!(
                test_id = %results.test_id,
                correct = results.correct_answers,
                total = results.total_questions,
                accuracy = results.accuracy,
                "test completed"
            );
            if let Err(e) = self.shared.store.add_result(&results) {
                tracing::warn!(test_id = %results.test_id, "failed to record result: {e}");
            }
        }
        if let Err(e) = self.shared.store.clear_progress() {
            tracing::warn!(test_id = %results.test_id, "failed to clear progress: {e}");
        }

        self.shared.observer.on_test_complete(&results);
        Ok(results)
    }

    /// Cancel every scheduled task. The owner must call this (or drop every
    /// handle) when the UI context goes away.
    pub fn cleanup(&self) {
        self.lock().timers.cancel_all();
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn go_to_question(&self, index: usize) -> Result<(), QuizError> {
        self.navigate(index, None).map(|_| ())
    }

    /// No-op on the last question.
    pub fn next_question(&self) -> Result<(), QuizError> {
        let (index, len) = self.position()?;
        if index + 1 >= len {
            return Ok(());
        }
        self.go_to_question(index + 1)
    }

    /// No-op on the first question.
    pub fn previous_question(&self) -> Result<(), QuizError> {
        let (index, _) = self.position()?;
        if index == 0 {
            return Ok(());
        }
        self.go_to_question(index - 1)
    }

    fn position(&self) -> Result<(usize, usize), QuizError> {
        let inner = self.lock();
        let state = inner.state.as_ref().ok_or(QuizError::NotInitialized)?;
        Ok((state.current_question_index, state.questions.len()))
    }

    /// Move to `index`. With `expect_from`, the move only happens if the
    /// session is still on that question and not completed; returns whether
    /// it moved.
    fn navigate(&self, index: usize, expect_from: Option<usize>) -> Result<bool, QuizError> {
        let (question, progress) = {
            let mut inner = self.lock();
            let state = inner.state.as_mut().ok_or(QuizError::NotInitialized)?;
            if let Some(from) = expect_from {
                if state.is_completed || state.current_question_index != from {
                    return Ok(false);
                }
            }
            let len = state.questions.len();
            if index >= len {
                return Err(QuizError::InvalidIndex { index, len });
            }
            state.current_question_index = index;
            let progress = (!state.is_completed).then(|| state.to_progress());
            (state.questions[index].clone(), progress)
        };

        if let Some(progress) = progress {
            self.persist(&progress);
        }
        self.shared.observer.on_question_change(index, &question);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Answers
    // -----------------------------------------------------------------------

    /// Record an answer for the question currently displayed.
    ///
    /// The answer is keyed by the current question's id regardless of its own
    /// `question_id`, and stamped with the current time. Ignored (returns
    /// `false`) before initialization or after completion. In practice mode
    /// this schedules a move to the next question after
    /// [`PRACTICE_ADVANCE_DELAY`].
    pub fn submit_answer(&self, mut answer: UserAnswer) -> bool {
        let progress = {
            let mut inner = self.lock();
            let Some(state) = inner.state.as_mut() else {
                return false;
            };
            if state.is_completed {
                return false;
            }
            let Some(question) = state.current_question() else {
                return false;
            };

            if answer.question_id != question.id {
                tracing::debug!(
                    submitted = %answer.question_id,
                    current = %question.id,
                    "answer re-keyed to the displayed question"
                );
            }
            answer.question_id = question.id.clone();
            answer.timestamp = now_ms();
            state.answers.insert(answer.question_id.clone(), answer.clone());

            let from = state.current_question_index;
            let progress = state.to_progress();
            if state.mode == TestMode::Practice {
                if let Some(pending) = inner.timers.advance.take() {
                    pending.abort();
                }
                inner.timers.advance = Some(spawn_advance(self.weak(), from));
            }
            progress
        };

        self.persist(&progress);
        self.shared.observer.on_answer_submit(&answer);
        true
    }

    /// Grade `raw` against the displayed question and record it.
    ///
    /// Returns the score, or `None` when the session is not accepting answers.
    pub fn answer_current(&self, raw: RawAnswer, answer_start_time: i64) -> Option<ScoreResult> {
        let question = {
            let inner = self.lock();
            let state = inner.state.as_ref()?;
            if state.is_completed {
                return None;
            }
            state.current_question()?.clone()
        };
        let (answer, result) = grade_answer(&question, raw, answer_start_time);
        self.submit_answer(answer).then_some(result)
    }

    // -----------------------------------------------------------------------
    // Pause
    // -----------------------------------------------------------------------

    /// Freeze the countdown. The tick task keeps running but does nothing.
    pub fn pause_test(&self) -> Result<(), QuizError> {
        self.set_paused(true)
    }

    pub fn resume_timer(&self) -> Result<(), QuizError> {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> Result<(), QuizError> {
        let snapshot = {
            let mut inner = self.lock();
            let state = inner.state.as_mut().ok_or(QuizError::NotInitialized)?;
            if state.is_completed || state.is_paused == paused {
                return Ok(());
            }
            state.is_paused = paused;
            state.clone()
        };
        tracing::debug!(test_id = %snapshot.test_id, paused, "pause state changed");
        self.shared.observer.on_state_change(&snapshot);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scheduled work
    // -----------------------------------------------------------------------

    fn tick(&self) {
        let (remaining, expired) = {
            let mut inner = self.lock();
            let Some(state) = inner.state.as_mut() else {
                return;
            };
            if state.is_completed || state.is_paused {
                return;
            }
            let Some(remaining) = state.time_remaining else {
                return;
            };
            let remaining = remaining.saturating_sub(1);
            state.time_remaining = Some(remaining);
            (remaining, remaining == 0)
        };

        self.shared.observer.on_time_update(remaining);

        if expired {
            tracing::info!("time limit reached, submitting test");
            if let Err(e) = self.complete_test() {
                tracing::warn!("automatic submission failed: {e}");
            }
        }
    }

    /// Write the current progress now. Does nothing once completed.
    pub fn save_progress(&self) {
        let progress = {
            let inner = self.lock();
            match inner.state.as_ref() {
                Some(state) if !state.is_completed => state.to_progress(),
                _ => return,
            }
        };
        tracing::debug!(test_id = %progress.test_id, "saving progress");
        self.persist(&progress);
    }

    fn advance_from(&self, from: usize) {
        let Ok((_, len)) = self.position() else {
            return;
        };
        if from + 1 >= len {
            return;
        }
        if let Err(e) = self.navigate(from + 1, Some(from)) {
            tracing::warn!("auto-advance failed: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.lock().state.is_some()
    }

    /// Snapshot of the live state.
    pub fn state(&self) -> Option<SessionState> {
        self.lock().state.clone()
    }

    pub fn current_question(&self) -> Option<Question> {
        self.lock()
            .state
            .as_ref()
            .and_then(|s| s.current_question().cloned())
    }

    pub fn progress(&self) -> Option<UserProgress> {
        self.lock().state.as_ref().map(SessionState::to_progress)
    }

    /// Results of the completed attempt, if any.
    pub fn results(&self) -> Option<TestResults> {
        self.lock().results.clone()
    }

    /// `true` when no scheduled task is pending.
    pub fn timers_idle(&self) -> bool {
        self.lock().timers.is_idle()
    }
}

fn spawn_countdown(session: Weak<Shared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        loop {
            ticks.tick().await;
            let Some(shared) = session.upgrade() else {
                break;
            };
            TestSession { shared }.tick();
        }
    })
}

fn spawn_autosave(session: Weak<Shared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + AUTOSAVE_INTERVAL, AUTOSAVE_INTERVAL);
        loop {
            ticks.tick().await;
            let Some(shared) = session.upgrade() else {
                break;
            };
            TestSession { shared }.save_progress();
        }
    })
}

fn spawn_advance(session: Weak<Shared>, from: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(PRACTICE_ADVANCE_DELAY).await;
        if let Some(shared) = session.upgrade() {
            TestSession { shared }.advance_from(from);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::Difficulty;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl SessionObserver for Recorder {
        fn on_state_change(&self, _: &SessionState) {
            self.push("state".into());
        }
        fn on_question_change(&self, index: usize, _: &Question) {
            self.push(format!("question:{index}"));
        }
        fn on_answer_submit(&self, answer: &UserAnswer) {
            self.push(format!("answer:{}", answer.question_id));
        }
        fn on_time_update(&self, remaining: u64) {
            self.push(format!("time:{remaining}"));
        }
        fn on_test_complete(&self, _: &TestResults) {
            self.push("complete".into());
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::multiple_choice(
                    format!("q{i}"),
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    1,
                    if i % 2 == 0 { "even" } else { "odd" },
                    Difficulty::Medium,
                )
            })
            .collect()
    }

    fn answer(id: &str, correct: bool) -> UserAnswer {
        UserAnswer {
            question_id: id.into(),
            user_answer: RawAnswer::Number(1.0),
            is_correct: correct,
            time_spent: 2,
            timestamp: 0,
        }
    }

    fn session() -> (Arc<MemoryStore>, Arc<Recorder>, TestSession) {
        let store = Arc::new(MemoryStore::new());
        let recorder = Arc::new(Recorder::default());
        let session = TestSession::with_observer(store.clone(), recorder.clone());
        (store, recorder, session)
    }

    #[tokio::test]
    async fn operations_before_setup_fail_or_noop() {
        let (_, _, s) = session();
        assert!(matches!(s.go_to_question(0), Err(QuizError::NotInitialized)));
        assert!(matches!(s.next_question(), Err(QuizError::NotInitialized)));
        assert!(matches!(s.complete_test(), Err(QuizError::NotInitialized)));
        assert!(!s.submit_answer(answer("q0", true)));
    }

    #[tokio::test]
    async fn initialize_persists_and_notifies() {
        let (store, recorder, s) = session();
        s.initialize_test("physics", TestMode::Test, questions(3), None);

        let state = s.state().unwrap();
        assert!(state.test_id.starts_with("physics_test_"));
        assert_eq!(state.time_remaining, None);
        assert_eq!(store.get_progress().unwrap().test_id, state.test_id);
        assert_eq!(recorder.events(), vec!["state"]);
        s.cleanup();
    }

    #[tokio::test]
    async fn navigation_stays_in_bounds() {
        let (store, _, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(3), None);

        s.previous_question().unwrap();
        assert_eq!(s.state().unwrap().current_question_index, 0);

        s.go_to_question(2).unwrap();
        s.next_question().unwrap();
        assert_eq!(s.state().unwrap().current_question_index, 2);
        assert_eq!(store.get_progress().unwrap().current_question_index, 2);

        let err = s.go_to_question(3).unwrap_err();
        assert!(matches!(err, QuizError::InvalidIndex { index: 3, len: 3 }));
        s.cleanup();
    }

    #[tokio::test]
    async fn answers_are_keyed_by_displayed_question() {
        let (_, recorder, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(2), None);
        s.go_to_question(1).unwrap();

        assert!(s.submit_answer(answer("q0", true)));
        let state = s.state().unwrap();
        assert!(state.answers.contains_key("q1"));
        assert!(!state.answers.contains_key("q0"));
        assert!(state.answers["q1"].timestamp > 0);
        assert!(recorder.events().contains(&"answer:q1".to_string()));
        s.cleanup();
    }

    #[tokio::test]
    async fn completion_aggregates_and_clears_progress() {
        let (store, _, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(3), None);
        s.submit_answer(answer("q0", true));
        s.next_question().unwrap();
        s.submit_answer(answer("q1", false));

        let results = s.complete_test().unwrap();
        assert_eq!(results.total_questions, 3);
        assert_eq!(results.correct_answers, 1);
        assert_eq!(results.incorrect_answers, 1);
        assert_eq!(results.accuracy, 33.33);
        assert!(results.metadata.is_some());

        assert!(store.get_progress().is_none());
        assert_eq!(store.get_history().len(), 1);
        assert!(s.timers_idle());

        // Completed is terminal.
        assert!(!s.submit_answer(answer("q2", true)));
        assert_eq!(s.state().unwrap().answers.len(), 2);
        assert!(s.state().unwrap().is_completed);

        // A second call returns the same snapshot without a second history entry.
        assert_eq!(s.complete_test().unwrap(), results);
        assert_eq!(store.get_history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_submits_on_timeout() {
        let (store, recorder, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(2), Some(3));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(s.state().unwrap().time_remaining, Some(2));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = s.state().unwrap();
        assert!(state.is_completed);
        assert_eq!(state.time_remaining, Some(0));
        assert_eq!(store.get_history().len(), 1);

        let events = recorder.events();
        assert!(events.contains(&"time:2".to_string()));
        assert!(events.contains(&"time:0".to_string()));
        assert_eq!(events.last().unwrap(), "complete");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_time() {
        let (_, _, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(2), Some(10));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(s.state().unwrap().time_remaining, Some(8));

        s.pause_test().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(s.state().unwrap().time_remaining, Some(8));

        s.resume_timer().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(s.state().unwrap().time_remaining, Some(7));
        s.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn practice_mode_auto_advances() {
        let (_, _, s) = session();
        s.initialize_test("quiz", TestMode::Practice, questions(2), Some(60));
        assert_eq!(s.state().unwrap().time_remaining, None);

        let result = s.answer_current(RawAnswer::Number(1.0), now_ms()).unwrap();
        assert!(result.is_correct);
        assert_eq!(s.state().unwrap().current_question_index, 0);

        tokio::time::sleep(PRACTICE_ADVANCE_DELAY + Duration::from_millis(100)).await;
        assert_eq!(s.state().unwrap().current_question_index, 1);
        s.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn stale_advance_is_ignored_after_navigation() {
        let (_, _, s) = session();
        s.initialize_test("quiz", TestMode::Practice, questions(3), None);

        s.submit_answer(answer("q0", true));
        s.go_to_question(2).unwrap();
        s.previous_question().unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        // Scheduled from q0; the user moved away, so it must not fire.
        assert_eq!(s.state().unwrap().current_question_index, 1);
        s.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_runs_every_thirty_seconds() {
        let (store, _, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(2), None);
        let after_init = store.progress_saves();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.progress_saves(), after_init + 2);

        s.cleanup();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.progress_saves(), after_init + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_store_does_not_break_session() {
        let (store, _, s) = session();
        store.set_full(true);
        s.initialize_test("quiz", TestMode::Test, questions(2), Some(5));
        assert!(s.submit_answer(answer("q0", true)));

        tokio::time::sleep(Duration::from_secs(31)).await;
        let state = s.state().unwrap();
        assert!(state.is_completed);
        assert_eq!(state.answers.len(), 1);
        assert!(store.get_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_restores_saved_progress() {
        let store = Arc::new(MemoryStore::new());
        let first = TestSession::new(store.clone());
        first.initialize_test("quiz", TestMode::Test, questions(3), Some(100));
        first.go_to_question(2).unwrap();
        first.submit_answer(answer("q2", true));
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        first.save_progress();
        first.cleanup();

        let second = TestSession::new(store.clone());
        second.resume_test(None).unwrap();
        let state = second.state().unwrap();
        assert_eq!(state.current_question_index, 2);
        assert_eq!(state.time_remaining, Some(96));
        assert!(state.questions.is_empty());
        assert!(state.answers.contains_key("q2"));

        second.attach_questions(questions(3)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(second.state().unwrap().time_remaining, Some(95));
        second.cleanup();
    }

    #[tokio::test]
    async fn resume_without_progress_fails() {
        let (_, _, s) = session();
        assert!(matches!(s.resume_test(None), Err(QuizError::NoSavedProgress)));
    }

    #[tokio::test]
    async fn reinitialize_discards_previous_attempt() {
        let (_, _, s) = session();
        s.initialize_test("quiz", TestMode::Test, questions(2), None);
        s.submit_answer(answer("q0", true));
        s.complete_test().unwrap();

        s.initialize_test("quiz", TestMode::Practice, questions(2), None);
        let state = s.state().unwrap();
        assert!(!state.is_completed);
        assert!(state.answers.is_empty());
        assert!(s.results().is_none());
        s.cleanup();
    }

    fn saved_progress(completed: bool) -> UserProgress {
        UserProgress {
            test_id: "quiz_test_42".into(),
            test_type: "quiz".into(),
            mode: TestMode::Test,
            start_time: now_ms() - 5_000,
            current_question_index: 1,
            answers: [answer("q0", true), answer("q1", false)]
                .into_iter()
                .map(|a| (a.question_id.clone(), a))
                .collect(),
            time_remaining: Some(30),
            is_completed: completed,
        }
    }

    #[tokio::test]
    async fn completing_before_questions_are_attached_keeps_answers() {
        let (store, _, s) = session();
        s.resume_test(Some(saved_progress(false))).unwrap();

        let results = s.complete_test().unwrap();
        assert_eq!(results.correct_answers, 1);
        assert_eq!(results.incorrect_answers, 1);
        assert_eq!(results.answers.len(), 2);
        assert_eq!(store.get_history()[0].correct_answers, 1);
    }

    #[tokio::test]
    async fn resumed_completed_record_is_not_recorded_twice() {
        let (store, _, s) = session();
        let progress = saved_progress(true);
        store.save_progress(&progress).unwrap();
        let first = crate::statistics::progress_results(&progress, 2, now_ms());
        store.add_result(&first).unwrap();

        s.resume_test(None).unwrap();
        assert!(s.state().unwrap().is_completed);
        assert!(s.timers_idle());

        let results = s.complete_test().unwrap();
        assert_eq!(results.test_id, "quiz_test_42");
        assert_eq!(store.get_history().len(), 1);
        assert_eq!(s.complete_test().unwrap(), results);
        assert_eq!(store.get_history().len(), 1);
    }
}
