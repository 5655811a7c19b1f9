use std::{
    collections::HashMap,
    sync::Mutex,
};

use rand::{
    seq::SliceRandom,
    Rng,
};

use crate::{
    core::{
        QuizMode,
        VocabotError,
    },
    quiz::engine::{
        self,
        QuizSource,
        MIN_POOL_SIZE,
    },
    vocab::VocabIndex,
};

/// Position of a user's conversation in the quiz flow. Transitions move
/// strictly forward; only cancel/stop/finish jump back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    AwaitingSource,
    AwaitingMode,
    AwaitingCount,
    Active,
}

/// The in-flight question. `correct_id == order[position - 1]` whenever set.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentQuestion {
    pub correct_id: u32,
    pub options: Vec<String>,
    pub correct_index: usize,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_id: u32,
    pub correct_index: usize,
    pub score: usize,
}

/// One user's quiz session. All transitions run under the store lock, so
/// the read-modify-write of `position`/`score` is never interleaved.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    pub stage: Stage,
    pub label: String,
    pub units: Vec<u32>,
    pub pool_ids: Vec<u32>,
    pub mode: Option<QuizMode>,
    /// Shuffled subsequence of `pool_ids`, no duplicates.
    pub order: Vec<u32>,
    /// Next index into `order`; also the count of questions already shown.
    pub position: usize,
    pub score: usize,
    /// Missed item ids in order of occurrence, duplicates allowed.
    pub wrong_ids: Vec<u32>,
    pub current: Option<CurrentQuestion>,
}

impl QuizSession {
    /// Start-quiz entry point: discards anything in progress.
    pub fn begin(&mut self) {
        *self = Self::default();
        self.stage = Stage::AwaitingSource;
    }

    /// Accepts a parsed quiz source. With fewer than three eligible items
    /// the stage does not move, so the user can try another spec.
    pub fn set_source(&mut self, source: QuizSource) -> Result<(), VocabotError> {
        if self.stage != Stage::AwaitingSource {
            return Err(VocabotError::Validation(
                "No quiz is being set up. Send /quiz to start one.".to_string(),
            ));
        }
        if source.pool_ids.len() < MIN_POOL_SIZE {
            return Err(VocabotError::InsufficientPool {
                needed: MIN_POOL_SIZE,
                available: source.pool_ids.len(),
            });
        }

        self.label = source.label;
        self.units = source.units;
        self.pool_ids = source.pool_ids;
        self.stage = Stage::AwaitingMode;
        Ok(())
    }

    /// Records the quiz mode. Returns the pool size for the count prompt.
    pub fn set_mode(&mut self, mode: QuizMode) -> Result<usize, VocabotError> {
        if self.stage != Stage::AwaitingMode || self.pool_ids.is_empty() {
            return Err(VocabotError::Validation(
                "Pick a quiz source first. Send /quiz to start one.".to_string(),
            ));
        }
        self.mode = Some(mode);
        self.stage = Stage::AwaitingCount;
        Ok(self.pool_ids.len())
    }

    /// Builds the question order and enters `Active`. The requested count
    /// is clamped to `[1, pool size]`.
    pub fn start(&mut self, requested: usize, rng: &mut impl Rng) -> Result<usize, VocabotError> {
        if self.stage != Stage::AwaitingCount {
            return Err(VocabotError::Validation(
                "No quiz is being set up. Send /quiz to start one.".to_string(),
            ));
        }

        let total = requested.clamp(1, self.pool_ids.len());
        let mut order = self.pool_ids.clone();
        order.shuffle(rng);
        order.truncate(total);

        self.order = order;
        self.position = 0;
        self.score = 0;
        self.wrong_ids.clear();
        self.current = None;
        self.stage = Stage::Active;
        Ok(total)
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    pub fn finished(&self) -> bool {
        self.position >= self.order.len()
    }

    /// Draws the next question, storing it as current and advancing the
    /// position. `None` means the order is exhausted.
    pub fn next_question(
        &mut self,
        index: &VocabIndex,
        rng: &mut impl Rng,
    ) -> Result<Option<CurrentQuestion>, VocabotError> {
        if self.stage != Stage::Active {
            return Err(VocabotError::Validation("No quiz is running.".to_string()));
        }
        if self.finished() {
            self.current = None;
            return Ok(None);
        }

        let correct_id = self.order[self.position];
        let mode = self.mode.unwrap_or(QuizMode::WordToDefinition);
        let (options, correct_index) =
            engine::build_options(index, correct_id, &self.pool_ids, mode, rng)?;

        let question = CurrentQuestion { correct_id, options, correct_index };
        self.current = Some(question.clone());
        self.position += 1;
        Ok(Some(question))
    }

    /// Scores the submitted answer against the in-flight question. A stale
    /// or duplicate submission (no current question) is a no-op error.
    pub fn apply_answer(&mut self, chosen_index: usize) -> Result<AnswerOutcome, VocabotError> {
        let question = self.current.take().ok_or_else(|| {
            VocabotError::Validation("No quiz question is open. Send /quiz to start.".to_string())
        })?;

        let correct = engine::score_answer(&question, chosen_index);
        if correct {
            self.score += 1;
        } else {
            self.wrong_ids.push(question.correct_id);
        }

        Ok(AnswerOutcome {
            correct,
            correct_id: question.correct_id,
            correct_index: question.correct_index,
            score: self.score,
        })
    }

    /// Back to `Idle`, discarding everything. Used by cancel, stop and
    /// quiz completion.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-user conversation state, keyed by user id. The map lock also
/// serializes concurrent events for the same user.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<u64, QuizSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the user's session, creating an
    /// idle one on first contact.
    pub fn with_session<T>(&self, user_id: u64, f: impl FnOnce(&mut QuizSession) -> T) -> T {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.entry(user_id).or_default();
        f(session)
    }

    pub fn clear(&self, user_id: u64) {
        self.sessions.lock().unwrap().remove(&user_id);
    }

    pub fn snapshot(&self, user_id: u64) -> Option<QuizSession> {
        self.sessions.lock().unwrap().get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use rand::{
        rngs::StdRng,
        SeedableRng,
    };

    use super::*;
    use crate::vocab::record;

    fn index_of(n: usize) -> VocabIndex {
        let records = (0..n)
            .map(|i| record(&format!("word{}", i), 1, &format!("definition {}", i)))
            .collect();
        VocabIndex::from_records(records).unwrap()
    }

    fn configured_session(index: &VocabIndex) -> QuizSession {
        let mut session = QuizSession::default();
        session.begin();
        session.set_source(engine::parse_quiz_source(index, "1")).unwrap();
        session.set_mode(QuizMode::WordToDefinition).unwrap();
        session
    }

    #[test]
    fn test_small_pool_keeps_stage_at_source() {
        let index = index_of(2);
        let mut session = QuizSession::default();
        session.begin();

        let err = session.set_source(engine::parse_quiz_source(&index, "1")).unwrap_err();
        assert!(matches!(err, VocabotError::InsufficientPool { .. }));
        assert_eq!(session.stage, Stage::AwaitingSource);
    }

    #[test]
    fn test_order_is_clamped_and_duplicate_free() {
        let index = index_of(5);
        let mut rng = StdRng::seed_from_u64(11);

        let mut session = configured_session(&index);
        session.start(10, &mut rng).unwrap();
        assert_eq!(session.stage, Stage::Active);
        assert_eq!(session.order.len(), 5);
        let unique = engine::dedup_preserve_order(&session.order);
        assert_eq!(unique.len(), session.order.len());

        let mut session = configured_session(&index);
        session.start(0, &mut rng).unwrap();
        assert_eq!(session.order.len(), 1);
    }

    #[test]
    fn test_question_flow_invariants() {
        let index = index_of(5);
        let mut rng = StdRng::seed_from_u64(23);
        let mut session = configured_session(&index);
        session.start(3, &mut rng).unwrap();

        for expected_position in 1..=3 {
            let question = session.next_question(&index, &mut rng).unwrap().unwrap();
            assert_eq!(session.position, expected_position);
            assert_eq!(question.correct_id, session.order[session.position - 1]);

            let outcome = session.apply_answer(question.correct_index).unwrap();
            assert!(outcome.correct);
            assert!(session.score <= session.position);
        }

        assert!(session.finished());
        assert!(session.next_question(&index, &mut rng).unwrap().is_none());
        assert_eq!(session.score, 3);
        assert!(session.wrong_ids.is_empty());
    }

    #[test]
    fn test_wrong_answer_is_recorded() {
        let index = index_of(5);
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = configured_session(&index);
        session.start(2, &mut rng).unwrap();

        let question = session.next_question(&index, &mut rng).unwrap().unwrap();
        let wrong_choice = (question.correct_index + 1) % 3;
        let outcome = session.apply_answer(wrong_choice).unwrap();
        assert!(!outcome.correct);
        assert_eq!(session.score, 0);
        assert_eq!(session.wrong_ids, vec![question.correct_id]);
    }

    #[test]
    fn test_stale_answer_is_a_noop_error() {
        let index = index_of(5);
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = configured_session(&index);
        session.start(2, &mut rng).unwrap();

        let question = session.next_question(&index, &mut rng).unwrap().unwrap();
        session.apply_answer(question.correct_index).unwrap();

        // second submission for the same question
        let before = session.clone();
        let err = session.apply_answer(0).unwrap_err();
        assert!(matches!(err, VocabotError::Validation(_)));
        assert_eq!(session.score, before.score);
        assert_eq!(session.position, before.position);
        assert_eq!(session.wrong_ids, before.wrong_ids);
    }

    #[test]
    fn test_out_of_order_transitions_are_rejected() {
        let index = index_of(5);
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = QuizSession::default();

        assert!(session.set_mode(QuizMode::WordToDefinition).is_err());
        assert!(session.start(5, &mut rng).is_err());
        assert!(session.next_question(&index, &mut rng).is_err());
        assert_eq!(session.stage, Stage::Idle);
    }

    #[test]
    fn test_store_serializes_and_clears() {
        let store = SessionStore::new();
        store.with_session(42, |session| session.begin());
        assert_eq!(store.snapshot(42).unwrap().stage, Stage::AwaitingSource);

        store.clear(42);
        assert!(store.snapshot(42).is_none());

        // first contact materializes an idle session
        let stage = store.with_session(7, |session| session.stage);
        assert_eq!(stage, Stage::Idle);
    }
}
