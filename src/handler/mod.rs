use std::sync::Arc;

use rand::Rng;

use crate::{
    core::{
        utils::{
            chunk_text,
            REPLY_CHUNK_SIZE,
        },
        QuizMode,
        VocabotError,
    },
    quiz::{
        engine,
        session::{
            QuizSession,
            SessionStore,
            Stage,
        },
    },
    translate::{
        RateLimiter,
        TranslationProvider,
        Translator,
    },
    vocab::{
        pagination,
        VocabIndex,
    },
};

pub mod render;

/// A text command, parsed at the transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Units,
    Range(u32, u32),
    Unit { unit: u32, page: usize },
    Find(String),
    Translate(String),
    Quiz,
    Cancel,
}

impl Command {
    /// Parses a slash command. `None` means plain text, which is routed by
    /// the user's current stage instead. Malformed arguments come back as
    /// a `Validation` error carrying the usage example.
    pub fn parse(text: &str) -> Option<Result<Command, VocabotError>> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        Some(match name {
            "/start" => Ok(Command::Start),
            "/units" => Ok(Command::Units),
            "/range" => parse_range_args(rest),
            "/unit" => parse_unit_args(rest),
            "/find" => {
                if rest.is_empty() {
                    Err(VocabotError::Validation("Example: /find boring".to_string()))
                } else {
                    Ok(Command::Find(rest.to_string()))
                }
            }
            "/tr" => {
                if rest.is_empty() {
                    Err(VocabotError::Validation("Example: /tr Hello world".to_string()))
                } else {
                    Ok(Command::Translate(rest.to_string()))
                }
            }
            "/quiz" | "/test" => Ok(Command::Quiz),
            "/cancel" => Ok(Command::Cancel),
            _ => Err(VocabotError::Validation(format!("Unknown command: {}", name))),
        })
    }
}

fn parse_range_args(rest: &str) -> Result<Command, VocabotError> {
    let mut numbers = rest.split_whitespace().map(str::parse::<u32>);
    match (numbers.next(), numbers.next()) {
        (Some(Ok(a)), Some(Ok(b))) => Ok(Command::Range(a, b)),
        _ => Err(VocabotError::Validation("Two numbers needed. Example: /range 100 141".to_string())),
    }
}

fn parse_unit_args(rest: &str) -> Result<Command, VocabotError> {
    let mut parts = rest.split_whitespace();
    let unit = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| {
            VocabotError::Validation("Example: /unit 4  or  /unit 4 2 (page 2)".to_string())
        })?;
    let page = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1);
    Ok(Command::Unit { unit, page })
}

/// A structured choice, parsed from the transport's colon-delimited token.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    PageNav { unit: u32, page: usize },
    ClosePanel,
    ModeChoice(QuizMode),
    AnswerChoice(usize),
    QuizStop,
}

impl Callback {
    pub fn parse(token: &str) -> Result<Callback, VocabotError> {
        if token == "unitpage:close" {
            return Ok(Callback::ClosePanel);
        }
        if token == "quiz:stop" {
            return Ok(Callback::QuizStop);
        }
        if let Some(rest) = token.strip_prefix("unitpage:") {
            if let Some((unit, page)) = rest.split_once(':') {
                if let (Ok(unit), Ok(page)) = (unit.parse(), page.parse()) {
                    return Ok(Callback::PageNav { unit, page });
                }
            }
        }
        if let Some(mode) = token.strip_prefix("quizmode:") {
            if let Some(mode) = QuizMode::parse(mode) {
                return Ok(Callback::ModeChoice(mode));
            }
        }
        if let Some(index) = token.strip_prefix("quizans:") {
            if let Ok(index) = index.parse::<usize>() {
                if index < render::ANSWER_LETTERS.len() {
                    return Ok(Callback::AnswerChoice(index));
                }
            }
        }

        Err(VocabotError::Validation(format!("Unrecognized choice token: {}", token)))
    }
}

/// The fixed button sets a transport may render alongside a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    MainMenu,
    ModeSelect,
    AnswerSelect,
    PageNav { unit: u32, page: usize, max_page: usize },
}

/// A transport-agnostic reply: one or more text chunks (long texts are
/// pre-split at [`REPLY_CHUNK_SIZE`] characters) plus an optional keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub chunks: Vec<String>,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { chunks: chunk_text(&text.into(), REPLY_CHUNK_SIZE), keyboard: None }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self { chunks: chunk_text(&text.into(), REPLY_CHUNK_SIZE), keyboard: Some(keyboard) }
    }

    /// The reply text joined back together, mostly for assertions.
    pub fn joined(&self) -> String {
        self.chunks.join("\n")
    }
}

/// The conversational core: owns the vocabulary index, the per-user
/// sessions and the shared translation gateway. One instance serves all
/// users; handlers are safe to call concurrently.
pub struct App<P> {
    index: Arc<VocabIndex>,
    sessions: SessionStore,
    translator: Translator<P>,
    rate_limiter: RateLimiter,
}

impl<P: TranslationProvider> App<P> {
    pub fn new(index: Arc<VocabIndex>, provider: P) -> Self {
        Self {
            index,
            sessions: SessionStore::new(),
            translator: Translator::new(provider),
            rate_limiter: RateLimiter::default(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn index(&self) -> &VocabIndex {
        &self.index
    }

    /// Current session snapshot, for transports that render stage-aware UI.
    pub fn session(&self, user_id: u64) -> Option<QuizSession> {
        self.sessions.snapshot(user_id)
    }

    pub async fn handle_command(&self, user_id: u64, command: Command) -> Reply {
        match command {
            Command::Start => Reply::with_keyboard(render::welcome(), Keyboard::MainMenu),
            Command::Units => self.units(),
            Command::Range(a, b) => self.range(a, b),
            Command::Unit { unit, page } => self.unit_page(unit, page),
            Command::Find(query) => self.find(&query),
            Command::Translate(text) => self.translate(user_id, &text).await,
            Command::Quiz => self.quiz_begin(user_id),
            Command::Cancel => self.cancel(user_id),
        }
    }

    pub async fn handle_callback(&self, user_id: u64, callback: Callback) -> Reply {
        match callback {
            Callback::PageNav { unit, page } => self.unit_page(unit, page),
            Callback::ClosePanel => Reply::text("Closed."),
            Callback::ModeChoice(mode) => self.quiz_choose_mode(user_id, mode),
            Callback::AnswerChoice(chosen) => self.quiz_answer(user_id, chosen),
            Callback::QuizStop => self.quiz_stop(user_id),
        }
    }

    /// Entry point for free text: slash commands are dispatched, anything
    /// else is routed by the user's current stage.
    pub async fn handle_text(&self, user_id: u64, text: &str) -> Reply {
        if let Some(parsed) = Command::parse(text) {
            return match parsed {
                Ok(command) => self.handle_command(user_id, command).await,
                Err(error) => Reply::text(render::error_message(&error)),
            };
        }

        let stage = self.sessions.with_session(user_id, |session| session.stage);
        match stage {
            Stage::AwaitingSource => self.quiz_set_source(user_id, text),
            Stage::AwaitingMode => Reply::with_keyboard(
                "Pick a quiz mode with the buttons below.",
                Keyboard::ModeSelect,
            ),
            Stage::AwaitingCount => self.quiz_set_count(user_id, text),
            Stage::Active => {
                Reply::with_keyboard("Answer with the A / B / C buttons.", Keyboard::AnswerSelect)
            }
            Stage::Idle => Reply::with_keyboard(render::welcome(), Keyboard::MainMenu),
        }
    }

    fn units(&self) -> Reply {
        let counts = self.index.unit_counts();
        if counts.is_empty() {
            return Reply::text("No units found.");
        }
        Reply::text(render::unit_counts(&counts))
    }

    fn range(&self, a: u32, b: u32) -> Reply {
        let (lo, hi) = self.index.normalize_range(a, b);
        let items = self.index.range(a, b);
        if items.is_empty() {
            return Reply::text("Nothing found.");
        }
        Reply::text(format!("Words {}-{}:\n\n{}", lo, hi, render::items(&items)))
    }

    fn unit_page(&self, unit: u32, page: usize) -> Reply {
        match pagination::page_unit(&self.index, unit, page) {
            Ok(unit_page) => Reply::with_keyboard(
                render::unit_page(&unit_page),
                Keyboard::PageNav {
                    unit,
                    page: unit_page.page,
                    max_page: unit_page.max_page,
                },
            ),
            Err(error) => Reply::text(render::error_message(&error)),
        }
    }

    fn find(&self, query: &str) -> Reply {
        let hits = self.index.search(query);
        if hits.is_empty() {
            return Reply::text("Nothing matched.");
        }
        Reply::text(format!("Found (first {}):\n\n{}", hits.len(), render::items(&hits)))
    }

    async fn translate(&self, user_id: u64, text: &str) -> Reply {
        match self.translate_checked(user_id, text).await {
            Ok(translated) => Reply::text(format!("🇦🇲 {}", translated)),
            Err(error) => {
                if !matches!(error, VocabotError::RateLimited) {
                    eprintln!("Translation failed: {}", error);
                }
                Reply::text(render::error_message(&error))
            }
        }
    }

    async fn translate_checked(&self, user_id: u64, text: &str) -> Result<String, VocabotError> {
        if !self.rate_limiter.allow(user_id) {
            return Err(VocabotError::RateLimited);
        }
        self.translator.translate(text).await
    }

    fn quiz_begin(&self, user_id: u64) -> Reply {
        self.sessions.with_session(user_id, |session| session.begin());
        Reply::text(render::quiz_source_prompt())
    }

    fn cancel(&self, user_id: u64) -> Reply {
        self.sessions.clear(user_id);
        Reply::with_keyboard("Cancelled ✅", Keyboard::MainMenu)
    }

    fn quiz_set_source(&self, user_id: u64, text: &str) -> Reply {
        let source = engine::parse_quiz_source(&self.index, text);
        match self.sessions.with_session(user_id, |session| session.set_source(source)) {
            Ok(()) => Reply::with_keyboard("Pick a quiz mode:", Keyboard::ModeSelect),
            Err(error) => Reply::text(render::error_message(&error)),
        }
    }

    fn quiz_choose_mode(&self, user_id: u64, mode: QuizMode) -> Reply {
        match self.sessions.with_session(user_id, |session| session.set_mode(mode)) {
            Ok(pool_size) => {
                Reply::text(format!("How many questions? (1..{})\nFor example: 10", pool_size))
            }
            Err(error) => Reply::text(render::error_message(&error)),
        }
    }

    fn quiz_set_count(&self, user_id: u64, text: &str) -> Reply {
        let requested: usize = match text.trim().parse() {
            Ok(n) => n,
            Err(_) => return Reply::text("Send a number of questions, e.g. 10."),
        };

        let mut rng = rand::rng();
        let result = self.sessions.with_session(user_id, |session| {
            session.start(requested, &mut rng)?;
            self.question_chunk(session, &mut rng)
        });

        match result {
            Ok(Some(question)) => Reply {
                chunks: vec!["Go! Answer with A / B / C".to_string(), question],
                keyboard: Some(Keyboard::AnswerSelect),
            },
            // start() guarantees at least one question
            Ok(None) => Reply::text(render::error_message(&VocabotError::Custom(
                "quiz order was empty".to_string(),
            ))),
            Err(error) => Reply::text(render::error_message(&error)),
        }
    }

    fn quiz_answer(&self, user_id: u64, chosen: usize) -> Reply {
        let mut rng = rand::rng();
        let result = self.sessions.with_session(user_id, |session| {
            let outcome = session.apply_answer(chosen)?;
            let item = self.index.by_id(outcome.correct_id).ok_or_else(|| {
                VocabotError::NotFound(format!("item {} vanished from the index", outcome.correct_id))
            })?;
            let mode = session.mode.unwrap_or(QuizMode::WordToDefinition);
            let feedback = render::answer_feedback(&outcome, mode, item);

            match self.question_chunk(session, &mut rng)? {
                Some(question) => Ok(Reply {
                    chunks: vec![feedback, question],
                    keyboard: Some(Keyboard::AnswerSelect),
                }),
                None => {
                    let summary = render::final_summary(session, &self.index);
                    session.reset();
                    Ok(Reply { chunks: vec![feedback, summary], keyboard: None })
                }
            }
        });

        match result {
            Ok(reply) => reply,
            Err(error) => Reply::text(render::error_message(&error)),
        }
    }

    fn quiz_stop(&self, user_id: u64) -> Reply {
        let summary = self.sessions.with_session(user_id, |session| {
            let text = render::stop_summary(session);
            session.reset();
            text
        });
        Reply::text(summary)
    }

    /// Emits the next question as rendered text, or `None` when the quiz
    /// order is exhausted.
    fn question_chunk(
        &self,
        session: &mut QuizSession,
        rng: &mut impl Rng,
    ) -> Result<Option<String>, VocabotError> {
        match session.next_question(&self.index, rng)? {
            Some(question) => {
                let item = self.index.by_id(question.correct_id).ok_or_else(|| {
                    VocabotError::NotFound(format!(
                        "item {} vanished from the index",
                        question.correct_id
                    ))
                })?;
                Ok(Some(render::question(session, &question, item)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        translate::SourceLang,
        vocab::record,
    };

    struct FakeProvider;

    impl TranslationProvider for FakeProvider {
        async fn fetch(&self, source: SourceLang, text: &str) -> Result<String, VocabotError> {
            Ok(format!("[{}] {}", source.code(), text))
        }
    }

    fn app_with_unit_of(n: usize) -> App<FakeProvider> {
        let records = (0..n)
            .map(|i| record(&format!("word{}", i), 1, &format!("definition {}", i)))
            .collect();
        let index = Arc::new(VocabIndex::from_records(records).unwrap());
        App::new(index, FakeProvider)
    }

    #[test]
    fn test_command_parsing() {
        assert!(Command::parse("hello").is_none());
        assert_eq!(Command::parse("/start").unwrap().unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/range 100 141").unwrap().unwrap(),
            Command::Range(100, 141)
        );
        assert_eq!(
            Command::parse("/unit 4 2").unwrap().unwrap(),
            Command::Unit { unit: 4, page: 2 }
        );
        assert_eq!(
            Command::parse("/unit 4").unwrap().unwrap(),
            Command::Unit { unit: 4, page: 1 }
        );
        assert_eq!(
            Command::parse("/find boring").unwrap().unwrap(),
            Command::Find("boring".to_string())
        );
        assert_eq!(
            Command::parse("/tr Hello world").unwrap().unwrap(),
            Command::Translate("Hello world".to_string())
        );
        assert_eq!(Command::parse("/test").unwrap().unwrap(), Command::Quiz);

        assert!(Command::parse("/range 100").unwrap().is_err());
        assert!(Command::parse("/unit four").unwrap().is_err());
        assert!(Command::parse("/tr").unwrap().is_err());
        assert!(Command::parse("/bogus").unwrap().is_err());
    }

    #[test]
    fn test_callback_parsing() {
        assert_eq!(
            Callback::parse("unitpage:4:2").unwrap(),
            Callback::PageNav { unit: 4, page: 2 }
        );
        assert_eq!(Callback::parse("unitpage:close").unwrap(), Callback::ClosePanel);
        assert_eq!(
            Callback::parse("quizmode:wd").unwrap(),
            Callback::ModeChoice(QuizMode::WordToDefinition)
        );
        assert_eq!(Callback::parse("quizans:2").unwrap(), Callback::AnswerChoice(2));
        assert_eq!(Callback::parse("quiz:stop").unwrap(), Callback::QuizStop);

        assert!(Callback::parse("quizans:3").is_err());
        assert!(Callback::parse("quizmode:xy").is_err());
        assert!(Callback::parse("unitpage:4").is_err());
        assert!(Callback::parse("whatever").is_err());
    }

    #[tokio::test]
    async fn test_full_quiz_scenario_no_mistakes() {
        let app = app_with_unit_of(5);
        let user = 1;

        app.handle_command(user, Command::Quiz).await;
        assert_eq!(app.session(user).unwrap().stage, Stage::AwaitingSource);

        let reply = app.handle_text(user, "1").await;
        assert_eq!(reply.keyboard, Some(Keyboard::ModeSelect));
        let session = app.session(user).unwrap();
        assert_eq!(session.stage, Stage::AwaitingMode);
        assert_eq!(session.label, "Units: 1");
        assert_eq!(session.pool_ids.len(), 5);

        let reply = app
            .handle_callback(user, Callback::ModeChoice(QuizMode::WordToDefinition))
            .await;
        assert!(reply.joined().contains("How many questions? (1..5)"));

        // over-asking is clamped to the pool size
        let reply = app.handle_text(user, "10").await;
        assert_eq!(reply.keyboard, Some(Keyboard::AnswerSelect));
        assert!(reply.joined().contains("Quiz (1/5)"));
        assert_eq!(app.session(user).unwrap().total(), 5);

        // answer every question correctly, peeking at the open question
        let mut last = reply;
        for _ in 0..5 {
            let question = app.session(user).unwrap().current.unwrap();
            last = app
                .handle_callback(user, Callback::AnswerChoice(question.correct_index))
                .await;
        }

        let text = last.joined();
        assert!(text.contains("✅ 5/5"));
        assert!(text.contains("🔥 No mistakes!"));
        assert_eq!(app.session(user).unwrap().stage, Stage::Idle);
    }

    #[tokio::test]
    async fn test_id_range_source_and_count_clamp_to_one() {
        let app = app_with_unit_of(5);
        let user = 2;

        app.handle_command(user, Command::Quiz).await;
        app.handle_text(user, "1-3").await;
        let session = app.session(user).unwrap();
        assert_eq!(session.label, "IDs: 1-3");
        assert_eq!(session.pool_ids, vec![1, 2, 3]);

        app.handle_callback(user, Callback::ModeChoice(QuizMode::DefinitionToWord)).await;
        let reply = app.handle_text(user, "0").await;
        assert!(reply.joined().contains("Quiz (1/1)"));
        assert_eq!(app.session(user).unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_small_pool_reprompts_in_place() {
        let app = app_with_unit_of(5);
        let user = 3;

        app.handle_command(user, Command::Quiz).await;
        let reply = app.handle_text(user, "1-2").await;
        assert!(reply.joined().contains("Too few words"));
        assert_eq!(app.session(user).unwrap().stage, Stage::AwaitingSource);

        // an unparseable source behaves the same way
        let reply = app.handle_text(user, "gibberish").await;
        assert!(reply.joined().contains("Too few words"));
        assert_eq!(app.session(user).unwrap().stage, Stage::AwaitingSource);
    }

    #[tokio::test]
    async fn test_mistake_is_recapped_and_stop_reports_partial_score() {
        let app = app_with_unit_of(5);
        let user = 4;

        app.handle_command(user, Command::Quiz).await;
        app.handle_text(user, "1").await;
        app.handle_callback(user, Callback::ModeChoice(QuizMode::WordToDefinition)).await;
        app.handle_text(user, "3").await;

        // miss the first question on purpose
        let question = app.session(user).unwrap().current.unwrap();
        let wrong = (question.correct_index + 1) % 3;
        let reply = app.handle_callback(user, Callback::AnswerChoice(wrong)).await;
        assert!(reply.joined().contains("❌ Wrong."));

        let reply = app.handle_callback(user, Callback::QuizStop).await;
        let text = reply.joined();
        assert!(text.contains("Quiz stopped"));
        // one answered wrong, a second question already on screen
        assert!(text.contains("Score: ✅ 0/2"));
        assert_eq!(app.session(user).unwrap().stage, Stage::Idle);
    }

    #[tokio::test]
    async fn test_stale_answer_leaves_session_unchanged() {
        let app = app_with_unit_of(5);
        let user = 5;

        let reply = app.handle_callback(user, Callback::AnswerChoice(0)).await;
        assert!(reply.joined().contains("No quiz question is open"));
        assert_eq!(app.session(user).unwrap().stage, Stage::Idle);
    }

    #[tokio::test]
    async fn test_translate_command_and_rate_limit() {
        let app = app_with_unit_of(5)
            .with_rate_limiter(RateLimiter::new(std::time::Duration::from_secs(60)));
        let user = 6;

        let reply = app
            .handle_command(user, Command::Translate("привет".to_string()))
            .await;
        assert_eq!(reply.joined(), "🇦🇲 [ru] привет");

        let reply = app
            .handle_command(user, Command::Translate("hello".to_string()))
            .await;
        assert_eq!(reply.joined(), render::rate_limited());
        // the denied request never reached the provider or the cache
        assert_eq!(app.translator.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_commands() {
        let app = app_with_unit_of(5);

        let reply = app.handle_command(1, Command::Units).await;
        assert!(reply.joined().contains("Unit 1: 5 words"));

        let reply = app.handle_command(1, Command::Range(2, 4)).await;
        assert!(reply.joined().starts_with("Words 2-4:"));
        assert!(reply.joined().contains("3. word2"));

        let reply = app.handle_command(1, Command::Find("word1".to_string())).await;
        assert!(reply.joined().contains("Found (first 1):"));

        let reply = app.handle_command(1, Command::Unit { unit: 9, page: 1 }).await;
        assert!(reply.joined().contains("Unit 9 not found"));

        let reply = app.handle_command(1, Command::Unit { unit: 1, page: 7 }).await;
        assert!(reply.joined().contains("page 1/1"));
        assert_eq!(
            reply.keyboard,
            Some(Keyboard::PageNav { unit: 1, page: 1, max_page: 1 })
        );
    }

    #[tokio::test]
    async fn test_cancel_from_any_stage() {
        let app = app_with_unit_of(5);
        let user = 7;

        app.handle_command(user, Command::Quiz).await;
        app.handle_text(user, "1").await;
        let reply = app.handle_text(user, "/cancel").await;
        assert!(reply.joined().contains("Cancelled"));
        assert!(app.session(user).is_none());
    }
}
