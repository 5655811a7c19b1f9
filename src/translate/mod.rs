use std::{
    collections::HashMap,
    sync::Mutex,
    time::{
        Duration,
        Instant,
    },
};

use crate::core::VocabotError;

pub mod mymemory;

pub use mymemory::MyMemoryProvider;

/// Reply for empty/whitespace input; returned without touching the cache.
pub const EMPTY_INPUT_PROMPT: &str = "Send me some text to translate 🙂";
/// Cached in place of an empty provider result so a persistently bad input
/// does not hammer the provider.
pub const EMPTY_RESULT_FALLBACK: &str = "Could not translate that 😕";

/// Minimum spacing between accepted translation requests per user.
pub const TR_MIN_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLang {
    En,
    Ru,
    Hy,
}

impl SourceLang {
    pub fn code(&self) -> &'static str {
        match self {
            SourceLang::En => "en",
            SourceLang::Ru => "ru",
            SourceLang::Hy => "hy",
        }
    }
}

/// Detects the source language by code-point blocks: any Armenian
/// character wins, then any Cyrillic, otherwise English.
pub fn detect_source_lang(text: &str) -> SourceLang {
    let t = text.trim();
    if t.chars().any(|c| ('\u{0530}'..='\u{058F}').contains(&c)) {
        return SourceLang::Hy;
    }
    if t.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        return SourceLang::Ru;
    }
    SourceLang::En
}

/// The outbound half of the gateway. Implemented by the MyMemory client
/// and by in-memory fakes in tests.
pub trait TranslationProvider {
    fn fetch(
        &self,
        source: SourceLang,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, VocabotError>> + Send;
}

/// Memoizing proxy to the translation provider. The cache is process-wide,
/// unbounded and append-only; duplicate concurrent misses may both call
/// out, which is fine since the provider is idempotent.
pub struct Translator<P> {
    provider: P,
    cache: Mutex<HashMap<(SourceLang, String), String>>,
}

impl<P: TranslationProvider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, cache: Mutex::new(HashMap::new()) }
    }

    /// Translates `text` into Armenian. Armenian input comes back
    /// unchanged; empty provider results are replaced by a canned fallback
    /// and cached like any other answer. Provider errors propagate and
    /// leave the cache untouched.
    pub async fn translate(&self, text: &str) -> Result<String, VocabotError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(EMPTY_INPUT_PROMPT.to_string());
        }

        let source = detect_source_lang(text);
        if source == SourceLang::Hy {
            return Ok(text.to_string());
        }

        let key = (source, text.to_string());
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }

        let translated = self.provider.fetch(source, text).await?;
        let translated = translated.trim().to_string();
        let result =
            if translated.is_empty() { EMPTY_RESULT_FALLBACK.to_string() } else { translated };

        self.cache.lock().unwrap().insert(key, result.clone());
        Ok(result)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

/// Per-user cooldown on translation requests. The window is measured from
/// the last accepted request; denied attempts do not reset it.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_accepted: Mutex<HashMap<u64, Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_accepted: Mutex::new(HashMap::new()) }
    }

    pub fn allow(&self, user_id: u64) -> bool {
        let mut last = self.last_accepted.lock().unwrap();
        let now = Instant::now();
        if let Some(prev) = last.get(&user_id) {
            if now.duration_since(*prev) < self.min_interval {
                return false;
            }
        }
        last.insert(user_id, now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(TR_MIN_INTERVAL)
    }
}
