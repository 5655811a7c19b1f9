use std::collections::BTreeMap;

use crate::{
    core::{
        QuizMode,
        VocabItem,
        VocabotError,
    },
    quiz::{
        engine,
        session::{
            AnswerOutcome,
            CurrentQuestion,
            QuizSession,
        },
    },
    vocab::{
        pagination::UnitPage,
        VocabIndex,
    },
};

pub const ANSWER_LETTERS: [&str; 3] = ["A", "B", "C"];
/// The end-of-quiz mistake recap shows at most this many entries.
pub const MISTAKE_RECAP_CAP: usize = 30;

pub fn welcome() -> String {
    "I can look up your vocabulary list 📘, translate into Armenian 🇦🇲 and quiz you 🧪\n\n\
     Commands:\n\
     /range 100 141 — words by id\n\
     /unit 4 — words from a unit (add a page: /unit 4 2)\n\
     /find boring — search by word\n\
     /units — list units\n\
     /tr text — translate into Armenian\n\
     /quiz — start a quiz\n\
     /cancel — cancel whatever is going on"
        .to_string()
}

/// Renders a list of vocabulary items as numbered blocks.
pub fn items(items: &[&VocabItem]) -> String {
    let mut blocks = Vec::new();

    for item in items {
        let mut extra = Vec::new();
        if !item.translation.is_empty() {
            extra.push(item.translation.as_str());
        }
        if !item.part_of_speech.is_empty() {
            extra.push(item.part_of_speech.as_str());
        }
        let extra_txt =
            if extra.is_empty() { String::new() } else { format!(" ({})", extra.join(", ")) };

        let mut block = format!("{}. {}{}\n— {}", item.id, item.word, extra_txt, item.definition);
        if !item.example.is_empty() {
            block.push_str(&format!("\n💬 Example: {}", item.example));
        }
        blocks.push(block);
    }

    blocks.join("\n\n")
}

pub fn unit_counts(counts: &BTreeMap<u32, usize>) -> String {
    let lines: Vec<String> =
        counts.iter().map(|(unit, count)| format!("Unit {}: {} words", unit, count)).collect();
    format!("Units:\n{}", lines.join("\n"))
}

pub fn unit_page(page: &UnitPage) -> String {
    let first = page.start + 1;
    let last = page.start + page.items.len();
    format!(
        "📘 Unit {} — page {}/{} (words {}-{} of {})\n\n{}",
        page.unit_no,
        page.page,
        page.max_page,
        first,
        last,
        page.total,
        items(&page.items)
    )
}

pub fn quiz_source_prompt() -> String {
    "Which words should the quiz cover?\n\
     Units: 6  |  1 3  |  1,3  |  1-3,5\n\
     Id range: 140-160  |  140 160  |  from 140 to 160"
        .to_string()
}

pub fn pool_too_small() -> String {
    "Too few words with a definition for a quiz (need at least 3).\n\
     Try:\n\
     • units: 1 3  |  1-3,5\n\
     • id range: 140-160  |  140 160  |  from 140 to 160"
        .to_string()
}

pub fn question(session: &QuizSession, question: &CurrentQuestion, item: &VocabItem) -> String {
    // position already includes this question
    let number = session.position;
    let answered = session.position.saturating_sub(1);

    let header = format!(
        "🧪 Quiz ({}/{}) | Score: {}/{}\n{}\n",
        number,
        session.total(),
        session.score,
        answered,
        session.label
    );

    let prompt = match session.mode.unwrap_or(QuizMode::WordToDefinition) {
        QuizMode::WordToDefinition => format!("\nWord: {}", item.word),
        QuizMode::DefinitionToWord => format!("\nDefinition: {}", item.definition),
    };

    let mut body = prompt;
    for (i, option) in question.options.iter().enumerate() {
        body.push_str(&format!("\n\n{}) {}", ANSWER_LETTERS[i], option));
    }

    format!("{}{}", header, body)
}

/// Verdict line plus the correct pair, so the user sees the card either way.
pub fn answer_feedback(outcome: &AnswerOutcome, mode: QuizMode, item: &VocabItem) -> String {
    let verdict = if outcome.correct {
        "✅ Correct!".to_string()
    } else {
        format!("❌ Wrong. The right answer was {}", ANSWER_LETTERS[outcome.correct_index])
    };

    let pair = match mode {
        QuizMode::WordToDefinition => format!("{} — {}", item.word, item.definition),
        QuizMode::DefinitionToWord => format!("{}\n— {}", item.definition, item.word),
    };

    format!("{}\n{}", verdict, pair)
}

pub fn final_summary(session: &QuizSession, index: &VocabIndex) -> String {
    let mut summary = format!(
        "🏁 Quiz finished!\n{}\n✅ {}/{}",
        session.label,
        session.score,
        session.total()
    );

    if session.wrong_ids.is_empty() {
        summary.push_str("\n\n🔥 No mistakes!");
        return summary;
    }

    let unique = engine::dedup_preserve_order(&session.wrong_ids);
    let lines: Vec<String> = unique
        .iter()
        .take(MISTAKE_RECAP_CAP)
        .filter_map(|id| index.by_id(*id))
        .map(|item| format!("• {} — {}", item.word, item.definition))
        .collect();

    summary.push_str(&format!("\n\n❌ Mistakes ({}):\n{}", unique.len(), lines.join("\n")));
    if unique.len() > MISTAKE_RECAP_CAP {
        summary.push_str(&format!("\n…and more; showing the first {}.", MISTAKE_RECAP_CAP));
    }
    summary
}

pub fn stop_summary(session: &QuizSession) -> String {
    format!(
        "Quiz stopped ✅\n{}\nScore: ✅ {}/{}",
        session.label, session.score, session.position
    )
}

pub fn rate_limited() -> &'static str {
    "⏳ Too fast. Wait 2 seconds 🙂"
}

pub fn translation_failed() -> &'static str {
    "Could not reach the translator 😕 Try again in a bit."
}

/// Converts any core error into a user-facing message. Nothing here is
/// allowed to escape to the transport as a raw error.
pub fn error_message(error: &VocabotError) -> String {
    match error {
        VocabotError::NotFound(message) => message.clone(),
        VocabotError::Validation(message) => message.clone(),
        VocabotError::InsufficientPool { .. } => pool_too_small(),
        VocabotError::RateLimited => rate_limited().to_string(),
        VocabotError::Translation(_) | VocabotError::Reqwest(_) => {
            translation_failed().to_string()
        }
        other => format!("Something went wrong: {}", other),
    }
}
