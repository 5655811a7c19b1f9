use std::{
    collections::{
        BTreeSet,
        HashSet,
    },
    sync::LazyLock,
};

use rand::{
    seq::{
        IndexedRandom,
        SliceRandom,
    },
    Rng,
};
use regex::Regex;

use crate::{
    core::{
        QuizMode,
        VocabotError,
    },
    quiz::session::CurrentQuestion,
    vocab::VocabIndex,
};

/// A quiz needs one correct answer plus two distractors.
pub const MIN_POOL_SIZE: usize = 3;

/// A `lo-hi` unit token expands into individual unit numbers, so its width
/// is bounded; anything wider is treated as garbage and skipped.
pub const MAX_UNIT_RANGE_SPAN: u32 = 1000;

// Ordered matchers; the first hit wins. Compiled once.
static ID_RANGE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").unwrap(),
        Regex::new(r"^\s*(\d+)\s+(\d+)\s*$").unwrap(),
        Regex::new(r"(?:from|от)\s*(\d+)\s*(?:to|до)\s*(\d+)").unwrap(),
    ]
});

/// Parsed quiz-source specification: a display label, the candidate item
/// ids, and the unit numbers if the source was a unit spec.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSource {
    pub label: String,
    pub pool_ids: Vec<u32>,
    pub units: Vec<u32>,
}

/// Parses the free-text quiz source. Id-range shapes are tried first
/// ("140-160", "140 160", "from 140 to 160"); anything else is read as a
/// unit specification. Only items with both word and definition make it
/// into the pool.
pub fn parse_quiz_source(index: &VocabIndex, text: &str) -> QuizSource {
    let t = text.trim().to_lowercase();

    if let Some((a, b)) = match_id_range(&t) {
        let (a, b) = if a > b { (b, a) } else { (a, b) };
        let pool_ids = index
            .items()
            .iter()
            .filter(|item| item.id >= a && item.id <= b && item.quiz_eligible())
            .map(|item| item.id)
            .collect();
        return QuizSource { label: format!("IDs: {}-{}", a, b), pool_ids, units: Vec::new() };
    }

    let units = parse_units(&t);
    let unit_set: HashSet<u32> = units.iter().copied().collect();
    let pool_ids = index
        .items()
        .iter()
        .filter(|item| unit_set.contains(&item.unit_no) && item.quiz_eligible())
        .map(|item| item.id)
        .collect();

    let label = if units.is_empty() {
        "Units: (none)".to_string()
    } else {
        let list: Vec<String> = units.iter().map(|u| u.to_string()).collect();
        format!("Units: {}", list.join(", "))
    };

    QuizSource { label, pool_ids, units }
}

fn match_id_range(text: &str) -> Option<(u32, u32)> {
    for re in ID_RANGE_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            let a = caps.get(1)?.as_str().parse().ok()?;
            let b = caps.get(2)?.as_str().parse().ok()?;
            return Some((a, b));
        }
    }

    None
}

/// Parses a unit specification: tokens split on comma/semicolon/space,
/// each a bare positive integer or an inclusive `lo-hi` range (swapped if
/// reversed, skipped if wider than `MAX_UNIT_RANGE_SPAN`). Duplicates
/// collapse; output is sorted ascending. Garbage tokens are skipped,
/// never an error.
pub fn parse_units(text: &str) -> Vec<u32> {
    let mut units = BTreeSet::new();

    let tokens = text
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    for token in tokens {
        if let Some((a, b)) = token.split_once('-') {
            if let (Ok(a), Ok(b)) = (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
                let (lo, hi) = if a > b { (b, a) } else { (a, b) };
                if hi - lo >= MAX_UNIT_RANGE_SPAN {
                    continue;
                }
                for u in lo..=hi {
                    if u > 0 {
                        units.insert(u);
                    }
                }
            }
        } else if let Ok(u) = token.parse::<u32>() {
            if u > 0 {
                units.insert(u);
            }
        }
    }

    units.into_iter().collect()
}

/// Builds the three answer options for a question: the correct item's text
/// plus two distinct distractors drawn from the pool. The correct slot is
/// tracked through the shuffle by id, so distractors that happen to render
/// the same text as the answer cannot steal the index.
pub fn build_options(
    index: &VocabIndex,
    correct_id: u32,
    pool_ids: &[u32],
    mode: QuizMode,
    rng: &mut impl Rng,
) -> Result<(Vec<String>, usize), VocabotError> {
    let text_of = |id: u32| -> String {
        index
            .by_id(id)
            .map(|item| match mode {
                QuizMode::WordToDefinition => item.definition.clone(),
                QuizMode::DefinitionToWord => item.word.clone(),
            })
            .unwrap_or_default()
    };

    let others: Vec<u32> = pool_ids.iter().copied().filter(|&id| id != correct_id).collect();
    if others.len() < 2 {
        return Err(VocabotError::InsufficientPool {
            needed: MIN_POOL_SIZE,
            available: others.len() + 1,
        });
    }

    let mut entries: Vec<(u32, String)> =
        others.choose_multiple(rng, 2).map(|&id| (id, text_of(id))).collect();
    entries.push((correct_id, text_of(correct_id)));
    entries.shuffle(rng);

    let correct_index = entries.iter().position(|(id, _)| *id == correct_id).unwrap_or(0);
    let options = entries.into_iter().map(|(_, text)| text).collect();
    Ok((options, correct_index))
}

pub fn score_answer(question: &CurrentQuestion, chosen_index: usize) -> bool {
    chosen_index == question.correct_index
}

/// Removes later duplicates, keeping the first occurrence order.
pub fn dedup_preserve_order(ids: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
