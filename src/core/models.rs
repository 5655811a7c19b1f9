use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct VocabItem {
    pub id: u32,                // dense, assigned in load order starting at 1
    pub word: String,
    pub unit_no: u32,           // 0 = unassigned
    pub definition: String,
    pub translation: String,
    pub part_of_speech: String,
    pub example: String,
}

impl VocabItem {
    /// A quiz question needs both sides of the card.
    pub fn quiz_eligible(&self) -> bool {
        !self.word.is_empty() && !self.definition.is_empty()
    }
}

/// One raw row as delivered by the vocabulary source.
///
/// Every field is optional; rows without a usable word are dropped when the
/// index is built. The unit number arrives as whatever the source produced
/// (number, numeric string, or garbage) and is coerced with [`RawRecord::unit_no`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub unit_no: Option<serde_json::Value>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl RawRecord {
    pub fn unit_no(&self) -> u32 {
        match &self.unit_no {
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0) as u32,
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuizMode {
    WordToDefinition,
    DefinitionToWord,
}

impl QuizMode {
    /// Wire tokens used in choice callbacks ("quizmode:wd" / "quizmode:dw").
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "wd" => Some(QuizMode::WordToDefinition),
            "dw" => Some(QuizMode::DefinitionToWord),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizMode::WordToDefinition => "wd",
            QuizMode::DefinitionToWord => "dw",
        }
    }
}
