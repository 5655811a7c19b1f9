use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabotError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Failed to load vocabulary: {0}")]
    Load(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not enough eligible words: need {needed}, have {available}")]
    InsufficientPool { needed: usize, available: usize },

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Too many translation requests")]
    RateLimited,

    #[error("VocabotError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for VocabotError {
    fn from(error: std::io::Error) -> Self {
        VocabotError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for VocabotError {
    fn from(error: reqwest::Error) -> Self {
        VocabotError::Reqwest(Box::new(error))
    }
}
