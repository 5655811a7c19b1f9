pub mod errors;
pub mod models;
pub mod utils;

pub use errors::VocabotError;
pub use models::{
    QuizMode,
    RawRecord,
    VocabItem,
};
