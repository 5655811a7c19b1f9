pub mod engine;
pub mod session;

pub use engine::{
    parse_quiz_source,
    parse_units,
    QuizSource,
    MIN_POOL_SIZE,
};
pub use session::{
    QuizSession,
    SessionStore,
    Stage,
};
