pub mod core;
pub mod handler;
pub mod quiz;
pub mod translate;
pub mod vocab;

pub use crate::{
    core::{
        QuizMode,
        RawRecord,
        VocabItem,
        VocabotError,
    },
    handler::{
        App,
        Callback,
        Command,
        Keyboard,
        Reply,
    },
    quiz::{
        QuizSession,
        QuizSource,
        SessionStore,
        Stage,
    },
    translate::{
        MyMemoryProvider,
        RateLimiter,
        Translator,
    },
    vocab::VocabIndex,
};
