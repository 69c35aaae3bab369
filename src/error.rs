use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading vocabulary data.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary file not found: {0}")]
    MissingFile(String),

    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed vocabulary in {file}: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("vocabulary directory {0} contains no category files")]
    Empty(PathBuf),
}

/// Failures reported by a key-value store implementation.
///
/// Callers in the persistence layer log and swallow these.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Transition errors raised by the quiz state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("not enough unique words available: found {found} but need {needed}")]
    InsufficientVocabulary { found: usize, needed: usize },

    #[error("configuration cannot change while a quiz is running")]
    QuizInProgress,

    #[error("no quiz is running")]
    NotInProgress,

    #[error("the current question has not been answered yet")]
    NotAnswered,

    #[error("no question is available")]
    NoQuestion,

    #[error("option {index} does not exist")]
    NoSuchOption { index: usize },

    #[error("{0:?} is not one of the offered options")]
    UnknownAnswer(String),

    #[error("results are not available until the quiz is complete")]
    NotComplete,
}
