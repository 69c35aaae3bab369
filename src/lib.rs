// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod persistence;
pub mod question;
pub mod quiz;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod ui;
pub mod validation;
pub mod variant;
pub mod vocabulary;

pub use error::{QuizError, StorageError, VocabularyError};
pub use quiz::{Phase, QuizSession};
