pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod settings;
pub mod translate;

pub use engine::{Outcome, Plan, UpsertEngine};
pub use error::{SyncError, TranslateError};
pub use orchestrator::{apply_prices, JobReport, Orchestrator, MAX_CONSECUTIVE_CATALOG_FAILURES};
pub use progress::{
    Action, Counters, Detail, ErrorEntry, ErrorKind, JobKind, JobOutcome, Phase, Progress,
    ProgressRecord,
};
pub use settings::JobSettings;
pub use translate::{NoBackend, OpenAiBackend, TranslationBackend, Translator};
