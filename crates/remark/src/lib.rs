pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;

pub use app::locate::{NoteFilter, NoteLocator};
pub use app::prompt::build_prompt;
pub use domain::errors::ReviewError;
pub use domain::model::{NoteRecord, TargetLanguage};
