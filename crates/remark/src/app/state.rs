//! Explicit application state and the reducer driving it.
//!
//! Front ends feed [`Action`]s into [`update`] and carry out the returned [`Effect`]; the reducer
//! itself never touches the filesystem or the network.

use std::path::PathBuf;

use crate::domain::errors::ReviewError;
use crate::domain::model::TargetLanguage;

pub const WELCOME_TEXT: &str = "Select a folder to start reviewing.";
pub const FOLDER_SELECTED_TEXT: &str = "Folder selected! Ready to review.";

/// Everything the review screen displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub selected_path: Option<PathBuf>,
    pub language: TargetLanguage,
    pub is_loading: bool,
    pub summary_text: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            selected_path: None,
            language: TargetLanguage::default(),
            is_loading: false,
            summary_text: WELCOME_TEXT.to_owned(),
        }
    }
}

impl AppState {
    /// Start from a previously persisted folder and language.
    pub fn restored(selected_path: Option<PathBuf>, language: TargetLanguage) -> Self {
        Self {
            selected_path,
            language,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FolderSelected(PathBuf),
    LanguageChanged(TargetLanguage),
    ReviewRequested,
    ReviewFinished(Result<String, ReviewError>),
}

/// Side effects requested by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Persist {
        selected_path: Option<PathBuf>,
        language: TargetLanguage,
    },
    StartReview {
        root: PathBuf,
        language: TargetLanguage,
    },
}

pub fn update(mut state: AppState, action: Action) -> (AppState, Option<Effect>) {
    match action {
        Action::FolderSelected(path) => {
            state.selected_path = Some(path);
            state.summary_text = FOLDER_SELECTED_TEXT.to_owned();
            let effect = persist(&state);
            (state, Some(effect))
        }
        Action::LanguageChanged(language) => {
            if state.language == language {
                return (state, None);
            }
            state.language = language;
            let effect = persist(&state);
            (state, Some(effect))
        }
        Action::ReviewRequested => {
            if state.is_loading {
                tracing::debug!("review already in flight; ignoring request");
                return (state, None);
            }
            let Some(root) = state.selected_path.clone() else {
                state.summary_text = ReviewError::NoRootPathSelected.to_string();
                return (state, None);
            };
            state.is_loading = true;
            state.summary_text = state.language.loading_message().to_owned();
            let effect = Effect::StartReview {
                root,
                language: state.language,
            };
            (state, Some(effect))
        }
        Action::ReviewFinished(outcome) => {
            state.is_loading = false;
            state.summary_text = match outcome {
                Ok(text) => text,
                Err(err) => err.to_string(),
            };
            (state, None)
        }
    }
}

fn persist(state: &AppState) -> Effect {
    Effect::Persist {
        selected_path: state.selected_path.clone(),
        language: state.language,
    }
}
