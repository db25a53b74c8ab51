//! The review pipeline: locate a note, build its prompt, ask the model.

use std::path::Path;

use anyhow::Result;

use crate::app::locate::{NoteFilter, NoteLocator};
use crate::app::prompt::PromptRenderer;
use crate::domain::errors::ReviewError;
use crate::domain::model::{NoteRecord, TargetLanguage};
use crate::infra::config::Config;
use crate::infra::gemini::{GeminiClient, GeminiConfig, GenerativeClient};

/// Shown when the model answers without any text.
pub const EMPTY_RESPONSE_TEXT: &str = "No Response from Gemini.";

/// A located note together with the prompt rendered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedReview {
    pub note: NoteRecord,
    pub prompt: String,
}

/// Runs the locate → prompt → generate pipeline against a [`GenerativeClient`].
#[derive(Debug, Clone)]
pub struct ReviewService<C> {
    locator: NoteLocator,
    prompts: PromptRenderer,
    client: C,
}

impl ReviewService<GeminiClient> {
    /// Wire the pipeline from configuration, talking to Gemini.
    pub fn from_config(config: &Config) -> Result<Self> {
        let locator = NoteLocator::new(NoteFilter::from_config(&config.notes)?);
        let prompts = PromptRenderer::from_config(config.prompt.template.as_deref())?;
        let client = GeminiClient::new(GeminiConfig::from_config(config));
        Ok(Self::new(locator, prompts, client))
    }
}

impl<C: GenerativeClient> ReviewService<C> {
    pub fn new(locator: NoteLocator, prompts: PromptRenderer, client: C) -> Self {
        Self {
            locator,
            prompts,
            client,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Pick a note under `root` and render its prompt without contacting the model.
    pub fn prepare(
        &self,
        root: &Path,
        language: TargetLanguage,
    ) -> Result<PreparedReview, ReviewError> {
        let note = self
            .locator
            .locate_random_note(root)
            .ok_or(ReviewError::NotFound)?;
        tracing::info!(note = %note.source_path.display(), %language, "picked note for review");
        let prompt = self.prompts.render(&note, language)?;
        Ok(PreparedReview { note, prompt })
    }

    /// Run a full review and return the text to display.
    ///
    /// The model is only contacted once a note has been found and rendered.
    pub async fn review(
        &self,
        root: Option<&Path>,
        language: TargetLanguage,
    ) -> Result<String, ReviewError> {
        let root = root.ok_or(ReviewError::NoRootPathSelected)?;
        let prepared = self.prepare(root, language)?;
        match self.client.generate(&prepared.prompt).await {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Ok(EMPTY_RESPONSE_TEXT.to_owned()),
            Err(err) => {
                tracing::error!(error = %err, "generation failed");
                Err(ReviewError::ExternalCallFailure(err.to_string()))
            }
        }
    }
}
