//! The explicitly owned client application state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::ChatSession;
use crate::client::{Generator, StudioApi};
use crate::editor::{
    CaptureBoard, Editor, ExamplesArtifact, ExamplesEditor, SystemPromptArtifact,
    SystemPromptEditor,
};
use crate::error::AppError;
use crate::models::{Category, CategoryFilter};
use crate::preferences::{Preferences, View};

pub struct StudioApp {
    prefs: Preferences,
    prefs_path: PathBuf,
    pub system_prompt: SystemPromptEditor,
    pub examples: ExamplesEditor,
    pub captures: CaptureBoard,
    pub chat: ChatSession,
}

impl StudioApp {
    pub fn new(
        api: Arc<dyn StudioApi>,
        generator: Arc<dyn Generator>,
        prefs_path: PathBuf,
    ) -> Result<Self, AppError> {
        let prefs = Preferences::load(&prefs_path)?;
        Ok(Self {
            prefs,
            prefs_path,
            system_prompt: Editor::new(api.clone(), SystemPromptArtifact),
            examples: Editor::new(api.clone(), ExamplesArtifact),
            captures: CaptureBoard::new(api),
            chat: ChatSession::new(generator),
        })
    }

    /// Load both artifacts and the capture list.
    pub async fn load_all(&mut self) {
        self.system_prompt.load().await;
        self.examples.load().await;
        self.captures.reload().await;
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn select_category(&mut self, category: Category) -> Result<(), AppError> {
        self.prefs.category = category;
        self.prefs.save(&self.prefs_path)
    }

    pub fn set_gallery_filter(&mut self, filter: CategoryFilter) -> Result<(), AppError> {
        self.prefs.gallery_filter = filter;
        self.prefs.save(&self.prefs_path)
    }

    pub fn set_view(&mut self, view: View) -> Result<(), AppError> {
        self.prefs.view = view;
        self.prefs.save(&self.prefs_path)
    }

    /// Generate with the currently selected category.
    pub async fn generate(&self, prompt: &str) -> bool {
        self.chat.generate(prompt, self.prefs.category).await
    }
}
