//! Client-side editing controllers for the studio artifacts.
//!
//! [`Editor`] drives the load / edit / save cycle of a single artifact.
//! [`CaptureBoard`] owns the capture list and image ingestion.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::client::StudioApi;
use crate::error::AppError;
use crate::models::{Capture, Category, FewShotExample, PendingImage};

/// How long "Saved" stays up for the text artifacts.
pub const SAVED_STATUS_TTL: Duration = Duration::from_secs(3);
/// How long capture confirmations stay up.
pub const CAPTURE_STATUS_TTL: Duration = Duration::from_secs(2);

const URL_CAPTURE_STEM: &str = "url-capture";

// ============================================================================
// Status
// ============================================================================

/// An inline status line. Transient ones disappear at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
    pub expires_at: Option<Instant>,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
            expires_at: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
            expires_at: None,
        }
    }

    pub fn transient(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            is_error: false,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// The server's own error text when it sent one, otherwise `fallback`.
fn rejection_text(err: &AppError, fallback: &str) -> String {
    match err {
        AppError::Rejected { message, .. } if !message.is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// One editable artifact and how it travels over the API.
#[async_trait]
pub trait Artifact: Send + Sync {
    type Value: Clone + PartialEq + Default + Send + Sync;

    /// Used in "Failed to load …".
    fn label(&self) -> &'static str;
    async fn fetch(&self, api: &dyn StudioApi) -> Result<Self::Value, AppError>;
    async fn store(&self, api: &dyn StudioApi, value: &Self::Value) -> Result<(), AppError>;
}

pub struct SystemPromptArtifact;

#[async_trait]
impl Artifact for SystemPromptArtifact {
    type Value = String;

    fn label(&self) -> &'static str {
        "system prompt"
    }

    async fn fetch(&self, api: &dyn StudioApi) -> Result<String, AppError> {
        api.system_prompt().await
    }

    async fn store(&self, api: &dyn StudioApi, value: &String) -> Result<(), AppError> {
        api.save_system_prompt(value).await
    }
}

pub struct ExamplesArtifact;

#[async_trait]
impl Artifact for ExamplesArtifact {
    type Value = Vec<FewShotExample>;

    fn label(&self) -> &'static str {
        "examples"
    }

    async fn fetch(&self, api: &dyn StudioApi) -> Result<Vec<FewShotExample>, AppError> {
        api.examples().await
    }

    async fn store(&self, api: &dyn StudioApi, value: &Vec<FewShotExample>) -> Result<(), AppError> {
        api.save_examples(value).await
    }
}

// ============================================================================
// Editor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Loading,
    Clean,
    Dirty,
    Saving,
}

pub struct Editor<A: Artifact> {
    api: Arc<dyn StudioApi>,
    artifact: A,
    state: EditorState,
    current: A::Value,
    snapshot: A::Value,
    status: Option<Status>,
    /// Set while the last load failed; the empty value must not replace what is on disk.
    load_failed: bool,
}

pub type SystemPromptEditor = Editor<SystemPromptArtifact>;
pub type ExamplesEditor = Editor<ExamplesArtifact>;

impl<A: Artifact> Editor<A> {
    /// A fresh editor starts in `Loading`; call [`load`](Self::load) to populate it.
    pub fn new(api: Arc<dyn StudioApi>, artifact: A) -> Self {
        Self {
            api,
            artifact,
            state: EditorState::Loading,
            current: A::Value::default(),
            snapshot: A::Value::default(),
            status: None,
            load_failed: false,
        }
    }

    pub async fn load(&mut self) {
        self.state = EditorState::Loading;
        match self.artifact.fetch(self.api.as_ref()).await {
            Ok(value) => {
                self.snapshot = value.clone();
                self.current = value;
                self.status = None;
                self.load_failed = false;
            }
            Err(e) => {
                tracing::warn!(artifact = self.artifact.label(), error = %e, "Load failed");
                self.snapshot = A::Value::default();
                self.current = A::Value::default();
                self.load_failed = true;
                self.status = Some(Status::error(format!(
                    "Failed to load {}",
                    self.artifact.label()
                )));
            }
        }
        self.state = EditorState::Clean;
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn value(&self) -> &A::Value {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.state == EditorState::Dirty
    }

    pub fn status_at(&self, now: Instant) -> Option<&Status> {
        self.status.as_ref().filter(|s| s.is_visible_at(now))
    }

    pub fn set(&mut self, value: A::Value) {
        self.current = value;
        self.refresh_dirty();
    }

    pub fn edit(&mut self, f: impl FnOnce(&mut A::Value)) {
        f(&mut self.current);
        self.refresh_dirty();
    }

    pub fn discard(&mut self) {
        self.current = self.snapshot.clone();
        self.state = EditorState::Clean;
    }

    /// Persist the current value. Returns false when there was nothing to save,
    /// the last load failed, or the save failed.
    pub async fn save(&mut self) -> bool {
        if self.state != EditorState::Dirty {
            return false;
        }
        if self.load_failed {
            self.status = Some(Status::error(format!(
                "Reload the {} before saving",
                self.artifact.label()
            )));
            return false;
        }
        self.state = EditorState::Saving;

        match self.artifact.store(self.api.as_ref(), &self.current).await {
            Ok(()) => {
                self.snapshot = self.current.clone();
                self.state = EditorState::Clean;
                self.status = Some(Status::transient("Saved", SAVED_STATUS_TTL));
                true
            }
            Err(e) => {
                tracing::warn!(artifact = self.artifact.label(), error = %e, "Save failed");
                let message = match &e {
                    AppError::Network(_) => "Network error".to_string(),
                    other => rejection_text(other, "Save failed"),
                };
                self.state = EditorState::Dirty;
                self.status = Some(Status::error(message));
                false
            }
        }
    }

    fn refresh_dirty(&mut self) {
        if matches!(self.state, EditorState::Clean | EditorState::Dirty) {
            self.state = if self.current == self.snapshot {
                EditorState::Clean
            } else {
                EditorState::Dirty
            };
        }
    }
}

impl Editor<ExamplesArtifact> {
    /// Append a blank example for `category`.
    pub fn add_example(&mut self, category: Category) {
        self.edit(|list| {
            list.push(FewShotExample {
                category,
                ..FewShotExample::default()
            })
        });
    }

    pub fn update_example(&mut self, index: usize, example: FewShotExample) {
        self.edit(|list| {
            if let Some(slot) = list.get_mut(index) {
                *slot = example;
            }
        });
    }

    pub fn remove_example(&mut self, index: usize) {
        self.edit(|list| {
            if index < list.len() {
                list.remove(index);
            }
        });
    }

    pub fn count_label(&self) -> String {
        match self.current.len() {
            1 => "1 example".to_string(),
            n => format!("{n} examples"),
        }
    }
}

// ============================================================================
// CaptureBoard
// ============================================================================

#[derive(Default)]
struct BoardState {
    captures: Vec<Capture>,
    loading: bool,
    status: Option<Status>,
}

/// Shared captures controller. Clones observe the same list; uploads run as
/// independent tasks and reconcile by reloading from the server.
#[derive(Clone)]
pub struct CaptureBoard {
    api: Arc<dyn StudioApi>,
    inner: Arc<Mutex<BoardState>>,
}

impl CaptureBoard {
    pub fn new(api: Arc<dyn StudioApi>) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(BoardState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: Status) {
        self.lock().status = Some(status);
    }

    pub fn captures(&self) -> Vec<Capture> {
        self.lock().captures.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn status_at(&self, now: Instant) -> Option<Status> {
        self.lock().status.clone().filter(|s| s.is_visible_at(now))
    }

    pub async fn reload(&self) {
        self.lock().loading = true;
        let result = self.api.captures().await;

        let mut state = self.lock();
        match result {
            Ok(captures) => state.captures = captures,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load captures");
                state.status = Some(Status::error("Failed to load captures"));
            }
        }
        state.loading = false;
    }

    /// Upload every image from a drop or file selection. Non-images are skipped.
    pub fn ingest(&self, items: Vec<PendingImage>) -> Vec<JoinHandle<()>> {
        items
            .into_iter()
            .filter(PendingImage::is_image)
            .map(|image| {
                let board = self.clone();
                tokio::spawn(async move { board.upload(image).await })
            })
            .collect()
    }

    /// Clipboard paste: only the first image is uploaded.
    pub fn ingest_paste(&self, items: Vec<PendingImage>) -> Option<JoinHandle<()>> {
        let image = items.into_iter().find(PendingImage::is_image)?;
        self.ingest(vec![image]).pop()
    }

    pub async fn ingest_url(&self, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            return;
        }
        self.set_status(Status::info("Fetching image..."));

        let mut image = match self.api.fetch_image(url).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image fetch failed");
                self.set_status(Status::error("Could not fetch image from URL"));
                return;
            }
        };
        if !image.is_image() {
            self.set_status(Status::error("URL did not return an image"));
            return;
        }

        image.filename = format!("{URL_CAPTURE_STEM}.{}", extension_for_mime(&image.mime));
        self.upload(image).await;
    }

    async fn upload(&self, image: PendingImage) {
        self.set_status(Status::info("Uploading..."));
        match self.api.upload_capture(&image).await {
            Ok(created) => {
                tracing::debug!(name = %created.name, "Capture uploaded");
                self.set_status(Status::transient("Captured", CAPTURE_STATUS_TTL));
                self.reload().await;
            }
            Err(e) => {
                tracing::warn!(filename = %image.filename, error = %e, "Upload failed");
                self.set_status(Status::error(rejection_text(&e, "Upload failed")));
            }
        }
    }

    pub async fn delete(&self, name: &str) {
        match self.api.delete_capture(name).await {
            Ok(()) => {}
            Err(AppError::Network(e)) => {
                tracing::warn!(name = %name, error = %e, "Delete failed");
                self.set_status(Status::error("Delete failed"));
                return;
            }
            Err(e) => self.set_status(Status::error(rejection_text(&e, "Delete failed"))),
        }
        self.reload().await;
    }

    /// Absolute URL of a capture, for the clipboard.
    pub fn copy_url(&self, origin: &str, url: &str) -> String {
        self.set_status(Status::transient("URL copied", CAPTURE_STATUS_TTL));
        format!("{}{}", origin.trim_end_matches('/'), url)
    }
}

/// File extension for an `image/*` content type: `image/svg+xml` is `svg`.
fn extension_for_mime(mime: &str) -> &str {
    let subtype = mime.trim_start_matches("image/");
    match subtype.split('+').next().unwrap_or_default() {
        "jpeg" | "pjpeg" => "jpg",
        "x-icon" | "vnd.microsoft.icon" => "ico",
        "" => "png",
        other => other,
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
