//! Filesystem-backed storage for the prompt artifacts and the captures directory.
//!
//! The store assumes a single local writer: no locking, last write wins.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use crate::config::StudioConfig;
use crate::error::AppError;
use crate::models::Capture;

/// Extensions listed by `list_captures` (compared case-insensitively).
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Extension used when the suggested filename gives none.
const DEFAULT_EXTENSION: &str = "png";

/// URL prefix captures are served under.
pub const CAPTURES_URL_PREFIX: &str = "/captures/";

/// Standard alphabet, padding optional.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub struct AssetStore {
    system_prompt_path: PathBuf,
    examples_path: PathBuf,
    captures_dir: PathBuf,
}

impl AssetStore {
    pub fn new(
        system_prompt_path: impl Into<PathBuf>,
        examples_path: impl Into<PathBuf>,
        captures_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            system_prompt_path: system_prompt_path.into(),
            examples_path: examples_path.into(),
            captures_dir: captures_dir.into(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(
            config.system_prompt_path(),
            config.examples_path(),
            config.captures_dir(),
        )
    }

    pub fn captures_dir(&self) -> &Path {
        &self.captures_dir
    }

    // ------------------------------------------------------------------
    // Text artifacts
    // ------------------------------------------------------------------

    pub async fn read_system_prompt(&self) -> Result<String, AppError> {
        Ok(tokio::fs::read_to_string(&self.system_prompt_path).await?)
    }

    pub async fn write_system_prompt(&self, content: &str) -> Result<(), AppError> {
        tokio::fs::write(&self.system_prompt_path, content).await?;
        tracing::info!(
            path = %self.system_prompt_path.display(),
            bytes = content.len(),
            "System prompt saved"
        );
        Ok(())
    }

    /// Raw examples JSON, returned verbatim.
    pub async fn read_examples(&self) -> Result<String, AppError> {
        Ok(tokio::fs::read_to_string(&self.examples_path).await?)
    }

    /// Overwrite the examples file. The text must parse as JSON; its shape is not checked.
    pub async fn write_examples(&self, text: &str) -> Result<(), AppError> {
        serde_json::from_str::<serde::de::IgnoredAny>(text)
            .map_err(|e| AppError::Validation(format!("Invalid JSON: {e}")))?;
        tokio::fs::write(&self.examples_path, text).await?;
        tracing::info!(
            path = %self.examples_path.display(),
            bytes = text.len(),
            "Few-shot examples saved"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Captures
    // ------------------------------------------------------------------

    /// List image captures, newest first. Creates the directory if missing.
    pub async fn list_captures(&self) -> Result<Vec<Capture>, AppError> {
        tokio::fs::create_dir_all(&self.captures_dir).await?;

        let mut found: Vec<(SystemTime, Capture)> = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.captures_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if !has_image_extension(&name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created = created_time(&metadata);
            found.push((created, capture_entry(name, metadata.len(), created)));
        }

        sort_newest_first(&mut found);
        Ok(found.into_iter().map(|(_, c)| c).collect())
    }

    /// Decode and store an uploaded image as `capture-<epoch-ms>.<ext>`.
    pub async fn save_capture(
        &self,
        data: Option<&str>,
        suggested_filename: Option<&str>,
    ) -> Result<Capture, AppError> {
        self.save_capture_at(data, suggested_filename, Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`save_capture`](Self::save_capture) with an explicit clock reading.
    ///
    /// Two uploads inside the same millisecond map to the same name; the second
    /// one fails with `Conflict` instead of overwriting the first.
    pub(crate) async fn save_capture_at(
        &self,
        data: Option<&str>,
        suggested_filename: Option<&str>,
        epoch_ms: i64,
    ) -> Result<Capture, AppError> {
        let bytes = decode_image_data(data)?;
        let ext = extension_for(suggested_filename);
        let name = format!("capture-{epoch_ms}.{ext}");

        tokio::fs::create_dir_all(&self.captures_dir).await?;
        let path = self.captures_dir.join(&name);

        let payload = bytes.as_slice();
        create_exclusive(&path, |mut file| async move {
            file.write_all(payload).await?;
            file.flush().await
        })
        .await?;

        let metadata = tokio::fs::metadata(&path).await?;
        tracing::info!(name = %name, size = bytes.len(), "Capture saved");
        Ok(capture_entry(name, metadata.len(), created_time(&metadata)))
    }

    /// Delete a capture by its (possibly percent-encoded) filename.
    pub async fn delete_capture(&self, raw_name: &str) -> Result<(), AppError> {
        let name = urlencoding::decode(raw_name)
            .map_err(|_| AppError::Validation("Capture name is not valid UTF-8".into()))?;
        validate_capture_name(&name)?;

        let path = self.captures_dir.join(name.as_ref());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(name = %name, "Capture deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("File not found".into()))
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn has_image_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        None => false,
    }
}

/// Newest first; equal times by name, descending.
fn sort_newest_first(found: &mut [(SystemTime, Capture)]) {
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.name.cmp(&a.1.name)));
}

/// Create `path` (it must not exist yet) and fill it with `write`.
/// A file left half-written by a failed `write` is removed.
async fn create_exclusive<F, Fut>(path: &Path, write: F) -> Result<(), AppError>
where
    F: FnOnce(tokio::fs::File) -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                AppError::Conflict(format!("Capture {name} already exists"))
            }
            _ => AppError::Io(e),
        })?;

    if let Err(e) = write(file).await {
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "Could not remove partial capture");
        }
        return Err(AppError::Io(e));
    }
    Ok(())
}

/// Birth time when the filesystem records one, else modification time.
fn created_time(metadata: &std::fs::Metadata) -> SystemTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn capture_entry(name: String, size: u64, created: SystemTime) -> Capture {
    let created_at = DateTime::<Utc>::from(created).to_rfc3339_opts(SecondsFormat::Millis, true);
    Capture {
        url: format!("{CAPTURES_URL_PREFIX}{name}"),
        name,
        size,
        created_at,
    }
}

/// Strip an optional `data:<mime>;base64,` header and decode the payload.
fn decode_image_data(data: Option<&str>) -> Result<Vec<u8>, AppError> {
    let data = data
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::Validation("Missing image data".into()))?;

    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| AppError::Validation("Data URL is not base64 encoded".into()))?,
        None => data,
    };

    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Image data is empty".into()));
    }
    Ok(bytes)
}

/// Extension after the last `.` of the suggested filename, if it is plain alphanumeric.
fn extension_for(suggested_filename: Option<&str>) -> String {
    suggested_filename
        .and_then(|f| f.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

/// Reject names that could escape the captures directory.
fn validate_capture_name(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Validation(format!("Invalid capture name: {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, AssetStore) {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(
            dir.path().join("system_creative.txt"),
            dir.path().join("few_shot_examples.json"),
            dir.path().join("public").join("captures"),
        );
        (dir, store)
    }

    // ------------------------------------------------------------------
    // Text artifacts
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_system_prompt_round_trip() {
        let (_dir, store) = test_store();
        for text in ["", "You are a creative engineer.\n", "ünïcødé ✨\r\nline two"] {
            store.write_system_prompt(text).await.unwrap();
            assert_eq!(store.read_system_prompt().await.unwrap(), text);
        }
    }

    #[tokio::test]
    async fn test_read_missing_system_prompt_is_io_error() {
        let (_dir, store) = test_store();
        let err = store.read_system_prompt().await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_write_examples_verbatim() {
        let (_dir, store) = test_store();
        let text = "[\n  {\"category\": \"3d-scenes\"}\n]";
        store.write_examples(text).await.unwrap();
        assert_eq!(store.read_examples().await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_write_examples_rejects_invalid_json_and_keeps_file() {
        let (_dir, store) = test_store();
        store.write_examples("[]").await.unwrap();

        let err = store.write_examples("[{\"category\": ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.read_examples().await.unwrap(), "[]");
    }

    // ------------------------------------------------------------------
    // Captures
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_creates_directory() {
        let (_dir, store) = test_store();
        assert!(!store.captures_dir().exists());
        assert!(store.list_captures().await.unwrap().is_empty());
        assert!(store.captures_dir().is_dir());
    }

    #[tokio::test]
    async fn test_save_capture_with_data_url() {
        let (_dir, store) = test_store();
        let capture = store
            .save_capture_at(Some("data:image/png;base64,AAAA"), Some("x.png"), 1_700_000_000_123)
            .await
            .unwrap();
        assert_eq!(capture.name, "capture-1700000000123.png");
        assert_eq!(capture.url, "/captures/capture-1700000000123.png");
        assert_eq!(capture.size, 3);

        let listed = store.list_captures().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, capture.name);
        assert_eq!(listed[0].size, 3);
        assert!(listed[0].created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_save_capture_svg_data_url_and_plain_base64() {
        let (_dir, store) = test_store();
        let svg = store
            .save_capture_at(Some("data:image/svg+xml;base64,PHN2Zy8+"), Some("logo.svg"), 1)
            .await
            .unwrap();
        assert_eq!(svg.name, "capture-1.svg");
        assert_eq!(svg.size, 6);

        let plain = store
            .save_capture_at(Some("AAAA"), None, 2)
            .await
            .unwrap();
        assert_eq!(plain.name, "capture-2.png");
    }

    #[tokio::test]
    async fn test_save_capture_rejects_missing_or_malformed_data() {
        let (_dir, store) = test_store();
        for data in [None, Some(""), Some("!!not base64!!"), Some("data:image/png,AAAA")] {
            let err = store.save_capture_at(data, Some("x.png"), 5).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "data={data:?}");
        }
        assert!(store.list_captures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_capture_distinct_names_across_milliseconds() {
        let (_dir, store) = test_store();
        let a = store.save_capture_at(Some("AAAA"), None, 100).await.unwrap();
        let b = store.save_capture_at(Some("AAAA"), None, 101).await.unwrap();
        assert_ne!(a.name, b.name);
    }

    #[tokio::test]
    async fn test_save_capture_same_millisecond_conflicts() {
        let (_dir, store) = test_store();
        store.save_capture_at(Some("AAAA"), None, 42).await.unwrap();
        let err = store
            .save_capture_at(Some("AQID"), None, 42)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The first file is untouched
        let listed = store.list_captures().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, 3);
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let (_dir, store) = test_store();
        tokio::fs::create_dir_all(store.captures_dir()).await.unwrap();
        tokio::fs::write(store.captures_dir().join("notes.txt"), "x").await.unwrap();
        tokio::fs::write(store.captures_dir().join("UPPER.PNG"), "x").await.unwrap();
        tokio::fs::create_dir_all(store.captures_dir().join("nested.png")).await.unwrap();

        store.save_capture_at(Some("AAAA"), Some("a.jpg"), 10).await.unwrap();

        let mut names: Vec<String> = store
            .list_captures()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["UPPER.PNG", "capture-10.jpg"]);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (_dir, store) = test_store();
        for ms in [100, 200, 300] {
            store.save_capture_at(Some("AAAA"), None, ms).await.unwrap();
            // Keep creation times apart on coarse-grained filesystems.
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        }

        let names: Vec<String> = store
            .list_captures()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["capture-300.png", "capture-200.png", "capture-100.png"]
        );
    }

    #[test]
    fn test_sort_newest_first_breaks_ties_by_name_descending() {
        let t0 = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        let t1 = t0 + std::time::Duration::from_secs(5);
        let entry = |name: &str, at| (at, capture_entry(name.to_string(), 1, at));

        let mut found = vec![
            entry("a.png", t0),
            entry("b.png", t1),
            entry("c.png", t0),
            entry("d.png", t1),
        ];
        sort_newest_first(&mut found);

        let names: Vec<&str> = found.iter().map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, vec!["d.png", "b.png", "c.png", "a.png"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_capture() {
        let (_dir, store) = test_store();
        tokio::fs::create_dir_all(store.captures_dir()).await.unwrap();
        let path = store.captures_dir().join("capture-5.png");

        let err = create_exclusive(&path, |mut file| async move {
            file.write_all(&[1, 2]).await?;
            file.flush().await?;
            Err::<(), _>(std::io::Error::other("disk full"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(!path.exists());
        assert!(store.list_captures().await.unwrap().is_empty());

        // A retry with the same name is not a conflict.
        let capture = store.save_capture_at(Some("AAAA"), None, 5).await.unwrap();
        assert_eq!(capture.name, "capture-5.png");
        assert_eq!(capture.size, 3);
    }

    #[tokio::test]
    async fn test_delete_capture() {
        let (_dir, store) = test_store();
        let capture = store.save_capture_at(Some("AAAA"), None, 7).await.unwrap();
        store.delete_capture(&capture.name).await.unwrap();
        assert!(store.list_captures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_percent_encoded_name() {
        let (_dir, store) = test_store();
        tokio::fs::create_dir_all(store.captures_dir()).await.unwrap();
        tokio::fs::write(store.captures_dir().join("my shot.png"), "x").await.unwrap();
        store.delete_capture("my%20shot.png").await.unwrap();
        assert!(!store.captures_dir().join("my shot.png").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found_without_mutation() {
        let (_dir, store) = test_store();
        store.save_capture_at(Some("AAAA"), None, 1).await.unwrap();
        let err = store.delete_capture("capture-2.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "File not found");
        assert_eq!(store.list_captures().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let (dir, store) = test_store();
        store.write_system_prompt("keep me").await.unwrap();
        for name in ["..%2Fsystem_creative.txt", "../system_creative.txt", "..", "%2e%2e", "", "a\\b.png"] {
            let err = store.delete_capture(name).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "name={name:?}");
        }
        assert!(dir.path().join("system_creative.txt").exists());
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("shot.JPG")), "JPG");
        assert_eq!(extension_for(Some("archive.tar.gz")), "gz");
        assert_eq!(extension_for(Some("noext")), "png");
        assert_eq!(extension_for(Some("trailing.")), "png");
        assert_eq!(extension_for(Some("weird.p/ng")), "png");
        assert_eq!(extension_for(None), "png");
    }

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("a.webp"));
        assert!(has_image_extension("a.JpEg"));
        assert!(!has_image_extension("a.txt"));
        assert!(!has_image_extension("png"));
    }
}
