//! The gallery manifest: `generated_components/index.json`.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::models::{Category, CategoryFilter, ManifestEntry, RecordComponentInput};
use crate::prompt::{infer_component_name, strip_markdown_fences};
use crate::registry::is_pascal_case;

/// Load the manifest. A missing file is an empty gallery.
pub async fn load(path: &Path) -> Result<Vec<ManifestEntry>, AppError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(AppError::Io(e)),
    }
}

pub fn filter(entries: Vec<ManifestEntry>, by: CategoryFilter) -> Vec<ManifestEntry> {
    entries.into_iter().filter(|e| by.matches(e.category)).collect()
}

/// First 12 hex chars of the prompt's SHA-256.
pub fn prompt_hash(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(12);
    hex
}

/// Record a generated component: replace the entry with the same name in place, or append.
pub async fn upsert(
    path: &Path,
    name: &str,
    category: Category,
    prompt: &str,
    file: &str,
) -> Result<ManifestEntry, AppError> {
    let mut entries = load(path).await?;

    let entry = ManifestEntry {
        name: name.to_string(),
        category,
        file: file.to_string(),
        prompt: prompt.to_string(),
        prompt_hash: prompt_hash(prompt),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };

    match entries.iter_mut().find(|e| e.name == name) {
        Some(existing) => *existing = entry.clone(),
        None => entries.push(entry.clone()),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(&entries)?).await?;
    tracing::info!(name = %name, category = %category, "Manifest updated");
    Ok(entry)
}

/// Write a generated component to `<components_dir>/<category>/<Name>.tsx` and
/// record it in the manifest.
pub async fn record_generated(
    components_dir: &Path,
    manifest_path: &Path,
    input: RecordComponentInput,
) -> Result<ManifestEntry, AppError> {
    let name = match input.name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => infer_component_name(&input.prompt),
    };
    if !is_pascal_case(&name) {
        return Err(AppError::Validation(format!(
            "Component name '{name}' must be PascalCase"
        )));
    }

    let code = strip_markdown_fences(&input.code);
    if code.is_empty() {
        return Err(AppError::Validation("Component code is empty".into()));
    }

    let file = format!("{}/{name}.tsx", input.category);
    let out_dir = components_dir.join(input.category.as_str());
    tokio::fs::create_dir_all(&out_dir).await?;
    tokio::fs::write(out_dir.join(format!("{name}.tsx")), code).await?;
    tracing::info!(name = %name, file = %file, "Generated component written");

    upsert(manifest_path, &name, input.category, &input.prompt, &file).await
}
