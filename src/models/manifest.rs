use serde::{Deserialize, Serialize};

use super::Category;

/// One entry of `generated_components/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub category: Category,
    /// Path relative to the components directory, e.g. `3d-scenes/FloatingKnot.tsx`.
    pub file: String,
    pub prompt: String,
    #[serde(default)]
    pub prompt_hash: String,
    #[serde(default)]
    pub generated_at: String,
}

/// Body of `POST /api/components`: a finished generation to file into the gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordComponentInput {
    /// PascalCase name; inferred from the prompt when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub category: Category,
    pub prompt: String,
    /// TSX source, possibly still wrapped in a markdown fence.
    pub code: String,
}
