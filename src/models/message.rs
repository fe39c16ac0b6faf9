use serde::{Deserialize, Serialize};

use super::Category;

// ============================================================================
// Chat messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Extra data attached to assistant replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// A single entry in the chat transcript. Session-only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// ISO 8601 timestamp
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, metadata: Option<MessageMetadata>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            metadata,
        }
    }

    pub fn is_error(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_error)
    }
}

// ============================================================================
// Generation wire types
// ============================================================================

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedComponent {
    pub name: String,
    pub category: Category,
    pub file: String,
    pub code: String,
}

/// Raw response of the generation service: either `{ok, component}` or `{error, details}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub component: Option<GeneratedComponent>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Interpreted generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Generated(GeneratedComponent),
    Failed {
        error: String,
        details: Option<String>,
    },
}

impl From<GenerateResponse> for GenerateOutcome {
    fn from(resp: GenerateResponse) -> Self {
        match resp.component {
            Some(component) if resp.ok => GenerateOutcome::Generated(component),
            _ => GenerateOutcome::Failed {
                error: resp.error.unwrap_or_else(|| "Generation failed".into()),
                details: resp.details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_shape() {
        let meta = MessageMetadata {
            component_name: Some("FloatingKnot".into()),
            category: Some(Category::ThreeDScenes),
            generated_file: Some("3d-scenes/FloatingKnot.tsx".into()),
            generated_code: None,
            is_error: false,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["componentName"], "FloatingKnot");
        assert_eq!(value["category"], "3d-scenes");
        assert!(value.get("generatedCode").is_none());
        assert!(value.get("isError").is_none());
    }

    #[test]
    fn test_outcome_from_success_response() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"ok":true,"component":{"name":"PulseLoader","category":"micro-interactions","file":"micro-interactions/PulseLoader.tsx","code":"export {}"}}"#,
        )
        .unwrap();
        match GenerateOutcome::from(resp) {
            GenerateOutcome::Generated(c) => assert_eq!(c.name, "PulseLoader"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_outcome_from_error_response() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"error":"Model offline","details":"connection refused"}"#)
                .unwrap();
        assert_eq!(
            GenerateOutcome::from(resp),
            GenerateOutcome::Failed {
                error: "Model offline".into(),
                details: Some("connection refused".into()),
            }
        );
    }

    #[test]
    fn test_ok_without_component_is_failure() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(matches!(
            GenerateOutcome::from(resp),
            GenerateOutcome::Failed { .. }
        ));
    }
}
