use serde::{Deserialize, Serialize};

use super::Category;

/// One few-shot example fed to the generator: a prompt and the TSX it should produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub category: Category,
    pub prompt: String,
    pub component_name: String,
    pub output_snippet: String,
}

impl Default for FewShotExample {
    fn default() -> Self {
        Self {
            category: Category::ThreeDScenes,
            prompt: String::new(),
            component_name: "NewComponent".into(),
            output_snippet: String::new(),
        }
    }
}
