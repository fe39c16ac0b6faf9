//! Builds the generator's chat messages from the two prompt artifacts.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Category, FewShotExample};

static OPENING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```(?:tsx|jsx|typescript|javascript)?\s*\n?").expect("valid fence regex")
});
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?```\s*$").expect("valid fence regex"));

/// Fallback when no usable words remain in the prompt.
const DEFAULT_COMPONENT_NAME: &str = "GeneratedComponent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

/// Everything that goes into the user turn of a generation.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest<'a> {
    pub category: Category,
    pub description: &'a str,
    /// Text scraped from a reference page.
    pub url_context: Option<&'a str>,
    /// Instruction produced by [`describe_image_url`].
    pub image_context: Option<&'a str>,
    /// Compiler output from a previous attempt.
    pub retry_error: Option<&'a str>,
}

/// Assemble `[system, user]` messages.
///
/// The system turn is the system prompt followed by the few-shot examples
/// of the requested category, in file order.
pub fn compose_messages(
    system_prompt: &str,
    examples: &[FewShotExample],
    req: &ComposeRequest<'_>,
) -> Vec<PromptMessage> {
    let mut system = system_prompt.to_string();

    let mut matching = examples.iter().filter(|e| e.category == req.category).peekable();
    if matching.peek().is_some() {
        system.push_str("\n\nFEW-SHOT EXAMPLES:\n");
        for ex in matching {
            system.push_str(&format!(
                "\nUser: {}\nAssistant:\n{}\n",
                ex.prompt, ex.output_snippet
            ));
        }
    }

    let mut user = format!("Category: {}\n\nDescription: {}", req.category, req.description);
    if let Some(url) = req.url_context {
        user.push_str(&format!("\n\nREFERENCE PAGE CONTENT:\n{url}"));
    }
    if let Some(image) = req.image_context {
        user.push_str(&format!("\n\n{image}"));
    }
    if let Some(err) = req.retry_error {
        user.push_str(&format!(
            "\n\nThe previous attempt had this TypeScript error, please fix it:\n{err}"
        ));
    }

    vec![
        PromptMessage {
            role: "system".into(),
            content: system,
        },
        PromptMessage {
            role: "user".into(),
            content: user,
        },
    ]
}

/// Instruction telling the model how to use a reference image.
pub fn describe_image_url(url: &str) -> String {
    format!(
        "The user provided a reference image at: {url}\n\
         Incorporate this image URL as a prop default or background.\n\
         Use <img src='{url}' /> or Three.js useTexture('{url}') as appropriate."
    )
}

/// Remove a wrapping ```tsx ... ``` fence if the model added one.
pub fn strip_markdown_fences(text: &str) -> String {
    let text = OPENING_FENCE.replace(text, "");
    let text = CLOSING_FENCE.replace(&text, "");
    text.trim().to_string()
}

/// PascalCase name from the first three words longer than two characters.
pub fn infer_component_name(prompt: &str) -> String {
    let cleaned: String = prompt
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();

    let name: String = cleaned
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .take(3)
        .map(capitalize)
        .collect();

    if name.is_empty() {
        DEFAULT_COMPONENT_NAME.to_string()
    } else {
        name
    }
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
