//! Chat-style generation orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::Generator;
use crate::models::{
    Category, GenerateOutcome, GenerateRequest, Message, MessageMetadata, Role,
};

const NETWORK_FAILURE: &str = "Could not reach the generation service. Check your connection and try again.";

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The session transcript plus the single in-flight generation slot.
pub struct ChatSession {
    generator: Arc<dyn Generator>,
    messages: Mutex<Vec<Message>>,
    generating: AtomicBool,
}

impl ChatSession {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            messages: Mutex::new(Vec::new()),
            generating: AtomicBool::new(false),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    fn push(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Send a prompt to the generator. Returns false without doing anything if
    /// the prompt is blank or another generation is still running.
    pub async fn generate(&self, prompt: &str, category: Category) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return false;
        }
        if self
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Generation already in flight, ignoring prompt");
            return false;
        }
        let _in_flight = InFlight(&self.generating);

        self.push(Message::new(Role::User, prompt, None));

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            category,
        };
        let reply = match self.generator.generate(&request).await {
            Ok(GenerateOutcome::Generated(component)) => {
                tracing::info!(name = %component.name, file = %component.file, "Component generated");
                Message::new(
                    Role::Assistant,
                    format!("Generated {} in {}", component.name, component.file),
                    Some(MessageMetadata {
                        component_name: Some(component.name),
                        category: Some(component.category),
                        generated_file: Some(component.file),
                        generated_code: Some(component.code),
                        is_error: false,
                    }),
                )
            }
            Ok(GenerateOutcome::Failed { error, details }) => {
                tracing::warn!(error = %error, "Generation failed");
                let content = match details {
                    Some(details) if !details.is_empty() => format!("{error}\n\n{details}"),
                    _ => error,
                };
                error_message(content, category)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Generation request failed");
                error_message(NETWORK_FAILURE.to_string(), category)
            }
        };
        self.push(reply);
        true
    }
}

fn error_message(content: String, category: Category) -> Message {
    Message::new(
        Role::Assistant,
        content,
        Some(MessageMetadata {
            category: Some(category),
            is_error: true,
            ..MessageMetadata::default()
        }),
    )
}
