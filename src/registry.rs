//! Invocable component registry: name → `{schema, renderer}`.
//!
//! Schemas are compiled when a component is registered, and props are checked
//! against them on every invocation before the renderer runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppError;

/// Produces markup for a component from already-validated props.
pub trait ComponentRenderer: Send + Sync {
    fn render(&self, props: &Value) -> String;
}

impl<F> ComponentRenderer for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn render(&self, props: &Value) -> String {
        self(props)
    }
}

struct RegisteredComponent {
    description: String,
    schema: Value,
    validator: jsonschema::Validator,
    renderer: Arc<dyn ComponentRenderer>,
}

/// Public view of a registration.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedComponent {
    pub name: String,
    pub html: String,
}

#[derive(Default)]
pub struct ComponentRegistry {
    components: BTreeMap<String, RegisteredComponent>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        schema: Value,
        renderer: impl ComponentRenderer + 'static,
    ) -> Result<(), AppError> {
        if !is_pascal_case(name) {
            return Err(AppError::Validation(format!(
                "Component name '{name}' must be PascalCase"
            )));
        }
        if self.components.contains_key(name) {
            return Err(AppError::Validation(format!(
                "Component '{name}' is already registered"
            )));
        }
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            AppError::Validation(format!("Invalid props schema for '{name}': {e}"))
        })?;

        self.components.insert(
            name.to_string(),
            RegisteredComponent {
                description: description.to_string(),
                schema,
                validator,
                renderer: Arc::new(renderer),
            },
        );
        tracing::debug!(component = %name, "Component registered");
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.components
            .iter()
            .map(|(name, c)| ComponentDescriptor {
                name: name.clone(),
                description: c.description.clone(),
                schema: c.schema.clone(),
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Validate `props` against the component's schema and render it.
    pub fn invoke(&self, name: &str, props: &Value) -> Result<RenderedComponent, AppError> {
        let component = self
            .components
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown component '{name}'")))?;

        let violations: Vec<String> = component
            .validator
            .iter_errors(props)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if !violations.is_empty() {
            return Err(AppError::Validation(format!(
                "Invalid props for '{name}': {}",
                violations.join("; ")
            )));
        }

        Ok(RenderedComponent {
            name: name.to_string(),
            html: component.renderer.render(props),
        })
    }

    /// Registry with the design-system placeholders: `Button`, `Card`, `DataChart`.
    pub fn with_builtins() -> Result<Self, AppError> {
        let mut registry = Self::new();

        registry.register(
            "Button",
            "Primary button from the design system",
            json!({
                "type": "object",
                "properties": {
                    "variant": { "enum": ["primary", "secondary", "danger"] },
                    "size": { "enum": ["sm", "md", "lg"] },
                    "children": { "type": "string" }
                },
                "required": ["children"],
                "additionalProperties": false
            }),
            |props: &Value| {
                format!(
                    "<button class=\"{} {}\">{}</button>",
                    str_prop(props, "variant").unwrap_or("primary"),
                    str_prop(props, "size").unwrap_or("md"),
                    escape_html(str_prop(props, "children").unwrap_or_default()),
                )
            },
        )?;

        registry.register(
            "Card",
            "Content card with title and body",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["title", "content"],
                "additionalProperties": false
            }),
            |props: &Value| {
                format!(
                    "<div class=\"card\"><h3>{}</h3><p>{}</p></div>",
                    escape_html(str_prop(props, "title").unwrap_or_default()),
                    escape_html(str_prop(props, "content").unwrap_or_default()),
                )
            },
        )?;

        registry.register(
            "DataChart",
            "Simple data chart component",
            json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "x": { "type": "string" },
                                "y": { "type": "number" }
                            },
                            "required": ["x", "y"]
                        }
                    },
                    "type": { "enum": ["line", "bar", "pie"] }
                },
                "required": ["data"],
                "additionalProperties": false
            }),
            |props: &Value| {
                let points = props["data"].as_array().map(Vec::len).unwrap_or(0);
                format!(
                    "<div class=\"chart\" data-points=\"{points}\"><p>Chart Type: {}</p></div>",
                    str_prop(props, "type").unwrap_or("bar"),
                )
            },
        )?;

        Ok(registry)
    }
}

fn str_prop<'a>(props: &'a Value, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

pub(crate) fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
