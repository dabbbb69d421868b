// ABOUTME: Instruction rendering for task templates using Handlebars
// ABOUTME: Substitutes context fields and dependency results into instruction text and capability args

use handlebars::Handlebars;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Template data error: {0}")]
    Data(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Renders instruction templates and capability-argument templates. Non-strict
/// mode: an undeclared placeholder renders empty instead of failing, because
/// absent optional context fields are expected.
#[derive(Clone)]
pub struct InstructionRenderer {
    handlebars: Handlebars<'static>,
}

impl InstructionRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Instructions are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub fn render(&self, template: &str, data: &JsonValue) -> Result<String> {
        Ok(self.handlebars.render_template(template, data)?)
    }

    /// Render every string leaf of a JSON value against the same data the
    /// instruction template sees. Used for capability arguments declared in a
    /// task definition.
    pub fn render_value(&self, value: &JsonValue, data: &JsonValue) -> Result<JsonValue> {
        match value {
            JsonValue::String(template) => {
                Ok(JsonValue::String(self.render(template, data)?))
            }
            JsonValue::Array(items) => {
                let rendered: Result<Vec<JsonValue>> = items
                    .iter()
                    .map(|item| self.render_value(item, data))
                    .collect();
                Ok(JsonValue::Array(rendered?))
            }
            JsonValue::Object(map) => {
                let mut rendered = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    rendered.insert(key.clone(), self.render_value(item, data)?);
                }
                Ok(JsonValue::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }
}

impl Default for InstructionRenderer {
    fn default() -> Self {
        Self::new()
    }
}
