//! JSON envelope for tool calls.

use mtx_types::{FieldPath, PageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ToolError, ToolResult};
use crate::surface::ToolSurface;

/// Stable tool names, in listing order.
pub const TOOL_NAMES: [&str; 4] = [
    "enumerate-pages",
    "read-content",
    "write-field",
    "interpret-instruction",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EnumeratePagesArgs {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadContentArgs {
    #[schemars(description = "Page identifier, e.g. \"home\" or \"blog/launch\"")]
    pub page_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFieldArgs {
    #[schemars(description = "Page identifier")]
    pub page_id: String,
    #[schemars(description = "Dot-separated field path, e.g. \"hero.heading\" or \"features.0.name\"")]
    pub path: String,
    #[schemars(description = "New text for the field")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only write if the field currently holds this value (omit for an unconditional write)")]
    pub expected_old_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterpretInstructionArgs {
    #[schemars(description = "Page identifier")]
    pub page_id: String,
    #[schemars(description = "Natural-language editing instruction")]
    pub instruction: String,
}

/// A tool invocation: `{"tool": "<name>", "arguments": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "kebab-case")]
pub enum ToolCall {
    EnumeratePages(EnumeratePagesArgs),
    ReadContent(ReadContentArgs),
    WriteField(WriteFieldArgs),
    InterpretInstruction(InterpretInstructionArgs),
}

impl ToolCall {
    /// Build a call from a tool name and its arguments object. Missing or
    /// `null` arguments are treated as `{}`.
    pub fn from_parts(name: &str, arguments: Option<Value>) -> ToolResult<Self> {
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(value) => value,
        };
        let envelope = serde_json::json!({ "tool": name, "arguments": arguments });
        serde_json::from_value(envelope)
            .map_err(|e| ToolError::Validation(format!("invalid arguments for {name}: {e}")))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EnumeratePages(_) => TOOL_NAMES[0],
            Self::ReadContent(_) => TOOL_NAMES[1],
            Self::WriteField(_) => TOOL_NAMES[2],
            Self::InterpretInstruction(_) => TOOL_NAMES[3],
        }
    }
}

impl ToolSurface {
    /// Run a tool call and return its result as JSON.
    pub async fn dispatch(&self, call: ToolCall) -> ToolResult<Value> {
        tracing::debug!(tool = call.name(), "dispatching tool call");
        let value = match call {
            ToolCall::EnumeratePages(_) => serde_json::to_value(self.enumerate_pages().await?)?,
            ToolCall::ReadContent(args) => {
                let page = PageId::parse(&args.page_id)?;
                serde_json::to_value(self.read_content(&page).await?)?
            }
            ToolCall::WriteField(args) => {
                let page = PageId::parse(&args.page_id)?;
                let path = FieldPath::parse(&args.path)?;
                let write = match args.expected_old_value.as_deref() {
                    Some(expected) => {
                        self.write_field_if(&page, &path, Some(expected), &args.value)
                            .await?
                    }
                    None => self.write_field(&page, &path, &args.value).await?,
                };
                serde_json::to_value(write)?
            }
            ToolCall::InterpretInstruction(args) => {
                let page = PageId::parse(&args.page_id)?;
                serde_json::to_value(self.interpret_instruction(&page, &args.instruction).await?)?
            }
        };
        Ok(value)
    }
}

/// Name, description and parameter schema of one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn descriptor(name: &str, description: &str, schema: schemars::Schema) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        parameters: schema.to_value(),
    }
}

/// Every tool with its JSON parameter schema.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        descriptor(
            TOOL_NAMES[0],
            "List every page with its number of text fields and current revision.",
            schemars::schema_for!(EnumeratePagesArgs),
        ),
        descriptor(
            TOOL_NAMES[1],
            "Read a page's text fields as a flat map of dotted path to value.",
            schemars::schema_for!(ReadContentArgs),
        ),
        descriptor(
            TOOL_NAMES[2],
            "Set one text field. With expectedOldValue, only writes if the field still holds it.",
            schemars::schema_for!(WriteFieldArgs),
        ),
        descriptor(
            TOOL_NAMES[3],
            "Apply a natural-language instruction to a page. Each resulting edit is written only if its field is unchanged since it was read.",
            schemars::schema_for!(InterpretInstructionArgs),
        ),
    ]
}
