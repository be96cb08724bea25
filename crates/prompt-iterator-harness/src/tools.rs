//! Tools offered to the model and the typed shapes of their arguments.
//!
//! The model never sees a server-side effect: every tool "executes" by
//! returning a fixed acknowledgement, and the interesting part is the
//! arguments, which the client renders as interactive widgets.

use serde::{Deserialize, Serialize};

/// Tool the model calls when the request is too vague to act on.
pub const ASK_QUESTIONS: &str = "ask_questions";
/// Tool presenting multi-dimension enhancement options.
pub const SUGGEST_ENHANCEMENTS: &str = "suggest_enhancements";
/// Tool presenting the final structured prompt.
pub const PROPOSE_PROMPT: &str = "propose_prompt";

/// A function tool advertised to the upstream model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
    /// Result reported back once the call has been handed to the client.
    pub result: Option<String>,
}

impl ToolSpec {
    /// Renders the OpenAI chat-completions `tools[]` entry.
    pub fn to_openai_tool(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// The three prompt-iteration tools.
pub fn builtin_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ASK_QUESTIONS.into(),
            description: "Ask the user clarifying questions when the request is ambiguous.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "questions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string"},
                                "text": {"type": "string", "description": "The question to ask the user"},
                                "type": {"type": "string", "enum": ["text", "select", "checkbox"], "description": "Type of input required"},
                                "options": {"type": "array", "items": {"type": "string"}, "description": "Options for select/checkbox"}
                            },
                            "required": ["id", "text", "type"]
                        }
                    }
                },
                "required": ["questions"]
            }),
            result: Some("User interaction required".into()),
        },
        ToolSpec {
            name: SUGGEST_ENHANCEMENTS.into(),
            description: "Phase 1: offer multi-dimension optimization options for the user to pick from.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "dimensions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "key": {"type": "string"},
                                "title": {"type": "string", "description": "Dimension title, e.g. \"Tone\""},
                                "options": {
                                    "type": "array",
                                    "description": "Preset options the user can click",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "label": {"type": "string"},
                                            "value": {"type": "string"},
                                            "description": {"type": "string"}
                                        },
                                        "required": ["label", "value"]
                                    }
                                },
                                "allowCustom": {"type": "boolean", "default": true, "description": "Whether the user may type a custom requirement"}
                            },
                            "required": ["key", "title", "options"]
                        }
                    }
                },
                "required": ["dimensions"]
            }),
            result: Some("Optimization options presented to user".into()),
        },
        ToolSpec {
            name: PROPOSE_PROMPT.into(),
            description: "Phase 2: generate the final structured prompt from the user's selections.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Prompt proposal title"},
                    "role": {"type": "string", "description": "Role definition"},
                    "objective": {"type": "string", "description": "Core objective"},
                    "context": {"type": "string", "description": "Background information"},
                    "constraints": {"type": "array", "items": {"type": "string"}, "description": "Constraints"},
                    "workflow": {"type": "array", "items": {"type": "string"}, "description": "Workflow steps"},
                    "outputFormat": {"type": "string", "description": "Output format requirements"},
                    "finalPrompt": {"type": "string", "description": "The complete final prompt"}
                },
                "required": ["title", "role", "objective", "constraints", "finalPrompt"]
            }),
            result: Some("Prompt proposal generated".into()),
        },
    ]
}

/// One selectable option within an enhancement dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnhancementOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementDimension {
    pub key: String,
    pub title: String,
    pub options: Vec<EnhancementOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_custom: Option<bool>,
}

/// Arguments of `suggest_enhancements`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestEnhancementsArgs {
    pub dimensions: Vec<EnhancementDimension>,
}

/// Arguments of `propose_prompt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposePromptArgs {
    pub title: String,
    pub role: String,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    pub final_prompt: String,
}

/// Tool-call arguments resolved against the schema of their tool.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolArgs {
    SuggestEnhancements(SuggestEnhancementsArgs),
    ProposePrompt(ProposePromptArgs),
    /// Any tool without an enforced schema.
    Unknown {
        name: String,
        args: serde_json::Value,
    },
}

impl ToolArgs {
    /// Interprets `args` under the schema registered for `tool_name`.
    ///
    /// Returns a human-readable reason when the arguments do not fit.
    pub fn parse(tool_name: &str, args: &serde_json::Value) -> Result<Self, String> {
        match tool_name {
            SUGGEST_ENHANCEMENTS => serde_json::from_value(args.clone())
                .map(Self::SuggestEnhancements)
                .map_err(|e| schema_error(tool_name, args, &e)),
            PROPOSE_PROMPT => serde_json::from_value(args.clone())
                .map(Self::ProposePrompt)
                .map_err(|e| schema_error(tool_name, args, &e)),
            _ => Ok(Self::Unknown {
                name: tool_name.to_string(),
                args: args.clone(),
            }),
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Self::SuggestEnhancements(_) => SUGGEST_ENHANCEMENTS,
            Self::ProposePrompt(_) => PROPOSE_PROMPT,
            Self::Unknown { name, .. } => name,
        }
    }
}

fn schema_error(tool_name: &str, args: &serde_json::Value, err: &serde_json::Error) -> String {
    let found = match args {
        serde_json::Value::Object(_) => return format!("{tool_name}: {err}"),
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
    };
    format!("{tool_name}: expected an arguments object, found {found}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tools_have_unique_names_and_results() {
        let tools = builtin_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![ASK_QUESTIONS, SUGGEST_ENHANCEMENTS, PROPOSE_PROMPT]);
        assert!(tools.iter().all(|t| t.result.is_some()));
    }

    #[test]
    fn openai_tool_shape() {
        let tool = &builtin_tools()[2];
        let rendered = tool.to_openai_tool();
        assert_eq!(rendered["type"], "function");
        assert_eq!(rendered["function"]["name"], PROPOSE_PROMPT);
        assert_eq!(rendered["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn parses_propose_prompt_with_camel_case_fields() {
        let args = serde_json::json!({
            "title": "Essay helper",
            "role": "editor",
            "objective": "write",
            "constraints": ["short"],
            "outputFormat": "markdown",
            "finalPrompt": "You are an editor."
        });
        let ToolArgs::ProposePrompt(parsed) = ToolArgs::parse(PROPOSE_PROMPT, &args).expect("valid")
        else {
            panic!("expected propose_prompt args");
        };
        assert_eq!(parsed.output_format.as_deref(), Some("markdown"));
        assert_eq!(parsed.final_prompt, "You are an editor.");
        assert!(parsed.workflow.is_none());
    }

    #[test]
    fn string_args_report_expected_object() {
        let err = ToolArgs::parse(SUGGEST_ENHANCEMENTS, &serde_json::json!("{dimensions: ["))
            .expect_err("string args");
        assert!(err.contains("expected an arguments object, found a string"), "{err}");
    }

    #[test]
    fn unknown_tool_is_passed_through() {
        let args = serde_json::json!({"anything": 1});
        let parsed = ToolArgs::parse("web_search", &args).expect("unknown ok");
        assert_eq!(parsed.tool_name(), "web_search");
        assert_eq!(
            parsed,
            ToolArgs::Unknown {
                name: "web_search".into(),
                args
            }
        );
    }
}
