use crate::tools::ToolArgs;

/// Outcome of checking one tool call's arguments against its schema.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Checks `args` against the schema registered for `tool_name`.
///
/// Tools without a registered schema always validate.
pub fn validate(tool_name: &str, args: &serde_json::Value) -> ValidationResult {
    match ToolArgs::parse(tool_name, args) {
        Ok(_) => ValidationResult::ok(),
        Err(reason) => ValidationResult::invalid(reason),
    }
}
