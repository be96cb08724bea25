use crate::validator::validate;

/// Upper bound on repair round-trips per invalid tool call.
pub const MAX_CORRECTION_ATTEMPTS: usize = 3;

/// Result of one repair round-trip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CorrectionAttempt {
    pub attempt_index: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_args: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CorrectionAttempt {
    pub fn succeeded(attempt_index: usize, corrected_args: serde_json::Value) -> Self {
        Self {
            attempt_index,
            success: true,
            corrected_args: Some(corrected_args),
            error: None,
        }
    }

    pub fn failed(attempt_index: usize, error: impl Into<String>) -> Self {
        Self {
            attempt_index,
            success: false,
            corrected_args: None,
            error: Some(error.into()),
        }
    }
}

/// Secondary oracle that repairs malformed tool-call arguments.
///
/// Implementations report every failure (network, status, unparsable
/// output) as an unsuccessful attempt; they never abort the stream.
#[async_trait::async_trait]
pub trait FormatCorrector: Send + Sync {
    async fn correct(
        &self,
        tool_name: &str,
        invalid_args: &serde_json::Value,
        attempt_index: usize,
    ) -> CorrectionAttempt;
}

/// Outcome of the bounded repair loop for one tool call.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectionOutcome {
    /// Arguments to forward: the first validated repair, or the original.
    pub args: serde_json::Value,
    pub corrected: bool,
    pub attempts: Vec<CorrectionAttempt>,
}

/// Runs up to `MAX_CORRECTION_ATTEMPTS` sequential repairs, re-validating
/// each candidate and stopping at the first one that passes.
///
/// Every attempt is given the original arguments, never a previous
/// candidate.
pub async fn correct_with_retries(
    corrector: &dyn FormatCorrector,
    tool_name: &str,
    invalid_args: &serde_json::Value,
) -> CorrectionOutcome {
    let mut attempts = Vec::with_capacity(MAX_CORRECTION_ATTEMPTS);
    for attempt_index in 0..MAX_CORRECTION_ATTEMPTS {
        let mut attempt = corrector
            .correct(tool_name, invalid_args, attempt_index)
            .await;
        if let Some(candidate) = attempt.corrected_args.clone().filter(|_| attempt.success) {
            let revalidated = validate(tool_name, &candidate);
            if revalidated.valid {
                tracing::debug!(tool_name, attempt = attempt_index, "tool call arguments repaired");
                attempts.push(attempt);
                return CorrectionOutcome {
                    args: candidate,
                    corrected: true,
                    attempts,
                };
            }
            attempt = CorrectionAttempt {
                attempt_index,
                success: false,
                corrected_args: Some(candidate),
                error: revalidated.error,
            };
        }
        tracing::warn!(
            tool_name,
            attempt = attempt_index,
            error = attempt.error.as_deref().unwrap_or("unknown"),
            "tool call repair attempt failed"
        );
        attempts.push(attempt);
    }
    CorrectionOutcome {
        args: invalid_args.clone(),
        corrected: false,
        attempts,
    }
}

/// Builds the instruction sent to the correction model.
pub fn correction_prompt(tool_name: &str, invalid_args: &serde_json::Value) -> String {
    let rendered = match invalid_args {
        serde_json::Value::String(raw) => raw.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    format!(
        "You are a JSON format repair specialist. Fix the JSON syntax errors below \
without changing, removing or adding any semantic information.\n\n\
Tool name: {tool_name}\n\
Broken JSON:\n{rendered}\n\n\
Rules:\n\
1. Only fix JSON syntax errors (missing quotes, commas, brackets and the like).\n\
2. Do not change the value or meaning of any field.\n\
3. Do not remove any field.\n\
4. Do not add any new field.\n\
5. Output only the corrected JSON, with no other text.\n\n\
Corrected JSON:"
    )
}

/// Parses the correction model's reply, tolerating a surrounding code fence.
pub fn parse_corrected_json(reply: &str) -> Result<serde_json::Value, String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err("correction model returned empty content".into());
    }
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced).map_err(|e| format!("correction output is not JSON: {e}"))
}
