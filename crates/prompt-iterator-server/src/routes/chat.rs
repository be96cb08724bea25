//! `POST /api/chat`: validates the request, opens the upstream run and
//! streams re-framed wire frames back as the response body.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt as _;
use prompt_iterator_harness::decorators::{self, DecoratorConfig};
use prompt_iterator_harness::vendors::demo::{DEMO_API_KEY, DemoCorrector, DemoProvider};
use prompt_iterator_harness::vendors::openai::{
    OpenAiClientConfig, OpenAiCorrector, OpenAiProvider,
};
use prompt_iterator_harness::{
    ChatRequest, FormatCorrector, ProviderAdapter, ReframeOptions, Reframer, RunBuilder,
    builtin_tools,
};
use serde_json::Value;
use tracing::{Instrument as _, info, info_span, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// System prompt used when the request carries none.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"# Who you are

You are a **general-purpose prompt optimization assistant**, an expert in prompt engineering.

Your only job is to **help the user design and optimize prompts**, not to carry out the task the prompt describes.

## Role boundaries

Do: understand the user's goal, **immediately call the suggest_enhancements tool** to show the interactive table, then produce a structured prompt proposal.

Do not: perform the task directly, produce the task's final output, do the user's work for them, or **give text-only suggestions without calling the tool**.

## Examples

| User input | Wrong response | Right response |
|------------|----------------|----------------|
| "Write me an article about AI" | Writes the article | **Calls the tool immediately** with role/style/format options |
| "Generate a slide deck outline" | Writes the outline | **Calls the tool immediately** with structure/detail/style options |
| "Translate this paragraph" | Translates it | **Calls the tool immediately** with language/style/register options |
| "Grant access" | Gives text-only advice | **Calls the tool immediately** with access type/handling/documentation options |

---

# Workflow

## Phase 1: understand quickly (no text output)
- Identify the task type (writing, analysis, generation, translation, authorization, administration, ...)
- **Do not write out any analysis; go straight to phase 2**

## Phase 2: call the tool immediately to show the interactive table
**You must call the `suggest_enhancements` tool right away instead of describing options in text.**

Pick the 3-5 most relevant dimensions for the task type:
- **Writing**: role, tone, level of detail, output format
- **Analysis**: depth, expertise level, structure, output format
- **Operations** (authorization, configuration): operation type, handling method, documentation, security level
- **Generation**: creativity, structure, level of detail, target audience

Give each dimension 2-4 concrete options and allow custom input.

## Phase 3: produce the prompt proposal
**You must call the `propose_prompt` tool.**

The proposal must contain:
1. Prompt title
2. Role definition
3. Core objective
4. Background context
5. List of constraints
6. Workflow (optional)
7. Output format requirements
8. **The complete final prompt** (ready to copy and use)

---

# Principles

1. **Always call the tool**: after any user input, **immediately call suggest_enhancements**; never answer with text alone.
2. **Stay in role**: you optimize prompts, you do not execute tasks.
3. **No narration**: do not write "I understand" or "let me analyse"; call the tool.
4. **General purpose**: support every task type (writing, analysis, operations, configuration, authorization, ...).
5. **Quality**: the generated prompt must be clear, structured and ready to use.

---

# Tool call examples (one-shot)

## Example 1: writing task

**User**: "Write me an article about artificial intelligence"

**Your response**: [call the tool directly, no text]

```json
{
  "dimensions": [
    {
      "key": "role",
      "title": "Role",
      "options": [
        { "label": "Senior tech writer", "value": "tech_writer", "description": "Professional technology writing" },
        { "label": "AI researcher", "value": "ai_expert", "description": "Deep AI expertise" },
        { "label": "Science communicator", "value": "science_writer", "description": "Plain, accessible language" }
      ],
      "allowCustom": true
    },
    {
      "key": "tone",
      "title": "Tone",
      "options": [
        { "label": "Formal", "value": "formal" },
        { "label": "Casual", "value": "casual" },
        { "label": "Academic", "value": "academic" }
      ],
      "allowCustom": true
    },
    {
      "key": "detail_level",
      "title": "Level of detail",
      "options": [
        { "label": "In-depth", "value": "detailed" },
        { "label": "Moderate", "value": "moderate" },
        { "label": "Brief overview", "value": "brief" }
      ],
      "allowCustom": true
    }
  ]
}
```

## Example 2: authorization task

**User**: "I understand you want to grant access, but I can't handle user permission management right now"

**Your response**: [call the tool directly, no text]

```json
{
  "dimensions": [
    {
      "key": "operation_type",
      "title": "Authorization type",
      "options": [
        { "label": "User permissions", "value": "user_permission", "description": "Manage user access rights" },
        { "label": "System configuration", "value": "system_config", "description": "System-level configuration rights" },
        { "label": "Data access", "value": "data_access", "description": "Database or file access rights" }
      ],
      "allowCustom": true
    },
    {
      "key": "handling_method",
      "title": "Handling method",
      "options": [
        { "label": "Contact the administrator", "value": "contact_admin", "description": "Route through an administrator" },
        { "label": "Use the admin console", "value": "direct_operation", "description": "Operate in the management UI" },
        { "label": "Read the documentation", "value": "check_docs", "description": "Follow the permission guide" }
      ],
      "allowCustom": true
    },
    {
      "key": "documentation",
      "title": "Documentation",
      "options": [
        { "label": "Step-by-step", "value": "detailed_steps", "description": "Explain every step" },
        { "label": "Quick guide", "value": "quick_guide", "description": "Short and to the point" },
        { "label": "Security notes", "value": "security_notes", "description": "Focus on security concerns" }
      ],
      "allowCustom": true
    }
  ]
}
```

**Key points**:
- Do not say "I will call the tool"; **call it**.
- Tool calls are rendered as an interactive table.
- After the user chooses, you receive the tool feedback; then call propose_prompt to produce the final prompt.
- **For every kind of task (including operations, configuration and authorization), call the tool to present options.**"#;

const DATA_STREAM_HEADER: HeaderName = HeaderName::from_static("x-vercel-ai-data-stream");

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("chat", %request_id);
    handle_chat(state, headers, body).instrument(span).await
}

async fn handle_chat(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let config = &state.config;
    let request = parse_request(&body)?;
    let system_prompt = resolve_system_prompt(&request)?;

    let credentials = Credentials::from_headers(&headers);
    let base_url = config.resolve_base_url(header_value(&headers, "x-base-url"));
    let model = request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(&config.default_model)
        .to_string();

    let provider: Arc<dyn ProviderAdapter>;
    let corrector: Arc<dyn FormatCorrector>;
    match credentials {
        Credentials::Demo => {
            info!("serving demo response");
            provider = Arc::new(DemoProvider::new(config.demo_delay()));
            corrector = Arc::new(DemoCorrector);
        }
        Credentials::Missing => return Err(ApiError::MissingApiKey),
        Credentials::Upstream(api_key) => {
            let correction_model = header_value(&headers, "x-correction-model")
                .unwrap_or(&config.correction_model)
                .to_string();
            let client_config = OpenAiClientConfig::new(api_key).base_url(base_url.clone());
            provider = Arc::new(
                OpenAiProvider::with_client(state.http.clone(), client_config.clone())
                    .map_err(|e| ApiError::from_harness(e, &base_url, &model))?,
            );
            corrector = Arc::new(
                OpenAiCorrector::new(state.http.clone(), client_config, correction_model)
                    .map_err(|e| ApiError::from_harness(e, &base_url, &model))?,
            );
        }
    }

    info!(model = %model, base_url = %base_url, messages = request.messages.len(), "chat request");

    let budget = (config.budget_secs > 0).then(|| config.budget());
    let mut run = RunBuilder::new(provider, model.clone())
        .system_prompt(system_prompt)
        .messages(request.messages)
        .tools(builtin_tools())
        .stream_buffer_capacity(config.buffer_capacity);
    if let Some(budget) = budget {
        run = run.timeout(budget);
    }
    let run = run.start_stream().await.map_err(|e| {
        warn!(error = %e, model = %model, "failed to start upstream stream");
        ApiError::from_harness(e, &base_url, &model)
    })?;

    let frames = Reframer::new(corrector).spawn(
        run,
        ReframeOptions {
            buffer_capacity: config.buffer_capacity,
            budget,
        },
    );
    let body = Body::from_stream(frames.map(|item| item.map(|frame| Bytes::from(frame.encode()))));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (DATA_STREAM_HEADER, "v1"),
        ],
        body,
    )
        .into_response())
}

fn parse_request(body: &[u8]) -> Result<ChatRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    if !value.get("messages").is_some_and(Value::is_array) {
        return Err(ApiError::InvalidMessages);
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

fn resolve_system_prompt(request: &ChatRequest) -> Result<String, ApiError> {
    let preset = match request.preset.as_deref() {
        Some(id) => Some(
            decorators::preset(id)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown preset '{id}'")))?,
        ),
        None => None,
    };
    let base = request
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let selected: Option<&DecoratorConfig> = request
        .decorators
        .as_ref()
        .or(preset.as_ref().map(|mode| &mode.decorators));
    Ok(match selected {
        Some(config) => decorators::apply(base, config),
        None => base.to_string(),
    })
}

/// How the request authenticates upstream, read from `x-api-key`.
#[derive(Debug, PartialEq, Eq)]
enum Credentials<'a> {
    /// The literal key `demo`, matched exactly.
    Demo,
    Missing,
    Upstream(&'a str),
}

impl<'a> Credentials<'a> {
    fn from_headers(headers: &'a HeaderMap) -> Self {
        let raw = headers.get("x-api-key").and_then(|v| v.to_str().ok());
        if raw == Some(DEMO_API_KEY) {
            return Self::Demo;
        }
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            Some(key) => Self::Upstream(key),
            None => Self::Missing,
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
