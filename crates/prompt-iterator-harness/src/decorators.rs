//! Prompt decorators: short `+++Directive` lines prefixed to a prompt to
//! steer reasoning style, tone and output shape.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingDepth {
    StepByStep,
    Debate,
    Socratic,
    Reasoning,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Casual,
    Creative,
    Technical,
    Friendly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
    Json,
    Code,
    Structured,
    Plain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Critique,
    Refine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    FactCheck,
    CiteSources,
}

/// Decorator selection. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_depth: Option<ThinkingDepth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evaluation: Vec<Evaluation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<Validation>,
    /// Extra decorator lines appended verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<String>,
}

fn snake(value: impl Serialize) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(ToOwned::to_owned))
        .unwrap_or_default()
}

/// Renders the decorator block, one directive per line, in a fixed order.
pub fn build_prefix(config: &DecoratorConfig) -> String {
    let mut lines: Vec<String> = Vec::new();

    match config.thinking_depth {
        Some(ThinkingDepth::StepByStep) => lines.push("+++StepByStep".into()),
        Some(ThinkingDepth::Debate) => lines.push("+++Debate".into()),
        Some(ThinkingDepth::Socratic) => lines.push("+++Socratic".into()),
        Some(ThinkingDepth::Reasoning) => lines.push("+++Reasoning".into()),
        Some(ThinkingDepth::None) | None => {}
    }
    if let Some(tone) = config.tone {
        lines.push(format!("+++Tone(style={})", snake(tone)));
    }
    if let Some(format) = config.output_format {
        lines.push(format!("+++OutputFormat(format={})", snake(format)));
    }
    if config.evaluation.contains(&Evaluation::Critique) {
        lines.push("+++Critique".into());
    }
    if config.evaluation.contains(&Evaluation::Refine) {
        lines.push("+++Refine(iterations=2)".into());
    }
    if config.validation.contains(&Validation::FactCheck) {
        lines.push("+++FactCheck".into());
    }
    if config.validation.contains(&Validation::CiteSources) {
        lines.push("+++CiteSources".into());
    }
    lines.extend(config.custom.iter().filter(|l| !l.is_empty()).cloned());

    lines.join("\n")
}

/// Prefixes `prompt` with the decorator block, if there is one.
pub fn apply(prompt: &str, config: &DecoratorConfig) -> String {
    let prefix = build_prefix(config);
    if prefix.is_empty() {
        return prompt.to_string();
    }
    format!("{prefix}\n\n{prompt}")
}

/// A named decorator bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetMode {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub decorators: DecoratorConfig,
}

/// All built-in presets.
pub fn preset_modes() -> Vec<PresetMode> {
    vec![
        PresetMode {
            id: "academic",
            name: "Academic research",
            description: "Literature reviews and research method design",
            decorators: DecoratorConfig {
                thinking_depth: Some(ThinkingDepth::Reasoning),
                tone: Some(Tone::Formal),
                output_format: Some(OutputFormat::Structured),
                validation: vec![Validation::FactCheck, Validation::CiteSources],
                ..DecoratorConfig::default()
            },
        },
        PresetMode {
            id: "coding",
            name: "Software development",
            description: "Code generation and code review",
            decorators: DecoratorConfig {
                thinking_depth: Some(ThinkingDepth::StepByStep),
                tone: Some(Tone::Technical),
                output_format: Some(OutputFormat::Code),
                evaluation: vec![Evaluation::Critique],
                ..DecoratorConfig::default()
            },
        },
        PresetMode {
            id: "creative",
            name: "Creative writing",
            description: "Copywriting and storytelling",
            decorators: DecoratorConfig {
                thinking_depth: Some(ThinkingDepth::None),
                tone: Some(Tone::Creative),
                output_format: Some(OutputFormat::Markdown),
                evaluation: vec![Evaluation::Refine],
                ..DecoratorConfig::default()
            },
        },
        PresetMode {
            id: "data_analysis",
            name: "Data analysis",
            description: "Data interpretation and trend analysis",
            decorators: DecoratorConfig {
                thinking_depth: Some(ThinkingDepth::Reasoning),
                tone: Some(Tone::Technical),
                output_format: Some(OutputFormat::Structured),
                evaluation: vec![Evaluation::Critique],
                validation: vec![Validation::FactCheck],
                ..DecoratorConfig::default()
            },
        },
    ]
}

/// Looks up a preset by id.
pub fn preset(id: &str) -> Option<PresetMode> {
    preset_modes().into_iter().find(|mode| mode.id == id)
}
