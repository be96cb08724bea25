use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "prompt-iterator.logs.jsonl";

/// Where log lines go.
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    Console,
    JsonFile(PathBuf),
}

impl LogTarget {
    fn from_vars(enabled: Option<&str>, json_path: Option<&str>) -> Self {
        if enabled.and_then(parse_switch) == Some(false) {
            return Self::Disabled;
        }
        match json_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Self::JsonFile(PathBuf::from(path)),
            None => Self::Console,
        }
    }

    fn from_env() -> Self {
        Self::from_vars(
            std::env::var("PROMPT_ITERATOR_OBSERVABILITY").ok().as_deref(),
            std::env::var("PROMPT_ITERATOR_JSON_LOG_PATH").ok().as_deref(),
        )
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn env_filter() -> EnvFilter {
    std::env::var("PROMPT_ITERATOR_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Splits a log file path into the directory and file name the appender wants.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file)
}

/// Installs the global tracing subscriber once per process.
///
/// - `PROMPT_ITERATOR_OBSERVABILITY=off` disables logging.
/// - `PROMPT_ITERATOR_LOG_LEVEL` overrides the filter, then `RUST_LOG`, then `info`.
/// - `PROMPT_ITERATOR_JSON_LOG_PATH` writes JSONL to that file instead of
///   compact lines on stdout.
pub fn init_observability() {
    INIT.get_or_init(|| match LogTarget::from_env() {
        LogTarget::Disabled => {}
        LogTarget::Console => {
            let console = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stdout);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(console)
                .try_init();
        }
        LogTarget::JsonFile(path) => {
            let (dir, file) = split_log_path(&path);
            let _ = std::fs::create_dir_all(&dir);
            let json = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file));
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(json)
                .try_init();
        }
    });
}
