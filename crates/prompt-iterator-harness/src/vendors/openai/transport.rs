use std::collections::BTreeMap;

use crate::errors::ProviderError;
use crate::provider::ProviderEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub data: String,
}

#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + delim_len);
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut data_lines: Vec<String> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        data: data_lines.join("\n"),
    })
}

#[derive(Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Turns chat-completions stream chunks into provider events.
///
/// Tool calls arrive as fragments keyed by `index`; they are held until the
/// choice reports a `finish_reason` (or the stream ends) and then released
/// whole, in index order.
#[derive(Default)]
pub(crate) struct ChunkMapper {
    tool_calls: BTreeMap<u64, PartialToolCall>,
    finish_reason: Option<String>,
    completed: bool,
}

impl ChunkMapper {
    pub fn map_frame(
        &mut self,
        provider: &crate::ProviderId,
        frame: &SseFrame,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let data = frame.data.trim();
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if data == "[DONE]" {
            return Ok(self.finish());
        }
        let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
            ProviderError::protocol(provider.clone(), format!("invalid SSE JSON frame: {e}"))
        })?;
        self.map_chunk(provider, &value)
    }

    pub fn map_chunk(
        &mut self,
        provider: &crate::ProviderId,
        value: &serde_json::Value,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .or_else(|| error.as_str())
                .unwrap_or("upstream stream error");
            return Err(ProviderError::provider(provider.clone(), message, None));
        }

        let mut events = Vec::new();
        let Some(choice) = value
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
        else {
            return Ok(events);
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("content").and_then(|v| v.as_str())
                && !text.is_empty()
            {
                events.push(ProviderEvent::TextDelta {
                    text: text.to_string(),
                });
            }
            if let Some(fragments) = delta.get("tool_calls").and_then(|v| v.as_array()) {
                for fragment in fragments {
                    self.push_tool_fragment(fragment);
                }
            }
        }

        if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
            self.finish_reason = Some(reason.to_string());
            events.extend(self.drain_tool_calls());
        }
        Ok(events)
    }

    /// Releases pending tool calls and the completion event, once.
    pub fn finish(&mut self) -> Vec<ProviderEvent> {
        if self.completed {
            return Vec::new();
        }
        self.completed = true;
        let mut events = self.drain_tool_calls();
        events.push(ProviderEvent::Completed {
            finish_reason: self.finish_reason.take(),
        });
        events
    }

    fn push_tool_fragment(&mut self, fragment: &serde_json::Value) {
        let index = fragment.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
        let entry = self.tool_calls.entry(index).or_default();
        if let Some(id) = fragment.get("id").and_then(|v| v.as_str())
            && !id.is_empty()
        {
            entry.id = Some(id.to_string());
        }
        if let Some(function) = fragment.get("function") {
            if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
                entry.name.push_str(name);
            }
            if let Some(arguments) = function.get("arguments").and_then(|v| v.as_str()) {
                entry.arguments.push_str(arguments);
            }
        }
    }

    fn drain_tool_calls(&mut self) -> Vec<ProviderEvent> {
        std::mem::take(&mut self.tool_calls)
            .into_iter()
            .map(|(index, call)| ProviderEvent::ToolCall {
                id: call.id.unwrap_or_else(|| format!("call_{index}")),
                name: call.name,
                args: parse_tool_arguments(&call.arguments),
            })
            .collect()
    }
}

/// Parses accumulated argument text.
///
/// Text that is not valid JSON is kept as a JSON string so it can still be
/// forwarded and repaired downstream.
pub(crate) fn parse_tool_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
