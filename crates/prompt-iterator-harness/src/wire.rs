//! Line-framed wire protocol between the proxy and the browser client.
//!
//! Every frame is one UTF-8 line `<prefix>:<json>\n`:
//!
//! | prefix | payload                                               |
//! |--------|-------------------------------------------------------|
//! | `0`    | JSON string, a text fragment                          |
//! | `9`    | `{"toolCallId","toolName","args"}`                    |
//! | `a`    | `{"toolCallId","toolName","result"}`                  |
//! | `e`    | `{"type":"correction","status":...}`                  |

use serde::{Deserialize, Serialize};

/// Progress of the tool-call argument repair loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Correcting,
    Success,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallFrame {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultFrame {
    pub tool_call_id: String,
    pub tool_name: String,
    /// Absent when the tool reported no result.
    #[serde(default)]
    pub result: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StatusPayload {
    Correction { status: CorrectionStatus },
}

/// One frame of the wire protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum WireFrame {
    Text(String),
    ToolCall(ToolCallFrame),
    ToolResult(ToolResultFrame),
    Correction(CorrectionStatus),
}

/// Errors raised while decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("frame is missing the `<prefix>:` header: {0:?}")]
    MissingPrefix(String),
    #[error("unknown frame prefix {0:?}")]
    UnknownPrefix(String),
    #[error("invalid payload for `{prefix}:` frame: {source}")]
    Payload {
        prefix: char,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl WireFrame {
    pub fn prefix(&self) -> char {
        match self {
            Self::Text(_) => '0',
            Self::ToolCall(_) => '9',
            Self::ToolResult(_) => 'a',
            Self::Correction(_) => 'e',
        }
    }

    /// Renders the frame as a newline-terminated line.
    pub fn encode(&self) -> String {
        let payload = match self {
            Self::Text(text) => serde_json::to_string(text),
            Self::ToolCall(call) => serde_json::to_string(call),
            Self::ToolResult(result) => serde_json::to_string(result),
            Self::Correction(status) => {
                serde_json::to_string(&StatusPayload::Correction { status: *status })
            }
        };
        // Strings and maps with string keys always serialize.
        let payload = payload.unwrap_or_default();
        format!("{}:{}\n", self.prefix(), payload)
    }

    /// Parses a single line (with or without its trailing newline).
    pub fn decode(line: &str) -> Result<Self, WireError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((prefix, payload)) = line.split_once(':') else {
            return Err(WireError::MissingPrefix(line.to_string()));
        };
        match prefix {
            "0" => serde_json::from_str(payload)
                .map(Self::Text)
                .map_err(payload_error('0')),
            "9" => serde_json::from_str(payload)
                .map(Self::ToolCall)
                .map_err(payload_error('9')),
            "a" => serde_json::from_str(payload)
                .map(Self::ToolResult)
                .map_err(payload_error('a')),
            "e" => serde_json::from_str::<StatusPayload>(payload)
                .map(|StatusPayload::Correction { status }| Self::Correction(status))
                .map_err(payload_error('e')),
            other => Err(WireError::UnknownPrefix(other.to_string())),
        }
    }
}

fn payload_error(prefix: char) -> impl Fn(serde_json::Error) -> WireError {
    move |source| WireError::Payload { prefix, source }
}

/// Incremental decoder that reassembles frames split across network chunks.
#[derive(Default)]
pub struct WireDecoder {
    buf: Vec<u8>,
}

impl WireDecoder {
    /// Feeds a chunk and returns every frame completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Vec<WireFrame>, WireError> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            let line = String::from_utf8(line)?;
            if line.trim().is_empty() {
                continue;
            }
            frames.push(WireFrame::decode(&line)?);
        }
        Ok(frames)
    }

    /// Decodes a final unterminated line, if any.
    pub fn finish(&mut self) -> Result<Option<WireFrame>, WireError> {
        let rest = std::mem::take(&mut self.buf);
        let rest = String::from_utf8(rest)?;
        if rest.trim().is_empty() {
            return Ok(None);
        }
        WireFrame::decode(&rest).map(Some)
    }
}
