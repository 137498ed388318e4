//! Typed message payloads.

use crate::status::KernelStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome field shared by most replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
    Abort,
}

/// `execute_request` content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    pub silent: bool,
    pub store_history: bool,
    pub user_expressions: Map<String, Value>,
    pub allow_stdin: bool,
    /// Abort every other queued execute request if this one fails.
    pub stop_on_error: bool,
}

impl ExecuteRequest {
    /// Request for `code` with the protocol's default flags.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}

impl Default for ExecuteRequest {
    fn default() -> Self {
        Self {
            code: String::new(),
            silent: false,
            store_history: true,
            user_expressions: Map::new(),
            allow_stdin: true,
            stop_on_error: false,
        }
    }
}

/// `execute_reply` content, discriminated by its `status` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecuteReply {
    Ok {
        execution_count: u32,
        user_expressions: Map<String, Value>,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

impl ExecuteReply {
    pub fn status(&self) -> ReplyStatus {
        match self {
            ExecuteReply::Ok { .. } => ReplyStatus::Ok,
            ExecuteReply::Error { .. } => ReplyStatus::Error,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExecuteReply::Ok { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

/// `stream` broadcast content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamContent {
    pub name: StreamName,
    pub text: String,
}

/// `status` broadcast content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContent {
    pub execution_state: KernelStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub code: String,
    pub cursor_pos: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompleteReply {
    pub status: ReplyStatus,
    pub matches: Vec<String>,
    pub cursor_start: usize,
    pub cursor_end: usize,
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectRequest {
    pub code: String,
    pub cursor_pos: usize,
    pub detail_level: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InspectReply {
    pub status: ReplyStatus,
    pub found: bool,
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub output: bool,
    pub raw: bool,
    /// One of `range`, `tail` or `search`.
    pub hist_access_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
}

impl Default for HistoryRequest {
    fn default() -> Self {
        Self {
            output: false,
            raw: true,
            hist_access_type: "tail".to_owned(),
            n: Some(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryReply {
    pub status: ReplyStatus,
    /// `(session, line_number, input)` triples.
    pub history: Vec<(u32, u32, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsCompleteRequest {
    pub code: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsCompleteStatus {
    Complete,
    Incomplete,
    Invalid,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsCompleteReply {
    pub status: IsCompleteStatus,
    /// Suggested indent for the next line; only sent for `incomplete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommInfoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommInfoReply {
    pub status: ReplyStatus,
    pub comms: Map<String, Value>,
}

/// `kernel_info_request` has an empty body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfoRequest {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpLink {
    pub text: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub version: String,
    pub mimetype: String,
    pub file_extension: String,
}

/// Banner and language details answered to `kernel_info_request`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub protocol_version: String,
    pub implementation: String,
    pub implementation_version: String,
    pub language_info: LanguageInfo,
    pub banner: String,
    pub help_links: Vec<HelpLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    pub prompt: String,
    pub password: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReply {
    pub value: String,
}

/// Message body. Serializes as the bare payload object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    ExecuteRequest(ExecuteRequest),
    ExecuteReply(ExecuteReply),
    Stream(StreamContent),
    Status(StatusContent),
    CompleteRequest(CompleteRequest),
    CompleteReply(CompleteReply),
    InspectRequest(InspectRequest),
    InspectReply(InspectReply),
    HistoryRequest(HistoryRequest),
    HistoryReply(HistoryReply),
    IsCompleteRequest(IsCompleteRequest),
    IsCompleteReply(IsCompleteReply),
    CommInfoRequest(CommInfoRequest),
    CommInfoReply(CommInfoReply),
    KernelInfoRequest(KernelInfoRequest),
    KernelInfoReply(KernelInfo),
    InputRequest(InputRequest),
    InputReply(InputReply),
    /// Free-form payload for message types without a typed body.
    Other(Value),
}

impl Content {
    /// `status` content for `state`.
    pub fn status(state: KernelStatus) -> Self {
        Content::Status(StatusContent {
            execution_state: state,
        })
    }

    /// Execution state carried by a `status` body.
    pub fn execution_state(&self) -> Option<KernelStatus> {
        match self {
            Content::Status(status) => Some(status.execution_state),
            _ => None,
        }
    }

    pub fn as_execute_request(&self) -> Option<&ExecuteRequest> {
        match self {
            Content::ExecuteRequest(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_execute_reply(&self) -> Option<&ExecuteReply> {
        match self {
            Content::ExecuteReply(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamContent> {
        match self {
            Content::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}
