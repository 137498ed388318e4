use crate::content::Content;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Messaging protocol version stamped into every header.
pub const PROTOCOL_VERSION: &str = "5.3";

/// Logical channel a message travels on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Request/reply channel; every reply correlates with exactly one request.
    Shell,
    /// Broadcast channel for status and output, fanned out to all listeners.
    Iopub,
    /// Kernel-initiated input prompts and their answers.
    Stdin,
}

/// Message kind as spelled in `header.msg_type`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    ExecuteRequest,
    ExecuteReply,
    ExecuteInput,
    Stream,
    Status,
    CompleteRequest,
    CompleteReply,
    InspectRequest,
    InspectReply,
    HistoryRequest,
    HistoryReply,
    IsCompleteRequest,
    IsCompleteReply,
    CommInfoRequest,
    CommInfoReply,
    KernelInfoRequest,
    KernelInfoReply,
    InputRequest,
    InputReply,
    /// Any message type the harness does not model explicitly.
    Other(String),
}

impl MessageType {
    /// Returns the wire spelling of the message type.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::ExecuteRequest => "execute_request",
            MessageType::ExecuteReply => "execute_reply",
            MessageType::ExecuteInput => "execute_input",
            MessageType::Stream => "stream",
            MessageType::Status => "status",
            MessageType::CompleteRequest => "complete_request",
            MessageType::CompleteReply => "complete_reply",
            MessageType::InspectRequest => "inspect_request",
            MessageType::InspectReply => "inspect_reply",
            MessageType::HistoryRequest => "history_request",
            MessageType::HistoryReply => "history_reply",
            MessageType::IsCompleteRequest => "is_complete_request",
            MessageType::IsCompleteReply => "is_complete_reply",
            MessageType::CommInfoRequest => "comm_info_request",
            MessageType::CommInfoReply => "comm_info_reply",
            MessageType::KernelInfoRequest => "kernel_info_request",
            MessageType::KernelInfoReply => "kernel_info_reply",
            MessageType::InputRequest => "input_request",
            MessageType::InputReply => "input_reply",
            MessageType::Other(name) => name,
        }
    }

    /// Parses a wire spelling; unknown spellings become [`MessageType::Other`].
    pub fn parse(name: &str) -> Self {
        match name {
            "execute_request" => MessageType::ExecuteRequest,
            "execute_reply" => MessageType::ExecuteReply,
            "execute_input" => MessageType::ExecuteInput,
            "stream" => MessageType::Stream,
            "status" => MessageType::Status,
            "complete_request" => MessageType::CompleteRequest,
            "complete_reply" => MessageType::CompleteReply,
            "inspect_request" => MessageType::InspectRequest,
            "inspect_reply" => MessageType::InspectReply,
            "history_request" => MessageType::HistoryRequest,
            "history_reply" => MessageType::HistoryReply,
            "is_complete_request" => MessageType::IsCompleteRequest,
            "is_complete_reply" => MessageType::IsCompleteReply,
            "comm_info_request" => MessageType::CommInfoRequest,
            "comm_info_reply" => MessageType::CommInfoReply,
            "kernel_info_request" => MessageType::KernelInfoRequest,
            "kernel_info_reply" => MessageType::KernelInfoReply,
            "input_request" => MessageType::InputRequest,
            "input_reply" => MessageType::InputReply,
            other => MessageType::Other(other.to_owned()),
        }
    }

    /// Whether the type names a request (`*_request`).
    pub fn is_request(&self) -> bool {
        self.as_str().ends_with("_request")
    }

    /// Reply type for a request: the `_request` suffix becomes `_reply`.
    ///
    /// Types that are not requests are returned unchanged.
    pub fn reply_type(&self) -> MessageType {
        match self.as_str().strip_suffix("_request") {
            Some(stem) => MessageType::parse(&format!("{stem}_reply")),
            None => self.clone(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MessageType {
    fn from(name: &str) -> Self {
        MessageType::parse(name)
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MessageType::parse(&name))
    }
}

/// Correlation and routing header carried by every message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Unique id of this message.
    pub msg_id: String,
    /// Kind of message.
    pub msg_type: MessageType,
    /// Client session id of the sender.
    pub session: String,
    /// User the sender acts on behalf of.
    pub username: String,
    /// Protocol version.
    pub version: String,
}

impl Header {
    /// Builds a header with a freshly generated message id.
    pub fn new(msg_type: MessageType, session: &str, username: &str) -> Self {
        Self {
            msg_id: Uuid::new_v4().to_string(),
            msg_type,
            session: session.to_owned(),
            username: username.to_owned(),
            version: PROTOCOL_VERSION.to_owned(),
        }
    }
}

/// One unit of protocol exchange.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub header: Header,
    /// Header of the request this message answers or was produced for.
    #[serde(serialize_with = "serialize_parent_header")]
    pub parent_header: Option<Header>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub content: Content,
    pub channel: Channel,
    pub buffers: Vec<Vec<u8>>,
}

impl Message {
    /// Creates a message without a parent.
    pub fn new(channel: Channel, header: Header, content: Content) -> Self {
        Self {
            header,
            parent_header: None,
            metadata: serde_json::Map::new(),
            content,
            channel,
            buffers: Vec::new(),
        }
    }

    /// Creates a shell request originating from `session` / `username`.
    pub fn request(msg_type: MessageType, content: Content, session: &str, username: &str) -> Self {
        Self::new(Channel::Shell, Header::new(msg_type, session, username), content)
    }

    /// Attaches the header of the message this one responds to.
    pub fn with_parent(mut self, parent: &Header) -> Self {
        self.parent_header = Some(parent.clone());
        self
    }

    pub fn msg_type(&self) -> &MessageType {
        &self.header.msg_type
    }

    pub fn msg_id(&self) -> &str {
        &self.header.msg_id
    }

    /// Id of the parent message, if any.
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header
            .as_ref()
            .map(|parent| parent.msg_id.as_str())
    }
}

// The wire format spells a missing parent as an empty object, not `null`.
fn serialize_parent_header<S: Serializer>(
    parent: &Option<Header>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match parent {
        Some(header) => header.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
