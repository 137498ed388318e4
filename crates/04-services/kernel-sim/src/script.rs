//! Canned payloads produced by the simulated kernel.

use kernel_messages::{
    CommInfoReply, CompleteReply, Content, ExecuteReply, HistoryReply, InspectReply,
    IsCompleteReply, IsCompleteStatus, KernelInfo, Message, MessageType, ReplyStatus,
    StreamContent, StreamName,
};
use serde_json::Map;

pub(crate) const ERROR_NAME: &str = "mock";
pub(crate) const ERROR_VALUE: &str = "mock error";

pub(crate) fn ok_reply(execution_count: u32) -> ExecuteReply {
    ExecuteReply::Ok {
        execution_count,
        user_expressions: Map::new(),
    }
}

pub(crate) fn error_reply() -> ExecuteReply {
    ExecuteReply::Error {
        ename: ERROR_NAME.into(),
        evalue: ERROR_VALUE.into(),
        traceback: Vec::new(),
    }
}

pub(crate) fn stdout(text: &str) -> Content {
    Content::Stream(StreamContent {
        name: StreamName::Stdout,
        text: text.to_owned(),
    })
}

/// Immediate reply for request types without a broadcast phase.
///
/// Returns `None` for execute requests and for types the kernel does not
/// script; those wait for a deferred turn or a server-originated reply.
pub(crate) fn canned_reply(request: &Message, info: &KernelInfo) -> Option<Content> {
    let content = match request.msg_type() {
        MessageType::KernelInfoRequest => Content::KernelInfoReply(info.clone()),
        MessageType::CompleteRequest => {
            let cursor = match &request.content {
                Content::CompleteRequest(complete) => complete.cursor_pos,
                _ => 0,
            };
            Content::CompleteReply(CompleteReply {
                status: ReplyStatus::Ok,
                matches: Vec::new(),
                cursor_start: cursor,
                cursor_end: cursor,
                metadata: Map::new(),
            })
        }
        MessageType::InspectRequest => Content::InspectReply(InspectReply {
            status: ReplyStatus::Ok,
            found: false,
            data: Map::new(),
            metadata: Map::new(),
        }),
        MessageType::HistoryRequest => Content::HistoryReply(HistoryReply {
            status: ReplyStatus::Ok,
            history: Vec::new(),
        }),
        MessageType::IsCompleteRequest => {
            let code = match &request.content {
                Content::IsCompleteRequest(is_complete) => is_complete.code.as_str(),
                _ => "",
            };
            Content::IsCompleteReply(is_complete(code))
        }
        MessageType::CommInfoRequest => Content::CommInfoReply(CommInfoReply {
            status: ReplyStatus::Ok,
            comms: Map::new(),
        }),
        _ => return None,
    };
    Some(content)
}

fn is_complete(code: &str) -> IsCompleteReply {
    let trimmed = code.trim_end();
    if trimmed.ends_with(':') || trimmed.ends_with('\\') {
        IsCompleteReply {
            status: IsCompleteStatus::Incomplete,
            indent: Some(String::new()),
        }
    } else {
        IsCompleteReply {
            status: IsCompleteStatus::Complete,
            indent: None,
        }
    }
}
