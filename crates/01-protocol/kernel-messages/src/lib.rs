//! Wire-level message types exchanged between a client and a compute kernel.
//!
//! This crate exposes the protocol vocabulary shared by every layer above it:
//! * [`Message`] / [`Header`] – one unit of exchange plus its correlation ids.
//! * [`Channel`] – shell (request/reply), iopub (broadcast) and stdin.
//! * [`MessageType`] – request, reply and broadcast kinds, including the
//!   `_request` → `_reply` naming rule.
//! * [`Content`] – typed payloads for the messages the harness produces.
//! * [`KernelStatus`] – the execution state vocabulary carried by `status`.

mod content;
mod message;
mod status;

pub use content::{
    CommInfoReply, CommInfoRequest, CompleteReply, CompleteRequest, Content, ExecuteReply,
    ExecuteRequest, HelpLink, HistoryReply, HistoryRequest, InputReply, InputRequest,
    InspectReply, InspectRequest, IsCompleteReply, IsCompleteRequest, IsCompleteStatus,
    KernelInfo, KernelInfoRequest, LanguageInfo, ReplyStatus, StatusContent, StreamContent,
    StreamName,
};
pub use message::{Channel, Header, Message, MessageType, PROTOCOL_VERSION};
pub use status::KernelStatus;

#[cfg(test)]
mod tests;
