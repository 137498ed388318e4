use super::*;
use serde_json::json;

#[test]
fn request_types_map_to_reply_types() {
    assert_eq!(
        MessageType::ExecuteRequest.reply_type(),
        MessageType::ExecuteReply
    );
    assert_eq!(
        MessageType::IsCompleteRequest.reply_type(),
        MessageType::IsCompleteReply
    );
    assert_eq!(
        MessageType::parse("custom_request").reply_type(),
        MessageType::Other("custom_reply".into())
    );
    assert_eq!(MessageType::Status.reply_type(), MessageType::Status);
    assert!(!MessageType::Stream.is_request());
}

#[test]
fn known_spellings_parse_to_typed_variants() {
    assert_eq!(
        MessageType::parse("comm_info_request"),
        MessageType::CommInfoRequest
    );
    assert_eq!(MessageType::from("status"), MessageType::Status);
    assert_eq!(MessageType::KernelInfoReply.to_string(), "kernel_info_reply");
}

#[test]
fn request_serializes_to_wire_shape() {
    let msg = Message::request(
        MessageType::ExecuteRequest,
        Content::ExecuteRequest(ExecuteRequest::new("1 + 1")),
        "client-1",
        "alice",
    );
    let value = serde_json::to_value(&msg).expect("serialize");

    assert_eq!(value["header"]["msg_type"], "execute_request");
    assert_eq!(value["header"]["session"], "client-1");
    assert_eq!(value["header"]["username"], "alice");
    assert_eq!(value["header"]["version"], PROTOCOL_VERSION);
    assert_eq!(value["parent_header"], json!({}));
    assert_eq!(value["channel"], "shell");
    assert_eq!(value["content"]["code"], "1 + 1");
    assert_eq!(value["content"]["store_history"], true);
    assert_eq!(value["content"]["stop_on_error"], false);
    assert_eq!(value["buffers"], json!([]));
}

#[test]
fn replies_carry_parent_header() {
    let request = Message::request(
        MessageType::KernelInfoRequest,
        Content::KernelInfoRequest(KernelInfoRequest::default()),
        "client-1",
        "alice",
    );
    let reply = Message::new(
        Channel::Iopub,
        Header::new(MessageType::Status, "client-1", "alice"),
        Content::status(KernelStatus::Busy),
    )
    .with_parent(&request.header);

    assert_eq!(reply.parent_msg_id(), Some(request.msg_id()));
    let value = serde_json::to_value(&reply).expect("serialize");
    assert_eq!(value["parent_header"]["msg_id"], request.msg_id());
    assert_eq!(value["content"], json!({ "execution_state": "busy" }));
    assert_eq!(value["channel"], "iopub");
}

#[test]
fn execute_reply_is_tagged_by_status() {
    let error = ExecuteReply::Error {
        ename: "mock".into(),
        evalue: "mock error".into(),
        traceback: Vec::new(),
    };
    let value = serde_json::to_value(Content::ExecuteReply(error.clone())).expect("serialize");
    assert_eq!(value["status"], "error");
    assert_eq!(value["ename"], "mock");
    assert_eq!(error.status(), ReplyStatus::Error);

    let ok: ExecuteReply = serde_json::from_value(json!({
        "status": "ok",
        "execution_count": 3,
        "user_expressions": {}
    }))
    .expect("deserialize");
    assert!(ok.is_ok());
}

#[test]
fn is_complete_reply_omits_indent_when_complete() {
    let value = serde_json::to_value(IsCompleteReply {
        status: IsCompleteStatus::Complete,
        indent: None,
    })
    .expect("serialize");
    assert_eq!(value, json!({ "status": "complete" }));
}
