use futures::FutureExt;
use hub::{KernelConfig, KernelConnection};
use kernel_messages::{CompleteRequest, ExecuteRequest, IsCompleteRequest, PROTOCOL_VERSION};
use mock::make_service_manager_with;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

fn config() -> KernelConfig {
    KernelConfig {
        client_id: "client-1".into(),
        username: "alice".into(),
        ..KernelConfig::default()
    }
}

#[test]
fn execute_exchange_serializes_to_wire_json() {
    let _ = env_logger::builder().is_test(true).try_init();
    let services = make_service_manager_with(config()).expect("mock services");
    let kernel = services.kernels().start_new(None);
    services.run_until_idle();

    let frames: Arc<Mutex<Vec<Value>>> = Arc::default();
    let future = kernel.request_execute(ExecuteRequest::new("print('hi')"), true);
    let sink = Arc::clone(&frames);
    future.on_iopub(move |msg| sink.lock().push(serde_json::to_value(msg).expect("serialize")));
    services.run_until_idle();

    let request = serde_json::to_value(future.msg()).expect("serialize");
    assert_eq!(request["header"]["session"], "client-1");
    assert_eq!(request["header"]["username"], "alice");
    assert_eq!(request["header"]["version"], PROTOCOL_VERSION);
    assert_eq!(request["parent_header"], json!({}));

    let frames = frames.lock();
    assert_eq!(frames.len(), 3);
    for frame in frames.iter() {
        assert_eq!(frame["channel"], "iopub");
        assert_eq!(frame["parent_header"]["msg_id"], request["header"]["msg_id"]);
        assert_ne!(frame["header"]["msg_id"], request["header"]["msg_id"]);
    }
    assert_eq!(frames[0]["content"], json!({ "execution_state": "busy" }));
    assert_eq!(frames[1]["header"]["msg_type"], "stream");
    assert_eq!(frames[1]["content"], json!({ "name": "stdout", "text": "foo" }));

    let reply = future.done().now_or_never().flatten().expect("reply");
    let reply = serde_json::to_value(&reply).expect("serialize");
    assert_eq!(reply["header"]["msg_type"], "execute_reply");
    assert_eq!(reply["channel"], "shell");
    assert_eq!(
        reply["content"],
        json!({ "status": "ok", "execution_count": 1, "user_expressions": {} })
    );
}

#[test]
fn canned_replies_serialize_with_reply_types() {
    let _ = env_logger::builder().is_test(true).try_init();
    let services = make_service_manager_with(config()).expect("mock services");
    let kernel = services.kernels().start_new(None);

    let complete = kernel.request_complete(CompleteRequest {
        code: "pri".into(),
        cursor_pos: 3,
    });
    let reply = serde_json::to_value(complete.reply().expect("reply")).expect("serialize");
    assert_eq!(reply["header"]["msg_type"], "complete_reply");
    assert_eq!(
        reply["content"],
        json!({
            "status": "ok",
            "matches": [],
            "cursor_start": 3,
            "cursor_end": 3,
            "metadata": {},
        })
    );

    let is_complete = kernel.request_is_complete(IsCompleteRequest { code: "x = 1".into() });
    let reply = serde_json::to_value(is_complete.reply().expect("reply")).expect("serialize");
    assert_eq!(reply["header"]["msg_type"], "is_complete_reply");
    assert_eq!(reply["content"], json!({ "status": "complete" }));
}
