use futures::FutureExt;
use hub::{KernelConnection, KernelHandle, KernelModelOptions, ServiceManager};
use kernel_messages::{Channel, ExecuteReply, ExecuteRequest, KernelStatus, Message};
use mock::make_service_manager;
use parking_lot::Mutex;
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

fn setup() -> (ServiceManager, KernelHandle) {
    let _ = env_logger::builder().is_test(true).try_init();
    let services = make_service_manager().expect("mock services");
    let kernel: KernelHandle = services.kernels().start_new(None);
    services.run_until_idle();
    (services, kernel)
}

fn describe(msg: &Message) -> String {
    if let Some(state) = msg.content.execution_state() {
        return format!("status={state}");
    }
    if let Some(reply) = msg.content.as_execute_reply() {
        return match reply {
            ExecuteReply::Ok {
                execution_count, ..
            } => format!("reply=ok#{execution_count}"),
            ExecuteReply::Error { ename, .. } => format!("reply=error:{ename}"),
        };
    }
    msg.msg_type().to_string()
}

fn trace(kernel: &KernelHandle, code: &str, stop_on_error: bool, log: &Log) {
    let request =
        kernel.request_execute(ExecuteRequest::new(code).stop_on_error(stop_on_error), true);
    let label = code.to_owned();
    let sink = Arc::clone(log);
    request.on_iopub(move |msg| sink.lock().push(format!("{label}: {}", describe(msg))));
    let label = code.to_owned();
    let sink = Arc::clone(log);
    request.on_reply(move |msg| sink.lock().push(format!("{label}: {}", describe(msg))));
}

#[test]
fn valid_execute_broadcasts_busy_stream_idle_then_one_reply() {
    let (services, kernel) = setup();
    let log: Log = Arc::default();
    trace(&kernel, "x", false, &log);

    services.run_until_idle();

    assert_eq!(
        *log.lock(),
        vec![
            "x: status=busy",
            "x: stream",
            "x: status=idle",
            "x: reply=ok#1",
        ]
    );
}

#[test]
fn stop_on_error_preempts_pending_executes_in_order() {
    let (services, kernel) = setup();
    let log: Log = Arc::default();
    trace(&kernel, "trigger execute error", true, &log);
    trace(&kernel, "second", false, &log);
    trace(&kernel, "third", false, &log);

    services.run_until_idle();

    assert_eq!(
        *log.lock(),
        vec![
            "trigger execute error: status=busy",
            "trigger execute error: stream",
            "trigger execute error: status=idle",
            "trigger execute error: reply=error:mock",
            "second: reply=error:mock",
            "second: status=idle",
            "third: reply=error:mock",
            "third: status=idle",
        ]
    );

    trace(&kernel, "after", false, &log);
    services.run_until_idle();
    assert_eq!(
        log.lock().last().map(String::as_str),
        Some("after: reply=ok#1"),
        "preempted requests never advance the counter"
    );
}

#[test]
fn disposed_future_produces_no_events() {
    let (services, kernel) = setup();
    let log: Log = Arc::default();
    let broadcasts = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&broadcasts);
    kernel.iopub_message().connect(move |_| *sink.lock() += 1);

    let future = kernel.request_execute(ExecuteRequest::new("x"), false);
    let sink = Arc::clone(&log);
    future.on_iopub(move |msg| sink.lock().push(describe(msg)));
    future.dispose();
    services.run_until_idle();

    assert!(log.lock().is_empty());
    assert_eq!(*broadcasts.lock(), 0);
    assert_eq!(future.done().now_or_never(), Some(None));
}

#[test]
fn shutdown_twice_equals_once() {
    let (services, kernel) = setup();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    kernel
        .status_changed()
        .connect(move |status| sink.lock().push(format!("status={status}")));
    let sink = Arc::clone(&events);
    kernel
        .disposed()
        .connect(move |_| sink.lock().push("disposed".to_owned()));

    services.kernels().shutdown(kernel.id()).expect("running kernel");
    let _ = kernel.shutdown();
    kernel.dispose();
    services.run_until_idle();

    assert_eq!(*events.lock(), vec!["status=dead", "disposed"]);
    assert!(services.kernels().shutdown(kernel.id()).is_err());
}

#[test]
fn two_status_listeners_see_each_transition_once_in_order() {
    let _ = env_logger::builder().is_test(true).try_init();
    let services = make_service_manager().expect("mock services");
    let kernel = services
        .kernels()
        .start_new(Some(KernelModelOptions::named("shell")));
    let listeners: Vec<Arc<Mutex<Vec<KernelStatus>>>> = (0..2)
        .map(|_| {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            kernel
                .status_changed()
                .connect(move |status| sink.lock().push(*status));
            seen
        })
        .collect();

    services.run_until_idle();
    kernel.request_execute(ExecuteRequest::new("1"), true);
    let _ = kernel.restart();
    services.run_until_idle();

    let expected = vec![
        KernelStatus::Idle,
        KernelStatus::Busy,
        KernelStatus::Idle,
        KernelStatus::Restarting,
        KernelStatus::Idle,
    ];
    for seen in listeners {
        assert_eq!(*seen.lock(), expected);
    }
}

#[test]
fn unknown_spec_uses_default_language_and_banner() {
    let _ = env_logger::builder().is_test(true).try_init();
    let services = make_service_manager().expect("mock services");
    let kernel = services
        .kernels()
        .start_new(Some(KernelModelOptions::named("no-such-language")));

    let info = kernel.request_kernel_info();
    let reply = info.done().now_or_never().flatten().expect("kernel info reply");

    assert_eq!(kernel.spec().language, "python");
    assert_eq!(kernel.info().banner, "Mock Python Kernel");
    assert_eq!(reply.channel, Channel::Shell);
    assert_eq!(
        serde_json::to_value(&reply.content).expect("serialize")["banner"],
        "Mock Python Kernel"
    );
}
