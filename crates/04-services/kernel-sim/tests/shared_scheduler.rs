use kernel_abi::{KernelConnection, KernelHandle, KernelModelOptions};
use kernel_messages::{ExecuteReply, ExecuteRequest, Message};
use kernel_sim::{KernelEnv, SimKernel};
use parking_lot::Mutex;
use std::sync::Arc;

fn execution_count(msg: &Message) -> Option<u32> {
    match msg.content.as_execute_reply()? {
        ExecuteReply::Ok {
            execution_count, ..
        } => Some(*execution_count),
        ExecuteReply::Error { .. } => None,
    }
}

#[test]
fn kernels_on_one_scheduler_interleave_in_submission_order() {
    let _ = env_logger::builder().is_test(true).try_init();
    let env = KernelEnv::default();
    let left = SimKernel::start(KernelModelOptions::named("python"), &env);
    let right = SimKernel::start(KernelModelOptions::named("shell"), &env);
    env.scheduler.run_until_idle();

    let order = Arc::new(Mutex::new(Vec::new()));
    for (label, kernel) in [("left", &left), ("right", &right), ("left", &left)] {
        let future = kernel.request_execute(ExecuteRequest::new("1"), true);
        let log = Arc::clone(&order);
        future.on_reply(move |msg| log.lock().push((label, execution_count(msg))));
    }
    env.scheduler.run_until_idle();

    assert_eq!(
        *order.lock(),
        vec![("left", Some(1)), ("right", Some(1)), ("left", Some(2))]
    );
    assert_eq!(env.registry.len(), 2);
}

#[test]
fn reply_handler_may_submit_follow_up_requests() {
    let _ = env_logger::builder().is_test(true).try_init();
    let env = KernelEnv::default();
    let kernel = SimKernel::start(KernelModelOptions::default(), &env);
    let handle: KernelHandle = kernel.clone();

    let follow_up = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&follow_up);
    let first = handle.request_execute(ExecuteRequest::new("first"), true);
    first.on_reply(move |_| {
        *slot.lock() = Some(handle.request_execute(ExecuteRequest::new("second"), false));
    });

    let ran = env.scheduler.run_until_idle();
    assert!(ran >= 3, "start, first and second each take a turn");

    let second = follow_up.lock().take().expect("handler ran");
    assert_eq!(second.reply().as_ref().and_then(execution_count), Some(2));
    assert_eq!(kernel.execution_count(), 2);
}

#[test]
fn iopub_listener_may_shut_the_kernel_down_mid_execute() {
    let _ = env_logger::builder().is_test(true).try_init();
    let env = KernelEnv::default();
    let kernel = SimKernel::start(KernelModelOptions::default(), &env);
    env.scheduler.run_until_idle();

    let weak = Arc::downgrade(&kernel);
    kernel.iopub_message().connect(move |_| {
        if let Some(kernel) = weak.upgrade() {
            kernel.shutdown();
        }
    });
    let future = kernel.request_execute(ExecuteRequest::new("1"), false);
    env.scheduler.run_until_idle();

    assert!(kernel.is_disposed());
    assert!(future.reply().is_none());
    assert!(future.is_disposed());
    assert_eq!(kernel.execution_count(), 0);
    assert!(env.registry.is_empty());
}
