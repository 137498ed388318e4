//! End-to-end scenarios for the simulated kernel stack.

#[cfg(test)]
mod protocol_e2e;

#[cfg(test)]
mod wire_json;

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use hub::{KernelConnection, KernelModelOptions, SessionOptions};
    use kernel_abi::KernelConfig;
    use kernel_messages::{ExecuteReply, ExecuteRequest, KernelStatus};
    use mock::{make_service_manager, make_service_manager_with};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn notebook_session_runs_cells_until_shutdown() {
        init_logging();
        let services = make_service_manager().expect("mock services");
        let session = services
            .sessions()
            .start_new(SessionOptions::for_path("Untitled.ipynb"));
        services.run_until_idle();
        let kernel = session.kernel().expect("bound kernel");
        assert_eq!(kernel.status(), KernelStatus::Idle);

        let cells: Vec<_> = ["a = 1", "b = 2", "a + b"]
            .into_iter()
            .map(|code| kernel.request_execute(ExecuteRequest::new(code), true))
            .collect();
        services.run_until_idle();

        let counts: Vec<_> = cells
            .iter()
            .map(|cell| match block_on(cell.done()).and_then(|reply| reply.content.as_execute_reply().cloned()) {
                Some(ExecuteReply::Ok {
                    execution_count, ..
                }) => execution_count,
                other => panic!("unexpected reply {other:?}"),
            })
            .collect();
        assert_eq!(counts, vec![1, 2, 3]);

        services.sessions().shutdown(&session.id()).expect("running session");
        assert!(kernel.is_disposed());
        assert!(services.kernels().running().is_empty());
    }

    #[test]
    fn model_reflects_last_start_and_change() {
        init_logging();
        let services = make_service_manager().expect("mock services");
        let kernel = services
            .kernels()
            .start_new(Some(KernelModelOptions::named("python").with_id("first")));
        assert_eq!((kernel.model().id.as_str(), kernel.model().name.as_str()), ("first", "python"));

        let session = services
            .sessions()
            .start_new(SessionOptions::for_path("s.ipynb"));
        session.change_kernel(KernelModelOptions::named("shell").with_id("one"));
        session.change_kernel(KernelModelOptions::named("julia").with_id("two"));

        let bound = session.model().kernel.expect("kernel model");
        assert_eq!((bound.id.as_str(), bound.name.as_str()), ("two", "julia"));
        let current = session.kernel().expect("bound kernel");
        assert_eq!(current.spec().name, "python", "unknown spec falls back");
        assert_eq!(
            services.sessions().find_by_id(&session.id()).and_then(|m| m.kernel),
            Some(bound)
        );
    }

    #[test]
    fn configured_text_and_sentinel_drive_scripted_replies() {
        init_logging();
        let config = KernelConfig {
            error_sentinel: "boom".into(),
            stream_text: "hello".into(),
            ..KernelConfig::default()
        };
        let services = make_service_manager_with(config).expect("mock services");
        let kernel = services.kernels().start_new(None);

        let streamed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&streamed);
        kernel.iopub_message().connect(move |msg| {
            if let Some(stream) = msg.content.as_stream() {
                sink.lock().push(stream.text.clone());
            }
        });
        let failing = kernel.request_execute(ExecuteRequest::new("boom"), true);
        let passing = kernel.request_execute(ExecuteRequest::new("trigger execute error"), true);
        services.run_until_idle();

        assert_eq!(*streamed.lock(), vec!["hello", "hello"]);
        let failed = block_on(failing.done()).expect("reply");
        assert!(!failed.content.as_execute_reply().is_some_and(ExecuteReply::is_ok));
        let passed = block_on(passing.done()).expect("reply");
        assert!(passed.content.as_execute_reply().is_some_and(ExecuteReply::is_ok));
    }
}
