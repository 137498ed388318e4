#![allow(missing_docs)]

//! In-process kernel that speaks the request/reply/broadcast protocol
//! without a server behind it.
//!
//! Execute requests and lifecycle transitions run on the shared
//! [`Scheduler`]: they are queued when sent and answered on a later turn, so
//! callers can attach handlers before any message arrives. Other request
//! types are answered before `send_shell_message` returns.

mod script;

use coop_runtime::{Scheduler, Signal};
use kernel_abi::{
    new_id, Completion, KernelConfig, KernelConnection, KernelFuture, KernelHandle,
    KernelModelOptions, KernelSpec, KernelSpecRegistry, RunningKernels,
};
use kernel_messages::{
    Channel, CommInfoRequest, CompleteRequest, Content, ExecuteReply, ExecuteRequest, Header,
    HistoryRequest, InspectRequest, IsCompleteRequest, KernelInfo, KernelInfoRequest,
    KernelStatus, Message, MessageType,
};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Shared context handed to every kernel a manager starts.
#[derive(Clone)]
pub struct KernelEnv {
    pub scheduler: Scheduler,
    pub registry: RunningKernels,
    pub specs: Arc<KernelSpecRegistry>,
    pub config: KernelConfig,
}

impl KernelEnv {
    pub fn new(scheduler: Scheduler, config: KernelConfig) -> Self {
        Self {
            scheduler,
            registry: RunningKernels::new(),
            specs: Arc::new(KernelSpecRegistry::builtin()),
            config,
        }
    }

    pub fn with_specs(mut self, specs: KernelSpecRegistry) -> Self {
        self.specs = Arc::new(specs);
        self
    }
}

impl Default for KernelEnv {
    fn default() -> Self {
        Self::new(Scheduler::new(), KernelConfig::default())
    }
}

struct KernelState {
    status: KernelStatus,
    // Outstanding futures in send order; the front one receives
    // server-originated messages.
    pending: VecDeque<KernelFuture>,
    execution_count: u32,
    disposed: bool,
}

/// Simulated kernel connection.
pub struct SimKernel {
    weak_self: Weak<SimKernel>,
    id: String,
    name: String,
    spec: KernelSpec,
    info: KernelInfo,
    config: KernelConfig,
    scheduler: Scheduler,
    registry: RunningKernels,
    state: Mutex<KernelState>,
    status_changed: Signal<KernelStatus>,
    iopub_message: Signal<Message>,
    unhandled_message: Signal<Message>,
    disposed: Signal<()>,
}

impl SimKernel {
    /// Creates a kernel, registers it in `env.registry` and schedules its
    /// first transition to `idle`.
    ///
    /// Unknown spec names fall back to the registry default; the requested
    /// name is kept on the model.
    pub fn start(options: KernelModelOptions, env: &KernelEnv) -> Arc<SimKernel> {
        let id = options.id.unwrap_or_else(new_id);
        let name = options
            .name
            .unwrap_or_else(|| env.config.default_spec.clone());
        let resolved = env.specs.resolve(&name);
        if resolved.spec.name != name {
            debug!(
                "kernel {id}: no spec named {name}, using {}",
                resolved.spec.name
            );
        }

        let kernel = Arc::new_cyclic(|weak_self| SimKernel {
            weak_self: weak_self.clone(),
            id,
            name,
            spec: resolved.spec.clone(),
            info: resolved.info.clone(),
            config: env.config.clone(),
            scheduler: env.scheduler.clone(),
            registry: env.registry.clone(),
            state: Mutex::new(KernelState {
                status: KernelStatus::Unknown,
                pending: VecDeque::new(),
                execution_count: 0,
                disposed: false,
            }),
            status_changed: Signal::new(),
            iopub_message: Signal::new(),
            unhandled_message: Signal::new(),
            disposed: Signal::new(),
        });

        let handle: KernelHandle = kernel.clone();
        env.registry.insert(handle);
        kernel.defer(|kernel| kernel.set_status(KernelStatus::Idle));
        debug!("kernel {}: started ({})", kernel.id, kernel.spec.name);
        kernel
    }

    /// Number of successful executions so far. Error replies, including the
    /// sentinel without `stop_on_error`, never advance it.
    pub fn execution_count(&self) -> u32 {
        self.state.lock().execution_count
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Message ids of the outstanding requests, oldest first.
    pub fn pending_msg_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|future| future.msg_id().to_owned())
            .collect()
    }

    /// Injects a message as if the server had sent it.
    ///
    /// The message is parented to the oldest outstanding request and routed
    /// through that request's future. With nothing outstanding, iopub
    /// messages are still broadcast and shell/stdin messages go to
    /// `unhandled_message`.
    pub fn send_server_message(&self, msg_type: MessageType, channel: Channel, content: Content) {
        if self.is_disposed() {
            warn!("kernel {}: ignoring server message on disposed kernel", self.id);
            return;
        }
        let oldest = self.state.lock().pending.front().cloned();
        if let Some(future) = oldest {
            self.deliver(msg_type, channel, content, &future);
            return;
        }

        let msg = Message::new(channel, self.header(msg_type), content);
        self.apply_status(&msg);
        match channel {
            Channel::Iopub => self.iopub_message.emit(&msg),
            Channel::Shell | Channel::Stdin => {
                debug!(
                    "kernel {}: unhandled {} on {:?}",
                    self.id,
                    msg.msg_type(),
                    channel
                );
                self.unhandled_message.emit(&msg);
            }
        }
    }

    /// Builds a message parented to `future`'s request and routes it.
    ///
    /// Status broadcasts update the kernel status before anything else sees
    /// them. Iopub messages go to every `iopub_message` listener, then to the
    /// future. The future leaves the pending queue once it is done.
    pub fn deliver(
        &self,
        msg_type: MessageType,
        channel: Channel,
        content: Content,
        future: &KernelFuture,
    ) {
        if self.is_disposed() || future.is_disposed() {
            trace!(
                "kernel {}: dropping {msg_type} for {}",
                self.id,
                future.msg_id()
            );
            return;
        }
        let msg =
            Message::new(channel, self.header(msg_type), content).with_parent(&future.msg().header);
        self.apply_status(&msg);
        if channel == Channel::Iopub {
            self.iopub_message.emit(&msg);
        }
        future.handle_message(&msg);
        if future.is_done() {
            self.remove_pending(future.msg_id());
        }
    }

    fn header(&self, msg_type: MessageType) -> Header {
        Header::new(msg_type, &self.config.client_id, &self.config.username)
    }

    fn request(&self, msg_type: MessageType, content: Content) -> Message {
        Message::request(
            msg_type,
            content,
            &self.config.client_id,
            &self.config.username,
        )
    }

    fn apply_status(&self, msg: &Message) {
        if *msg.msg_type() != MessageType::Status {
            return;
        }
        if let Some(status) = msg.content.execution_state() {
            self.set_status(status);
        }
    }

    fn set_status(&self, status: KernelStatus) {
        {
            let mut state = self.state.lock();
            if state.disposed || state.status == status {
                return;
            }
            state.status = status;
        }
        debug!("kernel {}: status {status}", self.id);
        self.status_changed.emit(&status);
    }

    /// Runs `task` on a later scheduler turn unless the kernel is disposed
    /// by then.
    fn defer<F>(&self, task: F)
    where
        F: FnOnce(&SimKernel) + Send + 'static,
    {
        if self.is_disposed() {
            return;
        }
        let weak = self.weak_self.clone();
        self.scheduler.schedule(move || {
            if let Some(kernel) = weak.upgrade() {
                if !kernel.is_disposed() {
                    task(&kernel);
                }
            }
        });
    }

    fn submit(&self, msg: Message, expects_reply: bool, dispose_on_done: bool) -> KernelFuture {
        let future = KernelFuture::new(msg, expects_reply, dispose_on_done);
        if self.is_disposed() {
            future.dispose();
            return future;
        }
        let weak = self.weak_self.clone();
        future.disposed().connect(move |msg_id| {
            if let Some(kernel) = weak.upgrade() {
                kernel.remove_pending(msg_id);
            }
        });
        if !future.is_disposed() {
            self.state.lock().pending.push_back(future.clone());
        }
        future
    }

    fn remove_pending(&self, msg_id: &str) -> bool {
        let mut state = self.state.lock();
        match state.pending.iter().position(|f| f.msg_id() == msg_id) {
            Some(index) => {
                state.pending.remove(index);
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, future: &KernelFuture) {
        let msg_type = future.msg().msg_type().clone();
        if msg_type == MessageType::ExecuteRequest {
            let future = future.clone();
            self.defer(move |kernel| kernel.run_execute(&future));
            return;
        }
        match script::canned_reply(future.msg(), &self.info) {
            Some(content) => self.deliver(msg_type.reply_type(), Channel::Shell, content, future),
            None => trace!(
                "kernel {}: {msg_type} waits for a server reply",
                self.id
            ),
        }
    }

    fn run_execute(&self, future: &KernelFuture) {
        if future.is_disposed() || future.is_done() {
            trace!("kernel {}: skipping retired {}", self.id, future.msg_id());
            return;
        }
        let (code, stop_on_error) = match future.msg().content.as_execute_request() {
            Some(request) => (request.code.as_str(), request.stop_on_error),
            None => ("", false),
        };
        trace!("kernel {}: executing {}", self.id, future.msg_id());

        self.deliver(
            MessageType::Status,
            Channel::Iopub,
            Content::status(KernelStatus::Busy),
            future,
        );
        self.deliver(
            MessageType::Stream,
            Channel::Iopub,
            script::stdout(&self.config.stream_text),
            future,
        );
        self.deliver(
            MessageType::Status,
            Channel::Iopub,
            Content::status(KernelStatus::Idle),
            future,
        );
        // Already done when the server replied before this turn.
        if self.is_disposed() || future.is_disposed() || future.is_done() {
            return;
        }

        if code == self.config.error_sentinel {
            let reply = script::error_reply();
            self.deliver(
                MessageType::ExecuteReply,
                Channel::Shell,
                Content::ExecuteReply(reply.clone()),
                future,
            );
            if stop_on_error {
                self.abort_queued_executes(&reply);
            }
            return;
        }

        let execution_count = {
            let mut state = self.state.lock();
            state.execution_count += 1;
            state.execution_count
        };
        self.deliver(
            MessageType::ExecuteReply,
            Channel::Shell,
            Content::ExecuteReply(script::ok_reply(execution_count)),
            future,
        );
    }

    /// Fails every execute request still queued, oldest first, with the
    /// same error reply followed by an `idle` broadcast.
    fn abort_queued_executes(&self, reply: &ExecuteReply) {
        let queued: SmallVec<[KernelFuture; 4]> = self
            .state
            .lock()
            .pending
            .iter()
            .filter(|future| *future.msg().msg_type() == MessageType::ExecuteRequest)
            .cloned()
            .collect();
        if !queued.is_empty() {
            debug!(
                "kernel {}: stop_on_error aborts {} queued executes",
                self.id,
                queued.len()
            );
        }
        for future in &queued {
            self.deliver(
                MessageType::ExecuteReply,
                Channel::Shell,
                Content::ExecuteReply(reply.clone()),
                future,
            );
            self.deliver(
                MessageType::Status,
                Channel::Iopub,
                Content::status(KernelStatus::Idle),
                future,
            );
        }
    }

    /// Passes through `via` and back to `idle` on a later turn.
    fn transition_through(&self, via: KernelStatus) -> Completion {
        if self.is_disposed() {
            return Completion::ready();
        }
        let (done, completion) = Completion::channel();
        self.defer(move |kernel| {
            kernel.set_status(via);
            kernel.set_status(KernelStatus::Idle);
            let _ = done.send(());
        });
        completion
    }

    fn unregister(&self) {
        let Some(entry) = self.registry.get(&self.id) else {
            return;
        };
        let same = std::ptr::eq(
            Arc::as_ptr(&entry) as *const (),
            self as *const SimKernel as *const (),
        );
        drop(entry);
        if same {
            self.registry.remove(&self.id);
        }
    }
}

impl KernelConnection for SimKernel {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn username(&self) -> &str {
        &self.config.username
    }

    fn status(&self) -> KernelStatus {
        self.state.lock().status
    }

    fn spec(&self) -> &KernelSpec {
        &self.spec
    }

    fn info(&self) -> &KernelInfo {
        &self.info
    }

    fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn status_changed(&self) -> &Signal<KernelStatus> {
        &self.status_changed
    }

    fn iopub_message(&self) -> &Signal<Message> {
        &self.iopub_message
    }

    fn unhandled_message(&self) -> &Signal<Message> {
        &self.unhandled_message
    }

    fn disposed(&self) -> &Signal<()> {
        &self.disposed
    }

    fn send_shell_message(
        &self,
        msg: Message,
        expects_reply: bool,
        dispose_on_done: bool,
    ) -> KernelFuture {
        trace!("kernel {}: send {} {}", self.id, msg.msg_type(), msg.msg_id());
        let future = self.submit(msg, expects_reply, dispose_on_done);
        if !future.is_disposed() {
            self.dispatch(&future);
        }
        future
    }

    fn request_execute(&self, content: ExecuteRequest, dispose_on_done: bool) -> KernelFuture {
        let msg = self.request(MessageType::ExecuteRequest, Content::ExecuteRequest(content));
        self.send_shell_message(msg, true, dispose_on_done)
    }

    fn request_complete(&self, content: CompleteRequest) -> KernelFuture {
        let msg = self.request(
            MessageType::CompleteRequest,
            Content::CompleteRequest(content),
        );
        self.send_shell_message(msg, true, true)
    }

    fn request_inspect(&self, content: InspectRequest) -> KernelFuture {
        let msg = self.request(MessageType::InspectRequest, Content::InspectRequest(content));
        self.send_shell_message(msg, true, true)
    }

    fn request_history(&self, content: HistoryRequest) -> KernelFuture {
        let msg = self.request(MessageType::HistoryRequest, Content::HistoryRequest(content));
        self.send_shell_message(msg, true, true)
    }

    fn request_is_complete(&self, content: IsCompleteRequest) -> KernelFuture {
        let msg = self.request(
            MessageType::IsCompleteRequest,
            Content::IsCompleteRequest(content),
        );
        self.send_shell_message(msg, true, true)
    }

    fn request_comm_info(&self, content: CommInfoRequest) -> KernelFuture {
        let msg = self.request(MessageType::CommInfoRequest, Content::CommInfoRequest(content));
        self.send_shell_message(msg, true, true)
    }

    fn request_kernel_info(&self) -> KernelFuture {
        let msg = self.request(
            MessageType::KernelInfoRequest,
            Content::KernelInfoRequest(KernelInfoRequest {}),
        );
        self.send_shell_message(msg, true, true)
    }

    fn interrupt(&self) -> Completion {
        self.transition_through(KernelStatus::Busy)
    }

    fn restart(&self) -> Completion {
        self.transition_through(KernelStatus::Restarting)
    }

    fn reconnect(&self) -> Completion {
        self.transition_through(KernelStatus::Reconnecting)
    }

    fn shutdown(&self) -> Completion {
        if !self.is_disposed() {
            debug!("kernel {}: shutdown", self.id);
            self.set_status(KernelStatus::Dead);
            self.dispose();
        }
        Completion::ready()
    }

    fn dispose(&self) {
        let pending = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.pending)
        };
        debug!(
            "kernel {}: disposed with {} pending requests",
            self.id,
            pending.len()
        );
        for future in pending {
            future.dispose();
        }
        self.unregister();
        self.disposed.emit(&());
        self.status_changed.disconnect_all();
        self.iopub_message.disconnect_all();
        self.unhandled_message.disconnect_all();
        self.disposed.disconnect_all();
    }
}

impl std::fmt::Debug for SimKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimKernel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}
