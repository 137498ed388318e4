//! Per-request futures and lifecycle completions.

use coop_runtime::Signal;
use futures::channel::oneshot;
use futures::future::Shared;
use futures::FutureExt;
use kernel_messages::{Channel, KernelStatus, Message, MessageType};
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Callback invoked with messages routed to a [`KernelFuture`].
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

struct FutureState {
    reply: Option<Message>,
    idle_seen: bool,
    completed: bool,
    disposed: bool,
    done_tx: Option<oneshot::Sender<Option<Message>>>,
    on_reply: Option<MessageHandler>,
    on_iopub: Option<MessageHandler>,
    on_stdin: Option<MessageHandler>,
}

struct FutureInner {
    request: Message,
    expects_reply: bool,
    dispose_on_done: bool,
    state: Mutex<FutureState>,
    done: Shared<oneshot::Receiver<Option<Message>>>,
    disposed: Signal<String>,
}

/// Handle for one outstanding request.
///
/// At most one shell reply is accepted. The future is *done* once its reply
/// has arrived and, for execute requests, the kernel has broadcast `idle`
/// for it; futures that expect no reply are done on `idle` alone. After
/// disposal no handler runs again and `done` resolves to `None` if it had
/// not resolved yet.
#[derive(Clone)]
pub struct KernelFuture {
    inner: Arc<FutureInner>,
}

impl KernelFuture {
    pub fn new(request: Message, expects_reply: bool, dispose_on_done: bool) -> Self {
        let (done_tx, done_rx) = oneshot::channel();
        let awaits_idle = *request.msg_type() == MessageType::ExecuteRequest;
        let future = Self {
            inner: Arc::new(FutureInner {
                request,
                expects_reply,
                dispose_on_done,
                state: Mutex::new(FutureState {
                    reply: None,
                    idle_seen: !awaits_idle,
                    completed: false,
                    disposed: false,
                    done_tx: Some(done_tx),
                    on_reply: None,
                    on_iopub: None,
                    on_stdin: None,
                }),
                done: done_rx.shared(),
                disposed: Signal::new(),
            }),
        };
        future.try_complete();
        future
    }

    /// The request this future tracks.
    pub fn msg(&self) -> &Message {
        &self.inner.request
    }

    pub fn msg_id(&self) -> &str {
        self.inner.request.msg_id()
    }

    pub fn expects_reply(&self) -> bool {
        self.inner.expects_reply
    }

    pub fn dispose_on_done(&self) -> bool {
        self.inner.dispose_on_done
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    pub fn is_done(&self) -> bool {
        self.inner.state.lock().completed
    }

    /// The shell reply, once delivered.
    pub fn reply(&self) -> Option<Message> {
        self.inner.state.lock().reply.clone()
    }

    /// Sets the shell reply handler. Ignored once disposed.
    pub fn on_reply<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        if !state.disposed {
            state.on_reply = Some(Arc::new(handler));
        }
    }

    /// Sets the handler for iopub messages parented to this request.
    pub fn on_iopub<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        if !state.disposed {
            state.on_iopub = Some(Arc::new(handler));
        }
    }

    /// Sets the handler for stdin messages parented to this request.
    pub fn on_stdin<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        if !state.disposed {
            state.on_stdin = Some(Arc::new(handler));
        }
    }

    /// Resolves with the reply when the request is done, or `None` if the
    /// future was disposed first.
    pub fn done(&self) -> Done {
        Done {
            inner: self.inner.done.clone(),
        }
    }

    /// Fires once, with the request's message id, when the future is disposed.
    pub fn disposed(&self) -> &Signal<String> {
        &self.inner.disposed
    }

    /// Routes `msg` to the handler for its channel.
    ///
    /// Returns `false` when the message was dropped: the future is disposed,
    /// or `msg` is a second shell reply.
    pub fn handle_message(&self, msg: &Message) -> bool {
        let handler = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return false;
            }
            match msg.channel {
                Channel::Shell => {
                    if state.reply.is_some() {
                        trace!(
                            "future {}: dropping duplicate reply {}",
                            self.msg_id(),
                            msg.msg_type()
                        );
                        return false;
                    }
                    state.reply = Some(msg.clone());
                    state.on_reply.clone()
                }
                Channel::Iopub => {
                    if msg.content.execution_state() == Some(KernelStatus::Idle) {
                        state.idle_seen = true;
                    }
                    state.on_iopub.clone()
                }
                Channel::Stdin => state.on_stdin.clone(),
            }
        };

        if let Some(handler) = handler {
            handler(msg);
        }
        self.try_complete();
        true
    }

    /// Stops all further handler invocation. Idempotent.
    pub fn dispose(&self) {
        let done_tx = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.on_reply = None;
            state.on_iopub = None;
            state.on_stdin = None;
            state.done_tx.take()
        };

        if let Some(tx) = done_tx {
            let _ = tx.send(None);
        }
        trace!("future {}: disposed", self.msg_id());
        self.inner.disposed.emit(&self.msg_id().to_owned());
        self.inner.disposed.disconnect_all();
    }

    fn try_complete(&self) {
        let (done_tx, reply) = {
            let mut state = self.inner.state.lock();
            if state.disposed || state.completed {
                return;
            }
            let replied = state.reply.is_some() || !self.inner.expects_reply;
            if !(replied && state.idle_seen) {
                return;
            }
            state.completed = true;
            (state.done_tx.take(), state.reply.clone())
        };

        if let Some(tx) = done_tx {
            let _ = tx.send(reply);
        }
        if self.inner.dispose_on_done {
            self.dispose();
        }
    }
}

impl fmt::Debug for KernelFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelFuture")
            .field("msg_id", &self.msg_id())
            .field("msg_type", self.msg().msg_type())
            .field("done", &self.is_done())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Future returned by [`KernelFuture::done`]. Cloneable through the handle.
pub struct Done {
    inner: Shared<oneshot::Receiver<Option<Message>>>,
}

impl Future for Done {
    type Output = Option<Message>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx).map(|result| result.ok().flatten())
    }
}

/// Completion of a deferred lifecycle operation (interrupt, restart, …).
///
/// Resolves when the operation has run, or immediately when the kernel was
/// disposed before it could.
pub struct Completion {
    rx: Option<oneshot::Receiver<()>>,
}

impl Completion {
    /// A completion plus the sender that resolves it. Dropping the sender
    /// also resolves it.
    pub fn channel() -> (oneshot::Sender<()>, Completion) {
        let (tx, rx) = oneshot::channel();
        (tx, Completion { rx: Some(rx) })
    }

    /// An already-resolved completion.
    pub fn ready() -> Self {
        Self { rx: None }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.rx.as_mut() {
            Some(rx) => rx.poll_unpin(cx).map(|_| ()),
            None => Poll::Ready(()),
        }
    }
}
