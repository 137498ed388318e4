use crate::future::{Completion, KernelFuture};
use crate::model::KernelModel;
use crate::spec::KernelSpec;
use coop_runtime::Signal;
use kernel_messages::{
    CommInfoRequest, CompleteRequest, ExecuteRequest, HistoryRequest, InspectRequest,
    IsCompleteRequest, KernelInfo, KernelStatus, Message,
};
use std::sync::Arc;

/// Capability set of a kernel connection: status query, lifecycle control
/// and message exchange.
///
/// Implementations never fail: operations on a disposed connection are
/// no-ops whose futures resolve empty.
pub trait KernelConnection: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn model(&self) -> KernelModel {
        KernelModel {
            id: self.id().to_owned(),
            name: self.name().to_owned(),
        }
    }

    /// Client session id stamped into outgoing headers.
    fn client_id(&self) -> &str;

    fn username(&self) -> &str;

    fn status(&self) -> KernelStatus;

    /// Spec the kernel resolved at construction.
    fn spec(&self) -> &KernelSpec;

    /// Info banner answered to `kernel_info_request`.
    fn info(&self) -> &KernelInfo;

    fn is_disposed(&self) -> bool;

    /// Fires once per distinct status transition.
    fn status_changed(&self) -> &Signal<KernelStatus>;

    /// Every iopub message, broadcast to all listeners.
    fn iopub_message(&self) -> &Signal<Message>;

    /// Shell or stdin messages that matched no pending request.
    fn unhandled_message(&self) -> &Signal<Message>;

    /// Fires once when the connection is disposed.
    fn disposed(&self) -> &Signal<()>;

    /// Queues `msg` and returns the future tracking it.
    fn send_shell_message(
        &self,
        msg: Message,
        expects_reply: bool,
        dispose_on_done: bool,
    ) -> KernelFuture;

    fn request_execute(&self, content: ExecuteRequest, dispose_on_done: bool) -> KernelFuture;

    fn request_complete(&self, content: CompleteRequest) -> KernelFuture;

    fn request_inspect(&self, content: InspectRequest) -> KernelFuture;

    fn request_history(&self, content: HistoryRequest) -> KernelFuture;

    fn request_is_complete(&self, content: IsCompleteRequest) -> KernelFuture;

    fn request_comm_info(&self, content: CommInfoRequest) -> KernelFuture;

    fn request_kernel_info(&self) -> KernelFuture;

    fn interrupt(&self) -> Completion;

    fn restart(&self) -> Completion;

    fn reconnect(&self) -> Completion;

    /// Moves to `dead` and disposes. Idempotent.
    fn shutdown(&self) -> Completion;

    /// Releases pending requests and listeners. Idempotent.
    fn dispose(&self);
}

/// Shared handle to any kernel connection implementation.
pub type KernelHandle = Arc<dyn KernelConnection>;
