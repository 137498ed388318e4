use crate::kernels::KernelManager;
use coop_runtime::{Signal, SubscriptionId};
use kernel_abi::{
    new_id, KernelConnection, KernelHandle, KernelModel, KernelModelOptions, ManagerError,
    ManagerResult, SessionModel,
};
use kernel_messages::{KernelStatus, Message};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

const DEFAULT_SESSION_TYPE: &str = "notebook";

/// Parameters for [`SessionManager::start_new`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub path: String,
    /// Defaults to `path`.
    pub name: Option<String>,
    /// Defaults to `"notebook"`.
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    pub kernel: Option<KernelModelOptions>,
}

impl SessionOptions {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_kernel(mut self, kernel: KernelModelOptions) -> Self {
        self.kernel = Some(kernel);
        self
    }
}

/// Session field reported by [`SessionConnection::property_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionProperty {
    Path,
    Name,
    Type,
}

/// Payload of [`SessionConnection::kernel_changed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelChange {
    pub old: Option<KernelModel>,
    pub new: KernelModel,
}

struct Relay {
    status: SubscriptionId,
    iopub: SubscriptionId,
}

struct SessionState {
    model: SessionModel,
    kernel: Option<KernelHandle>,
    relay: Option<Relay>,
    disposed: bool,
}

/// A document path bound to a kernel.
///
/// Kernel status and iopub traffic are re-emitted on the session's own
/// signals, so listeners survive a kernel change.
pub struct SessionConnection {
    weak_self: Weak<SessionConnection>,
    kernels: KernelManager,
    state: Mutex<SessionState>,
    status_changed: Signal<KernelStatus>,
    iopub_message: Signal<Message>,
    property_changed: Signal<SessionProperty>,
    kernel_changed: Signal<KernelChange>,
    disposed: Signal<()>,
}

impl SessionConnection {
    fn start(options: SessionOptions, kernels: &KernelManager) -> Arc<Self> {
        let kernel: KernelHandle = kernels.start_new(options.kernel);
        let name = options.name.unwrap_or_else(|| options.path.clone());
        let model = SessionModel {
            id: new_id(),
            path: options.path,
            name,
            session_type: options
                .session_type
                .unwrap_or_else(|| DEFAULT_SESSION_TYPE.to_owned()),
            kernel: Some(kernel.model()),
        };
        debug!("session {}: started for {}", model.id, model.path);

        let session = Arc::new_cyclic(|weak_self| SessionConnection {
            weak_self: weak_self.clone(),
            kernels: kernels.clone(),
            state: Mutex::new(SessionState {
                model,
                kernel: None,
                relay: None,
                disposed: false,
            }),
            status_changed: Signal::new(),
            iopub_message: Signal::new(),
            property_changed: Signal::new(),
            kernel_changed: Signal::new(),
            disposed: Signal::new(),
        });
        session.attach(kernel);
        session
    }

    pub fn model(&self) -> SessionModel {
        self.state.lock().model.clone()
    }

    pub fn id(&self) -> String {
        self.state.lock().model.id.clone()
    }

    pub fn path(&self) -> String {
        self.state.lock().model.path.clone()
    }

    pub fn name(&self) -> String {
        self.state.lock().model.name.clone()
    }

    pub fn session_type(&self) -> String {
        self.state.lock().model.session_type.clone()
    }

    /// The kernel currently bound to the session; `None` once shut down.
    pub fn kernel(&self) -> Option<KernelHandle> {
        self.state.lock().kernel.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn status_changed(&self) -> &Signal<KernelStatus> {
        &self.status_changed
    }

    pub fn iopub_message(&self) -> &Signal<Message> {
        &self.iopub_message
    }

    pub fn property_changed(&self) -> &Signal<SessionProperty> {
        &self.property_changed
    }

    pub fn kernel_changed(&self) -> &Signal<KernelChange> {
        &self.kernel_changed
    }

    pub fn disposed(&self) -> &Signal<()> {
        &self.disposed
    }

    pub fn set_path(&self, path: impl Into<String>) {
        let path = path.into();
        self.update(SessionProperty::Path, |model| {
            std::mem::replace(&mut model.path, path) != model.path
        });
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(SessionProperty::Name, |model| {
            std::mem::replace(&mut model.name, name) != model.name
        });
    }

    pub fn set_type(&self, session_type: impl Into<String>) {
        let session_type = session_type.into();
        self.update(SessionProperty::Type, |model| {
            std::mem::replace(&mut model.session_type, session_type) != model.session_type
        });
    }

    /// Shuts the current kernel down and binds a freshly started one.
    ///
    /// Returns `None` on a disposed session.
    pub fn change_kernel(&self, options: KernelModelOptions) -> Option<KernelHandle> {
        let old = {
            let mut state = self.state.lock();
            if state.disposed {
                return None;
            }
            state.kernel.take()
        };
        let old_model = old.as_ref().map(|kernel| {
            self.detach(kernel.as_ref());
            let model = kernel.model();
            let _ = kernel.shutdown();
            model
        });

        let kernel: KernelHandle = self.kernels.start_new(Some(options));
        let new_model = kernel.model();
        self.state.lock().model.kernel = Some(new_model.clone());
        self.attach(Arc::clone(&kernel));
        debug!(
            "session {}: kernel {:?} -> {}",
            self.id(),
            old_model.as_ref().map(|model| &model.id),
            new_model.id
        );
        self.kernel_changed.emit(&KernelChange {
            old: old_model,
            new: new_model,
        });
        Some(kernel)
    }

    /// Shuts the kernel down and disposes the session. Idempotent.
    pub fn shutdown(&self) {
        let kernel = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.kernel.take()
        };
        if let Some(kernel) = kernel {
            self.detach(kernel.as_ref());
            let _ = kernel.shutdown();
        }
        debug!("session {}: shut down", self.id());
        self.disposed.emit(&());
        self.status_changed.disconnect_all();
        self.iopub_message.disconnect_all();
        self.property_changed.disconnect_all();
        self.kernel_changed.disconnect_all();
        self.disposed.disconnect_all();
    }

    fn update<F>(&self, property: SessionProperty, apply: F)
    where
        F: FnOnce(&mut SessionModel) -> bool,
    {
        let changed = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            apply(&mut state.model)
        };
        if changed {
            self.property_changed.emit(&property);
        }
    }

    fn attach(&self, kernel: KernelHandle) {
        let weak = self.weak_self.clone();
        let status = kernel.status_changed().connect(move |status| {
            if let Some(session) = weak.upgrade() {
                session.status_changed.emit(status);
            }
        });
        let weak = self.weak_self.clone();
        let iopub = kernel.iopub_message().connect(move |msg| {
            if let Some(session) = weak.upgrade() {
                session.iopub_message.emit(msg);
            }
        });
        let mut state = self.state.lock();
        state.relay = Some(Relay { status, iopub });
        state.kernel = Some(kernel);
    }

    fn detach(&self, kernel: &dyn KernelConnection) {
        if let Some(relay) = self.state.lock().relay.take() {
            kernel.status_changed().disconnect(relay.status);
            kernel.iopub_message().disconnect(relay.iopub);
        }
    }
}

struct SessionsInner {
    kernels: KernelManager,
    sessions: Mutex<BTreeMap<String, Arc<SessionConnection>>>,
    running_changed: Signal<Vec<SessionModel>>,
}

impl SessionsInner {
    fn notify(&self) {
        let models = self.models();
        self.running_changed.emit(&models);
    }

    fn models(&self) -> Vec<SessionModel> {
        let sessions: Vec<_> = self.sessions.lock().values().cloned().collect();
        sessions.iter().map(|session| session.model()).collect()
    }
}

/// Starts, finds and shuts down sessions. Clones share one table.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionsInner>,
}

impl SessionManager {
    pub fn new(kernels: KernelManager) -> Self {
        Self {
            inner: Arc::new(SessionsInner {
                kernels,
                sessions: Mutex::new(BTreeMap::new()),
                running_changed: Signal::new(),
            }),
        }
    }

    /// Starts a session together with a new kernel.
    pub fn start_new(&self, options: SessionOptions) -> Arc<SessionConnection> {
        let session = SessionConnection::start(options, &self.inner.kernels);
        let id = session.id();
        let weak: Weak<SessionsInner> = Arc::downgrade(&self.inner);
        let key = id.clone();
        session.disposed().connect(move |_| {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.sessions.lock().remove(&key);
                if removed.is_some() {
                    inner.notify();
                }
            }
        });
        self.inner
            .sessions
            .lock()
            .insert(id, Arc::clone(&session));
        self.inner.notify();
        session
    }

    /// Models of the running sessions, ordered by id.
    pub fn running(&self) -> Vec<SessionModel> {
        self.inner.models()
    }

    pub fn find_by_id(&self, id: &str) -> Option<SessionModel> {
        let session = self.inner.sessions.lock().get(id).cloned();
        session.map(|session| session.model())
    }

    pub fn find_by_path(&self, path: &str) -> Option<SessionModel> {
        self.running().into_iter().find(|model| model.path == path)
    }

    pub fn connect_to(&self, id: &str) -> ManagerResult<Arc<SessionConnection>> {
        self.inner
            .sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ManagerError::SessionNotFound(id.to_owned()))
    }

    pub fn shutdown(&self, id: &str) -> ManagerResult<()> {
        self.connect_to(id)?.shutdown();
        Ok(())
    }

    pub fn shutdown_all(&self) {
        let sessions: Vec<_> = self.inner.sessions.lock().values().cloned().collect();
        for session in sessions {
            session.shutdown();
        }
    }

    /// Shuts down every session open on `path`. Nothing happens when there
    /// is none.
    pub fn stop_if_needed(&self, path: &str) {
        let matching: SmallVec<[Arc<SessionConnection>; 2]> = self
            .inner
            .sessions
            .lock()
            .values()
            .filter(|session| session.path() == path)
            .cloned()
            .collect();
        for session in matching {
            debug!("session manager: stopping {} at {path}", session.id());
            session.shutdown();
        }
    }

    pub fn running_changed(&self) -> &Signal<Vec<SessionModel>> {
        &self.inner.running_changed
    }
}
