use crate::connection::KernelHandle;
use crate::model::KernelModel;
use coop_runtime::Signal;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct RegistryInner {
    kernels: Mutex<BTreeMap<String, KernelHandle>>,
    changed: Signal<Vec<KernelModel>>,
}

/// Table of live kernels keyed by id.
///
/// Owned by the kernel manager and shared with every kernel it creates;
/// kernels insert themselves on construction and remove themselves on
/// dispose. Clones share one table.
#[derive(Clone, Default)]
pub struct RunningKernels {
    inner: Arc<RegistryInner>,
}

impl RunningKernels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `kernel` under its id, replacing any previous entry.
    pub fn insert(&self, kernel: KernelHandle) {
        let id = kernel.id().to_owned();
        let replaced = self.inner.kernels.lock().insert(id.clone(), kernel);
        if replaced.is_some() {
            warn!("running kernels: replaced existing entry for {id}");
        }
        debug!("running kernels: added {id}");
        self.notify();
    }

    /// Removes the entry for `id`. Missing ids are ignored.
    pub fn remove(&self, id: &str) -> Option<KernelHandle> {
        let removed = self.inner.kernels.lock().remove(id);
        if removed.is_some() {
            debug!("running kernels: removed {id}");
            self.notify();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<KernelHandle> {
        self.inner.kernels.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.kernels.lock().contains_key(id)
    }

    /// Snapshot of the live kernels, ordered by id.
    pub fn kernels(&self) -> Vec<KernelHandle> {
        self.inner.kernels.lock().values().cloned().collect()
    }

    /// Models of the live kernels, ordered by id.
    pub fn models(&self) -> Vec<KernelModel> {
        self.kernels().iter().map(|kernel| kernel.model()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.kernels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.kernels.lock().is_empty()
    }

    /// Fires with the new model list whenever an entry is added or removed.
    pub fn changed(&self) -> &Signal<Vec<KernelModel>> {
        &self.inner.changed
    }

    fn notify(&self) {
        let models = self.models();
        self.inner.changed.emit(&models);
    }
}
