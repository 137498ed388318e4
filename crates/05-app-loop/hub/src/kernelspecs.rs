use kernel_abi::{Completion, KernelSpec, KernelSpecRegistry, RegisteredSpec};
use std::sync::Arc;

/// Read-only view of the kernel specs kernels are started from.
#[derive(Clone)]
pub struct KernelSpecManager {
    specs: Arc<KernelSpecRegistry>,
}

impl KernelSpecManager {
    pub fn new(specs: Arc<KernelSpecRegistry>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &KernelSpecRegistry {
        &self.specs
    }

    pub fn default_name(&self) -> &str {
        self.specs.default_name()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSpec> {
        self.specs.get(name)
    }

    /// Specs ordered by name.
    pub fn list(&self) -> Vec<KernelSpec> {
        self.specs.specs().cloned().collect()
    }

    /// The catalog is fixed, so refreshing resolves at once.
    pub fn refresh_specs(&self) -> Completion {
        Completion::ready()
    }
}
