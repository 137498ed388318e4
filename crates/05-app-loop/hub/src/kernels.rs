use coop_runtime::Signal;
use kernel_abi::{
    KernelConnection, KernelHandle, KernelModel, KernelModelOptions, KernelSpecRegistry,
    ManagerError, ManagerResult,
};
use kernel_sim::{KernelEnv, SimKernel};
use log::debug;
use std::sync::Arc;

/// Starts, finds and shuts down simulated kernels.
///
/// Clones share the running-kernel registry, so a kernel started through
/// one handle is visible through all of them.
#[derive(Clone)]
pub struct KernelManager {
    env: KernelEnv,
}

impl KernelManager {
    pub fn new(env: KernelEnv) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &KernelEnv {
        &self.env
    }

    pub fn specs(&self) -> &KernelSpecRegistry {
        &self.env.specs
    }

    /// Starts a kernel. `None` selects the configured default spec and a
    /// fresh id.
    pub fn start_new(&self, options: Option<KernelModelOptions>) -> Arc<SimKernel> {
        SimKernel::start(options.unwrap_or_default(), &self.env)
    }

    /// Models of the running kernels, ordered by id.
    pub fn running(&self) -> Vec<KernelModel> {
        self.env.registry.models()
    }

    pub fn find_by_id(&self, id: &str) -> Option<KernelModel> {
        self.env.registry.get(id).map(|kernel| kernel.model())
    }

    /// The running kernel with `id`. Every caller gets the same instance.
    pub fn connect_to(&self, id: &str) -> ManagerResult<KernelHandle> {
        self.env
            .registry
            .get(id)
            .ok_or_else(|| ManagerError::KernelNotFound(id.to_owned()))
    }

    pub fn shutdown(&self, id: &str) -> ManagerResult<()> {
        let kernel = self.connect_to(id)?;
        debug!("kernel manager: shutting down {id}");
        let _ = kernel.shutdown();
        Ok(())
    }

    pub fn shutdown_all(&self) {
        let kernels = self.env.registry.kernels();
        debug!("kernel manager: shutting down {} kernels", kernels.len());
        for kernel in kernels {
            let _ = kernel.shutdown();
        }
    }

    /// Fires with the new model list whenever a kernel starts or goes away.
    pub fn running_changed(&self) -> &Signal<Vec<KernelModel>> {
        self.env.registry.changed()
    }
}
