//! Ready-wired service manager backed by simulated kernels.

use anyhow::{Context, Result};
use hub::{Scheduler, ServiceManager};
use kernel_abi::KernelConfig;

/// Creates a service manager with the default config and a fresh scheduler.
pub fn make_service_manager() -> Result<ServiceManager> {
    make_service_manager_with(KernelConfig::default())
}

/// Creates a service manager whose kernels follow `config`.
pub fn make_service_manager_with(config: KernelConfig) -> Result<ServiceManager> {
    ServiceManager::builder()
        .scheduler(Scheduler::new())
        .config(config)
        .build()
        .context("mock service manager build")
}

/// Like [`make_service_manager_with`], reading the config from JSON.
pub fn make_service_manager_from_json(raw: &str) -> Result<ServiceManager> {
    let config = KernelConfig::from_json(raw).context("mock kernel config")?;
    make_service_manager_with(config)
}
