//! Service managers for kernels, sessions, terminals and kernel specs, plus
//! the aggregate [`ServiceManager`] that wires them to one scheduler.

mod kernels;
mod kernelspecs;
mod sessions;
mod terminals;

use anyhow::{anyhow, Result};
use log::debug;
use std::sync::Arc;

pub use kernels::KernelManager;
pub use kernelspecs::KernelSpecManager;
pub use sessions::{
    KernelChange, SessionConnection, SessionManager, SessionOptions, SessionProperty,
};
pub use terminals::{
    ConnectionStatus, TerminalConnection, TerminalManager, TerminalMessage, TerminalModel,
};

pub use coop_runtime::{Scheduler, Signal, SubscriptionId};
pub use kernel_abi::{
    KernelConfig, KernelConnection, KernelHandle, KernelModel, KernelModelOptions,
    KernelSpecRegistry, ManagerError, ManagerResult, SessionModel,
};
pub use kernel_sim::{KernelEnv, SimKernel};

/// Aggregates the managers and the scheduler that drives them.
#[derive(Clone)]
pub struct ServiceManager {
    scheduler: Scheduler,
    config: KernelConfig,
    kernels: KernelManager,
    sessions: SessionManager,
    terminals: TerminalManager,
    kernelspecs: KernelSpecManager,
}

impl ServiceManager {
    /// Creates a new builder for constructing a service manager.
    pub fn builder() -> ServiceManagerBuilder {
        ServiceManagerBuilder::new()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn kernels(&self) -> &KernelManager {
        &self.kernels
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn terminals(&self) -> &TerminalManager {
        &self.terminals
    }

    pub fn kernelspecs(&self) -> &KernelSpecManager {
        &self.kernelspecs
    }

    /// Runs scheduled work, including work it schedules, until the queue is
    /// empty. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        self.scheduler.run_until_idle()
    }

    /// Shuts down every session, kernel and terminal.
    pub fn shutdown_all(&self) {
        debug!("service manager: shutting everything down");
        self.sessions.shutdown_all();
        self.kernels.shutdown_all();
        self.terminals.shutdown_all();
    }
}

/// Builder for assembling a [`ServiceManager`].
///
/// A scheduler and a config are required; the kernel spec catalog defaults to the
/// built-in one.
#[derive(Default)]
pub struct ServiceManagerBuilder {
    scheduler: Option<Scheduler>,
    config: Option<KernelConfig>,
    specs: Option<KernelSpecRegistry>,
}

impl ServiceManagerBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scheduler every kernel and terminal defers work to.
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the kernel configuration.
    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the kernel spec catalog.
    pub fn specs(mut self, specs: KernelSpecRegistry) -> Self {
        self.specs = Some(specs);
        self
    }

    /// Builds the service manager, failing when a required part is missing
    /// or the configured default spec is not in the catalog.
    pub fn build(self) -> Result<ServiceManager> {
        let scheduler = self.scheduler.ok_or_else(|| anyhow!("missing scheduler"))?;
        let config = self.config.ok_or_else(|| anyhow!("missing kernel config"))?;
        let specs = Arc::new(self.specs.unwrap_or_default());
        if specs.get(&config.default_spec).is_none() {
            return Err(anyhow!(
                "default kernel spec {:?} is not registered",
                config.default_spec
            ));
        }

        let env = KernelEnv {
            scheduler: scheduler.clone(),
            registry: Default::default(),
            specs: Arc::clone(&specs),
            config: config.clone(),
        };
        let kernels = KernelManager::new(env);
        let sessions = SessionManager::new(kernels.clone());
        let terminals = TerminalManager::new(scheduler.clone());
        let kernelspecs = KernelSpecManager::new(specs);
        debug!(
            "service manager: built with default spec {}",
            config.default_spec
        );

        Ok(ServiceManager {
            scheduler,
            config,
            kernels,
            sessions,
            terminals,
            kernelspecs,
        })
    }
}
