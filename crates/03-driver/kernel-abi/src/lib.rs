//! Kernel connection ABI shared by the simulated engine and its managers.
//!
//! This crate defines the boundary between kernel implementations (layer 04)
//! and the managers that create, look up and destroy them (layer 05). It has
//! no knowledge of how a kernel produces its replies.

mod config;
mod connection;
mod error;
mod future;
mod model;
mod registry;
mod spec;

pub use config::KernelConfig;
pub use connection::{KernelConnection, KernelHandle};
pub use error::{ConfigError, ManagerError, ManagerResult};
pub use future::{Completion, Done, KernelFuture, MessageHandler};
pub use model::{new_id, KernelModel, KernelModelOptions, SessionModel};
pub use registry::RunningKernels;
pub use spec::{KernelSpec, KernelSpecRegistry, RegisteredSpec};

// Re-export the runtime primitives that appear in the connection trait.
pub use coop_runtime::{Scheduler, Signal, SubscriptionId};
