#![deny(missing_docs)]
//! Single-threaded cooperative runtime primitives.
//!
//! Nothing here runs in parallel. Work is modelled as deferred continuations
//! pushed onto a [`Scheduler`] and executed in FIFO order whenever the owner
//! drives it, and events fan out synchronously through [`Signal`].

mod scheduler;
mod signal;

pub use scheduler::Scheduler;
pub use signal::{Signal, SubscriptionId};
