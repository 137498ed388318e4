use coop_runtime::{Scheduler, Signal};
use kernel_abi::{ManagerError, ManagerResult};
use log::{debug, trace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalModel {
    pub name: String,
}

/// Frame exchanged with a terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum TerminalMessage {
    Stdin(String),
    Stdout(String),
    SetSize { rows: u16, cols: u16 },
    Disconnect,
}

struct TerminalState {
    status: ConnectionStatus,
    disposed: bool,
}

/// Simulated terminal that echoes its input.
pub struct TerminalConnection {
    name: String,
    state: Mutex<TerminalState>,
    connection_status_changed: Signal<ConnectionStatus>,
    message_received: Signal<TerminalMessage>,
    disposed: Signal<()>,
}

impl TerminalConnection {
    /// Opens a terminal; it reports `connected` on the next scheduler turn.
    pub fn start(name: impl Into<String>, scheduler: &Scheduler) -> Arc<Self> {
        let terminal = Arc::new(Self {
            name: name.into(),
            state: Mutex::new(TerminalState {
                status: ConnectionStatus::Connecting,
                disposed: false,
            }),
            connection_status_changed: Signal::new(),
            message_received: Signal::new(),
            disposed: Signal::new(),
        });
        let weak: Weak<Self> = Arc::downgrade(&terminal);
        scheduler.schedule(move || {
            if let Some(terminal) = weak.upgrade() {
                if terminal.status() == ConnectionStatus::Connecting {
                    terminal.set_status(ConnectionStatus::Connected);
                }
            }
        });
        debug!("terminal {}: started", terminal.name);
        terminal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> TerminalModel {
        TerminalModel {
            name: self.name.clone(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn connection_status_changed(&self) -> &Signal<ConnectionStatus> {
        &self.connection_status_changed
    }

    pub fn message_received(&self) -> &Signal<TerminalMessage> {
        &self.message_received
    }

    pub fn disposed(&self) -> &Signal<()> {
        &self.disposed
    }

    /// Sends `msg` to the terminal. Returns `false` when the connection is
    /// not open and the message was dropped.
    pub fn send(&self, msg: TerminalMessage) -> bool {
        if self.status() != ConnectionStatus::Connected {
            trace!("terminal {}: dropping {msg:?}, not connected", self.name);
            return false;
        }
        match msg {
            TerminalMessage::Stdin(text) => {
                self.message_received.emit(&TerminalMessage::Stdout(text))
            }
            TerminalMessage::Disconnect => self.disconnect(),
            TerminalMessage::SetSize { .. } | TerminalMessage::Stdout(_) => {}
        }
        true
    }

    /// Closes the connection. Idempotent.
    pub fn disconnect(&self) {
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Disconnects and disposes the terminal. Idempotent.
    pub fn shutdown(&self) {
        self.disconnect();
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }
        debug!("terminal {}: shut down", self.name);
        self.disposed.emit(&());
        self.connection_status_changed.disconnect_all();
        self.message_received.disconnect_all();
        self.disposed.disconnect_all();
    }

    fn set_status(&self, status: ConnectionStatus) {
        {
            let mut state = self.state.lock();
            if state.disposed || state.status == status {
                return;
            }
            state.status = status;
        }
        self.connection_status_changed.emit(&status);
    }
}

struct TerminalsState {
    terminals: BTreeMap<u32, Arc<TerminalConnection>>,
    next_name: u32,
}

struct TerminalsInner {
    scheduler: Scheduler,
    state: Mutex<TerminalsState>,
    running_changed: Signal<Vec<TerminalModel>>,
}

impl TerminalsInner {
    fn models(&self) -> Vec<TerminalModel> {
        let terminals: Vec<_> = self.state.lock().terminals.values().cloned().collect();
        terminals.iter().map(|terminal| terminal.model()).collect()
    }

    fn notify(&self) {
        let models = self.models();
        self.running_changed.emit(&models);
    }
}

/// Starts and shuts down terminals, named `"1"`, `"2"`, … in start order.
#[derive(Clone)]
pub struct TerminalManager {
    inner: Arc<TerminalsInner>,
}

impl TerminalManager {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(TerminalsInner {
                scheduler,
                state: Mutex::new(TerminalsState {
                    terminals: BTreeMap::new(),
                    next_name: 1,
                }),
                running_changed: Signal::new(),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        true
    }

    pub fn start_new(&self) -> Arc<TerminalConnection> {
        let key = {
            let mut state = self.inner.state.lock();
            let key = state.next_name;
            state.next_name += 1;
            key
        };
        let terminal = TerminalConnection::start(key.to_string(), &self.inner.scheduler);

        let weak = Arc::downgrade(&self.inner);
        terminal.disposed().connect(move |_| {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.state.lock().terminals.remove(&key);
                if removed.is_some() {
                    inner.notify();
                }
            }
        });
        self.inner
            .state
            .lock()
            .terminals
            .insert(key, Arc::clone(&terminal));
        self.inner.notify();
        terminal
    }

    /// Models of the running terminals, in start order.
    pub fn running(&self) -> Vec<TerminalModel> {
        self.inner.models()
    }

    pub fn connect_to(&self, name: &str) -> ManagerResult<Arc<TerminalConnection>> {
        let terminal = {
            let state = self.inner.state.lock();
            name.parse::<u32>()
                .ok()
                .and_then(|key| state.terminals.get(&key).cloned())
        };
        terminal.ok_or_else(|| ManagerError::TerminalNotFound(name.to_owned()))
    }

    pub fn shutdown(&self, name: &str) -> ManagerResult<()> {
        self.connect_to(name)?.shutdown();
        Ok(())
    }

    pub fn shutdown_all(&self) {
        let terminals: SmallVec<[Arc<TerminalConnection>; 4]> =
            self.inner.state.lock().terminals.values().cloned().collect();
        for terminal in terminals {
            terminal.shutdown();
        }
    }

    pub fn running_changed(&self) -> &Signal<Vec<TerminalModel>> {
        &self.inner.running_changed
    }
}
