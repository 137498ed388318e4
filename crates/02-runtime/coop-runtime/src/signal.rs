use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Signal::connect`], used to disconnect later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Slots<T> {
    next_id: u64,
    connected: Vec<(SubscriptionId, Slot<T>)>,
}

/// Per-instance publish/subscribe channel.
///
/// `emit` calls every listener synchronously in connection order. Listeners
/// run without the internal lock held, so they may connect, disconnect or
/// emit again. A listener disconnected during an emission is not called for
/// the remainder of it.
pub struct Signal<T> {
    slots: Mutex<Slots<T>>,
}

impl<T> Signal<T> {
    /// Creates a signal with no listeners.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                next_id: 0,
                connected: Vec::new(),
            }),
        }
    }

    /// Registers `listener` and returns its subscription id.
    pub fn connect<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        let id = SubscriptionId(slots.next_id);
        slots.next_id += 1;
        slots.connected.push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.connected.len();
        slots.connected.retain(|(slot_id, _)| *slot_id != id);
        slots.connected.len() != before
    }

    /// Removes every listener.
    pub fn disconnect_all(&self) {
        self.slots.lock().connected.clear();
    }

    /// Number of connected listeners.
    pub fn listener_count(&self) -> usize {
        self.slots.lock().connected.len()
    }

    /// Delivers `value` to every listener in connection order.
    pub fn emit(&self, value: &T) {
        let snapshot: SmallVec<[(SubscriptionId, Slot<T>); 4]> = self
            .slots
            .lock()
            .connected
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        for (id, slot) in snapshot {
            if self.is_connected(id) {
                slot(value);
            }
        }
    }

    fn is_connected(&self, id: SubscriptionId) -> bool {
        self.slots
            .lock()
            .connected
            .iter()
            .any(|(slot_id, _)| *slot_id == id)
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
