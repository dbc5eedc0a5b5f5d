use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bit set of change notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signal(pub u32);

impl Signal {
    pub const NONE: Signal = Signal(0);
    /// Table rows or computed columns changed.
    pub const DATA_CHANGED: Signal = Signal(1 << 0);
    /// Scale ticks must be recalculated.
    pub const NEED_UPDATE_TICK_DEPENDENT: Signal = Signal(1 << 1);
    /// Scale full range changed.
    pub const NEED_UPDATE_FULL_RANGE_ITEMS: Signal = Signal(1 << 2);
    /// Grouping settings changed and the interval must be chosen again.
    pub const NEEDS_REAPPLICATION: Signal = Signal(1 << 3);

    pub fn contains(self, other: Signal) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Signal {
    type Output = Signal;

    fn bitor(self, rhs: Signal) -> Signal {
        Signal(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Signal {
    fn bitor_assign(&mut self, rhs: Signal) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

type Listener = Arc<dyn Fn(Signal) + Send + Sync>;

/// Observer list owned by a single table or scale.
#[derive(Clone, Default)]
pub struct Observers {
    listeners: Arc<RwLock<Vec<(SubscriptionId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener once. Listeners are cloned out first, so they may
    /// subscribe or unsubscribe while being notified.
    pub fn dispatch(&self, signal: Signal) {
        if signal.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(signal);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}
