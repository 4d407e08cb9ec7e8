//! Live connection bookkeeping for viewers and control clients.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

/// Counts open connections of one kind.
#[derive(Debug)]
pub struct ConnectionRegistry {
    kind: &'static str,
    active: AtomicUsize,
    total: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            active: AtomicUsize::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a new connection. It stays counted until the guard drops.
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        let id = self.total.fetch_add(1, Ordering::Relaxed) + 1;
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("{} {} connected ({} active)", self.kind, id, active);
        ConnectionGuard {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Connections ever registered.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            active: self.active(),
            total: self.total(),
        }
    }
}

/// Keeps one connection counted while alive.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: u64,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let active = self.registry.active.fetch_sub(1, Ordering::Relaxed) - 1;
        debug!("{} {} disconnected ({} active)", self.registry.kind, self.id, active);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub active: usize,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_active_connections() {
        let registry = Arc::new(ConnectionRegistry::new("viewer"));
        let a = registry.register();
        let b = registry.register();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(registry.active(), 2);

        drop(a);
        assert_eq!(registry.stats(), ConnectionStats { active: 1, total: 2 });

        drop(b);
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.total(), 2);
    }
}
