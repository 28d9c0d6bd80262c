use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts live client connections. The control plane polls this number to
/// decide whether the workspace is idle.
#[derive(Debug, Default)]
pub struct ActivityCounter {
    connections: AtomicU64,
}

impl ActivityCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one connection and returns a guard that releases it on
    /// drop.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        self.connections.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            counter: Arc::clone(self),
        }
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    fn release(&self) {
        // Saturating decrement; the counter must never wrap below zero even
        // if a guard outlives a counter reset.
        let mut current = self.connections.load(Ordering::SeqCst);
        while current > 0 {
            match self.connections.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// RAII handle for one live connection.
pub struct ConnectionGuard {
    counter: Arc<ActivityCounter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_connection_count() {
        let counter = ActivityCounter::new();
        assert_eq!(counter.connections(), 0);

        let a = counter.acquire();
        let b = counter.acquire();
        assert_eq!(counter.connections(), 2);

        drop(a);
        assert_eq!(counter.connections(), 1);
        drop(b);
        assert_eq!(counter.connections(), 0);
    }

    #[test]
    fn release_never_wraps_below_zero() {
        let counter = ActivityCounter::new();
        counter.release();
        assert_eq!(counter.connections(), 0);
    }
}
