//! Connectivity signal.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks network reachability plus an explicit offline-mode override.
///
/// The effective online status is `connected && !offline_mode`: a user
/// can force offline routing even while the network is reachable.
/// Platform network detection lives outside the engine; whatever
/// watches the OS feeds [`ConnectivityMonitor::set_connected`].
#[derive(Debug)]
pub struct ConnectivityMonitor {
    connected: AtomicBool,
    offline_mode: AtomicBool,
}

impl ConnectivityMonitor {
    /// Creates a monitor that starts connected, with offline mode off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            offline_mode: AtomicBool::new(false),
        }
    }

    /// Updates the raw connectivity flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns the raw connectivity flag.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Opts in or out of forced offline mode.
    pub fn set_offline_mode(&self, offline: bool) {
        self.offline_mode.store(offline, Ordering::SeqCst);
    }

    /// Returns true if offline mode is forced on.
    #[must_use]
    pub fn is_offline_mode(&self) -> bool {
        self.offline_mode.load(Ordering::SeqCst)
    }

    /// Returns the effective online status.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.is_connected() && !self.is_offline_mode()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
