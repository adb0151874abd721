//! Backend connection settings shared with the dispatch worker.

use std::sync::{PoisonError, RwLock};

use conveyor_config::ConnectionSettings;

/// Read-mostly store for the backend address.
///
/// The store has its own lock so updating settings never contends with queue
/// operations. The worker reads it once per exchange attempt, so an update
/// takes effect from the next exchange onwards.
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<ConnectionSettings>,
}

impl SettingsStore {
    /// Creates a store holding `settings`.
    #[must_use]
    pub const fn new(settings: ConnectionSettings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    /// Returns a snapshot of the current settings.
    #[must_use]
    pub fn current(&self) -> ConnectionSettings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the settings used from the next exchange attempt onwards.
    pub fn update(&self, settings: ConnectionSettings) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}
