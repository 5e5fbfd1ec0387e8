//! Config store contract and an in-memory watched slot.
//!
//! The coordinator keeps the authoritative dynamic configuration in an
//! external store keyed by [`CONFIG_KEY`]. This module defines the read
//! contract the merge-constructor relies on ([`ConfigStore`]) and provides
//! [`DynamicConfigHandle`], a single-slot implementation that publishes every
//! accepted configuration to subscribers.
//!
//! # Example
//!
//! ```
//! use coordinator_dynamic_config::{DynamicConfigHandle, DynamicConfigUpdate};
//!
//! let handle = DynamicConfigHandle::new();
//! let outcome = handle
//!     .apply_update(&DynamicConfigUpdate {
//!         max_segments_to_move: Some(50),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! assert_eq!(outcome.config.max_segments_to_move(), 50);
//! assert_eq!(handle.effective().max_segments_to_move(), 50);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{ConfigChange, ConfigError, CoordinatorDynamicConfig, DynamicConfigUpdate, CONFIG_KEY};

/// Read side of the external configuration store.
pub trait ConfigStore {
    /// Return the configuration currently persisted under `key`, if any.
    fn current_config(&self, key: &str) -> Option<CoordinatorDynamicConfig>;
}

/// Fetch the baseline for a merge: the stored value, or the built-in defaults.
pub fn baseline_from<S: ConfigStore + ?Sized>(store: &S) -> CoordinatorDynamicConfig {
    store.current_config(CONFIG_KEY).unwrap_or_default()
}

/// Resolve `update` against the value currently held by `store`.
///
/// Performs exactly one store read. Nothing is written back.
///
/// # Errors
///
/// Returns [`ConfigError::KillAllWithWhitelist`] if the result is inconsistent.
pub fn resolve_against<S: ConfigStore + ?Sized>(
    store: &S,
    update: &DynamicConfigUpdate,
) -> Result<CoordinatorDynamicConfig, ConfigError> {
    let baseline = store.current_config(CONFIG_KEY);
    CoordinatorDynamicConfig::from_update(update, baseline.as_ref())
}

/// Result of an accepted update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The configuration now active.
    pub config: Arc<CoordinatorDynamicConfig>,
    /// Field-level changes relative to the previous effective configuration.
    pub changes: Vec<ConfigChange>,
    /// Whether the value was written to the slot and subscribers notified.
    pub published: bool,
}

impl UpdateOutcome {
    /// Returns true if the update did not change any field.
    ///
    /// Changes are measured against the effective configuration, so the
    /// first update into an empty slot can be a no-op and still be
    /// [`published`](Self::published): the slot goes from empty to holding
    /// the defaults.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// In-memory holder of the active dynamic configuration.
///
/// Readers get cheap `Arc` snapshots; consumers such as the balancer can
/// [`subscribe`](Self::subscribe) to be woken on every accepted change.
/// Writers are serialized so each update is resolved against the value it
/// replaces.
///
/// An empty slot behaves as if it held the built-in defaults.
#[derive(Debug, Clone)]
pub struct DynamicConfigHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    sender: watch::Sender<Option<Arc<CoordinatorDynamicConfig>>>,
    write_lock: Mutex<()>,
}

impl Default for DynamicConfigHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicConfigHandle {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::from_slot(None)
    }

    /// Create a slot holding `config`.
    #[must_use]
    pub fn with_config(config: CoordinatorDynamicConfig) -> Self {
        Self::from_slot(Some(Arc::new(config)))
    }

    fn from_slot(slot: Option<Arc<CoordinatorDynamicConfig>>) -> Self {
        let (sender, _) = watch::channel(slot);
        Self {
            inner: Arc::new(HandleInner {
                sender,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// The stored configuration, or `None` if nothing has been stored yet.
    pub fn current(&self) -> Option<Arc<CoordinatorDynamicConfig>> {
        self.inner.sender.borrow().clone()
    }

    /// The configuration consumers should act on.
    pub fn effective(&self) -> Arc<CoordinatorDynamicConfig> {
        self.current().unwrap_or_default()
    }

    /// Subscribe to configuration changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CoordinatorDynamicConfig>>> {
        self.inner.sender.subscribe()
    }

    /// Resolve `update` against the stored value and publish the result.
    ///
    /// On error the stored value is left untouched. An update that changes
    /// nothing is accepted without notifying subscribers, unless the slot is
    /// empty, in which case the resolved value is stored and published.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KillAllWithWhitelist`] if the resolved
    /// configuration is inconsistent.
    pub fn apply_update(&self, update: &DynamicConfigUpdate) -> Result<UpdateOutcome, ConfigError> {
        let _guard = self.inner.write_lock.lock();

        let current = self.current();
        let next = match CoordinatorDynamicConfig::from_update(update, current.as_deref()) {
            Ok(next) => next,
            Err(e) => {
                warn!(key = CONFIG_KEY, error = %e, "rejected dynamic config update, keeping current config");
                return Err(e);
            }
        };

        let previous = current.clone().unwrap_or_default();
        let changes = previous.diff(&next);

        if current.is_some() && changes.is_empty() {
            debug!(key = CONFIG_KEY, "dynamic config update changed nothing");
            return Ok(UpdateOutcome {
                config: previous,
                changes,
                published: false,
            });
        }

        let config = Arc::new(next);
        self.inner.sender.send_replace(Some(Arc::clone(&config)));

        let changed_fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        info!(key = CONFIG_KEY, changed_fields = ?changed_fields, config = %config, "dynamic config updated");

        Ok(UpdateOutcome {
            config,
            changes,
            published: true,
        })
    }

    /// Store `config` as-is, replacing whatever was there.
    ///
    /// Returns the changes relative to the previous effective configuration.
    pub fn replace(&self, config: CoordinatorDynamicConfig) -> Vec<ConfigChange> {
        let _guard = self.inner.write_lock.lock();

        let changes = self.effective().diff(&config);
        self.inner.sender.send_replace(Some(Arc::new(config)));
        info!(key = CONFIG_KEY, changes = changes.len(), "dynamic config replaced");
        changes
    }
}

impl ConfigStore for DynamicConfigHandle {
    fn current_config(&self, key: &str) -> Option<CoordinatorDynamicConfig> {
        if key != CONFIG_KEY {
            return None;
        }
        self.current().map(|config| (*config).clone())
    }
}
