//! Builder for [`CoordinatorDynamicConfig`].

use std::collections::BTreeSet;

use crate::defaults::{
    DEFAULT_BALANCER_COMPUTE_THREADS, DEFAULT_MAX_SEGMENTS_IN_NODE_LOADING_QUEUE,
    DEFAULT_MAX_SEGMENTS_TO_MOVE, DEFAULT_MERGE_BYTES_LIMIT, DEFAULT_MERGE_SEGMENTS_LIMIT,
    DEFAULT_MILLIS_TO_WAIT_BEFORE_DELETING, DEFAULT_REPLICANT_LIFETIME,
    DEFAULT_REPLICATION_THROTTLE_LIMIT,
};
use crate::{ConfigError, CoordinatorDynamicConfig, DynamicConfigUpdate, WhitelistInput};

/// Builder for [`CoordinatorDynamicConfig`].
///
/// Starts from the built-in defaults. Nothing is validated until
/// [`build`](Self::build) is called.
///
/// # Example
///
/// ```
/// use coordinator_dynamic_config::CoordinatorDynamicConfig;
///
/// let config = CoordinatorDynamicConfig::builder()
///     .with_max_segments_to_move(20)
///     .with_kill_data_source_whitelist(["wikipedia"])
///     .build()
///     .unwrap();
///
/// assert_eq!(config.max_segments_to_move(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatorDynamicConfigBuilder {
    millis_to_wait_before_deleting: u64,
    merge_bytes_limit: u64,
    merge_segments_limit: i32,
    max_segments_to_move: i32,
    replicant_lifetime: i32,
    replication_throttle_limit: i32,
    balancer_compute_threads: i32,
    emit_balancing_stats: bool,
    kill_all_data_sources: bool,
    kill_data_source_whitelist: BTreeSet<String>,
    max_segments_in_node_loading_queue: i32,
}

impl Default for CoordinatorDynamicConfigBuilder {
    fn default() -> Self {
        Self {
            millis_to_wait_before_deleting: DEFAULT_MILLIS_TO_WAIT_BEFORE_DELETING,
            merge_bytes_limit: DEFAULT_MERGE_BYTES_LIMIT,
            merge_segments_limit: DEFAULT_MERGE_SEGMENTS_LIMIT,
            max_segments_to_move: DEFAULT_MAX_SEGMENTS_TO_MOVE,
            replicant_lifetime: DEFAULT_REPLICANT_LIFETIME,
            replication_throttle_limit: DEFAULT_REPLICATION_THROTTLE_LIMIT,
            balancer_compute_threads: DEFAULT_BALANCER_COMPUTE_THREADS,
            emit_balancing_stats: false,
            kill_all_data_sources: false,
            kill_data_source_whitelist: BTreeSet::new(),
            max_segments_in_node_loading_queue: DEFAULT_MAX_SEGMENTS_IN_NODE_LOADING_QUEUE,
        }
    }
}

impl From<&CoordinatorDynamicConfig> for CoordinatorDynamicConfigBuilder {
    fn from(config: &CoordinatorDynamicConfig) -> Self {
        Self {
            millis_to_wait_before_deleting: config.millis_to_wait_before_deleting(),
            merge_bytes_limit: config.merge_bytes_limit(),
            merge_segments_limit: config.merge_segments_limit(),
            max_segments_to_move: config.max_segments_to_move(),
            replicant_lifetime: config.replicant_lifetime(),
            replication_throttle_limit: config.replication_throttle_limit(),
            balancer_compute_threads: config.balancer_compute_threads(),
            emit_balancing_stats: config.emit_balancing_stats(),
            kill_all_data_sources: config.kill_all_data_sources(),
            kill_data_source_whitelist: config.kill_data_source_whitelist().clone(),
            max_segments_in_node_loading_queue: config.max_segments_in_node_loading_queue(),
        }
    }
}

impl CoordinatorDynamicConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grace period before unused segments are deleted.
    #[must_use]
    pub fn with_millis_to_wait_before_deleting(mut self, millis: u64) -> Self {
        self.millis_to_wait_before_deleting = millis;
        self
    }

    /// Set the byte limit for a single merge task.
    #[must_use]
    pub fn with_merge_bytes_limit(mut self, bytes: u64) -> Self {
        self.merge_bytes_limit = bytes;
        self
    }

    /// Set the segment count limit for a single merge task.
    #[must_use]
    pub fn with_merge_segments_limit(mut self, limit: i32) -> Self {
        self.merge_segments_limit = limit;
        self
    }

    /// Set the maximum segments moved per balancing run.
    #[must_use]
    pub fn with_max_segments_to_move(mut self, max: i32) -> Self {
        self.max_segments_to_move = max;
        self
    }

    /// Set the replicant lifetime.
    #[must_use]
    pub fn with_replicant_lifetime(mut self, lifetime: i32) -> Self {
        self.replicant_lifetime = lifetime;
        self
    }

    /// Set the maximum concurrent replications.
    #[must_use]
    pub fn with_replication_throttle_limit(mut self, limit: i32) -> Self {
        self.replication_throttle_limit = limit;
        self
    }

    /// Set the balancer thread count. Raised to 1 on build if lower.
    #[must_use]
    pub fn with_balancer_compute_threads(mut self, threads: i32) -> Self {
        self.balancer_compute_threads = threads;
        self
    }

    /// Enable or disable balancing statistics.
    #[must_use]
    pub fn with_emit_balancing_stats(mut self, emit: bool) -> Self {
        self.emit_balancing_stats = emit;
        self
    }

    /// Enable or disable kill tasks for every data source.
    #[must_use]
    pub fn with_kill_all_data_sources(mut self, kill_all: bool) -> Self {
        self.kill_all_data_sources = kill_all;
        self
    }

    /// Replace the kill whitelist. Names are kept as given.
    #[must_use]
    pub fn with_kill_data_source_whitelist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kill_data_source_whitelist = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-node loading queue bound; `0` is unbounded.
    #[must_use]
    pub fn with_max_segments_in_node_loading_queue(mut self, max: i32) -> Self {
        self.max_segments_in_node_loading_queue = max;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KillAllWithWhitelist`] if `killAllDataSources`
    /// is enabled with a non-empty whitelist.
    pub fn build(self) -> Result<CoordinatorDynamicConfig, ConfigError> {
        let update = DynamicConfigUpdate {
            millis_to_wait_before_deleting: Some(self.millis_to_wait_before_deleting),
            merge_bytes_limit: Some(self.merge_bytes_limit),
            merge_segments_limit: Some(self.merge_segments_limit),
            max_segments_to_move: Some(self.max_segments_to_move),
            replicant_lifetime: Some(self.replicant_lifetime),
            replication_throttle_limit: Some(self.replication_throttle_limit),
            balancer_compute_threads: Some(self.balancer_compute_threads),
            emit_balancing_stats: Some(self.emit_balancing_stats),
            kill_all_data_sources: Some(self.kill_all_data_sources),
            kill_data_source_whitelist: Some(WhitelistInput::List(
                self.kill_data_source_whitelist.into_iter().collect(),
            )),
            max_segments_in_node_loading_queue: Some(self.max_segments_in_node_loading_queue),
        };

        CoordinatorDynamicConfig::from_update(&update, None)
    }
}
