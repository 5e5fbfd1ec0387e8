//! The coordinator dynamic configuration value.
//!
//! This module provides [`CoordinatorDynamicConfig`], the immutable snapshot
//! of every runtime-tunable coordinator parameter, and the merge-constructor
//! that derives the next snapshot from a partial update and a baseline.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_BALANCER_COMPUTE_THREADS, DEFAULT_MAX_SEGMENTS_IN_NODE_LOADING_QUEUE,
    DEFAULT_MAX_SEGMENTS_TO_MOVE, DEFAULT_MERGE_BYTES_LIMIT, DEFAULT_MERGE_SEGMENTS_LIMIT,
    DEFAULT_MILLIS_TO_WAIT_BEFORE_DELETING, DEFAULT_REPLICANT_LIFETIME,
    DEFAULT_REPLICATION_THROTTLE_LIMIT, MIN_BALANCER_COMPUTE_THREADS,
};
use crate::update::{parse_whitelist, DynamicConfigUpdate, WhitelistInput};
use crate::{ConfigError, CoordinatorDynamicConfigBuilder};

/// Runtime-mutable coordinator configuration.
///
/// Instances are immutable once constructed and always satisfy:
/// - `balancer_compute_threads >= 1`
/// - `kill_all_data_sources` implies an empty `kill_data_source_whitelist`
///
/// Every construction path (builder, merge, deserialization) enforces both,
/// so a value of this type is always safe to hand to the balancer.
///
/// Serialization always emits every field, using the camelCase names shared
/// with [`DynamicConfigUpdate`]. Deserialization resolves the payload as an
/// update against the built-in defaults.
///
/// # Example
///
/// ```
/// use coordinator_dynamic_config::{CoordinatorDynamicConfig, DynamicConfigUpdate};
///
/// let baseline = CoordinatorDynamicConfig::default();
/// let update = DynamicConfigUpdate {
///     replication_throttle_limit: Some(20),
///     kill_data_source_whitelist: Some("ds1,ds2".into()),
///     ..Default::default()
/// };
///
/// let next = baseline.merged_with(&update).unwrap();
/// assert_eq!(next.replication_throttle_limit(), 20);
/// assert_eq!(next.kill_data_source_whitelist().len(), 2);
/// assert_eq!(next.max_segments_to_move(), baseline.max_segments_to_move());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DynamicConfigUpdate")]
pub struct CoordinatorDynamicConfig {
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

impl Default for CoordinatorDynamicConfig {
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

impl CoordinatorDynamicConfig {
    /// Create a new builder seeded with the built-in defaults.
    #[must_use]
    pub fn builder() -> CoordinatorDynamicConfigBuilder {
        CoordinatorDynamicConfigBuilder::new()
    }

    /// Create a builder seeded with this configuration's values.
    #[must_use]
    pub fn to_builder(&self) -> CoordinatorDynamicConfigBuilder {
        CoordinatorDynamicConfigBuilder::from(self)
    }

    /// Resolve a partial update against a baseline.
    ///
    /// Each field takes the update's value when present and the baseline's
    /// otherwise. A `None` baseline stands for the built-in defaults. The
    /// balancer thread count is raised to at least 1 after resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KillAllWithWhitelist`] if the resolved
    /// configuration enables `killAllDataSources` with a non-empty whitelist.
    pub fn from_update(
        update: &DynamicConfigUpdate,
        baseline: Option<&Self>,
    ) -> Result<Self, ConfigError> {
        let current = baseline.cloned().unwrap_or_default();

        let kill_data_source_whitelist = match &update.kill_data_source_whitelist {
            Some(raw) => parse_whitelist(raw),
            None => current.kill_data_source_whitelist,
        };

        Self {
            millis_to_wait_before_deleting: update
                .millis_to_wait_before_deleting
                .unwrap_or(current.millis_to_wait_before_deleting),
            merge_bytes_limit: update.merge_bytes_limit.unwrap_or(current.merge_bytes_limit),
            merge_segments_limit: update
                .merge_segments_limit
                .unwrap_or(current.merge_segments_limit),
            max_segments_to_move: update
                .max_segments_to_move
                .unwrap_or(current.max_segments_to_move),
            replicant_lifetime: update.replicant_lifetime.unwrap_or(current.replicant_lifetime),
            replication_throttle_limit: update
                .replication_throttle_limit
                .unwrap_or(current.replication_throttle_limit),
            balancer_compute_threads: update
                .balancer_compute_threads
                .unwrap_or(current.balancer_compute_threads),
            emit_balancing_stats: update
                .emit_balancing_stats
                .unwrap_or(current.emit_balancing_stats),
            kill_all_data_sources: update
                .kill_all_data_sources
                .unwrap_or(current.kill_all_data_sources),
            kill_data_source_whitelist,
            max_segments_in_node_loading_queue: update
                .max_segments_in_node_loading_queue
                .unwrap_or(current.max_segments_in_node_loading_queue),
        }
        .validated()
    }

    /// Resolve a partial update using this configuration as the baseline.
    ///
    /// # Errors
    ///
    /// See [`CoordinatorDynamicConfig::from_update`].
    pub fn merged_with(&self, update: &DynamicConfigUpdate) -> Result<Self, ConfigError> {
        Self::from_update(update, Some(self))
    }

    /// Express this configuration as an update that sets every field.
    ///
    /// The whitelist is carried in list form so names are not re-trimmed.
    #[must_use]
    pub fn to_update(&self) -> DynamicConfigUpdate {
        DynamicConfigUpdate {
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
                self.kill_data_source_whitelist.iter().cloned().collect(),
            )),
            max_segments_in_node_loading_queue: Some(self.max_segments_in_node_loading_queue),
        }
    }

    // Apply the thread floor and reject the kill-all/whitelist conflict.
    pub(crate) fn validated(mut self) -> Result<Self, ConfigError> {
        self.balancer_compute_threads = self
            .balancer_compute_threads
            .max(MIN_BALANCER_COMPUTE_THREADS);

        if self.kill_all_data_sources && !self.kill_data_source_whitelist.is_empty() {
            return Err(ConfigError::kill_all_with_whitelist(
                self.kill_data_source_whitelist,
            ));
        }

        Ok(self)
    }

    /// Compute field-level differences from `self` to `other`.
    ///
    /// Fields are reported by their serialized names, with old and new values
    /// rendered as JSON.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<ConfigChange> {
        // Both sides serialize to flat objects with the same key set.
        let old_json = serde_json::to_value(self).unwrap_or_default();
        let new_json = serde_json::to_value(other).unwrap_or_default();

        let (Some(old_map), Some(new_map)) = (old_json.as_object(), new_json.as_object()) else {
            return Vec::new();
        };

        old_map
            .iter()
            .filter_map(|(field, old)| {
                let new = new_map.get(field)?;
                (old != new).then(|| ConfigChange {
                    field: field.clone(),
                    old: old.to_string(),
                    new: new.to_string(),
                })
            })
            .collect()
    }

    /// Grace period in milliseconds before unused segments are deleted.
    pub fn millis_to_wait_before_deleting(&self) -> u64 {
        self.millis_to_wait_before_deleting
    }

    /// Byte limit for a single merge task.
    pub fn merge_bytes_limit(&self) -> u64 {
        self.merge_bytes_limit
    }

    /// Segment count limit for a single merge task.
    pub fn merge_segments_limit(&self) -> i32 {
        self.merge_segments_limit
    }

    /// Maximum segments moved per balancing run.
    pub fn max_segments_to_move(&self) -> i32 {
        self.max_segments_to_move
    }

    /// Replicant lifetime in coordinator runs.
    pub fn replicant_lifetime(&self) -> i32 {
        self.replicant_lifetime
    }

    /// Maximum concurrent replications.
    pub fn replication_throttle_limit(&self) -> i32 {
        self.replication_throttle_limit
    }

    /// Balancer thread count, never below 1.
    pub fn balancer_compute_threads(&self) -> i32 {
        self.balancer_compute_threads
    }

    /// Whether the balancer emits per-run statistics.
    pub fn emit_balancing_stats(&self) -> bool {
        self.emit_balancing_stats
    }

    /// Whether kill tasks may target every data source.
    pub fn kill_all_data_sources(&self) -> bool {
        self.kill_all_data_sources
    }

    /// Data sources kill tasks may target.
    pub fn kill_data_source_whitelist(&self) -> &BTreeSet<String> {
        &self.kill_data_source_whitelist
    }

    /// Per-node loading queue bound; `0` is unbounded.
    pub fn max_segments_in_node_loading_queue(&self) -> i32 {
        self.max_segments_in_node_loading_queue
    }
}

impl TryFrom<DynamicConfigUpdate> for CoordinatorDynamicConfig {
    type Error = ConfigError;

    fn try_from(update: DynamicConfigUpdate) -> Result<Self, Self::Error> {
        Self::from_update(&update, None)
    }
}

impl fmt::Display for CoordinatorDynamicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whitelist: Vec<&str> = self
            .kill_data_source_whitelist
            .iter()
            .map(String::as_str)
            .collect();

        write!(
            f,
            "CoordinatorDynamicConfig{{millisToWaitBeforeDeleting={}, mergeBytesLimit={}, \
             mergeSegmentsLimit={}, maxSegmentsToMove={}, replicantLifetime={}, \
             replicationThrottleLimit={}, balancerComputeThreads={}, emitBalancingStats={}, \
             killAllDataSources={}, killDataSourceWhitelist=[{}], \
             maxSegmentsInNodeLoadingQueue={}}}",
            self.millis_to_wait_before_deleting,
            self.merge_bytes_limit,
            self.merge_segments_limit,
            self.max_segments_to_move,
            self.replicant_lifetime,
            self.replication_throttle_limit,
            self.balancer_compute_threads,
            self.emit_balancing_stats,
            self.kill_all_data_sources,
            whitelist.join(", "),
            self.max_segments_in_node_loading_queue,
        )
    }
}

/// A single field-level change between two configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    /// Serialized field name (e.g. "maxSegmentsToMove").
    pub field: String,
    /// Previous value serialized as JSON.
    pub old: String,
    /// New value serialized as JSON.
    pub new: String,
}

impl fmt::Display for ConfigChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.field, self.old, self.new)
    }
}
