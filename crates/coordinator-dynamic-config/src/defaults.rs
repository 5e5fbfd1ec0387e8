//! Hardcoded system defaults for the coordinator dynamic configuration.
//!
//! These values seed every [`CoordinatorDynamicConfigBuilder`](crate::CoordinatorDynamicConfigBuilder)
//! and stand in for the baseline when the config store holds no prior value.

/// Well-known config store key for the coordinator dynamic configuration slot.
pub const CONFIG_KEY: &str = "coordinator.config";

/// Grace period before unused segments are deleted (15 minutes).
pub const DEFAULT_MILLIS_TO_WAIT_BEFORE_DELETING: u64 = 15 * 60 * 1000;

/// Maximum total bytes of segments merged in one merge task (500 MiB).
pub const DEFAULT_MERGE_BYTES_LIMIT: u64 = 524_288_000;

/// Maximum number of segments merged in one merge task.
pub const DEFAULT_MERGE_SEGMENTS_LIMIT: i32 = 100;

/// Maximum number of segments moved per balancing run.
pub const DEFAULT_MAX_SEGMENTS_TO_MOVE: i32 = 5;

/// Number of coordinator runs a replicant may stay in the replication queue.
pub const DEFAULT_REPLICANT_LIFETIME: i32 = 15;

/// Maximum concurrent segment replications per tier.
pub const DEFAULT_REPLICATION_THROTTLE_LIMIT: i32 = 10;

/// Threads used by the balancer to compute segment moves.
pub const DEFAULT_BALANCER_COMPUTE_THREADS: i32 = 1;

/// Floor applied to the balancer thread count.
pub const MIN_BALANCER_COMPUTE_THREADS: i32 = 1;

/// `0` means the per-node loading queue is unbounded.
pub const DEFAULT_MAX_SEGMENTS_IN_NODE_LOADING_QUEUE: i32 = 0;
