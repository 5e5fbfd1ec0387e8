//! Runtime-mutable configuration for the segment coordinator.
//!
//! The coordinator's balancing, replication, merging, and deletion behavior is
//! driven by a small set of tunables that operators change while the cluster
//! runs. This crate provides:
//!
//! - [`CoordinatorDynamicConfig`] - the immutable, validated configuration value
//! - [`DynamicConfigUpdate`] - a partial update where absent fields inherit
//! - [`CoordinatorDynamicConfigBuilder`] - programmatic construction from defaults
//! - [`ConfigLoader`] - layered seeding from files and environment variables
//! - [`DynamicConfigHandle`] - the active value, with change notification
//!
//! # Merge Semantics
//!
//! Every update is resolved against a baseline: the value currently stored
//! under [`CONFIG_KEY`], or the built-in defaults if nothing is stored. Each
//! field present in the update replaces the baseline's; each absent field is
//! inherited. The kill whitelist is replaced as a whole.
//!
//! Two rules are applied to every resolved value:
//!
//! - `balancerComputeThreads` below 1 is raised to 1
//! - `killAllDataSources` with a non-empty whitelist is rejected
//!
//! # Example
//!
//! ```
//! use coordinator_dynamic_config::{CoordinatorDynamicConfig, DynamicConfigUpdate};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stored = CoordinatorDynamicConfig::builder()
//!     .with_replication_throttle_limit(10)
//!     .build()?;
//!
//! let update: DynamicConfigUpdate = serde_json::from_str(
//!     r#"{"replicationThrottleLimit": 20, "killDataSourceWhitelist": "ds1, ds2"}"#,
//! )?;
//!
//! let next = CoordinatorDynamicConfig::from_update(&update, Some(&stored))?;
//! assert_eq!(next.replication_throttle_limit(), 20);
//! assert_eq!(next.kill_data_source_whitelist().len(), 2);
//! assert_eq!(next.max_segments_to_move(), stored.max_segments_to_move());
//! # Ok(())
//! # }
//! ```
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "millisToWaitBeforeDeleting": 900000,
//!   "mergeBytesLimit": 524288000,
//!   "mergeSegmentsLimit": 100,
//!   "maxSegmentsToMove": 5,
//!   "replicantLifetime": 15,
//!   "replicationThrottleLimit": 10,
//!   "balancerComputeThreads": 1,
//!   "emitBalancingStats": false,
//!   "killAllDataSources": false,
//!   "killDataSourceWhitelist": [],
//!   "maxSegmentsInNodeLoadingQueue": 0
//! }
//! ```

#![warn(missing_docs)]

mod builder;
mod config;
pub mod defaults;
mod error;
mod loader;
pub mod logging;
mod store;
mod update;

pub use builder::CoordinatorDynamicConfigBuilder;
pub use config::{ConfigChange, CoordinatorDynamicConfig};
pub use defaults::CONFIG_KEY;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use logging::{init_logging, LogConfig};
pub use store::{baseline_from, resolve_against, ConfigStore, DynamicConfigHandle, UpdateOutcome};
pub use update::{parse_whitelist, DynamicConfigUpdate, WhitelistInput};
