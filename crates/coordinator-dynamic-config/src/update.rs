//! Partial configuration updates.
//!
//! A [`DynamicConfigUpdate`] is the payload accepted by the administrative
//! surface: any subset of the configuration fields, where an absent (or
//! `null`) field means "inherit from the baseline".
//!
//! The kill whitelist may arrive either as a single comma-delimited string or
//! as an array of strings. [`WhitelistInput`] keeps the two forms apart so
//! [`parse_whitelist`] can apply their different rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Raw form of the `killDataSourceWhitelist` field in an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhitelistInput {
    /// A single string such as `"ds1, ds2"`.
    Delimited(String),
    /// An array of strings, taken verbatim.
    List(Vec<String>),
    /// Any other JSON shape. Resolves to an empty whitelist.
    Unrecognized(serde_json::Value),
}

impl WhitelistInput {
    /// Resolve this input into the canonical whitelist set.
    pub fn resolve(&self) -> BTreeSet<String> {
        parse_whitelist(self)
    }
}

impl From<&str> for WhitelistInput {
    fn from(raw: &str) -> Self {
        Self::Delimited(raw.to_string())
    }
}

impl From<String> for WhitelistInput {
    fn from(raw: String) -> Self {
        Self::Delimited(raw)
    }
}

impl From<Vec<String>> for WhitelistInput {
    fn from(entries: Vec<String>) -> Self {
        Self::List(entries)
    }
}

/// Parse a whitelist input into a set of data source names.
///
/// - `Delimited`: split on `,`, trim each piece, drop empty pieces.
/// - `List`: copied as-is, no trimming.
/// - `Unrecognized`: empty set.
///
/// # Example
///
/// ```
/// use coordinator_dynamic_config::{parse_whitelist, WhitelistInput};
///
/// let parsed = parse_whitelist(&WhitelistInput::from("a, b ,,c"));
/// assert_eq!(parsed.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
/// ```
pub fn parse_whitelist(input: &WhitelistInput) -> BTreeSet<String> {
    match input {
        WhitelistInput::Delimited(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        WhitelistInput::List(entries) => entries.iter().cloned().collect(),
        WhitelistInput::Unrecognized(_) => BTreeSet::new(),
    }
}

/// A partial update to the coordinator dynamic configuration.
///
/// Field names on the wire match the serialized configuration exactly.
/// Unknown keys are ignored, so payloads written by newer coordinators still
/// resolve against the fields this version knows.
///
/// # Example
///
/// ```
/// use coordinator_dynamic_config::DynamicConfigUpdate;
///
/// let update: DynamicConfigUpdate = serde_json::from_str(
///     r#"{"replicationThrottleLimit": 20, "killDataSourceWhitelist": "ds1,ds2"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(update.replication_throttle_limit, Some(20));
/// assert!(update.max_segments_to_move.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicConfigUpdate {
    /// Grace period in milliseconds before unused segments are deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub millis_to_wait_before_deleting: Option<u64>,

    /// Byte limit for a single merge task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_bytes_limit: Option<u64>,

    /// Segment count limit for a single merge task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_segments_limit: Option<i32>,

    /// Maximum segments moved per balancing run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_segments_to_move: Option<i32>,

    /// Replicant lifetime in coordinator runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicant_lifetime: Option<i32>,

    /// Maximum concurrent replications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_throttle_limit: Option<i32>,

    /// Balancer thread count. Values below 1 are raised to 1 on resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balancer_compute_threads: Option<i32>,

    /// Whether the balancer emits per-run statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit_balancing_stats: Option<bool>,

    /// Whether kill tasks may target every data source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_all_data_sources: Option<bool>,

    /// Data sources kill tasks may target, in string or list form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_data_source_whitelist: Option<WhitelistInput>,

    /// Per-node loading queue bound; `0` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_segments_in_node_loading_queue: Option<i32>,
}

impl DynamicConfigUpdate {
    /// Create an update that sets nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`.
    ///
    /// Every field set in `other` replaces the corresponding field here;
    /// fields `other` leaves unset are kept. The whitelist is replaced as a
    /// whole, never unioned.
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            millis_to_wait_before_deleting: other
                .millis_to_wait_before_deleting
                .or(self.millis_to_wait_before_deleting),
            merge_bytes_limit: other.merge_bytes_limit.or(self.merge_bytes_limit),
            merge_segments_limit: other.merge_segments_limit.or(self.merge_segments_limit),
            max_segments_to_move: other.max_segments_to_move.or(self.max_segments_to_move),
            replicant_lifetime: other.replicant_lifetime.or(self.replicant_lifetime),
            replication_throttle_limit: other
                .replication_throttle_limit
                .or(self.replication_throttle_limit),
            balancer_compute_threads: other
                .balancer_compute_threads
                .or(self.balancer_compute_threads),
            emit_balancing_stats: other.emit_balancing_stats.or(self.emit_balancing_stats),
            kill_all_data_sources: other.kill_all_data_sources.or(self.kill_all_data_sources),
            kill_data_source_whitelist: other
                .kill_data_source_whitelist
                .or(self.kill_data_source_whitelist),
            max_segments_in_node_loading_queue: other
                .max_segments_in_node_loading_queue
                .or(self.max_segments_in_node_loading_queue),
        }
    }
}
