//! Store error types.

use glide_history::EncodeError;

/// A stream that must only move forward went backwards.
///
/// Never corrected locally: it means the upstream history is inconsistent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderingViolation {
    /// An acknowledged interval ended before the previous one.
    #[error("received out-of-order interval ending at {end_ts}, previous ended at {previous_end_ts}")]
    IntervalRegressed {
        /// End of the most recent accepted interval.
        previous_end_ts: u64,
        /// End of the rejected interval.
        end_ts: u64,
    },

    /// A submitted operation carried an older version number.
    #[error("version numbers out of order: {version} < {previous}")]
    VersionRegressed {
        /// Version already stored.
        previous: u64,
        /// Rejected version.
        version: u64,
    },
}

/// Errors returned by the submit entry point.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Operations went backwards in version order.
    #[error(transparent)]
    Ordering(#[from] OrderingViolation),

    /// Operations mapped onto a regressing server time.
    #[error("failed to encode batch: {0}")]
    Encode(#[from] EncodeError),
}
