//! Error taxonomy for the scheduling core.
//!
//! Malformed times/dates are not errors at the primitive level (those
//! return `None`); this enum covers the failures a caller must act on:
//! refused commits, missing orders, and the partial co-join write case
//! that needs manual reconciliation.

use thiserror::Error;

use crate::types::{Phase, Team};

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Team double-booked: the proposed interval overlaps an existing one.
    /// Carries everything needed for the operator-facing message.
    #[error("team {team} is already booked for order {clashing_order} during the proposed {phase} window of order {order_number}")]
    Conflict {
        team: Team,
        phase: Phase,
        order_number: String,
        clashing_order: String,
    },

    #[error("order {0} not found")]
    OrderNotFound(String),

    /// Order data that cannot be scheduled at all (e.g. no resolvable
    /// start time for a required phase).
    #[error("order {order_number}: {message}")]
    InvalidSchedule {
        order_number: String,
        message: String,
    },

    /// The linked-order half of a co-join commit failed after the primary
    /// order was already written. Flagged for manual reconciliation.
    #[error("co-join update for linked order {linked_order} failed: {source}")]
    CoJoinCommit {
        linked_order: String,
        #[source]
        source: Box<ScheduleError>,
    },

    #[error("order store error: {0}")]
    Store(String),
}
