//! Rentops scheduling core.
//!
//! Constraint-based advisory scheduler for event-rental operations:
//! assigns a delivery/setup team and time window to an order, detects
//! co-join opportunities (chaining two nearby jobs back-to-back without a
//! hub return), negotiates overtime policy, and checks team double-booking
//! against every other order in the system.
//!
//! The crate performs no I/O of its own. Order persistence sits behind the
//! [`store::OrderStore`] trait and driving distances behind the
//! [`services::distance::DistanceService`] trait; the engine itself only
//! consumes distances the caller already resolved.

pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod store;
pub mod types;

pub use error::{ScheduleError, ScheduleResult};
pub use services::engine::{run_ai_schedule, ScheduleRequest};
pub use store::{MemoryOrderStore, OrderStore};
