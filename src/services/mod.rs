//! Scheduling services

pub mod cojoin;
pub mod commit;
pub mod distance;
pub mod engine;
pub mod overtime;
pub mod route_optimizer;
pub mod timeutil;
pub mod workload;
