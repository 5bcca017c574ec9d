//! Scheduler core for running a Cassandra-like database on top of a
//! two-level resource-offer cluster manager: registers nodes from offers,
//! drives each one through executor binding, metadata discovery, and
//! gated server launch, then keeps serving nodes healthy and walks
//! cluster-wide maintenance jobs across them one at a time.

pub mod admission;
pub mod artifact;
pub mod cli;
pub mod clock;
pub mod decision;
pub mod error;
pub mod job;
pub mod model;
pub mod node;
pub mod ports;
pub mod resolver;
pub mod resource;
pub mod store;

pub use decision::Scheduler;
pub use error::{Result, SchedulerError};
