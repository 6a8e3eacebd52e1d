//! fleetwork daemon library
//!
//! Wires the in-memory control plane, the execution controller and the
//! health/metrics endpoint into one process.

pub mod config;
pub mod error;
pub mod seed;
pub mod server;

pub use config::{DaemonConfig, LoggingConfig, ServerConfig};
pub use error::{DaemonError, DaemonResult};
pub use seed::Seed;
pub use server::Server;
