//! Monitoring layer
//!
//! Decides which manifest dependencies are due and runs their checks
//! concurrently through the checker registry.
//!
//! # Modules
//!
//! - [`orchestrator`]: `Monitor`, running single and batch checks
//! - [`scheduler`]: Due/not-due decisions and schedule summaries
//! - [`types`]: Dependencies, monitoring rules and check results

pub mod orchestrator;
pub mod scheduler;
pub mod types;

pub use orchestrator::Monitor;
