//! Domain logic for the map change monitor.
//!
//! Everything here is independent of the database: the `.kvp` line splice,
//! the on-disk config patcher, and the instance restarter.

pub mod config_patch;
pub mod instance;
pub mod kvp;
pub mod restart;
pub mod types;
