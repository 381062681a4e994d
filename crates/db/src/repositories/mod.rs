//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod backend_repo;
pub mod wipe_repo;

pub use backend_repo::BackendRepo;
pub use wipe_repo::WipeRepo;
