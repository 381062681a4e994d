//! Row types for the tables the monitor reads and writes.

pub mod wipe;
