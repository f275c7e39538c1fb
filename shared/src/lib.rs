//! Types and configuration shared between the Chapel admin API server and
//! its tests.
//!
//! Nothing in here touches the network or the database; the server crate
//! owns all I/O.

pub mod config;
pub mod types;
