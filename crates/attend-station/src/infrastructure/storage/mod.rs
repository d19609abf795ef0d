//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory
//!   (or an explicit `--config` path).
//! - Writing a default file on first run so operators have something to edit.
//! - Reading the process environment that switches development mode on and off.
//!
//! Attendance data itself lives in SQLite; see `infrastructure::persistence`.

pub mod config;
