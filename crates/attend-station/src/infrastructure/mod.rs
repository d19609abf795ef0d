//! Infrastructure layer for the attendance station.
//!
//! Contains OS-facing adapters: the PC/SC card-reader driver, the privileged
//! driver reset, SQLite persistence, the config file, the single-instance
//! lock, signal handling and the WebSocket bridge to the frontend.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `attend_core`, but MUST NOT be imported by the `application` layer.

pub mod card_reader;
pub mod driver_reset;
pub mod instance_lock;
pub mod persistence;
pub mod signals;
pub mod storage;
pub mod ui_bridge;
