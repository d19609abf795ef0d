//! Application layer use cases for the attendance station.
//!
//! Use cases in this layer orchestrate domain types from `attend_core` to
//! fulfil what the operator does at the station.  They depend on traits
//! (`PresentationSurface`, `MemberModel`, `DriverResetStrategy`, ...) and
//! never on PC/SC, SQLite or sockets directly, so the infrastructure can be
//! swapped or mocked without touching this code.
//!
//! # Sub-modules
//!
//! - **`track_readers`**  – Registry of attached card readers.
//! - **`forward_cards`**  – Card tap → normalized UID → window.
//! - **`dispatch`**       – `(model, action, data)` requests → persistence
//!   models.
//! - **`lifecycle`**      – The single main window and when to quit.
//! - **`reinitialize`**   – Privileged driver reset contract.
//! - **`report_errors`**  – The operator error dialog.

pub mod dispatch;
pub mod forward_cards;
pub mod lifecycle;
pub mod reinitialize;
pub mod report_errors;
pub mod track_readers;
