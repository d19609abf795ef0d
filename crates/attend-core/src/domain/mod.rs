//! Domain entities for the attendance station.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no PC/SC calls, no SQL, no sockets.  Outer layers (the
//! station's application and infrastructure modules) depend on these types,
//! never the other way around.

/// Card UID bytes and their canonical display string.
pub mod card_uid;
/// Closed set of `(model, action)` pairs the dispatch gateway accepts.
pub mod dispatch;
pub mod member;
pub mod record;
