//! Named channels between the station and the frontend.
//!
//! The frontend code addresses the station by these names; each maps to one
//! [`FrontendMsg`](super::FrontendMsg) or [`StationMsg`](super::StationMsg)
//! variant.

/// Request/response: `{ model, action, data }` → model value.
pub const DB: &str = "db";
/// Request/response: no payload → attached reader names.
pub const READERS: &str = "readers";
/// Fire-and-forget: privileged driver reset.
pub const REINIT_NFC: &str = "reinitNFC";
/// Station → frontend: normalized card UID.
pub const UID: &str = "uid";
