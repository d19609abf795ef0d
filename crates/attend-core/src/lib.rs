//! # attend-core
//!
//! Shared library for the attendance station containing the card UID
//! normalization, the member/record entities, the dispatch routing table,
//! and the JSON protocol spoken with the presentation layer.
//!
//! It has zero dependencies on OS APIs, card-reader drivers, databases, or
//! sockets, so everything here can be unit-tested anywhere.
//!
//! # Architecture overview
//!
//! The station listens for NFC card taps, shows the card's UID in the UI, and
//! lets the UI read and write members and attendance records.  This crate
//! holds the pieces every layer agrees on:
//!
//! - **`domain`** – Pure business types: [`CardUid`] and its display form,
//!   [`Member`] and [`Record`], and the closed set of dispatchable actions
//!   ([`DispatchTarget`]).
//!
//! - **`protocol`** – The channel names and the JSON messages exchanged with
//!   the frontend over the presentation bridge.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `attend_core::CardUid` instead of `attend_core::domain::card_uid::CardUid`.
pub use domain::card_uid::{format_uid, CardUid};
pub use domain::dispatch::{DispatchError, DispatchTarget, MemberAction, ModelName, RecordAction};
pub use domain::member::{Member, MemberPatch, NewMember};
pub use domain::record::{NewRecord, Record, RecordQuery};
pub use protocol::messages::{FrontendMsg, StationMsg, WindowCommand};
