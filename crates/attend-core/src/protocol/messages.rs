//! JSON message types for the frontend-facing WebSocket protocol.
//!
//! Every message is a JSON object with a `"type"` field naming the variant;
//! the remaining fields sit in the same object:
//!
//! ```json
//! {"type":"Db","request_id":7,"model":"member","action":"findByUid","data":{"uid":"04 A3 9F"}}
//! {"type":"Reply","request_id":7,"value":{"id":"…","name":"Alice","uid":"04 A3 9F"}}
//! {"type":"Uid","uid":"04 A3 9F"}
//! ```
//!
//! Requests that expect an answer carry a `request_id` chosen by the
//! frontend.  The station echoes it in the matching [`StationMsg::Reply`],
//! which lets the frontend keep several requests in flight without ever
//! blocking on one.
//!
//! Two enums, one per direction, make it a compile-time error to send a
//! station-only message from the frontend side and vice versa.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channels;

// ── Frontend → Station ────────────────────────────────────────────────────────

/// All messages the frontend can send to the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrontendMsg {
    /// Persistence request routed through the dispatch gateway.
    Db {
        request_id: u64,
        /// `"member"` or `"record"`; anything else fails dispatch.
        model: String,
        /// Action name on the model, e.g. `"create"`.
        action: String,
        /// Action payload; `null` when the action takes none.
        #[serde(default)]
        data: Value,
    },

    /// Asks for the names of the attached readers.
    Readers { request_id: u64 },

    /// Asks the station to reset the card-reader driver.  No reply.
    ReinitNfc,

    /// Reports the window's minimized state after the user changed it.
    WindowState { minimized: bool },

    /// The user closed the window.
    WindowClosed,
}

impl FrontendMsg {
    /// Name of the logical channel this message travels on, if any.
    pub fn channel(&self) -> Option<&'static str> {
        match self {
            FrontendMsg::Db { .. } => Some(channels::DB),
            FrontendMsg::Readers { .. } => Some(channels::READERS),
            FrontendMsg::ReinitNfc => Some(channels::REINIT_NFC),
            FrontendMsg::WindowState { .. } | FrontendMsg::WindowClosed => None,
        }
    }
}

// ── Station → Frontend ────────────────────────────────────────────────────────

/// All messages the station can send to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StationMsg {
    /// Answer to a `Db` or `Readers` request.
    ///
    /// `value` is `null` when a dispatch failed; the failure itself is shown
    /// through [`StationMsg::ErrorDialog`].
    Reply { request_id: u64, value: Value },

    /// A card was tapped; `uid` is the normalized display string.
    Uid { uid: String },

    /// Window management command.
    Window { command: WindowCommand },

    /// Modal error dialog to show to the operator.
    ErrorDialog { title: String, message: String },
}

impl StationMsg {
    /// Name of the logical channel this message travels on, if any.
    pub fn channel(&self) -> Option<&'static str> {
        match self {
            StationMsg::Uid { .. } => Some(channels::UID),
            _ => None,
        }
    }
}

/// Window management commands pushed to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WindowCommand {
    /// Make the window visible.
    Show,
    /// Bring the window to the foreground.
    Focus,
    /// Un-minimize the window.
    Restore,
    /// Open the developer inspection panel.
    OpenDevTools,
    /// Navigate the window to `url`.
    Load { url: String },
}
