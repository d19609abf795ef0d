//! ForwardCardsUseCase: pushes tapped card UIDs to the presentation layer.
//!
//! On every card-detected event the raw UID bytes are normalized into the
//! display form (`"04 A3 9F"`), the window is made visible, and the string
//! is emitted on the `uid` channel.  Nothing is validated and nothing is
//! written to the database here: recording attendance is an explicit
//! frontend action that goes through the dispatch gateway.

use attend_core::{format_uid, StationMsg};
use tracing::debug;

/// The surface the station draws on: the main window as seen from the
/// application layer.
///
/// The production implementation pushes to the connected frontend over
/// WebSocket; tests use a recording mock.
pub trait PresentationSurface: Send + Sync {
    /// Makes the window visible.
    fn show(&self);
    /// Brings the window to the foreground.
    fn focus(&self);
    /// Un-minimizes the window.
    fn restore(&self);
    /// Returns `true` if the frontend reported the window as minimized.
    fn is_minimized(&self) -> bool;
    /// Sends a message to the frontend.
    fn emit(&self, msg: StationMsg);
}

/// Card event forwarder.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardEventForwarder;

impl CardEventForwarder {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes `raw_uid`, shows the window and emits the UID.
    ///
    /// Returns the emitted display string.
    pub fn on_card_detected(&self, surface: &dyn PresentationSurface, raw_uid: &[u8]) -> String {
        let uid = format_uid(raw_uid);
        debug!("card detected: {uid}");
        surface.show();
        surface.emit(StationMsg::Uid { uid: uid.clone() });
        uid
    }
}
