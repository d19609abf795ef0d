//! Card-reader infrastructure for the station.
//!
//! The production driver talks PC/SC (pcsc-lite on Linux/macOS, WinSCard on
//! Windows) from a dedicated blocking thread.  Reader and card events are
//! placed into a Tokio channel and consumed by the station's event loop.
//!
//! # Event order
//!
//! Events are delivered in the order the driver observes them.  There is no
//! batching, coalescing, or reordering protection: a flaky reader that
//! detaches and re-attaches quickly produces exactly that sequence.
//!
//! # Testability
//!
//! The [`CardReaderDriver`] trait lets tests inject synthetic events through
//! [`mock::MockCardReader`] without a PC/SC daemon or a physical reader.

use tokio::sync::mpsc::UnboundedReceiver;

pub mod mock;
pub mod pcsc;

/// An event produced by the card-reader driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A reader was plugged in (or was present when the driver started).
    Attached(String),
    /// A reader was unplugged.
    Detached(String),
    /// A card was placed on `reader`; `uid` holds the raw UID bytes.
    CardDetected { reader: String, uid: Vec<u8> },
    /// The driver hit an error it could recover from.
    Error(String),
}

/// Error type for card-reader driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to establish PC/SC context: {0}")]
    ContextUnavailable(String),
    #[error("card reader driver is already running")]
    AlreadyStarted,
    #[error("failed to spawn driver thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Trait abstracting the card-reader driver.
///
/// The production implementation is [`pcsc::PcscDriver`]; tests use
/// [`mock::MockCardReader`].
pub trait CardReaderDriver: Send + Sync {
    /// Starts the driver and returns a receiver for its events.
    fn start(&self) -> Result<UnboundedReceiver<ReaderEvent>, DriverError>;
    /// Stops the driver and releases all OS resources.
    fn stop(&self);
}

/// Builds fresh driver handles; called at startup and after every reset.
pub type DriverFactory = Box<dyn Fn() -> Box<dyn CardReaderDriver> + Send + Sync>;
