//! Mock card reader for unit testing.
//!
//! Allows tests to inject synthetic [`ReaderEvent`]s without requiring a
//! PC/SC daemon or a physical reader.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{CardReaderDriver, DriverError, ReaderEvent};

/// A mock implementation of [`CardReaderDriver`] that allows tests to inject
/// events.
///
/// Clones share state, so a test can keep one clone while the station owns
/// another.
#[derive(Clone, Default)]
pub struct MockCardReader {
    sender: Arc<Mutex<Option<UnboundedSender<ReaderEvent>>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MockCardReader {
    /// Creates a new mock card reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a synthetic event, as if reported by the driver.
    ///
    /// Returns `false` if the driver is not running or the receiver is gone.
    pub fn inject_event(&self, event: ReaderEvent) -> bool {
        match &*self.sender.lock().expect("lock poisoned") {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Shorthand for [`ReaderEvent::Attached`].
    pub fn attach(&self, name: &str) -> bool {
        self.inject_event(ReaderEvent::Attached(name.to_string()))
    }

    /// Shorthand for [`ReaderEvent::Detached`].
    pub fn detach(&self, name: &str) -> bool {
        self.inject_event(ReaderEvent::Detached(name.to_string()))
    }

    /// Shorthand for [`ReaderEvent::CardDetected`].
    pub fn tap(&self, reader: &str, uid: &[u8]) -> bool {
        self.inject_event(ReaderEvent::CardDetected {
            reader: reader.to_string(),
            uid: uid.to_vec(),
        })
    }

    /// Number of times [`CardReaderDriver::start`] was called.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of times [`CardReaderDriver::stop`] was called.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl CardReaderDriver for MockCardReader {
    fn start(&self) -> Result<UnboundedReceiver<ReaderEvent>, DriverError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().expect("lock poisoned") = Some(tx);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    fn stop(&self) {
        // Drop the sender to close the channel
        *self.sender.lock().expect("lock poisoned") = None;
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reader_starts_and_receives_events() {
        // Arrange
        let reader = MockCardReader::new();
        let mut rx = reader.start().expect("start should succeed");

        // Act
        reader.attach("ACR122");
        reader.tap("ACR122", &[0x04, 0xA3, 0x9F]);

        // Assert
        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::Attached("ACR122".into()));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ReaderEvent::CardDetected { ref uid, .. } if uid == &[0x04, 0xA3, 0x9F]
        ));
    }

    #[test]
    fn test_mock_reader_stop_closes_channel() {
        // Arrange
        let reader = MockCardReader::new();
        let mut rx = reader.start().expect("start should succeed");

        // Act
        reader.stop();

        // Assert – channel should be disconnected
        assert!(rx.try_recv().is_err());
        assert!(!reader.attach("late"));
        assert_eq!(reader.stop_count(), 1);
    }

    #[test]
    fn test_inject_before_start_is_rejected() {
        let reader = MockCardReader::new();
        assert!(!reader.detach("ACR122"));
        assert_eq!(reader.start_count(), 0);
    }
}
