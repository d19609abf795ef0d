//! TrackReadersUseCase: the registry of attached card readers.
//!
//! The card-reader driver reports readers appearing and disappearing.  The
//! registry keeps their names in attach order so the frontend can show which
//! readers are live (`readers` channel).
//!
//! # Invariants
//!
//! - A name appears at most once.  A second attach for the same name is
//!   ignored.
//! - Detaching a name that is not present leaves the list untouched.

use tracing::debug;

/// Ordered set of attached reader names.
///
/// Owned by the station's event loop; nothing else mutates it.
#[derive(Debug, Default, Clone)]
pub struct ReaderRegistry {
    readers: Vec<String>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly attached reader.
    ///
    /// Returns `false` if the name was already registered.
    pub fn on_reader_attached(&mut self, name: &str) -> bool {
        if self.contains(name) {
            debug!("reader {name:?} already registered; ignoring duplicate attach");
            return false;
        }
        self.readers.push(name.to_string());
        true
    }

    /// Removes the first occurrence of `name`.
    ///
    /// Returns `false` if the name was not registered.
    pub fn on_reader_detached(&mut self, name: &str) -> bool {
        match self.readers.iter().position(|r| r == name) {
            Some(index) => {
                self.readers.remove(index);
                true
            }
            None => {
                debug!("reader {name:?} not registered; ignoring detach");
                false
            }
        }
    }

    /// Returns the attached reader names in attach order.
    pub fn list(&self) -> &[String] {
        &self.readers
    }

    pub fn contains(&self, name: &str) -> bool {
        self.readers.iter().any(|r| r == name)
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Forgets every reader.  Used when the driver handle is replaced.
    pub fn clear(&mut self) {
        self.readers.clear();
    }
}
