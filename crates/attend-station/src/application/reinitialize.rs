//! Privileged reset of the card-reader driver stack.
//!
//! Some USB NFC readers (PN533-based ones in particular) get claimed by the
//! kernel's own NFC driver, which stops pcscd from seeing them.  The operator
//! can ask the station to unload those modules and restart pcscd; once that
//! succeeds the station throws away its driver handle and binds a fresh one.
//!
//! How the reset is done depends on the platform, so it sits behind the
//! [`DriverResetStrategy`] trait.  Each platform module in
//! `infrastructure::driver_reset` provides one implementation, plus an
//! explicit "unsupported" strategy for platforms without a procedure.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for driver reset operations.
#[derive(Debug, Error)]
pub enum ResetError {
    /// No reset procedure exists for this platform.
    #[error("Not Supported Platform {0}")]
    UnsupportedPlatform(String),

    /// The privileged command could not be run or exited unsuccessfully.
    /// Carries the raw error text.
    #[error("{0}")]
    PrivilegedExecutionFailure(String),
}

/// A platform-specific way to reset the card-reader driver stack.
#[async_trait]
pub trait DriverResetStrategy: Send + Sync {
    /// Human-readable strategy name for logs.
    fn name(&self) -> &str;

    /// Performs the reset.  No retry, no timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError::UnsupportedPlatform`] when the platform has no
    /// procedure, or [`ResetError::PrivilegedExecutionFailure`] when the
    /// privileged command fails.
    async fn reset(&self) -> Result<(), ResetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_message_names_platform() {
        let err = ResetError::UnsupportedPlatform("windows".to_string());
        assert_eq!(err.to_string(), "Not Supported Platform windows");
    }

    #[test]
    fn test_privileged_failure_message_is_raw_text() {
        let err = ResetError::PrivilegedExecutionFailure("User did not grant permission.".into());
        assert_eq!(err.to_string(), "User did not grant permission.");
    }
}
