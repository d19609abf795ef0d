//! The operator-facing error channel.
//!
//! Every failure the station cannot handle itself (a bad dispatch request,
//! a failed driver reset) ends in exactly one place: a modal error dialog
//! with a fixed title.  Nothing is retried and nothing flows back into the
//! frontend's data.

/// Shows blocking error dialogs to the operator.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    /// Displays `message` in a modal dialog titled `title`.
    fn show_error_box(&self, title: &str, message: &str);
}

/// Default dialog title ("Error").
pub const DEFAULT_ERROR_TITLE: &str = "錯誤";
