//! Linux driver reset via polkit.
//!
//! Unloads the kernel NFC modules that grab PN533 readers away from pcscd,
//! then restarts pcscd.  Both steps need root, so the shell line runs under
//! `pkexec`, which shows the desktop's authentication prompt.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::application::reinitialize::{DriverResetStrategy, ResetError};

/// Shell line run with elevated privileges.
pub const RESET_COMMAND: &str = "rmmod pn533_usb pn533 nfc & systemctl restart pcscd";

/// Runs [`RESET_COMMAND`] through `pkexec sh -c`.
#[derive(Debug, Clone)]
pub struct PrivilegedShellReset {
    /// Name shown to the operator in logs alongside the prompt.
    prompt_name: String,
    program: String,
    args: Vec<String>,
}

impl PrivilegedShellReset {
    pub fn new(prompt_name: &str) -> Self {
        Self::with_command(
            prompt_name,
            "pkexec",
            &["sh", "-c", RESET_COMMAND],
        )
    }

    /// Uses an arbitrary command instead of `pkexec`.
    pub fn with_command(prompt_name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            prompt_name: prompt_name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl DriverResetStrategy for PrivilegedShellReset {
    fn name(&self) -> &str {
        "pkexec"
    }

    async fn reset(&self) -> Result<(), ResetError> {
        info!(
            "{}: requesting privileges to run `{}`",
            self.prompt_name, RESET_COMMAND
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| ResetError::PrivilegedExecutionFailure(e.to_string()))?;

        if output.status.success() {
            info!("driver reset completed");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command exited with {}", output.status)
        } else {
            stderr
        };
        warn!("driver reset failed: {message}");
        Err(ResetError::PrivilegedExecutionFailure(message))
    }
}
