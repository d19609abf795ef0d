//! Platform implementations of [`DriverResetStrategy`].
//!
//! The strategy is picked at compile time: Linux gets
//! [`linux::PrivilegedShellReset`], every other platform gets
//! [`UnsupportedPlatformReset`], which always fails with
//! [`ResetError::UnsupportedPlatform`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::application::lifecycle::Platform;
use crate::application::reinitialize::{DriverResetStrategy, ResetError};

#[cfg(target_os = "linux")]
pub mod linux;

/// Strategy for platforms without a reset procedure.
#[derive(Debug, Clone)]
pub struct UnsupportedPlatformReset {
    platform: Platform,
}

impl UnsupportedPlatformReset {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl DriverResetStrategy for UnsupportedPlatformReset {
    fn name(&self) -> &str {
        "unsupported"
    }

    async fn reset(&self) -> Result<(), ResetError> {
        warn!("driver reset requested on unsupported platform {}", self.platform);
        Err(ResetError::UnsupportedPlatform(self.platform.to_string()))
    }
}

/// Returns the reset strategy for the platform this binary was built for.
pub fn platform_reset_strategy(app_name: &str) -> Arc<dyn DriverResetStrategy> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(linux::PrivilegedShellReset::new(app_name))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = app_name;
        Arc::new(UnsupportedPlatformReset::new(Platform::current()))
    }
}
