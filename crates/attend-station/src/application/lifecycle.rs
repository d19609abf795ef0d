//! LifecycleUseCase: the single main window and when the process quits.
//!
//! # Rules
//!
//! - At startup exactly one main window is created from a fixed
//!   [`WindowSpec`] (800×600, no native frame).  It loads the dev server URL
//!   in development, otherwise the packaged `index.html`.  Development builds
//!   also open the developer inspection panel unless running under test.
//! - A second launch of the station never opens a second window: the
//!   existing one is restored (if minimized) and focused.
//! - Closing the window drops the station's handle to it.  Since there is
//!   only one window, that is also "all windows closed", which quits the
//!   process except on macOS, where apps conventionally stay alive.
//! - `activate` (the app is re-opened while no window exists) recreates it.
//!
//! ```text
//!            on_ready / on_activate
//!   (none) ─────────────────────────►  Some(window)
//!      ▲                                   │
//!      └────────── on_window_closed ───────┘  → Quit unless macOS
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::forward_cards::PresentationSurface;

// ── Platform ──────────────────────────────────────────────────────────────────

/// Operating-system family the station was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl Platform {
    /// The platform of the running build, fixed at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// Whether the app keeps running after its last window closes.
    pub fn keeps_running_without_windows(self) -> bool {
        matches!(self, Platform::MacOs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Other => std::env::consts::OS,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Window description ────────────────────────────────────────────────────────

/// Where the window's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// A live dev server (development mode).
    DevServer(String),
    /// The packaged frontend entry point on disk.
    Packaged(PathBuf),
}

impl ContentSource {
    /// URL the window should load.
    pub fn url(&self) -> String {
        match self {
            ContentSource::DevServer(url) => url.clone(),
            ContentSource::Packaged(path) => {
                let path = path.to_string_lossy().replace('\\', "/");
                if path.starts_with('/') {
                    format!("file://{path}")
                } else {
                    format!("file:///{path}")
                }
            }
        }
    }
}

/// Fixed description of the main window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub width: u32,
    pub height: u32,
    /// `true` for a window without native frame/title bar.
    pub frameless: bool,
    pub content: ContentSource,
    /// Open the developer inspection panel after loading.
    pub dev_tools: bool,
}

// ── Window abstractions ───────────────────────────────────────────────────────

/// Error type for window creation.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("failed to launch window: {0}")]
    LaunchFailed(String),
}

/// The main window as owned by the lifecycle manager.
pub trait MainWindow: PresentationSurface {
    /// Navigates the window to `url`.
    fn load(&self, url: &str);
    /// Opens the developer inspection panel.
    fn open_dev_tools(&self);
    /// The same window, seen as a plain presentation surface.
    fn as_surface(&self) -> &dyn PresentationSurface;
}

/// Creates main windows.
pub trait WindowHost: Send + Sync {
    /// Creates a window matching `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::LaunchFailed`] if the window cannot be opened.
    fn create(&self, spec: &WindowSpec) -> Result<Arc<dyn MainWindow>, WindowError>;
}

/// What the caller should do after a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Continue,
    Quit,
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Owns the (at most one) main window.
pub struct LifecycleManager {
    platform: Platform,
    spec: WindowSpec,
    host: Arc<dyn WindowHost>,
    window: Option<Arc<dyn MainWindow>>,
}

impl LifecycleManager {
    pub fn new(platform: Platform, spec: WindowSpec, host: Arc<dyn WindowHost>) -> Self {
        Self {
            platform,
            spec,
            host,
            window: None,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// The current window, if one is open.
    pub fn window(&self) -> Option<&Arc<dyn MainWindow>> {
        self.window.as_ref()
    }

    /// The current window as a presentation surface.
    pub fn surface(&self) -> Option<&dyn PresentationSurface> {
        self.window.as_deref().map(|w| w.as_surface())
    }

    /// Startup: creates the main window.
    ///
    /// # Errors
    ///
    /// Propagates [`WindowError`] from the host.
    pub fn on_ready(&mut self) -> Result<(), WindowError> {
        if self.window.is_some() {
            debug!("main window already exists; ignoring ready");
            return Ok(());
        }
        self.create_window()
    }

    /// Re-opens the window if none exists.  Returns `true` if one was created.
    ///
    /// # Errors
    ///
    /// Propagates [`WindowError`] from the host.
    pub fn on_activate(&mut self) -> Result<bool, WindowError> {
        if self.window.is_some() {
            return Ok(false);
        }
        self.create_window()?;
        Ok(true)
    }

    /// Another station process was launched: surface the existing window.
    pub fn on_second_instance(&self) {
        info!("second instance launch detected; focusing main window");
        if let Some(window) = &self.window {
            if window.is_minimized() {
                window.restore();
            }
            window.focus();
        }
    }

    /// The window was closed.  With a single window this also means all
    /// windows are closed.
    pub fn on_window_closed(&mut self) -> LifecycleOutcome {
        self.window = None;
        self.on_all_windows_closed()
    }

    /// Decides whether the process should quit with no windows open.
    pub fn on_all_windows_closed(&self) -> LifecycleOutcome {
        if self.platform.keeps_running_without_windows() {
            debug!("all windows closed; staying alive on {}", self.platform);
            LifecycleOutcome::Continue
        } else {
            LifecycleOutcome::Quit
        }
    }

    fn create_window(&mut self) -> Result<(), WindowError> {
        let window = self.host.create(&self.spec)?;
        let url = self.spec.content.url();
        info!(
            "main window {}x{} (frameless: {}) loading {url}",
            self.spec.width, self.spec.height, self.spec.frameless
        );
        window.load(&url);
        if self.spec.dev_tools {
            window.open_dev_tools();
        }
        self.window = Some(window);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::forward_cards::tests::RecordingSurface;
    use attend_core::StationMsg;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Window that records calls, backed by [`RecordingSurface`].
    #[derive(Default)]
    pub(crate) struct FakeWindow {
        pub surface: RecordingSurface,
        pub loaded: Mutex<Vec<String>>,
        pub dev_tools_opened: AtomicUsize,
    }

    impl PresentationSurface for FakeWindow {
        fn show(&self) {
            self.surface.show()
        }
        fn focus(&self) {
            self.surface.focus()
        }
        fn restore(&self) {
            self.surface.restore()
        }
        fn is_minimized(&self) -> bool {
            self.surface.is_minimized()
        }
        fn emit(&self, msg: StationMsg) {
            self.surface.emit(msg)
        }
    }

    impl MainWindow for FakeWindow {
        fn load(&self, url: &str) {
            self.loaded.lock().unwrap().push(url.to_string());
        }
        fn open_dev_tools(&self) {
            self.dev_tools_opened.fetch_add(1, Ordering::SeqCst);
        }
        fn as_surface(&self) -> &dyn PresentationSurface {
            self
        }
    }

    /// Host that hands out [`FakeWindow`]s and counts them.
    #[derive(Default)]
    pub(crate) struct FakeHost {
        pub created: Mutex<Vec<Arc<FakeWindow>>>,
    }

    impl FakeHost {
        pub fn created_count(&self) -> usize {
            self.created.lock().unwrap().len()
        }

        pub fn last(&self) -> Arc<FakeWindow> {
            self.created.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl WindowHost for FakeHost {
        fn create(&self, _spec: &WindowSpec) -> Result<Arc<dyn MainWindow>, WindowError> {
            let window = Arc::new(FakeWindow::default());
            self.created.lock().unwrap().push(window.clone());
            Ok(window as Arc<dyn MainWindow>)
        }
    }

    pub(crate) fn make_spec(dev_tools: bool) -> WindowSpec {
        WindowSpec {
            width: 800,
            height: 600,
            frameless: true,
            content: ContentSource::DevServer("http://localhost:8080".to_string()),
            dev_tools,
        }
    }

    fn make_manager(platform: Platform, dev_tools: bool) -> (LifecycleManager, Arc<FakeHost>) {
        let host = Arc::new(FakeHost::default());
        let manager = LifecycleManager::new(platform, make_spec(dev_tools), host.clone());
        (manager, host)
    }

    #[test]
    fn test_ready_creates_exactly_one_window_and_loads_content() {
        // Arrange
        let (mut manager, host) = make_manager(Platform::Linux, false);

        // Act
        manager.on_ready().unwrap();
        manager.on_ready().unwrap();

        // Assert
        assert_eq!(host.created_count(), 1);
        assert_eq!(*host.last().loaded.lock().unwrap(), ["http://localhost:8080"]);
        assert_eq!(host.last().dev_tools_opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dev_tools_opened_when_requested() {
        let (mut manager, host) = make_manager(Platform::Linux, true);
        manager.on_ready().unwrap();
        assert_eq!(host.last().dev_tools_opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_instance_focuses_existing_window_without_creating_one() {
        // Arrange
        let (mut manager, host) = make_manager(Platform::Linux, false);
        manager.on_ready().unwrap();

        // Act
        manager.on_second_instance();

        // Assert
        assert_eq!(host.created_count(), 1);
        assert_eq!(host.last().surface.calls(), ["focus"]);
    }

    #[test]
    fn test_second_instance_restores_minimized_window_first() {
        let (mut manager, host) = make_manager(Platform::Windows, false);
        manager.on_ready().unwrap();
        host.last().surface.minimized.store(true, Ordering::SeqCst);

        manager.on_second_instance();

        assert_eq!(host.last().surface.calls(), ["restore", "focus"]);
    }

    #[test]
    fn test_window_closed_quits_on_linux_and_windows() {
        for platform in [Platform::Linux, Platform::Windows, Platform::Other] {
            let (mut manager, _) = make_manager(platform, false);
            manager.on_ready().unwrap();
            assert_eq!(manager.on_window_closed(), LifecycleOutcome::Quit);
            assert!(manager.window().is_none());
        }
    }

    #[test]
    fn test_window_closed_keeps_running_on_macos_and_activate_recreates() {
        // Arrange
        let (mut manager, host) = make_manager(Platform::MacOs, false);
        manager.on_ready().unwrap();

        // Act
        let outcome = manager.on_window_closed();
        let recreated = manager.on_activate().unwrap();

        // Assert
        assert_eq!(outcome, LifecycleOutcome::Continue);
        assert!(recreated);
        assert_eq!(host.created_count(), 2);
        assert!(manager.window().is_some());
    }

    #[test]
    fn test_activate_with_open_window_does_nothing() {
        let (mut manager, host) = make_manager(Platform::MacOs, false);
        manager.on_ready().unwrap();
        assert!(!manager.on_activate().unwrap());
        assert_eq!(host.created_count(), 1);
    }

    #[test]
    fn test_second_instance_without_window_is_harmless() {
        let (manager, host) = make_manager(Platform::MacOs, false);
        manager.on_second_instance();
        assert_eq!(host.created_count(), 0);
    }

    #[test]
    fn test_packaged_content_url() {
        let src = ContentSource::Packaged(PathBuf::from("/opt/attendance/dist/index.html"));
        assert_eq!(src.url(), "file:///opt/attendance/dist/index.html");
    }

    #[test]
    fn test_only_macos_keeps_running_without_windows() {
        assert!(Platform::MacOs.keeps_running_without_windows());
        assert!(!Platform::Linux.keeps_running_without_windows());
        assert!(!Platform::Windows.keeps_running_without_windows());
    }
}
