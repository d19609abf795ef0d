//! WebSocket server: the frontend's connection to the station.
//!
//! This module is responsible for:
//!
//! 1. Accepting WebSocket sessions from the frontend on loopback.
//! 2. Parsing inbound JSON into [`FrontendMsg`] and handing it to the station
//!    event loop together with a per-session reply channel.
//! 3. Pushing every broadcast [`StationMsg`] (UIDs, window commands, error
//!    dialogs) and every session reply back as JSON text frames.
//!
//! It also provides the window side of the presentation layer:
//! [`WsWindow`] turns `show`/`focus`/`restore` into [`WindowCommand`]s,
//! [`WsWindowHost`] "creates" a window by optionally launching the frontend,
//! and [`UiHub`] doubles as the [`ErrorReporter`] that raises the error
//! dialog.
//!
//! ```text
//!   frontend ──ws──► run_session ── StationEvent::Frontend ──► event loop
//!   frontend ◄─ws─── run_session ◄── reply_to (per session) ◄──┘
//!                               ◄── UiHub broadcast ◄── WsWindow / dialogs
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use attend_core::{FrontendMsg, StationMsg, WindowCommand};

use super::StationEvent;
use crate::application::forward_cards::PresentationSurface;
use crate::application::lifecycle::{MainWindow, WindowError, WindowHost, WindowSpec};
use crate::application::report_errors::ErrorReporter;

/// Buffered station messages per session before a slow one starts lagging.
const BROADCAST_CAPACITY: usize = 256;

// ── Hub ───────────────────────────────────────────────────────────────────────

/// Fan-out of station messages to every connected session.
#[derive(Clone)]
pub struct UiHub {
    outbound: broadcast::Sender<StationMsg>,
    minimized: Arc<AtomicBool>,
}

impl Default for UiHub {
    fn default() -> Self {
        Self::new()
    }
}

impl UiHub {
    pub fn new() -> Self {
        let (outbound, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            outbound,
            minimized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A receiver for every message sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StationMsg> {
        self.outbound.subscribe()
    }

    /// Broadcasts `msg`.  Dropped silently when no session is connected.
    pub fn send(&self, msg: StationMsg) {
        if self.outbound.send(msg).is_err() {
            debug!("no frontend session connected; message dropped");
        }
    }

    /// Records the minimized state the frontend reported.
    pub fn set_minimized(&self, minimized: bool) {
        self.minimized.store(minimized, Ordering::SeqCst);
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }
}

impl ErrorReporter for UiHub {
    fn show_error_box(&self, title: &str, message: &str) {
        error!("{title}: {message}");
        self.send(StationMsg::ErrorDialog {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

// ── Window ────────────────────────────────────────────────────────────────────

/// The main window, rendered by whatever frontend is connected.
pub struct WsWindow {
    hub: UiHub,
}

impl WsWindow {
    pub fn new(hub: UiHub) -> Self {
        Self { hub }
    }

    fn command(&self, command: WindowCommand) {
        self.hub.send(StationMsg::Window { command });
    }
}

impl PresentationSurface for WsWindow {
    fn show(&self) {
        self.command(WindowCommand::Show);
    }
    fn focus(&self) {
        self.command(WindowCommand::Focus);
    }
    fn restore(&self) {
        self.hub.set_minimized(false);
        self.command(WindowCommand::Restore);
    }
    fn is_minimized(&self) -> bool {
        self.hub.is_minimized()
    }
    fn emit(&self, msg: StationMsg) {
        self.hub.send(msg);
    }
}

impl MainWindow for WsWindow {
    fn load(&self, url: &str) {
        self.command(WindowCommand::Load {
            url: url.to_string(),
        });
    }
    fn open_dev_tools(&self) {
        self.command(WindowCommand::OpenDevTools);
    }
    fn as_surface(&self) -> &dyn PresentationSurface {
        self
    }
}

/// Creates [`WsWindow`]s, launching the frontend if a launcher is configured.
pub struct WsWindowHost {
    hub: UiHub,
    launcher: Option<String>,
}

impl WsWindowHost {
    pub fn new(hub: UiHub, launcher: Option<String>) -> Self {
        Self { hub, launcher }
    }
}

impl WindowHost for WsWindowHost {
    fn create(&self, spec: &WindowSpec) -> Result<Arc<dyn MainWindow>, WindowError> {
        self.hub.set_minimized(false);
        if let Some(launcher) = &self.launcher {
            let argv = launcher_argv(launcher, &spec.content.url());
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| WindowError::LaunchFailed("launcher command is empty".into()))?;
            tokio::process::Command::new(program)
                .args(args)
                .spawn()
                .map_err(|e| WindowError::LaunchFailed(format!("{program}: {e}")))?;
            info!("launched frontend with `{launcher}`");
        }
        Ok(Arc::new(WsWindow::new(self.hub.clone())))
    }
}

/// Splits a launcher command line and substitutes `{url}`.
pub fn launcher_argv(launcher: &str, url: &str) -> Vec<String> {
    launcher
        .split_whitespace()
        .map(|part| part.replace("{url}", url))
        .collect()
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Runs the WebSocket accept loop until `running` is set to `false`.
///
/// Each accepted connection gets its own task, so a slow frontend never
/// blocks the accept loop or the station.
pub async fn run_server(
    listener: TcpListener,
    hub: UiHub,
    events: mpsc::UnboundedSender<StationEvent>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to read WebSocket listener address")?;
    info!("frontend bridge listening on ws://{addr}");

    while running.load(Ordering::Relaxed) {
        // Short accept timeout so the loop notices the shutdown flag.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("frontend connection from {peer_addr}");
                let hub = hub.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, hub, events).await;
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }

    info!("frontend bridge stopped");
    Ok(())
}

async fn handle_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: UiHub,
    events: mpsc::UnboundedSender<StationEvent>,
) {
    match run_session(raw_stream, peer_addr, hub, events).await {
        Ok(()) => info!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: UiHub,
    events: mpsc::UnboundedSender<StationEvent>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    let (mut sink, mut stream) = ws_stream.split();

    // Subscribe before announcing the session so nothing sent in reaction
    // to SessionOpened is missed.
    let mut broadcasts = hub.subscribe();
    let (reply_tx, mut replies) = mpsc::unbounded_channel::<StationMsg>();
    events
        .send(StationEvent::SessionOpened)
        .context("station event loop has stopped")?;
    info!("frontend session established: {peer_addr}");

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                None | Some(Ok(WsMessage::Close(_))) => break,
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(msg) = parse_frontend_msg(&text, peer_addr) {
                        route_inbound(msg, &hub, &events, &reply_tx)?;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(e).with_context(|| format!("session {peer_addr}: read failed"));
                }
            },
            outbound = broadcasts.recv() => match outbound {
                Ok(msg) => send_json(&mut sink, &msg).await?,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("session {peer_addr} lagged; {n} station messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(reply) = replies.recv() => send_json(&mut sink, &reply).await?,
        }
    }
    Ok(())
}

fn parse_frontend_msg(text: &str, peer_addr: SocketAddr) -> Option<FrontendMsg> {
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("session {peer_addr}: ignoring malformed message: {e}");
            None
        }
    }
}

fn route_inbound(
    msg: FrontendMsg,
    hub: &UiHub,
    events: &mpsc::UnboundedSender<StationEvent>,
    reply_to: &mpsc::UnboundedSender<StationMsg>,
) -> anyhow::Result<()> {
    if let FrontendMsg::WindowState { minimized } = msg {
        hub.set_minimized(minimized);
        return Ok(());
    }
    events
        .send(StationEvent::Frontend {
            msg,
            reply_to: reply_to.clone(),
        })
        .context("station event loop has stopped")
}

async fn send_json<S>(sink: &mut S, msg: &StationMsg) -> anyhow::Result<()>
where
    S: futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(msg).context("failed to serialize station message")?;
    sink.send(WsMessage::Text(text))
        .await
        .context("failed to write to frontend")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
