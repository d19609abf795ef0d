//! The station event loop: wires application use cases to infrastructure.
//!
//! One task owns [`AppContext`] and consumes a single stream of
//! [`StationEvent`]s, coming from:
//!
//! - the card-reader driver (reader attach/detach, card taps),
//! - frontend sessions (`db`, `readers`, `reinitNFC`, window closed),
//! - the single-instance lock (a second launch),
//! - spawned tasks reporting back (driver reset finished),
//! - the shutdown signal.
//!
//! Because only this task touches the registry, the lifecycle manager and the
//! driver handle, none of them needs a lock.  Anything slow (persistence,
//! the privileged reset) runs in a spawned task so the loop keeps draining
//! card events while it waits.
//!
//! # Driver generations
//!
//! Every time a driver is started the generation counter goes up, and the
//! task forwarding its events tags them with that generation.  Events still
//! in flight from a discarded driver carry an old generation and are dropped,
//! so a reset can never re-add a reader that belonged to the old handle.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use attend_core::{FrontendMsg, StationMsg};

use crate::application::dispatch::DispatchGateway;
use crate::application::forward_cards::CardEventForwarder;
use crate::application::lifecycle::{LifecycleManager, LifecycleOutcome};
use crate::application::reinitialize::{DriverResetStrategy, ResetError};
use crate::application::report_errors::ErrorReporter;
use crate::application::track_readers::ReaderRegistry;
use crate::infrastructure::card_reader::{CardReaderDriver, DriverFactory, ReaderEvent};

pub mod ws_server;

/// Everything the station event loop reacts to.
#[derive(Debug)]
pub enum StationEvent {
    /// An event from the card-reader driver of the given generation.
    Reader { generation: u64, event: ReaderEvent },
    /// A frontend message; replies go to `reply_to` (the sending session).
    Frontend {
        msg: FrontendMsg,
        reply_to: mpsc::UnboundedSender<StationMsg>,
    },
    /// A frontend session connected.
    SessionOpened,
    /// Another launch of the station was detected.
    SecondInstance,
    /// A driver reset requested over `reinitNFC` completed.
    ReinitFinished(Result<(), ResetError>),
    /// The operator asked the station to stop.
    Shutdown,
}

/// Collaborators handed to [`AppContext::new`].
pub struct AppParts {
    pub lifecycle: LifecycleManager,
    pub gateway: Arc<DispatchGateway>,
    pub reset: Arc<dyn DriverResetStrategy>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub dialog_title: String,
    pub driver_factory: DriverFactory,
}

/// State owned by the station event loop.
pub struct AppContext {
    registry: ReaderRegistry,
    lifecycle: LifecycleManager,
    forwarder: CardEventForwarder,
    gateway: Arc<DispatchGateway>,
    reset: Arc<dyn DriverResetStrategy>,
    reporter: Arc<dyn ErrorReporter>,
    dialog_title: String,
    driver_factory: DriverFactory,
    driver: Option<Box<dyn CardReaderDriver>>,
    generation: u64,
    events: mpsc::UnboundedSender<StationEvent>,
}

impl AppContext {
    /// Creates the context.  `events` is the sender side of the loop's own
    /// channel, used by spawned tasks to report back.
    pub fn new(parts: AppParts, events: mpsc::UnboundedSender<StationEvent>) -> Self {
        Self {
            registry: ReaderRegistry::new(),
            lifecycle: parts.lifecycle,
            forwarder: CardEventForwarder::new(),
            gateway: parts.gateway,
            reset: parts.reset,
            reporter: parts.reporter,
            dialog_title: parts.dialog_title,
            driver_factory: parts.driver_factory,
            driver: None,
            generation: 0,
            events,
        }
    }

    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Generation of the current driver handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Creates the main window.  Called once at startup.
    pub fn on_ready(&mut self) {
        if let Err(e) = self.lifecycle.on_ready() {
            self.show_error(&e.to_string());
        }
    }

    /// Binds a fresh driver handle and forwards its events into the loop.
    ///
    /// A driver that fails to start is reported in the log only; the
    /// operator can retry with `reinitNFC`.
    pub fn start_driver(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let driver = (self.driver_factory)();
        match driver.start() {
            Ok(mut rx) => {
                let events = self.events.clone();
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        if events.send(StationEvent::Reader { generation, event }).is_err() {
                            break;
                        }
                    }
                    debug!("driver generation {generation} event stream ended");
                });
                info!("card-reader driver generation {generation} started");
                self.driver = Some(driver);
            }
            Err(e) => warn!("card-reader driver failed to start: {e}"),
        }
    }

    /// Stops and discards the current driver handle, if any.
    pub fn stop_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.stop();
        }
    }

    /// Handles one event.  Returns [`LifecycleOutcome::Quit`] when the
    /// station should stop.
    pub fn handle_event(&mut self, event: StationEvent) -> LifecycleOutcome {
        match event {
            StationEvent::Reader { generation, event } => {
                if generation == self.generation {
                    self.on_reader_event(event);
                } else {
                    debug!("dropping event from discarded driver generation {generation}");
                }
            }
            StationEvent::Frontend { msg, reply_to } => return self.on_frontend(msg, reply_to),
            StationEvent::SessionOpened => {
                if let Err(e) = self.lifecycle.on_activate() {
                    self.show_error(&e.to_string());
                }
            }
            StationEvent::SecondInstance => self.lifecycle.on_second_instance(),
            StationEvent::ReinitFinished(result) => self.on_reinit_finished(result),
            StationEvent::Shutdown => {
                info!("shutting down");
                return LifecycleOutcome::Quit;
            }
        }
        LifecycleOutcome::Continue
    }

    /// Drains `events` until an event asks to quit or every sender is gone,
    /// then stops the driver.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<StationEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle_event(event) == LifecycleOutcome::Quit {
                break;
            }
        }
        self.stop_driver();
        info!("station event loop stopped");
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    fn on_reader_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Attached(name) => {
                if self.registry.on_reader_attached(&name) {
                    info!("reader attached: {name}");
                }
            }
            ReaderEvent::Detached(name) => {
                if self.registry.on_reader_detached(&name) {
                    info!("reader detached: {name}");
                }
            }
            ReaderEvent::CardDetected { reader, uid } => match self.lifecycle.surface() {
                Some(surface) => {
                    let uid = self.forwarder.on_card_detected(surface, &uid);
                    info!("card {uid} on {reader}");
                }
                None => warn!("card tapped on {reader} with no window open; ignored"),
            },
            ReaderEvent::Error(e) => warn!("card-reader driver error: {e}"),
        }
    }

    fn on_frontend(
        &mut self,
        msg: FrontendMsg,
        reply_to: mpsc::UnboundedSender<StationMsg>,
    ) -> LifecycleOutcome {
        match msg {
            FrontendMsg::Db {
                request_id,
                model,
                action,
                data,
            } => {
                let gateway = Arc::clone(&self.gateway);
                tokio::spawn(async move {
                    let value = gateway
                        .handle(&model, &action, data)
                        .await
                        .unwrap_or(Value::Null);
                    if reply_to.send(StationMsg::Reply { request_id, value }).is_err() {
                        debug!("session closed before reply {request_id}");
                    }
                });
            }
            FrontendMsg::Readers { request_id } => {
                let value = Value::from(self.registry.list().to_vec());
                if reply_to.send(StationMsg::Reply { request_id, value }).is_err() {
                    debug!("session closed before reply {request_id}");
                }
            }
            FrontendMsg::ReinitNfc => {
                let reset = Arc::clone(&self.reset);
                let events = self.events.clone();
                info!("driver reset requested ({})", reset.name());
                tokio::spawn(async move {
                    let result = reset.reset().await;
                    let _ = events.send(StationEvent::ReinitFinished(result));
                });
            }
            FrontendMsg::WindowState { minimized } => {
                debug!("window minimized: {minimized}");
            }
            FrontendMsg::WindowClosed => {
                info!("main window closed");
                return self.lifecycle.on_window_closed();
            }
        }
        LifecycleOutcome::Continue
    }

    fn on_reinit_finished(&mut self, result: Result<(), ResetError>) {
        match result {
            Ok(()) => {
                info!("driver reset succeeded; rebinding card-reader driver");
                self.stop_driver();
                self.registry.clear();
                self.start_driver();
            }
            Err(e) => {
                warn!("driver reset failed: {e}");
                self.show_error(&e.to_string());
            }
        }
    }

    fn show_error(&self, message: &str) {
        self.reporter.show_error_box(&self.dialog_title, message);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
