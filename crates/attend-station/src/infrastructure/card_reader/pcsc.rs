//! PC/SC card-reader driver.
//!
//! A dedicated thread owns the PC/SC context and loops on
//! `SCardGetStatusChange`:
//!
//! ```text
//! establish context ─► list readers ─► diff with known readers
//!        ▲                   │            (Attached / Detached events)
//!        │                   ▼
//!   retry after        wait for status change (poll interval)
//!   retry_delay              │
//!        │                   ▼
//!        └── error ◄── card EMPTY→PRESENT: connect, GET UID, CardDetected
//! ```
//!
//! The PnP pseudo-reader (`\\?PnP?\Notification`) is watched so that plugging
//! a reader in wakes the wait immediately; the poll interval covers platforms
//! where PnP notification is not supported.
//!
//! # Reading the UID
//!
//! Contactless readers implementing the PC/SC part 3 storage-card extension
//! answer the pseudo-APDU `FF CA 00 00 00` (GET DATA, UID) with the card UID
//! followed by the status word `90 00`.

use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pcsc::{Context, Error as PcscError, Protocols, ReaderState, Scope, ShareMode, State};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::{CardReaderDriver, DriverError, ReaderEvent};

/// GET DATA (UID) pseudo-APDU.
pub const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Status word for a successful APDU.
const SW_OK: [u8; 2] = [0x90, 0x00];

/// Timing knobs for the driver thread.
#[derive(Debug, Clone, Copy)]
pub struct PcscSettings {
    /// Upper bound on one `get_status_change` wait.
    pub poll_interval: Duration,
    /// Pause before re-establishing a failed context.
    pub retry_delay: Duration,
}

impl Default for PcscSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// PC/SC implementation of [`CardReaderDriver`].
pub struct PcscDriver {
    settings: PcscSettings,
    running: Arc<AtomicBool>,
    /// Live context, kept so `stop()` can cancel a blocking wait.
    context: Arc<Mutex<Option<Context>>>,
}

impl PcscDriver {
    /// Creates a new (unstarted) driver.
    pub fn new(settings: PcscSettings) -> Self {
        Self {
            settings,
            running: Arc::new(AtomicBool::new(false)),
            context: Arc::new(Mutex::new(None)),
        }
    }
}

impl CardReaderDriver for PcscDriver {
    fn start(&self) -> Result<UnboundedReceiver<ReaderEvent>, DriverError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(DriverError::AlreadyStarted);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::clone(&self.running);
        let context = Arc::clone(&self.context);
        let settings = self.settings;

        let spawned = thread::Builder::new()
            .name("pcsc-monitor".to_string())
            .spawn(move || run_monitor(settings, running, context, tx));
        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(DriverError::Spawn(e));
        }
        info!("PC/SC driver started");
        Ok(rx)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Wake a blocked get_status_change; the thread exits on Cancelled.
        if let Ok(guard) = self.context.lock() {
            if let Some(ctx) = guard.as_ref() {
                if let Err(e) = ctx.cancel() {
                    debug!("PC/SC cancel failed: {e}");
                }
            }
        }
        info!("PC/SC driver stopped");
    }
}

impl Drop for PcscDriver {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            self.stop();
        }
    }
}

// ── Driver thread ─────────────────────────────────────────────────────────────

fn run_monitor(
    settings: PcscSettings,
    running: Arc<AtomicBool>,
    context: Arc<Mutex<Option<Context>>>,
    tx: UnboundedSender<ReaderEvent>,
) {
    let mut known: Vec<CString> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let ctx = match Context::establish(Scope::User) {
            Ok(ctx) => ctx,
            Err(e) => {
                let err = DriverError::ContextUnavailable(e.to_string());
                warn!("{err}");
                if tx.send(ReaderEvent::Error(err.to_string())).is_err() {
                    return;
                }
                thread::sleep(settings.retry_delay);
                continue;
            }
        };
        if let Ok(mut guard) = context.lock() {
            *guard = Some(ctx.clone());
        }

        match monitor(&ctx, &settings, &running, &tx, &mut known) {
            Ok(()) => break,
            Err(e) => {
                warn!("PC/SC monitor error: {e}");
                // The service went away: every reader is gone with it.
                for name in known.drain(..) {
                    let _ = tx.send(ReaderEvent::Detached(name.to_string_lossy().into_owned()));
                }
                if tx.send(ReaderEvent::Error(e.to_string())).is_err() {
                    return;
                }
                thread::sleep(settings.retry_delay);
            }
        }
    }

    if let Ok(mut guard) = context.lock() {
        *guard = None;
    }
    debug!("PC/SC monitor thread exiting");
}

/// Watches readers until stopped (`Ok`) or PC/SC fails (`Err`).
fn monitor(
    ctx: &Context,
    settings: &PcscSettings,
    running: &AtomicBool,
    tx: &UnboundedSender<ReaderEvent>,
    known: &mut Vec<CString>,
) -> Result<(), PcscError> {
    let pnp = pcsc::PNP_NOTIFICATION();
    let mut states = vec![ReaderState::new(pnp, State::UNAWARE)];

    while running.load(Ordering::SeqCst) {
        let names = match ctx.list_readers_owned() {
            Ok(names) => names,
            Err(PcscError::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e),
        };

        // Readers that disappeared.
        let (kept, gone): (Vec<CString>, Vec<CString>) =
            known.drain(..).partition(|k| names.contains(k));
        *known = kept;
        for name in gone {
            states.retain(|rs| rs.name() != name.as_c_str());
            send(tx, ReaderEvent::Detached(name.to_string_lossy().into_owned()))?;
        }

        // Readers that appeared.
        for name in names {
            if !known.contains(&name) {
                send(tx, ReaderEvent::Attached(name.to_string_lossy().into_owned()))?;
                states.push(ReaderState::new(name.clone(), State::UNAWARE));
                known.push(name);
            }
        }

        for rs in &mut states {
            rs.sync_current_state();
        }

        match ctx.get_status_change(settings.poll_interval, &mut states) {
            Ok(()) => {}
            Err(PcscError::Timeout) => continue,
            Err(PcscError::Cancelled) => return Ok(()),
            Err(e) => return Err(e),
        }

        for rs in &states {
            if rs.name() == pnp {
                continue;
            }
            if card_arrived(rs.current_state(), rs.event_state()) {
                let reader = rs.name().to_string_lossy().into_owned();
                match read_uid(ctx, rs.name()) {
                    Ok(uid) => send(tx, ReaderEvent::CardDetected { reader, uid })?,
                    Err(e) => {
                        warn!("failed to read card UID on {reader}: {e}");
                        send(tx, ReaderEvent::Error(e))?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// `true` on an empty → present transition.
fn card_arrived(previous: State, now: State) -> bool {
    now.contains(State::PRESENT) && !previous.contains(State::PRESENT)
}

fn send(tx: &UnboundedSender<ReaderEvent>, event: ReaderEvent) -> Result<(), PcscError> {
    // The station dropped its receiver: stop as if cancelled.
    tx.send(event).map_err(|_| PcscError::Cancelled)
}

fn read_uid(ctx: &Context, reader: &CStr) -> Result<Vec<u8>, String> {
    let card = ctx
        .connect(reader, ShareMode::Shared, Protocols::ANY)
        .map_err(|e| format!("connect failed: {e}"))?;
    let mut buf = [0u8; pcsc::MAX_BUFFER_SIZE];
    let response = card
        .transmit(&GET_UID_APDU, &mut buf)
        .map_err(|e| format!("transmit failed: {e}"))?;
    parse_uid_response(response)
}

/// Splits a GET UID response into the UID bytes, checking the status word.
pub fn parse_uid_response(response: &[u8]) -> Result<Vec<u8>, String> {
    if response.len() < 2 {
        return Err(format!("response too short: {} bytes", response.len()));
    }
    let (data, sw) = response.split_at(response.len() - 2);
    if sw != SW_OK {
        return Err(format!("unexpected status word {:02X}{:02X}", sw[0], sw[1]));
    }
    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uid_response_strips_status_word() {
        let uid = parse_uid_response(&[0x04, 0xA3, 0x9F, 0x90, 0x00]).unwrap();
        assert_eq!(uid, vec![0x04, 0xA3, 0x9F]);
    }

    #[test]
    fn test_parse_uid_response_rejects_error_status() {
        // 6A 81: function not supported
        let err = parse_uid_response(&[0x6A, 0x81]).unwrap_err();
        assert!(err.contains("6A81"));
    }

    #[test]
    fn test_parse_uid_response_rejects_short_response() {
        assert!(parse_uid_response(&[0x90]).is_err());
    }

    #[test]
    fn test_parse_uid_response_empty_uid_is_allowed() {
        assert_eq!(parse_uid_response(&SW_OK).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_card_arrived_only_on_rising_edge() {
        assert!(card_arrived(State::EMPTY, State::PRESENT | State::CHANGED));
        assert!(card_arrived(State::UNAWARE, State::PRESENT));
        assert!(!card_arrived(State::PRESENT, State::PRESENT | State::INUSE));
        assert!(!card_arrived(State::PRESENT, State::EMPTY));
    }

    #[test]
    fn test_default_settings() {
        let s = PcscSettings::default();
        assert_eq!(s.poll_interval, Duration::from_millis(500));
        assert_eq!(s.retry_delay, Duration::from_secs(2));
    }
}
