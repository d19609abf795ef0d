//! Single-instance lock.
//!
//! The running station holds a loopback TCP port.  A later launch finds the
//! port taken, connects to it, sends one `second-instance` line and exits;
//! the running station turns that line into a "focus the window" event.
//!
//! ```text
//!   launch #1 ── bind 127.0.0.1:lock_port ─► Primary (keeps listening)
//!   launch #2 ── bind fails (in use) ──► connect ── "second-instance\n" ──►
//!                                        Secondary (exit 0)
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Line sent by a second launch.
pub const SECOND_INSTANCE_LINE: &str = "second-instance";

/// Error type for the single-instance lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The port is taken but nothing answering there is a station.
    #[error("lock port {port} is in use and the running instance did not answer: {source}")]
    Unreachable {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind lock port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("lock listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of [`acquire`].
#[derive(Debug)]
pub enum InstanceRole {
    /// This process is the only station; keep the lock alive.
    Primary(SingleInstanceLock),
    /// Another station is running and has been notified.
    Secondary,
}

/// The held lock.  Dropping it releases the port.
#[derive(Debug)]
pub struct SingleInstanceLock {
    listener: TcpListener,
}

/// Takes the lock on `127.0.0.1:port`, or notifies the holder.
///
/// # Errors
///
/// Returns [`LockError::Bind`] if binding fails for a reason other than the
/// port being in use, and [`LockError::Unreachable`] if the holder cannot be
/// notified.
pub async fn acquire(port: u16) -> Result<InstanceRole, LockError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("single-instance lock held on {}", listener.local_addr()?);
            Ok(InstanceRole::Primary(SingleInstanceLock { listener }))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            debug!("lock port {port} in use; notifying running instance");
            notify_primary(addr)
                .await
                .map_err(|source| LockError::Unreachable { port, source })?;
            Ok(InstanceRole::Secondary)
        }
        Err(source) => Err(LockError::Bind { port, source }),
    }
}

async fn notify_primary(addr: SocketAddr) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("{SECOND_INSTANCE_LINE}\n").as_bytes())
        .await?;
    stream.shutdown().await
}

impl SingleInstanceLock {
    /// Port actually held (useful when bound to port 0).
    pub fn port(&self) -> Result<u16, LockError> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Waits for the next second-instance notification.
    ///
    /// Connections that do not send [`SECOND_INSTANCE_LINE`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] if accepting fails.
    pub async fn next_notification(&self) -> Result<(), LockError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let mut line = String::new();
            let mut reader = BufReader::new(stream);
            match reader.read_line(&mut line).await {
                Ok(_) if line.trim() == SECOND_INSTANCE_LINE => return Ok(()),
                Ok(_) => debug!("ignoring unexpected lock message from {peer}: {line:?}"),
                Err(e) => debug!("lock connection from {peer} failed: {e}"),
            }
        }
    }
}
