//! Shutdown signals.
//!
//! Resolves once the operator asks the station to stop: Ctrl+C everywhere,
//! SIGTERM on Unix.  On Windows in development, the frontend tooling cannot
//! send signals to a child process, so it writes `graceful-exit` to our stdin
//! instead.

use tracing::{error, info};

/// Stdin line that requests shutdown on Windows in development mode.
pub const GRACEFUL_EXIT_LINE: &str = "graceful-exit";

/// Completes when a shutdown signal arrives.
pub async fn shutdown_signal(listen_stdin: bool) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C; initiating graceful shutdown"),
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received SIGTERM; initiating graceful shutdown");
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let stdin_exit = async {
        if listen_stdin && wait_for_exit_line(tokio::io::stdin()).await {
            info!("received {GRACEFUL_EXIT_LINE} on stdin");
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = stdin_exit => {}
    }
}

/// Reads lines until [`GRACEFUL_EXIT_LINE`]; `false` if the input ends first.
pub async fn wait_for_exit_line<R>(input: R) -> bool
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut lines = tokio::io::BufReader::new(input).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim() == GRACEFUL_EXIT_LINE {
            return true;
        }
    }
    false
}
