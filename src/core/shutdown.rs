//! OS termination signals ending [`SupervisionManager::run`](super::SupervisionManager::run).
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`. Elsewhere: Ctrl-C only.

/// Completes on the first termination signal, returning its name.
///
/// Errors if a signal handler cannot be installed.
#[cfg(unix)]
pub(super) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub(super) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
