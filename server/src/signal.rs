use {
    anyhow::{Context, Result},
    derive_more::Display,
    tokio::signal::ctrl_c,
};

/// Process signal that asked the server to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ShutdownSignal {
    #[display("SIGINT")]
    Interrupt,
    #[display("SIGTERM")]
    Terminate,
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// Handlers are installed on the first poll, so the future must be polled
/// before connections are accepted.
pub async fn shutdown_signal() -> Result<ShutdownSignal> {
    tokio::select! {
        result = ctrl_c() => result
            .context("failed to listen for SIGINT")
            .map(|()| ShutdownSignal::Interrupt),
        result = terminate() => result.map(|()| ShutdownSignal::Terminate),
    }
}

#[cfg(unix)]
async fn terminate() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    signal(SignalKind::terminate())
        .context("failed to listen for SIGTERM")?
        .recv()
        .await;
    Ok(())
}

// No SIGTERM outside unix.
#[cfg(not(unix))]
async fn terminate() -> Result<()> {
    use std::future::pending;
    pending().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }
}
