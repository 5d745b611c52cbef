use {
    crate::{App, handle_request, signal::ShutdownSignal},
    anyhow::Result,
    driveindex_sdk::store::Store,
    hyper::{server::conn::http1, service::service_fn},
    hyper_util::{rt::TokioIo, server::graceful::GracefulShutdown},
    std::{error::Error, future::Future, io, net::SocketAddr, pin::pin, sync::Arc, time::Duration},
    tokio::{net::TcpListener, time::timeout},
    tracing::{debug, info, trace, warn},
};

/// How long open connections may take to finish their current request once
/// a shutdown signal arrives.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Accepts HTTP/1 connections until `shutdown` resolves, then drains them.
///
/// Idle keep-alive connections are closed right away. Connections that are
/// streaming a download get [`SHUTDOWN_GRACE`] to complete it.
pub async fn serve<S, F>(listener: TcpListener, app: Arc<App<S>>, shutdown: F) -> Result<()>
where
    S: Store + 'static,
    F: Future<Output = Result<ShutdownSignal>>,
{
    let graceful = GracefulShutdown::new();
    let mut shutdown = pin!(shutdown);
    let signal = loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "connection accepted");
                    let app = Arc::clone(&app);
                    let service =
                        service_fn(move |request| handle_request(Arc::clone(&app), request));
                    let connection = http1::Builder::new()
                        .keep_alive(true)
                        .serve_connection(TokioIo::new(stream), service);
                    let connection = graceful.watch(connection);
                    tokio::spawn(async move {
                        if let Err(err) = connection.await {
                            log_connection_error(peer, &err);
                        }
                    });
                }
                Err(err) => warn!(error = %err, "failed to accept"),
            },
            signal = &mut shutdown => break signal?,
        }
    };

    info!(%signal, open_connections = graceful.count(), "shutting down");
    drop(listener);
    if timeout(SHUTDOWN_GRACE, graceful.shutdown()).await.is_err() {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "connections still open after the grace period, dropping them"
        );
    }
    Ok(())
}

/// Clients disconnecting mid-request are routine; anything else is a warning.
fn log_connection_error(peer: SocketAddr, err: &hyper::Error) {
    let io_kind = err
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map(io::Error::kind);
    match io_kind {
        Some(
            io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe,
        ) => debug!(%peer, error = %err, "client went away"),
        _ if err.is_incomplete_message() || err.is_canceled() => {
            debug!(%peer, error = %err, "request interrupted");
        }
        _ => warn!(%peer, error = %err, "failed to serve connection"),
    }
}
