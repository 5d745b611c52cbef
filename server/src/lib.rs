pub mod config;
mod cookies;
mod error;
mod handler;
mod serve;
mod signal;

pub use crate::{config::Config, error::ApiError, handler::ResponseBody};

use {
    crate::{serve::serve, signal::shutdown_signal},
    anyhow::Result,
    driveindex_sdk::{
        context::AccessContext,
        store::{DriveStore, Store},
    },
    hyper::{Request, Response, body::Body},
    std::{convert::Infallible, error::Error, sync::Arc},
    tokio::net::TcpListener,
    tracing::info,
    url::Url,
};

/// Shared state of all connections.
pub struct App<S> {
    pub(crate) access: AccessContext,
    pub(crate) store: S,
    pub(crate) public_url: Url,
}

impl<S: Store> App<S> {
    #[inline]
    pub fn new(access: AccessContext, store: S, public_url: Url) -> Self {
        Self {
            access,
            store,
            public_url,
        }
    }
}

/// Service function of the HTTP server.
#[inline]
pub async fn handle_request<S, B>(
    app: Arc<App<S>>,
    request: Request<B>,
) -> Result<Response<ResponseBody>, Infallible>
where
    S: Store,
    B: Body + Send,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    Ok(handler::handle(&app, request).await)
}

pub async fn run(config: Config) -> Result<()> {
    let access = config.access_context()?;
    let store = DriveStore::new(config.drive.clone())?;
    let app = Arc::new(App::new(access, store, config.public_url.clone()));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "listening");
    serve(listener, app, shutdown_signal()).await
}
