use {
    super::{ContentStream, EntryQuery, Store},
    anyhow::{Error, Result, format_err},
    derivative::Derivative,
    driveindex_protocol::Entry,
    futures::{StreamExt, TryStreamExt},
    itertools::Itertools,
    parking_lot::Mutex,
    reqwest::{Response, Url},
    serde::{Deserialize, Serialize},
    std::{
        future::Future,
        time::{Duration, Instant},
    },
    tokio::time::sleep,
    tracing::{debug, instrument, warn},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Access tokens are refreshed this long before the expiry the server reports.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,parents)";
const PAGE_SIZE: &str = "1000";

fn default_api_url() -> Url {
    #[expect(clippy::expect_used, reason = "constant URL")]
    Url::parse("https://www.googleapis.com/drive/v3/").expect("valid url")
}

fn default_token_url() -> Url {
    #[expect(clippy::expect_used, reason = "constant URL")]
    Url::parse("https://oauth2.googleapis.com/token").expect("valid url")
}

/// OAuth client credentials of the Drive account.
#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct DriveConfig {
    pub client_id: String,
    #[derivative(Debug = "ignore")]
    pub client_secret: String,
    #[derivative(Debug = "ignore")]
    pub refresh_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    #[serde(default = "default_token_url")]
    pub token_url: Url,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<Entry>,
    next_page_token: Option<String>,
}

/// Google Drive v3 client.
///
/// Reuse created store or clone the inner client to reuse a connection pool.
pub struct DriveStore {
    reqwest: reqwest::Client,
    config: DriveConfig,
    access_token: Mutex<Option<CachedToken>>,
}

impl DriveStore {
    #[inline]
    pub fn new(config: DriveConfig) -> Result<Self> {
        Ok(Self {
            reqwest: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()?,
            config,
            access_token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let cached = self
            .access_token
            .lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone());
        if let Some(value) = cached {
            return Ok(value);
        }

        debug!("refreshing drive access token");
        let response: TokenResponse = ok_or_retry(|| async {
            self.reqwest
                .post(self.config.token_url.clone())
                .form(&[
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.as_str()),
                    ("refresh_token", self.config.refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ])
                .send()
                .await
                .map_err(RequestError::transport)?
                .error_for_status()
                .map_err(RequestError::application)?
                .json()
                .await
                .map_err(RequestError::application)
        })
        .await?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.access_token.lock() = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    fn files_url(&self, id: Option<&str>) -> Result<Url> {
        let mut url = self.config.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| format_err!("invalid drive api url"))?;
            segments.pop_if_empty().push("files");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn get_media(&self, id: &str) -> Result<Response> {
        let url = self.files_url(Some(id))?;
        let token = self.access_token().await?;
        ok_or_retry(|| async {
            self.reqwest
                .get(url.clone())
                .bearer_auth(&token)
                .query(&[("alt", "media"), ("supportsAllDrives", "true")])
                .send()
                .await
                .map_err(RequestError::transport)?
                .error_for_status()
                .map_err(RequestError::application)
        })
        .await
    }
}

impl Store for DriveStore {
    #[instrument(skip_all)]
    async fn list_entries(&self, query: &EntryQuery) -> Result<Vec<Entry>> {
        let url = self.files_url(None)?;
        let q = drive_query(query);
        let token = self.access_token().await?;
        let mut output = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(page_token) = &page_token {
                params.push(("pageToken", page_token.as_str()));
            }
            let page: FileList = ok_or_retry(|| async {
                self.reqwest
                    .get(url.clone())
                    .bearer_auth(&token)
                    .query(&params)
                    .send()
                    .await
                    .map_err(RequestError::transport)?
                    .error_for_status()
                    .map_err(RequestError::application)?
                    .json()
                    .await
                    .map_err(RequestError::application)
            })
            .await?;
            output.extend(page.files);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(output)
    }

    #[instrument(skip_all)]
    async fn read_text(&self, id: &str) -> Result<String> {
        self.get_media(id)
            .await?
            .text()
            .await
            .map_err(|err| err.without_url().into())
    }

    #[instrument(skip_all)]
    async fn open_content(&self, id: &str) -> Result<ContentStream> {
        let response = self.get_media(id).await?;
        Ok(response
            .bytes_stream()
            .map_err(|err| Error::from(err.without_url()))
            .boxed())
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Renders a query in the Drive `q` syntax.
fn drive_query(query: &EntryQuery) -> String {
    let mut clauses = Vec::new();
    if let Some(name) = &query.name {
        clauses.push(format!("name = {}", quote(name)));
    }
    if !query.parents.is_empty() {
        let parents = query
            .parents
            .iter()
            .map(|parent| format!("{} in parents", quote(parent)))
            .join(" or ");
        clauses.push(format!("({parents})"));
    }
    clauses.push(format!("trashed = {}", query.trashed));
    clauses.join(" and ")
}

/// Retries the request if an error arises due to the transport.
async fn ok_or_retry<T, F, Fut>(mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    const NUM_RETRIES: usize = 3;
    const RETRY_PERIOD: Duration = Duration::from_secs(1);
    let mut attempt: usize = 0;
    loop {
        attempt = attempt.saturating_add(1);
        let transport_err = match f().await {
            Ok(x) => break Ok(x),
            Err(RequestError::Application(err)) => break Err(err),
            Err(RequestError::Transport(err)) => err,
        };
        if attempt >= NUM_RETRIES {
            break Err(transport_err);
        }
        warn!(error = %transport_err, attempt, "drive request failed, will retry");
        sleep(RETRY_PERIOD).await;
    }
}

enum RequestError {
    Transport(Error),
    Application(Error),
}

impl RequestError {
    // Request URLs carry real file ids.
    fn application(err: reqwest::Error) -> Self {
        Self::Application(err.without_url().into())
    }

    fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url().into())
    }
}
