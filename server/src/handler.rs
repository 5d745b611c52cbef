use {
    crate::{
        App,
        cookies::HeaderJar,
        error::{ApiError, prompt_response},
    },
    anyhow::anyhow,
    bytes::Bytes,
    driveindex_protocol::{
        AccessError, Entry, OpaqueId, RequestPath, encoding,
        endpoints::{
            ClearPasswords, DOWNLOAD_PATH, Endpoint, HEALTH_PATH, ListPath, ListedEntry, Listing,
            SetPassword,
        },
    },
    driveindex_sdk::{
        credentials::CredentialStore,
        gate::{Access, Gate},
        store::{EntryQuery, Store},
        token::verify_token,
    },
    futures::TryStreamExt,
    http_body_util::{BodyExt, Full, Limited, StreamBody, combinators::UnsyncBoxBody},
    hyper::{
        Method, Request, Response, StatusCode,
        body::{Body, Frame},
        header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue},
    },
    serde::Serialize,
    std::{error::Error, io, str::FromStr},
    tracing::{debug, error, info, instrument},
    url::form_urlencoded,
};

pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

const MAX_REQUEST_BODY: usize = 64 * 1024;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn empty_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(full(Bytes::new()));
    *response.status_mut() = status;
    response
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    match encoding::serialize(value) {
        Ok(data) => {
            let mut response = Response::new(full(data));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            error!(error = %err, "failed to serialize response");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Decoded value of the first query parameter called `name`.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn expect_method(actual: &Method, expected: &Method) -> Result<(), ApiError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, ApiError>
where
    B: Body + Send,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    Ok(Limited::new(body, MAX_REQUEST_BODY)
        .collect()
        .await
        .map_err(ApiError::bad_request)?
        .to_bytes())
}

/// Every response depends on the request's credentials or token, so none of
/// them may be cached.
pub(crate) async fn handle<S, B>(app: &App<S>, request: Request<B>) -> Response<ResponseBody>
where
    S: Store,
    B: Body + Send,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let mut response = route(app, request)
        .await
        .unwrap_or_else(ApiError::into_response);
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    debug!(%method, %path, status = response.status().as_u16(), "request served");
    response
}

async fn route<S, B>(app: &App<S>, request: Request<B>) -> Result<Response<ResponseBody>, ApiError>
where
    S: Store,
    B: Body + Send,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();
    let query = parts.uri.query();
    if path == HEALTH_PATH {
        expect_method(&parts.method, &Method::GET)?;
        Ok(json_response(StatusCode::OK, &Health { status: "ok" }))
    } else if path == ListPath::PATH {
        expect_method(&parts.method, &Method::GET)?;
        list(app, query, &parts.headers).await
    } else if path == SetPassword::PATH {
        expect_method(&parts.method, &Method::POST)?;
        set_password(app, &parts.headers, body).await
    } else if path == ClearPasswords::PATH {
        expect_method(&parts.method, &Method::POST)?;
        Ok(clear_passwords(app, &parts.headers))
    } else if let Some(id) = path.strip_prefix(DOWNLOAD_PATH) {
        expect_method(&parts.method, &Method::GET)?;
        download(app, id, query).await
    } else {
        Err(ApiError::UnknownEndpoint)
    }
}

fn download_url<S>(app: &App<S>, id: &OpaqueId, token: &OpaqueId) -> Result<String, ApiError> {
    let mut url = app.public_url.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("public url cannot be a base"))?
        .pop_if_empty()
        .extend(DOWNLOAD_PATH.split('/').filter(|s| !s.is_empty()))
        .push(id.as_str());
    url.query_pairs_mut().append_pair("token", token.as_str());
    Ok(url.into())
}

fn listed_entry<S>(
    app: &App<S>,
    entry: &Entry,
    token: &OpaqueId,
) -> Result<ListedEntry, ApiError> {
    let id = app.access.cipher().encrypt_id(&entry.id)?;
    let download_url = if entry.is_folder() {
        None
    } else {
        Some(download_url(app, &id, token)?)
    };
    Ok(ListedEntry {
        name: entry.name.clone(),
        mime_type: entry.mime_type.clone(),
        is_folder: entry.is_folder(),
        download_url,
        id,
    })
}

#[instrument(skip_all)]
async fn list<S: Store>(
    app: &App<S>,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Result<Response<ResponseBody>, ApiError> {
    let path = query_param(query, "path").unwrap_or_else(|| "/".into());
    let path = RequestPath::from_str(&path).map_err(ApiError::bad_request)?;
    if path.last_name() == Some(app.access.password_file_name()) {
        return Err(AccessError::SegmentNotFound {
            segment: app.access.password_file_name().into(),
        }
        .into());
    }

    let credentials = CredentialStore::new(app.access.cipher(), HeaderJar::from_headers(headers));
    let gate = Gate::new(&app.access, &app.store);
    let chain = match gate.authorize(&path, &credentials).await? {
        Access::Allowed(chain) => chain,
        Access::Prompt(prompt) => return Ok(prompt_response(prompt)),
    };

    let token = gate.issue_download_token()?;
    let mut entries = match chain.last() {
        Some(file) if !file.is_folder() => {
            let entry = Entry {
                id: file.real_id.clone(),
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                parents: vec![file.parent_real_id.clone()],
            };
            vec![listed_entry(app, &entry, &token)?]
        }
        _ => app
            .store
            .list_entries(&EntryQuery::children_of(chain.target_id(&app.access)))
            .await
            .map_err(AccessError::Store)?
            .iter()
            .filter(|entry| entry.name != app.access.password_file_name())
            .map(|entry| listed_entry(app, entry, &token))
            .collect::<Result<Vec<_>, _>>()?,
    };
    entries.sort_by(|a, b| {
        b.is_folder
            .cmp(&a.is_folder)
            .then_with(|| a.name.cmp(&b.name))
    });

    let folder = chain
        .segments()
        .iter()
        .rev()
        .find(|segment| segment.is_folder())
        .map(|segment| segment.opaque_id.clone());
    info!(%path, entries = entries.len(), "listed");
    Ok(json_response(
        StatusCode::OK,
        &Listing {
            path,
            folder,
            entries,
        },
    ))
}

async fn set_password<S, B>(
    app: &App<S>,
    headers: &HeaderMap,
    body: B,
) -> Result<Response<ResponseBody>, ApiError>
where
    S: Sync,
    B: Body + Send,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let jar = HeaderJar::from_headers(headers);
    let body = read_body(body).await?;
    let SetPassword { folder, password } =
        encoding::deserialize(&body).map_err(ApiError::bad_request)?;

    let mut credentials = CredentialStore::new(app.access.cipher(), jar);
    match &folder {
        Some(folder) => {
            credentials.set_folder_password(folder, &password)?;
            info!(%folder, "folder password remembered");
        }
        None => {
            credentials.set_site_password(&password)?;
            info!("site password remembered");
        }
    }

    let mut response = empty_response(StatusCode::NO_CONTENT);
    credentials
        .into_jar()
        .write_set_cookie(response.headers_mut());
    Ok(response)
}

fn clear_passwords<S>(app: &App<S>, headers: &HeaderMap) -> Response<ResponseBody> {
    let mut credentials = CredentialStore::new(app.access.cipher(), HeaderJar::from_headers(headers));
    credentials.clear_all();
    info!("remembered passwords cleared");

    let mut response = empty_response(StatusCode::NO_CONTENT);
    credentials
        .into_jar()
        .write_set_cookie(response.headers_mut());
    response
}

#[instrument(skip_all)]
async fn download<S: Store>(
    app: &App<S>,
    id: &str,
    query: Option<&str>,
) -> Result<Response<ResponseBody>, ApiError> {
    let token = query_param(query, "token").ok_or(AccessError::TokenInvalid)?;
    verify_token(app.access.cipher(), &token)
        .into_result()
        .inspect_err(|err| info!(kind = err.kind(), "download token rejected"))?;
    let id = OpaqueId::from(id);
    let real_id = app.access.cipher().decrypt_id(&id)?;

    let content = app
        .store
        .open_content(&real_id)
        .await
        .map_err(AccessError::Store)?;
    let body = StreamBody::new(content.map_ok(Frame::data).map_err(io::Error::other));
    let mut response = Response::new(body.boxed_unsync());
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    info!(%id, "download started");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params() {
        let query = Some("path=%2Fdocs%2Fmy+files&token=xyz&flag&token=second");
        let param = |name| query_param(query, name);
        assert_eq!(param("path").as_deref(), Some("/docs/my files"));
        assert_eq!(param("token").as_deref(), Some("xyz"));
        assert_eq!(param("flag").as_deref(), Some(""));
        assert_eq!(param("missing"), None);
        assert_eq!(query_param(None, "path"), None);

        // Decoded once: an encoded `%` stays a literal `%`.
        let query = Some("path=/100%2525/a%20b");
        assert_eq!(query_param(query, "path").as_deref(), Some("/100%25/a b"));
    }
}
