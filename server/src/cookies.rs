use {
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    driveindex_sdk::credentials::{CREDENTIAL_MAX_AGE, CredentialJar},
    hyper::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE},
    std::collections::BTreeMap,
    tracing::{debug, warn},
};

/// [`CredentialJar`] over the `Cookie` header of a request.
///
/// Reads see the values of the request, updated by any writes made while
/// handling it. Writes are turned into `Set-Cookie` headers with
/// [`HeaderJar::write_set_cookie`].
#[derive(Debug, Default)]
pub struct HeaderJar {
    current: BTreeMap<String, String>,
    outgoing: BTreeMap<String, Cookie<'static>>,
}

impl HeaderJar {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut current = BTreeMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                debug!("ignoring non-ASCII cookie header");
                continue;
            };
            for cookie in Cookie::split_parse_encoded(header) {
                match cookie {
                    Ok(cookie) => {
                        current.insert(cookie.name().to_owned(), cookie.value().to_owned());
                    }
                    Err(err) => debug!(error = %err, "ignoring malformed cookie"),
                }
            }
        }
        Self {
            current,
            outgoing: BTreeMap::new(),
        }
    }

    pub fn write_set_cookie(&self, headers: &mut HeaderMap) {
        for cookie in self.outgoing.values() {
            match HeaderValue::try_from(cookie.encoded().to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => warn!(name = cookie.name(), error = %err, "cannot encode cookie"),
            }
        }
    }
}

fn credential_cookie(name: &str, value: String) -> Cookie<'static> {
    Cookie::build((name.to_owned(), value))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::try_from(CREDENTIAL_MAX_AGE).unwrap_or(CookieDuration::MAX))
        .build()
}

impl CredentialJar for HeaderJar {
    fn get(&self, name: &str) -> Option<String> {
        self.current.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: String) {
        self.current.insert(name.to_owned(), value.clone());
        self.outgoing
            .insert(name.to_owned(), credential_cookie(name, value));
    }

    fn remove(&mut self, name: &str) {
        self.current.remove(name);
        let mut cookie = credential_cookie(name, String::new());
        cookie.make_removal();
        self.outgoing.insert(name.to_owned(), cookie);
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "test")]
mod tests {
    use {
        super::*,
        driveindex_sdk::credentials::{FOLDER_PASSWORDS_COOKIE, SITE_PASSWORD_COOKIE},
    };

    fn set_cookies(jar: &HeaderJar) -> Vec<String> {
        let mut headers = HeaderMap::new();
        jar.write_set_cookie(&mut headers);
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn reads_request_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; sitePassword=abc"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("folderPasswords=%7B%22x%22%3A%22y%22%7D"),
        );
        let jar = HeaderJar::from_headers(&headers);
        assert_eq!(jar.get(SITE_PASSWORD_COOKIE).as_deref(), Some("abc"));
        assert_eq!(
            jar.get(FOLDER_PASSWORDS_COOKIE).as_deref(),
            Some(r#"{"x":"y"}"#)
        );
        assert_eq!(jar.get("missing"), None);
        assert!(set_cookies(&jar).is_empty());
    }

    #[test]
    fn set_cookie_attributes() {
        let mut jar = HeaderJar::default();
        jar.set(FOLDER_PASSWORDS_COOKIE, r#"{"x":"y"}"#.into());
        assert_eq!(jar.get(FOLDER_PASSWORDS_COOKIE).as_deref(), Some(r#"{"x":"y"}"#));

        let headers = set_cookies(&jar);
        assert_eq!(headers.len(), 1);
        let cookie = Cookie::parse_encoded(headers[0].clone()).unwrap();
        assert_eq!(cookie.name(), FOLDER_PASSWORDS_COOKIE);
        assert_eq!(cookie.value(), r#"{"x":"y"}"#);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(31_536_000)));
    }

    #[test]
    fn removal_expires_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("sitePassword=abc"));
        let mut jar = HeaderJar::from_headers(&headers);
        jar.remove(SITE_PASSWORD_COOKIE);
        jar.remove(FOLDER_PASSWORDS_COOKIE);
        assert_eq!(jar.get(SITE_PASSWORD_COOKIE), None);

        let headers = set_cookies(&jar);
        assert_eq!(headers.len(), 2);
        for header in headers {
            let cookie = Cookie::parse_encoded(header).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
        }
    }

    #[test]
    fn last_write_wins() {
        let mut jar = HeaderJar::default();
        jar.set(SITE_PASSWORD_COOKIE, "one".into());
        jar.remove(SITE_PASSWORD_COOKIE);
        jar.set(SITE_PASSWORD_COOKIE, "two".into());
        let headers = set_cookies(&jar);
        assert_eq!(headers.len(), 1);
        assert_eq!(Cookie::parse_encoded(headers[0].clone()).unwrap().value(), "two");
    }
}
