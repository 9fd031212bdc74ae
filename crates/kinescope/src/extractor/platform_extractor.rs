use crate::extractor::default::DEFAULT_UA;

use super::{super::media::media_info::MediaInfo, error::ExtractorError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use tracing::debug;

/// Per-extraction HTTP context.
///
/// Holds the page URL, the shared client and the headers and cookies that
/// every request of one extraction carries.
///
/// ```rust,no_run
/// # use reqwest::Client;
/// # use kinescope_parser::extractor::platform_extractor::Extractor;
/// #
/// # async fn doc_test() -> Result<(), Box<dyn std::error::Error>> {
/// let mut extractor = Extractor::new("Kinescope", "https://kinescope.io/embed/abc", Client::new());
/// extractor.set_referer("https://school.example/lesson/1");
/// extractor.set_cookies_from_string("session=abc123; theme=dark");
///
/// let body = extractor.get(&extractor.url).send().await?.text().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    // url to extract from, e.g., "https://kinescope.io/embed/abc"
    pub url: String,
    // name of the platform, e.g., "Kinescope"
    pub platform_name: String,
    // The reqwest client
    pub client: Client,
    platform_headers: HeaderMap,
    cookies: FxHashMap<String, String>,
}

impl Extractor {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        platform_name: S1,
        platform_url: S2,
        client: Client,
    ) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.8,ru;q=0.5"),
        );
        // Do not set `Accept-Encoding` here.
        // Reqwest auto-adds it (and auto-decompresses) when the corresponding
        // crate features are enabled, as long as we don't override the header.

        Self {
            platform_name: platform_name.into(),
            url: platform_url.into(),
            client,
            platform_headers: default_headers,
            cookies: FxHashMap::default(),
        }
    }

    pub fn add_header_str<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderName::from_str(key.as_ref()) {
            Ok(name) => match HeaderValue::from_str(value.as_ref()) {
                Ok(value) => {
                    self.platform_headers.insert(name, value);
                }
                Err(e) => {
                    debug!(error = %e, "Invalid header value; skipping");
                }
            },
            Err(e) => {
                debug!(error = %e, "Invalid header name; skipping");
            }
        }
    }

    #[inline]
    pub fn set_referer<V: AsRef<str>>(&mut self, referer: V) {
        self.add_header_str(reqwest::header::REFERER.as_str(), referer);
    }

    /// Set cookies from a cookie string (format: "name1=value1; name2=value2").
    /// Newlines are accepted as separators too, for values pasted from a browser.
    pub fn set_cookies_from_string(&mut self, cookie_string: &str) {
        for part in cookie_string.split(&[';', '\n'][..]).map(str::trim) {
            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }

            self.cookies.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    fn build_cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        // Sorted so the header is stable across runs.
        let mut pairs: Vec<_> = self.cookies.iter().collect();
        pairs.sort();

        Some(
            pairs
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Create an HTTP request carrying the platform headers and stored cookies.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).headers(self.request_headers())
    }

    /// Platform headers plus the `Cookie` header, as sent with every request.
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.platform_headers.clone();

        if let Some(cookie_header) = self.build_cookie_header() {
            match HeaderValue::from_str(&cookie_header) {
                Ok(value) => {
                    headers.insert(reqwest::header::COOKIE, value);
                }
                Err(e) => {
                    // If cookies are malformed, skip the Cookie header instead of sending
                    // an empty/invalid value.
                    debug!(error = %e, "Failed to build Cookie header");
                }
            }
        }

        headers
    }

    pub fn get_platform_headers(&self) -> &HeaderMap {
        &self.platform_headers
    }

    pub fn get_platform_headers_map(&self) -> FxHashMap<String, String> {
        let mut headers_map =
            FxHashMap::with_capacity_and_hasher(self.platform_headers.len(), Default::default());

        for (key, value) in &self.platform_headers {
            if let Ok(value) = value.to_str() {
                headers_map.insert(key.as_str().to_owned(), value.to_owned());
            }
        }

        headers_map
    }
}

#[async_trait]
pub trait PlatformExtractor: Send + Sync {
    fn get_extractor(&self) -> &Extractor;

    fn get_platform_headers(&self) -> &HeaderMap {
        self.get_extractor().get_platform_headers()
    }

    async fn extract(&self) -> Result<MediaInfo, ExtractorError>;
}
