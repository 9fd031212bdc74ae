use super::error::ExtractorError;
use super::factory::ExtractorFactory;
use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Settings applied to every request made through a client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub proxy: Option<ProxyConfig>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
        }
    }
}

pub fn default_client() -> Result<Client, ExtractorError> {
    create_client(&ClientOptions::default())
}

pub fn create_client(options: &ClientOptions) -> Result<Client, ExtractorError> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_platform_verifier()?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .timeout(options.timeout);

    if let Some(config) = &options.proxy {
        let mut proxy = reqwest::Proxy::all(&config.url)?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            proxy = proxy.basic_auth(username, password);
        }
        debug!(proxy = %config.url, "Routing requests through proxy");
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Returns a new `ExtractorFactory` populated with all the supported platforms.
pub fn default_factory() -> Result<ExtractorFactory, ExtractorError> {
    factory_with_options(&ClientOptions::default())
}

/// Returns a new `ExtractorFactory` whose client uses the given options.
pub fn factory_with_options(options: &ClientOptions) -> Result<ExtractorFactory, ExtractorError> {
    let client = create_client(options)?;
    Ok(ExtractorFactory::new(client))
}

#[cfg(test)]
fn test_client_builder() -> reqwest::ClientBuilder {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .timeout(Duration::from_secs(5))
}

/// Client without trust roots, for tests that only talk plain HTTP to local servers.
#[cfg(test)]
pub(crate) fn test_client() -> Client {
    test_client_builder().build().unwrap()
}

/// Like [`test_client`], but every plain HTTP request goes through `proxy_url`.
#[cfg(test)]
pub(crate) fn test_client_with_proxy(proxy_url: &str) -> Client {
    test_client_builder()
        .proxy(reqwest::Proxy::http(proxy_url).unwrap())
        .build()
        .unwrap()
}
