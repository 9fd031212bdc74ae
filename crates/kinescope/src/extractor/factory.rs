use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use rustc_hash::FxHashSet;
use tracing::debug;

use super::error::ExtractorError;
use super::platform_extractor::PlatformExtractor;
use crate::extractor::platforms::{self, kinescope::Kinescope};

// A type alias for a thread-safe constructor function.
type ExtractorConstructor =
    fn(String, Client, Option<String>, Option<serde_json::Value>) -> Box<dyn PlatformExtractor>;

struct PlatformEntry {
    name: &'static str,
    regex: &'static LazyLock<Regex>,
    // Finds the platform's player URLs inside third-party pages; group 1 is the URL.
    embed_regex: Option<&'static LazyLock<Regex>>,
    constructor: ExtractorConstructor,
}

macro_rules! platform_registry {
    ( $( $name:literal : $regex:path $( , embed $embed:path )? => $builder:path ),+ $(,)? ) => {
        &[
            $(
                PlatformEntry {
                    name: $name,
                    regex: &$regex,
                    embed_regex: platform_registry!(@embed $( $embed )?),
                    constructor: |url, client, cookies, extras| {
                        Box::new($builder(url, client, cookies, extras))
                            as Box<dyn PlatformExtractor>
                    },
                },
            )+
        ]
    };
    (@embed $embed:path) => { Some(&$embed) };
    (@embed) => { None };
}

// Static platform registry.
static PLATFORMS: &[PlatformEntry] = platform_registry![
    "kinescope": platforms::kinescope::URL_REGEX, embed platforms::kinescope::EMBED_REGEX => Kinescope::new,
];

/// A factory for creating platform-specific extractors.
pub struct ExtractorFactory {
    client: Client,
}

impl ExtractorFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn create_extractor(
        &self,
        url: &str,
        cookies: Option<String>,
        extras: Option<serde_json::Value>,
    ) -> Result<Box<dyn PlatformExtractor>, ExtractorError> {
        let url = url.trim();
        for platform in PLATFORMS {
            if platform.regex.is_match(url) {
                debug!(platform = platform.name, url, "Matched extractor");
                return Ok((platform.constructor)(
                    url.to_string(),
                    self.client.clone(),
                    cookies,
                    extras,
                ));
            }
        }

        Err(ExtractorError::UnsupportedExtractor)
    }

    pub fn is_supported(&self, url: &str) -> bool {
        let url = url.trim();
        PLATFORMS.iter().any(|p| p.regex.is_match(url))
    }

    /// Player URLs embedded in a third-party page, in document order without
    /// duplicates.
    pub fn extract_embed_urls(&self, html: &str) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut found = Vec::new();

        for platform in PLATFORMS {
            let Some(embed_regex) = platform.embed_regex else {
                continue;
            };
            for caps in embed_regex.captures_iter(html) {
                let Some(m) = caps.get(1) else {
                    continue;
                };
                let url = m.as_str().to_string();
                if seen.insert(url.clone()) {
                    found.push((m.start(), url));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        debug!(count = found.len(), "Found embedded players");
        found.into_iter().map(|(_, url)| url).collect()
    }

    pub fn supported_platforms(&self) -> Vec<&'static str> {
        PLATFORMS.iter().map(|p| p.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::default::test_client;

    fn factory() -> ExtractorFactory {
        ExtractorFactory::new(test_client())
    }

    #[test]
    fn creates_kinescope_extractor() {
        let extractor = factory()
            .create_extractor(
                " https://kinescope.io/embed/mJMGKQBudWgcHucMYoQd3g ",
                None,
                None,
            )
            .unwrap();

        let inner = extractor.get_extractor();
        assert_eq!(inner.platform_name, "Kinescope");
        assert_eq!(inner.url, "https://kinescope.io/embed/mJMGKQBudWgcHucMYoQd3g");
    }

    #[test]
    fn unknown_urls_are_unsupported() {
        let factory = factory();
        assert!(matches!(
            factory.create_extractor("https://vimeo.com/12345", None, None),
            Err(ExtractorError::UnsupportedExtractor)
        ));
        assert!(!factory.is_supported("https://vimeo.com/12345"));
        assert!(factory.is_supported("https://kinescope.io/abc"));
    }

    #[test]
    fn embed_urls_are_deduplicated_in_page_order() {
        let html = r#"
<iframe src="https://kinescope.io/embed/first"></iframe>
<iframe class="player" src='https://www.kinescope.io/embed/second' allowfullscreen></iframe>
<iframe src="https://kinescope.io/embed/first"></iframe>
<a href="https://kinescope.io/embed/not-an-iframe">link</a>
"#;

        assert_eq!(
            factory().extract_embed_urls(html),
            [
                "https://kinescope.io/embed/first",
                "https://www.kinescope.io/embed/second",
            ]
        );
        assert!(factory().extract_embed_urls("<p>no players</p>").is_empty());
    }

    #[test]
    fn lists_platforms() {
        assert_eq!(factory().supported_platforms(), ["kinescope"]);
    }
}
