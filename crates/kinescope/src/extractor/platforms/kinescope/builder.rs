use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::{
    extractor::{
        error::ExtractorError,
        hls_extractor::HlsExtractor,
        platform_extractor::{Extractor, PlatformExtractor},
        platforms::kinescope::models::{PlayerOptions, VideoInfo},
        utils::{capture_group_1_or_invalid_url, extras_get_str, int_or_none, unified_timestamp},
    },
    media::{MediaFormat, MediaInfo, StreamFormat, StreamInfo},
    webpage::{OpenGraph, search_json},
};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?kinescope\.io/(?:embed/)?([\w-]+)").unwrap()
});
pub static EMBED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<iframe[^>]+src=["'](https?://(?:www\.)?kinescope\.io/embed/[\w-]+)"#).unwrap()
});
static PLAYER_OPTIONS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\s+playerOptions\s*=").unwrap());

// Kinescope serves fragmented mp4 behind both manifests.
const DEFAULT_CONTAINER: MediaFormat = MediaFormat::Mp4;

/// Kinescope video hosting, both the watch page and the embed player.
pub struct Kinescope {
    pub extractor: Extractor,
    pub extras: Option<serde_json::Value>,
}

impl Kinescope {
    pub fn new(
        url: String,
        client: Client,
        cookies: Option<String>,
        extras: Option<serde_json::Value>,
    ) -> Self {
        let mut extractor = Extractor::new("Kinescope", url, client);

        // Embeds restricted to a domain only render with that domain as referer.
        if let Some(referer) = extras_get_str(extras.as_ref(), "referer") {
            extractor.set_referer(referer);
        }
        if let Some(user_agent) = extras_get_str(extras.as_ref(), "user_agent") {
            extractor.add_header_str(reqwest::header::USER_AGENT.as_str(), user_agent);
        }
        if let Some(cookies) = cookies {
            extractor.set_cookies_from_string(&cookies);
        }

        Self { extractor, extras }
    }

    pub fn extract_display_id(&self) -> Result<&str, ExtractorError> {
        capture_group_1_or_invalid_url(&URL_REGEX, &self.extractor.url)
    }

    /// Locate `playerOptions` in the page and return its first playlist entry.
    pub fn parse_player_options(
        webpage: &str,
        display_id: &str,
    ) -> Result<VideoInfo, ExtractorError> {
        let player_data = search_json(&PLAYER_OPTIONS_REGEX, webpage, "player data")?;
        let options: PlayerOptions = serde_json::from_value(player_data)?;

        let first = options
            .playlist
            .and_then(|playlist| playlist.into_iter().next())
            .ok_or_else(|| {
                ExtractorError::ValidationError(format!(
                    "No playlist entries in player data for {display_id}"
                ))
            })?;

        serde_json::from_value(first).map_err(|e| {
            ExtractorError::ValidationError(format!(
                "Malformed playlist entry for {display_id}: {e}"
            ))
        })
    }

    /// Build the media record from an already fetched page.
    pub async fn extract_from_webpage(
        &self,
        webpage: &str,
        display_id: &str,
    ) -> Result<MediaInfo, ExtractorError> {
        let video_info = Self::parse_player_options(webpage, display_id)?;
        let og = OpenGraph::parse(webpage);
        let video_id = video_info.id.as_str();

        let mut formats = Vec::new();
        let hls_url = video_info.hls_url();
        if let Some(url) = hls_url {
            formats.extend(self.resolve_manifest(video_id, url, StreamFormat::Hls).await);
        }
        match video_info.shakahls_url() {
            Some(url) if Some(url) != hls_url => {
                formats.extend(
                    self.resolve_manifest(video_id, url, StreamFormat::ShakaHls)
                        .await,
                );
            }
            Some(_) => debug!(video_id, "shakahls manifest is the hls manifest, skipping"),
            None => {}
        }
        if formats.is_empty() {
            warn!(video_id, "No formats resolved");
        }

        let title = video_info.title().or_else(|| og.title());
        let description = video_info.description().or_else(|| og.description());
        let width = og
            .property("video:width")
            .and_then(int_or_none)
            .and_then(|w| u32::try_from(w).ok());
        let height = og
            .property("video:height")
            .and_then(int_or_none)
            .and_then(|h| u32::try_from(h).ok());
        let timestamp = og
            .property("video:release_date")
            .and_then(unified_timestamp);

        debug!(
            video_id,
            display_id,
            formats = formats.len(),
            open_graph = !og.is_empty(),
            "Extracted kinescope video"
        );

        Ok(MediaInfo::builder(video_id, &self.extractor.url)
            .display_id(display_id)
            .title_opt(title.map(str::to_owned))
            .description_opt(description.map(str::to_owned))
            .thumbnail_opt(video_info.thumbnail().map(str::to_owned))
            .duration_opt(video_info.duration())
            .width_opt(width)
            .height_opt(height)
            .timestamp_opt(timestamp)
            .formats(formats)
            .headers(self.extractor.get_platform_headers_map())
            .build())
    }

    /// A failing manifest only costs its own formats.
    async fn resolve_manifest(
        &self,
        video_id: &str,
        url: &str,
        stream_format: StreamFormat,
    ) -> Vec<StreamInfo> {
        let result = self
            .extract_hls_stream(
                &self.extractor.client,
                Some(self.extractor.request_headers()),
                url,
                stream_format,
                DEFAULT_CONTAINER,
                None,
            )
            .await;

        match result {
            Ok(streams) => {
                debug!(video_id, url, %stream_format, count = streams.len(), "Resolved manifest");
                streams
            }
            Err(e) => {
                warn!(video_id, url, %stream_format, error = %e, "Failed to resolve manifest");
                Vec::new()
            }
        }
    }
}

impl HlsExtractor for Kinescope {}

#[async_trait]
impl PlatformExtractor for Kinescope {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn extract(&self) -> Result<MediaInfo, ExtractorError> {
        let display_id = self.extract_display_id()?;

        let webpage = self
            .extractor
            .get(&self.extractor.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        self.extract_from_webpage(&webpage, display_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, extract::State, routing::get};
    use rstest::rstest;
    use tokio::net::TcpListener;
    use tracing::Level;

    use super::*;
    use crate::extractor::default::{default_client, test_client, test_client_with_proxy};

    const PAGE_URL: &str = "https://kinescope.io/mJMGKQBudWgcHucMYoQd3g";
    const VIDEO_ID: &str = "a7f02d44-2779-4d05-8197-638ee7d816d3";

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=720x1280,CODECS=\"avc1.64001f,mp4a.40.2\"
720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=360x640,CODECS=\"avc1.64001e,mp4a.40.2\"
360p.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXT-X-MAP:URI=\"init.mp4\"
#EXTINF:6.0,
seg-1.m4s
#EXT-X-ENDLIST
";

    const PAGE_HEAD: &str = r#"<html><head>
<meta property="og:title" content="OG title">
<meta property="og:description" content="OG description">
<meta property="og:video:width" content="720">
<meta property="og:video:height" content="1280">
<meta property="og:video:release_date" content="2025-10-28T09:26:57Z">
</head><body>"#;

    /// Serves `/master.m3u8` (counting hits) and `/shaka.m3u8`; anything else is a 404.
    async fn spawn_manifest_server() -> (SocketAddr, Arc<AtomicUsize>) {
        async fn master(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
            hits.fetch_add(1, Ordering::SeqCst);
            MASTER
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/master.m3u8", get(master))
            .route("/shaka.m3u8", get(|| async { MEDIA }))
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, hits)
    }

    fn page(player_options: &str) -> String {
        format!(
            "{PAGE_HEAD}<script>\nvar playerOptions = {player_options};\nvar player = new Player(playerOptions);\n</script></body></html>"
        )
    }

    fn page_with_sources(sources: &str) -> String {
        page(&format!(
            r#"{{
                playlist: [{{
                    id: "{VIDEO_ID}",
                    title: 'video_2025-10-16_19-40-33',
                    sources: {sources},
                    poster: {{ src: {{ src: "https://kinescope.io/poster.jpg" }} }},
                    posterInPreview: "https://kinescope.io/preview.jpg",
                    meta: {{ duration: 16.667, }},
                }}],
                autoplay: !1,
            }}"#
        ))
    }

    fn kinescope() -> Kinescope {
        Kinescope::new(PAGE_URL.to_string(), test_client(), None, None)
    }

    #[rstest]
    #[case("https://kinescope.io/mJMGKQBudWgcHucMYoQd3g", "mJMGKQBudWgcHucMYoQd3g")]
    #[case("https://kinescope.io/embed/mJMGKQBudWgcHucMYoQd3g", "mJMGKQBudWgcHucMYoQd3g")]
    #[case("http://www.kinescope.io/embed/a7f0-2d44_x?t=10", "a7f0-2d44_x")]
    #[case("https://kinescope.io/202234567/", "202234567")]
    fn url_regex_captures_display_id(#[case] url: &str, #[case] expected: &str) {
        let extractor = Kinescope::new(url.to_string(), test_client(), None, None);
        assert_eq!(extractor.extract_display_id().unwrap(), expected);
    }

    #[rstest]
    #[case("https://example.com/mJMGKQBudWgcHucMYoQd3g")]
    #[case("https://kinescope.io/")]
    #[case("ftp://kinescope.io/abc")]
    #[case("https://notkinescope.io/abc")]
    fn url_regex_rejects_foreign_urls(#[case] url: &str) {
        let extractor = Kinescope::new(url.to_string(), test_client(), None, None);
        assert!(matches!(
            extractor.extract_display_id(),
            Err(ExtractorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn embed_regex_finds_iframes_and_round_trips() {
        let html = r#"<p>intro</p><iframe width="560" src="https://kinescope.io/embed/mJMGKQBudWgcHucMYoQd3g" allow="autoplay"></iframe>
<iframe src='https://www.youtube.com/embed/xyz'></iframe>"#;

        let found: Vec<_> = EMBED_REGEX
            .captures_iter(html)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(found, ["https://kinescope.io/embed/mJMGKQBudWgcHucMYoQd3g"]);
        assert!(URL_REGEX.is_match(&found[0]));
    }

    #[test]
    fn referer_and_user_agent_extras_become_headers() {
        let extras = serde_json::json!({
            "referer": "https://school.example/",
            "user_agent": "kscope-test/1.0"
        });
        let extractor = Kinescope::new(
            PAGE_URL.to_string(),
            test_client(),
            Some("session=abc".to_string()),
            Some(extras),
        );

        let headers = extractor.extractor.get_platform_headers_map();
        assert_eq!(headers.get("referer").map(String::as_str), Some("https://school.example/"));
        assert_eq!(headers.get("user-agent").map(String::as_str), Some("kscope-test/1.0"));
        assert_eq!(extractor.extractor.get_cookie("session").map(String::as_str), Some("abc"));
    }

    #[test]
    fn missing_player_options_is_an_error() {
        let result = Kinescope::parse_player_options("<html>nothing here</html>", "abc");
        assert!(matches!(result, Err(ExtractorError::ValidationError(_))));
    }

    #[rstest]
    #[case("{ playlist: [] }")]
    #[case("{ autoplay: true }")]
    #[case("{ playlist: [{ title: 'no id' }] }")]
    fn unusable_playlist_is_an_error(#[case] options: &str) {
        let result = Kinescope::parse_player_options(&page(options), "abc");
        assert!(matches!(result, Err(ExtractorError::ValidationError(_))));
    }

    #[tokio::test]
    async fn extracts_record_from_page() {
        let (addr, hits) = spawn_manifest_server().await;
        let webpage = page_with_sources(&format!(
            r#"{{ hls: {{ src: "http://{addr}/master.m3u8" }}, shakahls: {{ src: "http://{addr}/master.m3u8" }} }}"#
        ));

        let info = kinescope()
            .extract_from_webpage(&webpage, "mJMGKQBudWgcHucMYoQd3g")
            .await
            .unwrap();

        assert_eq!(info.id, VIDEO_ID);
        assert_eq!(info.display_id, "mJMGKQBudWgcHucMYoQd3g");
        assert_eq!(info.title.as_deref(), Some("video_2025-10-16_19-40-33"));
        assert_eq!(info.description.as_deref(), Some("OG description"));
        assert_eq!(info.thumbnail.as_deref(), Some("https://kinescope.io/poster.jpg"));
        assert_eq!(info.duration, Some(16.667));
        assert_eq!((info.width, info.height), (Some(720), Some(1280)));
        assert_eq!(info.timestamp, Some(1761643617));
        assert_eq!(info.upload_date.as_deref(), Some("20251028"));

        // shakahls aliases hls, so the manifest is fetched once.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let ids: Vec<_> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, ["hls-800", "hls-2400"]);
        assert_eq!(info.formats[1].url, format!("http://{addr}/720p.m3u8"));
        assert!(info.formats.iter().all(|f| f.media_format == MediaFormat::Mp4));
        assert!(info.headers.as_ref().is_some_and(|h| h.contains_key("user-agent")));
    }

    #[tokio::test]
    async fn distinct_shakahls_adds_its_own_formats() {
        let (addr, _) = spawn_manifest_server().await;
        let webpage = page_with_sources(&format!(
            r#"{{ hls: "http://{addr}/master.m3u8", shakahls: {{ src: "http://{addr}/shaka.m3u8" }} }}"#
        ));

        let info = kinescope().extract_from_webpage(&webpage, VIDEO_ID).await.unwrap();

        let ids: Vec<_> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, ["hls-800", "hls-2400", "shakahls"]);
        assert_eq!(info.formats[2].stream_format, StreamFormat::ShakaHls);
    }

    #[tokio::test]
    async fn broken_manifest_is_not_fatal() {
        let (addr, _) = spawn_manifest_server().await;
        let webpage = page_with_sources(&format!(
            r#"{{ hls: {{ src: "http://{addr}/missing.m3u8" }}, shakahls: {{ src: "http://{addr}/shaka.m3u8" }} }}"#
        ));

        let info = kinescope().extract_from_webpage(&webpage, VIDEO_ID).await.unwrap();

        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].format_id, "shakahls");
        assert_eq!(info.title.as_deref(), Some("video_2025-10-16_19-40-33"));
    }

    #[tokio::test]
    async fn sparse_entry_falls_back_to_open_graph() {
        let webpage = page(r#"{ playlist: [{ id: "x1", title: "", posterInPreview: "https://kinescope.io/p.jpg" }] }"#)
            .replace(r#"<meta property="og:video:width" content="720">"#, "");

        let info = kinescope().extract_from_webpage(&webpage, "display").await.unwrap();

        assert_eq!(info.id, "x1");
        assert_eq!(info.display_id, "display");
        assert_eq!(info.title.as_deref(), Some("OG title"));
        assert_eq!(info.thumbnail.as_deref(), Some("https://kinescope.io/p.jpg"));
        assert_eq!(info.duration, None);
        assert_eq!(info.width, None);
        assert_eq!(info.height, Some(1280));
        assert!(info.formats.is_empty());
    }

    #[tokio::test]
    async fn extract_rejects_foreign_url_before_fetching() {
        let extractor = Kinescope::new(
            "https://example.com/video".to_string(),
            test_client(),
            None,
            None,
        );
        assert!(matches!(
            extractor.extract().await,
            Err(ExtractorError::InvalidUrl(_))
        ));
    }

    /// Answers every proxied request: the watch page for `PAGE_URL`, the
    /// manifests, and a 404 for anything else.
    async fn spawn_site_proxy() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let webpage = page_with_sources(&format!(
            r#"{{ hls: {{ src: "http://{addr}/master.m3u8" }} }}"#
        ));

        let app = Router::new()
            .route(
                "/mJMGKQBudWgcHucMYoQd3g",
                get(move || {
                    let webpage = webpage.clone();
                    async move { axum::response::Html(webpage) }
                }),
            )
            .route("/master.m3u8", get(|| async { MASTER }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn extract_fetches_page_and_builds_record() {
        let addr = spawn_site_proxy().await;
        let extractor = Kinescope::new(
            "http://kinescope.io/mJMGKQBudWgcHucMYoQd3g".to_string(),
            test_client_with_proxy(&format!("http://{addr}")),
            None,
            None,
        );

        let info = extractor.extract().await.unwrap();

        assert_eq!(info.id, VIDEO_ID);
        assert_eq!(info.display_id, "mJMGKQBudWgcHucMYoQd3g");
        assert_eq!(info.title.as_deref(), Some("video_2025-10-16_19-40-33"));
        assert_eq!(info.duration, Some(16.667));
        let ids: Vec<_> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, ["hls-800", "hls-2400"]);
    }

    #[tokio::test]
    async fn extract_surfaces_http_status_errors() {
        let addr = spawn_site_proxy().await;
        let extractor = Kinescope::new(
            "http://kinescope.io/abc".to_string(),
            test_client_with_proxy(&format!("http://{addr}")),
            None,
            None,
        );

        let result = extractor.extract().await;
        assert!(
            matches!(&result, Err(ExtractorError::HttpError(e)) if e.status() == Some(reqwest::StatusCode::NOT_FOUND)),
            "{result:?}"
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_extract() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();

        let extractor = Kinescope::new(
            PAGE_URL.to_string(),
            default_client().unwrap(),
            None,
            None,
        );
        let info = extractor.extract().await.unwrap();
        println!("{info:#?}");

        assert_eq!(info.id, VIDEO_ID);
        assert_eq!(info.title.as_deref(), Some("video_2025-10-16_19-40-33"));
        assert_eq!(info.timestamp, Some(1761643617));
        assert_eq!(info.upload_date.as_deref(), Some("20251028"));
        assert!(!info.formats.is_empty());
    }
}
