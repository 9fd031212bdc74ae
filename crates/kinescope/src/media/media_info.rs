use chrono::{TimeZone, Utc};
use rustc_hash::FxHashMap;

use super::stream_info::StreamInfo;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Normalized description of one video page.
///
/// Produced once per extraction and never mutated afterwards. Every metadata
/// field is optional: a page that lacks a value yields `None` rather than an
/// error.
///
/// # Fields
///
/// * `id` - Canonical video identifier taken from the player configuration
/// * `display_id` - Identifier parsed from the page URL
/// * `site_url` - The page the record was extracted from
/// * `duration` - Length in fractional seconds
/// * `timestamp` - Release time as Unix seconds
/// * `upload_date` - `timestamp` rendered as `YYYYMMDD` (UTC)
/// * `formats` - Playable renditions, lowest bitrate first within a technology
/// * `headers` - HTTP headers a downloader has to replay (Referer, User-Agent...)
///
/// # Examples
///
/// ```rust
/// use kinescope_parser::media::media_info::MediaInfo;
///
/// let media = MediaInfo::builder("a7f02d44-2779-4d05-8197-638ee7d816d3", "https://kinescope.io/mJMGKQBudWgcHucMYoQd3g")
///     .display_id("mJMGKQBudWgcHucMYoQd3g")
///     .title("video_2025-10-16_19-40-33")
///     .duration_opt(Some(16.667))
///     .timestamp_opt(Some(1761643617))
///     .build();
///
/// assert_eq!(media.upload_date.as_deref(), Some("20251028"));
/// ```
pub struct MediaInfo {
    pub id: String,
    pub display_id: String,
    pub site_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub timestamp: Option<i64>,
    pub upload_date: Option<String>,
    pub formats: Vec<StreamInfo>,
    pub headers: Option<FxHashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct MediaInfoBuilder {
    id: String,
    display_id: Option<String>,
    site_url: String,
    title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    timestamp: Option<i64>,
    formats: Vec<StreamInfo>,
    headers: Option<FxHashMap<String, String>>,
}

impl MediaInfo {
    pub fn builder(id: impl Into<String>, site_url: impl Into<String>) -> MediaInfoBuilder {
        MediaInfoBuilder::new(id, site_url)
    }

    /// Convert to a serde_json::Value for flexible manipulation
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn find_format(&self, format_id: &str) -> Option<&StreamInfo> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

impl MediaInfoBuilder {
    pub fn new(id: impl Into<String>, site_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_id: None,
            site_url: site_url.into(),
            title: None,
            description: None,
            thumbnail: None,
            duration: None,
            width: None,
            height: None,
            timestamp: None,
            formats: Vec::new(),
            headers: None,
        }
    }

    pub fn display_id(mut self, display_id: impl Into<String>) -> Self {
        self.display_id = Some(display_id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn title_opt(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn description_opt(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn thumbnail_opt(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn duration_opt(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    pub fn width_opt(mut self, width: Option<u32>) -> Self {
        self.width = width;
        self
    }

    pub fn height_opt(mut self, height: Option<u32>) -> Self {
        self.height = height;
        self
    }

    pub fn timestamp_opt(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn formats(mut self, formats: Vec<StreamInfo>) -> Self {
        self.formats = formats;
        self
    }

    pub fn headers(mut self, headers: FxHashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn build(self) -> MediaInfo {
        let upload_date = self
            .timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .map(|dt| dt.format("%Y%m%d").to_string());

        MediaInfo {
            display_id: self.display_id.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            site_url: self.site_url,
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
            duration: self.duration,
            width: self.width,
            height: self.height,
            timestamp: self.timestamp,
            upload_date,
            formats: self.formats,
            headers: self.headers,
        }
    }
}
