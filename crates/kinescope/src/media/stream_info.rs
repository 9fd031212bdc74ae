use crate::media::{MediaFormat, StreamFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One playable rendition resolved from a streaming manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StreamInfo {
    // Stable identifier of the rendition, e.g. "hls-2400" or "shakahls-audio-aac-ru"
    pub format_id: String,
    // Url of the rendition playlist
    pub url: String,
    // Url of the manifest the rendition was listed in
    pub manifest_url: String,
    pub stream_format: StreamFormat,
    pub media_format: MediaFormat,
    // Quality of the stream, e.g., "1080p", "720p", etc.
    pub quality: String,
    // Bitrate of the stream in kbps
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: String,
    pub fps: f64,
    pub is_audio_only: bool,
    pub priority: u32,
    pub extras: Option<serde_json::Value>,
}

impl StreamInfo {
    pub fn builder(
        url: impl Into<String>,
        stream_format: StreamFormat,
        media_format: MediaFormat,
    ) -> StreamInfoBuilder {
        StreamInfoBuilder::new(url, stream_format, media_format)
    }

    /// Convert to a serde_json::Value for flexible manipulation
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} ({})] - {}",
            self.format_id, self.stream_format, self.media_format, self.quality
        )?;
        if self.bitrate > 0 {
            write!(f, " @ {} kbps", self.bitrate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StreamInfoBuilder {
    inner: StreamInfo,
}

impl StreamInfoBuilder {
    pub fn new(
        url: impl Into<String>,
        stream_format: StreamFormat,
        media_format: MediaFormat,
    ) -> Self {
        let url = url.into();
        Self {
            inner: StreamInfo {
                format_id: stream_format.as_str().to_string(),
                manifest_url: url.clone(),
                url,
                stream_format,
                media_format,
                quality: String::new(),
                bitrate: 0,
                width: None,
                height: None,
                codec: String::new(),
                fps: 0.0,
                is_audio_only: false,
                priority: 0,
                extras: None,
            },
        }
    }

    pub fn format_id(mut self, format_id: impl Into<String>) -> Self {
        self.inner.format_id = format_id.into();
        self
    }

    pub fn manifest_url(mut self, manifest_url: impl Into<String>) -> Self {
        self.inner.manifest_url = manifest_url.into();
        self
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.inner.quality = quality.into();
        self
    }

    pub fn bitrate(mut self, bitrate: u64) -> Self {
        self.inner.bitrate = bitrate;
        self
    }

    pub fn resolution_opt(mut self, resolution: Option<(u32, u32)>) -> Self {
        if let Some((width, height)) = resolution {
            self.inner.width = Some(width);
            self.inner.height = Some(height);
        }
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.inner.codec = codec.into();
        self
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.inner.fps = fps;
        self
    }

    pub fn is_audio_only(mut self, is_audio_only: bool) -> Self {
        self.inner.is_audio_only = is_audio_only;
        self
    }

    pub fn extras_opt(mut self, extras: Option<serde_json::Value>) -> Self {
        self.inner.extras = extras;
        self
    }

    pub fn build(self) -> StreamInfo {
        self.inner
    }
}
