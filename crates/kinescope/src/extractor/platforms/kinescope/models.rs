use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::extractor::utils::float_or_none;

/// `var playerOptions = {...}` as embedded in kinescope pages.
#[derive(Debug, Deserialize)]
pub struct PlayerOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub playlist: Option<Vec<Value>>,
}

/// One entry of the player playlist.
///
/// Only `id` is required. Every other field falls back to `None` when it is
/// missing or has an unexpected shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sources: Option<Sources>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster: Option<Poster>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster_in_preview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub meta: Option<VideoMeta>,
}

impl VideoInfo {
    pub fn title(&self) -> Option<&str> {
        non_empty(self.title.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(self.description.as_deref())
    }

    /// `poster.src.src`, else `posterInPreview`.
    pub fn thumbnail(&self) -> Option<&str> {
        let poster = self
            .poster
            .as_ref()
            .and_then(|p| p.src.as_ref())
            .and_then(|s| s.src.as_deref());
        non_empty(poster).or_else(|| non_empty(self.poster_in_preview.as_deref()))
    }

    pub fn duration(&self) -> Option<f64> {
        self.meta.as_ref().and_then(|m| m.duration)
    }

    pub fn hls_url(&self) -> Option<&str> {
        self.sources
            .as_ref()
            .and_then(|s| s.hls.as_ref())
            .and_then(SourceDescriptor::src)
    }

    pub fn shakahls_url(&self) -> Option<&str> {
        self.sources
            .as_ref()
            .and_then(|s| s.shakahls.as_ref())
            .and_then(SourceDescriptor::src)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Sources {
    #[serde(default, deserialize_with = "lenient")]
    pub hls: Option<SourceDescriptor>,
    #[serde(default, deserialize_with = "lenient")]
    pub shakahls: Option<SourceDescriptor>,
}

/// A manifest location, either inline or wrapped in `{"src": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    Url(String),
    Object {
        #[serde(default, deserialize_with = "lenient")]
        src: Option<String>,
    },
}

impl SourceDescriptor {
    pub fn src(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Url(url) => non_empty(Some(url)),
            SourceDescriptor::Object { src } => non_empty(src.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Poster {
    #[serde(default, deserialize_with = "lenient")]
    pub src: Option<PosterSource>,
}

#[derive(Debug, Deserialize)]
pub struct PosterSource {
    #[serde(default, deserialize_with = "lenient")]
    pub src: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoMeta {
    #[serde(default, deserialize_with = "lenient_float")]
    pub duration: Option<f64>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Deserialize into `T`, turning a value of the wrong shape into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(float_or_none(&value))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a non-empty id, got {other}"
        ))),
    }
}
