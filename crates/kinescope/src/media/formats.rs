use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Streaming technology a format entry was resolved from.
///
/// Kinescope publishes the same video under several source keys; each key maps
/// to one variant here and becomes the prefix of the entry's `format_id`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    ShakaHls,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::Hls => "hls",
            StreamFormat::ShakaHls => "shakahls",
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hls" => Ok(StreamFormat::Hls),
            "shakahls" => Ok(StreamFormat::ShakaHls),
            _ => Err(()),
        }
    }
}

/// Container of the media segments.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Ts,
    Mp4,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Ts => "ts",
            MediaFormat::Mp4 => "mp4",
        }
    }
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ts" => Ok(MediaFormat::Ts),
            "fmp4" | "mp4" => Ok(MediaFormat::Mp4),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_format_round_trips_through_str() {
        for format in [StreamFormat::Hls, StreamFormat::ShakaHls] {
            assert_eq!(format.as_str().parse::<StreamFormat>(), Ok(format));
        }
        assert_eq!("SHAKAHLS".parse::<StreamFormat>(), Ok(StreamFormat::ShakaHls));
        assert!("dash".parse::<StreamFormat>().is_err());
    }

    #[test]
    fn stream_format_serializes_lowercase() {
        let json = serde_json::to_string(&StreamFormat::ShakaHls).unwrap();
        assert_eq!(json, "\"shakahls\"");
    }
}
