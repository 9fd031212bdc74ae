use async_trait::async_trait;
use m3u8_rs::{AlternativeMediaType, MasterPlaylist, MediaPlaylist, Playlist};
use reqwest::Client;
use reqwest::header::HeaderMap;
use rustc_hash::FxHashSet;
use tracing::debug;
use url::Url;

use super::error::ExtractorError;
use crate::media::{MediaFormat, StreamFormat, stream_info::StreamInfo};

/// Expands an HLS manifest into format entries.
///
/// Implementors only opt in; the provided method does the fetching and parsing.
#[async_trait]
pub trait HlsExtractor {
    async fn extract_hls_stream(
        &self,
        client: &Client,
        headers: Option<HeaderMap>,
        m3u8_url: &str,
        stream_format: StreamFormat,
        media_format: MediaFormat,
        extras: Option<serde_json::Value>,
    ) -> Result<Vec<StreamInfo>, ExtractorError> {
        let base_url =
            Url::parse(m3u8_url).map_err(|e| ExtractorError::HlsPlaylistError(e.to_string()))?;

        let response = client
            .get(m3u8_url)
            .headers(headers.unwrap_or_default())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_hls_playlist(&response, &base_url, stream_format, media_format, extras)
    }
}

/// Parse manifest bytes fetched from `base_url`.
pub fn parse_hls_playlist(
    content: &[u8],
    base_url: &Url,
    stream_format: StreamFormat,
    media_format: MediaFormat,
    extras: Option<serde_json::Value>,
) -> Result<Vec<StreamInfo>, ExtractorError> {
    let playlist = m3u8_rs::parse_playlist_res(content)
        .map_err(|e| ExtractorError::HlsPlaylistError(e.to_string()))?;

    let streams = match playlist {
        Playlist::MasterPlaylist(pl) => {
            process_master_playlist(pl, base_url, stream_format, media_format, extras)
        }
        Playlist::MediaPlaylist(pl) => {
            let media_format = if is_fragmented_mp4(&pl) {
                MediaFormat::Mp4
            } else {
                media_format
            };

            vec![
                StreamInfo::builder(base_url.as_str(), stream_format, media_format)
                    .quality("Source")
                    .extras_opt(extras)
                    .build(),
            ]
        }
    };

    Ok(streams)
}

fn is_fragmented_mp4(playlist: &MediaPlaylist) -> bool {
    playlist.segments.iter().any(|s| {
        let path = s.uri.split('?').next().unwrap_or_default();
        s.map.is_some() || path.ends_with(".mp4") || path.ends_with(".m4s")
    })
}

fn process_master_playlist(
    playlist: MasterPlaylist,
    base_url: &Url,
    stream_format: StreamFormat,
    media_format: MediaFormat,
    extras: Option<serde_json::Value>,
) -> Vec<StreamInfo> {
    let tag = stream_format.as_str();
    let mut used_ids = FxHashSet::default();
    let mut streams = Vec::new();

    for media in playlist.alternatives {
        if media.media_type != AlternativeMediaType::Audio {
            continue;
        }
        let Some(uri) = media.uri.as_deref() else {
            continue;
        };
        let Some(stream_url) = join_uri(base_url, uri) else {
            continue;
        };

        let format_id = unique_format_id(
            &mut used_ids,
            format!(
                "{tag}-audio-{}-{}",
                sanitize_id_part(&media.group_id),
                sanitize_id_part(&media.name)
            ),
        );
        let quality = match media.language.as_deref() {
            Some(lang) => format!("audio ({lang})"),
            None => "audio".to_string(),
        };

        streams.push(
            StreamInfo::builder(stream_url, stream_format, media_format)
                .format_id(format_id)
                .manifest_url(base_url.as_str())
                .quality(quality)
                .is_audio_only(true)
                .extras_opt(extras.clone())
                .build(),
        );
    }

    let mut variants: Vec<_> = playlist
        .variants
        .into_iter()
        .filter(|v| !v.is_i_frame)
        .collect();
    variants.sort_by_key(|v| v.average_bandwidth.unwrap_or(v.bandwidth));

    for (index, variant) in variants.into_iter().enumerate() {
        let Some(stream_url) = join_uri(base_url, &variant.uri) else {
            continue;
        };
        let bitrate = variant.average_bandwidth.unwrap_or(variant.bandwidth) / 1000;
        let resolution = variant
            .resolution
            .and_then(|r| Some((u32::try_from(r.width).ok()?, u32::try_from(r.height).ok()?)));

        let candidate = if bitrate > 0 {
            format!("{tag}-{bitrate}")
        } else {
            format!("{tag}-{index}")
        };
        let format_id = unique_format_id(&mut used_ids, candidate);

        let quality = match resolution {
            Some((_, height)) => format!("{height}p"),
            None if bitrate > 0 => format!("{bitrate}k"),
            None => "Source".to_string(),
        };

        streams.push(
            StreamInfo::builder(stream_url, stream_format, media_format)
                .format_id(format_id)
                .manifest_url(base_url.as_str())
                .quality(quality)
                .bitrate(bitrate)
                .resolution_opt(resolution)
                .codec(variant.codecs.unwrap_or_default())
                .fps(variant.frame_rate.unwrap_or(0.0))
                .extras_opt(extras.clone())
                .build(),
        );
    }

    for (priority, stream) in streams.iter_mut().enumerate() {
        stream.priority = priority as u32;
    }

    streams
}

fn join_uri(base_url: &Url, uri: &str) -> Option<String> {
    match base_url.join(uri) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!(uri, error = %e, "Skipping playlist entry with unresolvable uri");
            None
        }
    }
}

fn sanitize_id_part(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn unique_format_id(used: &mut FxHashSet<String>, candidate: String) -> String {
    if used.insert(candidate.clone()) {
        return candidate;
    }
    let mut n = 1;
    loop {
        let id = format!("{candidate}-{n}");
        if used.insert(id.clone()) {
            return id;
        }
        n += 1;
    }
}
