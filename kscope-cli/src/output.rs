use crate::{
    cli::OutputFormat,
    error::{CliError, Result},
};
#[cfg(feature = "colored-output")]
use colored::*;
use kinescope_parser::media::{MediaInfo, StreamInfo};
#[cfg(feature = "table-output")]
use std::borrow::Cow;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

/// Outcome of extracting one embed found on a page.
pub type EmbedResult = (String, Result<MediaInfo>);

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_media_info(
        &self,
        media_info: &MediaInfo,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(media_info)),
            OutputFormat::Json => self.format_json(media_info, true),
            OutputFormat::JsonCompact => self.format_json(media_info, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.format_table(media_info)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => {
                // Fallback to pretty format when table feature is disabled
                Ok(self.format_pretty(media_info))
            }
        }
    }

    pub fn format_stream_info(
        &self,
        stream_info: &StreamInfo,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Json => to_json(&stream_info.to_value()?, true),
            OutputFormat::JsonCompact => to_json(&stream_info.to_value()?, false),
            _ => Ok(self.format_stream_pretty(stream_info)),
        }
    }

    pub fn format_embed_urls(
        &self,
        page_url: &str,
        urls: &[String],
        format: &OutputFormat,
    ) -> Result<String> {
        if format.is_json() {
            let data = serde_json::json!({ "page": page_url, "embeds": urls });
            return to_json(&data, matches!(format, OutputFormat::Json));
        }

        let mut output = self.colorize(
            &format!("Embedded players on {page_url} ({}):", urls.len()),
            &Color::Green,
            true,
        );
        output.push('\n');
        for url in urls {
            output.push_str(&format!("  {}\n", self.colorize(url, &Color::Blue, false)));
        }
        Ok(output)
    }

    pub fn format_embed_results(
        &self,
        results: &[EmbedResult],
        format: &OutputFormat,
    ) -> Result<String> {
        if format.is_json() {
            let data = results
                .iter()
                .map(|(url, result)| match result {
                    Ok(media_info) => Ok(serde_json::json!({
                        "url": url,
                        "status": "success",
                        "media": media_info.to_value()?,
                    })),
                    Err(e) => Ok(serde_json::json!({
                        "url": url,
                        "status": "error",
                        "message": e.to_string(),
                    })),
                })
                .collect::<std::result::Result<Vec<_>, serde_json::Error>>()?;
            return to_json(&data, matches!(format, OutputFormat::Json));
        }

        let mut output = String::new();
        for (url, result) in results {
            match result {
                Ok(media_info) => output.push_str(&self.format_media_info(media_info, format)?),
                Err(e) => {
                    output.push_str(&self.colorize(&format!("✗ {url}"), &Color::Red, true));
                    output.push_str(&format!(": {e}\n"));
                }
            }
            output.push('\n');
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        output.push_str(&format!(
            "Extracted {}/{} embeds\n",
            results.len() - failed,
            results.len()
        ));
        Ok(output)
    }

    fn format_stream_pretty(&self, stream: &StreamInfo) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("Format Details:", &Color::Green, true));
        output.push('\n');

        self.push_field(&mut output, "Format ID", &stream.format_id, &Color::Cyan);
        self.push_field(&mut output, "Protocol", stream.stream_format.as_str(), &Color::Cyan);
        self.push_field(&mut output, "Container", stream.media_format.as_str(), &Color::Cyan);
        self.push_field(&mut output, "Quality", &stream.quality, &Color::Cyan);
        if let Some(resolution) = stream.resolution() {
            self.push_field(&mut output, "Resolution", &resolution, &Color::Cyan);
        }
        if stream.bitrate > 0 {
            self.push_field(&mut output, "Bitrate", &format!("{} kbps", stream.bitrate), &Color::Cyan);
        }
        if !stream.codec.is_empty() {
            self.push_field(&mut output, "Codec", &stream.codec, &Color::Cyan);
        }
        if stream.fps > 0.0 {
            self.push_field(&mut output, "FPS", &stream.fps.to_string(), &Color::Cyan);
        }
        self.push_field(&mut output, "URL", &stream.url, &Color::Blue);
        self.push_field(&mut output, "Manifest", &stream.manifest_url, &Color::Blue);

        output
    }

    fn format_pretty(&self, media_info: &MediaInfo) -> String {
        let mut output = String::new();

        // Media Information
        output.push_str(&self.colorize("Media Information:", &Color::Green, true));
        output.push('\n');

        self.push_field(&mut output, "ID", &media_info.id, &Color::Cyan);
        if media_info.display_id != media_info.id {
            self.push_field(&mut output, "Display ID", &media_info.display_id, &Color::Cyan);
        }
        self.push_field(
            &mut output,
            "Title",
            media_info.title.as_deref().unwrap_or("-"),
            &Color::Cyan,
        );
        if let Some(description) = &media_info.description {
            self.push_field(&mut output, "Description", description, &Color::Cyan);
        }
        if let Some(duration) = media_info.duration {
            self.push_field(&mut output, "Duration", &format_duration(duration), &Color::Cyan);
        }
        if let (Some(width), Some(height)) = (media_info.width, media_info.height) {
            self.push_field(&mut output, "Resolution", &format!("{width}x{height}"), &Color::Cyan);
        }
        if let Some(upload_date) = &media_info.upload_date {
            self.push_field(&mut output, "Upload Date", upload_date, &Color::Cyan);
        }
        if let Some(thumbnail) = &media_info.thumbnail {
            self.push_field(&mut output, "Thumbnail", thumbnail, &Color::Blue);
        }
        self.push_field(&mut output, "Page", &media_info.site_url, &Color::Blue);

        // Formats
        output.push('\n');
        output.push_str(&self.colorize(
            &format!("Formats ({}):", media_info.formats.len()),
            &Color::Green,
            true,
        ));
        output.push('\n');
        if media_info.formats.is_empty() {
            output.push_str("  (none)\n");
        }
        for stream in &media_info.formats {
            output.push_str(&format!(
                "  {}\n    {}\n",
                self.colorize(&stream.to_string(), &Color::Yellow, false),
                self.colorize(&stream.url, &Color::Blue, false)
            ));
        }

        // Headers
        if let Some(headers) = &media_info.headers
            && !headers.is_empty()
        {
            output.push('\n');
            output.push_str(&self.colorize("Headers:", &Color::Green, true));
            output.push('\n');

            let mut headers: Vec<_> = headers.iter().collect();
            headers.sort();
            for (key, value) in headers {
                self.push_field(&mut output, key, value, &Color::Cyan);
            }
        }

        output
    }

    fn format_json(&self, media_info: &MediaInfo, pretty: bool) -> Result<String> {
        let media_data = media_info.to_value()?;
        let output_data = serde_json::json!({ "media": media_data });
        to_json(&output_data, pretty)
    }

    #[cfg(feature = "table-output")]
    fn format_table(&self, media_info: &MediaInfo) -> String {
        #[derive(Tabled)]
        struct TableRow<'a> {
            property: &'a str,
            value: Cow<'a, str>,
        }

        #[derive(Tabled)]
        struct FormatRow<'a> {
            format_id: &'a str,
            quality: &'a str,
            resolution: String,
            bitrate: String,
            codec: &'a str,
            url: &'a str,
        }

        let mut rows = vec![
            TableRow {
                property: "ID",
                value: Cow::Borrowed(&media_info.id),
            },
            TableRow {
                property: "Title",
                value: Cow::Borrowed(media_info.title.as_deref().unwrap_or("")),
            },
        ];

        if let Some(duration) = media_info.duration {
            rows.push(TableRow {
                property: "Duration",
                value: Cow::Owned(format_duration(duration)),
            });
        }
        if let (Some(width), Some(height)) = (media_info.width, media_info.height) {
            rows.push(TableRow {
                property: "Resolution",
                value: Cow::Owned(format!("{width}x{height}")),
            });
        }
        if let Some(upload_date) = &media_info.upload_date {
            rows.push(TableRow {
                property: "Upload Date",
                value: Cow::Borrowed(upload_date),
            });
        }
        if let Some(thumbnail) = &media_info.thumbnail {
            rows.push(TableRow {
                property: "Thumbnail",
                value: Cow::Borrowed(thumbnail),
            });
        }

        let formats = media_info.formats.iter().map(|stream| FormatRow {
            format_id: &stream.format_id,
            quality: &stream.quality,
            resolution: stream.resolution().unwrap_or_default(),
            bitrate: if stream.bitrate > 0 {
                format!("{} kbps", stream.bitrate)
            } else {
                String::new()
            },
            codec: &stream.codec,
            url: &stream.url,
        });

        let mut output = Table::new(rows).with(Style::modern()).to_string();
        output.push('\n');
        output.push_str(&Table::new(formats).with(Style::modern()).to_string());
        output.push('\n');
        output
    }

    fn push_field(&self, output: &mut String, label: &str, value: &str, color: &Color) {
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize(label, &Color::Yellow, false),
            self.colorize(value, color, false)
        ));
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let mut output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(CliError::from)?;
    output.push('\n');
    Ok(output)
}

/// `16.667` -> `00:00:16.667`
fn format_duration(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as u64;
    let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    format!("{hours:02}:{minutes:02}:{:02}.{:03}", rest / 1000, rest % 1000)
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
