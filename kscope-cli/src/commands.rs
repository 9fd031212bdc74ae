use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{EmbedResult, OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use kinescope_parser::{
    extractor::{
        ClientOptions, ProxyConfig, error::ExtractorError, factory::ExtractorFactory,
        factory_with_options, platform_extractor::Extractor,
    },
    media::MediaInfo,
};
use std::{path::Path, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

pub struct CommandExecutor {
    config: AppConfig,
    extractor_factory: ExtractorFactory,
}

impl CommandExecutor {
    /// Command line `timeout` and `proxy` take precedence over the configuration.
    pub fn new(
        config: AppConfig,
        timeout: Option<u64>,
        proxy: Option<ProxyConfig>,
    ) -> Result<Self> {
        let proxy = proxy.or_else(|| {
            config.proxy.as_ref().map(|url| ProxyConfig {
                url: url.clone(),
                username: config.proxy_username.clone(),
                password: config.proxy_password.clone(),
            })
        });

        let options = ClientOptions {
            timeout: Duration::from_secs(timeout.unwrap_or(config.timeout_secs)),
            proxy,
        };
        let extractor_factory = factory_with_options(&options)?;

        Ok(Self {
            config,
            extractor_factory,
        })
    }

    pub async fn extract_single(
        &self,
        url: &str,
        cookies: Option<&str>,
        referer: Option<&str>,
        output_format: OutputFormat,
        output_file: Option<&Path>,
        format_id: Option<&str>,
    ) -> Result<()> {
        let pb = self.create_progress_bar("Extracting...", output_format);
        let result = self.extract(url, cookies, referer).await;
        pb.finish_and_clear();

        let media_info = result?;
        let output_manager = OutputManager::new(self.config.colored);

        let output = match format_id {
            Some(format_id) => {
                let stream = media_info
                    .find_format(format_id)
                    .ok_or_else(|| CliError::format_not_found(format_id))?;
                output_manager.format_stream_info(stream, &output_format)?
            }
            None => output_manager.format_media_info(&media_info, &output_format)?,
        };

        write_output(&output, output_file)
    }

    pub async fn list_embeds(
        &self,
        page_url: &str,
        extract: bool,
        output_format: OutputFormat,
    ) -> Result<()> {
        let page = Url::parse(page_url).map_err(|e| {
            CliError::invalid_input(format!("Invalid page URL '{page_url}': {e}"))
        })?;

        let pb = self.create_progress_bar("Scanning page...", output_format);
        let html = self.fetch_page(page.as_str()).await;
        pb.finish_and_clear();

        let embeds = self.extractor_factory.extract_embed_urls(&html?);
        info!(page = page_url, count = embeds.len(), "Found embedded players");

        let output_manager = OutputManager::new(self.config.colored);
        if !extract {
            let output = output_manager.format_embed_urls(page_url, &embeds, &output_format)?;
            return write_output(&output, None);
        }

        // Embeds restricted to the hosting site need it as referer.
        let referer = page.as_str();

        let pb = self.create_progress_bar("Extracting embeds...", output_format);
        let mut results: Vec<EmbedResult> = Vec::with_capacity(embeds.len());
        for (index, embed_url) in embeds.into_iter().enumerate() {
            pb.set_message(format!("[{}] {embed_url}", index + 1));
            let result = self.extract(&embed_url, None, Some(referer)).await;
            if let Err(e) = &result {
                warn!(url = %embed_url, error = %e, "Embed extraction failed");
            }
            results.push((embed_url, result));
        }
        pb.finish_and_clear();

        let output = output_manager.format_embed_results(&results, &output_format)?;
        write_output(&output, None)
    }

    async fn extract(
        &self,
        url: &str,
        cookies: Option<&str>,
        referer: Option<&str>,
    ) -> Result<MediaInfo> {
        let extras = build_extras(&self.config, referer);
        debug!(url, extras = ?extras, "Creating extractor");

        let extractor = self.extractor_factory.create_extractor(
            url,
            cookies.map(String::from),
            extras,
        )?;
        Ok(extractor.extract().await?)
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String> {
        let mut extractor =
            Extractor::new("Page", page_url, self.extractor_factory.client().clone());
        if let Some(user_agent) = &self.config.user_agent {
            extractor.add_header_str(reqwest::header::USER_AGENT.as_str(), user_agent);
        }

        let body = async {
            extractor
                .get(page_url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await
        .map_err(ExtractorError::from)?;

        Ok(body)
    }

    fn create_progress_bar(&self, message: &str, output_format: OutputFormat) -> ProgressBar {
        // Keep machine-readable output free of spinner noise.
        if output_format.is_json() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "))
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb
    }
}

/// Extractor extras for the configured user agent and the effective referer.
fn build_extras(config: &AppConfig, referer: Option<&str>) -> Option<serde_json::Value> {
    let mut extras = serde_json::Map::new();
    if let Some(referer) = referer.or(config.referer.as_deref()) {
        extras.insert("referer".into(), referer.into());
    }
    if let Some(user_agent) = &config.user_agent {
        extras.insert("user_agent".into(), user_agent.as_str().into());
    }
    (!extras.is_empty()).then_some(serde_json::Value::Object(extras))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extras_merge_flag_and_config() {
        let config = AppConfig {
            user_agent: Some("kscope-test/1.0".to_string()),
            referer: Some("https://config.example/".to_string()),
            ..AppConfig::default()
        };

        let extras = build_extras(&config, Some("https://flag.example/")).unwrap();
        assert_eq!(extras["referer"], "https://flag.example/");
        assert_eq!(extras["user_agent"], "kscope-test/1.0");

        let extras = build_extras(&config, None).unwrap();
        assert_eq!(extras["referer"], "https://config.example/");
        assert!(extras.get("cookies").is_none());
    }

    #[test]
    fn no_extras_without_settings() {
        assert!(build_extras(&AppConfig::default(), None).is_none());
    }
}
