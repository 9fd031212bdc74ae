use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kscope",
    about = "kscope - extract video metadata and HLS formats from kinescope.io",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds (defaults to the configured value)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_password: Option<String>,
}

impl Args {
    /// Output format requested by the command, if it has one.
    pub fn output_format(&self) -> Option<OutputFormat> {
        match &self.command {
            Commands::Extract { output, .. } | Commands::Embeds { output, .. } => *output,
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract video metadata and formats from a kinescope URL
    Extract {
        /// Watch page or embed URL, e.g. https://kinescope.io/embed/<id>
        url: String,

        /// The cookies to use for the request ("name=value; name2=value2")
        #[arg(long)]
        cookies: Option<String>,

        /// Referer to send, for videos restricted to a domain
        #[arg(long)]
        referer: Option<String>,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,

        /// Only print the format with this id (e.g. "hls-2400")
        #[arg(short, long)]
        format_id: Option<String>,
    },

    /// List kinescope players embedded in a third-party page
    Embeds {
        /// The page to scan for embedded players
        page_url: String,

        /// Also extract every embed found
        #[arg(short, long)]
        extract: bool,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonCompact)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_extract_with_globals() {
        let args = Args::try_parse_from([
            "kscope",
            "extract",
            "https://kinescope.io/embed/abc",
            "--referer",
            "https://school.example/",
            "-o",
            "json-compact",
            "--timeout",
            "10",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.timeout, Some(10));
        assert_eq!(args.output_format(), Some(OutputFormat::JsonCompact));
        match args.command {
            Commands::Extract { url, referer, .. } => {
                assert_eq!(url, "https://kinescope.io/embed/abc");
                assert_eq!(referer.as_deref(), Some("https://school.example/"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["kscope", "-v", "-q", "config", "--show"]).is_err());
    }

    #[test]
    fn output_format_display_matches_value_names() {
        for format in OutputFormat::value_variants() {
            let value = format.to_possible_value().unwrap();
            assert_eq!(value.get_name(), format.to_string());
        }
    }
}
