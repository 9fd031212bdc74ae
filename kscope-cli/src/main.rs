mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use kinescope_parser::extractor::ProxyConfig;
use std::process;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json_errors = args.output_format().is_some_and(|f| f.is_json());

    if let Err(e) = run(args).await {
        if json_errors {
            let error_json = serde_json::json!({
                "status": "error",
                "message": e.to_string(),
            });
            println!("{error_json}");
        } else {
            error!("Application error: {}", e);
            #[cfg(feature = "colored-output")]
            {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
            #[cfg(not(feature = "colored-output"))]
            {
                eprintln!("Error: {}", e);
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults ({})", path.display());
            } else if show {
                if let Some(path) = args.config.clone().or_else(AppConfig::default_config_path) {
                    println!("# {}", path.display());
                }
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        Commands::Extract {
            url,
            cookies,
            referer,
            output,
            output_file,
            format_id,
        } => {
            let output = output.unwrap_or(config.default_output);
            let proxy = proxy_from_args(args.proxy, args.proxy_username, args.proxy_password);
            let executor = CommandExecutor::new(config, args.timeout, proxy)?;

            executor
                .extract_single(
                    &url,
                    cookies.as_deref(),
                    referer.as_deref(),
                    output,
                    output_file.as_deref(),
                    format_id.as_deref(),
                )
                .await?;
        }

        Commands::Embeds {
            page_url,
            extract,
            output,
        } => {
            let output = output.unwrap_or(config.default_output);
            let proxy = proxy_from_args(args.proxy, args.proxy_username, args.proxy_password);
            let executor = CommandExecutor::new(config, args.timeout, proxy)?;

            executor.list_embeds(&page_url, extract, output).await?;
        }
    }

    Ok(())
}

fn proxy_from_args(
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Option<ProxyConfig> {
    url.map(|url| ProxyConfig {
        url,
        username,
        password,
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}
