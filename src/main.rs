use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod extract;
mod invoker;
mod pipeline;
mod server;
mod utils;

use cli::{Cli, Commands};
use config::Config;
use invoker::{Producer, ToolInvoker};
use pipeline::AnalysisPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "quizscribe=debug"
    } else {
        "quizscribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let invoker = Arc::new(ToolInvoker::new(config.tools.clone()));
            if !invoker.check_availability().await {
                eprintln!(
                    "⚠️  {} not found - producer invocations will fail until it is installed",
                    config.tools.python_bin
                );
            }

            let pipeline = Arc::new(AnalysisPipeline::new(invoker));
            server::serve(&config, pipeline).await?;
        }
        Commands::Analyze { url, json } => {
            let url = utils::validate_video_url(&url)?;

            let invoker = Arc::new(ToolInvoker::new(config.tools.clone()));
            let pipeline = AnalysisPipeline::new(invoker);

            let progress = (!cli.quiet).then(|| {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")
                        .unwrap(),
                );
                spinner.set_message("Analyzing video...");
                spinner
            });

            let result = pipeline.analyze(&url).await;

            if let Some(spinner) = &progress {
                spinner.finish_and_clear();
            }

            match result {
                Ok(report) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        match report.educational() {
                            Some(true) => println!(
                                "{} This video looks educational",
                                console::style("✓").green()
                            ),
                            Some(false) => println!(
                                "{} This video does not look educational",
                                console::style("✗").yellow()
                            ),
                            None => println!("The classifier returned no verdict"),
                        }
                        println!("  Transcript segments: {}", report.full_transcript.len());
                        println!("  (use --json for the full report)");
                    }
                }
                Err(err) => {
                    eprintln!("{} {}", console::style("✗").red(), err);
                    if let Some(suggestion) = &err.suggestion {
                        eprintln!("  {}", suggestion);
                    }
                    return Err(err.into());
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file manually:");
                println!("  {}", Config::config_path()?.display());
            }
        }
        Commands::Producers => {
            let invoker = ToolInvoker::new(config.tools.clone());
            println!("Configured producers:");
            for producer in Producer::ALL {
                println!(
                    "  • {}: {}",
                    producer.label(),
                    invoker.script_path(producer).display()
                );
            }
        }
    }

    Ok(())
}
