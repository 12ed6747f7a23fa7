use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quizscribe",
    about = "Quizscribe - transcript analysis, educational checks, summaries, and quizzes for videos",
    version,
    long_about = "Analyzes a video's spoken content by driving external producer tools: fetches a transcript, judges whether the content is educational, summarizes it, and generates a multiple-choice quiz. Runs as an HTTP API or as a one-shot command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP analysis API
    Serve {
        /// Bind host (overrides the configured value)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Bind port (overrides the configured value)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Run the full analysis pipeline once for a video URL
    Analyze {
        /// Video URL to analyze
        #[arg(value_name = "URL")]
        url: String,

        /// Print the raw JSON report instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List the configured producer tools
    Producers,
}
