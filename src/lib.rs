//! Quizscribe - analyze a video's spoken content through external producer tools
//!
//! This library drives a multi-stage analysis pipeline over a set of external,
//! unreliable text-output producers: a transcript extractor, a fallback
//! speech-to-text transcriber, an educational-content classifier, a summarizer,
//! and a quiz generator. The pipeline recovers one structured result from each
//! producer's possibly noisy output, classifies failures per stage, and exposes
//! the whole thing over an HTTP API and a small CLI.

pub mod cli;
pub mod config;
pub mod extract;
pub mod invoker;
pub mod pipeline;
pub mod quiz;
pub mod server;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use invoker::{Producer, ProducerInvoker, ProducerOutcome, ToolInvoker};
pub use pipeline::{AnalysisPipeline, AnalysisReport};
pub use quiz::{ParsedQuiz, QuizQuestion};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
