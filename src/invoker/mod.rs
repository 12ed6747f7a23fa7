use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::ToolsConfig;

/// The external producers the pipeline can run.
///
/// Each variant resolves to one script in the configured scripts
/// directory. Producers are opaque: they take string arguments and
/// write text to stdout/stderr, nothing more is assumed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Producer {
    Transcript,
    FallbackTranscribe,
    EduClassify,
    Summarize,
    Quizify,
}

impl Producer {
    pub const ALL: [Producer; 5] = [
        Producer::Transcript,
        Producer::FallbackTranscribe,
        Producer::EduClassify,
        Producer::Summarize,
        Producer::Quizify,
    ];

    /// Script file implementing this producer
    pub fn script_name(&self) -> &'static str {
        match self {
            Producer::Transcript => "fetch_transcript.py",
            Producer::FallbackTranscribe => "assemblyai_transcribe.py",
            Producer::EduClassify => "check_educational.py",
            Producer::Summarize => "summarizer.py",
            Producer::Quizify => "quizzify.py",
        }
    }

    /// Human-readable role, for logs and the CLI listing
    pub fn label(&self) -> &'static str {
        match self {
            Producer::Transcript => "transcript extractor",
            Producer::FallbackTranscribe => "fallback transcriber",
            Producer::EduClassify => "educational classifier",
            Producer::Summarize => "summarizer",
            Producer::Quizify => "quiz generator",
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Captured output of one producer run.
///
/// Both streams are passed through untouched apart from trimming outer
/// whitespace; content on stderr is not a failure by itself.
#[derive(Debug, Clone, Default)]
pub struct ProducerOutcome {
    pub stdout: String,
    pub stderr: String,
}

/// Errors raised while trying to run a producer process.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("failed to start producer process: {0}")]
    Spawn(#[from] io::Error),

    #[error("producer timed out after {0}s")]
    TimedOut(u64),

    #[error("producer limiter closed")]
    LimiterClosed,
}

/// Seam between the pipeline and the outside world.
///
/// The production implementation spawns real processes; tests swap in
/// a mock to script producer behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProducerInvoker: Send + Sync {
    /// Run one producer to completion and capture both streams.
    async fn invoke(&self, producer: Producer, args: Vec<String>)
        -> Result<ProducerOutcome, InvokeError>;
}

/// Runs producer scripts as child processes.
///
/// Holds the configuration injected at construction and a semaphore
/// bounding how many producer processes may run at once across all
/// concurrent requests.
pub struct ToolInvoker {
    python_bin: String,
    scripts_dir: PathBuf,
    timeout_secs: u64,
    limiter: Arc<Semaphore>,
}

impl ToolInvoker {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(tools.max_concurrent.max(1))),
            python_bin: tools.python_bin,
            scripts_dir: tools.scripts_dir,
            timeout_secs: tools.timeout_secs,
        }
    }

    /// Check if the configured interpreter is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.python_bin)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Resolved path of a producer's script
    pub fn script_path(&self, producer: Producer) -> PathBuf {
        self.scripts_dir.join(producer.script_name())
    }
}

#[async_trait]
impl ProducerInvoker for ToolInvoker {
    async fn invoke(
        &self,
        producer: Producer,
        args: Vec<String>,
    ) -> Result<ProducerOutcome, InvokeError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| InvokeError::LimiterClosed)?;

        let script = self.script_path(producer);
        tracing::debug!(script = %script.display(), "invoking {}", producer);

        let mut command = Command::new(&self.python_bin);
        command
            .arg(&script)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(Duration::from_secs(self.timeout_secs), command.output())
            .await
            .map_err(|_| InvokeError::TimedOut(self.timeout_secs))??;

        Ok(ProducerOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
