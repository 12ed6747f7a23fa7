use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::extract::ExtractPolicy;
use crate::invoker::{Producer, ProducerInvoker};

pub mod stage;

pub use stage::{ErrorCode, Expect, Stage, StageError, StageRunner};

/// Terminal success value of the full-analysis entry point.
///
/// The classifier's object is flattened at the top level (it always
/// carries `educational`, plus whatever else it chooses to report) and
/// the fetched transcript rides along for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub analysis: Map<String, Value>,
    pub full_transcript: Vec<Value>,
}

impl AnalysisReport {
    /// Convenience accessor for the classifier's verdict
    pub fn educational(&self) -> Option<bool> {
        self.analysis.get("educational").and_then(Value::as_bool)
    }
}

/// Sequences the analysis stages and assembles success payloads.
///
/// Entry points are independent: full analysis runs transcript fetch
/// then classification; the fallback/summarize/quiz entry points are
/// one-stage machines over externally supplied prior-stage output.
/// Stages never run concurrently within one entry point and are never
/// retried automatically.
pub struct AnalysisPipeline {
    runner: StageRunner,
}

impl AnalysisPipeline {
    pub fn new(invoker: Arc<dyn ProducerInvoker>) -> Self {
        Self {
            runner: StageRunner::new(invoker),
        }
    }

    /// Full analysis: validate the URL, fetch the transcript, classify
    /// it, and merge both into one report.
    pub async fn analyze(&self, url: &str) -> Result<AnalysisReport, StageError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StageError::input_validation("No URL provided"));
        }

        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, url, "starting full analysis");

        let transcript = self
            .runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec![url.to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await?;

        let segments: Vec<Value> = transcript.as_array().cloned().unwrap_or_default();
        tracing::info!(%request_id, segments = segments.len(), "transcript fetched");

        // The classifier receives the transcript exactly as the
        // producer emitted it, serialized as one argument.
        let classification = self
            .runner
            .run(
                Stage::EducationAnalysis,
                Producer::EduClassify,
                vec![transcript.to_string()],
                ExtractPolicy::WholeOutput,
                Expect::Any,
            )
            .await?;

        let analysis = match classification {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        tracing::info!(%request_id, "analysis complete");

        Ok(AnalysisReport {
            analysis,
            full_transcript: segments,
        })
    }

    /// Fallback transcription for videos with no usable captions.
    /// Returns the transcribed text as a single blob.
    pub async fn fallback_transcript(&self, url: &str) -> Result<String, StageError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StageError::input_validation("No URL provided"));
        }

        tracing::info!(url, "starting fallback transcription");

        let value = self
            .runner
            .run(
                Stage::TranscriptFetch,
                Producer::FallbackTranscribe,
                vec![url.to_string()],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await?;

        Ok(field_text(&value, "transcript"))
    }

    /// Summarize transcript text to roughly `word_limit` words.
    ///
    /// The word limit is whatever JSON number the caller sent; absent
    /// or non-numeric values fall back to 70.
    pub async fn summarize(
        &self,
        transcript: &str,
        word_limit: Option<&Value>,
    ) -> Result<String, StageError> {
        if transcript.trim().is_empty() {
            return Err(StageError::input_validation("Transcript is required"));
        }

        let limit = match word_limit {
            Some(Value::Number(n)) => n.to_string(),
            _ => "70".to_string(),
        };

        tracing::info!(word_limit = %limit, "starting summarization");

        let value = self
            .runner
            .run(
                Stage::Summarization,
                Producer::Summarize,
                vec![transcript.to_string(), limit],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await?;

        Ok(field_text(&value, "summary"))
    }

    /// Generate raw quiz text from a summary. Structuring the text is
    /// the presentation layer's concern (see the `quiz` module).
    pub async fn quiz(
        &self,
        summary: &str,
        num_questions: u32,
        difficulty: &str,
    ) -> Result<String, StageError> {
        if summary.trim().is_empty() {
            return Err(StageError::input_validation("Summary required"));
        }

        tracing::info!(num_questions, difficulty, "starting quiz generation");

        let value = self
            .runner
            .run(
                Stage::QuizGeneration,
                Producer::Quizify,
                vec![
                    summary.to_string(),
                    num_questions.to_string(),
                    difficulty.to_string(),
                ],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await?;

        Ok(field_text(&value, "quiz"))
    }
}

/// Pull a string field out of a producer's structured answer. A valid
/// answer that omits the field yields an empty string rather than a
/// new error kind; failure classification stays in the stage runner.
fn field_text(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
