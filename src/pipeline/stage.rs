use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::extract::{self, ExtractError, ExtractPolicy};
use crate::invoker::{InvokeError, Producer, ProducerInvoker};
use crate::utils::truncate_for_log;

/// Pipeline stages as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InputValidation,
    TranscriptFetch,
    EducationAnalysis,
    Summarization,
    QuizGeneration,
    Server,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::InputValidation => "input_validation",
            Stage::TranscriptFetch => "transcript_fetch",
            Stage::EducationAnalysis => "education_analysis",
            Stage::Summarization => "summarization",
            Stage::QuizGeneration => "quiz_generation",
            Stage::Server => "server",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable error codes.
///
/// `NoTranscript` is the only defined code; it is the sole signal that
/// a fallback transcription path should be offered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoTranscript,
}

/// One failing stage's report.
///
/// Created exactly once per failure and never aggregated; the pipeline
/// stops at the first failing stage and this value is reported to the
/// caller verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage}: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub code: Option<ErrorCode>,
    pub message: String,
    /// Secondary diagnostic (e.g. the underlying parse error)
    pub detail: Option<String>,
    pub suggestion: Option<String>,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            code: None,
            message: message.into(),
            detail: None,
            suggestion: None,
        }
    }

    pub fn input_validation(message: impl Into<String>) -> Self {
        Self::new(Stage::InputValidation, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(Stage::Server, message)
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Structural shape the extracted value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any well-formed value is acceptable.
    Any,
    /// The value must be a non-empty JSON array.
    NonEmptyArray,
}

pub(crate) const FALLBACK_SUGGESTION: &str =
    "Try using fallback transcript method (Whisper/AssemblyAI).";

const EMPTY_TRANSCRIPT_MESSAGE: &str = "Transcript fetched but is empty or malformed.";

/// Drives one pipeline stage end to end.
///
/// This is the single place failure classification happens: invoke the
/// producer, log stderr without failing on it, extract per policy,
/// check the embedded `error` field and the expected shape, and tag
/// every failure with the stage it belongs to. No other component
/// invents error codes.
pub struct StageRunner {
    invoker: Arc<dyn ProducerInvoker>,
}

impl StageRunner {
    pub fn new(invoker: Arc<dyn ProducerInvoker>) -> Self {
        Self { invoker }
    }

    pub async fn run(
        &self,
        stage: Stage,
        producer: Producer,
        args: Vec<String>,
        policy: ExtractPolicy,
        expect: Expect,
    ) -> Result<Value, StageError> {
        let outcome = match self.invoker.invoke(producer, args).await {
            Ok(outcome) => outcome,
            Err(InvokeError::TimedOut(secs)) => {
                tracing::error!(stage = %stage, "{} timed out after {}s", producer, secs);
                return Err(StageError::new(stage, "producer timed out"));
            }
            Err(err) => {
                tracing::error!(stage = %stage, "{} could not run: {}", producer, err);
                return Err(StageError::server(err.to_string()));
            }
        };

        // Producers legitimately write diagnostics here while still
        // succeeding; record it, never fail on it.
        if !outcome.stderr.is_empty() {
            tracing::warn!(
                stage = %stage,
                "{} wrote to stderr: {}",
                producer,
                truncate_for_log(&outcome.stderr, 500)
            );
        }

        let value = match extract::extract(&outcome.stdout, policy) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    stage = %stage,
                    "unusable output from {}: {}",
                    producer,
                    truncate_for_log(&outcome.stdout, 500)
                );
                let mut stage_error = StageError::new(stage, err.to_string());
                if let ExtractError::MalformedOutput(source) = &err {
                    stage_error = stage_error.with_detail(source.to_string());
                }
                return Err(tagged(stage, stage_error));
            }
        };

        // An embedded string `error` field is the producer reporting a
        // recoverable failure in-band.
        if let Some(embedded) = value.get("error").and_then(Value::as_str) {
            tracing::error!(stage = %stage, "{} returned error: {}", producer, embedded);
            return Err(tagged(stage, StageError::new(stage, embedded)));
        }

        if expect == Expect::NonEmptyArray
            && !matches!(value.as_array(), Some(items) if !items.is_empty())
        {
            tracing::error!(stage = %stage, "{} produced an empty or non-array result", producer);
            return Err(tagged(stage, StageError::new(stage, EMPTY_TRANSCRIPT_MESSAGE)));
        }

        Ok(value)
    }
}

/// Failures of the transcript-fetch stage caused by a missing usable
/// transcript (parse failure, embedded error, emptiness) carry the
/// `NO_TRANSCRIPT` code and the fallback suggestion. Timeouts and
/// infrastructure failures do not.
fn tagged(stage: Stage, mut err: StageError) -> StageError {
    if stage == Stage::TranscriptFetch {
        err.code = Some(ErrorCode::NoTranscript);
        err.suggestion = Some(FALLBACK_SUGGESTION.to_string());
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{MockProducerInvoker, ProducerOutcome};
    use serde_json::json;

    fn outcome(stdout: &str) -> ProducerOutcome {
        ProducerOutcome {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn runner_returning(stdout: &'static str) -> StageRunner {
        let mut mock = MockProducerInvoker::new();
        mock.expect_invoke().returning(move |_, _| Ok(outcome(stdout)));
        StageRunner::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn successful_stage_returns_the_structured_value() {
        let runner = runner_returning(r#"[{"text":"hello"},{"text":"world"}]"#);
        let value = runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec!["https://youtu.be/abc12345678".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stderr_noise_alone_does_not_fail_the_stage() {
        let mut mock = MockProducerInvoker::new();
        mock.expect_invoke().returning(|_, _| {
            Ok(ProducerOutcome {
                stdout: r#"{"educational": false}"#.to_string(),
                stderr: "WARNING: slow network".to_string(),
            })
        });
        let runner = StageRunner::new(Arc::new(mock));
        let value = runner
            .run(
                Stage::EducationAnalysis,
                Producer::EduClassify,
                vec!["[]".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::Any,
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"educational": false}));
    }

    #[tokio::test]
    async fn embedded_error_from_transcript_fetch_carries_code_and_suggestion() {
        let runner = runner_returning(r#"{"error": "too long"}"#);
        let err = runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec!["https://youtu.be/abc".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::TranscriptFetch);
        assert_eq!(err.code, Some(ErrorCode::NoTranscript));
        assert_eq!(err.message, "too long");
        assert_eq!(err.suggestion.as_deref(), Some(FALLBACK_SUGGESTION));
    }

    #[tokio::test]
    async fn empty_array_from_transcript_fetch_is_no_transcript() {
        let runner = runner_returning("[]");
        let err = runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec!["https://youtu.be/abc".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, Some(ErrorCode::NoTranscript));
        assert!(err.message.contains("empty or malformed"));
    }

    #[tokio::test]
    async fn empty_array_elsewhere_is_not_no_transcript() {
        // Emptiness is only the checked shape for the transcript stage.
        let runner = runner_returning("[]");
        let value = runner
            .run(
                Stage::EducationAnalysis,
                Producer::EduClassify,
                vec!["[]".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::Any,
            )
            .await
            .unwrap();
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn malformed_output_from_transcript_fetch_suggests_fallback() {
        let runner = runner_returning("sorry, the subtitles service is down");
        let err = runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec!["https://youtu.be/abc".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, Some(ErrorCode::NoTranscript));
        assert_eq!(err.message, "malformed output");
        assert!(err.detail.is_some());
        assert!(err.suggestion.is_some());
    }

    #[tokio::test]
    async fn embedded_error_outside_transcript_fetch_has_no_code() {
        let runner = runner_returning(r#"{"error": "API error: 500"}"#);
        let err = runner
            .run(
                Stage::Summarization,
                Producer::Summarize,
                vec!["text".to_string(), "70".to_string()],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Summarization);
        assert_eq!(err.code, None);
        assert_eq!(err.suggestion, None);
        assert_eq!(err.message, "API error: 500");
    }

    #[tokio::test]
    async fn last_valid_line_stage_recovers_answer_below_log_lines() {
        let runner = runner_returning("fetching model\nwarming up\n{\"quiz\": \"Q1. ...\"}");
        let value = runner
            .run(
                Stage::QuizGeneration,
                Producer::Quizify,
                vec!["summary".to_string(), "3".to_string(), "easy".to_string()],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"quiz": "Q1. ..."}));
    }

    #[tokio::test]
    async fn timeout_is_reported_against_the_current_stage() {
        let mut mock = MockProducerInvoker::new();
        mock.expect_invoke()
            .returning(|_, _| Err(crate::invoker::InvokeError::TimedOut(120)));
        let runner = StageRunner::new(Arc::new(mock));
        let err = runner
            .run(
                Stage::TranscriptFetch,
                Producer::Transcript,
                vec!["https://youtu.be/abc".to_string()],
                ExtractPolicy::WholeOutput,
                Expect::NonEmptyArray,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::TranscriptFetch);
        assert_eq!(err.message, "producer timed out");
        // A timeout is not a missing-transcript signal.
        assert_eq!(err.code, None);
    }

    #[tokio::test]
    async fn spawn_failure_is_a_server_error() {
        let mut mock = MockProducerInvoker::new();
        mock.expect_invoke().returning(|_, _| {
            Err(crate::invoker::InvokeError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )))
        });
        let runner = StageRunner::new(Arc::new(mock));
        let err = runner
            .run(
                Stage::QuizGeneration,
                Producer::Quizify,
                vec![],
                ExtractPolicy::LastValidLine,
                Expect::Any,
            )
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Server);
        assert_eq!(err.code, None);
    }

    #[test]
    fn wire_names_match_the_api_contract() {
        assert_eq!(Stage::InputValidation.as_str(), "input_validation");
        assert_eq!(Stage::TranscriptFetch.as_str(), "transcript_fetch");
        assert_eq!(
            serde_json::to_value(ErrorCode::NoTranscript).unwrap(),
            json!("NO_TRANSCRIPT")
        );
        assert_eq!(
            serde_json::to_value(Stage::EducationAnalysis).unwrap(),
            json!("education_analysis")
        );
    }
}
