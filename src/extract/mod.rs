use serde_json::Value;

/// How a producer's captured stdout is turned into one structured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractPolicy {
    /// The entire trimmed output must parse as a single JSON value.
    /// Any surrounding log text fails extraction.
    WholeOutput,

    /// Scan lines from the last to the first; the first line that
    /// parses is the result. Producers under this policy may log
    /// freely as long as their final answer is the last parseable
    /// line; if several lines parse, the textually last one wins.
    LastValidLine,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed output")]
    MalformedOutput(#[source] serde_json::Error),

    #[error("no structured line found")]
    NoStructuredLine,
}

/// Recover the single structured result a producer intended to emit.
///
/// No partial parsing or recovery: a line either parses as a whole or
/// is skipped (last-valid-line) / fails the extraction (whole-output).
pub fn extract(stdout: &str, policy: ExtractPolicy) -> Result<Value, ExtractError> {
    match policy {
        ExtractPolicy::WholeOutput => {
            serde_json::from_str(stdout.trim()).map_err(ExtractError::MalformedOutput)
        }
        ExtractPolicy::LastValidLine => stdout
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str::<Value>(line).ok())
            .ok_or(ExtractError::NoStructuredLine),
    }
}
