use anyhow::Result;
use url::Url;

/// Validate a video URL and return its normalized form
pub fn validate_video_url(input: &str) -> Result<String> {
    let parsed = Url::parse(input)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", input))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    if parsed.host_str().is_none() {
        anyhow::bail!("URL must include a host");
    }

    Ok(parsed.to_string())
}

/// Truncate producer output for log lines, marking the cut
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let kept: String = text.chars().take(max_chars).collect();
    format!("{}... ({} chars total)", kept, text.chars().count())
}
