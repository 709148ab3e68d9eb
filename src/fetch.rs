use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

/// Lines longer than this are dropped before the playlist reaches the filter.
pub const MAX_LINE_LENGTH: usize = 10_000;

/// Download the playlist, enforcing the size ceiling while the body streams
/// in so an oversized response is aborted instead of buffered whole.
pub async fn fetch_playlist(url: &str, max_bytes: usize) -> Result<String> {
    info!("Downloading M3U file from: {}", mask_url(url));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let mut resp = client
        .get(url)
        .send()
        .await
        .context("Error downloading M3U file")?;
    if !resp.status().is_success() {
        bail!("Error downloading M3U file: HTTP {}", resp.status());
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await.context("Error downloading M3U file")? {
        if body.len() + chunk.len() > max_bytes {
            bail!(
                "M3U file exceeds maximum allowed size of {} bytes",
                max_bytes
            );
        }
        body.extend_from_slice(&chunk);
    }

    let content = String::from_utf8(body).context("Error decoding M3U file")?;
    info!("M3U file downloaded successfully, size: {} bytes", content.len());
    Ok(content)
}

/// Drop pathologically long lines before parsing.
pub fn drop_oversized_lines(content: &str, max_line_length: usize) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.len() > max_line_length {
            warn!("Skipping extremely long line {} ({} bytes)", i, line.len());
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Reduce a URL to scheme and host for log lines. Provider playlists embed
/// account tokens in the path, which must never reach the logs.
pub fn mask_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("***");
            if parsed.path() == "/" && parsed.query().is_none() {
                format!("{}://{}", parsed.scheme(), host)
            } else {
                format!("{}://{}/***", parsed.scheme(), host)
            }
        }
        Err(_) => "***".to_string(),
    }
}
