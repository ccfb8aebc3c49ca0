//! Resolving a locator into bytes: local paths or HTTP(S) URLs.

use futures_util::StreamExt;

use super::types::MediaError;

/// True when the locator should be fetched over HTTP.
pub fn is_remote(locator: &str) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Read a whole resource into memory, refusing anything over `max_bytes`.
pub async fn fetch_bytes(locator: &str, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
    if locator.trim().is_empty() {
        return Err(MediaError::load(locator, "empty locator"));
    }
    if is_remote(locator) {
        fetch_remote(locator, max_bytes).await
    } else {
        fetch_local(locator, max_bytes).await
    }
}

async fn fetch_local(path: &str, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| MediaError::load(path, e.to_string()))?;
    if metadata.len() > max_bytes {
        return Err(MediaError::TooLarge { limit: max_bytes });
    }
    tokio::fs::read(path)
        .await
        .map_err(|e| MediaError::load(path, e.to_string()))
}

async fn fetch_remote(url: &str, max_bytes: u64) -> Result<Vec<u8>, MediaError> {
    log::info!("Fetching media from: {}", url);
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::load(url, format!("HTTP status {}", status)));
    }
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(MediaError::TooLarge { limit: max_bytes });
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(MediaError::TooLarge { limit: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }
    log::debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body)
}
