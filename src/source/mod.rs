// src/source/mod.rs
use std::path::Path;
use std::time::Duration;

use reqwest::header;

use crate::utils::error::SourceError;

const USER_AGENT: &str = concat!("profile_extractor/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Creates a reqwest client configured for page fetching.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// Fetches a live document over HTTP and returns its body as text.
pub async fn fetch_document(url: &str) -> Result<String, SourceError> {
    let client = build_client()?; // Propagate client build error if any

    tracing::info!("Fetching document from: {}", url);

    let response = client
        .get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
        .send()
        .await?; // Propagates reqwest::Error as SourceError::Network

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        return Err(SourceError::Http(status));
    }

    let body = response.text().await?;
    tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Reads a document from the local filesystem.
pub async fn read_document<P: AsRef<Path>>(path: P) -> Result<String, SourceError> {
    let path = path.as_ref();
    tracing::info!("Reading document from: {}", path.display());
    let body = tokio::fs::read_to_string(path).await?;
    Ok(body)
}

/// True when the input argument should be fetched rather than read from disk.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
