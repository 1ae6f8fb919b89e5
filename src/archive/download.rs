//! Streaming archive download with manual redirect handling.
//!
//! Hosting services answer snapshot URLs with several redirect hops before the
//! final payload, so redirects are followed manually against a visited set
//! instead of trusting the client's built-in policy. The body is streamed
//! straight to disk and hashed on the way through; a failed transfer never
//! leaves a partial file behind.

use crate::core::UpdateError;
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, StatusCode, Url};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Redirect statuses that are followed. Anything else is terminal.
const REDIRECT_STATUS: [u16; 5] = [301, 302, 303, 307, 308];

/// Maximum number of redirect hops before the chain is treated as a loop.
const MAX_REDIRECTS: usize = 5;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

fn user_agent() -> String {
    format!("refit/{}", env!("CARGO_PKG_VERSION"))
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(user_agent())
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// Downloads `url` to `dest`, following at most [`MAX_REDIRECTS`] hops.
///
/// Returns the hex SHA-256 digest of the written payload. On any transfer
/// failure the partially written file is removed before the error propagates.
pub async fn download(url: &str, dest: &Path) -> Result<String> {
    let client = build_client()?;

    let mut visited: HashSet<String> = HashSet::new();
    let mut current = url.to_string();

    loop {
        if visited.contains(&current) || visited.len() > MAX_REDIRECTS {
            return Err(UpdateError::RedirectLoop { url: current }.into());
        }
        visited.insert(current.clone());

        tracing::debug!(target: "archive", "requesting {current}");
        let response = client
            .get(&current)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|error| UpdateError::Network {
                url: current.clone(),
                reason: error.to_string(),
            })?;

        let status = response.status();
        if REDIRECT_STATUS.contains(&status.as_u16()) {
            current = redirect_target(&current, status, response.headers().get(LOCATION))?;
            continue;
        }

        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                status: status.as_u16(),
                url: current,
            }
            .into());
        }

        return write_body(response, &current, dest).await;
    }
}

/// Resolves the next hop of a redirect, honoring relative `Location` values.
fn redirect_target(
    current: &str,
    status: StatusCode,
    location: Option<&reqwest::header::HeaderValue>,
) -> Result<String> {
    let location = location
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| UpdateError::RedirectMissingTarget {
            url: current.to_string(),
        })?;

    let base = Url::parse(current).map_err(|error| UpdateError::Network {
        url: current.to_string(),
        reason: format!("invalid request URL: {error}"),
    })?;
    let next = base.join(location).map_err(|error| UpdateError::Network {
        url: current.to_string(),
        reason: format!("invalid redirect target {location:?}: {error}"),
    })?;

    tracing::debug!(target: "archive", "HTTP {status} redirect to {next}");
    Ok(next.to_string())
}

/// Streams the response body to `dest`, hashing chunks as they arrive.
async fn write_body(response: reqwest::Response, url: &str, dest: &Path) -> Result<String> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                remove_partial(dest).await;
                return Err(UpdateError::Network {
                    url: url.to_string(),
                    reason: format!("transfer interrupted: {error}"),
                }
                .into());
            }
        };
        hasher.update(&chunk);
        if let Err(error) = file.write_all(&chunk).await {
            remove_partial(dest).await;
            return Err(error).with_context(|| format!("failed to write {}", dest.display()));
        }
        written += chunk.len() as u64;
    }

    if let Err(error) = file.flush().await {
        remove_partial(dest).await;
        return Err(error).with_context(|| format!("failed to flush {}", dest.display()));
    }

    let digest = hex::encode(hasher.finalize());
    tracing::debug!(target: "archive", "wrote {written} bytes to {} ({digest})", dest.display());
    Ok(digest)
}

async fn remove_partial(dest: &Path) {
    if let Err(error) = tokio::fs::remove_file(dest).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(target: "archive", "failed to remove partial {}: {error}", dest.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sha256_hex(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    #[tokio::test]
    async fn test_download_plain_success() {
        let mut server = mockito::Server::new_async().await;
        let body = b"zip payload bytes";
        let mock = server
            .mock("GET", "/snapshot.zip")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        let digest = download(&format!("{}/snapshot.zip", server.url()), &dest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(digest, sha256_hex(body));
    }

    #[tokio::test]
    async fn test_download_follows_redirect_chain() {
        let mut server = mockito::Server::new_async().await;
        // Relative and absolute Location values are both resolved.
        let hop1 = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/hop2")
            .create_async()
            .await;
        let hop2 = server
            .mock("GET", "/hop2")
            .with_status(307)
            .with_header("location", &format!("{}/final", server.url()))
            .create_async()
            .await;
        let terminal = server
            .mock("GET", "/final")
            .with_status(200)
            .with_body("redirected body")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        download(&format!("{}/start", server.url()), &dest)
            .await
            .unwrap();

        hop1.assert_async().await;
        hop2.assert_async().await;
        terminal.assert_async().await;
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "redirected body");
    }

    #[tokio::test]
    async fn test_download_detects_redirect_cycle() {
        let mut server = mockito::Server::new_async().await;
        let _a = server
            .mock("GET", "/a")
            .with_status(301)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_status(301)
            .with_header("location", "/a")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        let error = download(&format!("{}/a", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<UpdateError>(),
            Some(UpdateError::RedirectLoop { .. })
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_enforces_redirect_bound() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for index in 0..6 {
            mocks.push(
                server
                    .mock("GET", format!("/r{index}").as_str())
                    .with_status(308)
                    .with_header("location", &format!("/r{}", index + 1))
                    .create_async()
                    .await,
            );
        }

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        let error = download(&format!("{}/r0", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<UpdateError>(),
            Some(UpdateError::RedirectLoop { .. })
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_redirect_without_location() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/dangling")
            .with_status(303)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        let error = download(&format!("{}/dangling", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<UpdateError>(),
            Some(UpdateError::RedirectMissingTarget { .. })
        ));
    }

    #[tokio::test]
    async fn test_download_terminal_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("update.zip");
        let error = download(&format!("{}/missing.zip", server.url()), &dest)
            .await
            .unwrap_err();

        match error.downcast_ref::<UpdateError>() {
            Some(UpdateError::HttpStatus { status, .. }) => assert_eq!(*status, 404),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_redirect_target_relative_resolution() {
        let next = redirect_target(
            "https://host.example/project/archive.zip",
            StatusCode::FOUND,
            Some(&reqwest::header::HeaderValue::from_static("/other/path.zip")),
        )
        .unwrap();
        assert_eq!(next, "https://host.example/other/path.zip");
    }
}
