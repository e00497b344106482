use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::engine::models::{ArtifactKind, LatestVersion, RemoteDescriptor};
use crate::util::format_speed;

const MANIFEST_HOST: &str = "https://int.jefvel.net/~jefvel/gamemanifest";

/// HTTP access to the remote descriptor source and the archive store.
#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
    base_url: String,
}

impl NetworkClient {
    pub fn new() -> Self {
        Self::with_base_url(MANIFEST_HOST)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Query the latest version token for one artifact kind.
    pub async fn latest_version(&self, kind: ArtifactKind) -> Result<String, String> {
        let url = format!("{}/latest/{}", self.base_url, kind.key());
        let latest: LatestVersion = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("latest version request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("latest version status error: {e}"))?
            .json()
            .await
            .map_err(|e| format!("latest version parse error: {e}"))?;
        debug!("networking: latest {} version is {}", kind.key(), latest.version);
        Ok(latest.version)
    }

    /// Fetch the full descriptor (version token plus archive path) for one
    /// artifact kind.
    pub async fn fetch_descriptor(&self, kind: ArtifactKind) -> Result<RemoteDescriptor, String> {
        let url = format!("{}/manifest/{}", self.base_url, kind.key());
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("descriptor request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("descriptor status error: {e}"))?
            .json()
            .await
            .map_err(|e| format!("descriptor parse error: {e}"))
    }

    /// Absolute download URL for a descriptor's relative archive path.
    pub fn archive_url(&self, relative: &str) -> String {
        format!("{}/versions/{}", self.base_url, relative)
    }

    /// Download a file to `dest`, calling `progress` with
    /// (downloaded, total, speed_text).
    pub async fn download_to_path<F>(
        &self,
        url: &str,
        dest: &Path,
        mut progress: F,
    ) -> Result<(), String>
    where
        F: FnMut(u64, Option<u64>, &str),
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("download request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("download status error: {e}"))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create download dir: {e}"))?;
        }
        let mut file = File::create(dest)
            .await
            .map_err(|e| format!("failed to create file: {e}"))?;

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_tick = Instant::now();
        let mut last_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            // A failed transfer must not leave a truncated archive behind:
            // the next pass would treat it as a cache hit and extraction
            // would fail on every retry.
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(format!("stream error: {err}"));
                }
            };
            if let Err(err) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return Err(format!("write error: {err}"));
            }
            downloaded += chunk.len() as u64;

            let since = last_tick.elapsed().as_secs_f32();
            if since > 0.2 {
                let speed = (downloaded - last_bytes) as f32 / since;
                let speed_text = format_speed(speed);
                progress(downloaded, total, &speed_text);
                last_tick = Instant::now();
                last_bytes = downloaded;
            }
        }

        // Final callback.
        progress(downloaded, total, "0 B/s");

        if let Err(err) = file.flush().await {
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(format!("flush error: {err}"));
        }
        drop(file);

        if let Some(total) = total
            && downloaded < total
        {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(format!(
                "download incomplete: received {} of {} bytes",
                downloaded, total
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Minimal HTTP/1.1 server serving canned raw responses by request path.
    /// The accept loop runs on a plain thread until the test process exits.
    pub struct StubServer {
        base_url: String,
    }

    impl StubServer {
        pub fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let routes: HashMap<String, Vec<u8>> = routes
                .into_iter()
                .map(|(path, response)| (path.to_owned(), response))
                .collect();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { continue };
                    let mut request = Vec::new();
                    let mut buf = [0u8; 2048];
                    loop {
                        match stream.read(&mut buf) {
                            Ok(0) => break,
                            Ok(n) => {
                                request.extend_from_slice(&buf[..n]);
                                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = routes.get(path).cloned().unwrap_or_else(|| {
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                            .to_vec()
                    });
                    let _ = stream.write_all(&response);
                }
            });
            Self { base_url }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    /// A complete 200 response carrying `body`.
    pub fn http_ok(body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubServer;
    use super::*;

    #[test]
    fn joins_archive_urls_against_the_versions_root() {
        let client = NetworkClient::with_base_url("https://example.net/gamemanifest");
        assert_eq!(
            client.archive_url("g12.zip"),
            "https://example.net/gamemanifest/versions/g12.zip"
        );
    }

    #[tokio::test]
    async fn truncated_download_removes_the_partial_file() {
        // Advertise 100 bytes but deliver 10, then close the connection.
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"only ten b");
        let server = StubServer::serve(vec![("/versions/g12.zip", response)]);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("g12.zip");
        let client = NetworkClient::with_base_url(server.base_url());
        let url = client.archive_url("g12.zip");

        let result = client.download_to_path(&url, &dest, |_, _, _| {}).await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
