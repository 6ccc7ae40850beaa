//! Control-API discovery: which origin is alive, what assets exist
//!
//! Both queries degrade gracefully - any transport or parse failure
//! yields "no origin" / "empty manifest" so the loader proceeds with
//! whatever it has (possibly loading nothing).

use beacon_core_manifest::ManifestEntry;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct AliveResponse {
    url: Option<String>,
}

/// Base URL of the preferred healthy origin, or `None`
///
/// Queries `GET {control_base}/api/alive-cdn.json`. `None` means every
/// configured origin is down (or the control API itself is unreachable);
/// the loader then uses the local fallback only.
pub async fn alive_origin(client: &reqwest::Client, control_base: &str) -> Option<String> {
    let url = format!("{}/api/alive-cdn.json", control_base.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => match response.json::<AliveResponse>().await {
            Ok(alive) => alive.url,
            Err(e) => {
                debug!("alive-cdn response unparseable: {}", e);
                None
            }
        },
        Err(e) => {
            debug!("alive-cdn query failed: {}", e);
            None
        }
    }
}

/// The current asset manifest, or empty on any failure
///
/// Queries `GET {control_base}/api/manifest.json`.
pub async fn fetch_manifest(client: &reqwest::Client, control_base: &str) -> Vec<ManifestEntry> {
    let url = format!("{}/api/manifest.json", control_base.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => match response.json::<Vec<ManifestEntry>>().await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("manifest response unparseable: {}", e);
                Vec::new()
            }
        },
        Err(e) => {
            debug!("manifest query failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-route JSON server for the control API.
    async fn control_server(alive_body: &'static str, manifest_body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let body = if request.contains("alive-cdn") {
                        alive_body
                    } else {
                        manifest_body
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_alive_origin_present() {
        let base = control_server(r#"{"url":"http://stage.cdn"}"#, "[]").await;
        let client = reqwest::Client::new();

        assert_eq!(
            alive_origin(&client, &base).await,
            Some("http://stage.cdn".to_string())
        );
    }

    #[tokio::test]
    async fn test_alive_origin_null() {
        let base = control_server(r#"{"url":null}"#, "[]").await;
        let client = reqwest::Client::new();

        assert_eq!(alive_origin(&client, &base).await, None);
    }

    #[tokio::test]
    async fn test_discovery_degrades_on_unreachable_control() {
        let client = reqwest::Client::new();

        assert_eq!(alive_origin(&client, "http://127.0.0.1:1").await, None);
        assert!(fetch_manifest(&client, "http://127.0.0.1:1").await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_manifest() {
        let base = control_server(
            r#"{"url":null}"#,
            r#"[{"hashed":"app-aaaaaaaaaaaa.js","critical":true,"mode":"defer","priority":1}]"#,
        )
        .await;
        let client = reqwest::Client::new();

        let manifest = fetch_manifest(&client, &base).await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].hashed, "app-aaaaaaaaaaaa.js");
        assert!(manifest[0].critical);
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_empty() {
        let base = control_server(r#"{"url":null}"#, r#"{"not":"an array"}"#).await;
        let client = reqwest::Client::new();

        assert!(fetch_manifest(&client, &base).await.is_empty());
    }
}
