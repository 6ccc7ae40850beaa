//! Bucket and manifest API handlers

use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use beacon_core_manifest::{hashed_name, stale_siblings, Attributes, LoadMode, MANIFEST_FILE_NAME};
use beacon_sentinel::select_origin;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Liveness probe file: served verbatim under a stable name so the
/// sentinel's cache-busted GET always has a target, never manifested.
pub const PROBE_FILE_NAME: &str = "ping.txt";

/// One accepted upload in the response payload
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub original: String,
    pub hashed: String,
}

/// Explicit attribute overrides carried alongside an upload
#[derive(Debug, Default)]
struct AttributeOverrides {
    critical: Option<bool>,
    mode: Option<LoadMode>,
    priority: Option<u32>,
}

impl AttributeOverrides {
    /// Explicit fields win; anything omitted falls back to the rules
    fn apply(&self, classified: Attributes) -> Attributes {
        Attributes {
            critical: self.critical.unwrap_or(classified.critical),
            mode: self.mode.unwrap_or(classified.mode),
            priority: self.priority.unwrap_or(classified.priority),
        }
    }
}

/// Upload handler: multipart files into the bucket
///
/// Each file is written under its content-addressed name, any physical
/// siblings for the same logical asset are deleted, and the manifest is
/// updated and persisted. All of that happens under the store's write
/// lock so concurrent uploads cannot interleave their manifest saves.
///
/// Text fields `critical`, `mode` and `priority` override the rule
/// engine's classification for every file in the request.
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadedFile>>, (StatusCode, String)> {
    let mut files: Vec<(String, axum::body::Bytes)> = Vec::new();
    let mut overrides = AttributeOverrides::default();

    // Multipart is sequential: collect everything first, since an
    // override field may follow the file it applies to.
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Multipart error: {}", e),
        )
    })? {
        if let Some(original) = field.file_name().map(|s| s.to_string()) {
            let data = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read file: {}", e),
                )
            })?;
            files.push((original, data));
            continue;
        }

        let name = field.name().unwrap_or("").to_string();
        let text = field.text().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read field {}: {}", name, e),
            )
        })?;
        match name.as_str() {
            "critical" => {
                overrides.critical = Some(text.parse().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Invalid critical flag: {}", text),
                    )
                })?);
            }
            "mode" => {
                overrides.mode = Some(LoadMode::from_str(&text).map_err(|e| {
                    (StatusCode::BAD_REQUEST, e.to_string())
                })?);
            }
            "priority" => {
                overrides.priority = Some(text.parse().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Invalid priority: {}", text),
                    )
                })?);
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No file fields in upload".to_string(),
        ));
    }

    let mut uploaded = Vec::new();
    for (original, data) in files {
        if original == MANIFEST_FILE_NAME {
            return Err((
                StatusCode::BAD_REQUEST,
                "The manifest cannot be uploaded directly".to_string(),
            ));
        }

        // The probe file keeps its plain name so its URL never changes.
        if original == PROBE_FILE_NAME {
            std::fs::write(state.bucket_dir.join(PROBE_FILE_NAME), &data)
                .map_err(internal("Failed to write probe file"))?;
            tracing::info!("Refreshed probe file ({} bytes)", data.len());
            uploaded.push(UploadedFile {
                original: original.clone(),
                hashed: original,
            });
            continue;
        }

        let hashed = hashed_name(&original, &data);
        let attrs = overrides.apply(state.rules.classify(&original));

        let mut store = state.store.write().await;

        std::fs::write(state.bucket_dir.join(&hashed), &data)
            .map_err(internal("Failed to write file"))?;

        // Drop superseded physical versions of the same logical asset.
        let existing = bucket_files(&state.bucket_dir)
            .map_err(internal("Failed to scan bucket"))?;
        for stale in stale_siblings(existing.iter().map(String::as_str), &original) {
            if stale == hashed {
                continue;
            }
            std::fs::remove_file(state.bucket_dir.join(&stale))
                .map_err(internal("Failed to remove stale file"))?;
            store.remove(&stale);
            tracing::info!("Removed superseded file: {}", stale);
        }

        store.upsert(&hashed, attrs);
        store.save().map_err(internal("Failed to persist manifest"))?;

        tracing::info!(
            "Uploaded {} as {} ({} bytes)",
            original,
            hashed,
            data.len()
        );
        uploaded.push(UploadedFile { original, hashed });
    }

    Ok(Json(uploaded))
}

/// Request to delete an asset by its content-addressed name
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub filename: String,
}

/// Delete handler: drop an asset, then rebuild the manifest
///
/// Rebuilding from the surviving file set (rather than removing one
/// entry) restores manifest/file-set consistency even if the two had
/// drifted apart.
pub async fn delete_handler(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<String>, (StatusCode, String)> {
    validate_asset_name(&request.filename)?;

    let path = state.bucket_dir.join(&request.filename);
    if !path.is_file() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Asset not found: {}", request.filename),
        ));
    }

    let mut store = state.store.write().await;
    std::fs::remove_file(&path).map_err(internal("Failed to delete file"))?;

    let remaining = bucket_files(&state.bucket_dir)
        .map_err(internal("Failed to scan bucket"))?;
    store.rebuild_from_disk(remaining, &state.rules);
    store.save().map_err(internal("Failed to persist manifest"))?;

    tracing::info!("Deleted asset: {}", request.filename);
    Ok(Json(format!("Deleted: {}", request.filename)))
}

/// Asset serving handler
pub async fn serve_file_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    validate_asset_name(&name)?;

    let path = state.bucket_dir.join(&name);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("Asset not found: {}", name),
            ));
        }
        Err(e) => return Err(internal("Failed to read file")(e)),
    };

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&name))],
        data,
    )
        .into_response())
}

/// Manifest handler: the current manifest, wire-identical to the
/// persisted file
pub async fn manifest_handler(
    State(state): State<AppState>,
) -> Json<Vec<beacon_core_manifest::ManifestEntry>> {
    let store = state.store.read().await;
    Json(store.list().to_vec())
}

/// Response for the failover query
#[derive(Debug, Serialize)]
pub struct AliveResponse {
    /// Base URL of the preferred healthy origin; null when all are down
    pub url: Option<String>,
}

/// Failover handler: which origin should assets load from right now
pub async fn alive_cdn_handler(State(state): State<AppState>) -> Json<AliveResponse> {
    let health = state.health.read().await;
    let url = select_origin(&state.origins, &health).map(|o| o.base_url.clone());
    Json(AliveResponse { url })
}

/// Plain filenames in the bucket, the probe file excluded so rebuilds
/// never pull it into the manifest
pub(crate) fn bucket_files(dir: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name != PROBE_FILE_NAME {
                files.push(name);
            }
        }
    }
    Ok(files)
}

/// Reject names that could escape the bucket directory
fn validate_asset_name(name: &str) -> Result<(), (StatusCode, String)> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid asset name: {}", name),
        ));
    }
    Ok(())
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn internal<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> (StatusCode, String) + '_ {
    move |e| {
        let msg = format!("{}: {}", context, e);
        tracing::error!("{}", msg);
        (StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use axum::body::Body;
    use axum::http::Request;
    use beacon_core_manifest::{ManifestEntry, RuleSet};
    use beacon_sentinel::{Monitor, Origin, OriginHealth, OriginStatus, ProbePolicy};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "beacon-test-boundary";

    fn test_state(dir: &TempDir, origins: Vec<Origin>) -> AppState {
        let monitor = Monitor::new(origins, ProbePolicy::default());
        AppState::new(dir.path(), RuleSet::default(), &monitor).unwrap()
    }

    fn multipart_body(files: &[(&str, &[u8])]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
        )
    }

    fn multipart_body_with_fields(
        files: &[(&str, &[u8])],
        fields: &[(&str, &str)],
    ) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
        )
    }

    async fn upload(state: &AppState, files: &[(&str, &[u8])]) -> (StatusCode, Vec<u8>) {
        let (content_type, body) = multipart_body(files);
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn get_manifest(state: &AppState) -> Vec<ManifestEntry> {
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/manifest.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_creates_hashed_file_and_manifest_entry() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (status, body) = upload(&state, &[("app.js", b"console.log(1);")]).await;
        assert_eq!(status, StatusCode::OK);

        let accepted: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let hashed = accepted[0]["hashed"].as_str().unwrap().to_string();
        assert!(hashed.starts_with("app-"));
        assert!(hashed.ends_with(".js"));
        assert!(dir.path().join(&hashed).is_file());

        // Default rules mark scripts critical with defer mode.
        let manifest = get_manifest(&state).await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].hashed, hashed);
        assert!(manifest[0].critical);
    }

    #[tokio::test]
    async fn test_upload_explicit_attributes_override_rules() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        // Default rules would classify app.js as critical/defer/1.
        let (content_type, body) = multipart_body_with_fields(
            &[("app.js", b"console.log(1);")],
            &[("critical", "false"), ("mode", "async"), ("priority", "7")],
        );
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let manifest = get_manifest(&state).await;
        assert_eq!(manifest.len(), 1);
        assert!(!manifest[0].critical);
        assert_eq!(manifest[0].mode, LoadMode::Async);
        assert_eq!(manifest[0].priority, 7);
    }

    #[tokio::test]
    async fn test_upload_invalid_mode_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (content_type, body) = multipart_body_with_fields(
            &[("app.js", b"console.log(1);")],
            &[("mode", "eager")],
        );
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reupload_supersedes_stale_sibling() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (_, body) = upload(&state, &[("app.js", b"v1")]).await;
        let first: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let old = first[0]["hashed"].as_str().unwrap().to_string();

        let (_, body) = upload(&state, &[("app.js", b"v2")]).await;
        let second: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let new = second[0]["hashed"].as_str().unwrap().to_string();
        assert_ne!(old, new);

        // The superseded physical copy is gone from disk and manifest.
        assert!(!dir.path().join(&old).exists());
        assert!(dir.path().join(&new).is_file());
        let manifest = get_manifest(&state).await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].hashed, new);
    }

    #[tokio::test]
    async fn test_probe_file_kept_verbatim_and_unmanifested() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (status, _) = upload(&state, &[("ping.txt", b"pong")]).await;
        assert_eq!(status, StatusCode::OK);

        assert!(dir.path().join("ping.txt").is_file());
        assert!(get_manifest(&state).await.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (status, _) = upload(&state, &[("manifest.json", b"[]")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_entry() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (_, body) = upload(&state, &[("style.css", b"body{}")]).await;
        let accepted: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let hashed = accepted[0]["hashed"].as_str().unwrap().to_string();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/delete")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!("{{\"filename\":\"{}\"}}", hashed)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(!dir.path().join(&hashed).exists());
        assert!(get_manifest(&state).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_asset_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/delete")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"filename":"ghost-aaaaaaaaaaaa.js"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_file_returns_bytes_with_content_type() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let (_, body) = upload(&state, &[("app.js", b"console.log(1);")]).await;
        let accepted: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let hashed = accepted[0]["hashed"].as_str().unwrap();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/files/{}", hashed))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/javascript"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"console.log(1);");
    }

    #[tokio::test]
    async fn test_serve_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/files/nope-aaaaaaaaaaaa.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, vec![]);

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/files/..%2Fsecret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_alive_cdn_reflects_health() {
        let dir = TempDir::new().unwrap();
        let origins = vec![
            Origin::new("aws", "http://dev.cdn", "http://dev.cdn/ping.txt"),
            Origin::new("azure", "http://stage.cdn", "http://stage.cdn/ping.txt"),
        ];
        let state = test_state(&dir, origins);

        // Nothing probed yet: every origin counts as down.
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/alive-cdn.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"url":null}"#);

        // First origin down, second up: the second wins.
        {
            let mut health = state.health.write().await;
            health.insert(
                "aws".to_string(),
                OriginHealth::now(OriginStatus::Unhealthy),
            );
            health.insert(
                "azure".to_string(),
                OriginHealth::now(OriginStatus::Healthy),
            );
        }
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/alive-cdn.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let alive: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(alive["url"], "http://stage.cdn");
    }

    #[tokio::test]
    async fn test_restart_reconciles_manifest_with_bucket() {
        let dir = TempDir::new().unwrap();
        {
            let state = test_state(&dir, vec![]);
            upload(&state, &[("app.js", b"v1"), ("logo.png", b"png")]).await;
        }
        // A file dropped into the bucket outside the API gets picked up.
        std::fs::write(dir.path().join("extra-dddddddddddd.css"), "body{}").unwrap();

        let state = test_state(&dir, vec![]);
        let manifest = get_manifest(&state).await;
        assert_eq!(manifest.len(), 3);
        assert!(manifest.iter().all(|e| e.hashed != "manifest.json"));
        assert!(manifest
            .iter()
            .any(|e| e.hashed == "extra-dddddddddddd.css"));
    }

    #[tokio::test]
    async fn test_explicit_attributes_survive_restart() {
        let dir = TempDir::new().unwrap();
        {
            let state = test_state(&dir, vec![]);
            let (content_type, body) = multipart_body_with_fields(
                &[("app.js", b"console.log(1);")],
                &[("critical", "false"), ("mode", "async"), ("priority", "7")],
            );
            let response = router(state)
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/upload")
                        .header(header::CONTENT_TYPE, content_type)
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // A fresh state over the same bucket keeps the stored
        // attributes instead of re-deriving them from the rules.
        let state = test_state(&dir, vec![]);
        let manifest = get_manifest(&state).await;
        assert_eq!(manifest.len(), 1);
        assert!(!manifest[0].critical);
        assert_eq!(manifest[0].mode, LoadMode::Async);
        assert_eq!(manifest[0].priority, 7);
    }
}
