//! A minimal in-process OCI registry for tests.
//!
//! Serves just enough of the distribution API for the devreg client:
//! monolithic blob uploads, blob and manifest reads, manifest puts, and the
//! bare `GET /` health check. It also exposes knobs tests need: failing the
//! first N health checks, counting probes and uploads, and holding manifest
//! puts until released.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use devreg_types::{media_types, Digest};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Storage {
    blobs: HashMap<Digest, Bytes>,
    /// `(repository, tag or digest)` → (bytes, content type)
    manifests: HashMap<(String, String), (Bytes, String)>,
    uploads: HashMap<u64, String>,
}

struct RegistryState {
    storage: Mutex<Storage>,
    next_upload: AtomicU64,
    failing_health_checks: AtomicUsize,
    probes: AtomicUsize,
    blob_uploads: AtomicUsize,
    manifest_puts: AtomicUsize,
    hold_manifests: watch::Sender<bool>,
}

/// Running test registry. The server stops when this is dropped.
pub struct TestRegistry {
    addr: SocketAddr,
    state: Arc<RegistryState>,
    task: JoinHandle<()>,
}

impl TestRegistry {
    /// Bind an ephemeral localhost port and start serving.
    pub async fn start() -> std::io::Result<Self> {
        let (hold_manifests, _) = watch::channel(false);
        let state = Arc::new(RegistryState {
            storage: Mutex::new(Storage::default()),
            next_upload: AtomicU64::new(1),
            failing_health_checks: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            blob_uploads: AtomicUsize::new(0),
            manifest_puts: AtomicUsize::new(0),
            hold_manifests,
        });

        let app = Router::new()
            .route("/", get(health))
            .route("/v2/", get(api_version))
            .route("/v2/*path", any(dispatch))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("test registry stopped: {e}");
            }
        });
        Ok(Self { addr, state, task })
    }

    /// `host:port` to build references against.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Answer the next `n` health checks with 503.
    pub fn fail_health_checks(&self, n: usize) {
        self.state.failing_health_checks.store(n, Ordering::SeqCst);
    }

    /// Health checks received so far.
    pub fn probe_count(&self) -> usize {
        self.state.probes.load(Ordering::SeqCst)
    }

    /// Completed blob uploads so far.
    pub fn blob_upload_count(&self) -> usize {
        self.state.blob_uploads.load(Ordering::SeqCst)
    }

    /// Manifest puts received so far, including held ones.
    pub fn manifest_put_count(&self) -> usize {
        self.state.manifest_puts.load(Ordering::SeqCst)
    }

    /// Park manifest puts until [`release_manifests`](Self::release_manifests).
    pub fn hold_manifests(&self) {
        self.state.hold_manifests.send_replace(true);
    }

    pub fn release_manifests(&self) {
        self.state.hold_manifests.send_replace(false);
    }

    /// Store a manifest directly, bypassing upload checks.
    pub fn put_manifest(&self, repository: &str, tag: &str, manifest: &[u8], content_type: &str) {
        let mut storage = self.state.storage.lock().expect("lock poisoned");
        storage.manifests.insert(
            (repository.to_string(), tag.to_string()),
            (Bytes::copy_from_slice(manifest), content_type.to_string()),
        );
    }

    /// Store a blob directly under `digest`, whether or not it matches.
    pub fn put_blob(&self, digest: Digest, data: &[u8]) {
        let mut storage = self.state.storage.lock().expect("lock poisoned");
        storage.blobs.insert(digest, Bytes::copy_from_slice(data));
    }
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn health(State(state): State<Arc<RegistryState>>) -> StatusCode {
    state.probes.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .failing_health_checks
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn api_version() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], "{}")
}

async fn dispatch(
    State(state): State<Arc<RegistryState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = path.trim_start_matches('/');

    if let Some((repository, rest)) = path.rsplit_once("/blobs/uploads") {
        let id = rest.trim_matches('/');
        return match (method, id.is_empty()) {
            (Method::POST, true) => start_upload(&state, repository),
            (Method::PUT, false) => finish_upload(&state, repository, id, query.as_deref(), body),
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }
    if let Some((_, digest)) = path.rsplit_once("/blobs/") {
        return match method {
            Method::GET | Method::HEAD => get_blob(&state, digest),
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }
    if let Some((repository, reference)) = path.rsplit_once("/manifests/") {
        return match method {
            Method::GET | Method::HEAD => get_manifest(&state, repository, reference),
            Method::PUT => put_manifest(&state, repository, reference, &headers, body).await,
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }
    oci_error(StatusCode::NOT_FOUND, "NAME_UNKNOWN", path)
}

fn start_upload(state: &RegistryState, repository: &str) -> Response {
    let id = state.next_upload.fetch_add(1, Ordering::SeqCst);
    state
        .storage
        .lock()
        .expect("lock poisoned")
        .uploads
        .insert(id, repository.to_string());
    let location = format!("/v2/{repository}/blobs/uploads/{id}");
    (StatusCode::ACCEPTED, [(header::LOCATION, location)]).into_response()
}

fn finish_upload(state: &RegistryState, repository: &str, id: &str, query: Option<&str>, body: Bytes) -> Response {
    let expected = query
        .into_iter()
        .flat_map(|q| url::form_urlencoded::parse(q.as_bytes()))
        .find(|(k, _)| k == "digest")
        .and_then(|(_, v)| v.parse::<Digest>().ok());
    let Some(expected) = expected else {
        return oci_error(StatusCode::BAD_REQUEST, "DIGEST_INVALID", "missing digest");
    };
    if !expected.verify(&body) {
        return oci_error(StatusCode::BAD_REQUEST, "DIGEST_INVALID", "digest does not match content");
    }

    let mut storage = state.storage.lock().expect("lock poisoned");
    let known = id
        .parse::<u64>()
        .ok()
        .and_then(|id| storage.uploads.remove(&id))
        .is_some_and(|repo| repo == repository);
    if !known {
        return oci_error(StatusCode::NOT_FOUND, "BLOB_UPLOAD_UNKNOWN", id);
    }
    storage.blobs.insert(expected.clone(), body);
    state.blob_uploads.fetch_add(1, Ordering::SeqCst);

    let location = format!("/v2/{repository}/blobs/{expected}");
    (
        StatusCode::CREATED,
        [(header::LOCATION, location), (header::HeaderName::from_static("docker-content-digest"), expected.to_string())],
    )
        .into_response()
}

fn get_blob(state: &RegistryState, digest: &str) -> Response {
    let Ok(digest) = digest.parse::<Digest>() else {
        return oci_error(StatusCode::BAD_REQUEST, "DIGEST_INVALID", digest);
    };
    let storage = state.storage.lock().expect("lock poisoned");
    match storage.blobs.get(&digest) {
        Some(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, media_types::OCTET_STREAM)],
            data.clone(),
        )
            .into_response(),
        None => oci_error(StatusCode::NOT_FOUND, "BLOB_UNKNOWN", &digest.to_string()),
    }
}

fn get_manifest(state: &RegistryState, repository: &str, reference: &str) -> Response {
    let storage = state.storage.lock().expect("lock poisoned");
    match storage.manifests.get(&(repository.to_string(), reference.to_string())) {
        Some((data, content_type)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.clone()),
                (
                    header::HeaderName::from_static("docker-content-digest"),
                    Digest::sha256(data).to_string(),
                ),
            ],
            data.clone(),
        )
            .into_response(),
        None => oci_error(StatusCode::NOT_FOUND, "MANIFEST_UNKNOWN", reference),
    }
}

async fn put_manifest(
    state: &RegistryState,
    repository: &str,
    reference: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    state.manifest_puts.fetch_add(1, Ordering::SeqCst);
    let mut held = state.hold_manifests.subscribe();
    if held.wait_for(|hold| !*hold).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(media_types::OCI_MANIFEST)
        .to_string();
    let digest = Digest::sha256(&body);

    let mut storage = state.storage.lock().expect("lock poisoned");
    storage.manifests.insert(
        (repository.to_string(), reference.to_string()),
        (body.clone(), content_type.clone()),
    );
    storage
        .manifests
        .insert((repository.to_string(), digest.to_string()), (body, content_type));

    (
        StatusCode::CREATED,
        [(header::HeaderName::from_static("docker-content-digest"), digest.to_string())],
    )
        .into_response()
}

fn oci_error(status: StatusCode, code: &str, detail: &str) -> Response {
    let body = serde_json::json!({
        "errors": [{ "code": code, "message": code.to_lowercase().replace('_', " "), "detail": detail }]
    });
    (status, axum::Json(body)).into_response()
}
