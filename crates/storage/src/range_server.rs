//! Loopback HTTP range server for open remote files.
//!
//! libnetcdf reads NetCDF-4 / HDF5 files over HTTP byte ranges when the URL
//! carries `#mode=bytes`, but it cannot call back into a Rust reader. The
//! [`RangeServer`] publishes [`RemoteFile`]s on `127.0.0.1` so every range the
//! HDF5 library requests is answered from the file's block cache. Transport,
//! credentials and caching stay on the Rust side; libnetcdf only ever talks
//! to loopback.
//!
//! Requests are served on the runtime; the blocking `RemoteFile` reads run on
//! the blocking pool.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::net::{Ipv4Addr, SocketAddr};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::block_cache::CacheStats;
use crate::error::{StorageError, StorageResult};
use crate::remote_file::RemoteFile;

type SharedFile = Arc<Mutex<RemoteFile>>;

#[derive(Clone, Default)]
struct ServerState {
    files: Arc<Mutex<HashMap<u64, SharedFile>>>,
    next_id: Arc<AtomicU64>,
}

impl ServerState {
    fn get(&self, id: u64) -> Option<SharedFile> {
        lock(&self.files).get(&id).cloned()
    }
}

/// Serves published [`RemoteFile`]s over HTTP range requests on loopback.
///
/// Stops accepting connections when dropped.
pub struct RangeServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RangeServer {
    /// Bind an ephemeral loopback port and start serving on `handle`.
    pub fn start(handle: &Handle) -> StorageResult<Self> {
        let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .map_err(|e| StorageError::RangeServer(e.to_string()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| StorageError::RangeServer(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| StorageError::RangeServer(e.to_string()))?;

        let listener = {
            let _guard = handle.enter();
            tokio::net::TcpListener::from_std(listener)
                .map_err(|e| StorageError::RangeServer(e.to_string()))?
        };

        let state = ServerState::default();
        let app = Router::new()
            .route("/granules/:id", get(serve_range))
            .with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        handle.spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                warn!(error = %e, "Range server stopped");
            }
        });

        info!(addr = %addr, "Range server listening");

        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Make `file` readable at a loopback URL until the returned handle drops.
    pub fn publish(&self, file: RemoteFile) -> PublishedFile {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("http://{}/granules/{}", self.addr, id);
        let size = file.len();
        let origin = file.url().to_string();
        let file = Arc::new(Mutex::new(file));

        lock(&self.state.files).insert(id, Arc::clone(&file));
        debug!(id, origin = %origin, size, "Published remote file");

        PublishedFile {
            id,
            url,
            size,
            file,
            files: Arc::clone(&self.state.files),
        }
    }
}

impl Drop for RangeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A [`RemoteFile`] reachable through a [`RangeServer`].
///
/// Dropping it withdraws the URL; later requests get `404`.
pub struct PublishedFile {
    id: u64,
    url: String,
    size: u64,
    file: SharedFile,
    files: Arc<Mutex<HashMap<u64, SharedFile>>>,
}

impl PublishedFile {
    /// Loopback URL serving the file.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Cache counters of the underlying file so far.
    pub fn stats(&self) -> CacheStats {
        lock(&self.file).stats().clone()
    }
}

impl Drop for PublishedFile {
    fn drop(&mut self) {
        lock(&self.files).remove(&self.id);
    }
}

/// A poisoned lock only means another request panicked mid-read; the map and
/// the file's position are still usable because every read seeks first.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn serve_range(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let Some(file) = state.get(id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let size = lock(&file).len();

    let requested = match headers.get(RANGE) {
        None => None,
        Some(value) => match value.to_str().ok().and_then(|v| parse_range(v, size)) {
            Some(range) => Some(range),
            None => {
                return (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(CONTENT_RANGE, format!("bytes */{}", size))],
                )
                    .into_response()
            }
        },
    };

    if method == Method::HEAD {
        let length = requested.as_ref().map_or(size, |r| r.end - r.start);
        return Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_LENGTH, length)
            .header(ACCEPT_RANGES, "bytes")
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    let range = requested.clone().unwrap_or(0..size);
    let read = tokio::task::spawn_blocking(move || read_range(&file, range)).await;
    let bytes = match read {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!(id, error = %e, "Range read failed");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
        Err(e) => {
            warn!(id, error = %e, "Range read task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match requested {
        Some(range) => (
            StatusCode::PARTIAL_CONTENT,
            [
                (
                    CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end - 1, size),
                ),
                (ACCEPT_RANGES, "bytes".to_string()),
                (CONTENT_TYPE, "application/octet-stream".to_string()),
            ],
            bytes,
        )
            .into_response(),
        None => (
            StatusCode::OK,
            [
                (ACCEPT_RANGES, "bytes"),
                (CONTENT_TYPE, "application/octet-stream"),
            ],
            bytes,
        )
            .into_response(),
    }
}

fn read_range(file: &SharedFile, range: Range<u64>) -> std::io::Result<Vec<u8>> {
    let mut file = lock(file);
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    file.seek(SeekFrom::Start(range.start))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parse a single `bytes=` range against an object of `size` bytes into a
/// half-open range. Open-ended and suffix forms are accepted; ends past the
/// object are clamped. `None` when unsatisfiable or malformed.
fn parse_range(header: &str, size: u64) -> Option<Range<u64>> {
    let spec = header.trim().strip_prefix("bytes=")?;
    // Multipart ranges are not served.
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    let range = if start.is_empty() {
        let suffix: u64 = end.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        size.saturating_sub(suffix)..size
    } else {
        let start: u64 = start.parse().ok()?;
        let end = if end.is_empty() {
            size
        } else {
            let last: u64 = end.parse().ok()?;
            if last < start {
                return None;
            }
            last.saturating_add(1).min(size)
        };
        start..end
    };

    (range.start < size).then_some(range)
}
